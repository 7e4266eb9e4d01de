//! Collection export polling.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{CancelFlag, PipelineError};
use crate::bgg::{classify_export, Endpoints, ExportStatus};
use crate::fetch::{Freshness, PageSource};
use crate::models::OwnedSet;

/// Timing for the export polling loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Fixed wait between requests while the export is generating
    pub interval: Duration,

    /// Deadline for the whole poll; `None` waits as long as it takes
    pub max_wait: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_wait: None,
        }
    }
}

/// Requests a user's collection export until it is ready or refused.
pub struct ExportPoller<'a> {
    source: &'a dyn PageSource,
    endpoints: &'a Endpoints,
    config: PollConfig,
    cancel: &'a CancelFlag,
}

impl<'a> ExportPoller<'a> {
    pub fn new(
        source: &'a dyn PageSource,
        endpoints: &'a Endpoints,
        config: PollConfig,
        cancel: &'a CancelFlag,
    ) -> Self {
        Self {
            source,
            endpoints,
            config,
            cancel,
        }
    }

    /// Poll the export for `username` and return the owned item ids.
    ///
    /// The same resource is re-requested after `interval` for as long as
    /// the site reports it is still generating.
    pub async fn poll(&self, username: &str) -> Result<OwnedSet, PipelineError> {
        let url = self.endpoints.collection_export(username);
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            self.cancel.check().await?;
            attempt += 1;

            let body = self.source.fetch_text(&url, Freshness::Fresh).await?;

            match classify_export(&body) {
                ExportStatus::Ready(owned) => {
                    info!(
                        "Collection received for {}: {} owned items",
                        username,
                        owned.len()
                    );
                    return Ok(owned);
                }
                ExportStatus::NotFound(reason) => {
                    warn!("No collection for {}: {}", username, reason);
                    return Err(PipelineError::UserNotFound(username.to_string()));
                }
                ExportStatus::Pending(message) => {
                    debug!("Export pending: {}", message);

                    if let Some(max_wait) = self.config.max_wait {
                        let waited = started.elapsed();
                        if waited + self.config.interval > max_wait {
                            return Err(PipelineError::ExportTimeout {
                                username: username.to_string(),
                                waited,
                            });
                        }
                    }

                    info!(
                        "Collection export still generating (attempt {}), waiting {:?}",
                        attempt, self.config.interval
                    );
                    tokio::time::sleep(self.config.interval).await;
                }
            }
        }
    }
}
