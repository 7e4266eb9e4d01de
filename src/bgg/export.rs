//! Collection export classification.
//!
//! The XML API generates collection exports asynchronously. While an export
//! is being built the response is a bare `<message>` document; once ready it
//! is an `<items>` document; for unknown users it is an `<errors>` document.
//! Only the root element and the `objectid` attributes matter here, so the
//! payload is scanned rather than parsed into a tree.

use regex::Regex;

use crate::models::{GameId, OwnedSet};

/// What a single export response tells us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    /// Still generating; ask again later.
    Pending(String),

    /// Export ready with the owned item identifiers.
    Ready(OwnedSet),

    /// No pending marker and no items: no such user.
    NotFound(String),
}

/// Classify one collection export response body.
pub fn classify_export(xml: &str) -> ExportStatus {
    match root_element(xml).as_deref() {
        Some("message") => {
            let message = extract_xml_tag(xml, "message").unwrap_or_default();
            ExportStatus::Pending(message.to_string())
        }
        Some("items") => ExportStatus::Ready(owned_ids(xml)),
        Some(_) => {
            let reason = extract_xml_tag(xml, "message").unwrap_or("unrecognized export response");
            ExportStatus::NotFound(reason.to_string())
        }
        None => ExportStatus::NotFound("empty export response".to_string()),
    }
}

/// Name of the document's root element, skipping the prolog and comments.
fn root_element(xml: &str) -> Option<String> {
    let tag = Regex::new(r"<([A-Za-z_][\w:.-]*)").expect("static regex");
    tag.captures(xml)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Collect the `objectid` attribute of every `<item>` element.
fn owned_ids(xml: &str) -> OwnedSet {
    let item = Regex::new(r#"<item\b[^>]*?\bobjectid\s*=\s*["']([^"']+)["']"#).expect("static regex");
    item.captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| GameId::new(m.as_str().trim()))
        .collect()
}

/// Extract text content between XML open/close tags.
fn extract_xml_tag<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open_start = xml.find(&format!("<{}", tag))?;
    let after_open = &xml[open_start..];
    let content_start = after_open.find('>')? + 1;
    let content = &after_open[content_start..];

    let close_tag = format!("</{}>", tag);
    let content_end = content.find(&close_tag)?;

    Some(content[..content_end].trim())
}
