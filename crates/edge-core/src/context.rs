//! Request context with per-request rewrite state.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::config::RewriteOptions;

/// Ordered set of distinct strings (normalized image URLs).
pub type StringSet = BTreeSet<String>;

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        static SEQUENCE: AtomicU32 = AtomicU32::new(0);

        let id = format!(
            "{:x}-{:x}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos(),
            SEQUENCE.fetch_add(1, Ordering::Relaxed)
        );
        Self(id)
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Critical image sets known for the current request.
///
/// Each side is independent: `None` means nothing is known for that source,
/// while `Some` of an empty set means the source has no critical images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriticalImagesInfo {
    /// Images critical according to the page markup.
    pub html_critical_images: Option<StringSet>,
    /// Images critical according to the page stylesheets.
    pub css_critical_images: Option<StringSet>,
}

impl CriticalImagesInfo {
    /// Create info with both sides present and empty.
    pub fn new() -> Self {
        Self {
            html_critical_images: Some(StringSet::new()),
            css_critical_images: Some(StringSet::new()),
        }
    }

    /// Create info with only the HTML side known.
    pub fn with_html(images: StringSet) -> Self {
        Self {
            html_critical_images: Some(images),
            css_critical_images: None,
        }
    }

    /// Create info with only the CSS side known.
    pub fn with_css(images: StringSet) -> Self {
        Self {
            html_critical_images: None,
            css_critical_images: Some(images),
        }
    }
}

impl Default for CriticalImagesInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// State for a single page request.
///
/// Owned by the thread serving the request and dropped with it; nothing in
/// here is shared across requests.
#[derive(Debug)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// Request path (also the page key for property lookups).
    pub path: String,
    options: Arc<RewriteOptions>,
    flushing_early: bool,
    critical_images_info: Option<CriticalImagesInfo>,
}

impl RequestContext {
    /// Create a new request context.
    pub fn new(path: impl Into<String>, options: Arc<RewriteOptions>) -> Self {
        Self {
            request_id: RequestId::generate(),
            path: path.into(),
            options,
            flushing_early: false,
            critical_images_info: None,
        }
    }

    /// Options in effect for this request.
    pub fn options(&self) -> &RewriteOptions {
        &self.options
    }

    /// Whether this is the partial render that flushes the head early.
    pub fn flushing_early(&self) -> bool {
        self.flushing_early
    }

    /// Mark the request as flushing early (or not).
    pub fn set_flushing_early(&mut self, flushing_early: bool) {
        self.flushing_early = flushing_early;
    }

    /// Critical images attached to this request, if any.
    pub fn critical_images_info(&self) -> Option<&CriticalImagesInfo> {
        self.critical_images_info.as_ref()
    }

    /// Mutable access to the attached critical images.
    pub fn critical_images_info_mut(&mut self) -> Option<&mut CriticalImagesInfo> {
        self.critical_images_info.as_mut()
    }

    /// Attach critical images to this request, replacing any previous info.
    pub fn set_critical_images_info(&mut self, info: CriticalImagesInfo) {
        self.critical_images_info = Some(info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> StringSet {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_request_id_generate_uniqueness() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_request_id_display() {
        let id = RequestId::from_string("req-1");
        assert_eq!(id.to_string(), "req-1");
    }

    #[test]
    fn test_new_context_has_no_info() {
        let ctx = RequestContext::new("/products/1", Arc::new(RewriteOptions::default()));
        assert!(ctx.critical_images_info().is_none());
        assert!(!ctx.flushing_early());
        assert_eq!(ctx.path, "/products/1");
    }

    #[test]
    fn test_set_info_replaces_previous() {
        let mut ctx = RequestContext::new("/", Arc::new(RewriteOptions::default()));
        ctx.set_critical_images_info(CriticalImagesInfo::with_html(set(&["a"])));
        ctx.set_critical_images_info(CriticalImagesInfo::with_css(set(&["b"])));

        let info = ctx.critical_images_info().unwrap();
        assert!(info.html_critical_images.is_none());
        assert_eq!(info.css_critical_images, Some(set(&["b"])));
    }

    #[test]
    fn test_info_new_is_present_and_empty() {
        let info = CriticalImagesInfo::new();
        assert_eq!(info.html_critical_images, Some(StringSet::new()));
        assert_eq!(info.css_critical_images, Some(StringSet::new()));
    }

    #[test]
    fn test_info_serializes_absent_side_as_null() {
        let info = CriticalImagesInfo::with_html(set(&["x.png"]));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["html_critical_images"], serde_json::json!(["x.png"]));
        assert!(json["css_critical_images"].is_null());
    }
}
