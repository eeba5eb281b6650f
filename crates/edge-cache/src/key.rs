//! Backend key composition.

/// Prefix for persisted properties.
pub const PROPERTY_KEY_PREFIX: &str = "prop";

/// Helper to build backend keys with namespacing.
///
/// # Example
///
/// ```rust,ignore
/// let key = cache_key!("prop", "dom", "critical_images");
/// // Returns "prop:dom:critical_images"
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

/// Backend key under which one property of a page's cohort is persisted.
///
/// Page keys are URLs and may contain `:`, so the page key and cohort name
/// are length-prefixed.
pub fn property_key(page_key: &str, cohort: &str, name: &str) -> String {
    cache_key!(
        PROPERTY_KEY_PREFIX,
        page_key.len(),
        page_key,
        cohort.len(),
        cohort,
        name
    )
}
