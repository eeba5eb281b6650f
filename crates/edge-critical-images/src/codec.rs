//! Stored value format for critical image sets.
//!
//! A set is stored as its members joined by a newline. The property cache
//! cannot tell an empty value from a missing one, so the empty set is stored
//! as a lone separator.

use edge_core::StringSet;

/// Separator between image URLs in a stored value.
pub const IMAGE_URL_SEPARATOR: char = '\n';

/// Encode a set of image URLs into a single property value.
pub fn encode_critical_images(images: &StringSet) -> String {
    let mut buf = String::new();
    for (i, url) in images.iter().enumerate() {
        if i > 0 {
            buf.push(IMAGE_URL_SEPARATOR);
        }
        buf.push_str(url);
    }
    if buf.is_empty() {
        buf.push(IMAGE_URL_SEPARATOR);
    }
    buf
}

/// Decode a property value into a set of image URLs.
///
/// Empty fragments are dropped, so the lone separator decodes to the empty set.
pub fn decode_critical_images(raw: &str) -> StringSet {
    raw.split(IMAGE_URL_SEPARATOR)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}
