//! Above-the-fold ("critical") image tracking for the edge streaming SSR platform.
//!
//! Two independent sets of critical image URLs are kept per page, one found
//! from the page markup and one from its stylesheets. They are persisted in
//! the page property cache and loaded into the request at most once.
//!
//! This crate provides:
//! - `CriticalImagesFinder` - Loading, membership checks and cache updates
//! - `RewriteDriver` - View over the request and its property cache handles
//! - `encode_critical_images` / `decode_critical_images` - Stored value format
//!
//! # Example
//!
//! ```ignore
//! use edge_critical_images::{CriticalImagesFinder, RewriteDriver};
//!
//! CriticalImagesFinder::init_stats(&stats);
//! let finder = CriticalImagesFinder::new(&stats)?;
//!
//! let mut driver = RewriteDriver::new(&mut request)
//!     .with_property_page(&page)
//!     .with_page_property_cache(&cache);
//!
//! if finder.is_html_critical_image("https://example.com/hero.jpg", &mut driver) {
//!     // keep the image eagerly loaded
//! }
//! ```

mod codec;
mod driver;
mod error;
mod finder;
mod stats;

pub use codec::*;
pub use driver::*;
pub use error::*;
pub use finder::*;
pub use stats::*;

// Re-export the set type for callers building new critical image sets
pub use edge_core::{CriticalImagesInfo, StringSet};
