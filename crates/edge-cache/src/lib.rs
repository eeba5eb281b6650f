//! Page property cache for the edge streaming SSR platform.
//!
//! This crate provides:
//! - `CacheBackend` - Key/value storage trait, with `InMemoryCache`
//! - `PropertyCache` - Cohort registry, expiry checks and the per-property write path
//! - `PropertyPage` - Properties read for one page
//! - `PropertyValue` - A single stored property with its write timestamp
//! - `Timer` - Clock abstraction, with `SystemTimer` and `MockTimer`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use edge_cache::{InMemoryCache, PropertyCache, PropertyPage, SystemTimer};
//!
//! let mut cache = PropertyCache::new(Arc::new(InMemoryCache::new()), Arc::new(SystemTimer));
//! cache.add_cohort("dom", &["critical_images"]);
//!
//! let page = PropertyPage::new("https://example.com/");
//! cache.read(&page);
//!
//! let cohort = cache.get_cohort("dom").unwrap();
//! cache.update_value(&page, cohort, "critical_images", "a.png\nb.png")?;
//! ```

mod backend;
mod key;
mod page;
mod property;
mod timer;

pub use backend::*;
pub use key::*;
pub use page::*;
pub use property::*;
pub use timer::*;
