//! Core abstractions for the edge streaming SSR platform.
//!
//! This crate provides the fundamental request-scoped types:
//! - `RequestContext` - Per-request state shared by rewriters
//! - `RewriteOptions` - Option values consulted while rewriting a page
//! - `CriticalImagesInfo` - Critical image sets attached to a request

mod config;
mod context;

pub use config::*;
pub use context::*;
