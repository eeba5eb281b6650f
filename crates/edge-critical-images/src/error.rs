//! Finder error types.

use thiserror::Error;

/// Errors raised while setting up a finder.
///
/// Request-time lookups and updates never fail; missing or stale data is
/// treated as "nothing cached".
#[derive(Error, Debug)]
pub enum FinderError {
    /// A counter was looked up before `init_stats` registered it.
    #[error("Statistics variable not registered: {0}")]
    UnregisteredVariable(String),
}
