//! Validity classification of stored critical image values.

use std::sync::Arc;

use edge_cache::{PropertyCache, PropertyValue};
use edge_core::StringSet;
use edge_observability::{Statistics, Variable};

use crate::codec::decode_critical_images;
use crate::error::FinderError;

/// Counter of stored values that were present and fresh.
pub const CRITICAL_IMAGES_VALID_COUNT: &str = "critical_images_valid_count";

/// Counter of stored values that were present but older than the TTL.
pub const CRITICAL_IMAGES_EXPIRED_COUNT: &str = "critical_images_expired_count";

/// Counter of lookups that found no stored value.
pub const CRITICAL_IMAGES_NOT_FOUND_COUNT: &str = "critical_images_not_found_count";

/// Result of reading one stored critical image value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Present and fresh; carries the decoded images.
    Valid(StringSet),
    /// Present but older than the TTL.
    Expired,
    /// Nothing stored.
    NotFound,
}

impl ExtractOutcome {
    /// Classify `value` against `ttl_ms` using the cache's expiry policy.
    pub fn classify(cache: &PropertyCache, value: &PropertyValue, ttl_ms: i64) -> Self {
        match value.value() {
            None => Self::NotFound,
            Some(_) if cache.is_expired(value, ttl_ms) => Self::Expired,
            Some(raw) => Self::Valid(decode_critical_images(raw)),
        }
    }

    /// Images usable for this request; empty unless the value was valid.
    pub fn into_images(self) -> StringSet {
        match self {
            Self::Valid(images) => images,
            Self::Expired | Self::NotFound => StringSet::new(),
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Valid(_) => "valid",
            Self::Expired => "expired",
            Self::NotFound => "not_found",
        }
    }
}

/// Handles to the three critical image counters.
#[derive(Debug, Clone)]
pub struct CriticalImagesStats {
    valid: Arc<Variable>,
    expired: Arc<Variable>,
    not_found: Arc<Variable>,
}

impl CriticalImagesStats {
    /// Register the counters. Call once at startup before building any finder.
    pub fn init(statistics: &dyn Statistics) {
        statistics.add_variable(CRITICAL_IMAGES_VALID_COUNT);
        statistics.add_variable(CRITICAL_IMAGES_EXPIRED_COUNT);
        statistics.add_variable(CRITICAL_IMAGES_NOT_FOUND_COUNT);
    }

    /// Look up the registered counters.
    pub fn from_statistics(statistics: &dyn Statistics) -> Result<Self, FinderError> {
        let lookup = |name: &str| {
            statistics
                .get_variable(name)
                .ok_or_else(|| FinderError::UnregisteredVariable(name.to_string()))
        };
        Ok(Self {
            valid: lookup(CRITICAL_IMAGES_VALID_COUNT)?,
            expired: lookup(CRITICAL_IMAGES_EXPIRED_COUNT)?,
            not_found: lookup(CRITICAL_IMAGES_NOT_FOUND_COUNT)?,
        })
    }

    /// Count one outcome.
    pub fn record(&self, outcome: &ExtractOutcome) {
        let variable = match outcome {
            ExtractOutcome::Valid(_) => &self.valid,
            ExtractOutcome::Expired => &self.expired,
            ExtractOutcome::NotFound => &self.not_found,
        };
        variable.add(1);
    }
}
