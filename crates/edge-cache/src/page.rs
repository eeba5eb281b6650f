//! Properties read for a single page.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::property::Cohort;

/// A stored property: an opaque string value plus the time it was written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    value: Option<String>,
    write_timestamp_ms: i64,
}

impl PropertyValue {
    /// A property with nothing stored.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A property holding `value`, written at `write_timestamp_ms`.
    pub fn new(value: impl Into<String>, write_timestamp_ms: i64) -> Self {
        Self {
            value: Some(value.into()),
            write_timestamp_ms,
        }
    }

    /// Whether a value has been stored.
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// The stored value, if any.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// When the value was written (milliseconds since the epoch).
    pub fn write_timestamp_ms(&self) -> i64 {
        self.write_timestamp_ms
    }
}

/// Property values known for one cohort of a page.
pub(crate) type CohortValues = HashMap<String, PropertyValue>;

/// Page handle: the property values known for one page, grouped by cohort.
///
/// Values are filled by `PropertyCache::read` and changed through
/// `PropertyCache::update_value`.
#[derive(Debug)]
pub struct PropertyPage {
    key: String,
    cohorts: RwLock<HashMap<String, CohortValues>>,
}

impl PropertyPage {
    /// Create an empty page for `key` (usually the page URL).
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cohorts: RwLock::new(HashMap::new()),
        }
    }

    /// Page key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value of `name` in `cohort`; empty if nothing is known.
    pub fn get_property(&self, cohort: &Cohort, name: &str) -> PropertyValue {
        let cohorts = self.cohorts.read().unwrap_or_else(PoisonError::into_inner);
        cohorts
            .get(cohort.name())
            .and_then(|values| values.get(name))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn set_property(&self, cohort: &Cohort, name: &str, value: PropertyValue) {
        let mut cohorts = self.cohorts.write().unwrap_or_else(PoisonError::into_inner);
        cohorts
            .entry(cohort.name().to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    pub(crate) fn replace_cohort(&self, cohort: &Cohort, values: CohortValues) {
        let mut cohorts = self.cohorts.write().unwrap_or_else(PoisonError::into_inner);
        cohorts.insert(cohort.name().to_string(), values);
    }
}
