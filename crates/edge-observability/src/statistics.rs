//! Named process-wide counters.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A counter shared by every request in the process.
///
/// Increments use relaxed ordering: only the eventual totals matter.
#[derive(Debug, Default)]
pub struct Variable {
    value: AtomicI64,
}

impl Variable {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` and return the new value.
    pub fn add(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::Relaxed) + delta
    }

    /// Current value.
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Reset to zero.
    pub fn clear(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

/// Registry of named counters.
///
/// Counters are registered once at startup with `add_variable` and looked up
/// by components when they are constructed.
pub trait Statistics: Send + Sync {
    /// Register a counter. Registering an existing name returns the existing counter.
    fn add_variable(&self, name: &str) -> Arc<Variable>;

    /// Look up a registered counter.
    fn get_variable(&self, name: &str) -> Option<Arc<Variable>>;

    /// Current value of every registered counter.
    fn snapshot(&self) -> StatisticsSnapshot;
}

/// Point-in-time copy of all counters, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    /// Counter values by name.
    pub variables: BTreeMap<String, i64>,
}

impl StatisticsSnapshot {
    /// Value of a counter, or zero if it is not registered.
    pub fn get(&self, name: &str) -> i64 {
        self.variables.get(name).copied().unwrap_or(0)
    }
}

/// In-process counter registry.
#[derive(Debug, Default)]
pub struct InMemoryStatistics {
    variables: RwLock<HashMap<String, Arc<Variable>>>,
}

impl InMemoryStatistics {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every counter to zero.
    pub fn clear(&self) {
        let variables = self.variables.read().unwrap_or_else(PoisonError::into_inner);
        for variable in variables.values() {
            variable.clear();
        }
    }
}

impl Statistics for InMemoryStatistics {
    fn add_variable(&self, name: &str) -> Arc<Variable> {
        let mut variables = self.variables.write().unwrap_or_else(PoisonError::into_inner);
        variables
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(variable = name, "Registered statistics variable");
                Arc::new(Variable::new())
            })
            .clone()
    }

    fn get_variable(&self, name: &str) -> Option<Arc<Variable>> {
        let variables = self.variables.read().unwrap_or_else(PoisonError::into_inner);
        variables.get(name).cloned()
    }

    fn snapshot(&self) -> StatisticsSnapshot {
        let variables = self.variables.read().unwrap_or_else(PoisonError::into_inner);
        StatisticsSnapshot {
            variables: variables
                .iter()
                .map(|(name, variable)| (name.clone(), variable.get()))
                .collect(),
        }
    }
}
