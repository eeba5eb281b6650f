//! Property cache: cohort registry, expiry policy and the write path.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::{CacheBackend, CacheError, CacheResult};
use crate::key::property_key;
use crate::page::{CohortValues, PropertyPage, PropertyValue};
use crate::timer::Timer;

/// A named group of properties read together for a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cohort {
    name: String,
    properties: Vec<String>,
}

impl Cohort {
    /// Create a cohort handle with no properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Cohort name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Properties loaded by `PropertyCache::read` for this cohort.
    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// Whether `name` is one of this cohort's properties.
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p == name)
    }

    fn add_property(&mut self, name: &str) {
        if !self.has_property(name) {
            self.properties.push(name.to_string());
        }
    }
}

impl std::fmt::Display for Cohort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Page-keyed property cache layered over a `CacheBackend`.
///
/// Every property is persisted under its own backend key, so writing one
/// property never touches another.
pub struct PropertyCache {
    backend: Arc<dyn CacheBackend>,
    timer: Arc<dyn Timer>,
    cohorts: Vec<Cohort>,
    enabled: bool,
}

impl std::fmt::Debug for PropertyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyCache")
            .field("cohorts", &self.cohorts)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl PropertyCache {
    /// Create an enabled cache with no cohorts.
    pub fn new(backend: Arc<dyn CacheBackend>, timer: Arc<dyn Timer>) -> Self {
        Self {
            backend,
            timer,
            cohorts: Vec::new(),
            enabled: true,
        }
    }

    /// Register a cohort and its properties.
    ///
    /// Registering an existing name adds any new properties to the existing
    /// cohort.
    pub fn add_cohort(&mut self, name: &str, properties: &[&str]) -> &Cohort {
        let index = match self.cohorts.iter().position(|c| c.name() == name) {
            Some(index) => index,
            None => {
                self.cohorts.push(Cohort::new(name));
                self.cohorts.len() - 1
            }
        };
        let cohort = &mut self.cohorts[index];
        for property in properties {
            cohort.add_property(property);
        }
        cohort
    }

    /// Look up a registered cohort. A disabled cache resolves no cohorts.
    pub fn get_cohort(&self, name: &str) -> Option<&Cohort> {
        if !self.enabled {
            return None;
        }
        self.cohorts.iter().find(|c| c.name() == name)
    }

    /// Registered cohorts.
    pub fn cohorts(&self) -> &[Cohort] {
        &self.cohorts
    }

    /// Enable or disable the cache.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the cache is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Load every registered property of `page` from the backend.
    ///
    /// Missing or unreadable properties are left empty on the page. Returns
    /// the number of properties found.
    pub fn read(&self, page: &PropertyPage) -> usize {
        if !self.enabled {
            return 0;
        }

        let mut found = 0;
        for cohort in &self.cohorts {
            let mut values = CohortValues::new();
            for name in cohort.properties() {
                match self.read_property(page.key(), cohort, name) {
                    Ok(Some(value)) => {
                        values.insert(name.clone(), value);
                        found += 1;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(
                            page = page.key(),
                            cohort = cohort.name(),
                            property = %name,
                            error = %e,
                            "Failed to read property"
                        );
                    }
                }
            }
            page.replace_cohort(cohort, values);
        }
        debug!(page = page.key(), found, "Read property page");
        found
    }

    fn read_property(
        &self,
        page_key: &str,
        cohort: &Cohort,
        name: &str,
    ) -> CacheResult<Option<PropertyValue>> {
        match self.backend.get(&property_key(page_key, cohort.name(), name))? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Whether `value` is older than `ttl_ms` milliseconds.
    pub fn is_expired(&self, value: &PropertyValue, ttl_ms: i64) -> bool {
        let age_ms = self.timer.now_ms().saturating_sub(value.write_timestamp_ms());
        age_ms > ttl_ms
    }

    /// Write `value` to property `name` of `cohort` for `page`.
    ///
    /// The page sees the new value immediately and only that property is
    /// persisted. `name` must be one of the cohort's registered properties.
    pub fn update_value(
        &self,
        page: &PropertyPage,
        cohort: &Cohort,
        name: &str,
        value: impl Into<String>,
    ) -> CacheResult<()> {
        if !cohort.has_property(name) {
            return Err(CacheError::UnknownProperty {
                cohort: cohort.name().to_string(),
                name: name.to_string(),
            });
        }

        let value = PropertyValue::new(value, self.timer.now_ms());
        let serialized = serde_json::to_string(&value)?;
        page.set_property(cohort, name, value);

        self.backend
            .put(&property_key(page.key(), cohort.name(), name), serialized)?;
        debug!(page = page.key(), cohort = cohort.name(), property = name, "Updated property");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryCache;
    use crate::timer::MockTimer;

    const PROPERTIES: &[&str] = &["one", "two"];

    fn setup(now_ms: i64) -> (PropertyCache, Arc<InMemoryCache>, Arc<MockTimer>) {
        let backend = Arc::new(InMemoryCache::new());
        let timer = Arc::new(MockTimer::new(now_ms));
        let mut cache = PropertyCache::new(backend.clone(), timer.clone());
        cache.add_cohort("dom", PROPERTIES);
        (cache, backend, timer)
    }

    struct FailingBackend;

    impl CacheBackend for FailingBackend {
        fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Err(CacheError::Storage("unavailable".to_string()))
        }

        fn put(&self, _key: &str, _value: String) -> CacheResult<()> {
            Err(CacheError::Storage("unavailable".to_string()))
        }

        fn delete(&self, _key: &str) -> CacheResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_add_cohort_is_idempotent() {
        let (mut cache, _, _) = setup(0);
        cache.add_cohort("dom", &["three"]);
        cache.add_cohort("beacon_cohort", &[]);
        assert_eq!(cache.cohorts().len(), 2);
        assert_eq!(cache.cohorts()[0].properties(), ["one", "two", "three"]);
    }

    #[test]
    fn test_get_cohort_unknown() {
        let (cache, _, _) = setup(0);
        assert!(cache.get_cohort("nope").is_none());
        assert_eq!(cache.get_cohort("dom").map(Cohort::name), Some("dom"));
    }

    #[test]
    fn test_disabled_cache_resolves_no_cohort() {
        let (mut cache, _, _) = setup(0);
        cache.set_enabled(false);
        assert!(!cache.enabled());
        assert!(cache.get_cohort("dom").is_none());
    }

    #[test]
    fn test_is_expired_boundary() {
        let (cache, _, timer) = setup(0);
        let value = PropertyValue::new("x", 0);

        timer.set_time_ms(500);
        assert!(!cache.is_expired(&value, 1_000));

        timer.set_time_ms(1_000);
        assert!(!cache.is_expired(&value, 1_000));

        timer.set_time_ms(1_500);
        assert!(cache.is_expired(&value, 1_000));
    }

    #[test]
    fn test_is_expired_extreme_timestamps() {
        let (cache, _, timer) = setup(1_000);

        assert!(cache.is_expired(&PropertyValue::new("x", i64::MIN), 1_000));
        assert!(!cache.is_expired(&PropertyValue::new("x", i64::MAX), 1_000));

        timer.set_time_ms(i64::MAX);
        assert!(cache.is_expired(&PropertyValue::new("x", i64::MIN), i64::MAX - 1));

        timer.set_time_ms(i64::MIN);
        assert!(!cache.is_expired(&PropertyValue::new("x", i64::MAX), 0));
    }

    #[test]
    fn test_update_then_read_on_new_page() {
        let (cache, backend, timer) = setup(100);
        let cohort = cache.get_cohort("dom").unwrap().clone();

        let page = PropertyPage::new("/p");
        cache.update_value(&page, &cohort, "one", "a\nb").unwrap();
        assert_eq!(backend.len(), 1);

        timer.advance_ms(10);
        let next = PropertyPage::new("/p");
        assert_eq!(cache.read(&next), 1);

        let value = next.get_property(&cohort, "one");
        assert_eq!(value.value(), Some("a\nb"));
        assert_eq!(value.write_timestamp_ms(), 100);
    }

    #[test]
    fn test_update_preserves_sibling_properties() {
        let (cache, _, _) = setup(0);
        let cohort = cache.get_cohort("dom").unwrap().clone();

        let page = PropertyPage::new("/p");
        cache.update_value(&page, &cohort, "one", "1").unwrap();
        cache.update_value(&page, &cohort, "two", "2").unwrap();

        let next = PropertyPage::new("/p");
        assert_eq!(cache.read(&next), 2);
        assert_eq!(next.get_property(&cohort, "one").value(), Some("1"));
        assert_eq!(next.get_property(&cohort, "two").value(), Some("2"));
    }

    #[test]
    fn test_update_through_unread_page_keeps_stored_siblings() {
        let (cache, _, _) = setup(0);
        let cohort = cache.get_cohort("dom").unwrap().clone();

        let first = PropertyPage::new("/p");
        cache.read(&first);
        cache.update_value(&first, &cohort, "two", "kept").unwrap();

        let unread = PropertyPage::new("/p");
        cache.update_value(&unread, &cohort, "one", "new").unwrap();

        let next = PropertyPage::new("/p");
        cache.read(&next);
        assert_eq!(next.get_property(&cohort, "one").value(), Some("new"));
        assert_eq!(next.get_property(&cohort, "two").value(), Some("kept"));
    }

    #[test]
    fn test_update_unregistered_property_is_rejected() {
        let (cache, backend, _) = setup(0);
        let cohort = cache.get_cohort("dom").unwrap().clone();
        let page = PropertyPage::new("/p");

        let result = cache.update_value(&page, &cohort, "three", "x");
        assert!(matches!(result, Err(CacheError::UnknownProperty { .. })));
        assert!(backend.is_empty());
        assert!(!page.get_property(&cohort, "three").has_value());
    }

    #[test]
    fn test_read_missing_page() {
        let (cache, _, _) = setup(0);
        let page = PropertyPage::new("/never-written");
        assert_eq!(cache.read(&page), 0);
    }

    #[test]
    fn test_read_replaces_stale_page_values() {
        let (cache, _, _) = setup(0);
        let cohort = cache.get_cohort("dom").unwrap().clone();
        let page = PropertyPage::new("/p");
        page.set_property(&cohort, "one", PropertyValue::new("stale", 0));

        assert_eq!(cache.read(&page), 0);
        assert!(!page.get_property(&cohort, "one").has_value());
    }

    #[test]
    fn test_read_backend_failure_degrades_to_empty() {
        let mut cache = PropertyCache::new(Arc::new(FailingBackend), Arc::new(MockTimer::new(0)));
        let cohort = cache.add_cohort("dom", &["critical_images"]).clone();
        let page = PropertyPage::new("/p");

        assert_eq!(cache.read(&page), 0);
        assert!(!page.get_property(&cohort, "critical_images").has_value());
    }

    #[test]
    fn test_update_backend_failure_is_reported() {
        let mut cache = PropertyCache::new(Arc::new(FailingBackend), Arc::new(MockTimer::new(0)));
        let cohort = cache.add_cohort("dom", &["critical_images"]).clone();
        let page = PropertyPage::new("/p");

        let result = cache.update_value(&page, &cohort, "critical_images", "\n");
        assert!(matches!(result, Err(CacheError::Storage(_))));
    }

    #[test]
    fn test_corrupt_property_is_ignored() {
        let (cache, backend, _) = setup(0);
        let cohort = cache.get_cohort("dom").unwrap().clone();
        let page = PropertyPage::new("/p");
        cache.update_value(&page, &cohort, "two", "fine").unwrap();
        backend
            .put(&property_key("/p", "dom", "one"), "not json".to_string())
            .unwrap();

        let next = PropertyPage::new("/p");
        assert_eq!(cache.read(&next), 1);
        assert!(!next.get_property(&cohort, "one").has_value());
        assert_eq!(next.get_property(&cohort, "two").value(), Some("fine"));
    }
}
