//! Critical image lookup and cache maintenance.

use edge_cache::{Cohort, PropertyCache, PropertyPage, PropertyValue};
use edge_core::{CriticalImagesInfo, RewriteOptions, StringSet, DEFAULT_CRITICAL_IMAGES_COHORT};
use edge_observability::Statistics;
use tracing::{debug, warn};

use crate::codec::encode_critical_images;
use crate::driver::RewriteDriver;
use crate::error::FinderError;
use crate::stats::{CriticalImagesStats, ExtractOutcome};

/// Property holding images found critical from the page markup.
pub const CRITICAL_IMAGES_PROPERTY_NAME: &str = "critical_images";

/// Property holding images found critical from the page stylesheets.
pub const CSS_CRITICAL_IMAGES_PROPERTY_NAME: &str = "css_critical_images";

/// Looks up and maintains the critical image sets of a page.
///
/// One finder is shared by every request in the process; per-request sets
/// live on the request itself (see `RewriteDriver`), never on the finder.
#[derive(Debug, Clone)]
pub struct CriticalImagesFinder {
    stats: CriticalImagesStats,
    cohort: String,
}

impl CriticalImagesFinder {
    /// Register the finder's counters. Call once at startup.
    pub fn init_stats(statistics: &dyn Statistics) {
        CriticalImagesStats::init(statistics);
    }

    /// Create a finder using the default cohort.
    ///
    /// Fails if `init_stats` has not been called on `statistics`. Use
    /// `from_options` to honor a configured cohort.
    pub fn new(statistics: &dyn Statistics) -> Result<Self, FinderError> {
        Ok(Self {
            stats: CriticalImagesStats::from_statistics(statistics)?,
            cohort: DEFAULT_CRITICAL_IMAGES_COHORT.to_string(),
        })
    }

    /// Create a finder using the cohort named in `options`.
    pub fn from_options(
        statistics: &dyn Statistics,
        options: &RewriteOptions,
    ) -> Result<Self, FinderError> {
        Ok(Self::new(statistics)?.with_cohort(&options.critical_images_cohort))
    }

    /// Use a different cohort for the critical image properties.
    pub fn with_cohort(mut self, cohort: impl Into<String>) -> Self {
        self.cohort = cohort.into();
        self
    }

    /// Name of the cohort holding the critical image properties.
    pub fn critical_images_cohort(&self) -> &str {
        &self.cohort
    }

    /// Register the critical images cohort and both of its properties on `cache`.
    pub fn register_cohort<'c>(&self, cache: &'c mut PropertyCache) -> &'c Cohort {
        cache.add_cohort(
            &self.cohort,
            &[CRITICAL_IMAGES_PROPERTY_NAME, CSS_CRITICAL_IMAGES_PROPERTY_NAME],
        )
    }

    /// Whether `image_url` is critical according to the page markup.
    pub fn is_html_critical_image(&self, image_url: &str, driver: &mut RewriteDriver<'_>) -> bool {
        self.get_html_critical_images(driver)
            .is_some_and(|images| images.contains(image_url))
    }

    /// Whether `image_url` is critical according to the page stylesheets.
    pub fn is_css_critical_image(&self, image_url: &str, driver: &mut RewriteDriver<'_>) -> bool {
        self.get_css_critical_images(driver)
            .is_some_and(|images| images.contains(image_url))
    }

    /// Images critical according to the page markup, loading them on first use.
    pub fn get_html_critical_images<'d>(
        &self,
        driver: &'d mut RewriteDriver<'_>,
    ) -> Option<&'d StringSet> {
        self.update_critical_images_set_in_driver(driver);
        driver
            .critical_images_info()
            .and_then(|info| info.html_critical_images.as_ref())
    }

    /// Images critical according to the page stylesheets, loading them on first use.
    pub fn get_css_critical_images<'d>(
        &self,
        driver: &'d mut RewriteDriver<'_>,
    ) -> Option<&'d StringSet> {
        self.update_critical_images_set_in_driver(driver);
        driver
            .critical_images_info()
            .and_then(|info| info.css_critical_images.as_ref())
    }

    /// Replace the markup-derived images for this request only.
    ///
    /// Nothing is persisted. If no images were attached yet, the stylesheet
    /// side stays unknown until it is set or loaded.
    pub fn set_html_critical_images(&self, driver: &mut RewriteDriver<'_>, images: StringSet) {
        if let Some(info) = driver.critical_images_info_mut() {
            info.html_critical_images = Some(images);
        } else {
            driver.set_critical_images_info(CriticalImagesInfo::with_html(images));
        }
    }

    /// Replace the stylesheet-derived images for this request only.
    ///
    /// Nothing is persisted. If no images were attached yet, the markup side
    /// stays unknown until it is set or loaded.
    pub fn set_css_critical_images(&self, driver: &mut RewriteDriver<'_>, images: StringSet) {
        if let Some(info) = driver.critical_images_info_mut() {
            info.css_critical_images = Some(images);
        } else {
            driver.set_critical_images_info(CriticalImagesInfo::with_css(images));
        }
    }

    /// Copy the stored critical images for this request into the driver.
    ///
    /// Runs at most once per request: if the driver already carries critical
    /// images this is a no-op. Reads made while flushing early are not
    /// counted, since the full render of the same page counts them again.
    pub fn update_critical_images_set_in_driver(&self, driver: &mut RewriteDriver<'_>) {
        if driver.critical_images_info().is_some() {
            return;
        }

        let mut info = CriticalImagesInfo::new();
        let cache = driver.page_property_cache();
        let cohort = cache.and_then(|cache| cache.get_cohort(&self.cohort));

        if let (Some(page), Some(cache), Some(cohort)) = (driver.property_page(), cache, cohort) {
            let ttl_ms = driver.options().finder_properties_cache_expiration_time_ms();
            let track_stats = !driver.flushing_early();

            let html = self.extract_critical_images_set(
                cache,
                &page.get_property(cohort, CRITICAL_IMAGES_PROPERTY_NAME),
                ttl_ms,
                track_stats,
            );
            let css = self.extract_critical_images_set(
                cache,
                &page.get_property(cohort, CSS_CRITICAL_IMAGES_PROPERTY_NAME),
                ttl_ms,
                track_stats,
            );
            debug!(
                request_id = %driver.request().request_id,
                html = html.label(),
                css = css.label(),
                track_stats,
                "Loaded critical images"
            );

            info.html_critical_images = Some(html.into_images());
            info.css_critical_images = Some(css.into_images());
        }

        driver.set_critical_images_info(info);
    }

    /// Classify one stored value and count the outcome if `track_stats` is set.
    pub fn extract_critical_images_set(
        &self,
        cache: &PropertyCache,
        value: &PropertyValue,
        ttl_ms: i64,
        track_stats: bool,
    ) -> ExtractOutcome {
        let outcome = ExtractOutcome::classify(cache, value, ttl_ms);
        if track_stats {
            self.stats.record(&outcome);
        }
        outcome
    }

    /// Persist new critical images using the driver's page and cache.
    ///
    /// See `update_critical_images_cache_entry`.
    pub fn update_critical_images_cache_entry_from_driver(
        &self,
        driver: &RewriteDriver<'_>,
        html_critical_images: Option<StringSet>,
        css_critical_images: Option<StringSet>,
    ) -> bool {
        self.update_critical_images_cache_entry(
            driver.property_page(),
            driver.page_property_cache(),
            html_critical_images,
            css_critical_images,
        )
    }

    /// Persist new critical images for a page.
    ///
    /// Each side given as `Some` is encoded and written to its own property;
    /// a side given as `None` keeps whatever is stored. Returns true if at
    /// least one side was written. Missing handles or an unregistered cohort
    /// write nothing.
    pub fn update_critical_images_cache_entry(
        &self,
        page: Option<&PropertyPage>,
        page_property_cache: Option<&PropertyCache>,
        html_critical_images: Option<StringSet>,
        css_critical_images: Option<StringSet>,
    ) -> bool {
        let (Some(page), Some(cache)) = (page, page_property_cache) else {
            return false;
        };
        if !cache.enabled() {
            debug!(page = page.key(), "Property cache disabled, critical images not written");
            return false;
        }
        let Some(cohort) = cache.get_cohort(&self.cohort) else {
            warn!(cohort = %self.cohort, "Critical images cohort is not registered");
            return false;
        };

        let mut updated = false;
        if let Some(images) = html_critical_images {
            updated |= self.write_images(page, cache, cohort, CRITICAL_IMAGES_PROPERTY_NAME, &images);
        }
        if let Some(images) = css_critical_images {
            updated |=
                self.write_images(page, cache, cohort, CSS_CRITICAL_IMAGES_PROPERTY_NAME, &images);
        }
        updated
    }

    fn write_images(
        &self,
        page: &PropertyPage,
        cache: &PropertyCache,
        cohort: &Cohort,
        property: &str,
        images: &StringSet,
    ) -> bool {
        let encoded = encode_critical_images(images);
        match cache.update_value(page, cohort, property, encoded) {
            Ok(()) => true,
            Err(e) => {
                warn!(page = page.key(), property, error = %e, "Failed to write critical images");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use edge_cache::{InMemoryCache, MockTimer};
    use edge_core::RequestContext;
    use edge_observability::InMemoryStatistics;

    fn set(items: &[&str]) -> StringSet {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn finder() -> CriticalImagesFinder {
        let stats = InMemoryStatistics::new();
        CriticalImagesFinder::init_stats(&stats);
        CriticalImagesFinder::new(&stats).unwrap()
    }

    fn request() -> RequestContext {
        RequestContext::new("/p", Arc::new(RewriteOptions::default()))
    }

    #[test]
    fn test_new_without_init_stats_fails() {
        let stats = InMemoryStatistics::new();
        assert!(CriticalImagesFinder::new(&stats).is_err());
    }

    #[test]
    fn test_default_and_custom_cohort() {
        let finder = finder();
        assert_eq!(finder.critical_images_cohort(), "dom");
        let finder = finder.with_cohort("beacon_cohort");
        assert_eq!(finder.critical_images_cohort(), "beacon_cohort");
    }

    #[test]
    fn test_from_options_uses_configured_cohort() {
        let stats = InMemoryStatistics::new();
        CriticalImagesFinder::init_stats(&stats);
        let options = RewriteOptions::default().with_critical_images_cohort("beacon_cohort");

        let finder = CriticalImagesFinder::from_options(&stats, &options).unwrap();
        assert_eq!(finder.critical_images_cohort(), "beacon_cohort");
    }

    #[test]
    fn test_register_cohort_adds_both_properties() {
        let finder = finder();
        let mut cache =
            PropertyCache::new(Arc::new(InMemoryCache::new()), Arc::new(MockTimer::new(0)));
        let cohort = finder.register_cohort(&mut cache);

        assert_eq!(cohort.name(), "dom");
        assert!(cohort.has_property(CRITICAL_IMAGES_PROPERTY_NAME));
        assert!(cohort.has_property(CSS_CRITICAL_IMAGES_PROPERTY_NAME));
    }

    #[test]
    fn test_no_handles_attaches_empty_info() {
        let finder = finder();
        let mut request = request();
        let mut driver = RewriteDriver::new(&mut request);

        assert_eq!(finder.get_html_critical_images(&mut driver), Some(&StringSet::new()));
        assert_eq!(finder.get_css_critical_images(&mut driver), Some(&StringSet::new()));
        assert!(!finder.is_html_critical_image("a.png", &mut driver));
    }

    #[test]
    fn test_set_html_before_load_leaves_css_absent() {
        let finder = finder();
        let mut request = request();
        let mut driver = RewriteDriver::new(&mut request);

        finder.set_html_critical_images(&mut driver, set(&["a.png"]));

        assert!(finder.is_html_critical_image("a.png", &mut driver));
        assert!(finder.get_css_critical_images(&mut driver).is_none());
        assert!(!finder.is_css_critical_image("a.png", &mut driver));
    }

    #[test]
    fn test_setters_preserve_other_side() {
        let finder = finder();
        let mut request = request();
        let mut driver = RewriteDriver::new(&mut request);

        finder.set_css_critical_images(&mut driver, set(&["bg.png"]));
        finder.set_html_critical_images(&mut driver, set(&["hero.jpg"]));

        assert!(finder.is_css_critical_image("bg.png", &mut driver));
        assert!(finder.is_html_critical_image("hero.jpg", &mut driver));
    }

    #[test]
    fn test_setter_overwrites_loaded_side() {
        let finder = finder();
        let mut request = request();
        let mut driver = RewriteDriver::new(&mut request);

        finder.update_critical_images_set_in_driver(&mut driver);
        finder.set_html_critical_images(&mut driver, set(&["late.png"]));

        assert_eq!(finder.get_html_critical_images(&mut driver), Some(&set(&["late.png"])));
        assert_eq!(finder.get_css_critical_images(&mut driver), Some(&StringSet::new()));
    }

    #[test]
    fn test_update_without_handles_is_not_updated() {
        let finder = finder();
        assert!(!finder.update_critical_images_cache_entry(None, None, Some(set(&["a"])), None));
    }

    #[test]
    fn test_update_with_unregistered_cohort_is_not_updated() {
        let finder = finder();
        let backend = Arc::new(InMemoryCache::new());
        let cache = PropertyCache::new(backend.clone(), Arc::new(MockTimer::new(0)));
        let page = PropertyPage::new("/p");

        let updated = finder.update_critical_images_cache_entry(
            Some(&page),
            Some(&cache),
            Some(set(&["a"])),
            Some(set(&["b"])),
        );
        assert!(!updated);
        assert!(backend.is_empty());
    }

    #[test]
    fn test_update_with_nothing_supplied() {
        let finder = finder();
        let mut cache =
            PropertyCache::new(Arc::new(InMemoryCache::new()), Arc::new(MockTimer::new(0)));
        finder.register_cohort(&mut cache);
        let page = PropertyPage::new("/p");

        assert!(!finder.update_critical_images_cache_entry(Some(&page), Some(&cache), None, None));
    }
}
