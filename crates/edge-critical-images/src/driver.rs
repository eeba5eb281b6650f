//! Request view handed to the finder.

use edge_cache::{PropertyCache, PropertyPage};
use edge_core::{CriticalImagesInfo, RequestContext, RewriteOptions};

/// Borrowed view of one page request and the property cache handles it uses.
///
/// The page and cache handles are optional: either may be missing when the
/// property cache is disabled or the page was never looked up.
#[derive(Debug)]
pub struct RewriteDriver<'a> {
    request: &'a mut RequestContext,
    property_page: Option<&'a PropertyPage>,
    page_property_cache: Option<&'a PropertyCache>,
}

impl<'a> RewriteDriver<'a> {
    /// Create a driver with no property cache handles.
    pub fn new(request: &'a mut RequestContext) -> Self {
        Self {
            request,
            property_page: None,
            page_property_cache: None,
        }
    }

    /// Attach the page read for this request.
    pub fn with_property_page(mut self, page: &'a PropertyPage) -> Self {
        self.property_page = Some(page);
        self
    }

    /// Attach the property cache.
    pub fn with_page_property_cache(mut self, cache: &'a PropertyCache) -> Self {
        self.page_property_cache = Some(cache);
        self
    }

    /// The page read for this request.
    pub fn property_page(&self) -> Option<&'a PropertyPage> {
        self.property_page
    }

    /// The property cache.
    pub fn page_property_cache(&self) -> Option<&'a PropertyCache> {
        self.page_property_cache
    }

    /// The underlying request.
    pub fn request(&self) -> &RequestContext {
        self.request
    }

    /// Options in effect for this request.
    pub fn options(&self) -> &RewriteOptions {
        self.request.options()
    }

    /// Whether this is the partial render that flushes the head early.
    pub fn flushing_early(&self) -> bool {
        self.request.flushing_early()
    }

    /// Critical images attached to the request.
    pub fn critical_images_info(&self) -> Option<&CriticalImagesInfo> {
        self.request.critical_images_info()
    }

    pub(crate) fn critical_images_info_mut(&mut self) -> Option<&mut CriticalImagesInfo> {
        self.request.critical_images_info_mut()
    }

    pub(crate) fn set_critical_images_info(&mut self, info: CriticalImagesInfo) {
        self.request.set_critical_images_info(info);
    }
}
