//! Simulate a page request against a fixture property cache.

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use edge_cache::{InMemoryCache, MockTimer, PropertyCache, PropertyPage};
use edge_core::{RequestContext, RewriteOptions};
use edge_critical_images::{
    CriticalImagesFinder, ExtractOutcome, RewriteDriver, StringSet, CRITICAL_IMAGES_PROPERTY_NAME,
    CSS_CRITICAL_IMAGES_PROPERTY_NAME,
};
use edge_observability::{InMemoryStatistics, Statistics, StatisticsSnapshot};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SimulateArgs;
use crate::context::Context;
use crate::output::outcome_badge;

/// Stored state of one critical image property.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredSide {
    /// Image URLs stored for this side.
    #[serde(default)]
    pub images: Vec<String>,
    /// When the property was written (milliseconds).
    pub written_at_ms: i64,
}

/// Fixture describing a page's stored properties and the request to run.
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    /// Page key.
    #[serde(default = "default_page")]
    pub page: String,
    /// Time at which the request runs (milliseconds).
    pub now_ms: i64,
    /// Whether the request is the early-flush partial render.
    #[serde(default)]
    pub flushing_early: bool,
    /// TTL override for this fixture.
    #[serde(default)]
    pub ttl_ms: Option<i64>,
    /// Markup-derived images, if stored.
    #[serde(default)]
    pub html: Option<StoredSide>,
    /// Stylesheet-derived images, if stored.
    #[serde(default)]
    pub css: Option<StoredSide>,
}

fn default_page() -> String {
    "https://example.com/".to_string()
}

impl Fixture {
    /// Parse a fixture from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse fixture")
    }
}

/// Membership of one probed URL.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub url: String,
    pub html: bool,
    pub css: bool,
}

/// Outcome of a simulated request.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub page: String,
    pub ttl_ms: i64,
    pub flushing_early: bool,
    pub html_outcome: &'static str,
    pub css_outcome: &'static str,
    pub html_critical_images: Option<StringSet>,
    pub css_critical_images: Option<StringSet>,
    pub probes: Vec<ProbeResult>,
    pub counters: StatisticsSnapshot,
}

/// Run the simulate command.
pub fn run(args: SimulateArgs, ctx: &Context) -> Result<()> {
    let path = ctx.resolve_path(&args.fixture);
    ctx.output.debug(&format!("Loading fixture {}", path.display()));
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read fixture: {}", path.display()))?;
    let fixture = Fixture::from_toml_str(&content)?;

    let mut options = ctx.config.options.clone();
    if let Some(ttl_ms) = args.ttl_ms.or(fixture.ttl_ms) {
        options.finder_properties_cache_expiration_time_ms = ttl_ms;
    }
    options.validate()?;

    let report = simulate(&fixture, options, &args.probe)?;

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    print_report(&report, ctx);
    Ok(())
}

/// Seed a fresh property cache from `fixture` and run one request through it.
pub fn simulate(
    fixture: &Fixture,
    options: RewriteOptions,
    probes: &[String],
) -> Result<SimulationReport> {
    let stats = InMemoryStatistics::new();
    CriticalImagesFinder::init_stats(&stats);
    let finder = CriticalImagesFinder::from_options(&stats, &options)?;

    let timer = Arc::new(MockTimer::new(fixture.now_ms));
    let mut cache = PropertyCache::new(Arc::new(InMemoryCache::new()), timer.clone());
    finder.register_cohort(&mut cache);

    for (side, is_html) in [(&fixture.html, true), (&fixture.css, false)] {
        let Some(stored) = side else {
            continue;
        };
        timer.set_time_ms(stored.written_at_ms);
        let page = PropertyPage::new(&fixture.page);
        cache.read(&page);

        let images: StringSet = stored.images.iter().cloned().collect();
        let (html, css) = if is_html {
            (Some(images), None)
        } else {
            (None, Some(images))
        };
        if !finder.update_critical_images_cache_entry(Some(&page), Some(&cache), html, css) {
            bail!("Failed to seed stored critical images for {}", fixture.page);
        }
        debug!(
            page = %fixture.page,
            html = is_html,
            written_at_ms = stored.written_at_ms,
            "Seeded stored critical images"
        );
    }

    timer.set_time_ms(fixture.now_ms);
    let page = PropertyPage::new(&fixture.page);
    cache.read(&page);

    let ttl_ms = options.finder_properties_cache_expiration_time_ms();
    let cohort = cache
        .get_cohort(finder.critical_images_cohort())
        .context("Critical images cohort is not registered")?;
    let html_outcome = ExtractOutcome::classify(
        &cache,
        &page.get_property(cohort, CRITICAL_IMAGES_PROPERTY_NAME),
        ttl_ms,
    )
    .label();
    let css_outcome = ExtractOutcome::classify(
        &cache,
        &page.get_property(cohort, CSS_CRITICAL_IMAGES_PROPERTY_NAME),
        ttl_ms,
    )
    .label();

    let mut request = RequestContext::new(fixture.page.clone(), Arc::new(options));
    request.set_flushing_early(fixture.flushing_early);
    let mut driver = RewriteDriver::new(&mut request)
        .with_property_page(&page)
        .with_page_property_cache(&cache);

    finder.update_critical_images_set_in_driver(&mut driver);
    let probes = probes
        .iter()
        .map(|url| ProbeResult {
            url: url.clone(),
            html: finder.is_html_critical_image(url, &mut driver),
            css: finder.is_css_critical_image(url, &mut driver),
        })
        .collect();

    let info = driver.critical_images_info().cloned();
    Ok(SimulationReport {
        page: fixture.page.clone(),
        ttl_ms,
        flushing_early: fixture.flushing_early,
        html_outcome,
        css_outcome,
        html_critical_images: info.as_ref().and_then(|i| i.html_critical_images.clone()),
        css_critical_images: info.and_then(|i| i.css_critical_images),
        probes,
        counters: stats.snapshot(),
    })
}

fn print_report(report: &SimulationReport, ctx: &Context) {
    ctx.output.header(&format!("Request for {}", report.page));
    ctx.output.kv("ttl_ms", &report.ttl_ms.to_string());
    ctx.output
        .kv("flushing_early", &report.flushing_early.to_string());

    for (label, outcome, images) in [
        ("html", report.html_outcome, &report.html_critical_images),
        ("css", report.css_outcome, &report.css_critical_images),
    ] {
        ctx.output.header(&format!("{} critical images", label));
        ctx.output.kv("stored", &outcome_badge(outcome));
        match images {
            Some(images) if images.is_empty() => ctx.output.info("(empty)"),
            Some(images) => images.iter().for_each(|url| ctx.output.list_item(url)),
            None => ctx.output.kv("loaded", &outcome_badge("absent")),
        }
    }

    if !report.probes.is_empty() {
        ctx.output.header("Probes");
        for probe in &report.probes {
            ctx.output.kv(
                &probe.url,
                &format!("html={} css={}", probe.html, probe.css),
            );
        }
    }

    ctx.output.header("Counters");
    for (name, value) in &report.counters.variables {
        ctx.output.kv(name, &value.to_string());
    }

    if report.flushing_early {
        ctx.output
            .warn("Flushing early: reads were not counted");
    }
    ctx.output.success("Simulation complete");
}
