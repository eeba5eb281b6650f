//! Configuration management commands.

use anyhow::Result;

use super::{ConfigArgs, ConfigCommand};
use crate::config::generate_default_config;
use crate::context::Context;

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init => init_config(ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Current Configuration");

    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    let options = &ctx.config.options;
    ctx.output.info("");
    ctx.output.info("[options]");
    ctx.output.kv(
        "finder_properties_cache_expiration_time_ms",
        &options.finder_properties_cache_expiration_time_ms.to_string(),
    );
    ctx.output.kv(
        "finder_properties_cache_refresh_time_ms",
        &options.finder_properties_cache_refresh_time_ms.to_string(),
    );
    ctx.output
        .kv("critical_images_cohort", &options.critical_images_cohort);

    Ok(())
}

fn init_config(ctx: &Context) -> Result<()> {
    ctx.output.raw(&generate_default_config());
    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let options = &ctx.config.options;
    options.validate()?;

    if options.finder_properties_cache_refresh_time_ms
        > options.finder_properties_cache_expiration_time_ms
    {
        ctx.output.warn(
            "finder_properties_cache_refresh_time_ms exceeds the expiration time; \
             properties will expire before they are refreshed",
        );
    }

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({ "valid": true }));
    } else {
        ctx.output.success("Configuration is valid");
    }

    Ok(())
}
