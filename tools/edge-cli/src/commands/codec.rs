//! Encode and decode stored critical image values.

use std::io::Read;

use anyhow::{Context as _, Result};
use edge_critical_images::{decode_critical_images, encode_critical_images, StringSet};
use serde::Serialize;

use super::{DecodeArgs, EncodeArgs};
use crate::context::Context;
use crate::output::{escape_value, unescape_value};

#[derive(Serialize)]
struct EncodeReport<'a> {
    count: usize,
    value: &'a str,
}

#[derive(Serialize)]
struct DecodeReport<'a> {
    count: usize,
    images: &'a StringSet,
}

/// Run the encode command.
pub fn encode(args: EncodeArgs, ctx: &Context) -> Result<()> {
    let images: StringSet = args.urls.into_iter().collect();
    let encoded = encode_critical_images(&images);
    ctx.output
        .debug(&format!("Encoded {} image(s) into {} bytes", images.len(), encoded.len()));

    if ctx.output.is_json() {
        ctx.output.json(&EncodeReport {
            count: images.len(),
            value: &encoded,
        });
    } else if args.escape {
        ctx.output.raw(&escape_value(&encoded));
    } else {
        ctx.output.raw(&encoded);
    }

    Ok(())
}

/// Run the decode command.
pub fn decode(args: DecodeArgs, ctx: &Context) -> Result<()> {
    let raw = match args.value {
        Some(value) => value,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read value from stdin")?;
            buf
        }
    };
    let raw = if args.escaped {
        unescape_value(&raw)
    } else {
        raw
    };

    let images = decode_critical_images(&raw);

    if ctx.output.is_json() {
        ctx.output.json(&DecodeReport {
            count: images.len(),
            images: &images,
        });
        return Ok(());
    }

    if images.is_empty() {
        ctx.output.info("No critical images");
    }
    for url in &images {
        ctx.output.list_item(url);
    }

    Ok(())
}
