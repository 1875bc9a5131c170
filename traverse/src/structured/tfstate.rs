//! Terraform state (JSON) sensitive-field extraction.

use std::fs::File;

use serde_json::Value;
use tracing::debug;

use crate::{
    bounded,
    error::ArtifactError,
    vpath::{self, PathSeg},
};

use super::{emission_budget_tripped, emit_whole_file, ExtractCtx};

/// Files above this size skip structured parsing entirely and fall back to
/// a whole-file emission.
const SIZE_CAP: u64 = 2 * 1024 * 1024;

const SENSITIVE_KEYS: &[&str] = &[
    "token",
    "password",
    "secret",
    "client_secret",
    "access_key",
    "secret_key",
    "api_key",
    "private_key",
    "bearer_token",
    "auth_token",
    "refresh_token",
    "cert",
    "certificate",
    "key",
];

const SENSITIVE_SUBSTRINGS: &[&str] = &[
    "password",
    "secret",
    "token",
    "apikey",
    "accesskey",
    "privatekey",
    "client_secret",
    "bearer",
    "certificate",
];

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|k| lower.eq_ignore_ascii_case(k))
        || SENSITIVE_SUBSTRINGS.iter().any(|s| lower.contains(s))
}

/// Read `file` through the bounded reader; if it's at or below 2 MiB, parse
/// as JSON and walk it emitting sensitive fields, otherwise (or on a parse
/// failure) fall back to emitting the whole file once.
pub fn extract(mut file: File, ctx: &ExtractCtx<'_>) -> Result<(), ArtifactError> {
    let size = file.metadata().map(|meta| meta.len()).unwrap_or(u64::MAX);

    let blob = match bounded::read_all_bounded(&mut file, ctx.counters, ctx.limits) {
        Ok(blob) => blob,
        Err(ArtifactError::BudgetExceeded(kind)) => {
            ctx.stats.record(kind);
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    if size > SIZE_CAP {
        debug!("{}: {size} bytes exceeds the tfstate size cap, emitting whole file", ctx.outer_rel);
        emit_whole_file(ctx, &blob);
        return Ok(());
    }

    match serde_json::from_slice::<Value>(&blob) {
        Ok(value) => {
            let mut path = Vec::new();
            let mut aborted = false;
            walk_value(&value, &mut path, ctx, &mut aborted);
        }
        Err(_) => {
            debug!("{}: not valid JSON, emitting whole file", ctx.outer_rel);
            emit_whole_file(ctx, &blob);
        }
    }
    Ok(())
}

fn walk_value(value: &Value, path: &mut Vec<PathSeg>, ctx: &ExtractCtx<'_>, aborted: &mut bool) {
    if *aborted {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if *aborted {
                    return;
                }
                path.push(PathSeg::Key(key.clone()));
                if is_sensitive_key(key) {
                    emit_sensitive_field(child, path, ctx, aborted);
                }
                if !*aborted {
                    walk_value(child, path, ctx, aborted);
                }
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                if *aborted {
                    return;
                }
                path.push(PathSeg::Index(index));
                walk_value(item, path, ctx, aborted);
                path.pop();
            }
        }
        _ => {}
    }
}

fn emit_sensitive_field(value: &Value, path: &[PathSeg], ctx: &ExtractCtx<'_>, aborted: &mut bool) {
    if let Some(kind) = emission_budget_tripped(ctx.counters, ctx.limits) {
        ctx.stats.record(kind);
        *aborted = true;
        return;
    }

    match value {
        Value::String(text) => emit_field(path, text, ctx),
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("value") {
                let mut value_path = path.to_vec();
                value_path.push(PathSeg::Key("value".to_string()));
                emit_field(&value_path, text, ctx);
            }
        }
        _ => {}
    }
}

fn emit_field(path: &[PathSeg], value: &str, ctx: &ExtractCtx<'_>) {
    let dotted = vpath::render_dotted(path);
    let virtual_path = vpath::join(ctx.outer_rel, &format!("json:{dotted}"));
    let body = format!("{dotted}: {value}");
    ctx.sink.emit(&virtual_path, body.as_bytes());
    ctx.counters.record_entry();
}
