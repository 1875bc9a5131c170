//! Component F: the container (Docker-save) walker. Iterates an outer tar
//! whose entries are `manifest.json` and per-layer `<layer-id>/layer.tar`
//! inner tars, walking each layer's tar directly without an intermediate
//! buffering step (a `tar::Entry` already self-limits reads to its header's
//! declared size).

use std::io::Read;

use tracing::debug;

use crate::{
    classify::FormatKind,
    error::ArtifactError,
    vpath,
};

use super::{archive, ArchiveSource, WalkCtx};

/// Walk a container save tarball opened as `source`. Entries other than
/// `<layer-id>/layer.tar` (the manifest, repositories file, config blobs)
/// are not themselves archives under this format and are skipped; each
/// layer tar is walked as an ordinary tar starting at depth 1, using `/`
/// to join in-layer paths rather than `::`.
pub fn walk(source: ArchiveSource, outer_name: &str, ctx: &WalkCtx<'_>) -> Result<(), ArtifactError> {
    match source {
        ArchiveSource::File(file) => walk_reader(file, outer_name, ctx),
        ArchiveSource::Bytes(bytes) => walk_reader(std::io::Cursor::new(bytes), outer_name, ctx),
    }
}

fn walk_reader<R: Read>(reader: R, outer_name: &str, ctx: &WalkCtx<'_>) -> Result<(), ArtifactError> {
    let mut outer = tar::Archive::new(reader);
    let entries = outer.entries()?;

    for entry in entries {
        if let Some(kind) = ctx.counters.check(ctx.limits, ctx.depth) {
            ctx.stats.record(kind);
            break;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        if entry.header().entry_type().is_dir() {
            continue;
        }
        let name = match entry.path() {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(_) => continue,
        };
        let normalized = name.replace('\\', "/");
        let Some(layer_id) = layer_id(&normalized) else {
            continue;
        };

        let layer_ctx = WalkCtx {
            prefix: vpath::join(outer_name, layer_id),
            sep: "/",
            depth: ctx.depth + 1,
            counters: ctx.counters,
            limits: ctx.limits,
            stats: ctx.stats,
            sink: ctx.sink,
        };

        let layer_bytes = match read_entry(entry) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!("skipping unreadable layer {layer_id} in {outer_name}: {err}");
                continue;
            }
        };
        // An unreadable or malformed layer is confined to that one layer,
        // per spec.md §7's MalformedStream policy: the rest of this
        // container tarball's layers still get walked.
        if let Err(err) = archive::walk(FormatKind::Tar, ArchiveSource::Bytes(layer_bytes), &normalized, &layer_ctx) {
            debug!("dropping malformed layer {layer_id} in {outer_name}: {err}");
        }
    }
    Ok(())
}

fn layer_id(normalized_path: &str) -> Option<&str> {
    normalized_path.strip_suffix("/layer.tar").and_then(|prefix| {
        if prefix.is_empty() || prefix.contains('/') {
            None
        } else {
            Some(prefix)
        }
    })
}

fn read_entry(mut entry: tar::Entry<'_, impl Read>) -> Result<Vec<u8>, ArtifactError> {
    let mut buf = Vec::new();
    entry
        .read_to_end(&mut buf)
        .map_err(ArtifactError::Io)?;
    Ok(buf)
}
