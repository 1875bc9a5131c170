//! Component E: the archive walker. Enumerates a zip/tar/tar.gz/gz stream
//! once, recursing into nested archives up to the configured depth cap.

use std::io::{Cursor, Read, Seek};

use flate2::read::GzDecoder;
use tracing::debug;

use crate::{
    classify::{self, FormatKind},
    error::{ArtifactError, BudgetKind},
    text,
};

use super::{ArchiveSource, WalkCtx};

/// What to do after processing one entry.
enum Step {
    /// Keep iterating the current archive.
    Continue,
    /// A guardrail tripped; stop iterating the current archive entirely.
    StopArchive,
}

/// Dispatch to the format-specific walk. `outer_name` is the name of this
/// archive boundary itself (a relative path at the top level, or the inner
/// name that triggered recursion); it is only consulted by the `Gz` branch,
/// whose synthetic entry name falls back to it when no gzip `Name` field is
/// present.
pub fn walk(
    fmt: FormatKind,
    source: ArchiveSource,
    outer_name: &str,
    ctx: &WalkCtx<'_>,
) -> Result<(), ArtifactError> {
    match (fmt, source) {
        (FormatKind::Zip, ArchiveSource::File(file)) => walk_zip_reader(file, ctx),
        (FormatKind::Zip, ArchiveSource::Bytes(bytes)) => walk_zip_reader(Cursor::new(bytes), ctx),
        (FormatKind::Tar, ArchiveSource::File(file)) => walk_tar_reader(file, ctx),
        (FormatKind::Tar, ArchiveSource::Bytes(bytes)) => walk_tar_reader(Cursor::new(bytes), ctx),
        (FormatKind::TarGz, ArchiveSource::File(file)) => walk_tar_reader(GzDecoder::new(file), ctx),
        (FormatKind::TarGz, ArchiveSource::Bytes(bytes)) => {
            walk_tar_reader(GzDecoder::new(Cursor::new(bytes)), ctx)
        }
        (FormatKind::Gz, ArchiveSource::File(file)) => walk_gz_single(file, outer_name, ctx),
        (FormatKind::Gz, ArchiveSource::Bytes(bytes)) => {
            walk_gz_single(Cursor::new(bytes), outer_name, ctx)
        }
        _ => Ok(()),
    }
}

fn walk_zip_reader<R: Read + Seek>(reader: R, ctx: &WalkCtx<'_>) -> Result<(), ArtifactError> {
    let mut archive = match zip::ZipArchive::new(reader) {
        Ok(archive) => archive,
        Err(_) => return Err(ArtifactError::Malformed("zip")),
    };

    for i in 0..archive.len() {
        if let Some(kind) = ctx.counters.check(ctx.limits, ctx.depth) {
            debug!("aborting {}: {kind:?} budget exceeded", ctx.prefix);
            ctx.stats.record(kind);
            break;
        }

        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();

        match handle_entry(&name, &mut entry, ctx)? {
            Step::Continue => continue,
            Step::StopArchive => break,
        }
    }
    Ok(())
}

fn walk_tar_reader<R: Read>(reader: R, ctx: &WalkCtx<'_>) -> Result<(), ArtifactError> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive.entries()?;

    for entry in entries {
        if let Some(kind) = ctx.counters.check(ctx.limits, ctx.depth) {
            debug!("aborting {}: {kind:?} budget exceeded", ctx.prefix);
            ctx.stats.record(kind);
            break;
        }

        let mut entry = match entry {
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
        if name.ends_with('/') || name.ends_with('\\') {
            continue;
        }

        match handle_entry(&name, &mut entry, ctx)? {
            Step::Continue => continue,
            Step::StopArchive => break,
        }
    }
    Ok(())
}

fn walk_gz_single<R: Read>(
    reader: R,
    outer_name: &str,
    ctx: &WalkCtx<'_>,
) -> Result<(), ArtifactError> {
    if let Some(kind) = ctx.counters.check(ctx.limits, ctx.depth) {
        ctx.stats.record(kind);
        return Ok(());
    }

    let mut decoder = GzDecoder::new(reader);
    let blob = match crate::bounded::read_all_bounded(&mut decoder, ctx.counters, ctx.limits) {
        Ok(blob) => blob,
        Err(ArtifactError::Io(_)) => return Ok(()),
        Err(ArtifactError::BudgetExceeded(kind)) => {
            ctx.stats.record(kind);
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let inner_name = decoder
        .header()
        .and_then(|header| header.filename())
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .unwrap_or_else(|| strip_gz_suffix(outer_name));

    finish_entry(&inner_name, blob, ctx)
}

/// Read one entry's payload, then apply the text heuristic and either emit
/// it, recurse into it as a nested archive, or drop it.
fn handle_entry(inner_name: &str, reader: impl Read, ctx: &WalkCtx<'_>) -> Result<Step, ArtifactError> {
    let blob = match crate::bounded::read_all_bounded(reader, ctx.counters, ctx.limits) {
        Ok(blob) => blob,
        Err(ArtifactError::Io(_)) => return Ok(Step::Continue),
        Err(ArtifactError::BudgetExceeded(kind)) => {
            ctx.stats.record(kind);
            return Ok(Step::StopArchive);
        }
        Err(err) => return Err(err),
    };

    finish_entry(inner_name, blob, ctx)?;
    Ok(Step::Continue)
}

fn finish_entry(inner_name: &str, blob: Vec<u8>, ctx: &WalkCtx<'_>) -> Result<(), ArtifactError> {
    if text::is_texty(inner_name, &blob) {
        let vpath = format!("{}{}{}", ctx.prefix, ctx.sep, inner_name);
        ctx.sink.emit(&vpath, &blob);
        ctx.counters.record_entry();
        return Ok(());
    }

    if classify::is_archive_suffix(inner_name) {
        let declined = matches!(ctx.limits.max_depth(), Some(max) if ctx.depth + 1 > max);
        if declined {
            debug!("declining to recurse into {inner_name}: recursion limit reached");
            ctx.stats.record(BudgetKind::Depth);
        } else {
            let nested_fmt = classify::classify_name(inner_name);
            let nested_ctx = ctx.nested(inner_name);
            // A malformed nested archive (or an I/O failure opening it) is
            // confined to this one entry, per spec.md §7's MalformedStream
            // policy: drop it and keep walking the rest of the containing
            // archive rather than escalating past this call.
            if let Err(err) = walk(nested_fmt, ArchiveSource::Bytes(blob), inner_name, &nested_ctx) {
                debug!("dropping malformed nested archive {inner_name}: {err}");
            }
        }
    }

    Ok(())
}

fn strip_gz_suffix(name: &str) -> String {
    if name.len() >= 3 && name[name.len() - 3..].eq_ignore_ascii_case(".gz") {
        name[..name.len() - 3].to_string()
    } else {
        name.to_string()
    }
}
