//! The three public traversal entry points, one per `TraversalKind`.

use std::{
    fs::File,
    path::{Path, PathBuf},
    time::Instant,
};

use tracing::debug;
use walkdir::WalkDir;

use crate::{
    classify::{self, FormatKind},
    error::Error,
    ignore_file::relative_slash_path,
    limits::{Counters, Deadline, Limits, Stats},
    pool,
    sink::{AllowPredicate, Emit, IgnorePredicate},
    structured::{kubeconfig, tfstate, ExtractCtx},
    vpath,
    walk::{self, ArchiveSource, WalkCtx},
};

struct Candidate {
    relative: String,
    absolute: PathBuf,
    format: FormatKind,
}

fn discover(
    root: &Path,
    ignore: &dyn IgnorePredicate,
    allow: Option<&dyn AllowPredicate>,
) -> Result<Vec<Candidate>, Error> {
    if !root.is_dir() {
        debug!("{root:?} is not a usable workspace root");
        return Err(Error::InvalidRoot {
            root: root.to_path_buf(),
        });
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let absolute = entry.path().to_path_buf();
        let relative = relative_slash_path(root, &absolute);

        if ignore.is_ignored(&relative) {
            continue;
        }
        if let Some(allow) = allow {
            if !allow.is_allowed(&relative) {
                continue;
            }
        }

        let format = classify::classify(&relative, &absolute);
        candidates.push(Candidate {
            relative: relative.to_string_lossy().into_owned(),
            absolute,
            format,
        });
    }
    Ok(candidates)
}

/// Walk `root`, processing every archive artifact (zip, tar, tar-gz, gz)
/// that is not itself a container save, across `limits.workers()` worker
/// threads.
pub fn traverse_archives(
    root: &Path,
    limits: &Limits,
    ignore: &dyn IgnorePredicate,
    allow: Option<&dyn AllowPredicate>,
    sink: &dyn Emit,
    stats: &Stats,
) -> Result<(), Error> {
    let candidates: Vec<_> = discover(root, ignore, allow)?
        .into_iter()
        .filter(|candidate| {
            matches!(
                candidate.format,
                FormatKind::Zip | FormatKind::Tar | FormatKind::TarGz | FormatKind::Gz
            )
        })
        .collect();

    debug!("traversing {} archive candidates across {} workers", candidates.len(), limits.workers());
    pool::run(limits.workers(), candidates, |candidate| {
        process_archive(candidate, limits, sink, stats);
    });
    Ok(())
}

/// Walk `root`, processing every container-save tarball. Container-save
/// tarballs are processed serially, not handed to the worker pool.
pub fn traverse_containers(
    root: &Path,
    limits: &Limits,
    ignore: &dyn IgnorePredicate,
    allow: Option<&dyn AllowPredicate>,
    sink: &dyn Emit,
    stats: &Stats,
) -> Result<(), Error> {
    let candidates = discover(root, ignore, allow)?
        .into_iter()
        .filter(|candidate| matches!(candidate.format, FormatKind::ContainerTar));

    for candidate in candidates {
        process_container(candidate, limits, sink, stats);
    }
    Ok(())
}

/// Walk `root`, extracting sensitive fields from Terraform state and
/// kubeconfig files. Processed serially, not handed to the worker pool.
pub fn traverse_iac(
    root: &Path,
    limits: &Limits,
    ignore: &dyn IgnorePredicate,
    allow: Option<&dyn AllowPredicate>,
    sink: &dyn Emit,
    stats: &Stats,
) -> Result<(), Error> {
    let candidates = discover(root, ignore, allow)?
        .into_iter()
        .filter(|candidate| matches!(candidate.format, FormatKind::Tfstate | FormatKind::Kubeconfig));

    for candidate in candidates {
        process_iac(candidate, limits, sink, stats);
    }
    Ok(())
}

fn process_archive(candidate: Candidate, limits: &Limits, sink: &dyn Emit, stats: &Stats) {
    let Ok(file) = File::open(&candidate.absolute) else {
        debug!("skipping {:?}: failed to open", candidate.absolute);
        return;
    };
    let counters = Counters::new(Deadline::from_limits(limits, Instant::now()));
    let ctx = WalkCtx {
        prefix: candidate.relative.clone(),
        sep: vpath::ARCHIVE_SEP,
        depth: 0,
        counters: &counters,
        limits,
        stats,
        sink,
    };
    let _ = walk::archive::walk(candidate.format, ArchiveSource::File(file), &candidate.relative, &ctx);
}

fn process_container(candidate: Candidate, limits: &Limits, sink: &dyn Emit, stats: &Stats) {
    let Ok(file) = File::open(&candidate.absolute) else {
        debug!("skipping {:?}: failed to open", candidate.absolute);
        return;
    };
    let counters = Counters::new(Deadline::from_limits(limits, Instant::now()));
    let ctx = WalkCtx {
        prefix: candidate.relative.clone(),
        sep: "/",
        depth: 0,
        counters: &counters,
        limits,
        stats,
        sink,
    };
    let _ = walk::container::walk(ArchiveSource::File(file), &candidate.relative, &ctx);
}

fn process_iac(candidate: Candidate, limits: &Limits, sink: &dyn Emit, stats: &Stats) {
    let Ok(file) = File::open(&candidate.absolute) else {
        debug!("skipping {:?}: failed to open", candidate.absolute);
        return;
    };
    let counters = Counters::new(Deadline::from_limits(limits, Instant::now()));
    let ctx = ExtractCtx {
        outer_rel: candidate.relative.as_str(),
        counters: &counters,
        limits,
        stats,
        sink,
    };
    let _ = match candidate.format {
        FormatKind::Tfstate => tfstate::extract(file, &ctx),
        FormatKind::Kubeconfig => kubeconfig::extract(file, &ctx),
        _ => unreachable!("filtered to Tfstate | Kubeconfig above"),
    };
}
