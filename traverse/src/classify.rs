//! Component B: format classification from a path (and, for the tar/
//! container distinction, a header-only sniff of the file).

use std::{
    fs::File,
    io::{self, Seek, SeekFrom},
    path::Path,
};

/// The recognized artifact categories, a tagged variant over file formats.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[non_exhaustive]
pub enum FormatKind {
    /// PKZIP archive.
    Zip,
    /// Plain POSIX tar, not a container save.
    Tar,
    /// Gzip-wrapped tar (`.tar.gz`/`.tgz`).
    TarGz,
    /// Single-file gzip member.
    Gz,
    /// A Docker-save tarball: outer tar with `manifest.json` and/or
    /// `<layer-id>/layer.tar` entries.
    ContainerTar,
    /// Terraform state JSON.
    Tfstate,
    /// Kubernetes client configuration YAML.
    Kubeconfig,
    /// Not a recognized artifact.
    None,
}

/// Classify `relative_path` by extension, sniffing `absolute_path`'s tar
/// headers only when the extension is ambiguous (`.tar`).
///
/// Never consumes bytes the walker would later need: the sniff reads only
/// the outer tar's headers, and the caller reopens a fresh handle for the
/// real pass.
pub fn classify(relative_path: &Path, absolute_path: &Path) -> FormatKind {
    let lower = relative_path.to_string_lossy().to_lowercase();

    if lower.ends_with(".zip") {
        return FormatKind::Zip;
    }
    if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
        return FormatKind::TarGz;
    }
    if lower.ends_with(".tfstate") {
        return FormatKind::Tfstate;
    }
    if lower.ends_with(".kubeconfig") || has_kube_config_component(&lower) {
        return FormatKind::Kubeconfig;
    }
    if lower.ends_with(".tar") {
        return match sniff_container_tar(absolute_path) {
            Ok(true) => FormatKind::ContainerTar,
            _ => FormatKind::Tar,
        };
    }
    if lower.ends_with(".gz") {
        return FormatKind::Gz;
    }
    FormatKind::None
}

/// Classify a nested entry by its inner name only (no file to sniff), used
/// by the archive walker's recursion step and the container walker. Entries never sniff as `ContainerTar` from a name alone; that
/// determination requires reading headers, which nested archive recursion
/// does separately if needed.
pub fn classify_name(inner_name: &str) -> FormatKind {
    let lower = inner_name.to_lowercase();
    if lower.ends_with(".zip") {
        FormatKind::Zip
    } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
        FormatKind::TarGz
    } else if lower.ends_with(".tar") {
        FormatKind::Tar
    } else if lower.ends_with(".gz") {
        FormatKind::Gz
    } else {
        FormatKind::None
    }
}

/// Whether `classify_name` would treat `inner_name` as a nested archive.
pub fn is_archive_suffix(inner_name: &str) -> bool {
    !matches!(classify_name(inner_name), FormatKind::None)
}

fn has_kube_config_component(lower_path: &str) -> bool {
    let normalized = lower_path.replace('\\', "/");
    normalized
        .split('/')
        .collect::<Vec<_>>()
        .windows(2)
        .any(|pair| pair == [".kube", "config"])
}

/// Read only the outer tar's headers (no payload) to decide whether it's a
/// container save tarball: a `manifest.json` at the root, or any entry
/// ending in `/layer.tar` (or `\layer.tar`, for cross-platform producers).
fn sniff_container_tar(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut archive = tar::Archive::new(&mut file);
    for entry in archive.entries_with_seek()? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        let name = entry.path()?.to_string_lossy().into_owned();
        let normalized = name.replace('\\', "/");
        if normalized == "manifest.json" || normalized.ends_with("/layer.tar") {
            return Ok(true);
        }
    }
    file.seek(SeekFrom::Start(0))?;
    Ok(false)
}
