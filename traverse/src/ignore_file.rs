//! Component A: the ignore predicate, loaded from `<root>/.redactylignore`.
//!
//! The loader's contract is narrow: map a workspace-relative path to a
//! boolean "excluded". Grammar (gitignore-style, one pattern per line) is
//! the `ignore` crate's concern, not ours; callers of this module only see
//! the boolean predicate.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::{sink::IgnorePredicate, Error};

/// The name of the ignore file consulted at a workspace root.
pub const IGNORE_FILE_NAME: &str = ".redactylignore";

/// A loaded ignore predicate backed by a `.redactylignore` file.
///
/// An absent file yields a predicate that excludes nothing.
pub struct WorkspaceIgnore {
    matcher: Gitignore,
}

impl WorkspaceIgnore {
    /// Load the ignore file at `root`'s `.redactylignore`, if present.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(IGNORE_FILE_NAME);
        if !path.is_file() {
            return Ok(Self {
                matcher: Gitignore::empty(),
            });
        }

        let mut builder = GitignoreBuilder::new(root);
        if let Some(error) = builder.add(&path) {
            return Err(Error::IgnoreFile { path, error });
        }
        let matcher = builder
            .build()
            .map_err(|error| Error::IgnoreFile { path, error })?;
        Ok(Self { matcher })
    }

    /// An ignore predicate that excludes nothing, used by callers that don't
    /// need workspace-relative ignore semantics (e.g. isolated unit tests).
    pub fn accept_all() -> Self {
        Self {
            matcher: Gitignore::empty(),
        }
    }
}

impl IgnorePredicate for WorkspaceIgnore {
    fn is_ignored(&self, relative_path: &Path) -> bool {
        self.matcher
            .matched(relative_path, false)
            .is_ignore()
    }
}

/// Normalize a path to a forward-slash-separated relative path string, the
/// leftmost segment of a virtual path.
pub fn relative_slash_path(root: &Path, absolute: &Path) -> PathBuf {
    let relative = absolute.strip_prefix(root).unwrap_or(absolute);
    PathBuf::from(relative.to_string_lossy().replace('\\', "/"))
}
