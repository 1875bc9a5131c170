//! Helpers for building and extending the virtual path grammar:
//!
//! ```text
//! virtual_path := rel_path ("::" segment)*
//! segment      := inner_name | layer_id | "json:" dotted_path | "yaml:" dotted_path
//! ```
//!
//! The grammar is otherwise opaque to the traversal; this module only knows
//! how to join the reserved `::` separator and how to render dotted paths
//! for the structured extractor.

/// The reserved archive-nesting separator.
pub const ARCHIVE_SEP: &str = "::";

/// Join a virtual path prefix with the next segment using `::`.
///
/// Used by the archive walker between nested archive hops and by the
/// structured extractor to attach a `json:`/`yaml:` segment.
pub fn join(prefix: &str, segment: &str) -> String {
    format!("{prefix}{ARCHIVE_SEP}{segment}")
}

/// Join a layer path with an in-layer path using `/`, per the container
/// walker's separator rule: `image.tar::sha256abc/etc/passwd`.
pub fn join_layer(layer_prefix: &str, in_layer_path: &str) -> String {
    format!("{layer_prefix}/{in_layer_path}")
}

/// One segment of a dotted path used by the structured extractor: either an
/// object key or an array index.
#[derive(Clone, Debug)]
pub enum PathSeg {
    /// An object key.
    Key(String),
    /// An array index.
    Index(usize),
}

/// Render a sequence of [`PathSeg`] as `key.key[0].key`.
pub fn render_dotted(segments: &[PathSeg]) -> String {
    let mut out = String::new();
    for seg in segments {
        match seg {
            PathSeg::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            PathSeg::Index(idx) => {
                out.push('[');
                out.push_str(&idx.to_string());
                out.push(']');
            }
        }
    }
    out
}
