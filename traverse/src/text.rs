//! Component D: the text/binary heuristic used to decide whether a
//! decompressed blob is eligible to be emitted.

const SNIFF_WINDOW: usize = 800;
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const BINARY_EXTENSIONS: [&str; 7] = [".png", ".jpg", ".jpeg", ".gif", ".pdf", ".webp", ".ico"];

/// Whether a blob named `inner_name` is eligible to be emitted as text.
pub fn is_texty(inner_name: &str, blob: &[u8]) -> bool {
    let window = &blob[..blob.len().min(SNIFF_WINDOW)];
    if window.contains(&0u8) {
        return false;
    }

    let lower = inner_name.to_lowercase();
    if BINARY_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return false;
    }

    if blob.starts_with(&PNG_MAGIC) {
        return false;
    }

    if blob.starts_with(b"PK") {
        return false;
    }

    true
}
