//! Component C: a bounded reader that copies from a sub-stream while
//! charging a shared byte budget and checking a deadline.

use std::io::{ErrorKind, Read};

use crate::{
    error::{ArtifactError, BudgetKind},
    limits::{Counters, Deadline, Limits},
};

const CHUNK_SIZE: usize = 32 * 1024;

/// Copy `stream` into a fresh buffer in 32 KiB chunks, charging each chunk's
/// actual byte count to `counters` before deciding whether to read another.
///
/// The deadline is checked before each chunk, ahead of the charge. EOF and
/// "unexpected EOF" are normal termination; any other I/O error is reported
/// as [`ArtifactError::Io`].
pub fn read_all_bounded(
    mut stream: impl Read,
    counters: &Counters,
    limits: &Limits,
) -> Result<Vec<u8>, ArtifactError> {
    let mut buf = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        if counters.deadline().expired() {
            return Err(ArtifactError::BudgetExceeded(BudgetKind::Time));
        }

        let read = match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(ArtifactError::Io(err)),
        };

        buf.extend_from_slice(&chunk[..read]);
        counters.charge_bytes(read as u64);

        if let Some(max) = limits.max_decompressed_bytes() {
            if counters.decompressed() >= max {
                return Err(ArtifactError::BudgetExceeded(BudgetKind::Bytes));
            }
        }
    }

    Ok(buf)
}
