//! Git delta application.
//!
//! A delta is two LEB128 sizes (base, result) followed by copy and insert
//! instructions. Copy instructions take an offset and size from the base;
//! insert instructions carry literal bytes.

use crate::error::{DumpError, Result};
use crate::object::{MAX_OBJECT_SIZE, PREALLOC_LIMIT};

/// A zero copy size encodes 0x10000.
const DEFAULT_COPY_SIZE: usize = 0x10000;

/// Applies `delta` to `base` and returns the reconstructed object.
///
/// # Errors
///
/// Returns `DumpError::Decode` if the base size does not match, an
/// instruction runs past either buffer, or the output size differs from the
/// size declared in the delta header.
pub fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let mut pos = 0usize;
    let base_size = read_size(delta, &mut pos)?;
    let result_size = read_size(delta, &mut pos)?;

    if base_size != base.len() {
        return Err(DumpError::decode(
            "delta",
            format!("base size {} does not match header {base_size}", base.len()),
        ));
    }

    if result_size > MAX_OBJECT_SIZE {
        return Err(DumpError::decode(
            "delta",
            format!("result size {result_size} exceeds limit {MAX_OBJECT_SIZE}"),
        ));
    }

    let mut out = Vec::with_capacity(result_size.min(PREALLOC_LIMIT));
    while pos < delta.len() {
        let cmd = delta[pos];
        pos += 1;

        if cmd & 0x80 != 0 {
            let (offset, size) = copy_params(delta, &mut pos, cmd)?;
            let chunk = offset
                .checked_add(size)
                .and_then(|end| base.get(offset..end))
                .ok_or_else(|| DumpError::decode("delta", "copy out of range"))?;
            out.extend_from_slice(chunk);
        } else if cmd != 0 {
            let size = cmd as usize;
            let chunk = delta
                .get(pos..pos + size)
                .ok_or_else(|| DumpError::decode("delta", "insert runs past end"))?;
            out.extend_from_slice(chunk);
            pos += size;
        } else {
            return Err(DumpError::decode("delta", "reserved instruction 0"));
        }

        if out.len() > result_size {
            return Err(DumpError::decode("delta", "output overrun"));
        }
    }

    if out.len() != result_size {
        return Err(DumpError::decode(
            "delta",
            format!("result size {} does not match header {result_size}", out.len()),
        ));
    }

    Ok(out)
}

fn read_size(delta: &[u8], pos: &mut usize) -> Result<usize> {
    let mut value = 0usize;
    let mut shift = 0u32;

    loop {
        let byte = *delta
            .get(*pos)
            .ok_or_else(|| DumpError::decode("delta", "truncated header"))?;
        *pos += 1;

        if shift > 56 {
            return Err(DumpError::decode("delta", "size overflow"));
        }
        value |= ((byte & 0x7f) as usize) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
}

/// Offset bytes are selected by bits 0-3, size bytes by bits 4-6, both
/// little-endian.
fn copy_params(delta: &[u8], pos: &mut usize, cmd: u8) -> Result<(usize, usize)> {
    let mut offset = 0usize;
    let mut size = 0usize;

    for bit in 0..7 {
        if cmd & (1 << bit) == 0 {
            continue;
        }
        let byte = *delta
            .get(*pos)
            .ok_or_else(|| DumpError::decode("delta", "truncated copy instruction"))?
            as usize;
        *pos += 1;

        if bit < 4 {
            offset |= byte << (8 * bit);
        } else {
            size |= byte << (8 * (bit - 4));
        }
    }

    if size == 0 {
        size = DEFAULT_COPY_SIZE;
    }
    Ok((offset, size))
}
