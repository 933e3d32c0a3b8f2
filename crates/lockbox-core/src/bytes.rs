//! Constant-time comparison and bounds-checked slicing.

use subtle::ConstantTimeEq;

/// Compare two byte strings without leaking where they differ.
///
/// Length is compared first (lengths are public for every use in this
/// library: MAC and digest sizes are fixed); the content comparison never
/// early-exits on a mismatched byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Bounds-checked subslice: `None` when the requested range runs past the
/// end of the buffer, never a truncated result.
pub fn checked_slice(buf: &[u8], start: usize, len: usize) -> Option<&[u8]> {
    let end = start.checked_add(len)?;
    buf.get(start..end)
}
