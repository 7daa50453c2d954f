//! NUL-terminated string reading.

use crate::error::{Error, Result};
use std::io::BufRead;

/// Terminator for embedded C strings
const NUL: u8 = 0x00;

/// Read a NUL-terminated string from the current position of `reader`.
///
/// Consumes bytes up to and including the terminator, or up to end-of-stream
/// if there is none, and decodes the bytes before it as UTF-8. `offset` is
/// only used to label errors.
pub fn read_c_string<R: BufRead + ?Sized>(reader: &mut R, offset: u64) -> Result<String> {
    let mut bytes = Vec::new();
    reader
        .read_until(NUL, &mut bytes)
        .map_err(|e| Error::io(offset, e))?;

    if bytes.last() == Some(&NUL) {
        bytes.pop();
    }

    String::from_utf8(bytes).map_err(|e| Error::invalid_utf8(offset, e))
}
