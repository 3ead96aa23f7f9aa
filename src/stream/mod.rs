mod input;
mod output;

pub use input::InputStream;
pub use output::OutputStream;

use crate::error::{Error, Result};

/// Fallible zeroed allocation for conversion buffers; surfaces
/// `AllocationFailed` instead of aborting on exhaustion.
pub(crate) fn alloc_buffer(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::AllocationFailed(len))?;
    buf.resize(len, 0);
    Ok(buf)
}
