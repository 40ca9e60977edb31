//! Raw file loading.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::{ResourceError, ResourceResult};

/// Reads a whole file into memory.
///
/// A missing file is reported as [`ResourceError::FileNotFound`]; every other
/// I/O failure as [`ResourceError::Io`].
pub fn read_bytes(path: impl AsRef<Path>) -> ResourceResult<Vec<u8>> {
    let path = path.as_ref();

    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ResourceError::FileNotFound(path.to_path_buf()),
        _ => ResourceError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Reads SPIR-V bytecode. An empty file is an error.
pub fn read_shader_bytes(path: impl AsRef<Path>) -> ResourceResult<Vec<u8>> {
    let path = path.as_ref();
    let bytes = read_bytes(path)?;

    if bytes.is_empty() {
        return Err(ResourceError::EmptyFile(path.to_path_buf()));
    }

    Ok(bytes)
}
