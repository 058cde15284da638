//! Common utilities shared across modules.

use std::io;
use std::path::Path;

/// Check that `path` exists and is a directory.
pub fn validate_directory(path: &Path) -> io::Result<()> {
    let meta = std::fs::metadata(path)?;
    if !meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a directory", path.display()),
        ));
    }
    Ok(())
}
