use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use fundfaq_core::Result;

/// Write `bytes` to `dir/file_name` through a temp file in the same directory,
/// so readers see either the previous file or the complete new one.
pub fn write_atomic(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let target = dir.join(file_name);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&target).map_err(|e| e.error)?;
    debug!(path = %target.display(), bytes = bytes.len(), "wrote artifact");
    Ok(target)
}
