//! In-place file replacement.
//!
//! The original file is never truncated: the edited text goes to a temporary
//! file in the same directory, which takes over the original's mode and
//! ownership and is renamed over it.
use std::fs;
use std::io::Write;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

pub fn replace_file(path: &Path, text: &str) -> Result<()> {
    let metadata =
        fs::metadata(path).with_context(|| format!("could not stat {}", path.display()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(directory).with_context(|| {
        format!("could not create a temporary file in {}", directory.display())
    })?;
    temp.write_all(text.as_bytes())
        .with_context(|| format!("could not write to {}", temp.path().display()))?;
    temp.as_file()
        .set_permissions(metadata.permissions())
        .with_context(|| format!("could not copy the file mode to {}", temp.path().display()))?;
    std::os::unix::fs::chown(temp.path(), Some(metadata.uid()), Some(metadata.gid()))
        .with_context(|| {
            format!(
                "could not copy the file ownership to {}",
                temp.path().display()
            )
        })?;
    temp.persist(path)
        .with_context(|| format!("could not rename over {}", path.display()))?;
    Ok(())
}
