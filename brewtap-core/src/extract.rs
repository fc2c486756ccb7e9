// Path: brewtap-core/src/extract.rs
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use brewtap_common::error::{BrewtapError, Result};
use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

/// Unpacks a `.tar.gz` into `dest`. Entries that would land outside `dest` are an error.
pub fn extract_tarball(archive_path: &Path, dest: &Path) -> Result<()> {
    debug!(
        "Extracting {} into {}",
        archive_path.display(),
        dest.display()
    );
    brewtap_net::verify_content_type(archive_path, "gz")?;
    fs::create_dir_all(dest)?;

    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);

    let mut count = 0usize;
    for entry_result in archive.entries()? {
        let mut entry = entry_result.map_err(|e| {
            BrewtapError::Generic(format!(
                "Error reading TAR entry from {}: {}",
                archive_path.display(),
                e
            ))
        })?;
        let path = entry.path()?.into_owned();
        if !is_contained(&path) {
            return Err(BrewtapError::ValidationError(format!(
                "Archive {} contains unsafe path '{}'",
                archive_path.display(),
                path.display()
            )));
        }
        entry.unpack_in(dest).map_err(|e| {
            BrewtapError::Generic(format!(
                "Failed to unpack '{}' from {}: {}",
                path.display(),
                archive_path.display(),
                e
            ))
        })?;
        count += 1;
    }
    debug!("Extracted {} entries", count);
    Ok(())
}

fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// The directory holding the sources: the single top-level directory when there is one,
/// `dest` itself otherwise. GitHub tag archives always wrap sources in `<repo>-<tag>/`.
pub fn source_root(dest: &Path) -> Result<PathBuf> {
    let mut subdirs = Vec::new();
    let mut has_files = false;
    for entry in fs::read_dir(dest)?.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        // pax_global_header and dotfiles don't count as content.
        if name.starts_with('.') || name == "pax_global_header" {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else {
            has_files = true;
        }
    }

    if subdirs.len() == 1 && !has_files {
        let root = subdirs.remove(0);
        debug!("Source root is single subdirectory: {}", root.display());
        Ok(root)
    } else {
        debug!("Source root is the extraction directory: {}", dest.display());
        Ok(dest.to_path_buf())
    }
}
