// brewtap-net/src/validation.rs
use std::fs::File;
use std::io;
use std::path::Path;

use brewtap_common::error::{BrewtapError, Result};
use sha2::{Digest, Sha256};
use url::Url;

/// Hex encoded SHA256 of the file at `path`.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let bytes_copied = io::copy(&mut file, &mut hasher)?;
    let actual = hex::encode(hasher.finalize());
    tracing::debug!("Calculated SHA256: {} ({} bytes read)", actual, bytes_copied);
    Ok(actual)
}

pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    tracing::debug!("Verifying checksum for: {}", path.display());
    let actual = sha256_file(path)?;
    tracing::debug!("Expected SHA256:   {}", expected);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(BrewtapError::IntegrityError(format!(
            "Checksum mismatch for {}: expected {}, got {}",
            path.display(),
            expected,
            actual
        )))
    }
}

/// Verifies that the detected content type of the file matches the expected extension.
pub fn verify_content_type(path: &Path, expected_ext: &str) -> Result<()> {
    let kind_opt = infer::get_from_path(path)?;
    if let Some(kind) = kind_opt {
        let actual_ext = kind.extension();
        if actual_ext.eq_ignore_ascii_case(expected_ext) {
            tracing::debug!(
                "Content type verified: {} matches expected {}",
                actual_ext,
                expected_ext
            );
            Ok(())
        } else {
            Err(BrewtapError::ValidationError(format!(
                "Content type mismatch for {}: expected extension '{}', but detected '{}'",
                path.display(),
                expected_ext,
                actual_ext
            )))
        }
    } else {
        Err(BrewtapError::ValidationError(format!(
            "Could not determine content type for {}",
            path.display()
        )))
    }
}

/// Validates a URL, ensuring it uses the HTTPS scheme.
pub fn validate_url(url_str: &str) -> Result<()> {
    let url = Url::parse(url_str).map_err(|e| {
        BrewtapError::ValidationError(format!("Failed to parse URL '{url_str}': {e}"))
    })?;
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(BrewtapError::ValidationError(format!(
            "Invalid URL scheme for '{}': Must be https, but got '{}'",
            url_str,
            url.scheme()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256("hello world")
    const HELLO_SHA: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn checksum_matches_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello world").unwrap();
        assert_eq!(sha256_file(&path).unwrap(), HELLO_SHA);
        verify_checksum(&path, HELLO_SHA).unwrap();
        verify_checksum(&path, &HELLO_SHA.to_uppercase()).unwrap();
    }

    #[test]
    fn one_changed_byte_is_an_integrity_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello worle").unwrap();
        let err = verify_checksum(&path, HELLO_SHA).unwrap_err();
        assert!(matches!(err, BrewtapError::IntegrityError(ref m) if m.contains(HELLO_SHA)));
    }

    #[test]
    fn only_https_urls_are_accepted() {
        validate_url("https://github.com/latentDream/merlion/archive/refs/tags/1.2.0.tar.gz")
            .unwrap();
        assert!(validate_url("http://github.com/x.tar.gz").is_err());
        assert!(validate_url("file:///tmp/x.tar.gz").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn gzip_magic_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tar.gz");
        std::fs::write(&path, [0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00]).unwrap();
        verify_content_type(&path, "gz").unwrap();
        assert!(verify_content_type(&path, "zip").is_err());
    }
}
