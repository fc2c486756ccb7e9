use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use brewtap_common::config::Config;
use brewtap_common::error::{BrewtapError, Result};
use brewtap_common::model::formula::PackageDescriptor;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use tokio::fs::File as TokioFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

use crate::validation::{validate_url, verify_checksum};

const DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = "brewtap (Rust; formula fetcher)";

/// Fetches the source archive of `descriptor` into the download cache and verifies it.
///
/// A cached archive with the right checksum is reused. The primary URL is tried first,
/// then each mirror, but only while the failure is a transport problem: a checksum
/// mismatch stops immediately.
pub async fn fetch_source(descriptor: &PackageDescriptor, config: &Config) -> Result<PathBuf> {
    let downloads_dir = config.downloads_dir();
    let cache_path = downloads_dir.join(descriptor.archive_filename());

    debug!(
        "Preparing to fetch source for '{}' {} from URL: {}",
        descriptor.name, descriptor.version, descriptor.url
    );
    debug!("Target cache path: {}", cache_path.display());

    if cache_path.is_file() {
        match verify_checksum(&cache_path, &descriptor.sha256) {
            Ok(_) => {
                debug!("Using valid cached file: {}", cache_path.display());
                return Ok(cache_path);
            }
            Err(e) => {
                debug!(
                    "Cached file checksum mismatch ({}): {}. Redownloading.",
                    cache_path.display(),
                    e
                );
                if let Err(remove_err) = fs::remove_file(&cache_path) {
                    debug!(
                        "Failed to remove corrupted cached file {}: {}",
                        cache_path.display(),
                        remove_err
                    );
                }
            }
        }
    } else {
        debug!("File not found in cache.");
    }

    fs::create_dir_all(&downloads_dir).map_err(|e| {
        BrewtapError::InstallError(format!(
            "Failed to create download cache {}: {}",
            downloads_dir.display(),
            e
        ))
    })?;

    let client = build_http_client()?;
    let urls_to_try =
        std::iter::once(descriptor.url.as_str()).chain(descriptor.mirrors.iter().map(|s| s.as_str()));
    let mut last_error: Option<BrewtapError> = None;

    for current_url in urls_to_try {
        if let Err(e) = validate_url(current_url) {
            warn!("Skipping {}: {}", current_url, e);
            // A transport failure from an earlier URL says more than a bad mirror.
            last_error.get_or_insert(e);
            continue;
        }
        debug!("Attempting download from: {}", current_url);
        match download_and_verify(
            &client,
            &descriptor.name,
            current_url,
            &cache_path,
            &descriptor.sha256,
        )
        .await
        {
            Ok(path) => {
                debug!("Successfully downloaded and verified: {}", path.display());
                return Ok(path);
            }
            Err(e @ BrewtapError::IntegrityError(_)) => {
                error!("Archive from {} failed verification: {}", current_url, e);
                return Err(e);
            }
            Err(e) => {
                error!("Download attempt failed from {}: {}", current_url, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        BrewtapError::FetchError(
            descriptor.name.clone(),
            descriptor.url.clone(),
            "All download attempts failed.".to_string(),
        )
    }))
}

fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| BrewtapError::Generic(format!("Failed to build HTTP client: {e}")))
}

fn download_progress(total: Option<u64>, name: &str) -> ProgressBar {
    let bar = match total {
        Some(len) => ProgressBar::new(len),
        None => ProgressBar::new_spinner(),
    };
    if let Ok(style) = ProgressStyle::with_template(
        "{msg} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec})",
    ) {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(format!("Downloading {name}"));
    bar
}

async fn download_and_verify(
    client: &Client,
    name: &str,
    url: &str,
    final_path: &Path,
    sha256_expected: &str,
) -> Result<PathBuf> {
    let temp_filename = format!(
        ".{}.download",
        final_path.file_name().unwrap_or_default().to_string_lossy()
    );
    let temp_path = final_path.with_file_name(temp_filename);
    debug!("Downloading to temporary path: {}", temp_path.display());

    let result = stream_to_file(client, name, url, &temp_path).await.and_then(|_| {
        verify_checksum(&temp_path, sha256_expected)?;
        debug!("Checksum verified for temporary file: {}", temp_path.display());
        fs::rename(&temp_path, final_path).map_err(|e| {
            BrewtapError::InstallError(format!(
                "Failed to move temp file {} to {}: {}",
                temp_path.display(),
                final_path.display(),
                e
            ))
        })?;
        Ok(final_path.to_path_buf())
    });

    // Unverified bytes never stay in the cache.
    if result.is_err() && temp_path.exists() {
        if let Err(e) = fs::remove_file(&temp_path) {
            warn!(
                "Could not remove temporary file {}: {}",
                temp_path.display(),
                e
            );
        }
    }
    result
}

async fn stream_to_file(client: &Client, name: &str, url: &str, temp_path: &Path) -> Result<()> {
    let fetch_err = |reason: String| BrewtapError::FetchError(name.to_string(), url.to_string(), reason);

    let response = client.get(url).send().await.map_err(|e| {
        debug!("HTTP request failed for {url}: {e}");
        fetch_err(format!("HTTP request failed: {e}"))
    })?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);

    if !status.is_success() {
        return Err(match status {
            StatusCode::NOT_FOUND => fetch_err("Resource not found (404)".to_string()),
            StatusCode::FORBIDDEN => fetch_err("Access forbidden (403)".to_string()),
            _ => fetch_err(format!("HTTP error {status}")),
        });
    }

    let progress = download_progress(response.content_length(), name);
    let mut temp_file = TokioFile::create(temp_path).await.map_err(|e| {
        BrewtapError::InstallError(format!(
            "Failed to create temp file {}: {}",
            temp_path.display(),
            e
        ))
    })?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| fetch_err(format!("Failed to read response body: {e}")))?;
        temp_file.write_all(&chunk).await?;
        progress.inc(chunk.len() as u64);
    }
    temp_file.flush().await?;
    progress.finish_and_clear();
    debug!("Finished writing download stream to temp file.");
    Ok(())
}
