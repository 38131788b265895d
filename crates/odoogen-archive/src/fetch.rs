//! Token-gated enterprise archive download.
//!
//! The archive host does not expose a stable download URL. The fetcher loads
//! a per-token thanks page, scrapes the direct URL out of its HTML, streams
//! the archive into the [`ArchiveCache`] and extracts it. Every failure is
//! terminal for the invocation and reported as [`FetchOutcome::Failed`]; the
//! caller falls back to a manually supplied addons path.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use odoogen_common::config::ArchiveHost;
use odoogen_common::constants::{DOWNLOAD_CHUNK_SIZE, ERROR_RESPONSE_FILE};
use odoogen_common::error::{OdoogenError, Result};
use odoogen_common::report::{Level, Reporter, Unit};
use odoogen_common::types::OdooVersion;
use regex::Regex;

use crate::cache::ArchiveCache;
use crate::extract::{self, ExtractionSummary};

/// Terminal state of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The archive was extracted into the target directory.
    Extracted {
        /// Cached archive that was extracted.
        archive: PathBuf,
        /// Whether the cached copy was used without any network access.
        from_cache: bool,
        /// Extraction details.
        summary: ExtractionSummary,
    },
    /// No usable archive could be obtained.
    Failed {
        /// Description of the failed step.
        reason: String,
    },
}

impl FetchOutcome {
    /// Whether the archive ended up extracted.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Extracted { .. })
    }
}

/// Downloads, caches and extracts enterprise archives.
pub struct ArchiveFetcher<'a> {
    cache: ArchiveCache,
    host: ArchiveHost,
    client: reqwest::blocking::Client,
    reporter: &'a dyn Reporter,
}

impl<'a> ArchiveFetcher<'a> {
    /// Creates a fetcher backed by `cache` and talking to `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(cache: ArchiveCache, host: ArchiveHost, reporter: &'a dyn Reporter) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("odoogen/", env!("CARGO_PKG_VERSION")))
            .timeout(None)
            .build()
            .map_err(|e| OdoogenError::Config {
                message: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(Self {
            cache,
            host,
            client,
            reporter,
        })
    }

    /// Returns the cache this fetcher populates.
    #[must_use]
    pub const fn cache(&self) -> &ArchiveCache {
        &self.cache
    }

    /// Makes the enterprise archive for `version` available in `target`.
    ///
    /// A cached archive is extracted without touching the network. If that
    /// extraction fails the archive is downloaded again.
    pub fn fetch(&self, version: &OdooVersion, token: &str, target: &Path) -> FetchOutcome {
        if let Err(e) = std::fs::create_dir_all(target) {
            return FetchOutcome::Failed {
                reason: OdoogenError::io(target, e).to_string(),
            };
        }
        self.reporter
            .section(&format!("Preparing Odoo Enterprise {version}"));

        if self.cache.has(version) {
            let archive = self.cache.path(version);
            self.reporter
                .success(&format!("Odoo Enterprise {version} archive found in cache"));
            match extract::extract(&archive, target, self.reporter) {
                Ok(summary) => {
                    tracing::info!(version = %version, "extracted cached archive");
                    return FetchOutcome::Extracted {
                        archive,
                        from_cache: true,
                        summary,
                    };
                }
                Err(e) => {
                    tracing::warn!(version = %version, error = %e, "cached archive unusable");
                    self.reporter
                        .warning(&format!("Extraction from cache failed ({e}), downloading again"));
                }
            }
        } else {
            self.reporter
                .info(&format!("No cached archive for Odoo Enterprise {version}"));
        }

        let result = self.download(version, token, target).and_then(|archive| {
            extract::extract(&archive, target, self.reporter).map(|summary| (archive, summary))
        });

        match result {
            Ok((archive, summary)) => FetchOutcome::Extracted {
                archive,
                from_cache: false,
                summary,
            },
            Err(e) => {
                tracing::warn!(version = %version, error = %e, "enterprise fetch failed");
                self.reporter.error(&e.to_string());
                self.reporter
                    .warning("The automatic enterprise download did not succeed.");
                self.reporter.info(&format!(
                    "Download Odoo Enterprise {version} manually from odoo.com, then pass its location with --addons-path."
                ));
                FetchOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn download(&self, version: &OdooVersion, token: &str, target: &Path) -> Result<PathBuf> {
        let short = version.short_form();
        let thanks_url = self.host.thanks_url_for(token, short);
        self.reporter.message(
            Level::Download,
            &format!("Downloading Odoo Enterprise {version}"),
        );

        let page = self.step("Fetching the download page", "Download page retrieved", || {
            self.get_page(&thanks_url)
        })?;

        let direct_url = self.step("Looking for the download URL", "Download URL found", || {
            find_download_url(&page, short, &self.host)
                .ok_or_else(|| OdoogenError::remote("no download URL found in the download page"))
        })?;
        tracing::debug!(version = %version, "resolved direct download URL");

        let response = self.step("Checking the content type", "Archive stream opened", || {
            self.open_archive_stream(&direct_url, target)
        })?;

        let total = response.content_length();
        if let Some(total) = total {
            #[allow(clippy::cast_precision_loss)]
            let mb = total as f64 / 1_048_576.0;
            self.reporter.info(&format!("Archive size: {mb:.1} MB"));
        }

        let partial = self.cache.partial_path(version);
        let progress = self.reporter.progress("Downloading", total, Unit::Bytes);
        let streamed = stream_to_file(response, &partial, |n| progress.advance(n));
        progress.finish();
        let written = match streamed {
            Ok(written) => written,
            Err(e) => {
                let _ = std::fs::remove_file(&partial);
                return Err(e);
            }
        };

        let archive = self.cache.commit(version)?;
        tracing::info!(version = %version, bytes = written, "archive cached");
        self.reporter.success(&format!(
            "Archive downloaded and cached in {}",
            archive.display()
        ));
        Ok(archive)
    }

    fn step<T>(&self, label: &str, done: &str, run: impl FnOnce() -> Result<T>) -> Result<T> {
        let task = self.reporter.spinner(label);
        match run() {
            Ok(value) => {
                task.finish(true, Some(done));
                Ok(value)
            }
            Err(e) => {
                task.finish(false, Some(&e.to_string()));
                Err(e)
            }
        }
    }

    fn get_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| OdoogenError::remote(format!("download page request failed: {}", e.without_url())))?;
        response
            .text()
            .map_err(|e| OdoogenError::remote(format!("cannot read download page: {}", e.without_url())))
    }

    fn open_archive_stream(&self, url: &str, target: &Path) -> Result<reqwest::blocking::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| OdoogenError::remote(format!("archive request failed: {}", e.without_url())))?;

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("text/html"));
        if !is_html {
            return Ok(response);
        }

        let error_page = target.join(ERROR_RESPONSE_FILE);
        let body = response.bytes().unwrap_or_default();
        std::fs::write(&error_page, &body).map_err(|e| OdoogenError::io(&error_page, e))?;
        Err(OdoogenError::remote(format!(
            "the server returned an HTML page instead of the archive (saved to {})",
            error_page.display()
        )))
    }
}

/// Scans a thanks page for the direct archive URL.
///
/// An absolute URL on the download host wins; otherwise a `payload=`
/// parameter is turned into a URL for `short_version`.
#[must_use]
pub fn find_download_url(html: &str, short_version: &str, host: &ArchiveHost) -> Option<String> {
    let base = regex::escape(host.download_base.trim_end_matches('/'));
    let direct = Regex::new(&format!(r#"{base}/download/[^"'&\s]+"#)).ok()?;
    if let Some(found) = direct.find(html) {
        return Some(found.as_str().to_string());
    }

    let payload = Regex::new(r#"payload=([^"'&\s]+)"#).ok()?;
    payload
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| host.payload_url(short_version, m.as_str()))
}

fn stream_to_file(mut body: impl Read, dest: &Path, mut on_chunk: impl FnMut(u64)) -> Result<u64> {
    let mut file = File::create(dest).map_err(|e| OdoogenError::io(dest, e))?;
    let mut buffer = vec![0_u8; DOWNLOAD_CHUNK_SIZE];
    let mut written = 0_u64;
    loop {
        let read = body
            .read(&mut buffer)
            .map_err(|e| OdoogenError::remote(format!("download interrupted: {e}")))?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .map_err(|e| OdoogenError::io(dest, e))?;
        written += read as u64;
        on_chunk(read as u64);
    }
    file.flush().map_err(|e| OdoogenError::io(dest, e))?;
    Ok(written)
}
