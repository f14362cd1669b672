//! Template stores: where named templates are fetched from

use crate::error::{Error, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fetches template PDFs by name
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Fetch the raw bytes of a template.
    ///
    /// Fails with `TemplateNotFound` when the store has no such template.
    async fn fetch(&self, name: &str) -> Result<Vec<u8>>;

    /// Short description used in logs
    fn describe(&self) -> String;
}

/// Reject names that could address anything but a file in the store root
fn validate_template_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_input("templateName parameter is required"));
    }
    if name.contains(['/', '\\', '\0']) || name == "." || name == ".." {
        return Err(Error::PathAccessDenied {
            path: name.to_string(),
        });
    }
    Ok(())
}

/// Templates stored as files in one local directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    max_bytes: u64,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl TemplateStore for DirectoryStore {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        validate_template_name(name)?;
        let path = self.root.join(name);

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => {
                return Err(Error::TemplateNotFound {
                    name: name.to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::TemplateNotFound {
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(Error::Io(e)),
        };

        if metadata.len() > self.max_bytes {
            return Err(Error::DownloadTooLarge {
                size: metadata.len(),
                max_size: self.max_bytes,
            });
        }

        let data = tokio::fs::read(&path).await?;
        tracing::debug!(name, bytes = data.len(), "Read template from directory");
        Ok(data)
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

/// Templates served over HTTP(S) under `{base_url}/{key_prefix}{name}`
#[derive(Debug, Clone)]
pub struct HttpStore {
    base_url: url::Url,
    key_prefix: String,
    allow_private_urls: bool,
    max_bytes: u64,
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new(
        base_url: &str,
        key_prefix: impl Into<String>,
        allow_private_urls: bool,
        max_bytes: u64,
    ) -> Result<Self> {
        let base_url = url::Url::parse(base_url)
            .map_err(|e| Error::invalid_input(format!("Invalid template base URL: {}", e)))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::invalid_input(
                "Template base URL must be an http(s) URL",
            ));
        }

        // Redirect targets would skip the SSRF check, so they are not followed
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            base_url,
            key_prefix: key_prefix.into(),
            allow_private_urls,
            max_bytes,
            client,
        })
    }

    /// URL a template name is fetched from
    pub fn template_url(&self, name: &str) -> Result<url::Url> {
        validate_template_name(name)?;
        let key = format!("{}{}", self.key_prefix, name);

        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::invalid_input("Template base URL cannot hold a path"))?;
            segments.pop_if_empty();
            for segment in key.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl TemplateStore for HttpStore {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.template_url(name)?;

        if !self.allow_private_urls {
            check_ssrf(&url).await?;
        }

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            Error::Transfer {
                reason: format!("GET {} failed: {}", url, e),
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::TemplateNotFound {
                name: name.to_string(),
            });
        }
        if status.is_redirection() {
            return Err(Error::Transfer {
                reason: format!("GET {} returned redirect {}", url, status),
            });
        }
        if !status.is_success() {
            return Err(Error::Transfer {
                reason: format!("GET {} returned {}", url, status),
            });
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_bytes {
                return Err(Error::DownloadTooLarge {
                    size: content_length,
                    max_size: self.max_bytes,
                });
            }
        }

        let mut data = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Transfer {
                reason: format!("reading {} failed: {}", url, e),
            })?;
            data.extend_from_slice(&chunk);
            if data.len() as u64 > self.max_bytes {
                return Err(Error::DownloadTooLarge {
                    size: data.len() as u64,
                    max_size: self.max_bytes,
                });
            }
        }

        tracing::debug!(name, bytes = data.len(), "Downloaded template");
        Ok(data)
    }

    fn describe(&self) -> String {
        format!("{}{}", self.base_url, self.key_prefix)
    }
}

/// Loopback, private, link-local, CGNAT and unspecified addresses
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xFE00) == 0xFC00
                || (first & 0xFFC0) == 0xFE80
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
        }
    }
}

/// Refuse URLs whose host resolves to any private address
async fn check_ssrf(url: &url::Url) -> Result<()> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::invalid_input("Template URL has no host"))?;
    let port = url.port_or_known_default().unwrap_or(443);

    let addrs = tokio::net::lookup_host((host.trim_matches(['[', ']']), port))
        .await
        .map_err(|e| Error::Transfer {
            reason: format!("DNS resolution failed for {}: {}", host, e),
        })?;

    for addr in addrs {
        if is_private_ip(&addr.ip()) {
            tracing::warn!(url = %url, ip = %addr.ip(), "Blocked template URL");
            return Err(Error::SsrfBlocked {
                url: url.to_string(),
            });
        }
    }

    Ok(())
}
