//! Reference [`GalleryFetcher`] reading JSON gallery manifests.
//!
//! A manifest lists a gallery's title, its page image URLs and optional
//! metadata:
//!
//! ```json
//! {"title": "Some Gallery", "pages": ["https://img.example/1.jpg"], "metadata": {"artist": "x"}}
//! ```
//!
//! Manifests and images are fetched over HTTP(S) with libcurl, or read from
//! disk for `file://` URLs.

mod http;

pub use http::{http_get, HttpOptions};

use crate::fetch::{FetchError, GalleryFetcher, GalleryInfo, ImageInfo, TransportMode};
use crate::naming::filename_from_url_path;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    title: String,
    pages: Vec<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

/// Parses a manifest body into gallery info. Relative page URLs are resolved
/// against `base`.
pub fn parse_manifest(base: &str, body: &[u8]) -> Result<GalleryInfo, FetchError> {
    let manifest: Manifest =
        serde_json::from_slice(body).map_err(|e| FetchError::parse(base, e.to_string()))?;
    let base_url = url::Url::parse(base).ok();
    let mut page_urls = Vec::with_capacity(manifest.pages.len());
    for page in manifest.pages {
        let resolved = match &base_url {
            Some(b) => b
                .join(&page)
                .map(|u| u.to_string())
                .map_err(|e| FetchError::parse(base, format!("bad page url {}: {}", page, e)))?,
            None => page,
        };
        page_urls.push(resolved);
    }
    Ok(GalleryInfo {
        total_pages: page_urls.len(),
        page_urls,
        title: manifest.title,
        metadata: manifest.metadata,
    })
}

/// Fetches galleries described by JSON manifests.
#[derive(Debug, Clone, Default)]
pub struct ManifestFetcher {
    pub http: HttpOptions,
}

impl ManifestFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, url: &str, mode: TransportMode) -> Result<Vec<u8>, FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::parse(url, e.to_string()))?;
        match parsed.scheme() {
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|()| FetchError::parse(url, "not a local path"))?;
                std::fs::read(&path).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => FetchError::parse(url, "file not found"),
                    _ => FetchError::network(url, e.to_string()),
                })
            }
            "http" | "https" => http_get(url, mode, &self.http),
            other => Err(FetchError::parse(url, format!("unsupported scheme {}", other))),
        }
    }
}

impl GalleryFetcher for ManifestFetcher {
    fn fetch_gallery(&self, url: &str) -> Result<GalleryInfo, FetchError> {
        let body = self.get(url, TransportMode::Strict)?;
        parse_manifest(url, &body)
    }

    /// Manifest pages point straight at images; nothing to resolve.
    fn fetch_image_info(&self, page_url: &str) -> Result<ImageInfo, FetchError> {
        let filename = filename_from_url_path(page_url)
            .ok_or_else(|| FetchError::parse(page_url, "no filename in page url"))?;
        Ok(ImageInfo {
            image_url: page_url.to_string(),
            filename,
        })
    }

    fn fetch_image(&self, image_url: &str, mode: TransportMode) -> Result<Vec<u8>, FetchError> {
        self.get(image_url, mode)
    }
}
