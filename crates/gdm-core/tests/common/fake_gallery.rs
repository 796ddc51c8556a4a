//! In-memory [`GalleryFetcher`] with scriptable failures.
//!
//! Galleries are keyed by URL. Page `n` of gallery `g` is served at
//! `g/page/n` and resolves to the image `g/img/n.jpg`, whose bytes are
//! `"image n"`.

use gdm_core::fetch::{FetchError, GalleryFetcher, GalleryInfo, ImageInfo, TransportMode};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Hook = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
pub struct FakeGallery {
    galleries: Mutex<HashMap<String, usize>>,
    /// Image URL -> remaining failures (usize::MAX for always).
    image_failures: Mutex<HashMap<String, (usize, FetchError)>>,
    gallery_failures: Mutex<HashMap<String, FetchError>>,
    image_fetches: AtomicUsize,
    on_image: Mutex<Option<Hook>>,
}

impl FakeGallery {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, url: &str, pages: usize) {
        self.galleries.lock().unwrap().insert(url.to_string(), pages);
    }

    pub fn image_url(gallery: &str, page: usize) -> String {
        format!("{}/img/{}.jpg", gallery, page)
    }

    /// Makes the image for `page` fail `times` times with `error`.
    pub fn fail_image(&self, gallery: &str, page: usize, times: usize, error: FetchError) {
        self.image_failures
            .lock()
            .unwrap()
            .insert(Self::image_url(gallery, page), (times, error));
    }

    pub fn fail_gallery(&self, gallery: &str, error: FetchError) {
        self.gallery_failures
            .lock()
            .unwrap()
            .insert(gallery.to_string(), error);
    }

    pub fn heal_gallery(&self, gallery: &str) {
        self.gallery_failures.lock().unwrap().remove(gallery);
    }

    pub fn image_fetches(&self) -> usize {
        self.image_fetches.load(Ordering::SeqCst)
    }

    /// Runs `hook` with the image URL before each image fetch.
    pub fn on_image(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.on_image.lock().unwrap() = Some(Box::new(hook));
    }
}

fn clone_error(e: &FetchError) -> FetchError {
    match e {
        FetchError::Network { url, message } => FetchError::network(url, message.clone()),
        FetchError::Ssl { url, message } => FetchError::ssl(url, message.clone()),
        FetchError::Parse { url, message } => FetchError::parse(url, message.clone()),
        FetchError::FolderMissing { path } => FetchError::FolderMissing { path: path.clone() },
        FetchError::RangeInvalid(m) => FetchError::RangeInvalid(m.clone()),
        FetchError::DiskFull { path, source } => FetchError::DiskFull {
            path: path.clone(),
            source: std::io::Error::new(source.kind(), source.to_string()),
        },
        other => FetchError::Other(other.to_string()),
    }
}

impl GalleryFetcher for FakeGallery {
    fn fetch_gallery(&self, url: &str) -> Result<GalleryInfo, FetchError> {
        if let Some(e) = self.gallery_failures.lock().unwrap().get(url) {
            return Err(clone_error(e));
        }
        let pages = *self
            .galleries
            .lock()
            .unwrap()
            .get(url)
            .ok_or_else(|| FetchError::parse(url, "no such gallery"))?;
        let mut metadata = BTreeMap::new();
        metadata.insert("source".to_string(), "fake".to_string());
        Ok(GalleryInfo {
            page_urls: (1..=pages).map(|p| format!("{}/page/{}", url, p)).collect(),
            total_pages: pages,
            title: format!("Gallery {}", url.rsplit('/').next().unwrap_or("x")),
            metadata,
        })
    }

    fn fetch_image_info(&self, page_url: &str) -> Result<ImageInfo, FetchError> {
        let (gallery, page) = page_url
            .rsplit_once("/page/")
            .ok_or_else(|| FetchError::parse(page_url, "bad page url"))?;
        let page: usize = page
            .parse()
            .map_err(|_| FetchError::parse(page_url, "bad page number"))?;
        Ok(ImageInfo {
            image_url: Self::image_url(gallery, page),
            filename: format!("{}.jpg", page),
        })
    }

    fn fetch_image(&self, image_url: &str, _mode: TransportMode) -> Result<Vec<u8>, FetchError> {
        self.image_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.on_image.lock().unwrap().as_ref() {
            hook(image_url);
        }
        {
            let mut failures = self.image_failures.lock().unwrap();
            if let Some((left, e)) = failures.get_mut(image_url) {
                if *left > 0 {
                    if *left != usize::MAX {
                        *left -= 1;
                    }
                    return Err(clone_error(e));
                }
            }
        }
        let page = image_url
            .rsplit('/')
            .next()
            .and_then(|f| f.strip_suffix(".jpg"))
            .unwrap_or("?");
        Ok(format!("image {}", page).into_bytes())
    }
}
