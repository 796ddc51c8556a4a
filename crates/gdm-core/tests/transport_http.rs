//! Manifest transport against a local HTTP server.

mod common;

use common::http_server::{self, Route};
use gdm_core::fetch::{FetchError, GalleryFetcher, TransportMode};
use gdm_core::job::{run_job, JobEnv};
use gdm_core::range::RangeConfig;
use gdm_core::retry::{classify, ErrorKind};
use gdm_core::state::{StateStore, UrlStatus};
use gdm_core::storage::FsImageStore;
use gdm_core::transport::ManifestFetcher;
use std::sync::Arc;
use tempfile::tempdir;

fn manifest(pages: &[&str]) -> Vec<u8> {
    serde_json::json!({
        "title": "Served Gallery",
        "pages": pages,
        "metadata": {"artist": "someone"},
    })
    .to_string()
    .into_bytes()
}

#[test]
fn fetches_manifest_and_images() {
    let base = http_server::start(vec![
        ("/g/manifest.json", Route::ok(manifest(&["img/a.png", "img/b.jpg"]))),
        ("/g/img/a.png", Route::ok(b"png bytes".to_vec())),
        ("/g/img/b.jpg", Route::ok(b"jpg bytes".to_vec())),
    ]);
    let f = ManifestFetcher::new();

    let g = f.fetch_gallery(&format!("{}/g/manifest.json", base)).unwrap();
    assert_eq!(g.title, "Served Gallery");
    assert_eq!(g.page_urls, vec![format!("{}/g/img/a.png", base), format!("{}/g/img/b.jpg", base)]);
    assert_eq!(g.metadata.get("artist").map(String::as_str), Some("someone"));

    let info = f.fetch_image_info(&g.page_urls[0]).unwrap();
    assert_eq!(info.filename, "a.png");
    let bytes = f.fetch_image(&info.image_url, TransportMode::Strict).unwrap();
    assert_eq!(bytes, b"png bytes");
}

#[test]
fn http_status_maps_to_error_kind() {
    let base = http_server::start(vec![("/busy", Route::status(503))]);
    let f = ManifestFetcher::new();

    let busy = f
        .fetch_image(&format!("{}/busy", base), TransportMode::Strict)
        .unwrap_err();
    assert_eq!(classify(&busy), ErrorKind::Network);

    let missing = f
        .fetch_image(&format!("{}/nope", base), TransportMode::Strict)
        .unwrap_err();
    assert!(matches!(missing, FetchError::Parse { .. }));
}

#[test]
fn refused_connection_is_network_error() {
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let err = ManifestFetcher::new()
        .fetch_image(&format!("http://127.0.0.1:{}/x.jpg", port), TransportMode::Strict)
        .unwrap_err();
    assert_eq!(classify(&err), ErrorKind::Network);
}

#[test]
fn job_downloads_served_gallery_to_disk() {
    let base = http_server::start(vec![
        ("/g/manifest.json", Route::ok(manifest(&["1.jpg", "2.jpg", "3.jpg"]))),
        ("/g/1.jpg", Route::ok(b"one".to_vec())),
        ("/g/2.jpg", Route::ok(b"two".to_vec())),
        ("/g/3.jpg", Route::ok(b"three".to_vec())),
    ]);
    let url = format!("{}/g/manifest.json", base);
    let dl = tempdir().unwrap();
    let env = JobEnv::new(
        Arc::new(ManifestFetcher::new()),
        Arc::new(FsImageStore::new()),
        Arc::new(StateStore::default()),
    );
    let id = env.state.push(url.clone());
    let entry = env.state.entry(id).unwrap();

    let out = run_job(&env, &common::job_options(dl.path(), RangeConfig::pages(2, None)), &entry);

    assert_eq!(out.status, UrlStatus::Completed);
    let folder = dl.path().join("Served Gallery");
    assert_eq!(common::files_in(&folder), vec!["0002.jpg", "0003.jpg"]);
    assert_eq!(std::fs::read(folder.join("0003.jpg")).unwrap(), b"three");
}
