//! Downloads through the site's download service

mod common;

use common::{open_site, site_fixture};
use records::context::RequestContext;
use records::error::Error;
use std::fs;

fn zip_names(path: &std::path::Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    archive.file_names().map(String::from).collect()
}

#[test]
fn test_every_published_version_is_downloadable() {
    let temp = site_fixture();
    let site = open_site(temp.path());
    let service = site.download_service();
    let admin = RequestContext::administrator();

    // 1.5.0 is the managed upload, 1.4.2 the installed plugin
    let managed = service.download(&admin, "acme", "1.5.0").unwrap();
    assert!(managed.filename.starts_with("acme-1.5.0-"));
    assert_eq!(zip_names(&managed.path), vec!["acme/acme.php"]);

    let installed = service.download(&admin, "acme", "1.4.2").unwrap();
    assert!(installed.filename.starts_with("acme-1.4.2-"));

    let latest = service.download(&admin, "acme", "latest").unwrap();
    assert_eq!(latest.path, managed.path);
}

#[test]
fn test_unknown_version_across_sources() {
    let temp = site_fixture();
    let site = open_site(temp.path());

    let err = site
        .download_service()
        .download(&RequestContext::administrator(), "acme", "9.9.9")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidReleaseVersion { .. }));
}

#[test]
fn test_hashid_finds_managed_package() {
    let temp = site_fixture();
    let site = open_site(temp.path());
    let id = site.hashid().encode(1);

    let response = site
        .download_service()
        .download(&RequestContext::administrator(), &id, "1.5.0")
        .unwrap();
    assert!(response.filename.starts_with("acme-1.5.0-"));
}
