//! Repository behaviour against an on-disk site

mod common;

use common::{open_site, site_fixture, write_plugin};
use records::error::Error;
use records::package::{PackageBuilder, PackageKind, PackageType, SourceType};
use records::release::ReleaseSource;
use records::repository::{
    CachedRepository, Criteria, InstalledPlugins, MultiRepository, PackageRepository,
    StaticRepository,
};
use records::site::{NetworkMode, Site};
use serial_test::serial;
use std::sync::Arc;

#[test]
fn test_every_member_is_sorted_with_slugs() {
    let temp = site_fixture();
    let site = open_site(temp.path());

    for repository in site
        .repositories()
        .packages()
        .members()
        .iter()
        .chain(site.repositories().parts().members())
    {
        let packages = repository.all().unwrap();
        assert!(packages.iter().all(|p| !p.slug().is_empty()));
        let slugs: Vec<&str> = packages.iter().map(|p| p.slug()).collect();
        let mut sorted = slugs.clone();
        sorted.sort();
        assert_eq!(slugs, sorted);
    }
}

#[test]
fn test_first_where_finds_present_slug_only() {
    let temp = site_fixture();
    let site = open_site(temp.path());
    let packages = site.repositories().packages();

    let zeta = packages.first_where(&Criteria::new().slug("zeta")).unwrap();
    assert_eq!(zeta.unwrap().name(), "Zeta");
    assert!(packages.first_where(&Criteria::new().slug("missing")).unwrap().is_none());
}

#[test]
fn test_basename_shaped_slug_matches_basename() {
    let temp = site_fixture();
    let site = open_site(temp.path());
    let packages = site.repositories().packages();

    let by_slug = packages.matching(&Criteria::new().slug("acme/acme.php")).unwrap();
    let by_basename = packages.matching(&Criteria::new().basename("acme/acme.php")).unwrap();
    assert_eq!(by_slug.len(), 1);
    assert_eq!(by_slug, by_basename);
    assert_eq!(by_slug[0].source_type(), SourceType::LocalPlugin);
}

#[test]
fn test_multi_repository_keeps_duplicates() {
    let temp = site_fixture();
    let site = open_site(temp.path());
    let packages = site.repositories().packages();

    let member_total: usize = packages.members().iter().map(|m| m.all().unwrap().len()).sum();
    assert_eq!(packages.all().unwrap().len(), member_total);

    // Installed and manually managed copies of the same plugin
    let acme = packages.matching(&Criteria::new().slug("acme")).unwrap();
    assert_eq!(acme.len(), 2);
    assert_ne!(acme[0].source_type(), acme[1].source_type());
}

#[test]
fn test_parts_are_separate() {
    let temp = site_fixture();
    let site = open_site(temp.path());

    let parts = site.repositories().parts().all().unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].kind(), PackageKind::Part);
    assert!(!site
        .repositories()
        .packages()
        .contains(&Criteria::new().slug("blocks"))
        .unwrap());
    assert!(site
        .repositories()
        .everything()
        .contains(&Criteria::new().slug("blocks"))
        .unwrap());
}

#[test]
fn test_managed_dependency_resolves_to_slug() {
    let temp = site_fixture();
    let site = open_site(temp.path());

    let acme = site
        .repositories()
        .packages()
        .first_where(&Criteria::new().slug("acme").is_managed(true))
        .unwrap()
        .unwrap();
    let required = acme.required_packages();
    assert_eq!(required.len(), 1);
    assert_eq!(required[0].composer_package_name, "blocks");
    assert_eq!(required[0].version_range, "^0.3");
}

#[test]
fn test_cached_repository_identity_and_reinitialize() {
    let temp = site_fixture();
    let site = open_site(temp.path());
    let plugins = CachedRepository::new(InstalledPlugins::new(
        temp.path().join("plugins"),
        None,
        Arc::clone(site.storage()),
        Arc::clone(site.store()),
    ));

    let first = plugins.all().unwrap();
    let second = plugins.all().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    write_plugin(temp.path(), "beta/beta.php", "Beta", "0.1.0");
    assert_eq!(plugins.all().unwrap().len(), 2);

    plugins.reinitialize().unwrap();
    let third = plugins.all().unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.len(), 3);
    assert_eq!(third[0].slug(), "acme");
    assert_eq!(third[1].slug(), "beta");
}

#[test]
fn test_filtered_view() {
    let temp = site_fixture();
    let site = open_site(temp.path());
    let multi: MultiRepository = site.repositories().packages().clone();

    let themes = multi.with_filter(|p| p.package_type() == PackageType::Theme);
    let all = themes.all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].slug(), "twentyacme");
}

#[test]
fn test_latest_release_is_version_max() {
    let mut builder = PackageBuilder::new(PackageType::Plugin, SourceType::LocalManual);
    builder.set_slug("acme");
    for version in ["1.0.0", "0.4.0", "0.3.2"] {
        builder.add_release(version, ReleaseSource::Stored);
    }
    let package = builder.build().unwrap();
    assert_eq!(package.get_latest_release().unwrap().version(), "1.0.0");

    let mut reversed = PackageBuilder::new(PackageType::Plugin, SourceType::LocalManual);
    reversed.set_slug("acme");
    for version in ["0.3.2", "0.4.0", "1.0.0"] {
        reversed.add_release(version, ReleaseSource::Stored);
    }
    assert_eq!(reversed.build().unwrap().get_latest_release().unwrap().version(), "1.0.0");
}

#[test]
fn test_release_lookup_errors() {
    let mut builder = PackageBuilder::new(PackageType::Plugin, SourceType::LocalManual);
    builder.set_slug("acme").add_release("1.0.0", ReleaseSource::Stored);
    let package = builder.build().unwrap();

    assert!(matches!(
        package.get_release("2.0.0"),
        Err(Error::InvalidReleaseVersion { .. })
    ));
    assert!(matches!(
        package.get_installed_release(),
        Err(Error::PackageNotInstalled(_))
    ));

    let repo = StaticRepository::new(vec![package]);
    assert!(repo.contains(&Criteria::new().slug("acme")).unwrap());
}

#[test]
#[serial]
fn test_site_found_from_nested_directory() {
    let temp = site_fixture();
    let nested = temp.path().join("plugins/acme");
    let previous = std::env::current_dir().unwrap();

    std::env::set_current_dir(&nested).unwrap();
    let site = Site::find(NetworkMode::Offline);
    std::env::set_current_dir(previous).unwrap();

    let site = site.unwrap();
    assert_eq!(
        site.paths().root.canonicalize().unwrap(),
        temp.path().canonicalize().unwrap()
    );
}
