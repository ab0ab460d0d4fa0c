//! Plugins and themes installed on the site

use super::{sorted, PackageRepository, Packages};
use crate::error::Result;
use crate::managed::{self, ManagedCriteria, ManagedPackageStore};
use crate::package::headers::{self, PluginFile};
use crate::package::readme::Readme;
use crate::package::{PackageBuilder, PackageType, SourceType};
use crate::storage::Storage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Apply the managed entry for an installed package, when there is one.
fn apply_managed(
    builder: &mut PackageBuilder,
    store: &dyn ManagedPackageStore,
    source_type: SourceType,
    source_name: &str,
) {
    let criteria = ManagedCriteria::new()
        .source_types(&[source_type])
        .source_name(source_name);
    let Some(id) = store.get_package_ids_by(&criteria).into_iter().next() else {
        return;
    };
    if let Some(entry) = store.get_package_data(id) {
        builder
            .from_manager(&entry)
            .with_required_packages(managed::resolve_dependencies(store, &entry.required_packages))
            .with_replaced_packages(managed::resolve_dependencies(store, &entry.replaced_packages));
    }
}

fn readme_in(dir: &Path) -> Option<Readme> {
    ["readme.txt", "README.txt"]
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .map(|path| Readme::from_file(&path))
}

/// Regular plugins plus, when configured, must-use plugins
pub struct InstalledPlugins {
    plugins_dir: PathBuf,
    mu_plugins_dir: Option<PathBuf>,
    storage: Arc<dyn Storage>,
    store: Arc<dyn ManagedPackageStore>,
}

impl InstalledPlugins {
    pub fn new(
        plugins_dir: impl Into<PathBuf>,
        mu_plugins_dir: Option<PathBuf>,
        storage: Arc<dyn Storage>,
        store: Arc<dyn ManagedPackageStore>,
    ) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            mu_plugins_dir,
            storage,
            store,
        }
    }

    fn build(
        &self,
        plugin: &PluginFile,
        package_type: PackageType,
    ) -> Result<crate::package::Package> {
        let mut builder = PackageBuilder::new(package_type, SourceType::LocalPlugin);
        builder.from_basename(&plugin.basename);
        apply_managed(&mut builder, self.store.as_ref(), SourceType::LocalPlugin, &plugin.basename);
        builder.from_plugin_file(plugin);
        if plugin.source.is_dir() {
            if let Some(readme) = readme_in(&plugin.source) {
                builder.from_readme(&readme);
            }
        }
        builder.add_installed_release();
        builder.add_cached_releases(self.storage.as_ref())?;
        builder.build()
    }
}

impl PackageRepository for InstalledPlugins {
    fn all(&self) -> Result<Packages> {
        let mut packages = Vec::new();

        for plugin in headers::find_plugin_files(&self.plugins_dir) {
            packages.push(self.build(&plugin, PackageType::Plugin)?);
        }

        if let Some(mu_dir) = &self.mu_plugins_dir {
            // WordPress only loads top-level files from mu-plugins
            for plugin in headers::find_plugin_files(mu_dir)
                .into_iter()
                .filter(|p| !p.basename.contains('/'))
            {
                packages.push(self.build(&plugin, PackageType::MuPlugin)?);
            }
        }

        debug!(count = packages.len(), dir = %self.plugins_dir.display(), "installed plugins");
        Ok(sorted(packages))
    }

    fn reinitialize(&self) -> Result<()> {
        self.store.reinitialize()
    }
}

pub struct InstalledThemes {
    themes_dir: PathBuf,
    storage: Arc<dyn Storage>,
    store: Arc<dyn ManagedPackageStore>,
}

impl InstalledThemes {
    pub fn new(
        themes_dir: impl Into<PathBuf>,
        storage: Arc<dyn Storage>,
        store: Arc<dyn ManagedPackageStore>,
    ) -> Self {
        Self {
            themes_dir: themes_dir.into(),
            storage,
            store,
        }
    }
}

impl PackageRepository for InstalledThemes {
    fn all(&self) -> Result<Packages> {
        let mut packages = Vec::new();

        for dir in headers::find_theme_dirs(&self.themes_dir) {
            let slug = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let mut builder = PackageBuilder::new(PackageType::Theme, SourceType::LocalTheme);
            builder.from_slug(&slug);
            apply_managed(&mut builder, self.store.as_ref(), SourceType::LocalTheme, &slug);
            builder.from_theme_dir(&dir);
            if let Some(readme) = readme_in(&dir) {
                builder.from_readme(&readme);
            }
            builder.add_installed_release();
            builder.add_cached_releases(self.storage.as_ref())?;
            packages.push(builder.build()?);
        }

        debug!(count = packages.len(), dir = %self.themes_dir.display(), "installed themes");
        Ok(sorted(packages))
    }

    fn reinitialize(&self) -> Result<()> {
        self.store.reinitialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managed::{FileManagedStore, ManagedPackage};
    use crate::package::Visibility;
    use crate::repository::Criteria;
    use crate::storage::LocalStorage;
    use std::fs;
    use tempfile::TempDir;

    fn write_plugin(dir: &Path, basename: &str, name: &str, version: &str) {
        let path = dir.join(basename);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            path,
            format!("<?php\n/*\nPlugin Name: {}\nVersion: {}\n*/", name, version),
        )
        .unwrap();
    }

    #[test]
    fn test_installed_plugins_sorted_with_releases() {
        let temp = TempDir::new().unwrap();
        let plugins = temp.path().join("plugins");
        let mu = temp.path().join("mu-plugins");
        write_plugin(&plugins, "zeta/zeta.php", "Zeta", "2.0.0");
        write_plugin(&plugins, "acme/acme.php", "Acme", "1.4.2");
        write_plugin(&mu, "loader.php", "Loader", "1.0");
        fs::write(
            plugins.join("acme/readme.txt"),
            "=== Acme ===\nTags: widgets\n\nShort text.\n",
        )
        .unwrap();

        let repo = InstalledPlugins::new(
            &plugins,
            Some(mu),
            Arc::new(LocalStorage::new(temp.path().join("storage"))),
            Arc::new(FileManagedStore::from_packages(Vec::new())),
        );
        let all = repo.all().unwrap();

        let slugs: Vec<&str> = all.iter().map(|p| p.slug()).collect();
        assert_eq!(slugs, vec!["acme", "loader", "zeta"]);
        assert_eq!(all[1].package_type(), PackageType::MuPlugin);
        assert_eq!(all[0].description(), "Short text.");
        assert_eq!(all[0].keywords(), &["widgets".to_string()]);
        assert_eq!(all[0].get_installed_release().unwrap().version(), "1.4.2");
        assert!(!all[0].is_managed());
    }

    #[test]
    fn test_managed_entry_applies_to_installed_plugin() {
        let temp = TempDir::new().unwrap();
        let plugins = temp.path().join("plugins");
        write_plugin(&plugins, "acme/acme.php", "Acme", "1.4.2");

        let store = FileManagedStore::from_packages(vec![ManagedPackage {
            id: 5,
            slug: "acme".into(),
            source_type: SourceType::LocalPlugin,
            source_name: "acme/acme.php".into(),
            name: "Acme Managed".into(),
            visibility: Visibility::Private,
            ..ManagedPackage::default()
        }]);

        let repo = InstalledPlugins::new(
            &plugins,
            None,
            Arc::new(LocalStorage::new(temp.path().join("storage"))),
            Arc::new(store),
        );
        let acme = repo
            .first_where(&Criteria::new().slug("acme/acme.php"))
            .unwrap()
            .unwrap();
        assert_eq!(acme.name(), "Acme Managed");
        assert_eq!(acme.managed_post_id(), Some(5));
        assert_eq!(acme.visibility(), Visibility::Private);
    }

    #[test]
    fn test_installed_themes() {
        let temp = TempDir::new().unwrap();
        let themes = temp.path().join("themes");
        fs::create_dir_all(themes.join("twentyacme")).unwrap();
        fs::write(
            themes.join("twentyacme/style.css"),
            "/*\nTheme Name: Twenty Acme\nVersion: 2.0\n*/",
        )
        .unwrap();

        let repo = InstalledThemes::new(
            &themes,
            Arc::new(LocalStorage::new(temp.path().join("storage"))),
            Arc::new(FileManagedStore::from_packages(Vec::new())),
        );
        let all = repo.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name(), "Twenty Acme");
        assert_eq!(all[0].source_type(), SourceType::LocalTheme);
        assert!(all[0].has_release("2.0"));
    }
}
