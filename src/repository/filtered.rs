//! Predicate view over another repository

use super::{PackageRepository, Packages};
use crate::error::Result;
use crate::package::Package;
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&Package) -> bool + Send + Sync>;

/// Stateless: every `all()` filters the wrapped repository's current list.
pub struct FilteredRepository<R> {
    inner: R,
    predicate: Predicate,
}

impl<R: PackageRepository> FilteredRepository<R> {
    pub fn new<F>(inner: R, predicate: F) -> Self
    where
        F: Fn(&Package) -> bool + Send + Sync + 'static,
    {
        Self {
            inner,
            predicate: Arc::new(predicate),
        }
    }
}

impl<R: PackageRepository> PackageRepository for FilteredRepository<R> {
    fn all(&self) -> Result<Packages> {
        let packages = self.inner.all()?;
        Ok(Arc::new(
            packages
                .iter()
                .filter(|p| (self.predicate)(p))
                .cloned()
                .collect(),
        ))
    }

    fn reinitialize(&self) -> Result<()> {
        self.inner.reinitialize()
    }
}
