//! Memoized repository

use super::{PackageRepository, Packages};
use crate::error::Result;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Computes the wrapped repository's `all()` once and hands out the same
/// list until [`reinitialize`](PackageRepository::reinitialize).
pub struct CachedRepository<R> {
    inner: R,
    cache: Mutex<Option<Packages>>,
}

impl<R: PackageRepository> CachedRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: PackageRepository> PackageRepository for CachedRepository<R> {
    fn all(&self) -> Result<Packages> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(packages) = cache.as_ref() {
            return Ok(Arc::clone(packages));
        }
        let packages = self.inner.all()?;
        debug!(count = packages.len(), "cached repository packages");
        *cache = Some(Arc::clone(&packages));
        Ok(packages)
    }

    fn reinitialize(&self) -> Result<()> {
        self.inner.reinitialize()?;
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{Package, PackageBuilder, PackageType, SourceType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
    }

    impl PackageRepository for Counting {
        fn all(&self) -> Result<Packages> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let mut builder = PackageBuilder::new(PackageType::Plugin, SourceType::LocalManual);
            builder.set_slug(format!("pkg-{}", n));
            let packages: Vec<Package> = vec![builder.build()?];
            Ok(Arc::new(packages))
        }
    }

    #[test]
    fn test_identity_stable_until_reinitialize() {
        let repo = CachedRepository::new(Counting {
            calls: AtomicUsize::new(0),
        });

        let first = repo.all().unwrap();
        let second = repo.all().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(repo.inner().calls.load(Ordering::SeqCst), 1);

        repo.reinitialize().unwrap();
        let third = repo.all().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third[0].slug(), "pkg-1");
    }
}
