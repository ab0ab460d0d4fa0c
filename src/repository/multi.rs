//! Union of repositories

use super::{PackageRepository, Packages};
use crate::error::Result;
use std::sync::Arc;

/// Concatenates its members' packages in member order.
///
/// Packages are not deduplicated: a plugin that is both installed and
/// manually managed appears once per source. Callers narrow with criteria
/// when they need one.
#[derive(Default, Clone)]
pub struct MultiRepository {
    members: Vec<Arc<dyn PackageRepository>>,
}

impl MultiRepository {
    pub fn new(members: Vec<Arc<dyn PackageRepository>>) -> Self {
        Self { members }
    }

    pub fn push(&mut self, member: Arc<dyn PackageRepository>) {
        self.members.push(member);
    }

    pub fn members(&self) -> &[Arc<dyn PackageRepository>] {
        &self.members
    }
}

impl PackageRepository for MultiRepository {
    fn all(&self) -> Result<Packages> {
        let mut packages = Vec::new();
        for member in &self.members {
            packages.extend(member.all()?.iter().cloned());
        }
        Ok(Arc::new(packages))
    }

    fn reinitialize(&self) -> Result<()> {
        for member in &self.members {
            member.reinitialize()?;
        }
        Ok(())
    }
}
