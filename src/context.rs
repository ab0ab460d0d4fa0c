//! Request context: who is asking and what they may do
//!
//! Repositories and transformers never look up the current user on their
//! own; they are handed a [`RequestContext`].

use crate::error::{Error, Result};
use crate::package::Package;
use crate::release::Release;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Site administration; sees every package regardless of visibility
    ManageOptions,
    ViewPackages,
    DownloadPackages,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ManageOptions => "manage_options",
            Capability::ViewPackages => "view_packages",
            Capability::DownloadPackages => "download_packages",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait CapabilityChecker: Send + Sync {
    fn user_can(&self, user: Option<u64>, capability: Capability) -> bool;

    /// Capability check scoped to one package (and optionally one release).
    fn user_can_for(
        &self,
        user: Option<u64>,
        capability: Capability,
        _package: &Package,
        _release: Option<&Release>,
    ) -> bool {
        self.user_can(user, capability)
    }
}

/// Every capability for everyone
#[derive(Debug, Default)]
pub struct AllCapabilities;

impl CapabilityChecker for AllCapabilities {
    fn user_can(&self, _user: Option<u64>, _capability: Capability) -> bool {
        true
    }
}

/// Capabilities granted per user id from a fixed table
#[derive(Debug, Default)]
pub struct StaticCapabilities {
    administrators: HashSet<u64>,
    grants: HashMap<u64, HashSet<Capability>>,
    anonymous: HashSet<Capability>,
}

impl StaticCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn administrator(mut self, user: u64) -> Self {
        self.administrators.insert(user);
        self
    }

    pub fn grant(mut self, user: u64, capability: Capability) -> Self {
        self.grants.entry(user).or_default().insert(capability);
        self
    }

    pub fn grant_anonymous(mut self, capability: Capability) -> Self {
        self.anonymous.insert(capability);
        self
    }
}

impl CapabilityChecker for StaticCapabilities {
    fn user_can(&self, user: Option<u64>, capability: Capability) -> bool {
        match user {
            None => self.anonymous.contains(&capability),
            Some(id) if self.administrators.contains(&id) => true,
            Some(id) => {
                self.anonymous.contains(&capability)
                    || self.grants.get(&id).is_some_and(|caps| caps.contains(&capability))
            }
        }
    }
}

#[derive(Clone)]
pub struct RequestContext {
    user: Option<u64>,
    capabilities: Arc<dyn CapabilityChecker>,
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext").field("user", &self.user).finish()
    }
}

impl RequestContext {
    pub fn new(user: Option<u64>, capabilities: Arc<dyn CapabilityChecker>) -> Self {
        Self { user, capabilities }
    }

    /// Local operator context (CLI): every capability.
    pub fn administrator() -> Self {
        Self::new(None, Arc::new(AllCapabilities))
    }

    /// Unauthenticated viewer with no capabilities.
    pub fn anonymous() -> Self {
        Self::new(None, Arc::new(StaticCapabilities::new()))
    }

    pub fn user(&self) -> Option<u64> {
        self.user
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.user_can(self.user, capability)
    }

    pub fn can_for(
        &self,
        capability: Capability,
        package: &Package,
        release: Option<&Release>,
    ) -> bool {
        self.capabilities
            .user_can_for(self.user, capability, package, release)
    }

    /// Fail with `Forbidden` unless the viewer holds `capability`.
    pub fn require(&self, capability: Capability, resource: &str) -> Result<()> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(Error::forbidden(self.user, capability.as_str(), resource))
        }
    }
}

/// Turns request credentials into a user id
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, api_key: &str) -> Result<u64>;
}

/// API keys mapped to user ids
#[derive(Debug, Default)]
pub struct StaticKeyAuthenticator {
    keys: HashMap<String, u64>,
}

impl StaticKeyAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, api_key: impl Into<String>, user: u64) -> Self {
        self.keys.insert(api_key.into(), user);
        self
    }
}

impl Authenticator for StaticKeyAuthenticator {
    fn authenticate(&self, api_key: &str) -> Result<u64> {
        if api_key.is_empty() {
            return Err(Error::Unauthorized("missing API key".to_string()));
        }
        self.keys
            .get(api_key)
            .copied()
            .ok_or_else(|| Error::Unauthorized("unknown API key".to_string()))
    }
}
