//! Error types for the records repository
//!
//! Every failure in the repository, builder, release and transformer layers is
//! a typed variant of [`Error`]. Nothing below the route boundary catches its
//! own errors; the boundary maps them to an HTTP-equivalent status with
//! [`Error::status_code`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Invalid release version {version} for package {package}")]
    InvalidReleaseVersion { package: String, version: String },

    #[error("Invalid release source for {package} {version}: {reason}")]
    InvalidReleaseSource {
        package: String,
        version: String,
        reason: String,
    },

    #[error("Package {0} is not installed")]
    PackageNotInstalled(String),

    #[error("Invalid package artifact {path}: {reason}")]
    InvalidPackageArtifact { path: String, reason: String },

    #[error("File operation failed: {0}")]
    FileOperationFailed(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Forbidden: user {user} cannot {action} {resource}")]
    Forbidden {
        user: String,
        action: String,
        resource: String,
    },

    #[error("Missing release: {0}")]
    MissingRelease(String),

    #[error("Package build error: {0}")]
    PackageBuild(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// A requested version is not one of the package's releases.
    pub fn invalid_release(package: &str, version: &str) -> Self {
        Self::InvalidReleaseVersion {
            package: package.to_string(),
            version: version.to_string(),
        }
    }

    /// The release exists but its artifact could not be found in storage.
    pub fn missing_release(package: &str, version: &str) -> Self {
        Self::MissingRelease(format!("{} {}", package, version))
    }

    pub fn invalid_source(package: &str, version: &str, reason: impl Into<String>) -> Self {
        Self::InvalidReleaseSource {
            package: package.to_string(),
            version: version.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_artifact(path: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::InvalidPackageArtifact {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn forbidden(user: Option<u64>, action: &str, resource: impl Into<String>) -> Self {
        Self::Forbidden {
            user: user.map_or_else(|| "anonymous".to_string(), |id| id.to_string()),
            action: action.to_string(),
            resource: resource.into(),
        }
    }

    /// HTTP-equivalent status code for the route layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PackageNotFound(_) | Self::MissingRelease(_) => 404,
            Self::InvalidReleaseVersion { .. } => 404,
            Self::Unauthorized(_) => 401,
            Self::Forbidden { .. } => 403,
            Self::PackageNotInstalled(_) | Self::InvalidReleaseSource { .. } => 400,
            Self::InvalidPackageArtifact { .. } => 422,
            Self::Network(_) => 502,
            Self::Io(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::FileOperationFailed(_)
            | Self::PackageBuild(_) => 500,
        }
    }

    /// Whether the error means "nothing to serve" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == 404
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_errors_are_not_found() {
        assert_eq!(Error::invalid_release("acme", "9.9.9").status_code(), 404);
        assert_eq!(Error::missing_release("acme", "1.0.0").status_code(), 404);
        assert!(Error::PackageNotFound("acme".into()).is_not_found());
    }

    #[test]
    fn test_forbidden_message_names_user_and_resource() {
        let err = Error::forbidden(Some(7), "download", "acme 1.0.0");
        assert_eq!(err.status_code(), 403);
        let msg = err.to_string();
        assert!(msg.contains("user 7"));
        assert!(msg.contains("acme 1.0.0"));

        let anon = Error::forbidden(None, "view", "acme");
        assert!(anon.to_string().contains("anonymous"));
    }

    #[test]
    fn test_artifact_errors_are_unprocessable() {
        let err = Error::invalid_artifact("acme/acme-1.0.0.zip", "hidden directory");
        assert_eq!(err.status_code(), 422);
        assert!(err.to_string().contains("hidden directory"));
    }
}
