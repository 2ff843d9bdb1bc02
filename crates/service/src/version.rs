use std::fmt;

use serde::Serialize;

/// Version and build metadata captured at compile time.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub package_version: &'static str,
    pub build_profile: &'static str,
    pub build_features: &'static str,
    pub build_timestamp: &'static str,
    pub rust_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_target: Option<&'static str>,
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("REPO_VERSION"),
        package_version: env!("CARGO_PKG_VERSION"),
        build_profile: env!("BUILD_PROFILE"),
        build_features: env!("BUILD_FEATURES"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        rust_version: env!("RUST_VERSION"),
        build_target: option_env!("BUILD_TARGET"),
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reprocess {} ({}, {} build",
            self.package_version, self.version, self.build_profile
        )?;
        if let Some(target) = self.build_target {
            write!(f, ", {}", target)?;
        }
        write!(f, ")\nbuilt {} with {}", self.build_timestamp, self.rust_version)
    }
}
