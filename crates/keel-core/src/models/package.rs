//! Package managers the sandbox can install dependencies with.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A package manager and how it spells "install these packages".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
    Pnpm,
    Pip,
    Pip3,
}

impl FromStr for PackageManager {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "npm" => Ok(PackageManager::Npm),
            "yarn" => Ok(PackageManager::Yarn),
            "pnpm" => Ok(PackageManager::Pnpm),
            "pip" => Ok(PackageManager::Pip),
            "pip3" => Ok(PackageManager::Pip3),
            _ => Err(format!("Unsupported package manager: {s}")),
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl PackageManager {
    pub fn program(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Pip => "pip",
            PackageManager::Pip3 => "pip3",
        }
    }

    /// Subcommand that adds packages.
    pub fn install_verb(&self) -> &'static str {
        match self {
            PackageManager::Yarn | PackageManager::Pnpm => "add",
            PackageManager::Npm | PackageManager::Pip | PackageManager::Pip3 => "install",
        }
    }

    /// Arguments for installing `packages`.
    ///
    /// ```rust
    /// use keel_core::models::PackageManager;
    ///
    /// let args = PackageManager::Yarn.install_args(&["left-pad".to_string()]);
    /// assert_eq!(args, ["add", "left-pad"]);
    /// ```
    pub fn install_args(&self, packages: &[String]) -> Vec<String> {
        std::iter::once(self.install_verb().to_string())
            .chain(packages.iter().cloned())
            .collect()
    }
}
