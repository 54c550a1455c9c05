//! Configuration for the roles plugin
//!
//! Options can be built in code or loaded from a TOML file with a
//! `[roles]` table.
//!
//! # Example
//!
//! ```rust,ignore
//! use openapi_roles::config::load_options;
//!
//! let options = load_options("roles.toml")?;
//! let plugin = openapi_roles::RolesPlugin::new(options);
//! ```

use crate::{Result, RolesError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolesConfig {
    /// Roles plugin section
    #[serde(default)]
    pub roles: Option<RolesOptions>,
}

impl RolesConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_config(path)
    }

    /// Get the roles section, or default options when it is absent
    pub fn roles_options(&self) -> RolesOptions {
        self.roles.clone().unwrap_or_default()
    }
}

/// Options recognized by the roles plugin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolesOptions {
    /// Every role name that may appear in `x-exegesis-roles`. When set,
    /// compiling a document that uses any other role fails.
    #[serde(default, alias = "allowedRoles")]
    pub allowed_roles: Option<Vec<String>>,
}

impl RolesOptions {
    pub fn with_allowed_roles<I, T>(roles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            allowed_roles: Some(roles.into_iter().map(Into::into).collect()),
        }
    }

    /// Load options from the `[roles]` table of a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_options(path)
    }
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RolesConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| RolesError::Config(format!("Failed to read config file: {}", e)))?;

    toml::from_str(&content)
        .map_err(|e| RolesError::Config(format!("Failed to parse TOML config: {}", e)))
}

/// Load plugin options from a TOML file
pub fn load_options<P: AsRef<Path>>(path: P) -> Result<RolesOptions> {
    load_config(path).map(|config| config.roles_options())
}
