//! Default layer discovery.
//!
//! Builds the standard chain of configuration layers (lowest to highest):
//! 1. **Base** - an explicit file from `CONFCHAIN_BASE`, if set
//! 2. **App** - `confchain.yaml` in `CONFCHAIN_APP_DIR` (default: the cwd)
//! 3. **User** - `confchain.yaml` in `CONFCHAIN_USER_DIR` (default: `~/.confchain`)
//!
//! Command-line overrides are appended by the caller as a static layer.

use super::chain::ChainConfig;
use super::layer::PathLayer;
use std::path::{Path, PathBuf};

/// File name looked up in each layer directory.
pub const CONFIG_FILE_NAME: &str = "confchain.yaml";

/// Default layer, by precedence (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Shipped or system-wide defaults (lowest priority)
    Base = 0,
    /// Application config next to where the process runs
    App = 1,
    /// Per-user overrides
    User = 2,
}

impl ConfigTier {
    pub fn name(self) -> &'static str {
        match self {
            ConfigTier::Base => "base",
            ConfigTier::App => "app",
            ConfigTier::User => "user",
        }
    }
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Locations of the default layers.
#[derive(Debug, Clone, Default)]
pub struct ChainPaths {
    /// Explicit base config file
    pub base_file: Option<PathBuf>,
    /// Directory holding the app-level config file
    pub app_dir: Option<PathBuf>,
    /// Directory holding the user-level config file
    pub user_dir: Option<PathBuf>,
}

impl ChainPaths {
    /// Discover layer locations from environment and defaults.
    pub fn discover() -> Self {
        let base_file = std::env::var_os("CONFCHAIN_BASE").map(PathBuf::from);

        let app_dir = std::env::var_os("CONFCHAIN_APP_DIR")
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from(".")));

        let user_dir = std::env::var_os("CONFCHAIN_USER_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".confchain")));

        Self {
            base_file,
            app_dir,
            user_dir,
        }
    }

    /// Create paths with explicit locations.
    pub fn with_dirs(
        base_file: Option<PathBuf>,
        app_dir: Option<PathBuf>,
        user_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            base_file,
            app_dir,
            user_dir,
        }
    }

    /// The config file for a tier, if that tier is configured.
    pub fn tier_file(&self, tier: ConfigTier) -> Option<PathBuf> {
        match tier {
            ConfigTier::Base => self.base_file.clone(),
            ConfigTier::App => self.app_dir.as_deref().map(config_file_in),
            ConfigTier::User => self.user_dir.as_deref().map(config_file_in),
        }
    }

    /// Build an unloaded chain with one file layer per configured tier.
    ///
    /// Missing files are fine: they load as empty layers and are picked up
    /// once they appear.
    pub fn build_chain(&self) -> ChainConfig {
        let mut chain = ChainConfig::new();
        for tier in [ConfigTier::Base, ConfigTier::App, ConfigTier::User] {
            if let Some(file) = self.tier_file(tier) {
                chain.insert(tier.name(), PathLayer::new(file));
            }
        }
        chain
    }
}

fn config_file_in(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}
