//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the application
//! configuration from the configuration file (~/.config/lectio/config.toml),
//! with environment variables taking precedence.
//!
//! Priority:
//! 1. Environment variables (LECTIO_SUPABASE_URL, LECTIO_ANON_KEY,
//!    LECTIO_BIND_ADDR, LECTIO_SITE_URL)
//! 2. ~/.config/lectio/config.toml

use crate::paths::LectioPaths;
use lectio_core::error::{LectioError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::sync::{Arc, RwLock};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Root configuration for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LectioConfig {
    /// Base URL of the hosted backend, e.g. `https://xyz.supabase.co`.
    pub supabase_url: String,
    /// Public (anon) API key for the backend.
    pub anon_key: String,
    /// Address the web surface binds to.
    #[serde(default)]
    pub bind_addr: Option<String>,
    /// Externally visible origin, used to build the OAuth redirect
    /// target. Defaults to `http://{bind_addr}`.
    #[serde(default)]
    pub site_url: Option<String>,
}

impl LectioConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Applies environment variable overrides on top of file values.
    fn apply_env(mut self) -> Self {
        if let Ok(url) = env::var("LECTIO_SUPABASE_URL") {
            self.supabase_url = url;
        }
        if let Ok(key) = env::var("LECTIO_ANON_KEY") {
            self.anon_key = key;
        }
        if let Ok(addr) = env::var("LECTIO_BIND_ADDR") {
            self.bind_addr = Some(addr);
        }
        if let Ok(site) = env::var("LECTIO_SITE_URL") {
            self.site_url = Some(site);
        }
        self
    }

    /// Verifies that the backend coordinates are present.
    pub fn validate(&self) -> Result<()> {
        if self.supabase_url.trim().is_empty() {
            return Err(LectioError::config(
                "supabase_url is not set (config.toml or LECTIO_SUPABASE_URL)",
            ));
        }
        if self.anon_key.trim().is_empty() {
            return Err(LectioError::config(
                "anon_key is not set (config.toml or LECTIO_ANON_KEY)",
            ));
        }
        Ok(())
    }

    /// Bind address with the default applied.
    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    /// Origin used to build the OAuth redirect target.
    pub fn site_url(&self) -> String {
        self.site_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.bind_addr()))
    }

    /// The fixed return address for the external sign-in flow.
    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.site_url())
    }
}

/// Configuration service that loads and caches the root configuration.
///
/// This implementation reads the configuration from config.toml and
/// caches it to avoid repeated file I/O operations.
#[derive(Debug, Clone, Default)]
pub struct ConfigService {
    /// Cached configuration loaded from file.
    /// Uses RwLock for thread-safe lazy loading.
    config: Arc<RwLock<Option<LectioConfig>>>,
}

impl ConfigService {
    /// Creates a new ConfigService.
    ///
    /// The configuration is loaded lazily on first access to avoid
    /// blocking during initialization.
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading it if not cached.
    ///
    /// A missing config file is not an error; environment variables can
    /// carry the whole configuration.
    pub fn get_config(&self) -> Result<LectioConfig> {
        {
            let read_lock = self.config.read().unwrap();
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let path = LectioPaths::config_file()
            .map_err(|e| LectioError::config(e.to_string()))?;
        let loaded = Self::load_from(&path)?;

        {
            let mut write_lock = self.config.write().unwrap();
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Loads configuration from a specific file, then applies
    /// environment overrides.
    pub fn load_from(path: &Path) -> Result<LectioConfig> {
        let from_file = if path.exists() {
            let text = std::fs::read_to_string(path)?;
            LectioConfig::from_toml_str(&text)?
        } else {
            LectioConfig::default()
        };

        Ok(from_file.apply_env())
    }
}
