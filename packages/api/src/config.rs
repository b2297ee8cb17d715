//! Backend connection settings from the environment.
//!
//! Native builds read `PLATEWISE_SUPABASE_URL`, `PLATEWISE_SUPABASE_ANON_KEY` and
//! `PLATEWISE_SITE_ORIGIN` at runtime (a `.env` file is honoured). The browser has
//! no process environment, so WASM builds bake the same variables in at compile
//! time and take the site origin from `window.location` when it is not set.

use thiserror::Error;
use url::Url;

/// Origin used for redirect URLs when nothing else is known.
pub const DEFAULT_SITE_ORIGIN: &str = "http://localhost:8080";

const URL_VAR: &str = "PLATEWISE_SUPABASE_URL";
const ANON_KEY_VAR: &str = "PLATEWISE_SUPABASE_ANON_KEY";
#[cfg(not(target_arch = "wasm32"))]
const SITE_ORIGIN_VAR: &str = "PLATEWISE_SITE_ORIGIN";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("invalid backend URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Where the backend lives and how to identify this client to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: Url,
    pub anon_key: String,
    /// Origin of this application, used to build OAuth and password-reset
    /// redirect URLs. Never ends with `/`.
    pub site_origin: String,
}

impl BackendConfig {
    pub fn new(url: &str, anon_key: &str, site_origin: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(url.trim()).map_err(|e| ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ConfigError::InvalidUrl {
                url: url.to_string(),
                reason: "expected an http(s) URL with a host".to_string(),
            });
        }

        let anon_key = anon_key.trim();
        if anon_key.is_empty() {
            return Err(ConfigError::Missing(ANON_KEY_VAR));
        }

        Ok(Self {
            url: parsed,
            anon_key: anon_key.to_string(),
            site_origin: site_origin.trim().trim_end_matches('/').to_string(),
        })
    }

    /// Load from process environment variables, reading `.env` first.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let url = std::env::var(URL_VAR).map_err(|_| ConfigError::Missing(URL_VAR))?;
        let anon_key = std::env::var(ANON_KEY_VAR).map_err(|_| ConfigError::Missing(ANON_KEY_VAR))?;
        let site_origin =
            std::env::var(SITE_ORIGIN_VAR).unwrap_or_else(|_| DEFAULT_SITE_ORIGIN.to_string());

        Self::new(&url, &anon_key, &site_origin)
    }

    /// Load from variables captured when the crate was compiled.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        let url = option_env!("PLATEWISE_SUPABASE_URL").ok_or(ConfigError::Missing(URL_VAR))?;
        let anon_key =
            option_env!("PLATEWISE_SUPABASE_ANON_KEY").ok_or(ConfigError::Missing(ANON_KEY_VAR))?;
        let site_origin = option_env!("PLATEWISE_SITE_ORIGIN")
            .map(str::to_string)
            .unwrap_or_else(current_origin);

        Self::new(url, anon_key, &site_origin)
    }

    /// The backend URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }

    /// First label of the backend host: `abcd` for `https://abcd.supabase.co`.
    pub fn project_ref(&self) -> &str {
        self.url
            .host_str()
            .and_then(|host| host.split('.').next())
            .filter(|label| !label.is_empty())
            .unwrap_or("local")
    }

    /// Key under which the session is persisted between page loads.
    pub fn storage_key(&self) -> String {
        format!("sb-{}-auth-token", self.project_ref())
    }

    /// Absolute URL for a path on this application's own origin.
    pub fn redirect_url(&self, path: &str) -> String {
        format!("{}{}", self.site_origin, path)
    }
}

fn current_origin() -> String {
    #[cfg(target_arch = "wasm32")]
    {
        web_sys::window()
            .and_then(|window| window.location().origin().ok())
            .unwrap_or_else(|| DEFAULT_SITE_ORIGIN.to_string())
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        DEFAULT_SITE_ORIGIN.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_and_derives_storage_key() {
        let config =
            BackendConfig::new("https://abcd.supabase.co/", " anon ", "https://app.example/").unwrap();
        assert_eq!(config.base_url(), "https://abcd.supabase.co");
        assert_eq!(config.anon_key, "anon");
        assert_eq!(config.site_origin, "https://app.example");
        assert_eq!(config.project_ref(), "abcd");
        assert_eq!(config.storage_key(), "sb-abcd-auth-token");
        assert_eq!(
            config.redirect_url("/auth/callback"),
            "https://app.example/auth/callback"
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = BackendConfig::new("ftp://abcd.supabase.co", "anon", DEFAULT_SITE_ORIGIN).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));

        let err = BackendConfig::new("not a url", "anon", DEFAULT_SITE_ORIGIN).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn test_rejects_empty_key() {
        let err = BackendConfig::new("https://abcd.supabase.co", "  ", DEFAULT_SITE_ORIGIN).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ANON_KEY_VAR));
        assert_eq!(err.to_string(), "PLATEWISE_SUPABASE_ANON_KEY not set");
    }
}
