//! Runtime settings: where the services live and how to authenticate.
//!
//! Settings are layered: built-in defaults, then an optional TOML file,
//! then `HORUSEC_E2E_*` environment variables. Nested keys use a double
//! underscore, e.g. `HORUSEC_E2E_FIXTURE__EMAIL`.
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::scenario::Fixture;

pub const DEFAULT_AUTH_URL: &str = "http://127.0.0.1:8006";
pub const DEFAULT_ACCOUNT_URL: &str = "http://127.0.0.1:8003";
pub const DEFAULT_AUTH_HEADER: &str = "X-Horusec-Authorization";

const APP_DIR: &str = "horusec-e2e";
const ENV_PREFIX: &str = "HORUSEC_E2E";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to find config file path")]
    NoConfigDir,
    #[error("failed to load settings")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the auth service.
    pub auth_url: String,
    /// Base URL of the account service.
    pub account_url: String,
    /// Header that carries the bearer token.
    pub auth_header: String,
    /// Per request timeout. The HTTP client default applies when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub fixture: Fixture,
}

impl Default for Settings {
    fn default() -> Self {
        Self::local(DEFAULT_AUTH_URL, DEFAULT_ACCOUNT_URL)
    }
}

impl Settings {
    /// Settings for services at the given base URLs, everything else
    /// defaulted.
    pub fn local(auth_url: impl Into<String>, account_url: impl Into<String>) -> Self {
        Self {
            auth_url: auth_url.into(),
            account_url: account_url.into(),
            auth_header: DEFAULT_AUTH_HEADER.to_owned(),
            timeout_secs: None,
            fixture: Fixture::default(),
        }
    }

    /// Loads settings from the default config file location, if the file
    /// exists, and the environment.
    pub fn load() -> Result<Self, SettingsError> {
        let path = config_file_path()?;

        Self::load_from(&path, false)
    }

    /// Loads settings from `path` and the environment. A missing file is an
    /// error only when `required` is set.
    pub fn load_from(path: &Path, required: bool) -> Result<Self, SettingsError> {
        debug!("loading settings from {:?}", path);

        let settings = Config::builder()
            .set_default("auth_url", DEFAULT_AUTH_URL)?
            .set_default("account_url", DEFAULT_ACCOUNT_URL)?
            .set_default("auth_header", DEFAULT_AUTH_HEADER)?
            .add_source(
                File::from(path.to_path_buf())
                    .required(required)
                    .format(FileFormat::Toml),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Finds the location of this app's config file.
pub fn config_file_path() -> Result<PathBuf, SettingsError> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(path) => PathBuf::from(path),
        None => dirs::home_dir()
            .ok_or(SettingsError::NoConfigDir)?
            .join(".config"),
    };

    Ok(base.join(APP_DIR).join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::TempDir;

    /// Serializes the tests that read the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Environment variables that are removed again on drop.
    struct EnvVars(Vec<&'static str>);

    impl EnvVars {
        fn set(vars: &[(&'static str, &str)]) -> Self {
            for (key, value) in vars {
                std::env::set_var(key, value);
            }

            Self(vars.iter().map(|(key, _)| *key).collect())
        }
    }

    impl Drop for EnvVars {
        fn drop(&mut self) {
            for key in &self.0 {
                std::env::remove_var(key);
            }
        }
    }

    fn config_file(contents: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn missing_optional_file_yields_defaults() {
        let _lock = env_lock();
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.toml"), false).unwrap();

        assert_eq!(settings.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(settings.account_url, DEFAULT_ACCOUNT_URL);
        assert_eq!(settings.auth_header, DEFAULT_AUTH_HEADER);
        assert_eq!(settings.timeout(), None);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let _lock = env_lock();
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            Settings::load_from(&dir.path().join("config.toml"), true),
            Err(SettingsError::Load(_))
        ));
    }

    #[test]
    fn file_overrides_defaults() {
        let _lock = env_lock();
        let (_dir, path) = config_file(
            r#"
            account_url = "http://account.staging:8003"
            timeout_secs = 15

            [fixture]
            email = "staging@horusec.io"
            "#,
        );
        let settings = Settings::load_from(&path, true).unwrap();

        assert_eq!(settings.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(settings.account_url, "http://account.staging:8003");
        assert_eq!(settings.timeout(), Some(Duration::from_secs(15)));
        assert_eq!(settings.fixture.email, "staging@horusec.io");
        assert_eq!(settings.fixture.password, Fixture::default().password);
    }

    #[test]
    fn environment_overrides_file_and_defaults() {
        let _lock = env_lock();
        let (_dir, path) = config_file(
            r#"
            auth_url = "http://auth.from-file:8006"

            [fixture]
            email = "file@horusec.io"
            "#,
        );
        let _vars = EnvVars::set(&[
            ("HORUSEC_E2E_AUTH_URL", "http://auth.from-env:8006"),
            ("HORUSEC_E2E_AUTH_HEADER", "X-From-Env"),
            ("HORUSEC_E2E_FIXTURE__EMAIL", "env@horusec.io"),
        ]);

        let settings = Settings::load_from(&path, true).unwrap();

        assert_eq!(settings.auth_url, "http://auth.from-env:8006");
        assert_eq!(settings.auth_header, "X-From-Env");
        assert_eq!(settings.account_url, DEFAULT_ACCOUNT_URL);
        assert_eq!(settings.fixture.email, "env@horusec.io");
        assert_eq!(settings.fixture.username, Fixture::default().username);
    }
}
