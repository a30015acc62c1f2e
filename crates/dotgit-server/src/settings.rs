//! Server settings, read from `DOTGIT_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Runtime settings of the job service.
///
/// | Variable                     | Default          |
/// |------------------------------|------------------|
/// | `DOTGIT_HOST`                | `0.0.0.0`        |
/// | `DOTGIT_PORT`                | `8888`           |
/// | `DOTGIT_TOKENS`              | none (comma list)|
/// | `DOTGIT_OUTPUT_ROOT`         | `gits`           |
/// | `DOTGIT_WORKERS`             | `4`              |
/// | `DOTGIT_TIMEOUT_SECS`        | `30`             |
/// | `DOTGIT_RETRIES`             | `3`              |
/// | `DOTGIT_JOB_TTL_SECS`        | `86400`          |
/// | `DOTGIT_MAX_JOBS`            | `10000`          |
/// | `DOTGIT_LEAKS_ENABLED`       | `false`          |
/// | `DOTGIT_GITLEAKS_EXECUTABLE` | `gitleaks`       |
/// | `DOTGIT_GIT_EXECUTABLE`      | `git`            |
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_job_ttl_secs")]
    pub job_ttl_secs: u64,
    #[serde(default = "default_max_jobs")]
    pub max_jobs: u64,
    #[serde(default)]
    pub leaks_enabled: bool,
    #[serde(default = "default_gitleaks_executable")]
    pub gitleaks_executable: String,
    #[serde(default = "default_git_executable")]
    pub git_executable: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8888
}

fn default_output_root() -> PathBuf {
    PathBuf::from("gits")
}

fn default_workers() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_job_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_max_jobs() -> u64 {
    10_000
}

fn default_gitleaks_executable() -> String {
    "gitleaks".to_string()
}

fn default_git_executable() -> String {
    "git".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tokens: Vec::new(),
            output_root: default_output_root(),
            workers: default_workers(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            job_ttl_secs: default_job_ttl_secs(),
            max_jobs: default_max_jobs(),
            leaks_enabled: false,
            gitleaks_executable: default_gitleaks_executable(),
            git_executable: default_git_executable(),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_environment(environment())
    }

    /// Reads settings from the given environment source.
    pub fn from_environment(env: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(env)
            .build()?
            .try_deserialize()?;

        if settings.workers == 0 {
            return Err(ConfigError::Message("workers must be at least 1".into()));
        }
        if settings.timeout_secs == 0 {
            return Err(ConfigError::Message("timeout_secs must be positive".into()));
        }
        Ok(settings)
    }

    /// Returns the socket address to bind.
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Returns the default per-request timeout of a dump.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns how long finished job records are kept.
    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.job_ttl_secs)
    }

    /// Returns true if `token` is one of the configured tokens.
    pub fn accepts_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }
}

/// The `DOTGIT_` environment source, with `DOTGIT_TOKENS` split on commas.
pub fn environment() -> Environment {
    Environment::with_prefix("DOTGIT")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("tokens")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let source = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_environment(environment().source(Some(source)))
    }

    #[test]
    fn test_defaults() {
        let settings = from_vars(&[]).unwrap();
        assert_eq!(settings.port, 8888);
        assert_eq!(settings.workers, 4);
        assert!(settings.tokens.is_empty());
        assert!(!settings.leaks_enabled);
        assert_eq!(settings.job_ttl(), Duration::from_secs(86_400));
        assert_eq!(settings.addr().unwrap().to_string(), "0.0.0.0:8888");
    }

    #[test]
    fn test_environment_overrides() {
        let settings = from_vars(&[
            ("DOTGIT_PORT", "9000"),
            ("DOTGIT_TOKENS", "alpha,beta"),
            ("DOTGIT_OUTPUT_ROOT", "/srv/dumps"),
            ("DOTGIT_WORKERS", "2"),
            ("DOTGIT_LEAKS_ENABLED", "true"),
        ])
        .unwrap();

        assert_eq!(settings.port, 9000);
        assert_eq!(settings.tokens, vec!["alpha", "beta"]);
        assert_eq!(settings.output_root, PathBuf::from("/srv/dumps"));
        assert_eq!(settings.workers, 2);
        assert!(settings.leaks_enabled);
        assert!(settings.accepts_token("beta"));
        assert!(!settings.accepts_token("gamma"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(from_vars(&[("DOTGIT_WORKERS", "0")]).is_err());
    }
}
