//! Secret scanning of finished dumps with gitleaks.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::{info, warn};

/// Exit code gitleaks is told to use when it finds leaks.
const LEAKS_EXIT_CODE: i32 = 2;

/// One gitleaks finding. Fields other than the dedup key are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leak {
    #[serde(rename = "File", default)]
    pub file: String,
    #[serde(rename = "Secret", default)]
    pub secret: String,
    #[serde(rename = "RuleID", default)]
    pub rule_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Errors of a scan run.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("could not run {executable}: {source}")]
    Spawn {
        executable: String,
        source: std::io::Error,
    },
}

/// Looks for secrets in a dumped repository.
#[async_trait]
pub trait SecretScanner: Send + Sync {
    async fn scan(&self, dir: &Path) -> Result<Vec<Leak>, ScanError>;
}

/// Runs gitleaks over the git history and over the plain working tree.
#[derive(Debug, Clone)]
pub struct Gitleaks {
    executable: String,
}

impl Gitleaks {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    async fn run(&self, dir: &Path, report: &Path, no_git: bool) -> Result<Vec<Leak>, ScanError> {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("detect")
            .arg("--source")
            .arg(dir)
            .args(["--report-format", "json", "--report-path"])
            .arg(report)
            .arg("--no-banner");
        if no_git {
            cmd.arg("--no-git");
        }
        cmd.args(["--exit-code", "2"]);

        let output = cmd.output().await.map_err(|source| ScanError::Spawn {
            executable: self.executable.clone(),
            source,
        })?;

        match output.status.code() {
            Some(0) => Ok(Vec::new()),
            Some(LEAKS_EXIT_CODE) => Ok(read_report(report).await),
            code => {
                warn!(
                    "{} exited with {:?}: {}",
                    self.executable,
                    code,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                Ok(Vec::new())
            },
        }
    }
}

#[async_trait]
impl SecretScanner for Gitleaks {
    async fn scan(&self, dir: &Path) -> Result<Vec<Leak>, ScanError> {
        let history = self.run(dir, &report_path(dir, "report_git.json"), false).await?;
        let tree = self
            .run(dir, &report_path(dir, "report_no_git.json"), true)
            .await?;

        let leaks = dedup(history.into_iter().chain(tree));
        info!("{} distinct leaks in {}", leaks.len(), dir.display());
        Ok(leaks)
    }
}

fn report_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

async fn read_report(path: &Path) -> Vec<Leak> {
    let parsed = tokio::fs::read(path)
        .await
        .map_err(|e| e.to_string())
        .and_then(|bytes| serde_json::from_slice(&bytes).map_err(|e| e.to_string()));

    match parsed {
        Ok(leaks) => leaks,
        Err(e) => {
            warn!("Could not read report {}: {}", path.display(), e);
            Vec::new()
        },
    }
}

/// Drops findings whose `(File, Secret, RuleID)` was already seen.
pub fn dedup(leaks: impl IntoIterator<Item = Leak>) -> Vec<Leak> {
    let mut seen = HashSet::new();
    leaks
        .into_iter()
        .filter(|leak| seen.insert((leak.file.clone(), leak.secret.clone(), leak.rule_id.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leak(file: &str, secret: &str, rule: &str, line: u64) -> Leak {
        serde_json::from_value(serde_json::json!({
            "File": file,
            "Secret": secret,
            "RuleID": rule,
            "StartLine": line,
        }))
        .unwrap()
    }

    #[test]
    fn test_dedup_by_file_secret_rule() {
        let leaks = dedup([
            leak("a.env", "s3cr3t", "generic-api-key", 1),
            leak("a.env", "s3cr3t", "generic-api-key", 9),
            leak("a.env", "s3cr3t", "aws-access-token", 1),
            leak("b.env", "s3cr3t", "generic-api-key", 1),
        ]);

        assert_eq!(leaks.len(), 3);
        assert_eq!(leaks[0].extra["StartLine"], 1);
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let leak = leak("config.yml", "hunter2", "password", 4);
        let json = serde_json::to_value(&leak).unwrap();
        assert_eq!(json["File"], "config.yml");
        assert_eq!(json["RuleID"], "password");
        assert_eq!(json["StartLine"], 4);
    }

    #[tokio::test]
    async fn test_missing_executable_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = Gitleaks::new("/nonexistent/gitleaks");
        assert!(scanner.scan(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_clean_run_has_no_leaks() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = Gitleaks::new("true");
        assert!(scanner.scan(dir.path()).await.unwrap().is_empty());
    }
}
