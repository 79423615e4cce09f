//! Doctor command for system diagnostics
//!
//! Health checks for configuration, the model bundle and the remote
//! services the pipeline talks to.

use crate::advisor;
use crate::config::Config;
use crate::ensemble::ModelBundle;
use crate::telemetry::TelemetryCollector;
use colored::Colorize;
use std::path::PathBuf;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
        }
    }
}

/// Doctor diagnostics system
pub struct Doctor {
    config: Config,
    config_path: Option<PathBuf>,
}

impl Doctor {
    /// Create a new doctor instance
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        vec![
            self.check_config_file(),
            self.check_config_values(),
            self.check_model_bundle(),
            self.check_api_key("Advisor API Key", self.config.advisor.api_key_env.as_deref(), self.config.advisor.enabled),
            self.check_advisor().await,
            self.check_api_key("Transcription Key", self.config.transcription.api_key_env.as_deref(), false),
        ]
    }

    /// Check 1: configuration file present
    fn check_config_file(&self) -> HealthCheck {
        let path = self.config_path.clone().or_else(Config::default_path);
        let status = match path {
            Some(path) if path.exists() => HealthStatus::Pass,
            Some(path) => HealthStatus::Warn(format!(
                "{} not found, using built-in defaults",
                path.display()
            )),
            None => HealthStatus::Warn("No home directory, using built-in defaults".to_string()),
        };
        HealthCheck::new("Config File", status)
    }

    /// Check 2: configuration values
    fn check_config_values(&self) -> HealthCheck {
        let status = match self.config.validate() {
            Ok(()) => HealthStatus::Pass,
            Err(e) => HealthStatus::Fail(e.to_string()),
        };
        HealthCheck::new("Config Values", status)
    }

    /// Check 3: model bundle loads and every model agrees on features and labels
    fn check_model_bundle(&self) -> HealthCheck {
        let path = match self.config.bundle_path() {
            Some(path) => path,
            None => {
                return HealthCheck::new(
                    "Model Bundle",
                    HealthStatus::Fail(
                        "No bundle configured; set [models] bundle or pass --bundle".to_string(),
                    ),
                )
            }
        };

        let status = match ModelBundle::load(&path).and_then(ModelBundle::into_ensemble) {
            Ok(ensemble) if ensemble.len() < 2 => HealthStatus::Warn(format!(
                "Only {} model loaded; the vote has nothing to combine",
                ensemble.len()
            )),
            Ok(_) => HealthStatus::Pass,
            Err(e) => HealthStatus::Fail(e.to_string()),
        };
        HealthCheck::new("Model Bundle", status)
    }

    /// Check 4/6: API key environment variable present
    fn check_api_key(&self, name: &str, var: Option<&str>, required: bool) -> HealthCheck {
        let status = match var {
            None => HealthStatus::Pass,
            Some(var) if std::env::var(var).is_ok() => HealthStatus::Pass,
            Some(var) if required => HealthStatus::Fail(format!("{} is not set", var)),
            Some(var) => HealthStatus::Warn(format!("{} is not set", var)),
        };
        HealthCheck::new(name, status)
    }

    /// Check 5: advisor reachable
    async fn check_advisor(&self) -> HealthCheck {
        let advisor = match advisor::from_config(&self.config.advisor, &TelemetryCollector::new()) {
            Ok(Some(advisor)) => advisor,
            Ok(None) => {
                return HealthCheck::new(
                    "Advisor",
                    HealthStatus::Warn("Disabled; predictions will have no description".to_string()),
                )
            }
            Err(e) => return HealthCheck::new("Advisor", HealthStatus::Fail(e.to_string())),
        };

        let status = match advisor.health_check().await {
            Ok(true) => HealthStatus::Pass,
            Ok(false) => HealthStatus::Fail(format!(
                "{} backend at {} not reachable",
                advisor.name(),
                self.config.advisor.base_url
            )),
            Err(e) => HealthStatus::Fail(format!("Error checking advisor: {}", e)),
        };
        HealthCheck::new("Advisor", status)
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n🔍 symptriage System Diagnostics\n");
        println!("{:<20} {}", "Check", "Status");
        println!("{}", "=".repeat(50));

        for check in checks {
            let line = match &check.status {
                HealthStatus::Pass => "✅ PASS".green(),
                HealthStatus::Warn(msg) => format!("⚠️  WARN: {}", msg).yellow(),
                HealthStatus::Fail(msg) => format!("❌ FAIL: {}", msg).red(),
            };
            println!("{:<20} {}", check.name, line);
        }
        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status() {
        let checks = vec![
            HealthCheck::new("A", HealthStatus::Pass),
            HealthCheck::new("B", HealthStatus::Warn("meh".to_string())),
        ];
        assert!(Doctor::overall_status(&checks));

        let failing = vec![HealthCheck::new("C", HealthStatus::Fail("no".to_string()))];
        assert!(!Doctor::overall_status(&failing));
    }

    #[test]
    fn test_missing_bundle_fails() {
        let doctor = Doctor::new(Config::default(), None);
        assert!(matches!(
            doctor.check_model_bundle().status,
            HealthStatus::Fail(_)
        ));
    }

    #[test]
    fn test_api_key_checks() {
        let doctor = Doctor::new(Config::default(), None);
        let var = "SYMPTRIAGE_DOCTOR_TEST_UNSET";
        assert!(matches!(doctor.check_api_key("K", Some(var), true).status, HealthStatus::Fail(_)));
        assert!(matches!(doctor.check_api_key("K", Some(var), false).status, HealthStatus::Warn(_)));
        assert_eq!(doctor.check_api_key("K", None, true).status, HealthStatus::Pass);
    }

    #[test]
    fn test_invalid_config_reported() {
        let mut config = Config::default();
        config.extraction.min_words = 0;
        let doctor = Doctor::new(config, None);
        assert!(matches!(
            doctor.check_config_values().status,
            HealthStatus::Fail(_)
        ));
    }

    #[tokio::test]
    async fn test_disabled_advisor_warns() {
        let mut config = Config::default();
        config.advisor.enabled = false;
        let doctor = Doctor::new(config, None);
        assert!(matches!(doctor.check_advisor().await.status, HealthStatus::Warn(_)));
    }
}
