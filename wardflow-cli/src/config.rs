use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use wardflow_core::RebalanceConfig;
use wardflow_engine::{AdvisoryConfig, OrchestratorConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub orchestrator: OrchestratorSection,
    pub rebalance: RebalanceSection,
    pub advisory: Option<AdvisorySection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSection {
    pub deadline_interval_secs: u64,
    pub bottleneck_interval_secs: u64,
    pub recurrence_interval_secs: u64,
    pub reminder_window_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceSection {
    pub overload_threshold: f64,
    pub improvement_margin: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorySection {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            orchestrator: OrchestratorSection {
                deadline_interval_secs: defaults.deadline_interval.as_secs(),
                bottleneck_interval_secs: defaults.bottleneck_interval.as_secs(),
                recurrence_interval_secs: defaults.recurrence_interval.as_secs(),
                reminder_window_hours: defaults.reminder_window_hours,
            },
            rebalance: RebalanceSection {
                overload_threshold: RebalanceConfig::default().overload_threshold,
                improvement_margin: RebalanceConfig::default().improvement_margin,
            },
            advisory: None,
        }
    }
}

impl Config {
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            deadline_interval: Duration::from_secs(self.orchestrator.deadline_interval_secs),
            bottleneck_interval: Duration::from_secs(self.orchestrator.bottleneck_interval_secs),
            recurrence_interval: Duration::from_secs(self.orchestrator.recurrence_interval_secs),
            reminder_window_hours: self.orchestrator.reminder_window_hours,
            rebalance: RebalanceConfig {
                overload_threshold: self.rebalance.overload_threshold,
                improvement_margin: self.rebalance.improvement_margin,
            },
            advisory_timeout: Duration::from_secs(
                self.advisory.as_ref().map_or(2, |a| a.timeout_secs),
            ),
        }
    }

    pub fn advisory_config(&self) -> Option<AdvisoryConfig> {
        self.advisory.as_ref().map(|a| AdvisoryConfig {
            url: a.url.clone(),
            api_key: a.api_key.clone(),
        })
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("wardflow.toml")
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }
    let s = toml::to_string_pretty(&Config::default()).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.orchestrator.deadline_interval_secs, 900);
        assert_eq!(back.rebalance.overload_threshold, 40.0);
        assert!(back.advisory.is_none());
    }

    #[test]
    fn advisory_section_is_optional_but_parsed() {
        let s = r#"
            [orchestrator]
            deadline_interval_secs = 60
            bottleneck_interval_secs = 120
            recurrence_interval_secs = 30
            reminder_window_hours = 12

            [rebalance]
            overload_threshold = 35.0
            improvement_margin = 5.0

            [advisory]
            url = "http://localhost:9000/suggest"
            timeout_secs = 1
        "#;
        let cfg: Config = toml::from_str(s).unwrap();
        let orchestrator = cfg.orchestrator_config();
        assert_eq!(orchestrator.reminder_window_hours, 12);
        assert_eq!(orchestrator.rebalance.improvement_margin, 5.0);
        assert_eq!(orchestrator.advisory_timeout, Duration::from_secs(1));
        assert!(cfg.advisory_config().is_some());
    }
}
