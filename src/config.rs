use eyre::{Context, Result};
use lgnet::adapt::AdaptationPolicy;
use lgnet::queue::QueueConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub store: StoreConfig,
    pub queue: JobQueueConfig,
    pub worker: WorkerConfig,
    pub adaptation: AdaptationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("lgnet")
                .join("results.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobQueueConfig {
    pub max_attempts: u32,
    pub poll_interval_ms: u64,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            poll_interval_ms: 100,
        }
    }
}

impl JobQueueConfig {
    pub fn to_queue_config(&self) -> QueueConfig {
        QueueConfig::new(self.max_attempts, Duration::from_millis(self.poll_interval_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    pub history_limit: usize,
    pub mean_threshold: f64,
    pub looped_bias: i64,
    pub looped_iterations: u32,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        let policy = AdaptationPolicy::default();
        Self {
            history_limit: policy.history_limit,
            mean_threshold: policy.mean_threshold,
            looped_bias: policy.looped_bias,
            looped_iterations: policy.looped_iterations,
        }
    }
}

impl AdaptationConfig {
    pub fn to_policy(&self) -> AdaptationPolicy {
        AdaptationPolicy {
            history_limit: self.history_limit,
            mean_threshold: self.mean_threshold,
            looped_bias: self.looped_bias,
            looped_iterations: self.looped_iterations.max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            store: StoreConfig::default(),
            queue: JobQueueConfig::default(),
            worker: WorkerConfig::default(),
            adaptation: AdaptationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
