use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SysvistaError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// File collection settings
    #[serde(default)]
    pub scan: ScanConfig,

    /// Component detection settings
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Relationship inference settings
    #[serde(default)]
    pub relationships: RelationshipConfig,

    /// Workflow synthesis policy
    #[serde(default)]
    pub workflows: WorkflowConfig,

    /// Clustering and hub classification
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Include hidden files and directories
    pub include_hidden: bool,

    /// Maximum file size to read (in bytes); larger files are skipped
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Directory names whose classes and functions count as services
    pub service_dirs: Vec<String>,

    /// Subset of service directories holding queue workers
    pub worker_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipConfig {
    /// Names shorter than this never match as tokens
    pub min_name_length: usize,

    /// Lines scanned after a declaration whose block end cannot be found
    pub body_window_lines: usize,

    /// Hard cap on a component body, in lines
    pub max_body_lines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Workflows with fewer steps are not published (1 keeps entry-only traces)
    pub min_steps: usize,

    /// Maximum BFS depth from the entry transport
    pub max_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Cluster labels with fewer members fold into "Other"
    pub min_cluster_size: usize,

    /// Standard deviations above the mean degree for a medium hub
    pub medium_sigma: f64,

    /// Standard deviations above the mean degree for a high hub
    pub high_sigma: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default document path when none is given on the command line
    pub path: PathBuf,

    /// Pretty-print the JSON document
    pub pretty: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_hidden: false,
            max_file_size: 1024 * 1024, // 1MB
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let to_strings = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            service_dirs: to_strings(&[
                "services",
                "controllers",
                "handlers",
                "resolvers",
                "middleware",
                "api",
                "crud",
                "workers",
                "jobs",
                "tasks",
            ]),
            worker_dirs: to_strings(&["workers", "jobs", "tasks"]),
        }
    }
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            min_name_length: 3,
            body_window_lines: 50,
            max_body_lines: 400,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            min_steps: 2,
            max_depth: 8,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 3,
            medium_sigma: 1.0,
            high_sigma: 2.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sysvista-output.json"),
            pretty: true,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| SysvistaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| SysvistaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Err(SysvistaError::Config(format!(
                        "config file {} does not exist",
                        p.as_ref().display()
                    )))
                }
            }
            None => {
                let candidates = ["sysvista.toml", "Sysvista.toml", ".sysvista.toml"];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.workflows.min_steps == 0 {
            return Err(SysvistaError::Config(
                "workflows.min_steps must be at least 1".to_string(),
            ));
        }
        if self.analytics.high_sigma < self.analytics.medium_sigma {
            return Err(SysvistaError::Config(
                "analytics.high_sigma must not be below analytics.medium_sigma".to_string(),
            ));
        }
        Ok(())
    }
}
