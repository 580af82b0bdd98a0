use crate::app_dirs::AppDirs;
use crate::problem::{DifficultyId, Operation, OperationSet};
use crate::session::{DrillMode, RoundConfig, DEFAULT_DURATION_SECS, DEFAULT_WORKING_MEMORY_OPS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The signed-in user. Without one, rounds stay local.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub duration_secs: u32,
    pub difficulty: DifficultyId,
    pub mode: DrillMode,
    pub operations: Vec<Operation>,
    pub working_memory_ops: u8,
    #[serde(rename = "mathTrainer_autoSubmit")]
    pub auto_submit: bool,
    pub identity: Option<Identity>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            difficulty: DifficultyId::default(),
            mode: DrillMode::default(),
            operations: Operation::ALL.to_vec(),
            working_memory_ops: DEFAULT_WORKING_MEMORY_OPS,
            auto_submit: false,
            identity: None,
        }
    }
}

impl Config {
    /// Runtime settings; an empty operation list falls back to all operations
    pub fn round_config(&self) -> RoundConfig {
        let mut round = RoundConfig {
            duration_secs: self.duration_secs,
            difficulty: self.difficulty,
            mode: self.mode,
            operations: OperationSet::new(self.operations.iter().copied()).unwrap_or_default(),
            auto_submit: self.auto_submit,
            ..RoundConfig::default()
        };
        round.set_working_memory_ops(self.working_memory_ops);
        round
    }

    /// Fold the settings used this session back in before saving
    pub fn apply(&mut self, round: &RoundConfig) {
        self.duration_secs = round.duration_secs;
        self.difficulty = round.difficulty;
        self.mode = round.mode;
        self.operations = round.operations.as_slice().to_vec();
        self.working_memory_ops = round.working_memory_ops;
        self.auto_submit = round.auto_submit;
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => tracing::warn!(error = %e, "ignoring unreadable config"),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
