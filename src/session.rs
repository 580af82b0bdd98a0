use crate::problem::{
    generate_problem, generate_working_memory_problem, DifficultyId, Operation, OperationSet,
    Problem, MAX_WORKING_MEMORY_OPS,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_DURATION_SECS: u32 = 120;
pub const DEFAULT_WORKING_MEMORY_OPS: u8 = 2;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DrillMode {
    #[default]
    Operations,
    WorkingMemory,
}

impl FromStr for DrillMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "operations" => Ok(DrillMode::Operations),
            "working-memory" => Ok(DrillMode::WorkingMemory),
            other => Err(format!("unknown drill mode '{other}'")),
        }
    }
}

/// Settings a round is started with
#[derive(Debug, Clone, PartialEq)]
pub struct RoundConfig {
    pub duration_secs: u32,
    pub difficulty: DifficultyId,
    pub mode: DrillMode,
    pub operations: OperationSet,
    pub working_memory_ops: u8,
    pub auto_submit: bool,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            difficulty: DifficultyId::default(),
            mode: DrillMode::default(),
            operations: OperationSet::all(),
            working_memory_ops: DEFAULT_WORKING_MEMORY_OPS,
            auto_submit: false,
        }
    }
}

impl RoundConfig {
    /// Seconds are clamped to 0..=59
    pub fn set_duration(&mut self, minutes: u32, seconds: u32) {
        self.duration_secs = minutes.saturating_mul(60).saturating_add(seconds.min(59));
    }

    pub fn minutes(&self) -> u32 {
        self.duration_secs / 60
    }

    pub fn seconds(&self) -> u32 {
        self.duration_secs % 60
    }

    /// Shift the duration by `delta` seconds, never below zero
    pub fn adjust_duration(&mut self, delta: i64) {
        let secs = (i64::from(self.duration_secs) + delta).max(0);
        self.duration_secs = u32::try_from(secs).unwrap_or(u32::MAX);
    }

    pub fn set_working_memory_ops(&mut self, ops: u8) {
        self.working_memory_ops = ops.min(MAX_WORKING_MEMORY_OPS);
    }

    /// Toggle an operation and switch to operations mode. Returns false if it was the last one.
    pub fn toggle_operation(&mut self, op: Operation) -> bool {
        self.mode = DrillMode::Operations;
        self.operations.toggle(op)
    }

    pub fn next_problem<R: Rng + ?Sized>(&self, rng: &mut R) -> Problem {
        let band = self.difficulty.band();
        match self.mode {
            DrillMode::Operations => generate_problem(rng, &self.operations, band),
            DrillMode::WorkingMemory => {
                generate_working_memory_problem(rng, self.working_memory_ops, band)
            }
        }
    }
}
