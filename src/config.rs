//! Harness configuration, read from TOML.
//!
//! Every section and field is optional; missing values take the defaults
//! below, and command-line flags override whatever the file says.
//!
//! ```toml
//! [sampler]
//! min_plies = 5
//! max_plies = 40
//! max_attempts = 100000
//! seed = 7
//!
//! [run]
//! trials = 100
//! mode = "tolerant"
//!
//! [subject]
//! moves = "target/release/test_move_generation"
//!
//! [best]
//! policy = "near-best"
//! threshold_cp = 60
//! max_candidates = 10
//! engine = "stockfish"
//! depth = 10
//!
//! [perft]
//! branch_caps = [5, 5, 5, 5, 4, 3, 2]
//! fallback_cap = 2
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;

use crate::compare::CandidatePolicy;
use crate::error::{Error, Result};
use crate::eval::EngineConfig;
use crate::harness::{Mode, RunConfig};
use crate::perft::BranchCap;
use crate::sampler::SamplerConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub sampler: SamplerConfig,
    pub run: RunSection,
    pub subject: SubjectSection,
    pub best: BestSection,
    pub perft: BranchCap,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub trials: usize,
    pub mode: Mode,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            trials: 100,
            mode: Mode::Strict,
        }
    }
}

/// Subject executables, one per query kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubjectSection {
    pub moves: Option<PathBuf>,
    pub state: Option<PathBuf>,
    pub best: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    #[default]
    TopK,
    NearBest,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BestSection {
    pub policy: PolicyKind,
    pub k: usize,
    pub threshold_cp: i32,
    pub max_candidates: usize,
    /// UCI engine used to score moves; the material evaluator when unset.
    pub engine: Option<String>,
    pub depth: u32,
    pub multipv: usize,
    pub movetime_ms: Option<u64>,
}

impl Default for BestSection {
    fn default() -> Self {
        Self {
            policy: PolicyKind::TopK,
            k: 5,
            threshold_cp: 60,
            max_candidates: 10,
            engine: None,
            depth: 10,
            multipv: 10,
            movetime_ms: None,
        }
    }
}

impl BestSection {
    pub fn candidate_policy(&self) -> CandidatePolicy {
        match self.policy {
            PolicyKind::TopK => CandidatePolicy::TopK { k: self.k },
            PolicyKind::NearBest => CandidatePolicy::NearBest {
                threshold_cp: self.threshold_cp,
                max_candidates: self.max_candidates,
            },
        }
    }

    pub fn engine_config(&self) -> Option<EngineConfig> {
        let path = self.engine.as_ref()?;
        let mut config = EngineConfig::default()
            .path(path.clone())
            .depth(self.depth)
            .multipv(self.multipv);
        config.movetime_ms = self.movetime_ms;
        Some(config)
    }
}

impl HarnessConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Caps given on the command line win over the `[perft]` section.
    pub fn branch_caps(&self, flag: &[usize]) -> BranchCap {
        BranchCap::from_list(flag).unwrap_or_else(|| self.perft.clone())
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig::default()
            .mode(self.run.mode)
            .trials(self.run.trials)
            .sampler(self.sampler.clone())
            .policy(self.best.candidate_policy())
    }
}
