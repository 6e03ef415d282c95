//! Trial loop: sample or take a position, ask oracle and subject, compare,
//! record.
//!
//! Subject failures and malformed replies are per-trial outcomes; only
//! problems on the harness side (an oracle or evaluator that cannot answer)
//! end a run with an error.

use std::fmt;

use log::{debug, info, warn};
use serde::Deserialize;

use crate::board::Position;
use crate::compare::{candidates, compare_best, compare_moves, compare_state, CandidatePolicy, ComparisonResult};
use crate::error::{Error, MalformedOutput, Result};
use crate::eval::Evaluator;
use crate::moves::MovePair;
use crate::oracle::{GameState, RuleOracle, ShakmatyOracle};
use crate::sampler::{PositionSampler, SampleConstraints, SampleOutcome, SamplerConfig};
use crate::subject::{query_best, query_moves, query_state, SubjectEngine};
use crate::suite::SuiteEntry;

/// Sampled runs give up after this many skipped positions per requested
/// trial.
pub const SKIPS_PER_TRIAL: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Stop at the first trial that does not pass.
    #[default]
    Strict,
    /// Run every trial and report the pass rate.
    Tolerant,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: Mode,
    pub trials: usize,
    pub sampler: SamplerConfig,
    /// Game-state runs sample stalemates only.
    pub stalemate: bool,
    pub policy: CandidatePolicy,
    /// When non-empty, trials run over these positions instead of samples.
    pub fixed: Vec<Position>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Strict,
            trials: 100,
            sampler: SamplerConfig::default(),
            stalemate: false,
            policy: CandidatePolicy::default(),
            fixed: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    pub fn sampler(mut self, sampler: SamplerConfig) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn stalemate(mut self, stalemate: bool) -> Self {
        self.stalemate = stalemate;
        self
    }

    pub fn policy(mut self, policy: CandidatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Castling rights and en-passant targets are cleared: the subject
    /// never sees them on the wire.
    pub fn fixed(mut self, positions: Vec<Position>) -> Self {
        self.fixed = positions
            .into_iter()
            .map(|mut pos| {
                pos.clear_special_rights();
                pos
            })
            .collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialOutcome {
    Pass,
    Mismatch(ComparisonResult),
    /// The subject did not run or exited badly.
    SubjectFailure(String),
    Malformed(MalformedOutput),
    /// The sampler ran out of attempts before finding a position.
    Exhausted { attempts: u64 },
}

impl TrialOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, TrialOutcome::Pass)
    }
}

impl fmt::Display for TrialOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialOutcome::Pass => write!(f, "pass"),
            TrialOutcome::Mismatch(result) => write!(f, "mismatch\n{}", result),
            TrialOutcome::SubjectFailure(msg) => write!(f, "subject failure: {}", msg),
            TrialOutcome::Malformed(err) => write!(f, "{}", err),
            TrialOutcome::Exhausted { attempts } => {
                write!(f, "no admissible position after {} attempts", attempts)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialRecord {
    /// Zero-based trial number.
    pub index: usize,
    /// Empty when no position was produced.
    pub fen: String,
    pub outcome: TrialOutcome,
}

impl fmt::Display for TrialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trial {} [{}]: {}", self.index + 1, self.fen, self.outcome)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub trials: usize,
    pub passed: usize,
    pub mismatches: usize,
    pub subject_failures: usize,
    pub malformed: usize,
    pub exhausted: usize,
    /// Positions the oracle had nothing to compare on (best-move runs).
    pub skipped: usize,
    /// Every non-passing trial, in order.
    pub failures: Vec<TrialRecord>,
}

impl RunReport {
    /// Returns whether the trial passed.
    pub fn record(&mut self, fen: String, outcome: TrialOutcome) -> bool {
        let index = self.trials;
        self.trials += 1;
        match &outcome {
            TrialOutcome::Pass => {
                self.passed += 1;
                return true;
            }
            TrialOutcome::Mismatch(_) => self.mismatches += 1,
            TrialOutcome::SubjectFailure(_) => self.subject_failures += 1,
            TrialOutcome::Malformed(_) => self.malformed += 1,
            TrialOutcome::Exhausted { .. } => self.exhausted += 1,
        }
        let record = TrialRecord { index, fen, outcome };
        warn!("{}", record);
        self.failures.push(record);
        false
    }

    pub fn first_failure(&self) -> Option<&TrialRecord> {
        self.failures.first()
    }

    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn pass_percentage(&self) -> f64 {
        if self.trials == 0 {
            return 100.0;
        }
        self.passed as f64 * 100.0 / self.trials as f64
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} passed ({:.2}%): {} mismatches, {} subject failures, {} malformed, {} exhausted",
            self.passed,
            self.trials,
            self.pass_percentage(),
            self.mismatches,
            self.subject_failures,
            self.malformed,
            self.exhausted
        )
    }
}

// Subject-side errors become outcomes, everything else stays an error.
fn subject_outcome<T>(result: Result<T>) -> Result<std::result::Result<T, TrialOutcome>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(Error::Subject(e)) => Ok(Err(TrialOutcome::SubjectFailure(e.to_string()))),
        Err(Error::Malformed(e)) => Ok(Err(TrialOutcome::Malformed(e))),
        Err(e) => Err(e),
    }
}

fn verdict(result: ComparisonResult) -> TrialOutcome {
    if result.matched {
        TrialOutcome::Pass
    } else {
        TrialOutcome::Mismatch(result)
    }
}

pub struct Harness<S, O = ShakmatyOracle> {
    subject: S,
    oracle: O,
    config: RunConfig,
}

impl<S: SubjectEngine> Harness<S, ShakmatyOracle> {
    pub fn new(subject: S, config: RunConfig) -> Self {
        Self::with_oracle(subject, ShakmatyOracle, config)
    }
}

impl<S: SubjectEngine, O: RuleOracle> Harness<S, O> {
    pub fn with_oracle(subject: S, oracle: O, config: RunConfig) -> Self {
        Self {
            subject,
            oracle,
            config,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn subject_mut(&mut self) -> &mut S {
        &mut self.subject
    }

    /// Oracle's filtered move set against the subject's.
    pub fn trial_moves(&mut self, pos: &Position) -> Result<TrialOutcome> {
        let expected = self.oracle.filtered_moves(pos)?;
        let actual = match subject_outcome(query_moves(&mut self.subject, pos))? {
            Ok(set) => set,
            Err(outcome) => return Ok(outcome),
        };
        Ok(verdict(compare_moves(&expected, &actual)))
    }

    pub fn trial_state(&mut self, pos: &Position) -> Result<TrialOutcome> {
        let expected = self.oracle.game_state(pos)?;
        let actual = match subject_outcome(query_state(&mut self.subject, pos))? {
            Ok(state) => state,
            Err(outcome) => return Ok(outcome),
        };
        Ok(verdict(compare_state(expected, actual)))
    }

    /// Passes when the subject's move is one of `candidates`.
    pub fn trial_best(&mut self, pos: &Position, candidates: &[MovePair]) -> Result<TrialOutcome> {
        let actual = match subject_outcome(query_best(&mut self.subject, pos))? {
            Ok(pair) => pair,
            Err(outcome) => return Ok(outcome),
        };
        Ok(verdict(compare_best(candidates, actual)))
    }

    // `None` from `trial` skips the position without counting it.
    fn run_with<F>(&mut self, constraints: SampleConstraints, mut trial: F) -> Result<RunReport>
    where
        F: FnMut(&mut Self, &Position) -> Result<Option<TrialOutcome>>,
    {
        let strict = self.config.mode == Mode::Strict;
        let mut report = RunReport::default();
        let fixed = self.config.fixed.clone();

        if !fixed.is_empty() {
            for pos in &fixed {
                match trial(self, pos)? {
                    None => report.skipped += 1,
                    Some(outcome) => {
                        if !report.record(pos.to_fen(), outcome) && strict {
                            break;
                        }
                    }
                }
            }
        } else {
            let mut sampler = PositionSampler::new(self.config.sampler.clone(), constraints);
            let max_skipped = self.config.trials.saturating_mul(SKIPS_PER_TRIAL);
            while report.trials < self.config.trials {
                if report.skipped >= max_skipped {
                    warn!("giving up after {} skipped positions", report.skipped);
                    break;
                }
                let (fen, outcome) = match sampler.sample() {
                    SampleOutcome::Found(pos) => match trial(self, &pos)? {
                        Some(outcome) => (pos.to_fen(), outcome),
                        None => {
                            report.skipped += 1;
                            continue;
                        }
                    },
                    SampleOutcome::Exhausted { attempts } => {
                        (String::new(), TrialOutcome::Exhausted { attempts })
                    }
                };
                if !report.record(fen, outcome) && strict {
                    break;
                }
                if report.trials % 100 == 0 {
                    info!("{} trials, {} passed", report.trials, report.passed);
                }
            }
            debug!("sampler stats: {:?}", sampler.stats());
        }

        info!("{}", report);
        Ok(report)
    }

    pub fn run_moves(&mut self) -> Result<RunReport> {
        self.run_with(SampleConstraints::SAFE, |h, pos| h.trial_moves(pos).map(Some))
    }

    pub fn run_state(&mut self) -> Result<RunReport> {
        let constraints = if self.config.stalemate {
            SampleConstraints::STALEMATE
        } else {
            SampleConstraints::SAFE
        };
        self.run_with(constraints, |h, pos| h.trial_state(pos).map(Some))
    }

    /// Candidates come from `evaluator` under the configured policy.
    /// Finished games and positions without candidates are skipped.
    pub fn run_best<E: Evaluator + ?Sized>(&mut self, evaluator: &mut E) -> Result<RunReport> {
        let policy = self.config.policy;
        self.run_with(SampleConstraints::SAFE, |h, pos| {
            if h.oracle.game_state(pos)? != GameState::InProgress {
                debug!("skipping finished game {}", pos.to_fen());
                return Ok(None);
            }
            let accepted = candidates(&evaluator.score_moves(pos)?, policy);
            if accepted.is_empty() {
                debug!("no candidates for {}", pos.to_fen());
                return Ok(None);
            }
            h.trial_best(pos, &accepted).map(Some)
        })
    }

    /// Best-move trials over suite entries, using each entry's own
    /// candidate list.
    pub fn run_suite(&mut self, entries: &[SuiteEntry]) -> Result<RunReport> {
        let strict = self.config.mode == Mode::Strict;
        let mut report = RunReport::default();
        for entry in entries {
            if entry.candidates.is_empty() {
                report.skipped += 1;
                continue;
            }
            let outcome = self.trial_best(&entry.position, &entry.candidates)?;
            if !report.record(entry.position.to_fen(), outcome) && strict {
                break;
            }
        }
        info!("{}", report);
        Ok(report)
    }
}
