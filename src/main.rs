//! arbitro: differential testing of a chess engine against shakmaty.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use log::info;

use arbitro::config::{HarnessConfig, PolicyKind};
use arbitro::eval::{Evaluator, MaterialEvaluator, UciEvaluator};
use arbitro::harness::{Harness, Mode, RunReport};
use arbitro::subject::ProcessSubject;
use arbitro::suite::load_suite;
use arbitro::{Position, ShakmatyOracle};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file; flags override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Subject executable.
    #[arg(short, long)]
    subject: Option<PathBuf>,

    #[arg(short = 'n', long)]
    trials: Option<usize>,

    /// Keep going after failures and report the pass rate.
    #[arg(long)]
    tolerant: bool,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    min_plies: Option<usize>,

    #[arg(long)]
    max_plies: Option<usize>,

    #[arg(long)]
    max_attempts: Option<u64>,

    /// Test these positions instead of sampled ones.
    #[arg(long = "fen")]
    fens: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare move generation.
    Moves {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Compare game-state classification.
    State {
        #[command(flatten)]
        run: RunArgs,

        /// Sample stalemate positions only.
        #[arg(long)]
        stalemate: bool,
    },
    /// Check the subject's best move against evaluator candidates.
    Best {
        #[command(flatten)]
        run: RunArgs,

        /// UCI engine scoring the candidates (material evaluation otherwise).
        #[arg(long)]
        engine: Option<String>,

        #[arg(long, value_enum)]
        policy: Option<PolicyKind>,

        #[arg(short, long)]
        k: Option<usize>,

        #[arg(long)]
        threshold_cp: Option<i32>,

        #[arg(long)]
        max_candidates: Option<usize>,

        #[arg(short, long)]
        depth: Option<u32>,

        /// EPD suite with c9 candidate lists, instead of an evaluator.
        #[arg(long)]
        suite: Option<PathBuf>,
    },
}

impl RunArgs {
    fn apply(&self, config: &mut HarnessConfig) {
        if let Some(trials) = self.trials {
            config.run.trials = trials;
        }
        if self.tolerant {
            config.run.mode = Mode::Tolerant;
        }
        if self.seed.is_some() {
            config.sampler.seed = self.seed;
        }
        if let Some(min) = self.min_plies {
            config.sampler.min_plies = min;
        }
        if let Some(max) = self.max_plies {
            config.sampler.max_plies = max;
        }
        if self.max_attempts.is_some() {
            config.sampler.max_attempts = self.max_attempts;
        }
    }

    fn positions(&self) -> anyhow::Result<Vec<Position>> {
        self.fens
            .iter()
            .map(|fen| Position::from_fen(fen).with_context(|| format!("bad --fen {:?}", fen)))
            .collect()
    }
}

fn subject_path(flag: &Option<PathBuf>, configured: &Option<PathBuf>, kind: &str) -> anyhow::Result<ProcessSubject> {
    match flag.as_ref().or(configured.as_ref()) {
        Some(path) => Ok(ProcessSubject::new(path.clone())),
        None => bail!("no subject executable for {}: pass --subject or set [subject] {}", kind, kind),
    }
}

fn run(cli: Cli) -> anyhow::Result<(RunReport, Mode)> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };

    let report = match cli.command {
        Command::Moves { run } => {
            run.apply(&mut config);
            let subject = subject_path(&run.subject, &config.subject.moves, "moves")?;
            let run_config = config.run_config().fixed(run.positions()?);
            Harness::new(subject, run_config).run_moves()?
        }
        Command::State { run, stalemate } => {
            run.apply(&mut config);
            let subject = subject_path(&run.subject, &config.subject.state, "state")?;
            let run_config = config
                .run_config()
                .stalemate(stalemate)
                .fixed(run.positions()?);
            Harness::new(subject, run_config).run_state()?
        }
        Command::Best {
            run,
            engine,
            policy,
            k,
            threshold_cp,
            max_candidates,
            depth,
            suite,
        } => {
            run.apply(&mut config);
            let best = &mut config.best;
            if engine.is_some() {
                best.engine = engine;
            }
            if let Some(policy) = policy {
                best.policy = policy;
            }
            if let Some(k) = k {
                best.k = k;
            }
            if let Some(threshold) = threshold_cp {
                best.threshold_cp = threshold;
            }
            if let Some(max) = max_candidates {
                best.max_candidates = max;
            }
            if let Some(depth) = depth {
                best.depth = depth;
            }

            let subject = subject_path(&run.subject, &config.subject.best, "best")?;
            let run_config = config.run_config().fixed(run.positions()?);
            let mut harness = Harness::new(subject, run_config);

            match suite {
                Some(path) => {
                    let entries = load_suite(&path)
                        .with_context(|| format!("cannot load suite {}", path.display()))?;
                    info!("{} suite positions from {}", entries.len(), path.display());
                    harness.run_suite(&entries)?
                }
                None => {
                    let mut evaluator: Box<dyn Evaluator> = match config.best.engine_config() {
                        Some(engine) => Box::new(UciEvaluator::spawn(engine)?),
                        None => Box::new(MaterialEvaluator::new(ShakmatyOracle)),
                    };
                    harness.run_best(evaluator.as_mut())?
                }
            }
        }
    };
    Ok((report, config.run.mode))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok((report, mode)) => {
            if let (Mode::Strict, Some(failure)) = (mode, report.first_failure()) {
                println!("{}", failure);
                return ExitCode::from(1);
            }
            for failure in &report.failures {
                println!("{}", failure);
            }
            println!("{}", report);
            println!("Percentage correct: {:.2}%", report.pass_percentage());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
