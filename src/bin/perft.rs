use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use arbitro::board::{Position, START_FEN};
use arbitro::config::{HarnessConfig, PolicyKind};
use arbitro::eval::{Evaluator, MaterialEvaluator, UciEvaluator};
use arbitro::oracle::ShakmatyOracle;
use arbitro::perft::{
    divide_total, perft, perft_divide, AllMoves, Capped, MoveSource, RankedMoves, SubjectMoves,
};
use arbitro::subject::ProcessSubject;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = String::from(START_FEN))]
    fen: String,

    #[arg(short, long, default_value_t = 4)]
    depth: usize,

    /// Print the count below every root move.
    #[arg(long)]
    divide: bool,

    /// Take moves from this subject executable instead of shakmaty.
    #[arg(short, long, conflicts_with = "ranked")]
    subject: Option<PathBuf>,

    /// Follow evaluator candidates only (material evaluation unless --engine).
    #[arg(long)]
    ranked: bool,

    /// UCI engine scoring the candidates; implies --ranked.
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

    /// Branch cap per ply, e.g. 5,5,4; the last value applies deeper.
    #[arg(long, value_delimiter = ',')]
    caps: Vec<usize>,

    /// TOML configuration; its [perft] caps apply when --caps is absent.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    let best = &mut config.best;
    if args.engine.is_some() {
        best.engine = args.engine.clone();
    }
    if let Some(policy) = args.policy {
        best.policy = policy;
    }
    if let Some(k) = args.k {
        best.k = k;
    }
    if let Some(threshold) = args.threshold_cp {
        best.threshold_cp = threshold;
    }
    if let Some(max) = args.max_candidates {
        best.max_candidates = max;
    }

    println!("Running perft on FEN: '{}' at depth {}", args.fen, args.depth);
    let pos = Position::from_fen(&args.fen)?;

    let base: Box<dyn MoveSource> = if args.ranked || args.engine.is_some() {
        let evaluator: Box<dyn Evaluator> = match config.best.engine_config() {
            Some(engine) => Box::new(UciEvaluator::spawn(engine)?),
            None => Box::new(MaterialEvaluator::new(ShakmatyOracle)),
        };
        Box::new(RankedMoves::new(evaluator, config.best.candidate_policy()))
    } else {
        match &args.subject {
            Some(path) => Box::new(SubjectMoves::new(ProcessSubject::new(path.clone()))),
            None => Box::new(AllMoves::new(ShakmatyOracle)),
        }
    };
    let mut source: Box<dyn MoveSource> = if args.caps.is_empty() && args.config.is_none() {
        base
    } else {
        Box::new(Capped::new(base, config.branch_caps(&args.caps)))
    };

    let start = Instant::now();
    let nodes = if args.divide {
        let divide = perft_divide(&pos, 0, args.depth, source.as_mut())?;
        for (mv, count) in &divide {
            println!("{}: {}", mv, count);
        }
        divide_total(&divide)
    } else {
        perft(&pos, 0, args.depth, source.as_mut())?
    };
    let duration = start.elapsed();

    println!(
        "perft({}) = {} nodes ({} ms, {:.2} Mnps)",
        args.depth,
        nodes,
        duration.as_millis(),
        nodes as f64 / (duration.as_micros().max(1) as f64)
    );
    Ok(())
}
