//! UCI engine as best-move oracle.
//!
//! The engine is spawned once and kept alive: one `position`/`go` round per
//! query, with MultiPV so a single search yields several scored moves.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use log::{debug, trace, warn};
use serde::Deserialize;

use crate::board::Position;
use crate::error::{Error, Result};
use crate::eval::{Evaluator, ScoredMove, MATE_SCORE};

/// Engine score as reported in an `info` line, from the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Cp(i32),
    /// Moves to mate; negative when the side to move is getting mated.
    Mate(i32),
}

impl Score {
    /// Mates map to `mate_score` minus the distance, so shorter mates rank
    /// higher and being mated ranks below every centipawn score.
    pub fn centipawns(self, mate_score: i32) -> i32 {
        match self {
            Score::Cp(cp) => cp,
            Score::Mate(n) if n > 0 => mate_score - n,
            Score::Mate(n) => -mate_score - n,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: Option<u32>,
    pub multipv: Option<usize>,
    pub score: Option<Score>,
    /// `lowerbound`/`upperbound` scores are not final.
    pub bound: bool,
    pub nodes: Option<u64>,
    pub pv: Vec<String>,
}

/// One line of engine output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLine {
    Id { key: String, value: String },
    UciOk,
    ReadyOk,
    Info(InfoLine),
    BestMove { mv: String, ponder: Option<String> },
    Unknown(String),
}

pub fn parse_engine_line(line: &str) -> EngineLine {
    let trimmed = line.trim();
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    let Some(&head) = parts.first() else {
        return EngineLine::Unknown(String::new());
    };

    match head {
        "uciok" => EngineLine::UciOk,
        "readyok" => EngineLine::ReadyOk,
        "id" if parts.len() >= 2 => EngineLine::Id {
            key: parts[1].to_string(),
            value: parts[2..].join(" "),
        },
        "bestmove" if parts.len() >= 2 => {
            let mut ponder = None;
            if parts.get(2) == Some(&"ponder") {
                ponder = parts.get(3).map(|s| s.to_string());
            }
            EngineLine::BestMove {
                mv: parts[1].to_string(),
                ponder,
            }
        }
        "info" => {
            let mut info = InfoLine::default();
            let mut i = 1usize;
            while i < parts.len() {
                match parts[i] {
                    "depth" => {
                        info.depth = parts.get(i + 1).and_then(|v| v.parse().ok());
                        i += 2;
                    }
                    "multipv" => {
                        info.multipv = parts.get(i + 1).and_then(|v| v.parse().ok());
                        i += 2;
                    }
                    "nodes" => {
                        info.nodes = parts.get(i + 1).and_then(|v| v.parse().ok());
                        i += 2;
                    }
                    "score" => {
                        let value = parts.get(i + 2).and_then(|v| v.parse::<i32>().ok());
                        info.score = match (parts.get(i + 1), value) {
                            (Some(&"cp"), Some(v)) => Some(Score::Cp(v)),
                            (Some(&"mate"), Some(v)) => Some(Score::Mate(v)),
                            _ => None,
                        };
                        i += 3;
                    }
                    "lowerbound" | "upperbound" => {
                        info.bound = true;
                        i += 1;
                    }
                    "pv" => {
                        info.pv = parts[i + 1..].iter().map(|s| s.to_string()).collect();
                        break;
                    }
                    // free text runs to the end of the line
                    "string" => break,
                    _ => {
                        i += 1;
                    }
                }
            }
            EngineLine::Info(info)
        }
        _ => EngineLine::Unknown(trimmed.to_string()),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub path: String,
    /// Search depth per query; ignored when `movetime_ms` is set.
    pub depth: u32,
    pub movetime_ms: Option<u64>,
    pub multipv: usize,
    /// Extra `setoption` pairs sent after the handshake.
    pub options: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: "stockfish".to_string(),
            depth: 10,
            movetime_ms: None,
            multipv: 10,
            options: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn multipv(mut self, multipv: usize) -> Self {
        self.multipv = multipv.max(1);
        self
    }

    fn go_command(&self) -> String {
        match self.movetime_ms {
            Some(ms) => format!("go movetime {}", ms),
            None => format!("go depth {}", self.depth),
        }
    }
}

pub struct UciEvaluator {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    config: EngineConfig,
    name: Option<String>,
}

impl UciEvaluator {
    /// Spawns the engine and completes the `uci`/`isready` handshake.
    pub fn spawn(config: EngineConfig) -> Result<Self> {
        let mut child = Command::new(&config.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Evaluator(format!("cannot start {}: {}", config.path, e)))?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(Error::Evaluator("engine pipes unavailable".to_string()));
        };

        let mut engine = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            config,
            name: None,
        };
        engine.send("uci")?;
        for line in engine.read_until(|l| matches!(l, EngineLine::UciOk))? {
            if let EngineLine::Id { key, value } = line {
                if key == "name" {
                    engine.name = Some(value);
                }
            }
        }
        let multipv = engine.config.multipv.max(1);
        engine.send(&format!("setoption name MultiPV value {}", multipv))?;
        let extra: Vec<(String, String)> = engine
            .config
            .options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (name, value) in extra {
            engine.send(&format!("setoption name {} value {}", name, value))?;
        }
        engine.sync()?;
        debug!(
            "engine {} ready (multipv {})",
            engine.name.as_deref().unwrap_or(&engine.config.path),
            multipv
        );
        Ok(engine)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn send(&mut self, command: &str) -> Result<()> {
        trace!(">> {}", command);
        writeln!(self.stdin, "{}", command)?;
        self.stdin.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.send("isready")?;
        self.read_until(|l| matches!(l, EngineLine::ReadyOk))?;
        Ok(())
    }

    /// Lines read before and including the first one matching `done`.
    fn read_until(&mut self, done: impl Fn(&EngineLine) -> bool) -> Result<Vec<EngineLine>> {
        let mut lines = Vec::new();
        let mut buf = String::new();
        loop {
            buf.clear();
            if self.stdout.read_line(&mut buf)? == 0 {
                return Err(Error::Evaluator("engine closed its output".to_string()));
            }
            trace!("<< {}", buf.trim_end());
            let line = parse_engine_line(&buf);
            let finished = done(&line);
            lines.push(line);
            if finished {
                return Ok(lines);
            }
        }
    }
}

impl Evaluator for UciEvaluator {
    fn score_moves(&mut self, pos: &Position) -> Result<Vec<ScoredMove>> {
        self.send(&format!("position fen {}", pos.to_fen()))?;
        let go = self.config.go_command();
        self.send(&go)?;

        // later lines are deeper, so they replace earlier ones per slot
        let mut slots: BTreeMap<usize, (Score, String)> = BTreeMap::new();
        for line in self.read_until(|l| matches!(l, EngineLine::BestMove { .. }))? {
            if let EngineLine::Info(info) = line {
                if info.bound {
                    continue;
                }
                if let (Some(score), Some(first)) = (info.score, info.pv.first()) {
                    slots.insert(info.multipv.unwrap_or(1), (score, first.clone()));
                }
            }
        }

        let mut scored = Vec::with_capacity(slots.len());
        for (slot, (score, uci)) in slots {
            match pos.parse_uci_move(&uci) {
                Ok(mv) => scored.push(ScoredMove {
                    mv,
                    score_cp: score.centipawns(MATE_SCORE),
                }),
                Err(reason) => warn!("skipping pv {} move {}: {}", slot, uci, reason),
            }
        }
        Ok(scored)
    }
}

impl Drop for UciEvaluator {
    fn drop(&mut self) {
        let _ = self.send("quit");
        if self.child.wait().is_err() {
            let _ = self.child.kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multipv_info() {
        let line = "info depth 18 seldepth 24 multipv 2 score cp -35 nodes 123456 nps 900000 pv e7e5 g1f3 b8c6";
        match parse_engine_line(line) {
            EngineLine::Info(info) => {
                assert_eq!(info.depth, Some(18));
                assert_eq!(info.multipv, Some(2));
                assert_eq!(info.score, Some(Score::Cp(-35)));
                assert_eq!(info.nodes, Some(123456));
                assert!(!info.bound);
                assert_eq!(info.pv, vec!["e7e5", "g1f3", "b8c6"]);
            }
            other => panic!("expected info, got {:?}", other),
        }
    }

    #[test]
    fn parses_bestmove_with_ponder() {
        assert_eq!(
            parse_engine_line("bestmove e2e4 ponder e7e5"),
            EngineLine::BestMove {
                mv: "e2e4".to_string(),
                ponder: Some("e7e5".to_string())
            }
        );
        assert_eq!(
            parse_engine_line("bestmove (none)"),
            EngineLine::BestMove {
                mv: "(none)".to_string(),
                ponder: None
            }
        );
    }

    #[test]
    fn handshake_lines() {
        assert_eq!(parse_engine_line("uciok\n"), EngineLine::UciOk);
        assert_eq!(parse_engine_line("readyok"), EngineLine::ReadyOk);
        assert_eq!(
            parse_engine_line("id name Stockfish 16"),
            EngineLine::Id {
                key: "name".to_string(),
                value: "Stockfish 16".to_string()
            }
        );
        assert_eq!(
            parse_engine_line("option name Hash type spin"),
            EngineLine::Unknown("option name Hash type spin".to_string())
        );
    }

    #[test]
    fn bound_scores_are_flagged() {
        match parse_engine_line("info depth 10 score cp 20 lowerbound pv d2d4") {
            EngineLine::Info(info) => assert!(info.bound),
            other => panic!("expected info, got {:?}", other),
        }
    }

    #[test]
    fn mate_scores_order_below_mate_score() {
        assert_eq!(Score::Mate(1).centipawns(MATE_SCORE), 9_999);
        assert_eq!(Score::Mate(3).centipawns(MATE_SCORE), 9_997);
        assert_eq!(Score::Mate(-2).centipawns(MATE_SCORE), -9_998);
        assert!(Score::Mate(-2).centipawns(MATE_SCORE) < Score::Cp(-5000).centipawns(MATE_SCORE));
        assert_eq!(Score::Cp(42).centipawns(MATE_SCORE), 42);
    }
}
