//! Maps server messages onto the engine and produces reply lines.

use std::sync::Arc;

use colony_proto::{
    parse_message_line, GameParameters, ParameterError, ServerMessage, GO_REPLY,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::decider::DeciderKind;
use crate::engine::TurnEngine;
use crate::geometry::Cell;
use crate::world::SensorReport;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot start engine: {0}")]
    Start(#[from] ParameterError),
}

#[derive(Debug)]
pub struct BotSession {
    kind: DeciderKind,
    config: Arc<EngineConfig>,
    params: GameParameters,
    engine: Option<TurnEngine>,
    report: SensorReport,
    turn: u64,
    finished: bool,
}

impl BotSession {
    pub fn new(kind: DeciderKind, config: Arc<EngineConfig>) -> Self {
        Self {
            kind,
            config,
            params: GameParameters::default(),
            engine: None,
            report: SensorReport::default(),
            turn: 0,
            finished: false,
        }
    }

    pub fn params(&self) -> &GameParameters {
        &self.params
    }

    pub fn engine(&self) -> Option<&TurnEngine> {
        self.engine.as_ref()
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Parse and handle one raw line. Lines that do not parse are ignored.
    pub fn handle_line(&mut self, line: &str) -> Result<Vec<String>, SessionError> {
        match parse_message_line(line) {
            Ok(message) => self.handle(message),
            Err(err) => {
                debug!(
                    target: "colony::session",
                    line = line.trim(),
                    error = %err,
                    "ignoring unparsed line"
                );
                Ok(Vec::new())
            }
        }
    }

    pub fn handle(&mut self, message: ServerMessage) -> Result<Vec<String>, SessionError> {
        match message {
            ServerMessage::Parameter { key, value } => {
                self.params.apply(key, value);
            }
            ServerMessage::Ready => {
                let engine =
                    TurnEngine::start(self.params.clone(), Arc::clone(&self.config), self.kind)?;
                info!(
                    target: "colony::session",
                    rows = self.params.rows,
                    cols = self.params.cols,
                    decider = %self.kind,
                    "session.ready"
                );
                self.engine = Some(engine);
                return Ok(vec![GO_REPLY.to_string()]);
            }
            ServerMessage::Turn { number } => {
                self.turn = number;
                self.report = SensorReport::default();
            }
            ServerMessage::Water { row, col } => self.report.water.push(Cell::new(row, col)),
            ServerMessage::Food { row, col } => self.report.food.push(Cell::new(row, col)),
            ServerMessage::Hill { row, col, owner } => {
                self.report.hills.push((Cell::new(row, col), owner))
            }
            ServerMessage::Ant { row, col, owner } => {
                self.report.ants.push((Cell::new(row, col), owner))
            }
            ServerMessage::Dead { row, col, owner } => {
                self.report.dead.push((Cell::new(row, col), owner))
            }
            ServerMessage::Go => {
                let Some(engine) = self.engine.as_mut() else {
                    // The server still waits for the turn terminator.
                    warn!(
                        target: "colony::session",
                        turn = self.turn,
                        "go before ready, no orders"
                    );
                    self.report = SensorReport::default();
                    return Ok(vec![GO_REPLY.to_string()]);
                };
                let report = std::mem::take(&mut self.report);
                let outcome = engine.run_turn(&report);
                let mut replies: Vec<String> =
                    outcome.orders.iter().map(ToString::to_string).collect();
                replies.push(GO_REPLY.to_string());
                return Ok(replies);
            }
            ServerMessage::End => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.abort_turn();
                }
                self.finished = true;
                info!(target: "colony::session", turn = self.turn, "session.end");
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> BotSession {
        BotSession::new(DeciderKind::Hedge, EngineConfig::builtin())
    }

    #[test]
    fn ready_starts_engine_and_replies_go() {
        let mut session = session();
        for line in ["turn 0", "rows 10", "cols 12", "player_seed 3"] {
            assert!(session.handle_line(line).expect("handled").is_empty());
        }
        assert_eq!(session.handle_line("ready").expect("ready"), vec!["go"]);
        assert_eq!(session.engine().map(|e| e.size().width), Some(12));
    }

    #[test]
    fn go_before_ready_still_ends_the_turn() {
        let mut session = session();
        session.handle_line("turn 1").expect("turn");
        session.handle_line("a 0 0 0").expect("ant");
        assert_eq!(session.handle_line("go").expect("go"), vec!["go"]);
        assert!(session.engine().is_none());
    }

    #[test]
    fn ready_without_board_is_an_error() {
        let mut session = session();
        assert!(matches!(
            session.handle_line("ready"),
            Err(SessionError::Start(_))
        ));
    }

    #[test]
    fn turns_after_a_failed_ready_reply_go() {
        let mut session = session();
        assert!(session.handle_line("ready").is_err());
        for turn in 1..=3 {
            session.handle_line(&format!("turn {turn}")).expect("turn");
            assert_eq!(session.handle_line("go").expect("go"), vec!["go"]);
        }
        assert_eq!(session.turn(), 3);
    }

    #[test]
    fn unknown_lines_are_ignored() {
        let mut session = session();
        assert!(session.handle_line("score 1 2").expect("ignored").is_empty());
        assert!(session.handle_line("").expect("ignored").is_empty());
    }

    #[test]
    fn end_finishes_session() {
        let mut session = session();
        session.handle_line("rows 5").expect("rows");
        session.handle_line("cols 5").expect("cols");
        session.handle_line("ready").expect("ready");
        session.handle_line("end").expect("end");
        assert!(session.is_finished());
    }
}
