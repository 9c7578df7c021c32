//! GTP subprocess implementation of the engine collaborator.
//!
//! Spawns the configured engine binary with piped stdio and drives it with
//! line-oriented GTP commands. One `GtpSession` corresponds to one engine
//! process playing one game.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::engine::{Engine, EngineOptions, GameSession};
use crate::error::{PlaygenError, Result};
use crate::sync::ArtifactRef;

/// How long to wait for the engine to exit after `quit` before killing it
const QUIT_TIMEOUT_SECS: u64 = 5;

/// Factory spawning one engine process per game
#[derive(Debug, Clone)]
pub struct GtpEngine {
    command: String,
    min_version: String,
}

impl GtpEngine {
    pub fn new(cfg: &EngineConfig) -> Self {
        Self {
            command: cfg.command.clone(),
            min_version: cfg.min_version.clone(),
        }
    }
}

#[async_trait]
impl Engine for GtpEngine {
    async fn start(
        &self,
        artifact: &ArtifactRef,
        options: &EngineOptions,
    ) -> Result<Box<dyn GameSession>> {
        let mut args = options.extra_args.clone();
        if let Some(gpu) = &options.gpu {
            args.push(format!("--gpu={gpu}"));
        }
        args.push("-r".to_string());
        args.push(options.resign_pct.to_string());
        args.push("-w".to_string());
        args.push(artifact.path.display().to_string());

        debug!("starting engine: {} {}", self.command, args.join(" "));
        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlaygenError::Engine(format!("failed to spawn {}: {e}", self.command)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PlaygenError::Engine("engine stdin unavailable".into()))?;
        let stdout = BufReader::new(
            child
                .stdout
                .take()
                .ok_or_else(|| PlaygenError::Engine("engine stdout unavailable".into()))?,
        );

        let mut session = GtpSession {
            child,
            stdin,
            stdout,
            result_id: Uuid::new_v4().simple().to_string(),
            black_to_move: true,
            passes: 0,
            winner: None,
            concluded: false,
        };

        let reported = session.send("version").await?;
        if version_below(&reported, &self.min_version) {
            let _ = GameSession::shutdown(&mut session).await;
            return Err(PlaygenError::IncompatibleEngine {
                required: self.min_version.clone(),
                reported,
            });
        }
        debug!("engine version {reported} accepted");
        Ok(Box::new(session))
    }
}

struct GtpSession {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    result_id: String,
    black_to_move: bool,
    passes: u32,
    winner: Option<char>,
    concluded: bool,
}

impl GtpSession {
    /// Send one GTP command and read its response.
    ///
    /// A response is `= payload` or `? error` followed by an empty line;
    /// anything else the engine prints is ignored.
    async fn send(&mut self, command: &str) -> Result<String> {
        self.stdin
            .write_all(format!("{command}\n").as_bytes())
            .await
            .map_err(|e| PlaygenError::Engine(format!("failed to write to engine: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| PlaygenError::Engine(format!("failed to flush engine stdin: {e}")))?;

        let mut payload: Option<String> = None;
        loop {
            let mut line = String::new();
            let n = self
                .stdout
                .read_line(&mut line)
                .await
                .map_err(|e| PlaygenError::Engine(format!("failed to read from engine: {e}")))?;
            if n == 0 {
                return Err(PlaygenError::Engine("engine closed its output pipe".into()));
            }
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                if let Some(p) = payload {
                    return Ok(p);
                }
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix('=') {
                payload = Some(rest.trim().to_string());
            } else if let Some(rest) = trimmed.strip_prefix('?') {
                return Err(PlaygenError::Engine(format!(
                    "engine rejected '{command}': {}",
                    rest.trim()
                )));
            }
        }
    }
}

#[async_trait]
impl GameSession for GtpSession {
    async fn request_move(&mut self) -> Result<()> {
        let color = if self.black_to_move { "b" } else { "w" };
        let response = self.send(&format!("genmove {color}")).await?;
        self.black_to_move = !self.black_to_move;
        match response.to_ascii_lowercase().as_str() {
            "resign" => {
                self.winner = Some(if color == "b" { 'w' } else { 'b' });
                self.concluded = true;
            }
            "pass" => {
                self.passes += 1;
                if self.passes >= 2 {
                    self.concluded = true;
                }
            }
            _ => self.passes = 0,
        }
        Ok(())
    }

    fn game_concluded(&self) -> bool {
        self.concluded
    }

    async fn is_scoreable(&mut self) -> Result<bool> {
        if !self.concluded {
            return Ok(false);
        }
        if self.winner.is_some() {
            return Ok(true);
        }
        let score = self.send("final_score").await?;
        if score == "0" {
            // Jigo: nothing to attribute the win to.
            return Ok(false);
        }
        match score.chars().next() {
            Some('B') | Some('b') => self.winner = Some('b'),
            Some('W') | Some('w') => self.winner = Some('w'),
            _ => {
                return Err(PlaygenError::Engine(format!(
                    "unparseable final score '{score}'"
                )))
            }
        }
        Ok(true)
    }

    async fn persist_result(&mut self) -> Result<String> {
        self.send(&format!("printsgf {}.sgf", self.result_id)).await?;
        Ok(self.result_id.clone())
    }

    async fn dump_training_data(&mut self) -> Result<()> {
        let winner = self
            .winner
            .ok_or_else(|| PlaygenError::Engine("no winner recorded for training dump".into()))?;
        self.send(&format!("dump_training {winner} {}.txt", self.result_id))
            .await?;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        let _ = self.send("quit").await;
        match tokio::time::timeout(Duration::from_secs(QUIT_TIMEOUT_SECS), self.child.wait()).await
        {
            Ok(Ok(status)) => {
                debug!("engine exited with {status}");
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                warn!("engine did not exit after quit, killing it");
                self.child.kill().await?;
                Ok(())
            }
        }
    }
}

/// Compare dotted version strings numerically, segment by segment.
fn version_below(reported: &str, required: &str) -> bool {
    parse_version(reported) < parse_version(required)
}

fn parse_version(v: &str) -> Vec<u32> {
    v.trim()
        .split('.')
        .map(|part| {
            part.chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
                .parse()
                .unwrap_or(0)
        })
        .collect()
}
