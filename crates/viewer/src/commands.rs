//! Operator command grammar
//!
//! One command per line, whitespace separated:
//!
//! | command          | effect                                  |
//! |------------------|-----------------------------------------|
//! | `play` / `pause` | start or stop playback                  |
//! | `toggle`         | flip play state                         |
//! | `seek <t>`       | scrub to `t` seconds (clamped, pauses)  |
//! | `issue <n>`      | jump to the n-th issue (0-based)        |
//! | `scene`          | print the resolved scene                |
//! | `issues`/`kpis`  | print the result's issues or KPIs       |
//! | `report`         | request the textual report              |
//! | `close-report`   | discard the report                      |
//! | `load <path>`    | upload a new log                        |
//! | `health`         | check the analysis service is up        |
//! | `help` / `quit`  |                                         |
//!
//! Verbs are case-insensitive. The line is handed to clap after the verb is
//! split off, so `load` receives everything after it as one path.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use contracts::{AnalysisService, Issue, Kpis, LogArtifact, Scene};
use sync_engine::PlaybackState;

use crate::driver::PlaybackDriver;
use crate::error::ViewerError;

pub const HELP: &str = "\
commands:
  play | pause | toggle      control playback
  seek <t>                   scrub to t seconds
  issue <n>                  jump to issue n
  scene | issues | kpis      show state
  report | close-report      textual report
  load <path>                upload a new log
  health                     check the analysis service is up
  help | quit";

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    Play,
    Pause,
    #[command(alias = "space")]
    Toggle,
    Seek {
        #[arg(value_parser = parse_time, allow_hyphen_values = true)]
        t: f64,
    },
    Issue {
        index: usize,
    },
    Scene,
    Issues,
    Kpis,
    Report,
    CloseReport,
    /// The rest of the line is the path, spaces included
    Load {
        path: PathBuf,
    },
    Health,
    #[command(alias = "?")]
    Help,
    #[command(aliases = ["exit", "q"])]
    Quit,
}

/// One operator line
#[derive(Debug, Parser)]
#[command(
    no_binary_name = true,
    disable_help_flag = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
struct CommandLine {
    #[command(subcommand)]
    command: Command,
}

fn parse_time(raw: &str) -> Result<f64, String> {
    let t: f64 = raw.parse().map_err(|_| format!("bad time '{raw}'"))?;
    if t.is_nan() {
        return Err("seek time is NaN".to_string());
    }
    Ok(t)
}

impl FromStr for Command {
    type Err = ViewerError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        if verb.is_empty() {
            return Err(ViewerError::invalid_command("empty line"));
        }

        let verb = verb.to_ascii_lowercase();
        let rest = rest.trim();
        let mut args = vec![verb.as_str()];
        if verb == "load" {
            if !rest.is_empty() {
                args.push(rest);
            }
        } else {
            args.extend(rest.split_whitespace());
        }

        CommandLine::try_parse_from(args)
            .map(|parsed| parsed.command)
            .map_err(|e| {
                let rendered = e.to_string();
                let message = rendered.lines().next().unwrap_or_default();
                ViewerError::invalid_command(message.trim_start_matches("error: "))
            })
    }
}

/// Outcome of a command, rendered by the caller
#[derive(Debug, Clone)]
pub enum Response {
    Scene(Scene),
    State(PlaybackState),
    /// Issue jump; `false` when the issue has no timestamp
    Jumped { index: usize, applied: bool },
    Issues(Vec<Issue>),
    Kpis(Kpis),
    Report(String),
    /// Upload superseded by a newer one
    Superseded,
    Healthy,
    Ack,
    Help,
    Quit,
}

impl<S> PlaybackDriver<S>
where
    S: AnalysisService + Sync + 'static,
{
    /// Execute one operator command
    pub async fn execute(&mut self, command: Command) -> Result<Response, ViewerError> {
        let response = match command {
            Command::Play => Response::State(self.play().await?),
            Command::Pause => Response::State(self.pause().await?),
            Command::Toggle => Response::State(self.toggle_play().await?),
            Command::Seek { t } => Response::Scene(self.seek(t).await?),
            Command::Issue { index } => Response::Jumped {
                index,
                applied: self.jump_to_issue(index).await?,
            },
            Command::Scene => Response::Scene(self.scene().await.ok_or(ViewerError::NoResult)?),
            Command::Issues => {
                let shared = self.session();
                let session = shared.lock().await;
                let result = session.result().ok_or(ViewerError::NoResult)?;
                Response::Issues(result.issues.clone())
            }
            Command::Kpis => {
                let shared = self.session();
                let session = shared.lock().await;
                let result = session.result().ok_or(ViewerError::NoResult)?;
                Response::Kpis(result.kpis.clone())
            }
            Command::Report => Response::Report(self.generate_report().await?),
            Command::CloseReport => {
                self.close_report().await;
                Response::Ack
            }
            Command::Load { path } => {
                let artifact = LogArtifact::from_path(&path)?;
                match self.upload(artifact).await? {
                    Some(scene) => Response::Scene(scene),
                    None => Response::Superseded,
                }
            }
            Command::Health => {
                self.service().health().await?;
                Response::Healthy
            }
            Command::Help => Response::Help,
            Command::Quit => Response::Quit,
        };
        Ok(response)
    }
}
