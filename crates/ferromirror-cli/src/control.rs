//! Interactive control surface read from stdin

use crate::display;
use ferromirror_config::SyncConfig;
use ferromirror_sync::SchedulerHandle;
use std::io::{BufRead, Write};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Commands accepted on the control surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Print the command list
    Help,
    /// Print the source and replica paths
    ShowFolders,
    /// Print the log file path
    ShowLog,
    /// Print the current interval
    ShowInterval,
    /// Print the effective configuration
    ShowConfig,
    /// Change the interval, in seconds
    SetInterval(u64),
    /// Run a cycle now
    SyncNow,
    /// Print the scheduler state and the last cycle report
    Status,
    /// Stop syncing and exit
    Exit,
}

/// Reasons a control line could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlParseError {
    /// Nothing but whitespace or prompt characters
    #[error("Empty command")]
    Empty,
    /// Not a known command
    #[error("Invalid command: {0}")]
    Unknown(String),
    /// `set interval` without a value
    #[error("Missing interval value")]
    MissingInterval,
    /// `set interval` with something that is not a non-negative integer
    #[error("Input is not a number: {0}")]
    InvalidInterval(String),
}

impl FromStr for ControlCommand {
    type Err = ControlParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        // output printed while the operator was typing can leave prompt text in front of the command
        let line = line.rsplit('>').next().unwrap_or(line);
        let words: Vec<&str> = line.split_whitespace().collect();

        let command = match words.as_slice() {
            [] => return Err(ControlParseError::Empty),
            ["help"] | ["-h"] => Self::Help,
            ["show", "folders"] | ["show", "folders", "path"] | ["-sh", "f"] => Self::ShowFolders,
            ["show", "log"] | ["show", "log", "folder", "path"] | ["-sh", "l"] => Self::ShowLog,
            ["show", "interval"] | ["-sh", "i"] => Self::ShowInterval,
            ["show", "config"] => Self::ShowConfig,
            ["set", "interval"] | ["-set", "i"] => return Err(ControlParseError::MissingInterval),
            ["set", "interval", value] | ["-set", "i", value] => Self::SetInterval(
                value
                    .parse()
                    .map_err(|_| ControlParseError::InvalidInterval((*value).to_string()))?,
            ),
            ["sync"] | ["sync", "now"] => Self::SyncNow,
            ["status"] => Self::Status,
            ["exit"] | ["quit"] => Self::Exit,
            _ => return Err(ControlParseError::Unknown(words.join(" "))),
        };
        Ok(command)
    }
}

/// Whether the console keeps reading after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Forward stdin lines into a channel from a dedicated thread
///
/// Blocking stdin reads stay off the async runtime so shutdown never waits on
/// a pending read. The channel closes when stdin reaches end of file.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(8);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
        debug!("stdin reader finished");
    });
    rx
}

/// Dispatches control commands to a running scheduler
pub struct Console<'a> {
    config: &'a SyncConfig,
    scheduler: &'a SchedulerHandle,
    token: CancellationToken,
    interval_secs: u64,
}

impl<'a> Console<'a> {
    /// Create a console for `scheduler`; `token` is cancelled on `exit`
    pub fn new(config: &'a SyncConfig, scheduler: &'a SchedulerHandle, token: CancellationToken) -> Self {
        Self {
            config,
            scheduler,
            token,
            interval_secs: config.interval_secs(),
        }
    }

    /// Read and execute commands until `exit`, cancellation, or end of input
    pub async fn run(mut self, mut lines: mpsc::Receiver<String>) {
        println!("Please enter a command");
        loop {
            prompt();
            let line = tokio::select! {
                () = self.token.cancelled() => return,
                line = lines.recv() => match line {
                    Some(line) => line,
                    None => {
                        debug!("Control input closed");
                        return;
                    }
                },
            };

            match line.parse::<ControlCommand>() {
                Ok(command) => {
                    if self.execute(command).await == Flow::Exit {
                        return;
                    }
                }
                Err(ControlParseError::Empty) => {}
                Err(ControlParseError::Unknown(_)) => {
                    display::print_error("Invalid command");
                    display::print_help();
                }
                Err(e) => display::print_error(&e.to_string()),
            }
        }
    }

    async fn execute(&mut self, command: ControlCommand) -> Flow {
        match command {
            ControlCommand::Help => display::print_help(),
            ControlCommand::ShowFolders => display::print_folders(self.config),
            ControlCommand::ShowLog => println!("{}", self.config.log_file().display()),
            ControlCommand::ShowInterval => println!("{}", self.interval_secs),
            ControlCommand::ShowConfig => display::print_config(self.config),
            ControlCommand::SetInterval(secs) => {
                match self.scheduler.set_interval(Duration::from_secs(secs)).await {
                    Ok(()) => {
                        self.interval_secs = secs;
                        println!("Interval set to {}s", secs);
                    }
                    Err(e) => {
                        warn!("Couldn't change interval: {}", e);
                        display::print_error(&e.to_string());
                    }
                }
            }
            ControlCommand::SyncNow => {
                if let Err(e) = self.scheduler.run_now().await {
                    display::print_error(&e.to_string());
                }
            }
            ControlCommand::Status => display::print_status(
                self.scheduler.state(),
                self.interval_secs,
                self.scheduler.last_report().as_ref(),
            ),
            ControlCommand::Exit => {
                println!("exiting");
                self.token.cancel();
                return Flow::Exit;
            }
        }
        Flow::Continue
    }
}

fn prompt() {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, ">");
    let _ = stdout.flush();
}
