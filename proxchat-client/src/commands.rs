//! Console control commands
//!
//! One command per stdin line. Leading `/` is optional, names are
//! case-insensitive, and each command has a short alias.
//!
//! | Command | Aliases | Description |
//! |---------|---------|-------------|
//! | `mute` | `m` | Stop sending microphone audio |
//! | `unmute` | `um` | Resume sending microphone audio |
//! | `deafen` | `d` | Stop playing incoming audio |
//! | `undeafen` | `ud` | Resume playing incoming audio |
//! | `move <x> <y>` | `mv` | Move yourself in the arena |
//! | `place <identity> <x> <y>` | `p` | Move another participant |
//! | `who` | `w`, `list` | Show participants, positions and volumes |
//! | `help` | `h`, `?` | Show available commands |
//! | `quit` | `q`, `exit` | Leave the session |

use std::fmt::Write as _;

use proxchat_common::Identity;
use thiserror::Error;

use crate::session::ClientSession;
use crate::spatial::Position;

/// Command metadata for alias lookup and `help`
pub struct CommandInfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub description: &'static str,
}

/// All commands (alphabetical order)
pub static COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "deafen",
        aliases: &["d"],
        usage: "deafen",
        description: "Stop playing incoming audio",
    },
    CommandInfo {
        name: "help",
        aliases: &["h", "?"],
        usage: "help",
        description: "Show available commands",
    },
    CommandInfo {
        name: "move",
        aliases: &["mv"],
        usage: "move <x> <y>",
        description: "Move yourself in the arena",
    },
    CommandInfo {
        name: "mute",
        aliases: &["m"],
        usage: "mute",
        description: "Stop sending microphone audio",
    },
    CommandInfo {
        name: "place",
        aliases: &["p"],
        usage: "place <identity> <x> <y>",
        description: "Move another participant",
    },
    CommandInfo {
        name: "quit",
        aliases: &["q", "exit"],
        usage: "quit",
        description: "Leave the session",
    },
    CommandInfo {
        name: "undeafen",
        aliases: &["ud"],
        usage: "undeafen",
        description: "Resume playing incoming audio",
    },
    CommandInfo {
        name: "unmute",
        aliases: &["um"],
        usage: "unmute",
        description: "Resume sending microphone audio",
    },
    CommandInfo {
        name: "who",
        aliases: &["w", "list"],
        usage: "who",
        description: "Show participants, positions and volumes",
    },
];

/// A parsed console command
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Mute,
    Unmute,
    Deafen,
    Undeafen,
    Move { x: f32, y: f32 },
    Place { identity: Identity, x: f32, y: f32 },
    Who,
    Help,
    Quit,
}

/// Why a line could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}', type 'help' for a list")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("'{0}' is not a number")]
    InvalidNumber(String),
}

fn lookup(name: &str) -> Option<&'static CommandInfo> {
    let name = name.to_lowercase();
    COMMANDS
        .iter()
        .find(|info| info.name == name || info.aliases.iter().any(|alias| *alias == name))
}

fn parse_coordinate(arg: &str) -> Result<f32, CommandError> {
    arg.parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CommandError::InvalidNumber(arg.to_string()))
}

impl ControlCommand {
    /// Parse one input line; blank lines yield `Ok(None)`
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        let line = line.strip_prefix('/').unwrap_or(line);
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = parts.collect();

        let info = lookup(name).ok_or_else(|| CommandError::Unknown(name.to_string()))?;
        let command = match (info.name, args.as_slice()) {
            ("mute", []) => ControlCommand::Mute,
            ("unmute", []) => ControlCommand::Unmute,
            ("deafen", []) => ControlCommand::Deafen,
            ("undeafen", []) => ControlCommand::Undeafen,
            ("who", []) => ControlCommand::Who,
            ("help", []) => ControlCommand::Help,
            ("quit", []) => ControlCommand::Quit,
            ("move", [x, y]) => ControlCommand::Move {
                x: parse_coordinate(x)?,
                y: parse_coordinate(y)?,
            },
            ("place", [identity, x, y]) => ControlCommand::Place {
                identity: Identity::new(identity),
                x: parse_coordinate(x)?,
                y: parse_coordinate(y)?,
            },
            _ => return Err(CommandError::Usage(info.usage)),
        };
        Ok(Some(command))
    }

    /// Carry out the command and describe the result
    ///
    /// `Quit` only reports; the caller ends the session.
    pub fn apply(&self, session: &ClientSession) -> String {
        let state = session.state();
        match self {
            ControlCommand::Mute => {
                state.set_muted(true);
                "Microphone muted".to_string()
            }
            ControlCommand::Unmute => {
                state.set_muted(false);
                "Microphone unmuted".to_string()
            }
            ControlCommand::Deafen => {
                state.set_deafened(true);
                "Incoming audio off".to_string()
            }
            ControlCommand::Undeafen => {
                state.set_deafened(false);
                "Incoming audio on".to_string()
            }
            ControlCommand::Move { x, y } => {
                let placed = session
                    .board()
                    .set_position(session.identity(), Position::new(*x, *y));
                format!("You are at ({:.0}, {:.0})", placed.x, placed.y)
            }
            ControlCommand::Place { identity, x, y } => {
                if session.board().position_of(identity).is_none() {
                    return format!("{identity} is not connected");
                }
                let placed = session.board().set_position(identity, Position::new(*x, *y));
                format!("{identity} is at ({:.0}, {:.0})", placed.x, placed.y)
            }
            ControlCommand::Who => who(session),
            ControlCommand::Help => help(),
            ControlCommand::Quit => "Leaving".to_string(),
        }
    }
}

fn who(session: &ClientSession) -> String {
    let volumes = session.state().volumes();
    let mut out = String::new();
    for (identity, position) in session.board().snapshot() {
        let _ = write!(out, "{identity:<20} ({:>4.0}, {:>4.0})", position.x, position.y);
        if &identity == session.identity() {
            out.push_str("  (you)");
        } else {
            let volume = volumes.get(&identity).copied().unwrap_or(0.0);
            let _ = write!(out, "  volume {:.2}", volume);
        }
        out.push('\n');
    }
    let state = session.state();
    let _ = write!(
        out,
        "muted: {}, deafened: {}",
        if state.is_muted() { "yes" } else { "no" },
        if state.is_deafened() { "yes" } else { "no" },
    );
    out
}

fn help() -> String {
    COMMANDS
        .iter()
        .map(|info| format!("{:<26} {}", info.usage, info.description))
        .collect::<Vec<_>>()
        .join("\n")
}
