//! Line-based operator console.
//!
//! Drives the four control-surface operations from stdin and renders
//! snapshots back.  The console is one of possibly many operator surfaces;
//! everything it can do goes through [`ControlSurface`], so it carries no
//! state of its own.
//!
//! Door ids are 1-based on the console (matching the cab labelling) and
//! converted to zero-based indices at the surface boundary.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use core::fmt::Write as _;
use log::info;

use crate::error::RequestError;
use crate::state::{ControlSnapshot, DoorCommand, DoorState};
use crate::surface::{ControlSurface, DoorIntent};

// ───────────────────────────────────────────────────────────────
// Command grammar
// ───────────────────────────────────────────────────────────────

/// One parsed console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Blank line, nothing to do.
    Empty,
    Help,
    Status,
    Json,
    Quit,
    Speed(u32),
    Emergency(bool),
    /// `door` is the 1-based console id.
    Door { door: u8, intent: DoorIntent },
    AllDoors(DoorIntent),
}

/// Why a line failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError<'a> {
    UnknownCommand(&'a str),
    MissingArgument(&'static str),
    BadNumber(&'a str),
    BadSwitch(&'a str),
}

/// Parse one console line.  Whitespace-tolerant, no quoting.
pub fn parse(line: &str) -> Result<ConsoleCommand, ParseError<'_>> {
    let mut tokens = line.split_whitespace();
    let Some(cmd) = tokens.next() else {
        return Ok(ConsoleCommand::Empty);
    };
    let arg = tokens.next();

    match cmd {
        "help" => Ok(ConsoleCommand::Help),
        "status" => Ok(ConsoleCommand::Status),
        "json" => Ok(ConsoleCommand::Json),
        "quit" => Ok(ConsoleCommand::Quit),
        "speed" => {
            let raw = arg.ok_or(ParseError::MissingArgument("speed <kmh>"))?;
            let kmh = raw.parse().map_err(|_| ParseError::BadNumber(raw))?;
            Ok(ConsoleCommand::Speed(kmh))
        }
        "emergency" => match arg {
            Some("on") => Ok(ConsoleCommand::Emergency(true)),
            Some("off") => Ok(ConsoleCommand::Emergency(false)),
            Some(other) => Err(ParseError::BadSwitch(other)),
            None => Err(ParseError::MissingArgument("emergency on|off")),
        },
        "open" | "close" => {
            let intent = if cmd == "open" {
                DoorIntent::Open
            } else {
                DoorIntent::Close
            };
            let raw = arg.ok_or(ParseError::MissingArgument("door id"))?;
            let door: u8 = raw.parse().map_err(|_| ParseError::BadNumber(raw))?;
            if door == 0 {
                return Err(ParseError::BadNumber(raw));
            }
            Ok(ConsoleCommand::Door { door, intent })
        }
        "open-all" => Ok(ConsoleCommand::AllDoors(DoorIntent::Open)),
        "close-all" => Ok(ConsoleCommand::AllDoors(DoorIntent::Close)),
        other => Err(ParseError::UnknownCommand(other)),
    }
}

// ───────────────────────────────────────────────────────────────
// Rendering
// ───────────────────────────────────────────────────────────────

fn state_label(s: DoorState) -> &'static str {
    match s {
        DoorState::Open => "OPEN",
        DoorState::Closed => "CLOSED",
    }
}

fn cmd_label(c: DoorCommand) -> &'static str {
    match c {
        DoorCommand::None => "NONE",
        DoorCommand::Open => "OPEN",
        DoorCommand::Close => "CLOSE",
    }
}

/// Render the status table (1-based ids, every aggregated-frame field).
pub fn render_table(snap: &ControlSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "speed {} km/h, emergency {}",
        snap.speed,
        if snap.emergency { "ACTIVE" } else { "off" }
    );
    let _ = writeln!(
        out,
        "door  state   obstr  last-cmd  blocked  cnt  cmd    alive"
    );
    for d in &snap.doors {
        let _ = writeln!(
            out,
            "{:>4}  {:<6}  {:<5}  {:<8}  {:<7}  {:>3}  {:<5}  {:>5}",
            d.id + 1,
            state_label(d.state),
            if d.obstruction { "YES" } else { "no" },
            cmd_label(d.last_cmd),
            if d.close_blocked { "YES" } else { "no" },
            d.status_counter,
            cmd_label(d.cmd),
            d.alive_counter,
        );
    }
    out
}

/// Rejection text for the console.  The line already names the 1-based door
/// id, so the library error's zero-based index is dropped here.
fn rejection_label(e: RequestError) -> &'static str {
    match e {
        RequestError::InvalidDoor(_) => "invalid door id",
        RequestError::Obstructed(_) => "obstructed, cannot close",
        RequestError::TrainMoving => "train is moving, cannot open",
    }
}

const HELP: &str = "\
commands:
  status            show the door table
  json              dump the snapshot as JSON
  speed <kmh>       set train speed
  emergency on|off  toggle the emergency override
  open <id>         request one door open  (id 1-based)
  close <id>        request one door closed
  open-all          request every door open
  close-all         request every door closed
  help              show this help
  quit              exit";

// ───────────────────────────────────────────────────────────────
// Console loop
// ───────────────────────────────────────────────────────────────

/// Outcome of one handled line.
#[derive(Debug, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Quit,
}

pub struct Console {
    surface: ControlSurface,
}

impl Console {
    pub fn new(surface: ControlSurface) -> Self {
        Self { surface }
    }

    /// Execute one line, appending any output to `out`.
    pub fn handle_line(&self, line: &str, out: &mut String) -> LineOutcome {
        let cmd = match parse(line) {
            Ok(cmd) => cmd,
            Err(ParseError::UnknownCommand(tok)) => {
                let _ = writeln!(out, "unknown command '{tok}'\n{HELP}");
                return LineOutcome::Continue;
            }
            Err(ParseError::MissingArgument(usage)) => {
                let _ = writeln!(out, "missing argument: {usage}");
                return LineOutcome::Continue;
            }
            Err(ParseError::BadNumber(tok)) => {
                let _ = writeln!(out, "not a valid number: '{tok}'");
                return LineOutcome::Continue;
            }
            Err(ParseError::BadSwitch(tok)) => {
                let _ = writeln!(out, "expected on|off, got '{tok}'");
                return LineOutcome::Continue;
            }
        };

        match cmd {
            ConsoleCommand::Empty => {}
            ConsoleCommand::Help => {
                let _ = writeln!(out, "{HELP}");
            }
            ConsoleCommand::Status => {
                let _ = write!(out, "{}", render_table(&self.surface.snapshot()));
            }
            ConsoleCommand::Json => match serde_json::to_string(&self.surface.snapshot()) {
                Ok(json) => {
                    let _ = writeln!(out, "{json}");
                }
                Err(e) => {
                    let _ = writeln!(out, "snapshot serialisation failed: {e}");
                }
            },
            ConsoleCommand::Quit => return LineOutcome::Quit,
            ConsoleCommand::Speed(kmh) => {
                self.surface.set_speed(kmh);
                let _ = writeln!(out, "speed set to {kmh} km/h");
            }
            ConsoleCommand::Emergency(active) => {
                self.surface.set_emergency(active);
                let _ = writeln!(
                    out,
                    "emergency {}",
                    if active { "ACTIVATED" } else { "deactivated" }
                );
            }
            ConsoleCommand::Door { door, intent } => {
                match self.surface.request_door(usize::from(door) - 1, intent) {
                    Ok(()) => {
                        let _ = writeln!(out, "door {door}: {intent:?} requested");
                    }
                    Err(e) => {
                        let _ = writeln!(out, "door {door}: rejected, {}", rejection_label(e));
                    }
                }
            }
            ConsoleCommand::AllDoors(intent) => {
                let count = self.surface.snapshot().doors.len();
                for idx in 0..count {
                    match self.surface.request_door(idx, intent) {
                        Ok(()) => {}
                        Err(e) => {
                            let _ =
                                writeln!(out, "door {}: rejected, {}", idx + 1, rejection_label(e));
                        }
                    }
                }
                let _ = writeln!(out, "{intent:?} requested for all doors");
            }
        }
        LineOutcome::Continue
    }

    /// Read stdin until `quit` or EOF, then raise the stop flag so the
    /// coordinator winds down within one cycle.
    pub fn run(&self, stop: &Arc<AtomicBool>) {
        println!("{HELP}");
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            // The coordinator may have stopped first (runtime limit).
            if stop.load(Ordering::Relaxed) {
                break;
            }
            let Ok(line) = line else { break };
            let mut out = String::new();
            let outcome = self.handle_line(&line, &mut out);
            print!("{out}");
            if outcome == LineOutcome::Quit {
                break;
            }
        }
        info!("console: quitting");
        stop.store(true, Ordering::Relaxed);
    }
}
