//! REPL – the operator prompt.
//!
//! Slash-commands inspect the system; every other line is a state command,
//! given either as a phrase (`activate`, `arm`, `side left`, `track 2`, …) or
//! as JSON (`{"command":"Activation","argument":true}`).

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

use robonui_runtime::RoboNuiSystem;
use robonui_types::{RoboticAngle, ServoControllerKind};

/// How many recorded angle sets `/history` prints.
const HISTORY_LINES: usize = 5;

#[derive(Debug, Clone, PartialEq)]
enum Action<'a> {
    Help,
    Status,
    Positions,
    History,
    Quit,
    Command(&'a str),
    Unknown(&'a str),
}

impl<'a> Action<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        Some(match line {
            "/help" => Action::Help,
            "/status" => Action::Status,
            "/positions" => Action::Positions,
            "/history" => Action::History,
            "/quit" | "/exit" => Action::Quit,
            other if other.starts_with('/') => Action::Unknown(other),
            other => Action::Command(other),
        })
    }
}

/// Run until EOF, `/quit`, or `shutdown` is raised.
pub fn run(system: &Mutex<RoboNuiSystem>, shutdown: &AtomicBool) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "robonui>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let Some(action) = Action::parse(&line) else {
            continue;
        };
        let guard = lock(system);
        match action {
            Action::Help => cmd_help(),
            Action::Status => cmd_status(&guard),
            Action::Positions => cmd_positions(&guard),
            Action::History => cmd_history(&guard),
            Action::Quit => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Action::Command(text) => match guard.commands().issue_line(text) {
                Ok(command) => println!("  {} {}", "✓".green().bold(), command.to_string().bold()),
                Err(e) => {
                    warn!(error = %e, line = text, "operator command ignored");
                    println!("  {} {}", "✗".red().bold(), e.to_string().red());
                }
            },
            Action::Unknown(other) => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                );
            }
        }
    }
}

fn lock(system: &Mutex<RoboNuiSystem>) -> MutexGuard<'_, RoboNuiSystem> {
    system.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "State commands".bold().underline());
    println!("  {}   – start / stop driving the robot", "activate  deactivate".bold().cyan());
    println!("  {}         – route angles to a robot", "arm  marionette".bold().cyan());
    println!("  {}        – follow the human's left or right arm", "side left|right".bold().cyan());
    println!("  {}              – follow tracked person <id>", "track <id>".bold().cyan());
    println!("  {} – the same, as JSON", r#"{"command":…,"argument":…}"#.bold().cyan());
    println!();
    println!("{}", "Console".bold().underline());
    println!("  {}     – pipeline wiring and activation", "/status".bold().cyan());
    println!("  {}  – read servo positions back", "/positions".bold().cyan());
    println!("  {}    – last published angle sets", "/history".bold().cyan());
    println!("  {} – return to neutral and exit", "/quit  /exit".bold().cyan());
    println!();
}

fn yes_no(flag: bool) -> colored::ColoredString {
    if flag { "yes".green() } else { "no".red() }
}

fn cmd_status(system: &RoboNuiSystem) {
    let status = system.status();
    println!("{}", "Pipeline".bold().underline());
    println!(
        "  Active       : {}",
        if status.active { "on".green().bold() } else { "off".yellow().bold() }
    );
    println!(
        "  Controller   : {}",
        status
            .controller
            .map_or_else(|| "none".to_string(), |k| k.to_string())
            .bold()
    );
    println!("  Model        : {}", status.model.as_deref().unwrap_or("none").bold());
    println!("  Side         : {}", status.side.to_string().bold());
    println!(
        "  Tracking     : {}",
        status
            .track_id
            .map_or_else(|| "anyone".to_string(), |id| format!("person {id}"))
            .bold()
    );
    println!("  Candidates   : {}", candidate_list(&status.possible_controller_ids));
    println!("  Joint sources: {}", status.joint_providers.to_string().bold());
    println!(
        "  Wired        : joints→{}  angles←{}  angles→{}",
        yes_no(status.joint_consumer),
        yes_no(status.angle_provider),
        yes_no(status.angle_consumer)
    );

    println!("{}", "Servo controllers".bold().underline());
    for kind in [ServoControllerKind::Arm, ServoControllerKind::Marionette] {
        match system.controller(kind) {
            Some(controller) => {
                let transport = controller.transport();
                let link = if system.sim_link(kind).is_some() {
                    "simulated".cyan()
                } else if transport.is_connected() {
                    "connected".green()
                } else {
                    "degraded".red()
                };
                println!(
                    "  {:<11}: {} via {} ({}, {} channels)",
                    kind.to_string(),
                    link,
                    transport.port().bold(),
                    transport.protocol(),
                    controller.channels().len()
                );
            }
            None => println!("  {:<11}: {}", kind.to_string(), "not configured".dimmed()),
        }
    }
}

fn candidate_list(ids: &[i32]) -> colored::ColoredString {
    if ids.is_empty() {
        return "none observed".dimmed();
    }
    let ids: Vec<String> = ids.iter().map(i32::to_string).collect();
    ids.join(", ").bold()
}

fn cmd_positions(system: &RoboNuiSystem) {
    let Some(kind) = system.manager().controller() else {
        println!("  {}", "No servo controller selected.".yellow());
        return;
    };
    let Some(controller) = system.controller(kind) else {
        println!("  {}", "Selected controller is not configured.".yellow());
        return;
    };

    let mapped: Vec<RoboticAngle> = controller.channels().keys().copied().collect();
    match controller.positions(&mapped) {
        Ok(Some(angles)) => {
            println!("{}", format!("{kind} positions").bold().underline());
            for (angle, radians) in angles.iter() {
                println!("  {:<18} {:>8.3} rad", angle.to_string(), radians);
            }
        }
        Ok(None) => println!("  {}", "No answer from the servo controller.".yellow()),
        Err(e) => println!("  {}", e.to_string().yellow()),
    }
    if let Ok(Some(done)) = controller.is_movement_finished() {
        println!("  Movement finished: {}", yes_no(done));
    }
}

fn cmd_history(system: &RoboNuiSystem) {
    let recordings = system.recorder().snapshot();
    if recordings.is_empty() {
        println!("  {}", "Nothing published yet.".dimmed());
        return;
    }
    let skip = recordings.len().saturating_sub(HISTORY_LINES);
    for recording in recordings.iter().skip(skip) {
        let angles: Vec<String> = recording
            .angles
            .iter()
            .map(|(angle, radians)| format!("{angle}={radians:.2}"))
            .collect();
        println!(
            "  {} {}",
            recording.at.format("%H:%M:%S%.3f").to_string().dimmed(),
            angles.join(" ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_commands_and_state_commands_are_told_apart() {
        assert_eq!(Action::parse("  /status "), Some(Action::Status));
        assert_eq!(Action::parse("/exit"), Some(Action::Quit));
        assert_eq!(Action::parse("side left"), Some(Action::Command("side left")));
        assert_eq!(Action::parse("/dance"), Some(Action::Unknown("/dance")));
        assert_eq!(Action::parse("   "), None);
    }

    #[test]
    fn candidates_are_listed_in_order() {
        assert!(candidate_list(&[1, 4, 9]).to_string().contains("1, 4, 9"));
        assert!(candidate_list(&[]).to_string().contains("none observed"));
    }
}
