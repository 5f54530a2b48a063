//! `robonui` – operator console for the RoboNUI control plane.
//!
//! 1. Loads `~/.robonui/config.toml` (or the file given with `--config`),
//!    falling back to the all-simulated defaults when there is none.
//! 2. Starts the system: transports, controllers, joint sources and the
//!    orchestrator.
//! 3. Reads operator commands at an interactive prompt.
//! 4. On exit or **Ctrl-C**, returns the robot to neutral and closes the
//!    serial ports.

mod repl;

use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, warn};

use robonui_runtime::config::{self, SystemConfig};
use robonui_runtime::{RoboNuiSystem, init_tracing};

fn main() {
    let _telemetry = init_tracing("robonui");

    print_banner();

    let config_path = match config_path_from_args(std::env::args().skip(1)) {
        Ok(path) => path,
        Err(msg) => {
            eprintln!("{}: {msg}", "Usage error".red());
            eprintln!("  usage: robonui [--config <path>]");
            std::process::exit(2);
        }
    };
    let loaded = match &config_path {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    let cfg = match loaded {
        Ok(Some(cfg)) => {
            let shown = config_path.unwrap_or_else(config::config_path);
            println!("  Config loaded from {}", shown.display().to_string().bold());
            cfg
        }
        Ok(None) => {
            println!(
                "  {} Using simulated controllers and skeleton.",
                "No configuration found.".dimmed()
            );
            SystemConfig::default()
        }
        Err(e) => {
            error!(error = %e, "configuration rejected");
            eprintln!("{}: {e}", "Config error".red());
            std::process::exit(2);
        }
    };

    let system = match RoboNuiSystem::start(cfg) {
        Ok(system) => Arc::new(Mutex::new(system)),
        Err(e) => {
            error!(error = %e, "start-up failed");
            eprintln!("{}: {e}", "Start-up failed".red());
            std::process::exit(1);
        }
    };

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    // The prompt may be blocked in read_line, so the handler winds the
    // system down itself before exiting.
    {
        let shutdown = shutdown.clone();
        let system = system.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            println!();
            println!("{}", "⚠  Ctrl-C received – returning to neutral …".yellow().bold());
            shutdown.store(true, Ordering::SeqCst);
            system
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .shutdown();
            println!("{}", "  ✓ Servo ports closed. Exiting RoboNUI.".green());
            std::process::exit(130);
        }) {
            warn!(
                error = %e,
                "Failed to install Ctrl-C handler; Ctrl-C will skip the neutral pose"
            );
        }
    }

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    repl::run(&system, &shutdown);

    system
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .shutdown();
}

/// `--config <path>` / `-c <path>`; anything else is an error.
fn config_path_from_args(
    mut args: impl Iterator<Item = String>,
) -> Result<Option<PathBuf>, String> {
    let mut path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args.next().ok_or("--config needs a path")?;
                path = Some(PathBuf::from(value));
            }
            other => return Err(format!("unexpected argument '{other}'")),
        }
    }
    Ok(path)
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ___       __        _  ____  ______"#.bold().cyan());
    println!("{}", r#"  / _ \___  / /  ___  / |/ / / / /  _/"#.bold().cyan());
    println!("{}", r#" / , _/ _ \/ _ \/ _ \/    / /_/ // /  "#.bold().cyan());
    println!("{}", r#"/_/|_|\___/_.__/\___/_/|_/\____/___/  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "RoboNUI".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Natural user interface for servo robots");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn no_arguments_means_default_path() {
        assert_eq!(config_path_from_args(args(&[])), Ok(None));
    }

    #[test]
    fn config_flag_takes_a_path() {
        assert_eq!(
            config_path_from_args(args(&["-c", "/tmp/robot.toml"])),
            Ok(Some(PathBuf::from("/tmp/robot.toml")))
        );
        assert!(config_path_from_args(args(&["--config"])).is_err());
        assert!(config_path_from_args(args(&["--verbose"])).is_err());
    }
}
