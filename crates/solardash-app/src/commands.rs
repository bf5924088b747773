//! Console commands standing in for the dashboard buttons

use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

use solardash_core::scheduler::DashboardControls;

/// A console command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Switch between km and miles
    ToggleUnits,
    /// Zero distance, speed and elapsed time
    Reset,
}

impl Command {
    /// Parse one input line; blank lines yield `None`
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        match line.trim().to_ascii_lowercase().as_str() {
            "" => None,
            "u" | "units" => Some(Ok(Command::ToggleUnits)),
            "r" | "reset" => Some(Ok(Command::Reset)),
            other => Some(Err(other.to_string())),
        }
    }

    /// Apply to the running dashboard
    pub fn apply(self, controls: &DashboardControls) {
        match self {
            Command::ToggleUnits => {
                let unit = controls.toggle_units();
                info!("Units switched to {:?}", unit);
            }
            Command::Reset => controls.request_reset(),
        }
    }
}

/// Read commands from stdin on a detached thread until stdin closes
pub fn spawn_stdin_reader(controls: DashboardControls) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name("console".to_string()).spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read console input: {}", e);
                    break;
                }
            };
            match Command::parse(&line) {
                Some(Ok(command)) => command.apply(&controls),
                Some(Err(unknown)) => warn!("Unknown command {:?} (try 'units' or 'reset')", unknown),
                None => {}
            }
        }
    })
}
