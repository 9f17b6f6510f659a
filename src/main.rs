// Copyright (C) 2023, Alex Badics
// This file is part of isense-console
// Licensed under the MIT license. See LICENSE file in the project root for details.

use std::{io, path::PathBuf, process::ExitCode, time::Duration};

use clap::Parser;
use isense_console::{
    console::{Console, ConsoleSettings, MonotonicClock},
    keyboard::TerminalKeys,
    open_tracker, Error, OpenOptions, Tracker,
};

/// Poll an InterSense tracker and change its settings with single key presses.
/// Press any unbound key for the list of commands.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path of the driver library (libisense.so / isense.dll)
    #[arg(long, env = "ISENSE_LIBRARY")]
    library: Option<PathBuf>,

    /// Port the tracker is connected to. 0 opens the first tracker found.
    #[arg(long, default_value_t = 0)]
    port: u32,

    /// Minimum time between two telemetry lines, in milliseconds
    #[arg(long, default_value_t = 10)]
    display_interval_ms: u64,

    /// Sleep between loop iterations, in milliseconds
    #[arg(long, default_value_t = 1)]
    poll_interval_ms: u64,

    /// Let the driver print its own diagnostic messages
    #[arg(long)]
    verbose_driver: bool,
}

fn open(args: &Args) -> Option<Box<dyn Tracker>> {
    let options = OpenOptions {
        library: args.library.clone(),
        port: args.port,
        verbose: args.verbose_driver,
    };
    match open_tracker(&options) {
        Ok(tracker) => Some(tracker),
        Err(Error::NotFound) => {
            println!("{}", Error::NotFound);
            None
        }
        Err(e) => {
            println!("Failed to detect InterSense tracking device: {e}");
            None
        }
    }
}

fn run(args: Args) -> isense_console::Result<()> {
    let tracker = open(&args);
    let settings = ConsoleSettings {
        display_interval: Duration::from_millis(args.display_interval_ms),
        poll_interval: Duration::from_millis(args.poll_interval_ms),
    };
    let mut keys = TerminalKeys::new()?;
    let mut console = Console::start(tracker, settings, MonotonicClock::new(), io::stdout());
    console.run(&mut keys)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
