// SPDX-FileCopyrightText: 2021 Camille019
// SPDX-License-Identifier: GPL-2.0-only

mod actions;
mod chips;
mod cli;
mod dispatch;

use std::fs::File;
use std::io;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use hwmon::Context;

use crate::actions::PrintOptions;
use crate::cli::Cli;
use crate::dispatch::{PatternError, Summary};

const DEFAULT_CONFIG_FILE: &str = "/etc/sensors.conf";

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if cli.version {
        println!(
            "sensors version {} with libhwmon version {}",
            env!("CARGO_PKG_VERSION"),
            hwmon::VERSION
        );
        return ExitCode::SUCCESS;
    }

    let patterns = match dispatch::parse_patterns(&cli.chips) {
        Ok(patterns) => patterns,
        Err(e) => {
            eprintln!("{}", e);
            if let PatternError::Parse(_) = e {
                eprintln!("Try `sensors -h' for more information");
            }
            return ExitCode::FAILURE;
        }
    };

    let context = match load_context(cli.config_file.as_deref()) {
        Ok(context) => context,
        Err(code) => return code,
    };

    let chips = match context.detected_chips() {
        Ok(chips) => chips,
        Err(e) => {
            eprintln!("sensors_init: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let summary = if cli.set {
        let mut err = io::stderr();
        dispatch::dispatch(chips, &patterns, |chip| actions::do_a_set(&mut err, &context, chip))
    } else {
        let options = PrintOptions {
            hide_adapter: cli.no_adapter,
            hide_unknown: cli.no_unknown,
            raw: cli.unknown,
            fahrenheit: cli.fahrenheit,
        };
        let mut out = io::stdout().lock();
        let mut err = io::stderr();
        dispatch::dispatch(chips, &patterns, |chip| {
            actions::do_a_print(&mut out, &mut err, chip, &options)
        })
    };

    log::debug!("{} chip(s) handled, failure: {}", summary.handled, summary.failed);

    match exit_status(&summary, !cli.chips.is_empty()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            if let Some(message) = message {
                eprintln!("{}", message);
            }
            ExitCode::FAILURE
        }
    }
}

/// Outcome of a run: an error, with the message to show if any, when no
/// chip was handled or an action failed.
fn exit_status(summary: &Summary, user_patterns: bool) -> Result<(), Option<&'static str>> {
    if summary.handled == 0 {
        return Err(Some(not_found_message(user_patterns)));
    }

    if summary.failed {
        Err(None)
    } else {
        Ok(())
    }
}

/// Build the library context, reading the configuration from
/// `config_file`, standard input for `-`, or the default file if it
/// exists.
fn load_context(config_file: Option<&Path>) -> Result<Context, ExitCode> {
    let res = match config_file {
        Some(path) if path == Path::new("-") => Context::from_reader(io::stdin().lock()),
        Some(path) => match File::open(path) {
            Ok(file) => Context::from_reader(file),
            Err(e) => {
                eprintln!("Could not open config file\n{}: {}", path.display(), e);
                return Err(ExitCode::FAILURE);
            }
        },
        None => match File::open(DEFAULT_CONFIG_FILE) {
            Ok(file) => Context::from_reader(file),
            Err(e) => {
                log::debug!("{}: {}", DEFAULT_CONFIG_FILE, e);
                Context::new(None)
            }
        },
    };

    res.map_err(|e| {
        eprintln!("sensors_init: {}", e);
        ExitCode::FAILURE
    })
}

fn not_found_message(user_patterns: bool) -> &'static str {
    if user_patterns {
        "Specified sensor(s) not found!"
    } else {
        "No sensors found!\n\
         Make sure you loaded all the kernel drivers you need.\n\
         Try sensors-detect to find out which these are."
    }
}
