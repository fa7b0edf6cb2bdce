// SPDX-FileCopyrightText: 2021 Camille019
// SPDX-License-Identifier: GPL-2.0-only

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "sensors")]
#[command(about = "Print sensors information")]
#[command(after_help = "Use `-' after `-c' to read the config file from stdin.
If no chips are specified, all chip info will be printed.
Example chip names:
\tlm78-i2c-0-2d\t*-i2c-0-2d
\tlm78-i2c-0-*\t*-i2c-0-*
\tlm78-i2c-*-2d\t*-i2c-*-2d
\tlm78-i2c-*-*\t*-i2c-*-*
\tlm78-isa-0290\t*-isa-0290
\tlm78-isa-*\t*-isa-*
\tlm78-*")]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Specify a config file
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Execute `set' statements (root only)
    #[arg(short = 's', long = "set")]
    pub set: bool,

    /// Show temperatures in degrees fahrenheit
    #[arg(short = 'f', long)]
    pub fahrenheit: bool,

    /// Do not show adapter for each chip
    #[arg(short = 'A', long = "no-adapter")]
    pub no_adapter: bool,

    /// Do not show unknown chips
    #[arg(short = 'U', long = "no-unknown")]
    pub no_unknown: bool,

    /// Treat chips as unknown ones (testing only)
    #[arg(short = 'u', long)]
    pub unknown: bool,

    /// Display the program version
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Chips to act on, all chips when none is given
    #[arg(value_name = "CHIP")]
    pub chips: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn options_and_chips() {
        let cli = Cli::try_parse_from(["sensors", "-s", "-A", "-c", "-", "lm78-*", "*-isa-0290"]).unwrap();
        assert!(cli.set);
        assert!(cli.no_adapter);
        assert!(!cli.fahrenheit);
        assert_eq!(cli.config_file, Some(PathBuf::from("-")));
        assert_eq!(cli.chips, vec!["lm78-*", "*-isa-0290"]);
    }

    #[test]
    fn short_version_flag() {
        let cli = Cli::try_parse_from(["sensors", "-v"]).unwrap();
        assert!(cli.version);
        assert!(cli.chips.is_empty());
    }

    #[test]
    fn unknown_option() {
        let err = Cli::try_parse_from(["sensors", "-x"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
