// SPDX-FileCopyrightText: 2021 Camille019
// SPDX-License-Identifier: GPL-2.0-only

//! Selection of the detected chips a run acts on.

use std::fmt;

use hwmon::{ChipName, ChipPattern};

/// Most chip patterns accepted on the command line.
pub const CHIPS_MAX: usize = 20;

#[derive(Debug, PartialEq)]
pub enum PatternError {
    /// The argument is not a valid chip name.
    Parse(String),
    TooMany,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PatternError::Parse(arg) => write!(f, "Parse error in chip name `{}'", arg),
            PatternError::TooMany => write!(f, "Too many chips on command line!"),
        }
    }
}

/// Build the ordered pattern list from the command line arguments.
///
/// No argument selects every chip.
pub fn parse_patterns<S: AsRef<str>>(args: &[S]) -> Result<Vec<ChipPattern>, PatternError> {
    if args.is_empty() {
        return Ok(vec![ChipPattern::any()]);
    }

    if args.len() > CHIPS_MAX {
        return Err(PatternError::TooMany);
    }

    args.iter()
        .map(|arg| {
            let arg = arg.as_ref();
            arg.parse::<ChipPattern>()
                .map_err(|_| PatternError::Parse(arg.to_string()))
        })
        .collect()
}

/// Result of the action applied to one chip.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
pub enum Outcome {
    Done,
    Failed,
}

/// What a run did, for the caller to choose the exit status.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    /// Number of chips an action was applied to.
    pub handled: usize,
    /// Whether at least one action failed.
    pub failed: bool,
}

/// Apply `action` once to every chip matching one of `patterns`.
///
/// Patterns are tried in order and the first match wins: a chip is never
/// handled twice. Chips matching no pattern are skipped. A failed action
/// does not stop the run.
pub fn dispatch<C, I, F>(chips: I, patterns: &[ChipPattern], mut action: F) -> Summary
where
    I: IntoIterator<Item = C>,
    C: AsRef<ChipName>,
    F: FnMut(&C) -> Outcome,
{
    let mut summary = Summary::default();

    for chip in chips {
        let name = chip.as_ref();
        let Some(idx) = patterns.iter().position(|pattern| pattern.matches(name)) else {
            log::debug!("{}: no matching pattern", name);
            continue;
        };

        log::debug!("{}: matches pattern #{}", name, idx);
        if action(&chip) == Outcome::Failed {
            summary.failed = true;
        }
        summary.handled += 1;
    }

    summary
}
