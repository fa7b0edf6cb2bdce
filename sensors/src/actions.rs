// SPDX-FileCopyrightText: 2021 Camille019
// SPDX-License-Identifier: GPL-2.0-only

//! What is done to each selected chip.

use std::io::{self, Write};

use hwmon::{Chip, ChipName, Context, Error};

use crate::chips;
use crate::dispatch::Outcome;

/// Rendering choices of the print action.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrintOptions {
    pub hide_adapter: bool,
    pub hide_unknown: bool,
    pub raw: bool,
    pub fahrenheit: bool,
}

/// Print the readings of `chip` to `out`, diagnostics going to `err`.
///
/// Never fails: a missing adapter name or an output error is only
/// reported.
pub fn do_a_print<W: Write, E: Write>(out: &mut W, err: &mut E, chip: &Chip, options: &PrintOptions) -> Outcome {
    if options.hide_unknown {
        log::debug!("{}: printing disabled", chip.name());
        return Outcome::Done;
    }

    if let Err(e) = print_chip_report(out, err, chip, options) {
        log::warn!("{}: {}", chip.name(), e);
    }

    Outcome::Done
}

fn print_chip_report<W: Write, E: Write>(
    out: &mut W,
    err: &mut E,
    chip: &Chip,
    options: &PrintOptions,
) -> io::Result<()> {
    writeln!(out, "{}", chip.name())?;

    if !options.hide_adapter {
        match chip.adapter_name() {
            Some(name) => writeln!(out, "Adapter: {}", name)?,
            None => writeln!(err, "Can't get adapter name for bus {}", chip.bus().number())?,
        }
    }

    if options.raw {
        chips::print_chip_raw(out, err, chip)?;
    } else {
        chips::print_chip(out, chip, options.fahrenheit)?;
    }

    writeln!(out)
}

/// Apply the configured `set` statements to `chip`, reporting failures
/// to `err`.
pub fn do_a_set<E: Write>(err: &mut E, context: &Context, chip: &Chip) -> Outcome {
    report_set_result(err, chip.name(), context.do_chip_sets(chip))
}

fn report_set_result<E: Write>(err: &mut E, name: &ChipName, res: Result<(), Error>) -> Outcome {
    let written = match res {
        Ok(()) => return Outcome::Done,
        Err(e @ Error::Access(_)) => writeln!(err, "{}: {} for writing;\nRun as root?", name, e),
        Err(Error::SetFailed(_)) => writeln!(err, "{}: At least one \"set\" statement failed", name),
        Err(e) => writeln!(err, "{}: {}", name, e),
    };

    if let Err(e) = written {
        log::warn!("{}: {}", name, e);
    }

    Outcome::Failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::symlink;
    use std::path::{Path, PathBuf};

    use hwmon::{BusId, BusType};
    use tempfile::TempDir;

    use crate::dispatch::{dispatch, parse_patterns, Summary};

    fn add_hwmon(root: &Path, hwmon: &str, attrs: &[(&str, &str)]) -> PathBuf {
        let dir = root.join("class/hwmon").join(hwmon);
        fs::create_dir_all(&dir).unwrap();
        for (attr, value) in attrs {
            fs::write(dir.join(attr), value).unwrap();
        }
        dir
    }

    fn first_chip(context: &Context) -> Chip {
        context.detected_chips().unwrap().next().unwrap()
    }

    fn print_to_strings(chip: &Chip, options: PrintOptions) -> (String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        assert_eq!(do_a_print(&mut out, &mut err, chip, &options), Outcome::Done);
        (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    fn lm78() -> ChipName {
        ChipName::new("lm78", BusId::new(BusType::ISA, 0), 0x290)
    }

    fn report(res: Result<(), Error>) -> (Outcome, String) {
        let mut err = Vec::new();
        let outcome = report_set_result(&mut err, &lm78(), res);
        (outcome, String::from_utf8(err).unwrap())
    }

    #[test]
    fn print_generic() {
        let root = TempDir::new().unwrap();
        add_hwmon(root.path(), "hwmon0", &[("name", "acpitz\n"), ("temp1_input", "27800\n")]);
        let context = Context::open(root.path(), "").unwrap();
        let chip = first_chip(&context);

        let (out, err) = print_to_strings(&chip, PrintOptions::default());
        assert_eq!(
            out,
            format!(
                "acpitz-virtual-0000\nAdapter: Virtual device\ntemp1:{}+27.8°C  \n\n",
                " ".repeat(8)
            )
        );
        assert!(err.is_empty());

        let options = PrintOptions {
            hide_adapter: true,
            fahrenheit: true,
            ..Default::default()
        };
        let (out, _) = print_to_strings(&chip, options);
        assert_eq!(out, format!("acpitz-virtual-0000\ntemp1:{}+82.0°F  \n\n", " ".repeat(8)));
    }

    #[test]
    fn print_raw_and_hidden() {
        let root = TempDir::new().unwrap();
        add_hwmon(
            root.path(),
            "hwmon0",
            &[("name", "acpitz\n"), ("temp1_input", "27800\n"), ("temp1_max", "90000\n")],
        );
        let context = Context::open(root.path(), "").unwrap();
        let chip = first_chip(&context);

        let options = PrintOptions {
            hide_adapter: true,
            raw: true,
            ..Default::default()
        };
        let (out, _) = print_to_strings(&chip, options);
        assert_eq!(
            out,
            "acpitz-virtual-0000\ntemp1:\n  temp1_input: 27.800\n  temp1_max: 90.000\n\n"
        );

        fs::write(root.path().join("class/hwmon/hwmon0/temp1_max"), "bogus\n").unwrap();
        let options = PrintOptions {
            hide_adapter: true,
            raw: true,
            ..Default::default()
        };
        let (out, err) = print_to_strings(&chip, options);
        assert_eq!(out, "acpitz-virtual-0000\ntemp1:\n  temp1_input: 27.800\n\n");
        assert!(err.starts_with("ERROR: Can't get value of subfeature temp1_max: "));

        let options = PrintOptions {
            hide_unknown: true,
            ..Default::default()
        };
        assert_eq!(print_to_strings(&chip, options), (String::new(), String::new()));
    }

    #[test]
    fn print_unknown_adapter() {
        let root = TempDir::new().unwrap();
        let dir = add_hwmon(root.path(), "hwmon0", &[("name", "lm75\n")]);
        let dev = root.path().join("devices/i2c/3-0048");
        fs::create_dir_all(&dev).unwrap();
        fs::create_dir_all(root.path().join("bus/i2c")).unwrap();
        symlink(root.path().join("bus/i2c"), dev.join("subsystem")).unwrap();
        symlink(&dev, dir.join("device")).unwrap();

        let context = Context::open(root.path(), "").unwrap();
        let chip = first_chip(&context);

        let (out, err) = print_to_strings(&chip, PrintOptions::default());
        assert_eq!(out, "lm75-i2c-3-48\n\n");
        assert_eq!(err, "Can't get adapter name for bus 3\n");
    }

    #[test]
    fn set_errors() {
        assert_eq!(report(Ok(())), (Outcome::Done, String::new()));

        let (outcome, msg) = report(Err(Error::SetFailed(2)));
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(msg, "lm78-isa-0290: At least one \"set\" statement failed\n");

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let (outcome, msg) = report(Err(Error::Access(denied)));
        assert_eq!(outcome, Outcome::Failed);
        assert!(msg.starts_with("lm78-isa-0290: Can't access sysfs file ("));
        assert!(msg.ends_with(" for writing;\nRun as root?\n"));

        let (outcome, msg) = report(Err(Error::NotWritable(String::from("in0_min"))));
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(msg, "lm78-isa-0290: Subfeature in0_min not writable\n");
    }

    #[test]
    fn set_failure_is_isolated() {
        let root = TempDir::new().unwrap();
        add_hwmon(root.path(), "hwmon0", &[("name", "acpitz\n"), ("temp1_max", "80000\n")]);
        let other = add_hwmon(root.path(), "hwmon1", &[("name", "other\n"), ("temp1_max", "80000\n")]);

        let config = r#"
chip "acpitz-*"
    set temp9_max 10

chip "other-*"
    set temp1_max 50
"#;
        let context = Context::open(root.path(), config).unwrap();
        let patterns = parse_patterns::<&str>(&[]).unwrap();

        let mut err = Vec::new();
        let summary = dispatch(context.detected_chips().unwrap(), &patterns, |chip| {
            do_a_set(&mut err, &context, chip)
        });

        assert_eq!(summary, Summary { handled: 2, failed: true });
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "acpitz-virtual-0000: At least one \"set\" statement failed\n"
        );
        assert_eq!(fs::read_to_string(other.join("temp1_max")).unwrap(), "50000");
    }
}
