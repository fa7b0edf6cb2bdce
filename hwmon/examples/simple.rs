// SPDX-FileCopyrightText: NONE
// SPDX-License-Identifier: CC0-1.0

//! List the detected chips matching the pattern given as first argument
//! (all chips by default), with the raw value of every subfeature.

use hwmon::{ChipPattern, Context};

fn main() -> Result<(), hwmon::Error> {
    env_logger::init();

    let pattern = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<ChipPattern>()?,
        None => ChipPattern::any(),
    };

    let context = Context::new(None)?;

    for chip in context.detected_chips()?.filter(|chip| pattern.matches(chip.name())) {
        println!("{}", chip.name());
        match chip.adapter_name() {
            Some(name) => println!("Adapter: {}", name),
            None => eprintln!("Can't get adapter name for bus {}", chip.bus().number()),
        }

        for feature in chip.features_iter() {
            println!("  - {}", feature.label());
            for subfeature in feature.subfeatures_iter() {
                match subfeature.read_value() {
                    Ok(value) => println!("    - {} = {}", subfeature.name(), value),
                    Err(e) => println!("    - {}: {}", subfeature.name(), e),
                }
            }
        }
        println!();
    }

    Ok(())
}
