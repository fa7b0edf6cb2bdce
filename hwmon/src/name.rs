// SPDX-FileCopyrightText: 2018 Camille019
// SPDX-License-Identifier: MPL-2.0

//! Chip identities and the wildcard patterns used to select them.
//!
//! A [`ChipName`] is the concrete identity of a detected chip. Its
//! `Display` output is also valid [`ChipPattern`] syntax, so a name shown
//! to the user can be typed back on the command line or in a `chip`
//! block of the configuration file.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use crate::bus::{BusId, BusType};
use crate::error::Error;

/// Concrete identity of a detected chip.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ChipName {
    prefix: String,
    bus: BusId,
    address: u32,
}

impl ChipName {
    pub fn new<S: Into<String>>(prefix: S, bus: BusId, address: u32) -> ChipName {
        ChipName {
            prefix: prefix.into(),
            bus,
            address,
        }
    }

    /// Chip prefix, the name of the driver.
    pub fn prefix(&self) -> &str {
        self.prefix.as_ref()
    }

    pub fn bus(&self) -> &BusId {
        &self.bus
    }

    /// The chip address on the bus.
    pub fn address(&self) -> u32 {
        self.address
    }
}

impl AsRef<ChipName> for ChipName {
    fn as_ref(&self) -> &ChipName {
        self
    }
}

impl fmt::Display for ChipName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.bus.get_type() {
            BusType::ISA => write!(f, "{}-isa-{:04x}", self.prefix, self.address),
            BusType::PCI => write!(f, "{}-pci-{:04x}", self.prefix, self.address),
            BusType::I2C => write!(
                f,
                "{}-i2c-{}-{:02x}",
                self.prefix,
                self.bus.number(),
                self.address
            ),
            other => write!(
                f,
                "{}-{}-{:04x}",
                self.prefix,
                other.dummy_name().unwrap_or_default(),
                self.address
            ),
        }
    }
}

/// A pattern field: either any value or exactly one.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Wildcard<T> {
    Any,
    Exact(T),
}

impl<T> Wildcard<T> {
    pub fn is_any(&self) -> bool {
        matches!(self, Wildcard::Any)
    }

    /// Whether `value` satisfies this field. Exact values compare by
    /// equality only.
    pub fn accepts<U>(&self, value: &U) -> bool
    where
        T: Borrow<U>,
        U: PartialEq + ?Sized,
    {
        match self {
            Wildcard::Any => true,
            Wildcard::Exact(expected) => expected.borrow() == value,
        }
    }
}

/// Bus part of a [`ChipPattern`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum BusPattern {
    Any,
    Isa,
    Pci,
    /// I2C bus, with an optional bus number.
    I2c(Wildcard<i16>),
    /// Any other bus, designated by its name (`virtual`, `acpi`, ...).
    Dummy(String),
}

impl BusPattern {
    fn accepts(&self, bus: &BusId) -> bool {
        match self {
            BusPattern::Any => true,
            BusPattern::Isa => bus.get_type() == BusType::ISA,
            BusPattern::Pci => bus.get_type() == BusType::PCI,
            BusPattern::I2c(number) => {
                bus.get_type() == BusType::I2C && number.accepts(&bus.number())
            }
            BusPattern::Dummy(name) => bus.get_type().dummy_name() == Some(name.as_str()),
        }
    }
}

/// A chip name where each field may be a wildcard.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ChipPattern {
    prefix: Wildcard<String>,
    bus: BusPattern,
    address: Wildcard<u32>,
}

impl ChipPattern {
    pub fn new(prefix: Wildcard<String>, bus: BusPattern, address: Wildcard<u32>) -> ChipPattern {
        ChipPattern {
            prefix,
            bus,
            address,
        }
    }

    /// The pattern selecting every chip.
    pub fn any() -> ChipPattern {
        ChipPattern::new(Wildcard::Any, BusPattern::Any, Wildcard::Any)
    }

    pub fn prefix(&self) -> &Wildcard<String> {
        &self.prefix
    }

    pub fn bus(&self) -> &BusPattern {
        &self.bus
    }

    pub fn address(&self) -> &Wildcard<u32> {
        &self.address
    }

    /// Whether `chip` satisfies every field of the pattern.
    pub fn matches(&self, chip: &ChipName) -> bool {
        self.prefix.accepts(chip.prefix())
            && self.bus.accepts(chip.bus())
            && self.address.accepts(&chip.address())
    }
}

impl Default for ChipPattern {
    fn default() -> ChipPattern {
        ChipPattern::any()
    }
}

fn parse_field<T, F>(field: &str, parse: F) -> Option<Wildcard<T>>
where
    F: FnOnce(&str) -> Option<T>,
{
    match field {
        "*" => Some(Wildcard::Any),
        "" => None,
        _ => parse(field).map(Wildcard::Exact),
    }
}

fn parse_address(field: &str) -> Option<Wildcard<u32>> {
    parse_field(field, |s| u32::from_str_radix(s, 16).ok())
}

fn parse_bus_number(field: &str) -> Option<Wildcard<i16>> {
    parse_field(field, |s| {
        if s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse::<i16>().ok()
        } else {
            None
        }
    })
}

impl FromStr for ChipPattern {
    type Err = Error;

    /// Accepted forms, where any field may be `*`:
    ///
    /// * `lm78` and `lm78-*`
    /// * `lm78-isa-0290`, `lm78-pci-0100`
    /// * `lm78-i2c-0-2d`
    /// * `acpitz-virtual-0000`, for any other bus name
    fn from_str(name: &str) -> Result<ChipPattern, Error> {
        let invalid = || Error::ParseChipName(name.to_string());

        let (prefix, rest) = match name.split_once('-') {
            Some((prefix, rest)) => (prefix, Some(rest)),
            None => (name, None),
        };

        let prefix = parse_field(prefix, |s| Some(s.to_string())).ok_or_else(invalid)?;

        let rest = match rest {
            None | Some("*") => {
                return Ok(ChipPattern::new(prefix, BusPattern::Any, Wildcard::Any));
            }
            Some(rest) => rest,
        };

        let (bus, rest) = rest.split_once('-').ok_or_else(invalid)?;
        let (bus, address) = match bus {
            "isa" => (BusPattern::Isa, rest),
            "pci" => (BusPattern::Pci, rest),
            "i2c" => {
                let (number, address) = rest.split_once('-').ok_or_else(invalid)?;
                (BusPattern::I2c(parse_bus_number(number).ok_or_else(invalid)?), address)
            }
            "" | "*" => return Err(invalid()),
            _ => {
                // Bus names may contain dashes, the address is the last field
                let (tail, address) = match rest.rsplit_once('-') {
                    Some((tail, address)) => (Some(tail), address),
                    None => (None, rest),
                };
                let bus_name = match tail {
                    Some(tail) => format!("{}-{}", bus, tail),
                    None => bus.to_string(),
                };
                (BusPattern::Dummy(bus_name), address)
            }
        };

        let address = parse_address(address).ok_or_else(invalid)?;

        Ok(ChipPattern::new(prefix, bus, address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isa(prefix: &str, address: u32) -> ChipName {
        ChipName::new(prefix, BusId::new(BusType::ISA, 0), address)
    }

    fn i2c(prefix: &str, bus: i16, address: u32) -> ChipName {
        ChipName::new(prefix, BusId::new(BusType::I2C, bus), address)
    }

    fn detected() -> Vec<ChipName> {
        vec![
            isa("lm78", 0x2d),
            i2c("lm75", 0, 0x48),
            i2c("lm75", 1, 0x49),
            ChipName::new("nvme", BusId::new(BusType::PCI, 0), 0x0100),
            ChipName::new("acpitz", BusId::new(BusType::Virtual, 0), 0),
            ChipName::new("k10temp", BusId::new(BusType::ACPI, 0), 0x18),
        ]
    }

    #[test]
    fn format_isa() {
        assert_eq!(isa("lm78", 0x2d).to_string(), "lm78-isa-002d");
    }

    #[test]
    fn format_i2c() {
        assert_eq!(i2c("lm75", 0, 0x48).to_string(), "lm75-i2c-0-48");
        assert_eq!(i2c("w83781d", 12, 0x2d).to_string(), "w83781d-i2c-12-2d");
    }

    #[test]
    fn format_pci_and_dummy() {
        let pci = ChipName::new("nvme", BusId::new(BusType::PCI, 0), 0x0100);
        assert_eq!(pci.to_string(), "nvme-pci-0100");

        let virt = ChipName::new("acpitz", BusId::new(BusType::Virtual, 0), 0);
        assert_eq!(virt.to_string(), "acpitz-virtual-0000");

        let acpi = ChipName::new("k10temp", BusId::new(BusType::ACPI, 0), 0x18);
        assert_eq!(acpi.to_string(), "k10temp-acpi-0018");
    }

    #[test]
    fn any_matches_everything() {
        let any = ChipPattern::any();
        for chip in detected() {
            assert!(any.matches(&chip), "{}", chip);
        }
        assert!("*".parse::<ChipPattern>().unwrap().matches(&isa("foo", 1)));
    }

    #[test]
    fn single_field_mismatch() {
        let chip = i2c("lm75", 0, 0x48);

        let prefix = ChipPattern::new(
            Wildcard::Exact("lm78".to_string()),
            BusPattern::Any,
            Wildcard::Any,
        );
        assert!(!prefix.matches(&chip));

        let bus = ChipPattern::new(Wildcard::Any, BusPattern::Isa, Wildcard::Any);
        assert!(!bus.matches(&chip));

        let number = ChipPattern::new(
            Wildcard::Any,
            BusPattern::I2c(Wildcard::Exact(1)),
            Wildcard::Any,
        );
        assert!(!number.matches(&chip));

        let address = ChipPattern::new(Wildcard::Any, BusPattern::Any, Wildcard::Exact(0x49));
        assert!(!address.matches(&chip));

        let all = ChipPattern::new(
            Wildcard::Exact("lm75".to_string()),
            BusPattern::I2c(Wildcard::Exact(0)),
            Wildcard::Exact(0x48),
        );
        assert!(all.matches(&chip));
    }

    #[test]
    fn prefix_is_never_matched_partially() {
        let pattern: ChipPattern = "lm7-*".parse().unwrap();
        assert!(!pattern.matches(&isa("lm78", 0x2d)));

        let pattern: ChipPattern = "lm780-*".parse().unwrap();
        assert!(!pattern.matches(&isa("lm78", 0x2d)));
    }

    #[test]
    fn dummy_bus_names_match_exactly() {
        let virt = ChipName::new("acpitz", BusId::new(BusType::Virtual, 0), 0);

        assert!("acpitz-virtual-*".parse::<ChipPattern>().unwrap().matches(&virt));
        assert!(!"acpitz-virt-*".parse::<ChipPattern>().unwrap().matches(&virt));
        assert!(!"acpitz-acpi-*".parse::<ChipPattern>().unwrap().matches(&virt));
    }

    #[test]
    fn parse_forms() {
        assert_eq!("lm78".parse::<ChipPattern>().unwrap(), ChipPattern::new(
            Wildcard::Exact("lm78".to_string()),
            BusPattern::Any,
            Wildcard::Any,
        ));
        assert_eq!("*-*".parse::<ChipPattern>().unwrap(), ChipPattern::any());
        assert_eq!("*-isa-0290".parse::<ChipPattern>().unwrap(), ChipPattern::new(
            Wildcard::Any,
            BusPattern::Isa,
            Wildcard::Exact(0x290),
        ));
        assert_eq!("lm78-i2c-*-2D".parse::<ChipPattern>().unwrap(), ChipPattern::new(
            Wildcard::Exact("lm78".to_string()),
            BusPattern::I2c(Wildcard::Any),
            Wildcard::Exact(0x2d),
        ));
        assert_eq!("lm78-i2c-0-*".parse::<ChipPattern>().unwrap(), ChipPattern::new(
            Wildcard::Exact("lm78".to_string()),
            BusPattern::I2c(Wildcard::Exact(0)),
            Wildcard::Any,
        ));
        assert_eq!("foo-my-bus-0001".parse::<ChipPattern>().unwrap(), ChipPattern::new(
            Wildcard::Exact("foo".to_string()),
            BusPattern::Dummy("my-bus".to_string()),
            Wildcard::Exact(1),
        ));
    }

    #[test]
    fn parse_errors() {
        for name in &[
            "",
            "-isa-0290",
            "lm78-",
            "lm78-isa",
            "lm78-isa-",
            "lm78-isa-zz",
            "lm78-i2c-0",
            "lm78-i2c-x-2d",
            "lm78-i2c-+1-2d",
            "lm78-*-2d",
        ] {
            assert!(name.parse::<ChipPattern>().is_err(), "{:?}", name);
        }
    }

    #[test]
    fn formatted_names_parse_back() {
        for chip in detected() {
            let pattern: ChipPattern = chip.to_string().parse().unwrap();
            assert!(pattern.matches(&chip), "{}", chip);
        }
    }
}
