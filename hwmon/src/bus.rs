// SPDX-FileCopyrightText: 2018 Camille019
// SPDX-License-Identifier: MPL-2.0

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Error;
use crate::sysfs;

#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BusType {
    I2C,
    ISA,
    PCI,
    SPI,
    Virtual,
    ACPI,
    HID,
    MDIO,
}

impl BusType {
    /// Name of the bus when it is neither ISA, PCI nor I2C.
    ///
    /// Chips on such buses are shown as `<prefix>-<bus name>-<address>`.
    pub fn dummy_name(self) -> Option<&'static str> {
        match self {
            BusType::I2C | BusType::ISA | BusType::PCI => None,
            BusType::SPI => Some("spi"),
            BusType::Virtual => Some("virtual"),
            BusType::ACPI => Some("acpi"),
            BusType::HID => Some("hid"),
            BusType::MDIO => Some("mdio"),
        }
    }
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BusType::I2C => f.write_str("i2c"),
            BusType::ISA => f.write_str("isa"),
            BusType::PCI => f.write_str("pci"),
            other => f.write_str(other.dummy_name().unwrap_or_default()),
        }
    }
}

/// Bus a chip is attached to. The number only tells I2C buses apart and
/// is 0 for every other kind.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct BusId {
    bus_type: BusType,
    bus_number: i16,
}

impl BusId {
    pub fn new(bus_type: BusType, bus_number: i16) -> BusId {
        BusId {
            bus_type,
            bus_number,
        }
    }

    pub fn get_type(&self) -> BusType {
        self.bus_type
    }

    pub fn number(&self) -> i16 {
        self.bus_number
    }

    pub(crate) fn adapter_name(&self, adapters: &[BusAdapter]) -> Option<String> {
        let name = match self.bus_type {
            BusType::ISA => "ISA adapter",
            BusType::PCI => "PCI adapter",
            // SPI should not be here, but for now SPI adapters have no name
            // so we don't have any custom string to return.
            BusType::SPI => "SPI adapter",
            BusType::Virtual => "Virtual device",
            BusType::ACPI => "ACPI interface",
            // HID should probably not be there either, but I don't know if
            // HID buses have a name nor where to find it.
            BusType::HID => "HID adapter",
            BusType::MDIO => "MDIO adapter",
            // Bus types with several instances
            BusType::I2C => {
                return adapters
                    .iter()
                    .find(|adapter| {
                        adapter.get_type() == self.bus_type && adapter.number() == self.bus_number
                    })
                    .map(|adapter| adapter.name().to_string());
            }
        };

        Some(name.to_string())
    }
}

#[derive(Clone, Debug)]
pub(crate) struct BusAdapter {
    name: String,
    bus_type: BusType,
    bus_number: i16,
}

impl BusAdapter {
    fn from_path(path: &Path) -> Result<Option<BusAdapter>, Error> {
        lazy_static! {
            static ref RE_I2C: Regex = Regex::new(r"^i2c\-([[:digit:]]+)$").unwrap();
        }

        let classdev = match path.file_name().and_then(|s| s.to_str()) {
            Some(classdev) => classdev,
            None => return Ok(None),
        };

        // i2c client devices ("0-0048") live next to adapters in bus/i2c/devices
        let caps = match RE_I2C.captures(classdev) {
            Some(caps) => caps,
            None => return Ok(None),
        };

        let bus_number = i16::from_str(&caps[1])?;

        if bus_number == 9191 {
            return Ok(None); // legacy ISA
        }

        // Get the adapter name from the classdev "name" attribute
        // (Linux 2.6.20 and later). If it fails, fall back to
        // the device "name" attribute (for older kernels).
        let name = sysfs::sysfs_read_attr(path, "name")
            .or_else(|_| sysfs::sysfs_read_attr(path, "device/name"))?;

        Ok(Some(BusAdapter {
            name,
            bus_type: BusType::I2C,
            bus_number,
        }))
    }

    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    pub fn get_type(&self) -> BusType {
        self.bus_type
    }

    pub fn number(&self) -> i16 {
        self.bus_number
    }
}

pub(crate) fn read_sysfs_busses(sysfs_root: &Path) -> Result<Vec<BusAdapter>, Error> {
    let mut adapter_path = sysfs_root.join("class/i2c-adapter");
    if !adapter_path.is_dir() {
        adapter_path = sysfs_root.join("bus/i2c/devices");
    }

    let mut res = Vec::new();

    // No i2c support at all
    if !adapter_path.is_dir() {
        log::debug!("No i2c adapter directory under {:?}", sysfs_root);
        return Ok(res);
    }

    for entry in std::fs::read_dir(adapter_path)? {
        let path = entry?.path();

        if let Some(adapter) = BusAdapter::from_path(path.as_ref())? {
            log::debug!("Found i2c-{} adapter '{}'", adapter.number(), adapter.name());
            res.push(adapter);
        }
    }

    Ok(res)
}
