// SPDX-FileCopyrightText: 2018 Camille019
// SPDX-License-Identifier: MPL-2.0

use std::collections::btree_map::{self, BTreeMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;
use std::vec;

use lazy_static::lazy_static;
use regex::Regex;

use crate::bus::{BusAdapter, BusId, BusType};
use crate::context::Context;
use crate::error::Error;
use crate::feature::{Feature, FeatureType};
use crate::name::ChipName;
use crate::subfeature::Subfeature;
use crate::sysfs;

pub struct FeatureIter<'a> {
    inner: btree_map::Values<'a, (FeatureType, u32), Feature>,
}

impl<'a> Iterator for FeatureIter<'a> {
    type Item = &'a Feature;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.by_ref().find(|feature| !feature.is_ignored())
    }
}

pub struct Chip {
    path: PathBuf,
    name: ChipName,
    adapters: Rc<Vec<BusAdapter>>,
    features: BTreeMap<(FeatureType, u32), Feature>,
}

impl Chip {
    /// Identity of the chip, its `Display` output is the chip name.
    pub fn name(&self) -> &ChipName {
        &self.name
    }

    /// Return the sysfs directory path of the chip.
    pub fn path(&self) -> &Path {
        self.path.as_ref()
    }

    pub fn bus(&self) -> &BusId {
        self.name.bus()
    }

    /// Human readable name of the adapter the chip is attached to.
    ///
    /// `None` when the adapter of an I2C bus is unknown.
    pub fn adapter_name(&self) -> Option<String> {
        self.name.bus().adapter_name(&self.adapters)
    }

    /// Return the feature of the given type, if it exists and is not
    /// ignored, `None` otherwise.
    pub fn feature(&self, ftype: FeatureType, number: u32) -> Option<&Feature> {
        self.features
            .get(&(ftype, number))
            .filter(|feature| !feature.is_ignored())
    }

    /// An iterator visiting all features not ignored by the configuration,
    /// voltages first then fans, temperatures and the other kinds, each by
    /// increasing number.
    pub fn features_iter(&self) -> FeatureIter {
        FeatureIter {
            inner: self.features.values(),
        }
    }

    /// Find a subfeature by its sysfs name, such as `temp1_max`. Ignored
    /// features are searched too.
    pub fn subfeature_by_name(&self, name: &str) -> Option<&Subfeature> {
        self.features
            .values()
            .flat_map(Feature::subfeatures_iter)
            .find(|sf| sf.name() == name)
    }

    fn from_path(hwmon_path: &Path, dev_path: Option<&Path>, context: &Context) -> Result<Chip, Error> {
        let prefix = sysfs::sysfs_read_attr(hwmon_path, "name")?;

        // Find bus type
        let (bus, address) = match dev_path {
            Some(dev_path) => {
                let dev_name = sysfs::sysfs_link_name(dev_path)?;
                let subsys = sysfs::sysfs_link_name(dev_path.join("subsystem").as_ref())?;
                get_chip_bus_from_name(&subsys, &dev_name, context.sysfs_root())?
            }
            // No device link, treat as virtual
            None => (BusId::new(BusType::Virtual, 0), 0),
        };

        let mut chip = Chip {
            path: hwmon_path.to_owned(),
            name: ChipName::new(prefix, bus, address),
            adapters: context.adapters(),
            features: Default::default(),
        };

        chip.read_dynamic_chip()?;
        context.apply_chip_config(&mut chip);

        Ok(chip)
    }

    fn read_dynamic_chip(&mut self) -> Result<(), Error> {
        for entry in self
            .path
            .read_dir()?
            .filter_map(|x| x.ok())
            .filter(|entry| {
                entry
                    .file_type()
                    .map(|ftype| ftype.is_file())
                    .unwrap_or(false)
            })
        {
            let path = entry.path();

            match Subfeature::from_path(&path) {
                Ok((feature_number, subfeature)) => {
                    let feature_type = subfeature.feature_type();
                    let feature_path = self.path.as_ref();

                    self.features
                        .entry((feature_type, feature_number))
                        .or_insert_with(|| Feature::new(feature_path, feature_type, feature_number))
                        .push_subfeature(subfeature)?;
                }
                Err(_) => log::debug!("Skip file {:?}", &path),
            }
        }

        Ok(())
    }

    pub(crate) fn features_mut(&mut self) -> btree_map::ValuesMut<(FeatureType, u32), Feature> {
        self.features.values_mut()
    }

    pub(crate) fn ignore_feature(&mut self, name: &str) -> bool {
        match self.features.values_mut().find(|feature| feature.name() == name) {
            Some(feature) => {
                feature.set_ignored();
                true
            }
            None => false,
        }
    }
}

impl AsRef<ChipName> for Chip {
    fn as_ref(&self) -> &ChipName {
        &self.name
    }
}

fn get_chip_bus_from_name(
    subsystem: &str,
    device_name: &str,
    sysfs_root: &Path,
) -> Result<(BusId, u32), Error> {
    lazy_static! {
        static ref RE_I2C: Regex = Regex::new(r"^([[:digit:]]+)\-([[:xdigit:]]+)").unwrap();
        static ref RE_SPI: Regex = Regex::new(r"^spi([[:digit:]]+)\.([[:digit:]]+)").unwrap();
        static ref RE_PCI: Regex =
            Regex::new(r"^([[:xdigit:]]+):([[:xdigit:]]+):([[:xdigit:]]+)\.([[:xdigit:]]+)")
                .unwrap();
    }

    let res = match subsystem {
        "i2c" => {
            let caps = RE_I2C
                .captures(device_name)
                .ok_or(Error::ParseBusInfo(BusType::I2C))?;

            let bus_number = i16::from_str(&caps[1])?;
            let address = u32::from_str_radix(&caps[2], 16)?;

            // find out if legacy ISA or not
            let adapter_attr = format!("class/i2c-adapter/i2c-{}/device/name", bus_number);
            let is_isa = bus_number == 9191
                || sysfs::sysfs_read_file(sysfs_root.join(adapter_attr).as_ref())
                    .map(|name| name == "ISA")
                    .unwrap_or(false);

            if is_isa {
                (BusId::new(BusType::ISA, 0), address)
            } else {
                (BusId::new(BusType::I2C, bus_number), address)
            }
        }
        "spi" => {
            let caps = RE_SPI
                .captures(device_name)
                .ok_or(Error::ParseBusInfo(BusType::SPI))?;

            let bus_number = i16::from_str(&caps[1])?;
            let address = u32::from_str(&caps[2])?;
            (BusId::new(BusType::SPI, bus_number), address)
        }
        "pci" => {
            let caps = RE_PCI
                .captures(device_name)
                .ok_or(Error::ParseBusInfo(BusType::PCI))?;

            let domain = u32::from_str_radix(&caps[1], 16)?;
            let bus = u32::from_str_radix(&caps[2], 16)?;
            let slot = u32::from_str_radix(&caps[3], 16)?;
            let func = u32::from_str_radix(&caps[4], 16)?;

            // Domains above 0xffff do not fit, keep the low bits
            if domain > 0xffff {
                log::warn!("{}: PCI domain {:#x} truncated", device_name, domain);
            }
            let address = ((domain & 0xffff) << 16) + (bus << 8) + (slot << 3) + func;
            (BusId::new(BusType::PCI, 0), address)
        }
        "platform" | "of_platform" => (BusId::new(BusType::ISA, 0), 0),
        "acpi" => (BusId::new(BusType::ACPI, 0), 0),
        "hid" => (BusId::new(BusType::HID, 0), 0),
        "mdio_bus" => (BusId::new(BusType::MDIO, 0), 0),
        _ => return Err(Error::UnknownDevice(subsystem.to_string())),
    };

    Ok(res)
}

/// Lazy iterator over the chips of `<sysfs>/class/hwmon`.
///
/// Chips are read from sysfs only when the iterator is advanced. Entries
/// which cannot be read are skipped.
pub struct ChipIter<'a> {
    context: &'a Context,
    entries: vec::IntoIter<PathBuf>,
}

impl<'a> ChipIter<'a> {
    pub(crate) fn new(context: &'a Context) -> Result<ChipIter<'a>, Error> {
        let hwmon_path = context.sysfs_root().join("class/hwmon");

        let mut entries = Vec::new();
        if hwmon_path.is_dir() {
            for entry in std::fs::read_dir(&hwmon_path)? {
                entries.push(entry?.path());
            }
        } else {
            log::debug!("No hwmon class directory at {:?}", hwmon_path);
        }

        // hwmon2 before hwmon10
        entries.sort_by(|a, b| {
            let a = a.file_name().unwrap_or_default();
            let b = b.file_name().unwrap_or_default();
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        });

        Ok(ChipIter {
            context,
            entries: entries.into_iter(),
        })
    }

    fn read_chip(&self, path: &Path) -> Result<Chip, Error> {
        let link_path = path.join("device");

        if link_path.read_link().is_ok() {
            // The attributes we want might be those of the hwmon class
            // device, or those of the device itself.
            match Chip::from_path(path, Some(link_path.as_path()), self.context) {
                Ok(chip) => Ok(chip),
                Err(e) => {
                    log::debug!("{:?}: {}", path, e);
                    Chip::from_path(&link_path, Some(link_path.as_path()), self.context)
                }
            }
        } else {
            log::debug!("{:?} has no device link", link_path);
            Chip::from_path(path, None, self.context)
        }
    }
}

impl<'a> Iterator for ChipIter<'a> {
    type Item = Chip;

    fn next(&mut self) -> Option<Chip> {
        while let Some(path) = self.entries.next() {
            match self.read_chip(&path) {
                Ok(chip) => {
                    log::debug!("Found chip '{}'", chip.name());
                    return Some(chip);
                }
                Err(e) => log::warn!("Skip {:?}: {}", path, e),
            }
        }

        None
    }
}
