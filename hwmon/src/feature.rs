// SPDX-FileCopyrightText: 2018 Camille019
// SPDX-License-Identifier: MPL-2.0

use std::io;
use std::path::{Path, PathBuf};
use std::slice;

use crate::error::Error;
use crate::subfeature::{Subfeature, SubfeatureType};
use crate::sysfs;

/// Feature kinds, in display order.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum FeatureType {
    Voltage,
    Fan,
    Temperature,
    Power,
    Energy,
    Current,
    Humidity,
    Cpu,
    Intrusion,
    BeepEnable,
}

impl From<SubfeatureType> for FeatureType {
    fn from(sf_type: SubfeatureType) -> FeatureType {
        match sf_type {
            SubfeatureType::Fan(_) => FeatureType::Fan,
            SubfeatureType::Temperature(_) => FeatureType::Temperature,
            SubfeatureType::Voltage(_) => FeatureType::Voltage,
            SubfeatureType::Current(_) => FeatureType::Current,
            SubfeatureType::Power(_) => FeatureType::Power,
            SubfeatureType::Energy(_) => FeatureType::Energy,
            SubfeatureType::Humidity(_) => FeatureType::Humidity,
            SubfeatureType::Cpu => FeatureType::Cpu,
            SubfeatureType::Intrusion(_) => FeatureType::Intrusion,
            SubfeatureType::BeepEnable => FeatureType::BeepEnable,
        }
    }
}

pub struct SubfeatureIter<'a> {
    inner: slice::Iter<'a, Subfeature>,
}

impl<'a> Iterator for SubfeatureIter<'a> {
    type Item = &'a Subfeature;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

#[derive(Debug)]
pub struct Feature {
    dir: PathBuf,
    name: String,
    number: u32,
    feature_type: FeatureType,
    label: Option<String>,
    ignored: bool,
    subfeatures: Vec<Subfeature>,
}

impl Feature {
    /// Feature name
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    /// Feature number
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Get the feature type
    pub fn get_type(&self) -> FeatureType {
        self.feature_type
    }

    /// Look up the label of the feature in config files or in sysfs.
    /// If no label exists for this feature, its name is returned itself.
    pub fn label(&self) -> String {
        if let Some(ref label) = self.label {
            return label.clone();
        }

        self.read_sysfs_label()
            .unwrap_or_else(|_| self.name.to_owned())
    }

    /// Return the subfeature of the given type, if it exists, `None` otherwise.
    pub fn subfeature(&self, subfeature_type: SubfeatureType) -> Option<&Subfeature> {
        self.subfeatures
            .iter()
            .find(|subfeature| subfeature.get_type() == subfeature_type)
    }

    /// An iterator visiting all subfeatures sorted by name.
    pub fn subfeatures_iter(&self) -> SubfeatureIter {
        SubfeatureIter {
            inner: self.subfeatures.iter(),
        }
    }

    pub(crate) fn new(dir: &Path, feature_type: FeatureType, number: u32) -> Feature {
        let name = match feature_type {
            FeatureType::Voltage => format!("in{}", number),
            FeatureType::Fan => format!("fan{}", number),
            FeatureType::Temperature => format!("temp{}", number),
            FeatureType::Power => format!("power{}", number),
            FeatureType::Energy => format!("energy{}", number),
            FeatureType::Current => format!("curr{}", number),
            FeatureType::Humidity => format!("humidity{}", number),
            FeatureType::Cpu => format!("cpu{}_vid", number),
            FeatureType::Intrusion => format!("intrusion{}", number),
            FeatureType::BeepEnable => String::from("beep_enable"),
        };

        Feature {
            dir: dir.to_owned(),
            name,
            number,
            feature_type,
            label: None,
            ignored: false,
            subfeatures: Default::default(),
        }
    }

    pub(crate) fn push_subfeature(&mut self, subfeature: Subfeature) -> Result<(), Error> {
        if subfeature.feature_type() != self.feature_type {
            return Err(Error::FeatureType);
        }

        log::debug!(
            "Add subfeature '{}' to feature '{}'",
            subfeature.name(),
            self.name()
        );
        let idx = self
            .subfeatures
            .partition_point(|sf| sf.name() < subfeature.name());
        self.subfeatures.insert(idx, subfeature);
        Ok(())
    }

    pub(crate) fn subfeatures_mut(&mut self) -> slice::IterMut<Subfeature> {
        self.subfeatures.iter_mut()
    }

    pub(crate) fn set_label(&mut self, label: &str) {
        self.label = Some(label.to_string());
    }

    /// Whether an `ignore` statement hides the feature.
    pub(crate) fn is_ignored(&self) -> bool {
        self.ignored
    }

    pub(crate) fn set_ignored(&mut self) {
        self.ignored = true;
    }

    fn read_sysfs_label(&self) -> io::Result<String> {
        let attr = format!("{}_label", self.name);
        sysfs::sysfs_read_attr(self.dir.as_ref(), attr.as_ref())
    }
}
