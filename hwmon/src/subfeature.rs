// SPDX-FileCopyrightText: 2018 Camille019
// SPDX-License-Identifier: MPL-2.0

use std::os::linux::fs::MetadataExt;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Error;
use crate::feature::FeatureType;
use crate::parser::Compute;
use crate::sysfs;

#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Fan {
    Input,
    Min,
    Max,
    Div,
    Pulses,
    Target,
    // Alarms
    Alarm,
    Min_Alarm,
    Max_Alarm,
    Fault,
    Beep,
}

#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Temperature {
    Input,
    Min,
    Min_Hyst,
    Max,
    Max_Hyst,
    Crit_Min,
    Crit_Min_Hyst,
    Crit_Max,
    Crit_Max_Hyst,
    Emergency,
    Emergency_Hyst,
    Lowest,
    Highest,
    Type,
    Offset,
    // Alarms
    Alarm,
    Min_Alarm,
    Max_Alarm,
    Emergency_Alarm,
    Crit_Min_Alarm,
    Crit_Max_Alarm,
    Fault,
    Beep,
}

#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Voltage {
    Input,
    Min,
    Max,
    Crit_Min,
    Crit_Max,
    Average,
    Lowest,
    Highest,
    // Alarms
    Alarm,
    Min_Alarm,
    Max_Alarm,
    Crit_Min_Alarm,
    Crit_Max_Alarm,
    Beep,
}

/// Current subfeatures share the voltage layout.
pub type Current = Voltage;

#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Power {
    Average,
    Average_Lowest,
    Average_Highest,
    Input,
    Input_Lowest,
    Input_Highest,
    Cap,
    Cap_Min,
    Cap_Max,
    Cap_Hyst,
    Min,
    Max,
    Crit_Min,
    Crit_Max,
    Average_Interval,
    Accuracy,
    // Alarms
    Alarm,
    Cap_Alarm,
    Min_Alarm,
    Max_Alarm,
    Crit_Min_Alarm,
    Crit_Max_Alarm,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Energy {
    Input,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Humidity {
    Input,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Intrusion {
    Alarm,
    Beep,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SubfeatureType {
    Fan(Fan),
    Temperature(Temperature),
    Voltage(Voltage),
    Current(Current),
    Power(Power),
    Energy(Energy),
    Humidity(Humidity),
    Cpu,
    Intrusion(Intrusion),
    BeepEnable,
}

impl SubfeatureType {
    /// Whether the subfeature is an alarm, fault or beep flag.
    pub fn is_alarm(self) -> bool {
        match self {
            SubfeatureType::Fan(sft) => matches!(
                sft,
                Fan::Alarm | Fan::Min_Alarm | Fan::Max_Alarm | Fan::Fault | Fan::Beep
            ),
            SubfeatureType::Temperature(sft) => matches!(
                sft,
                Temperature::Alarm
                    | Temperature::Min_Alarm
                    | Temperature::Max_Alarm
                    | Temperature::Emergency_Alarm
                    | Temperature::Crit_Min_Alarm
                    | Temperature::Crit_Max_Alarm
                    | Temperature::Fault
                    | Temperature::Beep
            ),
            SubfeatureType::Voltage(sft) | SubfeatureType::Current(sft) => matches!(
                sft,
                Voltage::Alarm
                    | Voltage::Min_Alarm
                    | Voltage::Max_Alarm
                    | Voltage::Crit_Min_Alarm
                    | Voltage::Crit_Max_Alarm
                    | Voltage::Beep
            ),
            SubfeatureType::Power(sft) => matches!(
                sft,
                Power::Alarm
                    | Power::Cap_Alarm
                    | Power::Min_Alarm
                    | Power::Max_Alarm
                    | Power::Crit_Min_Alarm
                    | Power::Crit_Max_Alarm
            ),
            SubfeatureType::Intrusion(_) | SubfeatureType::BeepEnable => true,
            SubfeatureType::Energy(_) | SubfeatureType::Humidity(_) | SubfeatureType::Cpu => false,
        }
    }

    /// Whether `compute` statements of the configuration file apply to
    /// this subfeature.
    pub fn is_computable(self) -> bool {
        !self.is_alarm()
            && !matches!(
                self,
                SubfeatureType::Fan(Fan::Div)
                    | SubfeatureType::Fan(Fan::Pulses)
                    | SubfeatureType::Temperature(Temperature::Type)
                    | SubfeatureType::Power(Power::Average_Interval)
                    | SubfeatureType::Power(Power::Accuracy)
            )
    }

    fn scale(self) -> f64 {
        const SCALE_MILLI: f64 = 1000.0;
        const SCALE_MICRO: f64 = 1_000_000.0;

        if self.is_alarm() {
            return 1.0;
        }

        match self {
            SubfeatureType::Fan(_) => 1.0,
            SubfeatureType::Temperature(Temperature::Type) => 1.0,
            SubfeatureType::Power(Power::Average_Interval) => SCALE_MILLI,
            SubfeatureType::Power(Power::Accuracy) => 1.0,
            SubfeatureType::Power(_) | SubfeatureType::Energy(_) => SCALE_MICRO,
            _ => SCALE_MILLI,
        }
    }

    /// Resolve the `<suffix>` of a `<feature><n>_<suffix>` attribute.
    fn from_suffix(feature: &str, suffix: &str) -> Option<SubfeatureType> {
        use self::SubfeatureType as Sf;

        let sf_type = match (feature, suffix) {
            ("fan", "input") => Sf::Fan(Fan::Input),
            ("fan", "min") => Sf::Fan(Fan::Min),
            ("fan", "max") => Sf::Fan(Fan::Max),
            ("fan", "div") => Sf::Fan(Fan::Div),
            ("fan", "pulses") => Sf::Fan(Fan::Pulses),
            ("fan", "target") => Sf::Fan(Fan::Target),
            ("fan", "alarm") => Sf::Fan(Fan::Alarm),
            ("fan", "min_alarm") => Sf::Fan(Fan::Min_Alarm),
            ("fan", "max_alarm") => Sf::Fan(Fan::Max_Alarm),
            ("fan", "fault") => Sf::Fan(Fan::Fault),
            ("fan", "beep") => Sf::Fan(Fan::Beep),

            ("temp", "input") => Sf::Temperature(Temperature::Input),
            ("temp", "max") => Sf::Temperature(Temperature::Max),
            ("temp", "max_hyst") => Sf::Temperature(Temperature::Max_Hyst),
            ("temp", "min") => Sf::Temperature(Temperature::Min),
            ("temp", "min_hyst") => Sf::Temperature(Temperature::Min_Hyst),
            ("temp", "crit") => Sf::Temperature(Temperature::Crit_Max),
            ("temp", "crit_hyst") => Sf::Temperature(Temperature::Crit_Max_Hyst),
            ("temp", "lcrit") => Sf::Temperature(Temperature::Crit_Min),
            ("temp", "lcrit_hyst") => Sf::Temperature(Temperature::Crit_Min_Hyst),
            ("temp", "emergency") => Sf::Temperature(Temperature::Emergency),
            ("temp", "emergency_hyst") => Sf::Temperature(Temperature::Emergency_Hyst),
            ("temp", "lowest") => Sf::Temperature(Temperature::Lowest),
            ("temp", "highest") => Sf::Temperature(Temperature::Highest),
            ("temp", "alarm") => Sf::Temperature(Temperature::Alarm),
            ("temp", "min_alarm") => Sf::Temperature(Temperature::Min_Alarm),
            ("temp", "max_alarm") => Sf::Temperature(Temperature::Max_Alarm),
            ("temp", "crit_alarm") => Sf::Temperature(Temperature::Crit_Max_Alarm),
            ("temp", "emergency_alarm") => Sf::Temperature(Temperature::Emergency_Alarm),
            ("temp", "lcrit_alarm") => Sf::Temperature(Temperature::Crit_Min_Alarm),
            ("temp", "fault") => Sf::Temperature(Temperature::Fault),
            ("temp", "type") => Sf::Temperature(Temperature::Type),
            ("temp", "offset") => Sf::Temperature(Temperature::Offset),
            ("temp", "beep") => Sf::Temperature(Temperature::Beep),

            ("in", suffix) | ("curr", suffix) => {
                let sft = match suffix {
                    "input" => Voltage::Input,
                    "min" => Voltage::Min,
                    "max" => Voltage::Max,
                    "lcrit" => Voltage::Crit_Min,
                    "crit" => Voltage::Crit_Max,
                    "average" => Voltage::Average,
                    "lowest" => Voltage::Lowest,
                    "highest" => Voltage::Highest,
                    "alarm" => Voltage::Alarm,
                    "min_alarm" => Voltage::Min_Alarm,
                    "max_alarm" => Voltage::Max_Alarm,
                    "lcrit_alarm" => Voltage::Crit_Min_Alarm,
                    "crit_alarm" => Voltage::Crit_Max_Alarm,
                    "beep" => Voltage::Beep,
                    _ => return None,
                };
                if feature == "in" {
                    Sf::Voltage(sft)
                } else {
                    Sf::Current(sft)
                }
            }

            ("power", "average") => Sf::Power(Power::Average),
            ("power", "average_highest") => Sf::Power(Power::Average_Highest),
            ("power", "average_lowest") => Sf::Power(Power::Average_Lowest),
            ("power", "input") => Sf::Power(Power::Input),
            ("power", "input_highest") => Sf::Power(Power::Input_Highest),
            ("power", "input_lowest") => Sf::Power(Power::Input_Lowest),
            ("power", "accuracy") => Sf::Power(Power::Accuracy),
            ("power", "cap") => Sf::Power(Power::Cap),
            ("power", "cap_hyst") => Sf::Power(Power::Cap_Hyst),
            ("power", "cap_max") => Sf::Power(Power::Cap_Max),
            ("power", "cap_min") => Sf::Power(Power::Cap_Min),
            ("power", "cap_alarm") => Sf::Power(Power::Cap_Alarm),
            ("power", "alarm") => Sf::Power(Power::Alarm),
            ("power", "max") => Sf::Power(Power::Max),
            ("power", "min") => Sf::Power(Power::Min),
            ("power", "max_alarm") => Sf::Power(Power::Max_Alarm),
            ("power", "min_alarm") => Sf::Power(Power::Min_Alarm),
            ("power", "crit") => Sf::Power(Power::Crit_Max),
            ("power", "lcrit") => Sf::Power(Power::Crit_Min),
            ("power", "crit_alarm") => Sf::Power(Power::Crit_Max_Alarm),
            ("power", "lcrit_alarm") => Sf::Power(Power::Crit_Min_Alarm),
            ("power", "average_interval") => Sf::Power(Power::Average_Interval),

            ("energy", "input") => Sf::Energy(Energy::Input),
            ("humidity", "input") => Sf::Humidity(Humidity::Input),
            ("cpu", "vid") => Sf::Cpu,
            ("intrusion", "alarm") => Sf::Intrusion(Intrusion::Alarm),
            ("intrusion", "beep") => Sf::Intrusion(Intrusion::Beep),
            _ => return None,
        };

        Some(sf_type)
    }
}

#[derive(Clone, Debug)]
pub struct Subfeature {
    name: String,
    path: PathBuf,
    subfeature_type: SubfeatureType,
    compute: Option<Compute>,
    is_readable: bool,
    is_writable: bool,
}

impl Subfeature {
    /// Subfeature name
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    /// Return the sysfs file path
    pub fn path(&self) -> &Path {
        self.path.as_ref()
    }

    /// Get the subfeature type
    pub fn get_type(&self) -> SubfeatureType {
        self.subfeature_type
    }

    /// Return true if a compute statement of the configuration file
    /// applies to this subfeature.
    pub fn has_compute(&self) -> bool {
        self.compute.is_some()
    }

    /// Return true if the subfeature is readable
    pub fn is_readable(&self) -> bool {
        self.is_readable
    }

    /// Return true if the subfeature is writable
    pub fn is_writable(&self) -> bool {
        self.is_writable
    }

    /// Read the value of the subfeature, converted by the compute
    /// statement of the configuration file if any.
    pub fn read_value(&self) -> Result<f64, Error> {
        if !self.is_readable() {
            return Err(Error::NotReadable(self.name.clone()));
        }

        let value = self.read_sysfs_value()?;
        Ok(match self.compute {
            Some(ref compute) => compute.from_proc(value),
            None => value,
        })
    }

    /// Write the value of the subfeature, converted back by the compute
    /// statement of the configuration file if any.
    ///
    /// No checks are made on the value before writing it.
    /// See hwmon and device driver documentation for more informations.
    pub fn write_value(&self, value: f64) -> Result<(), Error> {
        if !self.is_writable() {
            return Err(Error::NotWritable(self.name.clone()));
        }

        let value = match self.compute {
            Some(ref compute) => compute.to_proc(value),
            None => value,
        };
        self.write_sysfs_value(value)
    }

    pub(crate) fn set_compute(&mut self, compute: &Compute) {
        if self.subfeature_type.is_computable() {
            self.compute = Some(compute.clone());
        }
    }

    /// Read the value from sysfs file and apply the proper type scaling.
    fn read_sysfs_value(&self) -> Result<f64, Error> {
        let raw = sysfs::sysfs_read_file(&self.path)?;
        Ok(raw.parse::<f64>()? / self.subfeature_type.scale())
    }

    /// Write the value to sysfs file. Before it apply the proper type scaling.
    fn write_sysfs_value(&self, value: f64) -> Result<(), Error> {
        let raw = (value * self.subfeature_type.scale()).round() as i64;
        log::debug!("Write {} to {:?}", raw, self.path);
        sysfs::sysfs_write_file(&self.path, &raw.to_string()).map_err(Error::from_write)
    }

    pub(crate) fn from_path<P: AsRef<Path>>(path: P) -> Result<(u32, Subfeature), Error> {
        let path = path.as_ref();

        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidSubfeature(path.display().to_string()))?;

        let (feature_number, subfeature_type) = Subfeature::properties_from_name(&name)?;

        let st_mode = path.metadata()?.st_mode();
        let is_readable = (st_mode & libc::S_IRUSR as u32) != 0;
        let is_writable = (st_mode & libc::S_IWUSR as u32) != 0;

        Ok((
            feature_number,
            Subfeature {
                name,
                path: path.to_path_buf(),
                subfeature_type,
                compute: None,
                is_readable,
                is_writable,
            },
        ))
    }

    fn properties_from_name(name: &str) -> Result<(u32, SubfeatureType), Error> {
        lazy_static! {
            static ref RE_SUBFEATURE: Regex = Regex::new(r"^(\D*)(\d+)_(.*)$").unwrap();
        }

        if name == "beep_enable" {
            return Ok((0, SubfeatureType::BeepEnable));
        }

        let caps = RE_SUBFEATURE
            .captures(name)
            .ok_or_else(|| Error::InvalidSubfeature(name.to_string()))?;
        let feature_number = caps[2].parse::<u32>()?;

        SubfeatureType::from_suffix(&caps[1], &caps[3])
            .map(|sf_type| (feature_number, sf_type))
            .ok_or_else(|| Error::UnknownSubfeature(name.to_string()))
    }

    /// Feature type a subfeature belongs to.
    pub fn feature_type(&self) -> FeatureType {
        FeatureType::from(self.subfeature_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use tempfile::TempDir;

    #[test]
    fn names_to_types() {
        assert_eq!(
            Subfeature::properties_from_name("temp2_crit_hyst").unwrap(),
            (2, SubfeatureType::Temperature(Temperature::Crit_Max_Hyst))
        );
        assert_eq!(
            Subfeature::properties_from_name("curr1_input").unwrap(),
            (1, SubfeatureType::Current(Voltage::Input))
        );
        assert_eq!(
            Subfeature::properties_from_name("beep_enable").unwrap(),
            (0, SubfeatureType::BeepEnable)
        );
        assert!(matches!(
            Subfeature::properties_from_name("temp1_label"),
            Err(Error::UnknownSubfeature(_))
        ));
        assert!(matches!(
            Subfeature::properties_from_name("name"),
            Err(Error::InvalidSubfeature(_))
        ));
    }

    #[test]
    fn read_and_write_scaled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("temp1_max");
        fs::write(&path, "75000\n").unwrap();

        let (number, sf) = Subfeature::from_path(&path).unwrap();
        assert_eq!(number, 1);
        assert_eq!(sf.read_value().unwrap(), 75.0);

        sf.write_value(-12.5).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "-12500");
    }

    #[test]
    fn read_only_attribute() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in0_input");
        fs::write(&path, "1200").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o444)).unwrap();

        let (_, sf) = Subfeature::from_path(&path).unwrap();
        assert!(!sf.is_writable());
        assert!(matches!(sf.write_value(1.0), Err(Error::NotWritable(_))));
        assert_eq!(sf.read_value().unwrap(), 1.2);
    }

    #[test]
    fn alarms_are_not_computed() {
        assert!(SubfeatureType::Voltage(Voltage::Min).is_computable());
        assert!(!SubfeatureType::Voltage(Voltage::Min_Alarm).is_computable());
        assert!(!SubfeatureType::Fan(Fan::Div).is_computable());
        assert!(SubfeatureType::BeepEnable.is_alarm());
    }
}
