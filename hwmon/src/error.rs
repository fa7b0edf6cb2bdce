// SPDX-FileCopyrightText: 2018 Camille019
// SPDX-License-Identifier: MPL-2.0

use std::error;
use std::fmt;
use std::io;
use std::num;

use crate::bus::BusType;

#[derive(Debug)]
pub enum Error {
    /// A sysfs attribute refused a write: permission denied or read-only
    /// file system.
    Access(io::Error),
    /// The configuration file could not be parsed or holds an invalid
    /// statement.
    Config(String),
    /// A subfeature does not belong to the feature it was pushed into.
    FeatureType,
    Io(io::Error),
    NotReadable(String),
    NotWritable(String),
    ParseBusInfo(BusType),
    ParseChipName(String),
    ParseFloat(num::ParseFloatError),
    ParseInt(num::ParseIntError),
    /// At least one `set` statement failed, the others were applied.
    SetFailed(usize),
    InvalidSubfeature(String),
    UnknownSubfeature(String),
    UnknownDevice(String),
}

impl Error {
    /// Build the error of a failed sysfs write, telling apart the cases
    /// where the caller simply lacks the privileges.
    pub(crate) fn from_write(err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::PermissionDenied
            || err.raw_os_error() == Some(libc::EROFS)
        {
            Error::Access(err)
        } else {
            Error::Io(err)
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Access(ref err) => Some(err),
            Error::Io(ref err) => Some(err),
            Error::ParseFloat(ref err) => Some(err),
            Error::ParseInt(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Access(ref err) => write!(f, "Can't access sysfs file ({})", err),
            Error::Config(ref err) => write!(f, "Config error: {}", err),
            Error::FeatureType => {
                write!(f, "The subfeature type does not match the feature type")
            }
            Error::Io(ref err) => write!(f, "IO error: {}", err),
            Error::NotReadable(ref name) => write!(f, "Subfeature {} not readable", name),
            Error::NotWritable(ref name) => write!(f, "Subfeature {} not writable", name),
            Error::ParseBusInfo(ref bus) => write!(f, "Failed to read {} bus info", bus),
            Error::ParseChipName(ref name) => write!(f, "Invalid chip name '{}'", name),
            Error::ParseFloat(ref err) => write!(f, "ParseFloat error: {}", err),
            Error::ParseInt(ref err) => write!(f, "ParseInt error: {}", err),
            Error::SetFailed(count) => write!(f, "{} set statement(s) failed", count),
            Error::InvalidSubfeature(ref name) => write!(f, "Invalid subfeature: {}", name),
            Error::UnknownSubfeature(ref name) => write!(f, "Unknown subfeature: {}", name),
            Error::UnknownDevice(ref subsys) => write!(f, "Unknown device subsystem '{}'", subsys),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<num::ParseFloatError> for Error {
    fn from(err: num::ParseFloatError) -> Error {
        Error::ParseFloat(err)
    }
}

impl From<num::ParseIntError> for Error {
    fn from(err: num::ParseIntError) -> Error {
        Error::ParseInt(err)
    }
}
