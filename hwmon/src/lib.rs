// SPDX-FileCopyrightText: 2018 Camille019
// SPDX-License-Identifier: MPL-2.0

#![forbid(unsafe_code)]

mod bus;
mod chip;
mod context;
mod error;
mod feature;
mod name;
mod parser;
pub mod subfeature;
mod sysfs;

pub use crate::bus::{BusId, BusType};
pub use crate::chip::{Chip, ChipIter, FeatureIter};
pub use crate::context::Context;
pub use crate::error::Error;
pub use crate::feature::{Feature, FeatureType, SubfeatureIter};
pub use crate::name::{BusPattern, ChipName, ChipPattern, Wildcard};
pub use crate::subfeature::{Subfeature, SubfeatureType};

/// Version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
