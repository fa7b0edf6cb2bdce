// SPDX-FileCopyrightText: 2018 Camille019
// SPDX-License-Identifier: MPL-2.0

use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::bus::{self, BusAdapter};
use crate::chip::{Chip, ChipIter};
use crate::error::Error;
use crate::name::{ChipName, ChipPattern};
use crate::parser::{self, CfgFile, StmtChip};
use crate::sysfs::SYSFS_MOUNT;

/// A `chip` block of the configuration file, with its patterns parsed.
struct ChipBlock {
    patterns: Vec<ChipPattern>,
    statements: StmtChip,
}

impl ChipBlock {
    fn matches(&self, name: &ChipName) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(name))
    }
}

/// Library state shared by the detected chips: where sysfs is mounted,
/// the known I2C adapters and the configuration file.
#[derive(Clone)]
pub struct Context {
    sysfs_root: PathBuf,
    adapters: Rc<Vec<BusAdapter>>,
    config: Rc<Vec<ChipBlock>>,
}

impl Context {
    /// Create a context on the system sysfs, using the given
    /// configuration file if any.
    pub fn new<'a, T: Into<Option<&'a Path>>>(config_file: T) -> Result<Context, Error> {
        let config = match config_file.into() {
            Some(path) => {
                log::debug!("Read configuration file {:?}", path);
                parser::parse_configuration_file(path)?
            }
            None => CfgFile::default(),
        };

        Context::with_config(Path::new(SYSFS_MOUNT), config)
    }

    /// Create a context on the system sysfs, reading the configuration
    /// from `reader` (such as the standard input).
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Context, Error> {
        let mut data = String::new();
        reader.read_to_string(&mut data)?;

        Context::open(SYSFS_MOUNT, &data)
    }

    /// Create a context on a sysfs tree mounted at `sysfs_root`, with the
    /// configuration given as a string.
    pub fn open<P: AsRef<Path>>(sysfs_root: P, config: &str) -> Result<Context, Error> {
        let config = parser::parse_configuration_str(config)?;

        Context::with_config(sysfs_root.as_ref(), config)
    }

    fn with_config(sysfs_root: &Path, config: CfgFile) -> Result<Context, Error> {
        let mut blocks = Vec::with_capacity(config.chips.len());
        for statements in config.chips {
            let patterns = statements
                .names
                .iter()
                .map(|name| name.parse::<ChipPattern>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| Error::Config(e.to_string()))?;

            blocks.push(ChipBlock {
                patterns,
                statements,
            });
        }

        let adapters = Rc::new(bus::read_sysfs_busses(sysfs_root)?);

        Ok(Context {
            sysfs_root: sysfs_root.to_owned(),
            adapters,
            config: Rc::new(blocks),
        })
    }

    /// Chips currently detected, read lazily one at a time.
    pub fn detected_chips(&self) -> Result<ChipIter, Error> {
        ChipIter::new(self)
    }

    /// Execute the `set` statements of the configuration file which apply
    /// to `chip`, in file order.
    ///
    /// All statements are tried even when some fail. A write refused for
    /// lack of privileges gives `Error::Access`, any other failure
    /// `Error::SetFailed` with the number of failed statements.
    pub fn do_chip_sets(&self, chip: &Chip) -> Result<(), Error> {
        let mut failed = 0;
        let mut access = None;

        for set in self.blocks_for(chip.name()).flat_map(|block| &block.statements.sets) {
            let res = chip
                .subfeature_by_name(&set.name)
                .ok_or_else(|| Error::UnknownSubfeature(set.name.clone()))
                .and_then(|sf| sf.write_value(set.value));

            match res {
                Ok(()) => log::debug!("{}: set {} = {}", chip.name(), set.name, set.value),
                Err(Error::Access(err)) => {
                    log::warn!("{}: set {}: {}", chip.name(), set.name, err);
                    failed += 1;
                    access = Some(err);
                }
                Err(err) => {
                    log::warn!("{}: set {}: {}", chip.name(), set.name, err);
                    failed += 1;
                }
            }
        }

        match access {
            Some(err) => Err(Error::Access(err)),
            None if failed > 0 => Err(Error::SetFailed(failed)),
            None => Ok(()),
        }
    }

    pub(crate) fn sysfs_root(&self) -> &Path {
        self.sysfs_root.as_ref()
    }

    pub(crate) fn adapters(&self) -> Rc<Vec<BusAdapter>> {
        Rc::clone(&self.adapters)
    }

    fn blocks_for<'a>(&'a self, name: &'a ChipName) -> impl Iterator<Item = &'a ChipBlock> + 'a {
        self.config.iter().filter(move |block| block.matches(name))
    }

    /// Apply `label`, `compute` and `ignore` statements to a freshly read
    /// chip. Later statements override earlier ones.
    pub(crate) fn apply_chip_config(&self, chip: &mut Chip) {
        let name = chip.name().clone();

        for block in self.blocks_for(&name) {
            let statements = &block.statements;

            for ignore in &statements.ignores {
                if chip.ignore_feature(&ignore.name) {
                    log::debug!("{}: ignore {}", name, ignore.name);
                }
            }

            for feature in chip.features_mut() {
                if let Some(label) = statements.labels.iter().rev().find(|l| l.name == feature.name()) {
                    feature.set_label(&label.value);
                }

                if let Some(compute) = statements
                    .computes
                    .iter()
                    .rev()
                    .find(|c| c.name == feature.name())
                {
                    for subfeature in feature.subfeatures_mut() {
                        subfeature.set_compute(&compute.compute);
                    }
                }
            }
        }
    }
}
