// SPDX-FileCopyrightText: 2018 Camille019
// SPDX-License-Identifier: MPL-2.0

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const SYSFS_MOUNT: &str = "/sys";

/// Read a sysfs attribute file, without its trailing newline.
pub fn sysfs_read_file(path: &Path) -> io::Result<String> {
    let mut buf = fs::read_to_string(path)?;
    let len = buf.trim_end().len();
    buf.truncate(len);

    Ok(buf)
}

pub fn sysfs_read_attr(path: &Path, attr: &str) -> io::Result<String> {
    sysfs_read_file(path.join(attr).as_ref())
}

/// Write a value to an existing sysfs attribute file. Attributes are
/// never created.
pub fn sysfs_write_file(path: &Path, value: &str) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .read(false)
        .write(true)
        .truncate(true)
        .create(false)
        .open(path)?;
    file.write_all(value.as_bytes())
}

/// Final component of the target of a symlink, such as the device name
/// behind `hwmonN/device`.
pub fn sysfs_link_name(path: &Path) -> io::Result<String> {
    let target: PathBuf = path.read_link()?;
    target
        .file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "unnamed link target"))
}
