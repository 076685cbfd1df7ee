// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use i2cdev::linux::LinuxI2CError;
use thiserror::Error;

use crate::bus::BusError;
use crate::command::Command;

/// Errors returned by every SGPC3 operation.
///
/// A failed command still consumes its settling delay, so the device is
/// left in a consistent state and the caller may simply retry.
#[derive(Error, Debug)]
pub enum Sgpc3Error {
    /// The bus rejected the command or parameter bytes.
    #[error("bus write failed for command {command}: {source}")]
    Write {
        command: Command,
        #[source]
        source: BusError,
    },

    /// Fewer response bytes arrived than the command declares.
    #[error("short read for command {command}: expected {expected} bytes, got {actual}")]
    Read {
        command: Command,
        expected: usize,
        actual: usize,
    },

    /// A response word did not match its checksum byte.
    #[error("checksum mismatch in word {word} of the response to {command}")]
    BadCrc { command: Command, word: usize },

    /// The detected feature set is too old for the command.
    #[error("command {command} needs feature set {required}, sensor reports {detected}")]
    NotSupported {
        command: Command,
        required: u8,
        detected: u8,
    },

    /// The feature-set query answered with another product or a revision
    /// older than this driver supports.
    #[error("wrong device type: product type {product_type}, version {product_version}")]
    WrongDeviceType { product_type: u8, product_version: u8 },

    /// The caller passed data that does not fit the command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// The on-chip self test did not return the pass pattern.
    #[error("self test failed, sensor returned {0:#06x}")]
    SelfTest(u16),

    /// Opening the Linux I2C device failed.
    #[error("cannot open I2C device: {0}")]
    Open(#[from] LinuxI2CError),
}

pub type Result<T> = std::result::Result<T, Sgpc3Error>;
