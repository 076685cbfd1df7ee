// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Two-wire bus collaborator.
//!
//! The driver never owns bus setup. It only needs one write transaction and
//! one read transaction per command, which any backend can provide through
//! [`Bus`]. [`LinuxBus`] adapts the `i2cdev` Linux device.

use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use std::error::Error;
use std::path::Path;
use tracing::trace;

/// Error raised by a bus backend.
pub type BusError = Box<dyn Error + Send + Sync>;

/// Raw byte transport to a device on a two-wire bus.
pub trait Bus {
    /// Writes `bytes` to `address` as one transaction (start, bytes, stop).
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError>;

    /// Requests `buf.len()` bytes from `address`.
    ///
    /// Returns how many bytes the device delivered; anything short of
    /// `buf.len()` is reported to the caller as a short read.
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, BusError>;
}

/// [`Bus`] over an `i2cdev` device, usually `/dev/i2c-N`.
///
/// The wrapped device is already bound to its slave address, so the
/// address passed by the driver is only traced.
pub struct LinuxBus<D = LinuxI2CDevice> {
    device: D,
}

impl LinuxBus<LinuxI2CDevice> {
    /// Opens the bus device at `path` and binds it to `address`.
    pub fn open<P: AsRef<Path>>(path: P, address: u16) -> Result<Self, LinuxI2CError> {
        let device = LinuxI2CDevice::new(path, address)?;
        Ok(LinuxBus { device })
    }
}

impl<D> LinuxBus<D> {
    /// Wraps an opened `i2cdev` device.
    pub fn new(device: D) -> Self {
        LinuxBus { device }
    }

    /// Gives back the wrapped device.
    pub fn into_inner(self) -> D {
        self.device
    }
}

impl<D> Bus for LinuxBus<D>
where
    D: I2CDevice,
    D::Error: Send + Sync + 'static,
{
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        trace!(address, ?bytes, "i2c write");
        self.device.write(bytes)?;
        Ok(())
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, BusError> {
        self.device.read(buf)?;
        trace!(address, ?buf, "i2c read");
        Ok(buf.len())
    }
}
