// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! SGPC3 driver for the Sensirion TVOC gas sensor on I2C
//!
//! Commands and timings taken from the SGPC3 datasheet (May 2020) and the
//! Sensirion reference code. The driver:
//!
//! - waits out the chip's settling time before every command,
//! - checks every response word against its CRC-8,
//! - refuses commands the detected feature set does not support.
//!
//! The bus and the clock are injected (see [`bus::Bus`] and [`clock::Clock`]),
//! so the driver can run over `/dev/i2c-N` or over a test double.
//!
//! ## Basic Example
//!
//! Starting the sensor and reading TVOC
//!
//!```no_run
//!use sgpc3_i2c::sgpc3::{PowerMode, Sgpc3};
//!use std::thread;
//!use std::time::Duration;
//!
//!fn main() {
//!    // Open the I2C device
//!    let mut sgp = Sgpc3::new().unwrap();
//!    sgp.begin(PowerMode::Low).unwrap();
//!
//!    loop {
//!        match sgp.measure_tvoc_synchronous() {
//!            Ok(tvoc) => println!("TVOC: {} ppb", tvoc),
//!            Err(e) => println!("Error obtaining measurement. More details: {}", e),
//!        }
//!        let interval = sgp.power_mode().measurement_interval_ms();
//!        thread::sleep(Duration::from_millis(u64::from(interval)));
//!    }
//!}
//!```
//!

/// Two-wire bus abstraction and the Linux `i2cdev` backend
pub mod bus;
/// Injected millisecond clock
pub mod clock;
/// Packed command descriptors for every SGPC3 command
pub mod command;
/// Driver error type
pub mod error;
/// SGPC3 device controller
pub mod sgpc3;
/// Framing, checksums and timing on the wire
pub mod transport;

pub use error::Sgpc3Error;
pub use sgpc3::{PowerMode, Sgpc3};
