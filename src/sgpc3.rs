// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::path::Path;
use tracing::{debug, info};

use crate::bus::{Bus, LinuxBus};
use crate::clock::{Clock, SystemClock};
use crate::command::Command;
use crate::error::{Result, Sgpc3Error};
use crate::transport::Transport;

/// The SGPC3 I2C address, fixed by the chip.
pub const ADDRESS: u8 = 0x58;

/// Bus device opened by [`Sgpc3::new`].
pub const DEFAULT_DEVICE_PATH: &str = "/dev/i2c-1";

/// Delay after a power-up or soft reset before the chip may be accessed.
pub const T_PU_MS: u32 = 600;

/// Measurement interval in low-power mode.
pub const LOW_POWER_INTERVAL_MS: u32 = 2_000;

/// Measurement interval in ultra-low-power mode.
pub const ULTRA_LOW_POWER_INTERVAL_MS: u32 = 30_000;

/// Product type reported by an SGPC3 in its feature-set word.
pub const SGPC3_PRODUCT_TYPE: u8 = 1;

/// Oldest feature set this driver works with.
pub const MIN_PRODUCT_VERSION: u8 = 6;

/// Answer of a passing on-chip self test.
pub const MEASURE_TEST_OK: u16 = 0xD400;

/// Upper bound accepted by [`Sgpc3::set_absolute_humidity_mg_m3`].
pub const MAX_ABSOLUTE_HUMIDITY_MG_M3: u32 = 256_000;

/// Acquisition cadence of the chip.
///
/// Low power (the power-up default) samples every two seconds; ultra-low
/// power every thirty. Sensirion advises against switching a running chip
/// between modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum PowerMode {
    UltraLow = 0,
    Low = 1,
}

impl PowerMode {
    /// How often the chip refreshes its reading in this mode. Not enforced.
    pub fn measurement_interval_ms(self) -> u32 {
        match self {
            PowerMode::UltraLow => ULTRA_LOW_POWER_INTERVAL_MS,
            PowerMode::Low => LOW_POWER_INTERVAL_MS,
        }
    }
}

/// Decoded answer of `get_feature_set_version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSet {
    /// Bits 15..12; 1 for SGPC3.
    pub product_type: u8,
    /// Bits 7..0.
    pub product_version: u8,
}

impl FeatureSet {
    /// Splits the raw response word into its fields.
    pub fn from_word(word: u16) -> Self {
        FeatureSet {
            product_type: ((word >> 12) & 0xF) as u8,
            product_version: (word & 0xFF) as u8,
        }
    }
}

/// Where the driver is in its initialization handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Constructed, or after [`Sgpc3::end`].
    Uninitialized,
    /// Reset seen, feature set not yet confirmed. Only held while
    /// [`Sgpc3::begin`] runs; `begin` always leaves `Ready` or `Faulted`.
    FeatureUnknown,
    /// Feature set validated; gated commands may be sent.
    Ready,
    /// The last [`Sgpc3::begin`] could not identify the chip.
    Faulted,
}

/// SGPC3 driver.
///
/// Owns the bus and clock for exactly one chip. All operations block: first
/// until the chip's previous settling time has passed, then for the settling
/// time of the command they send.
pub struct Sgpc3<B = LinuxBus, C = SystemClock> {
    transport: Transport<B, C>,
    power_mode: PowerMode,
    feature_level: u8,
    state: DeviceState,
}

impl Sgpc3 {
    /// Opens the sensor on [`DEFAULT_DEVICE_PATH`] at [`ADDRESS`].
    pub fn new() -> Result<Sgpc3> {
        Self::with_device_path(DEFAULT_DEVICE_PATH)
    }

    /// Opens the sensor on another Linux I2C bus.
    pub fn with_device_path<P: AsRef<Path>>(path: P) -> Result<Sgpc3> {
        let bus = LinuxBus::open(path, u16::from(ADDRESS))?;
        Ok(Sgpc3::with_bus(bus, SystemClock::new()))
    }
}

impl<B: Bus, C: Clock> Sgpc3<B, C> {
    /// Wraps an already set up bus and time source.
    pub fn with_bus(bus: B, clock: C) -> Self {
        Sgpc3 {
            transport: Transport::new(bus, clock, ADDRESS),
            power_mode: PowerMode::Low,
            feature_level: 0,
            state: DeviceState::Uninitialized,
        }
    }

    /// Identifies the chip and starts continuous measurement in `mode`.
    ///
    /// The call counts as a chip reset, so the first command waits out the
    /// power-up time. A chip that is not an SGPC3, or is older than feature
    /// set [`MIN_PRODUCT_VERSION`], yields [`Sgpc3Error::WrongDeviceType`] and
    /// leaves the feature level at 0.
    ///
    /// Continuous mode is started even if setting the power mode fails; the
    /// first failure is what gets returned.
    pub fn begin(&mut self, mode: PowerMode) -> Result<()> {
        let now = self.transport.now_ms();
        self.handle_chip_reset(now);
        self.feature_level = 0;
        self.state = DeviceState::FeatureUnknown;

        let features = match self.feature_set() {
            Ok(features) => features,
            Err(e) => {
                self.state = DeviceState::Faulted;
                return Err(e);
            }
        };

        if features.product_type != SGPC3_PRODUCT_TYPE
            || features.product_version < MIN_PRODUCT_VERSION
        {
            self.state = DeviceState::Faulted;
            return Err(Sgpc3Error::WrongDeviceType {
                product_type: features.product_type,
                product_version: features.product_version,
            });
        }

        self.feature_level = features.product_version;
        self.state = DeviceState::Ready;
        info!(feature_set = self.feature_level, ?mode, "SGPC3 detected");

        let power = self.set_power_mode_synchronous(mode);
        let start = self.tvoc_init_continuous();
        power.and(start)
    }

    /// Forgets the detected chip. Gated commands fail until the next [`begin`](Self::begin).
    pub fn end(&mut self) {
        self.feature_level = 0;
        self.state = DeviceState::Uninitialized;
    }

    /// Tells the driver the chip was reset at `when` (a [`Clock::now_ms`] value).
    ///
    /// The chip comes back in low-power mode and is not addressed again
    /// until [`T_PU_MS`] later. The feature level is kept.
    pub fn handle_chip_reset(&mut self, when: u32) {
        self.power_mode = PowerMode::Low;
        self.transport.set_available_at(when.wrapping_add(T_PU_MS));
    }

    /// [`handle_chip_reset`](Self::handle_chip_reset) at the current time.
    pub fn handle_chip_reset_now(&mut self) {
        let now = self.transport.now_ms();
        self.handle_chip_reset(now);
    }

    fn check_supported(&self, command: Command) -> Result<()> {
        let required = command.descriptor().feature_set();
        if self.feature_level < required {
            debug!(%command, required, detected = self.feature_level, "command not supported");
            return Err(Sgpc3Error::NotSupported {
                command,
                required,
                detected: self.feature_level,
            });
        }
        Ok(())
    }

    /// Raw feature-set query.
    pub fn feature_set(&mut self) -> Result<FeatureSet> {
        self.check_supported(Command::GetFeatureSetVersion)?;
        let word = self.transport.read_word(Command::GetFeatureSetVersion)?;
        Ok(FeatureSet::from_word(word))
    }

    /// Starts continuous TVOC acquisition.
    pub fn tvoc_init_continuous(&mut self) -> Result<()> {
        self.check_supported(Command::TvocInitContinuous)?;
        self.transport.send(Command::TvocInitContinuous)
    }

    /// Current TVOC reading in ppb, nominally 0 to 60000.
    pub fn measure_tvoc_synchronous(&mut self) -> Result<u16> {
        self.check_supported(Command::MeasureTvoc)?;
        self.transport.read_word(Command::MeasureTvoc)
    }

    /// Raw sensor signal.
    pub fn measure_raw(&mut self) -> Result<u16> {
        self.check_supported(Command::MeasureRaw)?;
        self.transport.read_word(Command::MeasureRaw)
    }

    /// TVOC in ppb and raw signal from one measurement, as `(tvoc, raw)`.
    pub fn measure_tvoc_and_raw(&mut self) -> Result<(u16, u16)> {
        self.check_supported(Command::MeasureTvocAndRaw)?;
        // the chip sends the raw signal first
        let (raw, tvoc) = self.transport.read_two_words(Command::MeasureTvocAndRaw)?;
        Ok((tvoc, raw))
    }

    /// Switches the acquisition cadence. Needs feature set 6.
    pub fn set_power_mode_synchronous(&mut self, mode: PowerMode) -> Result<()> {
        self.check_supported(Command::SetPowerMode)?;
        self.transport
            .send_with_param(Command::SetPowerMode, u16::from(mode))?;
        self.power_mode = mode;
        Ok(())
    }

    /// Current calibration baseline, to be saved and restored across power cycles.
    pub fn get_tvoc_baseline(&mut self) -> Result<u16> {
        self.check_supported(Command::GetTvocBaseline)?;
        self.transport.read_word(Command::GetTvocBaseline)
    }

    /// Restores a baseline saved with [`get_tvoc_baseline`](Self::get_tvoc_baseline).
    pub fn set_tvoc_baseline(&mut self, baseline: u16) -> Result<()> {
        self.check_supported(Command::SetTvocBaseline)?;
        self.transport
            .send_with_param(Command::SetTvocBaseline, baseline)
    }

    /// Baseline from the first hours of operation. Needs feature set 5.
    pub fn get_tvoc_inceptive_baseline(&mut self) -> Result<u16> {
        self.check_supported(Command::GetTvocInceptiveBaseline)?;
        self.transport.read_word(Command::GetTvocInceptiveBaseline)
    }

    /// Sets humidity compensation, in g/m^3 as 8.8 fixed point. Zero disables it.
    /// Needs feature set 6.
    pub fn set_absolute_humidity(&mut self, fixed_8_8: u16) -> Result<()> {
        self.check_supported(Command::SetAbsoluteHumidity)?;
        self.transport
            .send_with_param(Command::SetAbsoluteHumidity, fixed_8_8)
    }

    /// Sets humidity compensation from mg/m^3, at most [`MAX_ABSOLUTE_HUMIDITY_MG_M3`].
    pub fn set_absolute_humidity_mg_m3(&mut self, mg_m3: u32) -> Result<()> {
        if mg_m3 > MAX_ABSOLUTE_HUMIDITY_MG_M3 {
            return Err(Sgpc3Error::InvalidParameter("absolute humidity above 256 g/m^3"));
        }
        // x * 16777 / 2^16 ~ x * 256 / 1000
        let scaled = ((mg_m3 * 16_777) >> 16) as u16;
        self.set_absolute_humidity(scaled)
    }

    /// On-chip self test. Not for use after continuous mode was started.
    pub fn measure_test(&mut self) -> Result<()> {
        self.check_supported(Command::MeasureTest)?;
        let result = self.transport.read_word(Command::MeasureTest)?;
        if result != MEASURE_TEST_OK {
            return Err(Sgpc3Error::SelfTest(result));
        }
        Ok(())
    }

    /// 48-bit serial number; the top 16 bits are zero.
    pub fn serial_id(&mut self) -> Result<u64> {
        self.check_supported(Command::GetSerialId)?;
        self.transport.read_three_words(Command::GetSerialId)
    }

    /// Power mode last confirmed by the chip, or `Low` after a reset.
    pub fn power_mode(&self) -> PowerMode {
        self.power_mode
    }

    /// Detected feature set; 0 until [`begin`](Self::begin) succeeds.
    pub fn feature_level(&self) -> u8 {
        self.feature_level
    }

    /// Time at which the next command may be issued.
    pub fn bus_available_at(&self) -> u32 {
        self.transport.available_at()
    }

    /// Where the initialization handshake stands.
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Gives back the bus and clock.
    pub fn release(self) -> (B, C) {
        self.transport.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_word_fields() {
        let fs = FeatureSet::from_word(0x1006);
        assert_eq!(fs.product_type, 1);
        assert_eq!(fs.product_version, 6);

        let fs = FeatureSet::from_word(0x0020);
        assert_eq!(fs.product_type, 0);
        assert_eq!(fs.product_version, 0x20);
    }

    #[test]
    fn power_mode_wire_values() {
        assert_eq!(u16::from(PowerMode::UltraLow), 0);
        assert_eq!(u16::from(PowerMode::Low), 1);
        assert_eq!(PowerMode::try_from(1u16).unwrap(), PowerMode::Low);
        assert!(PowerMode::try_from(2u16).is_err());
    }

    #[test]
    fn power_mode_intervals() {
        assert_eq!(PowerMode::Low.measurement_interval_ms(), 2_000);
        assert_eq!(PowerMode::UltraLow.measurement_interval_ms(), 30_000);
    }
}
