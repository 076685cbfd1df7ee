// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! SGPC3 command set.
//!
//! Each command is described by a [`CommandDescriptor`], a single `u32` packing
//! the opcode, the parameter and response lengths (in 3-byte words), the
//! feature set the command needs and the settling delay:
//!
//! | bits   | field                   |
//! |--------|-------------------------|
//! | 0..14  | opcode                  |
//! | 16     | parameter words (0..=1) |
//! | 17..20 | response words (0..=3)  |
//! | 20..24 | required feature set    |
//! | 24..32 | delay in milliseconds   |

const OPCODE_MASK: u32 = 0x3FFF;
const PARAM_SHIFT: u32 = 16;
const PARAM_MASK: u32 = 0x1 << PARAM_SHIFT;
const RESPONSE_SHIFT: u32 = 17;
const RESPONSE_MASK: u32 = 0x7 << RESPONSE_SHIFT;
const FEATURE_SHIFT: u32 = 20;
const FEATURE_MASK: u32 = 0xF << FEATURE_SHIFT;
const DELAY_SHIFT: u32 = 24;
const DELAY_MASK: u32 = 0xFF << DELAY_SHIFT;

/// Packed, immutable description of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor(u32);

impl CommandDescriptor {
    /// Packs a descriptor.
    ///
    /// Out-of-range fields panic; every descriptor in this crate is built in a
    /// `const` item, so a bad table entry fails the build.
    pub const fn new(
        opcode: u16,
        param_words: u8,
        response_words: u8,
        delay_ms: u8,
        feature_set: u8,
    ) -> Self {
        assert!((opcode as u32) & !OPCODE_MASK == 0, "opcode wider than 14 bits");
        assert!(param_words <= 1, "at most one parameter word");
        assert!(response_words <= 3, "at most three response words");
        assert!(feature_set <= 0xF, "feature set wider than 4 bits");

        Self(
            (opcode as u32 & OPCODE_MASK)
                | ((param_words as u32) << PARAM_SHIFT)
                | ((response_words as u32) << RESPONSE_SHIFT)
                | ((feature_set as u32) << FEATURE_SHIFT)
                | ((delay_ms as u32) << DELAY_SHIFT),
        )
    }

    /// The 16-bit code sent on the wire.
    pub const fn opcode(self) -> u16 {
        (self.0 & OPCODE_MASK) as u16
    }

    /// Parameter words sent after the opcode.
    pub const fn param_words(self) -> usize {
        ((self.0 & PARAM_MASK) >> PARAM_SHIFT) as usize
    }

    /// Response words read back after the delay.
    pub const fn response_words(self) -> usize {
        ((self.0 & RESPONSE_MASK) >> RESPONSE_SHIFT) as usize
    }

    /// Lowest feature set that accepts this command.
    pub const fn feature_set(self) -> u8 {
        ((self.0 & FEATURE_MASK) >> FEATURE_SHIFT) as u8
    }

    /// Time the chip needs after the command before it may be read or addressed again.
    pub const fn delay_ms(self) -> u32 {
        (self.0 & DELAY_MASK) >> DELAY_SHIFT
    }

    /// The packed word.
    pub const fn bits(self) -> u32 {
        self.0
    }
}

const MEASURE_TVOC: CommandDescriptor = CommandDescriptor::new(0x2008, 0, 1, 50, 0);
const GET_TVOC_BASELINE: CommandDescriptor = CommandDescriptor::new(0x2015, 0, 1, 10, 0);
const SET_TVOC_BASELINE: CommandDescriptor = CommandDescriptor::new(0x201e, 1, 0, 10, 0);
const GET_FEATURE_SET_VERSION: CommandDescriptor = CommandDescriptor::new(0x202f, 0, 1, 10, 0);
const MEASURE_TEST: CommandDescriptor = CommandDescriptor::new(0x2032, 0, 1, 220, 0);
const MEASURE_TVOC_AND_RAW: CommandDescriptor = CommandDescriptor::new(0x2046, 0, 2, 50, 0);
const MEASURE_RAW: CommandDescriptor = CommandDescriptor::new(0x204d, 0, 1, 50, 0);
const SET_ABSOLUTE_HUMIDITY: CommandDescriptor = CommandDescriptor::new(0x2061, 1, 0, 10, 6);
const SET_POWER_MODE: CommandDescriptor = CommandDescriptor::new(0x209f, 1, 0, 10, 6);
const TVOC_INIT_CONTINUOUS: CommandDescriptor = CommandDescriptor::new(0x20ae, 0, 0, 10, 0);
// The datasheet lists a parameter word here; the vendor sample code sends none.
const GET_TVOC_INCEPTIVE_BASELINE: CommandDescriptor = CommandDescriptor::new(0x20b3, 0, 1, 10, 5);
const GET_SERIAL_ID: CommandDescriptor = CommandDescriptor::new(0x3682, 0, 3, 1, 0);

/// Every command the driver can issue, in opcode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    MeasureTvoc,
    GetTvocBaseline,
    SetTvocBaseline,
    GetFeatureSetVersion,
    MeasureTest,
    MeasureTvocAndRaw,
    MeasureRaw,
    SetAbsoluteHumidity,
    SetPowerMode,
    TvocInitContinuous,
    GetTvocInceptiveBaseline,
    GetSerialId,
}

impl Command {
    /// All commands, in opcode order.
    pub const ALL: [Command; 12] = [
        Command::MeasureTvoc,
        Command::GetTvocBaseline,
        Command::SetTvocBaseline,
        Command::GetFeatureSetVersion,
        Command::MeasureTest,
        Command::MeasureTvocAndRaw,
        Command::MeasureRaw,
        Command::SetAbsoluteHumidity,
        Command::SetPowerMode,
        Command::TvocInitContinuous,
        Command::GetTvocInceptiveBaseline,
        Command::GetSerialId,
    ];

    /// Compiled-in descriptor of this command.
    pub const fn descriptor(self) -> CommandDescriptor {
        match self {
            Command::MeasureTvoc => MEASURE_TVOC,
            Command::GetTvocBaseline => GET_TVOC_BASELINE,
            Command::SetTvocBaseline => SET_TVOC_BASELINE,
            Command::GetFeatureSetVersion => GET_FEATURE_SET_VERSION,
            Command::MeasureTest => MEASURE_TEST,
            Command::MeasureTvocAndRaw => MEASURE_TVOC_AND_RAW,
            Command::MeasureRaw => MEASURE_RAW,
            Command::SetAbsoluteHumidity => SET_ABSOLUTE_HUMIDITY,
            Command::SetPowerMode => SET_POWER_MODE,
            Command::TvocInitContinuous => TVOC_INIT_CONTINUOUS,
            Command::GetTvocInceptiveBaseline => GET_TVOC_INCEPTIVE_BASELINE,
            Command::GetSerialId => GET_SERIAL_ID,
        }
    }

    /// Shorthand for `self.descriptor().opcode()`.
    pub const fn opcode(self) -> u16 {
        self.descriptor().opcode()
    }
}
