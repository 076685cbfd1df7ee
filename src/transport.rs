// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Wire protocol: framing, bus gating, checksums and byte order.
//!
//! A command frame is the big-endian opcode followed by zero or more 3-byte
//! words (two data bytes and their CRC-8). Responses use the same words.

use byteorder::{BigEndian, ByteOrder};
use tracing::{debug, warn};

use crate::bus::Bus;
use crate::clock::{reached, Clock};
use crate::command::Command;
use crate::error::{Result, Sgpc3Error};

/// Bytes per data word on the wire, checksum included.
pub const WORD_LEN: usize = 3;

const MAX_PARAM_WORDS: usize = 1;
const MAX_RESPONSE_WORDS: usize = 3;

/// CRC-8 seed used by Sensirion sensors.
pub const CRC_INIT: u8 = 0xFF;

// polynomial 0x31 (x^8 + x^5 + x^4 + 1), one entry per nibble
const CRC_TABLE: [u8; 16] = [
    0x00, 0x31, 0x62, 0x53, 0xc4, 0xf5, 0xa6, 0x97, 0xb9, 0x88, 0xdb, 0xea, 0x7d, 0x4c, 0x1f, 0x2e,
];

/// CRC-8 over `data` with the standard seed.
pub fn crc8(data: &[u8]) -> u8 {
    crc8_with_seed(data, CRC_INIT)
}

/// CRC-8 over `data`, four bits at a time.
///
/// Always called with two bytes by the driver, but works for any length.
pub fn crc8_with_seed(data: &[u8], seed: u8) -> u8 {
    let mut crc = seed;
    for &byte in data {
        let high = (byte ^ crc) >> 4;
        crc = (crc << 4) ^ CRC_TABLE[high as usize];
        let low = ((crc >> 4) ^ byte) & 0x0F;
        crc = (crc << 4) ^ CRC_TABLE[low as usize];
    }
    crc
}

/// Stores `value` big-endian into the first two bytes of `buf`.
pub fn put_be16(buf: &mut [u8], value: u16) {
    BigEndian::write_u16(buf, value);
}

/// Reads a big-endian value from the first two bytes of `buf`.
pub fn get_be16(buf: &[u8]) -> u16 {
    BigEndian::read_u16(buf)
}

/// Encodes a host value as one checksummed wire word.
pub fn encode_word(value: u16) -> [u8; WORD_LEN] {
    let mut word = [0; WORD_LEN];
    put_be16(&mut word, value);
    word[2] = crc8(&word[..2]);
    word
}

/// Verifies every word of a response, then decodes them.
///
/// Nothing is returned unless all checksums match.
pub fn decode_words<const N: usize>(command: Command, bytes: &[u8]) -> Result<[u16; N]> {
    if bytes.len() != N * WORD_LEN {
        return Err(Sgpc3Error::InvalidParameter("response buffer does not match word count"));
    }

    let mut words = [0u16; N];
    for (i, chunk) in bytes.chunks_exact(WORD_LEN).enumerate() {
        let expected = crc8(&chunk[..2]);
        if expected != chunk[2] {
            warn!(
                %command,
                word = i,
                "checksum did not match (ours: {:#04x} != sensor's: {:#04x})",
                expected,
                chunk[2]
            );
            return Err(Sgpc3Error::BadCrc { command, word: i });
        }
        words[i] = get_be16(chunk);
    }
    Ok(words)
}

/// Owns the bus and the clock, and enforces the chip's timing rules.
///
/// No command leaves before the bus-available time, and every command,
/// successful or not, pushes that time to `issue + delay + 1`.
pub struct Transport<B, C> {
    bus: B,
    clock: C,
    address: u8,
    available_at: u32,
}

impl<B: Bus, C: Clock> Transport<B, C> {
    /// Wraps `bus` and `clock` for the device at `address`; the bus is free immediately.
    pub fn new(bus: B, mut clock: C, address: u8) -> Self {
        let available_at = clock.now_ms();
        Transport {
            bus,
            clock,
            address,
            available_at,
        }
    }

    /// Time at which the next command may be issued.
    pub fn available_at(&self) -> u32 {
        self.available_at
    }

    /// Holds off the next command until `when`, e.g. after a chip reset.
    pub fn set_available_at(&mut self, when: u32) {
        self.available_at = when;
    }

    /// Reads the injected clock.
    pub fn now_ms(&mut self) -> u32 {
        self.clock.now_ms()
    }

    /// Gives back the bus and clock.
    pub fn release(self) -> (B, C) {
        (self.bus, self.clock)
    }

    /// Spins on the clock until the bus is available; returns the issue time.
    fn wait_for_bus(&mut self) -> u32 {
        let mut now = self.clock.now_ms();
        while !reached(now, self.available_at) {
            now = self.clock.now_ms();
        }
        now
    }

    /// Sends `command` with pre-checksummed `params` and reads the raw
    /// response into `response`.
    ///
    /// `params` and `response` must be exactly as long as the command's
    /// descriptor declares.
    pub fn send_command(&mut self, command: Command, params: &[u8], response: &mut [u8]) -> Result<()> {
        let descriptor = command.descriptor();
        if params.len() != descriptor.param_words() * WORD_LEN {
            return Err(Sgpc3Error::InvalidParameter("parameter length does not match command"));
        }
        if response.len() != descriptor.response_words() * WORD_LEN {
            return Err(Sgpc3Error::InvalidParameter("response length does not match command"));
        }

        let now = self.wait_for_bus();

        let mut frame = [0u8; 2 + MAX_PARAM_WORDS * WORD_LEN];
        put_be16(&mut frame, descriptor.opcode());
        frame[2..2 + params.len()].copy_from_slice(params);
        let frame = &frame[..2 + params.len()];

        debug!(
            %command,
            opcode = descriptor.opcode(),
            delay_ms = descriptor.delay_ms(),
            "sending command"
        );
        let written = self.bus.write(self.address, frame);

        self.available_at = now.wrapping_add(descriptor.delay_ms() + 1);

        if let Err(source) = written {
            warn!(%command, error = %source, "error writing command");
            return Err(Sgpc3Error::Write { command, source });
        }

        self.clock.delay_ms(descriptor.delay_ms());

        if response.is_empty() {
            return Ok(());
        }

        let expected = response.len();
        let actual = match self.bus.read(self.address, response) {
            Ok(n) => n,
            Err(error) => {
                warn!(%command, %error, "error reading response");
                0
            }
        };
        if actual != expected {
            warn!(%command, actual, expected, "short read");
            return Err(Sgpc3Error::Read {
                command,
                expected,
                actual,
            });
        }

        Ok(())
    }

    /// Reads `N` checksummed words in reply to `command`.
    pub fn read_words<const N: usize>(&mut self, command: Command) -> Result<[u16; N]> {
        if N > MAX_RESPONSE_WORDS {
            return Err(Sgpc3Error::InvalidParameter("too many response words"));
        }
        let mut buf = [0u8; MAX_RESPONSE_WORDS * WORD_LEN];
        let buf = &mut buf[..N * WORD_LEN];
        self.send_command(command, &[], buf)?;
        decode_words(command, buf)
    }

    /// Command with neither parameter nor response.
    pub fn send(&mut self, command: Command) -> Result<()> {
        self.send_command(command, &[], &mut [])
    }

    /// Command with one 16-bit parameter and no response.
    pub fn send_with_param(&mut self, command: Command, param: u16) -> Result<()> {
        let word = encode_word(param);
        self.send_command(command, &word, &mut [])
    }

    /// Command answering with one word.
    pub fn read_word(&mut self, command: Command) -> Result<u16> {
        let [word] = self.read_words::<1>(command)?;
        Ok(word)
    }

    /// Command answering with two words, in wire order.
    pub fn read_two_words(&mut self, command: Command) -> Result<(u16, u16)> {
        let [first, second] = self.read_words::<2>(command)?;
        Ok((first, second))
    }

    /// Command answering with three words, packed into the low 48 bits.
    pub fn read_three_words(&mut self, command: Command) -> Result<u64> {
        let [high, mid, low] = self.read_words::<3>(command)?;
        Ok((u64::from(high) << 32) | (u64::from(mid) << 16) | u64::from(low))
    }
}
