//! Test doubles for the bus and the clock.
//!
//! Both share state through `Rc<RefCell<..>>`, so a test keeps a handle
//! after moving the double into the driver.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use sgpc3_i2c::bus::{Bus, BusError};
use sgpc3_i2c::clock::Clock;
use sgpc3_i2c::transport::encode_word;
use sgpc3_i2c::{PowerMode, Sgpc3};

pub const ADDRESS: u8 = 0x58;

#[derive(Debug, Default)]
struct ClockState {
    now: u32,
    last_read: u32,
    delays: Vec<u32>,
}

/// Clock that advances one millisecond per read and jumps on delays.
#[derive(Debug, Clone, Default)]
pub struct MockClock(Rc<RefCell<ClockState>>);

impl MockClock {
    pub fn starting_at(now: u32) -> Self {
        MockClock(Rc::new(RefCell::new(ClockState {
            now,
            last_read: now,
            delays: Vec::new(),
        })))
    }

    /// Current time, without advancing.
    pub fn peek(&self) -> u32 {
        self.0.borrow().now
    }

    /// Last value handed to the driver.
    pub fn last_read(&self) -> u32 {
        self.0.borrow().last_read
    }

    pub fn delays(&self) -> Vec<u32> {
        self.0.borrow().delays.clone()
    }

    pub fn clear_delays(&self) {
        self.0.borrow_mut().delays.clear();
    }
}

impl Clock for MockClock {
    fn now_ms(&mut self) -> u32 {
        let mut state = self.0.borrow_mut();
        let now = state.now;
        state.last_read = now;
        state.now = now.wrapping_add(1);
        now
    }

    fn delay_ms(&mut self, ms: u32) {
        let mut state = self.0.borrow_mut();
        state.now = state.now.wrapping_add(ms);
        state.delays.push(ms);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub address: u8,
    /// Clock value the driver read just before writing.
    pub at: u32,
    pub bytes: Vec<u8>,
}

impl WriteRecord {
    pub fn opcode(&self) -> u16 {
        u16::from_be_bytes([self.bytes[0], self.bytes[1]])
    }
}

#[derive(Debug)]
enum ReadReply {
    Data(Vec<u8>),
    Fail,
}

#[derive(Debug, Default)]
struct BusState {
    writes: Vec<WriteRecord>,
    reads: VecDeque<ReadReply>,
    failing_opcodes: Vec<u16>,
    read_count: usize,
}

/// Bus that records writes and answers reads from a queue.
///
/// A read with nothing queued delivers zero bytes.
#[derive(Debug, Clone)]
pub struct MockBus {
    state: Rc<RefCell<BusState>>,
    clock: MockClock,
}

impl MockBus {
    pub fn new(clock: &MockClock) -> Self {
        MockBus {
            state: Rc::new(RefCell::new(BusState::default())),
            clock: clock.clone(),
        }
    }

    /// Every write of `opcode` is NACKed from now on.
    pub fn fail_opcode(&self, opcode: u16) {
        self.state.borrow_mut().failing_opcodes.push(opcode);
    }

    pub fn queue_bytes(&self, bytes: &[u8]) {
        self.state
            .borrow_mut()
            .reads
            .push_back(ReadReply::Data(bytes.to_vec()));
    }

    /// Queues one response made of correctly checksummed words.
    pub fn queue_words(&self, words: &[u16]) {
        let bytes: Vec<u8> = words.iter().flat_map(|w| encode_word(*w)).collect();
        self.queue_bytes(&bytes);
    }

    pub fn queue_read_failure(&self) {
        self.state.borrow_mut().reads.push_back(ReadReply::Fail);
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state.borrow().writes.clone()
    }

    pub fn opcodes(&self) -> Vec<u16> {
        self.writes().iter().map(WriteRecord::opcode).collect()
    }

    pub fn read_count(&self) -> usize {
        self.state.borrow().read_count
    }

    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.writes.clear();
        state.read_count = 0;
    }
}

impl Bus for MockBus {
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        let mut state = self.state.borrow_mut();
        state.writes.push(WriteRecord {
            address,
            at: self.clock.last_read(),
            bytes: bytes.to_vec(),
        });
        let opcode = u16::from_be_bytes([bytes[0], bytes[1]]);
        if state.failing_opcodes.contains(&opcode) {
            return Err("address NACK".into());
        }
        Ok(())
    }

    fn read(&mut self, _address: u8, buf: &mut [u8]) -> Result<usize, BusError> {
        let mut state = self.state.borrow_mut();
        state.read_count += 1;
        match state.reads.pop_front() {
            Some(ReadReply::Data(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(ReadReply::Fail) => Err("bus timeout".into()),
            None => Ok(0),
        }
    }
}

pub fn sensor_at(now: u32) -> (Sgpc3<MockBus, MockClock>, MockBus, MockClock) {
    let clock = MockClock::starting_at(now);
    let bus = MockBus::new(&clock);
    let sensor = Sgpc3::with_bus(bus.clone(), clock.clone());
    (sensor, bus, clock)
}

/// A sensor that went through `begin` with feature set 6; records cleared.
pub fn ready_sensor() -> (Sgpc3<MockBus, MockClock>, MockBus, MockClock) {
    let (mut sensor, bus, clock) = sensor_at(1_000);
    bus.queue_words(&[0x1006]);
    sensor
        .begin(PowerMode::Low)
        .expect("begin with feature set 6");
    bus.clear();
    clock.clear_delays();
    (sensor, bus, clock)
}
