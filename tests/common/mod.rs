//! Scripted SCL3300 stand-in for driver tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use embedded_hal::spi::{ErrorKind, ErrorType, Operation};
use embedded_hal_async::{delay::DelayNs, spi::SpiDevice};
use scl3300_async::{Command, frame};

/// Register content served by [`FakeScl3300`]
#[derive(Debug, Clone, Copy)]
pub enum Value {
    /// Served with a valid CRC
    Ok(u16),
    /// Served with a broken CRC
    Corrupt(u16),
}

/// Build a valid response frame for `command`
pub fn response_frame(command: Command, run_state: u8, data: u16) -> u32 {
    let op = command.payload() & 0xFC_0000;
    frame::encode(op | (u32::from(run_state & 0b11) << 16) | u32::from(data))
}

/// Answers like the device: every reply carries the response to the
/// previous request.
#[derive(Debug)]
pub struct FakeScl3300 {
    /// Every frame the driver sent, in order
    pub sent: Vec<u32>,
    /// Return status placed in every response
    pub run_state: u8,
    registers: HashMap<u32, VecDeque<Value>>,
    fail_on: Option<u32>,
    pending: Option<u32>,
    awaiting_second: bool,
}

impl Default for FakeScl3300 {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeScl3300 {
    /// A device in normal operation identifying as an SCL3300
    pub fn new() -> Self {
        let mut fake = Self {
            sent: Vec::new(),
            run_state: 0b01,
            registers: HashMap::new(),
            fail_on: None,
            pending: None,
            awaiting_second: false,
        };
        fake.set(Command::ReadWhoAmI, 0x00C1);
        fake.set(Command::ReadStatusSummary, 0x0000);
        fake
    }

    /// Serve `value` for every read of `command`
    pub fn set(&mut self, command: Command, value: u16) {
        self.script(command, [Value::Ok(value)]);
    }

    /// Serve `values` for successive reads of `command`; the last one repeats
    pub fn script(&mut self, command: Command, values: impl IntoIterator<Item = Value>) {
        self.registers
            .insert(command.payload(), values.into_iter().collect());
    }

    /// Fail the transfer that sends `command`
    pub fn fail_on(&mut self, command: Command) {
        self.fail_on = Some(command.frame());
    }

    /// Commands sent, decoded from the frames
    pub fn sent_payloads(&self) -> Vec<u32> {
        self.sent.iter().map(|f| f >> 8).collect()
    }

    fn next_value(&mut self, request: u32) -> Value {
        let Some(values) = self.registers.get_mut(&(request >> 8)) else {
            return Value::Ok(0);
        };
        if values.len() > 1 {
            values.pop_front().unwrap_or(Value::Ok(0))
        } else {
            values.front().copied().unwrap_or(Value::Ok(0))
        }
    }

    fn respond(&mut self, request: u32) -> u32 {
        let is_read = request & 0x8000_0000 == 0;
        let value = if is_read && !self.awaiting_second {
            self.awaiting_second = true;
            self.next_value(request)
        } else if is_read {
            self.awaiting_second = false;
            self.peek_value(request)
        } else {
            self.awaiting_second = false;
            Value::Ok(0)
        };

        let op = (request >> 8) & 0xFC_0000;
        let (data, corrupt) = match value {
            Value::Ok(data) => (data, false),
            Value::Corrupt(data) => (data, true),
        };
        let reply = frame::encode(op | (u32::from(self.run_state & 0b11) << 16) | u32::from(data));
        if corrupt { reply ^ 0x0000_0001 } else { reply }
    }

    fn peek_value(&self, request: u32) -> Value {
        self.registers
            .get(&(request >> 8))
            .and_then(|values| values.front().copied())
            .unwrap_or(Value::Ok(0))
    }
}

impl ErrorType for FakeScl3300 {
    type Error = ErrorKind;
}

impl SpiDevice<u8> for FakeScl3300 {
    async fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), ErrorKind> {
        for operation in operations {
            match operation {
                Operation::Transfer(read, write) => {
                    let request = u32::from_be_bytes([write[0], write[1], write[2], write[3]]);
                    self.sent.push(request);
                    if self.fail_on == Some(request) {
                        return Err(ErrorKind::Other);
                    }

                    let reply = match self.pending.replace(request) {
                        Some(previous) => self.respond(previous),
                        None => frame::encode(0),
                    };
                    read.copy_from_slice(&reply.to_be_bytes());
                }
                _ => panic!("unexpected SPI operation"),
            }
        }
        Ok(())
    }
}

/// Delay that records the total requested time
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub total_ns: u64,
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}
