//! Register-file simulator for driver tests.
//!
//! [`MockI2c`] answers at one address and behaves like a device with
//! auto-incrementing registers: a write stores `data` from `reg` upwards, a
//! read returns consecutive registers from the last written pointer. Reads can
//! be scripted per register to model status bits that change over time.

use core::fmt;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{
    self, ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation,
};

/// One transfer as seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    Write { address: u8, bytes: Vec<u8> },
    Read { address: u8, register: u8, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    /// Nothing answers at the requested address.
    NoAcknowledge,
    /// Failure switched on by the test.
    Injected,
}

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockError::NoAcknowledge => f.write_str("no device at address"),
            MockError::Injected => f.write_str("injected bus failure"),
        }
    }
}

impl std::error::Error for MockError {}

impl i2c::Error for MockError {
    fn kind(&self) -> ErrorKind {
        match self {
            MockError::NoAcknowledge => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
            }
            MockError::Injected => ErrorKind::Other,
        }
    }
}

struct State {
    address: u8,
    registers: [u8; 256],
    pointer: u8,
    scripts: HashMap<u8, VecDeque<u8>>,
    log: Vec<Transfer>,
    fail_all: bool,
    fail_register: Option<u8>,
}

#[derive(Clone)]
pub struct MockI2c {
    state: Rc<RefCell<State>>,
}

impl MockI2c {
    pub fn new(address: u8) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                address,
                registers: [0; 256],
                pointer: 0,
                scripts: HashMap::new(),
                log: Vec::new(),
                fail_all: false,
                fail_register: None,
            })),
        }
    }

    pub fn set_register(&self, reg: u8, value: u8) {
        self.state.borrow_mut().registers[reg as usize] = value;
    }

    pub fn set_registers(&self, reg: u8, values: &[u8]) {
        let mut state = self.state.borrow_mut();
        for (i, &value) in values.iter().enumerate() {
            state.registers[reg.wrapping_add(i as u8) as usize] = value;
        }
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.state.borrow().registers[reg as usize]
    }

    pub fn registers(&self, reg: u8, len: usize) -> Vec<u8> {
        let state = self.state.borrow();
        (0..len)
            .map(|i| state.registers[reg.wrapping_add(i as u8) as usize])
            .collect()
    }

    /// Queue values that successive reads of `reg` return before falling
    /// back to the register file.
    pub fn script_reads(&self, reg: u8, values: &[u8]) {
        self.state
            .borrow_mut()
            .scripts
            .entry(reg)
            .or_default()
            .extend(values.iter().copied());
    }

    /// Fail every transfer that addresses `reg`.
    pub fn fail_register(&self, reg: Option<u8>) {
        self.state.borrow_mut().fail_register = reg;
    }

    /// Fail every transfer.
    pub fn fail_all(&self, fail: bool) {
        self.state.borrow_mut().fail_all = fail;
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        self.state.borrow().log.clone()
    }

    /// Register writes that carried data, register byte first. Bare
    /// register selections ahead of a read are left out.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .log
            .iter()
            .filter_map(|t| match t {
                Transfer::Write { bytes, .. } if bytes.len() > 1 => {
                    Some(bytes.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Number of reads that started at `reg`.
    pub fn reads_of(&self, reg: u8) -> usize {
        self.state
            .borrow()
            .log
            .iter()
            .filter(|t| matches!(t, Transfer::Read { register, .. } if *register == reg))
            .count()
    }

    pub fn clear_log(&self) {
        self.state.borrow_mut().log.clear();
    }
}

impl ErrorType for MockI2c {
    type Error = MockError;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;

        if state.fail_all {
            return Err(MockError::Injected);
        }
        if address != state.address {
            return Err(MockError::NoAcknowledge);
        }

        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    let Some((&reg, data)) = bytes.split_first() else {
                        continue;
                    };
                    if state.fail_register == Some(reg) {
                        return Err(MockError::Injected);
                    }
                    state
                        .log
                        .push(Transfer::Write { address, bytes: bytes.to_vec() });
                    state.pointer = reg;
                    for (i, &value) in data.iter().enumerate() {
                        state.registers[reg.wrapping_add(i as u8) as usize] =
                            value;
                    }
                }
                Operation::Read(buf) => {
                    let reg = state.pointer;
                    if state.fail_register == Some(reg) {
                        return Err(MockError::Injected);
                    }
                    state.log.push(Transfer::Read {
                        address,
                        register: reg,
                        len: buf.len(),
                    });
                    for (i, byte) in buf.iter_mut().enumerate() {
                        let r = reg.wrapping_add(i as u8);
                        let scripted = state
                            .scripts
                            .get_mut(&r)
                            .and_then(|queue| queue.pop_front());
                        *byte = scripted.unwrap_or(state.registers[r as usize]);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Delay that records instead of sleeping.
#[derive(Clone, Default)]
pub struct MockDelay {
    log: Rc<RefCell<Vec<u32>>>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every requested delay, in nanoseconds, in call order.
    pub fn calls(&self) -> Vec<u32> {
        self.log.borrow().clone()
    }

    pub fn total_ns(&self) -> u64 {
        self.log.borrow().iter().map(|&ns| ns as u64).sum()
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.borrow_mut().push(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.delay_ns(us.saturating_mul(1_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay_ns(ms.saturating_mul(1_000_000));
    }
}
