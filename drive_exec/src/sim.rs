//! # Simulated Hardware
//!
//! In-memory stand-ins for the I2C bus, the GPIO direction lines and the camera. They implement
//! the same traits as the real hardware so the full stack can run, and be inspected, without a
//! Raspberry Pi.
//!
//! The handles are cheap to clone and every clone shares the same state, so a test can keep one
//! clone while the driver owns another.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    cell::{Cell, RefCell},
    convert::Infallible,
    rc::Rc,
};

use comms_if::eqpt::car::CamFrame;
use embedded_hal::{
    blocking::i2c::{Write, WriteRead},
    digital::v2::OutputPin,
};

use crate::{
    error::DriveError,
    params::DriveExecParams,
    sensor::FrameSource,
    vehicle::{assembly::assemble, Vehicle},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Power on value of the PCA9685 MODE1 register (SLEEP | ALLCALL).
const POWER_ON_MODE1: u8 = 0x11;

/// Power on value of the PCA9685 MODE2 register (OUTDRV).
const POWER_ON_MODE2: u8 = 0x04;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A simulated I2C bus with a single 256 byte register file.
#[derive(Clone)]
pub struct SimBus {
    state: Rc<RefCell<SimBusState>>,
}

struct SimBusState {
    registers: [u8; 256],

    transactions: Vec<Transaction>,

    /// Number of writes left before every write fails
    writes_until_failure: Option<usize>,
}

/// A simulated GPIO output.
#[derive(Clone, Debug)]
pub struct SimOutputPin {
    pub gpio: u8,

    high: Rc<Cell<bool>>,
}

/// Camera source producing a fixed RGB gradient.
pub struct TestPattern {
    width: usize,
    height: usize,
}

/// A vehicle running on simulated hardware, with handles to inspect it.
pub struct SimVehicle {
    pub vehicle: Vehicle,

    pub bus: SimBus,

    /// Direction line of each drive motor, in the same order as the motors
    pub direction_pins: Vec<SimOutputPin>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A single byte bus transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transaction {
    Write { address: u8, register: u8, value: u8 },
    Read { address: u8, register: u8, value: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimBusError {
    /// Failure requested with [`SimBus::fail_after_writes`]
    InjectedFailure,

    /// Only single register transfers are supported
    UnsupportedTransfer { write_len: usize, read_len: usize },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimBus {
    pub fn new() -> Self {
        let mut registers = [0u8; 256];
        registers[0x00] = POWER_ON_MODE1;
        registers[0x01] = POWER_ON_MODE2;

        Self {
            state: Rc::new(RefCell::new(SimBusState {
                registers,
                transactions: Vec::new(),
                writes_until_failure: None,
            })),
        }
    }

    pub fn register(&self, register: u8) -> u8 {
        self.state.borrow().registers[register as usize]
    }

    /// Read a two byte little endian register.
    pub fn register_pair(&self, register: u8) -> u16 {
        u16::from_le_bytes([self.register(register), self.register(register + 1)])
    }

    /// Set a register without logging a transaction, as if the device changed it.
    pub fn set_register(&self, register: u8, value: u8) {
        self.state.borrow_mut().registers[register as usize] = value;
    }

    /// All transactions since creation or the last [`SimBus::clear_transactions`].
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.borrow().transactions.clone()
    }

    pub fn clear_transactions(&self) {
        self.state.borrow_mut().transactions.clear();
    }

    /// Let `count` more writes succeed, then fail every write after that.
    pub fn fail_after_writes(&self, count: usize) {
        self.state.borrow_mut().writes_until_failure = Some(count);
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for SimBus {
    type Error = SimBusError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        let (register, value) = match bytes {
            [r, v] => (*r, *v),
            _ => {
                return Err(SimBusError::UnsupportedTransfer {
                    write_len: bytes.len(),
                    read_len: 0,
                })
            }
        };

        let mut state = self.state.borrow_mut();

        match state.writes_until_failure {
            Some(0) => return Err(SimBusError::InjectedFailure),
            Some(ref mut n) => *n -= 1,
            None => (),
        }

        state.registers[register as usize] = value;
        state.transactions.push(Transaction::Write {
            address,
            register,
            value,
        });

        Ok(())
    }
}

impl WriteRead for SimBus {
    type Error = SimBusError;

    fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        if bytes.len() != 1 || buffer.len() != 1 {
            return Err(SimBusError::UnsupportedTransfer {
                write_len: bytes.len(),
                read_len: buffer.len(),
            });
        }

        let mut state = self.state.borrow_mut();
        let register = bytes[0];
        let value = state.registers[register as usize];

        buffer[0] = value;
        state.transactions.push(Transaction::Read {
            address,
            register,
            value,
        });

        Ok(())
    }
}

impl Transaction {
    pub fn address(&self) -> u8 {
        match *self {
            Transaction::Write { address, .. } | Transaction::Read { address, .. } => address,
        }
    }

    pub fn register(&self) -> u8 {
        match *self {
            Transaction::Write { register, .. } | Transaction::Read { register, .. } => register,
        }
    }
}

impl SimOutputPin {
    /// Create a new pin, initially low.
    pub fn new(gpio: u8) -> Self {
        Self {
            gpio,
            high: Rc::new(Cell::new(false)),
        }
    }

    pub fn is_high(&self) -> bool {
        self.high.get()
    }
}

impl OutputPin for SimOutputPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high.set(true);
        Ok(())
    }
}

impl TestPattern {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

impl FrameSource for TestPattern {
    fn read_frame(&mut self) -> Result<CamFrame, DriveError> {
        let mut data = Vec::with_capacity(self.width * self.height * 3);

        for y in 0..self.height {
            for x in 0..self.width {
                data.push((x * 255 / self.width.max(1)) as u8);
                data.push((y * 255 / self.height.max(1)) as u8);
                data.push(128);
            }
        }

        Ok(CamFrame {
            data,
            shape: vec![self.height, self.width, 3],
            dtype: "|u1".into(),
        })
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build the vehicle described by `params` on simulated hardware.
pub fn assemble_sim(params: &DriveExecParams) -> Result<SimVehicle, DriveError> {
    let bus = SimBus::new();
    let mut direction_pins = Vec::new();

    let vehicle = assemble(
        bus.clone(),
        params,
        |n| {
            let pin = SimOutputPin::new(n);
            direction_pins.push(pin.clone());
            Ok(pin)
        },
        Some(Box::new(TestPattern::new(64, 48))),
    )?;

    Ok(SimVehicle {
        vehicle,
        bus,
        direction_pins,
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
