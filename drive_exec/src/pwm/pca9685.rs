//! [`PinDriver`] implementation for the PCA9685 driver
//!
//! The PCA9685 is a 16 channel, 12 bit PWM controller on the I2C bus. Each channel has a pair of
//! two byte ON and OFF registers giving the step in the cycle at which the output turns on and
//! off. To spread the current draw across the cycle each channel starts its pulse at a fixed
//! offset proportional to its pin number.
//!
//! All two byte registers are written as two single byte transactions, low byte first. Block
//! writes don't behave reliably on the target bus so they are never used.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{cell::RefCell, fmt::Debug, rc::Rc, thread, time::Duration};

use embedded_hal::blocking::i2c::{Write, WriteRead};
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use super::{Pin, PinDriver, PwmBoard};
use crate::error::DriveError;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// I2C address of a board with no address jumpers bridged.
pub const BASE_ADDRESS: u8 = 0x40;

/// Largest jumper offset that still gives a 7 bit address.
pub const MAX_JUMPER_ADDRESS: u8 = 0x3F;

/// Number of PWM channels on the chip.
pub const NUM_PINS: usize = 16;

/// Steps per PWM cycle. Writing this value to an ON register holds the channel fully on.
pub const PIN_RESOLUTION: u16 = 0x1000;

/// Frequency of the internal oscillator in Hertz.
const OSC_CLOCK_HZ: f64 = 25_000_000.0;

/// Smallest and largest prescale values the chip accepts.
const PRESCALE_RANGE: (u8, u8) = (3, 255);

/// Time for the oscillator to stabilise after waking from sleep.
const OSC_SETTLE_DELAY: Duration = Duration::from_micros(500);

/// First register of channel 0. Each channel has 4 registers: ON_L, ON_H, OFF_L, OFF_H.
const FIRST_LED_REGISTER: u8 = 0x06;

/// Bit masks for the MODE1 register
pub mod mode1 {
    pub const ALLCALL: u8 = 1 << 0;
    pub const SUB3: u8 = 1 << 1;
    pub const SUB2: u8 = 1 << 2;
    pub const SUB1: u8 = 1 << 3;
    pub const SLEEP: u8 = 1 << 4;
    pub const AI: u8 = 1 << 5;
    pub const EXTCLK: u8 = 1 << 6;
    pub const RESTART: u8 = 1 << 7;
}

/// Bit masks for the MODE2 register
pub mod mode2 {
    pub const OUTNE0: u8 = 1 << 0;
    pub const OUTNE1: u8 = 1 << 1;
    pub const OUTDRV: u8 = 1 << 2;
    pub const OCH: u8 = 1 << 3;
    pub const INVRT: u8 = 1 << 4;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Single byte configuration registers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Mode1 = 0x00,
    Mode2 = 0x01,
    SubAdr1 = 0x02,
    SubAdr2 = 0x03,
    SubAdr3 = 0x04,
    AllCallAdr = 0x05,
    AllLedOnL = 0xFA,
    AllLedOnH = 0xFB,
    AllLedOffL = 0xFC,
    AllLedOffH = 0xFD,
    Prescale = 0xFE,
    TestMode = 0xFF,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Construction options for a [`Pca9685`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Pca9685Config {
    /// Offset soldered onto the board's address jumpers, added to [`BASE_ADDRESS`].
    pub jumper_address: u8,

    /// PWM frequency in Hertz.
    pub frequency_hz: f64,

    /// Initial software resolution of every pin. Can be changed per pin afterwards.
    pub duty_cycle_res: u16,

    /// Number of channels to expose.
    pub num_pins: usize,
}

/// A PCA9685 board.
///
/// The board owns the bus handle. Pins taken from the board keep a shared reference to it, so the
/// bus lives as long as any of its pins. There is no locking: all access must happen from one
/// execution context.
pub struct Pca9685<I2C>
where
    Pca9685Channel<I2C>: PinDriver,
{
    bus: Rc<RefCell<Pca9685Bus<I2C>>>,

    board: PwmBoard<Pca9685Channel<I2C>>,
}

/// One channel of a [`Pca9685`].
pub struct Pca9685Channel<I2C> {
    bus: Rc<RefCell<Pca9685Bus<I2C>>>,

    pin_number: usize,

    /// Step at which this channel's pulse starts
    start_delay: u16,

    on_register: u8,
    off_register: u8,
}

/// Register level access to the chip, shared by the board and all of its channels.
struct Pca9685Bus<I2C> {
    i2c: I2C,
    address: u8,
    frequency_hz: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Pca9685Config {
    fn default() -> Self {
        Self {
            jumper_address: 0,
            frequency_hz: 60.0,
            duty_cycle_res: 4,
            num_pins: NUM_PINS,
        }
    }
}

impl<I2C, E> Pca9685<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    /// Initialise the board.
    ///
    /// This sets the PWM frequency, enables the all-call address, configures the outputs as totem
    /// pole drivers and staggers the start of every channel.
    pub fn new(i2c: I2C, config: &Pca9685Config) -> Result<Self, DriveError> {
        DriveError::check_range(
            "jumper address",
            config.jumper_address as f64,
            0.0,
            MAX_JUMPER_ADDRESS as f64,
        )?;
        DriveError::check_range("pin count", config.num_pins as f64, 1.0, NUM_PINS as f64)?;

        let mut bus = Pca9685Bus {
            i2c,
            address: BASE_ADDRESS + config.jumper_address,
            frequency_hz: 0.0,
        };

        info!("Initialising PCA9685 at address {:#04x}", bus.address);

        bus.set_frequency(config.frequency_hz)?;
        bus.write_register(Register::Mode1 as u8, mode1::ALLCALL)?;
        bus.write_register(Register::Mode2 as u8, mode2::OUTDRV)?;

        let bus = Rc::new(RefCell::new(bus));

        let mut pins = Vec::with_capacity(config.num_pins);
        for pin_number in 0..config.num_pins {
            let channel = Pca9685Channel::new(bus.clone(), pin_number, config.num_pins)?;
            pins.push(Pin::new(channel, config.duty_cycle_res)?);
        }

        Ok(Self {
            bus,
            board: PwmBoard::new(pins)?,
        })
    }

    /// The I2C address of the board (base address plus jumper offset).
    pub fn address(&self) -> u8 {
        self.bus.borrow().address
    }

    /// The PWM frequency of the board in Hertz.
    pub fn frequency(&self) -> f64 {
        self.bus.borrow().frequency_hz
    }

    /// Change the PWM frequency of the board.
    ///
    /// If a bus write fails part way through, the chip is left in whatever state the last
    /// successful write produced.
    pub fn set_frequency(&mut self, frequency_hz: f64) -> Result<(), DriveError> {
        self.bus.borrow_mut().set_frequency(frequency_hz)
    }

    pub fn num_pins(&self) -> usize {
        self.board.num_pins()
    }

    pub fn pin(&self, index: usize) -> Result<&Pin<Pca9685Channel<I2C>>, DriveError> {
        self.board.pin(index)
    }

    pub fn pin_mut(&mut self, index: usize) -> Result<&mut Pin<Pca9685Channel<I2C>>, DriveError> {
        self.board.pin_mut(index)
    }

    /// Move a pin out of the board to bind it to an actuator.
    pub fn take_pin(&mut self, index: usize) -> Result<Pin<Pca9685Channel<I2C>>, DriveError> {
        self.board.take_pin(index)
    }
}

impl<I2C, E> Pca9685Channel<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    fn new(
        bus: Rc<RefCell<Pca9685Bus<I2C>>>,
        pin_number: usize,
        num_pins: usize,
    ) -> Result<Self, DriveError> {
        let start_delay = start_delay(pin_number, num_pins);
        let on_register = FIRST_LED_REGISTER + 4 * pin_number as u8;

        let channel = Self {
            bus,
            pin_number,
            start_delay,
            on_register,
            off_register: on_register + 2,
        };

        channel
            .bus
            .borrow_mut()
            .write_register_pair(channel.on_register, channel.start_delay)?;

        Ok(channel)
    }

    /// Step within the cycle at which this channel's pulse starts.
    pub fn start_delay(&self) -> u16 {
        self.start_delay
    }
}

impl<I2C, E> PinDriver for Pca9685Channel<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    fn pin_number(&self) -> usize {
        self.pin_number
    }

    fn hardware_resolution(&self) -> u16 {
        PIN_RESOLUTION
    }

    fn frequency(&self) -> f64 {
        self.bus.borrow().frequency_hz
    }

    fn write_duty_cycle(&mut self, hw_duty_cycle: u16) -> Result<(), DriveError> {
        let mut bus = self.bus.borrow_mut();

        // Fully on is encoded in the ON register alone
        if hw_duty_cycle == PIN_RESOLUTION {
            bus.write_register_pair(self.on_register, PIN_RESOLUTION)
        } else {
            // The pulse may wrap past the end of the cycle
            bus.write_register_pair(self.on_register, self.start_delay)?;
            bus.write_register_pair(
                self.off_register,
                (self.start_delay + hw_duty_cycle) % PIN_RESOLUTION,
            )
        }
    }
}

impl<I2C, E> Pca9685Bus<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    fn read_register(&mut self, register: u8) -> Result<u8, DriveError> {
        let mut buf = [0u8];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .map_err(|e| DriveError::I2c(format!("{:?}", e)))?;

        trace!("{:#04x}: read  [{:#04x}] = {:#04x}", self.address, register, buf[0]);

        Ok(buf[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), DriveError> {
        trace!("{:#04x}: write [{:#04x}] = {:#04x}", self.address, register, value);

        self.i2c
            .write(self.address, &[register, value])
            .map_err(|e| DriveError::I2c(format!("{:?}", e)))
    }

    /// Write a two byte register, low byte first.
    fn write_register_pair(&mut self, register: u8, value: u16) -> Result<(), DriveError> {
        DriveError::check_range("register value", value as f64, 0.0, PIN_RESOLUTION as f64)?;

        let [low, high] = value.to_le_bytes();
        self.write_register(register, low)?;
        self.write_register(register + 1, high)
    }

    fn set_frequency(&mut self, frequency_hz: f64) -> Result<(), DriveError> {
        let prescale = prescale(frequency_hz)?;

        debug!(
            "{:#04x}: setting frequency to {} Hz (prescale {})",
            self.address, frequency_hz, prescale
        );

        // Never write the restart bit back as read
        let mut mode = self.read_register(Register::Mode1 as u8)? & !mode1::RESTART;

        // The prescaler can only be written while the oscillator is off
        self.write_register(Register::Mode1 as u8, mode | mode1::SLEEP)?;
        self.write_register(Register::Prescale as u8, prescale)?;

        mode &= !mode1::SLEEP;
        self.write_register(Register::Mode1 as u8, mode)?;
        thread::sleep(OSC_SETTLE_DELAY);
        self.write_register(Register::Mode1 as u8, mode | mode1::RESTART)?;

        self.frequency_hz = frequency_hz;

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Step in the cycle at which pin `pin_number` starts its pulse.
pub fn start_delay(pin_number: usize, num_pins: usize) -> u16 {
    (pin_number * PIN_RESOLUTION as usize / num_pins) as u16
}

/// Calculate the prescale register value for the given frequency.
pub fn prescale(frequency_hz: f64) -> Result<u8, DriveError> {
    let prescale = (OSC_CLOCK_HZ / (PIN_RESOLUTION as f64 * frequency_hz)).round() - 1.0;

    if prescale >= PRESCALE_RANGE.0 as f64 && prescale <= PRESCALE_RANGE.1 as f64 {
        Ok(prescale as u8)
    } else {
        // Report the limits in terms of the frequency the caller asked for
        let freq_for = |p: u8| OSC_CLOCK_HZ / (PIN_RESOLUTION as f64 * (p as f64 + 1.0));
        Err(DriveError::OutOfRange {
            name: "PWM frequency",
            value: frequency_hz,
            min: freq_for(PRESCALE_RANGE.1),
            max: freq_for(PRESCALE_RANGE.0),
        })
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
