//! # PWM Module
//!
//! This module provides a board-independent model of PWM channels. A [`Pin`] holds the validated
//! software view of a channel (its software resolution and duty cycle) and delegates the actual
//! hardware write to a [`PinDriver`] supplied by a concrete board.
//!
//! Duty cycles are requested in software resolution and remapped to the hardware resolution of the
//! driver. When the software resolution does not divide the hardware resolution evenly the remap
//! is lossy and reading the duty cycle back may not give exactly the value that was set.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`PinDriver`] implementation for the PCA9685 16 channel PWM controller.
pub mod pca9685;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{trace, warn};

use crate::error::DriveError;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Hardware side of a single PWM channel.
pub trait PinDriver {
    /// The ID of this channel on its board.
    fn pin_number(&self) -> usize;

    /// Number of steps per PWM cycle in hardware.
    fn hardware_resolution(&self) -> u16;

    /// PWM frequency of the board this channel is on, in Hertz.
    fn frequency(&self) -> f64;

    /// Set the on time of the channel.
    ///
    /// `hw_duty_cycle` is already validated to lie in `[0, hardware_resolution]`.
    fn write_duty_cycle(&mut self, hw_duty_cycle: u16) -> Result<(), DriveError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A PWM channel with a software resolution remapped onto its hardware resolution.
pub struct Pin<D: PinDriver> {
    driver: D,

    /// Apparent resolution of the pin in software
    software_resolution: u16,

    /// Last duty cycle written, in hardware resolution
    hw_duty_cycle: u16,
}

/// An ordered set of pins addressed by index.
///
/// Pins are created with the board and never added or removed. A pin can be borrowed for
/// configuration or moved out to be bound to an actuator for the rest of its life.
pub struct PwmBoard<D: PinDriver> {
    pins: Vec<Option<Pin<D>>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<D: PinDriver> Pin<D> {
    /// Create a new pin with the given software resolution.
    ///
    /// The duty cycle of the pin is set to zero.
    pub fn new(driver: D, software_resolution: u16) -> Result<Self, DriveError> {
        let mut pin = Self {
            driver,
            software_resolution: 1,
            hw_duty_cycle: 0,
        };

        pin.set_software_resolution(software_resolution)?;
        pin.set_duty_cycle(0.0)?;

        Ok(pin)
    }

    pub fn pin_number(&self) -> usize {
        self.driver.pin_number()
    }

    pub fn hardware_resolution(&self) -> u16 {
        self.driver.hardware_resolution()
    }

    pub fn software_resolution(&self) -> u16 {
        self.software_resolution
    }

    /// PWM frequency of the board the pin is on, in Hertz.
    pub fn frequency(&self) -> f64 {
        self.driver.frequency()
    }

    /// Set the apparent resolution of the pin in software.
    ///
    /// Must be between 1 and the hardware resolution. Values which don't divide the hardware
    /// resolution are accepted but will not be mapped exactly, and a warning is logged.
    pub fn set_software_resolution(&mut self, resolution: u16) -> Result<(), DriveError> {
        let hw_res = self.hardware_resolution();

        DriveError::check_range(
            "software resolution",
            resolution as f64,
            1.0,
            hw_res as f64,
        )?;

        self.software_resolution = resolution;

        if self.is_lossy() {
            warn!(
                "Pin {}: software resolution {} is not a divisor of {}, duty cycles will not be \
                 mapped exactly",
                self.pin_number(),
                resolution,
                hw_res
            );
        }

        Ok(())
    }

    /// Returns true if the software resolution doesn't divide the hardware resolution, in which
    /// case duty cycles read back may differ from the values set.
    pub fn is_lossy(&self) -> bool {
        self.hardware_resolution() % self.software_resolution != 0
    }

    /// The current on time of the pin in software resolution.
    pub fn duty_cycle(&self) -> f64 {
        self.hw_duty_cycle as f64 * self.software_resolution as f64
            / self.hardware_resolution() as f64
    }

    /// Set the on time of the pin, between 0 and the software resolution inclusive.
    pub fn set_duty_cycle(&mut self, duty_cycle: f64) -> Result<(), DriveError> {
        DriveError::check_range(
            "duty cycle",
            duty_cycle,
            0.0,
            self.software_resolution as f64,
        )?;

        let hw_res = self.hardware_resolution();
        let hw_duty_cycle =
            (duty_cycle * hw_res as f64 / self.software_resolution as f64).round() as u16;

        trace!(
            "Pin {}: duty cycle {} -> {}/{}",
            self.pin_number(),
            duty_cycle,
            hw_duty_cycle,
            hw_res
        );

        self.driver.write_duty_cycle(hw_duty_cycle)?;
        self.hw_duty_cycle = hw_duty_cycle;

        Ok(())
    }

    /// The last duty cycle written to the hardware, in hardware resolution.
    pub fn hw_duty_cycle(&self) -> u16 {
        self.hw_duty_cycle
    }
}

impl<D: PinDriver> PwmBoard<D> {
    /// Create a board from its pins.
    ///
    /// Pins must be given in order, i.e. the pin at index `i` must report pin number `i`.
    pub fn new(pins: Vec<Pin<D>>) -> Result<Self, DriveError> {
        for (index, pin) in pins.iter().enumerate() {
            if pin.pin_number() != index {
                return Err(DriveError::InvalidPin {
                    index,
                    found: pin.pin_number(),
                });
            }
        }

        Ok(Self {
            pins: pins.into_iter().map(Some).collect(),
        })
    }

    /// Number of pins on the board.
    pub fn num_pins(&self) -> usize {
        self.pins.len()
    }

    /// Get pin `index` from the board.
    pub fn pin(&self, index: usize) -> Result<&Pin<D>, DriveError> {
        match self.pins.get(index) {
            Some(Some(p)) => Ok(p),
            Some(None) => Err(DriveError::PinInUse(index)),
            None => Err(DriveError::NoSuchPin(index)),
        }
    }

    /// Get a mutable reference to pin `index`, for example to change its software resolution.
    pub fn pin_mut(&mut self, index: usize) -> Result<&mut Pin<D>, DriveError> {
        match self.pins.get_mut(index) {
            Some(Some(p)) => Ok(p),
            Some(None) => Err(DriveError::PinInUse(index)),
            None => Err(DriveError::NoSuchPin(index)),
        }
    }

    /// Move pin `index` out of the board so it can be bound to an actuator.
    pub fn take_pin(&mut self, index: usize) -> Result<Pin<D>, DriveError> {
        match self.pins.get_mut(index) {
            Some(slot) => slot.take().ok_or(DriveError::PinInUse(index)),
            None => Err(DriveError::NoSuchPin(index)),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    /// Driver which records every value written to it.
    struct MockDriver {
        pin_number: usize,
        writes: Rc<RefCell<Vec<u16>>>,
    }

    impl MockDriver {
        fn new(pin_number: usize) -> (Self, Rc<RefCell<Vec<u16>>>) {
            let writes = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    pin_number,
                    writes: writes.clone(),
                },
                writes,
            )
        }
    }

    impl PinDriver for MockDriver {
        fn pin_number(&self) -> usize {
            self.pin_number
        }

        fn hardware_resolution(&self) -> u16 {
            4096
        }

        fn frequency(&self) -> f64 {
            60.0
        }

        fn write_duty_cycle(&mut self, hw_duty_cycle: u16) -> Result<(), DriveError> {
            self.writes.borrow_mut().push(hw_duty_cycle);
            Ok(())
        }
    }

    #[test]
    fn test_new_pin_is_off() {
        let (driver, writes) = MockDriver::new(0);
        let pin = Pin::new(driver, 4).unwrap();

        assert_eq!(*writes.borrow(), vec![0]);
        assert_eq!(pin.duty_cycle(), 0.0);
    }

    #[test]
    fn test_software_resolution_bounds() {
        let (driver, _) = MockDriver::new(0);
        assert!(Pin::new(driver, 4097).err().unwrap().is_out_of_range());

        let (driver, _) = MockDriver::new(0);
        assert!(Pin::new(driver, 0).err().unwrap().is_out_of_range());

        let (driver, _) = MockDriver::new(0);
        let mut pin = Pin::new(driver, 4096).unwrap();
        assert!(pin.set_software_resolution(5000).is_err());
        assert_eq!(pin.software_resolution(), 4096);

        // Lossy but allowed
        pin.set_software_resolution(3).unwrap();
        assert_eq!(pin.software_resolution(), 3);
    }

    #[test]
    fn test_lossy_resolution() {
        let (driver, _) = MockDriver::new(0);
        let mut pin = Pin::new(driver, 4).unwrap();
        assert!(!pin.is_lossy());

        pin.set_software_resolution(3).unwrap();
        assert!(pin.is_lossy());

        pin.set_software_resolution(4096).unwrap();
        assert!(!pin.is_lossy());

        // A rejected resolution leaves the pin as it was
        assert!(pin.set_software_resolution(0).is_err());
        assert!(!pin.is_lossy());
    }

    #[test]
    fn test_duty_cycle_remap() {
        let (driver, writes) = MockDriver::new(0);
        let mut pin = Pin::new(driver, 4).unwrap();

        pin.set_duty_cycle(2.0).unwrap();
        assert_eq!(pin.hw_duty_cycle(), 2048);
        assert_eq!(*writes.borrow().last().unwrap(), 2048);
        assert_eq!(pin.duty_cycle(), 2.0);

        pin.set_duty_cycle(4.0).unwrap();
        assert_eq!(pin.hw_duty_cycle(), 4096);
        assert_eq!(pin.duty_cycle(), 4.0);
    }

    #[test]
    fn test_lossy_duty_cycle_remap() {
        let (driver, _) = MockDriver::new(0);
        let mut pin = Pin::new(driver, 3).unwrap();

        pin.set_duty_cycle(1.0).unwrap();

        // round(4096 / 3) = 1365
        assert_eq!(pin.hw_duty_cycle(), 1365);
        assert_eq!(pin.duty_cycle(), 1365.0 * 3.0 / 4096.0);
        assert!(pin.duty_cycle() != 1.0);
    }

    #[test]
    fn test_duty_cycle_out_of_range() {
        let (driver, writes) = MockDriver::new(0);
        let mut pin = Pin::new(driver, 4).unwrap();
        pin.set_duty_cycle(1.0).unwrap();

        assert!(pin.set_duty_cycle(-0.5).unwrap_err().is_out_of_range());
        assert!(pin.set_duty_cycle(4.5).unwrap_err().is_out_of_range());
        assert!(pin.set_duty_cycle(f64::NAN).unwrap_err().is_out_of_range());

        // Nothing written and state unchanged
        assert_eq!(writes.borrow().len(), 2);
        assert_eq!(pin.duty_cycle(), 1.0);
    }

    #[test]
    fn test_board_pin_access() {
        let pins = (0..4)
            .map(|i| Pin::new(MockDriver::new(i).0, 4).unwrap())
            .collect();
        let mut board = PwmBoard::new(pins).unwrap();

        assert_eq!(board.num_pins(), 4);
        assert_eq!(board.pin(2).unwrap().pin_number(), 2);

        board.pin_mut(3).unwrap().set_software_resolution(16).unwrap();
        assert_eq!(board.pin(3).unwrap().software_resolution(), 16);

        let pin = board.take_pin(1).unwrap();
        assert_eq!(pin.pin_number(), 1);
        assert!(matches!(board.take_pin(1), Err(DriveError::PinInUse(1))));
        assert!(matches!(board.pin(1), Err(DriveError::PinInUse(1))));
        assert!(matches!(board.pin_mut(9), Err(DriveError::NoSuchPin(9))));
    }

    #[test]
    fn test_board_rejects_out_of_order_pins() {
        let pins = vec![
            Pin::new(MockDriver::new(0).0, 4).unwrap(),
            Pin::new(MockDriver::new(2).0, 4).unwrap(),
        ];

        assert!(matches!(
            PwmBoard::new(pins),
            Err(DriveError::InvalidPin { index: 1, found: 2 })
        ));
    }
}
