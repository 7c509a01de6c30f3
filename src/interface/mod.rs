//! Register read/write contract consumed by the BMI2 sensor API layer.

pub mod spi;

use crate::error::{Error, Result};
use crate::registers::MAX_REGISTER;

/// Abstraction over the register access the sensor layer needs.
///
/// Mirrors the `read`/`write`/`read_write_len` callbacks of the BMI2 sensor
/// API; `delay_us` is covered separately by `embedded_hal::delay::DelayNs`.
pub trait Bmi2Interface {
    /// Error type produced by the concrete hardware.
    type Error;

    /// Reads `buf.len()` bytes starting at `register`.
    fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes `data` starting at `register`.
    fn write_registers(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Longest payload accepted by a single call.
    fn max_transfer_len(&self) -> usize;

    /// Reads a single register.
    fn read_register(&mut self, register: u8) -> Result<u8, Self::Error> {
        let mut value = [0u8; 1];
        self.read_registers(register, &mut value)?;
        Ok(value[0])
    }

    /// Writes a single register.
    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        self.write_registers(register, core::slice::from_ref(&value))
    }
}

/// Rejects requests the bus cannot express before any pin is touched.
pub(crate) fn validate_request<E>(register: u8, len: usize, max_len: usize) -> Result<(), E> {
    if register > MAX_REGISTER || len == 0 || len > max_len {
        return Err(Error::InvalidArgument);
    }
    Ok(())
}
