//! Polled SPI transport built on top of `embedded-hal` `SpiDevice`.
//!
//! Frames transactions exactly like the interrupt-driven engine (command byte
//! with the read flag in the MSB, then the payload) but lets the HAL block
//! until the transfer is done. Useful on targets without the interrupt
//! plumbing, or while bringing a board up.

use embedded_hal::spi::{Operation, SpiDevice};

use super::{validate_request, Bmi2Interface};
use crate::config::DEFAULT_MAX_TRANSFER_LEN;
use crate::error::Result;
use crate::registers::CommandByte;

/// SPI-based register interface driven by a blocking `SpiDevice`.
pub struct SpiInterface<SPI> {
    spi: SPI,
    max_transfer_len: usize,
}

impl<SPI> SpiInterface<SPI> {
    /// Creates a new interface with the default transfer limit.
    pub const fn new(spi: SPI) -> Self {
        Self::with_max_transfer_len(spi, DEFAULT_MAX_TRANSFER_LEN)
    }

    /// Creates a new interface with a custom transfer limit.
    pub const fn with_max_transfer_len(spi: SPI, max_transfer_len: usize) -> Self {
        Self {
            spi,
            max_transfer_len,
        }
    }

    /// Provides mutable access to the wrapped SPI device.
    pub fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    /// Consumes the interface and returns the owned SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> Bmi2Interface for SpiInterface<SPI>
where
    SPI: SpiDevice,
{
    type Error = SPI::Error;

    fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        validate_request::<SPI::Error>(register, buf.len(), self.max_transfer_len)?;

        let command = [u8::from(CommandByte::for_read(register))];
        let mut operations = [Operation::Write(&command), Operation::Read(buf)];
        self.spi.transaction(&mut operations)?;
        Ok(())
    }

    fn write_registers(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error> {
        validate_request::<SPI::Error>(register, data.len(), self.max_transfer_len)?;

        let command = [u8::from(CommandByte::for_write(register))];
        let mut operations = [Operation::Write(&command), Operation::Write(data)];
        self.spi.transaction(&mut operations)?;
        Ok(())
    }

    fn max_transfer_len(&self) -> usize {
        self.max_transfer_len
    }
}
