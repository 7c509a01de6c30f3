//! Thin BMI270 layer on top of the register interface.
//!
//! Only the pieces every bring-up needs live here: switching the sensor into
//! SPI mode, checking its identity, soft reset, and raw data reads. Feature
//! configuration and the configuration-file upload belong to the sensor API.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;

use crate::error::{Error, Result};
use crate::interface::spi::SpiInterface;
use crate::interface::Bmi2Interface;
use crate::registers::{
    CMD_SOFT_RESET,
    EXPECTED_CHIP_ID,
    REG_ACC_X_LSB,
    REG_CHIP_ID,
    REG_CMD,
    REG_GYR_X_LSB,
};

// Datasheet power-on-reset to first access delay (microseconds).
const POWER_UP_DELAY_US: u32 = 450;
// Delay after a soft reset before the sensor accepts commands (microseconds).
const SOFT_RESET_DELAY_US: u32 = 2_000;
// The BMI270 shifts out one dummy byte before read data over SPI.
const SPI_READ_DUMMY_BYTES: usize = 1;
// Largest burst this layer reads in one go, dummy byte included.
const SCRATCH_LEN: usize = 16;
// Number of consecutive bytes spanning X, Y, Z axis samples.
const RAW_AXIS_BYTES: usize = 6;

/// BMI270 driver over any [`Bmi2Interface`] transport.
pub struct Bmi270<IFACE> {
    interface: IFACE,
}

impl<IFACE> Bmi270<IFACE> {
    /// Creates a new driver instance from the provided register interface.
    pub fn new(interface: IFACE) -> Self {
        Self { interface }
    }

    /// Consumes the driver and returns the owned interface.
    pub fn release(self) -> IFACE {
        self.interface
    }

    /// Provides mutable access to the underlying interface.
    pub fn interface_mut(&mut self) -> &mut IFACE {
        &mut self.interface
    }
}

impl<SPI> Bmi270<SpiInterface<SPI>>
where
    SPI: SpiDevice,
{
    /// Convenience constructor for the polled SPI transport.
    pub fn new_spi(spi: SPI) -> Self {
        Self::new(SpiInterface::new(spi))
    }
}

impl<IFACE, CommE> Bmi270<IFACE>
where
    IFACE: Bmi2Interface<Error = CommE>,
{
    /// Brings the sensor up in SPI mode and verifies its identity.
    ///
    /// The BMI270 powers up in I²C mode and latches SPI on the first rising
    /// edge of CSB, so one throwaway read comes first.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Result<u8, CommE> {
        delay.delay_us(POWER_UP_DELAY_US);
        self.chip_id()?;
        self.check_chip_id()
    }

    /// Reads `CHIP_ID`.
    pub fn chip_id(&mut self) -> Result<u8, CommE> {
        let mut id = [0u8; 1];
        self.read_burst(REG_CHIP_ID, &mut id)?;
        Ok(id[0])
    }

    /// Reads `CHIP_ID` and fails with [`Error::DeviceNotFound`] unless it is a BMI270.
    pub fn check_chip_id(&mut self) -> Result<u8, CommE> {
        let id = self.chip_id()?;
        if id != EXPECTED_CHIP_ID {
            return Err(Error::DeviceNotFound);
        }
        Ok(id)
    }

    /// Issues a soft reset and re-enters SPI mode.
    pub fn soft_reset(&mut self, delay: &mut impl DelayNs) -> Result<(), CommE> {
        self.interface.write_register(REG_CMD, CMD_SOFT_RESET)?;
        delay.delay_us(SOFT_RESET_DELAY_US);
        self.chip_id()?;
        Ok(())
    }

    /// Reads a raw accelerometer triplet.
    pub fn read_accel_raw(&mut self) -> Result<[i16; 3], CommE> {
        self.read_axes(REG_ACC_X_LSB)
    }

    /// Reads a raw gyroscope triplet.
    pub fn read_gyro_raw(&mut self) -> Result<[i16; 3], CommE> {
        self.read_axes(REG_GYR_X_LSB)
    }

    fn read_axes(&mut self, register: u8) -> Result<[i16; 3], CommE> {
        let mut raw = [0u8; RAW_AXIS_BYTES];
        self.read_burst(register, &mut raw)?;

        let x = i16::from_le_bytes([raw[0], raw[1]]);
        let y = i16::from_le_bytes([raw[2], raw[3]]);
        let z = i16::from_le_bytes([raw[4], raw[5]]);
        Ok([x, y, z])
    }

    /// Reads registers, dropping the dummy byte the sensor sends first.
    fn read_burst(&mut self, register: u8, out: &mut [u8]) -> Result<(), CommE> {
        let len = out.len() + SPI_READ_DUMMY_BYTES;
        if len > SCRATCH_LEN {
            return Err(Error::InvalidArgument);
        }

        let mut scratch = [0u8; SCRATCH_LEN];
        self.interface.read_registers(register, &mut scratch[..len])?;
        out.copy_from_slice(&scratch[SPI_READ_DUMMY_BYTES..len]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::{Engine, TransferCell};
    use crate::sim::{framed, Sim, SimIrq};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};
    use std::vec;

    fn bmi270_sim() -> Sim {
        let sim = Sim::new();
        sim.set_read_padding(SPI_READ_DUMMY_BYTES);
        sim.set_registers(REG_CHIP_ID, &[EXPECTED_CHIP_ID]);
        sim
    }

    #[test]
    fn init_switches_to_spi_and_checks_identity() {
        let sim = bmi270_sim();
        let cell = TransferCell::new();
        let engine =
            Engine::new(&cell, sim.bus(), sim.pin(), SimIrq::new(&cell), Config::default()).unwrap();
        let mut sensor = Bmi270::new(engine);

        assert_eq!(sensor.init(&mut NoopDelay::new()), Ok(EXPECTED_CHIP_ID));

        let mut expected = framed(&[0x80, 0x00, 0x00]);
        expected.extend(framed(&[0x80, 0x00, 0x00]));
        assert_eq!(sim.take_wire(), expected);
    }

    #[test]
    fn wrong_chip_id_is_device_not_found() {
        let sim = bmi270_sim();
        sim.set_registers(REG_CHIP_ID, &[0x43]);
        let cell = TransferCell::new();
        let engine =
            Engine::new(&cell, sim.bus(), sim.pin(), SimIrq::new(&cell), Config::default()).unwrap();
        let mut sensor = Bmi270::new(engine);

        assert_eq!(sensor.init(&mut NoopDelay::new()), Err(Error::DeviceNotFound));
    }

    #[test]
    fn accel_and_gyro_reads_decode_little_endian() {
        let sim = bmi270_sim();
        sim.set_registers(REG_ACC_X_LSB, &[0x01, 0x00, 0xFF, 0xFF, 0x00, 0x40]);
        sim.set_registers(REG_GYR_X_LSB, &[0x10, 0x27, 0xF0, 0xD8, 0x00, 0x80]);
        let cell = TransferCell::new();
        let engine =
            Engine::new(&cell, sim.bus(), sim.pin(), SimIrq::new(&cell), Config::default()).unwrap();
        let mut sensor = Bmi270::new(engine);

        assert_eq!(sensor.read_accel_raw(), Ok([1, -1, 16_384]));
        assert_eq!(sensor.read_gyro_raw(), Ok([10_000, -10_000, i16::MIN]));
    }

    #[test]
    fn soft_reset_over_polled_spi() {
        let expectations: [SpiTransaction<u8>; 8] = [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![REG_CMD]),
            SpiTransaction::write_vec(vec![CMD_SOFT_RESET]),
            SpiTransaction::transaction_end(),
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x80]),
            SpiTransaction::read_vec(vec![0x00, EXPECTED_CHIP_ID]),
            SpiTransaction::transaction_end(),
        ];
        let mut sensor = Bmi270::new_spi(SpiMock::new(&expectations));

        assert!(sensor.soft_reset(&mut NoopDelay::new()).is_ok());

        sensor.release().release().done();
    }
}
