//! Bit-level encodings shared by the engine and the BMI270 layer.
#![allow(unused_parens)]

use modular_bitfield::prelude::*;

/// Register address of `CHIP_ID`.
pub const REG_CHIP_ID: u8 = 0x00;
/// Register address of `ERR_REG`.
pub const REG_ERR: u8 = 0x02;
/// Register address of `STATUS`.
pub const REG_STATUS: u8 = 0x03;
/// Register address of `ACC_X_LSB`, first of the six accelerometer data bytes.
pub const REG_ACC_X_LSB: u8 = 0x0C;
/// Register address of `GYR_X_LSB`, first of the six gyroscope data bytes.
pub const REG_GYR_X_LSB: u8 = 0x12;
/// Register address of `CMD`.
pub const REG_CMD: u8 = 0x7E;

/// Value read back from `CHIP_ID` on a BMI270.
pub const EXPECTED_CHIP_ID: u8 = 0x24;
/// Soft reset command value written to `CMD`.
pub const CMD_SOFT_RESET: u8 = 0xB6;

/// Highest register index reachable with a 7-bit address.
pub const MAX_REGISTER: u8 = 0x7F;

/// First byte of every SPI transaction: register address plus direction flag.
///
/// Bits 6:0 carry the register, bit 7 is set for reads and clear for writes.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandByte {
    // Register index (bits 6:0).
    pub register: B7,
    // Read flag (bit 7).
    pub read: bool,
}

impl CommandByte {
    /// Command byte that starts a read at `register`.
    pub fn for_read(register: u8) -> Self {
        Self::new().with_register(register & MAX_REGISTER).with_read(true)
    }

    /// Command byte that starts a write at `register`.
    pub fn for_write(register: u8) -> Self {
        Self::new().with_register(register & MAX_REGISTER).with_read(false)
    }
}

impl From<u8> for CommandByte {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<CommandByte> for u8 {
    fn from(value: CommandByte) -> Self {
        value.into_bytes()[0]
    }
}

/// Interrupt-enable sources of the SPI peripheral (`UCBxIE` layout).
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqSources {
    // Receive buffer full (bit 0).
    pub receive: bool,
    // Transmit buffer empty (bit 1).
    pub transmit: bool,
    #[skip]
    __: B6,
}

impl IrqSources {
    /// Only the ready-to-transmit source; used by writes.
    pub fn transmit_only() -> Self {
        Self::new().with_transmit(true)
    }

    /// Both sources; used by reads.
    pub fn both() -> Self {
        Self::new().with_receive(true).with_transmit(true)
    }

    /// Returns `true` when no source is selected.
    pub fn is_empty(self) -> bool {
        !self.receive() && !self.transmit()
    }
}

impl From<u8> for IrqSources {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<IrqSources> for u8 {
    fn from(value: IrqSources) -> Self {
        value.into_bytes()[0]
    }
}
