#![cfg_attr(not(test), no_std)]
//! Interrupt-driven SPI register transfers for the Bosch BMI270 IMU.
//!
//! [`Engine`] performs one register read or write at a time over an
//! interrupt-driven SPI block, sleeping between bytes while
//! [`TransferCell::on_interrupt`] moves data from the interrupt vector.
//! [`interface::spi::SpiInterface`] offers the same framing over a blocking
//! `embedded-hal` `SpiDevice`, and [`Bmi270`] sits on top of either.

mod error;
mod log;

pub mod config;
pub mod context;
pub mod delay;
pub mod device;
pub mod engine;
pub mod interface;
pub mod peripheral;
pub mod registers;
pub mod status;

#[cfg(test)]
mod sim;

pub use crate::config::Config;
pub use crate::context::TransferDirection;
pub use crate::delay::CalibratedDelay;
pub use crate::device::Bmi270;
pub use crate::engine::{Engine, TransferCell, Wakeup};
pub use crate::error::{Error, Result};
pub use crate::interface::Bmi2Interface;
pub use crate::status::Bmi2Status;
