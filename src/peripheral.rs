//! Hardware boundary consumed by the transfer engine.
//!
//! The engine never touches registers directly. A board support crate
//! implements [`SpiPeripheral`] for its SPI block (for example the eUSCI_B
//! module of an MSP430) and [`WaitForInterrupt`] for its low-power wait. The
//! select line is any `embedded-hal` [`OutputPin`](embedded_hal::digital::OutputPin).

use crate::registers::IrqSources;

/// Interrupt vector value when nothing is pending.
pub const VECTOR_NONE: u16 = 0x00;
/// Interrupt vector value for "received byte available".
pub const VECTOR_RECEIVE: u16 = 0x02;
/// Interrupt vector value for "ready to transmit the next byte".
pub const VECTOR_TRANSMIT: u16 = 0x04;

/// Byte-boundary event raised by the SPI peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusEvent {
    /// A byte has been shifted in and can be read.
    ReceiveReady,
    /// The transmit buffer can accept the next byte.
    TransmitReady,
}

impl BusEvent {
    /// Decodes an interrupt vector register value.
    ///
    /// Returns `None` for [`VECTOR_NONE`] and for values the engine does not handle.
    pub const fn from_vector(vector: u16) -> Option<Self> {
        match vector {
            VECTOR_RECEIVE => Some(Self::ReceiveReady),
            VECTOR_TRANSMIT => Some(Self::TransmitReady),
            _ => None,
        }
    }

    /// Interrupt source that raises this event.
    pub fn source(self) -> IrqSources {
        match self {
            Self::ReceiveReady => IrqSources::new().with_receive(true),
            Self::TransmitReady => IrqSources::new().with_transmit(true),
        }
    }
}

/// Byte-at-a-time access to an SPI controller with completion interrupts.
///
/// Every method is called with interrupts masked, either from the transfer
/// interrupt itself or from inside a critical section in the foreground.
pub trait SpiPeripheral {
    /// Places one byte in the transmit buffer.
    fn transmit(&mut self, byte: u8);

    /// Reads the last byte shifted in.
    fn receive(&mut self) -> u8;

    /// Clears stale flags of the given sources.
    fn clear_interrupts(&mut self, sources: IrqSources);

    /// Unmasks the given sources.
    fn enable_interrupts(&mut self, sources: IrqSources);

    /// Masks the given sources.
    fn disable_interrupts(&mut self, sources: IrqSources);

    /// Returns and acknowledges the highest-priority pending, enabled event.
    ///
    /// On an eUSCI block this is a read of `UCBxIV` passed through
    /// [`BusEvent::from_vector`].
    fn pending_event(&mut self) -> Option<BusEvent>;

    /// Blocks until the last byte has left the shift register.
    fn flush(&mut self);
}

/// Low-power wait used by the foreground while a transaction runs.
pub trait WaitForInterrupt {
    /// Evaluates `ready` with interrupts masked and sleeps if it returned `false`.
    ///
    /// The unmask and the sleep that follow a `false` must be one atomic step
    /// (`bis.w #LPM0|GIE, SR` on MSP430; `cpsid i`, check, `wfi`, `cpsie i` on
    /// Cortex-M). A completion that lands before the check is then seen by
    /// `ready`, and one that lands after it ends the sleep. Returning after any
    /// serviced interrupt is allowed.
    ///
    /// Returns what `ready` returned.
    fn sleep_unless(&mut self, ready: impl FnOnce() -> bool) -> bool;
}
