//! Shared record of the transaction in flight.

use core::ptr::NonNull;

/// Which way bytes are moving; drives interrupt dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferDirection {
    /// No transaction in flight.
    Idle,
    /// Payload bytes are being sent to the device.
    Transmitting,
    /// Payload bytes are being clocked in from the device.
    Receiving,
}

/// Observable state of the transfer context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Progress {
    /// Current direction.
    pub direction: TransferDirection,
    /// Payload bytes moved so far.
    pub cursor: usize,
    /// Payload bytes in the transaction.
    pub length: usize,
}

/// The single in-flight transaction record.
///
/// `buffer` points at caller memory: the write source while `Transmitting`,
/// the read destination while `Receiving`. It is `Some` exactly when
/// `direction != Idle`.
pub(crate) struct TransferContext {
    direction: TransferDirection,
    buffer: Option<NonNull<u8>>,
    length: usize,
    cursor: usize,
    clocked: usize,
    echo_pending: bool,
}

// SAFETY: the context only lives inside a `critical_section::Mutex`, so it is
// touched by one actor at a time. The pointer it carries is dereferenced only
// while a transaction is armed. The foreground that lent the buffer holds an
// `ArmedTransfer` guard (see `engine`) for as long as the borrow lasts, and the
// guard resets the context to `Idle` when it is dropped, unwinding included.
unsafe impl Send for TransferContext {}

impl TransferContext {
    pub(crate) const fn new() -> Self {
        Self {
            direction: TransferDirection::Idle,
            buffer: None,
            length: 0,
            cursor: 0,
            clocked: 0,
            echo_pending: false,
        }
    }

    pub(crate) fn direction(&self) -> TransferDirection {
        self.direction
    }

    pub(crate) fn progress(&self) -> Progress {
        Progress {
            direction: self.direction,
            cursor: self.cursor,
            length: self.length,
        }
    }

    /// Arms a write of `data`. The slice must stay borrowed until `Idle`.
    pub(crate) fn arm_transmit(&mut self, data: &[u8]) {
        debug_assert!(!data.is_empty());
        *self = Self {
            direction: TransferDirection::Transmitting,
            buffer: Some(NonNull::from(data).cast::<u8>()),
            length: data.len(),
            ..Self::new()
        };
    }

    /// Arms a read into `buf`. The slice must stay borrowed until `Idle`.
    pub(crate) fn arm_receive(&mut self, buf: &mut [u8]) {
        debug_assert!(!buf.is_empty());
        let length = buf.len();
        *self = Self {
            direction: TransferDirection::Receiving,
            buffer: Some(NonNull::from(buf).cast::<u8>()),
            length,
            echo_pending: true,
            ..Self::new()
        };
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    /// Returns the next payload byte of a write and advances the cursor.
    pub(crate) fn next_payload_byte(&mut self) -> Option<u8> {
        if self.direction != TransferDirection::Transmitting || self.cursor >= self.length {
            return None;
        }
        let base = self.buffer?;
        // SAFETY: `cursor < length` and `base` spans `length` bytes of the
        // caller's slice, which is still borrowed while armed.
        let byte = unsafe { base.as_ptr().add(self.cursor).read() };
        self.cursor += 1;
        Some(byte)
    }

    /// Returns `true` if another dummy byte is owed to the device during a read.
    pub(crate) fn claim_dummy(&mut self) -> bool {
        if self.direction != TransferDirection::Receiving || self.clocked >= self.length {
            return false;
        }
        self.clocked += 1;
        true
    }

    /// Consumes the echo of the command byte, if it has not been seen yet.
    pub(crate) fn take_echo(&mut self) -> bool {
        core::mem::replace(&mut self.echo_pending, false)
    }

    /// Stores a received payload byte and advances the cursor.
    pub(crate) fn store_received(&mut self, byte: u8) {
        if self.direction != TransferDirection::Receiving || self.cursor >= self.length {
            return;
        }
        if let Some(base) = self.buffer {
            // SAFETY: as in `next_payload_byte`; the slice was lent mutably
            // by `arm_receive` and nothing else aliases it while armed.
            unsafe { base.as_ptr().add(self.cursor).write(byte) };
            self.cursor += 1;
        }
    }

    /// Byte-events that did work so far; grows with every echo, dummy and payload byte.
    pub(crate) fn activity(&self) -> usize {
        let echo_seen =
            self.direction == TransferDirection::Receiving && !self.echo_pending;
        self.cursor + self.clocked + usize::from(echo_seen)
    }

    /// Returns `true` once every dummy byte of a read has been handed over.
    pub(crate) fn dummies_exhausted(&self) -> bool {
        self.direction == TransferDirection::Receiving && self.clocked >= self.length
    }

    /// Drops back to `Idle` once every payload byte has moved.
    pub(crate) fn complete_if_done(&mut self) -> bool {
        if self.direction == TransferDirection::Idle || self.cursor != self.length {
            return false;
        }
        self.reset();
        true
    }
}
