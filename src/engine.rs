//! Interrupt-driven, half-duplex register transfer engine.
//!
//! A transaction has two actors. The foreground ([`Engine::read`] /
//! [`Engine::write`]) validates the request, arms the shared
//! [`TransferCell`], asserts the select line, sends the command byte and then
//! sleeps. The peripheral's interrupt vector calls
//! [`TransferCell::on_interrupt`] once per byte-boundary event; it moves one
//! byte, and on the last one returns the context to `Idle` and raises the
//! completion signal that ends the foreground's wait.
//!
//! ```ignore
//! static SPI: TransferCell<EusciB0> = TransferCell::new();
//!
//! #[interrupt]
//! fn USCI_B0() {
//!     if SPI.on_interrupt().is_resume() {
//!         msp430::asm::bic_sr_on_exit(LPM0_BITS);
//!     }
//! }
//!
//! let mut engine = Engine::new(&SPI, eusci, csb, Lpm0, Config::default())?;
//! engine.write(REG_CMD, &[CMD_SOFT_RESET])?;
//! ```

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::OutputPin;

use crate::config::Config;
use crate::context::{Progress, TransferContext, TransferDirection};
use crate::error::{Error, Result};
use crate::interface::{validate_request, Bmi2Interface};
use crate::log::{debug, trace, warn};
use crate::peripheral::{BusEvent, SpiPeripheral, WaitForInterrupt};
use crate::registers::{CommandByte, IrqSources};

/// Byte clocked out while reading so the device can shift its reply in.
pub const DUMMY_BYTE: u8 = 0x00;

/// What the interrupt vector must do when the handler returns.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wakeup {
    /// The transaction is still running; stay in low-power mode.
    Sleep,
    /// The transaction just completed; leave low-power mode on exit.
    Resume,
}

impl Wakeup {
    /// Returns `true` for [`Wakeup::Resume`].
    pub fn is_resume(self) -> bool {
        matches!(self, Self::Resume)
    }
}

struct Shared<BUS> {
    bus: Option<BUS>,
    context: TransferContext,
}

/// Process-wide transfer state shared by the foreground and the interrupt handler.
///
/// Meant to live in a `static`. Both actors reach the peripheral and the
/// context only through `critical_section::with`, which on a single-core
/// target is interrupt masking.
pub struct TransferCell<BUS> {
    shared: Mutex<RefCell<Shared<BUS>>>,
    done: Signal<CriticalSectionRawMutex, ()>,
}

impl<BUS> TransferCell<BUS> {
    /// Creates an empty cell; [`Engine::new`] installs the peripheral.
    pub const fn new() -> Self {
        Self {
            shared: Mutex::new(RefCell::new(Shared {
                bus: None,
                context: TransferContext::new(),
            })),
            done: Signal::new(),
        }
    }

    /// Current transfer direction.
    pub fn direction(&self) -> TransferDirection {
        critical_section::with(|cs| self.shared.borrow_ref(cs).context.direction())
    }

    /// Snapshot of the in-flight transaction.
    pub fn progress(&self) -> Progress {
        critical_section::with(|cs| self.shared.borrow_ref(cs).context.progress())
    }

    fn activity(&self) -> usize {
        critical_section::with(|cs| self.shared.borrow_ref(cs).context.activity())
    }

    fn install(&self, bus: BUS) -> core::result::Result<(), BUS> {
        critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            if shared.bus.is_some() {
                return Err(bus);
            }
            shared.bus = Some(bus);
            Ok(())
        })
    }

    fn take_bus(&self) -> Option<BUS> {
        critical_section::with(|cs| self.shared.borrow_ref_mut(cs).bus.take())
    }

    /// Arms the context unless a transaction is already in flight.
    fn arm<E>(&self, arm: impl FnOnce(&mut TransferContext)) -> Result<(), E> {
        critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            if shared.context.direction() != TransferDirection::Idle {
                return Err(Error::Busy);
            }
            self.done.reset();
            arm(&mut shared.context);
            Ok(())
        })
    }

    #[cfg(test)]
    fn with_context<R>(&self, f: impl FnOnce(&mut TransferContext) -> R) -> R {
        critical_section::with(|cs| f(&mut self.shared.borrow_ref_mut(cs).context))
    }

    fn with_bus<R>(&self, f: impl FnOnce(&mut BUS, &mut TransferContext) -> R) -> Option<R> {
        critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            let Shared { bus, context } = &mut *shared;
            bus.as_mut().map(|bus| f(bus, context))
        })
    }
}

impl<BUS> Default for TransferCell<BUS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<BUS: SpiPeripheral> TransferCell<BUS> {
    /// Interrupt handler body; call it from the peripheral's vector.
    ///
    /// Handles exactly one pending byte-event, never blocks, never allocates.
    pub fn on_interrupt(&self) -> Wakeup {
        let wakeup = self
            .with_bus(|bus, context| match bus.pending_event() {
                Some(event) => dispatch(context, bus, event),
                None => Wakeup::Sleep,
            })
            .unwrap_or(Wakeup::Sleep);

        if wakeup.is_resume() {
            self.done.signal(());
        }
        wakeup
    }
}

/// Advances the transaction by one byte-event.
///
/// The ready-to-transmit source is masked as soon as nothing more will be
/// sent, since it stays asserted while the transmit buffer is empty.
fn dispatch<BUS: SpiPeripheral>(
    context: &mut TransferContext,
    bus: &mut BUS,
    event: BusEvent,
) -> Wakeup {
    match (context.direction(), event) {
        (TransferDirection::Transmitting, BusEvent::TransmitReady) => {
            if let Some(byte) = context.next_payload_byte() {
                bus.transmit(byte);
            }
            let wakeup = completion(context);
            if wakeup.is_resume() {
                bus.disable_interrupts(IrqSources::transmit_only());
            }
            wakeup
        }
        // Writes only unmask the transmit source; a stray receive flag is the
        // echo of a byte we sent and carries nothing.
        (TransferDirection::Transmitting, BusEvent::ReceiveReady) => Wakeup::Sleep,
        (TransferDirection::Receiving, BusEvent::TransmitReady) => {
            if context.claim_dummy() {
                bus.transmit(DUMMY_BYTE);
            }
            if context.dummies_exhausted() {
                bus.disable_interrupts(IrqSources::transmit_only());
            }
            Wakeup::Sleep
        }
        (TransferDirection::Receiving, BusEvent::ReceiveReady) => {
            let byte = bus.receive();
            if context.take_echo() {
                return Wakeup::Sleep;
            }
            context.store_received(byte);
            completion(context)
        }
        (TransferDirection::Idle, _) => Wakeup::Sleep,
    }
}

fn completion(context: &mut TransferContext) -> Wakeup {
    if context.complete_if_done() {
        Wakeup::Resume
    } else {
        Wakeup::Sleep
    }
}

/// Keeps a lent buffer safe while a transaction is armed.
///
/// Dropping it, on any path out of [`Engine::run`] including a panic, masks
/// the transaction's interrupt sources and returns the context to `Idle`, so
/// the handler never touches the buffer after its borrow ends.
struct ArmedTransfer<'c, BUS: SpiPeripheral> {
    cell: &'c TransferCell<BUS>,
    sources: IrqSources,
}

impl<BUS: SpiPeripheral> ArmedTransfer<'_, BUS> {
    /// Disarms and reports whether the handler had already finished.
    fn disarm(&self) -> bool {
        critical_section::with(|cs| {
            let mut shared = self.cell.shared.borrow_ref_mut(cs);
            let Shared { bus, context } = &mut *shared;
            if let Some(bus) = bus.as_mut() {
                bus.disable_interrupts(self.sources);
            }
            let finished = context.direction() == TransferDirection::Idle;
            context.reset();
            finished
        })
    }

    fn finish(self) -> bool {
        let finished = self.disarm();
        core::mem::forget(self);
        finished
    }
}

impl<BUS: SpiPeripheral> Drop for ArmedTransfer<'_, BUS> {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Foreground handle that issues register reads and writes.
pub struct Engine<'a, BUS, CS, W> {
    cell: &'a TransferCell<BUS>,
    select: CS,
    waiter: W,
    config: Config,
}

impl<'a, BUS, CS, W> Engine<'a, BUS, CS, W>
where
    BUS: SpiPeripheral,
    CS: OutputPin,
    W: WaitForInterrupt,
{
    /// Installs `bus` into `cell` and deselects the device.
    ///
    /// Fails with [`Error::AlreadyInitialized`] if the cell already owns a
    /// peripheral; there is one engine per cell.
    pub fn new(
        cell: &'a TransferCell<BUS>,
        bus: BUS,
        mut select: CS,
        waiter: W,
        config: Config,
    ) -> Result<Self, CS::Error> {
        config.validate().map_err(|_| Error::InvalidConfig)?;
        select.set_high()?;
        cell.install(bus).map_err(|_| Error::AlreadyInitialized)?;

        debug!(
            "spi engine ready, max transfer {=usize} bytes",
            config.max_transfer_len
        );
        Ok(Self {
            cell,
            select,
            waiter,
            config,
        })
    }

    /// Writes `data` to consecutive registers starting at `register`.
    ///
    /// Returns once every byte is on the bus and the select line is released.
    pub fn write(&mut self, register: u8, data: &[u8]) -> Result<(), CS::Error> {
        validate_request::<CS::Error>(register, data.len(), self.config.max_transfer_len)?;
        self.cell
            .arm::<CS::Error>(|context| context.arm_transmit(data))?;
        let armed = ArmedTransfer {
            cell: self.cell,
            sources: IrqSources::transmit_only(),
        };

        trace!("spi write reg={=u8:#x} len={=usize}", register, data.len());
        self.run(CommandByte::for_write(register), armed)
    }

    /// Reads `buf.len()` consecutive registers starting at `register`.
    ///
    /// One dummy byte is clocked out per byte read.
    pub fn read(&mut self, register: u8, buf: &mut [u8]) -> Result<(), CS::Error> {
        validate_request::<CS::Error>(register, buf.len(), self.config.max_transfer_len)?;
        self.cell
            .arm::<CS::Error>(|context| context.arm_receive(&mut *buf))?;
        let armed = ArmedTransfer {
            cell: self.cell,
            sources: IrqSources::both(),
        };

        trace!("spi read reg={=u8:#x} len={=usize}", register, buf.len());
        self.run(CommandByte::for_read(register), armed)
    }

    /// Drives an armed transaction to completion.
    fn run(&mut self, command: CommandByte, armed: ArmedTransfer<'a, BUS>) -> Result<(), CS::Error> {
        self.select.set_low()?;

        let sources = armed.sources;
        self.cell.with_bus(|bus, _| {
            bus.clear_interrupts(sources);
            bus.enable_interrupts(sources);
            bus.transmit(command.into());
        });

        let waited = self.wait_for_completion();
        let finished = armed.finish();
        let outcome = match waited {
            Ok(()) => Ok(()),
            // The handler completed between the last check and the teardown.
            Err(_) if finished => {
                self.cell.done.reset();
                Ok(())
            }
            Err(err) => {
                warn!("spi transaction stalled");
                Err(err)
            }
        };
        if outcome.is_ok() {
            self.cell.with_bus(|bus, _| bus.flush());
        }

        self.select.set_high()?;
        outcome
    }

    /// Sleeps until the handler signals completion.
    ///
    /// With a wake budget, gives up after that many consecutive wakes in
    /// which the transaction did not move.
    fn wait_for_completion(&mut self) -> Result<(), CS::Error> {
        let cell = self.cell;
        let mut last_activity = cell.activity();
        let mut idle_wakes: u32 = 0;

        while !self.waiter.sleep_unless(|| cell.done.try_take().is_some()) {
            let activity = cell.activity();
            if activity != last_activity {
                last_activity = activity;
                idle_wakes = 0;
                continue;
            }

            idle_wakes = idle_wakes.saturating_add(1);
            if let Some(budget) = self.config.wake_budget {
                if idle_wakes >= budget.get() {
                    return Err(Error::Stalled);
                }
            }
        }
        Ok(())
    }

    /// Shared cell this engine drives.
    pub fn cell(&self) -> &'a TransferCell<BUS> {
        self.cell
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consumes the engine, returning the peripheral, select pin and waiter.
    pub fn release(self) -> (Option<BUS>, CS, W) {
        (self.cell.take_bus(), self.select, self.waiter)
    }
}

impl<BUS, CS, W> Bmi2Interface for Engine<'_, BUS, CS, W>
where
    BUS: SpiPeripheral,
    CS: OutputPin,
    W: WaitForInterrupt,
{
    type Error = CS::Error;

    fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.read(register, buf)
    }

    fn write_registers(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.write(register, data)
    }

    fn max_transfer_len(&self) -> usize {
        self.config.max_transfer_len
    }
}
