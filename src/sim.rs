//! Simulated SPI block and BMI270-like register file for host tests.
//!
//! The peripheral model is lock-step: every transmitted byte completes its
//! exchange immediately, raising "received byte available" (with the device's
//! reply) and "ready to transmit" together, receive first, as the eUSCI
//! interrupt vector orders them.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::engine::TransferCell;
use crate::peripheral::{BusEvent, SpiPeripheral, WaitForInterrupt};
use crate::registers::{CommandByte, IrqSources};

/// Value a floating MISO line reads as.
pub(crate) const IDLE_LINE: u8 = 0xFF;

/// Everything observable on the wire, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wire {
    Select,
    Deselect,
    Byte(u8),
}

struct SimState {
    regs: [u8; 128],
    wire: Vec<Wire>,
    read_padding: usize,
    stalled: bool,
    selected: bool,
    exchange: usize,
    command: Option<CommandByte>,
    enabled: IrqSources,
    rx_flag: bool,
    tx_flag: bool,
    rx_data: u8,
    flushes: usize,
}

#[derive(Clone)]
pub(crate) struct Sim(Rc<RefCell<SimState>>);

impl Sim {
    pub(crate) fn new() -> Self {
        Self(Rc::new(RefCell::new(SimState {
            regs: [0; 128],
            wire: Vec::new(),
            read_padding: 0,
            stalled: false,
            selected: false,
            exchange: 0,
            command: None,
            enabled: IrqSources::new(),
            rx_flag: false,
            tx_flag: false,
            rx_data: IDLE_LINE,
            flushes: 0,
        })))
    }

    pub(crate) fn bus(&self) -> SimBus {
        SimBus(self.clone())
    }

    pub(crate) fn pin(&self) -> SimPin {
        SimPin(self.clone())
    }

    pub(crate) fn set_registers(&self, start: u8, bytes: &[u8]) {
        let mut state = self.0.borrow_mut();
        for (offset, byte) in bytes.iter().enumerate() {
            state.regs[(start as usize + offset) & 0x7F] = *byte;
        }
    }

    pub(crate) fn registers(&self, start: u8, len: usize) -> Vec<u8> {
        let state = self.0.borrow();
        (0..len)
            .map(|offset| state.regs[(start as usize + offset) & 0x7F])
            .collect()
    }

    /// Dummy bytes the device shifts out after the command byte before real data.
    pub(crate) fn set_read_padding(&self, padding: usize) {
        self.0.borrow_mut().read_padding = padding;
    }

    /// Stops the device from completing exchanges.
    pub(crate) fn set_stalled(&self, stalled: bool) {
        self.0.borrow_mut().stalled = stalled;
    }

    pub(crate) fn take_wire(&self) -> Vec<Wire> {
        core::mem::take(&mut self.0.borrow_mut().wire)
    }

    pub(crate) fn enabled(&self) -> IrqSources {
        self.0.borrow().enabled
    }

    pub(crate) fn flushes(&self) -> usize {
        self.0.borrow().flushes
    }

    /// Forces an event pending, as if the hardware raised it.
    pub(crate) fn raise(&self, event: BusEvent, rx_data: u8) {
        let mut state = self.0.borrow_mut();
        match event {
            BusEvent::ReceiveReady => {
                state.rx_flag = true;
                state.rx_data = rx_data;
                state.enabled.set_receive(true);
            }
            BusEvent::TransmitReady => {
                state.tx_flag = true;
                state.enabled.set_transmit(true);
            }
        }
    }
}

/// Builds the wire trace of one complete transaction.
pub(crate) fn framed(bytes: &[u8]) -> Vec<Wire> {
    let mut wire = Vec::with_capacity(bytes.len() + 2);
    wire.push(Wire::Select);
    wire.extend(bytes.iter().copied().map(Wire::Byte));
    wire.push(Wire::Deselect);
    wire
}

pub(crate) struct SimBus(Sim);

impl SpiPeripheral for SimBus {
    fn transmit(&mut self, byte: u8) {
        let mut state = self.0.0.borrow_mut();
        state.wire.push(Wire::Byte(byte));
        state.tx_flag = false;
        if state.stalled {
            return;
        }

        let reply = if !state.selected {
            IDLE_LINE
        } else if state.exchange == 0 {
            state.command = Some(CommandByte::from(byte));
            IDLE_LINE
        } else {
            let command = state.command.expect("command byte recorded");
            let offset = state.exchange - 1;
            let base = command.register() as usize;
            if command.read() {
                if offset < state.read_padding {
                    0x00
                } else {
                    state.regs[(base + offset - state.read_padding) & 0x7F]
                }
            } else {
                state.regs[(base + offset) & 0x7F] = byte;
                IDLE_LINE
            }
        };

        state.exchange += 1;
        state.rx_data = reply;
        state.rx_flag = true;
        state.tx_flag = true;
    }

    fn receive(&mut self) -> u8 {
        let mut state = self.0.0.borrow_mut();
        state.rx_flag = false;
        state.rx_data
    }

    fn clear_interrupts(&mut self, sources: IrqSources) {
        let mut state = self.0.0.borrow_mut();
        if sources.receive() {
            state.rx_flag = false;
        }
        if sources.transmit() {
            state.tx_flag = false;
        }
    }

    fn enable_interrupts(&mut self, sources: IrqSources) {
        let mut state = self.0.0.borrow_mut();
        let enabled = u8::from(state.enabled) | u8::from(sources);
        state.enabled = IrqSources::from(enabled);
    }

    fn disable_interrupts(&mut self, sources: IrqSources) {
        let mut state = self.0.0.borrow_mut();
        let enabled = u8::from(state.enabled) & !u8::from(sources);
        state.enabled = IrqSources::from(enabled);
    }

    fn pending_event(&mut self) -> Option<BusEvent> {
        let mut state = self.0.0.borrow_mut();
        let enabled = state.enabled;
        let unmasked = |event: BusEvent| u8::from(event.source()) & u8::from(enabled) != 0;

        if state.rx_flag && unmasked(BusEvent::ReceiveReady) {
            state.rx_flag = false;
            return Some(BusEvent::ReceiveReady);
        }
        if state.tx_flag && unmasked(BusEvent::TransmitReady) {
            state.tx_flag = false;
            return Some(BusEvent::TransmitReady);
        }
        None
    }

    fn flush(&mut self) {
        self.0.0.borrow_mut().flushes += 1;
    }
}

pub(crate) struct SimPin(Sim);

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.0.borrow_mut();
        state.selected = true;
        state.exchange = 0;
        state.command = None;
        state.wire.push(Wire::Select);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.0.borrow_mut();
        if state.selected {
            state.wire.push(Wire::Deselect);
        }
        state.selected = false;
        Ok(())
    }
}

/// Stands in for the low-power wait: each wake services one interrupt.
pub(crate) struct SimIrq<'a> {
    cell: &'a TransferCell<SimBus>,
    wakes: usize,
}

impl<'a> SimIrq<'a> {
    pub(crate) fn new(cell: &'a TransferCell<SimBus>) -> Self {
        Self { cell, wakes: 0 }
    }
}

impl WaitForInterrupt for SimIrq<'_> {
    fn sleep_unless(&mut self, ready: impl FnOnce() -> bool) -> bool {
        if ready() {
            return true;
        }
        self.wakes += 1;
        assert!(self.wakes < 100_000, "transaction never completed");
        let _ = self.cell.on_interrupt();
        false
    }
}

/// MSP430 LPM0 model.
///
/// Interrupts that fire before the wait masks them are serviced first (`early`
/// of them on the first call), and a sleep only ends when a handler asks to
/// resume.
pub(crate) struct Lpm0Irq<'a> {
    cell: &'a TransferCell<SimBus>,
    early: usize,
    sleeps: usize,
}

impl<'a> Lpm0Irq<'a> {
    pub(crate) fn new(cell: &'a TransferCell<SimBus>, early: usize) -> Self {
        Self {
            cell,
            early,
            sleeps: 0,
        }
    }
}

impl WaitForInterrupt for Lpm0Irq<'_> {
    fn sleep_unless(&mut self, ready: impl FnOnce() -> bool) -> bool {
        for _ in 0..core::mem::take(&mut self.early) {
            let _ = self.cell.on_interrupt();
        }
        if ready() {
            return true;
        }
        loop {
            self.sleeps += 1;
            assert!(self.sleeps < 100_000, "foreground never woken");
            if self.cell.on_interrupt().is_resume() {
                return false;
            }
        }
    }
}
