//! Calibrated busy-wait delay.
//!
//! The sensor's bring-up sequence needs microsecond pauses between commands
//! that are never shorter than asked for. [`CalibratedDelay`] spins a fixed
//! number of CPU cycles per microsecond, established once from the core
//! clock frequency. It does not depend on the transfer interrupt, so it keeps
//! counting while a transaction is in flight.

use embedded_hal::delay::DelayNs;

/// One iteration of the busy loop, nominally one CPU cycle.
pub trait SpinCycle {
    /// Burns one cycle.
    fn spin(&mut self);
}

/// Default spinner: an opaque no-op the optimizer cannot remove.
#[derive(Debug, Default, Clone, Copy)]
pub struct NopSpin;

impl SpinCycle for NopSpin {
    #[inline(always)]
    fn spin(&mut self) {
        core::hint::black_box(());
    }
}

/// Busy-wait delay scaled by a cycles-per-microsecond factor.
#[derive(Debug, Clone, Copy)]
pub struct CalibratedDelay<S = NopSpin> {
    cycles_per_us: u32,
    spinner: S,
}

impl CalibratedDelay<NopSpin> {
    /// Derives the factor from the core clock, rounding up so delays never undershoot.
    pub fn from_clock_hz(clock_hz: u32) -> Self {
        Self::new(clock_hz.div_ceil(1_000_000), NopSpin)
    }
}

impl<S: SpinCycle> CalibratedDelay<S> {
    /// Creates a delay with an explicit factor; a factor of zero is raised to one.
    pub fn new(cycles_per_us: u32, spinner: S) -> Self {
        Self {
            cycles_per_us: cycles_per_us.max(1),
            spinner,
        }
    }

    /// Cycles spun per microsecond.
    pub fn cycles_per_us(&self) -> u32 {
        self.cycles_per_us
    }

    /// Cycles needed to cover `ns` nanoseconds, rounded up.
    pub fn cycles_for_ns(&self, ns: u32) -> u64 {
        (u64::from(ns) * u64::from(self.cycles_per_us)).div_ceil(1_000)
    }

    /// Consumes the delay and returns the spinner.
    pub fn release(self) -> S {
        self.spinner
    }

    fn spin_cycles(&mut self, cycles: u64) {
        let mut remaining = cycles;
        while remaining != 0 {
            self.spinner.spin();
            remaining -= 1;
        }
    }
}

impl<S: SpinCycle> DelayNs for CalibratedDelay<S> {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = self.cycles_for_ns(ns);
        self.spin_cycles(cycles);
    }

    fn delay_us(&mut self, us: u32) {
        let cycles = u64::from(us) * u64::from(self.cycles_per_us);
        self.spin_cycles(cycles);
    }

    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1_000);
        }
    }
}
