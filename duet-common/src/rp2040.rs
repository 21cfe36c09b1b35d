// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! RP2040 bindings: retained flags in the watchdog scratch registers, reset cause,
//! watchdog-triggered soft reset and dormant deep sleep.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use rp2040_hal as hal;

use crate::boot::{ResetCause, ResetController, WakeSource};
use crate::layout::{RAM_WAKE_FLAG_ADDR, RAM_WAKE_MAGIC, STORE_WORDS};
use crate::log;
use crate::mode::IndicatorState;
use crate::store::RetainedMemory;
use crate::supervisor::{Indicators, Watchdog};

pub type LedPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio25, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>;
pub type TriggerPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio2, hal::gpio::FunctionSioInput, hal::gpio::PullUp>;

/// GPIO number of the update trigger line (active low, pull-up).
pub const TRIGGER_GPIO: u32 = 2;

const WATCHDOG_BASE: u32 = 0x4005_8000;
const WATCHDOG_CTRL: *mut u32 = WATCHDOG_BASE as *mut u32;
const WATCHDOG_REASON: *const u32 = (WATCHDOG_BASE + 0x08) as *const u32;
const WATCHDOG_SCRATCH0: u32 = WATCHDOG_BASE + 0x0C;

const WATCHDOG_CTRL_TRIGGER: u32 = 1 << 31;
const WATCHDOG_CTRL_ENABLE: u32 = 1 << 30;
const WATCHDOG_REASON_TIMER: u32 = 1 << 0;
const WATCHDOG_REASON_FORCE: u32 = 1 << 1;

const PSM_WDSEL: *mut u32 = (0x4001_0000 + 0x08) as *mut u32;
/// Everything except ROSC and XOSC.
const PSM_WDSEL_ALL_BUT_OSC: u32 = 0x0001_FFFC;

const CHIP_RESET: *const u32 = (0x4006_4000 + 0x08) as *const u32;
const CHIP_RESET_HAD_RUN: u32 = 1 << 16;

// --- Retained flag region ---

/// Watchdog `SCRATCH0..3`. Survive watchdog resets, cleared by power-on.
pub struct ScratchRetained {
    _private: (),
}

impl ScratchRetained {
    /// # Safety
    /// Caller must be the only user of `SCRATCH0..3`.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }

    fn register(index: usize) -> *mut u32 {
        (WATCHDOG_SCRATCH0 + 4 * index as u32) as *mut u32
    }
}

impl RetainedMemory for ScratchRetained {
    fn load(&self, index: usize) -> u32 {
        if index >= STORE_WORDS {
            return 0;
        }
        unsafe { Self::register(index).read_volatile() }
    }

    fn store(&mut self, index: usize, value: u32) {
        if index >= STORE_WORDS {
            return;
        }
        unsafe { Self::register(index).write_volatile(value) }
    }
}

// --- Reset and wake controller ---

pub struct Rp2040Reset {
    cause: ResetCause,
}

impl Rp2040Reset {
    /// Latch the reset cause of this boot. The wake marker is left in place so the
    /// Application sees the same cause as the Updater; the image that keeps the chip
    /// clears it with [`clear_wake_marker`].
    pub fn capture() -> Self {
        let reason = unsafe { WATCHDOG_REASON.read_volatile() };
        let chip_reset = unsafe { CHIP_RESET.read_volatile() };
        let woke = unsafe { (RAM_WAKE_FLAG_ADDR as *const u32).read_volatile() } == RAM_WAKE_MAGIC;

        let cause = if reason & WATCHDOG_REASON_FORCE != 0 {
            if woke {
                ResetCause::WakeFromHibernate
            } else {
                ResetCause::Software
            }
        } else if reason & WATCHDOG_REASON_TIMER != 0 {
            ResetCause::Watchdog
        } else if chip_reset & CHIP_RESET_HAD_RUN != 0 {
            ResetCause::ExternalPin
        } else {
            ResetCause::PowerOn
        };

        log::debug!("reset reason 0x{:x}, chip reset 0x{:x}", reason, chip_reset);
        Self { cause }
    }
}

impl ResetController for Rp2040Reset {
    fn reset_cause(&self) -> ResetCause {
        self.cause
    }

    fn soft_reset(&mut self) {
        force_reset()
    }

    fn deep_sleep(&mut self, wake: WakeSource) {
        unsafe { enter_dormant(wake) }
        // Resume from dormant: the next boot must see a wake, not a software reset.
        unsafe { (RAM_WAKE_FLAG_ADDR as *mut u32).write_volatile(RAM_WAKE_MAGIC) };
        force_reset()
    }
}

pub fn clear_wake_marker() {
    unsafe { (RAM_WAKE_FLAG_ADDR as *mut u32).write_volatile(0) };
}

/// Controlled software reset through the watchdog, keeping the scratch registers.
pub fn force_reset() -> ! {
    cortex_m::interrupt::disable();
    unsafe {
        PSM_WDSEL.write_volatile(PSM_WDSEL_ALL_BUT_OSC);
        let ctrl = WATCHDOG_CTRL.read_volatile();
        WATCHDOG_CTRL.write_volatile(ctrl | WATCHDOG_CTRL_TRIGGER);
    }
    loop {
        cortex_m::asm::nop();
    }
}

// --- Dormant deep sleep ---

const IO_BANK0_BASE: u32 = 0x4001_4000;
const IO_BANK0_INTR0: *mut u32 = (IO_BANK0_BASE + 0x0F0) as *mut u32;
const IO_BANK0_DORMANT_WAKE_INTE0: *mut u32 = (IO_BANK0_BASE + 0x160) as *mut u32;
const GPIO_EVENT_EDGE_LOW: u32 = 2;

const ROSC_BASE: u32 = 0x4006_0000;
const ROSC_DORMANT: *mut u32 = (ROSC_BASE + 0x0C) as *mut u32;
const ROSC_STATUS: *const u32 = (ROSC_BASE + 0x18) as *const u32;
const ROSC_DORMANT_VALUE: u32 = 0x636f_6d61; // "coma"
const ROSC_STATUS_STABLE: u32 = 1 << 31;

fn wake_bit(wake: WakeSource) -> (usize, u32) {
    match wake {
        WakeSource::TriggerLine => {
            let reg = (TRIGGER_GPIO / 8) as usize;
            let bit = 1 << ((TRIGGER_GPIO % 8) * 4 + GPIO_EVENT_EDGE_LOW);
            (reg, bit)
        }
    }
}

/// Put the chip into dormant mode until `wake` fires. Returns after wake-up with the
/// system running from the ROSC.
///
/// # Safety
/// Stops the XOSC and PLLs underneath every HAL driver.
unsafe fn enter_dormant(wake: WakeSource) {
    cortex_m::interrupt::disable();

    // The watchdog would fire during dormancy
    let ctrl = WATCHDOG_CTRL.read_volatile();
    WATCHDOG_CTRL.write_volatile(ctrl & !WATCHDOG_CTRL_ENABLE);

    switch_clocks_to_rosc();

    let (reg, bit) = wake_bit(wake);
    IO_BANK0_INTR0.add(reg).write_volatile(bit);
    IO_BANK0_DORMANT_WAKE_INTE0.add(reg).write_volatile(bit);

    cortex_m::asm::dsb();
    ROSC_DORMANT.write_volatile(ROSC_DORMANT_VALUE);

    while ROSC_STATUS.read_volatile() & ROSC_STATUS_STABLE == 0 {
        core::hint::spin_loop();
    }

    IO_BANK0_DORMANT_WAKE_INTE0.add(reg).write_volatile(0);
    IO_BANK0_INTR0.add(reg).write_volatile(bit);
}

/// Run clk_sys and clk_ref from the ROSC, stop the XOSC and hold both PLLs in reset.
///
/// # Safety
/// Every clock derived from the XOSC or a PLL stops; HAL drivers built on them are stale.
pub unsafe fn switch_clocks_to_rosc() {
    const CLOCKS_BASE: u32 = 0x4000_8000;
    const CLK_REF_CTRL: *mut u32 = (CLOCKS_BASE + 0x30) as *mut u32;
    const CLK_REF_SELECTED: *const u32 = (CLOCKS_BASE + 0x38) as *const u32;
    const CLK_SYS_CTRL: *mut u32 = (CLOCKS_BASE + 0x3C) as *mut u32;
    const CLK_SYS_SELECTED: *const u32 = (CLOCKS_BASE + 0x44) as *const u32;

    const XOSC_CTRL: *mut u32 = 0x4002_4000 as *mut u32;
    const XOSC_CTRL_DISABLE: u32 = 0xD1E << 12;

    const RESETS_RESET: *mut u32 = 0x4000_C000 as *mut u32;
    const PLL_SYS_RESET_BIT: u32 = 1 << 12;
    const PLL_USB_RESET_BIT: u32 = 1 << 13;

    // clk_sys <- clk_ref
    let ctrl = CLK_SYS_CTRL.read_volatile();
    CLK_SYS_CTRL.write_volatile(ctrl & !0x1);
    while CLK_SYS_SELECTED.read_volatile() != 0x1 {
        core::hint::spin_loop();
    }

    // clk_ref <- ROSC
    let ctrl = CLK_REF_CTRL.read_volatile();
    CLK_REF_CTRL.write_volatile(ctrl & !0x3);
    while CLK_REF_SELECTED.read_volatile() != 0x1 {
        core::hint::spin_loop();
    }

    let ctrl = XOSC_CTRL.read_volatile();
    XOSC_CTRL.write_volatile((ctrl & !0x00FF_F000) | XOSC_CTRL_DISABLE);

    let reset = RESETS_RESET.read_volatile();
    RESETS_RESET.write_volatile(reset | PLL_SYS_RESET_BIT | PLL_USB_RESET_BIT);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

// --- Board collaborators ---

impl Watchdog for hal::Watchdog {
    fn feed(&mut self) {
        hal::Watchdog::feed(self);
    }
}

/// Single status LED: lit while advertising or in update mode.
pub struct LedIndicator<P> {
    pin: P,
}

impl<P: OutputPin> LedIndicator<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: OutputPin> Indicators for LedIndicator<P> {
    fn show(&mut self, state: IndicatorState) {
        match state {
            IndicatorState::Advertising | IndicatorState::UpdateMode => self.pin.set_high().ok(),
            IndicatorState::Connected | IndicatorState::Off => self.pin.set_low().ok(),
        };
    }
}

/// Blink an LED a specified number of times.
pub fn blink(led: &mut impl OutputPin, timer: &mut impl DelayNs, count: u32, period_ms: u32) {
    for _ in 0..count {
        led.set_high().ok();
        timer.delay_ms(period_ms);
        led.set_low().ok();
        timer.delay_ms(period_ms);
    }
}
