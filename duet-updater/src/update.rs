// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update mode: hand the chip to the RP2040 boot ROM's USB loader.
//!
//! The ROM exposes the mass-storage (UF2) and PICOBOOT interfaces. A sealed Application
//! image written through either one is verified on the next boot like any other.

use duet_common::handoff::RemainReason;
use duet_common::rp2040;
use embedded_hal::digital::OutputPin;

use crate::peripherals::Peripherals;

/// GPIO25 LED as the ROM loader's activity indicator.
const ACTIVITY_PIN_MASK: u32 = 1 << 25;
/// Keep both the mass-storage and PICOBOOT interfaces.
const DISABLE_INTERFACE_MASK: u32 = 0;

pub fn serve(p: &mut Peripherals, reason: RemainReason) -> ! {
    match reason {
        RemainReason::Requested(role) => defmt::println!("Update mode requested ({})", role),
        RemainReason::ImageRejected(e) => defmt::println!("Application not launched: {}", e),
    }

    // The ROM loader's reboot must not look like a dormant wake
    rp2040::clear_wake_marker();
    rp2040::blink(&mut p.led_pin, &mut p.timer, 10, 50);
    p.led_pin.set_high().ok();

    defmt::println!("Entering ROM USB loader");
    #[allow(unused_unsafe)]
    unsafe {
        rp2040_hal::rom_data::reset_to_usb_boot(ACTIVITY_PIN_MASK, DISABLE_INTERFACE_MASK);
    }

    // The ROM call does not return
    loop {
        cortex_m::asm::wfi();
    }
}
