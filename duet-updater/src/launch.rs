// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Application slot verification and jump.

use duet_common::image::{verify_image, ImageInfo, VerifyError};
use duet_common::layout::{APP_SLOT_ADDR, APP_SLOT_SIZE, APP_VECTOR_ADDR};
use duet_common::rp2040;
use embedded_hal::delay::DelayNs;

use crate::peripherals::Peripherals;

/// Verify the integrity marker of the Application slot in XIP flash.
pub fn verify_app_slot() -> Result<ImageInfo, VerifyError> {
    let slot =
        unsafe { core::slice::from_raw_parts(APP_SLOT_ADDR as *const u8, APP_SLOT_SIZE as usize) };
    verify_image(slot)
}

/// Jump to a verified Application image. Never returns.
pub fn launch(info: &ImageInfo, p: &mut Peripherals) -> ! {
    defmt::println!(
        "Launching application v{} ({} bytes, CRC32 0x{:08x})",
        info.version,
        info.image_size,
        info.crc32
    );
    p.timer.delay_ms(10u32);

    unsafe {
        prepare_for_application_handoff();
        relocate_vector_table(APP_VECTOR_ADDR);
        jump_to_application(info.initial_sp, info.reset_vector)
    }
}

/// Leave the chip close to its reset state so the Application's own clock init starts clean.
unsafe fn prepare_for_application_handoff() {
    cortex_m::interrupt::disable();

    // Clear all pending interrupts in NVIC
    const NVIC_ICPR: *mut u32 = 0xE000_E280 as *mut u32;
    NVIC_ICPR.write_volatile(0xFFFF_FFFF);

    // Disable all NVIC interrupts
    const NVIC_ICER: *mut u32 = 0xE000_E180 as *mut u32;
    NVIC_ICER.write_volatile(0xFFFF_FFFF);

    rp2040::switch_clocks_to_rosc();
}

unsafe fn relocate_vector_table(vector_addr: u32) {
    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(vector_addr);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn jump_to_application(initial_sp: u32, reset_vector: u32) -> ! {
    core::arch::asm!(
        "msr msp, {sp}",
        "cpsie i",
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}
