// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! duet Updater image for RP2040.
//!
//! Runs first after every reset. Reads the persisted role, then either verifies and
//! launches the Application image or hands the chip to the boot ROM's USB loader.

#![no_std]
#![no_main]

mod launch;
mod peripherals;
mod update;

use defmt_rtt as _;
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;
use duet_common::handoff::{decide_updater_boot, UpdaterDecision};
use duet_common::rp2040::{self, Rp2040Reset, ScratchRetained};
use duet_common::{BootContext, FlagStore};

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

#[entry]
fn main() -> ! {
    defmt::println!("Updater init");

    let reset = Rp2040Reset::capture();
    let mut store = FlagStore::new(unsafe { ScratchRetained::new() });
    let boot = BootContext::load(&reset, &store);
    defmt::println!(
        "Boot: cause={}, reason={}, flags={}, store intact={}",
        boot.cause,
        boot.reason,
        boot.flags,
        boot.store_intact
    );

    let mut p = peripherals::init();
    rp2040::blink(&mut p.led_pin, &mut p.timer, 2, 100);

    let (decision, commit) = decide_updater_boot(&boot, launch::verify_app_slot);
    if let Some(flags) = commit {
        store.write(&flags);
        defmt::println!("Request consumed, committed {}", flags);
    }

    match decision {
        UpdaterDecision::Launch(info) => launch::launch(&info, &mut p),
        UpdaterDecision::RemainInUpdater(reason) => update::serve(&mut p, reason),
    }
}
