// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! duet Application image for RP2040.
//!
//! Launched by the Updater from the Application slot. Runs the mode controller over a
//! USB CDC link until it resets into the Updater or goes to deep sleep.

#![no_std]
#![no_main]

mod peripherals;
mod transfer;
mod usb_link;

use defmt_rtt as _;
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;
use duet_common::config::WATCHDOG_TIMEOUT_MS;
use duet_common::handoff::{application_startup, AppStartup};
use duet_common::image::HeaderPage;
use duet_common::rp2040::{self, LedIndicator, Rp2040Reset, ScratchRetained};
use duet_common::{
    BootContext, ControllerConfig, FlagStore, Parts, PostUpdatePolicy, Supervisor,
    TriggerDebouncer, TriggerPolarity,
};
use rp2040_hal::fugit::ExtU32;

use crate::transfer::DeferredTransfer;
use crate::usb_link::UsbLink;

const APP_VERSION: u32 = 1;

/// Sealed on the host by `duet-ctl seal`.
#[unsafe(link_section = ".image_header")]
#[used]
pub static IMAGE_HEADER: HeaderPage = HeaderPage::unsealed(APP_VERSION);

#[entry]
fn main() -> ! {
    defmt::println!("Application v{} started", APP_VERSION);

    let reset = Rp2040Reset::capture();
    let store = FlagStore::new(unsafe { ScratchRetained::new() });
    let boot = BootContext::load(&reset, &store);
    rp2040::clear_wake_marker();
    defmt::println!(
        "Boot: cause={}, reason={}, flags={}, store intact={}",
        boot.cause,
        boot.reason,
        boot.flags,
        boot.store_intact
    );

    if application_startup(&boot) == AppStartup::ReturnToUpdater {
        defmt::println!("Updater role still requested, resetting");
        rp2040::force_reset();
    }

    let mut p = peripherals::init();
    rp2040::blink(&mut p.led_pin, &mut p.timer, 3, 100);

    p.watchdog.pause_on_debug(true);
    p.watchdog.start((WATCHDOG_TIMEOUT_MS * 1000).micros());

    let usb_bus = p.usb.into_bus();
    let parts = Parts {
        link: UsbLink::new(usb_bus, p.timer),
        transfer: DeferredTransfer::new(p.timer),
        reset,
        watchdog: p.watchdog,
        indicators: LedIndicator::new(p.led_pin),
        store,
        trigger: TriggerDebouncer::new(p.trigger_pin, p.timer, TriggerPolarity::ActiveLow),
    };

    let config = ControllerConfig {
        post_update_policy: PostUpdatePolicy::RunUpdater,
        ..ControllerConfig::default()
    };

    let mut supervisor = Supervisor::new(config, &boot, parts);
    let terminal = supervisor.run();

    // Soft reset and deep sleep both end in a reset on this board
    defmt::println!("Supervisor stopped: {}", terminal);
    rp2040::force_reset()
}
