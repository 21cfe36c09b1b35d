// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update transfer that defers the image itself to the Updater.
//!
//! The Application stages nothing: a started session completes after a short grace
//! period so the peer can read the acknowledgement, and the post-update role sends the
//! next boot to the Updater, which receives the image through the ROM loader.

use duet_common::link::AttributeHandle;
use duet_common::transfer::{UpdateOutcome, UpdateTransfer};
use rp2040_hal as hal;
use rp2040_hal::fugit::ExtU64;

/// Time left for the last response to drain before the handoff reset.
pub const HANDOFF_GRACE_MS: u64 = 500;

pub struct DeferredTransfer {
    timer: hal::Timer,
    completes_at: Option<hal::timer::Instant>,
}

impl DeferredTransfer {
    pub fn new(timer: hal::Timer) -> Self {
        Self {
            timer,
            completes_at: None,
        }
    }
}

impl UpdateTransfer for DeferredTransfer {
    fn start(&mut self) {
        defmt::info!("Update session started");
        self.completes_at = Some(self.timer.get_counter() + (HANDOFF_GRACE_MS * 1000).micros());
    }

    fn on_write(&mut self, attribute: AttributeHandle, data: &[u8]) {
        defmt::debug!("Ignoring {} bytes for attribute {}", data.len(), attribute);
    }

    fn poll(&mut self) -> Option<UpdateOutcome> {
        let deadline = self.completes_at?;
        if self.timer.get_counter() < deadline {
            return None;
        }
        self.completes_at = None;
        Some(UpdateOutcome::Completed)
    }
}
