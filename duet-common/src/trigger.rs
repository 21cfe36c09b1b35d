// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Two-sample debounce of the update trigger line.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;

/// Settle interval between the two samples.
pub const TRIGGER_SETTLE_MS: u32 = 100;

/// Anything that can answer "is update mode being requested right now?".
pub trait Trigger {
    /// `software_request` is the pending in-place request; it bypasses sampling.
    fn poll(&mut self, software_request: bool) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerPolarity {
    /// Asserted when the line reads low (button to ground with pull-up).
    ActiveLow,
    ActiveHigh,
}

pub struct TriggerDebouncer<P, D> {
    pin: P,
    delay: D,
    polarity: TriggerPolarity,
    settle_ms: u32,
}

impl<P: InputPin, D: DelayNs> TriggerDebouncer<P, D> {
    pub fn new(pin: P, delay: D, polarity: TriggerPolarity) -> Self {
        Self::with_settle(pin, delay, polarity, TRIGGER_SETTLE_MS)
    }

    pub fn with_settle(pin: P, delay: D, polarity: TriggerPolarity, settle_ms: u32) -> Self {
        Self {
            pin,
            delay,
            polarity,
            settle_ms,
        }
    }

    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }

    /// A failed read counts as not asserted.
    fn asserted(&mut self) -> bool {
        let level = match self.polarity {
            TriggerPolarity::ActiveLow => self.pin.is_low(),
            TriggerPolarity::ActiveHigh => self.pin.is_high(),
        };
        level.unwrap_or(false)
    }
}

impl<P: InputPin, D: DelayNs> Trigger for TriggerDebouncer<P, D> {
    fn poll(&mut self, software_request: bool) -> bool {
        if software_request {
            return true;
        }
        if !self.asserted() {
            return false;
        }

        self.delay.delay_ms(self.settle_ms);
        self.asserted()
    }
}
