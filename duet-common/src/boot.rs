// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot classification - pure logic without hardware dependencies.
//!
//! The hardware reset cause is read through [`ResetController`] and combined with the
//! persisted role. Both images run this before any link-layer initialisation.

use crate::flags::PersistentFlags;
use crate::store::{FlagStore, RetainedMemory};

/// Cause code reported by the reset/wake controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetCause {
    PowerOn,
    ExternalPin,
    Watchdog,
    Software,
    WakeFromHibernate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootReason {
    ColdStart,
    WakeFromDeepSleep,
    ResetRequestedBySoftware,
}

/// Source that ends a deep sleep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeSource {
    /// The update trigger line (falling edge on the reference board).
    TriggerLine,
}

/// Hardware reset/wake controller.
///
/// On hardware `soft_reset` and `deep_sleep` do not return.
pub trait ResetController {
    fn reset_cause(&self) -> ResetCause;
    fn soft_reset(&mut self);
    fn deep_sleep(&mut self, wake: WakeSource);
}

/// Classify a boot from the hardware cause and the persisted flags.
pub fn classify(cause: ResetCause, flags: &PersistentFlags) -> BootReason {
    match cause {
        ResetCause::WakeFromHibernate => BootReason::WakeFromDeepSleep,
        ResetCause::Software => BootReason::ResetRequestedBySoftware,
        _ if flags.requested_role.wants_updater() => BootReason::ResetRequestedBySoftware,
        _ => BootReason::ColdStart,
    }
}

/// Everything a boot learns before deciding which image runs. Built once per boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootContext {
    pub cause: ResetCause,
    pub reason: BootReason,
    pub flags: PersistentFlags,
    /// False when the store held no valid record and the power-up default was used.
    pub store_intact: bool,
}

impl BootContext {
    pub fn load<R: ResetController, M: RetainedMemory>(reset: &R, store: &FlagStore<M>) -> Self {
        let cause = reset.reset_cause();
        let (flags, store_intact) = match store.try_read() {
            Ok(flags) => (flags, true),
            Err(_) => (PersistentFlags::power_up_default(), false),
        };

        Self {
            cause,
            reason: classify(cause, &flags),
            flags,
            store_intact,
        }
    }
}
