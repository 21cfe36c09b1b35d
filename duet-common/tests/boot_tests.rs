// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for boot classification.

use duet_common::boot::{classify, BootContext, BootReason, ResetCause, ResetController, WakeSource};
use duet_common::flags::{PersistentFlags, RequestedRole};
use duet_common::store::{FlagStore, RetainedWords};

struct FixedCause(ResetCause);

impl ResetController for FixedCause {
    fn reset_cause(&self) -> ResetCause {
        self.0
    }

    fn soft_reset(&mut self) {
        panic!("classification must not reset");
    }

    fn deep_sleep(&mut self, _wake: WakeSource) {
        panic!("classification must not sleep");
    }
}

fn with_role(role: RequestedRole) -> PersistentFlags {
    PersistentFlags::power_up_default().with_role(role)
}

const HARD_CAUSES: [ResetCause; 3] = [
    ResetCause::PowerOn,
    ResetCause::ExternalPin,
    ResetCause::Watchdog,
];

// =============================================================================
// classify tests
// =============================================================================

#[test]
fn test_wake_from_hibernate_is_wake() {
    for role in [
        RequestedRole::RunApplication,
        RequestedRole::RunUpdater,
        RequestedRole::ScheduleUpdaterAfterReset,
    ] {
        assert_eq!(
            classify(ResetCause::WakeFromHibernate, &with_role(role)),
            BootReason::WakeFromDeepSleep
        );
    }
}

#[test]
fn test_hard_reset_with_application_role_is_cold_start() {
    let flags = with_role(RequestedRole::RunApplication);
    for cause in HARD_CAUSES {
        assert_eq!(classify(cause, &flags), BootReason::ColdStart, "{:?}", cause);
    }
}

#[test]
fn test_role_switch_request_is_software_reset() {
    for role in [RequestedRole::RunUpdater, RequestedRole::ScheduleUpdaterAfterReset] {
        for cause in HARD_CAUSES {
            assert_eq!(
                classify(cause, &with_role(role)),
                BootReason::ResetRequestedBySoftware
            );
        }
    }
}

#[test]
fn test_controlled_reset_is_software_reset_even_with_application_role() {
    let flags = with_role(RequestedRole::RunApplication);
    assert_eq!(
        classify(ResetCause::Software, &flags),
        BootReason::ResetRequestedBySoftware
    );
}

// =============================================================================
// BootContext tests
// =============================================================================

#[test]
fn test_context_reads_committed_flags() {
    let mut store = FlagStore::new(RetainedWords::new());
    let committed = with_role(RequestedRole::ScheduleUpdaterAfterReset);
    store.write(&committed);

    let boot = BootContext::load(&FixedCause(ResetCause::Software), &store);
    assert_eq!(boot.cause, ResetCause::Software);
    assert_eq!(boot.reason, BootReason::ResetRequestedBySoftware);
    assert_eq!(boot.flags, committed);
    assert!(boot.store_intact);
}

#[test]
fn test_context_with_empty_store_uses_default() {
    let store = FlagStore::new(RetainedWords::new());
    let boot = BootContext::load(&FixedCause(ResetCause::PowerOn), &store);
    assert_eq!(boot.reason, BootReason::ColdStart);
    assert_eq!(boot.flags, PersistentFlags::power_up_default());
    assert!(!boot.store_intact);
}

#[test]
fn test_classification_does_not_touch_the_store() {
    let mut store = FlagStore::new(RetainedWords::new());
    store.write(&with_role(RequestedRole::RunUpdater));
    let before = *store.memory();

    let _ = BootContext::load(&FixedCause(ResetCause::Watchdog), &store);
    assert_eq!(*store.memory(), before);
}
