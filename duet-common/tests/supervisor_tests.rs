// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Main-loop tests: the supervisor against recording fakes, across simulated reboots.

mod support;

use duet_common::boot::{BootReason, ResetCause, WakeSource};
use duet_common::config::ControllerConfig;
use duet_common::control::{ControlAck, ControlCommand, ControlResponse};
use duet_common::flags::{PersistentFlags, RequestedRole};
use duet_common::handoff::{
    application_startup, decide_updater_boot, AppStartup, RemainReason, UpdaterDecision,
};
use duet_common::image::ImageInfo;
use duet_common::link::{AdvertisingMode, AttributeHandle, ConnectionHandle, LinkEvent, WriteData};
use duet_common::mode::{IndicatorState, OperatingMode, Terminal};
use duet_common::store::RetainedWords;
use duet_common::supervisor::Step;
use duet_common::transfer::{UpdateFailure, UpdateOutcome};

use support::{control_write, power_on, retained, LinkCommand};

const PEER: ConnectionHandle = ConnectionHandle(1);

fn link_up(connection: ConnectionHandle) -> LinkEvent {
    LinkEvent::LinkUp {
        connection,
        interval: 0x0018,
    }
}

fn image() -> ImageInfo {
    ImageInfo {
        version: 2,
        image_size: 0x2000,
        crc32: 0xAABB_CCDD,
        initial_sp: 0x2003_FFF0,
        reset_vector: 0x1001_0201,
    }
}

// =============================================================================
// Loop mechanics
// =============================================================================

#[test]
fn test_watchdog_fed_every_iteration_until_halt() {
    let (_, mut sup) = power_on(
        ResetCause::PowerOn,
        RetainedWords::new(),
        ControllerConfig::default(),
    );
    for _ in 0..5 {
        assert_eq!(sup.step(), Step::Continue);
    }
    assert_eq!(sup.parts().watchdog.feeds, 5);

    sup.parts_mut()
        .link
        .push(LinkEvent::AdvertisingWindowElapsed {
            connection_in_flight: false,
        });
    assert_eq!(sup.step(), Step::Halted(Terminal::DeepSleep));
    assert_eq!(sup.step(), Step::Halted(Terminal::DeepSleep));
    assert_eq!(sup.parts().watchdog.feeds, 6);
    assert_eq!(sup.parts().reset.sleeps.len(), 1);
}

#[test]
fn test_rejected_advertising_is_transient() {
    let (_, mut sup) = power_on(
        ResetCause::PowerOn,
        RetainedWords::new(),
        ControllerConfig::default(),
    );
    sup.parts_mut().link.reject_advertising = true;
    sup.parts_mut().link.push(LinkEvent::StackReady);
    assert_eq!(sup.step(), Step::Continue);
    assert!(sup.parts().link.commands.is_empty());

    // Retried on the next natural event
    sup.parts_mut().link.reject_advertising = false;
    sup.parts_mut().link.push(link_up(PEER));
    sup.parts_mut().link.push(LinkEvent::LinkDown { connection: PEER });
    assert_eq!(sup.step(), Step::Continue);
    assert_eq!(
        sup.parts().link.commands,
        vec![LinkCommand::Advertise(AdvertisingMode::Fast)]
    );
    assert_eq!(sup.controller().mode(), OperatingMode::Advertising);
}

#[test]
fn test_trigger_not_polled_once_in_update_mode() {
    let (_, mut sup) = power_on(
        ResetCause::PowerOn,
        RetainedWords::new(),
        ControllerConfig::default(),
    );
    sup.parts_mut().trigger.script.extend([true, true, true]);
    sup.step();
    assert_eq!(sup.controller().mode(), OperatingMode::UpdateModeActive);

    sup.step();
    sup.step();
    assert_eq!(sup.parts().trigger.software_requests.len(), 1);
    assert_eq!(sup.parts().transfer.starts, 1);
}

#[test]
fn test_trigger_held_at_window_end_enters_update_mode() {
    let (_, mut sup) = power_on(
        ResetCause::PowerOn,
        RetainedWords::new(),
        ControllerConfig::default(),
    );
    sup.parts_mut().link.push(LinkEvent::StackReady);
    assert_eq!(sup.step(), Step::Continue);
    sup.parts_mut().link.commands.clear();

    sup.parts_mut().trigger.script.push_back(true);
    sup.parts_mut()
        .link
        .push(LinkEvent::AdvertisingWindowElapsed {
            connection_in_flight: false,
        });
    assert_eq!(sup.step(), Step::Continue);

    let parts = sup.parts();
    assert!(parts.reset.sleeps.is_empty());
    assert_eq!(sup.controller().mode(), OperatingMode::UpdateModeActive);
    assert_eq!(sup.controller().terminal(), None);
    assert_eq!(parts.transfer.starts, 1);
    assert_eq!(
        parts.link.commands,
        vec![
            LinkCommand::UpdateExposure,
            LinkCommand::Advertise(AdvertisingMode::Fast),
        ]
    );
}

#[test]
fn test_software_request_reaches_debouncer_in_same_iteration() {
    let (_, mut sup) = power_on(
        ResetCause::PowerOn,
        RetainedWords::new(),
        ControllerConfig::default(),
    );
    sup.parts_mut().link.push(link_up(PEER));
    sup.parts_mut()
        .link
        .push(control_write(PEER, ControlCommand::EnterUpdateMode));
    assert_eq!(sup.step(), Step::Continue);

    let parts = sup.parts();
    assert_eq!(parts.trigger.software_requests, vec![true]);
    assert!(parts
        .link
        .commands
        .contains(&LinkCommand::Reply(PEER, ControlResponse::Ack(ControlAck::Ok))));
    assert_eq!(parts.link.count(|c| matches!(c, LinkCommand::ServiceChanged(_))), 1);
    assert_eq!(sup.controller().mode(), OperatingMode::UpdateModeActive);
    assert!(!sup.controller().flags().update_request_pending);
}

#[test]
fn test_update_writes_reach_the_transfer_handler() {
    let (_, mut sup) = power_on(
        ResetCause::PowerOn,
        RetainedWords::new(),
        ControllerConfig::default(),
    );
    sup.parts_mut().trigger.script.push_back(true);
    sup.step();

    sup.parts_mut().link.push(link_up(PEER));
    sup.parts_mut().link.push(LinkEvent::ServiceWriteReceived {
        connection: PEER,
        attribute: AttributeHandle(0x0030),
        data: WriteData::from_slice(&[0xAA, 0xBB]).unwrap(),
    });
    sup.step();

    assert_eq!(
        sup.parts().transfer.writes,
        vec![(AttributeHandle(0x0030), vec![0xAA, 0xBB])]
    );
}

#[test]
fn test_failed_transfer_is_restarted() {
    let (_, mut sup) = power_on(
        ResetCause::PowerOn,
        RetainedWords::new(),
        ControllerConfig::default(),
    );
    sup.parts_mut().trigger.script.push_back(true);
    sup.step();
    let before = *sup.parts().store.memory();

    sup.parts_mut().transfer.outcome = Some(UpdateOutcome::Failed(UpdateFailure::Storage));
    assert_eq!(sup.step(), Step::Continue);
    assert_eq!(sup.parts().transfer.starts, 2);
    assert_eq!(*sup.parts().store.memory(), before);
    assert_eq!(sup.controller().mode(), OperatingMode::UpdateModeActive);
}

#[test]
fn test_request_handoff_twice_resets_once() {
    let (_, mut sup) = power_on(
        ResetCause::PowerOn,
        RetainedWords::new(),
        ControllerConfig::default(),
    );
    assert_eq!(sup.request_handoff(), Step::Halted(Terminal::Reset));
    let after_first = *sup.parts().store.memory();

    assert_eq!(sup.request_handoff(), Step::Continue);
    assert_eq!(*sup.parts().store.memory(), after_first);
    assert_eq!(sup.parts().reset.soft_resets, 1);
    assert_eq!(
        sup.parts().store.read().requested_role,
        RequestedRole::ScheduleUpdaterAfterReset
    );
}

// =============================================================================
// Scenarios across reboots
// =============================================================================

#[test]
fn test_update_session_then_normal_startup() {
    // Cold boot
    let (boot, mut sup) = power_on(
        ResetCause::PowerOn,
        RetainedWords::new(),
        ControllerConfig::default(),
    );
    assert_eq!(boot.reason, BootReason::ColdStart);
    assert_eq!(application_startup(&boot), AppStartup::Resume);

    // Advertising -> Connected
    sup.parts_mut().link.push(LinkEvent::StackReady);
    sup.parts_mut().link.push(link_up(PEER));
    sup.parts_mut().trigger.script.extend([false, true]);
    assert_eq!(sup.step(), Step::Continue);
    assert_eq!(sup.controller().mode(), OperatingMode::Connected);

    // Trigger -> UpdateModeActive, one service-changed notification
    assert_eq!(sup.step(), Step::Continue);
    assert_eq!(sup.controller().mode(), OperatingMode::UpdateModeActive);
    let link = &sup.parts().link;
    assert_eq!(link.count(|c| *c == LinkCommand::ServiceChanged(PEER)), 1);
    assert_eq!(link.count(|c| *c == LinkCommand::UpdateExposure), 1);
    assert_eq!(sup.parts().transfer.starts, 1);
    assert_eq!(
        sup.parts().indicators.shown.last(),
        Some(&IndicatorState::UpdateMode)
    );

    // Completed -> flags RunApplication -> soft reset
    sup.parts_mut().transfer.outcome = Some(UpdateOutcome::Completed);
    assert_eq!(sup.step(), Step::Halted(Terminal::Reset));
    assert_eq!(sup.parts().reset.soft_resets, 1);
    assert_eq!(
        sup.parts().store.read().requested_role,
        RequestedRole::RunApplication
    );

    // Next boot
    let (boot, sup) = power_on(
        ResetCause::Software,
        retained(sup),
        ControllerConfig::default(),
    );
    assert_eq!(boot.reason, BootReason::ResetRequestedBySoftware);
    assert_eq!(boot.flags.requested_role, RequestedRole::RunApplication);
    assert_eq!(
        decide_updater_boot(&boot, || Ok(image())).0,
        UpdaterDecision::Launch(image())
    );
    assert_eq!(application_startup(&boot), AppStartup::Resume);
    assert_eq!(sup.controller().mode(), OperatingMode::Advertising);
    assert!(!sup.controller().flags().update_mode_active);
}

#[test]
fn test_sleep_then_wake_resumes_advertising() {
    let (_, mut sup) = power_on(
        ResetCause::PowerOn,
        RetainedWords::new(),
        ControllerConfig::default(),
    );
    sup.parts_mut().link.push(LinkEvent::StackReady);
    sup.parts_mut()
        .link
        .push(LinkEvent::AdvertisingWindowElapsed {
            connection_in_flight: false,
        });
    assert_eq!(sup.step(), Step::Halted(Terminal::DeepSleep));
    assert_eq!(sup.controller().mode(), OperatingMode::EnteringDeepSleep);
    assert_eq!(sup.parts().reset.sleeps, vec![WakeSource::TriggerLine]);
    assert_eq!(sup.parts().indicators.shown.last(), Some(&IndicatorState::Off));
    assert_eq!(
        sup.parts().store.try_read(),
        Ok(PersistentFlags::power_up_default())
    );
    // Sampled once, not asserted, before the sleep decision
    assert_eq!(sup.parts().trigger.software_requests, vec![false]);

    // Wake
    let (boot, mut sup) = power_on(
        ResetCause::WakeFromHibernate,
        retained(sup),
        ControllerConfig::default(),
    );
    assert_eq!(boot.reason, BootReason::WakeFromDeepSleep);
    assert!(boot.store_intact);
    assert_eq!(application_startup(&boot), AppStartup::Resume);
    assert_eq!(sup.controller().mode(), OperatingMode::Advertising);

    sup.parts_mut().link.push(LinkEvent::StackReady);
    assert_eq!(sup.step(), Step::Continue);
    assert_eq!(
        sup.parts().link.commands,
        vec![LinkCommand::Advertise(AdvertisingMode::Fast)]
    );
}

#[test]
fn test_handoff_command_takes_updater_path_once() {
    let (_, mut sup) = power_on(
        ResetCause::PowerOn,
        RetainedWords::new(),
        ControllerConfig::default(),
    );
    sup.parts_mut().link.push(link_up(PEER));
    sup.parts_mut()
        .link
        .push(control_write(PEER, ControlCommand::RequestHandoff));
    assert_eq!(sup.step(), Step::Halted(Terminal::Reset));
    assert_eq!(
        sup.parts().link.commands.last(),
        Some(&LinkCommand::Reply(PEER, ControlResponse::Ack(ControlAck::Ok)))
    );

    // Updater boot: the Application image is never considered
    let (boot, sup) = power_on(
        ResetCause::Software,
        retained(sup),
        ControllerConfig::default(),
    );
    assert_eq!(boot.reason, BootReason::ResetRequestedBySoftware);
    assert_eq!(application_startup(&boot), AppStartup::ReturnToUpdater);
    let (decision, commit) = decide_updater_boot(&boot, || panic!("image must not be verified"));
    assert_eq!(
        decision,
        UpdaterDecision::RemainInUpdater(RemainReason::Requested(
            RequestedRole::ScheduleUpdaterAfterReset
        ))
    );

    // The Updater consumes the request; an unrelated reset later is a cold start
    let mut parts = sup.into_parts();
    parts.store.write(&commit.unwrap());
    let (boot, _) = power_on(
        ResetCause::Watchdog,
        parts.store.into_inner(),
        ControllerConfig::default(),
    );
    assert_eq!(boot.reason, BootReason::ColdStart);
    assert_eq!(boot.flags.requested_role, RequestedRole::RunApplication);
}
