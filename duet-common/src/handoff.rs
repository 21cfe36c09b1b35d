// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Cross-image handoff decisions.
//!
//! The two images agree through a single persisted register, the requested role:
//! - the Application writes `ScheduleUpdaterAfterReset` and resets to hand off;
//! - the Updater consumes any updater role before serving an update, so a second reset
//!   never lands in the same role again;
//! - the Updater only jumps to an Application image that passed verification.

use crate::boot::BootContext;
use crate::flags::{PersistentFlags, RequestedRole};
use crate::image::{ImageInfo, VerifyError};

/// What the Application does right after classifying its boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppStartup {
    Resume,
    /// The role still asks for the Updater: reset before starting the link layer.
    ReturnToUpdater,
}

pub fn application_startup(boot: &BootContext) -> AppStartup {
    if boot.flags.requested_role.wants_updater() {
        AppStartup::ReturnToUpdater
    } else {
        AppStartup::Resume
    }
}

/// Flags committed by the Application before its handoff reset.
pub fn schedule_updater(flags: PersistentFlags) -> PersistentFlags {
    flags.with_role(RequestedRole::ScheduleUpdaterAfterReset)
}

/// First half of the Updater boot: which path the persisted role selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdaterPlan {
    VerifyAndLaunch,
    /// Commit `commit` (the request is consumed), then serve the update protocol.
    ServeUpdate {
        requested: RequestedRole,
        commit: PersistentFlags,
    },
}

pub fn updater_plan(boot: &BootContext) -> UpdaterPlan {
    match boot.flags.requested_role {
        RequestedRole::RunApplication => UpdaterPlan::VerifyAndLaunch,
        requested @ (RequestedRole::RunUpdater | RequestedRole::ScheduleUpdaterAfterReset) => {
            UpdaterPlan::ServeUpdate {
                requested,
                commit: PersistentFlags::power_up_default(),
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RemainReason {
    Requested(RequestedRole),
    ImageRejected(VerifyError),
}

/// Result of the Updater boot (immutable).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdaterDecision {
    Launch(ImageInfo),
    RemainInUpdater(RemainReason),
}

/// Second half of the Updater boot, from the verification result.
pub fn launch_decision(verification: Result<ImageInfo, VerifyError>) -> UpdaterDecision {
    match verification {
        Ok(info) => UpdaterDecision::Launch(info),
        Err(e) => UpdaterDecision::RemainInUpdater(RemainReason::ImageRejected(e)),
    }
}

/// Full Updater boot decision. `verify` runs only when the role selects the Application.
///
/// Returns the decision and the flags to commit before acting on it.
pub fn decide_updater_boot<F>(
    boot: &BootContext,
    verify: F,
) -> (UpdaterDecision, Option<PersistentFlags>)
where
    F: FnOnce() -> Result<ImageInfo, VerifyError>,
{
    match updater_plan(boot) {
        UpdaterPlan::VerifyAndLaunch => (launch_decision(verify()), None),
        UpdaterPlan::ServeUpdate { requested, commit } => (
            UpdaterDecision::RemainInUpdater(RemainReason::Requested(requested)),
            Some(commit),
        ),
    }
}
