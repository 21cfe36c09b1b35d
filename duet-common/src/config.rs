// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Mode controller configuration and board timing constants.

use crate::boot::WakeSource;
use crate::control::CONTROL_POINT_HANDLE;
use crate::flags::RequestedRole;
use crate::link::{AttributeHandle, ConnectionParameters};

/// Watchdog window for the Application polling loop.
pub const WATCHDOG_TIMEOUT_MS: u32 = 2000;

/// Fast advertising window before the Application goes to deep sleep.
pub const ADVERTISING_WINDOW_MS: u32 = 30_000;

/// Role committed once the update-transfer handler reports completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PostUpdatePolicy {
    /// The new image is already installed; come back to the Application.
    RunApplication,
    /// The Updater image finishes the installation.
    RunUpdater,
}

impl PostUpdatePolicy {
    pub fn role(self) -> RequestedRole {
        match self {
            Self::RunApplication => RequestedRole::RunApplication,
            Self::RunUpdater => RequestedRole::RunUpdater,
        }
    }
}

/// What to do when the advertising window ends while a peer is still connecting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepPolicy {
    /// Sleep anyway; a late connection attempt is dropped.
    FavorPower,
    /// Keep advertising slowly until the attempt resolves.
    DeferWhileConnecting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    pub control_point: AttributeHandle,
    pub post_update_policy: PostUpdatePolicy,
    pub sleep_policy: SleepPolicy,
    pub wake_source: WakeSource,
    pub update_connection: ConnectionParameters,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            control_point: AttributeHandle(CONTROL_POINT_HANDLE),
            post_update_policy: PostUpdatePolicy::RunApplication,
            sleep_policy: SleepPolicy::FavorPower,
            wake_source: WakeSource::TriggerLine,
            update_connection: ConnectionParameters::UPDATE,
        }
    }
}
