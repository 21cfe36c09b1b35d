// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The cross-reset decision register shared by the two images.

use serde::{Deserialize, Serialize};

/// Which image the next boot should run.
#[repr(u8)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestedRole {
    RunApplication = 0,
    RunUpdater = 1,
    ScheduleUpdaterAfterReset = 2,
}

impl RequestedRole {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::RunApplication),
            1 => Some(Self::RunUpdater),
            2 => Some(Self::ScheduleUpdaterAfterReset),
            _ => None,
        }
    }

    /// True when the previous run asked for the Updater to take over.
    pub fn wants_updater(self) -> bool {
        !matches!(self, Self::RunApplication)
    }
}

/// Flags that survive reset and deep sleep but not power removal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PersistentFlags {
    pub requested_role: RequestedRole,
    pub update_mode_active: bool,
    pub update_request_pending: bool,
}

impl PersistentFlags {
    /// Encoded size: role, update_mode_active, update_request_pending.
    pub const SIZE: usize = 3;

    /// Value at first power-up, also the fallback for an unreadable store.
    pub const fn power_up_default() -> Self {
        Self {
            requested_role: RequestedRole::RunApplication,
            update_mode_active: false,
            update_request_pending: false,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        [
            self.requested_role as u8,
            self.update_mode_active as u8,
            self.update_request_pending as u8,
        ]
    }

    /// Decode a record. Any byte outside its domain rejects the whole record.
    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Option<Self> {
        Some(Self {
            requested_role: RequestedRole::from_byte(bytes[0])?,
            update_mode_active: decode_bool(bytes[1])?,
            update_request_pending: decode_bool(bytes[2])?,
        })
    }

    /// Copy with the role replaced, leaving the mode bits untouched.
    pub fn with_role(self, requested_role: RequestedRole) -> Self {
        Self {
            requested_role,
            ..self
        }
    }
}

impl Default for PersistentFlags {
    fn default() -> Self {
        Self::power_up_default()
    }
}

fn decode_bool(byte: u8) -> Option<bool> {
    match byte {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}
