// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Interface to the update-transfer handler (the OTA data path).

use core::fmt;

use crate::link::AttributeHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateFailure {
    Aborted,
    IntegrityMismatch,
    Storage,
    Timeout,
}

impl fmt::Display for UpdateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Aborted => "transfer aborted by peer",
            Self::IntegrityMismatch => "received image failed its integrity check",
            Self::Storage => "staging storage error",
            Self::Timeout => "transfer timed out",
        };
        f.write_str(msg)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateOutcome {
    Completed,
    Failed(UpdateFailure),
}

pub trait UpdateTransfer {
    /// Start (or restart) a transfer session.
    fn start(&mut self);

    /// Write to an update-service attribute.
    fn on_write(&mut self, attribute: AttributeHandle, data: &[u8]);

    /// Outcome of the running session, reported once.
    fn poll(&mut self) -> Option<UpdateOutcome>;
}
