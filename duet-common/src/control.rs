// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Control-point protocol between a connected peer and the Application image.
//!
//! Commands arrive as postcard-encoded writes to the control-point attribute. The
//! frame types at the bottom carry those writes over a byte-stream link (USB CDC on
//! the reference board), COBS-framed like the bootloader protocol.

use serde::{Deserialize, Serialize};

use crate::flags::PersistentFlags;
use crate::mode::OperatingMode;

/// Largest attribute write accepted from a peer.
pub const MAX_ATTRIBUTE_WRITE: usize = 64;

/// Control-point attribute in the standard service table.
pub const CONTROL_POINT_HANDLE: u16 = 0x0012;

/// Largest COBS frame on the byte-stream link.
pub const MAX_FRAME_SIZE: usize = 128;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlCommand {
    /// Ask for update mode without the physical trigger.
    EnterUpdateMode,
    /// Reset into the Updater image.
    RequestHandoff,
    GetStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlAck {
    Ok,
    BadCommand,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceSet {
    Standard,
    WithUpdater,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusReport {
    pub mode: OperatingMode,
    pub flags: PersistentFlags,
    pub services: ServiceSet,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlResponse {
    Ack(ControlAck),
    Status(StatusReport),
}

pub fn decode_command(data: &[u8]) -> Result<ControlCommand, postcard::Error> {
    postcard::from_bytes(data)
}

pub fn encode_command<'a>(
    cmd: &ControlCommand,
    buf: &'a mut [u8],
) -> Result<&'a mut [u8], postcard::Error> {
    postcard::to_slice(cmd, buf)
}

// --- Byte-stream link frames ---

/// Peer -> device.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum PeerFrame {
    Write {
        attribute: u16,
        data: heapless::Vec<u8, MAX_ATTRIBUTE_WRITE>,
    },
}

/// Device -> peer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFrame {
    ServiceChanged(ServiceSet),
    Response(ControlResponse),
}
