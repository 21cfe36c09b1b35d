// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Interface to the link-layer stack: the events it reports and the commands it accepts.

use core::fmt;

use crate::control::{ControlResponse, MAX_ATTRIBUTE_WRITE};

/// Identifier of a live link, owned by the link layer.
///
/// The controller tracks a single link: a `LinkUp` for another handle while one is
/// active is ignored until that link goes down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionHandle(pub u16);

/// Handle of an attribute in the exposed service table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttributeHandle(pub u16);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdvertisingMode {
    Fast,
    Slow,
}

/// Connection parameters in link-layer units (1.25 ms intervals, 10 ms timeout).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionParameters {
    pub interval_min: u16,
    pub interval_max: u16,
    pub latency: u16,
    pub supervision_timeout: u16,
}

/// Fastest interval the update path asks for.
pub const FAST_CONNECTION_INTERVAL: u16 = 0x0006;

impl ConnectionParameters {
    /// Parameters requested for peers connected while update mode is active.
    pub const UPDATE: Self = Self {
        interval_min: FAST_CONNECTION_INTERVAL,
        interval_max: FAST_CONNECTION_INTERVAL,
        latency: 0x0000,
        supervision_timeout: 0x0064,
    };
}

pub type WriteData = heapless::Vec<u8, MAX_ATTRIBUTE_WRITE>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    /// The stack finished starting and can advertise.
    StackReady,
    LinkUp {
        connection: ConnectionHandle,
        interval: u16,
    },
    LinkDown {
        connection: ConnectionHandle,
    },
    /// The advertising window ran out without a connection.
    AdvertisingWindowElapsed {
        connection_in_flight: bool,
    },
    ServiceWriteReceived {
        connection: ConnectionHandle,
        attribute: AttributeHandle,
        data: WriteData,
    },
}

/// Transient link-layer failures. Logged and retried on the next natural event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    AdvertisingRejected,
    ParameterUpdateRejected,
    NotConnected,
    Busy,
    Transport,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::AdvertisingRejected => "advertising start rejected",
            Self::ParameterUpdateRejected => "connection parameter update rejected",
            Self::NotConnected => "no such connection",
            Self::Busy => "link layer busy",
            Self::Transport => "transport error",
        };
        f.write_str(msg)
    }
}

pub trait LinkLayer {
    /// Next pending event, if any. Called from the main loop only.
    fn poll(&mut self) -> Option<LinkEvent>;

    fn start_advertising(&mut self, mode: AdvertisingMode) -> Result<(), LinkError>;

    /// Tell the peer that the service table changed so it drops cached handles.
    fn notify_service_table_changed(&mut self, connection: ConnectionHandle)
        -> Result<(), LinkError>;

    /// Switch the exposed service table to the update-capable configuration.
    fn begin_update_exposure(&mut self) -> Result<(), LinkError>;

    fn request_connection_parameters(
        &mut self,
        connection: ConnectionHandle,
        params: ConnectionParameters,
    ) -> Result<(), LinkError>;

    fn reply(
        &mut self,
        connection: ConnectionHandle,
        response: &ControlResponse,
    ) -> Result<(), LinkError>;
}
