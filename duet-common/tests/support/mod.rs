// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Recording fakes for the supervisor collaborators.

#![allow(dead_code)]

use std::collections::VecDeque;

use duet_common::boot::{BootContext, ResetCause, ResetController, WakeSource};
use duet_common::config::ControllerConfig;
use duet_common::control::{encode_command, ControlCommand, ControlResponse, CONTROL_POINT_HANDLE};
use duet_common::link::{
    AdvertisingMode, AttributeHandle, ConnectionHandle, ConnectionParameters, LinkError,
    LinkEvent, LinkLayer, WriteData,
};
use duet_common::mode::IndicatorState;
use duet_common::store::{FlagStore, RetainedWords};
use duet_common::supervisor::{Indicators, Parts, Supervisor, Watchdog};
use duet_common::transfer::{UpdateOutcome, UpdateTransfer};
use duet_common::trigger::Trigger;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkCommand {
    Advertise(AdvertisingMode),
    ServiceChanged(ConnectionHandle),
    UpdateExposure,
    Parameters(ConnectionHandle, ConnectionParameters),
    Reply(ConnectionHandle, ControlResponse),
}

#[derive(Default)]
pub struct FakeLink {
    pub events: VecDeque<LinkEvent>,
    pub commands: Vec<LinkCommand>,
    pub reject_advertising: bool,
}

impl FakeLink {
    pub fn push(&mut self, event: LinkEvent) {
        self.events.push_back(event);
    }

    pub fn count(&self, pred: impl Fn(&LinkCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }
}

impl LinkLayer for FakeLink {
    fn poll(&mut self) -> Option<LinkEvent> {
        self.events.pop_front()
    }

    fn start_advertising(&mut self, mode: AdvertisingMode) -> Result<(), LinkError> {
        if self.reject_advertising {
            return Err(LinkError::AdvertisingRejected);
        }
        self.commands.push(LinkCommand::Advertise(mode));
        Ok(())
    }

    fn notify_service_table_changed(
        &mut self,
        connection: ConnectionHandle,
    ) -> Result<(), LinkError> {
        self.commands.push(LinkCommand::ServiceChanged(connection));
        Ok(())
    }

    fn begin_update_exposure(&mut self) -> Result<(), LinkError> {
        self.commands.push(LinkCommand::UpdateExposure);
        Ok(())
    }

    fn request_connection_parameters(
        &mut self,
        connection: ConnectionHandle,
        params: ConnectionParameters,
    ) -> Result<(), LinkError> {
        self.commands.push(LinkCommand::Parameters(connection, params));
        Ok(())
    }

    fn reply(
        &mut self,
        connection: ConnectionHandle,
        response: &ControlResponse,
    ) -> Result<(), LinkError> {
        self.commands.push(LinkCommand::Reply(connection, *response));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTransfer {
    pub starts: u32,
    pub writes: Vec<(AttributeHandle, Vec<u8>)>,
    pub outcome: Option<UpdateOutcome>,
}

impl UpdateTransfer for FakeTransfer {
    fn start(&mut self) {
        self.starts += 1;
    }

    fn on_write(&mut self, attribute: AttributeHandle, data: &[u8]) {
        self.writes.push((attribute, data.to_vec()));
    }

    fn poll(&mut self) -> Option<UpdateOutcome> {
        self.outcome.take()
    }
}

pub struct FakeReset {
    pub cause: ResetCause,
    pub soft_resets: u32,
    pub sleeps: Vec<WakeSource>,
}

impl FakeReset {
    pub fn new(cause: ResetCause) -> Self {
        Self {
            cause,
            soft_resets: 0,
            sleeps: Vec::new(),
        }
    }
}

impl ResetController for FakeReset {
    fn reset_cause(&self) -> ResetCause {
        self.cause
    }

    fn soft_reset(&mut self) {
        self.soft_resets += 1;
    }

    fn deep_sleep(&mut self, wake: WakeSource) {
        self.sleeps.push(wake);
    }
}

#[derive(Default)]
pub struct FakeWatchdog {
    pub feeds: u32,
}

impl Watchdog for FakeWatchdog {
    fn feed(&mut self) {
        self.feeds += 1;
    }
}

#[derive(Default)]
pub struct FakeIndicators {
    pub shown: Vec<IndicatorState>,
}

impl Indicators for FakeIndicators {
    fn show(&mut self, state: IndicatorState) {
        self.shown.push(state);
    }
}

/// Trigger answering from a script; a software request always activates.
#[derive(Default)]
pub struct ScriptedTrigger {
    pub script: VecDeque<bool>,
    pub software_requests: Vec<bool>,
}

impl Trigger for ScriptedTrigger {
    fn poll(&mut self, software_request: bool) -> bool {
        self.software_requests.push(software_request);
        let line = self.script.pop_front().unwrap_or(false);
        software_request || line
    }
}

pub type TestParts = Parts<
    FakeLink,
    FakeTransfer,
    FakeReset,
    FakeWatchdog,
    FakeIndicators,
    RetainedWords,
    ScriptedTrigger,
>;

pub type TestSupervisor = Supervisor<
    FakeLink,
    FakeTransfer,
    FakeReset,
    FakeWatchdog,
    FakeIndicators,
    RetainedWords,
    ScriptedTrigger,
>;

pub fn parts(cause: ResetCause, memory: RetainedWords) -> TestParts {
    Parts {
        link: FakeLink::default(),
        transfer: FakeTransfer::default(),
        reset: FakeReset::new(cause),
        watchdog: FakeWatchdog::default(),
        indicators: FakeIndicators::default(),
        store: FlagStore::new(memory),
        trigger: ScriptedTrigger::default(),
    }
}

/// Classify the boot from the retained memory, then build the supervisor.
pub fn power_on(
    cause: ResetCause,
    memory: RetainedWords,
    config: ControllerConfig,
) -> (BootContext, TestSupervisor) {
    let parts = parts(cause, memory);
    let boot = BootContext::load(&parts.reset, &parts.store);
    (boot, Supervisor::new(config, &boot, parts))
}

/// Retained memory after the supervisor halted: what the next boot sees.
pub fn retained(supervisor: TestSupervisor) -> RetainedWords {
    supervisor.into_parts().store.into_inner()
}

pub fn control_write(connection: ConnectionHandle, cmd: ControlCommand) -> LinkEvent {
    let mut buf = [0u8; 16];
    let bytes = encode_command(&cmd, &mut buf).unwrap();
    LinkEvent::ServiceWriteReceived {
        connection,
        attribute: AttributeHandle(CONTROL_POINT_HANDLE),
        data: WriteData::from_slice(bytes).unwrap(),
    }
}
