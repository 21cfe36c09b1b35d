// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Application mode controller - pure logic without hardware dependencies.
//!
//! The controller owns the operating mode and an in-memory copy of the persistent flags.
//! Each event goes through [`ModeController::handle`], which updates the state and returns
//! the [`Action`]s for the caller to carry out in order. Nothing here touches hardware, so
//! every transition can be exercised on the host.

use serde::{Deserialize, Serialize};

use crate::boot::{BootContext, WakeSource};
use crate::config::{ControllerConfig, SleepPolicy};
use crate::control::{
    decode_command, ControlAck, ControlCommand, ControlResponse, ServiceSet, StatusReport,
};
use crate::flags::{PersistentFlags, RequestedRole};
use crate::handoff;
use crate::link::{
    AdvertisingMode, AttributeHandle, ConnectionHandle, ConnectionParameters, LinkEvent,
    WriteData,
};
use crate::log;
use crate::transfer::UpdateOutcome;

/// Upper bound on the actions produced by a single event.
pub const MAX_ACTIONS: usize = 6;

pub type Actions = heapless::Vec<Action, MAX_ACTIONS>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    Advertising,
    Connected,
    UpdateModeActive,
    EnteringDeepSleep,
}

/// How the current boot ends once the controller stops accepting events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Terminal {
    Reset,
    DeepSleep,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorState {
    Advertising,
    Connected,
    UpdateMode,
    Off,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Link(LinkEvent),
    /// The debouncer reported a sustained trigger (or a pending software request).
    TriggerActivated,
    Update(UpdateOutcome),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    StartAdvertising(AdvertisingMode),
    NotifyServiceTableChanged(ConnectionHandle),
    BeginUpdateExposure,
    StartUpdateTransfer,
    ForwardToTransfer {
        attribute: AttributeHandle,
        data: WriteData,
    },
    RequestConnectionParameters(ConnectionHandle, ConnectionParameters),
    Reply(ConnectionHandle, ControlResponse),
    ShowIndicator(IndicatorState),
    Commit(PersistentFlags),
    SoftReset,
    DeepSleep(WakeSource),
}

pub struct ModeController {
    config: ControllerConfig,
    mode: OperatingMode,
    flags: PersistentFlags,
    connection: Option<ConnectionHandle>,
    services: ServiceSet,
    service_changed_sent: bool,
    terminal: Option<Terminal>,
}

impl ModeController {
    /// Start in `Advertising`. Update mode never carries over a reset; a software request
    /// committed before the reset (or sleep) stays pending.
    pub fn new(config: ControllerConfig, boot: &BootContext) -> Self {
        Self {
            config,
            mode: OperatingMode::Advertising,
            flags: PersistentFlags {
                requested_role: RequestedRole::RunApplication,
                update_mode_active: false,
                update_request_pending: boot.flags.update_request_pending,
            },
            connection: None,
            services: ServiceSet::Standard,
            service_changed_sent: false,
            terminal: None,
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn flags(&self) -> &PersistentFlags {
        &self.flags
    }

    pub fn connection(&self) -> Option<ConnectionHandle> {
        self.connection
    }

    pub fn services(&self) -> ServiceSet {
        self.services
    }

    pub fn terminal(&self) -> Option<Terminal> {
        self.terminal
    }

    /// The debouncer is only consulted while a switch into update mode is still possible.
    pub fn accepts_trigger(&self) -> bool {
        self.terminal.is_none()
            && matches!(self.mode, OperatingMode::Advertising | OperatingMode::Connected)
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            mode: self.mode,
            flags: self.flags,
            services: self.services,
        }
    }

    pub fn handle(&mut self, event: Event) -> Actions {
        let mut actions = Actions::new();
        if self.terminal.is_some() {
            log::debug!("event ignored after terminal transition");
            return actions;
        }

        match event {
            Event::Link(link) => self.on_link(link, &mut actions),
            Event::TriggerActivated => self.on_trigger(&mut actions),
            Event::Update(outcome) => self.on_update(outcome, &mut actions),
        }
        actions
    }

    /// Hand control to the Updater image. A second call in the same boot does nothing.
    pub fn request_handoff(&mut self) -> Actions {
        let mut actions = Actions::new();
        if self.terminal.is_none() {
            self.push_handoff(&mut actions);
        }
        actions
    }

    fn on_link(&mut self, event: LinkEvent, actions: &mut Actions) {
        match event {
            LinkEvent::StackReady => {
                if self.connection.is_none() {
                    push(actions, Action::StartAdvertising(AdvertisingMode::Fast));
                }
                if self.mode == OperatingMode::Advertising {
                    push(actions, Action::ShowIndicator(IndicatorState::Advertising));
                }
            }
            LinkEvent::LinkUp {
                connection,
                interval,
            } => self.on_link_up(connection, interval, actions),
            LinkEvent::LinkDown { connection } => self.on_link_down(connection, actions),
            LinkEvent::AdvertisingWindowElapsed {
                connection_in_flight,
            } => self.on_advertising_elapsed(connection_in_flight, actions),
            LinkEvent::ServiceWriteReceived {
                connection,
                attribute,
                data,
            } => {
                if attribute == self.config.control_point {
                    self.on_control_write(connection, &data, actions);
                } else if self.mode == OperatingMode::UpdateModeActive {
                    push(actions, Action::ForwardToTransfer { attribute, data });
                } else {
                    log::info!("write to attribute {} ignored", attribute.0);
                }
            }
        }
    }

    fn on_link_up(&mut self, connection: ConnectionHandle, interval: u16, actions: &mut Actions) {
        if let Some(active) = self.connection {
            if active != connection {
                log::warn!("link up for {} while {} is active, ignored", connection.0, active.0);
                return;
            }
        }
        log::info!("link up: {} (interval {})", connection.0, interval);
        self.connection = Some(connection);

        match self.mode {
            OperatingMode::Advertising => {
                self.mode = OperatingMode::Connected;
                push(actions, Action::ShowIndicator(IndicatorState::Connected));
            }
            OperatingMode::Connected => {
                log::debug!("link up repeated for {}", connection.0);
            }
            OperatingMode::UpdateModeActive => {
                if interval > self.config.update_connection.interval_max {
                    push(
                        actions,
                        Action::RequestConnectionParameters(
                            connection,
                            self.config.update_connection,
                        ),
                    );
                }
            }
            OperatingMode::EnteringDeepSleep => {}
        }
    }

    fn on_link_down(&mut self, connection: ConnectionHandle, actions: &mut Actions) {
        if self.connection != Some(connection) {
            log::debug!("link down for inactive handle {}", connection.0);
            return;
        }

        log::info!("link down: {}", connection.0);
        self.connection = None;
        if self.mode == OperatingMode::Connected {
            self.mode = OperatingMode::Advertising;
            push(actions, Action::ShowIndicator(IndicatorState::Advertising));
        }
        push(actions, Action::StartAdvertising(AdvertisingMode::Fast));
    }

    fn on_advertising_elapsed(&mut self, connection_in_flight: bool, actions: &mut Actions) {
        match self.mode {
            OperatingMode::Advertising => {
                if self.flags.update_request_pending {
                    log::info!("pending update request honoured at end of advertising");
                    self.enter_update_mode(actions);
                    // The window stopped advertising; the update service must stay reachable
                    if self.connection.is_none() {
                        push(actions, Action::StartAdvertising(AdvertisingMode::Fast));
                    }
                } else if connection_in_flight
                    && self.config.sleep_policy == SleepPolicy::DeferWhileConnecting
                {
                    push(actions, Action::StartAdvertising(AdvertisingMode::Slow));
                } else {
                    self.enter_deep_sleep(actions);
                }
            }
            OperatingMode::UpdateModeActive if self.connection.is_none() => {
                push(actions, Action::StartAdvertising(AdvertisingMode::Fast));
            }
            _ => {}
        }
    }

    fn on_control_write(&mut self, connection: ConnectionHandle, data: &[u8], actions: &mut Actions) {
        let response = match decode_command(data) {
            Ok(ControlCommand::EnterUpdateMode) => {
                if self.mode != OperatingMode::UpdateModeActive {
                    self.flags.update_request_pending = true;
                }
                ControlResponse::Ack(ControlAck::Ok)
            }
            Ok(ControlCommand::GetStatus) => ControlResponse::Status(self.status()),
            Ok(ControlCommand::RequestHandoff) => {
                push(actions, Action::Reply(connection, ControlResponse::Ack(ControlAck::Ok)));
                self.push_handoff(actions);
                return;
            }
            Err(_) => {
                log::warn!("undecodable control write ({} bytes)", data.len());
                ControlResponse::Ack(ControlAck::BadCommand)
            }
        };
        push(actions, Action::Reply(connection, response));
    }

    fn on_trigger(&mut self, actions: &mut Actions) {
        match self.mode {
            OperatingMode::Advertising | OperatingMode::Connected => self.enter_update_mode(actions),
            OperatingMode::UpdateModeActive | OperatingMode::EnteringDeepSleep => {}
        }
    }

    fn on_update(&mut self, outcome: UpdateOutcome, actions: &mut Actions) {
        if self.mode != OperatingMode::UpdateModeActive {
            log::warn!("update outcome outside update mode ignored");
            return;
        }

        match outcome {
            UpdateOutcome::Completed => {
                let role = self.config.post_update_policy.role();
                log::info!("update completed, next role {}", role);
                self.flags.requested_role = role;
                self.flags.update_request_pending = false;
                push(actions, Action::Commit(self.flags));
                push(actions, Action::SoftReset);
                self.terminal = Some(Terminal::Reset);
            }
            UpdateOutcome::Failed(reason) => {
                log::warn!("update failed: {}, waiting for a new session", reason);
                if self.connection.is_none() {
                    push(actions, Action::StartAdvertising(AdvertisingMode::Fast));
                }
                push(actions, Action::StartUpdateTransfer);
            }
        }
    }

    fn enter_update_mode(&mut self, actions: &mut Actions) {
        log::info!("entering update mode");
        self.mode = OperatingMode::UpdateModeActive;
        self.flags.update_mode_active = true;
        self.flags.update_request_pending = false;
        self.services = ServiceSet::WithUpdater;

        push(actions, Action::BeginUpdateExposure);
        if let Some(connection) = self.connection {
            if !self.service_changed_sent {
                self.service_changed_sent = true;
                push(actions, Action::NotifyServiceTableChanged(connection));
            }
        }
        push(actions, Action::ShowIndicator(IndicatorState::UpdateMode));
        push(actions, Action::StartUpdateTransfer);
    }

    fn enter_deep_sleep(&mut self, actions: &mut Actions) {
        log::info!("advertising window over, entering deep sleep");
        self.mode = OperatingMode::EnteringDeepSleep;
        self.terminal = Some(Terminal::DeepSleep);

        push(actions, Action::Commit(self.flags));
        push(actions, Action::ShowIndicator(IndicatorState::Off));
        push(actions, Action::DeepSleep(self.config.wake_source));
    }

    fn push_handoff(&mut self, actions: &mut Actions) {
        log::info!("handoff to updater requested");
        self.flags = handoff::schedule_updater(self.flags);
        push(actions, Action::Commit(self.flags));
        push(actions, Action::SoftReset);
        self.terminal = Some(Terminal::Reset);
    }
}

fn push(actions: &mut Actions, action: Action) {
    if actions.push(action).is_err() {
        log::error!("action queue full, action dropped");
    }
}
