// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Cooperative main loop of the Application image.
//!
//! The supervisor owns the collaborators and the [`ModeController`]. One [`Supervisor::step`]
//! is one loop iteration: feed the watchdog, drain link events, poll the transfer handler,
//! then check the trigger. The trigger is also checked ahead of an advertising-window
//! event, before the controller can decide to sleep. Actions returned by the controller are applied in order.

use crate::boot::{BootContext, ResetController};
use crate::config::ControllerConfig;
use crate::link::{LinkError, LinkEvent, LinkLayer};
use crate::log;
use crate::mode::{Action, Actions, Event, IndicatorState, ModeController, Terminal};
use crate::store::{FlagStore, RetainedMemory};
use crate::transfer::UpdateTransfer;
use crate::trigger::Trigger;

pub trait Watchdog {
    fn feed(&mut self);
}

pub trait Indicators {
    fn show(&mut self, state: IndicatorState);
}

/// Collaborators driven by the supervisor.
pub struct Parts<L, U, R, W, I, M: RetainedMemory, T> {
    pub link: L,
    pub transfer: U,
    pub reset: R,
    pub watchdog: W,
    pub indicators: I,
    pub store: FlagStore<M>,
    pub trigger: T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    Continue,
    /// A reset or deep sleep was issued. On hardware this is never observed.
    Halted(Terminal),
}

pub struct Supervisor<L, U, R, W, I, M: RetainedMemory, T> {
    controller: ModeController,
    parts: Parts<L, U, R, W, I, M, T>,
}

impl<L, U, R, W, I, M, T> Supervisor<L, U, R, W, I, M, T>
where
    L: LinkLayer,
    U: UpdateTransfer,
    R: ResetController,
    W: Watchdog,
    I: Indicators,
    M: RetainedMemory,
    T: Trigger,
{
    pub fn new(config: ControllerConfig, boot: &BootContext, parts: Parts<L, U, R, W, I, M, T>) -> Self {
        Self {
            controller: ModeController::new(config, boot),
            parts,
        }
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }

    pub fn parts(&self) -> &Parts<L, U, R, W, I, M, T> {
        &self.parts
    }

    pub fn parts_mut(&mut self) -> &mut Parts<L, U, R, W, I, M, T> {
        &mut self.parts
    }

    pub fn into_parts(self) -> Parts<L, U, R, W, I, M, T> {
        self.parts
    }

    /// Hand control to the Updater image (commit, then reset).
    pub fn request_handoff(&mut self) -> Step {
        let actions = self.controller.request_handoff();
        self.apply(actions)
    }

    /// Run until a reset or deep sleep is issued.
    pub fn run(&mut self) -> Terminal {
        loop {
            if let Step::Halted(terminal) = self.step() {
                return terminal;
            }
        }
    }

    pub fn step(&mut self) -> Step {
        if let Some(terminal) = self.controller.terminal() {
            return Step::Halted(terminal);
        }

        self.parts.watchdog.feed();

        while let Some(event) = self.parts.link.poll() {
            // The end of the window may put the chip to sleep: a trigger held now must
            // win, since its wake edge has already passed.
            if matches!(event, LinkEvent::AdvertisingWindowElapsed { .. }) {
                if let Step::Halted(terminal) = self.check_trigger() {
                    return Step::Halted(terminal);
                }
            }
            if let Step::Halted(terminal) = self.dispatch(Event::Link(event)) {
                return Step::Halted(terminal);
            }
        }

        if let Some(outcome) = self.parts.transfer.poll() {
            if let Step::Halted(terminal) = self.dispatch(Event::Update(outcome)) {
                return Step::Halted(terminal);
            }
        }

        self.check_trigger()
    }

    fn check_trigger(&mut self) -> Step {
        if self.controller.accepts_trigger() {
            let software_request = self.controller.flags().update_request_pending;
            if self.parts.trigger.poll(software_request) {
                return self.dispatch(Event::TriggerActivated);
            }
        }
        Step::Continue
    }

    fn dispatch(&mut self, event: Event) -> Step {
        let actions = self.controller.handle(event);
        self.apply(actions)
    }

    fn apply(&mut self, actions: Actions) -> Step {
        for action in actions {
            match action {
                Action::StartAdvertising(mode) => {
                    transient(self.parts.link.start_advertising(mode));
                }
                Action::NotifyServiceTableChanged(connection) => {
                    transient(self.parts.link.notify_service_table_changed(connection));
                }
                Action::BeginUpdateExposure => {
                    transient(self.parts.link.begin_update_exposure());
                }
                Action::StartUpdateTransfer => self.parts.transfer.start(),
                Action::ForwardToTransfer { attribute, data } => {
                    self.parts.transfer.on_write(attribute, &data);
                }
                Action::RequestConnectionParameters(connection, params) => {
                    transient(
                        self.parts
                            .link
                            .request_connection_parameters(connection, params),
                    );
                }
                Action::Reply(connection, response) => {
                    transient(self.parts.link.reply(connection, &response));
                }
                Action::ShowIndicator(state) => self.parts.indicators.show(state),
                Action::Commit(flags) => self.parts.store.write(&flags),
                Action::SoftReset => {
                    log::info!("soft reset");
                    self.parts.reset.soft_reset();
                    return Step::Halted(Terminal::Reset);
                }
                Action::DeepSleep(wake) => {
                    log::info!("deep sleep, wake on {}", wake);
                    self.parts.reset.deep_sleep(wake);
                    return Step::Halted(Terminal::DeepSleep);
                }
            }
        }
        Step::Continue
    }
}

/// Link-layer command failures are retried on the next natural event.
fn transient(result: Result<(), LinkError>) {
    if let Err(e) = result {
        log::warn!("link command failed: {}", e);
    }
}
