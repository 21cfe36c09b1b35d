// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Mode arbitration core shared by the duet Updater and Application images.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for embedded targets
//! - `std` feature: Enables `std` support for host tools
//! - `embedded` feature: Enables the RP2040 bindings (retained flags, reset cause, dormant sleep)
//! - `defmt` feature: Routes the core's log lines to `defmt`

#![cfg_attr(not(feature = "std"), no_std)]

mod log;

pub mod boot;
pub mod config;
pub mod control;
pub mod flags;
pub mod handoff;
pub mod image;
pub mod layout;
pub mod link;
pub mod mode;
pub mod store;
pub mod supervisor;
pub mod transfer;
pub mod trigger;

// RP2040 bindings (requires embedded feature)
#[cfg(feature = "embedded")]
pub mod rp2040;

// Re-export commonly used types
pub use boot::{classify, BootContext, BootReason, ResetCause, ResetController, WakeSource};
pub use config::{ControllerConfig, PostUpdatePolicy, SleepPolicy};
pub use flags::{PersistentFlags, RequestedRole};
pub use mode::{Action, Event, IndicatorState, ModeController, OperatingMode, Terminal};
pub use store::{FlagStore, RetainedMemory, RetainedWords, StoreError};
pub use supervisor::{Indicators, Parts, Step, Supervisor, Watchdog};
pub use trigger::{Trigger, TriggerDebouncer, TriggerPolarity};
