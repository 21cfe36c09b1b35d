// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host tool for duet devices via USB CDC.
//!
//! Usage:
//!   duet-ctl --port /dev/ttyACM0 status
//!   duet-ctl --port /dev/ttyACM0 update-mode
//!   duet-ctl --port /dev/ttyACM0 handoff
//!   duet-ctl seal app.bin --version 2 --output app.sealed.bin
//!   duet-ctl verify app.sealed.bin

mod cli;
mod commands;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
