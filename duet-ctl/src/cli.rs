// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::commands;
use crate::transport::Transport;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "duet-ctl")]
#[command(about = "Control and image tool for duet devices")]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyACM0), required by device commands
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Show the Application's mode, persistent flags and exposed services
    Status,

    /// Ask the Application to enter update mode without the trigger line
    UpdateMode,

    /// Reset the device into the Updater image
    Handoff,

    /// Write the integrity header of a raw Application binary
    Seal {
        /// Application binary (objcopy -O binary), starting with the header page
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Image version number
        #[arg(short, long, default_value = "1")]
        version: u32,

        /// Output file (defaults to <FILE> with a .sealed.bin extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a sealed image the way the Updater does before launching it
    Verify {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status => commands::status(&mut connect(cli.port)?),
        Commands::UpdateMode => commands::update_mode(&mut connect(cli.port)?),
        Commands::Handoff => commands::handoff(&mut connect(cli.port)?),
        Commands::Seal {
            file,
            version,
            output,
        } => commands::seal(&file, version, output.as_deref()),
        Commands::Verify { file } => commands::verify(&file),
    }
}

fn connect(port: Option<String>) -> Result<Transport> {
    let port = port.context("--port is required for commands sent to the device")?;
    Transport::new(&port)
}
