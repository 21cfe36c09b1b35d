// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations for device and image operations.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use duet_common::control::{ControlAck, ControlCommand, ControlResponse, DeviceFrame};
use duet_common::image::{seal_image, verify_image, ImageInfo};

use crate::transport::Transport;

/// Get and display the Application status.
pub fn status(transport: &mut Transport) -> Result<()> {
    let response = transport.request(&ControlCommand::GetStatus)?;

    match response {
        ControlResponse::Status(report) => {
            println!("Application Status:");
            println!("  Mode:           {:?}", report.mode);
            println!("  Requested role: {:?}", report.flags.requested_role);
            println!("  Update active:  {}", report.flags.update_mode_active);
            println!("  Request pending: {}", report.flags.update_request_pending);
            println!("  Services:       {:?}", report.services);
        }
        ControlResponse::Ack(status) => {
            println!("Unexpected ACK response: {:?}", status);
        }
    }

    Ok(())
}

/// Ask for update mode. The device enters it on its next loop pass.
pub fn update_mode(transport: &mut Transport) -> Result<()> {
    println!("Requesting update mode...");

    match transport.request(&ControlCommand::EnterUpdateMode)? {
        ControlResponse::Ack(ControlAck::Ok) => println!("Request accepted."),
        ControlResponse::Ack(ControlAck::BadCommand) => bail!("Device rejected the command"),
        response => bail!("Unexpected response: {:?}", response),
    }

    if transport.services().is_none() {
        // The service-changed indication follows the ack
        if let Ok(DeviceFrame::ServiceChanged(services)) = transport.receive() {
            println!("Device now exposes {:?} services.", services);
        }
    }

    println!(
        "The device resets into the Updater once the session completes; flash a sealed image \
         through the boot ROM loader that appears on {}.",
        transport.port_name()
    );
    Ok(())
}

/// Reset the device into the Updater image.
pub fn handoff(transport: &mut Transport) -> Result<()> {
    println!("Requesting handoff to the Updater...");

    match transport.request(&ControlCommand::RequestHandoff)? {
        ControlResponse::Ack(ControlAck::Ok) => println!("OK, device is resetting."),
        ControlResponse::Ack(ControlAck::BadCommand) => bail!("Device rejected the command"),
        response => bail!("Unexpected response: {:?}", response),
    }

    Ok(())
}

/// Seal a raw Application binary and write it to `output`.
pub fn seal(file: &Path, version: u32, output: Option<&Path>) -> Result<()> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| sealed_path(file));
    let info = seal_file(file, &output, version)?;

    println!("Sealed: {} -> {}", file.display(), output.display());
    print_info(&info);
    Ok(())
}

/// Verify a sealed image.
pub fn verify(file: &Path) -> Result<()> {
    let image = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    match verify_image(&image) {
        Ok(info) => {
            println!("{}: OK", file.display());
            print_info(&info);
            Ok(())
        }
        Err(e) => bail!("{}: {}", file.display(), e),
    }
}

fn seal_file(input: &Path, output: &Path, version: u32) -> Result<ImageInfo> {
    let mut image =
        fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let info = seal_image(&mut image, version)
        .map_err(|e| anyhow::anyhow!("Cannot seal {}: {}", input.display(), e))?;
    fs::write(output, &image).with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(info)
}

fn sealed_path(file: &Path) -> PathBuf {
    file.with_extension("sealed.bin")
}

fn print_info(info: &ImageInfo) {
    println!("  Version:      {}", info.version);
    println!("  Size:         {} bytes", info.image_size);
    println!("  CRC32:        0x{:08x}", info.crc32);
    println!("  Initial SP:   0x{:08x}", info.initial_sp);
    println!("  Reset vector: 0x{:08x}", info.reset_vector);
}

#[cfg(test)]
mod tests {
    use super::*;

    use duet_common::layout::{APP_VECTOR_ADDR, IMAGE_HEADER_SIZE, IMAGE_MAGIC_UNSEALED, RAM_END};

    const HEADER_LEN: usize = IMAGE_HEADER_SIZE as usize;

    fn unsealed_binary() -> Vec<u8> {
        let mut image = vec![0xFFu8; HEADER_LEN + 256];
        image[..4].copy_from_slice(&IMAGE_MAGIC_UNSEALED.to_le_bytes());
        image[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(&RAM_END.to_le_bytes());
        image[HEADER_LEN + 4..HEADER_LEN + 8]
            .copy_from_slice(&(APP_VECTOR_ADDR + 0xC1).to_le_bytes());
        image
    }

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("duet-ctl-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_sealed_path_replaces_extension() {
        assert_eq!(
            sealed_path(Path::new("out/app.bin")),
            PathBuf::from("out/app.sealed.bin")
        );
        assert_eq!(sealed_path(Path::new("app")), PathBuf::from("app.sealed.bin"));
    }

    #[test]
    fn test_seal_file_output_verifies() {
        let input = scratch("app.bin");
        let output = scratch("app.sealed.bin");
        fs::write(&input, unsealed_binary()).unwrap();

        let info = seal_file(&input, &output, 7).unwrap();
        let sealed = fs::read(&output).unwrap();
        assert_eq!(verify_image(&sealed).unwrap(), info);
        assert_eq!(info.version, 7);
        assert!(verify(&output).is_ok());

        fs::remove_file(input).ok();
        fs::remove_file(output).ok();
    }

    #[test]
    fn test_seal_file_rejects_headerless_binary() {
        let input = scratch("raw.bin");
        let output = scratch("raw.sealed.bin");
        fs::write(&input, vec![0u8; HEADER_LEN + 64]).unwrap();

        assert!(seal_file(&input, &output, 1).is_err());
        assert!(!output.exists());

        fs::remove_file(input).ok();
    }
}
