// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial transport layer for control-point communication.

use anyhow::{bail, Context, Result};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

use duet_common::control::{
    encode_command, ControlCommand, ControlResponse, DeviceFrame, PeerFrame, ServiceSet,
    CONTROL_POINT_HANDLE, MAX_ATTRIBUTE_WRITE, MAX_FRAME_SIZE,
};

/// Default timeout for serial operations in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Time the device needs to notice DTR and report the link up.
const LINK_SETTLE_MS: u64 = 50;

/// USB CDC transport to the Application's control point.
pub struct Transport {
    port: Box<dyn SerialPort>,
    rx_buf: Vec<u8>,
    services: Option<ServiceSet>,
}

impl Transport {
    /// Open the port and raise DTR, which the device treats as a connection.
    pub fn new(port_name: &str) -> Result<Self> {
        Self::with_timeout(port_name, DEFAULT_TIMEOUT_MS)
    }

    pub fn with_timeout(port_name: &str, timeout_ms: u64) -> Result<Self> {
        let mut port = serialport::new(port_name, 115200)
            .timeout(Duration::from_millis(timeout_ms))
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;
        port.write_data_terminal_ready(true)
            .context("Failed to raise DTR")?;
        std::thread::sleep(Duration::from_millis(LINK_SETTLE_MS));

        Ok(Self {
            port,
            rx_buf: Vec::with_capacity(MAX_FRAME_SIZE),
            services: None,
        })
    }

    pub fn port_name(&self) -> String {
        self.port.name().unwrap_or_else(|| "?".to_string())
    }

    /// Last service table the device announced on this connection.
    pub fn services(&self) -> Option<ServiceSet> {
        self.services
    }

    pub fn send(&mut self, frame: &PeerFrame) -> Result<()> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let encoded = postcard::to_slice_cobs(frame, &mut buf)
            .map_err(|e| anyhow::anyhow!("Failed to serialize frame: {}", e))?;
        self.port
            .write_all(encoded)
            .map_err(|e| anyhow::anyhow!("Failed to write to serial port: {}", e))?;
        self.port.flush()?;
        Ok(())
    }

    /// Receive the next frame from the device.
    pub fn receive(&mut self) -> Result<DeviceFrame> {
        self.rx_buf.clear();
        let mut byte = [0u8; 1];

        // Read until we get delimiter (0x00)
        loop {
            match self.port.read(&mut byte) {
                Ok(1) => {
                    self.rx_buf.push(byte[0]);
                    if byte[0] == 0 {
                        break;
                    }
                }
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    bail!("Timeout waiting for response");
                }
                Err(e) => bail!("Serial read error: {}", e),
            }
        }

        postcard::from_bytes_cobs(&mut self.rx_buf).map_err(|e| {
            anyhow::anyhow!(
                "Failed to deserialize frame: {} (raw {} bytes: {:02x?})",
                e,
                self.rx_buf.len(),
                &self.rx_buf[..self.rx_buf.len().min(32)]
            )
        })
    }

    /// Write a command to the control point and wait for its response. Service-changed
    /// indications received meanwhile are recorded, not returned.
    pub fn request(&mut self, cmd: &ControlCommand) -> Result<ControlResponse> {
        let mut buf = [0u8; MAX_ATTRIBUTE_WRITE];
        let encoded = encode_command(cmd, &mut buf)
            .map_err(|e| anyhow::anyhow!("Failed to serialize command: {}", e))?;
        let data = heapless::Vec::from_slice(encoded)
            .map_err(|_| anyhow::anyhow!("Command does not fit one attribute write"))?;

        self.drain_rx();
        self.send(&PeerFrame::Write {
            attribute: CONTROL_POINT_HANDLE,
            data,
        })?;

        loop {
            match self.receive()? {
                DeviceFrame::Response(response) => return Ok(response),
                DeviceFrame::ServiceChanged(services) => self.services = Some(services),
            }
        }
    }

    /// Drop stale bytes, keeping any service-changed indication among them.
    fn drain_rx(&mut self) {
        let old_timeout = self.port.timeout();
        let _ = self.port.set_timeout(Duration::from_millis(10));
        while let Ok(frame) = self.receive() {
            if let DeviceFrame::ServiceChanged(services) = frame {
                self.services = Some(services);
            }
        }
        let _ = self.port.set_timeout(old_timeout);
    }
}
