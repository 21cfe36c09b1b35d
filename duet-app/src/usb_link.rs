// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Link layer over USB CDC with COBS-framed postcard serialization.
//!
//! The host raising DTR opens a connection and dropping it closes the connection.
//! "Advertising" is the enumerated, unconnected state; its window is timed here.

use duet_common::config::ADVERTISING_WINDOW_MS;
use duet_common::control::{
    ControlResponse, DeviceFrame, PeerFrame, ServiceSet, MAX_FRAME_SIZE,
};
use duet_common::link::{
    AdvertisingMode, AttributeHandle, ConnectionHandle, ConnectionParameters, LinkError,
    LinkEvent, LinkLayer,
};
use rp2040_hal as hal;
use rp2040_hal::fugit::ExtU64;
use rp2040_hal::usb::UsbBus;
use usb_device::class_prelude::UsbBusAllocator;
use usb_device::device::UsbDeviceState;
use usb_device::prelude::*;
use usbd_serial::SerialPort;

const RX_BUF_SIZE: usize = MAX_FRAME_SIZE;
const TX_BUF_SIZE: usize = MAX_FRAME_SIZE;
const READ_CHUNK: usize = 64;

/// Full-speed USB frames are 1 ms; report it in 1.25 ms units like a radio link would.
const USB_CONNECTION_INTERVAL: u16 = 1;

/// Upper bound on write retries while the host is not draining the IN endpoint.
const MAX_WRITE_SPINS: u32 = 10_000;

pub struct UsbLink {
    serial: SerialPort<'static, UsbBus>,
    usb_dev: UsbDevice<'static, UsbBus>,
    timer: hal::Timer,
    rx_buf: [u8; RX_BUF_SIZE],
    rx_pos: usize,
    chunk: [u8; READ_CHUNK],
    chunk_pos: usize,
    chunk_len: usize,
    ready_reported: bool,
    connection: Option<ConnectionHandle>,
    next_handle: u16,
    advertising_deadline: Option<hal::timer::Instant>,
    services: ServiceSet,
}

impl UsbLink {
    pub fn new(usb_bus: &'static UsbBusAllocator<UsbBus>, timer: hal::Timer) -> Self {
        let serial = SerialPort::new(usb_bus);
        let usb_dev = UsbDeviceBuilder::new(usb_bus, UsbVidPid(0x2E8A, 0x000A))
            .strings(&[StringDescriptors::default()
                .manufacturer("ADNT")
                .product("duet Application")
                .serial_number("0001")])
            .unwrap()
            .device_class(usbd_serial::USB_CLASS_CDC)
            .build();

        Self {
            serial,
            usb_dev,
            timer,
            rx_buf: [0u8; RX_BUF_SIZE],
            rx_pos: 0,
            chunk: [0u8; READ_CHUNK],
            chunk_pos: 0,
            chunk_len: 0,
            ready_reported: false,
            connection: None,
            next_handle: 1,
            advertising_deadline: None,
            services: ServiceSet::Standard,
        }
    }

    fn connection_state(&mut self) -> Option<LinkEvent> {
        let dtr = self.serial.dtr();
        match self.connection {
            None if dtr => {
                let connection = ConnectionHandle(self.next_handle);
                self.next_handle = self.next_handle.wrapping_add(1).max(1);
                self.connection = Some(connection);
                self.advertising_deadline = None;
                Some(LinkEvent::LinkUp {
                    connection,
                    interval: USB_CONNECTION_INTERVAL,
                })
            }
            Some(connection) if !dtr => {
                self.connection = None;
                self.rx_pos = 0;
                self.chunk_len = 0;
                Some(LinkEvent::LinkDown { connection })
            }
            _ => None,
        }
    }

    fn advertising_state(&mut self) -> Option<LinkEvent> {
        let deadline = self.advertising_deadline?;
        if self.timer.get_counter() < deadline {
            return None;
        }
        self.advertising_deadline = None;
        // Enumerated but no one opened the port yet
        let connection_in_flight =
            self.usb_dev.state() == UsbDeviceState::Configured && !self.serial.dtr();
        Some(LinkEvent::AdvertisingWindowElapsed {
            connection_in_flight,
        })
    }

    /// Try to decode one complete peer frame, keeping bytes that follow it.
    fn try_receive(&mut self) -> Option<PeerFrame> {
        if self.chunk_pos >= self.chunk_len {
            self.chunk_pos = 0;
            self.chunk_len = match self.serial.read(&mut self.chunk) {
                Ok(count) => count,
                Err(_) => 0,
            };
        }

        while self.chunk_pos < self.chunk_len {
            let byte = self.chunk[self.chunk_pos];
            self.chunk_pos += 1;
            if byte == 0x00 {
                if self.rx_pos > 0 {
                    let result =
                        postcard::from_bytes_cobs::<PeerFrame>(&mut self.rx_buf[..self.rx_pos]);
                    self.rx_pos = 0;
                    match result {
                        Ok(frame) => return Some(frame),
                        Err(_) => defmt::warn!("Dropping undecodable frame"),
                    }
                }
            } else if self.rx_pos < RX_BUF_SIZE {
                self.rx_buf[self.rx_pos] = byte;
                self.rx_pos += 1;
            } else {
                // Overflow, discard frame
                self.rx_pos = 0;
            }
        }
        None
    }

    fn send(&mut self, connection: ConnectionHandle, frame: &DeviceFrame) -> Result<(), LinkError> {
        if self.connection != Some(connection) {
            return Err(LinkError::NotConnected);
        }

        let mut buf = [0u8; TX_BUF_SIZE];
        let encoded = postcard::to_slice_cobs(frame, &mut buf).map_err(|_| LinkError::Transport)?;
        let mut offset = 0;
        let mut spins = 0;
        while offset < encoded.len() {
            match self.serial.write(&encoded[offset..]) {
                Ok(n) => offset += n,
                Err(UsbError::WouldBlock) => {
                    spins += 1;
                    if spins > MAX_WRITE_SPINS {
                        return Err(LinkError::Busy);
                    }
                    self.usb_dev.poll(&mut [&mut self.serial]);
                }
                Err(_) => return Err(LinkError::Transport),
            }
        }
        Ok(())
    }
}

impl LinkLayer for UsbLink {
    fn poll(&mut self) -> Option<LinkEvent> {
        if !self.ready_reported {
            self.ready_reported = true;
            return Some(LinkEvent::StackReady);
        }

        self.usb_dev.poll(&mut [&mut self.serial]);

        if let Some(event) = self.connection_state() {
            return Some(event);
        }
        if let Some(event) = self.advertising_state() {
            return Some(event);
        }

        let connection = self.connection?;
        match self.try_receive()? {
            PeerFrame::Write { attribute, data } => Some(LinkEvent::ServiceWriteReceived {
                connection,
                attribute: AttributeHandle(attribute),
                data,
            }),
        }
    }

    fn start_advertising(&mut self, mode: AdvertisingMode) -> Result<(), LinkError> {
        if self.connection.is_some() {
            return Err(LinkError::AdvertisingRejected);
        }
        // The bus stays enumerable in both modes; only the window is restarted.
        defmt::debug!("Advertising ({})", mode);
        self.advertising_deadline =
            Some(self.timer.get_counter() + (u64::from(ADVERTISING_WINDOW_MS) * 1000).micros());
        Ok(())
    }

    fn notify_service_table_changed(
        &mut self,
        connection: ConnectionHandle,
    ) -> Result<(), LinkError> {
        let services = self.services;
        self.send(connection, &DeviceFrame::ServiceChanged(services))
    }

    fn begin_update_exposure(&mut self) -> Result<(), LinkError> {
        self.services = ServiceSet::WithUpdater;
        Ok(())
    }

    fn request_connection_parameters(
        &mut self,
        connection: ConnectionHandle,
        params: ConnectionParameters,
    ) -> Result<(), LinkError> {
        if self.connection != Some(connection) {
            return Err(LinkError::NotConnected);
        }
        // USB polls every frame already
        defmt::debug!("Connection parameters requested: {}", params);
        Ok(())
    }

    fn reply(
        &mut self,
        connection: ConnectionHandle,
        response: &ControlResponse,
    ) -> Result<(), LinkError> {
        self.send(connection, &DeviceFrame::Response(*response))
    }
}
