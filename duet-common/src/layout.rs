// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Memory layout shared by the Updater image, the Application image and the host tool.

// --- Flash layout constants ---

pub const FLASH_BASE: u32 = 0x1000_0000;
pub const UPDATER_SIZE: u32 = 64 * 1024; // 64KB reserved for the Updater image

pub const APP_SLOT_ADDR: u32 = FLASH_BASE + UPDATER_SIZE;
pub const APP_SLOT_SIZE: u32 = 960 * 1024; // 960KB

/// The image header occupies the first page of the slot; the vector table follows it.
pub const IMAGE_HEADER_SIZE: u32 = 256;
pub const APP_VECTOR_ADDR: u32 = APP_SLOT_ADDR + IMAGE_HEADER_SIZE;

pub const IMAGE_MAGIC_SEALED: u32 = 0xD0E7_5EA1;
pub const IMAGE_MAGIC_UNSEALED: u32 = 0xD0E7_0000;

// --- RAM layout constants ---

pub const RAM_START: u32 = 0x2000_0000;
pub const RAM_END: u32 = 0x2004_2000; // includes SRAM4/5 scratch banks

/// Word left out of both images' RAM regions (see linker_scripts/).
pub const RAM_WAKE_FLAG_ADDR: u32 = 0x2003_FFF0;
pub const RAM_WAKE_MAGIC: u32 = 0x5EE9_0FF0;

// --- Retained flag store ---

/// Word-addressed retained region used by the flag journal (two slots of two words).
pub const STORE_WORDS: usize = 4;
