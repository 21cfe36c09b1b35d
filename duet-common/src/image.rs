// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Application image integrity marker: header layout, verification and sealing.
//!
//! The slot starts with a 256-byte header page followed by the image proper (vector
//! table first). The header is compiled in unsealed; the host tool seals it by filling in
//! the image size and CRC-32 over everything after the header page.

use core::fmt;

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::layout::{
    APP_SLOT_SIZE, APP_VECTOR_ADDR, IMAGE_HEADER_SIZE, IMAGE_MAGIC_SEALED, IMAGE_MAGIC_UNSEALED,
    RAM_END, RAM_START,
};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

const HEADER_LEN: usize = IMAGE_HEADER_SIZE as usize;
const HEADER_FIELDS_LEN: usize = 16;

/// In-flash header page (repr(C), 256 bytes), placed by the Application's linker script.
#[repr(C)]
pub struct HeaderPage {
    pub magic: u32,
    pub version: u32,
    pub image_size: u32,
    pub crc32: u32,
    pub _reserved: [u8; HEADER_LEN - HEADER_FIELDS_LEN],
}

// Compile-time size check
const _: () = assert!(core::mem::size_of::<HeaderPage>() == HEADER_LEN);

impl HeaderPage {
    pub const fn unsealed(version: u32) -> Self {
        Self {
            magic: IMAGE_MAGIC_UNSEALED,
            version,
            image_size: 0,
            crc32: 0,
            _reserved: [0xFF; HEADER_LEN - HEADER_FIELDS_LEN],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImageHeader {
    pub magic: u32,
    pub version: u32,
    pub image_size: u32,
    pub crc32: u32,
}

impl ImageHeader {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        Some(Self {
            magic: read_u32(bytes, 0)?,
            version: read_u32(bytes, 4)?,
            image_size: read_u32(bytes, 8)?,
            crc32: read_u32(bytes, 12)?,
        })
    }

    fn write_to(&self, bytes: &mut [u8]) {
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.image_size.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.crc32.to_le_bytes());
    }
}

/// A verified image, ready to jump to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImageInfo {
    pub version: u32,
    pub image_size: u32,
    pub crc32: u32,
    pub initial_sp: u32,
    pub reset_vector: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VerifyError {
    /// Slot shorter than the header page.
    Truncated,
    /// Header still carries the build-time marker.
    Unsealed,
    BadMagic(u32),
    SizeOutOfRange(u32),
    CrcMismatch { expected: u32, actual: u32 },
    BadVectorTable { initial_sp: u32, reset_vector: u32 },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => f.write_str("slot shorter than the image header"),
            Self::Unsealed => f.write_str("image header was never sealed"),
            Self::BadMagic(magic) => write!(f, "bad header magic 0x{magic:08x}"),
            Self::SizeOutOfRange(size) => write!(f, "image size {size} out of range"),
            Self::CrcMismatch { expected, actual } => {
                write!(f, "CRC mismatch: expected 0x{expected:08x}, got 0x{actual:08x}")
            }
            Self::BadVectorTable {
                initial_sp,
                reset_vector,
            } => write!(
                f,
                "bad vector table: SP 0x{initial_sp:08x}, reset 0x{reset_vector:08x}"
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SealError {
    /// The binary does not start with an image header.
    NoHeader,
    TooLarge(u32),
    /// Sealed, but the result does not verify (usually a bad vector table).
    Rejected(VerifyError),
}

impl fmt::Display for SealError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHeader => f.write_str("binary does not start with an image header"),
            Self::TooLarge(size) => write!(f, "image of {size} bytes does not fit the slot"),
            Self::Rejected(e) => write!(f, "sealed image does not verify: {e}"),
        }
    }
}

pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// Verify the integrity marker of an Application slot mapped at [`crate::layout::APP_SLOT_ADDR`].
///
/// `slot` may be longer than the image; only `image_size` bytes after the header are checked.
pub fn verify_image(slot: &[u8]) -> Result<ImageInfo, VerifyError> {
    if slot.len() < HEADER_LEN {
        return Err(VerifyError::Truncated);
    }
    let header = ImageHeader::parse(slot).ok_or(VerifyError::Truncated)?;

    match header.magic {
        IMAGE_MAGIC_SEALED => {}
        IMAGE_MAGIC_UNSEALED => return Err(VerifyError::Unsealed),
        other => return Err(VerifyError::BadMagic(other)),
    }

    let size = header.image_size;
    let available = slot.len() - HEADER_LEN;
    if size < 8 || size as usize > available || size > max_image_size() {
        return Err(VerifyError::SizeOutOfRange(size));
    }

    let image = &slot[HEADER_LEN..HEADER_LEN + size as usize];
    let actual = crc32(image);
    if actual != header.crc32 {
        return Err(VerifyError::CrcMismatch {
            expected: header.crc32,
            actual,
        });
    }

    let initial_sp = read_u32(image, 0).ok_or(VerifyError::SizeOutOfRange(size))?;
    let reset_vector = read_u32(image, 4).ok_or(VerifyError::SizeOutOfRange(size))?;
    if !vector_table_valid(initial_sp, reset_vector, size) {
        return Err(VerifyError::BadVectorTable {
            initial_sp,
            reset_vector,
        });
    }

    Ok(ImageInfo {
        version: header.version,
        image_size: size,
        crc32: actual,
        initial_sp,
        reset_vector,
    })
}

/// Seal a raw binary (header page included) in place and verify the result.
pub fn seal_image(image: &mut [u8], version: u32) -> Result<ImageInfo, SealError> {
    let header = ImageHeader::parse(image).ok_or(SealError::NoHeader)?;
    if image.len() < HEADER_LEN
        || !matches!(header.magic, IMAGE_MAGIC_UNSEALED | IMAGE_MAGIC_SEALED)
    {
        return Err(SealError::NoHeader);
    }

    let size = (image.len() - HEADER_LEN) as u32;
    if size > max_image_size() {
        return Err(SealError::TooLarge(size));
    }

    let sealed = ImageHeader {
        magic: IMAGE_MAGIC_SEALED,
        version,
        image_size: size,
        crc32: crc32(&image[HEADER_LEN..]),
    };
    sealed.write_to(image);

    verify_image(image).map_err(SealError::Rejected)
}

fn max_image_size() -> u32 {
    APP_SLOT_SIZE - IMAGE_HEADER_SIZE
}

/// Initial SP inside RAM; reset vector a Thumb address inside the image.
fn vector_table_valid(initial_sp: u32, reset_vector: u32, size: u32) -> bool {
    let entry = reset_vector & !1;
    let image_end = APP_VECTOR_ADDR + size;
    (RAM_START..=RAM_END).contains(&initial_sp)
        && reset_vector & 1 == 1
        && (APP_VECTOR_ADDR..image_end).contains(&entry)
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let field = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([field[0], field[1], field[2], field[3]]))
}
