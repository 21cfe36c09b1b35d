// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Persistent flag store: a two-slot journal over a word-addressed retained region.
//!
//! Each slot is two words:
//! - word 0: `[role, update_mode_active, update_request_pending, sequence]` (little-endian)
//! - word 1: CRC-32 of word 0, XOR [`SLOT_SEAL`]
//!
//! A commit writes the slot that does not hold the newest record, payload word first and
//! check word last. Word stores are atomic on the target, so an interrupted commit leaves
//! the target slot failing its check and the previous record wins on the next read.

use core::fmt;

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::flags::PersistentFlags;
use crate::layout::STORE_WORDS;
use crate::log;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Distinguishes a sealed slot from erased or zeroed memory.
pub const SLOT_SEAL: u32 = 0xF1A6_5EA1;

const SLOT_COUNT: usize = 2;
const WORDS_PER_SLOT: usize = 2;

/// A word-addressed memory region that survives reset and deep sleep.
pub trait RetainedMemory {
    fn load(&self, index: usize) -> u32;
    fn store(&mut self, index: usize, value: u32);
}

/// Plain RAM-backed retained region (host tools, tests, and targets without scratch registers).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetainedWords(pub [u32; STORE_WORDS]);

impl RetainedWords {
    pub const fn new() -> Self {
        Self([0; STORE_WORDS])
    }
}

impl Default for RetainedWords {
    fn default() -> Self {
        Self::new()
    }
}

impl RetainedMemory for RetainedWords {
    fn load(&self, index: usize) -> u32 {
        self.0[index]
    }

    fn store(&mut self, index: usize, value: u32) {
        self.0[index] = value;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Neither slot holds a sealed record (first power-up or corruption).
    NoValidRecord,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoValidRecord => f.write_str("no valid flag record in retained memory"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct SlotRecord {
    slot: usize,
    sequence: u8,
    flags: PersistentFlags,
}

pub struct FlagStore<M: RetainedMemory> {
    memory: M,
}

impl<M: RetainedMemory> FlagStore<M> {
    pub fn new(memory: M) -> Self {
        Self { memory }
    }

    /// Read the newest record, falling back to the power-up default.
    pub fn read(&self) -> PersistentFlags {
        self.try_read().unwrap_or_else(|_| PersistentFlags::power_up_default())
    }

    pub fn try_read(&self) -> Result<PersistentFlags, StoreError> {
        self.newest()
            .map(|record| record.flags)
            .ok_or(StoreError::NoValidRecord)
    }

    /// Commit a record. Either the full old or the full new record survives an interruption.
    pub fn write(&mut self, flags: &PersistentFlags) {
        let (target, sequence) = match self.newest() {
            Some(current) => (other_slot(current.slot), current.sequence.wrapping_add(1)),
            None => (0, 1),
        };

        let payload = encode_payload(flags, sequence);
        let base = target * WORDS_PER_SLOT;
        self.memory.store(base, payload);
        self.memory.store(base + 1, check_word(payload));

        log::debug!("flags committed to slot {} (seq {})", target, sequence);
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn into_inner(self) -> M {
        self.memory
    }

    fn newest(&self) -> Option<SlotRecord> {
        let a = self.read_slot(0);
        let b = self.read_slot(1);
        match (a, b) {
            (Some(a), Some(b)) => Some(if is_newer(b.sequence, a.sequence) { b } else { a }),
            (a, b) => a.or(b),
        }
    }

    fn read_slot(&self, slot: usize) -> Option<SlotRecord> {
        let base = slot * WORDS_PER_SLOT;
        let payload = self.memory.load(base);
        if self.memory.load(base + 1) != check_word(payload) {
            return None;
        }

        let [role, active, pending, sequence] = payload.to_le_bytes();
        let flags = PersistentFlags::from_bytes([role, active, pending])?;
        Some(SlotRecord {
            slot,
            sequence,
            flags,
        })
    }
}

fn other_slot(slot: usize) -> usize {
    (slot + 1) % SLOT_COUNT
}

fn encode_payload(flags: &PersistentFlags, sequence: u8) -> u32 {
    let [role, active, pending] = flags.to_bytes();
    u32::from_le_bytes([role, active, pending, sequence])
}

fn check_word(payload: u32) -> u32 {
    CRC32.checksum(&payload.to_le_bytes()) ^ SLOT_SEAL
}

/// Wrapping sequence comparison: `a` is newer when it is ahead of `b` by less than half the range.
fn is_newer(a: u8, b: u8) -> bool {
    (a.wrapping_sub(b) as i8) > 0
}
