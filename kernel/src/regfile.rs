// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The register file: the single source of truth for architecturally
//! visible state while the target is stopped.
//!
//! Laid out as a flat array of 32-bit words in wire order, the same shape
//! `mem2hex`/`hex2mem` operate on in the original stub this generalizes.
//! The PSW word is additionally exposed as a bitfield through
//! [`tock_registers`] — the same `register_bitfields!`/`LocalRegisterCopy`
//! idiom `arch/rv32i` uses for CSR values such as `mstatus` — so the decoder
//! can read condition flags by name instead of hand-rolled bit masks.

use tock_registers::interfaces::Readable;
use tock_registers::register_bitfields;
use tock_registers::LocalRegisterCopy;

register_bitfields![u32,
    pub PSW [
        C OFFSET(0) NUMBITS(1) [],
        Z OFFSET(1) NUMBITS(1) [],
        S OFFSET(2) NUMBITS(1) [],
        O OFFSET(3) NUMBITS(1) [],
        /// User-mode bit: when set, R0 shadows USP instead of ISP.
        U OFFSET(17) NUMBITS(1) [],
    ]
];

/// Named slot indices, in wire order. `ACC` occupies this slot and the one
/// immediately after it (the register file reserves one extra trailing word
/// for the high half).
pub const R0: usize = 0;
pub const USP: usize = 16;
pub const ISP: usize = 17;
pub const PSW: usize = 18;
pub const PC: usize = 19;
pub const INTB: usize = 20;
pub const BPSW: usize = 21;
pub const BPC: usize = 22;
pub const FINTV: usize = 23;
pub const FPSW: usize = 24;
pub const ACC: usize = 25;

/// Count of architecturally named registers (R0..R15 plus the eleven named
/// control/status/accumulator registers; ACC counts once here even though it
/// occupies two words).
pub const NUM_REGS: usize = 26;

/// Words backing the register file: one per named register, plus one extra
/// for ACC's high half.
pub const TOTAL_WORDS: usize = NUM_REGS + 1;

/// Byte length of the flat, wire-order register image (`g`/`G` packets).
pub const TOTAL_BYTES: usize = TOTAL_WORDS * 4;

/// In-memory snapshot of every architecturally-visible register.
///
/// R0 is not separately stored: it always shadows USP or ISP according to
/// the PSW's U bit, per [`RegisterFile::sync_r0_from_stack_pointer`] and
/// [`RegisterFile::sync_stack_pointer_from_r0`].
/// `#[repr(C)]` so `arch/mcu32`'s naked entry points can address individual
/// words by a fixed byte offset baked into assembler immediates, the same
/// way the original stub's `struct registers` has a fixed, ABI-stable
/// layout its save/restore assembly indexes into directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct RegisterFile {
    words: [u32; TOTAL_WORDS],
}

impl RegisterFile {
    pub const fn new() -> Self {
        RegisterFile {
            words: [0; TOTAL_WORDS],
        }
    }

    /// A single 32-bit register's value. Use [`RegisterFile::acc`] for the
    /// 64-bit accumulator.
    pub fn get(&self, index: usize) -> u32 {
        self.words[index]
    }

    pub fn set(&mut self, index: usize, value: u32) {
        self.words[index] = value;
    }

    /// The 64-bit accumulator, low word first (`words[ACC]`), high word
    /// second (`words[ACC + 1]`).
    pub fn acc(&self) -> u64 {
        (self.words[ACC] as u64) | ((self.words[ACC + 1] as u64) << 32)
    }

    pub fn set_acc(&mut self, value: u64) {
        self.words[ACC] = value as u32;
        self.words[ACC + 1] = (value >> 32) as u32;
    }

    pub fn pc(&self) -> u32 {
        self.words[PC]
    }

    pub fn set_pc(&mut self, value: u32) {
        self.words[PC] = value;
    }

    /// The PSW as a typed bitfield view.
    pub fn psw(&self) -> LocalRegisterCopy<u32, PSW::Register> {
        LocalRegisterCopy::new(self.words[PSW])
    }

    /// After a stop: copy the currently-active stack pointer (USP or ISP,
    /// chosen by PSW.U) into the R0 slot, so the host sees "the active
    /// stack pointer" when it reads R0.
    pub fn sync_r0_from_stack_pointer(&mut self) {
        let active = if self.psw().is_set(PSW::U) {
            self.words[USP]
        } else {
            self.words[ISP]
        };
        self.words[R0] = active;
    }

    /// Before a resume: write R0 back into whichever of USP/ISP is active,
    /// undoing [`RegisterFile::sync_r0_from_stack_pointer`]. The host may
    /// have changed R0 via a `G`/`P` packet while stopped.
    pub fn sync_stack_pointer_from_r0(&mut self) {
        if self.psw().is_set(PSW::U) {
            self.words[USP] = self.words[R0];
        } else {
            self.words[ISP] = self.words[R0];
        }
    }

    /// The flat, native-endian byte image used by `g`/`G`.
    pub fn to_bytes(&self) -> [u8; TOTAL_BYTES] {
        let mut out = [0u8; TOTAL_BYTES];
        for (i, word) in self.words.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    /// Overwrites every register from a flat, native-endian byte image, as
    /// produced by [`RegisterFile::to_bytes`].
    pub fn load_bytes(&mut self, src: &[u8; TOTAL_BYTES]) {
        for (i, word) in self.words.iter_mut().enumerate() {
            let bytes: [u8; 4] = src[i * 4..i * 4 + 4].try_into().unwrap();
            *word = u32::from_le_bytes(bytes);
        }
    }

    /// Byte length on the wire of register `index` (8 for ACC, 4 otherwise).
    pub fn wire_len(index: usize) -> usize {
        if index == ACC {
            8
        } else {
            4
        }
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}
