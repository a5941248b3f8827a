// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-instruction stepping, emulated with a one-shot breakpoint.
//!
//! The hardware this crate targets has no step mode: "step one
//! instruction" is built out of "decode where control flow goes next,
//! plant a breakpoint there, resume, and clean up on the next trap" —
//! directly mirroring `start_step`/`finish_step` in the reference stub.

use crate::config::BREAKPOINT_OPCODE;
use crate::decoder;
use crate::error::StubError;
use crate::memory::Memory;
use crate::regfile::RegisterFile;

/// Tracks the one-shot breakpoint a step planted, so it can be cleaned up
/// once the target traps back in.
pub struct StepController {
    /// Set by `start`, consumed by `take_pending`. Gates whether the next
    /// trap should call `finish` at all — independent of `brk_address`,
    /// which can stay set across traps when the stepped-to address turned
    /// out to already hold a permanent breakpoint.
    pending: bool,
    brk_address: Option<u32>,
    brk_opcode: u8,
}

impl StepController {
    pub const fn new() -> Self {
        StepController {
            pending: false,
            brk_address: None,
            brk_opcode: BREAKPOINT_OPCODE,
        }
    }

    /// Whether a step is currently in flight (a one-shot breakpoint is
    /// planted and not yet cleaned up).
    pub fn is_active(&self) -> bool {
        self.brk_address.is_some()
    }

    /// Returns whether a step was started since the last call, clearing
    /// the flag. The caller should follow a `true` result with exactly
    /// one call to `finish`.
    pub fn take_pending(&mut self) -> bool {
        core::mem::take(&mut self.pending)
    }

    /// Decodes where `regs.pc()` goes next and plants the one-shot
    /// breakpoint there, remembering the opcode it overwrote.
    ///
    /// Plants nothing if the decoded address is the current `pc` — either
    /// the decoder couldn't classify the opcode at all
    /// ([`StubError::UndecodableInstruction`], propagated to the caller so
    /// it can log it) or it legitimately decoded to a no-op displacement.
    /// Either way `finish` is then a no-op, since it only acts when
    /// `brk_address` is set.
    pub fn start(&mut self, regs: &RegisterFile, mem: &mut impl Memory) -> Result<(), StubError> {
        self.pending = true;
        let address = decoder::next_pc(regs, mem)?;
        if address != regs.pc() {
            let opcode = mem.read_u8(address);
            mem.write_u8(address, BREAKPOINT_OPCODE);
            self.brk_address = Some(address);
            self.brk_opcode = opcode;
        }
        Ok(())
    }

    /// Called on every trap back into the stub while a step may be in
    /// flight. If the trap landed exactly one byte past the planted
    /// breakpoint, backs `PC` up so it points at the real next
    /// instruction rather than just past the single-byte trap opcode.
    ///
    /// If the overwritten opcode was itself the breakpoint opcode (the
    /// host already had a permanent breakpoint there), the original byte
    /// is left in place and the controller keeps tracking this address —
    /// there is nothing to restore, and the permanent breakpoint must
    /// survive this step.
    pub fn finish(&mut self, regs: &mut RegisterFile, mem: &mut impl Memory) {
        let Some(address) = self.brk_address else {
            return;
        };
        if address.wrapping_add(1) == regs.pc() {
            regs.set_pc(regs.pc() - 1);
        }
        if self.brk_opcode != BREAKPOINT_OPCODE {
            mem.write_u8(address, self.brk_opcode);
            self.brk_address = None;
            self.brk_opcode = BREAKPOINT_OPCODE;
        }
    }
}

impl Default for StepController {
    fn default() -> Self {
        Self::new()
    }
}
