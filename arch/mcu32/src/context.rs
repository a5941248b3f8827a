// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Context save and restore: the only code in this crate that actually
//! knows the exception-frame layout the CPU lays down.
//!
//! Mirrors the reference stub's `save_context`/`restore_context_and_exit`:
//! push r15, point it at the register file, walk r1..r14 into the file,
//! fold the saved r15 back in, pop the bsr return address and the
//! hardware-pushed pc/psw, then capture the control registers that aren't
//! part of the exception frame. Restore runs the same steps in reverse so
//! the final `rte` re-enters user code with every bit exactly as it was
//! at the stop.
//!
//! Unlike the reference stub, the register-file pointer is never passed
//! through a GPR: both naked functions here are invoked by symbol name
//! via `bsr`, with no instruction anywhere loading an argument register
//! first, so `save_into`/`restore_from` take no parameters and instead
//! bake [`REGISTERS`]'s address in as an assembler immediate through a
//! `sym` operand — the same role `"i" (&registers)` plays in the original
//! C. R0 is intentionally left untouched by either routine: it always
//! shadows USP or ISP, and [`RegisterFile::sync_r0_from_stack_pointer`]/
//! [`RegisterFile::sync_stack_pointer_from_r0`] handle that translation in
//! Rust before `save_into` is read and after `restore_from` is written, so
//! this file never needs to branch on PSW's U bit.

use stub_kernel::regfile::RegisterFile;

/// The register file the naked entry points in `lib.rs` save into and
/// restore from. Owned here rather than by the board, since only this
/// crate's assembly ever touches it directly.
static mut REGISTERS: RegisterFile = RegisterFile::new();

/// Access to the register file the hardware trap handlers populate.
///
/// # Safety
/// Must only be called while the target is stopped (between a trap
/// reaching [`crate::mcu32_breakpoint_entry`] et al. and the matching
/// `restore_from`), and never from more than one place at a time — there
/// is exactly one `RegisterFile` for the whole target, not one per trap.
pub unsafe fn registers() -> &'static mut RegisterFile {
    &mut REGISTERS
}

/// Captures the CPU's current architectural state into [`REGISTERS`].
///
/// # Safety
/// Must only be reached via `bsr` from the prologue of one of this
/// crate's naked entry points, with the hardware exception frame (return
/// pc, psw) still on the stack exactly as the trap left it, and the
/// `bsr`'s own return address on top of that.
#[cfg(all(target_arch = "mcu32", target_os = "none"))]
#[naked]
pub unsafe extern "C" fn save_into() {
    use core::arch::asm;
    asm!(
        "
        push.l  r15
        mov.l   #{regs}, r15
        add     #4, r15          ; skip r0, synced from usp/isp in Rust
        mov.l   r1, [r15]+       ; r1..r14 in register-file order
        mov.l   r2, [r15]+
        mov.l   r3, [r15]+
        mov.l   r4, [r15]+
        mov.l   r5, [r15]+
        mov.l   r6, [r15]+
        mov.l   r7, [r15]+
        mov.l   r8, [r15]+
        mov.l   r9, [r15]+
        mov.l   r10, [r15]+
        mov.l   r11, [r15]+
        mov.l   r12, [r15]+
        mov.l   r13, [r15]+
        mov.l   r14, [r15]+
        pop.l   r1               ; the r15 pushed above, now free to store
        mov.l   r1, [r15]+       ; r15 itself
        pop.l   r14              ; bsr return address, stashed for jmp below
        pop.l   r2               ; exception-frame pc (pushed last, popped first)
        pop.l   r3               ; exception-frame psw
        mov.l   usp, [r15]+
        mov.l   isp, [r15]+
        mov.l   r3, [r15]+       ; psw
        mov.l   r2, [r15]+       ; pc
        mov.l   intb, [r15]+
        mov.l   bpsw, [r15]+
        mov.l   bpc, [r15]+
        mov.l   fintv, [r15]+
        mov.l   fpsw, [r15]+
        mvfacmi r1               ; acc low
        mov.l   r1, [r15]+
        mvfachi r1               ; acc high
        mov.l   r1, [r15]+
        jmp     r14              ; not rts: this was reached by bsr, not rts
        ",
        regs = sym REGISTERS,
        options(noreturn)
    )
}

/// Restores [`REGISTERS`] into the CPU and returns from the exception.
///
/// # Safety
/// Must only run as the very last step of a naked entry point's epilogue;
/// it never returns to its caller, it returns from the trap instead.
#[cfg(all(target_arch = "mcu32", target_os = "none"))]
#[naked]
pub unsafe extern "C" fn restore_from() -> ! {
    use core::arch::asm;
    asm!(
        "
        mov.l   #{regs}, r15
        add     #108, r15        ; one past the end; [-r15] walks it backward
        mov.l   [-r15], r1       ; acc high
        mvtachi r1
        mov.l   [-r15], r1       ; acc low
        mvtaclo r1
        mov.l   [-r15], fpsw
        mov.l   [-r15], fintv
        mov.l   [-r15], bpc
        mov.l   [-r15], bpsw
        mov.l   [-r15], intb
        mov.l   [-r15], r2       ; pc
        mov.l   [-r15], r3       ; psw
        mov.l   [-r15], isp      ; already resolved against r0 in Rust
        mov.l   [-r15], usp
        push.l  r3               ; psw first, so pc ends on top for rte
        push.l  r2
        mov.l   [-r15], r1       ; r15's saved value
        push.l  r1               ; stashed until r15 is done as a pointer
        mov.l   [-r15], r14
        mov.l   [-r15], r13
        mov.l   [-r15], r12
        mov.l   [-r15], r11
        mov.l   [-r15], r10
        mov.l   [-r15], r9
        mov.l   [-r15], r8
        mov.l   [-r15], r7
        mov.l   [-r15], r6
        mov.l   [-r15], r5
        mov.l   [-r15], r4
        mov.l   [-r15], r3
        mov.l   [-r15], r2
        mov.l   [-r15], r1
        pop.l   r15              ; r15's own value, pushed above
        rte
        ",
        regs = sym REGISTERS,
        options(noreturn)
    )
}

// Mock implementations for every target this workspace's tests actually
// build for (mcu32 has no upstream Rust backend).
#[cfg(not(all(target_arch = "mcu32", target_os = "none")))]
pub unsafe extern "C" fn save_into() {
    unimplemented!()
}

#[cfg(not(all(target_arch = "mcu32", target_os = "none")))]
pub unsafe extern "C" fn restore_from() -> ! {
    unimplemented!()
}
