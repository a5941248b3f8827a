// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Naked entry points for the fictional 32-bit CISC `mcu32` target.
//!
//! [`stub_kernel`] knows nothing about interrupt vectors or exception
//! frames; this crate is the thin, target-specific layer that does. Each
//! entry point here is a naked function with exactly one job: capture CPU
//! state into a [`stub_kernel::regfile::RegisterFile`], hand control to a
//! board-supplied dispatch hook, then restore and return from the
//! exception. The dispatch hooks are declared `extern "C"` and defined by
//! the board crate, the same way `rv32i::_start_trap` calls out to a
//! board-defined `_start_trap_rust_from_kernel` by symbol name rather than
//! by Rust-level function call.
//!
//! `mcu32` has no upstream Rust compiler backend, so every naked function
//! here is gated on `cfg(target_arch = "mcu32")`; every other build
//! (including this workspace's own test suite) gets a safe mock of the same
//! signature, mirroring `rv32i::_start_trap`'s "Mock implementation for
//! tests on Travis-CI".
#![cfg_attr(not(test), no_std)]

pub mod context;

extern "C" {
    /// Board hook run after context capture for a software breakpoint trap.
    fn mcu32_stub_on_breakpoint_trap();
    /// Board hook run after context capture for a UART RX interrupt. The
    /// board reads its own data register, decides whether the byte is the
    /// `0x03` break-in byte, and calls into the engine if so.
    fn mcu32_stub_on_uart_rx_trap();
    /// Board hook run after context capture for a UART line-break / framing
    /// error condition.
    fn mcu32_stub_on_uart_error_trap();
    /// Board hook run after context capture for the `INT#1` software
    /// interrupt user code raises to reach the `debug_puts` side channel.
    fn mcu32_stub_on_debug_trap();
}

/// Software breakpoint trap: a `BRK` opcode the step controller or the host
/// planted was executed.
#[cfg(all(target_arch = "mcu32", target_os = "none"))]
#[naked]
#[no_mangle]
pub extern "C" fn mcu32_breakpoint_entry() {
    use core::arch::asm;
    unsafe {
        asm!(
            "
            bsr {save}
            bsr {dispatch}
            bsr {restore}
            ",
            save = sym context::save_into,
            dispatch = sym mcu32_stub_on_breakpoint_trap,
            restore = sym context::restore_from,
            options(noreturn)
        )
    }
}

/// UART receive interrupt: either a stray byte during `Running` (ignored by
/// the board hook) or the `0x03` break-in byte that should stop the target.
#[cfg(all(target_arch = "mcu32", target_os = "none"))]
#[naked]
#[no_mangle]
pub extern "C" fn mcu32_uart_rx_entry() {
    use core::arch::asm;
    unsafe {
        asm!(
            "
            bsr {save}
            bsr {dispatch}
            bsr {restore}
            ",
            save = sym context::save_into,
            dispatch = sym mcu32_stub_on_uart_rx_trap,
            restore = sym context::restore_from,
            options(noreturn)
        )
    }
}

/// UART error / line-break condition.
#[cfg(all(target_arch = "mcu32", target_os = "none"))]
#[naked]
#[no_mangle]
pub extern "C" fn mcu32_uart_error_entry() {
    use core::arch::asm;
    unsafe {
        asm!(
            "
            bsr {save}
            bsr {dispatch}
            bsr {restore}
            ",
            save = sym context::save_into,
            dispatch = sym mcu32_stub_on_uart_error_trap,
            restore = sym context::restore_from,
            options(noreturn)
        )
    }
}

/// `INT#1`: user code asking to emit text over the `debug_puts` side
/// channel.
#[cfg(all(target_arch = "mcu32", target_os = "none"))]
#[naked]
#[no_mangle]
pub extern "C" fn mcu32_debug_entry() {
    use core::arch::asm;
    unsafe {
        asm!(
            "
            bsr {save}
            bsr {dispatch}
            bsr {restore}
            ",
            save = sym context::save_into,
            dispatch = sym mcu32_stub_on_debug_trap,
            restore = sym context::restore_from,
            options(noreturn)
        )
    }
}

#[cfg(not(all(target_arch = "mcu32", target_os = "none")))]
pub extern "C" fn mcu32_breakpoint_entry() {
    unimplemented!()
}

#[cfg(not(all(target_arch = "mcu32", target_os = "none")))]
pub extern "C" fn mcu32_uart_rx_entry() {
    unimplemented!()
}

#[cfg(not(all(target_arch = "mcu32", target_os = "none")))]
pub extern "C" fn mcu32_uart_error_entry() {
    unimplemented!()
}

#[cfg(not(all(target_arch = "mcu32", target_os = "none")))]
pub extern "C" fn mcu32_debug_entry() {
    unimplemented!()
}
