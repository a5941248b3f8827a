// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Example board wiring for the stub engine.
//!
//! A real board links [`mcu32`]'s naked entry points against a concrete
//! UART and RAM layout and never returns from `main` — the target runs
//! user code until a trap hands control to the engine. This binary has no
//! `mcu32` hardware to run on, so it plays the part of the target itself:
//! a host process that owns a [`stub_kernel::memory::SliceMemory`] image in
//! place of real RAM and a
//! [`stub_kernel::transport::mock::MockTransport`] in place of a UART, and
//! drives one full stop-query-resume session through
//! [`stub_kernel::engine::Engine`] exactly the way a real entry handler
//! would after context capture.
//!
//! The four `mcu32_stub_on_*_trap` functions below are the board hooks
//! [`mcu32`]'s naked entry points call by symbol name once they have saved
//! CPU state. They are only compiled for the real target (`mcu32` has no
//! upstream Rust backend, so that is never true here); they are included so
//! the linkage a real board needs is visible in one place.

use stub_kernel::engine::{signal, Engine};
use stub_kernel::memory::SliceMemory;
use stub_kernel::regfile::{RegisterFile, PC};
use stub_kernel::transport::mock::MockTransport;

const RAM_BASE: u32 = 0x0001_0000;
const RAM_SIZE: usize = 0x1000;

/// Wraps `payload` as a checksummed `$payload#cc` frame.
fn frame(payload: &[u8]) -> Vec<u8> {
    let checksum: u32 = payload.iter().map(|&b| b as u32).sum::<u32>() & 0xFF;
    let mut out = vec![b'$'];
    out.extend_from_slice(payload);
    out.push(b'#');
    out.extend_from_slice(format!("{:02x}", checksum).as_bytes());
    out
}

/// Queues a scripted host session: a positive ack for the unsolicited stop
/// report, then each command framed and acked in turn, ending on a command
/// that resumes the target (`c` or `s`) with no trailing ack expected.
fn queue_session(transport: &mut MockTransport, commands: &[&[u8]]) {
    transport.queue_inbound(b"+");
    let (resuming, replying) = commands.split_last().expect("at least one command");
    for cmd in replying {
        transport.queue_inbound(&frame(cmd));
        transport.queue_inbound(b"+");
    }
    transport.queue_inbound(&frame(resuming));
}

fn main() {
    let mut ram = [0u8; RAM_SIZE];
    // A NOP followed by a BRK, standing in for "the user program hit a
    // breakpoint right after entry".
    ram[0] = 0x03;
    ram[1] = 0x00;

    let mut mem = SliceMemory::new(RAM_BASE, &mut ram);
    let mut regs = RegisterFile::new();
    regs.set(PC, RAM_BASE + 1);

    let mut transport = MockTransport::new();
    queue_session(
        &mut transport,
        &[
            b"?",                 // what stopped us?
            b"g",                 // dump every register
            b"m00010000,2",       // read the two bytes we just executed
            b"c",                 // resume
        ],
    );

    let mut engine = Engine::new();
    engine.handle_stop(signal::TRAP, &mut regs, &mut transport, &mut mem);

    println!("target resumed at pc={:#010x}", regs.pc());
    println!("{} bytes exchanged with the host", transport.take_outbound().len());
}

/// Vector table entries a real linker script would place at their fixed
/// offsets; named here so the crate dependency on [`mcu32`] is exercised
/// the same way a real board's vector table would reference these symbols.
#[cfg(all(target_arch = "mcu32", target_os = "none"))]
static VECTORS: [extern "C" fn(); 4] = [
    mcu32::mcu32_breakpoint_entry,
    mcu32::mcu32_uart_rx_entry,
    mcu32::mcu32_uart_error_entry,
    mcu32::mcu32_debug_entry,
];

#[cfg(all(target_arch = "mcu32", target_os = "none"))]
static mut STATE: Option<(Engine, MockTransport, SliceMemory<'static>)> = None;

#[cfg(all(target_arch = "mcu32", target_os = "none"))]
unsafe fn stop(sig: u32) {
    if let Some((engine, transport, mem)) = STATE.as_mut() {
        // The register file `save_into` just populated, not a copy of our own.
        let regs = mcu32::context::registers();
        engine.handle_stop(sig, regs, transport, mem);
    }
}

/// Board hook for [`mcu32::mcu32_breakpoint_entry`].
///
/// # Safety
/// Only ever called from that naked entry point, after context capture and
/// before restore, so `STATE` is not concurrently accessed.
#[cfg(all(target_arch = "mcu32", target_os = "none"))]
#[no_mangle]
pub unsafe extern "C" fn mcu32_stub_on_breakpoint_trap() {
    stop(signal::TRAP);
}

/// Board hook for [`mcu32::mcu32_uart_rx_entry`]. A real board reads its
/// own data register here; only the `0x03` break-in byte reaches the
/// engine.
///
/// # Safety
/// See [`mcu32_stub_on_breakpoint_trap`].
#[cfg(all(target_arch = "mcu32", target_os = "none"))]
#[no_mangle]
pub unsafe extern "C" fn mcu32_stub_on_uart_rx_trap() {
    stop(signal::INT);
}

/// Board hook for [`mcu32::mcu32_uart_error_entry`].
///
/// # Safety
/// See [`mcu32_stub_on_breakpoint_trap`].
#[cfg(all(target_arch = "mcu32", target_os = "none"))]
#[no_mangle]
pub unsafe extern "C" fn mcu32_stub_on_uart_error_trap() {
    stop(signal::INT);
}

/// Board hook for [`mcu32::mcu32_debug_entry`] (`INT#1`): user code asking
/// to emit text over the `O`-packet side channel, outside the normal
/// stop/resume flow.
///
/// # Safety
/// See [`mcu32_stub_on_breakpoint_trap`].
#[cfg(all(target_arch = "mcu32", target_os = "none"))]
#[no_mangle]
pub unsafe extern "C" fn mcu32_stub_on_debug_trap() {
    // A real board reads the (pointer, length) pair user code placed in its
    // argument registers and forwards the slice to `stub_kernel::debug`.
}
