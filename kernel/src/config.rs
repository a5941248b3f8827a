// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build-time configuration.
//!
//! Every value a board port is expected to override lives here, mirroring
//! the `#ifndef PCLK_FREQUENCY` / `#ifndef SCI1_BAUDRATE` knobs of the
//! original stub this crate generalizes. A board selects its own values by
//! depending on this crate and shadowing these constants is not possible in
//! Rust the way it was with C macros, so instead a board picks its transport
//! baud rate and clock frequency when it configures its own UART peripheral;
//! the constants below are the ones this crate's own logic depends on.

/// Single-byte opcode used to plant the one-shot step breakpoint (and any
/// permanent breakpoints the host sets out of band). Architecture-defined;
/// the reference ISA's `BRK` instruction is a single byte, `0x00`.
pub const BREAKPOINT_OPCODE: u8 = 0x00;

/// Capacity of the packet buffer shared between reception and transmission.
/// Must be at least large enough to hold the hex-encoded register file
/// (`NUM_REGS * 8 + 1` characters) plus framing overhead.
pub const PACKET_BUFFER_SIZE: usize = 512;

/// Maximum single-packet payload advertised to the host via `qSupported`.
pub const MAX_PACKET_PAYLOAD: usize = 200;

/// Capacity of the scratch buffer `debug!()` formats an engine-internal
/// diagnostic into before it goes out as an `O` packet. Kept well short of
/// `PACKET_BUFFER_SIZE` since these are short, single-line conditions.
pub const MAX_LOG_MESSAGE: usize = 64;
