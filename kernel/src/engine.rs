// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The protocol engine: the request/response loop a trap entry point
//! hands control to, and the dispatch table for every packet command.
//!
//! Ported from `stub_rsp_handler`'s `switch` statement. The engine owns
//! no hardware of its own; it is generic over [`Transport`] and
//! [`Memory`] so the end-to-end tests in this crate can drive it with
//! [`crate::transport::mock::MockTransport`] and [`crate::memory::SliceMemory`]
//! exactly as a board would drive it with a real UART and `RawMemory`.

use crate::config::MAX_PACKET_PAYLOAD;
use crate::error::StubError;
use crate::framer::{receive_packet, send_packet, PacketBuffer};
use crate::hexcodec::{decode, encode, parse_hex_u32};
use crate::memory::Memory;
use crate::regfile::{RegisterFile, ACC, NUM_REGS, PC, PSW, TOTAL_BYTES};
use crate::step::StepController;
use crate::transport::Transport;

/// Target signal numbers reported in stop replies, same numbering GDB's
/// remote serial protocol expects (a POSIX `SIGINT`/`SIGTRAP` subset).
pub mod signal {
    pub const INT: u32 = 2;
    pub const TRAP: u32 = 5;
}

/// What the dispatch loop should do once the host's request has been
/// handled: reply and keep listening, or resume the target.
enum Outcome {
    Reply,
    Resume,
}

/// Owns the pieces of state that persist across traps: the step
/// controller (there is at most one step in flight at a time), the
/// scratch packet buffer, and a second scratch buffer `debug!()` uses so
/// an engine-internal diagnostic never clobbers an in-flight reply.
pub struct Engine {
    step: StepController,
    buf: PacketBuffer,
    log_scratch: PacketBuffer,
}

impl Engine {
    pub const fn new() -> Self {
        Engine {
            step: StepController::new(),
            buf: PacketBuffer::new(),
            log_scratch: PacketBuffer::new(),
        }
    }

    /// Entry point for every trap (breakpoint, `Ctrl-C` over the wire,
    /// UART break): finishes any step in flight, reports the stop, then
    /// services host requests until one of them resumes the target.
    pub fn handle_stop<T: Transport, M: Memory>(
        &mut self,
        signal: u32,
        regs: &mut RegisterFile,
        transport: &mut T,
        mem: &mut M,
    ) {
        if self.step.take_pending() {
            self.step.finish(regs, mem);
        }
        regs.sync_r0_from_stack_pointer();

        self.send_state_report(transport, regs, signal);

        loop {
            receive_packet(transport, &mut self.buf);
            match self.dispatch(regs, mem, transport, signal) {
                Outcome::Reply => send_packet(transport, self.buf.as_slice()),
                Outcome::Resume => {
                    regs.sync_stack_pointer_from_r0();
                    return;
                }
            }
        }
    }

    fn dispatch<T: Transport, M: Memory>(
        &mut self,
        regs: &mut RegisterFile,
        mem: &mut M,
        transport: &mut T,
        signal: u32,
    ) -> Outcome {
        // Copied onto the stack so `rest` borrows a local, not `self.buf` —
        // every arm below needs `&mut self` to write its reply.
        let len = self.buf.as_slice().len();
        let mut packet = [0u8; crate::config::PACKET_BUFFER_SIZE];
        packet[..len].copy_from_slice(self.buf.as_slice());
        let packet = &packet[..len];
        let (&cmd, rest) = match packet.split_first() {
            Some(parts) => parts,
            None => {
                self.buf.set_len(0);
                return Outcome::Reply;
            }
        };
        match cmd {
            b'?' => {
                self.write_state_report(regs, signal);
                Outcome::Reply
            }
            b'g' => {
                self.write_all_registers(regs);
                Outcome::Reply
            }
            b'G' => {
                self.write_registers_from(rest, regs);
                Outcome::Reply
            }
            b'p' => {
                self.read_one_register(rest, regs);
                Outcome::Reply
            }
            b'P' => {
                self.write_one_register(rest, regs);
                Outcome::Reply
            }
            b'm' => {
                self.read_memory(rest, mem);
                Outcome::Reply
            }
            b'M' => {
                self.write_memory(rest, mem);
                Outcome::Reply
            }
            b'c' => {
                if !rest.is_empty() {
                    let (addr, _) = parse_hex_u32(rest);
                    regs.set_pc(addr);
                }
                self.buf.set_len(0);
                Outcome::Resume
            }
            b's' => self.start_step(rest, regs, mem, transport),
            b'q' => {
                self.answer_query(rest);
                Outcome::Reply
            }
            _ => {
                // 'd' (toggle debug), 'z'/'Z' (breakpoint set/clear), and
                // anything unrecognized: an empty reply, same as upstream
                // GDB's "unsupported" convention.
                self.buf.set_len(0);
                Outcome::Reply
            }
        }
    }

    fn start_step<T: Transport, M: Memory>(
        &mut self,
        rest: &[u8],
        regs: &mut RegisterFile,
        mem: &mut M,
        transport: &mut T,
    ) -> Outcome {
        if !rest.is_empty() {
            let (addr, _) = parse_hex_u32(rest);
            regs.set_pc(addr);
        }
        if mem.read_u8(regs.pc()) == crate::config::BREAKPOINT_OPCODE {
            // Already sitting on a breakpoint: stepping over it would just
            // trap again immediately, so skip past it and report as if the
            // step had happened.
            regs.set_pc(regs.pc().wrapping_add(1));
            self.write_state_report(regs, signal::TRAP);
            Outcome::Reply
        } else {
            if let Err(err) = self.step.start(regs, mem) {
                crate::debug!(transport, &mut self.log_scratch, "{} at pc={:#x}", err, regs.pc());
            }
            self.buf.set_len(0);
            Outcome::Resume
        }
    }

    fn answer_query(&mut self, rest: &[u8]) {
        let reply: &[u8] = if rest.starts_with(b"Supported") {
            b"PacketSize=200"
        } else if rest == b"Offsets" {
            b"Text=0;Data=0;Bss=0"
        } else {
            b""
        };
        self.buf.as_write_buffer()[..reply.len()].copy_from_slice(reply);
        self.buf.set_len(reply.len());
    }

    fn write_all_registers(&mut self, regs: &RegisterFile) {
        let bytes = regs.to_bytes();
        let out = self.buf.as_write_buffer();
        encode(&mut out[..TOTAL_BYTES * 2], &bytes);
        self.buf.set_len(TOTAL_BYTES * 2);
    }

    fn write_registers_from(&mut self, rest: &[u8], regs: &mut RegisterFile) {
        let mut bytes = [0u8; TOTAL_BYTES];
        decode(&mut bytes, rest);
        regs.load_bytes(&bytes);
        self.ok();
    }

    fn read_one_register(&mut self, rest: &[u8], regs: &RegisterFile) {
        let (n, _) = parse_hex_u32(rest);
        let n = n as usize;
        if n >= NUM_REGS {
            self.error(StubError::OutOfRange);
            return;
        }
        let len = RegisterFile::wire_len(n);
        let value = regs.get(n).to_le_bytes();
        let out = self.buf.as_write_buffer();
        encode(&mut out[..4 * 2], &value);
        if n == ACC {
            let high = regs.get(ACC + 1).to_le_bytes();
            encode(&mut out[8..8 + 8], &high);
        }
        self.buf.set_len(len * 2);
    }

    fn write_one_register(&mut self, rest: &[u8], regs: &mut RegisterFile) {
        let mut cursor = rest;
        let (n, consumed) = parse_hex_u32(cursor);
        cursor = &cursor[consumed..];
        let n = n as usize;
        if cursor.first() != Some(&b'=') {
            self.error(StubError::MalformedPacket);
            return;
        }
        cursor = &cursor[1..];
        if n >= NUM_REGS {
            self.error(StubError::OutOfRange);
            return;
        }
        let len = RegisterFile::wire_len(n);
        if cursor.len() < len * 2 {
            self.error(StubError::MalformedPacket);
            return;
        }
        let mut bytes = [0u8; 8];
        decode(&mut bytes[..len], &cursor[..len * 2]);
        regs.set(n, u32::from_le_bytes(bytes[..4].try_into().unwrap()));
        if n == ACC {
            regs.set(ACC + 1, u32::from_le_bytes(bytes[4..8].try_into().unwrap()));
        }
        self.ok();
    }

    fn read_memory<M: Memory>(&mut self, rest: &[u8], mem: &M) {
        let mut cursor = rest;
        let (address, consumed) = parse_hex_u32(cursor);
        cursor = &cursor[consumed..];
        if cursor.first() != Some(&b',') {
            self.error(StubError::MalformedPacket);
            return;
        }
        cursor = &cursor[1..];
        let (length, _) = parse_hex_u32(cursor);
        let length = length as usize;

        let mut scratch = [0u8; MAX_PACKET_PAYLOAD];
        let length = length.min(scratch.len());
        mem.read_bytes(address, &mut scratch[..length]);
        let out = self.buf.as_write_buffer();
        encode(&mut out[..length * 2], &scratch[..length]);
        self.buf.set_len(length * 2);
    }

    fn write_memory<M: Memory>(&mut self, rest: &[u8], mem: &mut M) {
        let mut cursor = rest;
        let (address, consumed) = parse_hex_u32(cursor);
        cursor = &cursor[consumed..];
        if cursor.first() != Some(&b',') {
            self.error(StubError::MalformedPacket);
            return;
        }
        cursor = &cursor[1..];
        let (length, consumed) = parse_hex_u32(cursor);
        cursor = &cursor[consumed..];
        if cursor.first() != Some(&b':') {
            self.error(StubError::MalformedPacket);
            return;
        }
        cursor = &cursor[1..];
        let length = length as usize;
        if mem.ram_end() < address.wrapping_add(length as u32) {
            self.error(StubError::OutOfRange);
            return;
        }
        let mut scratch = [0u8; MAX_PACKET_PAYLOAD];
        let length = length.min(scratch.len());
        if cursor.len() < length * 2 {
            self.error(StubError::MalformedPacket);
            return;
        }
        decode(&mut scratch[..length], &cursor[..length * 2]);
        mem.write_bytes(address, &scratch[..length]);
        self.ok();
    }

    fn write_state_report(&mut self, regs: &RegisterFile, signal: u32) {
        format_state_report(self.buf.as_write_buffer(), regs, signal);
        self.buf.set_len(state_report_len());
    }

    fn send_state_report<T: Transport>(&mut self, transport: &mut T, regs: &RegisterFile, signal: u32) {
        self.write_state_report(regs, signal);
        send_packet(transport, self.buf.as_slice());
    }

    fn ok(&mut self) {
        let out = self.buf.as_write_buffer();
        out[..2].copy_from_slice(b"OK");
        self.buf.set_len(2);
    }

    fn error(&mut self, err: StubError) {
        if let Some(code) = err.wire_code() {
            let out = self.buf.as_write_buffer();
            out[..code.len()].copy_from_slice(code.as_bytes());
            self.buf.set_len(code.len());
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Length, in bytes, of the fixed-format state report written by
/// [`format_state_report`]: `T<ss><PC idx>:<4 bytes hex>;<PSW idx>:<4 bytes hex>;`.
fn state_report_len() -> usize {
    1 + 2 + 2 + 1 + 8 + 1 + 2 + 1 + 8 + 1
}

fn format_state_report(out: &mut [u8], regs: &RegisterFile, signal: u32) {
    let mut p = 0usize;
    out[p] = b'T';
    p += 1;
    write_hex_byte(out, &mut p, signal as u8);
    write_hex_byte(out, &mut p, PC as u8);
    out[p] = b':';
    p += 1;
    encode(&mut out[p..p + 8], &regs.get(PC).to_le_bytes());
    p += 8;
    out[p] = b';';
    p += 1;
    write_hex_byte(out, &mut p, PSW as u8);
    out[p] = b':';
    p += 1;
    encode(&mut out[p..p + 8], &regs.get(PSW).to_le_bytes());
    p += 8;
    out[p] = b';';
}

fn write_hex_byte(out: &mut [u8], p: &mut usize, value: u8) {
    encode(&mut out[*p..*p + 2], core::slice::from_ref(&value));
    *p += 2;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SliceMemory;
    use crate::transport::mock::MockTransport;

    fn engine_and_state() -> (Engine, RegisterFile, [u8; 0x100]) {
        (Engine::new(), RegisterFile::new(), [0u8; 0x100])
    }

    /// Wraps a command payload as a wire packet: `$payload#cc`.
    fn framed(payload: &[u8]) -> Vec<u8> {
        let checksum: u32 = payload.iter().map(|&c| c as u32).sum::<u32>() & 0xFF;
        let mut out = Vec::from(&b"$"[..]);
        out.extend_from_slice(payload);
        out.push(b'#');
        out.extend_from_slice(format!("{:02x}", checksum).as_bytes());
        out
    }

    /// Queues an initial-report ack followed by one framed command and its
    /// reply ack per non-resuming command, ending with a final command that
    /// is expected to resume (and so gets no ack queued after it).
    fn queue_session(transport: &mut MockTransport, replying: &[&[u8]], resuming: &[u8]) {
        transport.queue_inbound(b"+"); // ack for the unsolicited stop report
        for cmd in replying {
            transport.queue_inbound(&framed(cmd));
            transport.queue_inbound(b"+"); // ack for that command's reply
        }
        transport.queue_inbound(&framed(resuming));
    }

    #[test]
    fn query_mark_reports_current_state() {
        let (mut engine, mut regs, mut ram) = engine_and_state();
        regs.set_pc(0x1234);
        let mut mem = SliceMemory::new(0x1000, &mut ram);
        let mut transport = MockTransport::new();
        queue_session(&mut transport, &[b"?"], b"c");
        engine.handle_stop(signal::TRAP, &mut regs, &mut transport, &mut mem);
        let wire = transport.take_outbound();
        // The reply to '?' should carry the same PC (index 0x13 = 19, value
        // 0x1234 little-endian encoded as "34120000").
        let text = core::str::from_utf8(&wire).unwrap();
        assert!(text.contains("13:34120000;"));
    }

    #[test]
    fn g_then_p_round_trip_a_register() {
        let (mut engine, mut regs, mut ram) = engine_and_state();
        regs.set(5, 0xDEAD_BEEF);
        let mut mem = SliceMemory::new(0x1000, &mut ram);
        let mut transport = MockTransport::new();
        queue_session(&mut transport, &[b"p5"], b"c");
        engine.handle_stop(signal::TRAP, &mut regs, &mut transport, &mut mem);
        let wire = transport.take_outbound();
        let text = core::str::from_utf8(&wire).unwrap();
        assert!(text.contains("efbeadde"));
    }

    #[test]
    fn p_register_out_of_range_reports_e02() {
        let (mut engine, mut regs, mut ram) = engine_and_state();
        let mut mem = SliceMemory::new(0x1000, &mut ram);
        let mut transport = MockTransport::new();
        queue_session(&mut transport, &[b"p64"], b"c");
        engine.handle_stop(signal::TRAP, &mut regs, &mut transport, &mut mem);
        let wire = transport.take_outbound();
        let text = core::str::from_utf8(&wire).unwrap();
        assert!(text.contains("E02"));
    }

    #[test]
    fn write_then_read_memory_round_trips() {
        let (mut engine, mut regs, mut ram) = engine_and_state();
        let mut mem = SliceMemory::new(0x1000, &mut ram);
        let mut transport = MockTransport::new();
        queue_session(&mut transport, &[b"M1000,2:abcd", b"m1000,2"], b"c");
        engine.handle_stop(signal::TRAP, &mut regs, &mut transport, &mut mem);
        let wire = transport.take_outbound();
        let text = core::str::from_utf8(&wire).unwrap();
        assert!(text.contains("OK"));
        assert!(text.contains("abcd"));
    }

    #[test]
    fn continue_with_address_updates_pc_and_resumes() {
        let (mut engine, mut regs, mut ram) = engine_and_state();
        let mut mem = SliceMemory::new(0x1000, &mut ram);
        let mut transport = MockTransport::new();
        queue_session(&mut transport, &[], b"c2000");
        engine.handle_stop(signal::INT, &mut regs, &mut transport, &mut mem);
        assert_eq!(regs.pc(), 0x2000);
    }

    #[test]
    fn stepping_onto_existing_breakpoint_skips_past_without_resuming() {
        let (mut engine, mut regs, mut ram) = engine_and_state();
        ram[0] = crate::config::BREAKPOINT_OPCODE;
        let mut mem = SliceMemory::new(0x1000, &mut ram);
        regs.set_pc(0x1000);
        let mut transport = MockTransport::new();
        queue_session(&mut transport, &[b"s"], b"c");
        engine.handle_stop(signal::TRAP, &mut regs, &mut transport, &mut mem);
        assert_eq!(regs.pc(), 0x1001);
    }

    #[test]
    fn unknown_command_gets_an_empty_reply() {
        let (mut engine, mut regs, mut ram) = engine_and_state();
        let mut mem = SliceMemory::new(0x1000, &mut ram);
        let mut transport = MockTransport::new();
        queue_session(&mut transport, &[b"Z0,1000,1"], b"c");
        engine.handle_stop(signal::TRAP, &mut regs, &mut transport, &mut mem);
        let wire = transport.take_outbound();
        // Payload for the unknown-command reply is empty: "$#00".
        assert!(core::str::from_utf8(&wire).unwrap().contains("$#00"));
    }

    #[test]
    fn write_register_with_truncated_hex_reports_e01_instead_of_panicking() {
        let (mut engine, mut regs, mut ram) = engine_and_state();
        let mut mem = SliceMemory::new(0x1000, &mut ram);
        let mut transport = MockTransport::new();
        // Register 5 needs 8 hex digits; only 2 are supplied.
        queue_session(&mut transport, &[b"P5=ab"], b"c");
        engine.handle_stop(signal::TRAP, &mut regs, &mut transport, &mut mem);
        let wire = transport.take_outbound();
        assert!(core::str::from_utf8(&wire).unwrap().contains("E01"));
    }

    #[test]
    fn write_memory_with_truncated_hex_reports_e01_instead_of_panicking() {
        let (mut engine, mut regs, mut ram) = engine_and_state();
        let mut mem = SliceMemory::new(0x1000, &mut ram);
        let mut transport = MockTransport::new();
        // Declares 4 bytes of payload but only supplies 2 hex characters.
        queue_session(&mut transport, &[b"M1000,4:ab"], b"c");
        engine.handle_stop(signal::TRAP, &mut regs, &mut transport, &mut mem);
        let wire = transport.take_outbound();
        assert!(core::str::from_utf8(&wire).unwrap().contains("E01"));
    }

    #[test]
    fn stepping_an_undecodable_opcode_logs_and_still_resumes() {
        let (mut engine, mut regs, mut ram) = engine_and_state();
        ram[0] = 0x01; // not claimed by any decoded family
        let mut mem = SliceMemory::new(0x1000, &mut ram);
        regs.set_pc(0x1000);
        let mut transport = MockTransport::new();
        // 's' resumes directly rather than replying, but the debug log it
        // triggers is still a full packet the host must ack.
        transport.queue_inbound(b"+"); // ack for the unsolicited stop report
        transport.queue_inbound(&framed(b"s"));
        transport.queue_inbound(b"+"); // ack for the debug log's O packet
        engine.handle_stop(signal::TRAP, &mut regs, &mut transport, &mut mem);
        let wire = transport.take_outbound();
        let text = core::str::from_utf8(&wire).unwrap();
        assert!(text.contains("$O"));
        assert!(!engine.step.is_active());
    }
}
