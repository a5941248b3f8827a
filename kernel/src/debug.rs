// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The `O` packet side channel: host-visible text the target emits
//! outside the normal stop-report flow, the same role `kernel::debug!()`
//! plays elsewhere in this codebase, routed here over the wire instead of
//! a UART console.
//!
//! Grounded on `stub_puts`/`debug_puts` in the reference stub: a string
//! gets hex-encoded into an `O` packet, truncated to whatever fits the
//! shared packet buffer, with a trailing newline appended on the wire
//! (`"\n"` hex-encodes to the literal `"0A"` the original appends).

use crate::config::{MAX_LOG_MESSAGE, PACKET_BUFFER_SIZE};
use crate::framer::{send_packet, PacketBuffer};
use crate::hexcodec::encode;
use crate::transport::Transport;

/// `O<hex...>` payload overhead: the leading `'O'` plus the two hex
/// characters for the trailing newline this function appends.
const OVERHEAD: usize = 1 + 2;

/// Hex-encodes `text` into an `O` packet and sends it, truncating `text`
/// if it would not otherwise fit in the shared packet buffer.
pub fn send_text<T: Transport>(transport: &mut T, scratch: &mut PacketBuffer, text: &[u8]) {
    let max_text = (PACKET_BUFFER_SIZE - OVERHEAD) / 2;
    let text = if text.len() > max_text {
        &text[..max_text]
    } else {
        text
    };

    let out = scratch.as_write_buffer();
    out[0] = b'O';
    encode(&mut out[1..1 + text.len() * 2], text);
    let newline_at = 1 + text.len() * 2;
    out[newline_at] = b'0';
    out[newline_at + 1] = b'A';
    let total = newline_at + 2;
    scratch.set_len(total);
    send_packet(transport, scratch.as_slice());
}

/// Fixed-capacity `core::fmt::Write` sink backing [`log`]. Formatting that
/// overruns `MAX_LOG_MESSAGE` is silently truncated rather than failing —
/// an engine-internal diagnostic losing its tail is preferable to losing
/// the whole message.
struct FormatSink<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl core::fmt::Write for FormatSink<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let remaining = self.buf.len() - self.len;
        let n = s.len().min(remaining);
        self.buf[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        Ok(())
    }
}

/// Formats `args` into a scratch buffer and sends it as an `O` packet.
/// Backs the [`crate::debug!`] macro; not meant to be called directly.
pub fn log<T: Transport>(transport: &mut T, scratch: &mut PacketBuffer, args: core::fmt::Arguments) {
    let mut message = [0u8; MAX_LOG_MESSAGE];
    let mut sink = FormatSink {
        buf: &mut message,
        len: 0,
    };
    let _ = core::fmt::Write::write_fmt(&mut sink, args);
    let len = sink.len;
    send_text(transport, scratch, &message[..len]);
}

/// Engine-internal diagnostic logging. Formats like [`core::format_args!`]
/// and sends the result out over the wire as an `O` packet — the same
/// side channel target code reaches with `debug_puts`, just from inside
/// this crate instead of user code.
#[macro_export]
macro_rules! debug {
    ($transport:expr, $scratch:expr, $($arg:tt)*) => {
        $crate::debug::log($transport, $scratch, core::format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    #[test]
    fn hex_encodes_text_and_appends_a_newline() {
        let mut transport = MockTransport::new();
        transport.queue_inbound(b"+");
        let mut scratch = PacketBuffer::new();
        send_text(&mut transport, &mut scratch, b"hi");
        let wire = transport.take_outbound();

        let payload = b"O68690A"; // "hi" -> 68 69, newline -> 0A
        let checksum: u32 = payload.iter().map(|&c| c as u32).sum::<u32>() & 0xFF;
        let mut expected = Vec::from(&b"$"[..]);
        expected.extend_from_slice(payload);
        expected.push(b'#');
        expected.extend_from_slice(format!("{:02x}", checksum).as_bytes());
        assert_eq!(wire, expected);
    }

    #[test]
    fn truncates_text_too_long_for_the_packet_buffer() {
        let mut transport = MockTransport::new();
        transport.queue_inbound(b"+");
        let mut scratch = PacketBuffer::new();
        let long = [b'x'; PACKET_BUFFER_SIZE];
        send_text(&mut transport, &mut scratch, &long);
        let wire = transport.take_outbound();
        // Started with '$', ended with "#<cc>"; payload length must fit.
        assert!(wire.len() <= PACKET_BUFFER_SIZE + 8);
    }

    #[test]
    fn debug_macro_formats_and_sends_as_an_o_packet() {
        let mut transport = MockTransport::new();
        transport.queue_inbound(b"+");
        let mut scratch = PacketBuffer::new();
        crate::debug!(&mut transport, &mut scratch, "pc={:#x}", 0x1000u32);
        let wire = transport.take_outbound();

        let text = b"pc=0x1000";
        let mut payload = Vec::from(&b"O"[..]);
        for &b in text {
            payload.extend_from_slice(format!("{:02x}", b).as_bytes());
        }
        payload.extend_from_slice(b"0a");
        let checksum: u32 = payload.iter().map(|&c| c as u32).sum::<u32>() & 0xFF;
        let mut expected = Vec::from(&b"$"[..]);
        expected.extend_from_slice(&payload);
        expected.push(b'#');
        expected.extend_from_slice(format!("{:02x}", checksum).as_bytes());
        assert_eq!(wire, expected);
    }

    #[test]
    fn debug_macro_truncates_at_max_log_message() {
        let mut transport = MockTransport::new();
        transport.queue_inbound(b"+");
        let mut scratch = PacketBuffer::new();
        crate::debug!(&mut transport, &mut scratch, "{}", "x".repeat(500));
        let wire = transport.take_outbound();
        // 'O' + 2 hex chars per byte + '#' + 2-digit checksum, plus framing.
        assert!(wire.len() <= 1 + 1 + MAX_LOG_MESSAGE * 2 + 1 + 2);
    }
}
