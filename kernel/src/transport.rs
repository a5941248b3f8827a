// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The byte-stream boundary this crate depends on instead of a concrete
//! UART peripheral.
//!
//! Generalizes the `get_byte`/`put_byte` primitives the hard-core spec
//! names as external collaborators, the same way the capsules in this
//! codebase depend on `&dyn uart::Uart<'a>` rather than a specific chip's
//! USART (see `capsules/core/src/uart1.rs`'s `UartCapsule`, which holds
//! `uart: &'a dyn uart::Uart<'a>` and never names a chip). A board wires a
//! concrete UART driver to this trait entirely outside this crate; the
//! test suite below wires a host-side byte queue instead.

/// Blocking byte transport. `get_byte` and `put_byte` busy-wait on whatever
/// status bits the concrete peripheral exposes; this crate never assumes
/// anything about how long that takes, only that it eventually completes.
pub trait Transport {
    /// Blocks until one byte has been received.
    fn get_byte(&mut self) -> u8;

    /// Blocks until one byte has been queued for transmission.
    fn put_byte(&mut self, byte: u8);
}

/// Test and host-tool support: a [`Transport`] backed by two byte queues.
#[cfg(any(test, feature = "testing"))]
pub mod mock {
    use super::Transport;
    use std::collections::VecDeque;
    use std::vec::Vec;

    /// A [`Transport`] with one queue of bytes "from the host" and one
    /// "to the host", so a unit test can feed input and inspect output
    /// without any real serial hardware.
    pub struct MockTransport {
        inbound: VecDeque<u8>,
        outbound: Vec<u8>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            MockTransport {
                inbound: VecDeque::new(),
                outbound: Vec::new(),
            }
        }

        pub fn from_bytes(bytes: &[u8]) -> Self {
            let mut t = Self::new();
            t.queue_inbound(bytes);
            t
        }

        pub fn queue_inbound(&mut self, bytes: &[u8]) {
            self.inbound.extend(bytes.iter().copied());
        }

        pub fn take_outbound(&mut self) -> Vec<u8> {
            core::mem::take(&mut self.outbound)
        }
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for MockTransport {
        fn get_byte(&mut self) -> u8 {
            self.inbound
                .pop_front()
                .expect("MockTransport starved: test did not queue enough inbound bytes")
        }

        fn put_byte(&mut self, byte: u8) {
            self.outbound.push(byte);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn bytes_come_back_out_in_the_order_queued() {
            let mut transport = MockTransport::from_bytes(b"ab");
            assert_eq!(transport.get_byte(), b'a');
            assert_eq!(transport.get_byte(), b'b');
        }

        #[test]
        fn put_bytes_accumulate_until_taken() {
            let mut transport = MockTransport::new();
            transport.put_byte(b'x');
            transport.put_byte(b'y');
            assert_eq!(transport.take_outbound(), b"xy");
            assert!(transport.take_outbound().is_empty());
        }

        #[test]
        #[should_panic(expected = "starved")]
        fn get_byte_panics_once_the_queue_is_empty() {
            let mut transport = MockTransport::new();
            transport.get_byte();
        }
    }
}
