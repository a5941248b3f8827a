// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Target-agnostic core of a bare-metal remote-serial debugging stub.
//!
//! Everything in this crate is free of inline assembly, interrupt vectors,
//! and anything else that depends on a specific microcontroller: it only
//! knows about a byte stream ([`transport::Transport`]), a flat address
//! space ([`memory::Memory`]), and a register file ([`regfile::RegisterFile`]).
//! An architecture crate (`arch/mcu32` in this workspace) owns the naked
//! entry points that capture and restore real CPU state and calls into
//! [`engine::Engine::handle_stop`] once that state is in a [`regfile::RegisterFile`].
//!
//! `#[cfg(test)]` pulls in `std` so the test suite can use `Vec`/`VecDeque`
//! for mock transports and memory images; a target build stays `no_std`.
//!
//! The `testing` feature exposes [`transport::mock`] to other workspace
//! crates (`boards/demo`) without requiring `cfg(test)`. A non-test build
//! with that feature on is still `no_std` per the attribute above, which
//! suppresses the implicit `extern crate std;` a normal build gets for
//! free — so pull it in explicitly whenever `mock`'s `std::collections`
//! usage might be compiled in.
#![cfg_attr(not(test), no_std)]

#[cfg(feature = "testing")]
extern crate std;

pub mod config;
pub mod debug;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod framer;
pub mod hexcodec;
pub mod memory;
pub mod regfile;
pub mod step;
pub mod transport;

pub use engine::Engine;
pub use error::StubError;
pub use regfile::RegisterFile;
