// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed frame codec and the `Message`/`Ack` wire types exchanged
//! between a worker and its parent.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod codec;
mod error;
mod protocol;

pub use codec::{decode, encode, read_message, read_value, write_message, write_value};
pub use error::ProtocolError;
pub use protocol::{Ack, Message};
