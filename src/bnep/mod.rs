//! BNEP wire format and channel state machine.
//!
//! `codec` is pure build/parse functions (§4.1); `session` owns the channel
//! state machine and control-message policy built on top of it (§4.2).

pub mod codec;
pub mod session;
pub mod types;
