//! Camera remote-control protocol.
//!
//! Opcodes for the shutter commands and the order they are sent in.

pub mod commands;

pub use commands::{Command, SequenceStep, TRIGGER_SEQUENCE};
