//! Internal modules for the blackjack client.
//!
//! This library provides input parsing, the console front end, and the
//! automatic player used by the bj_client binary.

pub mod auto;
pub mod commands;
pub mod console;
