//! Shared helpers for unit tests that need a localhost socket.

pub mod socket_guard;
