//! Asynchronous client for the [Source RCON protocol](https://developer.valvesoftware.com/wiki/Source_RCON_Protocol),
//! the remote console that srcds based game servers speak over TCP.
//!
//! [client::Client] owns one authenticated connection and runs commands over
//! it; [packet::Packet] is the wire codec underneath.
pub mod client;
pub mod error;
pub mod packet;
