//! `marinelink` library: the radio-link core of a marine instrument bridge.
//! It drives a packet radio transceiver at the link layer, fires outbound
//! frames at microsecond deadlines, and runs the device side of a
//! time-division wireless instrument network, all in a `no_std` environment.
#![no_std]
//==================================================================================
/// Errors surfaced to callers (initialization and bus failures).
pub mod error;
/// Seams towards collaborators: the wire-format codec and hardware adapters.
pub mod infra;
/// Link layer (frames, transceiver driver, scheduler) and network management.
pub mod protocol;
//==================================================================================
