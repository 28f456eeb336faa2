//! High-level components of the radio network: the link layer (frames,
//! transceiver driver, inbound queue, transmit scheduler) and the device-side
//! network management built on top of it.
pub mod managment;
pub mod transport;
