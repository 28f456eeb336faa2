//! Infrastructure seams: the over-the-air message codec the network device
//! relies on, and adapters binding the hardware traits to embedded-hal and
//! embassy.
pub mod codec;
pub mod hal;
