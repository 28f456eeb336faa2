//! Abstraction traits used by the link layer and the network device
//! (register bus, clocks and timers, outbound action scheduling).
pub mod action_scheduler;
pub mod clock;
pub mod delay_timer;
pub mod register_bus;
