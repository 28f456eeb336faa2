//! Network management on top of the link layer: the device-side join and
//! slot state machine, the in-range bookkeeping it maintains, and the split
//! of reported data fields over virtual identities.
pub mod device_info;
pub mod field_split;
pub mod in_range;
pub mod network_device;
