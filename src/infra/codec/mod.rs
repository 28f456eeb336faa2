//! Wire-format codec seam. The byte layout of every message type and the
//! slot-timing arithmetic live behind [`traits::WireCodec`]; this crate only
//! consumes the results.
pub mod network_map;
pub mod traits;
