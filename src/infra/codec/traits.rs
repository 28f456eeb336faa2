//! Interface the network device expects from the wire-format codec.
//!
//! The codec owns every byte-level concern: header parsing and checksum,
//! message encoding, beacon decoding and the slot-timing formulas. The
//! network device only decides which message goes out in which slot.
use crate::{
    infra::codec::network_map::NetworkMap,
    protocol::{managment::in_range::DeviceInRange, transport::radio_frame::RadioFrame},
};

//==================================================================================MESSAGE_ID
/// Message types the network device reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageId {
    /// Periodic master request carrying the cycle's slot map.
    MasterRequest,
    Data,
    SlotRequest,
    SlotUpdate,
    AckParameter,
    Ping,
    /// Anything the codec recognizes but the device has no role in.
    Other(u8),
}

//==================================================================================TRANSMISSION_SLOT
/// Window a message may be sent in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransmissionSlot {
    /// Absolute device-clock time at which the frame must start on air.
    pub start_us: u32,
    /// Payload bytes the slot can carry.
    pub payload_budget: usize,
}

//==================================================================================WIRE_CODEC
/// Wire-format codec consumed by [`NetworkDevice`].
///
/// Header accessors are only called on frames whose header checksum has
/// been verified, except [`verify_header_crc`](Self::verify_header_crc)
/// itself and [`network_id`](Self::network_id).
///
/// [`NetworkDevice`]: crate::protocol::managment::network_device::NetworkDevice
pub trait WireCodec {
    //==================== Header ====================
    fn network_id(&self, frame: &RadioFrame) -> u32;
    fn verify_header_crc(&self, frame: &RadioFrame) -> bool;
    fn message_id(&self, frame: &RadioFrame) -> MessageId;
    /// Sender of the frame.
    fn device_id(&self, frame: &RadioFrame) -> u32;

    //==================== Beacon ====================
    fn network_map(&self, frame: &RadioFrame) -> NetworkMap;
    /// Device-clock time at which the current cycle's traffic ends.
    fn end_of_network(&self, map: &NetworkMap) -> u32;
    /// Device-clock time at which the next cycle starts.
    fn next_start_of_network(&self, map: &NetworkMap) -> u32;

    //==================== Signal ====================
    /// Signal level of a received frame, on the codec's display scale.
    fn signal_strength(&self, frame: &RadioFrame) -> u8;

    /// Level at which the sender reports hearing `own_id`, when the message
    /// carries such a report.
    fn reported_signal_level(&self, _frame: &RadioFrame, _own_id: u32) -> Option<u8> {
        None
    }

    //==================== Slots ====================
    /// Reserved slot of `device_id` in the cycle, if any.
    fn sync_transmission_slot(&self, map: &NetworkMap, device_id: u32)
        -> Option<TransmissionSlot>;
    /// Shared contention slot of the cycle.
    fn async_transmission_slot(&self, map: &NetworkMap) -> TransmissionSlot;
    /// Start of the acknowledgment window of `device_id`, if any.
    fn ack_transmission_slot(&self, map: &NetworkMap, device_id: u32) -> Option<u32>;

    //==================== Encoding ====================
    fn encode_data_message(&self, map: &NetworkMap, device_id: u32, fields: u32) -> RadioFrame;
    /// Ask the master to resize the slot of `device_id` to `payload_len` bytes.
    fn encode_slot_update_message(
        &self,
        map: &NetworkMap,
        device_id: u32,
        payload_len: usize,
    ) -> RadioFrame;
    /// Ask the master for a first slot of `payload_len` bytes.
    fn encode_slot_request_message(
        &self,
        map: &NetworkMap,
        device_id: u32,
        payload_len: usize,
    ) -> RadioFrame;
    fn encode_ack_param_message(&self, map: &NetworkMap, device_id: u32) -> RadioFrame;
    /// Announce `device_id` together with the devices it currently hears.
    fn encode_ping_message(
        &self,
        map: &NetworkMap,
        device_id: u32,
        in_range: &[DeviceInRange],
    ) -> RadioFrame;

    //==================== Decoding ====================
    /// Apply the frame's content to the navigation data store. Returns `false`
    /// when the message cannot be decoded.
    fn decode_message(&mut self, frame: &RadioFrame) -> bool;
    /// Whether the sender expects an acknowledgment for this frame.
    fn requires_ack(&self, frame: &RadioFrame) -> bool;
    /// Payload length of a data message carrying `fields`.
    fn data_message_length(&self, fields: u32) -> usize;
}
