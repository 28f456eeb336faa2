//! Snapshot of one network cycle as announced by the master beacon.

/// Maximum number of synchronous slots a beacon can announce.
pub const MAX_SYNC_SLOTS: usize = 32;

/// One reserved transmission window inside the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotDescriptor {
    /// Device the slot is reserved for.
    pub device_id: u32,
    /// Offset from the start of the cycle.
    pub offset_us: u32,
    /// Payload budget in bytes.
    pub length: u16,
}

/// Cycle layout decoded from a beacon. Replaced wholesale on every beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetworkMap {
    pub network_id: u32,
    pub master_id: u32,
    /// Devices the master currently knows about.
    pub device_count: u8,
    /// Device clock at the start of the cycle (start of the beacon on air).
    pub cycle_start_us: u32,
    pub cycle_duration_us: u32,
    slots: [SlotDescriptor; MAX_SYNC_SLOTS],
    slot_count: usize,
}

impl Default for NetworkMap {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl NetworkMap {
    /// Map of a network that has not been heard yet.
    pub const EMPTY: Self = Self {
        network_id: 0,
        master_id: 0,
        device_count: 0,
        cycle_start_us: 0,
        cycle_duration_us: 0,
        slots: [SlotDescriptor {
            device_id: 0,
            offset_us: 0,
            length: 0,
        }; MAX_SYNC_SLOTS],
        slot_count: 0,
    };

    pub const fn new(
        network_id: u32,
        master_id: u32,
        cycle_start_us: u32,
        cycle_duration_us: u32,
    ) -> Self {
        Self {
            network_id,
            master_id,
            cycle_start_us,
            cycle_duration_us,
            ..Self::EMPTY
        }
    }

    /// Append a slot in cycle order. Returns `false` once the table is full.
    pub fn push_slot(&mut self, slot: SlotDescriptor) -> bool {
        if self.slot_count == MAX_SYNC_SLOTS {
            return false;
        }
        self.slots[self.slot_count] = slot;
        self.slot_count += 1;
        true
    }

    /// Announced slots, in cycle order.
    pub fn slots(&self) -> &[SlotDescriptor] {
        &self.slots[..self.slot_count]
    }

    /// First slot reserved for `device_id`.
    pub fn slot_for(&self, device_id: u32) -> Option<&SlotDescriptor> {
        self.slots().iter().find(|slot| slot.device_id == device_id)
    }

    /// Device clock at which the cycle ends.
    pub fn cycle_end_us(&self) -> u32 {
        self.cycle_start_us.wrapping_add(self.cycle_duration_us)
    }
}
