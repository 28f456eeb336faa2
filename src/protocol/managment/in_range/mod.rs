//! Bounded tables of recently heard devices and foreign networks.
//!
//! Both tables are fixed arenas with an explicit used count. A sighting
//! refreshes the matching entry or appends a new one; once full, new keys are
//! dropped without evicting anyone. Entries older than their timeout are
//! removed by shifting the tail left by one.
use embassy_time::Duration;

/// Devices remembered at once.
pub const MAX_DEVICES_IN_RANGE: usize = 16;
/// Foreign networks remembered at once.
pub const MAX_NETWORKS_IN_RANGE: usize = 8;

//==================================================================================SIGHTING
/// Entry of an in-range table.
pub trait Sighting: Copy {
    /// Filler for unused arena cells.
    const VACANT: Self;

    /// Identity the table deduplicates on.
    fn key(&self) -> u32;

    /// Device clock of the last sighting.
    fn last_seen_us(&self) -> u32;

    /// Merge a newer sighting of the same key.
    fn refresh(&mut self, newer: &Self) {
        *self = *newer;
    }
}

/// Another device of our network heard on air.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceInRange {
    pub device_id: u32,
    pub last_seen_us: u32,
    /// How well we hear the device.
    pub local_signal_level: u8,
    /// How well the device reports hearing us, once it told us.
    pub remote_signal_level: Option<u8>,
}

impl Sighting for DeviceInRange {
    const VACANT: Self = Self {
        device_id: 0,
        last_seen_us: 0,
        local_signal_level: 0,
        remote_signal_level: None,
    };

    fn key(&self) -> u32 {
        self.device_id
    }

    fn last_seen_us(&self) -> u32 {
        self.last_seen_us
    }

    fn refresh(&mut self, newer: &Self) {
        self.last_seen_us = newer.last_seen_us;
        self.local_signal_level = newer.local_signal_level;
        // Most messages carry no report; keep the last one we got.
        if newer.remote_signal_level.is_some() {
            self.remote_signal_level = newer.remote_signal_level;
        }
    }
}

/// A network other than ours, heard through a frame with a valid header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetworkInRange {
    pub network_id: u32,
    /// Signal strength of the last frame, in dBm.
    pub rssi: i16,
    pub last_seen_us: u32,
}

impl Sighting for NetworkInRange {
    const VACANT: Self = Self {
        network_id: 0,
        rssi: 0,
        last_seen_us: 0,
    };

    fn key(&self) -> u32 {
        self.network_id
    }

    fn last_seen_us(&self) -> u32 {
        self.last_seen_us
    }
}

//==================================================================================IN_RANGE_TABLE
/// Fixed-capacity table of sightings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InRangeTable<T: Sighting, const N: usize> {
    entries: [T; N],
    count: usize,
}

pub type DevicesInRange = InRangeTable<DeviceInRange, MAX_DEVICES_IN_RANGE>;
pub type NetworksInRange = InRangeTable<NetworkInRange, MAX_NETWORKS_IN_RANGE>;

impl<T: Sighting, const N: usize> Default for InRangeTable<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Sighting, const N: usize> InRangeTable<T, N> {
    pub const fn new() -> Self {
        Self {
            entries: [T::VACANT; N],
            count: 0,
        }
    }

    /// Refresh the entry with the same key or append a new one.
    ///
    /// Returns `false` when the key is new and the table is full; the
    /// sighting is dropped.
    pub fn record(&mut self, sighting: T) -> bool {
        if let Some(entry) = self.entries[..self.count]
            .iter_mut()
            .find(|entry| entry.key() == sighting.key())
        {
            entry.refresh(&sighting);
            return true;
        }
        if self.count == N {
            return false;
        }
        self.entries[self.count] = sighting;
        self.count += 1;
        true
    }

    /// Remove every entry not seen during the last `timeout`.
    pub fn prune(&mut self, now_us: u32, timeout: Duration) {
        let mut index = 0;
        while index < self.count {
            let age = now_us.wrapping_sub(self.entries[index].last_seen_us());
            if u64::from(age) > timeout.as_micros() {
                self.remove(index);
            } else {
                index += 1;
            }
        }
    }

    fn remove(&mut self, index: usize) {
        self.entries.copy_within(index + 1..self.count, index);
        self.count -= 1;
        self.entries[self.count] = T::VACANT;
    }

    pub fn clear(&mut self) {
        self.entries = [T::VACANT; N];
        self.count = 0;
    }

    pub fn find(&self, key: u32) -> Option<&T> {
        self.entries().iter().find(|entry| entry.key() == key)
    }

    /// Live entries, in order of first sighting.
    pub fn entries(&self) -> &[T] {
        &self.entries[..self.count]
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}
