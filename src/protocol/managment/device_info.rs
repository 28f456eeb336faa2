//! Protocol state of this device and its configuration.
use embassy_time::Duration;

use crate::{
    infra::codec::network_map::NetworkMap,
    protocol::managment::{
        field_split::MAX_VIRTUAL_DEVICES,
        in_range::{DevicesInRange, NetworksInRange},
    },
};

/// Membership state of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// No beacon of the configured network heard recently.
    SearchingNetwork,
    /// Following the configured network's cycles.
    Active,
}

/// Identity and timing parameters of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    pub network_id: u32,
    /// Id of the first virtual identity; the others follow consecutively.
    pub device_id: u32,
    /// Number of virtual identities, `1..=MAX_VIRTUAL_DEVICES`.
    pub virtual_devices: u8,
    /// Data fields this device reports.
    pub data_fields: u32,
    /// Silence from the master after which the network is considered lost.
    pub network_lost_timeout: Duration,
    /// Age after which a device drops out of the in-range list.
    pub device_timeout: Duration,
    /// Age after which a foreign network drops out of the in-range list.
    pub network_timeout: Duration,
    /// Minimum interval between two pings.
    pub ping_period: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            network_id: 0,
            device_id: 1,
            virtual_devices: 1,
            data_fields: 0,
            network_lost_timeout: Duration::from_secs(5),
            device_timeout: Duration::from_secs(30),
            network_timeout: Duration::from_secs(60),
            ping_period: Duration::from_secs(10),
        }
    }
}

/// Snapshot of the device's protocol state, for UI and configuration layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub state: DeviceState,
    pub device_id: u32,
    pub network_id: u32,
    pub virtual_devices: u8,
    /// Latest cycle layout, valid while `state` is `Active`.
    pub network_map: NetworkMap,
    pub data_fields: u32,
    /// `data_fields` split per virtual identity.
    pub split_data_fields: [u32; MAX_VIRTUAL_DEVICES],
    pub devices_in_range: DevicesInRange,
    pub networks_in_range: NetworksInRange,
    /// Signal level of the last beacon.
    pub master_signal_level: u8,
    pub last_master_comm_us: u32,
    pub ping_time_us: u32,
}

impl DeviceInfo {
    /// Fresh state for `config`, timestamps taken at `now_us`.
    pub fn new(config: &DeviceConfig, now_us: u32) -> Self {
        Self {
            state: DeviceState::SearchingNetwork,
            device_id: config.device_id,
            network_id: config.network_id,
            virtual_devices: config
                .virtual_devices
                .clamp(1, MAX_VIRTUAL_DEVICES as u8),
            network_map: NetworkMap::EMPTY,
            data_fields: config.data_fields,
            split_data_fields: [0; MAX_VIRTUAL_DEVICES],
            devices_in_range: DevicesInRange::new(),
            networks_in_range: NetworksInRange::new(),
            master_signal_level: 0,
            last_master_comm_us: now_us,
            ping_time_us: now_us,
        }
    }

    /// Id of virtual identity `index`.
    pub fn virtual_device_id(&self, index: usize) -> u32 {
        self.device_id.wrapping_add(index as u32)
    }
}
