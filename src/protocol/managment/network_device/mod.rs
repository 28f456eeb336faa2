//! Device side of the time-division network: join on the master's beacon,
//! claim and use transmission slots, and fall back to searching when the
//! master goes silent.
//!
//! ```text
//!                     beacon of our network
//!   SearchingNetwork ───────────────────────► Active
//!          ▲                                    │
//!          └──── no beacon for network_lost ────┘
//! ```
//!
//! Every outbound frame leaves through the [`ActionScheduler`]: this module
//! decides *what* goes out and *when*, the scheduler makes it happen on time.
use futures_util::{
    future::{select, Either},
    pin_mut,
};

use crate::{
    infra::codec::{
        network_map::NetworkMap,
        traits::{MessageId, WireCodec},
    },
    protocol::{
        managment::{
            device_info::{DeviceConfig, DeviceInfo, DeviceState},
            field_split::split_data_fields,
            in_range::{DeviceInRange, NetworkInRange},
        },
        transport::{
            message_queue::MessageQueue,
            radio_frame::{FrameAction, RadioFrame},
            traits::{
                action_scheduler::ActionScheduler, clock::MicrosClock, delay_timer::DelayTimer,
            },
            POWER_UP_LEAD_US,
        },
    },
};

/// Interval of the housekeeping pass run by [`NetworkDevice::drive`].
pub const HOUSEKEEPING_PERIOD_MS: u32 = 100;

/// Protocol state machine of one physical device and its virtual identities.
pub struct NetworkDevice<C: WireCodec, S: ActionScheduler, K: MicrosClock> {
    codec: C,
    scheduler: S,
    clock: K,
    config: DeviceConfig,
    info: DeviceInfo,
}

impl<C: WireCodec, S: ActionScheduler, K: MicrosClock> NetworkDevice<C, S, K> {
    /// Start searching for `config.network_id`. The first ping is due one
    /// ping period from now.
    pub fn new(codec: C, scheduler: S, clock: K, config: DeviceConfig) -> Self {
        let info = DeviceInfo::new(&config, clock.now_us());
        let mut device = Self {
            codec,
            scheduler,
            clock,
            config,
            info,
        };
        device.split_fields();
        device
    }

    /// Snapshot of the protocol state.
    pub fn device_info(&self) -> DeviceInfo {
        self.info.clone()
    }

    pub fn state(&self) -> DeviceState {
        self.info.state
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    //==================================================================================Configuration
    /// Follow another network. Membership of the previous one is dropped.
    pub fn set_network_id(&mut self, network_id: u32) {
        if network_id == self.info.network_id {
            return;
        }
        self.config.network_id = network_id;
        self.info.network_id = network_id;
        self.lose_network();
    }

    pub fn set_device_id(&mut self, device_id: u32) {
        self.config.device_id = device_id;
        self.info.device_id = device_id;
    }

    /// Replace the reported data fields.
    pub fn set_data_fields(&mut self, fields: u32) {
        self.config.data_fields = fields;
        self.info.data_fields = fields;
        self.split_fields();
    }

    /// Report `fields` in addition to the current ones.
    pub fn add_data_fields(&mut self, fields: u32) {
        self.set_data_fields(self.info.data_fields | fields);
    }

    fn split_fields(&mut self) {
        let codec = &self.codec;
        self.info.split_data_fields = split_data_fields(
            self.info.data_fields,
            self.info.virtual_devices as usize,
            |mask| codec.data_message_length(mask),
        );
    }

    //==================================================================================Inbound frames
    /// Handle one frame from the inbound queue.
    pub fn process_message(&mut self, frame: &RadioFrame) {
        let now = self.clock.now_us();

        if !self.codec.verify_header_crc(frame) {
            self.prune(now);
            return;
        }

        let network_id = self.codec.network_id(frame);
        if network_id != self.info.network_id {
            self.info.networks_in_range.record(NetworkInRange {
                network_id,
                rssi: frame.rssi,
                last_seen_us: now,
            });
            self.prune(now);
            return;
        }

        let sighting = DeviceInRange {
            device_id: self.codec.device_id(frame),
            last_seen_us: now,
            local_signal_level: self.codec.signal_strength(frame),
            remote_signal_level: self.codec.reported_signal_level(frame, self.info.device_id),
        };
        if !self.info.devices_in_range.record(sighting) {
            #[cfg(feature = "defmt")]
            defmt::debug!("In-range list full, ignoring device {=u32}", sighting.device_id);
        }

        match self.codec.message_id(frame) {
            MessageId::MasterRequest => self.on_beacon(frame, now),
            _ => self.on_message(frame),
        }

        self.prune(now);
    }

    /// Master beacon: adopt the new cycle and plan this device's traffic in it.
    fn on_beacon(&mut self, frame: &RadioFrame, now: u32) {
        if self.info.state != DeviceState::Active {
            #[cfg(feature = "defmt")]
            defmt::info!("Joined network {=u32}", self.info.network_id);
        }
        self.info.state = DeviceState::Active;
        self.info.last_master_comm_us = now;
        self.info.master_signal_level = self.codec.signal_strength(frame);

        let map = self.codec.network_map(frame);
        self.info.network_map = map;

        // Sleep through the idle part of the cycle, wake early enough for the
        // oscillator to settle before the next beacon.
        let end = self.codec.end_of_network(&map);
        let wake = self
            .codec
            .next_start_of_network(&map)
            .wrapping_sub(POWER_UP_LEAD_US);
        self.schedule_control(FrameAction::EnterLowPower, end);
        self.schedule_control(FrameAction::ExitLowPower, wake);

        let mut async_slot_used = false;
        for index in 0..self.info.virtual_devices as usize {
            let fields = self.info.split_data_fields[index];
            if fields == 0 {
                continue;
            }
            let device_id = self.info.virtual_device_id(index);
            let needed = self.codec.data_message_length(fields);

            match self.codec.sync_transmission_slot(&map, device_id) {
                Some(slot) if slot.payload_budget >= needed => {
                    let data = self.codec.encode_data_message(&map, device_id, fields);
                    self.schedule_transmit(slot.start_us, data);
                }
                Some(_) => {
                    // One contention frame per cycle; the others retry next cycle.
                    if !async_slot_used {
                        let resize = self
                            .codec
                            .encode_slot_update_message(&map, device_id, needed);
                        async_slot_used = self.schedule_async(&map, resize);
                    }
                }
                None => {
                    if !async_slot_used {
                        let request = self
                            .codec
                            .encode_slot_request_message(&map, device_id, needed);
                        async_slot_used = self.schedule_async(&map, request);
                    }
                }
            }
        }

        if !async_slot_used && self.ping_due(now) {
            let ping = self.codec.encode_ping_message(
                &map,
                self.info.device_id,
                self.info.devices_in_range.entries(),
            );
            if self.schedule_async(&map, ping) {
                self.info.ping_time_us = now;
            }
        }
    }

    /// Any other message of our network: decode, acknowledge when asked to.
    fn on_message(&mut self, frame: &RadioFrame) {
        let decoded = self.codec.decode_message(frame);
        if !decoded
            || !self.codec.requires_ack(frame)
            || self.info.state != DeviceState::Active
        {
            return;
        }

        let map = self.info.network_map;
        for index in 0..self.info.virtual_devices as usize {
            let device_id = self.info.virtual_device_id(index);
            if let Some(start_us) = self.codec.ack_transmission_slot(&map, device_id) {
                let ack = self.codec.encode_ack_param_message(&map, device_id);
                self.schedule_transmit(start_us, ack);
            }
        }
    }

    fn ping_due(&self, now: u32) -> bool {
        let elapsed = now.wrapping_sub(self.info.ping_time_us);
        u64::from(elapsed) >= self.config.ping_period.as_micros()
    }

    //==================================================================================Outbound actions
    fn schedule_transmit(&self, start_us: u32, frame: RadioFrame) {
        if !self
            .scheduler
            .schedule(FrameAction::Transmit, start_us, frame)
        {
            #[cfg(feature = "defmt")]
            defmt::warn!("Transmit at {=u32} dropped by scheduler", start_us);
        }
    }

    /// Contention-slot frame. Skipped when it exceeds the slot's budget.
    fn schedule_async(&self, map: &NetworkMap, frame: RadioFrame) -> bool {
        let slot = self.codec.async_transmission_slot(map);
        if frame.len > slot.payload_budget {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "Async frame of {=usize} bytes exceeds budget {=usize}",
                frame.len,
                slot.payload_budget
            );
            return false;
        }
        self.schedule_transmit(slot.start_us, frame);
        true
    }

    fn schedule_control(&self, action: FrameAction, start_us: u32) {
        self.scheduler
            .schedule(action, start_us, RadioFrame::control(action, start_us));
    }

    //==================================================================================Housekeeping
    /// Periodic housekeeping from the main loop: age out in-range entries and
    /// detect loss of the network.
    pub fn yield_now(&mut self) {
        let now = self.clock.now_us();
        self.prune(now);
        self.age_ping_time(now);

        if self.info.state == DeviceState::Active {
            let silent = now.wrapping_sub(self.info.last_master_comm_us);
            if u64::from(silent) > self.config.network_lost_timeout.as_micros() {
                #[cfg(feature = "defmt")]
                defmt::warn!("Network {=u32} lost", self.info.network_id);
                self.lose_network();
            }
        }
    }

    /// Keep the last ping at most one period old, so a ping that stays
    /// overdue never looks recent again once the clock wraps.
    fn age_ping_time(&mut self, now: u32) {
        if self.ping_due(now) {
            let period = self.config.ping_period.as_micros().min(u64::from(u32::MAX)) as u32;
            self.info.ping_time_us = now.wrapping_sub(period);
        }
    }

    fn lose_network(&mut self) {
        self.info.state = DeviceState::SearchingNetwork;
        self.info.devices_in_range.clear();
    }

    fn prune(&mut self, now: u32) {
        self.info
            .devices_in_range
            .prune(now, self.config.device_timeout);
        self.info
            .networks_in_range
            .prune(now, self.config.network_timeout);
    }

    //==================================================================================Runner
    /// Task-context loop: process inbound frames as they arrive and run the
    /// housekeeping pass at least every [`HOUSEKEEPING_PERIOD_MS`]. Never returns.
    pub async fn drive<T: DelayTimer, const Q: usize>(
        &mut self,
        queue: &MessageQueue<Q>,
        timer: &mut T,
    ) {
        loop {
            let inbound = {
                let receive = queue.receive();
                let tick = timer.delay_ms(HOUSEKEEPING_PERIOD_MS);
                pin_mut!(receive);
                pin_mut!(tick);
                match select(receive, tick).await {
                    Either::Left((frame, _)) => Some(frame),
                    Either::Right(_) => None,
                }
            };

            if let Some(frame) = inbound {
                self.process_message(&frame);
            }
            self.yield_now();
        }
    }
}
