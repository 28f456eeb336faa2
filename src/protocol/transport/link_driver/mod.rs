//! Interrupt-driven link-layer driver for the packet radio transceiver.
//!
//! The driver owns the register bus for the lifetime of the program. It runs
//! the receive frame-assembly state machine from the FIFO-level interrupt,
//! emits outbound frames on request from the transmit scheduler, and switches
//! the transceiver in and out of low-power mode.
//!
//! # Receive state machine
//!
//! ```text
//!                 header invalid
//!            ┌──────────────────────┐
//!            ▼                      │
//!   AwaitingHeader ──header ok──► AwaitingPayload ──len reached──► push + restart
//!            │                      │   ▲
//!            │ total == header      └───┘ more bytes expected
//!            └─────────────────────────────────────────────────► push + restart
//! ```
//!
//! Header failures never leave the driver: the frame is counted, dropped, and
//! the receiver restarted.
use crate::{
    error::LinkError,
    protocol::transport::{
        message_queue::MessageQueue,
        preamble_duration_us,
        radio_frame::{declared_length, FrameAction, RadioFrame, HEADER_LENGTH, MAX_FRAME_SIZE},
        registers::*,
        traits::register_bus::RegisterBus,
        HEADER_DURATION_US,
    },
};

pub mod handle;

//==================================================================================Enums and Structs
/// Position of the driver in its receive / transmit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Receiver armed; the next FIFO-level interrupt delivers a header.
    AwaitingHeader,
    /// Header accepted; draining payload bytes.
    AwaitingPayload,
    /// A frame is on air; waiting for PacketSent.
    Transmitting,
    /// Transceiver asleep.
    LowPower,
}

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Complete frames handed to the inbound queue.
    pub frames_received: u32,
    /// Headers rejected by length validation.
    pub header_rejects: u32,
    /// FIFO overruns detected during reception.
    pub overruns: u32,
    /// Complete frames lost because the inbound queue was full.
    pub queue_drops: u32,
    /// Frames handed to the transmitter.
    pub transmissions: u32,
}

/// Link-layer driver bound to a register bus and an inbound queue.
pub struct RadioLinkDriver<'q, B: RegisterBus, const Q: usize> {
    bus: B,
    queue: &'q MessageQueue<Q>,
    config: LinkConfig,
    state: LinkState,
    mode: RadioMode,
    /// Frame under assembly.
    frame: RadioFrame,
    /// Declared total length of the frame under assembly.
    expected_len: usize,
    /// Low-power request latched while a frame was in flight.
    low_power_pending: bool,
    preamble_us: u32,
    stats: LinkStats,
}

impl<'q, B: RegisterBus, const Q: usize> RadioLinkDriver<'q, B, Q> {
    /// Detect, reset, and configure the transceiver, then start receiving.
    ///
    /// Fails with [`LinkError::TransceiverNotFound`] when the version register
    /// does not identify the expected chip; nothing else is touched in that case.
    pub fn init(
        mut bus: B,
        config: LinkConfig,
        queue: &'q MessageQueue<Q>,
    ) -> Result<Self, LinkError<B::Error>> {
        // Step 1: make sure something answers on the bus.
        let version = bus.read_register(REG_VERSION).map_err(LinkError::Bus)?;
        if version != EXPECTED_VERSION {
            #[cfg(feature = "defmt")]
            defmt::error!("Transceiver not found, version register = {:#04X}", version);
            return Err(LinkError::TransceiverNotFound { version });
        }

        // Step 2: hardware reset, then the one-time modem configuration.
        bus.reset().map_err(LinkError::Bus)?;
        for (register, value) in modem_configuration(&config) {
            bus.write_register(register, value)
                .map_err(LinkError::Bus)?;
        }

        let mut driver = Self {
            bus,
            queue,
            config,
            state: LinkState::AwaitingHeader,
            mode: RadioMode::Standby,
            frame: RadioFrame::EMPTY,
            expected_len: 0,
            low_power_pending: false,
            preamble_us: preamble_duration_us(config.preamble_bytes),
            stats: LinkStats::default(),
        };

        // Step 3: confirm standby and arm the receiver.
        driver.set_mode(RadioMode::Standby)?;
        driver.restart_rx()?;

        #[cfg(feature = "defmt")]
        defmt::info!("Radio link initialized, band {:?}", config.band);

        Ok(driver)
    }

    /// Current state of the receive / transmit cycle.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Snapshot of the diagnostic counters.
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    //==================================================================================Interrupt entry
    /// Radio interrupt handler (FIFO level while receiving, PacketSent while
    /// transmitting). `now_us` is the device clock captured at interrupt entry.
    pub fn on_interrupt(&mut self, now_us: u32) -> Result<(), LinkError<B::Error>> {
        match self.state {
            LinkState::Transmitting => {
                let flags = self.read(REG_IRQ_FLAGS2)?;
                if flags & IRQ2_PACKET_SENT != 0 {
                    self.finish_transmit()?;
                }
                Ok(())
            }
            LinkState::LowPower => Ok(()),
            LinkState::AwaitingHeader | LinkState::AwaitingPayload => {
                let flags = self.read(REG_IRQ_FLAGS2)?;
                if flags & IRQ2_FIFO_OVERRUN != 0 {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("FIFO overrun, restarting receiver");
                    self.stats.overruns = self.stats.overruns.wrapping_add(1);
                    // Flag is cleared by writing it back.
                    self.write(REG_IRQ_FLAGS2, IRQ2_FIFO_OVERRUN)?;
                    return self.end_of_frame();
                }
                if self.state == LinkState::AwaitingHeader {
                    if flags & IRQ2_FIFO_LEVEL == 0 {
                        // Spurious edge: not enough bytes for a header yet.
                        return Ok(());
                    }
                    self.receive_header(now_us)
                } else {
                    self.receive_payload()
                }
            }
        }
    }

    /// Read the fixed-size header and decide the fate of the frame.
    fn receive_header(&mut self, now_us: u32) -> Result<(), LinkError<B::Error>> {
        let mut header = [0u8; HEADER_LENGTH];
        self.bus.read_fifo(&mut header).map_err(LinkError::Bus)?;

        // The interrupt fires once the header is in; back-date to the first preamble bit.
        let start_time_us = now_us
            .wrapping_sub(self.preamble_us)
            .wrapping_sub(HEADER_DURATION_US);

        let Some(total) = declared_length(&header) else {
            #[cfg(feature = "defmt")]
            defmt::debug!("Rejected header: {=u8}/{=u8}", header[0], header[1]);
            self.stats.header_rejects = self.stats.header_rejects.wrapping_add(1);
            return self.end_of_frame();
        };

        self.frame.data[..HEADER_LENGTH].copy_from_slice(&header);
        self.frame.len = HEADER_LENGTH;
        self.frame.start_time_us = start_time_us;
        self.frame.action = FrameAction::Receive;
        self.frame.rssi = self.read_rssi()?;
        self.expected_len = total;

        if total == HEADER_LENGTH {
            return self.complete_frame();
        }

        self.state = LinkState::AwaitingPayload;
        self.write(REG_FIFO_THRESH, fifo_threshold_for(total - HEADER_LENGTH))
    }

    /// Drain every byte currently in the FIFO into the frame under assembly.
    fn receive_payload(&mut self) -> Result<(), LinkError<B::Error>> {
        while self.frame.len < self.expected_len {
            let flags = self.read(REG_IRQ_FLAGS2)?;
            if flags & IRQ2_FIFO_EMPTY != 0 {
                break;
            }
            let byte = self.read(REG_FIFO)?;
            self.frame.data[self.frame.len] = byte;
            self.frame.len += 1;
        }

        if self.frame.len >= self.expected_len {
            self.complete_frame()
        } else {
            let remaining = self.expected_len - self.frame.len;
            self.write(REG_FIFO_THRESH, fifo_threshold_for(remaining))
        }
    }

    /// Hand the assembled frame to the queue and re-arm.
    fn complete_frame(&mut self) -> Result<(), LinkError<B::Error>> {
        let frame = core::mem::take(&mut self.frame);
        if self.queue.push(frame) {
            self.stats.frames_received = self.stats.frames_received.wrapping_add(1);
        } else {
            self.stats.queue_drops = self.stats.queue_drops.wrapping_add(1);
        }
        self.end_of_frame()
    }

    /// A frame finished (delivered or dropped): apply a latched low-power
    /// request, otherwise listen again.
    fn end_of_frame(&mut self) -> Result<(), LinkError<B::Error>> {
        if self.low_power_pending {
            self.low_power_pending = false;
            self.sleep()
        } else {
            self.restart_rx()
        }
    }

    /// Restart reception from a clean FIFO and wait for the next header.
    pub fn restart_rx(&mut self) -> Result<(), LinkError<B::Error>> {
        if self.mode == RadioMode::Rx {
            self.write(REG_RX_CONFIG, RX_CONFIG | RX_RESTART_WITHOUT_PLL_LOCK)?;
        } else {
            self.set_mode(RadioMode::Rx)?;
        }
        self.flush_fifo()?;
        self.write(REG_FIFO_THRESH, fifo_threshold_for(HEADER_LENGTH))?;
        self.frame = RadioFrame::EMPTY;
        self.expected_len = 0;
        self.state = LinkState::AwaitingHeader;
        Ok(())
    }

    fn flush_fifo(&mut self) -> Result<(), LinkError<B::Error>> {
        // Bounded by the FIFO capacity.
        for _ in 0..FIFO_SIZE {
            if self.read(REG_IRQ_FLAGS2)? & IRQ2_FIFO_EMPTY != 0 {
                break;
            }
            self.read(REG_FIFO)?;
        }
        Ok(())
    }

    //==================================================================================Transmit path
    /// Load `frame` and start transmitting immediately.
    ///
    /// Returns as soon as the transmitter is running; completion is reported
    /// by the next radio interrupt. A frame being received is abandoned.
    pub fn transmit(&mut self, frame: &RadioFrame) -> Result<(), LinkError<B::Error>> {
        if frame.len > FIFO_SIZE {
            return Err(LinkError::FrameTooLong { len: frame.len });
        }
        if self.state == LinkState::Transmitting {
            // Previous PacketSent never reached us; poll for it before reloading the FIFO.
            self.poll_packet_sent()?;
        }

        self.set_mode(RadioMode::Standby)?;
        self.flush_fifo()?;
        self.frame = RadioFrame::EMPTY;
        self.expected_len = 0;

        self.write(REG_PAYLOAD_LENGTH, frame.len as u8)?;
        self.bus.write_fifo(frame.bytes()).map_err(LinkError::Bus)?;

        // Synthesizer first, then the PA; both confirmed through ModeReady.
        self.set_mode(RadioMode::FsTx)?;
        self.set_mode(RadioMode::Tx)?;

        self.state = LinkState::Transmitting;
        self.stats.transmissions = self.stats.transmissions.wrapping_add(1);
        Ok(())
    }

    fn poll_packet_sent(&mut self) -> Result<(), LinkError<B::Error>> {
        for _ in 0..MODE_READY_POLLS {
            if self.read(REG_IRQ_FLAGS2)? & IRQ2_PACKET_SENT != 0 {
                return Ok(());
            }
            self.bus.delay_us(MODE_READY_POLL_INTERVAL_US);
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("PacketSent never raised, forcing standby");
        Ok(())
    }

    fn finish_transmit(&mut self) -> Result<(), LinkError<B::Error>> {
        self.write(REG_PAYLOAD_LENGTH, MAX_FRAME_SIZE as u8)?;
        self.end_of_frame()
    }

    //==================================================================================Power modes
    /// Put the transceiver to sleep. Deferred until the frame in flight (being
    /// received or transmitted) is finished.
    pub fn enter_low_power(&mut self) -> Result<(), LinkError<B::Error>> {
        match self.state {
            LinkState::AwaitingPayload | LinkState::Transmitting => {
                self.low_power_pending = true;
                Ok(())
            }
            LinkState::LowPower => Ok(()),
            LinkState::AwaitingHeader => self.sleep(),
        }
    }

    /// Wake the transceiver and resume reception. Cancels a latched
    /// low-power request.
    pub fn exit_low_power(&mut self) -> Result<(), LinkError<B::Error>> {
        self.low_power_pending = false;
        if self.state == LinkState::LowPower {
            self.set_mode(RadioMode::Standby)?;
            self.restart_rx()?;
        }
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), LinkError<B::Error>> {
        self.set_mode(RadioMode::Sleep)?;
        self.frame = RadioFrame::EMPTY;
        self.expected_len = 0;
        self.state = LinkState::LowPower;
        Ok(())
    }

    /// Perform the action carried by a scheduled frame.
    pub fn execute(&mut self, frame: &RadioFrame) -> Result<(), LinkError<B::Error>> {
        match frame.action {
            FrameAction::Transmit => self.transmit(frame),
            FrameAction::EnterLowPower => self.enter_low_power(),
            FrameAction::ExitLowPower => self.exit_low_power(),
            FrameAction::Receive | FrameAction::NoAction => Ok(()),
        }
    }

    //==================================================================================Configuration
    /// Retune to another regional band and resume the previous activity.
    pub fn set_frequency_band(&mut self, band: FrequencyBand) -> Result<(), LinkError<B::Error>> {
        let was_sleeping = self.state == LinkState::LowPower;
        self.set_mode(RadioMode::Standby)?;

        let frf = band.frf();
        self.write(REG_FRF_MSB, (frf >> 16) as u8)?;
        self.write(REG_FRF_MID, (frf >> 8) as u8)?;
        self.write(REG_FRF_LSB, frf as u8)?;
        self.write(REG_RX_BW, band.rx_bandwidth())?;
        self.config.band = band;

        if was_sleeping {
            self.sleep()
        } else {
            self.restart_rx()
        }
    }

    /// Current signal strength in dBm.
    pub fn read_rssi(&mut self) -> Result<i16, LinkError<B::Error>> {
        let raw = self.read(REG_RSSI_VALUE)?;
        Ok(-(raw as i16) / 2)
    }

    /// Switch operating mode and confirm it according to the mode table.
    fn set_mode(&mut self, mode: RadioMode) -> Result<(), LinkError<B::Error>> {
        let entry = mode.entry();
        self.write(REG_OP_MODE, entry.op_mode)?;
        match entry.confirmation {
            ModeConfirmation::FixedDelay(micros) => self.bus.delay_us(micros),
            ModeConfirmation::ModeReady => self.wait_mode_ready(mode)?,
        }
        self.mode = mode;
        Ok(())
    }

    fn wait_mode_ready(&mut self, mode: RadioMode) -> Result<(), LinkError<B::Error>> {
        for _ in 0..MODE_READY_POLLS {
            if self.read(REG_IRQ_FLAGS1)? & IRQ1_MODE_READY != 0 {
                return Ok(());
            }
            self.bus.delay_us(MODE_READY_POLL_INTERVAL_US);
        }
        #[cfg(feature = "defmt")]
        defmt::error!("Mode {:?} not confirmed", mode);
        Err(LinkError::ModeTimeout { mode })
    }

    fn read(&mut self, register: u8) -> Result<u8, LinkError<B::Error>> {
        self.bus.read_register(register).map_err(LinkError::Bus)
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), LinkError<B::Error>> {
        self.bus
            .write_register(register, value)
            .map_err(LinkError::Bus)
    }
}
