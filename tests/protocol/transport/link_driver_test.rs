//! Link driver tests: initialization, frame assembly, header rejection,
//! transmit sequencing, and power modes against a simulated transceiver.
mod helpers {
    include!("../../helpers/mod.rs");
}

use helpers::{raw_frame, MockTransceiver};
use marinelink::{
    error::LinkError,
    protocol::transport::{
        link_driver::{LinkState, RadioLinkDriver},
        message_queue::MessageQueue,
        preamble_duration_us,
        radio_frame::{FrameAction, RadioFrame, HEADER_LENGTH},
        registers::*,
        DEFAULT_PREAMBLE_BYTES, HEADER_DURATION_US,
    },
};

fn start<'q, const Q: usize>(
    radio: &MockTransceiver,
    queue: &'q MessageQueue<Q>,
) -> RadioLinkDriver<'q, MockTransceiver, Q> {
    RadioLinkDriver::init(radio.clone(), LinkConfig::default(), queue)
        .expect("init must succeed on a present transceiver")
}

//==================================================================================Initialization
#[test]
/// Init resets the chip, programs the modem and leaves it listening.
fn test_init_configures_and_listens() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let driver = start(&radio, &queue);

    assert_eq!(radio.resets(), 1);
    assert_eq!(radio.register(REG_SYNC_VALUE1), 0x2D);
    assert_eq!(radio.register(REG_PREAMBLE_LSB), DEFAULT_PREAMBLE_BYTES as u8);
    let frf = FrequencyBand::Eu868.frf();
    assert_eq!(radio.register(REG_FRF_MSB), (frf >> 16) as u8);
    assert_eq!(radio.register(REG_FRF_LSB), frf as u8);
    assert_eq!(radio.register(REG_FIFO_THRESH), fifo_threshold_for(HEADER_LENGTH));
    assert!(radio.is_in(RadioMode::Rx));
    assert_eq!(driver.state(), LinkState::AwaitingHeader);
}

#[test]
/// A wrong version register aborts init before the chip is touched.
fn test_init_fails_without_transceiver() {
    let radio = MockTransceiver::with_version(0x00);
    let queue: MessageQueue<4> = MessageQueue::new();

    let result = RadioLinkDriver::init(radio.clone(), LinkConfig::default(), &queue);

    assert!(matches!(
        result,
        Err(LinkError::TransceiverNotFound { version: 0x00 })
    ));
    assert_eq!(radio.resets(), 0);
    assert!(radio.op_modes().is_empty());
}

#[test]
/// A chip that never confirms standby is reported, not waited on forever.
fn test_init_mode_timeout() {
    let radio = MockTransceiver::new();
    radio.set_mode_ready_stuck(true);
    let queue: MessageQueue<4> = MessageQueue::new();

    let result = RadioLinkDriver::init(radio.clone(), LinkConfig::default(), &queue);

    assert!(matches!(
        result,
        Err(LinkError::ModeTimeout {
            mode: RadioMode::Standby
        })
    ));
}

//==================================================================================Receive path
#[test]
/// A header-only frame is complete on the first interrupt and back-dated.
fn test_header_only_frame() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);
    radio.set_register(REG_RSSI_VALUE, 120);

    let bytes = raw_frame(HEADER_LENGTH, 0x11);
    radio.inject(&bytes);
    driver.on_interrupt(10_000).unwrap();

    let frame = queue.pop().expect("frame delivered");
    assert_eq!(frame.bytes(), bytes.as_slice());
    assert_eq!(frame.action, FrameAction::Receive);
    assert_eq!(frame.rssi, -60);
    assert_eq!(
        frame.start_time_us,
        10_000 - preamble_duration_us(DEFAULT_PREAMBLE_BYTES) - HEADER_DURATION_US
    );
    assert_eq!(driver.state(), LinkState::AwaitingHeader);
    assert_eq!(driver.stats().frames_received, 1);
}

#[test]
/// Back-dating wraps with the device clock.
fn test_start_time_wraps() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    radio.inject(&raw_frame(HEADER_LENGTH, 0));
    driver.on_interrupt(100).unwrap();

    let frame = queue.pop().expect("frame delivered");
    let back = preamble_duration_us(DEFAULT_PREAMBLE_BYTES) + HEADER_DURATION_US;
    assert_eq!(frame.start_time_us, 100u32.wrapping_sub(back));
}

#[test]
/// A payload drained over several interrupts yields exactly the declared bytes.
fn test_payload_over_several_interrupts() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    let mut bytes = raw_frame(30, 0);
    for (i, byte) in bytes.iter_mut().enumerate().skip(2) {
        *byte = i as u8;
    }

    radio.inject(&bytes[..13]);
    driver.on_interrupt(1_000).unwrap();
    assert_eq!(driver.state(), LinkState::AwaitingPayload);
    assert_eq!(radio.register(REG_FIFO_THRESH), fifo_threshold_for(22));

    driver.on_interrupt(1_100).unwrap();
    assert_eq!(driver.state(), LinkState::AwaitingPayload);
    assert_eq!(radio.register(REG_FIFO_THRESH), fifo_threshold_for(17));
    assert!(queue.is_empty());

    radio.inject(&bytes[13..]);
    driver.on_interrupt(2_000).unwrap();

    let frame = queue.pop().expect("frame delivered");
    assert_eq!(frame.len, 30);
    assert_eq!(frame.bytes(), bytes.as_slice());
    assert_eq!(driver.state(), LinkState::AwaitingHeader);
}

#[test]
/// Mismatched or out-of-range length fields drop the frame and restart RX.
fn test_invalid_headers_rejected() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    let mut mismatched = raw_frame(20, 0);
    mismatched[1] = mismatched[0] + 1;
    let too_long = [62u8, 62, 0, 0, 0, 0, 0, 0];
    let too_short = [5u8, 5, 0, 0, 0, 0, 0, 0];

    for (i, header) in [&mismatched[..], &too_long[..], &too_short[..]].iter().enumerate() {
        radio.inject(header);
        driver.on_interrupt(5_000).unwrap();

        assert!(queue.is_empty());
        assert_eq!(driver.state(), LinkState::AwaitingHeader);
        assert_eq!(radio.rx_fifo_len(), 0, "residual bytes flushed");
        assert_eq!(radio.rx_restarts(), i + 1);
    }
    assert_eq!(driver.stats().header_rejects, 3);
}

#[test]
/// The longest valid frame is one byte short of the maximum.
fn test_longest_valid_frame() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    radio.inject(&raw_frame(63, 0x42));
    driver.on_interrupt(0).unwrap();
    driver.on_interrupt(0).unwrap();

    assert_eq!(queue.pop().map(|f| f.len), Some(63));
}

#[test]
/// An interrupt before a full header is available changes nothing.
fn test_spurious_interrupt_ignored() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    radio.inject(&[6, 6, 1]);
    driver.on_interrupt(0).unwrap();

    assert_eq!(radio.rx_fifo_len(), 3);
    assert_eq!(driver.state(), LinkState::AwaitingHeader);
}

#[test]
/// A FIFO overrun clears the flag, drops the frame and restarts reception.
fn test_overrun_recovers() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    radio.inject(&raw_frame(20, 0)[..12]);
    driver.on_interrupt(0).unwrap();
    assert_eq!(driver.state(), LinkState::AwaitingPayload);

    radio.set_overrun();
    driver.on_interrupt(0).unwrap();

    assert_eq!(driver.stats().overruns, 1);
    assert!(!radio.state.lock().unwrap().overrun, "flag cleared by write-back");
    assert_eq!(radio.rx_fifo_len(), 0);
    assert_eq!(driver.state(), LinkState::AwaitingHeader);
    assert!(queue.is_empty());
}

#[test]
/// A full inbound queue drops the newest frame and counts it.
fn test_full_queue_drops_frame() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<1> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    radio.inject(&raw_frame(HEADER_LENGTH, 1));
    driver.on_interrupt(0).unwrap();
    radio.inject(&raw_frame(HEADER_LENGTH, 2));
    driver.on_interrupt(0).unwrap();

    assert_eq!(driver.stats().frames_received, 1);
    assert_eq!(driver.stats().queue_drops, 1);
    assert_eq!(queue.pop().map(|f| f.data[2]), Some(1));
}

//==================================================================================Transmit path
#[test]
/// Transmit goes through standby, synthesizer and transmitter, then returns
/// to receive on PacketSent.
fn test_transmit_sequence() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    let payload = raw_frame(12, 0xAB);
    driver.transmit(&RadioFrame::transmit(&payload).unwrap()).unwrap();

    let modes = radio.op_modes();
    assert_eq!(
        modes[modes.len() - 3..],
        [
            RadioMode::Standby.entry().op_mode,
            RadioMode::FsTx.entry().op_mode,
            RadioMode::Tx.entry().op_mode,
        ]
    );
    assert_eq!(radio.sent(), vec![payload.clone()]);
    assert_eq!(radio.register(REG_PAYLOAD_LENGTH), 12);
    assert_eq!(driver.state(), LinkState::Transmitting);

    driver.on_interrupt(0).unwrap();
    assert_eq!(driver.state(), LinkState::AwaitingHeader);
    assert!(radio.is_in(RadioMode::Rx));
    assert_eq!(radio.register(REG_PAYLOAD_LENGTH), 64);
    assert_eq!(driver.stats().transmissions, 1);
}

#[test]
/// A second transmit before the completion interrupt polls PacketSent first.
fn test_back_to_back_transmit() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    driver.transmit(&RadioFrame::transmit(&raw_frame(10, 1)).unwrap()).unwrap();
    driver.transmit(&RadioFrame::transmit(&raw_frame(10, 2)).unwrap()).unwrap();

    assert_eq!(radio.sent().len(), 2);
    assert_eq!(driver.stats().transmissions, 2);
}

#[test]
/// Frames longer than the FIFO are refused.
fn test_transmit_too_long() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    let mut frame = RadioFrame::transmit(&[0; 8]).unwrap();
    frame.len = 70;

    assert!(matches!(
        driver.transmit(&frame),
        Err(LinkError::FrameTooLong { len: 70 })
    ));
    assert!(radio.sent().is_empty());
}

//==================================================================================Power modes
#[test]
/// Low power from idle listening sleeps immediately; exit resumes reception.
fn test_low_power_round_trip() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    driver
        .execute(&RadioFrame::control(FrameAction::EnterLowPower, 0))
        .unwrap();
    assert_eq!(driver.state(), LinkState::LowPower);
    assert!(radio.is_in(RadioMode::Sleep));

    // Radio interrupts are ignored while asleep.
    radio.inject(&raw_frame(HEADER_LENGTH, 0));
    driver.on_interrupt(0).unwrap();
    assert!(queue.is_empty());

    driver
        .execute(&RadioFrame::control(FrameAction::ExitLowPower, 0))
        .unwrap();
    assert_eq!(driver.state(), LinkState::AwaitingHeader);
    assert!(radio.is_in(RadioMode::Rx));
}

#[test]
/// A low-power request during payload assembly waits for the frame to finish.
fn test_low_power_deferred_during_receive() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    let bytes = raw_frame(20, 0x33);
    radio.inject(&bytes[..10]);
    driver.on_interrupt(0).unwrap();

    driver.enter_low_power().unwrap();
    assert_eq!(driver.state(), LinkState::AwaitingPayload);
    assert!(radio.is_in(RadioMode::Rx));

    radio.inject(&bytes[10..]);
    driver.on_interrupt(0).unwrap();

    assert_eq!(queue.pop().map(|f| f.len), Some(20));
    assert_eq!(driver.state(), LinkState::LowPower);
    assert!(radio.is_in(RadioMode::Sleep));
}

#[test]
/// Sleep is confirmed by a fixed delay, not ModeReady.
fn test_sleep_does_not_wait_for_mode_ready() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    radio.set_mode_ready_stuck(true);
    assert!(driver.enter_low_power().is_ok());
    assert!(matches!(
        driver.exit_low_power(),
        Err(LinkError::ModeTimeout {
            mode: RadioMode::Standby
        })
    ));
}

//==================================================================================Configuration
#[test]
/// Band switch reprograms carrier and bandwidth and resumes listening.
fn test_switch_band() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    driver.set_frequency_band(FrequencyBand::Us915).unwrap();

    let frf = FrequencyBand::Us915.frf();
    assert_eq!(frf, 0xE4C000);
    assert_eq!(radio.register(REG_FRF_MSB), 0xE4);
    assert_eq!(radio.register(REG_FRF_MID), 0xC0);
    assert_eq!(radio.register(REG_FRF_LSB), 0x00);
    assert_eq!(radio.register(REG_RX_BW), 0x01);
    assert_eq!(driver.config().band, FrequencyBand::Us915);
    assert_eq!(driver.state(), LinkState::AwaitingHeader);
}

#[test]
fn test_read_rssi() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = start(&radio, &queue);

    radio.set_register(REG_RSSI_VALUE, 0x50);
    assert_eq!(driver.read_rssi().unwrap(), -40);
}
