//! Scheduler and link driver wired together the way the interrupt handlers do:
//! the timer fire hands scheduled actions to the driver, which puts them on air
//! or changes power mode.
mod helpers {
    include!("../../helpers/mod.rs");
}

use helpers::{raw_frame, MockClock, MockOneShotTimer, MockTransceiver};
use marinelink::infra::hal::embassy_clock::EmbassyClock;
use marinelink::protocol::transport::{
    link_driver::{handle::SharedLink, LinkState, RadioLinkDriver},
    message_queue::MessageQueue,
    radio_frame::{FrameAction, RadioFrame, HEADER_LENGTH},
    registers::{LinkConfig, RadioMode},
    scheduler::{TransmitScheduler, SCHEDULER_SLOTS},
    traits::{action_scheduler::ActionScheduler, clock::MicrosClock},
    TX_LATENCY_COMPENSATION_US,
};
use static_cell::StaticCell;

#[test]
/// A scheduled transmit goes on air when its timer fires.
fn test_scheduled_transmit_reaches_air() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = RadioLinkDriver::init(radio.clone(), LinkConfig::default(), &queue).unwrap();

    let clock = MockClock::at(1_000_000);
    let timer = MockOneShotTimer::default();
    let scheduler: TransmitScheduler<_, _> = TransmitScheduler::new(timer.clone(), clock.clone());

    let payload = raw_frame(16, 0x5C);
    assert!(scheduler.schedule(
        FrameAction::Transmit,
        1_050_000,
        RadioFrame::transmit(&payload).unwrap()
    ));
    assert_eq!(timer.armed(), Some(50_000 - TX_LATENCY_COMPENSATION_US));

    clock.advance(50_000 - TX_LATENCY_COMPENSATION_US);
    scheduler.on_timer_fire(|action| driver.execute(&action.frame).unwrap());

    assert_eq!(radio.sent(), vec![payload]);
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(scheduler.armed_deadline(), None);
}

#[test]
/// A full cycle: transmit in the slot, sleep after traffic, wake before the
/// next beacon, each fired in deadline order regardless of enqueue order.
fn test_cycle_of_power_actions() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = RadioLinkDriver::init(radio.clone(), LinkConfig::default(), &queue).unwrap();

    let clock = MockClock::at(0);
    let timer = MockOneShotTimer::default();
    let scheduler: TransmitScheduler<_, _, SCHEDULER_SLOTS> =
        TransmitScheduler::new(timer.clone(), clock.clone());

    scheduler.schedule(
        FrameAction::ExitLowPower,
        99_000,
        RadioFrame::control(FrameAction::ExitLowPower, 99_000),
    );
    scheduler.schedule(
        FrameAction::EnterLowPower,
        50_000,
        RadioFrame::control(FrameAction::EnterLowPower, 50_000),
    );
    scheduler.schedule(
        FrameAction::Transmit,
        20_000,
        RadioFrame::transmit(&raw_frame(10, 1)).unwrap(),
    );

    let mut fired = Vec::new();
    let mut fire = |clock_at: u32, driver: &mut RadioLinkDriver<'_, MockTransceiver, 4>| {
        clock.set(clock_at);
        scheduler.on_timer_fire(|action| {
            fired.push(action.action);
            driver.execute(&action.frame).unwrap();
        });
    };

    fire(20_000, &mut driver);
    assert_eq!(driver.state(), LinkState::Transmitting);
    // PacketSent interrupt.
    driver.on_interrupt(20_500).unwrap();
    assert_eq!(driver.state(), LinkState::AwaitingHeader);

    fire(50_000, &mut driver);
    assert_eq!(driver.state(), LinkState::LowPower);
    assert!(radio.is_in(RadioMode::Sleep));

    fire(99_000, &mut driver);
    assert_eq!(driver.state(), LinkState::AwaitingHeader);
    assert!(radio.is_in(RadioMode::Rx));

    assert_eq!(
        fired,
        [
            FrameAction::Transmit,
            FrameAction::EnterLowPower,
            FrameAction::ExitLowPower
        ]
    );
    assert_eq!(radio.sent().len(), 1);
}

#[test]
/// A data frame and the end-of-cycle sleep 50 µs apart both reach the driver
/// when the timer expires ahead of each deadline and the handler takes time.
fn test_close_deadlines_reach_driver() {
    let radio = MockTransceiver::new();
    let queue: MessageQueue<4> = MessageQueue::new();
    let mut driver = RadioLinkDriver::init(radio.clone(), LinkConfig::default(), &queue).unwrap();

    let clock = MockClock::at(0);
    let timer = MockOneShotTimer::default();
    let scheduler: TransmitScheduler<_, _> = TransmitScheduler::new(timer.clone(), clock.clone());

    let payload = raw_frame(12, 0x42);
    scheduler.schedule(FrameAction::Transmit, 100_000, RadioFrame::transmit(&payload).unwrap());
    scheduler.schedule(
        FrameAction::EnterLowPower,
        100_050,
        RadioFrame::control(FrameAction::EnterLowPower, 100_050),
    );

    let mut fired = Vec::new();
    while let Some(deadline) = scheduler.armed_deadline() {
        clock.set(deadline - TX_LATENCY_COMPENSATION_US);
        scheduler.on_timer_fire(|action| {
            fired.push(action.action);
            driver.execute(&action.frame).unwrap();
            clock.advance(60);
        });
    }
    assert_eq!(fired, [FrameAction::Transmit, FrameAction::EnterLowPower]);
    assert_eq!(timer.arms().last(), Some(&0));

    // Sleep was latched behind the transmission and applies on PacketSent.
    assert_eq!(driver.state(), LinkState::Transmitting);
    driver.on_interrupt(clock.now_us()).unwrap();
    assert_eq!(driver.state(), LinkState::LowPower);
    assert_eq!(radio.sent(), vec![payload]);
}

#[test]
/// Actions scheduled just before the clock wraps fire before those just after.
fn test_wraparound_order_through_driver() {
    let clock = MockClock::at(u32::MAX - 2_000_000);
    let timer = MockOneShotTimer::default();
    let scheduler: TransmitScheduler<_, _, 4> = TransmitScheduler::new(timer, clock.clone());

    scheduler.schedule(FrameAction::ExitLowPower, 500_000, RadioFrame::EMPTY);
    scheduler.schedule(FrameAction::EnterLowPower, u32::MAX - 100, RadioFrame::EMPTY);

    let mut fired = Vec::new();
    clock.set(u32::MAX - 100);
    scheduler.on_timer_fire(|action| fired.push(action.start_time_us));
    clock.set(500_000);
    scheduler.on_timer_fire(|action| fired.push(action.start_time_us));

    assert_eq!(fired, [u32::MAX - 100, 500_000]);
}

#[test]
/// The embassy-backed clock arms the scheduler relative to the real time base.
fn test_scheduler_on_embassy_clock() {
    let clock = EmbassyClock;
    let timer = MockOneShotTimer::default();
    let scheduler: TransmitScheduler<_, _, 4> = TransmitScheduler::new(timer.clone(), clock);

    let before = clock.now_us();
    std::thread::sleep(std::time::Duration::from_millis(2));
    assert!(clock.now_us().wrapping_sub(before) >= 2_000);

    let deadline = clock.now_us().wrapping_add(1_000_000);
    scheduler.schedule(FrameAction::EnterLowPower, deadline, RadioFrame::EMPTY);
    let armed = timer.armed().expect("timer armed");
    assert!(armed <= 1_000_000 - TX_LATENCY_COMPENSATION_US);
    assert!(armed > 900_000);
}

//==================================================================================Interrupt trampolines
static QUEUE: MessageQueue<4> = MessageQueue::new();
static LINK: SharedLink<RadioLinkDriver<'static, MockTransceiver, 4>> = SharedLink::new();
static SCHEDULER: StaticCell<TransmitScheduler<MockOneShotTimer, MockClock>> = StaticCell::new();

/// Radio DIO interrupt vector.
fn radio_irq(clock: &MockClock) {
    let now = clock.now_us();
    LINK.with(|link| link.on_interrupt(now).ok());
}

/// Timer interrupt vector.
fn timer_irq(scheduler: &TransmitScheduler<MockOneShotTimer, MockClock>) {
    scheduler.on_timer_fire(|action| {
        LINK.with(|link| link.execute(&action.frame).ok());
    });
}

#[test]
/// Free-function vectors reach the one installed driver through the static handle.
fn test_interrupt_vectors_through_shared_link() {
    let radio = MockTransceiver::new();
    let clock = MockClock::at(10_000);
    let timer = MockOneShotTimer::default();
    let scheduler: &'static TransmitScheduler<_, _> =
        SCHEDULER.init(TransmitScheduler::new(timer, clock.clone()));

    // Vectors firing before install are harmless.
    radio_irq(&clock);
    assert!(!LINK.is_installed());

    let driver = RadioLinkDriver::init(radio.clone(), LinkConfig::default(), &QUEUE).unwrap();
    assert!(LINK.install(driver).is_none());

    radio.inject(&raw_frame(HEADER_LENGTH, 0x77));
    radio_irq(&clock);
    assert_eq!(QUEUE.pop().map(|f| f.data[2]), Some(0x77));

    let payload = raw_frame(12, 0x99);
    scheduler.schedule(FrameAction::Transmit, 30_000, RadioFrame::transmit(&payload).unwrap());
    clock.set(30_000);
    timer_irq(scheduler);
    assert_eq!(radio.sent(), vec![payload]);

    // Completion interrupt returns the link to receive.
    radio_irq(&clock);
    assert_eq!(
        LINK.with(|link| link.state()),
        Some(LinkState::AwaitingHeader)
    );

    assert!(LINK.take().is_some());
    assert!(!LINK.is_installed());
}

#[test]
/// Re-entering the handle from inside `with` is refused instead of aliasing.
fn test_shared_link_reentrancy() {
    let link: SharedLink<u32> = SharedLink::new();
    assert_eq!(link.with(|value| *value), None);

    link.install(7);
    assert_eq!(link.with(|value| *value), Some(7));
    assert_eq!(link.with(|_| link.with(|value| *value)), Some(None));

    assert_eq!(link.install(9), Some(7));
}
