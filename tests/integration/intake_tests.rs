//! Command intake over the bus boundary: decoding, validation, sync-delay
//! changes, and the message bus adapters.

use crate::mock_hw::{Bench, engine_with, engine_with_params};

use zcrelay::adapters::bus::MessageBus;
use zcrelay::app::commands::{RelayCommand, TOPIC_RELAY_CMD, TOPIC_RELAY_STAT, TOPIC_SYNC_CMD};
use zcrelay::app::events::{RelayEvent, StatusMsg};
use zcrelay::app::service::RelayService;
use zcrelay::error::RequestError;
use zcrelay::relay::EngineParams;
use zcrelay::relay::actuator::{LogicLevel, RelayAction, RelayDefinition, RelayState};
use zcrelay::relay::slots::SlotStatus;

fn payload(cmd: RelayCommand) -> Vec<u8> {
    let mut buf = [0u8; 16];
    cmd.encode(&mut buf).unwrap().to_vec()
}

fn relays() -> [RelayDefinition; 2] {
    [
        RelayDefinition::dual(1, 10, 11, LogicLevel::ActiveHigh),
        RelayDefinition::single(2, 12, LogicLevel::ActiveHigh),
    ]
}

#[test]
fn bus_switch_command_reaches_the_relay() {
    let engine = engine_with(&relays());
    let mut svc = RelayService::new(&engine);
    let mut b = Bench::new();
    b.start(&mut svc);

    let bytes = payload(RelayCommand::Switch {
        id: 2,
        action: RelayAction::TurnOnHigh,
    });
    svc.handle_message(TOPIC_RELAY_CMD, &bytes, &mut b.sink).unwrap();
    b.poll(&mut svc);
    b.half_cycle(&mut svc);

    assert_eq!(engine.state_of(2), Some(RelayState::OnHigh));
    assert_eq!(svc.stats().accepted, 1);
}

#[test]
fn invalid_requests_never_touch_the_queue() {
    let engine = engine_with(&relays());
    let mut svc = RelayService::new(&engine);
    let mut b = Bench::new();

    let unknown = payload(RelayCommand::Switch {
        id: 99,
        action: RelayAction::TurnOff,
    });
    assert_eq!(
        svc.handle_message(TOPIC_RELAY_CMD, &unknown, &mut b.sink),
        Err(RequestError::UnknownActuator(99))
    );

    let low_on_single = payload(RelayCommand::Switch {
        id: 2,
        action: RelayAction::TurnOnLow,
    });
    assert_eq!(
        svc.handle_message(TOPIC_RELAY_CMD, &low_on_single, &mut b.sink),
        Err(RequestError::UnsupportedAction {
            id: 2,
            action: RelayAction::TurnOnLow
        })
    );

    assert_eq!(
        svc.handle_message("relay/other/cmd", &[1, 0], &mut b.sink),
        Err(RequestError::MalformedRequest)
    );
    assert_eq!(
        svc.handle_message(TOPIC_RELAY_CMD, &[], &mut b.sink),
        Err(RequestError::MalformedRequest)
    );

    assert_eq!(svc.stats().rejected, 4);
    assert_eq!(engine.slot_status(1), Some(SlotStatus::Idle));
    assert_eq!(engine.slot_status(2), Some(SlotStatus::Idle));
    assert_eq!(b.poll(&mut svc), 0);
    assert!(!b.hw.zc_enabled);
}

#[test]
fn sync_delay_applies_from_the_next_batch() {
    let engine = engine_with(&relays());
    let mut svc = RelayService::new(&engine);
    let mut b = Bench::new();
    b.start(&mut svc);

    svc.request(1, RelayAction::TurnOnHigh, &mut b.sink).unwrap();
    svc.request(2, RelayAction::TurnOnHigh, &mut b.sink).unwrap();
    b.poll(&mut svc);

    // Batch in flight: the change is recorded but not latched.
    let bytes = payload(RelayCommand::SetSyncDelay { delay_us: 1_500 });
    svc.handle_message(TOPIC_SYNC_CMD, &bytes, &mut b.sink).unwrap();
    b.poll(&mut svc);
    assert_eq!(engine.active_sync_delay_us(), 0);
    assert_eq!(engine.requested_sync_delay_us(), Some(1_500));

    b.half_cycle(&mut svc);
    b.half_cycle(&mut svc);
    assert!(b.hw.delays_us.is_empty(), "zero delay is not waited");
    assert_eq!(engine.active_sync_delay_us(), 1_500);

    svc.request(1, RelayAction::TurnOff, &mut b.sink).unwrap();
    b.poll(&mut svc);
    b.half_cycle(&mut svc);
    assert_eq!(b.hw.delays_us, vec![1_500]);
}

#[test]
fn sync_delay_above_ceiling_is_rejected() {
    let params = EngineParams {
        max_sync_delay_us: 2_000,
        ..EngineParams::default()
    };
    let engine = engine_with_params(&relays(), params);
    let mut svc = RelayService::new(&engine);
    assert_eq!(
        svc.set_sync_delay(2_001),
        Err(RequestError::SyncDelayOutOfRange(2_001))
    );
    assert_eq!(svc.set_sync_delay(2_000), Ok(()));
}

#[test]
fn status_goes_out_on_the_bus() {
    let bus = MessageBus::new();
    let engine = engine_with(&relays());
    let mut svc = RelayService::new(&engine);
    let mut b = Bench::new();
    let mut sink = bus.status_sink();
    svc.start(&mut b.hw);

    bus.deliver(
        TOPIC_RELAY_CMD,
        &payload(RelayCommand::Switch {
            id: 1,
            action: RelayAction::TurnOnHigh,
        }),
    )
    .unwrap();

    while let Some(msg) = bus.next_inbound() {
        svc.handle_message(&msg.topic, &msg.payload, &mut sink).unwrap();
    }
    svc.poll(b.now_ms, &mut b.hw, &mut sink);
    b.now_ms += 10;
    b.edge(&engine);
    svc.poll(b.now_ms, &mut b.hw, &mut sink);

    let out = bus.next_outbound().expect("status published");
    assert_eq!(out.topic.as_str(), TOPIC_RELAY_STAT);
    assert_eq!(
        StatusMsg::decode(&out.payload),
        Some(
            RelayEvent::StateChanged {
                id: 1,
                state: RelayState::OnHigh
            }
            .to_status()
        )
    );
}
