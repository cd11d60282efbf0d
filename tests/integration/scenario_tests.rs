//! End-to-end switching scenarios: request → intake → edge scheduler →
//! dispatcher, with the timeout monitor and step-down in the loop.

use crate::mock_hw::{Bench, HALF_CYCLE_MS, engine_with};

use zcrelay::app::events::RelayEvent;
use zcrelay::app::service::RelayService;
use zcrelay::relay::actuator::{LogicLevel, RelayAction, RelayDefinition, RelayState};

const R1_HIGH: i32 = 10;
const R1_LOW: i32 = 11;
const R2_HIGH: i32 = 12;
const R2_LOW: i32 = 13;

fn two_relays() -> [RelayDefinition; 2] {
    [
        RelayDefinition::dual(1, R1_HIGH, R1_LOW, LogicLevel::ActiveHigh).with_max_high_ms(100),
        RelayDefinition::dual(2, R2_HIGH, R2_LOW, LogicLevel::ActiveHigh).with_max_high_ms(100),
    ]
}

// ── Scenario A: high, then automatic step-down on a later edge ──

#[test]
fn high_current_steps_down_after_timeout_on_an_edge() {
    let engine = engine_with(&two_relays());
    let mut svc = RelayService::new(&engine);
    let mut b = Bench::new();
    b.start(&mut svc);

    svc.request(1, RelayAction::TurnOnHigh, &mut b.sink).unwrap();
    b.poll(&mut svc);
    assert!(b.hw.zc_enabled, "request to an idle queue arms the edge source");

    let report = b.half_cycle(&mut svc).expect("edge delivered");
    assert_eq!(report.executed.map(|x| x.id), Some(1));
    assert_eq!(engine.state_of(1), Some(RelayState::OnHigh));
    assert!(b.hw.level(R1_HIGH));
    let on_high_at = b.now_ms;

    // Queue drained after the one action.
    assert!(report.drained);
    assert!(!b.hw.zc_enabled);

    let cycles = b.run_until(&mut svc, 30, |_| engine.state_of(1) == Some(RelayState::OnLow));
    assert!(cycles < 30, "step-down never happened");
    assert!(b.now_ms >= on_high_at + 100);
    assert!(b.now_ms <= on_high_at + 100 + 2 * HALF_CYCLE_MS);

    assert!(b.hw.level(R1_LOW));
    assert!(!b.hw.level(R1_HIGH));
    assert_eq!(engine.stats().step_downs, 1);
    assert_eq!(
        b.sink.for_relay(1),
        vec![
            RelayEvent::StateChanged {
                id: 1,
                state: RelayState::OnHigh
            },
            RelayEvent::StateChanged {
                id: 1,
                state: RelayState::OnLow
            },
        ]
    );
}

#[test]
fn step_down_is_queued_by_the_timer_but_applied_by_an_edge() {
    let engine = engine_with(&two_relays());
    let mut svc = RelayService::new(&engine);
    let mut b = Bench::new();
    b.start(&mut svc);

    svc.request(1, RelayAction::TurnOnHigh, &mut b.sink).unwrap();
    b.poll(&mut svc);
    b.half_cycle(&mut svc);
    let on_high_at = b.now_ms;

    // Timer alone, no edges: the state must not move.
    let tick = engine.on_timer_tick(&mut b.hw, on_high_at + 100);
    assert_eq!(tick.step_downs, 1);
    assert_eq!(engine.state_of(1), Some(RelayState::OnHigh));

    b.now_ms = on_high_at + 100;
    b.poll(&mut svc);
    assert!(b.hw.zc_enabled);
    assert_eq!(engine.state_of(1), Some(RelayState::OnHigh));

    b.now_ms += HALF_CYCLE_MS;
    b.edge(&engine);
    assert_eq!(engine.state_of(1), Some(RelayState::OnLow));
}

// ── Scenario B: simultaneous requests are staggered ───────────

#[test]
fn simultaneous_requests_switch_on_consecutive_edges() {
    let engine = engine_with(&two_relays());
    let mut svc = RelayService::new(&engine);
    let mut b = Bench::new();
    b.start(&mut svc);

    svc.request(1, RelayAction::TurnOnHigh, &mut b.sink).unwrap();
    svc.request(2, RelayAction::TurnOnHigh, &mut b.sink).unwrap();
    b.poll(&mut svc);

    let n = b.half_cycle(&mut svc).unwrap();
    assert_eq!(n.executed.map(|x| x.id), Some(1));
    assert_eq!(n.next, Some(2));
    assert_eq!(engine.state_of(1), Some(RelayState::OnHigh));
    assert_eq!(engine.state_of(2), Some(RelayState::Off));

    let n1 = b.half_cycle(&mut svc).unwrap();
    assert_eq!(n1.executed.map(|x| x.id), Some(2));
    assert!(n1.drained);
    assert_eq!(engine.state_of(2), Some(RelayState::OnHigh));
    assert_eq!(b.sink.events.len(), 2);
}

// ── Scenario C: overwrite before any edge ─────────────────────

#[test]
fn overwrite_before_service_yields_one_notification() {
    let engine = engine_with(&two_relays());
    let mut svc = RelayService::new(&engine);
    let mut b = Bench::new();
    b.start(&mut svc);

    svc.request(1, RelayAction::TurnOnHigh, &mut b.sink).unwrap();
    svc.request(1, RelayAction::TurnOff, &mut b.sink).unwrap();
    b.poll(&mut svc);
    b.half_cycle(&mut svc);
    b.run_until(&mut svc, 20, |_| false);

    assert_eq!(engine.state_of(1), Some(RelayState::Off));
    assert!(!b.hw.level(R1_HIGH));
    assert_eq!(
        b.sink.events,
        vec![RelayEvent::StateChanged {
            id: 1,
            state: RelayState::Off
        }]
    );
    assert_eq!(engine.stats().actions, 1);
}

#[test]
fn explicit_request_before_timeout_cancels_step_down() {
    let engine = engine_with(&two_relays());
    let mut svc = RelayService::new(&engine);
    let mut b = Bench::new();
    b.start(&mut svc);

    svc.request(1, RelayAction::TurnOnHigh, &mut b.sink).unwrap();
    b.poll(&mut svc);
    b.half_cycle(&mut svc);

    svc.request(1, RelayAction::TurnOff, &mut b.sink).unwrap();
    b.poll(&mut svc);
    b.half_cycle(&mut svc);
    assert_eq!(engine.state_of(1), Some(RelayState::Off));

    b.run_until(&mut svc, 20, |_| false);
    assert_eq!(engine.state_of(1), Some(RelayState::Off));
    assert_eq!(engine.stats().step_downs, 0);
    assert!(!engine.high_timeout_armed(1));
}

#[test]
fn timeout_waits_for_a_busy_slot() {
    let engine = engine_with(&two_relays());
    let mut svc = RelayService::new(&engine);
    let mut b = Bench::new();
    b.start(&mut svc);

    svc.request(1, RelayAction::TurnOnHigh, &mut b.sink).unwrap();
    b.poll(&mut svc);
    b.half_cycle(&mut svc);
    let on_high_at = b.now_ms;

    // Request lands just before expiry and is still pending at the tick.
    svc.request(1, RelayAction::TurnOff, &mut b.sink).unwrap();
    let tick = engine.on_timer_tick(&mut b.hw, on_high_at + 100);
    assert_eq!(tick.step_downs, 0);
    assert!(engine.high_timeout_armed(1), "busy slot keeps the timeout armed");

    b.now_ms = on_high_at + 100;
    b.poll(&mut svc);
    b.half_cycle(&mut svc);
    assert_eq!(engine.state_of(1), Some(RelayState::Off));

    // Next tick sees the relay is no longer on high and gives up.
    engine.on_timer_tick(&mut b.hw, b.now_ms);
    assert!(!engine.high_timeout_armed(1));
    assert_eq!(engine.stats().step_downs, 0);
}

#[test]
fn single_level_relay_never_steps_down() {
    let engine = engine_with(&[RelayDefinition::single(7, 20, LogicLevel::ActiveLow)
        .with_max_high_ms(50)]);
    let mut svc = RelayService::new(&engine);
    let mut b = Bench::new();
    b.start(&mut svc);

    svc.request(7, RelayAction::TurnOnHigh, &mut b.sink).unwrap();
    b.poll(&mut svc);
    b.half_cycle(&mut svc);
    assert_eq!(engine.state_of(7), Some(RelayState::OnHigh));
    // Active-low: energised output reads low.
    assert_eq!(b.hw.levels.get(&20), Some(&false));

    b.run_until(&mut svc, 20, |_| false);
    assert_eq!(engine.state_of(7), Some(RelayState::OnHigh));
    assert!(!engine.high_timeout_armed(7));
}

// ── Scan order: a re-queued relay waits its turn ──────────────

#[test]
fn requeued_relay_is_served_after_the_rest_of_the_batch() {
    let engine = engine_with(&[
        RelayDefinition::dual(1, R1_HIGH, R1_LOW, LogicLevel::ActiveHigh),
        RelayDefinition::dual(2, R2_HIGH, R2_LOW, LogicLevel::ActiveHigh),
        RelayDefinition::single(3, 14, LogicLevel::ActiveHigh),
    ]);
    let mut svc = RelayService::new(&engine);
    let mut b = Bench::new();
    b.start(&mut svc);

    for id in 1..=3 {
        svc.request(id, RelayAction::TurnOnHigh, &mut b.sink).unwrap();
    }
    b.poll(&mut svc);

    let mut order = Vec::new();
    let first = b.half_cycle(&mut svc).unwrap();
    order.extend(first.executed.map(|x| (x.id, x.action)));

    // Relay 1 is asked to switch off while 2 and 3 are still waiting.
    svc.request(1, RelayAction::TurnOff, &mut b.sink).unwrap();
    b.poll(&mut svc);

    while let Some(report) = b.half_cycle(&mut svc) {
        order.extend(report.executed.map(|x| (x.id, x.action)));
    }

    assert_eq!(
        order,
        vec![
            (1, RelayAction::TurnOnHigh),
            (2, RelayAction::TurnOnHigh),
            (3, RelayAction::TurnOnHigh),
            (1, RelayAction::TurnOff),
        ]
    );
    assert_eq!(engine.state_of(1), Some(RelayState::Off));
    assert_eq!(engine.stats().edges, 4);
}
