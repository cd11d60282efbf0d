//! Relay Controller Firmware: main entry point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  EdgeHardware        ZeroCrossInput      MessageBus            │
//! │  (Actuation+Delay)   (ZeroCrossPort)     (StatusSink, inbox)   │
//! │  LogStatusSink       MonotonicClock      TaskWatchdog          │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │   RelayEngine (static, lock-free)                      │    │
//! │  │   zero-cross ISR · esp_timer tick · RelayService task  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::{info, warn};

use zcrelay::adapters::bus::MessageBus;
use zcrelay::adapters::log_sink::{LogStatusSink, TeeSink};
use zcrelay::adapters::time::MonotonicClock;
use zcrelay::app::service::RelayService;
use zcrelay::config::SystemConfig;
use zcrelay::drivers::zerocross::ZeroCrossInput;
use zcrelay::drivers::{hw_init, hw_timer, watchdog::TaskWatchdog};
use zcrelay::pins::MAX_RELAYS;
use zcrelay::RelayEngine;

/// Shared with the zero-cross ISR and the esp_timer callback.
static ENGINE: OnceLock<RelayEngine<MAX_RELAYS>> = OnceLock::new();

/// Boundary to the pub/sub transport.
static BUS: MessageBus = MessageBus::new();

/// Log engine counters every this many task iterations.
const STATS_EVERY: u32 = 6_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  zcrelay v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Config and engine ──────────────────────────────────
    let config = SystemConfig::default();
    let engine = RelayEngine::from_config(&config).context("relay engine setup")?;
    let engine = ENGINE.get_or_init(|| engine);

    // ── 3. Hardware ───────────────────────────────────────────
    let mut outputs = heapless::Vec::<(i32, bool), { 2 * MAX_RELAYS }>::new();
    for a in engine.registry().iter() {
        let inactive = a.logic_level().level(false);
        for pin in core::iter::once(a.high_output()).chain(a.low_output()) {
            outputs
                .push((pin, inactive))
                .map_err(|_| anyhow!("relay output table full"))?;
        }
    }
    hw_init::init_peripherals(&outputs).context("peripheral init")?;
    hw_init::init_isr_service(engine).context("zero-cross ISR")?;
    hw_timer::start_relay_timer(engine, config.timer_tick_ms).context("relay timer")?;
    let mut watchdog = TaskWatchdog::default();

    // ── 4. Relay task ─────────────────────────────────────────
    let clock = MonotonicClock::new();
    let mut zc = ZeroCrossInput;
    let mut sink = TeeSink {
        primary: BUS.status_sink(),
        mirror: LogStatusSink::new(),
    };
    let mut service = RelayService::new(engine);
    service.start(&mut zc);

    info!("System ready. Entering relay loop.");

    let mut iterations: u32 = 0;
    loop {
        while let Some(msg) = BUS.next_inbound() {
            // Rejections are counted and logged by the service.
            let _ = service.handle_message(&msg.topic, &msg.payload, &mut sink);
        }

        service.poll(clock.now_ms(), &mut zc, &mut sink);
        watchdog.feed();

        iterations = iterations.wrapping_add(1);
        if iterations % STATS_EVERY == 0 {
            let s = engine.stats();
            let t = service.stats();
            info!(
                "STATS | edges={} actions={} failures={} step_downs={} flushes={} spurious={} dropped={} | accepted={} rejected={} published={}",
                s.edges,
                s.actions,
                s.failures,
                s.step_downs,
                s.watchdog_flushes,
                s.spurious_edges,
                s.dropped_signals,
                t.accepted,
                t.rejected,
                t.published
            );
            if t.publish_failures > 0 {
                warn!("{} status messages could not be published", t.publish_failures);
            }
        }

        std::thread::sleep(Duration::from_millis(u64::from(config.task_poll_interval_ms)));
    }
}
