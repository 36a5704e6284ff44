//! End-to-end control scenarios: simulated transducer → RangeFinder →
//! AppService → PumpRelay, on a virtual clock.

use super::mock_hw::Rig;

use hydrosense::app::commands::AppCommand;
use hydrosense::app::events::{AlertReason, AppEvent};
use hydrosense::app::ports::ConfigSource;
use hydrosense::config::ConfigField;
use hydrosense::error::{Error, SafetyFault};
use hydrosense::fsm::StateId;
use hydrosense::fsm::context::StopReason;

// ── Measurement path ──────────────────────────────────────────

#[test]
fn first_burst_reports_level_and_volume() {
    let mut rig = Rig::new();
    rig.set_surface(Some(600));
    rig.run_until_ms(1_000);

    assert_eq!(rig.source, ConfigSource::Defaults);
    let t = rig.app.telemetry().expect("telemetry after first burst");
    assert!((t.distance_mm - 600.0).abs() < 0.5, "got {}", t.distance_mm);
    assert_eq!(t.level_percent, 45);
    assert!((t.volume_liters - 3.534).abs() < 0.01, "got {}", t.volume_liters);
    assert!(t.water_reserve);
    assert!(!t.water_alarm);
    assert_eq!(rig.sonar.pulses(), 3);
    assert!(rig.sink.contains(&AppEvent::Telemetry(t)));
}

#[test]
fn missing_echo_skips_measurement() {
    let mut rig = Rig::new();
    rig.set_surface(None);
    rig.run_until_ms(1_000);

    assert!(rig.sink.contains(&AppEvent::MeasurementSkipped));
    assert!(rig.app.telemetry().is_none());
}

#[test]
fn surface_outside_sensor_range_is_rejected() {
    let mut rig = Rig::new();
    rig.set_surface(Some(5));
    rig.run_until_ms(1_000);
    assert!(rig.app.telemetry().is_none());
}

#[test]
fn reflection_beyond_tank_bottom_is_no_measurement() {
    let mut rig = Rig::new();
    // Inside the transducer's range but far past the empty threshold.
    rig.set_surface(Some(3_000));
    rig.run_until_ms(1_000);

    assert!(rig.sink.contains(&AppEvent::MeasurementSkipped));
    assert!(rig.app.telemetry().is_none());
    assert!(!rig.app.alarms().water_alarm_active);
}

#[test]
fn measurements_repeat_on_interval() {
    let mut rig = Rig::new();
    rig.set_surface(Some(600));
    rig.run_until_ms(121_000);
    assert_eq!(rig.sonar.pulses(), 9, "bursts at 0 s, 60 s and 120 s");
}

// ── Pump sequencing ───────────────────────────────────────────

#[test]
fn top_off_cycle_stops_when_inlet_runs_dry() {
    let mut rig = Rig::new();
    rig.set_surface(Some(600));
    rig.set_water(true);

    rig.run_until_ms(4_900);
    assert_eq!(rig.app.state(), StateId::DelayBeforeStart);
    assert!(!rig.pump_on());

    rig.run_until_ms(5_100);
    assert_eq!(rig.app.state(), StateId::Running);
    assert!(rig.pump_on());

    rig.run_until_ms(15_000);
    rig.set_water(false);
    rig.run_for_ms(10);

    assert_eq!(rig.app.state(), StateId::Idle);
    assert!(!rig.pump_on());
    assert!(rig.sink.contains(&AppEvent::PumpStopped {
        reason: StopReason::DryRun,
        ran_secs: 10
    }));
    assert_eq!(rig.app.telemetry().unwrap().last_run_secs, 10);
}

#[test]
fn brief_water_blip_never_starts_pump() {
    let mut rig = Rig::new();
    rig.set_surface(Some(600));
    rig.set_water(true);
    rig.run_until_ms(3_000);
    rig.set_water(false);
    rig.run_until_ms(20_000);

    assert!(!rig.coil.borrow().contains(&true));
    assert_eq!(rig.app.state(), StateId::Idle);
}

#[test]
fn runtime_limit_locks_until_reset() {
    let mut rig = Rig::new();
    rig.set_surface(Some(600));
    rig.set_water(true);

    rig.run_until_ms(36_000);
    assert_eq!(rig.app.state(), StateId::SafetyLocked);
    assert!(!rig.pump_on());
    assert!(rig.sink.contains(&AppEvent::SafetyFault(
        SafetyFault::RuntimeLimitExceeded { ran_secs: 30 }
    )));
    assert!(matches!(rig.app.health(), Err(Error::Safety(_))));

    // Water keeps coming; the lock holds and the buzzer nags.
    rig.run_until_ms(185_000);
    assert_eq!(rig.app.state(), StateId::SafetyLocked);
    assert!(!rig.pump_on());
    let beeps = rig
        .sink
        .count(|e| *e == AppEvent::AudibleAlert(AlertReason::SafetyLocked));
    assert_eq!(beeps, 3);

    rig.command(AppCommand::ResetSafetyLock).unwrap();
    assert!(rig.sink.contains(&AppEvent::SafetyLockCleared));
    assert!(rig.app.health().is_ok());

    rig.run_for_ms(5_100);
    assert_eq!(rig.app.state(), StateId::Running);
    assert!(rig.pump_on());
}

#[test]
fn water_alarm_blocks_pump_until_cleared() {
    let mut rig = Rig::new();
    rig.command(AppCommand::SetField(ConfigField::MeasurementInterval(1)))
        .unwrap();
    rig.set_surface(Some(1_060));
    rig.set_water(true);

    rig.run_until_ms(10_000);
    assert!(rig.sink.contains(&AppEvent::WaterAlarm(true)));
    assert!(rig.app.alarms().water_alarm_active);
    assert!(!rig.coil.borrow().contains(&true));

    // Refilled tank: the slew limit walks the reading back over the band.
    rig.set_surface(Some(1_000));
    rig.run_for_ms(12_000);
    assert!(!rig.app.alarms().water_alarm_active);
    assert!(rig.sink.contains(&AppEvent::WaterAlarm(false)));

    rig.run_for_ms(6_000);
    assert!(rig.pump_on());
}

#[test]
fn alarm_while_running_stops_pump() {
    let mut rig = Rig::new();
    rig.command(AppCommand::SetField(ConfigField::MeasurementInterval(1)))
        .unwrap();
    rig.set_surface(Some(1_030));
    rig.set_water(true);
    rig.run_until_ms(6_000);
    assert_eq!(rig.app.state(), StateId::Running);

    rig.set_surface(Some(1_065));
    rig.run_for_ms(20_000);
    assert!(rig.sink.contains(&AppEvent::PumpStopped {
        reason: StopReason::WaterAlarm,
        ran_secs: rig.app.pump().last_run_secs()
    }));
    assert!(!rig.pump_on());
    assert_ne!(rig.app.state(), StateId::SafetyLocked);
}

// ── Service mode ──────────────────────────────────────────────

#[test]
fn service_mode_holds_pump_off_and_reminds() {
    let mut rig = Rig::new();
    rig.set_surface(Some(600));
    rig.command(AppCommand::ToggleServiceMode).unwrap();
    rig.set_water(true);

    rig.run_until_ms(130_000);
    assert!(!rig.coil.borrow().contains(&true));
    let beeps = rig
        .sink
        .count(|e| *e == AppEvent::AudibleAlert(AlertReason::ServiceMode));
    assert_eq!(beeps, 2);

    rig.command(AppCommand::ToggleServiceMode).unwrap();
    assert!(rig.sink.contains(&AppEvent::ServiceMode(false)));
    rig.run_for_ms(5_100);
    assert!(rig.pump_on());
}

#[test]
fn muted_controller_never_beeps() {
    let mut rig = Rig::new();
    rig.command(AppCommand::SetSoundEnabled(false)).unwrap();
    rig.command(AppCommand::SetServiceMode(true)).unwrap();
    rig.run_until_ms(200_000);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::AudibleAlert(_))), 0);
}

// ── Clock wrap ────────────────────────────────────────────────

#[test]
fn run_straddling_clock_wrap_is_cut_and_restarts_after() {
    let start_ms = u64::from(u32::MAX) - 75_000;
    let region = hydrosense::adapters::nvs::NvsRegion::in_memory(hydrosense::config_store::REGION_LEN);
    let mut rig = Rig::boot(region, start_ms * 1000);
    rig.set_surface(Some(600));
    rig.set_water(true);

    rig.run_until_ms(start_ms + 6_000);
    assert_eq!(rig.app.state(), StateId::Running);

    // Enter the guard window: run aborted, start held.
    rig.run_until_ms(start_ms + 20_000);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert!(!rig.pump_on());
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::PumpStopped {
            reason: StopReason::ClockRollover,
            ..
        }
    )));

    // Past the wrap the sequence starts over normally.
    let wrap_ms = u64::from(u32::MAX) + 1;
    rig.run_until_ms(wrap_ms + 5_500);
    assert_eq!(rig.app.state(), StateId::Running);
    assert!(rig.pump_on());
    assert_ne!(rig.app.state(), StateId::SafetyLocked);
}
