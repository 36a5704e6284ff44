//! RangeFinder against the simulated transducer, without the app layer.

use super::mock_hw::{SimEcho, SimTrigger, SonarHandle};

use hydrosense::app::ports::RangingPort;
use hydrosense::error::SensorError;
use hydrosense::sensors::range_finder::{RangeFinder, RangeState, RangingConfig, RawSample};

type Ranger = RangeFinder<SimTrigger, SimEcho>;

fn ranger(sonar: &SonarHandle) -> Ranger {
    RangeFinder::new(
        SimTrigger(sonar.clone()),
        SimEcho(sonar.clone()),
        RangingConfig::default(),
    )
}

/// Tick every 5 µs from `start_us` until the burst finishes.
fn run_burst(r: &mut Ranger, sonar: &SonarHandle, start_us: u32) -> u32 {
    let mut now = start_us;
    for _ in 0..200_000 {
        sonar.set_now(now);
        r.tick(now);
        if r.result_ready() {
            return now;
        }
        now = now.wrapping_add(5);
    }
    panic!("burst never finished");
}

#[test]
fn burst_reports_surface_distance() {
    for mm in [20, 137, 600, 1_050, 3_999] {
        let sonar = SonarHandle::default();
        sonar.set_target(Some(mm));
        let mut r = ranger(&sonar);
        r.start().unwrap();
        run_burst(&mut r, &sonar, 0);
        assert_eq!(r.take_result(), Some(mm), "surface at {mm} mm");
        assert_eq!(r.state(), RangeState::Idle);
        assert_eq!(sonar.pulses(), 3);
    }
}

#[test]
fn silent_transducer_times_out_every_sounding() {
    let sonar = SonarHandle::default();
    let mut r = ranger(&sonar);
    r.start().unwrap();
    let end = run_burst(&mut r, &sonar, 1_000);

    assert!(
        r.samples()
            .iter()
            .all(|s| *s == RawSample::Invalid(SensorError::EchoTimeout))
    );
    // Three timeouts plus two settle gaps.
    assert!(end - 1_000 >= 3 * 25_000 + 2 * 50_000);
    assert_eq!(r.take_result(), None);
}

#[test]
fn burst_straddling_microsecond_wrap() {
    let sonar = SonarHandle::default();
    sonar.set_target(Some(800));
    let mut r = ranger(&sonar);
    r.start().unwrap();
    let end = run_burst(&mut r, &sonar, u32::MAX - 60_000);
    assert!(end < 1_000_000, "finished after the wrap");
    assert_eq!(r.take_result(), Some(800));
}

#[test]
fn pending_result_blocks_new_burst() {
    let sonar = SonarHandle::default();
    sonar.set_target(Some(500));
    let mut r = ranger(&sonar);
    r.start().unwrap();
    run_burst(&mut r, &sonar, 0);

    assert_eq!(r.start(), Err(SensorError::ResultPending));
    assert_eq!(r.take_result(), Some(500));
    assert!(r.start().is_ok());
}

#[test]
fn restart_mid_burst_discards_partial_samples() {
    let sonar = SonarHandle::default();
    sonar.set_target(Some(300));
    let mut r = ranger(&sonar);
    r.start().unwrap();

    let mut now = 0u32;
    while r.samples().is_empty() {
        sonar.set_now(now);
        r.tick(now);
        now += 5;
    }
    assert!(r.busy());

    sonar.set_target(Some(900));
    r.start().unwrap();
    assert!(r.samples().is_empty());
    run_burst(&mut r, &sonar, now);
    assert_eq!(r.take_result(), Some(900));
}
