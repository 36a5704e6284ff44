//! Fuzz target: `burst_median`
//!
//! Arbitrary soundings, valid or not, in any order.  The median must stay
//! within the valid samples and respect the half-burst quorum.
//!
//! cargo fuzz run fuzz_burst_median

#![no_main]

use hydrosense::error::SensorError;
use hydrosense::sensors::range_finder::{MAX_SOUNDINGS, RawSample, burst_median};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let samples: Vec<RawSample> = data
        .chunks_exact(2)
        .take(MAX_SOUNDINGS)
        .map(|c| {
            let v = u16::from_le_bytes([c[0], c[1]]);
            if v & 0x8000 != 0 {
                RawSample::Invalid(SensorError::EchoTimeout)
            } else {
                RawSample::Distance(u32::from(v))
            }
        })
        .collect();

    let valid: Vec<u32> = samples.iter().filter_map(|s| s.distance()).collect();
    match burst_median(&samples, samples.len()) {
        Some(m) => {
            assert!(valid.len() >= samples.len() / 2);
            assert!(valid.iter().any(|v| *v <= m));
            assert!(valid.iter().any(|v| *v >= m));
        }
        None => assert!(valid.is_empty() || valid.len() < samples.len() / 2),
    }
});
