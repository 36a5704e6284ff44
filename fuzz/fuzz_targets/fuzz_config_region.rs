//! Fuzz target: `ConfigStore::load` over an arbitrary storage image.
//!
//! Whatever bytes the flash holds, loading must not panic and must hand
//! back a record that passes validation.  A second load must then find a
//! real slot.
//!
//! cargo fuzz run fuzz_config_region

#![no_main]

use hydrosense::adapters::nvs::NvsRegion;
use hydrosense::app::ports::{ConfigPort, ConfigSource};
use hydrosense::config::{ConfigRecord, RECORD_LEN};
use hydrosense::config_store::{ConfigStore, REGION_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut region = NvsRegion::in_memory(REGION_LEN);
    for (i, b) in data.iter().take(REGION_LEN).enumerate() {
        region.poke(i, *b);
    }

    let mut store = ConfigStore::new(region);
    let loaded = store.load().expect("region is large enough");
    assert!(loaded.record.validate().is_ok());

    let again = store.load().expect("second load");
    assert!(matches!(again.source, ConfigSource::Slot { .. }));
    assert_eq!(again.record, loaded.record);

    // The raw decoder on its own must reject rather than panic.
    if data.len() >= RECORD_LEN {
        let mut raw = [0u8; RECORD_LEN];
        raw.copy_from_slice(&data[..RECORD_LEN]);
        let _ = ConfigRecord::from_bytes(&raw);
    }
});
