//! Persistence across reboots: commands → ConfigStore → NvsRegion → next boot.

use super::mock_hw::Rig;

use hydrosense::adapters::nvs::NvsRegion;
use hydrosense::app::commands::AppCommand;
use hydrosense::app::events::AppEvent;
use hydrosense::app::ports::{ConfigError, ConfigSource, SaveReceipt};
use hydrosense::config::{ConfigField, ConfigRecord};
use hydrosense::config_store::{SEQ_LEN, SLOT_SIZE};
use hydrosense::error::Error;

fn saved_rig() -> NvsRegion {
    let mut rig = Rig::new();
    rig.command(AppCommand::SetField(ConfigField::PumpWorkTime(90)))
        .unwrap();
    rig.command(AppCommand::SetField(ConfigField::TankDiameter(300)))
        .unwrap();
    rig.command(AppCommand::SaveConfig).unwrap();
    assert!(rig.sink.contains(&AppEvent::ConfigSaved(SaveReceipt {
        slot: 1,
        sequence: 2
    })));
    rig.into_region()
}

#[test]
fn saved_config_survives_reboot() {
    let rig = Rig::boot(saved_rig(), 0);
    assert_eq!(rig.source, ConfigSource::Slot { slot: 1, sequence: 2 });
    assert_eq!(rig.app.config().pump_work_time_secs, 90);
    assert_eq!(rig.app.config().tank_diameter_mm, 300);
    assert_eq!(rig.app.pump().timing().work_time_ms, 90_000);
    assert!(rig.sink.contains(&AppEvent::Started {
        config: ConfigSource::Slot { slot: 1, sequence: 2 },
        state: hydrosense::fsm::StateId::Idle,
    }));
}

#[test]
fn unsaved_edits_are_lost_on_reboot() {
    let mut rig = Rig::new();
    rig.command(AppCommand::SetField(ConfigField::PumpDelay(30)))
        .unwrap();
    assert!(rig.app.is_config_dirty());

    let rig = Rig::boot(rig.into_region(), 0);
    assert_eq!(rig.app.config().pump_delay_secs, 5);
}

#[test]
fn torn_write_to_newest_slot_falls_back() {
    let mut region = saved_rig();
    // Damage the record body of slot 1 as a power cut mid-write would.
    region.poke(SLOT_SIZE + SEQ_LEN + 5, 0xEE);

    let rig = Rig::boot(region, 0);
    assert_eq!(rig.source, ConfigSource::Slot { slot: 0, sequence: 1 });
    assert_eq!(*rig.app.config(), ConfigRecord::default());
}

#[test]
fn both_slots_corrupt_recovers_with_defaults() {
    let mut region = saved_rig();
    region.poke(SEQ_LEN + 2, 0x11);
    region.poke(SLOT_SIZE + SEQ_LEN + 2, 0x22);

    let rig = Rig::boot(region, 0);
    assert_eq!(rig.source, ConfigSource::Defaults);
    assert_eq!(*rig.app.config(), ConfigRecord::default());

    // Defaults were written back, so the next boot reads a real slot.
    let rig = Rig::boot(rig.into_region(), 0);
    assert!(matches!(rig.source, ConfigSource::Slot { .. }));
}

#[test]
fn factory_reset_overwrites_saved_config() {
    let mut rig = Rig::boot(saved_rig(), 0);
    rig.command(AppCommand::FactoryReset).unwrap();
    assert_eq!(*rig.app.config(), ConfigRecord::default());

    let rig = Rig::boot(rig.into_region(), 0);
    assert_eq!(*rig.app.config(), ConfigRecord::default());
    assert_eq!(rig.source, ConfigSource::Slot { slot: 0, sequence: 3 });
}

#[test]
fn invalid_replacement_is_refused_whole() {
    let mut rig = Rig::new();
    let mut bad = ConfigRecord::default();
    bad.reserve_level_mm = 2_000; // beyond the empty threshold
    bad.pump_work_time_secs = 120;

    let err = rig.command(AppCommand::ReplaceConfig(bad)).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ValidationFailed(_))));
    assert_eq!(rig.app.config().pump_work_time_secs, 30);
    assert!(!rig.app.is_config_dirty());
}

#[test]
fn save_failure_keeps_config_dirty() {
    // Region too small to hold even one slot.
    let mut rig = Rig::with_config(
        ConfigRecord::default(),
        hydrosense::config_store::ConfigStore::new(NvsRegion::in_memory(SLOT_SIZE - 1)),
        ConfigSource::Defaults,
        0,
    );
    rig.command(AppCommand::SetSoundEnabled(false)).unwrap();
    let err = rig.command(AppCommand::SaveConfig).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::Storage(_))));
    assert!(rig.app.is_config_dirty());
}
