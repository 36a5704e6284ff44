//! Two-slot wear-leveled configuration persistence.
//!
//! The region holds two copies of the config, each tagged with a write
//! sequence number:
//!
//! ```text
//!  base                         base + SLOT_SIZE
//!  ┌──────────┬───────────────┐┌──────────┬───────────────┐
//!  │ seq u32LE│ record (19 B) ││ seq u32LE│ record (19 B) │
//!  └──────────┴───────────────┘└──────────┴───────────────┘
//!        slot 0                       slot 1
//! ```
//!
//! Saves always overwrite the *older* slot, so writes alternate between the
//! two and a power cut mid-write can damage only the copy being replaced.
//! Loads pick the valid slot with the higher sequence.  Sequence 0 marks a
//! slot that was never written.

use log::{info, warn};

use crate::app::ports::{
    ConfigError, ConfigPort, ConfigSource, LoadedConfig, SaveReceipt, StorageError, StoragePort,
};
use crate::config::{ConfigRecord, RECORD_LEN};

/// Number of redundant copies.
pub const SLOT_COUNT: usize = 2;

/// Bytes of sequence header in front of each record.
pub const SEQ_LEN: usize = 4;

/// One slot: sequence header plus record image.
pub const SLOT_SIZE: usize = SEQ_LEN + RECORD_LEN;

/// Bytes the store occupies starting at its base offset.
pub const REGION_LEN: usize = SLOT_COUNT * SLOT_SIZE;

/// Sequence that follows `seq`.  Skips 0 on wrap, since 0 means "never written".
pub const fn next_sequence(seq: u32) -> u32 {
    if seq == u32::MAX { 1 } else { seq + 1 }
}

/// Slot to overwrite: the one with the lower sequence, slot 0 on a tie.
pub const fn target_slot(seq0: u32, seq1: u32) -> usize {
    if seq1 < seq0 { 1 } else { 0 }
}

/// Wear-leveled [`ConfigPort`] over any [`StoragePort`].
pub struct ConfigStore<S: StoragePort> {
    storage: S,
    base: usize,
}

impl<S: StoragePort> ConfigStore<S> {
    /// Store at the start of the region.
    pub fn new(storage: S) -> Self {
        Self::with_base(storage, 0)
    }

    /// Store at `base`, leaving the bytes before it to other users.
    pub fn with_base(storage: S, base: usize) -> Self {
        Self { storage, base }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Byte offset of `slot` inside the backing region.
    pub fn slot_offset(&self, slot: usize) -> usize {
        self.base + slot * SLOT_SIZE
    }

    /// Raw sequence header of `slot`, valid or not.
    pub fn read_sequence(&self, slot: usize) -> Result<u32, StorageError> {
        let mut seq = [0u8; SEQ_LEN];
        self.storage.read(self.slot_offset(slot), &mut seq)?;
        Ok(u32::from_le_bytes(seq))
    }

    /// Decode `slot`.  `Ok(None)` when the slot is blank, corrupt, from
    /// another layout version, or holds out-of-range values.
    pub fn read_slot(&self, slot: usize) -> Result<Option<(u32, ConfigRecord)>, StorageError> {
        let mut raw = [0u8; SLOT_SIZE];
        self.storage.read(self.slot_offset(slot), &mut raw)?;

        let mut seq = [0u8; SEQ_LEN];
        seq.copy_from_slice(&raw[..SEQ_LEN]);
        let sequence = u32::from_le_bytes(seq);
        if sequence == 0 {
            return Ok(None);
        }

        let mut image = [0u8; RECORD_LEN];
        image.copy_from_slice(&raw[SEQ_LEN..]);
        let record = match ConfigRecord::from_bytes(&image).and_then(|r| r.validate().map(|()| r)) {
            Ok(r) => r,
            Err(e) => {
                warn!("ConfigStore: slot {} (seq {}) unusable: {}", slot, sequence, e);
                return Ok(None);
            }
        };
        Ok(Some((sequence, record)))
    }

    fn write_slot(&mut self, slot: usize, sequence: u32, record: &ConfigRecord) -> Result<(), StorageError> {
        let mut raw = [0u8; SLOT_SIZE];
        raw[..SEQ_LEN].copy_from_slice(&sequence.to_le_bytes());
        raw[SEQ_LEN..].copy_from_slice(&record.to_bytes());

        let offset = self.slot_offset(slot);
        let storage = &mut self.storage;
        critical_section::with(|_| {
            storage.write(offset, &raw)?;
            storage.commit()
        })
    }
}

impl<S: StoragePort> ConfigPort for ConfigStore<S> {
    fn load(&mut self) -> Result<LoadedConfig, ConfigError> {
        let mut best: Option<(usize, u32, ConfigRecord)> = None;
        for slot in 0..SLOT_COUNT {
            if let Some((sequence, record)) = self.read_slot(slot)? {
                if best.is_none_or(|(_, s, _)| sequence > s) {
                    best = Some((slot, sequence, record));
                }
            }
        }

        if let Some((slot, sequence, record)) = best {
            info!("ConfigStore: loaded slot {} (seq {})", slot, sequence);
            return Ok(LoadedConfig {
                record,
                source: ConfigSource::Slot { slot, sequence },
            });
        }

        warn!("ConfigStore: no valid slot, persisting defaults");
        let record = ConfigRecord::default();
        self.save(&record)?;
        Ok(LoadedConfig {
            record,
            source: ConfigSource::Defaults,
        })
    }

    fn save(&mut self, record: &ConfigRecord) -> Result<SaveReceipt, ConfigError> {
        record.validate()?;

        let seq0 = self.read_sequence(0)?;
        let seq1 = self.read_sequence(1)?;
        let slot = target_slot(seq0, seq1);
        // Number past the newer slot so the fresh copy always wins the next load.
        let sequence = next_sequence(seq0.max(seq1));

        self.write_slot(slot, sequence, record)?;
        info!("ConfigStore: saved slot {} (seq {})", slot, sequence);
        Ok(SaveReceipt { slot, sequence })
    }
}
