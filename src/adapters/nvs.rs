//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`StoragePort`] as an EEPROM-style byte region.  Reads and
//! writes go to a RAM shadow; [`commit`](StoragePort::commit) pushes the
//! shadow to flash as a single NVS blob.
//!
//! - On ESP32 the blob lives under `hydro/cfgslots`.  `nvs_commit` is atomic,
//!   so a reset during commit leaves either the old or the new blob.
//! - On the host the shadow *is* the medium (dev/test only), with helpers
//!   for corrupting bytes to exercise recovery paths.
//!
//! A blank region reads as zeros.

use crate::app::ports::{StorageError, StoragePort};
use log::info;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(target_os = "espidf")]
const NVS_NAMESPACE: &[u8] = b"hydro\0";
#[cfg(target_os = "espidf")]
const NVS_KEY: &[u8] = b"cfgslots\0";

/// Size of the region reserved for configuration slots.
pub const REGION_CAPACITY: usize = 64;

pub struct NvsRegion {
    shadow: Vec<u8>,
    commits: u32,
    /// `false` for a RAM-only region: commits never reach flash.
    persistent: bool,
}

impl NvsRegion {
    /// Initialise NVS flash and load the stored blob into the shadow.
    ///
    /// On first boot or after a version mismatch the NVS partition is erased
    /// and re-initialised; the region then reads as blank.
    pub fn open(capacity: usize) -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        let shadow = Self::load_blob(capacity)?;

        #[cfg(not(target_os = "espidf"))]
        let shadow = {
            info!("NvsRegion: simulation backend ({} bytes)", capacity);
            vec![0u8; capacity]
        };

        Ok(Self {
            shadow,
            commits: 0,
            persistent: true,
        })
    }

    /// Blank RAM-only region.  Used when flash is unavailable so the
    /// controller still runs, and as the host test medium.
    pub fn volatile(capacity: usize) -> Self {
        Self {
            shadow: vec![0u8; capacity],
            commits: 0,
            persistent: false,
        }
    }

    #[cfg(target_os = "espidf")]
    fn load_blob(capacity: usize) -> Result<Vec<u8>, StorageError> {
        // SAFETY: called once from the main task before any other NVS use.
        let ret = unsafe { nvs_flash_init() };
        if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
            warn!("NVS: erasing and re-initialising flash partition");
            if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                return Err(StorageError::IoError);
            }
        } else if ret != ESP_OK {
            return Err(StorageError::IoError);
        }

        let mut shadow = vec![0u8; capacity];
        let loaded = Self::with_nvs_handle(false, |handle| {
            let mut size = shadow.len();
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    NVS_KEY.as_ptr() as *const _,
                    shadow.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(size)
        });
        match loaded {
            Ok(size) => info!("NvsRegion: loaded {} bytes", size),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => info!("NvsRegion: blank region"),
            Err(e) => {
                // Unreadable blob: start blank, the config store falls back to defaults.
                warn!("NvsRegion: blob read error {}, starting blank", e);
                shadow.fill(0);
            }
        }
        Ok(shadow)
    }

    /// Blank in-memory region (host simulation and tests).
    #[cfg(not(target_os = "espidf"))]
    pub fn in_memory(capacity: usize) -> Self {
        Self::volatile(capacity)
    }

    /// Overwrite one byte without going through the port (fault injection).
    #[cfg(not(target_os = "espidf"))]
    pub fn poke(&mut self, offset: usize, value: u8) {
        if let Some(b) = self.shadow.get_mut(offset) {
            *b = value;
        }
    }

    /// The whole region as stored.
    pub fn as_bytes(&self) -> &[u8] {
        &self.shadow
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Number of successful commits since open.
    pub fn commit_count(&self) -> u32 {
        self.commits
    }

    fn range(&self, offset: usize, len: usize) -> Result<core::ops::Range<usize>, StorageError> {
        let end = offset.checked_add(len).ok_or(StorageError::OutOfBounds)?;
        if end > self.shadow.len() {
            return Err(StorageError::OutOfBounds);
        }
        Ok(offset..end)
    }

    /// Open the namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(NVS_NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

impl StoragePort for NvsRegion {
    fn capacity(&self) -> usize {
        self.shadow.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        let r = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.shadow[r]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        let r = self.range(offset, data.len())?;
        self.shadow[r].copy_from_slice(data);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        #[cfg(target_os = "espidf")]
        if self.persistent {
            let shadow = &self.shadow;
            Self::with_nvs_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        NVS_KEY.as_ptr() as *const _,
                        shadow.as_ptr() as *const _,
                        shadow.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            })
            .map_err(|e| {
                warn!("NvsRegion: commit error {}", e);
                StorageError::CommitFailed
            })?;
        }

        self.commits = self.commits.wrapping_add(1);
        Ok(())
    }
}
