//! Persistent key/value settings.
//!
//! The controller keeps two values across restarts: the check interval
//! and the desired reading. They are stored as small little-endian blobs
//! under namespaced keys; on target the store is a `sequential-storage`
//! map in internal flash (`hw::flash`), on the host an in-memory map.
//!
//! Storage is best-effort: a failed read falls back to the in-memory
//! default, a failed write means the edit may not survive a restart.

use heapless::{FnvIndexMap, Vec};

use crate::config::MAX_VALUE_LEN;
use crate::error::{Error, StorageError};

/// Key of one stored value: namespace in the high byte, id in the low byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SettingKey(u16);

impl SettingKey {
    pub const fn raw(self) -> u16 {
        self.0
    }
}

/// Handle to a group of keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Namespace(u8);

impl Namespace {
    /// Derive the namespace id from its name (8-bit folded FNV-1a).
    pub fn open(name: &str) -> Self {
        let mut hash: u32 = 0x811c_9dc5;
        for b in name.bytes() {
            hash ^= b as u32;
            hash = hash.wrapping_mul(0x0100_0193);
        }
        let folded = (hash ^ (hash >> 8) ^ (hash >> 16) ^ (hash >> 24)) as u8;
        Self(folded)
    }

    pub const fn key(self, id: u8) -> SettingKey {
        SettingKey(((self.0 as u16) << 8) | id as u16)
    }
}

/// Blob store keyed by [`SettingKey`].
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    /// Copy the value stored under `key` into `out`, returning its length.
    ///
    /// Fails with `StorageError::NotFound` for unset keys and
    /// `StorageError::BufferTooSmall` if `out` is too short; in both cases
    /// `out` is left untouched.
    async fn get(&mut self, key: SettingKey, out: &mut [u8]) -> Result<usize, Error>;

    /// Store `data` under `key`, replacing any previous value.
    async fn set(&mut self, key: SettingKey, data: &[u8]) -> Result<(), Error>;
}

/// RAM-backed store used on the host and when flash is unavailable.
pub struct MemoryStore<const N: usize = 8> {
    entries: FnvIndexMap<u16, Vec<u8, MAX_VALUE_LEN>, N>,
}

impl<const N: usize> MemoryStore<N> {
    pub fn new() -> Self {
        Self {
            entries: FnvIndexMap::new(),
        }
    }

    pub fn read(&self, key: SettingKey, out: &mut [u8]) -> Result<usize, Error> {
        let value = self.entries.get(&key.raw()).ok_or(StorageError::NotFound)?;
        let dst = out
            .get_mut(..value.len())
            .ok_or(StorageError::BufferTooSmall)?;
        dst.copy_from_slice(value);
        Ok(value.len())
    }

    pub fn write(&mut self, key: SettingKey, data: &[u8]) -> Result<(), Error> {
        let value = Vec::from_slice(data).map_err(|_| StorageError::BufferTooSmall)?;
        self.entries
            .insert(key.raw(), value)
            .map_err(|_| StorageError::Full)?;
        Ok(())
    }

    pub fn contains(&self, key: SettingKey) -> bool {
        self.entries.contains_key(&key.raw())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<const N: usize> Default for MemoryStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SettingsStore for MemoryStore<N> {
    async fn get(&mut self, key: SettingKey, out: &mut [u8]) -> Result<usize, Error> {
        self.read(key, out)
    }

    async fn set(&mut self, key: SettingKey, data: &[u8]) -> Result<(), Error> {
        self.write(key, data)
    }
}

const ID_CHECK_INTERVAL: u8 = 0x01;
const ID_DESIRED_READING: u8 = 0x02;

/// Read a fixed-width record; any other stored length is corrupt.
async fn fetch<S: SettingsStore, const L: usize>(store: &mut S, key: SettingKey) -> Result<[u8; L], Error> {
    let mut buf = [0u8; L];
    match store.get(key, &mut buf).await {
        Ok(n) if n == L => Ok(buf),
        Ok(n) => {
            warn!("record {:?} has {} bytes, expected {}", key, n, L);
            Err(StorageError::Corrupt.into())
        }
        Err(Error::Storage(StorageError::BufferTooSmall)) => Err(StorageError::Corrupt.into()),
        Err(e) => Err(e),
    }
}

/// Controller settings that survive a restart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PersistedSettings {
    pub check_interval_mins: u32,
    pub desired_reading: u16,
}

impl PersistedSettings {
    /// Load settings, keeping `defaults` for anything missing or unreadable.
    pub async fn load<S: SettingsStore>(store: &mut S, ns: Namespace, defaults: Self) -> Self {
        let mut settings = defaults;

        match fetch::<_, 4>(store, ns.key(ID_CHECK_INTERVAL)).await {
            Ok(bytes) => settings.check_interval_mins = u32::from_le_bytes(bytes),
            Err(e) => debug!("check interval not loaded ({:?}) - using default", e),
        }
        match fetch::<_, 2>(store, ns.key(ID_DESIRED_READING)).await {
            Ok(bytes) => settings.desired_reading = u16::from_le_bytes(bytes),
            Err(e) => debug!("desired reading not loaded ({:?}) - using default", e),
        }

        info!(
            "settings: every {} min, desired {}",
            settings.check_interval_mins, settings.desired_reading
        );
        settings
    }

    /// Persist both values. Attempts both writes even if the first fails.
    pub async fn save<S: SettingsStore>(&self, store: &mut S, ns: Namespace) -> Result<(), Error> {
        let interval = store
            .set(
                ns.key(ID_CHECK_INTERVAL),
                &self.check_interval_mins.to_le_bytes(),
            )
            .await;
        let desired = store
            .set(ns.key(ID_DESIRED_READING), &self.desired_reading.to_le_bytes())
            .await;

        match interval.and(desired) {
            Ok(()) => {
                debug!("settings saved");
                Ok(())
            }
            Err(e) => {
                error!("settings save failed: {:?}", e);
                Err(e)
            }
        }
    }
}
