//! Settings store on the nRF52840's internal flash.
//!
//! Values live in a `sequential-storage` key/value map over a reserved
//! range of flash pages; the crate handles wear levelling and garbage
//! collection. Keys are the raw 16-bit [`SettingKey`]s.

use core::ops::Range;

use defmt::{debug, error};
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};
use waterbot::config::{MAX_VALUE_LEN, STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use waterbot::error::{Error, StorageError};
use waterbot::storage::{SettingKey, SettingsStore};

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

/// Start address of our storage region.
const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

/// End address (exclusive) of our storage region.
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

/// Scratch space for one item: key, length header and value, rounded up
/// to the flash word size.
const ITEM_BUF_LEN: usize = 2 * MAX_VALUE_LEN + 16;

pub struct FlashStore<F> {
    flash: F,
    range: Range<u32>,
}

impl<F: NorFlash> FlashStore<F> {
    pub fn new(flash: F) -> Self {
        Self {
            flash,
            range: STORAGE_START..STORAGE_END,
        }
    }
}

impl<F: NorFlash> SettingsStore for FlashStore<F> {
    async fn get(&mut self, key: SettingKey, out: &mut [u8]) -> Result<usize, Error> {
        let mut buf = [0u8; ITEM_BUF_LEN];

        match fetch_item::<u16, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut buf,
            &key.raw(),
        )
        .await
        {
            Ok(Some(data)) => {
                let dst = out
                    .get_mut(..data.len())
                    .ok_or(StorageError::BufferTooSmall)?;
                dst.copy_from_slice(data);
                Ok(data.len())
            }
            Ok(None) => Err(StorageError::NotFound.into()),
            Err(e) => {
                error!("Flash read error: {:?}", defmt::Debug2Format(&e));
                Err(StorageError::Flash.into())
            }
        }
    }

    async fn set(&mut self, key: SettingKey, data: &[u8]) -> Result<(), Error> {
        if data.len() > MAX_VALUE_LEN {
            return Err(StorageError::BufferTooSmall.into());
        }
        let mut buf = [0u8; ITEM_BUF_LEN];

        match store_item::<u16, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut buf,
            &key.raw(),
            &data,
        )
        .await
        {
            Ok(()) => {
                debug!("Flash: stored key {=u16:#x}", key.raw());
                Ok(())
            }
            Err(sequential_storage::Error::FullStorage) => Err(StorageError::Full.into()),
            Err(e) => {
                error!("Flash write error: {:?}", defmt::Debug2Format(&e));
                Err(StorageError::Flash.into())
            }
        }
    }
}
