//! Persistence of [`DeviceConfig`]

use macropad_types::NUM_KEYS;
use macropad_types::config::{DeviceConfig, EncoderConfig, KeyMapping};

/// Size of the serialized config blob kept by [`MemoryConfigStore`]
pub const CONFIG_BLOB_SIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Nothing was saved yet
    Empty,
    /// The config doesn't fit in the storage
    SerializeError,
    /// Stored bytes are not a valid config
    DeserializeError,
    /// Key index out of range
    InvalidIndex,
    /// Backend failure
    Io,
}

/// Non-volatile storage of the device settings.
///
/// Only [`ConfigStore::load`], [`ConfigStore::save`] and the first-boot flag have to be
/// implemented, the per-field saves default to load-modify-save.
pub trait ConfigStore {
    /// True until [`ConfigStore::mark_initialized`] was called
    fn is_first_boot(&self) -> bool;

    fn mark_initialized(&mut self) -> Result<(), StoreError>;

    fn load(&self) -> Result<DeviceConfig, StoreError>;

    fn save(&mut self, config: &DeviceConfig) -> Result<(), StoreError>;

    fn save_key_mapping(&mut self, index: usize, mapping: &KeyMapping) -> Result<(), StoreError> {
        if index >= NUM_KEYS {
            return Err(StoreError::InvalidIndex);
        }
        let mut config = self.load()?;
        config.key_mappings[index] = mapping.clone();
        self.save(&config)
    }

    /// The encoder sensitivity is the device-wide sensitivity too
    fn save_encoder_config(&mut self, encoder: &EncoderConfig) -> Result<(), StoreError> {
        let mut config = self.load()?;
        config.encoder = *encoder;
        config.encoder_sensitivity = encoder.sensitivity;
        self.save(&config)
    }

    fn save_device_name(&mut self, name: &str) -> Result<(), StoreError> {
        let mut config = self.load()?;
        config.set_device_name(name);
        self.save(&config)
    }

    fn save_debounce_ms(&mut self, debounce_ms: u16) -> Result<(), StoreError> {
        let mut config = self.load()?;
        config.debounce_ms = debounce_ms;
        self.save(&config)
    }

    fn save_sleep_timeout(&mut self, sleep_timeout_ms: u32) -> Result<(), StoreError> {
        let mut config = self.load()?;
        config.sleep_timeout_ms = sleep_timeout_ms;
        self.save(&config)
    }

    /// Overwrite the stored settings with the defaults
    fn factory_reset(&mut self) -> Result<(), StoreError> {
        self.save(&DeviceConfig::default())
    }

    /// Load the settings. On first boot the defaults are written first.
    fn load_or_init(&mut self) -> Result<DeviceConfig, StoreError> {
        if self.is_first_boot() {
            info!("First boot, writing default config");
            let config = DeviceConfig::default();
            self.save(&config)?;
            self.mark_initialized()?;
            return Ok(config);
        }
        self.load()
    }
}

/// RAM-backed store keeping a postcard-serialized blob.
///
/// Useful on boards without spare flash, and as the reference implementation for tests.
pub struct MemoryConfigStore {
    blob: [u8; CONFIG_BLOB_SIZE],
    len: usize,
    initialized: bool,
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConfigStore {
    pub const fn new() -> Self {
        Self {
            blob: [0; CONFIG_BLOB_SIZE],
            len: 0,
            initialized: false,
        }
    }

    /// Serialized bytes currently stored
    pub fn as_bytes(&self) -> &[u8] {
        &self.blob[..self.len]
    }
}

impl ConfigStore for MemoryConfigStore {
    fn is_first_boot(&self) -> bool {
        !self.initialized
    }

    fn mark_initialized(&mut self) -> Result<(), StoreError> {
        self.initialized = true;
        Ok(())
    }

    fn load(&self) -> Result<DeviceConfig, StoreError> {
        if self.len == 0 {
            return Err(StoreError::Empty);
        }
        postcard::from_bytes(self.as_bytes()).map_err(|e| {
            error!("Postcard deserialize config error: {}", e);
            StoreError::DeserializeError
        })
    }

    fn save(&mut self, config: &DeviceConfig) -> Result<(), StoreError> {
        let used = postcard::to_slice(config, &mut self.blob)
            .map_err(|e| {
                error!("Postcard serialize config error: {}", e);
                StoreError::SerializeError
            })?
            .len();
        self.len = used;
        Ok(())
    }
}
