//! Host commands and config writes.
//!
//! The dispatcher only frames `[code, args...]` and `[section, data...]`, a [`HostHandler`]
//! gives them meaning. [`ConfigCommandHandler`] is the handler used by the firmware, it keeps
//! the [`DeviceConfig`] in sync with a [`ConfigStore`].

use embassy_time::Duration;
use heapless::Vec;
use macropad_types::NUM_KEYS;
use macropad_types::command::{CommandCode, ConfigSection};
use macropad_types::config::{DeviceConfig, EncoderConfig, KeyMapping, MAX_MACRO_LENGTH};

use crate::config_store::ConfigStore;

/// Largest config-data payload: section, key index and a key mapping with a full macro
pub const MAX_CONFIG_PAYLOAD: usize = 2 + KeyMapping::HEADER_LEN + MAX_MACRO_LENGTH;

/// Every key mapping, the encoder config and the device settings
pub const MAX_CONFIG_REPLY: usize = NUM_KEYS + 2;

pub type ConfigPayload = Vec<u8, MAX_CONFIG_PAYLOAD>;
pub type ConfigReply = Vec<ConfigPayload, MAX_CONFIG_REPLY>;

/// Settings the running input pipeline picks up without a reboot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LiveSettings {
    pub debounce: Duration,
    pub encoder_sensitivity: u8,
}

impl LiveSettings {
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms as u64),
            encoder_sensitivity: config.encoder_sensitivity.max(1),
        }
    }
}

/// What the dispatcher does after the handler processed a host message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostAction {
    None,
    /// Apply new debounce/sensitivity to the matrix and the encoder
    Apply(LiveSettings),
    /// Send these config-data payloads back on the link the request came from
    Reply(ConfigReply),
}

/// Receiver of host commands and config writes
pub trait HostHandler {
    /// `code` is the first byte of a command payload, `args` the rest
    fn on_command(&mut self, code: u8, args: &[u8]) -> HostAction;

    /// `section` is the first byte of a config-data payload, `data` the rest
    fn on_config(&mut self, section: u8, data: &[u8]) -> HostAction;
}

/// All config sections of `config`, in the order the host expects them
pub fn config_reply(config: &DeviceConfig) -> ConfigReply {
    let mut reply = ConfigReply::new();
    for (index, mapping) in config.key_mappings.iter().enumerate() {
        let mut payload = ConfigPayload::new();
        // A mapping never exceeds `MAX_CONFIG_PAYLOAD`
        let _ = payload.extend_from_slice(&[ConfigSection::KeyMapping as u8, index as u8]);
        let _ = mapping.write_to(&mut payload);
        let _ = reply.push(payload);
    }

    let mut payload = ConfigPayload::new();
    let _ = payload.push(ConfigSection::EncoderConfig as u8);
    let _ = payload.extend_from_slice(&config.encoder.to_bytes());
    let _ = reply.push(payload);

    let mut payload = ConfigPayload::new();
    let _ = payload.push(ConfigSection::DeviceSettings as u8);
    let _ = payload.extend_from_slice(&config.settings_bytes());
    let _ = reply.push(payload);

    reply
}

/// [`HostHandler`] that applies commands to a [`DeviceConfig`] and persists them.
///
/// Persistence failures are logged, the in-memory config is updated regardless.
pub struct ConfigCommandHandler<S: ConfigStore> {
    store: S,
    config: DeviceConfig,
}

impl<S: ConfigStore> ConfigCommandHandler<S> {
    /// Load the config from `store`, initializing it on first boot
    pub fn new(mut store: S) -> Self {
        let config = match store.load_or_init() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config: {:?}, using defaults", e);
                DeviceConfig::default()
            }
        };
        Self { store, config }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn live_settings(&self) -> LiveSettings {
        LiveSettings::from_config(&self.config)
    }

    fn apply(&self) -> HostAction {
        HostAction::Apply(self.live_settings())
    }

    /// Clamped to at least 1
    fn set_sensitivity(&mut self, sensitivity: u8) {
        let sensitivity = sensitivity.max(1);
        self.config.encoder_sensitivity = sensitivity;
        self.config.encoder.sensitivity = sensitivity;
    }

    fn set_encoder(&mut self, encoder: EncoderConfig) {
        self.config.encoder = encoder;
        self.set_sensitivity(encoder.sensitivity);
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.config) {
            error!("Failed to save config: {:?}", e);
        }
    }

    /// `[index, type, keyCode, modifiers, macroLen, macro...]`
    fn set_key_mapping(&mut self, data: &[u8]) -> HostAction {
        let Some((&index, rest)) = data.split_first() else {
            return HostAction::None;
        };
        let index = index as usize;
        if index >= NUM_KEYS {
            debug!("Ignoring key mapping for key {}", index);
            return HostAction::None;
        }
        let Some((mapping, _)) = KeyMapping::parse(rest) else {
            debug!("Malformed key mapping for key {}", index);
            return HostAction::None;
        };
        if let Err(e) = self.store.save_key_mapping(index, &mapping) {
            error!("Failed to save key mapping: {:?}", e);
        }
        self.config.key_mappings[index] = mapping;
        HostAction::None
    }

    fn set_encoder_config(&mut self, data: &[u8]) -> HostAction {
        let Some(encoder) = EncoderConfig::from_bytes(data) else {
            debug!("Malformed encoder config");
            return HostAction::None;
        };
        self.set_encoder(encoder);
        if let Err(e) = self.store.save_encoder_config(&self.config.encoder) {
            error!("Failed to save encoder config: {:?}", e);
        }
        self.apply()
    }

    /// `[nameLen, name..., NUM_KEYS key mappings, encoder config]`, applied all or nothing
    fn sync_profile(&mut self, args: &[u8]) -> HostAction {
        let Some((&name_len, rest)) = args.split_first() else {
            return HostAction::None;
        };
        // The profile name only labels the profile on the host
        let Some(mut rest) = rest.get(name_len as usize..) else {
            debug!("Truncated profile name");
            return HostAction::None;
        };

        let mut mappings: Vec<KeyMapping, NUM_KEYS> = Vec::new();
        for index in 0..NUM_KEYS {
            let Some((mapping, used)) = KeyMapping::parse(rest) else {
                debug!("Malformed profile mapping for key {}", index);
                return HostAction::None;
            };
            let _ = mappings.push(mapping);
            rest = &rest[used..];
        }
        let Some(encoder) = EncoderConfig::from_bytes(rest) else {
            debug!("Malformed profile encoder config");
            return HostAction::None;
        };

        for (slot, mapping) in self.config.key_mappings.iter_mut().zip(mappings) {
            *slot = mapping;
        }
        self.set_encoder(encoder);
        self.persist();
        info!("Profile synced");
        self.apply()
    }
}

impl<S: ConfigStore> HostHandler for ConfigCommandHandler<S> {
    fn on_command(&mut self, code: u8, args: &[u8]) -> HostAction {
        let Some(command) = CommandCode::from_repr(code) else {
            debug!("Unknown command {:#x}", code);
            return HostAction::None;
        };
        debug!("Host command {:?}", command);

        match command {
            CommandCode::FactoryReset => {
                if let Err(e) = self.store.factory_reset() {
                    error!("Factory reset failed: {:?}", e);
                }
                self.config = DeviceConfig::default();
                info!("Factory reset");
                self.apply()
            }
            CommandCode::SetDeviceName => {
                let Ok(name) = core::str::from_utf8(args) else {
                    debug!("Device name is not utf-8");
                    return HostAction::None;
                };
                if name.is_empty() {
                    return HostAction::None;
                }
                self.config.set_device_name(name);
                if let Err(e) = self.store.save_device_name(self.config.device_name.as_str()) {
                    error!("Failed to save device name: {:?}", e);
                }
                HostAction::None
            }
            CommandCode::SetDebounce => {
                let &[high, low, ..] = args else {
                    return HostAction::None;
                };
                self.config.debounce_ms = u16::from_be_bytes([high, low]);
                if let Err(e) = self.store.save_debounce_ms(self.config.debounce_ms) {
                    error!("Failed to save debounce: {:?}", e);
                }
                self.apply()
            }
            CommandCode::SetEncoderSensitivity => {
                let &[sensitivity, ..] = args else {
                    return HostAction::None;
                };
                self.set_sensitivity(sensitivity);
                self.persist();
                self.apply()
            }
            CommandCode::SetSleepTimeout => {
                let &[b0, b1, b2, b3, ..] = args else {
                    return HostAction::None;
                };
                self.config.sleep_timeout_ms = u32::from_be_bytes([b0, b1, b2, b3]);
                if let Err(e) = self.store.save_sleep_timeout(self.config.sleep_timeout_ms) {
                    error!("Failed to save sleep timeout: {:?}", e);
                }
                HostAction::None
            }
            CommandCode::SaveConfig => {
                self.persist();
                HostAction::None
            }
            CommandCode::RequestConfig => HostAction::Reply(config_reply(&self.config)),
            CommandCode::SetKeyMap => self.set_key_mapping(args),
            CommandCode::SetEncoderMode => self.set_encoder_config(args),
            CommandCode::SyncProfile => self.sync_profile(args),
        }
    }

    fn on_config(&mut self, section: u8, data: &[u8]) -> HostAction {
        match ConfigSection::from_repr(section) {
            Some(ConfigSection::KeyMapping) => self.set_key_mapping(data),
            Some(ConfigSection::EncoderConfig) => self.set_encoder_config(data),
            Some(ConfigSection::DeviceSettings) => {
                if !self.config.apply_settings_bytes(data) {
                    debug!("Malformed device settings");
                    return HostAction::None;
                }
                let sensitivity = self.config.encoder_sensitivity;
                self.set_sensitivity(sensitivity);
                self.persist();
                self.apply()
            }
            None => {
                debug!("Unknown config section {:#x}", section);
                HostAction::None
            }
        }
    }
}
