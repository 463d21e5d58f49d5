//! Input device selection: hardware scoring with a blacklist of virtual
//! bridge devices, but no device-hotplug monitor or ALSA/PipeWire
//! candidate-fallback ladder. The capture service asks for exactly one
//! named device (or the system default) and fails fast rather than
//! iterating through a ladder.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use pushtalk_foundation::AudioError;

pub struct DeviceManager {
    host: Host,
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn enumerate_input_names(&self) -> Vec<String> {
        self.host
            .input_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }

    /// Opens the named device, or the host's default input device if
    /// `name` is `None`. An explicitly named device that cannot be found is
    /// an error — this component never silently substitutes another
    /// device for one the caller asked for by name.
    pub fn open(&self, name: Option<&str>) -> Result<Device, AudioError> {
        match name {
            Some(requested) => self
                .host
                .input_devices()
                .ok()
                .and_then(|mut devices| devices.find(|d| d.name().as_deref() == Ok(requested)))
                .ok_or_else(|| AudioError::DeviceNotFound {
                    name: Some(requested.to_string()),
                }),
            None => self
                .host
                .default_input_device()
                .ok_or(AudioError::DeviceNotFound { name: None }),
        }
    }
}
