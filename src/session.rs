use crate::config::DeviceConfig;
use std::sync::Mutex;

/// The one negotiated output configuration shared by every output stream
/// of a device controller. A single slot, last writer wins: switching the
/// routed card/device mid-session overwrites the previous entry entirely.
/// Owned by the controller and handed to streams by `Arc`, so nothing
/// here is process-global.
#[derive(Debug, Default)]
pub struct DeviceSession {
    config: Mutex<Option<DeviceConfig>>,
}

impl DeviceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&self) {
        *self.config.lock().expect("session lock poisoned") = None;
    }

    /// Unconditional overwrite, no merge.
    pub fn update(&self, config: DeviceConfig) {
        *self.config.lock().expect("session lock poisoned") = Some(config);
    }

    pub fn read(&self) -> Option<DeviceConfig> {
        *self.config.lock().expect("session lock poisoned")
    }
}
