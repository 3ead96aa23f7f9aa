use super::output::supported_parameters;
use crate::config::{DeviceConfig, SampleFormat};
use crate::device::UsbAudioDevice;
use crate::error::{Error, Result};
use crate::params::{PARAM_CARD, PARAM_DEVICE, Params};
use crate::resolver::resolve_device_config;
use crate::transport::{Direction, TransportStream};
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

/// Capture stream. Unlike the output side it owns a per-instance device
/// config seeded at construction, not the shared session slot.
pub struct InputStream {
    dev: Arc<UsbAudioDevice>,
    state: Mutex<InputState>,
}

struct InputState {
    pcm: Option<Box<dyn TransportStream>>,
    config: DeviceConfig,
}

impl InputStream {
    pub(crate) fn new(dev: Arc<UsbAudioDevice>, config: DeviceConfig) -> Self {
        Self {
            dev,
            state: Mutex::new(InputState { pcm: None, config }),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.lock_state().config.rate
    }

    /// One period's worth of bytes at the advertised frame size.
    pub fn buffer_size(&self) -> usize {
        let state = self.lock_state();
        state.config.period_size as usize * self.advertised_frame_bytes(&state.config)
    }

    pub fn channels(&self) -> u32 {
        if self.lock_state().config.channels == 2 {
            2
        } else {
            1
        }
    }

    /// Always 16-bit PCM at the boundary.
    pub fn format(&self) -> SampleFormat {
        SampleFormat::S16Le
    }

    /// Read one transfer from the device.
    ///
    /// Activates the transport on first use. Every failure mode (activation
    /// refused, transport error mid-read) reports zero bytes consumed; the
    /// caller cannot distinguish "no data yet" from "device gone".
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let routing = self.dev.lock_routing();
        let mut state = self.lock_state();

        if state.pcm.is_none() {
            let opened = self.dev.transport().open(
                routing.in_card,
                routing.in_device,
                Direction::Input,
                &state.config,
            );
            match opened {
                Ok(pcm) if pcm.is_ready() => {
                    debug!(
                        "starting input stream on card:{} device:{}",
                        routing.in_card, routing.in_device
                    );
                    state.pcm = Some(pcm);
                }
                Ok(_) => {
                    error!("input device opened but not ready");
                    return Ok(0);
                }
                Err(err) => {
                    error!("input stream activation failed: {err}");
                    return Ok(0);
                }
            }
        }

        let Some(pcm) = state.pcm.as_mut() else {
            return Ok(0);
        };
        match pcm.read(buf) {
            Ok(n) => Ok(n),
            Err(err) => {
                debug!("pcm read failed: {err}");
                Ok(0)
            }
        }
    }

    /// Close the transport and return to standby. Idempotent.
    pub fn standby(&self) {
        let _routing = self.dev.lock_routing();
        let mut state = self.lock_state();
        if state.pcm.take().is_some() {
            debug!("input stream back to standby");
        }
    }

    /// Routing keys `card` and `device`. Whenever both coordinates are
    /// non-negative afterwards, the device is re-probed into this
    /// stream's own config, replacing the construction-time seed.
    pub fn set_parameters(&self, kvpairs: &str) -> Result<()> {
        debug!("input set_parameters: {kvpairs}");
        let parms = Params::parse(kvpairs);

        let mut routing = self.dev.lock_routing();
        if let Some(card) = parms.get_i32(PARAM_CARD) {
            routing.in_card = card;
        }
        if let Some(device) = parms.get_i32(PARAM_DEVICE) {
            routing.in_device = device;
        }

        if routing.in_card >= 0 && routing.in_device >= 0 {
            let config = resolve_device_config(
                self.dev.transport(),
                routing.in_card,
                routing.in_device,
                Direction::Input,
            )?;
            self.lock_state().config = config;
        }

        Ok(())
    }

    pub fn get_parameters(&self, keys: &str) -> String {
        let routing = self.dev.lock_routing();
        supported_parameters(
            &self.dev,
            keys,
            routing.in_card,
            routing.in_device,
            Direction::Input,
        )
    }

    pub fn set_sample_rate(&self, _rate: u32) -> Result<()> {
        Err(Error::Unsupported)
    }

    pub fn set_format(&self, _format: SampleFormat) -> Result<()> {
        Err(Error::Unsupported)
    }

    pub fn set_gain(&self, _gain: f32) -> Result<()> {
        Ok(())
    }

    pub fn frames_lost(&self) -> u32 {
        0
    }

    fn advertised_frame_bytes(&self, config: &DeviceConfig) -> usize {
        let channels = if config.channels == 2 { 2 } else { 1 };
        channels * SampleFormat::S16Le.bytes_per_sample()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, InputState> {
        self.state.lock().expect("input stream lock poisoned")
    }
}
