use crate::config::{DeviceConfig, DeviceOptions, SampleFormat, StreamConfig};
use crate::error::{Error, Result};
use crate::session::DeviceSession;
use crate::stream::{InputStream, OutputStream};
use crate::transport::Transport;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Per-direction card/device routing. Coordinates start unrouted (-1)
/// until the framework pushes them through `set_parameters`.
#[derive(Debug, Clone, Copy)]
pub struct Routing {
    pub out_card: i32,
    pub out_device: i32,
    pub in_card: i32,
    pub in_device: i32,
}

impl Default for Routing {
    fn default() -> Self {
        Self {
            out_card: -1,
            out_device: -1,
            in_card: -1,
            in_device: -1,
        }
    }
}

/// The device controller: owns routing for both directions, the shared
/// session config, and stream construction.
///
/// NOTE: when a device-wide lock and a stream lock have to be acquired
/// together, always take the device-wide lock first and release it last.
/// Every dual-lock path in this crate follows that order.
pub struct UsbAudioDevice {
    transport: Arc<dyn Transport>,
    options: DeviceOptions,
    session: Arc<DeviceSession>,
    routing: Mutex<Routing>,
}

impl UsbAudioDevice {
    pub fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        Self::with_options(transport, DeviceOptions::default())
    }

    pub fn with_options(transport: Arc<dyn Transport>, options: DeviceOptions) -> Arc<Self> {
        Arc::new(Self {
            transport,
            options,
            session: Arc::new(DeviceSession::new()),
            routing: Mutex::new(Routing::default()),
        })
    }

    /// Build an output stream and the boundary configuration it will
    /// advertise. The boundary is clamped to stereo 16-bit no matter what
    /// the session config says; only the sample rate leaks through. At
    /// most one output stream should be live at a time: they all share
    /// the one session slot.
    pub fn open_output_stream(self: &Arc<Self>) -> Result<(OutputStream, StreamConfig)> {
        let _routing = self.lock_routing();

        let effective = match self.session.read() {
            Some(config) => StreamConfig {
                sample_rate: config.rate,
                channels: 2,
                format: SampleFormat::S16Le,
            },
            None => {
                let config = DeviceConfig::default_output();
                self.session.update(config);
                StreamConfig {
                    sample_rate: config.rate,
                    channels: 2,
                    format: SampleFormat::S16Le,
                }
            }
        };
        debug!(
            "opening output stream, boundary rate:{} channels:{}",
            effective.sample_rate, effective.channels
        );

        Ok((OutputStream::new(Arc::clone(self)), effective))
    }

    pub fn close_output_stream(&self, stream: OutputStream) {
        stream.standby();
    }

    /// Build an input stream around a per-instance config: the input
    /// default with the rate overridden by `requested_rate` when nonzero.
    pub fn open_input_stream(
        self: &Arc<Self>,
        requested_rate: u32,
    ) -> Result<(InputStream, StreamConfig)> {
        let mut config = DeviceConfig::default_input();
        if requested_rate != 0 {
            config.rate = requested_rate;
        }
        debug!("opening input stream, rate:{}", config.rate);

        let effective = StreamConfig {
            sample_rate: config.rate,
            channels: if config.channels == 2 { 2 } else { 1 },
            format: SampleFormat::S16Le,
        };

        Ok((InputStream::new(Arc::clone(self), config), effective))
    }

    pub fn close_input_stream(&self, stream: InputStream) {
        stream.standby();
    }

    /// Drops the session config; streams fall back to defaults until the
    /// next routing change repopulates it.
    pub fn shutdown(&self) {
        self.session.invalidate();
    }

    pub fn init_check(&self) -> Result<()> {
        Ok(())
    }

    pub fn set_parameters(&self, _kvpairs: &str) -> Result<()> {
        Ok(())
    }

    pub fn get_parameters(&self, _keys: &str) -> String {
        String::new()
    }

    pub fn input_buffer_size(&self, _config: &StreamConfig) -> usize {
        0
    }

    pub fn set_mode(&self, _mode: i32) -> Result<()> {
        Ok(())
    }

    pub fn set_voice_volume(&self, _volume: f32) -> Result<()> {
        Err(Error::Unsupported)
    }

    pub fn set_master_volume(&self, _volume: f32) -> Result<()> {
        Err(Error::Unsupported)
    }

    pub fn set_mic_mute(&self, _muted: bool) -> Result<()> {
        Err(Error::Unsupported)
    }

    pub fn mic_mute(&self) -> Result<bool> {
        Err(Error::Unsupported)
    }

    pub(crate) fn lock_routing(&self) -> MutexGuard<'_, Routing> {
        self.routing.lock().expect("device lock poisoned")
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) fn session(&self) -> &DeviceSession {
        &self.session
    }

    pub(crate) fn options(&self) -> DeviceOptions {
        self.options
    }
}

impl Drop for UsbAudioDevice {
    fn drop(&mut self) {
        self.session.invalidate();
    }
}
