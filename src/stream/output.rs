use super::alloc_buffer;
use crate::config::{DeviceConfig, SampleFormat, UnknownFormatPolicy};
use crate::convert;
use crate::device::{Routing, UsbAudioDevice};
use crate::error::{Error, Result};
use crate::params::{
    self, PARAM_CARD, PARAM_DEVICE, PARAM_SUP_CHANNELS, PARAM_SUP_FORMATS,
    PARAM_SUP_SAMPLING_RATES, Params,
};
use crate::resolver::resolve_device_config;
use crate::transport::{Direction, TransportStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

/// Boundary frames are always stereo 16-bit, 4 bytes.
const FRAME_BYTES: usize = 4;

/// Playback stream presenting the fixed stereo 16-bit contract. Standby
/// (no transport handle) until the first write; `standby()` returns it
/// there. Conversion to the negotiated device format happens on every
/// transfer.
pub struct OutputStream {
    dev: Arc<UsbAudioDevice>,
    state: Mutex<OutputState>,
}

#[derive(Default)]
struct OutputState {
    pcm: Option<Box<dyn TransportStream>>,
    conversion: Vec<u8>,
}

impl OutputStream {
    pub(crate) fn new(dev: Arc<UsbAudioDevice>) -> Self {
        Self {
            dev,
            state: Mutex::new(OutputState::default()),
        }
    }

    /// Always reports the session rate (default until a device has been
    /// routed), like every other per-stream figure below: all output
    /// streams reflect the one shared session config.
    pub fn sample_rate(&self) -> u32 {
        self.session_config().rate
    }

    /// One period's worth of boundary-format bytes.
    pub fn buffer_size(&self) -> usize {
        self.session_config().period_size as usize * FRAME_BYTES
    }

    /// Always stereo, regardless of the negotiated device channel count.
    pub fn channels(&self) -> u32 {
        2
    }

    /// Always 16-bit PCM, regardless of the negotiated device format.
    pub fn format(&self) -> SampleFormat {
        SampleFormat::S16Le
    }

    pub fn latency_ms(&self) -> u32 {
        let config = self.session_config();
        config.period_size * config.period_count * 1000 / config.rate
    }

    /// Write one transfer of boundary-format audio.
    ///
    /// Activates the transport on the first call after construction or
    /// standby. When activation fails the stream stays in standby, but
    /// the call still reports the full byte count as consumed and sleeps
    /// for the playback duration of the dropped bytes, so the caller
    /// paces as if the audio had been rendered.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let routing = self.dev.lock_routing();
        let mut state = self.state.lock().expect("output stream lock poisoned");

        if state.pcm.is_none() {
            if let Err(err) = self.activate(&routing, &mut state) {
                error!("output stream activation failed: {err}");
                drop(state);
                drop(routing);
                self.pace_dropped(data.len());
                return Ok(data.len());
            }
        }

        let config = self.session_config();
        let state = &mut *state;
        let mut len = data.len();
        let mut staged = false;

        if config.channels == 4 {
            stage(&mut state.conversion, data, &mut staged)?;
            len = convert::expand_stereo16_to_quad16(&mut state.conversion, len);
        }

        match config.format {
            SampleFormat::S16Le => {}
            SampleFormat::S24Le3 => {
                stage(&mut state.conversion, data, &mut staged)?;
                len = convert::widen_16_to_24_3(&mut state.conversion, len);
            }
            other => match self.dev.options().unknown_format {
                UnknownFormatPolicy::Passthrough => {
                    debug!("no conversion path to {other:?}, passing boundary bytes through");
                }
                UnknownFormatPolicy::Strict => return Err(Error::Unsupported),
            },
        }

        let write_buf = if staged { &state.conversion[..len] } else { data };
        if !write_buf.is_empty() {
            if let Some(pcm) = state.pcm.as_mut() {
                if let Err(err) = pcm.write(write_buf) {
                    // Swallowed: an active stream never propagates
                    // per-transfer transport failures.
                    debug!("pcm write failed: {err}");
                }
            }
        }

        Ok(data.len())
    }

    /// Close the transport and return to standby. Idempotent.
    pub fn standby(&self) {
        let _routing = self.dev.lock_routing();
        let mut state = self.state.lock().expect("output stream lock poisoned");
        if state.pcm.take().is_some() {
            debug!("output stream back to standby");
        }
    }

    /// Routing keys `card` and `device`. Once both coordinates are
    /// non-negative the device is re-probed and the session config
    /// replaced; a failed probe drops the session entry instead.
    pub fn set_parameters(&self, kvpairs: &str) -> Result<()> {
        debug!("output set_parameters: {kvpairs}");
        let parms = Params::parse(kvpairs);

        let mut routing = self.dev.lock_routing();
        let mut recache = false;
        if let Some(card) = parms.get_i32(PARAM_CARD) {
            routing.out_card = card;
            recache = true;
        }
        if let Some(device) = parms.get_i32(PARAM_DEVICE) {
            routing.out_device = device;
            recache = true;
        }

        if recache && routing.out_card >= 0 && routing.out_device >= 0 {
            match resolve_device_config(
                self.dev.transport(),
                routing.out_card,
                routing.out_device,
                Direction::Output,
            ) {
                Ok(config) => self.dev.session().update(config),
                Err(err) => {
                    self.dev.session().invalidate();
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    /// Answers `sup_sampling_rates`, `sup_channels` and `sup_formats`
    /// from a live capability query of the routed device.
    pub fn get_parameters(&self, keys: &str) -> String {
        let routing = self.dev.lock_routing();
        supported_parameters(
            &self.dev,
            keys,
            routing.out_card,
            routing.out_device,
            Direction::Output,
        )
    }

    pub fn set_sample_rate(&self, _rate: u32) -> Result<()> {
        Ok(())
    }

    pub fn set_format(&self, _format: SampleFormat) -> Result<()> {
        Ok(())
    }

    pub fn set_volume(&self, _left: f32, _right: f32) -> Result<()> {
        Err(Error::Unsupported)
    }

    pub fn render_position(&self) -> Result<u32> {
        Err(Error::Unsupported)
    }

    pub fn next_write_timestamp(&self) -> Result<i64> {
        Err(Error::Unsupported)
    }

    /// Must hold the device-wide lock and the stream lock.
    fn activate(&self, routing: &Routing, state: &mut OutputState) -> Result<()> {
        let session = self.dev.session();
        let config = match session.read() {
            Some(config) => config,
            None => {
                let config = DeviceConfig::default_output();
                session.update(config);
                config
            }
        };

        debug!(
            "starting output stream on card:{} device:{}",
            routing.out_card, routing.out_device
        );
        let pcm = self.dev.transport().open(
            routing.out_card,
            routing.out_device,
            Direction::Output,
            &config,
        )?;
        if !pcm.is_ready() {
            return Err(Error::DeviceOpenFailed("device not ready".into()));
        }

        // Worst case one period can grow to: x2 stereo->quad, then x3/2
        // widening to 24-bit.
        let needed = config.period_size as usize * FRAME_BYTES * 3;
        if state.conversion.len() != needed {
            state.conversion = alloc_buffer(needed)?;
        }

        state.pcm = Some(pcm);
        Ok(())
    }

    fn session_config(&self) -> DeviceConfig {
        self.dev
            .session()
            .read()
            .unwrap_or_else(DeviceConfig::default_output)
    }

    /// Emulate the real-time cost of the bytes we just dropped so the
    /// caller does not spin on a dead device.
    fn pace_dropped(&self, bytes: usize) {
        let rate = self.sample_rate().max(1) as u64;
        let micros = bytes as u64 * 1_000_000 / FRAME_BYTES as u64 / rate;
        thread::sleep(Duration::from_micros(micros));
    }
}

/// Copy the transfer into the conversion buffer once, growing it if this
/// transfer is larger than the period the buffer was sized for.
fn stage(conversion: &mut Vec<u8>, data: &[u8], staged: &mut bool) -> Result<()> {
    if *staged {
        return Ok(());
    }
    let needed = data.len() * 3;
    if conversion.len() < needed {
        *conversion = alloc_buffer(needed)?;
    }
    conversion[..data.len()].copy_from_slice(data);
    *staged = true;
    Ok(())
}

/// Shared by both stream directions; the caller passes its own routing
/// coordinates while holding the device-wide lock.
pub(super) fn supported_parameters(
    dev: &UsbAudioDevice,
    keys: &str,
    card: i32,
    device: i32,
    direction: Direction,
) -> String {
    let query = Params::parse(keys);
    let Some(caps) = dev.transport().query_capabilities(card, device, direction) else {
        return String::new();
    };

    let mut result = Params::new();
    if query.has_key(PARAM_SUP_SAMPLING_RATES) {
        result.add(PARAM_SUP_SAMPLING_RATES, params::format_range(caps.rate));
    }
    if query.has_key(PARAM_SUP_CHANNELS) {
        result.add(PARAM_SUP_CHANNELS, params::format_range(caps.channels));
    }
    if query.has_key(PARAM_SUP_FORMATS) {
        result.add(PARAM_SUP_FORMATS, params::format_range(caps.sample_bits));
    }
    result.encode()
}
