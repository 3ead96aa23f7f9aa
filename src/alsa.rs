//! ALSA-backed transport for Linux hosts. Card/device coordinates map to
//! `hw:CARD,DEV` PCM names; capability ranges come from an unconfigured
//! `HwParams` space, with sample-bit ranges probed by attempting each
//! known format.

use crate::config::{DeviceConfig, FORMAT_SCAN_ORDER, SampleFormat};
use crate::error::{Error, Result};
use crate::transport::{CapabilitySet, Direction, ParamRange, Transport, TransportStream};
use alsa::pcm::{Access, Format, HwParams, PCM, State};
use alsa::{Direction as AlsaDirection, ValueOr};
use std::io::{Read, Write};
use tracing::debug;

#[derive(Debug, Default)]
pub struct AlsaTransport;

impl AlsaTransport {
    pub fn new() -> Self {
        Self
    }
}

fn pcm_name(card: i32, device: i32) -> String {
    format!("hw:{card},{device}")
}

fn alsa_direction(direction: Direction) -> AlsaDirection {
    match direction {
        Direction::Output => AlsaDirection::Playback,
        Direction::Input => AlsaDirection::Capture,
    }
}

fn alsa_format(format: SampleFormat) -> Format {
    match format {
        SampleFormat::S8 => Format::S8,
        SampleFormat::S16Le => Format::S16LE,
        SampleFormat::S24Le3 => Format::S243LE,
        SampleFormat::S32Le => Format::S32LE,
    }
}

impl Transport for AlsaTransport {
    fn query_capabilities(
        &self,
        card: i32,
        device: i32,
        direction: Direction,
    ) -> Option<CapabilitySet> {
        if card < 0 || device < 0 {
            return None;
        }
        let name = pcm_name(card, device);
        let pcm = PCM::new(&name, alsa_direction(direction), true).ok()?;

        let (rate, channels, periods) = {
            let hwp = HwParams::any(&pcm).ok()?;
            hwp.set_access(Access::RWInterleaved).ok()?;
            (
                ParamRange::new(hwp.get_rate_min().ok()?, hwp.get_rate_max().ok()?),
                ParamRange::new(hwp.get_channels_min().ok()?, hwp.get_channels_max().ok()?),
                ParamRange::new(hwp.get_periods_min().ok()?, hwp.get_periods_max().ok()?),
            )
        };
        let sample_bits = probe_sample_bits(&pcm)?;

        debug!(
            "{name}: rate {}..{}, channels {}..{}, bits {}..{}, periods {}..{}",
            rate.min,
            rate.max,
            channels.min,
            channels.max,
            sample_bits.min,
            sample_bits.max,
            periods.min,
            periods.max
        );
        Some(CapabilitySet {
            rate,
            channels,
            sample_bits,
            periods,
        })
    }

    fn open(
        &self,
        card: i32,
        device: i32,
        direction: Direction,
        config: &DeviceConfig,
    ) -> Result<Box<dyn TransportStream>> {
        if card < 0 || device < 0 {
            return Err(Error::InvalidArgument(format!(
                "card:{card} device:{device}"
            )));
        }
        let name = pcm_name(card, device);
        let pcm = PCM::new(&name, alsa_direction(direction), false)
            .map_err(|e| Error::DeviceOpenFailed(format!("{name}: {e}")))?;
        configure_pcm(&pcm, config).map_err(|e| Error::DeviceOpenFailed(format!("{name}: {e}")))?;
        Ok(Box::new(AlsaStream { pcm }))
    }
}

/// The bit widths a device accepts, probed one format at a time on a
/// fresh parameter space so the attempts do not constrain each other.
fn probe_sample_bits(pcm: &PCM) -> Option<ParamRange> {
    let mut min = u32::MAX;
    let mut max = 0;
    for format in FORMAT_SCAN_ORDER {
        let Ok(hwp) = HwParams::any(pcm) else {
            continue;
        };
        if hwp.set_access(Access::RWInterleaved).is_err() {
            continue;
        }
        if hwp.set_format(alsa_format(format)).is_ok() {
            min = min.min(format.bits());
            max = max.max(format.bits());
        }
    }
    (max > 0).then(|| ParamRange::new(min, max))
}

fn configure_pcm(pcm: &PCM, config: &DeviceConfig) -> std::result::Result<(), String> {
    let hwp = HwParams::any(pcm).map_err(|e| e.to_string())?;
    hwp.set_access(Access::RWInterleaved)
        .map_err(|e| e.to_string())?;
    hwp.set_format(alsa_format(config.format))
        .map_err(|e| e.to_string())?;
    hwp.set_channels(config.channels).map_err(|e| e.to_string())?;
    hwp.set_rate(config.rate, ValueOr::Nearest)
        .map_err(|e| e.to_string())?;
    hwp.set_period_size_near(config.period_size as i64, ValueOr::Nearest)
        .map_err(|e| e.to_string())?;
    hwp.set_buffer_size_near((config.period_size * config.period_count) as i64)
        .map_err(|e| e.to_string())?;
    pcm.hw_params(&hwp).map_err(|e| e.to_string())?;

    let swp = pcm.sw_params_current().map_err(|e| e.to_string())?;
    let cur = pcm.hw_params_current().map_err(|e| e.to_string())?;
    let buffer = cur.get_buffer_size().map_err(|e| e.to_string())?;
    let period = cur.get_period_size().map_err(|e| e.to_string())?;
    swp.set_start_threshold(buffer.saturating_sub(period))
        .map_err(|e| e.to_string())?;
    swp.set_avail_min(period).map_err(|e| e.to_string())?;
    pcm.sw_params(&swp).map_err(|e| e.to_string())?;
    pcm.prepare().map_err(|e| e.to_string())?;
    Ok(())
}

struct AlsaStream {
    pcm: PCM,
}

impl TransportStream for AlsaStream {
    fn is_ready(&self) -> bool {
        self.pcm.state() != State::Disconnected
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        let mut io = self.pcm.io_bytes();
        if let Err(err) = io.write_all(buf) {
            if self.pcm.state() == State::XRun {
                let _ = self.pcm.prepare();
            }
            return Err(Error::Transport(format!("write failed: {err}")));
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut io = self.pcm.io_bytes();
        match io.read(buf) {
            Ok(n) => Ok(n),
            Err(err) => {
                if self.pcm.state() == State::XRun {
                    let _ = self.pcm.prepare();
                }
                Err(Error::Transport(format!("read failed: {err}")))
            }
        }
    }
}
