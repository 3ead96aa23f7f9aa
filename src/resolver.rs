use crate::config::{DeviceConfig, SampleFormat};
use crate::error::{Error, Result};
use crate::transport::{Direction, Transport};
use tracing::debug;

/// Reduce a device's reported capability ranges to one concrete
/// configuration.
///
/// The reduction is deliberately asymmetric: rate and channel count take
/// the reported minimum, while period_size takes the PERIODS maximum and
/// period_count the PERIODS minimum. Devices in the field were qualified
/// against exactly this reduction; do not "fix" it.
pub fn resolve_device_config(
    transport: &dyn Transport,
    card: i32,
    device: i32,
    direction: Direction,
) -> Result<DeviceConfig> {
    debug!("resolving device config for card:{card} device:{device} ({direction:?})");

    if card < 0 || device < 0 {
        return Err(Error::InvalidArgument(format!(
            "card:{card} device:{device}"
        )));
    }

    let caps = transport
        .query_capabilities(card, device, direction)
        .ok_or(Error::DeviceUnavailable { card, device })?;

    Ok(DeviceConfig {
        channels: caps.channels.min,
        rate: caps.rate.min,
        period_size: caps.periods.max,
        period_count: caps.periods.min,
        format: SampleFormat::from_bits(caps.sample_bits.min),
    })
}
