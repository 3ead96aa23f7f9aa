//! Seam between the adapter and the low-level PCM transport. Concrete
//! backends implement [`Transport`]; the Linux build ships an ALSA-backed
//! one in [`crate::alsa`].

use crate::config::DeviceConfig;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Output,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamRange {
    pub min: u32,
    pub max: u32,
}

impl ParamRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

/// Min/max parameter ranges a device reports as supported for one
/// direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    pub rate: ParamRange,
    pub channels: ParamRange,
    pub sample_bits: ParamRange,
    pub periods: ParamRange,
}

/// An open PCM handle. Dropping the handle closes the device.
pub trait TransportStream: Send {
    fn is_ready(&self) -> bool;

    /// Blocks until the whole buffer has been handed to the hardware.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Blocks until data is available; returns the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

pub trait Transport: Send + Sync {
    /// `None` when the coordinates do not name a usable PCM device.
    fn query_capabilities(
        &self,
        card: i32,
        device: i32,
        direction: Direction,
    ) -> Option<CapabilitySet>;

    fn open(
        &self,
        card: i32,
        device: i32,
        direction: Direction,
        config: &DeviceConfig,
    ) -> Result<Box<dyn TransportStream>>;
}
