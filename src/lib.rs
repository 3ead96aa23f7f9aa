//! Adapter between an audio framework expecting a fixed stereo 16-bit
//! PCM contract and USB audio devices with variable channel counts, bit
//! depths and rates. Capability negotiation, in-place buffer conversion
//! and stream lifecycle live here; the PCM transport itself sits behind
//! the [`transport::Transport`] seam.

pub mod config;
pub mod convert;
pub mod device;
pub mod error;
pub mod params;
pub mod resolver;
pub mod session;
pub mod stream;
pub mod transport;

#[cfg(target_os = "linux")]
pub mod alsa;

pub use config::{DeviceConfig, DeviceOptions, SampleFormat, StreamConfig, UnknownFormatPolicy};
pub use device::UsbAudioDevice;
pub use error::{Error, Result};
pub use session::DeviceSession;
pub use stream::{InputStream, OutputStream};
pub use transport::{CapabilitySet, Direction, ParamRange, Transport, TransportStream};
