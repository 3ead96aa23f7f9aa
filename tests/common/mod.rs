#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use usb_audio_hal::{
    CapabilitySet, DeviceConfig, Direction, Error, ParamRange, Result, Transport, TransportStream,
};

pub fn caps(
    rate: (u32, u32),
    channels: (u32, u32),
    bits: (u32, u32),
    periods: (u32, u32),
) -> CapabilitySet {
    CapabilitySet {
        rate: ParamRange::new(rate.0, rate.1),
        channels: ParamRange::new(channels.0, channels.1),
        sample_bits: ParamRange::new(bits.0, bits.1),
        periods: ParamRange::new(periods.0, periods.1),
    }
}

/// Scripted transport: capability sets per (card, device, direction),
/// optional open rejection and read failure, and a record of every open
/// and every buffer written.
#[derive(Default)]
pub struct MockTransport {
    caps: Mutex<HashMap<(i32, i32, Direction), CapabilitySet>>,
    reject_open: AtomicBool,
    fail_reads: Arc<AtomicBool>,
    opens: AtomicUsize,
    opened_configs: Mutex<Vec<DeviceConfig>>,
    written: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_caps(&self, card: i32, device: i32, direction: Direction, set: CapabilitySet) {
        self.caps
            .lock()
            .unwrap()
            .insert((card, device, direction), set);
    }

    pub fn reject_opens(&self, reject: bool) {
        self.reject_open.store(reject, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn opened_configs(&self) -> Vec<DeviceConfig> {
        self.opened_configs.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.written.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn query_capabilities(
        &self,
        card: i32,
        device: i32,
        direction: Direction,
    ) -> Option<CapabilitySet> {
        self.caps
            .lock()
            .unwrap()
            .get(&(card, device, direction))
            .copied()
    }

    fn open(
        &self,
        card: i32,
        device: i32,
        _direction: Direction,
        config: &DeviceConfig,
    ) -> Result<Box<dyn TransportStream>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.reject_open.load(Ordering::SeqCst) {
            return Err(Error::DeviceOpenFailed(format!(
                "hw:{card},{device} rejected"
            )));
        }
        self.opened_configs.lock().unwrap().push(*config);
        Ok(Box::new(MockStream {
            sink: Arc::clone(&self.written),
            fail_reads: Arc::clone(&self.fail_reads),
        }))
    }
}

struct MockStream {
    sink: Arc<Mutex<Vec<Vec<u8>>>>,
    fail_reads: Arc<AtomicBool>,
}

impl TransportStream for MockStream {
    fn is_ready(&self) -> bool {
        true
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.sink.lock().unwrap().push(buf.to_vec());
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Transport("scripted read failure".into()));
        }
        buf.fill(0x5a);
        Ok(buf.len())
    }
}
