mod common;

use common::{MockTransport, caps};
use std::sync::Arc;
use std::time::Instant;
use usb_audio_hal::{
    DeviceOptions, Direction, Error, SampleFormat, UnknownFormatPolicy, UsbAudioDevice,
};

/// A plain stereo 16-bit device at card 0, device 0.
fn stereo16() -> Arc<MockTransport> {
    let transport = MockTransport::new();
    transport.set_caps(
        0,
        0,
        Direction::Output,
        caps((44100, 48000), (2, 2), (16, 16), (4, 4)),
    );
    transport
}

/// A device that only does 4-channel 24-bit packed at 48 kHz.
fn quad24() -> Arc<MockTransport> {
    let transport = MockTransport::new();
    transport.set_caps(
        0,
        0,
        Direction::Output,
        caps((48000, 48000), (4, 4), (24, 32), (2, 8)),
    );
    transport
}

fn stereo_frames(frames: &[(i16, i16)]) -> Vec<u8> {
    let mut out = Vec::new();
    for &(left, right) in frames {
        out.extend_from_slice(&left.to_le_bytes());
        out.extend_from_slice(&right.to_le_bytes());
    }
    out
}

#[test]
fn first_write_activates_the_transport_exactly_once() {
    let transport = stereo16();
    let dev = UsbAudioDevice::new(transport.clone());
    let (out, _) = dev.open_output_stream().unwrap();
    out.set_parameters("card=0;device=0").unwrap();

    let data = vec![0u8; 64];
    assert_eq!(out.write(&data).unwrap(), 64);
    assert_eq!(out.write(&data).unwrap(), 64);

    assert_eq!(transport.open_count(), 1);
    // Stereo 16-bit device: both transfers pass through untouched.
    let writes = transport.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0], data);
}

#[test]
fn standby_closes_and_the_next_write_reopens() {
    let transport = stereo16();
    let dev = UsbAudioDevice::new(transport.clone());
    let (out, _) = dev.open_output_stream().unwrap();
    out.set_parameters("card=0;device=0").unwrap();

    out.write(&[0u8; 16]).unwrap();
    assert_eq!(transport.open_count(), 1);

    out.standby();
    out.standby(); // idempotent

    out.write(&[0u8; 16]).unwrap();
    assert_eq!(transport.open_count(), 2);
}

#[test]
fn failed_open_still_consumes_everything_and_paces() {
    let transport = stereo16();
    let dev = UsbAudioDevice::new(transport.clone());
    let (out, _) = dev.open_output_stream().unwrap();
    out.set_parameters("card=0;device=0").unwrap();
    transport.reject_opens(true);

    // 441 stereo 16-bit frames at 44.1 kHz is 10 ms of audio.
    let data = vec![0u8; 441 * 4];
    let start = Instant::now();
    assert_eq!(out.write(&data).unwrap(), data.len());
    assert!(start.elapsed().as_millis() >= 8);
    assert!(transport.writes().is_empty());

    // Still in standby: the next write attempts another open.
    transport.reject_opens(false);
    out.write(&data).unwrap();
    assert_eq!(transport.open_count(), 2);
    assert_eq!(transport.writes().len(), 1);
}

#[test]
fn quad_24_bit_device_triples_every_transfer() {
    let transport = quad24();
    let dev = UsbAudioDevice::new(transport.clone());
    let (out, _) = dev.open_output_stream().unwrap();
    out.set_parameters("card=0;device=0").unwrap();

    let frames = [(0x0102i16, 0x0304i16), (-1, 257)];
    let data = stereo_frames(&frames);
    assert_eq!(out.write(&data).unwrap(), data.len());

    let opened = transport.opened_configs();
    assert_eq!(opened[0].channels, 4);
    assert_eq!(opened[0].format, SampleFormat::S24Le3);

    let mut expected = Vec::new();
    for (left, right) in frames {
        for sample in [left, right, 0, 0] {
            let b = sample.to_le_bytes();
            expected.extend_from_slice(&[0, b[0], b[1]]);
        }
    }
    let writes = transport.writes();
    assert_eq!(writes[0].len(), data.len() * 3);
    assert_eq!(writes[0], expected);
}

#[test]
fn boundary_reporting_is_clamped_to_stereo_16() {
    let transport = quad24();
    let dev = UsbAudioDevice::new(transport);
    let (out, _) = dev.open_output_stream().unwrap();
    out.set_parameters("card=0;device=0").unwrap();

    assert_eq!(out.channels(), 2);
    assert_eq!(out.format(), SampleFormat::S16Le);
    assert_eq!(out.sample_rate(), 48000);
    // period_size takes the periods max of [2,8]; 8 boundary frames.
    assert_eq!(out.buffer_size(), 8 * 4);
}

#[test]
fn reporting_falls_back_to_defaults_without_a_routed_device() {
    let dev = UsbAudioDevice::new(MockTransport::new());
    let (out, config) = dev.open_output_stream().unwrap();

    assert_eq!(config.sample_rate, 44100);
    assert_eq!(config.channels, 2);
    assert_eq!(config.format, SampleFormat::S16Le);
    assert_eq!(out.sample_rate(), 44100);
    assert_eq!(out.buffer_size(), 1024 * 4);
    assert_eq!(out.latency_ms(), 1024 * 4 * 1000 / 44100);
}

#[test]
fn unconvertible_format_passes_through_by_default() {
    let transport = MockTransport::new();
    transport.set_caps(
        0,
        0,
        Direction::Output,
        caps((48000, 48000), (2, 2), (32, 32), (4, 4)),
    );
    let dev = UsbAudioDevice::new(transport.clone());
    let (out, _) = dev.open_output_stream().unwrap();
    out.set_parameters("card=0;device=0").unwrap();

    let data = vec![7u8; 32];
    assert_eq!(out.write(&data).unwrap(), 32);
    assert_eq!(transport.writes()[0], data);
}

#[test]
fn strict_policy_refuses_unconvertible_formats() {
    let transport = MockTransport::new();
    transport.set_caps(
        0,
        0,
        Direction::Output,
        caps((48000, 48000), (2, 2), (32, 32), (4, 4)),
    );
    let dev = UsbAudioDevice::with_options(
        transport,
        DeviceOptions {
            unknown_format: UnknownFormatPolicy::Strict,
        },
    );
    let (out, _) = dev.open_output_stream().unwrap();
    out.set_parameters("card=0;device=0").unwrap();

    assert!(matches!(out.write(&[0u8; 32]), Err(Error::Unsupported)));
}

#[test]
fn failed_reprobe_drops_the_session_config() {
    let transport = quad24();
    let dev = UsbAudioDevice::new(transport);
    let (out, _) = dev.open_output_stream().unwrap();

    out.set_parameters("card=0;device=0").unwrap();
    assert_eq!(out.sample_rate(), 48000);

    // No capability set at card 3: the stale entry must not survive.
    let err = out.set_parameters("card=3;device=3").unwrap_err();
    assert!(matches!(err, Error::DeviceUnavailable { card: 3, device: 3 }));
    assert_eq!(out.sample_rate(), 44100);
}

#[test]
fn capability_queries_answer_in_range_form() {
    let transport = quad24();
    let dev = UsbAudioDevice::new(transport);
    let (out, _) = dev.open_output_stream().unwrap();
    out.set_parameters("card=0;device=0").unwrap();

    assert_eq!(
        out.get_parameters("sup_sampling_rates;sup_channels;sup_formats"),
        "sup_sampling_rates=48000;sup_channels=4;sup_formats=24|32"
    );
    assert_eq!(out.get_parameters("sup_channels"), "sup_channels=4");
    assert_eq!(out.get_parameters("unrelated"), "");
}

#[test]
fn fixed_contract_operations_stay_unsupported() {
    let dev = UsbAudioDevice::new(MockTransport::new());
    let (out, _) = dev.open_output_stream().unwrap();

    assert!(matches!(out.set_volume(1.0, 1.0), Err(Error::Unsupported)));
    assert!(matches!(out.render_position(), Err(Error::Unsupported)));
    assert!(matches!(out.next_write_timestamp(), Err(Error::Unsupported)));
    assert!(out.set_sample_rate(22050).is_ok());
    assert!(out.set_format(SampleFormat::S16Le).is_ok());
}
