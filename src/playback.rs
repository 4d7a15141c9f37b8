//! Audio playback for synthesized speech.
//!
//! Decodes the MPEG bytes returned by the speech endpoint into PCM
//! (symphonia), adapts them to the default output device (cpal),
//! resampling when the device cannot run at the source rate (rubato),
//! and blocks the calling thread until the last sample has played.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, warn};

/// Extra time the output stream keeps running after the cursor is
/// exhausted, so device-side buffers drain audibly.
const DRAIN_MARGIN: Duration = Duration::from_millis(250);

/// Errors from audio decoding or device playback.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error("no audio output device available")]
    NoDevice,

    #[error("audio device error: {0}")]
    Device(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("unsupported output sample format: {0}")]
    UnsupportedFormat(String),
}

/// Decode and play `bytes` on the default output device, returning once
/// playback has completed. Blocking; call from a blocking task.
pub fn play(bytes: &[u8]) -> Result<(), PlaybackError> {
    let decoded = decode_all(bytes)?;
    debug!(
        frames = decoded.samples.len() / decoded.channels as usize,
        sample_rate = decoded.sample_rate,
        channels = decoded.channels,
        "Decoded speech audio"
    );

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(PlaybackError::NoDevice)?;
    let default_config = device
        .default_output_config()
        .map_err(|e| PlaybackError::Device(e.to_string()))?;
    let sample_format = default_config.sample_format();
    let mut config: StreamConfig = default_config.config();

    // Run the device at the source rate when it supports it; resample
    // otherwise.
    let samples = if device_supports_rate(&device, &config, sample_format, decoded.sample_rate) {
        config.sample_rate = cpal::SampleRate(decoded.sample_rate);
        decoded.samples
    } else {
        let target = config.sample_rate.0;
        debug!(from = decoded.sample_rate, to = target, "Resampling for output device");
        resample(&decoded.samples, decoded.channels as usize, decoded.sample_rate, target)?
    };

    let rendered = adapt_channels(&samples, decoded.channels as usize, config.channels as usize);

    match sample_format {
        SampleFormat::F32 => run_stream::<f32>(&device, &config, rendered),
        SampleFormat::I16 => run_stream::<i16>(&device, &config, rendered),
        SampleFormat::U16 => run_stream::<u16>(&device, &config, rendered),
        other => Err(PlaybackError::UnsupportedFormat(format!("{:?}", other))),
    }
}

struct DecodedAudio {
    /// Interleaved f32 samples
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

/// Decode the full MPEG payload to interleaved f32 PCM.
fn decode_all(bytes: &[u8]) -> Result<DecodedAudio, PlaybackError> {
    let cursor = std::io::Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.mime_type("audio/mpeg");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlaybackError::Decode(format!("failed to probe format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PlaybackError::Decode("no audio track found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| PlaybackError::Decode("sample rate not found".to_string()))?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .ok_or_else(|| PlaybackError::Decode("channel count not found".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PlaybackError::Decode(format!("failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(PlaybackError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(audio_buf) => {
                if sample_buf.is_none() {
                    let spec = *audio_buf.spec();
                    let capacity = audio_buf.capacity() as u64;
                    sample_buf = Some(SampleBuffer::new(capacity, spec));
                }
                let buf = sample_buf.as_mut().unwrap();
                buf.copy_interleaved_ref(audio_buf);
                samples.extend_from_slice(buf.samples());
            }
            // Skip over recoverable decode errors
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(error = %e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(PlaybackError::Decode(e.to_string())),
        }
    }

    if samples.is_empty() {
        return Err(PlaybackError::Decode("decoded no audio samples".to_string()));
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// Check whether the device supports the source rate with the default
/// channel layout and sample format.
fn device_supports_rate(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    rate: u32,
) -> bool {
    let Ok(supported) = device.supported_output_configs() else {
        return false;
    };
    supported.into_iter().any(|c| {
        c.channels() == config.channels
            && c.sample_format() == sample_format
            && c.min_sample_rate().0 <= rate
            && c.max_sample_rate().0 >= rate
    })
}

/// Resample interleaved samples from `from` Hz to `to` Hz.
fn resample(
    samples: &[f32],
    channels: usize,
    from: u32,
    to: u32,
) -> Result<Vec<f32>, PlaybackError> {
    if from == to || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    const CHUNK_FRAMES: usize = 1024;
    let frames = samples.len() / channels;

    // Deinterleave into one buffer per channel.
    let mut chans: Vec<Vec<f32>> = vec![Vec::with_capacity(frames); channels];
    for frame in 0..frames {
        for (ch, chan_buf) in chans.iter_mut().enumerate() {
            chan_buf.push(samples[frame * channels + ch]);
        }
    }

    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler =
        SincFixedIn::<f32>::new(to as f64 / from as f64, 2.0, params, CHUNK_FRAMES, channels)
            .map_err(|e| PlaybackError::Resample(e.to_string()))?;

    let mut out_chans: Vec<Vec<f32>> = vec![Vec::new(); channels];
    let mut position = 0;
    while position < frames {
        let end = (position + CHUNK_FRAMES).min(frames);
        // The resampler expects exact block sizes; pad the tail with zeros.
        let block: Vec<Vec<f32>> = chans
            .iter()
            .map(|chan| {
                let mut block = chan[position..end].to_vec();
                block.resize(CHUNK_FRAMES, 0.0);
                block
            })
            .collect();

        let output = resampler
            .process(&block, None)
            .map_err(|e| PlaybackError::Resample(e.to_string()))?;
        for (ch, out_chan) in out_chans.iter_mut().enumerate() {
            out_chan.extend_from_slice(&output[ch]);
        }
        position = end;
    }

    // Re-interleave.
    let out_frames = out_chans.first().map(|c| c.len()).unwrap_or(0);
    let mut out = Vec::with_capacity(out_frames * channels);
    for frame in 0..out_frames {
        for chan in &out_chans {
            out.push(chan[frame]);
        }
    }
    Ok(out)
}

/// Adapt interleaved samples from `src` channels to `dst` channels:
/// mono is duplicated, extra channels are dropped, missing channels
/// repeat the last source channel.
fn adapt_channels(samples: &[f32], src: usize, dst: usize) -> Vec<f32> {
    if src == dst {
        return samples.to_vec();
    }
    let frames = samples.len() / src;
    let mut out = Vec::with_capacity(frames * dst);
    for frame in 0..frames {
        let start = frame * src;
        for ch in 0..dst {
            out.push(samples[start + ch.min(src - 1)]);
        }
    }
    out
}

/// Feed the prepared samples to the device and wait for completion.
fn run_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    samples: Vec<f32>,
) -> Result<(), PlaybackError>
where
    T: SizedSample + FromSample<f32>,
{
    let total = samples.len();
    let sample_rate = config.sample_rate.0;
    let channels = config.channels as usize;

    let data = Arc::new(samples);
    let position = Arc::new(AtomicUsize::new(0));
    let (done_tx, done_rx) = mpsc::channel::<()>();

    let cb_data = Arc::clone(&data);
    let cb_position = Arc::clone(&position);
    let stream = device
        .build_output_stream(
            config,
            move |out: &mut [T], _| {
                let start = cb_position.load(Ordering::Relaxed);
                for (i, slot) in out.iter_mut().enumerate() {
                    let value = cb_data.get(start + i).copied().unwrap_or(0.0);
                    *slot = T::from_sample(value);
                }
                let next = (start + out.len()).min(cb_data.len());
                cb_position.store(next, Ordering::Relaxed);
                if next >= cb_data.len() {
                    let _ = done_tx.send(());
                }
            },
            |e| warn!(error = %e, "Audio stream error"),
            None,
        )
        .map_err(|e| PlaybackError::Stream(e.to_string()))?;

    stream
        .play()
        .map_err(|e| PlaybackError::Stream(e.to_string()))?;

    // Wait until the callback has consumed every sample, bounded by the
    // nominal duration in case the device stalls.
    let nominal =
        Duration::from_secs_f64(total as f64 / (sample_rate as f64 * channels as f64));
    let _ = done_rx.recv_timeout(nominal + Duration::from_secs(5));
    std::thread::sleep(DRAIN_MARGIN);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapt_channels_mono_to_stereo() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(
            adapt_channels(&samples, 1, 2),
            vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3]
        );
    }

    #[test]
    fn test_adapt_channels_stereo_to_mono_keeps_left() {
        let samples = vec![0.1, 0.9, 0.2, 0.8];
        assert_eq!(adapt_channels(&samples, 2, 1), vec![0.1, 0.2]);
    }

    #[test]
    fn test_resample_noop_on_equal_rates() {
        let samples = vec![0.5f32; 441];
        let out = resample(&samples, 1, 44_100, 44_100).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn test_resample_halves_frame_count() {
        let samples: Vec<f32> = (0..4096).map(|i| (i as f32 / 4096.0).sin()).collect();
        let out = resample(&samples, 1, 44_100, 22_050).unwrap();
        // Output length tracks the rate ratio, modulo block padding and
        // filter delay.
        let expected = samples.len() / 2;
        assert!((out.len() as i64 - expected as i64).unsigned_abs() < 2048);
    }
}
