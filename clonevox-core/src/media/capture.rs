//! Microphone capture to a WAV file.
//!
//! Capture runs at the device's native rate, is folded to mono, resampled
//! to the recording profile, and appended to the target file as 16-bit
//! PCM. Dropping the device stream ends the sample feed; `finish` waits
//! for the writer to drain and finalize the header.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use hound::{SampleFormat as WavSampleFormat, WavSpec, WavWriter};
use rubato::{FftFixedIn, Resampler};
use tokio::sync::mpsc;

use crate::media::gateway::MediaError;
use crate::media::AudioProfile;

const RESAMPLE_CHUNK: usize = 1024;

/// An in-flight recording session. One per gateway at most.
pub struct WavRecorder {
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
    writer: tokio::task::JoinHandle<Result<(), MediaError>>,
}

impl WavRecorder {
    pub fn start(profile: AudioProfile, target: &Path) -> Result<Self, MediaError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| MediaError::Device("no input device available".to_string()))?;

        let supported = device
            .default_input_config()
            .map_err(|e| MediaError::Device(format!("no input config: {e}")))?;

        let native_rate = supported.sample_rate().0;
        let native_channels = supported.channels() as usize;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();

        tracing::debug!(
            device_name = ?device.name(),
            native_rate,
            native_channels,
            target_rate = profile.sample_rate,
            ?target,
            "recording started"
        );

        let resampler = FftFixedIn::<f32>::new(
            native_rate as usize,
            profile.sample_rate as usize,
            RESAMPLE_CHUNK,
            2,
            1,
        )
        .map_err(|e| MediaError::Device(format!("failed to create resampler: {e}")))?;
        let resampler = Arc::new(Mutex::new(BufferedResampler {
            resampler,
            pending: Vec::with_capacity(RESAMPLE_CHUNK * 2),
        }));

        let (tx, rx) = mpsc::channel::<Vec<i16>>(100);
        let running = Arc::new(AtomicBool::new(true));

        let stream = match sample_format {
            SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, tx, running.clone(), native_channels, resampler)?
            }
            SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, tx, running.clone(), native_channels, resampler)?
            }
            format => {
                return Err(MediaError::Device(format!(
                    "unsupported sample format: {format:?}"
                )))
            }
        };

        stream
            .play()
            .map_err(|e| MediaError::Device(format!("failed to start capture stream: {e}")))?;

        let writer = spawn_wav_writer(target, profile, rx)?;

        Ok(Self {
            stream: Some(stream),
            running,
            writer,
        })
    }

    /// Stop capturing and finalize the WAV file.
    pub async fn finish(mut self) -> Result<(), MediaError> {
        self.running.store(false, Ordering::SeqCst);
        // Dropping the stream drops the callback's sender, which ends the
        // writer's receive loop.
        drop(self.stream.take());

        self.writer
            .await
            .map_err(|e| MediaError::Device(format!("wav writer task failed: {e}")))?
    }
}

fn spawn_wav_writer(
    target: &Path,
    profile: AudioProfile,
    mut rx: mpsc::Receiver<Vec<i16>>,
) -> Result<tokio::task::JoinHandle<Result<(), MediaError>>, MediaError> {
    let spec = WavSpec {
        channels: profile.channels,
        sample_rate: profile.sample_rate,
        bits_per_sample: 16,
        sample_format: WavSampleFormat::Int,
    };

    let mut writer =
        WavWriter::create(target, spec).map_err(|e| MediaError::Device(e.to_string()))?;

    Ok(tokio::task::spawn(async move {
        while let Some(chunk) = rx.recv().await {
            for sample in chunk {
                writer
                    .write_sample(sample)
                    .map_err(|e| MediaError::Device(e.to_string()))?;
            }
        }
        writer
            .finalize()
            .map_err(|e| MediaError::Device(e.to_string()))
    }))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    tx: mpsc::Sender<Vec<i16>>,
    running: Arc<AtomicBool>,
    native_channels: usize,
    resampler: Arc<Mutex<BufferedResampler>>,
) -> Result<Stream, MediaError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let err_running = running.clone();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if !running.load(Ordering::SeqCst) {
                    return;
                }
                let mono = to_mono_f32(data, native_channels);
                let resampled = resample_chunk(&mono, &resampler);
                let samples = to_i16(&resampled);
                if !samples.is_empty() && tx.blocking_send(samples).is_err() {
                    running.store(false, Ordering::SeqCst);
                }
            },
            move |err| {
                tracing::error!(error = ?err, "capture stream error");
                err_running.store(false, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| MediaError::Device(format!("failed to build input stream: {e}")))
}

/// Resampler plus the samples waiting for a full input chunk.
struct BufferedResampler {
    resampler: FftFixedIn<f32>,
    pending: Vec<f32>,
}

fn to_mono_f32<T>(samples: &[T], channels: usize) -> Vec<f32>
where
    T: Copy,
    f32: FromSample<T>,
{
    if channels == 1 {
        return samples.iter().map(|&s| f32::from_sample(s)).collect();
    }
    samples
        .chunks(channels)
        .map(|frame| {
            let sum: f32 = frame.iter().map(|&s| f32::from_sample(s)).sum();
            sum / channels as f32
        })
        .collect()
}

fn resample_chunk(mono: &[f32], resampler: &Arc<Mutex<BufferedResampler>>) -> Vec<f32> {
    let Ok(mut state) = resampler.lock() else {
        return Vec::new();
    };

    state.pending.extend_from_slice(mono);

    let mut output = Vec::new();
    loop {
        let frames_needed = state.resampler.input_frames_next();
        if state.pending.len() < frames_needed {
            break;
        }

        let input = vec![state.pending[..frames_needed].to_vec()];
        match state.resampler.process(&input, None) {
            Ok(resampled) => {
                if let Some(chunk) = resampled.into_iter().next() {
                    output.extend(chunk);
                }
            }
            Err(e) => {
                tracing::warn!(error = ?e, "resampling failed");
                break;
            }
        }

        state.pending.drain(..frames_needed);
    }

    output
}

fn to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| (sample.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect()
}
