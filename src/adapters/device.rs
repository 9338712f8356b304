//! Microphone and speaker access through the system audio devices.
//!
//! Recording captures at the input device's native rate, mixes to mono,
//! resamples to the configured rate and writes 16-bit PCM WAV with hound.
//! Playback reads a WAV file and feeds it to the output device until the
//! last sample has been played.
//!
//! The cpal-backed [`DeviceRecorder`] and [`DevicePlayer`] need the
//! `device-audio` feature; the WAV helpers are always available.

#![cfg_attr(not(feature = "device-audio"), allow(dead_code))]

use std::path::Path;

use anyhow::{Context, Result};

/// Write mono samples as 16-bit PCM, duplicated across `channels`
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        for _ in 0..channels {
            writer
                .write_sample(value)
                .with_context(|| format!("Failed to write WAV file: {}", path.display()))?;
        }
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finish WAV file: {}", path.display()))
}

/// Read a WAV file as mono f32 samples, returning them with the sample rate
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Cannot open WAV {}", path.display()))?;
    let spec = reader.spec();

    // Streamed WAV headers can overstate the data length; stop at the first unreadable sample
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map_while(|s| s.ok())
                .map(|v| v as f32 / max)
                .collect()
        }
        hound::SampleFormat::Float => reader.samples::<f32>().map_while(|s| s.ok()).collect(),
    };

    if samples.is_empty() {
        anyhow::bail!("WAV file has no samples: {}", path.display());
    }

    Ok((to_mono(&samples, spec.channels), spec.sample_rate))
}

/// Convert interleaved multi-channel audio to mono by averaging channels
pub fn to_mono(data: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    let ch = channels as usize;
    data.chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Linear-interpolation resampler.
///
/// Good enough for speech: 48kHz capture down to 16kHz for transcription,
/// and 24kHz synthesized speech up to the output device's rate.
pub fn resample(samples: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if src_rate == dst_rate || samples.is_empty() || src_rate == 0 || dst_rate == 0 {
        return samples.to_vec();
    }

    let ratio = f64::from(src_rate) / f64::from(dst_rate);
    let out_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            f64::from(samples[idx]) * (1.0 - frac) + f64::from(samples[idx + 1]) * frac
        } else {
            f64::from(samples[idx.min(samples.len() - 1)])
        };

        output.push(sample as f32);
    }

    output
}

#[cfg(feature = "device-audio")]
pub use cpal_backend::{DevicePlayer, DeviceRecorder};

#[cfg(feature = "device-audio")]
mod cpal_backend {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use anyhow::{anyhow, Context, Result};
    use async_trait::async_trait;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::StreamConfig;
    use tracing::{debug, error, info};

    use super::{read_wav, resample, to_mono, write_wav};
    use crate::adapters::{AudioPlayer, AudioRecorder};

    const POLL: Duration = Duration::from_millis(10);

    /// Raises the flag when the owning future is dropped, so the blocking
    /// device loop stops instead of running to completion
    struct CancelOnDrop(Arc<AtomicBool>);

    impl Drop for CancelOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn find_device(
        mut devices: impl Iterator<Item = cpal::Device>,
        name: &str,
    ) -> Option<cpal::Device> {
        devices.find(|d| {
            d.description()
                .ok()
                .map(|desc| desc.name() == name)
                .unwrap_or(false)
        })
    }

    fn device_name(device: &cpal::Device) -> String {
        device
            .description()
            .map(|d| d.name().to_owned())
            .unwrap_or_else(|_| "<unknown>".into())
    }

    /// Records from an input device into a WAV file
    #[derive(Debug, Clone)]
    pub struct DeviceRecorder {
        input_device: Option<String>,
        sample_rate: u32,
        channels: u16,
    }

    impl DeviceRecorder {
        /// `input_device` of `None` uses the system default
        pub fn new(input_device: Option<String>, sample_rate: u32, channels: u16) -> Self {
            Self {
                input_device,
                sample_rate,
                channels,
            }
        }

        fn device(&self) -> Result<cpal::Device> {
            let host = cpal::default_host();
            match self.input_device {
                Some(ref name) => {
                    let devices = host
                        .input_devices()
                        .map_err(|e| anyhow!("Cannot enumerate input devices: {e}"))?;
                    find_device(devices, name)
                        .ok_or_else(|| anyhow!("Input device '{name}' not found"))
                }
                None => host
                    .default_input_device()
                    .ok_or_else(|| anyhow!("No default input device")),
            }
        }

        fn record_blocking(&self, output: &Path, duration: Duration, cancel: &AtomicBool) -> Result<()> {
            let device = self.device()?;
            let default_config = device
                .default_input_config()
                .map_err(|e| anyhow!("No default input config: {e}"))?;

            let native_rate = default_config.sample_rate();
            let native_channels = default_config.channels();
            let stream_config = StreamConfig {
                channels: native_channels,
                sample_rate: native_rate,
                buffer_size: cpal::BufferSize::Default,
            };

            let captured = Arc::new(Mutex::new(Vec::<f32>::new()));
            let sink = Arc::clone(&captured);

            let stream = device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                        if let Ok(mut buf) = sink.lock() {
                            buf.extend_from_slice(data);
                        }
                    },
                    move |err| {
                        error!("audio input stream error: {err}");
                    },
                    None,
                )
                .map_err(|e| anyhow!("Failed to build input stream: {e}"))?;

            stream
                .play()
                .map_err(|e| anyhow!("Failed to start input stream: {e}"))?;

            debug!(
                device = %device_name(&device),
                native_rate,
                native_channels,
                "Recording from microphone"
            );

            let started = Instant::now();
            while started.elapsed() < duration && !cancel.load(Ordering::SeqCst) {
                std::thread::sleep(POLL);
            }
            drop(stream);

            if cancel.load(Ordering::SeqCst) {
                anyhow::bail!("Recording cancelled");
            }

            let samples = std::mem::take(
                &mut *captured
                    .lock()
                    .map_err(|e| anyhow!("Capture buffer lock poisoned: {e}"))?,
            );
            let mono = to_mono(&samples, native_channels);
            let resampled = resample(&mono, native_rate, self.sample_rate);
            write_wav(output, &resampled, self.sample_rate, self.channels)
        }
    }

    #[async_trait]
    impl AudioRecorder for DeviceRecorder {
        async fn record(&self, output: &Path, duration: Duration) -> Result<()> {
            let cancel = Arc::new(AtomicBool::new(false));
            let _guard = CancelOnDrop(Arc::clone(&cancel));

            let recorder = self.clone();
            let output: PathBuf = output.to_path_buf();
            tokio::task::spawn_blocking(move || recorder.record_blocking(&output, duration, &cancel))
                .await
                .context("Recording task failed")?
        }
    }

    /// Plays WAV files through an output device
    #[derive(Debug, Clone, Default)]
    pub struct DevicePlayer {
        output_device: Option<String>,
    }

    /// Internal buffer for tracking playback progress
    struct PlaybackBuffer {
        samples: Vec<f32>,
        position: usize,
        finished: bool,
    }

    impl DevicePlayer {
        /// `output_device` of `None` uses the system default
        pub fn new(output_device: Option<String>) -> Self {
            Self { output_device }
        }

        fn device(&self) -> Result<cpal::Device> {
            let host = cpal::default_host();
            match self.output_device {
                Some(ref name) => {
                    let devices = host
                        .output_devices()
                        .map_err(|e| anyhow!("Cannot enumerate output devices: {e}"))?;
                    find_device(devices, name)
                        .ok_or_else(|| anyhow!("Output device '{name}' not found"))
                }
                None => host
                    .default_output_device()
                    .ok_or_else(|| anyhow!("No default output device")),
            }
        }

        fn play_blocking(&self, path: &Path, cancel: &AtomicBool) -> Result<()> {
            let (samples, rate) = read_wav(path)?;

            let device = self.device()?;
            let default_config = device
                .default_output_config()
                .map_err(|e| anyhow!("No default output config: {e}"))?;
            let out_rate = default_config.sample_rate();
            let out_channels = default_config.channels();

            let stream_config = StreamConfig {
                channels: out_channels,
                sample_rate: out_rate,
                buffer_size: cpal::BufferSize::Default,
            };

            let buffer = Arc::new(Mutex::new(PlaybackBuffer {
                samples: resample(&samples, rate, out_rate),
                position: 0,
                finished: false,
            }));
            let source = Arc::clone(&buffer);
            let frame_len = usize::from(out_channels.max(1));

            let stream = device
                .build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                        let mut buf = match source.lock() {
                            Ok(b) => b,
                            Err(_) => return,
                        };

                        for frame in data.chunks_mut(frame_len) {
                            let sample = if buf.position < buf.samples.len() {
                                buf.position += 1;
                                buf.samples[buf.position - 1]
                            } else {
                                buf.finished = true;
                                0.0
                            };
                            frame.iter_mut().for_each(|s| *s = sample);
                        }
                    },
                    move |err| {
                        error!("audio output stream error: {err}");
                    },
                    None,
                )
                .map_err(|e| anyhow!("Failed to build output stream: {e}"))?;

            stream
                .play()
                .map_err(|e| anyhow!("Failed to start output stream: {e}"))?;

            info!(device = %device_name(&device), "Playing speech");

            loop {
                std::thread::sleep(POLL);
                if cancel.load(Ordering::SeqCst) {
                    break;
                }
                let buf = buffer
                    .lock()
                    .map_err(|e| anyhow!("Playback buffer lock poisoned: {e}"))?;
                if buf.finished {
                    break;
                }
            }

            drop(stream);
            Ok(())
        }
    }

    #[async_trait]
    impl AudioPlayer for DevicePlayer {
        async fn play(&self, path: &Path) -> Result<()> {
            let cancel = Arc::new(AtomicBool::new(false));
            let _guard = CancelOnDrop(Arc::clone(&cancel));

            let player = self.clone();
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || player.play_blocking(&path, &cancel))
                .await
                .context("Playback task failed")?
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_player_rejects_non_wav_before_touching_devices() {
            let dir = tempfile::TempDir::new().unwrap();
            let path = dir.path().join("speech.mp3");
            std::fs::write(&path, b"ID3 not a wav").unwrap();

            let player = DevicePlayer::new(Some("no such device".to_string()));
            let err = player.play(&path).await.unwrap_err();
            assert!(format!("{:#}", err).contains("Cannot open WAV"));
        }
    }
}
