//! Native audio: microphone capture and speaker playback.
//!
//! `cpal` streams are not `Send`, so the runtime keeps the `Recorder` on the
//! main thread and creates playback streams inside blocking closures that
//! never cross threads.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Producer, Split};
use rubato::Resampler;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

use crate::audio;

#[derive(Debug, thiserror::Error)]
pub enum SoundError {
    #[error("No audio input device available")]
    NoInputDevice,
    #[error("No audio output device available")]
    NoOutputDevice,
    #[error("Failed to query stream config: {0}")]
    StreamConfig(#[from] cpal::DefaultStreamConfigError),
    #[error("Failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("Failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error("Audio resampling failed: {0}")]
    Resample(String),
    #[error("Failed to encode WAV payload: {0}")]
    Encode(String),
}

/// An open microphone stream accumulating mono samples until stopped.
pub struct Recorder {
    // Held only to keep the stream alive; dropped on stop.
    _stream: cpal::Stream,
    samples: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
}

impl Recorder {
    /// Opens the default input device and starts capturing immediately.
    pub fn start() -> Result<Self, SoundError> {
        let host = cpal::default_host();
        let input = host
            .default_input_device()
            .ok_or(SoundError::NoInputDevice)?;

        if let Ok(name) = input.name() {
            debug!("Using input device: {:?}", name);
        }

        let input_config = input.default_input_config()?;
        let channel_count = input_config.channels() as usize;
        let sample_rate = input_config.sample_rate().0;
        info!(sample_rate, channels = channel_count, "Capture started");

        let samples = Arc::new(Mutex::new(Vec::new()));
        let sink = samples.clone();

        // Downmix interleaved frames to mono before accumulating.
        let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let mono: Vec<f32> = if channel_count > 1 {
                data.chunks(channel_count)
                    .map(|c| c.iter().sum::<f32>() / channel_count as f32)
                    .collect()
            } else {
                data.to_vec()
            };
            if let Ok(mut buffer) = sink.lock() {
                buffer.extend_from_slice(&mono);
            }
        };

        let stream = input.build_input_stream(
            &input_config.into(),
            input_data_fn,
            move |err| tracing::error!("An error occurred on input stream: {}", err),
            None,
        )?;
        stream.play()?;

        Ok(Self {
            _stream: stream,
            samples,
            sample_rate,
        })
    }

    /// Stops the capture and returns the accumulated samples with their rate.
    pub fn stop(self) -> (Vec<f32>, u32) {
        let sample_rate = self.sample_rate;
        drop(self._stream);
        let samples = self
            .samples
            .lock()
            .map(|mut buffer| std::mem::take(&mut *buffer))
            .unwrap_or_default();
        info!(
            samples = samples.len(),
            sample_rate, "Capture stopped"
        );
        (samples, sample_rate)
    }
}

fn resample(samples: &[f32], in_rate: f64, out_rate: f64) -> Result<Vec<f32>, SoundError> {
    if in_rate == out_rate {
        return Ok(samples.to_vec());
    }
    let mut resampler = audio::create_resampler(in_rate, out_rate, 1024)
        .map_err(|e| SoundError::Resample(e.to_string()))?;

    let chunk_size = resampler.input_frames_next();
    let mut out = Vec::new();
    for chunk in audio::split_for_chunks(samples, chunk_size) {
        let resampled = resampler
            .process(&[chunk.as_slice()], None)
            .map_err(|e| SoundError::Resample(e.to_string()))?;
        if let Some(channel) = resampled.into_iter().next() {
            out.extend(channel);
        }
    }
    Ok(out)
}

/// Resamples a captured attempt to the upload rate and encodes it as a base64
/// WAV payload for the scoring service.
pub fn prepare_upload_payload(samples: &[f32], capture_rate: u32) -> Result<String, SoundError> {
    let resampled = resample(
        samples,
        capture_rate as f64,
        audio::ANALYSIS_UPLOAD_SAMPLE_RATE,
    )?;
    audio::encode_wav_base64(&resampled, audio::ANALYSIS_UPLOAD_SAMPLE_RATE as u32)
        .map_err(|e| SoundError::Encode(e.to_string()))
}

/// Plays mono samples through the default output device, blocking until
/// playback has drained.
pub fn play_pcm(samples: &[f32], source_rate: f64) -> Result<(), SoundError> {
    if samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let output = host
        .default_output_device()
        .ok_or(SoundError::NoOutputDevice)?;
    let output_config = output.default_output_config()?;
    let channel_count = output_config.channels() as usize;
    let output_rate = output_config.sample_rate().0;

    let resampled = resample(samples, source_rate, output_rate as f64)?;
    let total = resampled.len();

    let buffer = HeapRb::<f32>::new(total);
    let (mut producer, mut consumer) = buffer.split();
    for &sample in &resampled {
        let _ = producer.try_push(sample);
    }

    // Duplicate the mono signal into every output channel.
    let output_data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        for frame in data.chunks_mut(channel_count) {
            let sample = consumer.try_pop().unwrap_or(0.0);
            for slot in frame.iter_mut() {
                *slot = sample;
            }
        }
    };

    let stream = output.build_output_stream(
        &output_config.into(),
        output_data_fn,
        move |err| tracing::error!("An error occurred on output stream: {}", err),
        None,
    )?;
    stream.play()?;

    // The buffer holds the entire clip; sleeping out its duration (plus a
    // small tail for device latency) is enough to let it drain.
    let duration = Duration::from_secs_f64(total as f64 / output_rate as f64);
    std::thread::sleep(duration + Duration::from_millis(150));
    Ok(())
}
