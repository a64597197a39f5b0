use base64::Engine;
use rubato::{FastFixedIn, PolynomialDegree};

// Define standard sample rates for clarity and consistency
/// Rate the scoring service receives recorded attempts at.
pub const ANALYSIS_UPLOAD_SAMPLE_RATE: f64 = 16000.0;
/// Rate the speech service synthesizes reference audio at.
pub const TTS_PCM16_SAMPLE_RATE: f64 = 24000.0;

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,                     // No cutoff frequency, pass all frequencies
        PolynomialDegree::Cubic, // Cubic interpolation for quality
        chunk_size,
        1, // 1 channel (mono)
    )?;
    Ok(resampler)
}

/// Decodes a base64 string representing PCM16 audio into a vector of f32
/// samples normalized to [-1.0, 1.0].
pub fn decode_f32_from_base64_i16(base64_fragment: &str) -> Vec<f32> {
    if let Ok(pcm16_bytes) = base64::engine::general_purpose::STANDARD.decode(base64_fragment) {
        pcm16_bytes
            .chunks_exact(2)
            .map(|chunk| {
                let v = i16::from_le_bytes([chunk[0], chunk[1]]);
                (v as f32 / 32768.0).clamp(-1.0, 1.0)
            })
            .collect()
    } else {
        tracing::error!("Failed to decode base64 fragment to f32");
        Vec::new()
    }
}

/// Converts a slice of f32 samples to a vector of i16 samples.
pub fn convert_f32_to_i16(pcm32: &[f32]) -> Vec<i16> {
    pcm32
        .iter()
        .map(|&sample| (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

/// Splits samples into fixed-size chunks for the resampler, zero-padding the
/// final chunk.
pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    let mut chunks = Vec::new();
    for chunk in samples.chunks(chunk_size) {
        let mut padded = chunk.to_vec();
        padded.resize(chunk_size, 0.0);
        chunks.push(padded);
    }
    chunks
}

/// Encodes mono f32 samples as a base64 WAV (PCM16) payload for upload.
pub fn encode_wav_base64(samples: &[f32], sample_rate: u32) -> anyhow::Result<String> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut wav_bytes = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut wav_bytes);
        let mut writer = hound::WavWriter::new(cursor, spec)?;
        for &sample in convert_f32_to_i16(samples).iter() {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(base64::engine::general_purpose::STANDARD.encode(&wav_bytes))
}
