//! Canonical WAV I/O (mono, 16-bit signed PCM).

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::models::PcmBuffer;

use super::{DecodeError, DecodeResult};

/// WAV header for canonical mono 16-bit output at `sample_rate`.
pub fn canonical_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Read a 16-bit PCM WAV into a normalized buffer.
///
/// Multi-channel files are averaged down to mono.
pub fn read_pcm16(path: &Path) -> DecodeResult<PcmBuffer> {
    let mut reader = WavReader::open(path).map_err(|e| wav_error(path, e))?;
    let spec = reader.spec();

    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(DecodeError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: format!(
                "expected 16-bit integer PCM, got {}-bit {:?}",
                spec.bits_per_sample, spec.sample_format
            ),
        });
    }

    let raw: Vec<i16> = reader
        .samples::<i16>()
        .collect::<Result<_, _>>()
        .map_err(|e| wav_error(path, e))?;

    let channels = spec.channels.max(1) as usize;
    let buffer = if channels == 1 {
        PcmBuffer::from_i16(&raw, spec.sample_rate)
    } else {
        let mono: Vec<f32> = raw
            .chunks(channels)
            .map(|frame| frame.iter().map(|&s| s as f32 / 32768.0).sum::<f32>() / channels as f32)
            .collect();
        PcmBuffer::new(mono, spec.sample_rate)
    };

    buffer.map_err(|e| DecodeError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Write a buffer as canonical mono 16-bit WAV, clamping to [-1, 1].
pub fn write_pcm16(path: &Path, buffer: &PcmBuffer) -> std::io::Result<()> {
    let mut writer =
        WavWriter::create(path, canonical_spec(buffer.sample_rate())).map_err(hound_to_io)?;
    for sample in buffer.to_i16() {
        writer.write_sample(sample).map_err(hound_to_io)?;
    }
    writer.finalize().map_err(hound_to_io)
}

fn wav_error(path: &Path, err: hound::Error) -> DecodeError {
    match err {
        hound::Error::IoError(source) => DecodeError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
        other => DecodeError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

fn hound_to_io(err: hound::Error) -> std::io::Error {
    match err {
        hound::Error::IoError(e) => e,
        other => std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
    }
}
