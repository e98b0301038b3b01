//! Standalone audio decoding via symphonia, resampled with rubato.

use std::fs::File;
use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::models::PcmBuffer;

use super::{DecodeError, DecodeResult};

const SINC_LEN: usize = 256;

/// Decode an audio file into mono PCM at `target_rate`.
///
/// All channels are averaged. If the file's native rate differs from the
/// target, the signal is resampled.
pub fn load_audio_file(path: &Path, target_rate: u32) -> DecodeResult<PcmBuffer> {
    if !path.exists() {
        return Err(DecodeError::SourceNotFound(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|source| DecodeError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| unsupported(path, e))?;
    let mut format = probed.format;

    let (track_id, codec_params) = {
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DecodeError::NoAudioTrack(path.to_path_buf()))?;
        (track.id, track.codec_params.clone())
    };

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| unsupported(path, e))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut native_rate = codec_params.sample_rate;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => break,
            Err(SymphoniaError::IoError(ref err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(unsupported(path, err)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                native_rate.get_or_insert(spec.rate);
                let channels = spec.channels.count().max(1);

                let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);

                samples.extend(
                    sample_buf
                        .samples()
                        .chunks(channels)
                        .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                );
            }
            // Corrupt packet: skip it and keep going.
            Err(SymphoniaError::DecodeError(msg)) => {
                tracing::debug!("Skipping undecodable packet in {}: {}", path.display(), msg);
            }
            Err(SymphoniaError::IoError(ref err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(unsupported(path, err)),
        }
    }

    if samples.is_empty() {
        return Err(DecodeError::Empty(path.to_path_buf()));
    }

    let native_rate = native_rate.ok_or_else(|| DecodeError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason: "sample rate unknown".to_string(),
    })?;

    let samples = if native_rate != target_rate {
        tracing::debug!(
            "Resampling {} from {} Hz to {} Hz",
            path.display(),
            native_rate,
            target_rate
        );
        resample(samples, native_rate, target_rate)?
    } else {
        samples
    };

    tracing::debug!(
        "Decoded {} samples ({:.2}s) from {}",
        samples.len(),
        samples.len() as f64 / target_rate as f64,
        path.display()
    );

    PcmBuffer::new(samples, target_rate).map_err(|e| DecodeError::Resample(e.to_string()))
}

/// Resample a mono signal with a windowed-sinc interpolator.
///
/// The input is zero-padded so the interpolator flushes its tail, then the
/// filter delay is removed so sample 0 still lines up with time 0.
fn resample(samples: Vec<f32>, input_rate: u32, output_rate: u32) -> DecodeResult<Vec<f32>> {
    let ratio = output_rate as f64 / input_rate as f64;
    let expected_len = (samples.len() as f64 * ratio).round() as usize;

    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut padded = samples;
    padded.extend(std::iter::repeat(0.0).take(SINC_LEN));

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, padded.len(), 1)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;

    let mut output = resampler
        .process(&[padded], None)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;
    let channel = output.pop().unwrap_or_default();

    let delay = (SINC_LEN as f64 * ratio / 2.0) as usize;
    Ok(channel
        .into_iter()
        .skip(delay)
        .take(expected_len)
        .collect())
}

fn unsupported(path: &Path, err: SymphoniaError) -> DecodeError {
    match err {
        SymphoniaError::IoError(source) => DecodeError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
        other => DecodeError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}
