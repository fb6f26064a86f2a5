//! AudioSource - Decoded samples of one input file.
//!
//! This is the first stage of the analysis pipeline: it opens a PCM WAV
//! file, decodes it to 64-bit floating point samples and records the
//! format metadata the F0 estimator needs.
//!
//! # Sample Format
//!
//! Samples are stored as `f64`. Integer formats are normalized to
//! [-1.0, 1.0] by dividing by 2^(bits-1); float formats are loaded as-is.
//!
//! # Channels
//!
//! Only the first channel is analyzed. Multi-channel files are accepted
//! and de-interleaved down to channel 0.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use ndarray::Array1;
use tracing::debug;

use crate::buffer::try_filled;
use crate::error::{Error, Result};

/// Highest sample rate accepted from a WAV header, in Hz.
///
/// Analysis window and FFT sizes scale with the sample rate.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Decoded audio for one input file.
///
/// The sample buffer is owned exclusively by the source and released when
/// the source is dropped.
///
/// # Example
///
/// ```no_run
/// use speech_pitch::AudioSource;
///
/// let source = AudioSource::open("speech.wav").unwrap();
/// println!("{}", source);
/// ```
#[derive(Debug, Clone)]
pub struct AudioSource {
    /// Path the samples were decoded from (empty for in-memory sources).
    path: PathBuf,

    /// Channel 0 samples.
    samples: Array1<f64>,

    /// Sample rate in Hz.
    sample_rate: u32,

    /// Bits per sample of the encoded file.
    bit_depth: u16,
}

impl AudioSource {
    /// Create a source from samples already in memory.
    ///
    /// # Arguments
    ///
    /// * `samples` - Mono samples
    /// * `sample_rate` - Sample rate in Hz
    /// * `bit_depth` - Bit depth the samples were captured at
    pub fn from_samples(samples: Array1<f64>, sample_rate: u32, bit_depth: u16) -> Self {
        Self {
            path: PathBuf::new(),
            samples,
            sample_rate,
            bit_depth,
        }
    }

    /// Open and decode a WAV file.
    ///
    /// The file is first opened for reading; only then is the header
    /// parsed and the sample count queried. The sample buffer is allocated
    /// zero-initialized to that count before the payload is decoded into it.
    ///
    /// # Errors
    ///
    /// - `Error::FileNotFound` if the file cannot be opened
    /// - `Error::InvalidFormat` if the header is not a PCM WAV header, the
    ///   file holds zero samples, or the sample rate is zero or above
    ///   [`MAX_SAMPLE_RATE`]
    /// - `Error::Allocation` if the sample buffer cannot be allocated
    /// - `Error::FileCannotBeRead` if the sample payload is truncated or
    ///   unreadable, or the header declares more data than the file holds
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|source| Error::FileNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let file_len = file
            .metadata()
            .map_err(|e| Error::FileCannotBeRead {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .len();

        // Any header failure, including a short read on an empty file,
        // means the file is not in the expected format.
        let mut reader = hound::WavReader::new(BufReader::new(file))
            .map_err(|e| Error::InvalidFormat(format!("{}: {}", path.display(), e)))?;

        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;
        let length = reader.duration() as usize;

        if length == 0 {
            return Err(Error::InvalidFormat(format!(
                "{}: decoded length is zero",
                path.display()
            )));
        }
        if spec.sample_rate == 0 || spec.sample_rate > MAX_SAMPLE_RATE {
            return Err(Error::InvalidFormat(format!(
                "{}: sample rate {} Hz outside 1..={} Hz",
                path.display(),
                spec.sample_rate,
                MAX_SAMPLE_RATE
            )));
        }

        // The header may claim far more data than the file holds; reject
        // that before sizing a buffer from it.
        let payload_len =
            length as u64 * channels as u64 * ((spec.bits_per_sample as u64 + 7) / 8);
        if payload_len > file_len {
            return Err(Error::FileCannotBeRead {
                path: path.to_path_buf(),
                reason: format!(
                    "header declares {} data bytes, file has {}",
                    payload_len, file_len
                ),
            });
        }

        let mut buffer = try_filled(length, 0.0, "sample buffer")?;

        let read_error = |e: hound::Error| match e {
            hound::Error::IoError(io) => Error::FileCannotBeRead {
                path: path.to_path_buf(),
                reason: io.to_string(),
            },
            other => Error::InvalidFormat(format!("{}: {}", path.display(), other)),
        };

        // Fill channel 0 in place, normalizing integer formats
        let filled = match spec.sample_format {
            hound::SampleFormat::Float => {
                fill_channel(&mut buffer, reader.samples::<f32>().step_by(channels), |v: f32| {
                    v as f64
                })
                .map_err(read_error)?
            }
            hound::SampleFormat::Int => {
                let max_val = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f64;
                fill_channel(&mut buffer, reader.samples::<i32>().step_by(channels), |v: i32| {
                    v as f64 / max_val
                })
                .map_err(read_error)?
            }
        };

        if filled < length {
            return Err(Error::FileCannotBeRead {
                path: path.to_path_buf(),
                reason: format!("expected {} samples, decoded {}", length, filled),
            });
        }

        debug!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            bit_depth = spec.bits_per_sample,
            channels,
            length,
            "decoded audio"
        );

        Ok(Self {
            path: path.to_path_buf(),
            samples: Array1::from_vec(buffer),
            sample_rate: spec.sample_rate,
            bit_depth: spec.bits_per_sample,
        })
    }

    /// Get the decoded samples.
    #[inline]
    pub fn samples(&self) -> &Array1<f64> {
        &self.samples
    }

    /// Get the sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the bit depth of the encoded file.
    #[inline]
    pub fn bit_depth(&self) -> u16 {
        self.bit_depth
    }

    /// Get the number of samples (frames of channel 0).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Get the total duration in seconds.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.n_samples() as f64 / self.sample_rate as f64
    }

    /// Get the path the source was decoded from.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write converted samples into `buffer` until either runs out.
///
/// Returns the number of values written.
fn fill_channel<S, I, F>(buffer: &mut [f64], samples: I, convert: F) -> hound::Result<usize>
where
    I: Iterator<Item = hound::Result<S>>,
    F: Fn(S) -> f64,
{
    let mut filled = 0;
    for (slot, sample) in buffer.iter_mut().zip(samples) {
        *slot = convert(sample?);
        filled += 1;
    }
    Ok(filled)
}

impl std::fmt::Display for AudioSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AudioSource({} samples, {} Hz, {} bit, {:.3}s)",
            self.n_samples(),
            self.sample_rate,
            self.bit_depth,
            self.duration()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusCode;
    use hound::{WavSpec, WavWriter};
    use std::io::Write;

    fn int_spec(channels: u16) -> WavSpec {
        WavSpec {
            channels,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AudioSource::open(dir.path().join("missing.wav")).unwrap_err();
        assert_eq!(err.status(), StatusCode::FileNotFound);
    }

    #[test]
    fn test_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"this is certainly not a riff header").unwrap();
        drop(file);

        let err = AudioSource::open(&path).unwrap_err();
        assert_eq!(err.status(), StatusCode::InvalidFormat);
    }

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        File::create(&path).unwrap();

        let err = AudioSource::open(&path).unwrap_err();
        assert_eq!(err.status(), StatusCode::InvalidFormat);
    }

    #[test]
    fn test_zero_length_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.wav");
        WavWriter::create(&path, int_spec(1))
            .unwrap()
            .finalize()
            .unwrap();

        let err = AudioSource::open(&path).unwrap_err();
        assert_eq!(err.status(), StatusCode::InvalidFormat);
    }

    #[test]
    fn test_int_normalization() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("int.wav");
        let mut writer = WavWriter::create(&path, int_spec(1)).unwrap();
        for v in [0i16, 16384, -16384, -32768] {
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();

        let source = AudioSource::open(&path).unwrap();
        assert_eq!(source.sample_rate(), 16000);
        assert_eq!(source.bit_depth(), 16);
        assert_eq!(source.n_samples(), 4);
        assert_eq!(source.samples().to_vec(), vec![0.0, 0.5, -0.5, -1.0]);
        assert_eq!(source.path(), path.as_path());
    }

    #[test]
    fn test_stereo_keeps_first_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let mut writer = WavWriter::create(&path, int_spec(2)).unwrap();
        for (left, right) in [(8192i16, -1i16), (16384, -1), (-8192, -1)] {
            writer.write_sample(left).unwrap();
            writer.write_sample(right).unwrap();
        }
        writer.finalize().unwrap();

        let source = AudioSource::open(&path).unwrap();
        assert_eq!(source.samples().to_vec(), vec![0.25, 0.5, -0.25]);
    }

    #[test]
    fn test_float_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.25f32).unwrap();
        writer.write_sample(-0.75f32).unwrap();
        writer.finalize().unwrap();

        let source = AudioSource::open(&path).unwrap();
        assert_eq!(source.samples().to_vec(), vec![0.25, -0.75]);
        assert_eq!(source.bit_depth(), 32);
    }

    #[test]
    fn test_truncated_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.wav");
        let mut writer = WavWriter::create(&path, int_spec(1)).unwrap();
        for _ in 0..100 {
            writer.write_sample(1000i16).unwrap();
        }
        writer.finalize().unwrap();

        // Cut the data chunk short while leaving the header's length intact
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 50]).unwrap();

        let err = AudioSource::open(&path).unwrap_err();
        assert_eq!(err.status(), StatusCode::FileCannotBeRead);
    }

    #[test]
    fn test_extreme_sample_rate_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fast.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 2_000_000_000,
            bits_per_sample: 8,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for i in 0..100 {
            writer.write_sample((i % 64) as i8).unwrap();
        }
        writer.finalize().unwrap();

        let err = AudioSource::open(&path).unwrap_err();
        assert_eq!(err.status(), StatusCode::InvalidFormat);
    }

    #[test]
    fn test_highest_sample_rate_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hi.wav");
        let spec = WavSpec {
            sample_rate: MAX_SAMPLE_RATE,
            ..int_spec(1)
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();

        assert_eq!(AudioSource::open(&path).unwrap().sample_rate(), MAX_SAMPLE_RATE);
    }

    #[test]
    fn test_oversized_data_chunk_not_allocated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liar.wav");
        let mut writer = WavWriter::create(&path, int_spec(1)).unwrap();
        for _ in 0..10 {
            writer.write_sample(1000i16).unwrap();
        }
        writer.finalize().unwrap();

        // Claim about 2^31 samples in the data chunk header
        let mut bytes = std::fs::read(&path).unwrap();
        let at = bytes.windows(4).position(|w| w == b"data").unwrap() + 4;
        bytes[at..at + 4].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let err = AudioSource::open(&path).unwrap_err();
        assert_eq!(err.status(), StatusCode::FileCannotBeRead);
    }

    #[test]
    fn test_from_samples() {
        let source = AudioSource::from_samples(Array1::zeros(16000), 16000, 16);
        assert_eq!(source.n_samples(), 16000);
        assert!((source.duration() - 1.0).abs() < 1e-12);
        assert_eq!(
            source.to_string(),
            "AudioSource(16000 samples, 16000 Hz, 16 bit, 1.000s)"
        );
    }
}
