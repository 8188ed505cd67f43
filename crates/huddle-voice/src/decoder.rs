//! Decoding of synthesized audio into playable PCM.

use crate::error::VoiceError;
use hound::{SampleFormat, WavReader};
use std::io::Cursor;
use std::time::Duration;

/// Highest sample rate accepted from the speech service.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Sample layout of a decoded clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Decoded, playable audio: interleaved signed 16-bit PCM.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub format: ClipFormat,
    pub samples: Vec<i16>,
}

impl AudioClip {
    /// Number of sample frames (one sample per channel).
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.format.channels.max(1) as usize
    }

    pub fn duration(&self) -> Duration {
        if self.format.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / self.format.sample_rate as f64)
    }
}

/// Decodes a WAV payload into an [`AudioClip`].
///
/// Accepts 8/16/24/32-bit integer and 32-bit float WAV; everything is
/// converted to 16-bit.
pub fn decode_clip(bytes: &[u8]) -> Result<AudioClip, VoiceError> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    if spec.channels == 0 || !(1..=MAX_SAMPLE_RATE).contains(&spec.sample_rate) {
        return Err(VoiceError::Decode(format!(
            "unsupported WAV layout: {} channels at {} Hz",
            spec.channels, spec.sample_rate
        )));
    }

    let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => reader
            .into_samples::<i8>()
            .map(|s| s.map(|v| i16::from(v) << 8))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits) if bits <= 16 => reader
            .into_samples::<i16>()
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits) if bits <= 32 => {
            let shift = u32::from(bits - 16);
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect::<Result<_, _>>()?
        }
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * 32767.0) as i16))
            .collect::<Result<_, _>>()?,
        (format, bits) => {
            return Err(VoiceError::Decode(format!(
                "unsupported sample format: {:?} {}-bit",
                format, bits
            )))
        }
    };

    if samples.is_empty() {
        return Err(VoiceError::Decode("audio contains no samples".to_string()));
    }

    Ok(AudioClip {
        format: ClipFormat {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        },
        samples,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    /// Encodes a mono 16-bit WAV in memory.
    pub(crate) fn wav_bytes(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for s in samples {
                writer.write_sample(*s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_16_bit_mono() {
        let samples: Vec<i16> = (0..1600).map(|i| (i % 200) as i16 - 100).collect();
        let clip = decode_clip(&wav_bytes(16_000, &samples)).unwrap();
        assert_eq!(
            clip.format,
            ClipFormat {
                sample_rate: 16_000,
                channels: 1
            }
        );
        assert_eq!(clip.samples, samples);
        assert_eq!(clip.duration(), Duration::from_millis(100));
    }

    #[test]
    fn converts_float_samples() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for s in [1.0f32, -1.0, 0.0, 2.0] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        let clip = decode_clip(&cursor.into_inner()).unwrap();
        assert_eq!(clip.samples, vec![32767, -32767, 0, 32767]);
        assert_eq!(clip.frame_count(), 2);
    }

    #[test]
    fn widens_8_bit_samples() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 8,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for s in [127i8, -128, 64, 0] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        let clip = decode_clip(&cursor.into_inner()).unwrap();
        assert_eq!(clip.samples, vec![32512, -32768, 16384, 0]);
    }

    #[test]
    fn rejects_out_of_range_sample_rate() {
        match decode_clip(&wav_bytes(300_000_000, &[1, 2, 3])) {
            Err(VoiceError::Decode(msg)) => assert!(msg.contains("300000000 Hz"), "{}", msg),
            other => panic!("expected decode error, got {:?}", other),
        }
        assert!(decode_clip(&wav_bytes(MAX_SAMPLE_RATE, &[1, 2, 3])).is_ok());
    }

    #[test]
    fn rejects_garbage_and_empty_audio() {
        assert!(matches!(
            decode_clip(b"definitely not a wav file"),
            Err(VoiceError::Decode(_))
        ));
        match decode_clip(&wav_bytes(16_000, &[])) {
            Err(VoiceError::Decode(msg)) => assert!(msg.contains("no samples")),
            other => panic!("expected decode error, got {:?}", other),
        }
    }
}
