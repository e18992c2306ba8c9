//! Playback-speed adjustment.
//!
//! Mirrors the frame-rate trick: reinterpret the decoded samples at
//! `rate × speed`, then resample back to the original rate so the result
//! keeps the source sample rate but plays faster (or slower). Speed 1.0 is a
//! byte-identical passthrough aside from the `_tmp` rename, and a failed
//! decode degrades to the unmodified-speed original rather than erroring.

use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::warn;

const SPEED_EPSILON: f32 = 1e-3;

/// Decoded interleaved PCM plus its layout.
struct Pcm {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

/// Turn `<stem>_tmp.mp3` into its final name with the given extension.
fn final_path(temp: &Path, ext: &str) -> PathBuf {
    let stem = temp
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");
    let stem = stem.strip_suffix("_tmp").unwrap_or(stem);
    temp.with_file_name(format!("{stem}.{ext}"))
}

/// Apply a playback-speed multiplier to a synthesized `_tmp` MP3, producing
/// the final audio file and removing the temporary one.
///
/// Raises only on unrecoverable I/O failure.
pub fn apply_speed(temp_path: &Path, speed: f32) -> anyhow::Result<PathBuf> {
    if (speed - 1.0).abs() < SPEED_EPSILON {
        let output = final_path(temp_path, "mp3");
        std::fs::rename(temp_path, &output)?;
        return Ok(output);
    }

    match decode_mp3(temp_path) {
        Ok(pcm) => {
            let stretched = resample(&pcm.samples, pcm.channels, speed);
            let output = final_path(temp_path, "wav");
            write_wav(&output, &stretched, pcm.sample_rate, pcm.channels)?;
            std::fs::remove_file(temp_path)?;
            Ok(output)
        }
        Err(e) => {
            warn!(%e, path = %temp_path.display(), "Speed change failed, keeping original speed");
            let output = final_path(temp_path, "mp3");
            std::fs::rename(temp_path, &output)?;
            Ok(output)
        }
    }
}

fn decode_mp3(path: &Path) -> anyhow::Result<Pcm> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| anyhow::anyhow!("no audio track in file"))?;
    let track_id = track.id;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples: Vec<i16> = Vec::new();
    let mut sample_rate = 0u32;
    let mut channels = 0u16;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            // End of stream surfaces as an I/O error from the demuxer.
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // Skip over corrupt frames the way lenient players do.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };
        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count() as u16;

        let mut buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    if samples.is_empty() || sample_rate == 0 || channels == 0 {
        anyhow::bail!("no decodable audio frames");
    }

    Ok(Pcm {
        samples,
        sample_rate,
        channels,
    })
}

/// Linear resampling of interleaved PCM by a speed factor: the output holds
/// `1/speed` of the input frames, so playback at the original rate runs
/// `speed` times as fast.
pub fn resample(samples: &[i16], channels: u16, speed: f32) -> Vec<i16> {
    let ch = channels.max(1) as usize;
    let in_frames = samples.len() / ch;
    if in_frames == 0 || speed <= 0.0 {
        return samples.to_vec();
    }

    let out_frames = ((in_frames as f32 / speed) as usize).max(1);
    let mut out = Vec::with_capacity(out_frames * ch);

    for frame in 0..out_frames {
        let src = frame as f32 * speed;
        let i0 = (src as usize).min(in_frames - 1);
        let i1 = (i0 + 1).min(in_frames - 1);
        let frac = src - i0 as f32;
        for c in 0..ch {
            let a = samples[i0 * ch + c] as f32;
            let b = samples[i1 * ch + c] as f32;
            out.push((a + (b - a) * frac).round() as i16);
        }
    }

    out
}

fn write_wav(path: &Path, samples: &[i16], sample_rate: u32, channels: u16) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for s in samples {
        writer.write_sample(*s)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_path_strips_tmp_suffix() {
        let temp = Path::new("/audio/tts_20250101_abc_tmp.mp3");
        assert_eq!(
            final_path(temp, "mp3"),
            Path::new("/audio/tts_20250101_abc.mp3")
        );
        assert_eq!(
            final_path(temp, "wav"),
            Path::new("/audio/tts_20250101_abc.wav")
        );
    }

    #[test]
    fn test_resample_identity_at_unit_speed() {
        let samples: Vec<i16> = (0..100).map(|i| i * 10).collect();
        let out = resample(&samples, 1, 1.0);
        assert_eq!(out, samples);
    }

    #[test]
    fn test_resample_halves_length_at_double_speed() {
        let samples: Vec<i16> = (0..1000).collect();
        let out = resample(&samples, 1, 2.0);
        assert_eq!(out.len(), 500);
        assert_eq!(out[0], samples[0]);
        // Second output frame samples the input at position 2.
        assert_eq!(out[1], samples[2]);
    }

    #[test]
    fn test_resample_keeps_channels_interleaved() {
        // Stereo: left ascending, right constant.
        let mut samples = Vec::new();
        for i in 0..100i16 {
            samples.push(i);
            samples.push(-7);
        }
        let out = resample(&samples, 2, 2.0);
        assert_eq!(out.len() % 2, 0);
        for frame in out.chunks(2) {
            assert_eq!(frame[1], -7);
        }
    }

    #[test]
    fn test_unit_speed_is_byte_identical_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("speech_tmp.mp3");
        let payload = b"not-really-mp3-but-speed-1-never-decodes".to_vec();
        std::fs::write(&temp, &payload).unwrap();

        let output = apply_speed(&temp, 1.0).unwrap();
        assert_eq!(output, dir.path().join("speech.mp3"));
        assert!(!temp.exists());
        assert_eq!(std::fs::read(&output).unwrap(), payload);
    }

    #[test]
    fn test_failed_decode_degrades_to_original_speed() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("speech_tmp.mp3");
        let payload = b"garbage that will not decode".to_vec();
        std::fs::write(&temp, &payload).unwrap();

        let output = apply_speed(&temp, 1.67).unwrap();
        assert_eq!(output, dir.path().join("speech.mp3"));
        assert_eq!(std::fs::read(&output).unwrap(), payload);
    }
}
