//! Voice-note duration and waveform from Ogg/Opus bytes.
//!
//! Only page headers and the `OpusHead` identification header are read;
//! no audio is decoded. The waveform is synthetic and depends only on the
//! duration.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::error::FormatError;

/// Number of waveform samples WhatsApp expects.
pub const WAVEFORM_LEN: usize = 64;

/// Shortest reported duration in seconds.
pub const MIN_DURATION: u32 = 1;

/// Longest reported duration in seconds.
pub const MAX_DURATION: u32 = 300;

const CAPTURE_PATTERN: &[u8; 4] = b"OggS";
const OPUS_HEAD: &[u8; 8] = b"OpusHead";
const PAGE_HEADER_LEN: usize = 27;
// Marker, version, channel count, pre-skip, input sample rate
const OPUS_HEAD_MIN_LEN: usize = 16;
const DEFAULT_SAMPLE_RATE: u32 = 48_000;
// Bytes per second assumed when no granule position is available
const FALLBACK_BYTE_RATE: u64 = 2_000;
// Granule value meaning "no packet finishes on this page"
const NO_GRANULE: u64 = u64::MAX;

/// Duration and waveform of a voice note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceNote {
    /// Whole seconds, in `[MIN_DURATION, MAX_DURATION]`.
    pub duration_seconds: u32,
    /// Amplitudes in `[0, 100]`.
    pub waveform: [u8; WAVEFORM_LEN],
}

/// Analyze an Ogg/Opus stream.
///
/// Fails only when the data does not start with the Ogg capture pattern.
/// Damaged or truncated pages end the scan early and the duration falls
/// back to what was seen so far.
pub fn analyze(data: &[u8]) -> Result<VoiceNote, FormatError> {
    if !data.starts_with(CAPTURE_PATTERN) {
        return Err(FormatError::MissingSignature);
    }

    let mut pre_skip: u64 = 0;
    let mut sample_rate = DEFAULT_SAMPLE_RATE;
    let mut head_found = false;
    let mut last_granule: u64 = 0;

    let mut pos = 0;
    while pos + PAGE_HEADER_LEN <= data.len() {
        if !data[pos..].starts_with(CAPTURE_PATTERN) {
            pos += 1;
            continue;
        }

        let granule = read_u64_le(data, pos + 6);
        let sequence = read_u32_le(data, pos + 18);
        let segment_count = data[pos + 26] as usize;

        let table_start = pos + PAGE_HEADER_LEN;
        let body_start = table_start + segment_count;
        if body_start > data.len() {
            debug!("Segment table at offset {} runs past end of data", pos);
            break;
        }

        let body_len: usize = data[table_start..body_start].iter().map(|&b| b as usize).sum();
        let body_end = body_start + body_len;
        let body = &data[body_start..body_end.min(data.len())];
        if body_end > data.len() {
            debug!("Page {} truncated ({} of {} body bytes)", sequence, body.len(), body_len);
        }

        if !head_found && sequence <= 1 {
            if let Some(offset) = find(body, OPUS_HEAD) {
                let head = &body[offset..];
                if head.len() >= OPUS_HEAD_MIN_LEN {
                    let rate = read_u32_le(head, 12);
                    if rate == 0 {
                        warn!("OpusHead declares a zero sample rate, assuming {} Hz", DEFAULT_SAMPLE_RATE);
                    } else {
                        pre_skip = u64::from(read_u16_le(head, 10));
                        sample_rate = rate;
                    }
                    head_found = true;
                }
            }
        }

        if granule != NO_GRANULE && granule > last_granule {
            last_granule = granule;
        }

        pos = body_end;
    }

    if !head_found {
        debug!("No OpusHead found, assuming {} Hz and no pre-skip", DEFAULT_SAMPLE_RATE);
    }

    let raw = if last_granule > 0 {
        let samples = last_granule.saturating_sub(pre_skip);
        samples.div_ceil(u64::from(sample_rate))
    } else {
        debug!("No granule position found, estimating duration from size");
        data.len() as u64 / FALLBACK_BYTE_RATE
    };

    let duration_seconds = raw.clamp(u64::from(MIN_DURATION), u64::from(MAX_DURATION)) as u32;
    debug!(
        "Ogg analysis: {} bytes, granule {}, pre-skip {}, rate {} Hz, duration {}s",
        data.len(),
        last_granule,
        pre_skip,
        sample_rate,
        duration_seconds
    );

    Ok(VoiceNote {
        duration_seconds,
        waveform: synthesize_waveform(duration_seconds),
    })
}

/// Build a plausible-looking waveform for a voice note of `duration` seconds.
///
/// The same duration always yields the same bytes.
pub fn synthesize_waveform(duration: u32) -> [u8; WAVEFORM_LEN] {
    const BASE_AMPLITUDE: f64 = 35.0;

    let mut rng = StdRng::seed_from_u64(u64::from(duration));
    let frequency = f64::from(duration.min(120)) / 30.0;

    let mut waveform = [0u8; WAVEFORM_LEN];
    for (i, sample) in waveform.iter_mut().enumerate() {
        let pos = i as f64 / WAVEFORM_LEN as f64;

        let mut value = BASE_AMPLITUDE * (pos * PI * frequency * 8.0).sin();
        value += (BASE_AMPLITUDE / 2.0) * (pos * PI * frequency * 16.0).sin();
        value += (rng.gen::<f64>() - 0.5) * 15.0;

        // Fade in and out
        value *= 0.7 + 0.3 * (pos * PI).sin();
        value += 50.0;

        *sample = value.clamp(0.0, 100.0) as u8;
    }
    waveform
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn read_u16_le(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn read_u32_le(data: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64_le(data: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(buf)
}
