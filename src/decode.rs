//! Animated GIF decoding: bytes in, composited frames with display times out.
//!
//! Pixels come from `gif` + `gif-dispose` (which applies disposal methods so
//! every frame is a full canvas). Timing comes from a separate walk over the
//! block structure, because the decoder reports a missing Graphic Control
//! Extension as a zero delay and we need to tell the two apart.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::sequence::{Frame, FrameSequence, FALLBACK_FRAME_DURATION};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("not a readable GIF: {0}")]
    Unreadable(String),
    #[error("GIF contains no frames")]
    NoFrames,
    #[error("decode cancelled")]
    Cancelled,
}

/// Delays of 0 or 1 centiseconds get bumped to 100ms by most players.
const MIN_CLAMPED_DELAY_CS: u16 = 2;
const CLAMPED_DELAY: Duration = Duration::from_millis(100);

/// Timing metadata for one frame as the container reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameTiming {
    /// The delay exactly as written in the file.
    pub unclamped: Option<Duration>,
    /// The delay after the usual player clamp.
    pub delay: Option<Duration>,
}

impl FrameTiming {
    pub fn from_centiseconds(cs: u16) -> Self {
        let unclamped = Duration::from_millis(u64::from(cs) * 10);
        let delay = if cs < MIN_CLAMPED_DELAY_CS {
            CLAMPED_DELAY
        } else {
            unclamped
        };
        Self {
            unclamped: Some(unclamped),
            delay: Some(delay),
        }
    }

    /// Unclamped wins, then the clamped delay, then the fallback. Zero is kept as zero.
    pub fn resolve(&self) -> Duration {
        self.unclamped
            .or(self.delay)
            .unwrap_or(FALLBACK_FRAME_DURATION)
    }
}

/// Shared cancel flag, checked between frames.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Decode every frame of a GIF, in file order.
pub fn decode(data: &[u8]) -> Result<FrameSequence, DecodeError> {
    decode_cancellable(data, &CancelToken::new())
}

pub fn decode_cancellable(
    mut data: &[u8],
    cancel: &CancelToken,
) -> Result<FrameSequence, DecodeError> {
    let scan = scan_blocks(data);
    // The decoder hits EOF looking for a first image in a header-plus-trailer
    // file, so an empty container has to be recognised from the block walk.
    let unreadable = |e: gif::DecodingError| {
        if scan.is_empty_container() {
            DecodeError::NoFrames
        } else {
            DecodeError::Unreadable(e.to_string())
        }
    };

    let mut gif_opts = gif::DecodeOptions::new();
    // gif-dispose wants palette indices, it does the RGBA conversion itself
    gif_opts.set_color_output(gif::ColorOutput::Indexed);

    let mut decoder = gif_opts.read_info(&mut data).map_err(unreadable)?;
    let mut screen = gif_dispose::Screen::new_decoder(&decoder);

    let mut frames = Vec::new();
    let mut index = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(DecodeError::Cancelled);
        }

        let frame = match decoder.read_next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) if frames.is_empty() => return Err(unreadable(e)),
            Err(e) => {
                log::warn!("GIF stream broke off after {} frames: {e}", frames.len());
                break;
            }
        };

        let timing = scan
            .timings
            .get(index)
            .copied()
            .unwrap_or_else(|| FrameTiming::from_centiseconds(frame.delay));
        index += 1;

        if let Err(e) = screen.blit_frame(frame) {
            log::warn!("Skipping GIF frame {}: {e}", index - 1);
            continue;
        }

        frames.push(Frame {
            pixels: screen.pixels_rgba().map_buf(|b| b.to_owned()),
            duration: timing.resolve(),
        });
    }

    log::debug!("Decoded {} GIF frames", frames.len());
    FrameSequence::new(frames).ok_or(DecodeError::NoFrames)
}

// ---------------------------------------------------------------------------
// Block walk
// ---------------------------------------------------------------------------

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_SEPARATOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;
const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;

/// What the block walk found.
#[derive(Debug, Default)]
struct BlockScan {
    /// Per-image timing, in file order.
    timings: Vec<FrameTiming>,
    /// The walk reached the trailer without tripping over anything.
    complete: bool,
}

impl BlockScan {
    /// Well-formed, but not a single image descriptor.
    fn is_empty_container(&self) -> bool {
        self.complete && self.timings.is_empty()
    }
}

/// Walk the block structure. Stops quietly at the trailer, at truncation,
/// or at anything it doesn't recognise; whether the file is readable at all
/// is the decoder's call.
fn scan_blocks(data: &[u8]) -> BlockScan {
    let mut scan = BlockScan::default();
    let mut r = BlockReader { data, pos: 0 };

    match r.take(6) {
        Some(sig) if sig.starts_with(b"GIF") => {}
        _ => return scan,
    }
    let Some(screen_desc) = r.take(7) else {
        return scan;
    };
    if !r.skip_color_table(screen_desc[4]) {
        return scan;
    }

    let mut pending: Option<u16> = None;
    loop {
        match r.byte() {
            Some(EXTENSION_INTRODUCER) => {
                let Some(label) = r.byte() else { break };
                if label == GRAPHIC_CONTROL_LABEL {
                    let Some(len) = r.byte() else { break };
                    if len == 0 {
                        continue;
                    }
                    let Some(block) = r.take(usize::from(len)) else {
                        break;
                    };
                    if block.len() >= 3 {
                        pending = Some(u16::from_le_bytes([block[1], block[2]]));
                    }
                }
                if !r.skip_sub_blocks() {
                    break;
                }
            }
            Some(IMAGE_SEPARATOR) => {
                let Some(image_desc) = r.take(9) else { break };
                if !r.skip_color_table(image_desc[8]) {
                    break;
                }
                // LZW minimum code size
                if r.byte().is_none() {
                    break;
                }
                scan.timings.push(
                    pending
                        .take()
                        .map(FrameTiming::from_centiseconds)
                        .unwrap_or_default(),
                );
                if !r.skip_sub_blocks() {
                    break;
                }
            }
            Some(TRAILER) => {
                scan.complete = true;
                break;
            }
            _ => break,
        }
    }
    scan
}

struct BlockReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BlockReader<'a> {
    fn byte(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    /// `packed` is the flags byte of a screen or image descriptor.
    fn skip_color_table(&mut self, packed: u8) -> bool {
        if packed & 0x80 == 0 {
            return true;
        }
        let entries = 1usize << ((packed & 0x07) + 1);
        self.take(entries * 3).is_some()
    }

    fn skip_sub_blocks(&mut self) -> bool {
        loop {
            match self.byte() {
                Some(0) => return true,
                Some(len) => {
                    if self.take(usize::from(len)).is_none() {
                        return false;
                    }
                }
                None => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{gif_bytes, gif_without_timing, tiny_gif_with_delays};

    fn durations(seq: &FrameSequence) -> Vec<Duration> {
        seq.durations().collect()
    }

    #[test]
    fn three_frames_keep_their_delays_in_order() {
        let seq = decode(&gif_bytes(&[20, 30, 10])).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(
            durations(&seq),
            [
                Duration::from_millis(200),
                Duration::from_millis(300),
                Duration::from_millis(100)
            ]
        );
    }

    #[test]
    fn frame_count_matches_container() {
        for n in 1..=6u16 {
            let delays: Vec<u16> = (0..n).map(|i| 5 + i).collect();
            assert_eq!(decode(&gif_bytes(&delays)).unwrap().len(), n as usize);
        }
    }

    #[test]
    fn frames_are_composited_full_canvas() {
        let seq = decode(&gif_bytes(&[10, 10])).unwrap();
        for frame in seq.iter() {
            assert_eq!(frame.pixels.width(), 2);
            assert_eq!(frame.pixels.height(), 2);
        }
        // fixture alternates palette entries per frame
        assert_ne!(seq.frame(0).pixels.buf()[0], seq.frame(1).pixels.buf()[0]);
    }

    #[test]
    fn missing_control_extension_uses_fallback() {
        let seq = decode(&gif_without_timing()).unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.first().duration, FALLBACK_FRAME_DURATION);
    }

    #[test]
    fn control_extension_applies_only_to_next_image() {
        let seq = decode(&tiny_gif_with_delays(&[Some(25), None, Some(4)])).unwrap();
        assert_eq!(
            durations(&seq),
            [
                Duration::from_millis(250),
                FALLBACK_FRAME_DURATION,
                Duration::from_millis(40)
            ]
        );
    }

    #[test]
    fn zero_delay_is_kept_as_is() {
        let seq = decode(&gif_bytes(&[0, 1])).unwrap();
        assert_eq!(
            durations(&seq),
            [Duration::ZERO, Duration::from_millis(10)]
        );
    }

    #[test]
    fn unclamped_beats_clamped() {
        let timing = FrameTiming::from_centiseconds(1);
        assert_eq!(timing.delay, Some(CLAMPED_DELAY));
        assert_eq!(timing.resolve(), Duration::from_millis(10));

        let clamped_only = FrameTiming {
            unclamped: None,
            delay: Some(Duration::from_millis(70)),
        };
        assert_eq!(clamped_only.resolve(), Duration::from_millis(70));
        assert_eq!(FrameTiming::default().resolve(), FALLBACK_FRAME_DURATION);
    }

    #[test]
    fn garbage_is_unreadable() {
        assert!(matches!(
            decode(b"definitely not a gif"),
            Err(DecodeError::Unreadable(_))
        ));
        assert!(matches!(decode(&[]), Err(DecodeError::Unreadable(_))));
    }

    #[test]
    fn empty_container_has_no_frames() {
        assert!(matches!(decode(&gif_bytes(&[])), Err(DecodeError::NoFrames)));

        // header, global palette, trailer
        let mut bare = b"GIF89a".to_vec();
        bare.extend_from_slice(&[2, 0, 2, 0, 0x80, 0, 0]);
        bare.extend_from_slice(&[0, 0, 0, 255, 255, 255]);
        bare.push(TRAILER);
        assert!(matches!(decode(&bare), Err(DecodeError::NoFrames)));
    }

    #[test]
    fn truncated_before_first_image_is_unreadable() {
        let mut bytes = gif_bytes(&[]);
        bytes.pop();
        assert!(matches!(decode(&bytes), Err(DecodeError::Unreadable(_))));
    }

    #[test]
    fn cancelled_token_stops_decode() {
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(
            decode_cancellable(&gif_bytes(&[10, 10]), &token),
            Err(DecodeError::Cancelled)
        ));
    }

    #[test]
    fn scan_survives_truncation() {
        let mut bytes = tiny_gif_with_delays(&[Some(7), Some(8)]);
        bytes.truncate(bytes.len() - 12);
        let scan = scan_blocks(&bytes);
        assert_eq!(scan.timings[0], FrameTiming::from_centiseconds(7));
        assert!(!scan.complete);
        assert!(scan_blocks(b"GIF8").timings.is_empty());
        assert!(scan_blocks(&tiny_gif_with_delays(&[Some(7)])).complete);
    }
}
