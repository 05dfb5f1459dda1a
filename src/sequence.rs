use std::time::Duration;

use imgref::ImgVec;
use rgb::RGBA8;

/// Straight-alpha RGBA pixels. Everything the renderer shows is one of these.
pub type Image = ImgVec<RGBA8>;

/// Display time for a frame whose container carries no timing at all.
pub const FALLBACK_FRAME_DURATION: Duration = Duration::from_millis(100);

/// One composited frame, ready to display as-is.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: Image,
    pub duration: Duration,
}

/// Decoded frames in playback order. Never empty.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<Frame>,
}

impl FrameSequence {
    /// Returns `None` for an empty frame list.
    pub fn new(frames: Vec<Frame>) -> Option<Self> {
        if frames.is_empty() {
            None
        } else {
            Some(Self { frames })
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn first(&self) -> &Frame {
        &self.frames[0]
    }

    /// Frame at `index`, wrapping past the end.
    pub fn frame(&self, index: usize) -> &Frame {
        &self.frames[index % self.frames.len()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    pub fn durations(&self) -> impl Iterator<Item = Duration> + '_ {
        self.frames.iter().map(|f| f.duration)
    }

    /// Unwrap a one-frame sequence into its frame; longer sequences come back untouched.
    pub fn into_single(mut self) -> Result<Frame, Self> {
        if self.frames.len() == 1 {
            Ok(self.frames.swap_remove(0))
        } else {
            Err(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{sequence, solid};

    #[test]
    fn empty_frames_are_rejected() {
        assert!(FrameSequence::new(Vec::new()).is_none());
    }

    #[test]
    fn frame_index_wraps() {
        let seq = sequence(3);
        assert_eq!(seq.frame(4).pixels.buf()[0], seq.frame(1).pixels.buf()[0]);
    }

    #[test]
    fn single_frame_unwraps() {
        let seq = FrameSequence::new(vec![Frame {
            pixels: solid(7),
            duration: FALLBACK_FRAME_DURATION,
        }])
        .unwrap();
        let frame = seq.into_single().unwrap();
        assert_eq!(frame.pixels.buf()[0].r, 7);

        assert_eq!(sequence(2).into_single().unwrap_err().len(), 2);
    }
}
