use std::time::Duration;

use instant::Instant;

use crate::sequence::{Frame, FrameSequence, Image};
use crate::ticker::{Ticker, MIN_PERIOD};

/// Where displayed frames go. Implemented by the renderer.
pub trait FrameSink {
    fn show(&mut self, image: &Image);
}

/// Tick interval used by `Cadence::Fixed` unless configured otherwise.
pub const DEFAULT_FRAME_TICK: Duration = Duration::from_millis(100);

/// How the clock spaces its ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Same interval for every frame, whatever the file says.
    Fixed(Duration),
    /// Each frame stays up for its own decoded duration.
    PerFrame,
}

impl Default for Cadence {
    fn default() -> Self {
        Cadence::Fixed(DEFAULT_FRAME_TICK)
    }
}

/// Cycles a frame sequence on the UI thread.
pub struct PlaybackClock {
    cadence: Cadence,
    sequence: Option<FrameSequence>,
    cursor: usize,
    ticker: Ticker,
}

impl PlaybackClock {
    pub fn new(cadence: Cadence) -> Self {
        let period = match cadence {
            Cadence::Fixed(period) => period,
            Cadence::PerFrame => DEFAULT_FRAME_TICK,
        };
        Self {
            cadence,
            sequence: None,
            cursor: 0,
            ticker: Ticker::new(period),
        }
    }

    /// Show frame 0 right away and, for two or more frames, arm the tick.
    /// Anything already playing is stopped first.
    pub fn start(&mut self, sequence: FrameSequence, now: Instant, sink: &mut dyn FrameSink) {
        self.stop();
        self.cursor = 0;
        sink.show(&sequence.first().pixels);

        if sequence.len() > 1 {
            match self.cadence {
                Cadence::Fixed(_) => self.ticker.arm(now),
                Cadence::PerFrame => self.ticker.schedule(now + frame_hold(sequence.first())),
            }
        }
        log::debug!(
            "Playback started: {} frames, ticking={}",
            sequence.len(),
            self.ticker.is_armed()
        );
        self.sequence = Some(sequence);
    }

    /// Cancel the tick and drop the sequence. No-op when idle.
    pub fn stop(&mut self) {
        self.ticker.cancel();
        self.sequence = None;
    }

    /// Advance once per due tick. Returns how many frames were shown.
    pub fn tick(&mut self, now: Instant, sink: &mut dyn FrameSink) -> usize {
        let Some(sequence) = &self.sequence else {
            return 0;
        };

        let mut advanced = 0;
        while let Some(fired) = self.ticker.poll(now) {
            self.cursor = (self.cursor + 1) % sequence.len();
            let frame = sequence.frame(self.cursor);
            if self.cadence == Cadence::PerFrame {
                self.ticker.schedule(fired + frame_hold(frame));
            }
            sink.show(&frame.pixels);
            advanced += 1;
        }
        advanced
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_armed()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.ticker.next_deadline()
    }
}

fn frame_hold(frame: &Frame) -> Duration {
    frame.duration.max(MIN_PERIOD)
}
