use instant::Instant;
use thiserror::Error;

use crate::assets::{Asset, AssetRequest, AssetStore, FallbackChain, StoreError};
use crate::clock::{Cadence, FrameSink, PlaybackClock};
use crate::decode::{CancelToken, DecodeError};
use crate::sequence::Image;
use crate::worker::{DecodeJob, DecodeOutcome};

/// Why the session fell back. Never shown to the user, only logged.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset {0} not found")]
    NotFound(String),
    #[error("asset {name} is unreadable: {reason}")]
    Unreadable { name: String, reason: String },
    #[error("asset {0} has no frames")]
    Empty(String),
}

impl AssetError {
    fn from_store(name: &str, err: StoreError) -> Self {
        AssetError::Unreadable {
            name: name.to_string(),
            reason: err.to_string(),
        }
    }

    fn from_decode(name: &str, err: DecodeError) -> Self {
        match err {
            DecodeError::NoFrames => AssetError::Empty(name.to_string()),
            other => AssetError::Unreadable {
                name: name.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// What the session is currently displaying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Initial fallback, nothing requested yet.
    Idle,
    Static,
    Animating,
}

enum Display {
    Idle(Image),
    Static(Image),
    Animating,
}

/// Result of `present`.
pub enum Presented {
    /// Same asset as the current one; nothing happened.
    Unchanged,
    /// The display was updated synchronously.
    Shown,
    /// The asset needs decoding. Run the job off-thread and hand the
    /// outcome to `finish_decode`. The old image stays up until then.
    Decoding(DecodeJob),
}

struct PendingDecode {
    ticket: u64,
    cancel: CancelToken,
}

/// Owns what the mascot shows: one active asset, its playback clock, and
/// at most one in-flight decode. The last `present` always wins.
pub struct AnimationSession {
    store: Box<dyn AssetStore>,
    fallback: FallbackChain,
    clock: PlaybackClock,
    display: Display,
    current: Option<AssetRequest>,
    pending: Option<PendingDecode>,
    next_ticket: u64,
    last_error: Option<AssetError>,
}

impl AnimationSession {
    /// Starts in `Idle` showing the fallback image.
    pub fn new(
        store: Box<dyn AssetStore>,
        fallback: FallbackChain,
        cadence: Cadence,
        sink: &mut dyn FrameSink,
    ) -> Self {
        let image = fallback.resolve(store.as_ref());
        sink.show(&image);
        Self {
            store,
            fallback,
            clock: PlaybackClock::new(cadence),
            display: Display::Idle(image),
            current: None,
            pending: None,
            next_ticket: 0,
            last_error: None,
        }
    }

    /// Switch to `request`. Asking for the asset already current is a no-op,
    /// including while it is still decoding.
    pub fn present(&mut self, request: AssetRequest, sink: &mut dyn FrameSink) -> Presented {
        if self.current.as_ref() == Some(&request) {
            return Presented::Unchanged;
        }

        self.cancel_pending();
        log::info!("Presenting {}", request.file_name());

        let fetched = self.store.fetch(&request);
        let name = request.name.clone();
        self.current = Some(request);

        match fetched {
            Ok(None) => {
                self.fail(AssetError::NotFound(name), sink);
                Presented::Shown
            }
            Err(e) => {
                self.fail(AssetError::from_store(&name, e), sink);
                Presented::Shown
            }
            Ok(Some(Asset::Still(image))) => {
                self.show_static(image, sink);
                Presented::Shown
            }
            Ok(Some(Asset::Container(bytes))) => {
                self.next_ticket += 1;
                let cancel = CancelToken::new();
                self.pending = Some(PendingDecode {
                    ticket: self.next_ticket,
                    cancel: cancel.clone(),
                });
                Presented::Decoding(DecodeJob::new(self.next_ticket, name, bytes, cancel))
            }
        }
    }

    /// Apply a finished decode. Outcomes for anything but the latest
    /// request are dropped. Returns whether the display changed.
    pub fn finish_decode(
        &mut self,
        outcome: DecodeOutcome,
        now: Instant,
        sink: &mut dyn FrameSink,
    ) -> bool {
        match &self.pending {
            Some(p) if p.ticket == outcome.ticket => {}
            _ => {
                log::debug!("Dropping stale decode of {} (ticket {})", outcome.name, outcome.ticket);
                return false;
            }
        }
        self.pending = None;

        match outcome.result {
            Ok(sequence) => match sequence.into_single() {
                Ok(frame) => {
                    log::debug!("{} has a single frame, showing it as a still", outcome.name);
                    self.show_static(frame.pixels, sink);
                }
                Err(sequence) => {
                    log::info!("Animating {} ({} frames)", outcome.name, sequence.len());
                    self.clock.start(sequence, now, sink);
                    self.display = Display::Animating;
                }
            },
            Err(DecodeError::Cancelled) => return false,
            Err(e) => self.fail(AssetError::from_decode(&outcome.name, e), sink),
        }
        true
    }

    /// Advance playback for any due ticks.
    pub fn tick(&mut self, now: Instant, sink: &mut dyn FrameSink) -> usize {
        self.clock.tick(now, sink)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.clock.next_deadline()
    }

    pub fn has_asset(&self, request: &AssetRequest) -> bool {
        self.store.contains(request)
    }

    pub fn current(&self) -> Option<&AssetRequest> {
        self.current.as_ref()
    }

    pub fn phase(&self) -> Phase {
        match self.display {
            Display::Idle(_) => Phase::Idle,
            Display::Static(_) => Phase::Static,
            Display::Animating => Phase::Animating,
        }
    }

    pub fn is_decoding(&self) -> bool {
        self.pending.is_some()
    }

    /// Frame index while animating.
    pub fn cursor(&self) -> Option<usize> {
        matches!(self.display, Display::Animating).then(|| self.clock.cursor())
    }

    /// The still on screen, if not animating.
    pub fn still(&self) -> Option<&Image> {
        match &self.display {
            Display::Idle(image) | Display::Static(image) => Some(image),
            Display::Animating => None,
        }
    }

    pub fn last_error(&self) -> Option<&AssetError> {
        self.last_error.as_ref()
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            log::debug!("Cancelling decode ticket {}", pending.ticket);
            pending.cancel.cancel();
        }
    }

    fn show_static(&mut self, image: Image, sink: &mut dyn FrameSink) {
        self.clock.stop();
        sink.show(&image);
        self.display = Display::Static(image);
        self.last_error = None;
    }

    fn fail(&mut self, error: AssetError, sink: &mut dyn FrameSink) {
        log::warn!("{error}; showing fallback");
        let image = self.fallback.resolve(self.store.as_ref());
        self.clock.stop();
        sink.show(&image);
        self.display = Display::Static(image);
        self.last_error = Some(error);
    }
}

impl Drop for AnimationSession {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
