use glam::Vec2;
use instant::Instant;

use crate::assets::{AssetRequest, AssetStore, FallbackChain};
use crate::clock::FrameSink;
use crate::config::Config;
use crate::mode::{Flow, MascotEvent, MenuAction, Mode};
use crate::motion::{BounceController, Bounds, Heading, MOTION_TICK};
use crate::session::{AnimationSession, Phase, Presented};
use crate::ticker::{self, Ticker};
use crate::worker::{DecodeJob, DecodeOutcome};

/// What the mascot needs from the window it lives in.
pub trait Host: FrameSink {
    /// Move the mascot so its centre sits at `center` (screen coordinates).
    fn place(&mut self, center: Vec2);

    /// Current usable screen area, or `None` if it can't be determined.
    fn visible_bounds(&mut self) -> Option<Bounds>;

    /// Queue a decode off the UI thread.
    fn submit(&mut self, job: DecodeJob);
}

/// Read-only view for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub mode: Mode,
    pub position: Vec2,
    pub heading: Heading,
    pub current: Option<AssetRequest>,
    pub phase: Phase,
}

pub struct Mascot {
    session: AnimationSession,
    motion: BounceController,
    motion_ticker: Ticker,
    mode: Mode,
    idle_variants: Vec<String>,
    default_still: String,
    rng: fastrand::Rng,
}

impl Mascot {
    pub fn new<H: Host>(config: &Config, store: Box<dyn AssetStore>, host: &mut H) -> Self {
        let fallback = FallbackChain::new([config.default_still.as_str()]);
        let session = AnimationSession::new(store, fallback, config.cadence, host);
        let motion = BounceController::new(
            config.patrol_asset.as_str(),
            config.start,
            config.speed,
            config.amplitude,
            config.size as f32,
        );
        host.place(motion.position());

        Self {
            session,
            motion,
            motion_ticker: Ticker::new(MOTION_TICK),
            mode: Mode::Idle,
            idle_variants: config.idle_variants.clone(),
            default_still: config.default_still.clone(),
            rng: fastrand::Rng::new(),
        }
    }

    pub fn handle<H: Host>(&mut self, event: MascotEvent, now: Instant, host: &mut H) -> Flow {
        match event {
            MascotEvent::Tap => {
                if self.mode == Mode::Idle {
                    self.reroll(host);
                }
            }
            MascotEvent::Drag(delta) => {
                self.motion.nudge(delta);
                host.place(self.motion.position());
            }
            MascotEvent::Menu(MenuAction::Stop) => self.stop(host),
            MascotEvent::Menu(MenuAction::Patrol) => self.patrol(now, host),
            MascotEvent::Menu(MenuAction::Quit) => {
                log::info!("Quit requested");
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    /// Run every tick that is due: frame advances first, then motion.
    pub fn poll<H: Host>(&mut self, now: Instant, host: &mut H) {
        self.session.tick(now, host);

        while self.motion_ticker.poll(now).is_some() {
            if let Some(request) = self.motion.step() {
                if self.session.has_asset(&request) {
                    self.present(request, host);
                } else {
                    log::warn!(
                        "{} missing, keeping the current animation",
                        request.file_name()
                    );
                }
            }
            host.place(self.motion.position());
        }
    }

    pub fn finish_decode<H: Host>(&mut self, outcome: DecodeOutcome, now: Instant, host: &mut H) -> bool {
        self.session.finish_decode(outcome, now, host)
    }

    /// When the event loop next needs to wake us.
    pub fn next_deadline(&self) -> Option<Instant> {
        ticker::earliest(self.session.next_deadline(), self.motion_ticker.next_deadline())
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn snapshot(&self) -> Snapshot {
        let motion = self.motion.state();
        Snapshot {
            mode: self.mode,
            position: motion.position,
            heading: motion.heading,
            current: self.session.current().cloned(),
            phase: self.session.phase(),
        }
    }

    fn stop<H: Host>(&mut self, host: &mut H) {
        if self.mode == Mode::Patrolling {
            log::info!("Patrol stopped at {:?}", self.motion.position());
        }
        self.motion_ticker.cancel();
        self.mode = Mode::Idle;
        self.reroll(host);
    }

    fn patrol<H: Host>(&mut self, now: Instant, host: &mut H) {
        let bounds = match host.visible_bounds() {
            Some(bounds) => bounds,
            None => {
                log::warn!("Work area unavailable, reusing {:?}", self.motion.bounds());
                self.motion.bounds()
            }
        };
        log::info!("Patrolling within {:?}..{:?}", bounds.min, bounds.max);

        self.motion.begin(bounds);
        self.motion_ticker.arm(now);
        self.mode = Mode::Patrolling;
        host.place(self.motion.position());

        let facing = self.motion.facing_request();
        if self.session.has_asset(&facing) {
            self.present(facing, host);
        } else {
            log::warn!("{} missing, patrolling with the default still", facing.file_name());
            self.present(AssetRequest::still(self.default_still.as_str()), host);
        }
    }

    /// Show a random idle variant that actually exists.
    fn reroll<H: Host>(&mut self, host: &mut H) {
        let available: Vec<&String> = self
            .idle_variants
            .iter()
            .filter(|name| self.session.has_asset(&AssetRequest::still(name.as_str())))
            .collect();

        let name = if available.is_empty() {
            log::debug!("No idle variants found");
            self.default_still.clone()
        } else {
            available[self.rng.usize(..available.len())].clone()
        };
        self.present(AssetRequest::still(name), host);
    }

    fn present<H: Host>(&mut self, request: AssetRequest, host: &mut H) {
        if let Presented::Decoding(job) = self.session.present(request, host) {
            host.submit(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryStore;
    use crate::clock::DEFAULT_FRAME_TICK;
    use crate::testutil::{animated, demo_store, gif_bytes, solid, still, RecordingHost};
    use pretty_assertions::assert_eq;

    fn screen() -> Bounds {
        Bounds::from_origin_size(Vec2::ZERO, Vec2::new(400.0, 600.0))
    }

    fn mascot(store: MemoryStore, host: &mut RecordingHost) -> Mascot {
        Mascot::new(&Config::default(), Box::new(store), host)
    }

    fn patrolling(store: MemoryStore, now: Instant) -> (Mascot, RecordingHost) {
        let mut host = RecordingHost::with_bounds(screen());
        let mut m = mascot(store, &mut host);
        m.handle(MascotEvent::Menu(MenuAction::Patrol), now, &mut host);
        for outcome in host.run_jobs() {
            m.finish_decode(outcome, now, &mut host);
        }
        (m, host)
    }

    /// Ticks needed to walk from the start position to the right edge.
    fn ticks_to_right_edge(m: &Mascot) -> u32 {
        let (_, hi) = m.motion.lane();
        ((hi - m.motion.position().x) / Config::default().speed).ceil() as u32 + 1
    }

    /// Poll once per motion tick, as a running event loop would.
    fn walk(m: &mut Mascot, host: &mut RecordingHost, from: Instant, ticks: u32) -> Instant {
        for n in 1..=ticks {
            m.poll(from + MOTION_TICK * n, host);
        }
        from + MOTION_TICK * ticks
    }

    #[test]
    fn starts_idle_at_configured_position() {
        let mut host = RecordingHost::default();
        let m = mascot(demo_store(), &mut host);
        assert_eq!(m.mode(), Mode::Idle);
        assert_eq!(host.placed, [Config::default().start]);
        assert_eq!(m.next_deadline(), None);
    }

    #[test]
    fn tap_in_idle_picks_existing_variant() {
        let now = Instant::now();
        let mut store = demo_store();
        store.insert_still("main2", solid(2));
        let mut host = RecordingHost::default();
        let mut m = mascot(store, &mut host);

        for _ in 0..50 {
            m.handle(MascotEvent::Tap, now, &mut host);
            let current = m.snapshot().current.unwrap();
            assert!(current == still("main") || current == still("main2"));
        }
        assert!(host.shown.iter().all(|px| px.r == 200 || px.r == 2));
        assert!(host.jobs.is_empty());
    }

    #[test]
    fn tap_without_variants_uses_icon() {
        let now = Instant::now();
        let mut host = RecordingHost::default();
        let mut m = mascot(MemoryStore::new(), &mut host);

        m.handle(MascotEvent::Tap, now, &mut host);
        assert_eq!(m.snapshot().current, Some(still("main")));
        assert_eq!(host.shown.len(), 2);
        assert_eq!(host.shown[0], host.shown[1]);
    }

    #[test]
    fn patrol_presents_right_facing_animation() {
        let now = Instant::now();
        let (m, _) = patrolling(demo_store(), now);

        let snap = m.snapshot();
        assert_eq!(snap.mode, Mode::Patrolling);
        assert_eq!(snap.heading, Heading::Right);
        assert_eq!(snap.current, Some(animated("patoka_r")));
        assert_eq!(snap.phase, Phase::Animating);
        assert_eq!(m.next_deadline(), Some(now + MOTION_TICK));
    }

    #[test]
    fn every_patrol_requeries_work_area() {
        let now = Instant::now();
        let (mut m, mut host) = patrolling(demo_store(), now);
        m.handle(MascotEvent::Menu(MenuAction::Stop), now, &mut host);
        host.bounds = Some(Bounds::from_origin_size(Vec2::ZERO, Vec2::new(1000.0, 600.0)));
        m.handle(MascotEvent::Menu(MenuAction::Patrol), now, &mut host);

        assert_eq!(host.bounds_queries, 2);
        assert_eq!(m.motion.bounds(), host.bounds.unwrap());
    }

    #[test]
    fn tap_while_patrolling_is_ignored() {
        let now = Instant::now();
        let (mut m, mut host) = patrolling(demo_store(), now);
        let shown = host.shown.len();

        m.handle(MascotEvent::Tap, now, &mut host);
        assert_eq!(host.shown.len(), shown);
        assert_eq!(m.snapshot().current, Some(animated("patoka_r")));
    }

    #[test]
    fn reversal_swaps_to_left_animation() {
        let now = Instant::now();
        let (mut m, mut host) = patrolling(demo_store(), now);
        let ticks = ticks_to_right_edge(&m);

        walk(&mut m, &mut host, now, ticks);
        assert_eq!(m.snapshot().heading, Heading::Left);
        assert_eq!(host.last_job_name(), Some("patoka_l"));
        assert_eq!(host.placed.last().copied(), Some(m.snapshot().position));
    }

    #[test]
    fn missing_directional_asset_keeps_current() {
        let now = Instant::now();
        let mut store = MemoryStore::new();
        store.insert_still("main", solid(200));
        store.insert_container("patoka_r", gif_bytes(&[10, 10, 10]));
        let (mut m, mut host) = patrolling(store, now);
        let ticks = ticks_to_right_edge(&m);

        walk(&mut m, &mut host, now, ticks);
        assert_eq!(m.snapshot().heading, Heading::Left);
        assert!(host.jobs.is_empty());
        assert_eq!(m.snapshot().current, Some(animated("patoka_r")));
        assert_eq!(m.snapshot().phase, Phase::Animating);
    }

    #[test]
    fn wake_after_long_sleep_runs_one_step() {
        let now = Instant::now();
        let (mut m, mut host) = patrolling(demo_store(), now);
        let placed = host.placed.len();
        let shown = host.shown.len();

        let woke = now + std::time::Duration::from_secs(3600);
        m.poll(woke, &mut host);
        assert_eq!(host.placed.len(), placed + 1);
        assert_eq!(host.shown.len(), shown + 1);
        assert!(host.jobs.is_empty());
        assert_eq!(m.next_deadline(), Some(woke + MOTION_TICK.min(DEFAULT_FRAME_TICK)));
    }

    #[test]
    fn patrol_without_animation_shows_default_still() {
        let now = Instant::now();
        let mut store = MemoryStore::new();
        store.insert_still("main", solid(200));
        let (m, host) = patrolling(store, now);

        assert_eq!(m.mode(), Mode::Patrolling);
        assert_eq!(m.snapshot().current, Some(still("main")));
        assert_eq!(host.last_tag(), Some(200));
    }

    #[test]
    fn stop_returns_to_idle_and_halts_motion() {
        let now = Instant::now();
        let (mut m, mut host) = patrolling(demo_store(), now);
        m.handle(MascotEvent::Menu(MenuAction::Stop), now, &mut host);

        assert_eq!(m.mode(), Mode::Idle);
        assert_eq!(m.snapshot().current, Some(still("main")));
        assert_eq!(m.next_deadline(), None);

        let placed = host.placed.len();
        m.poll(now + MOTION_TICK * 10, &mut host);
        assert_eq!(host.placed.len(), placed);
    }

    #[test]
    fn drag_moves_and_is_placed() {
        let now = Instant::now();
        let mut host = RecordingHost::default();
        let mut m = mascot(demo_store(), &mut host);

        m.handle(MascotEvent::Drag(Vec2::new(5.0, -5.0)), now, &mut host);
        m.handle(MascotEvent::Drag(Vec2::new(1.0, 1.0)), now, &mut host);
        let expected = Config::default().start + Vec2::new(6.0, -4.0);
        assert_eq!(m.snapshot().position, expected);
        assert_eq!(host.placed.last().copied(), Some(expected));
    }

    #[test]
    fn quit_ends_the_loop() {
        let mut host = RecordingHost::default();
        let mut m = mascot(demo_store(), &mut host);
        let flow = m.handle(MascotEvent::Menu(MenuAction::Quit), Instant::now(), &mut host);
        assert_eq!(flow, Flow::Quit);
    }
}
