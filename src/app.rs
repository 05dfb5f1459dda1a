use std::sync::Arc;

use glam::Vec2;
use instant::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalPosition, LogicalSize};
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId, WindowLevel};

use crate::assets::DirStore;
use crate::clock::FrameSink;
use crate::config::Config;
use crate::mascot::{Host, Mascot};
use crate::mode::{Flow, MascotEvent, MenuAction};
use crate::motion::Bounds;
use crate::platform;
use crate::render::GpuState;
use crate::sequence::Image;
use crate::tray::TrayIcon;
use crate::worker::{DecodeJob, DecodeOutcome, DecodeWorker};

/// Pointer travel (logical px) below which a press/release counts as a tap.
const TAP_SLOP: f32 = 4.0;

/// Posted into the event loop from other threads.
pub enum AppEvent {
    Decoded(DecodeOutcome),
}

// ---------------------------------------------------------------------------
// Pointer
// ---------------------------------------------------------------------------

/// Turns raw left-button input into taps and drag deltas.
///
/// Positions are window-relative. The window follows the pointer, so the
/// anchor stays put and each move yields the offset since the last one.
#[derive(Debug, Default)]
struct PointerDrag {
    anchor: Option<Vec2>,
    travel: f32,
}

impl PointerDrag {
    fn press(&mut self, at: Vec2) {
        self.anchor = Some(at);
        self.travel = 0.0;
    }

    fn moved(&mut self, at: Vec2) -> Option<Vec2> {
        let delta = at - self.anchor?;
        if delta == Vec2::ZERO {
            return None;
        }
        self.travel += delta.length();
        Some(delta)
    }

    /// True when the press never went anywhere.
    fn release(&mut self) -> bool {
        let was_held = self.anchor.take().is_some();
        was_held && self.travel < TAP_SLOP
    }
}

// ---------------------------------------------------------------------------
// Host adapter
// ---------------------------------------------------------------------------

/// The window seen from the mascot's side: frames go to the GPU, moves go to
/// the window, decodes go to the worker.
struct Shell<'a> {
    window: &'a Window,
    gpu: &'a mut GpuState,
    worker: &'a DecodeWorker,
    half_extent: Vec2,
}

impl FrameSink for Shell<'_> {
    fn show(&mut self, image: &Image) {
        self.gpu.upload(image);
        self.window.request_redraw();
    }
}

impl Host for Shell<'_> {
    fn place(&mut self, center: Vec2) {
        let top_left = center - self.half_extent;
        self.window
            .set_outer_position(LogicalPosition::new(top_left.x as f64, top_left.y as f64));
    }

    fn visible_bounds(&mut self) -> Option<Bounds> {
        platform::visible_bounds(self.window)
    }

    fn submit(&mut self, job: DecodeJob) {
        self.worker.submit(job);
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Everything that exists once the window does.
struct Running {
    window: Arc<Window>,
    gpu: GpuState,
    mascot: Mascot,
    tray: TrayIcon,
}

/// Top-level application state.
struct App {
    config: Config,
    worker: DecodeWorker,
    running: Option<Running>,
    pointer: PointerDrag,
    cursor: Vec2,
}

impl App {
    fn new(config: Config, worker: DecodeWorker) -> Self {
        Self {
            config,
            worker,
            running: None,
            pointer: PointerDrag::default(),
            cursor: Vec2::ZERO,
        }
    }

    fn half_extent(&self) -> Vec2 {
        Vec2::splat(self.config.size as f32 / 2.0)
    }

    fn with_mascot<R>(&mut self, f: impl FnOnce(&mut Mascot, &mut Shell) -> R) -> Option<R> {
        let half_extent = self.half_extent();
        let running = self.running.as_mut()?;
        let mut shell = Shell {
            window: &running.window,
            gpu: &mut running.gpu,
            worker: &self.worker,
            half_extent,
        };
        Some(f(&mut running.mascot, &mut shell))
    }

    fn dispatch(&mut self, event_loop: &ActiveEventLoop, event: MascotEvent) {
        let now = Instant::now();
        let Some((flow, mode)) = self.with_mascot(|m, shell| {
            let flow = m.handle(event, now, shell);
            (flow, m.mode())
        }) else {
            return;
        };

        if flow == Flow::Quit {
            event_loop.exit();
            return;
        }
        if let Some(running) = &self.running {
            running.tray.set_mode(mode);
        }
        self.schedule(event_loop);
    }

    /// Sleep until the next playback or motion tick.
    fn schedule(&self, event_loop: &ActiveEventLoop) {
        let deadline = self.running.as_ref().and_then(|r| r.mascot.next_deadline());
        match deadline {
            Some(at) => event_loop.set_control_flow(ControlFlow::WaitUntil(at)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn logical(&self, position: winit::dpi::PhysicalPosition<f64>) -> Vec2 {
        let scale = self
            .running
            .as_ref()
            .map_or(1.0, |r| r.window.scale_factor());
        let p = position.to_logical::<f32>(scale);
        Vec2::new(p.x, p.y)
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }

        let size = self.config.size as f64;
        let top_left = self.config.start - self.half_extent();

        // On Windows transparency comes from wgpu's DxgiFromVisual +
        // PreMultiplied alpha; with_transparent would set WS_EX_LAYERED.
        // Start hidden so DWM doesn't cache a stale frame.
        let attrs = WindowAttributes::default()
            .with_title("Desktop Mascot")
            .with_decorations(false)
            .with_resizable(false)
            .with_transparent(!cfg!(windows))
            .with_visible(false)
            .with_window_level(WindowLevel::AlwaysOnTop)
            .with_inner_size(LogicalSize::new(size, size))
            .with_position(LogicalPosition::new(top_left.x as f64, top_left.y as f64));

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .expect("failed to create window"),
        );

        #[cfg(windows)]
        platform::win32::setup_mascot_window(&window);

        let mut gpu = GpuState::new(window.clone());
        log::info!("wgpu + sprite pipeline initialized");

        let store = DirStore::new(self.config.assets.clone());
        if !store.root().is_dir() {
            log::warn!(
                "Asset directory {} not found, only the built-in icon is available",
                store.root().display()
            );
        }

        let mut shell = Shell {
            window: &window,
            gpu: &mut gpu,
            worker: &self.worker,
            half_extent: self.half_extent(),
        };
        let mascot = Mascot::new(&self.config, Box::new(store), &mut shell);

        let tray = TrayIcon::new();
        tray.set_mode(mascot.mode());

        window.set_visible(true);
        self.running = Some(Running {
            window,
            gpu,
            mascot,
            tray,
        });
        self.schedule(event_loop);
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::Decoded(outcome) => {
                let now = Instant::now();
                self.with_mascot(|m, shell| m.finish_decode(outcome, now, shell));
                self.schedule(event_loop);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let picked = self.running.as_ref().and_then(|r| r.tray.poll());
        if let Some(action) = picked {
            self.dispatch(event_loop, MascotEvent::Menu(action));
        }

        let now = Instant::now();
        self.with_mascot(|m, shell| m.poll(now, shell));
        self.schedule(event_loop);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(running) = &mut self.running {
                    running.gpu.resize(new_size.width, new_size.height);
                    running.window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(running) = &self.running {
                    running.gpu.render_frame();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = self.logical(position);
                if let Some(delta) = self.pointer.moved(self.cursor) {
                    self.dispatch(event_loop, MascotEvent::Drag(delta));
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.pointer.press(self.cursor),
                ElementState::Released => {
                    if self.pointer.release() {
                        self.dispatch(event_loop, MascotEvent::Tap);
                    }
                }
            },
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Right,
                ..
            } => {
                let picked = self.running.as_ref().and_then(|r| r.tray.popup());
                if let Some(action) = picked {
                    self.dispatch(event_loop, MascotEvent::Menu(action));
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let action = match &event.logical_key {
                    Key::Named(NamedKey::Escape) => Some(MenuAction::Quit),
                    Key::Character(s) => s.chars().next().and_then(MenuAction::from_key),
                    _ => None,
                };
                if let Some(action) = action {
                    self.dispatch(event_loop, MascotEvent::Menu(action));
                }
            }
            _ => {}
        }
    }
}

/// Entry point: spawn the decode worker, create the event loop and run.
pub fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = EventLoop::<AppEvent>::with_user_event().build()?;
    let proxy: EventLoopProxy<AppEvent> = event_loop.create_proxy();

    let worker = DecodeWorker::spawn(move |outcome| {
        if proxy.send_event(AppEvent::Decoded(outcome)).is_err() {
            log::debug!("Event loop gone, dropping decode result");
        }
    })?;

    log::info!("Assets from {}, cadence {:?}", config.assets.display(), config.cadence);
    let mut app = App::new(config, worker);
    event_loop.run_app(&mut app)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_in_place_is_a_tap() {
        let mut p = PointerDrag::default();
        p.press(Vec2::new(50.0, 50.0));
        assert_eq!(p.moved(Vec2::new(51.0, 50.0)), Some(Vec2::new(1.0, 0.0)));
        assert!(p.release());
    }

    #[test]
    fn drag_is_not_a_tap() {
        let mut p = PointerDrag::default();
        p.press(Vec2::new(50.0, 50.0));
        assert_eq!(p.moved(Vec2::new(60.0, 40.0)), Some(Vec2::new(10.0, -10.0)));
        assert!(!p.release());
    }

    #[test]
    fn moves_without_press_are_ignored() {
        let mut p = PointerDrag::default();
        assert_eq!(p.moved(Vec2::new(10.0, 10.0)), None);
        assert!(!p.release());
    }
}
