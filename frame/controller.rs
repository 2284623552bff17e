/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The frame controller: one embedded browsing surface and its lifecycle.
//!
//! Owns the load/activate/deactivate/crash/recreate state machine, the
//! scroll and overscroll timer cluster, screenshot throttling, and the
//! delegation to the process-priority coordinator and the history service.
//! The controller has no rendering dependency: adapters observe it through
//! [`FrameStateSnapshot`]s on the update channel.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use futures_util::future::LocalBoxFuture;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::frame::config::FrameConfig;
use crate::frame::events::{self, EmbedderEvent, MediaSessionEvent, PlaybackState, SideEffect};
use crate::frame::state::{CrashKind, FramePhase, FrameState, FrameStateSnapshot};
use crate::frame::FrameId;
use crate::panel::{PanelSignal, SignalHub};
use crate::priority::{Pid, ProcessPriorityCoordinator};
use crate::services::{HistoryService, MediaMetadata, WindowManagerHooks};
use crate::surface::{EmbedderSurface, Screenshot, SurfaceHost};
use crate::timer::{
    TimerKey, TimerSet, CRASH_RECREATE_DELAY, HOME_DEACTIVATE_DELAY, NAVIGATION_DISPLAY_DURATION,
    NAVIGATION_FADE_DURATION, OVERSCROLL_ARM_DURATION, SWIPE_LOCK_DURATION,
};

const SCREENSHOT_MIME: &str = "image/jpeg";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("set_config() must be called before init()")]
    ConfigMissing,
    #[error("frame is already initialized")]
    AlreadyInitialized,
    #[error("frame is disposed")]
    Disposed,
}

/// Everything a controller reaches outside itself for, injected at
/// construction. No ambient lookups.
pub struct ControllerDeps {
    pub host: Rc<dyn SurfaceHost>,
    pub priority: Rc<ProcessPriorityCoordinator>,
    pub history: Rc<dyn HistoryService>,
    pub window_manager: Rc<dyn WindowManagerHooks>,
    pub panel: Rc<SignalHub>,
}

pub struct FrameController {
    inner: Rc<Inner>,
    updates: RefCell<Option<mpsc::UnboundedReceiver<FrameStateSnapshot>>>,
}

struct Inner {
    weak: Weak<Inner>,
    deps: ControllerDeps,
    config: RefCell<Option<FrameConfig>>,
    phase: Cell<FramePhase>,
    crash: Cell<Option<CrashKind>>,
    activated: Cell<bool>,
    pid: Cell<Pid>,
    state: RefCell<FrameState>,
    surface: RefCell<Option<Rc<dyn EmbedderSurface>>>,
    timers: TimerSet,
    nav_indicator_visible: Cell<bool>,
    overscroll_reload_armed: Cell<bool>,
    playback_state: Cell<PlaybackState>,
    media_metadata: RefCell<MediaMetadata>,
    last_screenshot: RefCell<Screenshot>,
    capture_in_flight: Cell<bool>,
    capture_waiters: RefCell<Vec<oneshot::Sender<Screenshot>>>,
    updates: mpsc::UnboundedSender<FrameStateSnapshot>,
}

impl FrameController {
    pub fn new(deps: ControllerDeps) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let inner = Rc::new_cyclic(|weak| Inner {
            weak: weak.clone(),
            deps,
            config: RefCell::new(None),
            phase: Cell::new(FramePhase::Uninitialized),
            crash: Cell::new(None),
            activated: Cell::new(false),
            pid: Cell::new(Pid::UNSET),
            state: RefCell::new(FrameState::new()),
            surface: RefCell::new(None),
            timers: TimerSet::new(),
            nav_indicator_visible: Cell::new(false),
            overscroll_reload_armed: Cell::new(false),
            playback_state: Cell::new(PlaybackState::Stopped),
            media_metadata: RefCell::new(MediaMetadata::default()),
            last_screenshot: RefCell::new(Screenshot::default()),
            capture_in_flight: Cell::new(false),
            capture_waiters: RefCell::new(Vec::new()),
            updates: sender,
        });
        Self { inner, updates: RefCell::new(Some(receiver)) }
    }

    /// State snapshots for the rendering adapter. One receiver per frame.
    pub fn take_updates(&self) -> Option<mpsc::UnboundedReceiver<FrameStateSnapshot>> {
        self.updates.borrow_mut().take()
    }

    pub fn set_config(&self, config: FrameConfig) {
        if self.inner.phase.get() != FramePhase::Uninitialized {
            log::warn!("set_config() after init is ignored");
            return;
        }
        self.inner.state.borrow_mut().search = config.details.search.clone();
        *self.inner.config.borrow_mut() = Some(config);
    }

    /// `Uninitialized -> Loading`: creates the embedded surface from the
    /// attached configuration.
    pub fn init(&self) -> Result<(), FrameError> {
        self.inner.init()
    }

    pub fn activate(&self) {
        self.inner.activate();
    }

    pub fn deactivate(&self) {
        self.inner.deactivate();
    }

    pub fn handle_event(&self, event: EmbedderEvent) {
        self.inner.handle_event(event);
    }

    pub fn handle_media_event(&self, event: MediaSessionEvent) {
        self.inner.handle_media_event(event);
    }

    pub fn goto(&self, url: &str) {
        if let Some(surface) = self.inner.surface() {
            surface.load(url);
        }
    }

    pub fn go_back(&self) {
        if let Some(surface) = self.inner.surface() {
            surface.go_back();
        }
    }

    pub fn go_forward(&self) {
        if let Some(surface) = self.inner.surface() {
            surface.go_forward();
        }
    }

    pub fn reload(&self) {
        if let Some(surface) = self.inner.surface() {
            surface.reload();
        }
    }

    pub fn zoom_in(&self) {
        self.inner.zoom_in();
    }

    pub fn zoom_out(&self) {
        self.inner.zoom_out();
    }

    pub fn zoom_reset(&self) {
        self.inner.zoom_reset();
    }

    /// Throttled capture: resolves with an empty screenshot right away when
    /// one is already in flight for this frame, or for the home surface.
    pub fn request_screenshot(&self) -> LocalBoxFuture<'static, Screenshot> {
        self.inner.request_screenshot()
    }

    /// Last stored screenshot plus a fresh capture, without blocking on the
    /// fresh one.
    pub fn screenshot(&self) -> (Screenshot, LocalBoxFuture<'static, Screenshot>) {
        let current = self.inner.last_screenshot.borrow().clone();
        (current, self.inner.request_screenshot())
    }

    /// `Crashed -> Ready` path: rebuilds the surface from retained config.
    pub fn recreate(&self) -> Result<(), FrameError> {
        self.inner.recreate()
    }

    /// Terminal teardown; withdraws the process-priority entry.
    pub fn cleanup(&self) {
        self.inner.cleanup();
    }

    pub fn phase(&self) -> FramePhase {
        self.inner.phase.get()
    }

    pub fn crash(&self) -> Option<CrashKind> {
        self.inner.crash.get()
    }

    pub fn is_activated(&self) -> bool {
        self.inner.activated.get()
    }

    pub fn pid(&self) -> Pid {
        self.inner.pid.get()
    }

    pub fn nav_indicator_visible(&self) -> bool {
        self.inner.nav_indicator_visible.get()
    }

    pub fn snapshot(&self) -> Option<FrameStateSnapshot> {
        self.inner.snapshot()
    }
}

impl Inner {
    fn surface(&self) -> Option<Rc<dyn EmbedderSurface>> {
        self.surface.borrow().clone()
    }

    fn frame_id(&self) -> Option<FrameId> {
        self.config.borrow().as_ref().map(|config| config.id.clone())
    }

    fn is_home(&self) -> bool {
        self.config.borrow().as_ref().is_some_and(|config| config.is_home)
    }

    fn snapshot(&self) -> Option<FrameStateSnapshot> {
        let config = self.config.borrow();
        let config = config.as_ref()?;
        let state = self.state.borrow();
        Some(FrameStateSnapshot {
            id: config.id.clone(),
            phase: self.phase.get(),
            activated: self.activated.get(),
            crash: self.crash.get(),
            url: state.url.clone(),
            title: state.title.clone(),
            security: state.security,
            icon_url: state.icon_url.clone(),
            can_go_back: state.can_go_back,
            can_go_forward: state.can_go_forward,
            zoom: state.zoom,
            manifest_url: state.manifest_url.clone(),
            bring_attention: state.bring_attention,
            background_color: state.background_color.clone(),
            reader_mode: state.reader_mode,
            loading: state.loading,
            is_home: config.is_home,
            search: state.search.clone(),
        })
    }

    /// Pushes a snapshot to observers; gated on activation like the rest of
    /// the UI sync path.
    fn emit_state(&self) {
        if !self.activated.get() {
            return;
        }
        self.emit_state_unconditional();
    }

    fn emit_state_unconditional(&self) {
        if let Some(snapshot) = self.snapshot() {
            let _ = self.updates.send(snapshot);
        }
    }

    fn init(&self) -> Result<(), FrameError> {
        match self.phase.get() {
            FramePhase::Uninitialized => {},
            FramePhase::Disposed => return Err(FrameError::Disposed),
            _ => return Err(FrameError::AlreadyInitialized),
        }
        let config = self.config.borrow();
        let Some(config) = config.as_ref() else {
            log::error!("FrameController::set_config() must be called before init()");
            return Err(FrameError::ConfigMissing);
        };

        let surface = self.deps.host.create_surface(&config.surface_spec());
        self.pid.set(surface.process_id());

        {
            let mut state = self.state.borrow_mut();
            if config.start_url == "about:blank" {
                // Nothing to wait for; treat the empty page as settled.
                state.loading = false;
                state.security = crate::frame::state::SecurityState::Secure;
            }
        }

        *self.surface.borrow_mut() = Some(surface);
        self.phase.set(FramePhase::Loading);
        Ok(())
    }

    fn activate(&self) {
        if self.activated.get() || self.phase.get() == FramePhase::Disposed {
            return;
        }

        // A pending demotion must never hit a frame that came back.
        self.timers.cancel(TimerKey::Deactivate);

        self.activated.set(true);
        if let Some(id) = self.frame_id() {
            let weak = self.weak.clone();
            self.deps.panel.subscribe(
                id,
                Rc::new(move |signal| {
                    if let Some(inner) = weak.upgrade() {
                        inner.handle_panel_signal(signal);
                    }
                }),
            );
        }

        if let Some(surface) = self.surface() {
            surface.set_active(true);
            surface.focus();
        }

        let pid = self.pid.get();
        if pid.is_set() {
            let priority = Rc::clone(&self.deps.priority);
            tokio::task::spawn_local(async move {
                priority.set_foreground(pid).await;
            });
        }

        self.emit_state();

        // Reset scroll-driven indicator state from the previous activation.
        self.nav_indicator_visible.set(false);
        self.timers.cancel(TimerKey::NavigationHide);
        self.timers.cancel(TimerKey::NavigationFade);
        self.timers.cancel(TimerKey::SwipeLock);
    }

    fn deactivate(&self) {
        if !self.activated.get() {
            return;
        }

        self.activated.set(false);
        if let Some(id) = self.frame_id() {
            self.deps.panel.unsubscribe(&id);
        }

        // The demotion is debounced; an already-armed timer keeps its
        // original deadline across repeated deactivate calls.
        if self.timers.is_armed(TimerKey::Deactivate) {
            return;
        }

        let delay = if self.is_home() { HOME_DEACTIVATE_DELAY } else { Duration::ZERO };
        let weak = self.weak.clone();
        self.timers.schedule(TimerKey::Deactivate, delay, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Some(surface) = inner.surface() {
                surface.set_active(false);
            }
            let pid = inner.pid.get();
            if pid.is_set() {
                let priority = Rc::clone(&inner.deps.priority);
                let try_to_keep = inner.is_home();
                tokio::task::spawn_local(async move {
                    priority.set_background(pid, try_to_keep).await;
                });
            }
        });
    }

    fn handle_panel_signal(&self, signal: PanelSignal) {
        match signal {
            PanelSignal::ZoomIn => self.zoom_in(),
            PanelSignal::ZoomOut => self.zoom_out(),
            PanelSignal::NavBack => {
                if let Some(surface) = self.surface() {
                    surface.go_back();
                }
            },
            PanelSignal::NavForward => {
                if let Some(surface) = self.surface() {
                    surface.go_forward();
                }
            },
            PanelSignal::NavReload => {
                if let Some(surface) = self.surface() {
                    surface.reload();
                }
            },
            PanelSignal::ToggleReaderMode => {
                if let Some(surface) = self.surface() {
                    surface.toggle_reader_mode();
                }
            },
            PanelSignal::ChangeUserAgent(user_agent) => {
                if let Some(surface) = self.surface() {
                    surface.set_user_agent(&user_agent);
                    surface.reload();
                }
            },
        }
    }

    fn handle_event(&self, event: EmbedderEvent) {
        if self.phase.get() == FramePhase::Disposed {
            return;
        }

        match &event {
            EmbedderEvent::ProcessReady { pid } => self.pid.set(*pid),
            EmbedderEvent::DocumentFirstPaint => {
                if self.phase.get() == FramePhase::Loading {
                    self.phase.set(FramePhase::Ready);
                }
            },
            _ => {},
        }

        let outcome = {
            let config = self.config.borrow();
            let Some(config) = config.as_ref() else {
                log::warn!("dropping embedder event before set_config()");
                return;
            };
            events::route(&mut self.state.borrow_mut(), config, event)
        };

        for effect in outcome.effects {
            self.run_effect(effect);
        }

        if outcome.ui_sync || outcome.places_sync {
            self.update_ui(outcome.places_sync);
        }
    }

    fn run_effect(&self, effect: SideEffect) {
        match effect {
            SideEffect::RefreshScreenshot => {
                let _refresh = self.request_screenshot();
            },
            SideEffect::ArmScrollTimers => self.on_scroll(),
            SideEffect::HomeReady => self.deps.window_manager.home_ready(),
            SideEffect::ClearLoader => self.emit_state(),
            SideEffect::FatalCrash => self.enter_crashed(),
            SideEffect::LockSwipe => self.deps.window_manager.lock_swipe(),
            SideEffect::UnlockSwipe => self.deps.window_manager.unlock_swipe(),
            SideEffect::VisitPlace => {
                let history = Rc::clone(&self.deps.history);
                let url = self.state.borrow().url.clone();
                tokio::task::spawn_local(async move {
                    history.visit_place(&url).await;
                });
            },
            SideEffect::AnswerPermission { request_id, answer } => {
                if let Some(surface) = self.surface() {
                    surface.answer_permission(&request_id, answer);
                }
            },
            SideEffect::RequestClose => {
                let (id, previous, when_closed, from_lockscreen) = {
                    let config = self.config.borrow();
                    let Some(config) = config.as_ref() else {
                        return;
                    };
                    (
                        config.id.clone(),
                        config.previous_frame.clone(),
                        config.when_closed.clone(),
                        config.from_lockscreen,
                    )
                };
                if from_lockscreen && let Some(when_closed) = when_closed {
                    when_closed();
                }
                self.deps.window_manager.close_frame(&id, previous.as_ref());
            },
            SideEffect::FetchBackgroundColor => self.fetch_background_color(),
            SideEffect::RegisterOpenSearch { href } => {
                let history = Rc::clone(&self.deps.history);
                let icon = self.state.borrow().icon_url.clone();
                tokio::task::spawn_local(async move {
                    history.register_open_search(&href, &icon).await;
                });
            },
            SideEffect::OverscrollPullStart => self.on_overscroll_start(),
            SideEffect::OverscrollPullEnd => self.on_overscroll_end(),
        }
    }

    fn update_ui(&self, places_sync: bool) {
        if !self.activated.get() {
            return;
        }
        self.emit_state_unconditional();

        let (is_home, url, title, icon) = {
            let state = self.state.borrow();
            (self.is_home(), state.url.clone(), state.title.clone(), state.icon_url.clone())
        };
        if is_home || url.is_empty() {
            return;
        }
        if places_sync {
            let history = Rc::clone(&self.deps.history);
            tokio::task::spawn_local(async move {
                history.create_or_update_places_entry(&url, &title, &icon).await;
            });
        }
    }

    fn fetch_background_color(&self) {
        let Some(surface) = self.surface() else {
            return;
        };
        let weak = self.weak.clone();
        tokio::task::spawn_local(async move {
            let result = surface.background_color().await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match result {
                // Check again that a theme-color meta did not race us in.
                Ok(color) if !inner.state.borrow().got_theme => {
                    inner.state.borrow_mut().background_color = Some(color);
                },
                Ok(_) => return,
                Err(error) => {
                    log::error!("background color fetch failed: {error}");
                },
            }
            inner.update_ui(true);
        });
    }

    fn on_scroll(&self) {
        self.timers.cancel(TimerKey::NavigationHide);
        self.timers.cancel(TimerKey::NavigationFade);

        // Lock app switching for the duration of the scroll; quiet period
        // releases it.
        if !self.timers.is_armed(TimerKey::SwipeLock) {
            self.deps.window_manager.lock_swipe();
        }
        let weak = self.weak.clone();
        self.timers.schedule(TimerKey::SwipeLock, SWIPE_LOCK_DURATION, move || {
            if let Some(inner) = weak.upgrade() {
                inner.deps.window_manager.unlock_swipe();
            }
        });

        self.nav_indicator_visible.set(true);
        let weak = self.weak.clone();
        self.timers.schedule(TimerKey::NavigationHide, NAVIGATION_DISPLAY_DURATION, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // Scrolling stabilized: refresh the screenshot, then fade the
            // indicator out before hiding it.
            let _refresh = inner.request_screenshot();
            let weak = inner.weak.clone();
            inner.timers.schedule(TimerKey::NavigationFade, NAVIGATION_FADE_DURATION, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.nav_indicator_visible.set(false);
                }
            });
        });
    }

    fn on_overscroll_start(&self) {
        if !self.activated.get() || self.is_home() {
            return;
        }
        self.overscroll_reload_armed.set(false);
        let weak = self.weak.clone();
        self.timers.schedule(TimerKey::OverscrollArm, OVERSCROLL_ARM_DURATION, move || {
            if let Some(inner) = weak.upgrade() {
                inner.overscroll_reload_armed.set(true);
            }
        });
    }

    fn on_overscroll_end(&self) {
        if !self.activated.get() || self.is_home() {
            return;
        }
        self.timers.cancel(TimerKey::OverscrollArm);
        if self.overscroll_reload_armed.replace(false)
            && let Some(surface) = self.surface()
        {
            surface.reload();
        }
    }

    fn enter_crashed(&self) {
        self.phase.set(FramePhase::Crashed);
        self.crash.set(Some(CrashKind::Fatal));
        // Crash always reaches observers, active or not: the adapter owns
        // the recoverable-error presentation.
        self.emit_state_unconditional();

        if self.is_home() {
            let weak = self.weak.clone();
            self.timers.schedule(TimerKey::CrashRecreate, CRASH_RECREATE_DELAY, move || {
                if let Some(inner) = weak.upgrade()
                    && let Err(error) = inner.recreate()
                {
                    log::error!("home surface recreate failed: {error}");
                }
            });
        }
    }

    fn recreate(&self) -> Result<(), FrameError> {
        if self.phase.get() == FramePhase::Disposed {
            return Err(FrameError::Disposed);
        }
        let spec = {
            let config = self.config.borrow();
            let Some(config) = config.as_ref() else {
                return Err(FrameError::ConfigMissing);
            };
            config.surface_spec()
        };

        // Transient bindings and timers tied to the old surface go away;
        // the configuration and navigation state are retained.
        self.timers.cancel(TimerKey::OverscrollArm);
        self.timers.cancel(TimerKey::NavigationHide);
        self.timers.cancel(TimerKey::NavigationFade);
        self.timers.cancel(TimerKey::SwipeLock);
        self.timers.cancel(TimerKey::CrashRecreate);
        self.overscroll_reload_armed.set(false);
        self.nav_indicator_visible.set(false);

        if let Some(surface) = self.surface.borrow_mut().take() {
            surface.teardown();
        }
        let surface = self.deps.host.create_surface(&spec);
        *self.surface.borrow_mut() = Some(surface);

        self.crash.set(None);
        self.phase.set(FramePhase::Loading);
        self.state.borrow_mut().loading = true;
        self.emit_state_unconditional();
        Ok(())
    }

    fn cleanup(&self) {
        if self.phase.get() == FramePhase::Disposed {
            return;
        }
        self.phase.set(FramePhase::Disposed);
        self.activated.set(false);
        self.timers.cancel_all();
        if let Some(id) = self.frame_id() {
            self.deps.panel.unsubscribe(&id);
        }

        let pid = self.pid.get();
        if pid.is_set() {
            let priority = Rc::clone(&self.deps.priority);
            tokio::task::spawn_local(async move {
                priority.remove(pid).await;
            });
        }

        if let Some(surface) = self.surface.borrow_mut().take() {
            surface.teardown();
        }
    }

    fn zoom_in(&self) {
        self.adjust_zoom(|zoom| (zoom * 11.0).round() / 10.0);
    }

    fn zoom_out(&self) {
        self.adjust_zoom(|zoom| ((10.0 * zoom) / 1.1).round() / 10.0);
    }

    fn zoom_reset(&self) {
        self.adjust_zoom(|_| 1.0);
    }

    fn adjust_zoom(&self, next: impl Fn(f64) -> f64) {
        if !self.activated.get() {
            return;
        }
        let Some(surface) = self.surface() else {
            return;
        };
        let new_zoom = next(surface.zoom());
        surface.set_zoom(new_zoom);
        self.state.borrow_mut().zoom = new_zoom;
        self.emit_state();
    }

    fn handle_media_event(&self, event: MediaSessionEvent) {
        match event {
            MediaSessionEvent::MetadataChange { title, artist, album } => {
                let mut metadata = self.media_metadata.borrow_mut();
                metadata.title = title;
                metadata.artist = artist;
                metadata.album = album;
            },
            MediaSessionEvent::PlaybackStateChange(state) => self.playback_state.set(state),
        }

        // While something is playing, keep the media index entry current.
        if self.playback_state.get() != PlaybackState::Playing {
            return;
        }
        let (url, icon, metadata) = {
            let state = self.state.borrow();
            let mut metadata = self.media_metadata.borrow().clone();
            metadata.og_image = state.og_image.clone();
            metadata.background_color = state.background_color.clone();
            (state.url.clone(), state.icon_url.clone(), metadata)
        };
        let history = Rc::clone(&self.deps.history);
        tokio::task::spawn_local(async move {
            history.create_or_update_media_entry(&url, &icon, metadata).await;
        });
    }

    fn request_screenshot(&self) -> LocalBoxFuture<'static, Screenshot> {
        // The home surface never appears in the carousel; nothing to capture.
        if self.is_home() {
            return Box::pin(std::future::ready(Screenshot::default()));
        }
        if self.capture_in_flight.get() {
            return Box::pin(std::future::ready(Screenshot::default()));
        }
        let Some(surface) = self.surface() else {
            return Box::pin(std::future::ready(Screenshot::default()));
        };

        self.capture_in_flight.set(true);
        let (sender, receiver) = oneshot::channel();
        self.capture_waiters.borrow_mut().push(sender);

        let weak = self.weak.clone();
        tokio::task::spawn_local(async move {
            // Defer to an idle point so capture does not compete with the
            // event that requested it.
            tokio::task::yield_now().await;
            let result = surface.capture_screenshot(SCREENSHOT_MIME).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.capture_in_flight.set(false);
            let screenshot = match result {
                Ok(screenshot) => {
                    *inner.last_screenshot.borrow_mut() = screenshot.clone();
                    screenshot
                },
                Err(error) => {
                    // Waiters still resolve, with an empty capture.
                    log::error!("screenshot capture failed: {error}");
                    Screenshot::default()
                },
            };
            for waiter in inner.capture_waiters.borrow_mut().drain(..) {
                let _ = waiter.send(screenshot.clone());
            }
        });

        Box::pin(async move { receiver.await.unwrap_or_default() })
    }
}
