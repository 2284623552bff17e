/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! End-to-end scenarios driving frame controllers through the public API,
//! the way a window manager would: a shared priority coordinator, a shared
//! panel hub, and one controller per hosted frame.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use futures_util::future::LocalBoxFuture;
use framehost::frame::{ControllerDeps, EmbedderEvent, ErrorKind};
use framehost::panel::SignalHub;
use framehost::services::{
    HistoryService, MediaMetadata, ProcessService, ServiceError, WindowManagerHooks,
};
use framehost::surface::{
    EmbedderSurface, PermissionAnswer, Screenshot, SurfaceHost, SurfaceSpec,
};
use framehost::{
    FrameConfig, FrameController, FrameId, FramePhase, Pid, ProcessGroup,
    ProcessPriorityCoordinator, VERSION,
};

#[test]
fn scenarios_binary_smoke_runs() {
    assert!(!VERSION.is_empty());
}

struct StubSurface {
    pid: Pid,
    active: Cell<bool>,
    zoom: Cell<f64>,
}

impl EmbedderSurface for StubSurface {
    fn load(&self, _url: &str) {}
    fn go_back(&self) {}
    fn go_forward(&self) {}
    fn reload(&self) {}

    fn set_active(&self, active: bool) {
        self.active.set(active);
    }

    fn focus(&self) {}

    fn zoom(&self) -> f64 {
        self.zoom.get()
    }

    fn set_zoom(&self, zoom: f64) {
        self.zoom.set(zoom);
    }

    fn set_user_agent(&self, _user_agent: &str) {}
    fn toggle_reader_mode(&self) {}

    fn process_id(&self) -> Pid {
        self.pid
    }

    fn capture_screenshot(
        &self,
        mime_type: &str,
    ) -> LocalBoxFuture<'static, Result<Screenshot, ServiceError>> {
        let shot = Screenshot { mime_type: mime_type.to_string(), bytes: vec![1] };
        Box::pin(std::future::ready(Ok(shot)))
    }

    fn background_color(&self) -> LocalBoxFuture<'static, Result<String, ServiceError>> {
        Box::pin(std::future::ready(Ok("#101010".to_string())))
    }

    fn answer_permission(&self, _request_id: &str, _answer: PermissionAnswer) {}
    fn teardown(&self) {}
}

struct StubHost {
    next_pid: Cell<i64>,
    created: Cell<u32>,
}

impl StubHost {
    fn new() -> Rc<Self> {
        Rc::new(Self { next_pid: Cell::new(40), created: Cell::new(0) })
    }
}

impl SurfaceHost for StubHost {
    fn create_surface(&self, _spec: &SurfaceSpec) -> Rc<dyn EmbedderSurface> {
        let pid = Pid(self.next_pid.get());
        self.next_pid.set(pid.0 + 1);
        self.created.set(self.created.get() + 1);
        Rc::new(StubSurface { pid, active: Cell::new(false), zoom: Cell::new(1.0) })
    }
}

/// Records every priority-group assignment, in commit order.
#[derive(Default)]
struct AssignLog {
    assigns: RefCell<Vec<(Pid, ProcessGroup)>>,
    withdrawn: RefCell<Vec<Pid>>,
}

impl ProcessService for AssignLog {
    fn begin(&self, _owner: &str) -> LocalBoxFuture<'_, Result<(), ServiceError>> {
        Box::pin(async { Ok(()) })
    }

    fn assign(
        &self,
        pid: Pid,
        group: ProcessGroup,
    ) -> LocalBoxFuture<'_, Result<(), ServiceError>> {
        self.assigns.borrow_mut().push((pid, group));
        Box::pin(async { Ok(()) })
    }

    fn withdraw(&self, pid: Pid) -> LocalBoxFuture<'_, Result<(), ServiceError>> {
        self.withdrawn.borrow_mut().push(pid);
        Box::pin(async { Ok(()) })
    }

    fn commit(&self) -> LocalBoxFuture<'_, Result<(), ServiceError>> {
        Box::pin(async { Ok(()) })
    }
}

#[derive(Default)]
struct NullHistory;

impl HistoryService for NullHistory {
    fn visit_place(&self, _url: &str) -> LocalBoxFuture<'_, ()> {
        Box::pin(std::future::ready(()))
    }

    fn create_or_update_places_entry(
        &self,
        _url: &str,
        _title: &str,
        _icon: &str,
    ) -> LocalBoxFuture<'_, ()> {
        Box::pin(std::future::ready(()))
    }

    fn create_or_update_media_entry(
        &self,
        _url: &str,
        _icon: &str,
        _metadata: MediaMetadata,
    ) -> LocalBoxFuture<'_, ()> {
        Box::pin(std::future::ready(()))
    }

    fn register_open_search(&self, _url: &str, _icon: &str) -> LocalBoxFuture<'_, ()> {
        Box::pin(std::future::ready(()))
    }
}

#[derive(Default)]
struct NullWm;

impl WindowManagerHooks for NullWm {
    fn lock_swipe(&self) {}
    fn unlock_swipe(&self) {}
    fn close_frame(&self, _id: &FrameId, _previous: Option<&FrameId>) {}
    fn home_ready(&self) {}
}

struct Shell {
    host: Rc<StubHost>,
    log: Rc<AssignLog>,
    priority: Rc<ProcessPriorityCoordinator>,
    panel: Rc<SignalHub>,
}

impl Shell {
    fn new() -> Self {
        let host = StubHost::new();
        let log = Rc::new(AssignLog::default());
        let priority = ProcessPriorityCoordinator::new(Rc::clone(&log) as Rc<dyn ProcessService>);
        Self { host, log, priority, panel: SignalHub::new() }
    }

    fn frame(&self, config: FrameConfig) -> FrameController {
        let controller = FrameController::new(ControllerDeps {
            host: Rc::clone(&self.host) as Rc<dyn SurfaceHost>,
            priority: Rc::clone(&self.priority),
            history: Rc::new(NullHistory) as Rc<dyn HistoryService>,
            window_manager: Rc::new(NullWm) as Rc<dyn WindowManagerHooks>,
            panel: Rc::clone(&self.panel),
        });
        controller.set_config(config);
        controller.init().unwrap();
        controller
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Boot home, open an app over it, then fall back to home. The home process
/// must end up parked in the keep class, never plain background.
#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn scenario_app_switch_keeps_home_warm() {
    tokio::task::LocalSet::new()
        .run_until(async {
            let shell = Shell::new();
            let home = shell.frame(FrameConfig::home(
                FrameId::from("home"),
                "https://home.local/index.html",
            ));
            let app =
                shell.frame(FrameConfig::new(FrameId::from("app-1"), "https://app.example/"));
            let home_pid = home.pid();
            let app_pid = app.pid();

            home.activate();
            settle().await;

            // Switch to the app. Home demotes on its own schedule.
            home.deactivate();
            app.activate();
            tokio::time::sleep(Duration::from_millis(3005)).await;

            // Back home before teardown of anything.
            app.deactivate();
            home.activate();
            settle().await;

            let assigns = shell.log.assigns.borrow().clone();
            assert_eq!(
                assigns,
                vec![
                    (home_pid, ProcessGroup::Foreground),
                    (app_pid, ProcessGroup::Foreground),
                    (home_pid, ProcessGroup::TryToKeep),
                    (home_pid, ProcessGroup::Foreground),
                    (app_pid, ProcessGroup::Background),
                ]
            );
        })
        .await;
}

/// Closing an app withdraws its process entry; home is untouched.
#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn scenario_closing_app_withdraws_its_process() {
    tokio::task::LocalSet::new()
        .run_until(async {
            let shell = Shell::new();
            let app =
                shell.frame(FrameConfig::new(FrameId::from("app-1"), "https://app.example/"));
            let app_pid = app.pid();
            app.activate();
            settle().await;

            app.cleanup();
            settle().await;

            assert_eq!(app.phase(), FramePhase::Disposed);
            assert_eq!(shell.log.withdrawn.borrow().as_slice(), [app_pid]);
        })
        .await;
}

/// A crashed home surface comes back by itself and reaches first paint again.
#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn scenario_home_crash_recovers_unattended() {
    tokio::task::LocalSet::new()
        .run_until(async {
            let shell = Shell::new();
            let home = shell.frame(FrameConfig::home(
                FrameId::from("home"),
                "https://home.local/index.html",
            ));
            home.activate();
            settle().await;

            home.handle_event(EmbedderEvent::Error {
                kind: ErrorKind::Fatal,
                reason: "content process exited".into(),
            });
            assert_eq!(home.phase(), FramePhase::Crashed);

            tokio::time::sleep(Duration::from_millis(3005)).await;
            assert_eq!(home.phase(), FramePhase::Loading);
            assert_eq!(shell.host.created.get(), 2);

            home.handle_event(EmbedderEvent::DocumentFirstPaint);
            assert_eq!(home.phase(), FramePhase::Ready);
        })
        .await;
}

/// Snapshots are plain serializable data so adapters in other processes can
/// consume them.
#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn scenario_snapshots_serialize_for_adapters() {
    tokio::task::LocalSet::new()
        .run_until(async {
            let shell = Shell::new();
            let app =
                shell.frame(FrameConfig::new(FrameId::from("app-1"), "https://app.example/"));
            app.activate();
            settle().await;
            app.handle_event(EmbedderEvent::TitleChange { title: "Example".into() });

            let snapshot = app.snapshot().unwrap();
            let encoded = serde_json::to_value(&snapshot).unwrap();
            assert_eq!(encoded["id"], "app-1");
            assert_eq!(encoded["title"], "Example");
            assert_eq!(encoded["phase"], "loading");

            let decoded: framehost::FrameStateSnapshot =
                serde_json::from_value(encoded).unwrap();
            assert_eq!(decoded, snapshot);
        })
        .await;
}
