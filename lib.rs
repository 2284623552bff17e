/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Content-frame lifecycle coordination for a mobile system shell.
//!
//! The shell hosts embedded browsing surfaces ("frames"): the home surface,
//! regular apps, and web content opened from them. This crate owns the part
//! of the shell with real lifecycle semantics: the per-frame state machine
//! (load, activate, deactivate-with-debounce, crash, recreate), the
//! transactional process-priority protocol that maps frame activation onto
//! OS scheduling hints, the timer cluster around scrolling and overscroll,
//! best-icon selection, and screenshot-capture throttling.
//!
//! Rendering, localization, and dialog chrome are collaborator concerns.
//! Hosts inject the embedder surface, the process-management service, the
//! history/media service, and the window-manager hooks through the traits in
//! [`services`] and [`surface`], and project [`frame::FrameStateSnapshot`]s
//! onto whatever UI they own.
//!
//! Controllers are single-threaded cooperative objects: drive them from a
//! current-thread tokio runtime inside a `LocalSet`.

pub mod frame;
pub mod panel;
pub mod priority;
pub mod services;
pub mod surface;
pub mod timer;

pub use frame::{
    FrameConfig, FrameController, FrameError, FrameId, FramePhase, FrameStateSnapshot,
};
pub use priority::{Pid, ProcessGroup, ProcessPriorityCoordinator};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
