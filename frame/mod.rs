/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! One hosted embedded browsing surface and its lifecycle state machine.

mod config;
mod controller;
mod events;
mod icon;
mod state;

use serde::{Deserialize, Serialize};

pub use config::{FrameConfig, PlaceholderDetails};
pub use controller::{ControllerDeps, FrameController, FrameError};
pub use events::{EmbedderEvent, ErrorKind, MediaSessionEvent, PlaybackState, RouteOutcome, SideEffect};
pub use icon::{BestIcon, IconCandidate, SCALABLE_ICON_SIZE};
pub use state::{CrashKind, FramePhase, FrameState, FrameStateSnapshot, SecurityState};

/// Identifier assigned by the window manager when it hosts a frame.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameId(pub String);

impl From<&str> for FrameId {
    fn from(id: &str) -> Self {
        FrameId(id.to_string())
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
