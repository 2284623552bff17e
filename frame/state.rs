/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use serde::{Deserialize, Serialize};

use crate::frame::FrameId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityState {
    Secure,
    Insecure,
    #[default]
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrashKind {
    /// The surface must be rebuilt.
    Fatal,
    /// The surface survives; only the loading indicator is cleared.
    Offline,
}

/// Load-oriented lifecycle phase. The active flag is orthogonal and lives on
/// the controller; `Crashed` and `Disposed` trump whatever came before.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramePhase {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Crashed,
    Disposed,
}

/// Mutable per-frame navigation/security/icon state, fed by the event
/// router. Pure data: rendering reads snapshots of it, never the reverse.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameState {
    pub url: String,
    pub title: String,
    pub security: SecurityState,
    pub icon_url: String,
    /// Monotonically non-decreasing within one navigation identity; reset to
    /// zero only when origin+path changes.
    pub icon_size: u32,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub zoom: f64,
    pub manifest_url: String,
    /// Sticky once set, until the shell acknowledges it.
    pub bring_attention: bool,
    pub background_color: Option<String>,
    /// True once a theme-color meta landed for the current navigation; a
    /// background color computed at load end must not override it.
    pub got_theme: bool,
    pub og_image: Option<String>,
    pub reader_mode: bool,
    pub loading: bool,
    pub search: Option<String>,
}

impl FrameState {
    pub fn new() -> Self {
        Self {
            zoom: 1.0,
            loading: true,
            ..Self::default()
        }
    }
}

/// What state observers receive: the frame state plus the bits of controller
/// state a rendering adapter projects (phase, activation, crash, indicator).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameStateSnapshot {
    pub id: FrameId,
    pub phase: FramePhase,
    pub activated: bool,
    pub crash: Option<CrashKind>,
    pub url: String,
    pub title: String,
    pub security: SecurityState,
    pub icon_url: String,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub zoom: f64,
    pub manifest_url: String,
    pub bring_attention: bool,
    pub background_color: Option<String>,
    pub reader_mode: bool,
    pub loading: bool,
    pub is_home: bool,
    pub search: Option<String>,
}
