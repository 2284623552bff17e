/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::rc::Rc;

use crate::frame::FrameId;
use crate::surface::SurfaceSpec;

/// What the loading placeholder shows before first paint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaceholderDetails {
    pub background_color: Option<String>,
    pub icon: Option<String>,
    pub title: Option<String>,
    /// Preferred search engine hint carried through to the UI state.
    pub search: Option<String>,
}

/// Frame configuration, attached once before init and retained for the
/// lifetime of the controller (crash recovery rebuilds the surface from it).
#[derive(Clone)]
pub struct FrameConfig {
    pub id: FrameId,
    pub start_url: String,
    pub is_home: bool,
    pub from_lockscreen: bool,
    /// Ran when a lockscreen-originated frame closes itself.
    pub when_closed: Option<Rc<dyn Fn()>>,
    /// Frame to restore focus to when this one closes.
    pub previous_frame: Option<FrameId>,
    pub browsing_context_group_id: Option<u64>,
    pub details: PlaceholderDetails,
}

impl FrameConfig {
    pub fn new(id: FrameId, start_url: impl Into<String>) -> Self {
        Self {
            id,
            start_url: start_url.into(),
            is_home: false,
            from_lockscreen: false,
            when_closed: None,
            previous_frame: None,
            browsing_context_group_id: None,
            details: PlaceholderDetails::default(),
        }
    }

    pub fn home(id: FrameId, start_url: impl Into<String>) -> Self {
        Self {
            is_home: true,
            ..Self::new(id, start_url)
        }
    }

    pub fn surface_spec(&self) -> SurfaceSpec {
        SurfaceSpec {
            start_url: self.start_url.clone(),
            transparent: self.is_home,
            browsing_context_group_id: self.browsing_context_group_id,
        }
    }
}

impl std::fmt::Debug for FrameConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameConfig")
            .field("id", &self.id)
            .field("start_url", &self.start_url)
            .field("is_home", &self.is_home)
            .field("from_lockscreen", &self.from_lockscreen)
            .field("previous_frame", &self.previous_frame)
            .field("browsing_context_group_id", &self.browsing_context_group_id)
            .field("details", &self.details)
            .finish_non_exhaustive()
    }
}
