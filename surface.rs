/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The embedded browsing surface boundary.
//!
//! The controller never touches a real webview: it drives this trait, and
//! the host's rendering adapter (or a test mock) implements it. Surfaces are
//! created through [`SurfaceHost`] so crash recovery can discard one and
//! rebuild it from the retained [`SurfaceSpec`].

use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use crate::priority::Pid;
use crate::services::ServiceError;

/// Captured frame pixels, encoded. Empty when no capture was available.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Screenshot {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Screenshot {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One permission being requested by content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDescriptor {
    pub action: String,
    pub options: Vec<String>,
}

/// A permission-prompt request as reported by the embedder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub request_action: String,
    pub request_id: String,
    pub origin: String,
    /// Ordered: the answer picks the first offered option per permission.
    pub permissions: Vec<(String, PermissionDescriptor)>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionAnswer {
    pub origin: String,
    pub granted: bool,
    pub remember: bool,
    pub choices: Vec<(String, String)>,
}

/// How a surface should be instantiated; retained by the controller so a
/// crashed surface can be recreated with identical settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceSpec {
    pub start_url: String,
    /// Home surfaces render transparent over the wallpaper.
    pub transparent: bool,
    pub browsing_context_group_id: Option<u64>,
}

/// Lifecycle and navigation operations of one embedded browsing surface.
pub trait EmbedderSurface {
    fn load(&self, url: &str);
    fn go_back(&self);
    fn go_forward(&self);
    fn reload(&self);

    /// Marks the surface as the one receiving input and compositing.
    fn set_active(&self, active: bool);
    fn focus(&self);

    fn zoom(&self) -> f64;
    fn set_zoom(&self, zoom: f64);

    fn set_user_agent(&self, user_agent: &str);
    fn toggle_reader_mode(&self);

    /// Process id of the backing content process, [`Pid::UNSET`] until it
    /// started. Later changes arrive as `ProcessReady` events.
    fn process_id(&self) -> Pid;

    fn capture_screenshot(
        &self,
        mime_type: &str,
    ) -> LocalBoxFuture<'static, Result<Screenshot, ServiceError>>;

    /// Computed page background color, used when no theme-color meta showed
    /// up by the end of the load.
    fn background_color(&self) -> LocalBoxFuture<'static, Result<String, ServiceError>>;

    fn answer_permission(&self, request_id: &str, answer: PermissionAnswer);

    /// Releases the surface; the controller drops its handle right after.
    fn teardown(&self);
}

/// Creates embedder surfaces. Implemented by the host's windowing layer.
pub trait SurfaceHost {
    fn create_surface(&self, spec: &SurfaceSpec) -> Rc<dyn EmbedderSurface>;
}
