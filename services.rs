/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Collaborator traits injected into the coordinator and frame controllers.
//!
//! Everything the shell core reaches outside itself for goes through one of
//! these: the OS process-management service, the history/media index, and
//! the window-manager boundary. Hosts supply implementations at
//! construction; tests supply recording mocks. Futures are `LocalBoxFuture`
//! so the traits stay object-safe in the crate's single-threaded world.

use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::FrameId;
use crate::priority::{Pid, ProcessGroup};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service unavailable")]
    Unavailable,
    #[error("operation rejected: {0}")]
    Rejected(String),
}

/// The OS process-management service, addressed through ordered transactions.
///
/// `begin` opens a transaction scoped to an owner identity; `assign` and
/// `withdraw` queue group changes on the service side; `commit` applies
/// them. The coordinator drives exactly one `begin .. commit` sequence at a
/// time and stops issuing operations after the first failure.
pub trait ProcessService {
    fn begin(&self, owner: &str) -> LocalBoxFuture<'_, Result<(), ServiceError>>;
    fn assign(&self, pid: Pid, group: ProcessGroup) -> LocalBoxFuture<'_, Result<(), ServiceError>>;
    fn withdraw(&self, pid: Pid) -> LocalBoxFuture<'_, Result<(), ServiceError>>;
    fn commit(&self) -> LocalBoxFuture<'_, Result<(), ServiceError>>;
}

/// Metadata attached to a media index entry while a page is playing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub og_image: Option<String>,
    pub background_color: Option<String>,
}

/// The history/media index. Calls are best-effort: the controller never
/// blocks frame lifecycle on persistence.
pub trait HistoryService {
    fn visit_place(&self, url: &str) -> LocalBoxFuture<'_, ()>;

    fn create_or_update_places_entry(
        &self,
        url: &str,
        title: &str,
        icon: &str,
    ) -> LocalBoxFuture<'_, ()>;

    fn create_or_update_media_entry(
        &self,
        url: &str,
        icon: &str,
        metadata: MediaMetadata,
    ) -> LocalBoxFuture<'_, ()>;

    /// Registers an opensearch provider advertised by the page, if the
    /// engine is not known yet.
    fn register_open_search(&self, url: &str, icon: &str) -> LocalBoxFuture<'_, ()>;
}

/// Cross-frame signals owned by the window manager.
pub trait WindowManagerHooks {
    /// Prevents edge-swipe app switching while content is being scrolled.
    fn lock_swipe(&self);
    fn unlock_swipe(&self);
    /// Closes the frame, optionally restoring focus to a previous one.
    fn close_frame(&self, id: &FrameId, previous: Option<&FrameId>);
    /// The home surface finished its first paint.
    fn home_ready(&self);
}
