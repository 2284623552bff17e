/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Named, cancelable, single-shot delays.
//!
//! Each frame controller owns one `TimerSet`. A key identifies at most one
//! pending delay: scheduling under a key that is already armed replaces the
//! pending delay, and canceling disarms it before the callback runs. Timers
//! fire on the local task queue, so hosts must drive controllers from inside
//! a `LocalSet`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::AbortHandle;

/// Duration of the app swipe lock while the page is being scrolled.
pub const SWIPE_LOCK_DURATION: Duration = Duration::from_millis(500);
/// How long the navigation indicator stays up after the last scroll event.
pub const NAVIGATION_DISPLAY_DURATION: Duration = Duration::from_millis(1500);
/// Fade-out length of the navigation indicator once its display time elapsed.
pub const NAVIGATION_FADE_DURATION: Duration = Duration::from_millis(800);
/// Sustained pull needed before an overscroll release triggers a reload.
pub const OVERSCROLL_ARM_DURATION: Duration = Duration::from_millis(1500);
/// Deactivation debounce for the home surface, absorbing app-switch churn.
pub const HOME_DEACTIVATE_DELAY: Duration = Duration::from_millis(3000);
/// Grace period before a crashed home surface rebuilds itself.
pub const CRASH_RECREATE_DELAY: Duration = Duration::from_millis(3000);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKey {
    Deactivate,
    SwipeLock,
    NavigationHide,
    NavigationFade,
    OverscrollArm,
    CrashRecreate,
}

#[derive(Default)]
pub struct TimerSet {
    armed: Rc<RefCell<HashMap<TimerKey, AbortHandle>>>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `key` to run `callback` after `delay`, replacing any pending
    /// timer under the same key. The entry is removed before the callback
    /// runs, so `is_armed` is false from inside the callback.
    pub fn schedule(&self, key: TimerKey, delay: Duration, callback: impl FnOnce() + 'static) {
        self.cancel(key);
        let armed = Rc::clone(&self.armed);
        let task = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            armed.borrow_mut().remove(&key);
            callback();
        });
        self.armed.borrow_mut().insert(key, task.abort_handle());
    }

    /// Disarms `key`. Returns true if a delay was actually pending.
    pub fn cancel(&self, key: TimerKey) -> bool {
        match self.armed.borrow_mut().remove(&key) {
            Some(handle) => {
                handle.abort();
                true
            },
            None => false,
        }
    }

    pub fn is_armed(&self, key: TimerKey) -> bool {
        self.armed.borrow().contains_key(&key)
    }

    pub fn cancel_all(&self) {
        for (_, handle) in self.armed.borrow_mut().drain() {
            handle.abort();
        }
    }
}
