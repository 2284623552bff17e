/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Site-panel signal routing.
//!
//! The shell's site-info panel emits a fixed signal set (zoom, navigation,
//! reload, reader mode, UA change). Only the active frame should react: a
//! controller subscribes on activation and unsubscribes on deactivation, so
//! broadcasting reaches exactly the frames that opted in.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::frame::FrameId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelSignal {
    ZoomIn,
    ZoomOut,
    NavBack,
    NavForward,
    NavReload,
    ToggleReaderMode,
    ChangeUserAgent(String),
}

type Subscriber = Rc<dyn Fn(PanelSignal)>;

#[derive(Default)]
pub struct SignalHub {
    subscribers: RefCell<HashMap<FrameId, Subscriber>>,
}

impl SignalHub {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn subscribe(&self, id: FrameId, subscriber: Subscriber) {
        self.subscribers.borrow_mut().insert(id, subscriber);
    }

    pub fn unsubscribe(&self, id: &FrameId) {
        self.subscribers.borrow_mut().remove(id);
    }

    pub fn is_subscribed(&self, id: &FrameId) -> bool {
        self.subscribers.borrow().contains_key(id)
    }

    pub fn broadcast(&self, signal: PanelSignal) {
        // Collect first: a subscriber may re-enter the hub.
        let subscribers: Vec<Subscriber> = self.subscribers.borrow().values().cloned().collect();
        for subscriber in subscribers {
            subscriber(signal.clone());
        }
    }
}
