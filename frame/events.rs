/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The event router: embedder events in, state mutations and derived sync
//! flags out.
//!
//! Routing is a pure step over [`FrameState`] so it is testable without a
//! controller. Anything that must touch a collaborator (timers, priority,
//! history, the surface) comes back as a [`SideEffect`] for the controller
//! to execute in order.

use url::Url;

use crate::frame::config::FrameConfig;
use crate::frame::icon::{IconCandidate, select_better_icon};
use crate::frame::state::{FrameState, SecurityState};
use crate::priority::Pid;
use crate::surface::{PermissionAnswer, PermissionRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Fatal,
    Offline,
    /// Anything else the embedder reports; logged, no state change.
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

/// Media-session activity reported for the frame's content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaSessionEvent {
    MetadataChange { title: String, artist: String, album: String },
    PlaybackStateChange(PlaybackState),
}

/// The embedder-reported event vocabulary for one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum EmbedderEvent {
    Close,
    ContextMenu,
    DocumentFirstPaint,
    Error { kind: ErrorKind, reason: String },
    IconChange(IconCandidate),
    LoadStart,
    LoadEnd,
    LocationChange { url: String, can_go_back: bool, can_go_forward: bool },
    ManifestChange { href: String },
    MetaChange { name: String, content: String },
    OpenSearch { href: String },
    ProcessReady { pid: Pid },
    PromptPermission(PermissionRequest),
    ReaderModeState { active: bool },
    Scroll,
    SecurityChange { state: SecurityState },
    TitleChange { title: String },
    VisibilityChange,
    OverscrollStart,
    OverscrollEnd,
}

/// Work the controller must do after a routing step.
#[derive(Clone, Debug, PartialEq)]
pub enum SideEffect {
    RefreshScreenshot,
    /// Scroll happened: show the nav indicator, re-arm swipe lock and hide.
    ArmScrollTimers,
    HomeReady,
    ClearLoader,
    FatalCrash,
    LockSwipe,
    UnlockSwipe,
    VisitPlace,
    AnswerPermission { request_id: String, answer: PermissionAnswer },
    RequestClose,
    FetchBackgroundColor,
    RegisterOpenSearch { href: String },
    OverscrollPullStart,
    OverscrollPullEnd,
}

#[derive(Debug, Default, PartialEq)]
pub struct RouteOutcome {
    pub ui_sync: bool,
    pub places_sync: bool,
    pub effects: Vec<SideEffect>,
}

impl RouteOutcome {
    fn ui() -> Self {
        Self { ui_sync: true, ..Self::default() }
    }

    fn ui_and_places() -> Self {
        Self { ui_sync: true, places_sync: true, ..Self::default() }
    }

    fn effects(effects: Vec<SideEffect>) -> Self {
        Self { effects, ..Self::default() }
    }
}

fn origin_and_path(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    Some(format!("{}{}", parsed.origin().ascii_serialization(), parsed.path()))
}

/// True when the navigation from `old_url` to `new_url` changes the
/// origin+path identity. A parse failure is logged and conservatively
/// treated as a change so stale theme/icon state is not carried forward.
fn navigation_identity_changed(old_url: &str, new_url: &str) -> bool {
    match (origin_and_path(old_url), origin_and_path(new_url)) {
        (Some(old), Some(new)) => old != new,
        _ => {
            log::error!("location change: unparsable url ({old_url:?} -> {new_url:?})");
            true
        },
    }
}

fn answer_for_prompt(request: &PermissionRequest) -> PermissionAnswer {
    // For permissions that offer options, choose the first one.
    let choices = request
        .permissions
        .iter()
        .filter(|(_, descriptor)| !descriptor.options.is_empty())
        .map(|(name, descriptor)| (name.clone(), descriptor.options[0].clone()))
        .collect();
    PermissionAnswer {
        origin: request.origin.clone(),
        granted: true,
        remember: true,
        choices,
    }
}

/// Applies one embedder event to the frame state.
pub fn route(state: &mut FrameState, config: &FrameConfig, event: EmbedderEvent) -> RouteOutcome {
    match event {
        EmbedderEvent::DocumentFirstPaint => {
            state.loading = false;
            let mut effects = vec![SideEffect::ClearLoader, SideEffect::RefreshScreenshot];
            if config.is_home {
                effects.insert(0, SideEffect::HomeReady);
            }
            RouteOutcome::effects(effects)
        },
        EmbedderEvent::TitleChange { title } => {
            state.title = title;
            RouteOutcome::ui_and_places()
        },
        EmbedderEvent::SecurityChange { state: security } => {
            state.security = security;
            RouteOutcome::ui()
        },
        EmbedderEvent::LocationChange { url, can_go_back, can_go_forward } => {
            let mut effects = Vec::new();
            if config.is_home {
                // Fragment side channel the home surface uses to control the
                // global swipe lock.
                match Url::parse(&url).ok().and_then(|u| u.fragment().map(str::to_string)) {
                    Some(fragment) if fragment == "lock" => effects.push(SideEffect::LockSwipe),
                    Some(fragment) if fragment == "unlock" => effects.push(SideEffect::UnlockSwipe),
                    _ => {},
                }
            }

            if navigation_identity_changed(&state.url, &url) {
                // New navigation identity: restart the best-icon search and
                // drop the theme latch so the next load recomputes it.
                state.icon_size = 0;
                state.got_theme = false;
            }
            state.og_image = None;
            state.can_go_back = can_go_back;
            state.can_go_forward = can_go_forward;
            state.url = url;
            if !config.is_home {
                effects.push(SideEffect::VisitPlace);
            }
            RouteOutcome { ui_sync: true, places_sync: true, effects }
        },
        EmbedderEvent::IconChange(candidate) => {
            match select_better_icon(&candidate, state.icon_size) {
                Some(best) => {
                    state.icon_url = best.href;
                    state.icon_size = best.size;
                    RouteOutcome::ui_and_places()
                },
                None => RouteOutcome::default(),
            }
        },
        EmbedderEvent::Scroll => RouteOutcome::effects(vec![SideEffect::ArmScrollTimers]),
        EmbedderEvent::ManifestChange { href } => {
            if !state.bring_attention {
                state.bring_attention = state.manifest_url != href;
            }
            state.manifest_url = href;
            RouteOutcome::ui()
        },
        EmbedderEvent::MetaChange { name, content } => match name.as_str() {
            "theme-color" => {
                state.background_color = Some(content);
                state.got_theme = true;
                RouteOutcome::ui()
            },
            "og:image" => {
                state.og_image = Some(content);
                RouteOutcome::default()
            },
            _ => RouteOutcome::default(),
        },
        EmbedderEvent::LoadStart => RouteOutcome::default(),
        EmbedderEvent::LoadEnd => {
            if state.got_theme {
                RouteOutcome::default()
            } else {
                RouteOutcome::effects(vec![SideEffect::FetchBackgroundColor])
            }
        },
        EmbedderEvent::ProcessReady { pid: _ } => {
            // The pid lands on the controller, not the navigation state.
            RouteOutcome::default()
        },
        EmbedderEvent::Error { kind, reason } => {
            log::error!("frame error: kind={kind:?} reason={reason} [{}]", state.url);
            match kind {
                ErrorKind::Fatal => RouteOutcome::effects(vec![SideEffect::FatalCrash]),
                ErrorKind::Offline => {
                    state.loading = false;
                    RouteOutcome::effects(vec![SideEffect::ClearLoader])
                },
                ErrorKind::Other => RouteOutcome::default(),
            }
        },
        EmbedderEvent::PromptPermission(request) => {
            if request.request_action == "prompt" {
                let answer = answer_for_prompt(&request);
                RouteOutcome::effects(vec![SideEffect::AnswerPermission {
                    request_id: request.request_id,
                    answer,
                }])
            } else {
                RouteOutcome::default()
            }
        },
        EmbedderEvent::ReaderModeState { active } => {
            state.reader_mode = active;
            RouteOutcome::ui()
        },
        EmbedderEvent::OpenSearch { href } => {
            RouteOutcome::effects(vec![SideEffect::RegisterOpenSearch { href }])
        },
        EmbedderEvent::VisibilityChange => RouteOutcome::ui(),
        EmbedderEvent::Close => RouteOutcome::effects(vec![SideEffect::RequestClose]),
        EmbedderEvent::ContextMenu => {
            // Dialog presentation is a collaborator concern.
            RouteOutcome::default()
        },
        EmbedderEvent::OverscrollStart => {
            RouteOutcome::effects(vec![SideEffect::OverscrollPullStart])
        },
        EmbedderEvent::OverscrollEnd => {
            RouteOutcome::effects(vec![SideEffect::OverscrollPullEnd])
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameId;
    use crate::surface::PermissionDescriptor;

    fn config(is_home: bool) -> FrameConfig {
        let mut config = FrameConfig::new(FrameId::from("frame-1"), "https://app.example/");
        config.is_home = is_home;
        config
    }

    fn located_state(url: &str) -> FrameState {
        let mut state = FrameState::new();
        state.url = url.to_string();
        state
    }

    #[test]
    fn test_first_paint_clears_loader_and_refreshes_screenshot() {
        let mut state = FrameState::new();
        let outcome = route(&mut state, &config(false), EmbedderEvent::DocumentFirstPaint);
        assert!(!state.loading);
        assert_eq!(outcome.effects, vec![SideEffect::ClearLoader, SideEffect::RefreshScreenshot]);
    }

    #[test]
    fn test_first_paint_on_home_signals_home_ready() {
        let mut state = FrameState::new();
        let outcome = route(&mut state, &config(true), EmbedderEvent::DocumentFirstPaint);
        assert_eq!(outcome.effects[0], SideEffect::HomeReady);
    }

    #[test]
    fn test_title_change_needs_ui_and_places_sync() {
        let mut state = FrameState::new();
        let outcome = route(
            &mut state,
            &config(false),
            EmbedderEvent::TitleChange { title: "Example".into() },
        );
        assert_eq!(state.title, "Example");
        assert!(outcome.ui_sync);
        assert!(outcome.places_sync);
    }

    #[test]
    fn test_location_change_same_identity_keeps_icon_size() {
        let mut state = located_state("https://app.example/page?a=1");
        state.icon_size = 64;
        state.got_theme = true;
        route(
            &mut state,
            &config(false),
            EmbedderEvent::LocationChange {
                url: "https://app.example/page?b=2#frag".into(),
                can_go_back: true,
                can_go_forward: false,
            },
        );
        assert_eq!(state.icon_size, 64);
        assert!(state.got_theme);
        assert!(state.can_go_back);
    }

    #[test]
    fn test_location_change_new_identity_resets_icon_and_theme() {
        let mut state = located_state("https://app.example/page");
        state.icon_size = 64;
        state.got_theme = true;
        route(
            &mut state,
            &config(false),
            EmbedderEvent::LocationChange {
                url: "https://other.example/page".into(),
                can_go_back: false,
                can_go_forward: false,
            },
        );
        assert_eq!(state.icon_size, 0);
        assert!(!state.got_theme);
    }

    #[test]
    fn test_location_change_unparsable_url_treated_as_new_identity() {
        let mut state = located_state("not a url at all");
        state.icon_size = 64;
        route(
            &mut state,
            &config(false),
            EmbedderEvent::LocationChange {
                url: "https://app.example/".into(),
                can_go_back: false,
                can_go_forward: false,
            },
        );
        assert_eq!(state.icon_size, 0);
    }

    #[test]
    fn test_home_location_fragments_drive_swipe_lock() {
        let mut state = located_state("https://home.local/");
        let outcome = route(
            &mut state,
            &config(true),
            EmbedderEvent::LocationChange {
                url: "https://home.local/#lock".into(),
                can_go_back: false,
                can_go_forward: false,
            },
        );
        assert_eq!(outcome.effects[0], SideEffect::LockSwipe);

        let outcome = route(
            &mut state,
            &config(true),
            EmbedderEvent::LocationChange {
                url: "https://home.local/#unlock".into(),
                can_go_back: false,
                can_go_forward: false,
            },
        );
        assert_eq!(outcome.effects[0], SideEffect::UnlockSwipe);
    }

    #[test]
    fn test_icon_change_only_syncs_when_icon_improves() {
        let mut state = FrameState::new();
        let better = route(
            &mut state,
            &config(false),
            EmbedderEvent::IconChange(IconCandidate {
                href: "/icon64.png".into(),
                rel: Some("icon".into()),
                sizes: Some("64x64".into()),
            }),
        );
        assert!(better.ui_sync);
        assert_eq!(state.icon_size, 64);

        let worse = route(
            &mut state,
            &config(false),
            EmbedderEvent::IconChange(IconCandidate {
                href: "/icon16.png".into(),
                rel: Some("icon".into()),
                sizes: Some("16x16".into()),
            }),
        );
        assert!(!worse.ui_sync);
        assert_eq!(state.icon_url, "/icon64.png");
    }

    #[test]
    fn test_manifest_change_sets_sticky_bring_attention() {
        let mut state = FrameState::new();
        state.manifest_url = "https://app.example/old.webmanifest".into();
        route(
            &mut state,
            &config(false),
            EmbedderEvent::ManifestChange { href: "https://app.example/new.webmanifest".into() },
        );
        assert!(state.bring_attention);

        // Re-announcing the same manifest must not clear the sticky flag.
        route(
            &mut state,
            &config(false),
            EmbedderEvent::ManifestChange { href: "https://app.example/new.webmanifest".into() },
        );
        assert!(state.bring_attention);
    }

    #[test]
    fn test_theme_color_meta_latches_over_load_end_fetch() {
        let mut state = FrameState::new();
        route(
            &mut state,
            &config(false),
            EmbedderEvent::MetaChange { name: "theme-color".into(), content: "#112233".into() },
        );
        assert!(state.got_theme);
        assert_eq!(state.background_color.as_deref(), Some("#112233"));

        let outcome = route(&mut state, &config(false), EmbedderEvent::LoadEnd);
        assert!(outcome.effects.is_empty());
    }

    #[test]
    fn test_load_end_without_theme_fetches_background_color() {
        let mut state = FrameState::new();
        let outcome = route(&mut state, &config(false), EmbedderEvent::LoadEnd);
        assert_eq!(outcome.effects, vec![SideEffect::FetchBackgroundColor]);
    }

    #[test]
    fn test_offline_error_clears_loader_without_crash() {
        let mut state = FrameState::new();
        let outcome = route(
            &mut state,
            &config(false),
            EmbedderEvent::Error { kind: ErrorKind::Offline, reason: "net down".into() },
        );
        assert!(!state.loading);
        assert_eq!(outcome.effects, vec![SideEffect::ClearLoader]);
    }

    #[test]
    fn test_fatal_error_emits_crash_effect() {
        let mut state = FrameState::new();
        let outcome = route(
            &mut state,
            &config(false),
            EmbedderEvent::Error { kind: ErrorKind::Fatal, reason: "oom".into() },
        );
        assert_eq!(outcome.effects, vec![SideEffect::FatalCrash]);
    }

    #[test]
    fn test_prompt_permission_answers_first_option_per_permission() {
        let mut state = FrameState::new();
        let request = PermissionRequest {
            request_action: "prompt".into(),
            request_id: "permission-prompt-1".into(),
            origin: "https://meet.example".into(),
            permissions: vec![
                (
                    "audio-capture".into(),
                    PermissionDescriptor { action: "prompt".into(), options: vec!["default".into()] },
                ),
                (
                    "video-capture".into(),
                    PermissionDescriptor {
                        action: "prompt".into(),
                        options: vec!["front".into(), "back".into()],
                    },
                ),
                (
                    "geolocation".into(),
                    PermissionDescriptor { action: "prompt".into(), options: vec![] },
                ),
            ],
        };
        let outcome = route(&mut state, &config(false), EmbedderEvent::PromptPermission(request));
        let SideEffect::AnswerPermission { request_id, answer } = &outcome.effects[0] else {
            panic!("expected an answer effect");
        };
        assert_eq!(request_id, "permission-prompt-1");
        assert!(answer.granted);
        assert!(answer.remember);
        assert_eq!(
            answer.choices,
            vec![
                ("audio-capture".to_string(), "default".to_string()),
                ("video-capture".to_string(), "front".to_string()),
            ]
        );
    }

    #[test]
    fn test_non_prompt_permission_request_is_ignored() {
        let mut state = FrameState::new();
        let request = PermissionRequest {
            request_action: "cancel".into(),
            request_id: "permission-prompt-2".into(),
            origin: "https://meet.example".into(),
            permissions: vec![],
        };
        let outcome = route(&mut state, &config(false), EmbedderEvent::PromptPermission(request));
        assert!(outcome.effects.is_empty());
    }
}
