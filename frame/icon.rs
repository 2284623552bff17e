/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Best-icon selection.
//!
//! Pages advertise several icons per navigation; the shell keeps a single
//! running best. A scalable icon (`sizes="any"`) wins unconditionally.
//! Otherwise explicit pixel sizes are trusted, falling back to a default per
//! relation type, and a candidate replaces the current best only when its
//! resolved size strictly exceeds the running maximum.

/// Effective size recorded for a scalable icon; nothing beats it.
pub const SCALABLE_ICON_SIZE: u32 = 1_000_000;

const DEFAULT_ICON_SIZE: u32 = 32;
// Default dimension Apple documents for touch icons without a sizes attr.
const DEFAULT_TOUCH_ICON_SIZE: u32 = 57;

/// An icon advertised by the page, as reported by the embedder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IconCandidate {
    pub href: String,
    /// Space-separated relation list; `None` is treated as plain "icon".
    pub rel: Option<String>,
    /// Space-separated `WxH` entries, or the scalable marker "any".
    pub sizes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BestIcon {
    pub href: String,
    pub size: u32,
}

fn default_size_for_rel(rel: &str) -> u32 {
    match rel {
        "icon" | "shortcut" => DEFAULT_ICON_SIZE,
        "apple-touch-icon" | "apple-touch-icon-precomposed" => DEFAULT_TOUCH_ICON_SIZE,
        _ => 0,
    }
}

fn largest_declared_width(sizes: &str) -> Option<u32> {
    sizes
        .to_lowercase()
        .split_whitespace()
        .filter_map(|entry| entry.split('x').next())
        .filter_map(|width| width.parse::<u32>().ok())
        .max()
}

/// Resolves `candidate` against the running maximum `current_size`.
/// Returns a new best only when the candidate strictly beats it; ties keep
/// the existing icon.
pub fn select_better_icon(candidate: &IconCandidate, current_size: u32) -> Option<BestIcon> {
    if candidate.sizes.as_deref() == Some("any") {
        return Some(BestIcon {
            href: candidate.href.clone(),
            size: SCALABLE_ICON_SIZE,
        });
    }

    let declared = candidate.sizes.as_deref().and_then(largest_declared_width);

    let rel_list = candidate.rel.as_deref().unwrap_or("icon");
    let mut resolved = 0;
    for rel in rel_list.split_whitespace() {
        let size = declared.unwrap_or_else(|| default_size_for_rel(rel));
        resolved = resolved.max(size);
    }
    // A rel attribute that is all whitespace still falls back to "icon".
    if rel_list.split_whitespace().next().is_none() {
        resolved = declared.unwrap_or(DEFAULT_ICON_SIZE);
    }

    if resolved > current_size {
        Some(BestIcon {
            href: candidate.href.clone(),
            size: resolved,
        })
    } else {
        None
    }
}
