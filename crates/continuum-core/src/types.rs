//! Core data types for the video feed
//!
//! Values are handed out as snapshots; the feed manager owns the
//! authoritative copy of every entry and applies updates in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents one video entry in a channel feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Provider-assigned video identifier (e.g., "76979871")
    pub identifier: String,

    /// Position in the feed, oldest video has the smallest value
    pub idx: u64,

    /// Thumbnail chosen for the configured display width
    pub image_path: Option<String>,

    /// Video title
    pub name: String,

    /// Author name, from the uploader or the credits list
    pub author: Option<String>,

    /// Creation date reported by the provider
    pub creation_date: DateTime<Utc>,

    /// Playable variants, `None` until the provider exposed files
    pub presets: Option<Vec<VideoPreset>>,

    /// People credited on the video, `None` until a detail fetch
    pub credits: Option<Vec<Credit>>,
}

impl Video {
    /// Refresh this entry from a fresher record of the same video
    ///
    /// Keeps `idx` so the entry never moves. Presets, credits and author
    /// are only replaced when the fresher record actually carries them.
    pub fn update_with(&mut self, fresh: &Video) {
        debug_assert_eq!(self.identifier, fresh.identifier);

        self.name = fresh.name.clone();
        self.creation_date = fresh.creation_date;
        if fresh.image_path.is_some() {
            self.image_path = fresh.image_path.clone();
        }
        if fresh.author.is_some() {
            self.author = fresh.author.clone();
        }
        if fresh.presets.is_some() {
            self.presets = fresh.presets.clone();
        }
        if fresh.credits.is_some() {
            self.credits = fresh.credits.clone();
        }
    }

    /// Store credits and derive the author when none is known yet
    pub fn update_credits(&mut self, credits: Vec<Credit>) {
        if self.author.is_none() {
            self.author = credits
                .iter()
                .find(|c| c.role.eq_ignore_ascii_case("director"))
                .or_else(|| credits.first())
                .map(|c| c.name.clone());
        }
        self.credits = Some(credits);
    }

    /// Preset with the given quality tag, if the video has one
    pub fn preset(&self, quality: &str) -> Option<&VideoPreset> {
        self.presets
            .as_deref()
            .and_then(|presets| presets.iter().find(|p| p.quality == quality))
    }
}

/// One playable quality variant of a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPreset {
    /// Identifier of the video this preset belongs to
    pub video: String,

    /// Frame width in pixels, unknown for adaptive streams
    pub width: Option<u32>,

    /// Frame height in pixels, unknown for adaptive streams
    pub height: Option<u32>,

    /// File size in bytes (0 when not reported)
    pub size: u64,

    /// Playable resource location
    pub url: String,

    /// Duration in seconds
    pub duration: u64,

    /// Quality tag (e.g., "hd", "sd", "hls")
    pub quality: String,
}

/// A person credited on a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub role: String,
    pub name: String,
}
