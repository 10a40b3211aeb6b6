//! Vimeo API endpoints
//!
//! Builds the three requests the feed issues: channel video list, single
//! video and video credits. Every request carries the bearer token header.

use serde::{Deserialize, Serialize};

use crate::request::ApiRequest;

pub const DEFAULT_BASE_URL: &str = "https://api.vimeo.com";
const ACCEPT: &str = "application/vnd.vimeo.*+json;version=3.4";

/// Sort direction for channel listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Request factory bound to one base URL and access token
#[derive(Debug, Clone)]
pub struct VimeoApi {
    base_url: String,
    access_token: String,
}

impl VimeoApi {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    fn request(&self, path: String) -> ApiRequest {
        ApiRequest::new(self.base_url.as_str(), path)
            .header("Authorization", format!("bearer {}", self.access_token))
            .header("Accept", ACCEPT)
    }

    /// One page of videos from a channel
    ///
    /// # Example
    /// ```
    /// use continuum_core::{SortDirection, VimeoApi};
    /// let api = VimeoApi::new("https://api.vimeo.com", "token");
    /// let request = api.channel_videos("staffpicks", 10, 2, "date", SortDirection::Asc);
    /// assert_eq!(
    ///     request.url(),
    ///     "https://api.vimeo.com/channels/staffpicks/videos?direction=asc&page=2&per_page=10&sort=date"
    /// );
    /// ```
    pub fn channel_videos(
        &self,
        channel: &str,
        per_page: u32,
        page: u32,
        sort: &str,
        direction: SortDirection,
    ) -> ApiRequest {
        self.request(format!("/channels/{}/videos", urlencoding::encode(channel)))
            .query("page", page)
            .query("per_page", per_page)
            .query("sort", sort)
            .query("direction", direction.as_str())
    }

    /// Full information for a single video, including playable files
    pub fn video(&self, identifier: &str) -> ApiRequest {
        self.request(format!("/videos/{}", urlencoding::encode(identifier)))
    }

    /// Credits list for a single video
    pub fn video_credits(&self, identifier: &str) -> ApiRequest {
        self.request(format!("/videos/{}/credits", urlencoding::encode(identifier)))
    }
}
