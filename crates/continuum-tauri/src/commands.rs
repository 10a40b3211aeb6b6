//! Tauri commands for the Continuum feed
//!
//! Every command forwards to the shared [`FeedManager`](continuum_core::FeedManager)
//! and turns its error into a display string for the frontend.

use continuum_core::Video;
use tauri::State;

use crate::FeedState;

/// Bind the feed to a Vimeo channel
///
/// Switching channels cancels in-flight requests and clears the feed.
#[tauri::command]
pub async fn configure_channel(
    state: State<'_, FeedState>,
    channel: String,
) -> Result<(), String> {
    state
        .feed
        .configure(&channel)
        .await
        .map_err(|e| e.to_string())
}

/// Load the first page, replacing the feed
///
/// # Returns
/// The whole feed after the refresh
#[tauri::command]
pub async fn fetch_newest(state: State<'_, FeedState>) -> Result<Vec<Video>, String> {
    state.feed.fetch_newest().await.map_err(|e| e.to_string())
}

/// Load the next page
///
/// # Returns
/// Only the newly appended videos, empty at the end of the feed
#[tauri::command]
pub async fn fetch_next_page(state: State<'_, FeedState>) -> Result<Vec<Video>, String> {
    state.feed.fetch_next_page().await.map_err(|e| e.to_string())
}

/// Resolve presets and credits for one video of the feed
#[tauri::command]
pub async fn fetch_video_detail(
    state: State<'_, FeedState>,
    identifier: String,
) -> Result<Video, String> {
    state
        .feed
        .fetch_detail(&identifier)
        .await
        .map_err(|e| e.to_string())
}

/// Abort every in-flight request
#[tauri::command]
pub async fn cancel_all(state: State<'_, FeedState>) -> Result<(), String> {
    state.feed.cancel_all().await;
    Ok(())
}

/// Current feed snapshot
#[tauri::command]
pub async fn feed_entries(state: State<'_, FeedState>) -> Result<Vec<Video>, String> {
    Ok(state.feed.entries().await)
}
