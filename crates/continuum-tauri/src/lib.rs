//! Continuum Tauri Integration
//!
//! Provides a Tauri plugin exposing the Continuum video feed to a webview
//! frontend.
//!
//! # Usage
//!
//! Register the plugin in your Tauri application:
//!
//! ```ignore
//! use continuum_core::FeedConfig;
//!
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(continuum_tauri::init(FeedConfig::with_token("access-token")))
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
//!
//! Then invoke commands from the frontend:
//!
//! ```javascript
//! import { invoke } from '@tauri-apps/api/core';
//! import { listen } from '@tauri-apps/api/event';
//!
//! await invoke('plugin:continuum|configure_channel', { channel: 'staffpicks' });
//! const feed = await invoke('plugin:continuum|fetch_newest');
//! const more = await invoke('plugin:continuum|fetch_next_page');
//! const video = await invoke('plugin:continuum|fetch_video_detail', { identifier: feed[0].identifier });
//!
//! await listen('continuum://feed', (event) => console.log(event.payload.kind));
//! ```

use continuum_core::{FeedConfig, FeedManager};
use tauri::{
    plugin::{Builder, TauriPlugin},
    AppHandle, Emitter, Manager, Runtime,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

mod commands;

/// Name of the webview event carrying [`FeedEvent`] payloads
pub const FEED_EVENT: &str = "continuum://feed";

/// Managed state shared by all plugin commands
///
/// [`FeedManager`] synchronizes internally, so commands use it directly.
pub struct FeedState {
    pub(crate) feed: FeedManager,
}

impl FeedState {
    /// Create the feed from `config`
    ///
    /// # Errors
    /// Returns error string if the access token is missing or the HTTP
    /// client cannot be created
    pub fn new(config: FeedConfig) -> Result<Self, String> {
        if config.access_token.trim().is_empty() {
            return Err("Vimeo access token is required".to_string());
        }
        let feed = FeedManager::new(config).map_err(|e| e.to_string())?;
        Ok(Self { feed })
    }
}

/// Event sent after the listener lost notifications
///
/// `Replaced` tells the frontend to re-read the whole collection.
async fn resync_event(feed: &FeedManager) -> FeedEvent {
    FeedEvent::Replaced {
        count: feed.len().await,
    }
}

/// Re-emit feed notifications as webview events until the feed goes away
fn forward_events<R: Runtime>(app: AppHandle<R>, feed: &FeedManager) {
    let mut events = feed.subscribe();
    let feed = feed.clone();
    tauri::async_runtime::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "feed event listener lagged, resyncing");
                    resync_event(&feed).await
                }
                Err(RecvError::Closed) => break,
            };
            if let Err(e) = app.emit(FEED_EVENT, &event) {
                warn!(error = %e, "failed to emit feed event");
            }
        }
    });
}

/// Initialize the continuum plugin
///
/// # Returns
/// A configured TauriPlugin ready to be registered with the Tauri application
pub fn init<R: Runtime>(config: FeedConfig) -> TauriPlugin<R> {
    Builder::new("continuum")
        .invoke_handler(tauri::generate_handler![
            commands::configure_channel,
            commands::fetch_newest,
            commands::fetch_next_page,
            commands::fetch_video_detail,
            commands::cancel_all,
            commands::feed_entries
        ])
        .setup(move |app, _api| {
            let state = FeedState::new(config).map_err(Box::<dyn std::error::Error>::from)?;
            forward_events(app.clone(), &state.feed);
            app.manage(state);
            Ok(())
        })
        .build()
}

// Re-export types for convenience
pub use continuum_core::{FeedError, FeedEvent, Video, VideoPreset};
