//! Continuum Video Feed Core Library
//!
//! Provides an async, paginated video feed backed by a Vimeo channel.
//!
//! # Overview
//!
//! This crate is the model layer behind the Continuum player:
//! - Request model that serializes deterministically to wire requests
//! - Rate-limited HTTP transport with retries for transient failures
//! - Best-effort mapping of Vimeo JSON into [`Video`] and [`VideoPreset`]
//! - [`FeedManager`], which pages through a channel, de-duplicates entries,
//!   coalesces identical in-flight requests and supports cancellation
//!
//! # Example
//!
//! ```no_run
//! use continuum_core::{FeedConfig, FeedEvent, FeedManager, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let feed = FeedManager::new(FeedConfig::with_token("access-token"))?;
//!     let mut events = feed.subscribe();
//!
//!     feed.configure("staffpicks").await?;
//!     for video in feed.fetch_newest().await? {
//!         println!("{:>4} {}", video.idx, video.name);
//!     }
//!
//!     while feed.has_next_page().await {
//!         let appended = feed.fetch_next_page().await?;
//!         println!("{} more videos", appended.len());
//!     }
//!
//!     while let Ok(event) = events.try_recv() {
//!         if let FeedEvent::RecordsDropped { count } = event {
//!             println!("{} records skipped", count);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! All failures come back as [`FeedError`] values from the call that
//! triggered them. A failed fetch never modifies the collection. Callers
//! usually ignore [`FeedError::Canceled`] and offer a retry for
//! [`FeedError::FetchFailed`].

mod client;
mod error;
mod feed;
pub mod mapping;
pub mod request;
mod types;
pub mod vimeo;

// Re-export transport types
pub use client::{ClientConfig, RateLimiter, Transport, VimeoClient};

// Re-export error types
pub use error::{FeedError, Result, TransportError};

// Re-export the feed manager API
pub use feed::{DEFAULT_PAGE_SIZE, EVENT_CAPACITY, FeedConfig, FeedEvent, FeedManager};

// Re-export request model
pub use request::{ApiRequest, QueryValue};

// Re-export data types
pub use types::{Credit, Video, VideoPreset};

// Re-export Vimeo endpoint helpers
pub use vimeo::{SortDirection, VimeoApi};
