//! Feed and pagination manager
//!
//! [`FeedManager`] keeps an ordered, de-duplicated collection of videos for
//! one channel, backed by the paginated channel listing, and enriches single
//! entries on demand with a detail fetch.
//!
//! Every network call runs on its own tokio task and occupies a slot: one
//! slot for the list fetch, one per video identifier for detail fetches.
//! A caller that asks for work already occupying a slot attaches to it and
//! receives the same outcome instead of issuing a second request. Results
//! are applied to the collection under the state lock, so positions handed
//! out in [`FeedEvent`]s always refer to the same snapshot observers read.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, broadcast, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::client::{ClientConfig, Transport, VimeoClient};
use crate::error::{FeedError, Result};
use crate::mapping::{MappedPage, map_credits, map_page, map_video};
use crate::request::ApiRequest;
use crate::types::Video;
use crate::vimeo::{DEFAULT_BASE_URL, SortDirection, VimeoApi};

/// Default number of videos requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Broadcast buffer per subscriber
pub const EVENT_CAPACITY: usize = 64;

/// Configuration for the feed manager
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Provider access token, sent as a bearer header on every request
    pub access_token: String,
    /// API base URL (default: https://api.vimeo.com)
    pub base_url: String,
    /// Videos per page (default: 10)
    pub page_size: u32,
    /// Display width used to choose thumbnails (default: 640)
    pub preferred_image_width: u32,
    /// Channel listing sort field (default: "date")
    pub sort: String,
    /// Channel listing direction (default: ascending, oldest first)
    pub direction: SortDirection,
    /// HTTP client settings
    pub client: ClientConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            preferred_image_width: 640,
            sort: "date".to_string(),
            direction: SortDirection::default(),
            client: ClientConfig::default(),
        }
    }
}

impl FeedConfig {
    /// Default configuration authorized with `access_token`
    pub fn with_token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Self::default()
        }
    }
}

/// Change notification for observers of the collection
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedEvent {
    /// Collection cleared after a channel switch
    Reset,
    /// Collection replaced by a newest fetch
    Replaced { count: usize },
    /// Entries appended at `start..start + count`
    Appended { start: usize, count: usize },
    /// Existing entries refreshed by repeated records in a later page,
    /// one event per page in ascending position order
    Updated { indices: Vec<usize> },
    /// Existing entry enriched by a detail fetch
    DetailUpdated { index: usize, identifier: String },
    /// Records of a page that failed mapping and were skipped
    RecordsDropped { count: usize },
    /// A fetch failed; the collection is unchanged
    Failed { error: FeedError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Newest,
    NextPage,
}

/// One in-flight request and everyone waiting on it
struct Slot<T> {
    id: u64,
    handle: AbortHandle,
    waiters: Vec<oneshot::Sender<Result<T>>>,
}

impl<T: Clone> Slot<T> {
    fn new(id: u64, handle: AbortHandle, waiter: oneshot::Sender<Result<T>>) -> Self {
        Self {
            id,
            handle,
            waiters: vec![waiter],
        }
    }

    /// A slot whose task ended without resolving it cannot be joined
    fn is_live(&self) -> bool {
        !self.handle.is_finished()
    }

    fn resolve(self, outcome: &Result<T>) {
        for waiter in self.waiters {
            // Receiver gone means the caller stopped waiting
            let _ = waiter.send(outcome.clone());
        }
    }

    fn cancel(self) {
        self.handle.abort();
        self.resolve(&Err(FeedError::Canceled));
    }
}

struct ListSlot {
    kind: ListKind,
    page: u32,
    slot: Slot<Vec<Video>>,
}

#[derive(Default)]
struct FeedState {
    channel: Option<String>,
    entries: Vec<Video>,
    positions: HashMap<String, usize>,
    next_page: Option<u32>,
    list: Option<ListSlot>,
    details: HashMap<String, Slot<Video>>,
    last_request_id: u64,
}

impl FeedState {
    fn issue_id(&mut self) -> u64 {
        self.last_request_id += 1;
        self.last_request_id
    }

    /// Cancel every in-flight request, returns how many were canceled
    fn cancel_in_flight(&mut self) -> usize {
        let mut canceled = 0;
        if let Some(list) = self.list.take() {
            list.slot.cancel();
            canceled += 1;
        }
        for (_, slot) in self.details.drain() {
            slot.cancel();
            canceled += 1;
        }
        canceled
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.positions.clear();
        self.next_page = Some(1);
    }

    /// Replace the collection with a fresh first page
    ///
    /// Entries that survive keep their earlier enrichment.
    fn replace(&mut self, videos: Vec<Video>) {
        let mut previous: HashMap<String, Video> = self
            .entries
            .drain(..)
            .map(|video| (video.identifier.clone(), video))
            .collect();
        self.positions.clear();

        for fresh in videos {
            if let Some(&index) = self.positions.get(&fresh.identifier) {
                self.entries[index].update_with(&fresh);
                continue;
            }
            let entry = match previous.remove(&fresh.identifier) {
                Some(mut known) => {
                    known.update_with(&fresh);
                    known.idx = fresh.idx;
                    known
                }
                None => fresh,
            };
            self.positions.insert(entry.identifier.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }

    /// Append a page, refreshing entries whose identifier is already known
    ///
    /// Returns the positions refreshed in place.
    fn merge(&mut self, videos: Vec<Video>) -> Vec<usize> {
        let mut updated = Vec::new();

        for fresh in videos {
            match self.positions.get(&fresh.identifier) {
                Some(&index) => {
                    self.entries[index].update_with(&fresh);
                    updated.push(index);
                }
                None => {
                    self.positions.insert(fresh.identifier.clone(), self.entries.len());
                    self.entries.push(fresh);
                }
            }
        }

        updated.sort_unstable();
        updated.dedup();
        updated
    }
}

struct Inner<T> {
    transport: T,
    api: VimeoApi,
    config: FeedConfig,
    state: Mutex<FeedState>,
    events: broadcast::Sender<FeedEvent>,
}

impl<T: Transport> Inner<T> {
    fn emit(&self, event: FeedEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    async fn load_page(&self, request: &ApiRequest, page: u32, first_idx: u64) -> Result<MappedPage> {
        let body = self.transport.fetch_json(request).await?;
        map_page(&body, page, first_idx, self.config.preferred_image_width)
    }

    async fn load_detail(&self, identifier: &str, idx: u64) -> Result<Video> {
        let body = self.transport.fetch_json(&self.api.video(identifier)).await?;
        let mut video = map_video(&body, idx, self.config.preferred_image_width)?;

        let credits = self
            .transport
            .fetch_json(&self.api.video_credits(identifier))
            .await
            .and_then(|body| map_credits(&body));
        match credits {
            Ok(credits) => video.update_credits(credits),
            Err(error) => warn!(video = identifier, %error, "credits unavailable"),
        }

        Ok(video)
    }

    async fn complete_list(&self, id: u64, outcome: Result<MappedPage>) {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let Some(list) = state.list.take_if(|list| list.slot.id == id) else {
            debug!(id, "discarding stale list response");
            return;
        };

        let result = match outcome {
            Ok(page) => {
                if page.dropped > 0 {
                    self.emit(FeedEvent::RecordsDropped {
                        count: page.dropped,
                    });
                }
                state.next_page = page.next_page;

                match list.kind {
                    ListKind::Newest => {
                        state.replace(page.videos);
                        debug!(count = state.entries.len(), "feed replaced");
                        self.emit(FeedEvent::Replaced {
                            count: state.entries.len(),
                        });
                        Ok(state.entries.clone())
                    }
                    ListKind::NextPage => {
                        let start = state.entries.len();
                        let indices = state.merge(page.videos);
                        if !indices.is_empty() {
                            self.emit(FeedEvent::Updated { indices });
                        }
                        let appended = state.entries[start..].to_vec();
                        debug!(page = list.page, count = appended.len(), "feed page appended");
                        if !appended.is_empty() {
                            self.emit(FeedEvent::Appended {
                                start,
                                count: appended.len(),
                            });
                        }
                        Ok(appended)
                    }
                }
            }
            Err(error) => {
                warn!(page = list.page, %error, "list fetch failed");
                self.emit(FeedEvent::Failed {
                    error: error.clone(),
                });
                Err(error)
            }
        };

        list.slot.resolve(&result);
    }

    async fn complete_detail(&self, id: u64, identifier: &str, outcome: Result<Video>) {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if state.details.get(identifier).map(|slot| slot.id) != Some(id) {
            debug!(id, video = identifier, "discarding stale detail response");
            return;
        }
        let Some(slot) = state.details.remove(identifier) else {
            return;
        };

        let result = outcome.and_then(|fresh| {
            let index = state
                .positions
                .get(identifier)
                .copied()
                .ok_or_else(|| FeedError::UnknownVideo(identifier.to_string()))?;
            let entry = state
                .entries
                .get_mut(index)
                .ok_or_else(|| FeedError::UnknownVideo(identifier.to_string()))?;
            entry.update_with(&fresh);
            Ok((index, entry.clone()))
        });

        match result {
            Ok((index, video)) => {
                self.emit(FeedEvent::DetailUpdated {
                    index,
                    identifier: identifier.to_string(),
                });
                slot.resolve(&Ok(video));
            }
            Err(error) => {
                warn!(video = identifier, %error, "detail fetch failed");
                self.emit(FeedEvent::Failed {
                    error: error.clone(),
                });
                slot.resolve(&Err(error));
            }
        }
    }
}

/// Channel feed with pagination, request coalescing and cancellation
///
/// Cloning is cheap; clones share the same collection and in-flight
/// requests. Intended to be driven from one coordinating task.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> continuum_core::Result<()> {
/// use continuum_core::{FeedConfig, FeedManager};
///
/// let feed = FeedManager::new(FeedConfig::with_token("access-token"))?;
/// feed.configure("staffpicks").await?;
///
/// let first = feed.fetch_newest().await?;
/// let more = feed.fetch_next_page().await?;
/// println!("{} videos, {} appended", first.len(), more.len());
///
/// if let Some(video) = first.first() {
///     let detailed = feed.fetch_detail(&video.identifier).await?;
///     println!("{} presets", detailed.presets.map_or(0, |p| p.len()));
/// }
/// # Ok(())
/// # }
/// ```
pub struct FeedManager<T = VimeoClient> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for FeedManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl FeedManager<VimeoClient> {
    /// Create a manager talking to Vimeo over HTTP
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails
    pub fn new(config: FeedConfig) -> Result<Self> {
        let client = VimeoClient::with_config(config.client.clone())?;
        Ok(Self::with_transport(config, client))
    }
}

impl<T: Transport> FeedManager<T> {
    /// Create a manager over a custom transport
    pub fn with_transport(config: FeedConfig, transport: T) -> Self {
        let api = VimeoApi::new(config.base_url.as_str(), config.access_token.as_str());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                transport,
                api,
                config,
                state: Mutex::new(FeedState::default()),
                events,
            }),
        }
    }

    /// Configuration the manager was built with
    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    /// Subscribe to collection change notifications
    ///
    /// A fetch emits at most three events, so a receiver only lags if it
    /// stops reading across many fetches. A lagging receiver skips the
    /// oldest events and should re-read [`FeedManager::entries`].
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.inner.events.subscribe()
    }

    /// Bind the manager to a channel
    ///
    /// Switching to a different channel cancels every in-flight request,
    /// clears the collection and resets the cursor. Configuring the
    /// current channel again changes nothing.
    ///
    /// # Errors
    /// - `InvalidId` if `channel` is empty or whitespace only
    pub async fn configure(&self, channel: &str) -> Result<()> {
        let channel = channel.trim();
        if channel.is_empty() {
            return Err(FeedError::InvalidId(
                "Channel identifier cannot be empty".to_string(),
            ));
        }

        let mut state = self.inner.state.lock().await;
        if state.channel.as_deref() == Some(channel) {
            return Ok(());
        }

        let canceled = state.cancel_in_flight();
        info!(channel, canceled, "switching feed channel");
        state.reset();
        state.channel = Some(channel.to_string());
        self.inner.emit(FeedEvent::Reset);

        Ok(())
    }

    /// Channel the manager is bound to, if any
    pub async fn channel(&self) -> Option<String> {
        self.inner.state.lock().await.channel.clone()
    }

    /// Snapshot of the collection in feed order
    pub async fn entries(&self) -> Vec<Video> {
        self.inner.state.lock().await.entries.clone()
    }

    /// Snapshot of a single entry
    pub async fn video(&self, identifier: &str) -> Option<Video> {
        let state = self.inner.state.lock().await;
        state
            .positions
            .get(identifier)
            .and_then(|&index| state.entries.get(index))
            .cloned()
    }

    /// Number of entries in the collection
    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.entries.len()
    }

    /// Whether the collection has no entries
    pub async fn is_empty(&self) -> bool {
        self.inner.state.lock().await.entries.is_empty()
    }

    /// Whether the provider announced another page
    pub async fn has_next_page(&self) -> bool {
        let state = self.inner.state.lock().await;
        state.channel.is_some() && state.next_page.is_some()
    }

    /// Fetch the first page and replace the collection with it
    ///
    /// Calls made while a newest fetch is in flight share its result. An
    /// in-flight next page fetch is canceled; detail fetches continue.
    ///
    /// # Returns
    /// The full collection after the replacement
    ///
    /// # Errors
    /// - `NotConfigured` if no channel is set
    /// - `FetchFailed` / `MalformedResponse` if the request fails
    /// - `Canceled` if the fetch is canceled before it completes
    pub async fn fetch_newest(&self) -> Result<Vec<Video>> {
        let receiver = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            let channel = state.channel.clone().ok_or(FeedError::NotConfigured)?;
            let (sender, receiver) = oneshot::channel();

            match &mut state.list {
                Some(list) if list.kind == ListKind::Newest && list.slot.is_live() => {
                    debug!(%channel, "joining in-flight newest fetch");
                    list.slot.waiters.push(sender);
                }
                _ => {
                    if let Some(superseded) = state.list.take() {
                        debug!(%channel, page = superseded.page, "canceling superseded list fetch");
                        superseded.slot.cancel();
                    }
                    let id = state.issue_id();
                    let handle = self.spawn_list(id, &channel, 1);
                    state.list = Some(ListSlot {
                        kind: ListKind::Newest,
                        page: 1,
                        slot: Slot::new(id, handle, sender),
                    });
                }
            }

            receiver
        };

        receiver.await.unwrap_or(Err(FeedError::Canceled))
    }

    /// Fetch the page after the cursor and append it
    ///
    /// Records whose identifier is already in the collection refresh that
    /// entry in place instead of being appended. Calls made while a next
    /// page fetch is in flight share its result.
    ///
    /// # Returns
    /// Only the newly appended entries; empty at the end of the feed
    ///
    /// # Errors
    /// - `NotConfigured` if no channel is set
    /// - `Canceled` if a newest fetch is in flight or the fetch is canceled
    /// - `FetchFailed` / `MalformedResponse` if the request fails
    pub async fn fetch_next_page(&self) -> Result<Vec<Video>> {
        let receiver = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            let channel = state.channel.clone().ok_or(FeedError::NotConfigured)?;
            let (sender, receiver) = oneshot::channel();

            match &mut state.list {
                Some(list) if list.kind == ListKind::NextPage && list.slot.is_live() => {
                    debug!(%channel, page = list.page, "joining in-flight next page fetch");
                    list.slot.waiters.push(sender);
                }
                Some(list) if list.slot.is_live() => {
                    debug!(%channel, "next page fetch superseded by newest fetch");
                    return Err(FeedError::Canceled);
                }
                _ => {
                    let Some(page) = state.next_page else {
                        debug!(%channel, "end of feed reached");
                        return Ok(Vec::new());
                    };
                    let id = state.issue_id();
                    let handle = self.spawn_list(id, &channel, page);
                    state.list = Some(ListSlot {
                        kind: ListKind::NextPage,
                        page,
                        slot: Slot::new(id, handle, sender),
                    });
                }
            }

            receiver
        };

        receiver.await.unwrap_or(Err(FeedError::Canceled))
    }

    /// Resolve presets and credits for a video in the collection
    ///
    /// Calls for an identifier whose detail fetch is in flight share its
    /// result. The entry is updated in place and keeps its position.
    ///
    /// # Errors
    /// - `NotConfigured` if no channel is set
    /// - `UnknownVideo` if the identifier is not in the collection
    /// - `FetchFailed` / `MalformedResponse` if the video request fails
    /// - `Canceled` if the fetch is canceled before it completes
    pub async fn fetch_detail(&self, identifier: &str) -> Result<Video> {
        let receiver = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            if state.channel.is_none() {
                return Err(FeedError::NotConfigured);
            }
            let Some(&index) = state.positions.get(identifier) else {
                return Err(FeedError::UnknownVideo(identifier.to_string()));
            };
            let (sender, receiver) = oneshot::channel();

            match state.details.get_mut(identifier) {
                Some(slot) if slot.is_live() => {
                    debug!(video = identifier, "joining in-flight detail fetch");
                    slot.waiters.push(sender);
                }
                _ => {
                    let id = state.issue_id();
                    let handle = self.spawn_detail(id, identifier, state.entries[index].idx);
                    state
                        .details
                        .insert(identifier.to_string(), Slot::new(id, handle, sender));
                }
            }

            receiver
        };

        receiver.await.unwrap_or(Err(FeedError::Canceled))
    }

    /// Cancel the list fetch and every detail fetch
    ///
    /// Everyone waiting on them receives `Canceled`. The collection is left
    /// as it was.
    pub async fn cancel_all(&self) {
        let canceled = self.inner.state.lock().await.cancel_in_flight();
        if canceled > 0 {
            debug!(canceled, "canceled in-flight requests");
        }
    }

    fn spawn_list(&self, id: u64, channel: &str, page: u32) -> AbortHandle {
        let config = &self.inner.config;
        let request = self.inner.api.channel_videos(
            channel,
            config.page_size,
            page,
            &config.sort,
            config.direction,
        );
        let first_idx = u64::from(page.saturating_sub(1)) * u64::from(config.page_size);
        debug!(id, channel, page, "issuing list request");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = inner.load_page(&request, page, first_idx).await;
            inner.complete_list(id, outcome).await;
        })
        .abort_handle()
    }

    fn spawn_detail(&self, id: u64, identifier: &str, idx: u64) -> AbortHandle {
        debug!(id, video = identifier, "issuing detail request");

        let inner = Arc::clone(&self.inner);
        let identifier = identifier.to_string();
        tokio::spawn(async move {
            let outcome = inner.load_detail(&identifier, idx).await;
            inner.complete_detail(id, &identifier, outcome).await;
        })
        .abort_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves canned bodies keyed by request path
    struct CannedTransport {
        bodies: HashMap<String, Value>,
        calls: AtomicUsize,
    }

    impl CannedTransport {
        fn new(bodies: Vec<(&str, Value)>) -> Self {
            Self {
                bodies: bodies
                    .into_iter()
                    .map(|(path, body)| (path.to_string(), body))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Transport for CannedTransport {
        async fn fetch_json(&self, request: &ApiRequest) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies.get(request.path()).cloned().ok_or_else(|| {
                TransportError::Status {
                    status: 404,
                    url: request.url(),
                }
                .into()
            })
        }
    }

    fn record(id: &str) -> Value {
        json!({
            "uri": format!("/videos/{}", id),
            "name": format!("Video {}", id),
            "created_time": "2015-06-01T12:00:00+00:00"
        })
    }

    fn manager(bodies: Vec<(&str, Value)>) -> FeedManager<CannedTransport> {
        FeedManager::with_transport(FeedConfig::with_token("token"), CannedTransport::new(bodies))
    }

    #[test]
    fn test_feed_config_default() {
        let config = FeedConfig::with_token("abc");
        assert_eq!(config.access_token, "abc");
        assert_eq!(config.base_url, "https://api.vimeo.com");
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.preferred_image_width, 640);
        assert_eq!(config.sort, "date");
        assert_eq!(config.direction, SortDirection::Asc);
    }

    #[test]
    fn test_manager_creation() {
        let feed = FeedManager::new(FeedConfig::with_token("abc"));
        assert!(feed.is_ok());
    }

    #[test]
    fn test_event_serialization() {
        let event = FeedEvent::Appended { start: 10, count: 5 };
        let json = serde_json::to_value(&event).expect("Serialization should succeed");
        assert_eq!(json, json!({ "kind": "appended", "start": 10, "count": 5 }));

        let event = FeedEvent::Failed { error: FeedError::Canceled };
        let json = serde_json::to_value(&event).expect("Serialization should succeed");
        assert_eq!(json, json!({ "kind": "failed", "error": "Request canceled" }));
    }

    #[tokio::test]
    async fn test_fetch_before_configure() {
        let feed = manager(Vec::new());

        assert!(matches!(feed.fetch_newest().await, Err(FeedError::NotConfigured)));
        assert!(matches!(feed.fetch_next_page().await, Err(FeedError::NotConfigured)));
        assert!(matches!(feed.fetch_detail("1").await, Err(FeedError::NotConfigured)));
        assert_eq!(feed.inner.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_configure_rejects_blank_channel() {
        let feed = manager(Vec::new());
        assert!(matches!(feed.configure("  ").await, Err(FeedError::InvalidId(_))));
        assert_eq!(feed.channel().await, None);
    }

    #[tokio::test]
    async fn test_configure_same_channel_keeps_entries() {
        let page = json!({ "paging": { "next": null }, "data": [record("1"), record("2")] });
        let feed = manager(vec![("/channels/staffpicks/videos", page)]);

        feed.configure("staffpicks").await.expect("configure");
        feed.fetch_newest().await.expect("fetch");
        let mut events = feed.subscribe();

        feed.configure("staffpicks").await.expect("configure");

        assert_eq!(feed.len().await, 2);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fetch_newest_dedupes_within_page() {
        let page = json!({
            "paging": { "next": null },
            "data": [record("1"), record("2"), record("1")]
        });
        let feed = manager(vec![("/channels/staffpicks/videos", page)]);
        feed.configure("staffpicks").await.expect("configure");

        let entries = feed.fetch_newest().await.expect("fetch");

        let ids: Vec<&str> = entries.iter().map(|v| v.identifier.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(!feed.has_next_page().await);
    }

    #[tokio::test]
    async fn test_fetch_next_page_at_end_is_noop() {
        let page = json!({ "paging": { "next": null }, "data": [record("1")] });
        let feed = manager(vec![("/channels/staffpicks/videos", page)]);
        feed.configure("staffpicks").await.expect("configure");
        feed.fetch_newest().await.expect("fetch");

        let appended = feed.fetch_next_page().await.expect("next page");

        assert!(appended.is_empty());
        assert_eq!(feed.inner.transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_detail_unknown_video() {
        let feed = manager(Vec::new());
        feed.configure("staffpicks").await.expect("configure");

        let result = feed.fetch_detail("404").await;
        assert!(matches!(result, Err(FeedError::UnknownVideo(ref id)) if id == "404"));
    }

    #[tokio::test]
    async fn test_fetch_detail_updates_entry_and_notifies() {
        let page = json!({ "paging": { "next": null }, "data": [record("1"), record("2")] });
        let mut detail = record("2");
        detail["files"] = json!([{ "quality": "hd", "link": "https://cdn/2.mp4" }]);
        let credits = json!({ "data": [{ "role": "Director", "name": "Dan" }] });
        let feed = manager(vec![
            ("/channels/staffpicks/videos", page),
            ("/videos/2", detail),
            ("/videos/2/credits", credits),
        ]);
        feed.configure("staffpicks").await.expect("configure");
        feed.fetch_newest().await.expect("fetch");
        let mut events = feed.subscribe();

        let video = feed.fetch_detail("2").await.expect("detail");

        assert_eq!(video.author.as_deref(), Some("Dan"));
        assert_eq!(video.idx, 1);
        assert!(video.preset("hd").is_some());
        assert_eq!(feed.video("2").await, Some(video));
        assert!(matches!(
            events.try_recv(),
            Ok(FeedEvent::DetailUpdated { index: 1, ref identifier }) if identifier == "2"
        ));
    }

    #[tokio::test]
    async fn test_fetch_detail_survives_missing_credits() {
        let page = json!({ "paging": { "next": null }, "data": [record("1")] });
        let feed = manager(vec![
            ("/channels/staffpicks/videos", page),
            ("/videos/1", record("1")),
        ]);
        feed.configure("staffpicks").await.expect("configure");
        feed.fetch_newest().await.expect("fetch");

        let video = feed.fetch_detail("1").await.expect("detail");

        assert_eq!(video.credits, None);
        assert_eq!(video.author, None);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cursor() {
        let page = json!({ "paging": { "next": "/channels/staffpicks/videos?page=2" }, "data": [record("1")] });
        let feed = manager(vec![("/channels/staffpicks/videos", page)]);
        feed.configure("staffpicks").await.expect("configure");
        feed.fetch_newest().await.expect("fetch");

        // Switching to a channel the transport does not know
        feed.configure("other").await.expect("configure");
        let result = feed.fetch_newest().await;

        assert!(matches!(result, Err(FeedError::FetchFailed(_))));
        assert!(feed.is_empty().await);
        assert!(feed.has_next_page().await);
    }

    #[tokio::test]
    async fn test_malformed_envelope() {
        let feed = manager(vec![("/channels/staffpicks/videos", json!({ "total": 0 }))]);
        feed.configure("staffpicks").await.expect("configure");

        let result = feed.fetch_newest().await;
        assert!(matches!(result, Err(FeedError::MalformedResponse(_))));
    }

    #[test]
    fn test_state_merge_refreshes_in_place() {
        let video = |id: &str, idx: u64, name: &str| {
            let mut v = map_video(&record(id), idx, 640).expect("map");
            v.name = name.to_string();
            v
        };
        let mut state = FeedState::default();
        state.replace(vec![video("a", 0, "A"), video("b", 1, "B")]);

        let updated = state.merge(vec![video("b", 2, "B2"), video("c", 3, "C")]);

        assert_eq!(updated, vec![1]);
        let names: Vec<&str> = state.entries.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B2", "C"]);
        assert_eq!(state.entries[1].idx, 1);
        assert_eq!(state.positions.get("c"), Some(&2));
    }
}
