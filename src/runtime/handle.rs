//! Resource client: a single-writer command loop owning the cache
//! store, with cloneable handles, per-entry watch subscriptions, and
//! explicit focus/reconnect refetch signals.

use std::{
    marker::PhantomData,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use hashbrown::HashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::{
    content::{BlogDraft, BlogPost, Book, BookDraft, PagedBlogs, SocialLinks},
    core::cache::{CacheStore, EntryStatus, EntryView, FetchOutcome, SubscribeOutcome},
    endpoint::{CacheKey, Endpoint, EndpointKind, RequestDescriptor},
    newsletter::{NewsletterStats, Subscriber, validate_email},
    transport::{ApiError, Transport},
    types::{BlogCategory, BlogId, BookId, FetchGen, SubscriberId, Tag, ValidationError},
};

use super::events::ClientEvent;

/// Client-level failure surfaced on handle calls.
#[derive(Debug)]
pub enum ClientError {
    /// Local pre-flight validation failed; no request was issued.
    Validation(ValidationError),
    /// The server answered with a non-2xx payload, or the transport
    /// failed (status 0).
    Api(ApiError),
    /// Cached data did not deserialize into the requested type.
    Deserialize(serde_json::Error),
    /// A mutation endpoint was passed to `query`.
    NotAQuery(&'static str),
    /// A query endpoint was passed to `mutate`.
    NotAMutation(&'static str),
    /// The client loop has shut down.
    ChannelClosed,
}

impl From<ValidationError> for ClientError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ApiError> for ClientError {
    fn from(value: ApiError) -> Self {
        Self::Api(value)
    }
}

/// Runtime tuning knobs.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Grace period before a zero-subscriber entry is collected.
    pub gc_grace_ms: u64,
    /// Command queue bound.
    pub command_queue_bound: usize,
    /// Completed-task queue bound.
    pub task_queue_bound: usize,
    /// Event stream capacity.
    pub events_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gc_grace_ms: 60_000,
            command_queue_bound: 256,
            task_queue_bound: 256,
            events_capacity: 1024,
        }
    }
}

/// The two external refetch triggers. The UI shell fires these from its
/// window-focus and connectivity listeners; the client subscribes at
/// spawn and every subscribed entry refetches on a signal.
#[derive(Debug)]
pub struct RefetchSignals {
    focus: broadcast::Sender<()>,
    reconnect: broadcast::Sender<()>,
}

impl Default for RefetchSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl RefetchSignals {
    /// Creates both signal sources.
    pub fn new() -> Self {
        let (focus, _) = broadcast::channel(16);
        let (reconnect, _) = broadcast::channel(16);
        Self { focus, reconnect }
    }

    /// Fires the window-refocus signal.
    pub fn focus(&self) {
        let _ = self.focus.send(());
    }

    /// Fires the network-reconnect signal.
    pub fn reconnect(&self) {
        let _ = self.reconnect.send(());
    }
}

/// Cloneable handle to the client loop.
pub struct ClientHandle {
    cmd_tx: mpsc::Sender<Command>,
    release_tx: mpsc::UnboundedSender<CacheKey>,
    events_tx: broadcast::Sender<ClientEvent>,
}

impl Clone for ClientHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            release_tx: self.release_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

/// Typed snapshot of a query subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryView<T> {
    /// Deserialized data from the latest applied response.
    pub data: Option<T>,
    /// Latest applied error, cleared on success.
    pub error: Option<ApiError>,
    /// True only before the first response lands.
    pub is_loading: bool,
    /// True while any request for the entry is in flight.
    pub is_fetching: bool,
    /// Milliseconds since epoch of the latest successful response.
    pub last_fetched_at: Option<u64>,
}

/// Live subscription to one cache entry. Dropping it releases the entry;
/// an in-flight request is not cancelled, but its response becomes
/// unobservable once the last subscriber is gone.
#[derive(Debug)]
pub struct QuerySubscription<T> {
    key: CacheKey,
    rx: watch::Receiver<EntryView>,
    release_tx: mpsc::UnboundedSender<CacheKey>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> QuerySubscription<T> {
    /// Cache key this subscription observes.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Raw entry snapshot.
    pub fn view(&self) -> EntryView {
        self.rx.borrow().clone()
    }

    /// Typed entry snapshot.
    pub fn current(&self) -> Result<QueryView<T>, ClientError> {
        let view = self.view();
        let data = match view.data {
            Some(value) => Some(serde_json::from_value(value).map_err(ClientError::Deserialize)?),
            None => None,
        };
        Ok(QueryView {
            data,
            error: view.error,
            is_loading: view.status == EntryStatus::Loading,
            is_fetching: view.is_fetching,
            last_fetched_at: view.last_fetched_at,
        })
    }

    /// Waits for the next published entry state.
    pub async fn changed(&mut self) -> Result<(), ClientError> {
        self.rx
            .changed()
            .await
            .map_err(|_| ClientError::ChannelClosed)
    }

    /// Waits until no request is in flight and a response has been
    /// applied, then returns the typed snapshot.
    pub async fn resolved(&mut self) -> Result<QueryView<T>, ClientError> {
        loop {
            let settled = {
                let view = self.rx.borrow();
                !view.is_fetching
                    && matches!(view.status, EntryStatus::Success | EntryStatus::Error)
            };
            if settled {
                return self.current();
            }
            self.changed().await?;
        }
    }
}

impl<T> Drop for QuerySubscription<T> {
    fn drop(&mut self) {
        let _ = self.release_tx.send(self.key.clone());
    }
}

struct SubscriptionStart {
    key: CacheKey,
    rx: watch::Receiver<EntryView>,
}

enum Command {
    Subscribe {
        endpoint: Endpoint,
        resp: oneshot::Sender<SubscriptionStart>,
    },
    Mutate {
        endpoint: Endpoint,
        resp: oneshot::Sender<Result<Value, ClientError>>,
    },
    Gc {
        resp: oneshot::Sender<usize>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

enum TaskDone {
    Fetch {
        key: CacheKey,
        generation: FetchGen,
        result: Result<Value, ApiError>,
    },
    Mutation {
        endpoint: &'static str,
        invalidates: &'static [Tag],
        result: Result<Value, ApiError>,
        resp: oneshot::Sender<Result<Value, ClientError>>,
    },
}

/// Spawns the client loop and returns its handle. The loop owns the
/// cache store outright; handles and subscriptions only ever observe it
/// through channels.
pub fn spawn_client(
    store: CacheStore,
    transport: Arc<dyn Transport>,
    signals: &RefetchSignals,
    config: ClientConfig,
) -> ClientHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound);
    let (release_tx, mut release_rx) = mpsc::unbounded_channel::<CacheKey>();
    let (done_tx, mut done_rx) = mpsc::channel::<TaskDone>(config.task_queue_bound);
    let (events_tx, _) = broadcast::channel::<ClientEvent>(config.events_capacity);

    let mut focus_rx = signals.focus.subscribe();
    let mut reconnect_rx = signals.reconnect.subscribe();
    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        let mut store = store;
        let mut watchers: HashMap<CacheKey, watch::Sender<EntryView>> = HashMap::new();
        let mut requests: HashMap<CacheKey, RequestDescriptor> = HashMap::new();
        let mut focus_open = true;
        let mut reconnect_open = true;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break; };
                    let done = handle_command(
                        cmd,
                        &mut store,
                        &mut watchers,
                        &mut requests,
                        &transport,
                        &done_tx,
                        &events_tx_loop,
                        &config,
                    );
                    if done {
                        break;
                    }
                }
                task = done_rx.recv() => {
                    let Some(task) = task else { break; };
                    handle_task_done(
                        task,
                        &mut store,
                        &watchers,
                        &requests,
                        &transport,
                        &done_tx,
                        &events_tx_loop,
                    );
                }
                key = release_rx.recv() => {
                    let Some(key) = key else { break; };
                    store.unsubscribe(&key, now_ms());
                    sweep(&mut store, &mut watchers, &mut requests, config.gc_grace_ms);
                }
                signal = focus_rx.recv(), if focus_open => {
                    match signal {
                        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                            refetch_all(&mut store, &watchers, &requests, &transport, &done_tx, &events_tx_loop);
                        }
                        Err(broadcast::error::RecvError::Closed) => focus_open = false,
                    }
                }
                signal = reconnect_rx.recv(), if reconnect_open => {
                    match signal {
                        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                            refetch_all(&mut store, &watchers, &requests, &transport, &done_tx, &events_tx_loop);
                        }
                        Err(broadcast::error::RecvError::Closed) => reconnect_open = false,
                    }
                }
            }
        }
    });

    ClientHandle {
        cmd_tx,
        release_tx,
        events_tx,
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_command(
    cmd: Command,
    store: &mut CacheStore,
    watchers: &mut HashMap<CacheKey, watch::Sender<EntryView>>,
    requests: &mut HashMap<CacheKey, RequestDescriptor>,
    transport: &Arc<dyn Transport>,
    done_tx: &mpsc::Sender<TaskDone>,
    events_tx: &broadcast::Sender<ClientEvent>,
    config: &ClientConfig,
) -> bool {
    match cmd {
        Command::Subscribe { endpoint, resp } => {
            let key = endpoint.cache_key();
            let outcome = store.subscribe(&key, endpoint.provides());
            requests.insert(key.clone(), endpoint.request());

            let sender = watchers.entry(key.clone()).or_insert_with(|| {
                let initial = store.view(&key).unwrap_or_default();
                watch::channel(initial).0
            });
            let rx = sender.subscribe();

            match outcome {
                SubscribeOutcome::FirstSubscriber | SubscribeOutcome::NeedsRefetch => {
                    start_fetch(store, watchers, requests, transport, done_tx, events_tx, key.clone());
                }
                // A joiner shares the in-flight request instead of
                // issuing a duplicate network call.
                SubscribeOutcome::InFlight | SubscribeOutcome::Fresh => {}
            }

            let _ = resp.send(SubscriptionStart { key, rx });
        }
        Command::Mutate { endpoint, resp } => {
            let name = endpoint.name();
            let invalidates = endpoint.invalidates();
            let request = endpoint.request();
            let transport = Arc::clone(transport);
            let done_tx = done_tx.clone();
            tokio::spawn(async move {
                let result = perform_request(transport, request).await;
                let _ = done_tx
                    .send(TaskDone::Mutation {
                        endpoint: name,
                        invalidates,
                        result,
                        resp,
                    })
                    .await;
            });
        }
        Command::Gc { resp } => {
            let removed = sweep(store, watchers, requests, config.gc_grace_ms);
            let _ = resp.send(removed);
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(());
            return true;
        }
    }
    false
}

fn handle_task_done(
    task: TaskDone,
    store: &mut CacheStore,
    watchers: &HashMap<CacheKey, watch::Sender<EntryView>>,
    requests: &HashMap<CacheKey, RequestDescriptor>,
    transport: &Arc<dyn Transport>,
    done_tx: &mpsc::Sender<TaskDone>,
    events_tx: &broadcast::Sender<ClientEvent>,
) {
    match task {
        TaskDone::Fetch {
            key,
            generation,
            result,
        } => match store.complete_fetch(&key, generation, result, now_ms()) {
            FetchOutcome::Applied => {
                publish(store, watchers, &key);
                let _ = events_tx.send(ClientEvent::FetchApplied { key, generation });
            }
            FetchOutcome::StaleDropped => {
                tracing::debug!(%key, generation, "discarding superseded response");
                let _ = events_tx.send(ClientEvent::StaleResponseDropped { key, generation });
            }
            FetchOutcome::EntryGone => {
                tracing::debug!(%key, generation, "dropping response for collected entry");
            }
        },
        TaskDone::Mutation {
            endpoint,
            invalidates,
            result,
            resp,
        } => match result {
            Ok(value) => {
                let _ = events_tx.send(ClientEvent::MutationApplied { endpoint });
                // Invalidation runs strictly after the mutation's own
                // response has resolved.
                if !invalidates.is_empty() {
                    let plan = store.invalidate(invalidates);
                    tracing::debug!(
                        endpoint,
                        refetched = plan.refetch.len(),
                        marked_stale = plan.marked_stale,
                        "invalidating tags"
                    );
                    for key in plan.refetch.iter().cloned() {
                        start_fetch(store, watchers, requests, transport, done_tx, events_tx, key);
                    }
                    let _ = events_tx.send(ClientEvent::Invalidated {
                        refetched: plan.refetch.len(),
                        marked_stale: plan.marked_stale,
                    });
                }
                let _ = resp.send(Ok(value));
            }
            Err(err) => {
                tracing::warn!(endpoint, status = err.status, "mutation failed");
                let _ = events_tx.send(ClientEvent::MutationFailed {
                    endpoint,
                    status: err.status,
                });
                let _ = resp.send(Err(ClientError::Api(err)));
            }
        },
    }
}

fn start_fetch(
    store: &mut CacheStore,
    watchers: &HashMap<CacheKey, watch::Sender<EntryView>>,
    requests: &HashMap<CacheKey, RequestDescriptor>,
    transport: &Arc<dyn Transport>,
    done_tx: &mpsc::Sender<TaskDone>,
    events_tx: &broadcast::Sender<ClientEvent>,
    key: CacheKey,
) {
    let Some(request) = requests.get(&key).cloned() else {
        return;
    };
    let Ok(generation) = store.begin_fetch(&key) else {
        return;
    };
    publish(store, watchers, &key);
    let _ = events_tx.send(ClientEvent::FetchStarted {
        key: key.clone(),
        generation,
    });

    let transport = Arc::clone(transport);
    let done_tx = done_tx.clone();
    tokio::spawn(async move {
        let result = perform_request(transport, request).await;
        let _ = done_tx
            .send(TaskDone::Fetch {
                key,
                generation,
                result,
            })
            .await;
    });
}

fn refetch_all(
    store: &mut CacheStore,
    watchers: &HashMap<CacheKey, watch::Sender<EntryView>>,
    requests: &HashMap<CacheKey, RequestDescriptor>,
    transport: &Arc<dyn Transport>,
    done_tx: &mpsc::Sender<TaskDone>,
    events_tx: &broadcast::Sender<ClientEvent>,
) {
    for key in store.keys_to_refetch_on_signal() {
        start_fetch(store, watchers, requests, transport, done_tx, events_tx, key);
    }
}

fn sweep(
    store: &mut CacheStore,
    watchers: &mut HashMap<CacheKey, watch::Sender<EntryView>>,
    requests: &mut HashMap<CacheKey, RequestDescriptor>,
    grace_ms: u64,
) -> usize {
    let removed = store.collect_garbage(now_ms(), grace_ms);
    for key in &removed {
        watchers.remove(key);
        requests.remove(key);
    }
    removed.len()
}

fn publish(
    store: &CacheStore,
    watchers: &HashMap<CacheKey, watch::Sender<EntryView>>,
    key: &CacheKey,
) {
    if let (Some(view), Some(sender)) = (store.view(key), watchers.get(key)) {
        let _ = sender.send(view);
    }
}

async fn perform_request(
    transport: Arc<dyn Transport>,
    request: RequestDescriptor,
) -> Result<Value, ApiError> {
    match transport.send(request).await {
        Ok(response) if response.is_success() => Ok(response.body),
        Ok(response) => Err(ApiError::from_response(response)),
        Err(err) => Err(ApiError::from_transport(&err)),
    }
}

impl ClientHandle {
    /// Subscribes to the client event stream.
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events_tx.subscribe()
    }

    /// Subscribes to a query endpoint. The first subscriber per distinct
    /// (endpoint, args) triggers the network call; joiners share it.
    pub async fn query<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
    ) -> Result<QuerySubscription<T>, ClientError> {
        if endpoint.kind() != EndpointKind::Query {
            return Err(ClientError::NotAQuery(endpoint.name()));
        }

        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Subscribe { endpoint, resp: tx })
            .await
            .map_err(|_| ClientError::ChannelClosed)?;
        let start = rx.await.map_err(|_| ClientError::ChannelClosed)?;

        Ok(QuerySubscription {
            key: start.key,
            rx: start.rx,
            release_tx: self.release_tx.clone(),
            _marker: PhantomData,
        })
    }

    /// Runs a mutation endpoint. On success the endpoint's invalidated
    /// tags fan out before this returns; the error arm carries the
    /// structured `{status, data}` payload.
    pub async fn mutate(&self, endpoint: Endpoint) -> Result<Value, ClientError> {
        if endpoint.kind() != EndpointKind::Mutation {
            return Err(ClientError::NotAMutation(endpoint.name()));
        }

        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Mutate { endpoint, resp: tx })
            .await
            .map_err(|_| ClientError::ChannelClosed)?;
        rx.await.map_err(|_| ClientError::ChannelClosed)?
    }

    /// Collects zero-subscriber entries past the grace period and
    /// returns how many were removed.
    pub async fn collect_garbage(&self) -> Result<usize, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Gc { resp: tx })
            .await
            .map_err(|_| ClientError::ChannelClosed)?;
        rx.await.map_err(|_| ClientError::ChannelClosed)
    }

    /// Stops the client loop. Outstanding requests resolve into nothing.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| ClientError::ChannelClosed)?;
        rx.await.map_err(|_| ClientError::ChannelClosed)
    }

    /// Newsletter sign-up. The email shape is checked locally first;
    /// a malformed address fails without any network traffic. Duplicate
    /// resubscription is an upsert on the server side.
    pub async fn subscribe_newsletter(&self, email: &str) -> Result<Value, ClientError> {
        validate_email(email)?;
        self.mutate(Endpoint::SubscribeNewsletter {
            email: email.to_string(),
        })
        .await
    }

    /// Admin subscriber listing.
    pub async fn subscribers(&self) -> Result<QuerySubscription<Vec<Subscriber>>, ClientError> {
        self.query(Endpoint::GetSubscribers).await
    }

    /// Flips one subscriber between active and inactive.
    pub async fn toggle_subscriber_status(&self, id: SubscriberId) -> Result<Value, ClientError> {
        self.mutate(Endpoint::ToggleSubscriberStatus { id }).await
    }

    /// Bulk-removes subscribers. An empty id list is sent as a no-op;
    /// disabling the action for empty selections is the UI's concern.
    pub async fn delete_subscribers(&self, ids: Vec<SubscriberId>) -> Result<Value, ClientError> {
        self.mutate(Endpoint::DeleteSubscribers { ids }).await
    }

    /// Admin newsletter statistics.
    pub async fn newsletter_stats(&self) -> Result<QuerySubscription<NewsletterStats>, ClientError> {
        self.query(Endpoint::GetNewsletterStats).await
    }

    /// Admin blog listing.
    pub async fn admin_blogs(&self) -> Result<QuerySubscription<Vec<BlogPost>>, ClientError> {
        self.query(Endpoint::GetAdminBlogs).await
    }

    /// Public paged blog listing.
    pub async fn public_blogs(
        &self,
        page: u32,
        limit: u32,
        category: Option<BlogCategory>,
    ) -> Result<QuerySubscription<PagedBlogs>, ClientError> {
        self.query(Endpoint::GetPublicBlogs {
            page,
            limit,
            category,
        })
        .await
    }

    /// Public single blog post.
    pub async fn public_blog_post(
        &self,
        id: BlogId,
    ) -> Result<QuerySubscription<BlogPost>, ClientError> {
        self.query(Endpoint::GetPublicBlogPost { id }).await
    }

    /// Creates a blog post from the admin authoring flow.
    pub async fn create_blog(&self, draft: BlogDraft) -> Result<Value, ClientError> {
        self.mutate(Endpoint::CreateBlog { draft }).await
    }

    /// Updates a blog post, replacing its block sequence whole.
    pub async fn update_blog(&self, id: BlogId, draft: BlogDraft) -> Result<Value, ClientError> {
        self.mutate(Endpoint::UpdateBlog { id, draft }).await
    }

    /// Deletes a blog post.
    pub async fn delete_blog_post(&self, id: BlogId) -> Result<Value, ClientError> {
        self.mutate(Endpoint::DeleteBlogPost { id }).await
    }

    /// Creates a catalog book.
    pub async fn create_book(&self, draft: BookDraft) -> Result<Value, ClientError> {
        self.mutate(Endpoint::CreateBook { draft }).await
    }

    /// Admin book listing.
    pub async fn admin_books(&self) -> Result<QuerySubscription<Vec<Book>>, ClientError> {
        self.query(Endpoint::GetAdminBooks).await
    }

    /// Public book catalog.
    pub async fn public_books(&self) -> Result<QuerySubscription<Vec<Book>>, ClientError> {
        self.query(Endpoint::GetPublicBooks).await
    }

    /// Public single book.
    pub async fn book_by_id(&self, id: BookId) -> Result<QuerySubscription<Book>, ClientError> {
        self.query(Endpoint::GetBookById { id }).await
    }

    /// Social media link set.
    pub async fn social_media(&self) -> Result<QuerySubscription<SocialLinks>, ClientError> {
        self.query(Endpoint::GetSocialMedia).await
    }

    /// Replaces the social media link set.
    pub async fn update_social_media(&self, links: SocialLinks) -> Result<Value, ClientError> {
        self.mutate(Endpoint::UpdateSocialMedia { links }).await
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
