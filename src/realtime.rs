use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, StreamExt, stream};
use serde::Serialize;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    AppState,
    auth::MaybeUser,
    backend::BackendError,
    config::Config,
    models::{Booking, Movie, Showtime},
};

pub const CHANNEL_CAPACITY: usize = 64;

/// Rows that can be matched across snapshots by primary key.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Movie {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Showtime {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Booking {
    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "eventType", content = "record", rename_all = "UPPERCASE")]
pub enum RowChange<T> {
    Insert(T),
    Update(T),
    Delete(String),
}

impl<T: Keyed> RowChange<T> {
    pub fn key(&self) -> &str {
        match self {
            RowChange::Insert(row) | RowChange::Update(row) => row.key(),
            RowChange::Delete(key) => key,
        }
    }
}

/// Applies one change to a local copy of a table.
pub fn apply<T: Keyed>(rows: &mut Vec<T>, change: RowChange<T>) {
    match change {
        RowChange::Insert(row) => rows.push(row),
        RowChange::Update(row) => {
            if let Some(existing) = rows.iter_mut().find(|r| r.key() == row.key()) {
                *existing = row;
            }
        },
        RowChange::Delete(key) => rows.retain(|r| r.key() != key),
    }
}

/// Changes that turn `old` into `new`: deletes first, then updates and inserts in `new` order.
pub fn diff<T: Keyed + Clone + PartialEq>(old: &[T], new: &[T]) -> Vec<RowChange<T>> {
    let mut out: Vec<RowChange<T>> = old
        .iter()
        .filter(|o| !new.iter().any(|n| n.key() == o.key()))
        .map(|o| RowChange::Delete(o.key().to_string()))
        .collect();

    for row in new {
        match old.iter().find(|o| o.key() == row.key()) {
            Some(prev) if prev == row => {},
            Some(_) => out.push(RowChange::Update(row.clone())),
            None => out.push(RowChange::Insert(row.clone())),
        }
    }
    out
}

/// Keeps the last snapshot of a polled table and reports what changed since.
pub struct TableWatcher<T> {
    snapshot: Option<Vec<T>>,
}

impl<T> Default for TableWatcher<T> {
    fn default() -> Self {
        Self { snapshot: None }
    }
}

impl<T: Keyed + Clone + PartialEq> TableWatcher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first snapshot only records the baseline.
    pub fn observe(&mut self, latest: Vec<T>) -> Vec<RowChange<T>> {
        let Some(snapshot) = self.snapshot.as_mut() else {
            debug!(count = latest.len(), "baseline recorded");
            self.snapshot = Some(latest);
            return Vec::new();
        };

        let changes = diff(snapshot, &latest);
        for change in &changes {
            apply(snapshot, change.clone());
        }
        changes
    }
}

fn poll_period(config: &Config) -> Duration {
    Duration::from_secs(config.realtime_poll_secs.max(1))
}

/// Background task: poll the catalog, invalidate the cache and fan changes out to subscribers.
pub fn spawn_catalog_watcher(state: Arc<AppState>) -> JoinHandle<()> {
    let period = poll_period(&state.config);

    tokio::spawn(async move {
        let mut watcher = TableWatcher::<Movie>::new();
        let mut ticker = tokio::time::interval(period);

        loop {
            ticker.tick().await;

            match state.backend.list_movies(None).await {
                Ok(movies) => {
                    let changes = watcher.observe(movies);
                    if !changes.is_empty() {
                        info!(changes = changes.len(), "catalog changed");
                        if let Err(err) = state.cache.invalidate_movies().await {
                            warn!(error = %err, "failed to invalidate catalog cache");
                        }
                    }
                    for change in changes {
                        debug!(movie_id = %change.key(), "broadcasting movie change");
                        // no subscribers is fine
                        let _ = state.changes.send(change);
                    }
                },
                Err(err) => warn!(error = %err, "catalog poll failed"),
            }

            match state.cache.purge_expired_drafts().await {
                Ok(0) => {},
                Ok(n) => debug!(purged = n, "purged expired booking drafts"),
                Err(err) => warn!(error = %err, "failed to purge booking drafts"),
            }
        }
    })
}

/// Polls `fetch` every `period` for as long as the stream is held, yielding each row change.
///
/// Used for tables scoped to one subscriber (a movie's showtimes, a user's bookings).
pub fn watch_table<T, F, Fut>(
    period: Duration,
    fetch: F,
) -> impl Stream<Item = RowChange<T>> + Send + 'static
where
    T: Keyed + Clone + PartialEq + Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<T>, BackendError>> + Send + 'static,
{
    let ticker = tokio::time::interval(period);

    let state = (TableWatcher::<T>::new(), ticker, fetch);
    stream::unfold(state, |(mut watcher, mut ticker, mut fetch)| async move {
        loop {
            ticker.tick().await;
            match fetch().await {
                Ok(rows) => {
                    let changes = watcher.observe(rows);
                    if !changes.is_empty() {
                        return Some((stream::iter(changes), (watcher, ticker, fetch)));
                    }
                },
                Err(err) => warn!(error = %err, "change poll failed"),
            }
        }
    })
    .flatten()
}

fn change_event<T: Serialize>(name: &'static str, change: &RowChange<T>) -> Event {
    Event::default().event(name).json_data(change).unwrap_or_else(|err| {
        warn!(error = %err, event = name, "failed to encode change");
        Event::default().event(name)
    })
}

pub fn channel() -> broadcast::Sender<RowChange<Movie>> {
    broadcast::channel(CHANNEL_CAPACITY).0
}

/// `GET /events/movies`: one `movie` event per catalog row change.
pub async fn movie_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.changes.subscribe();

    let events = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(change) => return Some((Ok(change_event("movie", &change)), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "subscriber lagged, skipping changes");
                },
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// `GET /events/showtimes/{movie}`: `showtime` events for one movie's upcoming shows.
pub async fn showtime_events(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let period = poll_period(&state.config);
    debug!(movie_id = %movie_id, "showtime subscriber connected");

    let fetch = move || {
        let state = state.clone();
        let movie_id = movie_id.clone();
        async move { state.backend.showtimes_for_movie(&movie_id, state.config.today()).await }
    };
    let events = watch_table(period, fetch).map(|change| Ok::<_, Infallible>(change_event("showtime", &change)));
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// `GET /events/bookings`: `booking` events for the signed-in user's bookings.
pub async fn booking_events(State(state): State<Arc<AppState>>, MaybeUser(user): MaybeUser) -> Response {
    let Some(session) = user else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let period = poll_period(&state.config);
    debug!(user_id = %session.user_id, "booking subscriber connected");

    let fetch = move || {
        let backend = state.backend.clone();
        let session = session.clone();
        async move { backend.list_bookings(&session).await }
    };
    let events = watch_table(period, fetch).map(|change| Ok::<_, Infallible>(change_event("booking", &change)));
    Sse::new(events).keep_alive(KeepAlive::default()).into_response()
}
