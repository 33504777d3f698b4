//! Debounced city autocomplete bound to a text input.

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    config::SearchSettings,
    model::{CityPrediction, SuggestionState},
    session::{WeatherSession, WeatherState},
};

/// Produces city suggestions for a partial query. Never fails; no match is an empty list.
#[async_trait]
pub trait PlaceSuggester: Send + Sync + Debug {
    async fn suggest(&self, query: &str) -> Vec<CityPrediction>;
}

/// Who changed the input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOrigin {
    User,
    Programmatic,
}

/// Turns keystrokes into debounced suggestion lookups.
///
/// A keystroke cancels the lookup started by the previous one, including its
/// in-flight request, so only the latest query can populate the list.
#[derive(Debug)]
pub struct SearchController {
    suggester: Arc<dyn PlaceSuggester>,
    session: Option<Arc<WeatherSession>>,
    settings: SearchSettings,
    state: Arc<watch::Sender<SuggestionState>>,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<CancellationToken>>,
}

impl SearchController {
    pub fn new(suggester: Arc<dyn PlaceSuggester>, settings: SearchSettings) -> Self {
        let (state, _) = watch::channel(SuggestionState { user_typing: true, ..Default::default() });
        Self {
            suggester,
            session: None,
            settings,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    /// Fetch weather when a suggestion is selected or the query submitted.
    pub fn with_session(mut self, session: Arc<WeatherSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SuggestionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SuggestionState {
        self.state.borrow().clone()
    }

    /// Handles a change of the input text. Must be called inside a Tokio runtime.
    pub fn on_query_changed(&self, text: &str, origin: InputOrigin) {
        let generation = self.supersede_pending();
        let user_typing = origin == InputOrigin::User;
        let wants_lookup = user_typing && text.chars().count() >= self.settings.min_query_chars;

        self.state.send_modify(|state| {
            state.query = text.to_string();
            state.user_typing = user_typing;
            state.is_loading = wants_lookup;
            if !wants_lookup {
                state.suggestions.clear();
                state.visible = false;
            }
        });

        if !wants_lookup {
            return;
        }

        let token = CancellationToken::new();
        *self.pending.lock() = Some(token.clone());

        let query = text.to_string();
        let debounce = self.settings.debounce();
        let suggester = self.suggester.clone();
        let state = self.state.clone();
        let current = self.generation.clone();

        tokio::spawn(async move {
            let lookup = async {
                tokio::time::sleep(debounce).await;
                suggester.suggest(&query).await
            };

            tokio::select! {
                _ = token.cancelled() => {
                    tracing::trace!("Suggestion lookup for {:?} superseded", query);
                }
                suggestions = lookup => {
                    state.send_if_modified(|s| {
                        if current.load(Ordering::SeqCst) != generation {
                            return false;
                        }
                        s.visible = !suggestions.is_empty();
                        s.suggestions = suggestions;
                        s.is_loading = false;
                        true
                    });
                }
            }
        });
    }

    /// Fills the input with the prediction's name, hides the list and fetches its weather.
    pub async fn select_suggestion(&self, prediction: &CityPrediction) -> Option<WeatherState> {
        self.select_place(&prediction.display_name).await
    }

    /// Same as [`select_suggestion`](Self::select_suggestion) for a bare place name.
    pub async fn select_place(&self, place: &str) -> Option<WeatherState> {
        self.commit(place.to_string());
        self.fetch(place).await
    }

    /// Fetches weather for the typed text as-is. `None` when the input is blank.
    pub async fn submit(&self) -> Option<WeatherState> {
        let query = self.state.borrow().query.trim().to_string();
        if query.is_empty() {
            return None;
        }
        self.commit(query.clone());
        self.fetch(&query).await
    }

    fn commit(&self, query: String) {
        self.supersede_pending();
        self.state.send_modify(|state| {
            state.query = query;
            state.user_typing = false;
            state.visible = false;
            state.is_loading = false;
        });
    }

    async fn fetch(&self, place: &str) -> Option<WeatherState> {
        let session = self.session.as_ref()?;
        Some(session.fetch(place).await)
    }

    /// Cancels the pending lookup and returns the new generation number.
    fn supersede_pending(&self) -> u64 {
        if let Some(token) = self.pending.lock().take() {
            token.cancel();
        }
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        if let Some(token) = self.pending.get_mut().take() {
            token.cancel();
        }
    }
}
