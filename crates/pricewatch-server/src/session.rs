//! Action dispatch and the per-session state machine.

use std::sync::Arc;

use pricewatch_core::config::PaginationSettings;
use pricewatch_core::errors::DispatchError;
use pricewatch_core::ids::SessionId;
use pricewatch_core::protocol::{Action, ErrorPayload, SessionMessage};
use pricewatch_core::source::{CatalogSource, PriceSource};
use pricewatch_upstream::PaginationEngine;
use serde::Serialize;

/// What the transport should do after one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Send this text frame; the session stays open.
    Send(String),
    /// Send nothing and close the session.
    Close,
    /// Send nothing; the session stays open.
    Ignore,
}

/// Routes decoded session messages to the catalog and pagination handlers.
///
/// Holds no per-session state, so one instance is shared by every session.
pub struct SessionDispatcher {
    catalog: Arc<dyn CatalogSource>,
    pages: PaginationEngine,
}

impl SessionDispatcher {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        prices: Arc<dyn PriceSource>,
        pagination: &PaginationSettings,
    ) -> Self {
        let pages = PaginationEngine::new(Arc::clone(&catalog), prices, pagination);
        Self { catalog, pages }
    }

    /// Run the handler for `message`. `Ok(None)` means disconnect.
    pub async fn dispatch(&self, message: &SessionMessage) -> Result<Option<String>, DispatchError> {
        match message.action() {
            Action::Elements => {
                let items = self.catalog.all_items().await?;
                encode(&items).map(Some)
            }
            Action::DataForPage => {
                let request = message.page_request()?;
                let page = self.pages.get_page_with_prices(request).await?;
                encode(&page).map(Some)
            }
            Action::Disconnect => Ok(None),
        }
    }

    /// Decode, dispatch and encode one text frame.
    pub async fn handle_text(&self, raw: &str) -> Reply {
        let message = match SessionMessage::decode(raw) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error_kind = e.error_kind(), error = %e, "Rejected session payload");
                return Reply::Ignore;
            }
        };

        let action = message.action();
        tracing::debug!(action = action.as_str(), tag = ?message.action_tag(), "Dispatching");

        match self.dispatch(&message).await {
            Ok(Some(payload)) => Reply::Send(payload),
            Ok(None) => Reply::Close,
            Err(e) => {
                tracing::error!(
                    action = action.as_str(),
                    error_kind = e.error_kind(),
                    error = %e,
                    "Action failed"
                );
                match serde_json::to_string(&ErrorPayload::from(&e)) {
                    Ok(json) => Reply::Send(json),
                    Err(_) => Reply::Ignore,
                }
            }
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String, DispatchError> {
    serde_json::to_string(value).map_err(|e| DispatchError::Encode(e.to_string()))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// One client session. `Open` until a disconnect action or a transport close;
/// `Closed` is terminal.
pub struct Session {
    id: SessionId,
    state: SessionState,
    dispatcher: Arc<SessionDispatcher>,
}

impl Session {
    pub fn new(dispatcher: Arc<SessionDispatcher>) -> Self {
        Self {
            id: SessionId::new(),
            state: SessionState::Open,
            dispatcher,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Handle one inbound text frame. Messages after close are ignored.
    pub async fn on_message(&mut self, raw: &str) -> Reply {
        if !self.is_open() {
            tracing::debug!(session_id = %self.id, "Message after close ignored");
            return Reply::Ignore;
        }

        let reply = self.dispatcher.handle_text(raw).await;
        if reply == Reply::Close {
            self.state = SessionState::Closed;
        }
        reply
    }

    pub fn on_transport_close(&mut self) {
        self.state = SessionState::Closed;
    }
}
