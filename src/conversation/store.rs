//! Single-writer conversation store
//!
//! The turn driver is the only writer and holds the store by `&mut`.
//! Observers subscribe to a broadcast of [`Change`]s, which carry copies
//! of the affected items so readers never touch the store itself.

use super::item::{Item, MessageItem};
use super::wire::WireItem;
use crate::runtime::TurnPhase;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// Change notification sent to observers
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    ItemAdded { index: usize, item: Item },
    ItemUpdated { index: usize, item: Item },
    WireAppended { index: usize },
    WireReplaced { index: usize },
    LoadingChanged(bool),
    PhaseChanged(TurnPhase),
    /// Both lists were cleared for a new chat
    Reset,
}

#[derive(Debug)]
pub struct ConversationStore {
    items: Vec<Item>,
    wire: Vec<WireItem>,
    assistant_loading: bool,
    phase: TurnPhase,
    previous_response_id: Option<String>,
    /// Wire length when the last response completed
    response_mark: usize,
    changes: broadcast::Sender<Change>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            items: Vec::new(),
            wire: Vec::new(),
            assistant_loading: false,
            phase: TurnPhase::Idle,
            previous_response_id: None,
            response_mark: 0,
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }

    /// Subscribe as a `Stream`; lagging observers see a `Lagged` error item
    pub fn changes(&self) -> BroadcastStream<Change> {
        BroadcastStream::new(self.changes.subscribe())
    }

    fn notify(&self, change: Change) {
        // No observers is fine
        let _ = self.changes.send(change);
    }

    // ------------------------------------------------------------------
    // Display list
    // ------------------------------------------------------------------

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn push_item(&mut self, item: Item) -> usize {
        let index = self.items.len();
        self.items.push(item.clone());
        self.notify(Change::ItemAdded { index, item });
        index
    }

    /// Mutate an item in place and notify observers
    pub fn update_item<R>(&mut self, index: usize, f: impl FnOnce(&mut Item) -> R) -> Option<R> {
        let item = self.items.get_mut(index)?;
        let result = f(item);
        let item = item.clone();
        self.notify(Change::ItemUpdated { index, item });
        Some(result)
    }

    /// Index of the most recently appended item matching `pred`
    pub fn rposition(&self, pred: impl Fn(&Item) -> bool) -> Option<usize> {
        self.items.iter().rposition(pred)
    }

    pub fn position_by_id(&self, id: &str) -> Option<usize> {
        self.rposition(|item| item.id() == Some(id))
    }

    // ------------------------------------------------------------------
    // Wire-context list
    // ------------------------------------------------------------------

    pub fn wire(&self) -> &[WireItem] {
        &self.wire
    }

    pub fn push_wire(&mut self, item: WireItem) -> usize {
        let index = self.wire.len();
        self.wire.push(item);
        self.notify(Change::WireAppended { index });
        index
    }

    pub fn replace_wire(&mut self, index: usize, item: WireItem) -> bool {
        let Some(slot) = self.wire.get_mut(index) else {
            return false;
        };
        *slot = item;
        self.notify(Change::WireReplaced { index });
        true
    }

    /// Append a user message to both lists
    pub fn push_user_message(&mut self, text: &str) {
        self.push_item(Item::Message(MessageItem::user(text)));
        self.push_wire(WireItem::user_text(text));
    }

    // ------------------------------------------------------------------
    // Response chaining
    // ------------------------------------------------------------------

    pub fn previous_response_id(&self) -> Option<&str> {
        self.previous_response_id.as_deref()
    }

    /// Record a completed response; later wire items are "new" relative to it
    pub fn mark_response(&mut self, response_id: Option<String>) {
        if response_id.is_some() {
            self.previous_response_id = response_id;
        }
        self.response_mark = self.wire.len();
    }

    /// Wire items appended since the last completed response
    pub fn wire_since_response(&self) -> &[WireItem] {
        &self.wire[self.response_mark.min(self.wire.len())..]
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    pub fn assistant_loading(&self) -> bool {
        self.assistant_loading
    }

    pub fn set_assistant_loading(&mut self, loading: bool) {
        if self.assistant_loading != loading {
            self.assistant_loading = loading;
            self.notify(Change::LoadingChanged(loading));
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: TurnPhase) {
        if self.phase != phase {
            tracing::debug!(from = ?self.phase, to = ?phase, "Turn phase changed");
            self.phase = phase;
            self.notify(Change::PhaseChanged(phase));
        }
    }

    /// Start a new chat: discard both lists and all chaining state
    pub fn reset(&mut self) {
        self.items.clear();
        self.wire.clear();
        self.assistant_loading = false;
        self.phase = TurnPhase::Idle;
        self.previous_response_id = None;
        self.response_mark = 0;
        self.notify(Change::Reset);
    }
}
