//! Popup view model: one card per tracked package, each with three action
//! buttons and a data panel that receives the summary lines.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, RwLock};
use tokio_util::sync::CancellationToken;

use crate::error::ViewError;
use crate::types::PackageSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    ShowLogs,
    ShowLocation,
    Remove,
}

impl ButtonAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::ShowLogs => "Show Logs",
            Self::ShowLocation => "Show Location",
            Self::Remove => "Remove Package",
        }
    }

    fn id_suffix(self) -> &'static str {
        match self {
            Self::ShowLogs => "Logs",
            Self::ShowLocation => "Maps",
            Self::Remove => "Remove",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub id: String,
    pub action: ButtonAction,
}

/// Card for one package. Element ids are derived from the package name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageCard {
    pub id: String,
    pub package_name: String,
    pub buttons_id: String,
    pub buttons: Vec<Button>,
    pub data_id: String,
    pub data: Vec<String>,
}

impl PackageCard {
    pub fn new(package_name: &str) -> Self {
        let buttons = [
            ButtonAction::ShowLogs,
            ButtonAction::ShowLocation,
            ButtonAction::Remove,
        ]
        .into_iter()
        .map(|action| Button {
            id: format!("{}{}", package_name, action.id_suffix()),
            action,
        })
        .collect();

        Self {
            id: package_name.to_string(),
            package_name: package_name.to_string(),
            buttons_id: format!("{}Buttons", package_name),
            buttons,
            data_id: format!("{}Data", package_name),
            data: Vec::new(),
        }
    }

    /// Whether `id` names this card or one of its children
    pub fn has_element(&self, id: &str) -> bool {
        self.id == id
            || self.buttons_id == id
            || self.data_id == id
            || self.buttons.iter().any(|b| b.id == id)
    }
}

/// Lines shown in a card's data panel
pub fn summary_lines(summary: &PackageSummary) -> Vec<String> {
    vec![
        format!("Date: {}", summary.date.full_date),
        format!("Location: {}", summary.latest_location.full_location),
        format!("Tracking Number: {}", summary.tracking_number),
    ]
}

/// The container every card is mounted into
#[derive(Debug, Default)]
pub struct Outlet {
    cards: Vec<PackageCard>,
}

impl Outlet {
    pub fn cards(&self) -> &[PackageCard] {
        &self.cards
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cards.iter().any(|c| c.has_element(id))
    }

    fn card_with_data_mut(&mut self, data_id: &str) -> Option<&mut PackageCard> {
        self.cards.iter_mut().find(|c| c.data_id == data_id)
    }
}

/// Detach the card with the given id from `parent`.
pub fn remove_element(parent: &mut Outlet, id: &str) -> Option<PackageCard> {
    let index = parent.cards.iter().position(|c| c.id == id)?;
    Some(parent.cards.remove(index))
}

/// Shared handle to the popup's cards
#[derive(Clone, Default)]
pub struct PopupView {
    outlet: Arc<RwLock<Outlet>>,
    changed: Arc<Notify>,
}

impl PopupView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a card; an existing card with the same id is replaced in place.
    pub async fn add_to_view(&self, card: PackageCard) {
        {
            let mut outlet = self.outlet.write().await;
            match outlet.cards.iter_mut().find(|c| c.id == card.id) {
                Some(existing) => *existing = card,
                None => outlet.cards.push(card),
            }
        }
        self.changed.notify_waiters();
    }

    pub async fn remove(&self, id: &str) -> Option<PackageCard> {
        let removed = remove_element(&mut *self.outlet.write().await, id);
        if removed.is_some() {
            self.changed.notify_waiters();
        }
        removed
    }

    /// Append a line to a data panel. Returns false if the panel is not mounted.
    pub async fn append_data(&self, data_id: &str, line: impl Into<String>) -> bool {
        let mut outlet = self.outlet.write().await;
        match outlet.card_with_data_mut(data_id) {
            Some(card) => {
                card.data.push(line.into());
                true
            }
            None => false,
        }
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.outlet.read().await.contains(id)
    }

    /// Resolve a button id to the package it belongs to and its action
    pub async fn button(&self, button_id: &str) -> Option<(String, ButtonAction)> {
        let outlet = self.outlet.read().await;
        outlet.cards.iter().find_map(|card| {
            card.buttons
                .iter()
                .find(|b| b.id == button_id)
                .map(|b| (card.package_name.clone(), b.action))
        })
    }

    pub async fn cards(&self) -> Vec<PackageCard> {
        self.outlet.read().await.cards.clone()
    }

    /// Wait until an element with `id` is mounted.
    ///
    /// Gives up after `timeout`, or as soon as `cancel` fires.
    pub async fn wait_for_element(
        &self,
        id: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), ViewError> {
        let mounted = async {
            loop {
                let notified = self.changed.notified();
                tokio::pin!(notified);
                // Register before checking so a mount in between is not missed
                notified.as_mut().enable();
                if self.outlet.read().await.contains(id) {
                    return;
                }
                notified.await;
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(ViewError::Cancelled { id: id.to_string() }),
            res = tokio::time::timeout(timeout, mounted) => res.map_err(|_| ViewError::Timeout {
                id: id.to_string(),
                waited_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Plain-text rendering of every card
    pub async fn render(&self) -> String {
        let outlet = self.outlet.read().await;
        let mut out = String::new();
        for card in &outlet.cards {
            out.push_str(&format!("== {} ==\n", card.package_name));
            let labels: Vec<String> = card
                .buttons
                .iter()
                .map(|b| format!("[{}]", b.action.label()))
                .collect();
            out.push_str(&labels.join(" "));
            out.push('\n');
            for line in &card.data {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}
