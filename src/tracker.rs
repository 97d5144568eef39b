use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::StatusSource;
use crate::error::TrackError;
use crate::normalize::{
    build_location_summary, extract_pickup_date, location_label, parse_shipping_data,
    trim_location_label,
};
use crate::store::{PackageStore, format_package_name};
use crate::types::{LocationSummary, PackageSummary, RawShippingRecord};
use crate::view::{ButtonAction, PackageCard, PopupView, summary_lines};

const DEFAULT_VIEW_WAIT: Duration = Duration::from_secs(2);

/// Opens a maps link somewhere the user can see it
pub trait Navigator: Send + Sync {
    fn open(&self, url: &str) -> Result<(), TrackError>;
}

/// Prints the link on stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutNavigator;

impl Navigator for StdoutNavigator {
    fn open(&self, url: &str) -> Result<(), TrackError> {
        tracing::info!(url, "opening map");
        println!("{}", url);
        Ok(())
    }
}

/// Result of a button press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Logs(Vec<String>),
    Location(LocationSummary),
    Removed(String),
}

/// Outcome of loading every stored package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub summaries: Vec<PackageSummary>,
    /// Packages whose status could not be fetched
    pub unavailable: Vec<String>,
}

/// Wires the status source, package store, popup view and navigator together
pub struct Tracker {
    source: Arc<dyn StatusSource>,
    store: Arc<dyn PackageStore>,
    navigator: Arc<dyn Navigator>,
    view: PopupView,
    view_wait: Duration,
    cancel: CancellationToken,
}

impl Tracker {
    pub fn new(
        source: Arc<dyn StatusSource>,
        store: Arc<dyn PackageStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            source,
            store,
            navigator,
            view: PopupView::new(),
            view_wait: DEFAULT_VIEW_WAIT,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_view_wait(mut self, view_wait: Duration) -> Self {
        self.view_wait = view_wait;
        self
    }

    pub fn view(&self) -> &PopupView {
        &self.view
    }

    /// Abort every pending wait on the view
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Store a package, mount its card and fill in its summary.
    ///
    /// Returns the summary under the stored (formatted) name.
    pub async fn add_package(
        &self,
        package_name: &str,
        tracking_number: &str,
    ) -> Result<PackageSummary, TrackError> {
        let package_name = format_package_name(package_name.trim());
        let tracking_number = tracking_number.trim();

        self.store.insert(&package_name, tracking_number).await?;
        tracing::info!(%package_name, tracking_number, "added package");

        self.view.add_to_view(PackageCard::new(&package_name)).await;
        self.display_data(&package_name, tracking_number).await
    }

    /// Mount a card for every stored package. Packages whose status cannot be
    /// fetched keep an empty card and are listed as unavailable.
    pub async fn restore(&self) -> Result<RestoreReport, TrackError> {
        let mut report = RestoreReport::default();
        for package in self.store.entries().await? {
            self.view
                .add_to_view(PackageCard::new(&package.package_name))
                .await;
            match self
                .display_data(&package.package_name, &package.tracking_number)
                .await
            {
                Ok(summary) => report.summaries.push(summary),
                Err(e) => {
                    tracing::warn!(
                        package_name = %package.package_name,
                        error = %e,
                        "could not load package status"
                    );
                    report.unavailable.push(package.package_name);
                }
            }
        }
        Ok(report)
    }

    async fn display_data(
        &self,
        package_name: &str,
        tracking_number: &str,
    ) -> Result<PackageSummary, TrackError> {
        let card = PackageCard::new(package_name);
        self.view
            .wait_for_element(&card.data_id, self.view_wait, &self.cancel)
            .await?;

        let raw = self.source.fetch_status(tracking_number).await?;
        let summary = parse_shipping_data(package_name, tracking_number, &raw);
        for line in summary_lines(&summary) {
            self.view.append_data(&card.data_id, line).await;
        }
        Ok(summary)
    }

    /// Remove a package from the store, then drop its card.
    ///
    /// `package_name` is the name as the user typed it; it is formatted the
    /// same way `add_package` formats it before the lookup.
    pub async fn remove_package(&self, package_name: &str) -> Result<(), TrackError> {
        self.remove_stored(&format_package_name(package_name.trim()))
            .await
    }

    async fn remove_stored(&self, key: &str) -> Result<(), TrackError> {
        if !self.store.remove(key).await? {
            return Err(TrackError::UnknownPackage(key.to_string()));
        }
        self.view.remove(key).await;
        tracing::info!(package_name = key, "removed package");
        Ok(())
    }

    async fn fetch_stored(&self, key: &str) -> Result<(String, RawShippingRecord), TrackError> {
        let tracking_number = self
            .store
            .get(key)
            .await?
            .ok_or_else(|| TrackError::UnknownPackage(key.to_string()))?;
        let raw = self.source.fetch_status(&tracking_number).await?;
        Ok((tracking_number, raw))
    }

    pub async fn summary(&self, package_name: &str) -> Result<PackageSummary, TrackError> {
        let key = format_package_name(package_name.trim());
        let (tracking_number, raw) = self.fetch_stored(&key).await?;
        Ok(parse_shipping_data(&key, &tracking_number, &raw))
    }

    /// Every activity of the package as a log line, oldest position first
    pub async fn show_logs(&self, package_name: &str) -> Result<Vec<String>, TrackError> {
        self.logs_stored(&format_package_name(package_name.trim()))
            .await
    }

    async fn logs_stored(&self, key: &str) -> Result<Vec<String>, TrackError> {
        let (tracking_number, raw) = self.fetch_stored(key).await?;
        let lines = activity_log(&tracking_number, &raw);
        for line in &lines {
            tracing::info!(package_name = key, "{}", line);
        }
        Ok(lines)
    }

    /// Resolve the latest location and open its map
    pub async fn show_location(&self, package_name: &str) -> Result<LocationSummary, TrackError> {
        self.location_stored(&format_package_name(package_name.trim()))
            .await
    }

    async fn location_stored(&self, key: &str) -> Result<LocationSummary, TrackError> {
        let (_, raw) = self.fetch_stored(key).await?;
        let location = build_location_summary(&raw);
        self.navigator.open(&location.maps_url)?;
        Ok(location)
    }

    /// Run whatever action the button with `button_id` stands for.
    ///
    /// Buttons carry the stored name, which is used as is.
    pub async fn dispatch(&self, button_id: &str) -> Result<ActionOutcome, TrackError> {
        let (package_name, action) = self
            .view
            .button(button_id)
            .await
            .ok_or_else(|| TrackError::UnknownPackage(button_id.to_string()))?;

        match action {
            ButtonAction::ShowLogs => self.logs_stored(&package_name).await.map(ActionOutcome::Logs),
            ButtonAction::ShowLocation => self
                .location_stored(&package_name)
                .await
                .map(ActionOutcome::Location),
            ButtonAction::Remove => {
                self.remove_stored(&package_name).await?;
                Ok(ActionOutcome::Removed(package_name))
            }
        }
    }
}

/// One line per activity: date, time, state, description and location
pub fn activity_log(tracking_number: &str, raw: &RawShippingRecord) -> Vec<String> {
    let mut lines = vec![format!(
        "{} picked up {}",
        tracking_number,
        extract_pickup_date(raw).full_date
    )];

    let Some(activities) = raw.activity_collection() else {
        lines.push("no activity reported".to_string());
        return lines;
    };

    for activity in activities.iter() {
        let location = activity
            .activity_location
            .as_ref()
            .map(|l| trim_location_label(&location_label(l)))
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "{} {} {} {} @ {}",
            activity.date.as_deref().unwrap_or("--------"),
            activity.time.as_deref().unwrap_or("------"),
            activity.tracking_state(),
            activity.description().unwrap_or("N/A"),
            location
        ));
    }
    lines
}
