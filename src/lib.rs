pub mod client;
pub mod config;
pub mod error;
pub mod normalize;
pub mod store;
pub mod tracker;
pub mod types;
pub mod view;

pub use client::{StatusSource, UpsClient, decode_track_body};
pub use config::{ClientConfig, Config};
pub use error::{ConfigError, TrackError, ViewError};
pub use normalize::{
    build_location_summary, extract_pickup_date, parse_shipping_data, resolve_latest_activity,
    trim_location_label,
};
pub use store::{LocalPackageStore, MemoryPackageStore, PackageStore, StoredPackage};
pub use tracker::{ActionOutcome, Navigator, RestoreReport, StdoutNavigator, Tracker};
pub use types::{LocationSummary, PackageSummary, PickupDate, RawShippingRecord, TrackingState};
pub use view::{PackageCard, PopupView, remove_element};
