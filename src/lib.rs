pub mod badge;
pub mod cache;
pub mod config;
pub mod measure;
pub mod ui;
pub mod url;

pub use badge::{Activation, BadgeState, CarbonBadge, DisplayFields};
pub use cache::{CacheEntry, CacheStore, FileStorage, MemoryStorage, Storage};
pub use config::{AppConfig, BadgeConfig};
pub use measure::carbon::CarbonApiClient;
pub use measure::{Measurement, MeasurementFetcher};
pub use url::{resolve, ResolvedUrl};
