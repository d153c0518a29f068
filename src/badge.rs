use anyhow::Result;

use crate::cache::{CacheStore, Storage};
use crate::config::BadgeConfig;
use crate::measure::{Measurement, MeasurementFetcher};
use crate::url::{self, ResolvedUrl};

pub const WEBSITE_CARBON_BASE: &str = "https://websitecarbon.com";

/// The three mutually exclusive presentation states. Being an enum is what
/// enforces the exclusivity the renderer depends on.
#[derive(Debug, Clone, PartialEq)]
pub enum BadgeState {
    Loading,
    Result {
        co2_per_view: f64,
        cleaner_than_percent: f64,
    },
    NoResult,
}

/// What an activation decided: either the cache already produced a render,
/// or the caller must run the fetcher for the returned URL and feed the
/// outcome to [`CarbonBadge::apply_fetch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    Rendered,
    FetchNeeded(ResolvedUrl),
}

/// Bindable fields a host rendering layer consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFields {
    pub measure_text: String,
    pub below_text: String,
    pub dark_mode: bool,
    pub show_link: bool,
    pub link_href: Option<String>,
}

/// Per-instance widget context: configuration, current state, and the URL
/// the state belongs to. Badges on the same page each own one of these; the
/// only thing they share is the cache store, which is passed into every
/// operation rather than held globally.
pub struct CarbonBadge {
    config: BadgeConfig,
    state: BadgeState,
    active_url: Option<ResolvedUrl>,
}

impl CarbonBadge {
    pub fn new(config: BadgeConfig) -> Self {
        Self {
            config,
            state: BadgeState::Loading,
            active_url: None,
        }
    }

    pub fn state(&self) -> &BadgeState {
        &self.state
    }

    pub fn active_url(&self) -> Option<&ResolvedUrl> {
        self.active_url.as_ref()
    }

    /// (Re)start the pipeline: resolve the target URL, enter `Loading`, and
    /// consult the cache. A fresh hit renders immediately with no network
    /// call; a miss hands the URL back for fetching.
    pub fn activate<S: Storage>(
        &mut self,
        cache: &mut CacheStore<S>,
        current_location: &str,
    ) -> Activation {
        let url = url::resolve(&self.config, current_location);
        self.state = BadgeState::Loading;
        self.active_url = Some(url.clone());

        match cache.get(&url) {
            Some(entry) => {
                self.state = BadgeState::Result {
                    co2_per_view: entry.co2_per_view,
                    cleaner_than_percent: entry.cleaner_than_percent,
                };
                Activation::Rendered
            }
            None => Activation::FetchNeeded(url),
        }
    }

    /// Apply a fetch outcome for the URL it was issued against. An outcome
    /// whose URL no longer matches the active one was superseded by a later
    /// activation and is dropped — a late response must never overwrite
    /// state belonging to a newer URL.
    pub fn apply_fetch<S: Storage>(
        &mut self,
        cache: &mut CacheStore<S>,
        url: &ResolvedUrl,
        outcome: Result<Measurement>,
    ) {
        if self.active_url.as_ref() != Some(url) {
            return;
        }

        match outcome {
            Ok(measurement) => {
                // A failed write just means the next activation refetches.
                let _ = cache.put(url, &measurement);
                self.state = BadgeState::Result {
                    co2_per_view: measurement.co2_per_view,
                    cleaner_than_percent: measurement.cleaner_than_percent,
                };
            }
            Err(_) => {
                cache.remove(url);
                self.state = BadgeState::NoResult;
            }
        }
    }

    /// Drive one full activation: resolve, check the cache, fetch if needed,
    /// apply. The fetch await is the only suspension point.
    pub async fn run<S, F>(
        &mut self,
        cache: &mut CacheStore<S>,
        fetcher: &F,
        current_location: &str,
    ) where
        S: Storage,
        F: MeasurementFetcher + ?Sized,
    {
        if let Activation::FetchNeeded(url) = self.activate(cache, current_location) {
            let outcome = fetcher.measure(&url).await;
            self.apply_fetch(cache, &url, outcome);
        }
    }

    /// Display-only toggle; never re-triggers activation.
    pub fn set_dark_mode(&mut self, on: bool) {
        self.config.use_dark_mode = on;
    }

    /// Display-only toggle; never re-triggers activation.
    pub fn set_show_link(&mut self, on: bool) {
        self.config.show_link_to_web_carbon = on;
    }

    /// Commit an edited custom URL (percent-encoded, empty to clear) and
    /// re-activate. Updating the active URL here is what invalidates any
    /// in-flight fetch for the previous URL.
    pub fn set_custom_url<S: Storage>(
        &mut self,
        cache: &mut CacheStore<S>,
        custom_url: &str,
        current_location: &str,
    ) -> Activation {
        self.config.use_custom_url = !custom_url.is_empty();
        self.config.custom_url_to_check = custom_url.to_string();
        self.activate(cache, current_location)
    }

    /// Derive the bindable fields for the current state.
    pub fn display(&self) -> DisplayFields {
        let (measure_text, below_text) = match &self.state {
            BadgeState::Loading => ("Measuring CO₂…".to_string(), String::new()),
            BadgeState::Result {
                co2_per_view,
                cleaner_than_percent,
            } => (
                format!("{}g of CO₂/view", co2_per_view),
                format!("Cleaner than {}% of pages tested", cleaner_than_percent),
            ),
            BadgeState::NoResult => ("No Result".to_string(), String::new()),
        };

        let link_href = if self.config.show_link_to_web_carbon {
            self.active_url
                .as_ref()
                .map(|url| format!("{}/website/{}", WEBSITE_CARBON_BASE, url.as_str()))
        } else {
            None
        };

        DisplayFields {
            measure_text,
            below_text,
            dark_mode: self.config.use_dark_mode,
            show_link: self.config.show_link_to_web_carbon,
            link_href,
        }
    }
}
