//! # Tours
//!
//! The tour-search-and-normalize pipeline: a provider client fetches raw
//! flight offers, [`mapping`] turns each one into a [`Tour`], and
//! [`TourFilter`] keeps only offers matching the configured trip length and
//! direct-flight preference.

pub mod client;
pub mod mapping;

use async_trait::async_trait;

use crate::errors::AppResult;

pub use client::TourSearchClient;
pub use mapping::{map_flight, ItemError, MappingContext};

/// A normalized flight offer shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tour {
    /// Route description, e.g. `MOW → UTP (SU)`
    pub title: String,
    /// Nights spent at the destination
    pub nights: u32,
    pub price: u64,
    pub currency: String,
    /// Departure date in `YYYY-MM-DD` form
    pub departure_date: String,
    pub flight_is_direct: bool,
    /// Booking link, when the provider supplies one
    pub url: Option<String>,
}

/// Inclusive night bounds plus the direct-only preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TourFilter {
    pub min_nights: u32,
    pub max_nights: u32,
    pub direct_only: bool,
}

impl TourFilter {
    /// Whether a tour satisfies the night bounds and direct-only preference
    pub fn accepts(&self, tour: &Tour) -> bool {
        if tour.nights < self.min_nights || tour.nights > self.max_nights {
            return false;
        }
        !self.direct_only || tour.flight_is_direct
    }
}

/// Source of tours for the chat front end
#[async_trait]
pub trait TourSearch: Send + Sync {
    /// Search the configured window and return matching tours, cheapest first
    async fn search_tours(&self) -> AppResult<Vec<Tour>>;
}
