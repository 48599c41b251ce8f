//! Flight search coordination.
//!
//! Tries the bound flight provider first and degrades to the deterministic
//! mock generator on missing credentials, timeout, or provider error. Provider
//! failures never reach the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use flightchat_core::{FlightOffer, FlightQuery, ProviderKind, ProviderStatus, ValidationError};
use flightchat_providers::{bounded, FlightProvider, MockFlightProvider, ProviderSet};

use crate::types::SearchOutcome;

/// Order offers by price, then fewer stops, then earliest departure.
pub fn rank_offers(offers: &mut [FlightOffer]) {
    offers.sort_by(|a, b| {
        a.price
            .minor_units
            .cmp(&b.price.minor_units)
            .then(a.stops.cmp(&b.stops))
            .then(a.departure.cmp(&b.departure))
    });
}

/// Runs one flight search per completed query.
pub struct FlightSearchCoordinator {
    provider: Arc<dyn FlightProvider>,
    fallback: Arc<MockFlightProvider>,
    timeout: Duration,
}

impl FlightSearchCoordinator {
    pub fn new(
        provider: Arc<dyn FlightProvider>,
        fallback: Arc<MockFlightProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            fallback,
            timeout,
        }
    }

    pub fn from_providers(providers: &ProviderSet) -> Self {
        Self::new(
            providers.flight.clone(),
            providers.flight_fallback.clone(),
            providers.timeouts.flight,
        )
    }

    /// Search offers for `query`, ranked.
    ///
    /// Fails only when the query itself is invalid relative to `today`.
    pub async fn search(
        &self,
        query: &FlightQuery,
        today: NaiveDate,
    ) -> Result<SearchOutcome, ValidationError> {
        query.validate(today)?;

        let (mut offers, status) = if self.provider.is_live() {
            match bounded(ProviderKind::Flight, self.timeout, self.provider.search(query)).await {
                Ok(offers) => (offers, ProviderStatus::Available),
                Err(failure) => {
                    tracing::warn!(
                        provider = self.provider.name(),
                        kind = %failure.kind,
                        error = %failure,
                        "Flight search failed, using mock offers"
                    );
                    (self.fallback.generate(query), ProviderStatus::Degraded)
                }
            }
        } else {
            (self.fallback.generate(query), ProviderStatus::Unavailable)
        };

        rank_offers(&mut offers);
        tracing::info!(
            origin = %query.origin.code,
            destination = %query.destination.code,
            date = %query.departure_date,
            offers = offers.len(),
            status = ?status,
            "Flight search complete"
        );
        Ok(SearchOutcome { offers, status })
    }
}
