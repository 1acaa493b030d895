use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tracing::debug;

use crate::guide::Forecast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Hands out a ticket per request. Starting another request or cancelling
/// makes every earlier ticket stale, so a late response can be dropped
/// instead of overwriting newer state.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    current: Arc<AtomicU64>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Ticket {
        Ticket(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn cancel(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current.load(Ordering::SeqCst) == ticket.0
    }
}

/// AI forecasts per itinerary day, fetched at most once per day.
#[derive(Debug, Default)]
pub struct ForecastBoard {
    generation: Generation,
    forecasts: HashMap<usize, Forecast>,
}

impl ForecastBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selecting a day supersedes any request still in flight. Returns a
    /// ticket when the day has no forecast yet.
    pub fn select(&self, day: usize) -> Option<Ticket> {
        let ticket = self.generation.begin();
        (!self.forecasts.contains_key(&day)).then_some(ticket)
    }

    pub fn cancel(&self) {
        self.generation.cancel();
    }

    /// Stores the forecast unless a newer selection made `ticket` stale.
    pub fn apply(&mut self, day: usize, ticket: Ticket, forecast: Forecast) -> bool {
        if !self.generation.is_current(ticket) {
            debug!(day, "dropping stale forecast");
            return false;
        }

        self.forecasts.insert(day, forecast);
        true
    }

    pub fn get(&self, day: usize) -> Option<&Forecast> {
        self.forecasts.get(&day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::WeatherIcon;

    fn forecast(temp: &str) -> Forecast {
        Forecast {
            temp: temp.to_string(),
            condition: "Snow".to_string(),
            suggestion: "Boots".to_string(),
            icon: WeatherIcon::Snow,
        }
    }

    #[test]
    fn newer_ticket_invalidates_older() {
        let generation = Generation::new();
        let first = generation.begin();
        assert!(generation.is_current(first));

        let second = generation.begin();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));

        generation.cancel();
        assert!(!generation.is_current(second));
    }

    #[test]
    fn clones_share_the_counter() {
        let generation = Generation::new();
        let handle = generation.clone();
        let ticket = generation.begin();
        handle.cancel();
        assert!(!generation.is_current(ticket));
    }

    #[test]
    fn stale_forecast_is_dropped() {
        let mut board = ForecastBoard::new();
        let day_two = board.select(2).unwrap();
        let day_three = board.select(3).unwrap();

        assert!(!board.apply(2, day_two, forecast("-1°/4°")));
        assert!(board.get(2).is_none());

        assert!(board.apply(3, day_three, forecast("-5°/2°")));
        assert_eq!(board.get(3).unwrap().temp, "-5°/2°");
    }

    #[test]
    fn cached_day_is_not_fetched_again() {
        let mut board = ForecastBoard::new();
        let ticket = board.select(4).unwrap();
        board.apply(4, ticket, forecast("-6°/0°"));
        assert!(board.select(4).is_none());
    }

    #[test]
    fn cancel_drops_in_flight_result() {
        let mut board = ForecastBoard::new();
        let ticket = board.select(0).unwrap();
        board.cancel();
        assert!(!board.apply(0, ticket, forecast("2°/8°")));
    }
}
