use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::itinerary::Itinerary;

/// How often a long-running view recomputes the active day.
pub const RECOMPUTE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Upcoming,
    Underway,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripDay {
    pub days_until_start: u64,
    pub active_day_index: usize,
    pub phase: Phase,
}

/// Source of "now". A fixed clock stands in for the wall clock when the
/// user asks to see the trip as of some other moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    System,
    Fixed(NaiveDateTime),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Self::System => Local::now().date_naive(),
            Self::Fixed(at) => at.date(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolver {
    start: NaiveDate,
    day_count: usize,
}

impl Resolver {
    pub fn new(start: NaiveDate, day_count: usize) -> Self {
        Self { start, day_count }
    }

    /// Day 0 is the itinerary's first day.
    pub fn for_itinerary(itinerary: &Itinerary) -> Self {
        Self::new(itinerary.start_date(), itinerary.len())
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn resolve(&self, clock: &Clock) -> TripDay {
        self.resolve_on(clock.today())
    }

    /// Both values are computed on calendar days, so the time of day never
    /// shifts the result.
    pub fn resolve_on(&self, today: NaiveDate) -> TripDay {
        let offset = (today - self.start).num_days();
        let days_until_start = u64::try_from(-offset).unwrap_or(0);

        let (active_day_index, phase) = match usize::try_from(offset) {
            Err(_) => (0, Phase::Upcoming),
            Ok(offset) if offset >= self.day_count => {
                (self.day_count.saturating_sub(1), Phase::Finished)
            }
            Ok(offset) => (offset, Phase::Underway),
        };

        TripDay {
            days_until_start,
            active_day_index,
            phase,
        }
    }
}
