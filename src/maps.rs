use std::time::Duration;

use chrono::NaiveDate;

use crate::itinerary::{EventKind, Itinerary};

/// How long to wait for the map app before opening the web search instead.
pub const FALLBACK_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationLinks {
    pub deep_link: String,
    pub web_fallback: String,
    pub fallback_after: Duration,
}

impl NavigationLinks {
    pub fn for_place(place: &str) -> Self {
        let query = urlencoding::encode(place.trim());
        Self {
            deep_link: format!("comgooglemaps://?q={query}"),
            web_fallback: format!("https://www.google.com/maps/search/?api=1&query={query}"),
            fallback_after: FALLBACK_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationEntry<'a> {
    pub day_index: usize,
    pub date: NaiveDate,
    pub day_of_week: &'a str,
    pub activity: &'a str,
    pub location: &'a str,
    pub kind: EventKind,
}

/// Every event location in itinerary order, optionally limited to one day.
pub fn locations(itinerary: &Itinerary, day: Option<usize>) -> Vec<LocationEntry<'_>> {
    itinerary
        .days()
        .iter()
        .enumerate()
        .filter(|(index, _)| day.map_or(true, |day| day == *index))
        .flat_map(|(day_index, plan)| {
            plan.events.iter().map(move |event| LocationEntry {
                day_index,
                date: plan.date,
                day_of_week: &plan.day_of_week,
                activity: &event.activity,
                location: &event.location,
                kind: event.kind,
            })
        })
        .collect()
}
