use std::{
    collections::HashSet,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::weather::WeatherIcon;

const BUILTIN: &str = include_str!("../data/itinerary.toml");

pub type Result<T> = std::result::Result<T, ItineraryError>;

#[derive(Debug, thiserror::Error)]
pub enum ItineraryError {
    #[error("failed to read itinerary from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid itinerary: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("itinerary has no days")]
    Empty,
    #[error("day {date} does not come after {previous}")]
    OutOfOrder { previous: NaiveDate, date: NaiveDate },
    #[error("event id `{0}` is used more than once")]
    DuplicateEventId(String),
}

/// A validated day-plan table: at least one day, dates strictly increasing,
/// event ids unique. Only built through [`Itinerary::from_toml_str`].
#[derive(Debug, Clone, PartialEq)]
pub struct Itinerary {
    days: Vec<DayPlan>,
    pub cities: Vec<City>,
    pub flights: Flights,
    pub hotels: Vec<Hotel>,
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Deserialize)]
struct RawItinerary {
    days: Vec<DayPlan>,
    #[serde(default)]
    cities: Vec<City>,
    #[serde(default)]
    flights: Flights,
    #[serde(default)]
    hotels: Vec<Hotel>,
    #[serde(default)]
    contacts: Vec<Contact>,
}

impl TryFrom<RawItinerary> for Itinerary {
    type Error = ItineraryError;

    fn try_from(raw: RawItinerary) -> Result<Self> {
        validate(&raw.days)?;
        Ok(Self {
            days: raw.days,
            cities: raw.cities,
            flights: raw.flights,
            hotels: raw.hotels,
            contacts: raw.contacts,
        })
    }
}

fn validate(days: &[DayPlan]) -> Result<()> {
    if days.is_empty() {
        return Err(ItineraryError::Empty);
    }

    if let Some(pair) = days.windows(2).find(|pair| pair[0].date >= pair[1].date) {
        return Err(ItineraryError::OutOfOrder {
            previous: pair[0].date,
            date: pair[1].date,
        });
    }

    let mut seen = HashSet::new();
    for event in days.iter().flat_map(|day| day.events.iter()) {
        if !seen.insert(event.id.as_str()) {
            return Err(ItineraryError::DuplicateEventId(event.id.clone()));
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    pub day_of_week: String,
    pub title: String,
    pub events: Vec<TripEvent>,
    pub weather: Option<DayWeather>,
    #[serde(default)]
    pub backup_plans: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TripEvent {
    pub id: String,
    pub time: String,
    pub activity: String,
    pub location: String,
    pub location_address: Option<String>,
    pub kind: EventKind,
    pub description: Option<String>,
    pub transport_mode: Option<String>,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
    pub booking_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Transport,
    Meal,
    Sightseeing,
    Hotel,
    Shopping,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transport => "transport",
            Self::Meal => "meal",
            Self::Sightseeing => "sightseeing",
            Self::Hotel => "hotel",
            Self::Shopping => "shopping",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Highlight {
    pub kind: HighlightKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    Food,
    Menu,
    Souvenir,
    Tips,
}

impl fmt::Display for HighlightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Food => "food",
            Self::Menu => "menu",
            Self::Souvenir => "souvenir",
            Self::Tips => "tips",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DayWeather {
    pub temp: String,
    pub condition: String,
    pub icon: WeatherIcon,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct City {
    pub key: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Flights {
    pub departure: Option<Flight>,
    #[serde(rename = "return")]
    pub homebound: Option<Flight>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Flight {
    pub flight: String,
    pub time: String,
    pub from: String,
    pub to: String,
    pub gate: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Hotel {
    pub name: String,
    pub address: String,
    pub dates: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Contact {
    pub name: String,
    pub number: String,
    pub note: String,
}

impl Itinerary {
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN)
    }

    /// Reads the itinerary at `path`, or the built-in one when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Self::builtin();
        };

        let source = fs::read_to_string(path).map_err(|source| ItineraryError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&source)
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let raw: RawItinerary = toml::from_str(source)?;
        Self::try_from(raw)
    }

    pub fn days(&self) -> &[DayPlan] {
        &self.days
    }

    pub fn day(&self, index: usize) -> Option<&DayPlan> {
        self.days.get(index)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn start_date(&self) -> NaiveDate {
        self.days[0].date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.days[self.days.len() - 1].date
    }

    pub fn events(&self) -> impl Iterator<Item = &TripEvent> {
        self.days.iter().flat_map(|day| day.events.iter())
    }

    pub fn event(&self, id: &str) -> Option<&TripEvent> {
        self.events().find(|event| event.id == id)
    }

    pub fn days_with_backups(&self) -> impl Iterator<Item = &DayPlan> {
        self.days.iter().filter(|day| !day.backup_plans.is_empty())
    }
}
