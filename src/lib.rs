pub mod checklist;
pub mod generation;
pub mod guide;
pub mod itinerary;
pub mod logging;
pub mod maps;
pub mod reminder;
pub mod resolver;
pub mod settings;
pub mod storage;
pub mod weather;
