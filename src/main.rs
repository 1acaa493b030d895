use std::path::PathBuf;

use anyhow::{bail, Context as _};
use chrono::NaiveDateTime;
use clap::Parser as _;
use tracing::{debug, info};
use trip_companion::{
    checklist::{Category, ChecklistStore},
    generation::ForecastBoard,
    guide::GuideClient,
    itinerary::{DayPlan, Itinerary},
    logging,
    maps::{self, NavigationLinks},
    reminder::ReminderStore,
    resolver::{Clock, Phase, Resolver, TripDay, RECOMPUTE_INTERVAL},
    settings::Settings,
    storage::FileStorage,
    weather::{self, WeatherClient},
};

#[derive(Debug, Clone, clap::Parser)]
#[command(name = "trip-companion", about = "Pocket companion for the 2026 Japan winter trip")]
struct Cli {
    /// Settings file (TOML)
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    /// Pretend it is this moment, e.g. 2026-01-27T09:00:00
    #[clap(long, global = true)]
    today: Option<NaiveDateTime>,
    /// Where the checklist and reminders are kept
    #[clap(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, clap::Subcommand)]
enum Command {
    /// Countdown and today's plan
    Status,
    /// One day of the itinerary (defaults to the active day)
    Itinerary {
        #[arg(long)]
        day: Option<usize>,
    },
    /// Pre-departure checks, shopping list and memos
    Checklist {
        #[command(subcommand)]
        action: Option<ChecklistAction>,
    },
    /// Notes attached to itinerary events
    Reminder {
        #[command(subcommand)]
        action: Option<ReminderAction>,
    },
    Weather {
        #[command(subcommand)]
        action: WeatherAction,
    },
    /// Ask the travel guide
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Event locations with map links
    Map {
        #[arg(long)]
        day: Option<usize>,
        #[command(subcommand)]
        action: Option<MapAction>,
    },
    /// Backup plans for days that have them
    Backups,
    /// Flights, hotels and emergency contacts
    Info,
    /// Keep showing the status, refreshed every hour
    Watch,
}

#[derive(Debug, Clone, clap::Subcommand)]
enum ChecklistAction {
    List,
    Add {
        category: Category,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    Toggle {
        id: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Clone, clap::Subcommand)]
enum ReminderAction {
    Show,
    /// Set the note for an event; an empty note clears it
    Set {
        event_id: String,
        text: Vec<String>,
    },
}

#[derive(Debug, Clone, clap::Subcommand)]
enum WeatherAction {
    /// Current conditions in every city on the route
    Live,
    /// AI forecast for one day (defaults to the active day)
    Forecast {
        #[arg(long)]
        day: Option<usize>,
    },
}

#[derive(Debug, Clone, clap::Subcommand)]
enum MapAction {
    /// Links for any place name
    Link {
        #[arg(required = true, num_args = 1..)]
        place: Vec<String>,
    },
}

struct App {
    settings: Settings,
    itinerary: Itinerary,
    clock: Clock,
    resolver: Resolver,
    data_dir: PathBuf,
}

impl App {
    fn storage(&self) -> FileStorage {
        FileStorage::new(&self.data_dir)
    }

    fn trip_day(&self) -> TripDay {
        self.resolver.resolve(&self.clock)
    }

    /// Turns a 1-based day number from the command line into an index.
    fn day_index(&self, day: Option<usize>) -> anyhow::Result<usize> {
        match day {
            None => Ok(self.trip_day().active_day_index),
            Some(n) if (1..=self.itinerary.len()).contains(&n) => Ok(n - 1),
            Some(n) => bail!("day {n} is not in the trip (1-{})", self.itinerary.len()),
        }
    }

    fn day(&self, index: usize) -> anyhow::Result<&DayPlan> {
        self.itinerary
            .day(index)
            .with_context(|| format!("no day at index {index}"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;
    logging::init(&settings.log)?;

    let itinerary = Itinerary::load(settings.trip.itinerary.as_deref())?;
    let clock = cli.today.map_or(Clock::System, Clock::Fixed);
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| settings.storage.data_dir.clone());
    debug!(start = %itinerary.start_date(), ?clock, data_dir = %data_dir.display(), "starting");

    let app = App {
        resolver: Resolver::for_itinerary(&itinerary),
        settings,
        itinerary,
        clock,
        data_dir,
    };

    match cli.command.unwrap_or(Command::Status) {
        Command::Status => print_status(&app),
        Command::Itinerary { day } => print_day(&app, app.day_index(day)?),
        Command::Checklist { action } => {
            run_checklist(&app, action.unwrap_or(ChecklistAction::List))
        }
        Command::Reminder { action } => {
            run_reminder(&app, action.unwrap_or(ReminderAction::Show))
        }
        Command::Weather { action } => run_weather(&app, action).await,
        Command::Ask { query } => run_ask(&app, &query.join(" ")).await,
        Command::Map { day, action } => run_map(&app, day, action),
        Command::Backups => {
            print_backups(&app);
            Ok(())
        }
        Command::Info => {
            print_info(&app);
            Ok(())
        }
        Command::Watch => run_watch(&app).await,
    }
}

fn print_status(app: &App) -> anyhow::Result<()> {
    let trip_day = app.trip_day();
    let plan = app.day(trip_day.active_day_index)?;

    match trip_day.phase {
        Phase::Upcoming => println!(
            "✈ {} days until departure ({})",
            trip_day.days_until_start,
            app.resolver.start()
        ),
        Phase::Underway => println!(
            "🗾 Day {} of {}",
            trip_day.active_day_index + 1,
            app.itinerary.len()
        ),
        Phase::Finished => println!("🏠 The trip is over. Showing the last day."),
    }

    println!("{} ({}) {}", plan.date, plan.day_of_week, plan.title);
    if let Some(weather) = &plan.weather {
        println!("  {} {} {}", weather.icon.glyph(), weather.temp, weather.condition);
    }
    for event in plan.events.iter().take(3) {
        println!("  {} {}", event.time, event.activity);
    }
    if plan.events.len() > 3 {
        println!("  … {} more", plan.events.len() - 3);
    }

    let checklist = ChecklistStore::load(app.storage());
    let pending = checklist
        .by_category(Category::Check)
        .filter(|item| !item.completed)
        .count();
    if pending > 0 {
        println!("☐ {pending} pre-departure checks open");
    }

    Ok(())
}

fn print_day(app: &App, index: usize) -> anyhow::Result<()> {
    let plan = app.day(index)?;
    let reminders = ReminderStore::load(app.storage());

    println!(
        "Day {} · {} ({}) {}",
        index + 1,
        plan.date,
        plan.day_of_week,
        plan.title
    );
    if let Some(weather) = &plan.weather {
        println!("{} {} {}", weather.icon.glyph(), weather.temp, weather.condition);
    }
    println!("👕 {}", weather::clothing_suggestion(&plan.title));
    println!();

    for event in &plan.events {
        println!("{} [{}] {}", event.time, event.kind, event.activity);
        println!("      📍 {}", event.location);
        if let Some(address) = &event.location_address {
            println!("         {address}");
        }
        if let Some(mode) = &event.transport_mode {
            println!("      🚆 {mode}");
        }
        if let Some(description) = &event.description {
            println!("      {description}");
        }
        for highlight in &event.highlights {
            println!("      ★ {}: {}", highlight.kind, highlight.text);
        }
        if let Some(code) = &event.booking_code {
            println!("      🎫 {code}");
        }
        if let Some(note) = reminders.get(&event.id) {
            println!("      📝 {note}");
        }
        println!("      ({})", event.id);
    }

    Ok(())
}

fn run_checklist(app: &App, action: ChecklistAction) -> anyhow::Result<()> {
    let mut store = ChecklistStore::load(app.storage());

    match action {
        ChecklistAction::List => {
            for category in Category::ALL {
                println!("## {category}");
                for item in store.by_category(category) {
                    let mark = if item.completed { "x" } else { " " };
                    println!("[{mark}] {} ({})", item.text, item.id);
                }
            }
        }
        ChecklistAction::Add { category, text } => match store.add(category, &text.join(" ")) {
            Some(id) => println!("added {id}"),
            None => println!("nothing to add"),
        },
        ChecklistAction::Toggle { id } => {
            if !store.toggle(&id) {
                println!("no item {id}");
            }
        }
        ChecklistAction::Delete { id } => {
            if !store.delete(&id) {
                println!("no item {id}");
            }
        }
    }

    if store.is_dirty() {
        eprintln!("🛑 the checklist could not be saved to {}", app.data_dir.display());
    }
    Ok(())
}

fn run_reminder(app: &App, action: ReminderAction) -> anyhow::Result<()> {
    let mut store = ReminderStore::load(app.storage());

    match action {
        ReminderAction::Show => {
            for (event_id, note) in store.iter() {
                let activity = app
                    .itinerary
                    .event(event_id)
                    .map_or("(unknown event)", |event| event.activity.as_str());
                println!("{event_id} {activity}: {note}");
            }
        }
        ReminderAction::Set { event_id, text } => {
            if app.itinerary.event(&event_id).is_none() {
                bail!("no event {event_id} in the itinerary");
            }
            store.set(&event_id, text.join(" ").trim());
        }
    }

    if store.is_dirty() {
        eprintln!("🛑 reminders could not be saved to {}", app.data_dir.display());
    }
    Ok(())
}

async fn run_weather(app: &App, action: WeatherAction) -> anyhow::Result<()> {
    match action {
        WeatherAction::Live => {
            let client = WeatherClient::new(&app.settings.weather)?;
            let live = client.current_all(&app.itinerary.cities).await;
            if live.is_empty() {
                println!("Live weather is unavailable right now.");
            }
            for city in live {
                println!(
                    "{} {:<10} {:>5.1}°C  humidity {:.0}%",
                    city.icon().glyph(),
                    city.city,
                    city.temperature,
                    city.humidity
                );
            }
        }
        WeatherAction::Forecast { day } => {
            let index = app.day_index(day)?;
            let plan = app.day(index)?;
            let guide = GuideClient::new(&app.settings.guide)?;
            let mut board = ForecastBoard::new();

            if let Some(ticket) = board.select(index) {
                let location = weather::search_location(&plan.title);
                info!(day = index + 1, location, "requesting forecast");

                tokio::select! {
                    forecast = guide.forecast(plan.date, location) => {
                        board.apply(index, ticket, forecast);
                    }
                    _ = tokio::signal::ctrl_c() => board.cancel(),
                }
            }

            if let Some(forecast) = board.get(index) {
                println!("{} ({}) {}", plan.date, plan.day_of_week, plan.title);
                println!(
                    "{} {} {}",
                    forecast.icon.glyph(),
                    forecast.temp,
                    forecast.condition
                );
                println!("👕 {}", forecast.suggestion);
            }
        }
    }

    Ok(())
}

async fn run_ask(app: &App, query: &str) -> anyhow::Result<()> {
    let guide = GuideClient::new(&app.settings.guide)?;
    let answer = guide.ask(query).await;

    println!("{}", answer.text);
    if !answer.links.is_empty() {
        println!();
        for link in answer.links {
            println!("🔗 {} <{}>", link.title, link.uri);
        }
    }

    Ok(())
}

fn run_map(app: &App, day: Option<usize>, action: Option<MapAction>) -> anyhow::Result<()> {
    if let Some(MapAction::Link { place }) = action {
        let links = NavigationLinks::for_place(&place.join(" "));
        println!("app: {}", links.deep_link);
        println!(
            "web: {} (after {} ms)",
            links.web_fallback,
            links.fallback_after.as_millis()
        );
        return Ok(());
    }

    let day = day.map(|day| app.day_index(Some(day))).transpose()?;
    let entries = maps::locations(&app.itinerary, day);
    println!("{} places", entries.len());
    for entry in entries {
        let links = NavigationLinks::for_place(entry.location);
        println!(
            "{} ({}) [{}] {} · {}",
            entry.date, entry.day_of_week, entry.kind, entry.activity, entry.location
        );
        println!("      {}", links.web_fallback);
    }

    Ok(())
}

fn print_backups(app: &App) {
    for plan in app.itinerary.days_with_backups() {
        println!("{} ({})", plan.date.format("%m/%d"), plan.day_of_week);
        for backup in &plan.backup_plans {
            println!("  • {backup}");
        }
    }
}

fn print_info(app: &App) {
    println!("## Flights");
    let flights = &app.itinerary.flights;
    for flight in [&flights.departure, &flights.homebound].into_iter().flatten() {
        println!(
            "{} {} {} → {} (gate {})",
            flight.flight, flight.time, flight.from, flight.to, flight.gate
        );
    }

    println!("## Hotels");
    for hotel in &app.itinerary.hotels {
        println!("{} [{}]", hotel.name, hotel.dates);
        println!("  {} · {}", hotel.address, hotel.phone);
    }

    println!("## Emergency");
    for contact in &app.itinerary.contacts {
        println!("{:<12} {} ({})", contact.number, contact.name, contact.note);
    }
}

async fn run_watch(app: &App) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(RECOMPUTE_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                print_status(app)?;
                println!();
            }
            _ = tokio::signal::ctrl_c() => {
                info!("stopping");
                return Ok(());
            }
        }
    }
}
