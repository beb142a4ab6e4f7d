// src/commands.rs
use std::fs;
use std::path::Path;

use crate::cli::{AddBatchArgs, AddCostArgs, AddVarietyArgs, Cli, Commands, GiveArgs, LogCareArgs, LogEventArgs};
use plantlady::clock::{Clock, SystemClock};
use plantlady::feed::{CareLogFeed, FeedSource, StubFeed};
use plantlady::models::*;
use plantlady::session::{login_with_pin, FileSessionStore, Session};
use plantlady::views::{self, BatchDetail, NewBatchPlan, NewPlantPlan, PlantDetail, VarietyChoice};
use plantlady::{Action, ApiClient, AppError};

fn loading(subject: &'static str) -> impl FnOnce(AppError) -> String {
    move |e| e.user_message(Action::Load, subject)
}

fn saving(subject: &'static str) -> impl FnOnce(AppError) -> String {
    move |e| e.user_message(Action::Save, subject)
}

pub async fn run(cli: Cli, client: &ApiClient, store: &FileSessionStore) -> Result<(), String> {
    let clock = SystemClock;
    let mut session = Session::restore(store);

    match cli.command {
        Commands::Login { pin } => {
            let users = client.users().await.map_err(loading("users"))?;
            session.set_available_users(users);
            login_with_pin(client, &mut session, &pin)
                .await
                .map_err(|e| match e {
                    AppError::Api { status: 401, .. } => "Invalid PIN".to_string(),
                    other @ AppError::NoSeasons => other.to_string(),
                    other => other.user_message(Action::Load, "user"),
                })?;
            session.persist(store).map_err(saving("session"))?;
            if let (Ok(user), Ok(season)) = (session.user(), session.season()) {
                println!("Welcome, {}! Season {}.", user.name, season.year);
            }
        }
        Commands::Logout => {
            session.logout();
            session.persist(store).map_err(saving("session"))?;
            println!("Logged out.");
        }
        Commands::Whoami => match (session.user(), session.season()) {
            (Ok(user), Ok(season)) => println!("{} (id {}), season {}", user.name, user.id, season.year),
            _ => println!("Not logged in."),
        },
        Commands::Today => {
            let view = if cli.demo_feed {
                let feed = StubFeed::new(clock);
                views::today(client, &session, &clock, &feed).await
            } else {
                let feed = own_feed(client, &session)?;
                views::today(client, &session, &clock, &feed).await
            }
            .map_err(loading("today's care"))?;
            print_today(&view, &clock);
        }
        Commands::Plants => {
            let cards = views::collection(client, &session, &clock)
                .await
                .map_err(loading("plants"))?;
            if cards.is_empty() {
                println!("Your plant collection is empty. Add your first plant with `plantlady add-plant`.");
            } else {
                println!("{} plant{}", cards.len(), if cards.len() > 1 { "s" } else { "" });
                for card in &cards {
                    let urgency = card.status.map(|s| s.urgency.as_str()).unwrap_or("-");
                    println!("  #{:<4} {:<28} [{}] {}", card.plant.id, card.plant.common_name, urgency, card.label());
                }
            }
        }
        Commands::Plant { id } => {
            let detail = views::plant_detail(client, &clock, id)
                .await
                .map_err(loading("plant"))?;
            print_plant_detail(&detail);
        }
        Commands::AddPlant(args) => {
            let plan = NewPlantPlan {
                common_name: args.name,
                scientific_name: args.scientific_name,
                location: Some(args.location),
                watering_every_days: args.water_every,
                fertilizing_every_weeks: args.fertilize_weeks,
                repotting_reminder: !args.no_repot,
            };
            let (plant, schedules) = views::add_plant(client, &session, &plan)
                .await
                .map_err(saving("plant"))?;
            println!("Added {} (id {}).", plant.common_name, plant.id);
            for s in &schedules {
                println!("  {} {} every {} days", s.care_type.icon(), s.care_type, s.frequency_days);
            }
        }
        Commands::LogCare(args) => log_care(client, &session, &clock, args).await?,
        Commands::Schedule { plant_id, care, every_days } => {
            let user = session.user().map_err(saving("care schedule"))?;
            let new = CreateCareScheduleSchema { care_type: care, frequency_days: every_days };
            let schedule = client
                .set_care_schedule(plant_id, user.id, &new)
                .await
                .map_err(saving("care schedule"))?;
            println!("{} every {} days.", schedule.care_type, schedule.frequency_days);
        }
        Commands::Profile => {
            let profile = views::profile(client, &session).await.map_err(loading("profile"))?;
            println!("{}", profile.user.name);
            if let Some(season) = &profile.season {
                println!("  Season:  {}", season.year);
            }
            println!("  Plants:  {}", profile.plant_count);
            println!("  Batches: {}", profile.stats.batch_count);
            println!("  Events:  {}", profile.stats.event_count);
            println!("  Streak:  {} day{}", profile.stats.streak, if profile.stats.streak == 1 { "" } else { "s" });
        }
        Commands::Seasons => {
            let seasons = client.seasons().await.map_err(loading("seasons"))?;
            for season in seasons {
                println!("  #{:<4} {} {}", season.id, season.year, season.notes.unwrap_or_default());
            }
        }
        Commands::Batches => {
            let batches = views::garden(client, &session).await.map_err(loading("batches"))?;
            if batches.is_empty() {
                println!("No batches this season.");
            }
            for card in batches {
                let started = card
                    .batch
                    .start_date
                    .map(|d| d.format("%b %d").to_string())
                    .unwrap_or_else(|| "not started".to_string());
                println!("  #{:<4} {:<28} {}", card.batch.id, card.variety_name(), started);
            }
        }
        Commands::Batch { id } => {
            let detail = views::batch_detail(client, id).await.map_err(loading("batch"))?;
            print_batch_detail(&detail);
        }
        Commands::AddBatch(args) => add_batch(client, &session, &clock, args).await?,
        Commands::LogEvent(args) => log_event(client, &session, &clock, args).await?,
        Commands::BatchPhoto { batch_id, photo, caption } => {
            let user = session.user().map_err(saving("photo"))?;
            let upload = read_photo(&photo, caption)?;
            let saved = client
                .upload_photo(user.id, batch_id, upload)
                .await
                .map_err(saving("photo"))?;
            println!("📷 Saved {} to batch #{}.", saved.filename, saved.batch_id);
        }
        Commands::Varieties { search } => {
            let varieties = client.varieties().await.map_err(loading("varieties"))?;
            let needle = search.map(|s| s.to_lowercase());
            for v in varieties.iter().filter(|v| {
                needle
                    .as_deref()
                    .map_or(true, |n| v.common_name.to_lowercase().contains(n))
            }) {
                println!(
                    "  #{:<4} {:<28} {:<12} {}",
                    v.id,
                    v.common_name,
                    v.category,
                    v.scientific_name.as_deref().unwrap_or("")
                );
            }
        }
        Commands::AddVariety(args) => {
            let new = variety_schema(args);
            let variety = client.create_variety(&new).await.map_err(saving("variety"))?;
            println!("Added variety {} (id {}).", variety.common_name, variety.id);
        }
        Commands::Identify { photo, add, location } => {
            let upload = read_photo(&photo, None)?;
            let result = client.identify_plant(upload).await.map_err(|e| match e {
                invalid @ AppError::ValidationError(_) => invalid.user_message(Action::Load, "photo"),
                other => {
                    tracing::error!("{:?}", other);
                    "Could not identify plant. Please try again with a clearer photo.".to_string()
                }
            })?;
            println!("{} ({})", result.common_name, result.scientific_name);
            println!("  {:.0}% confident", result.confidence * 100.0);
            println!("  {}", result.description);
            for tip in &result.care_tips {
                println!("  • {}", tip);
            }
            if add {
                let plan = NewPlantPlan {
                    location: Some(location),
                    ..NewPlantPlan::from(&result)
                };
                let (plant, _) = views::add_plant(client, &session, &plan)
                    .await
                    .map_err(saving("plant"))?;
                println!("Added {} (id {}).", plant.common_name, plant.id);
            }
        }
        Commands::Costs { season } => {
            let season = match season {
                Some(id) => Some(find_season(client, id).await?),
                None => None,
            };
            let view = views::cost_tracker(client, &session, season)
                .await
                .map_err(loading("costs"))?;
            println!("Season {} total: ${:.2}", view.season.year, view.total.total_cost);
            for c in &view.total.by_category {
                println!("  {:<12} ${:.2}", c.category, c.total);
            }
            for cost in &view.costs {
                println!("  #{:<4} {:<24} ${:.2} ({})", cost.id, cost.item_name, cost.cost, cost.category);
            }
        }
        Commands::AddCost(args) => add_cost(client, &session, args).await?,
        Commands::DeleteCost { id } => {
            client.delete_cost(id).await.map_err(saving("cost"))?;
            println!("Deleted cost #{}.", id);
        }
        Commands::Distributions { batch } => {
            let list = client.distributions(batch).await.map_err(loading("distributions"))?;
            for d in list {
                let kind = match d.kind {
                    DistributionType::Gift => "gift",
                    DistributionType::Trade => "trade",
                };
                println!(
                    "  #{:<4} {} {} to {} ({} plants)",
                    d.id,
                    d.date.format("%Y-%m-%d"),
                    kind,
                    d.recipient,
                    d.quantity.unwrap_or(0)
                );
            }
        }
        Commands::Give(args) => give(client, &session, &clock, args).await?,
        Commands::DeleteDistribution { id } => {
            client.delete_distribution(id).await.map_err(saving("distribution"))?;
            println!("Deleted distribution #{}.", id);
        }
        Commands::Feed { limit } => {
            let items = if cli.demo_feed {
                StubFeed::new(clock).recent_activity(limit).await
            } else {
                own_feed(client, &session)?.recent_activity(limit).await
            }
            .map_err(loading("activity"))?;
            if items.is_empty() {
                println!("No activity yet.");
            }
            let now = clock.now();
            for item in items {
                println!("  {} {} {} · {}", item.user_name, item.action, item.plant_name, item.time_ago(now));
            }
        }
    }

    Ok(())
}

fn own_feed(client: &ApiClient, session: &Session) -> Result<CareLogFeed, String> {
    let user = session.user().map_err(loading("activity"))?;
    Ok(CareLogFeed::new(client.clone(), user.id, user.name.clone()))
}

async fn find_season(client: &ApiClient, id: i32) -> Result<Season, String> {
    client
        .seasons()
        .await
        .map_err(loading("seasons"))?
        .into_iter()
        .find(|s| s.id == id)
        .ok_or_else(|| format!("Season {} not found", id))
}

async fn log_care<C: Clock>(
    client: &ApiClient,
    session: &Session,
    clock: &C,
    args: LogCareArgs,
) -> Result<(), String> {
    // 照片先读出来，读失败就不记录
    let photo = match &args.photo {
        Some(path) => Some(read_photo(path, None)?),
        None => None,
    };

    let (event, detail) =
        views::log_care(client, session, clock, args.plant_id, args.care, args.date, args.notes)
            .await
            .map_err(saving("care event"))?;

    if let Some(upload) = photo {
        let user = session.user().map_err(saving("photo"))?;
        client
            .upload_care_photo(args.plant_id, event.id, user.id, upload)
            .await
            .map_err(saving("photo"))?;
    }

    println!("{} Logged {} for {}.", args.care.icon(), args.care, detail.plant.common_name);
    print_plant_detail(&detail);
    Ok(())
}

fn read_photo(path: &Path, caption: Option<String>) -> Result<PhotoUpload, String> {
    let bytes = fs::read(path).map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo.jpg".to_string());
    Ok(PhotoUpload { file_name, bytes, caption })
}

fn variety_schema(args: AddVarietyArgs) -> CreateVarietySchema {
    CreateVarietySchema {
        common_name: args.name.trim().to_string(),
        scientific_name: args.scientific_name,
        category: args.category,
        days_to_germinate: args.days_to_germinate,
        days_to_mature: args.days_to_mature,
    }
}

async fn add_batch<C: Clock>(
    client: &ApiClient,
    session: &Session,
    clock: &C,
    args: AddBatchArgs,
) -> Result<(), String> {
    let variety = match (args.variety, args.new_variety) {
        (Some(id), _) => VarietyChoice::Existing(id),
        (None, Some(name)) => VarietyChoice::New(CreateVarietySchema {
            common_name: name.trim().to_string(),
            scientific_name: None,
            category: args.category,
            days_to_germinate: None,
            days_to_mature: None,
        }),
        (None, None) => return Err("Pick a variety with --variety or --new-variety".to_string()),
    };
    let plan = NewBatchPlan {
        variety,
        seeds_count: args.seeds,
        location: args.location,
        source: args.source,
        notes: args.notes,
        start_date: Some(args.started.unwrap_or_else(|| clock.today())),
    };
    let batch = views::add_batch(client, session, plan)
        .await
        .map_err(saving("batch"))?;
    println!("🌱 Started batch #{} (variety {}).", batch.id, batch.variety_id);
    Ok(())
}

async fn log_event<C: Clock>(
    client: &ApiClient,
    session: &Session,
    clock: &C,
    args: LogEventArgs,
) -> Result<(), String> {
    let (event, detail) =
        views::log_batch_event(client, session, clock, args.batch_id, args.event_type, args.date, args.notes)
            .await
            .map_err(saving("event"))?;
    println!("Logged {} on {}.", event.event_type.as_str(), event.event_date.format("%Y-%m-%d"));
    print_batch_detail(&detail);
    Ok(())
}

async fn add_cost(client: &ApiClient, session: &Session, args: AddCostArgs) -> Result<(), String> {
    let user = session.user().map_err(saving("cost"))?;
    let season = session.season().map_err(saving("cost"))?;
    let new = CreateCostSchema {
        season_id: season.id,
        item_name: args.item,
        cost: args.cost,
        quantity: args.quantity,
        category: args.category,
        is_one_time: !args.recurring,
        notes: args.notes,
    };
    let cost = client.create_cost(user.id, &new).await.map_err(saving("cost"))?;
    println!("Recorded {} (${:.2}).", cost.item_name, cost.cost);
    Ok(())
}

async fn give<C: Clock>(client: &ApiClient, session: &Session, clock: &C, args: GiveArgs) -> Result<(), String> {
    let user = session.user().map_err(saving("distribution"))?;
    let new = CreateDistributionSchema {
        batch_id: args.batch_id,
        recipient: args.to,
        quantity: args.quantity,
        kind: args.kind,
        date: midnight(args.date.unwrap_or_else(|| clock.today())),
        notes: args.notes,
    };
    let d = client
        .create_distribution(user.id, &new)
        .await
        .map_err(saving("distribution"))?;
    println!("Recorded for {}.", d.recipient);
    Ok(())
}

fn print_today<C: Clock>(view: &views::TodayView, clock: &C) {
    println!("Today, {}", view.date.format("%A %b %d"));
    println!();
    println!("Care due today");
    if view.due.is_empty() {
        println!("  ✓ No care needed today. Great job!");
    }
    for item in &view.due {
        let last = item
            .last_care_date
            .map(|d| format!("last {}", d.format("%b %d")))
            .unwrap_or_else(|| "never logged".to_string());
        println!(
            "  {} {:<24} {:<12} {} ({})",
            item.care_type.icon(),
            item.plant_name,
            item.care_type,
            item.label(),
            last
        );
    }

    println!();
    println!("Upcoming");
    if view.upcoming.is_empty() {
        println!("  Nothing in the next week.");
    }
    for (date, care_types) in view.upcoming.iter() {
        let icons: Vec<&str> = care_types.iter().map(|c| c.icon()).collect();
        println!("  {}  {}", date.format("%a %d"), icons.join(" "));
    }

    println!();
    println!("Friend activity");
    if view.activity.is_empty() {
        println!("  No friend activity yet. Add some friends!");
    }
    let now = clock.now();
    for item in &view.activity {
        println!("  {} {} {} · {}", item.user_name, item.action, item.plant_name, item.time_ago(now));
    }
}

fn print_batch_detail(detail: &BatchDetail) {
    let stage = detail.stage().map(|s| s.as_str()).unwrap_or("-");
    println!("Batch #{} (variety {}), stage: {}", detail.batch.id, detail.batch.variety_id, stage);
    for event in &detail.timeline {
        println!(
            "  {}  {:<13} {}",
            event.event_date.format("%Y-%m-%d"),
            event.event_type.as_str(),
            event.notes.as_deref().unwrap_or("")
        );
    }
    let d = &detail.distributions;
    println!("  Shared: {} gifts, {} trades, {} plants", d.gifts, d.trades, d.total_quantity);
}

fn print_plant_detail(detail: &PlantDetail) {
    let plant = &detail.plant;
    println!("{} (#{})", plant.common_name, plant.id);
    if let Some(location) = &plant.location {
        println!("  {}", location);
    }
    println!("Next care");
    for status in &detail.statuses {
        println!("  {} {:<12} {}", status.care_type.icon(), status.care_type, status.countdown_label());
    }
    println!("Care log");
    if detail.care_log.is_empty() {
        println!("  No care logged yet.");
    }
    for event in &detail.care_log {
        println!(
            "  {}  {:<12} {}",
            event.event_date.format("%Y-%m-%d"),
            event.care_type,
            event.notes.as_deref().unwrap_or("")
        );
    }
}
