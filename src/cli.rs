// src/cli.rs
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use plantlady::models::{CareType, DistributionType, EventType};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plantlady")]
#[command(about = "Track seed batches, houseplant care, costs and gifts")]
pub struct Cli {
    /// Use sample friend activity instead of your own care log
    #[arg(long, global = true)]
    pub demo_feed: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in with your 4-digit PIN
    Login {
        #[arg(long)]
        pin: String,
    },
    /// Forget the current session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Care due today, the next 7 days, and friend activity
    Today,
    /// Your houseplant collection with care badges
    Plants,
    /// One plant's care status and history
    Plant {
        id: i32,
    },
    /// Add a houseplant and its care schedules
    AddPlant(AddPlantArgs),
    /// Log watering, fertilizing or repotting
    LogCare(LogCareArgs),
    /// Set (or replace) a plant's care frequency
    Schedule {
        plant_id: i32,
        #[arg(long)]
        care: CareType,
        #[arg(long)]
        every_days: i64,
    },
    /// Stats and streak
    Profile,
    /// List growing seasons
    Seasons,
    /// Seed batches in the current season
    Batches,
    /// One batch with its timeline and gifts/trades
    Batch {
        id: i32,
    },
    /// Start a seed batch in the current season
    AddBatch(AddBatchArgs),
    /// Log a lifecycle event (germinated, transplanted, ...) for a batch
    LogEvent(LogEventArgs),
    /// Attach a photo to a batch
    BatchPhoto {
        batch_id: i32,
        photo: PathBuf,
        #[arg(long)]
        caption: Option<String>,
    },
    /// Plant varieties in the catalog
    Varieties {
        /// Only names containing this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Add a plant variety to the catalog
    AddVariety(AddVarietyArgs),
    /// Identify a plant from a photo
    Identify {
        photo: PathBuf,
        /// Add the identified plant to your collection
        #[arg(long)]
        add: bool,
        #[arg(long, default_value = "Living Room")]
        location: String,
    },
    /// Season costs and total
    Costs {
        /// Season id (defaults to the current season)
        #[arg(long)]
        season: Option<i32>,
    },
    /// Record a season cost
    AddCost(AddCostArgs),
    /// Remove a cost entry
    DeleteCost {
        id: i32,
    },
    /// Gifts and trades
    Distributions {
        #[arg(long)]
        batch: Option<i32>,
    },
    /// Record a gift or trade from a batch
    Give(GiveArgs),
    /// Remove a gift or trade
    DeleteDistribution {
        id: i32,
    },
    /// Recent activity
    Feed {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Args, Debug)]
pub struct AddPlantArgs {
    /// Common name
    #[arg(short = 'n', long = "name")]
    pub name: String,
    #[arg(long)]
    pub scientific_name: Option<String>,
    #[arg(long, default_value = "Living Room")]
    pub location: String,
    /// Watering frequency in days
    #[arg(long, default_value_t = 7)]
    pub water_every: i64,
    /// Fertilizing frequency in weeks
    #[arg(long, default_value_t = 4)]
    pub fertilize_weeks: i64,
    /// Skip the yearly repotting reminder
    #[arg(long)]
    pub no_repot: bool,
}

#[derive(Args, Debug)]
pub struct LogCareArgs {
    pub plant_id: i32,
    /// watering | fertilizing | repotting
    #[arg(long)]
    pub care: CareType,
    /// Defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Photo to attach to the care event
    #[arg(long)]
    pub photo: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AddCostArgs {
    #[arg(long)]
    pub item: String,
    #[arg(long)]
    pub cost: f64,
    #[arg(long, default_value = "seed")]
    pub category: String,
    #[arg(long)]
    pub quantity: Option<i32>,
    /// Recurring cost (default: one-time)
    #[arg(long)]
    pub recurring: bool,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct GiveArgs {
    pub batch_id: i32,
    #[arg(long)]
    pub to: String,
    /// gift | trade
    #[arg(long, default_value = "gift")]
    pub kind: DistributionType,
    #[arg(long)]
    pub quantity: Option<i32>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct AddBatchArgs {
    /// Existing variety id
    #[arg(long, required_unless_present = "new_variety", conflicts_with = "new_variety")]
    pub variety: Option<i32>,
    /// Create a new variety with this name first
    #[arg(long)]
    pub new_variety: Option<String>,
    /// Category for a new variety
    #[arg(long, default_value = "Vegetables")]
    pub category: String,
    #[arg(long)]
    pub seeds: Option<i32>,
    #[arg(long)]
    pub location: Option<String>,
    /// Where the seeds came from
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Defaults to today
    #[arg(long)]
    pub started: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct LogEventArgs {
    pub batch_id: i32,
    /// seeded | germinated | transplanted | first-flower | mature | harvested | ...
    #[arg(long = "type")]
    pub event_type: EventType,
    /// Defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct AddVarietyArgs {
    #[arg(short = 'n', long = "name")]
    pub name: String,
    #[arg(long)]
    pub scientific_name: Option<String>,
    #[arg(long, default_value = "Vegetables")]
    pub category: String,
    #[arg(long)]
    pub days_to_germinate: Option<i32>,
    #[arg(long)]
    pub days_to_mature: Option<i32>,
}
