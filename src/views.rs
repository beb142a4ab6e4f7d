// src/views.rs
// 页面级视图：各自拉数据、跑护理引擎，返回给 CLI 渲染的纯数据

use chrono::NaiveDate;
use futures_util::future::try_join_all;

use crate::care::{self, CareStatus, DueCare, UpcomingCalendar, DEFAULT_HORIZON_DAYS};
use crate::client::ApiClient;
use crate::clock::Clock;
use crate::feed::{ActivityItem, FeedSource};
use crate::models::*;
use crate::session::Session;
use crate::AppError;

/// 一株植物的护理数据：周期和记录总是一起取
#[derive(Debug, Clone)]
pub struct PlantCare {
    pub plant: IndividualPlant,
    pub schedules: Vec<CareSchedule>,
    pub events: Vec<CareEvent>,
}

impl PlantCare {
    pub fn statuses(&self, today: NaiveDate) -> Vec<CareStatus> {
        care::care_statuses(&self.schedules, &self.events, today)
    }
}

async fn fetch_plant_care(client: &ApiClient, plant: IndividualPlant) -> Result<PlantCare, AppError> {
    let (schedules, events) =
        tokio::try_join!(client.care_schedules(plant.id), client.care_events(plant.id))?;
    Ok(PlantCare { plant, schedules, events })
}

async fn fetch_collection_care(client: &ApiClient, user_id: i32) -> Result<Vec<PlantCare>, AppError> {
    let plants = client.individual_plants(user_id).await?;
    try_join_all(plants.into_iter().map(|p| fetch_plant_care(client, p))).await
}

// --- 1. Today ---

pub const FEED_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct TodayView {
    pub date: NaiveDate,
    pub due: Vec<DueCare>,
    pub upcoming: UpcomingCalendar,
    pub activity: Vec<ActivityItem>,
}

pub async fn today<C, F>(
    client: &ApiClient,
    session: &Session,
    clock: &C,
    feed: &F,
) -> Result<TodayView, AppError>
where
    C: Clock,
    F: FeedSource + ?Sized,
{
    let user = session.user()?;
    let today = clock.today();

    let (collection, activity) = tokio::try_join!(
        fetch_collection_care(client, user.id),
        feed.recent_activity(FEED_LIMIT)
    )?;

    let mut due = Vec::new();
    let mut upcoming = UpcomingCalendar::default();
    for pc in &collection {
        due.extend(care::due_today(
            pc.plant.id,
            &pc.plant.common_name,
            &pc.schedules,
            &pc.events,
            today,
        ));
        upcoming.merge(care::upcoming_calendar(
            &pc.schedules,
            &pc.events,
            today,
            DEFAULT_HORIZON_DAYS,
        ));
    }
    // 最逾期的排最前
    due.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));

    Ok(TodayView { date: today, due, upcoming, activity })
}

// --- 2. Collection (My Plants) ---

#[derive(Debug, Clone)]
pub struct PlantCard {
    pub plant: IndividualPlant,
    pub status: Option<CareStatus>,
}

impl PlantCard {
    pub fn label(&self) -> String {
        match &self.status {
            Some(status) => status.label(),
            None => "No schedule".to_string(),
        }
    }
}

pub async fn collection<C: Clock>(
    client: &ApiClient,
    session: &Session,
    clock: &C,
) -> Result<Vec<PlantCard>, AppError> {
    let user = session.user()?;
    let today = clock.today();
    let collection = fetch_collection_care(client, user.id).await?;

    Ok(collection
        .into_iter()
        .map(|pc| {
            let status = care::most_urgent(&pc.statuses(today));
            PlantCard { plant: pc.plant, status }
        })
        .collect())
}

// --- 3. Plant detail ---

#[derive(Debug, Clone)]
pub struct PlantDetail {
    pub plant: IndividualPlant,
    pub statuses: Vec<CareStatus>,
    /// 最新的在前
    pub care_log: Vec<CareEvent>,
}

pub async fn plant_detail<C: Clock>(
    client: &ApiClient,
    clock: &C,
    plant_id: i32,
) -> Result<PlantDetail, AppError> {
    let plant = client.individual_plant(plant_id).await?;
    let pc = fetch_plant_care(client, plant).await?;
    let statuses = pc.statuses(clock.today());

    let mut care_log = pc.events;
    care_log.sort_by(|a, b| b.event_date.cmp(&a.event_date));

    Ok(PlantDetail { plant: pc.plant, statuses, care_log })
}

/// 记录护理，然后重新拉取数据再算一遍；同时返回新建的记录
pub async fn log_care<C: Clock>(
    client: &ApiClient,
    session: &Session,
    clock: &C,
    plant_id: i32,
    care_type: CareType,
    date: Option<NaiveDate>,
    notes: Option<String>,
) -> Result<(CareEvent, PlantDetail), AppError> {
    let user = session.user()?;
    let new = CreateCareEventSchema {
        care_type,
        event_date: midnight(date.unwrap_or_else(|| clock.today())),
        notes: notes.filter(|n| !n.trim().is_empty()),
    };
    let event = client.log_care_event(plant_id, user.id, &new).await?;
    tracing::info!(plant_id, event_id = event.id, care_type = care_type.as_str(), "💧 Care logged");

    let detail = plant_detail(client, clock, plant_id).await?;
    Ok((event, detail))
}

// --- 4. Add plant flow ---

pub const REPOTTING_FREQUENCY_DAYS: i64 = 365;

#[derive(Debug, Clone)]
pub struct NewPlantPlan {
    pub common_name: String,
    pub scientific_name: Option<String>,
    pub location: Option<String>,
    pub watering_every_days: i64,
    pub fertilizing_every_weeks: i64,
    pub repotting_reminder: bool,
}

impl Default for NewPlantPlan {
    fn default() -> Self {
        Self {
            common_name: String::new(),
            scientific_name: None,
            location: Some("Living Room".to_string()),
            watering_every_days: 7,
            fertilizing_every_weeks: 4,
            repotting_reminder: true,
        }
    }
}

impl NewPlantPlan {
    pub fn schedules(&self) -> Vec<CreateCareScheduleSchema> {
        let mut schedules = vec![
            CreateCareScheduleSchema {
                care_type: CareType::Watering,
                frequency_days: self.watering_every_days,
            },
            CreateCareScheduleSchema {
                care_type: CareType::Fertilizing,
                frequency_days: self.fertilizing_every_weeks * 7,
            },
        ];
        if self.repotting_reminder {
            schedules.push(CreateCareScheduleSchema {
                care_type: CareType::Repotting,
                frequency_days: REPOTTING_FREQUENCY_DAYS,
            });
        }
        schedules
    }
}

pub async fn add_plant(
    client: &ApiClient,
    session: &Session,
    plan: &NewPlantPlan,
) -> Result<(IndividualPlant, Vec<CareSchedule>), AppError> {
    let user = session.user()?;
    let new = CreatePlantSchema {
        common_name: plan.common_name.trim().to_string(),
        scientific_name: plan.scientific_name.clone().filter(|s| !s.trim().is_empty()),
        location: plan.location.clone(),
        notes: None,
    };

    // 先把所有周期校验一遍，避免植物建好了周期却失败
    let schedule_payloads = plan.schedules();
    for payload in &schedule_payloads {
        validator::Validate::validate(payload)?;
    }

    let plant = client.create_individual_plant(user.id, &new).await?;
    let mut schedules = Vec::with_capacity(schedule_payloads.len());
    for payload in &schedule_payloads {
        schedules.push(client.set_care_schedule(plant.id, user.id, payload).await?);
    }

    tracing::info!(plant_id = plant.id, name = %plant.common_name, "🪴 Plant added");
    Ok((plant, schedules))
}

// --- 5. Profile ---

#[derive(Debug, Clone)]
pub struct ProfileView {
    pub user: User,
    pub season: Option<Season>,
    pub stats: UserStats,
    pub plant_count: usize,
}

pub async fn profile(client: &ApiClient, session: &Session) -> Result<ProfileView, AppError> {
    let user = session.user()?.clone();
    let (stats, plants) =
        tokio::try_join!(client.user_stats(user.id), client.individual_plants(user.id))?;

    Ok(ProfileView {
        season: session.current_season.clone(),
        user,
        stats,
        plant_count: plants.len(),
    })
}

// --- 6. Cost tracker ---

#[derive(Debug, Clone)]
pub struct CostTrackerView {
    pub season: Season,
    pub costs: Vec<SeasonCost>,
    pub total: SeasonCostTotal,
}

pub async fn cost_tracker(
    client: &ApiClient,
    session: &Session,
    season: Option<Season>,
) -> Result<CostTrackerView, AppError> {
    let season = match season {
        Some(season) => season,
        None => session.season()?.clone(),
    };
    let (costs, total) =
        tokio::try_join!(client.costs(season.id), client.season_cost_total(season.id))?;
    Ok(CostTrackerView { season, costs, total })
}

// --- 7. Garden (seed batches) ---

#[derive(Debug, Clone)]
pub struct BatchDetail {
    pub batch: Batch,
    pub timeline: Vec<LifecycleEvent>,
    pub distributions: DistributionSummary,
}

impl BatchDetail {
    /// 最近一次生命周期事件，作为当前阶段
    pub fn stage(&self) -> Option<EventType> {
        self.timeline.iter().max_by_key(|e| e.event_date).map(|e| e.event_type)
    }
}

/// 批次卡片：批次加上品种名，品种可能已被删掉
#[derive(Debug, Clone)]
pub struct BatchCard {
    pub batch: Batch,
    pub variety: Option<Variety>,
}

impl BatchCard {
    pub fn variety_name(&self) -> String {
        match &self.variety {
            Some(variety) => variety.common_name.clone(),
            None => format!("variety #{}", self.batch.variety_id),
        }
    }
}

pub async fn garden(client: &ApiClient, session: &Session) -> Result<Vec<BatchCard>, AppError> {
    let season = session.season()?;
    let (batches, varieties) = tokio::try_join!(client.batches(season.id), client.varieties())?;

    Ok(batches
        .into_iter()
        .map(|batch| {
            let variety = varieties.iter().find(|v| v.id == batch.variety_id).cloned();
            BatchCard { batch, variety }
        })
        .collect())
}

pub async fn batch_detail(client: &ApiClient, batch_id: i32) -> Result<BatchDetail, AppError> {
    let (batch, timeline, distributions) = tokio::try_join!(
        client.batch(batch_id),
        client.batch_timeline(batch_id),
        client.distribution_summary(batch_id)
    )?;
    Ok(BatchDetail { batch, timeline, distributions })
}

/// 记录一个批次事件（发芽、移栽……），然后重新拉取批次详情
pub async fn log_batch_event<C: Clock>(
    client: &ApiClient,
    session: &Session,
    clock: &C,
    batch_id: i32,
    event_type: EventType,
    date: Option<NaiveDate>,
    notes: Option<String>,
) -> Result<(LifecycleEvent, BatchDetail), AppError> {
    let user = session.user()?;
    let new = CreateLifecycleEventSchema {
        batch_id,
        event_type,
        event_date: midnight(date.unwrap_or_else(|| clock.today())),
        notes: non_blank(notes),
    };
    let event = client.create_event(user.id, &new).await?;
    tracing::info!(batch_id, event_id = event.id, event_type = event_type.as_str(), "🌿 Batch event logged");

    let detail = batch_detail(client, batch_id).await?;
    Ok((event, detail))
}

// --- 8. Add batch flow ---

#[derive(Debug)]
pub enum VarietyChoice {
    Existing(i32),
    New(CreateVarietySchema),
}

#[derive(Debug)]
pub struct NewBatchPlan {
    pub variety: VarietyChoice,
    pub seeds_count: Option<i32>,
    pub location: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub start_date: Option<NaiveDate>,
}

/// 需要时先建品种，再在当前季节下建批次
pub async fn add_batch(
    client: &ApiClient,
    session: &Session,
    plan: NewBatchPlan,
) -> Result<Batch, AppError> {
    let user = session.user()?;
    let season = session.season()?;

    let mut new = CreateBatchSchema {
        variety_id: 0,
        season_id: season.id,
        seeds_count: plan.seeds_count,
        location: non_blank(plan.location),
        source: non_blank(plan.source),
        start_date: plan.start_date.map(midnight),
        outcome_notes: non_blank(plan.notes),
    };
    // 先校验批次，免得品种建好了批次却失败
    validator::Validate::validate(&new)?;

    new.variety_id = match plan.variety {
        VarietyChoice::Existing(id) => id,
        VarietyChoice::New(variety) => {
            let created = client.create_variety(&variety).await?;
            tracing::info!(variety_id = created.id, name = %created.common_name, "🌱 Variety added");
            created.id
        }
    };

    let batch = client.create_batch(user.id, &new).await?;
    tracing::info!(batch_id = batch.id, season = season.year, "🌱 Batch added");
    Ok(batch)
}

// --- 9. Identify ---

/// 识别结果直接预填新植物
impl From<&IdentifyResult> for NewPlantPlan {
    fn from(result: &IdentifyResult) -> Self {
        Self {
            common_name: result.common_name.trim().to_string(),
            scientific_name: non_blank(Some(result.scientific_name.clone())),
            ..NewPlantPlan::default()
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
