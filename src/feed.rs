// src/feed.rs
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use futures_util::future::try_join_all;

use crate::client::ApiClient;
use crate::clock::Clock;
use crate::models::CareType;
use crate::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityItem {
    pub user_name: String,
    pub action: String,
    pub plant_name: String,
    pub occurred_at: NaiveDateTime,
    pub care_type: Option<CareType>,
}

impl ActivityItem {
    /// "5m ago" / "2h ago" / "1d ago"
    pub fn time_ago(&self, now: NaiveDateTime) -> String {
        let elapsed = now - self.occurred_at;
        if elapsed < Duration::minutes(1) {
            "just now".to_string()
        } else if elapsed < Duration::hours(1) {
            format!("{}m ago", elapsed.num_minutes())
        } else if elapsed < Duration::days(1) {
            format!("{}h ago", elapsed.num_hours())
        } else {
            format!("{}d ago", elapsed.num_days())
        }
    }
}

/// 好友动态来源
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// 最新的在前
    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityItem>, AppError>;
}

/// 固定的示例动态，时间相对于时钟
pub struct StubFeed<C> {
    clock: C,
}

impl<C: Clock> StubFeed<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl<C: Clock + 'static> FeedSource for StubFeed<C> {
    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityItem>, AppError> {
        let now = self.clock.now();
        let sample = [
            ("Amy", "watered", "Snake Plant", Duration::hours(2), Some(CareType::Watering)),
            ("Marcus", "fertilized", "Philodendron", Duration::hours(4), Some(CareType::Fertilizing)),
            ("Sarah", "repotted", "Monstera", Duration::hours(6), Some(CareType::Repotting)),
            ("Sarah", "added", "Orchid", Duration::hours(20), None),
            ("James", "harvested", "Tomatoes", Duration::days(2), None),
        ];

        Ok(sample
            .into_iter()
            .take(limit)
            .map(|(user, action, plant, ago, care_type)| ActivityItem {
                user_name: user.to_string(),
                action: action.to_string(),
                plant_name: plant.to_string(),
                occurred_at: now - ago,
                care_type,
            })
            .collect())
    }
}

/// 真实动态：当前用户自己所有植物的护理记录
pub struct CareLogFeed {
    client: ApiClient,
    user_id: i32,
    user_name: String,
}

impl CareLogFeed {
    pub fn new(client: ApiClient, user_id: i32, user_name: impl Into<String>) -> Self {
        Self {
            client,
            user_id,
            user_name: user_name.into(),
        }
    }
}

#[async_trait]
impl FeedSource for CareLogFeed {
    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityItem>, AppError> {
        let plants = self.client.individual_plants(self.user_id).await?;
        let per_plant = try_join_all(plants.iter().map(|p| self.client.care_events(p.id))).await?;

        let mut items: Vec<ActivityItem> = plants
            .iter()
            .zip(per_plant)
            .flat_map(|(plant, events)| {
                events.into_iter().map(move |e| ActivityItem {
                    user_name: self.user_name.clone(),
                    action: e.care_type.verb().to_string(),
                    plant_name: plant.common_name.clone(),
                    occurred_at: e.created_at.unwrap_or(e.event_date),
                    care_type: Some(e.care_type),
                })
            })
            .collect();

        items.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        items.truncate(limit);
        Ok(items)
    }
}
