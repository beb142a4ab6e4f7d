// src/models.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

// --- 0. 后端时间格式 ---
// 后端返回无时区的 ISO 时间，偶尔是纯日期或带偏移的 RFC 3339，三种都接受
pub mod wire_time {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_local());
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(dt);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
            return Some(dt);
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
    }

    pub mod option {
        use super::parse;
        use chrono::NaiveDateTime;
        use serde::{de::Error, Deserialize, Deserializer};

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) => parse(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}"))),
            }
        }
    }
}

/// 把日期转成后端要的午夜时间
pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

// --- 1. 护理类型 ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CareType {
    Watering,
    Fertilizing,
    Repotting,
}

impl CareType {
    pub fn as_str(self) -> &'static str {
        match self {
            CareType::Watering => "WATERING",
            CareType::Fertilizing => "FERTILIZING",
            CareType::Repotting => "REPOTTING",
        }
    }

    /// 动态里用的过去式，比如 "Amy watered Snake Plant"
    pub fn verb(self) -> &'static str {
        match self {
            CareType::Watering => "watered",
            CareType::Fertilizing => "fertilized",
            CareType::Repotting => "repotted",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            CareType::Watering => "💧",
            CareType::Fertilizing => "🌱",
            CareType::Repotting => "🪴",
        }
    }
}

impl fmt::Display for CareType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CareType::Watering => "Watering",
            CareType::Fertilizing => "Fertilizing",
            CareType::Repotting => "Repotting",
        };
        f.pad(label)
    }
}

impl FromStr for CareType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WATERING" | "WATER" => Ok(CareType::Watering),
            "FERTILIZING" | "FERTILIZE" => Ok(CareType::Fertilizing),
            "REPOTTING" | "REPOT" => Ok(CareType::Repotting),
            other => Err(format!("unknown care type: {other}")),
        }
    }
}

// --- 2. 批次事件类型 ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Seeded,
    Germinated,
    Transplanted,
    FirstFlower,
    Mature,
    Harvested,
    GivenAway,
    Traded,
    Died,
    Observation,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Seeded => "SEEDED",
            EventType::Germinated => "GERMINATED",
            EventType::Transplanted => "TRANSPLANTED",
            EventType::FirstFlower => "FIRST_FLOWER",
            EventType::Mature => "MATURE",
            EventType::Harvested => "HARVESTED",
            EventType::GivenAway => "GIVEN_AWAY",
            EventType::Traded => "TRADED",
            EventType::Died => "DIED",
            EventType::Observation => "OBSERVATION",
        }
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        let event_type = match normalized.as_str() {
            "SEEDED" => EventType::Seeded,
            "GERMINATED" => EventType::Germinated,
            "TRANSPLANTED" => EventType::Transplanted,
            "FIRST_FLOWER" => EventType::FirstFlower,
            "MATURE" => EventType::Mature,
            "HARVESTED" => EventType::Harvested,
            "GIVEN_AWAY" => EventType::GivenAway,
            "TRADED" => EventType::Traded,
            "DIED" => EventType::Died,
            "OBSERVATION" => EventType::Observation,
            other => return Err(format!("unknown event type: {other}")),
        };
        Ok(event_type)
    }
}

// --- 3. 用户与季节 ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub display_color: String,
    #[serde(default, deserialize_with = "wire_time::option::deserialize")]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: i32,
    pub year: i32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "wire_time::option::deserialize")]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Validate)]
pub struct PinLoginSchema {
    #[validate(custom(function = "validate_pin"))]
    pub pin: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserStats {
    pub batch_count: i64,
    pub event_count: i64,
    pub streak: i64,
}

// --- 4. 品种、批次、批次事件 ---
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Variety {
    pub id: i32,
    pub common_name: String,
    pub scientific_name: Option<String>,
    pub category: String,
    #[serde(default)]
    pub flowering_season: Option<String>,
    #[serde(default)]
    pub days_to_germinate: Option<i32>,
    #[serde(default)]
    pub days_to_mature: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Validate)]
pub struct CreateVarietySchema {
    #[validate(custom(function = "validate_not_blank"))]
    pub common_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    // vegetable / ornamental / houseplant
    #[validate(custom(function = "validate_not_blank"))]
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "发芽天数必须为正数"))]
    pub days_to_germinate: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "成熟天数必须为正数"))]
    pub days_to_mature: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Batch {
    pub id: i32,
    pub user_id: i32,
    pub variety_id: i32,
    pub season_id: i32,
    #[serde(default)]
    pub seeds_count: Option<i32>,
    #[serde(default)]
    pub packets: Option<i32>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "wire_time::option::deserialize")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "wire_time::option::deserialize")]
    pub transplant_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub outcome_notes: Option<String>,
}

#[derive(Debug, Serialize, Validate)]
pub struct CreateBatchSchema {
    pub variety_id: i32,
    pub season_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "种子数量必须为正数"))]
    pub seeds_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub location: Option<String>,
    // 种子来源：店名、朋友
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000, message = "备注过长"))]
    pub outcome_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LifecycleEvent {
    pub id: i32,
    pub batch_id: i32,
    pub user_id: i32,
    pub event_type: EventType,
    #[serde(deserialize_with = "wire_time::deserialize")]
    pub event_date: NaiveDateTime,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Validate)]
pub struct CreateLifecycleEventSchema {
    pub batch_id: i32,
    pub event_type: EventType,
    pub event_date: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000, message = "备注过长"))]
    pub notes: Option<String>,
}

// --- 5. 照片 ---
pub const ALLOWED_PHOTO_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Photo {
    pub id: i32,
    pub batch_id: i32,
    pub user_id: i32,
    pub filename: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "wire_time::option::deserialize")]
    pub taken_at: Option<NaiveDateTime>,
}

/// 上传前的照片，和后端的扩展名/大小限制保持一致
#[derive(Debug, Validate)]
pub struct PhotoUpload {
    #[validate(custom(function = "validate_photo_name"))]
    pub file_name: String,
    #[validate(custom(function = "validate_photo_size"))]
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
}

// --- 6. 室内植物 ---
/// 拍照识别的结果，confidence 在 0.0 到 1.0 之间
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentifyResult {
    pub common_name: String,
    pub scientific_name: String,
    pub description: String,
    pub confidence: f64,
    #[serde(default)]
    pub care_tips: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndividualPlant {
    pub id: i32,
    pub user_id: i32,
    pub common_name: String,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "wire_time::option::deserialize")]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Validate)]
pub struct CreatePlantSchema {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 100, message = "植物名称不能超过 100 个字符")
    )]
    pub common_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 150))]
    pub scientific_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CareSchedule {
    pub id: i32,
    pub plant_id: i32,
    pub care_type: CareType,
    pub frequency_days: i64,
}

#[derive(Debug, Serialize, Validate)]
pub struct CreateCareScheduleSchema {
    pub care_type: CareType,
    #[validate(range(min = 1, message = "护理周期至少为 1 天"))]
    pub frequency_days: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CareEvent {
    pub id: i32,
    pub plant_id: i32,
    pub user_id: i32,
    pub care_type: CareType,
    #[serde(deserialize_with = "wire_time::deserialize")]
    pub event_date: NaiveDateTime,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photo_filename: Option<String>,
    #[serde(default, deserialize_with = "wire_time::option::deserialize")]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Validate)]
pub struct CreateCareEventSchema {
    pub care_type: CareType,
    pub event_date: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000, message = "备注过长"))]
    pub notes: Option<String>,
}

// --- 7. 花费 ---
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeasonCost {
    pub id: i32,
    pub user_id: i32,
    pub season_id: i32,
    pub item_name: String,
    pub cost: f64,
    #[serde(default)]
    pub quantity: Option<i32>,
    pub category: String,
    #[serde(default = "default_true")]
    pub is_one_time: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Validate)]
pub struct CreateCostSchema {
    pub season_id: i32,
    #[validate(custom(function = "validate_not_blank"))]
    pub item_name: String,
    #[validate(range(min = 0.0, message = "金额不能为负数"))]
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    // seed / material / tool ...
    #[validate(custom(function = "validate_not_blank"))]
    pub category: String,
    pub is_one_time: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeasonCostTotal {
    pub season_id: i32,
    pub year: i32,
    pub total_cost: f64,
    #[serde(default)]
    pub by_category: Vec<CategoryTotal>,
}

// --- 8. 赠送 / 交换 ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionType {
    Gift,
    Trade,
}

impl FromStr for DistributionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gift" => Ok(DistributionType::Gift),
            "trade" => Ok(DistributionType::Trade),
            other => Err(format!("type must be 'gift' or 'trade', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Distribution {
    pub id: i32,
    pub user_id: i32,
    pub batch_id: i32,
    pub recipient: String,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(rename = "type")]
    pub kind: DistributionType,
    #[serde(deserialize_with = "wire_time::deserialize")]
    pub date: NaiveDateTime,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Validate)]
pub struct CreateDistributionSchema {
    pub batch_id: i32,
    #[validate(custom(function = "validate_not_blank"))]
    pub recipient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "数量至少为 1"))]
    pub quantity: Option<i32>,
    #[serde(rename = "type")]
    pub kind: DistributionType,
    pub date: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DistributionSummary {
    pub batch_id: i32,
    pub total_distributed: i64,
    pub total_quantity: i64,
    pub gifts: i64,
    pub trades: i64,
    #[serde(default)]
    pub recipients: Vec<String>,
}

// --- 9. 校验函数 ---
fn default_true() -> bool {
    true
}

fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    let pin = pin.trim();
    if pin.len() == 4 && pin.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("pin").with_message("PIN must be 4 digits".into()))
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("不能为空".into()));
    }
    Ok(())
}

fn validate_photo_size(bytes: &[u8]) -> Result<(), ValidationError> {
    if bytes.is_empty() || bytes.len() > MAX_PHOTO_BYTES {
        return Err(ValidationError::new("photo_size").with_message("照片不能为空且不超过 10 MB".into()));
    }
    Ok(())
}

fn validate_photo_name(name: &str) -> Result<(), ValidationError> {
    let ext = std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext {
        Some(ext) if ALLOWED_PHOTO_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(ValidationError::new("photo_extension")
            .with_message("File type not allowed. Must be: jpg, jpeg, png, gif, webp".into())),
    }
}
