// src/care.rs
// 护理周期引擎：纯函数，不做 I/O
// 只比较日期，事件的具体时间忽略

use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{CareEvent, CareSchedule, CareType};

/// Today 页面日历的天数
pub const DEFAULT_HORIZON_DAYS: i64 = 7;

/// 从未记录过的周期，按逾期一天处理
pub const NEVER_LOGGED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Urgency {
    Overdue,
    Today,
    Soon,
    Healthy,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Overdue => "overdue",
            Urgency::Today => "today",
            Urgency::Soon => "soon",
            Urgency::Healthy => "healthy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CareStatus {
    pub care_type: CareType,
    pub days_until_due: i64,
    pub urgency: Urgency,
}

impl CareStatus {
    pub fn new(care_type: CareType, days_until_due: i64) -> Self {
        Self {
            care_type,
            days_until_due,
            urgency: classify_urgency(days_until_due),
        }
    }

    /// 卡片上的徽章文字
    pub fn label(&self) -> String {
        urgency_label(self.days_until_due)
    }

    /// 详情页倒计时，比如 "In 12 days"
    pub fn countdown_label(&self) -> String {
        match self.days_until_due {
            n if n < 0 => overdue_label(n),
            0 => "Due today".to_string(),
            n => format!("In {} {}", n, plural_days(n)),
        }
    }
}

/// 该类型最近的一次记录，日期相同取先找到的
pub fn last_event_of(care_type: CareType, events: &[CareEvent]) -> Option<&CareEvent> {
    events
        .iter()
        .filter(|e| e.care_type == care_type)
        .fold(None, |latest: Option<&CareEvent>, e| match latest {
            Some(current) if current.event_date >= e.event_date => Some(current),
            _ => Some(e),
        })
}

pub fn days_until_due(schedule: &CareSchedule, events: &[CareEvent], today: NaiveDate) -> i64 {
    match last_event_of(schedule.care_type, events) {
        None => NEVER_LOGGED,
        Some(last) => {
            let days_since = (today - last.event_date.date()).num_days();
            schedule.frequency_days - days_since
        }
    }
}

pub fn classify_urgency(days_until_due: i64) -> Urgency {
    match days_until_due {
        n if n < 0 => Urgency::Overdue,
        0 => Urgency::Today,
        1..=3 => Urgency::Soon,
        _ => Urgency::Healthy,
    }
}

pub fn urgency_label(days_until_due: i64) -> String {
    match classify_urgency(days_until_due) {
        Urgency::Overdue => overdue_label(days_until_due),
        Urgency::Today => "Due today".to_string(),
        Urgency::Soon => format!("Due in {}d", days_until_due),
        Urgency::Healthy => "Healthy".to_string(),
    }
}

fn overdue_label(days_until_due: i64) -> String {
    let n = days_until_due.abs();
    format!("Overdue {} {}", n, plural_days(n))
}

fn plural_days(n: i64) -> &'static str {
    if n == 1 {
        "day"
    } else {
        "days"
    }
}

pub fn care_statuses(
    schedules: &[CareSchedule],
    events: &[CareEvent],
    today: NaiveDate,
) -> Vec<CareStatus> {
    schedules
        .iter()
        .map(|s| CareStatus::new(s.care_type, days_until_due(s, events, today)))
        .collect()
}

/// 卡片只显示最紧急的一项，相同取靠前的
pub fn most_urgent(statuses: &[CareStatus]) -> Option<CareStatus> {
    statuses.iter().copied().min_by_key(|s| s.days_until_due)
}

/// 未来 horizon_days 天里每天要做的护理（不含今天）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpcomingCalendar {
    days: BTreeMap<NaiveDate, BTreeSet<CareType>>,
}

impl UpcomingCalendar {
    pub fn due_on(&self, date: NaiveDate) -> Option<&BTreeSet<CareType>> {
        self.days.get(&date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &BTreeSet<CareType>)> {
        self.days.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// 按日期取并集，用来合并所有植物
    pub fn merge(&mut self, other: UpcomingCalendar) {
        for (date, care_types) in other.days {
            self.days.entry(date).or_default().extend(care_types);
        }
    }

    fn insert(&mut self, date: NaiveDate, care_type: CareType) {
        self.days.entry(date).or_default().insert(care_type);
    }
}

/// 只根据已有记录静态推算：`today + i` 落在周期上，且不早于下次到期日
pub fn upcoming_calendar(
    schedules: &[CareSchedule],
    events: &[CareEvent],
    today: NaiveDate,
    horizon_days: i64,
) -> UpcomingCalendar {
    let mut calendar = UpcomingCalendar::default();

    for schedule in schedules {
        // 创建时已拒绝 <= 0 的频率
        if schedule.frequency_days <= 0 {
            continue;
        }
        let due_in = days_until_due(schedule, events, today);
        for i in 1..=horizon_days {
            if i >= due_in && (i - due_in).rem_euclid(schedule.frequency_days) == 0 {
                calendar.insert(today + Duration::days(i), schedule.care_type);
            }
        }
    }

    calendar
}

/// Today 页面上今天要做的一项护理
#[derive(Debug, Clone, PartialEq)]
pub struct DueCare {
    pub plant_id: i32,
    pub plant_name: String,
    pub care_type: CareType,
    pub days_overdue: i64,
    pub last_care_date: Option<NaiveDate>,
}

impl DueCare {
    pub fn label(&self) -> String {
        urgency_label(-self.days_overdue)
    }
}

pub fn due_today(
    plant_id: i32,
    plant_name: &str,
    schedules: &[CareSchedule],
    events: &[CareEvent],
    today: NaiveDate,
) -> Vec<DueCare> {
    schedules
        .iter()
        .filter_map(|schedule| {
            let due_in = days_until_due(schedule, events, today);
            (due_in <= 0).then(|| DueCare {
                plant_id,
                plant_name: plant_name.to_string(),
                care_type: schedule.care_type,
                days_overdue: -due_in,
                last_care_date: last_event_of(schedule.care_type, events)
                    .map(|e| e.event_date.date()),
            })
        })
        .collect()
}
