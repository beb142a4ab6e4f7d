// tests/common/mod.rs
// 进程内的假后端：axum 起在随机端口上，记录每个请求

#![allow(dead_code)]

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub type Shared = Arc<Mutex<Garden>>;
type Reply = Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)>;

pub const PIN: &str = "1234";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
}

fn days_ago(days: i64) -> String {
    format!("{}T00:00:00", today() - Duration::days(days))
}

#[derive(Default)]
pub struct Garden {
    pub seasons: Vec<Value>,
    pub plants: Vec<Value>,
    pub schedules: Vec<Value>,
    pub events: Vec<Value>,
    pub costs: Vec<Value>,
    pub varieties: Vec<Value>,
    pub batches: Vec<Value>,
    pub batch_events: Vec<Value>,
    pub photos: Vec<Value>,
    pub distributions: Vec<Value>,
    /// "METHOD /path" for every request received
    pub requests: Vec<String>,
    pub request_ids: Vec<String>,
    next_id: i64,
}

impl Garden {
    /// Monstera: watering overdue by 2, fertilizing healthy.
    /// Pothos: watering due in 4. Fern: no schedules.
    pub fn seeded() -> Self {
        let mut g = Garden {
            next_id: 100,
            seasons: vec![json!({"id": 3, "year": 2026, "notes": null, "created_at": "2026-01-01T00:00:00"})],
            ..Default::default()
        };
        g.plants = vec![
            plant(1, "Monstera Deliciosa"),
            plant(2, "Pothos 'Golden'"),
            plant(3, "Fern"),
        ];
        g.schedules = vec![
            schedule(11, 1, "WATERING", 7),
            schedule(12, 1, "FERTILIZING", 30),
            schedule(21, 2, "WATERING", 7),
        ];
        // oldest watering first on purpose
        g.events = vec![
            event(31, 1, "WATERING", &days_ago(20)),
            event(32, 1, "WATERING", &days_ago(9)),
            event(33, 1, "FERTILIZING", &days_ago(5)),
            event(41, 2, "WATERING", &days_ago(3)),
        ];
        g.costs = vec![
            json!({"id": 1, "user_id": 1, "season_id": 3, "item_name": "Tomato seeds", "cost": 4.5, "category": "seed", "is_one_time": true}),
            json!({"id": 2, "user_id": 1, "season_id": 3, "item_name": "Potting mix", "cost": 12.0, "category": "material", "is_one_time": true}),
        ];
        g.varieties = vec![
            json!({"id": 1, "common_name": "Tomato 'Cherokee Purple'", "scientific_name": "Solanum lycopersicum", "category": "Vegetables"}),
            json!({"id": 2, "common_name": "Zinnia", "scientific_name": null, "category": "Flowers"}),
        ];
        g.batches = vec![
            json!({"id": 7, "user_id": 1, "variety_id": 1, "season_id": 3, "seeds_count": 24, "location": "Greenhouse", "start_date": days_ago(20)}),
            json!({"id": 8, "user_id": 1, "variety_id": 2, "season_id": 3, "seeds_count": 12}),
            json!({"id": 9, "user_id": 1, "variety_id": 1, "season_id": 2}),
        ];
        // timeline deliberately out of order
        g.batch_events = vec![
            batch_event(51, 7, "SEEDED", &days_ago(20)),
            batch_event(53, 7, "TRANSPLANTED", &days_ago(2)),
            batch_event(52, 7, "GERMINATED", &days_ago(12)),
        ];
        g.distributions = vec![
            json!({"id": 61, "user_id": 1, "batch_id": 7, "recipient": "Marcus", "quantity": 3, "type": "gift", "date": days_ago(1)}),
            json!({"id": 62, "user_id": 1, "batch_id": 7, "recipient": "Sarah", "quantity": 2, "type": "trade", "date": days_ago(1)}),
            json!({"id": 63, "user_id": 1, "batch_id": 8, "recipient": "James", "quantity": null, "type": "gift", "date": days_ago(4)}),
        ];
        g
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn count(&self, request: &str) -> usize {
        self.requests.iter().filter(|r| r.as_str() == request).count()
    }
}

fn plant(id: i64, name: &str) -> Value {
    json!({"id": id, "user_id": 1, "common_name": name, "scientific_name": null, "location": "Living Room", "photo_url": null, "notes": null, "created_at": "2026-01-05T10:00:00"})
}

fn schedule(id: i64, plant_id: i64, care_type: &str, frequency_days: i64) -> Value {
    json!({"id": id, "plant_id": plant_id, "care_type": care_type, "frequency_days": frequency_days})
}

fn event(id: i64, plant_id: i64, care_type: &str, date: &str) -> Value {
    json!({"id": id, "plant_id": plant_id, "user_id": 1, "care_type": care_type, "event_date": date, "notes": null, "photo_filename": null, "created_at": date})
}

fn batch_event(id: i64, batch_id: i64, event_type: &str, date: &str) -> Value {
    json!({"id": id, "batch_id": batch_id, "user_id": 1, "event_type": event_type, "event_date": date, "notes": null})
}

fn user_id_of(q: &HashMap<String, String>) -> Option<i64> {
    q.get("user_id").and_then(|u| u.parse().ok())
}

fn not_found(what: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"detail": format!("{} not found", what)})))
}

fn for_plant(items: &[Value], plant_id: i64) -> Vec<Value> {
    items.iter().filter(|v| v["plant_id"] == plant_id).cloned().collect()
}

async fn record(State(g): State<Shared>, req: Request, next: Next) -> Response {
    {
        let mut g = g.lock().unwrap();
        g.requests.push(format!("{} {}", req.method(), req.uri().path()));
        if let Some(id) = req.headers().get("x-request-id").and_then(|v| v.to_str().ok()) {
            g.request_ids.push(id.to_string());
        }
    }
    next.run(req).await
}

async fn login(Json(body): Json<Value>) -> Reply {
    if body["pin"] == PIN {
        Ok((StatusCode::OK, Json(json!({"id": 1, "name": "Amy", "display_color": "#648655", "created_at": "2026-01-01T08:00:00"}))))
    } else {
        Err((StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid PIN"}))))
    }
}

async fn users() -> Json<Value> {
    Json(json!([{"id": 1, "name": "Amy", "display_color": "#648655"}]))
}

async fn stats(Path(_user_id): Path<i64>) -> Json<Value> {
    Json(json!({"batch_count": 4, "event_count": 17, "streak": 3}))
}

async fn seasons(State(g): State<Shared>) -> Json<Value> {
    Json(Value::Array(g.lock().unwrap().seasons.clone()))
}

async fn list_plants(State(g): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Reply {
    if !q.contains_key("user_id") {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"detail": "user_id required"}))));
    }
    Ok((StatusCode::OK, Json(Value::Array(g.lock().unwrap().plants.clone()))))
}

async fn create_plant(
    State(g): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Reply {
    let mut g = g.lock().unwrap();
    let id = g.next_id();
    let user_id: i64 = q.get("user_id").and_then(|u| u.parse().ok()).unwrap_or(0);
    let mut created = plant(id, body["common_name"].as_str().unwrap_or_default());
    created["user_id"] = json!(user_id);
    created["location"] = body.get("location").cloned().unwrap_or(Value::Null);
    g.plants.push(created.clone());
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_plant(State(g): State<Shared>, Path(id): Path<i64>) -> Reply {
    let g = g.lock().unwrap();
    g.plants
        .iter()
        .find(|p| p["id"] == id)
        .map(|p| (StatusCode::OK, Json(p.clone())))
        .ok_or_else(|| not_found("Plant"))
}

async fn list_schedules(State(g): State<Shared>, Path(id): Path<i64>) -> Json<Value> {
    Json(Value::Array(for_plant(&g.lock().unwrap().schedules, id)))
}

async fn upsert_schedule(State(g): State<Shared>, Path(id): Path<i64>, Json(body): Json<Value>) -> Reply {
    let mut g = g.lock().unwrap();
    if !g.plants.iter().any(|p| p["id"] == id) {
        return Err(not_found("Plant"));
    }
    let care_type = body["care_type"].clone();
    g.schedules.retain(|s| !(s["plant_id"] == id && s["care_type"] == care_type));
    let sid = g.next_id();
    let created = json!({"id": sid, "plant_id": id, "care_type": care_type, "frequency_days": body["frequency_days"]});
    g.schedules.push(created.clone());
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_events(State(g): State<Shared>, Path(id): Path<i64>) -> Json<Value> {
    Json(Value::Array(for_plant(&g.lock().unwrap().events, id)))
}

async fn create_event(
    State(g): State<Shared>,
    Path(id): Path<i64>,
    Query(q): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Reply {
    let mut g = g.lock().unwrap();
    if !g.plants.iter().any(|p| p["id"] == id) {
        return Err(not_found("Plant"));
    }
    let eid = g.next_id();
    let mut created = event(
        eid,
        id,
        body["care_type"].as_str().unwrap_or_default(),
        body["event_date"].as_str().unwrap_or_default(),
    );
    created["user_id"] = json!(q.get("user_id").and_then(|u| u.parse::<i64>().ok()));
    created["notes"] = body.get("notes").cloned().unwrap_or(Value::Null);
    g.events.push(created.clone());
    Ok((StatusCode::CREATED, Json(created)))
}

async fn care_photo(
    State(g): State<Shared>,
    Path((plant_id, event_id)): Path<(i64, i64)>,
    mut multipart: Multipart,
) -> Reply {
    let mut file_name = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
        }
    }
    let mut g = g.lock().unwrap();
    let event = g
        .events
        .iter_mut()
        .find(|e| e["id"] == event_id && e["plant_id"] == plant_id)
        .ok_or_else(|| not_found("Care event"))?;
    event["photo_filename"] = json!(file_name);
    Ok((StatusCode::OK, Json(event.clone())))
}

async fn costs(State(g): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let season: Option<i64> = q.get("season_id").and_then(|s| s.parse().ok());
    let g = g.lock().unwrap();
    let list = g
        .costs
        .iter()
        .filter(|c| season.map_or(true, |s| c["season_id"] == s))
        .cloned()
        .collect();
    Json(Value::Array(list))
}

async fn delete_cost(State(g): State<Shared>, Path(id): Path<i64>) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut g = g.lock().unwrap();
    let before = g.costs.len();
    g.costs.retain(|c| c["id"] != id);
    if g.costs.len() == before {
        return Err(not_found("Cost entry"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn cost_total(State(g): State<Shared>, Path(season_id): Path<i64>) -> Json<Value> {
    let g = g.lock().unwrap();
    let mut by_category: Vec<(String, f64)> = Vec::new();
    for c in g.costs.iter().filter(|c| c["season_id"] == season_id) {
        let category = c["category"].as_str().unwrap_or_default().to_string();
        let cost = c["cost"].as_f64().unwrap_or_default();
        match by_category.iter_mut().find(|(k, _)| *k == category) {
            Some((_, total)) => *total += cost,
            None => by_category.push((category, cost)),
        }
    }
    let total: f64 = by_category.iter().map(|(_, t)| t).sum();
    Json(json!({
        "season_id": season_id,
        "year": 2026,
        "total_cost": total,
        "by_category": by_category.iter().map(|(k, t)| json!({"category": k, "total": t})).collect::<Vec<_>>(),
    }))
}

async fn varieties(State(g): State<Shared>) -> Json<Value> {
    Json(Value::Array(g.lock().unwrap().varieties.clone()))
}

async fn create_variety(State(g): State<Shared>, Json(body): Json<Value>) -> Reply {
    let mut g = g.lock().unwrap();
    let id = g.next_id();
    let mut created = body;
    created["id"] = json!(id);
    g.varieties.push(created.clone());
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_batches(State(g): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let season: Option<i64> = q.get("season_id").and_then(|s| s.parse().ok());
    let g = g.lock().unwrap();
    let list = g
        .batches
        .iter()
        .filter(|b| season.map_or(true, |s| b["season_id"] == s))
        .cloned()
        .collect();
    Json(Value::Array(list))
}

async fn get_batch(State(g): State<Shared>, Path(id): Path<i64>) -> Reply {
    let g = g.lock().unwrap();
    g.batches
        .iter()
        .find(|b| b["id"] == id)
        .map(|b| (StatusCode::OK, Json(b.clone())))
        .ok_or_else(|| not_found("Plant batch"))
}

async fn create_batch(
    State(g): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Reply {
    let mut g = g.lock().unwrap();
    if !g.varieties.iter().any(|v| v["id"] == body["variety_id"]) {
        return Err(not_found("Plant variety"));
    }
    let id = g.next_id();
    let mut created = body;
    created["id"] = json!(id);
    created["user_id"] = json!(user_id_of(&q));
    g.batches.push(created.clone());
    Ok((StatusCode::CREATED, Json(created)))
}

async fn create_batch_event(
    State(g): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Reply {
    let mut g = g.lock().unwrap();
    if !g.batches.iter().any(|b| b["id"] == body["batch_id"]) {
        return Err(not_found("Plant batch"));
    }
    let id = g.next_id();
    let mut created = body;
    created["id"] = json!(id);
    created["user_id"] = json!(user_id_of(&q));
    g.batch_events.push(created.clone());
    Ok((StatusCode::CREATED, Json(created)))
}

async fn batch_timeline(State(g): State<Shared>, Path(id): Path<i64>) -> Json<Value> {
    let g = g.lock().unwrap();
    let list = g.batch_events.iter().filter(|e| e["batch_id"] == id).cloned().collect();
    Json(Value::Array(list))
}

async fn upload_photo(
    State(g): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
    mut multipart: Multipart,
) -> Reply {
    let mut file_name = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
        }
    }
    let batch_id: Option<i64> = q.get("batch_id").and_then(|b| b.parse().ok());
    let mut g = g.lock().unwrap();
    if !g.batches.iter().any(|b| Some(b["id"].as_i64().unwrap_or_default()) == batch_id) {
        return Err(not_found("Plant batch"));
    }
    let id = g.next_id();
    let created = json!({
        "id": id,
        "batch_id": batch_id,
        "user_id": user_id_of(&q),
        "filename": file_name,
        "caption": q.get("caption"),
    });
    g.photos.push(created.clone());
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_distributions(State(g): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let batch: Option<i64> = q.get("batch_id").and_then(|b| b.parse().ok());
    let g = g.lock().unwrap();
    let list = g
        .distributions
        .iter()
        .filter(|d| batch.map_or(true, |b| d["batch_id"] == b))
        .cloned()
        .collect();
    Json(Value::Array(list))
}

async fn create_distribution(
    State(g): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Reply {
    let mut g = g.lock().unwrap();
    let id = g.next_id();
    let mut created = body;
    created["id"] = json!(id);
    created["user_id"] = json!(user_id_of(&q));
    g.distributions.push(created.clone());
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_distribution(
    State(g): State<Shared>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut g = g.lock().unwrap();
    let before = g.distributions.len();
    g.distributions.retain(|d| d["id"] != id);
    if g.distributions.len() == before {
        return Err(not_found("Distribution"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn distribution_summary(State(g): State<Shared>, Path(batch_id): Path<i64>) -> Json<Value> {
    let g = g.lock().unwrap();
    let rows: Vec<&Value> = g.distributions.iter().filter(|d| d["batch_id"] == batch_id).collect();
    let count = |kind: &str| rows.iter().filter(|d| d["type"] == kind).count();
    Json(json!({
        "batch_id": batch_id,
        "total_distributed": rows.len(),
        "total_quantity": rows.iter().map(|d| d["quantity"].as_i64().unwrap_or(0)).sum::<i64>(),
        "gifts": count("gift"),
        "trades": count("trade"),
        "recipients": rows.iter().map(|d| d["recipient"].clone()).collect::<Vec<_>>(),
    }))
}

async fn identify(mut multipart: Multipart) -> Reply {
    let mut file_name = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
        }
    }
    match file_name {
        Some(_) => Ok((
            StatusCode::OK,
            Json(json!({
                "common_name": "Peace Lily",
                "scientific_name": "Spathiphyllum wallisii",
                "description": "Glossy dark leaves with white spathes.",
                "confidence": 0.87,
                "care_tips": ["Keep soil lightly moist", "Bright indirect light"],
            })),
        )),
        None => Err((StatusCode::BAD_REQUEST, Json(json!({"detail": "No filename provided"})))),
    }
}

pub fn router(garden: Shared) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/users", get(users))
        .route("/users/:id/stats", get(stats))
        .route("/seasons/", get(seasons))
        .route("/individual-plants", get(list_plants).post(create_plant))
        .route("/individual-plants/:id", get(get_plant))
        .route("/individual-plants/:id/care-schedule", get(list_schedules).post(upsert_schedule))
        .route("/individual-plants/:id/care-events", get(list_events).post(create_event))
        .route("/individual-plants/:id/care-events/:event_id/photo", post(care_photo))
        .route("/costs/", get(costs))
        .route("/costs/:id", delete(delete_cost))
        .route("/costs/season/:id/total", get(cost_total))
        .route("/plants/varieties", get(varieties).post(create_variety))
        .route("/plants/batches", get(list_batches).post(create_batch))
        .route("/plants/batches/:id", get(get_batch))
        .route("/events/", post(create_batch_event))
        .route("/events/batch/:id/timeline", get(batch_timeline))
        .route("/photos/upload", post(upload_photo))
        .route("/distributions/", get(list_distributions).post(create_distribution))
        .route("/distributions/:id", delete(delete_distribution))
        .route("/distributions/batch/:id/summary", get(distribution_summary))
        .route("/identify/", post(identify))
        .layer(middleware::from_fn_with_state(garden.clone(), record))
        .with_state(garden)
}

/// Serves the fake backend and returns its base URL.
pub async fn spawn(garden: Garden) -> (String, Shared) {
    let shared: Shared = Arc::new(Mutex::new(garden));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(shared.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), shared)
}
