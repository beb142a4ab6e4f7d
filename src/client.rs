// src/client.rs
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::models::*;
use crate::validation::ValidatedJson;
use crate::AppError;

/// 后端 REST API 的类型化客户端。没有重试，失败直接返回 AppError
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(config.api_url.clone(), config.timeout)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request_id = Uuid::new_v4();
        tracing::debug!(method = %method, path, request_id = %request_id, "API request");
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("x-request-id", request_id.to_string())
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, AppError> {
        let response = check_status(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty(builder: RequestBuilder) -> Result<(), AppError> {
        check_status(builder.send().await?).await?;
        Ok(())
    }

    async fn post_json<B, T>(&self, path: &str, user_id: Option<i32>, body: &B) -> Result<T, AppError>
    where
        B: Validate + Serialize,
        T: DeserializeOwned,
    {
        let body = ValidatedJson::new(body)?;
        let mut builder = self.request(Method::POST, path).json(&body);
        if let Some(user_id) = user_id {
            builder = builder.query(&[("user_id", user_id)]);
        }
        Self::send(builder).await
    }

    // --- 1. 认证与用户 ---

    pub async fn login(&self, pin: &str) -> Result<User, AppError> {
        let body = PinLoginSchema { pin: pin.trim().to_string() };
        self.post_json("/auth/login", None, &body).await
    }

    pub async fn users(&self) -> Result<Vec<User>, AppError> {
        Self::send(self.request(Method::GET, "/users")).await
    }

    pub async fn user_stats(&self, user_id: i32) -> Result<UserStats, AppError> {
        Self::send(self.request(Method::GET, &format!("/users/{}/stats", user_id))).await
    }

    pub async fn seasons(&self) -> Result<Vec<Season>, AppError> {
        Self::send(self.request(Method::GET, "/seasons/")).await
    }

    // --- 2. 品种与批次 ---

    pub async fn varieties(&self) -> Result<Vec<Variety>, AppError> {
        Self::send(self.request(Method::GET, "/plants/varieties")).await
    }

    pub async fn create_variety(&self, new: &CreateVarietySchema) -> Result<Variety, AppError> {
        self.post_json("/plants/varieties", None, new).await
    }

    pub async fn batches(&self, season_id: i32) -> Result<Vec<Batch>, AppError> {
        let builder = self
            .request(Method::GET, "/plants/batches")
            .query(&[("season_id", season_id)]);
        Self::send(builder).await
    }

    pub async fn batch(&self, batch_id: i32) -> Result<Batch, AppError> {
        Self::send(self.request(Method::GET, &format!("/plants/batches/{}", batch_id))).await
    }

    pub async fn create_batch(&self, user_id: i32, new: &CreateBatchSchema) -> Result<Batch, AppError> {
        self.post_json("/plants/batches", Some(user_id), new).await
    }

    pub async fn create_event(
        &self,
        user_id: i32,
        new: &CreateLifecycleEventSchema,
    ) -> Result<LifecycleEvent, AppError> {
        self.post_json("/events/", Some(user_id), new).await
    }

    pub async fn batch_timeline(&self, batch_id: i32) -> Result<Vec<LifecycleEvent>, AppError> {
        Self::send(self.request(Method::GET, &format!("/events/batch/{}/timeline", batch_id))).await
    }

    pub async fn upload_photo(
        &self,
        user_id: i32,
        batch_id: i32,
        upload: PhotoUpload,
    ) -> Result<Photo, AppError> {
        upload.validate()?;
        let mut builder = self
            .request(Method::POST, "/photos/upload")
            .query(&[("user_id", user_id), ("batch_id", batch_id)]);
        if let Some(caption) = &upload.caption {
            builder = builder.query(&[("caption", caption)]);
        }
        Self::send(builder.multipart(photo_form(upload))).await
    }

    // --- 3. 室内植物与护理 ---

    pub async fn identify_plant(&self, upload: PhotoUpload) -> Result<IdentifyResult, AppError> {
        upload.validate()?;
        let builder = self.request(Method::POST, "/identify/").multipart(photo_form(upload));
        Self::send(builder).await
    }

    pub async fn individual_plants(&self, user_id: i32) -> Result<Vec<IndividualPlant>, AppError> {
        let builder = self
            .request(Method::GET, "/individual-plants")
            .query(&[("user_id", user_id)]);
        Self::send(builder).await
    }

    pub async fn individual_plant(&self, plant_id: i32) -> Result<IndividualPlant, AppError> {
        Self::send(self.request(Method::GET, &format!("/individual-plants/{}", plant_id))).await
    }

    pub async fn create_individual_plant(
        &self,
        user_id: i32,
        new: &CreatePlantSchema,
    ) -> Result<IndividualPlant, AppError> {
        self.post_json("/individual-plants", Some(user_id), new).await
    }

    pub async fn care_schedules(&self, plant_id: i32) -> Result<Vec<CareSchedule>, AppError> {
        let path = format!("/individual-plants/{}/care-schedule", plant_id);
        Self::send(self.request(Method::GET, &path)).await
    }

    /// 同一护理类型再次提交会替换旧的周期
    pub async fn set_care_schedule(
        &self,
        plant_id: i32,
        user_id: i32,
        new: &CreateCareScheduleSchema,
    ) -> Result<CareSchedule, AppError> {
        let path = format!("/individual-plants/{}/care-schedule", plant_id);
        self.post_json(&path, Some(user_id), new).await
    }

    pub async fn care_events(&self, plant_id: i32) -> Result<Vec<CareEvent>, AppError> {
        let path = format!("/individual-plants/{}/care-events", plant_id);
        Self::send(self.request(Method::GET, &path)).await
    }

    pub async fn log_care_event(
        &self,
        plant_id: i32,
        user_id: i32,
        new: &CreateCareEventSchema,
    ) -> Result<CareEvent, AppError> {
        let path = format!("/individual-plants/{}/care-events", plant_id);
        self.post_json(&path, Some(user_id), new).await
    }

    pub async fn upload_care_photo(
        &self,
        plant_id: i32,
        event_id: i32,
        user_id: i32,
        upload: PhotoUpload,
    ) -> Result<CareEvent, AppError> {
        upload.validate()?;
        let path = format!("/individual-plants/{}/care-events/{}/photo", plant_id, event_id);
        let builder = self
            .request(Method::POST, &path)
            .query(&[("user_id", user_id)])
            .multipart(photo_form(upload));
        Self::send(builder).await
    }

    // --- 4. 花费 ---

    pub async fn costs(&self, season_id: i32) -> Result<Vec<SeasonCost>, AppError> {
        let builder = self
            .request(Method::GET, "/costs/")
            .query(&[("season_id", season_id)]);
        Self::send(builder).await
    }

    pub async fn create_cost(&self, user_id: i32, new: &CreateCostSchema) -> Result<SeasonCost, AppError> {
        self.post_json("/costs/", Some(user_id), new).await
    }

    pub async fn delete_cost(&self, cost_id: i32) -> Result<(), AppError> {
        Self::send_empty(self.request(Method::DELETE, &format!("/costs/{}", cost_id))).await
    }

    pub async fn season_cost_total(&self, season_id: i32) -> Result<SeasonCostTotal, AppError> {
        let path = format!("/costs/season/{}/total", season_id);
        Self::send(self.request(Method::GET, &path)).await
    }

    // --- 5. 赠送 / 交换 ---

    pub async fn distributions(&self, batch_id: Option<i32>) -> Result<Vec<Distribution>, AppError> {
        let mut builder = self.request(Method::GET, "/distributions/");
        if let Some(batch_id) = batch_id {
            builder = builder.query(&[("batch_id", batch_id)]);
        }
        Self::send(builder).await
    }

    pub async fn create_distribution(
        &self,
        user_id: i32,
        new: &CreateDistributionSchema,
    ) -> Result<Distribution, AppError> {
        self.post_json("/distributions/", Some(user_id), new).await
    }

    pub async fn delete_distribution(&self, distribution_id: i32) -> Result<(), AppError> {
        let path = format!("/distributions/{}", distribution_id);
        Self::send_empty(self.request(Method::DELETE, &path)).await
    }

    pub async fn distribution_summary(&self, batch_id: i32) -> Result<DistributionSummary, AppError> {
        let path = format!("/distributions/batch/{}/summary", batch_id);
        Self::send(self.request(Method::GET, &path)).await
    }
}

fn photo_form(upload: PhotoUpload) -> Form {
    let part = Part::bytes(upload.bytes).file_name(upload.file_name);
    Form::new().part("file", part)
}

/// 非 2xx 统一转成 AppError::Api，尽量带上后端的 detail 字段
async fn check_status(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("detail").map(|d| match d {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        })
        .or_else(|| (!body.trim().is_empty()).then(|| body.clone()));

    tracing::warn!(status = status.as_u16(), detail = ?detail, "API returned an error");
    Err(AppError::Api {
        status: status.as_u16(),
        detail,
    })
}
