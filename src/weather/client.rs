use std::time::Duration;

use anyhow::Context;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, warn};

use crate::{
    config::WeatherConfig,
    error::{AppError, AppResult},
    weather::dto::{
        daily_from_upstream, hourly_from_upstream, CurrentWeather, DailyTemperature,
        HourlyForecast, NewsApiResponse, OmForecast, OwCurrent, OwForecast, OwUvIndex,
        WeatherNews,
    },
};

const USER_AGENT: &str = "WeatherDashboardApp/1.0";
const NEWS_QUERY: &str = "weather+forecast+climate+storm+rain+temperature";
const NEWS_PAGE_SIZE: &str = "6";

/// Thin proxy over the third-party weather and news APIs.
#[derive(Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    cfg: WeatherConfig,
}

impl WeatherClient {
    pub fn new(cfg: WeatherConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self { http, cfg })
    }

    fn display_offset(&self) -> UtcOffset {
        UtcOffset::from_whole_seconds(self.cfg.display_utc_offset_minutes * 60)
            .unwrap_or(UtcOffset::UTC)
    }

    async fn get_json<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> AppResult<T> {
        let resp = req
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("{what}: {e}")))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("{what}: not found")));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("{what}: status {status}: {body}")));
        }
        resp.json::<T>()
            .await
            .map_err(|e| AppError::Upstream(format!("{what}: unexpected payload: {e}")))
    }

    async fn fetch_current(&self, city: &str) -> AppResult<OwCurrent> {
        let url = format!("{}/data/2.5/weather", self.cfg.openweather_base_url);
        let req = self.http.get(url).query(&[
            ("q", city),
            ("appid", self.cfg.openweather_api_key.as_str()),
            ("units", "metric"),
        ]);
        self.get_json(req, "current weather").await
    }

    /// UV index is decoration; failures degrade to 0.
    async fn uv_index(&self, lat: f64, lon: f64) -> i32 {
        let url = format!("{}/data/2.5/uvi", self.cfg.openweather_base_url);
        let req = self.http.get(url).query(&[
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("appid", self.cfg.openweather_api_key.clone()),
        ]);
        match self.get_json::<OwUvIndex>(req, "uv index").await {
            Ok(uv) => uv.value as i32,
            Err(e) => {
                warn!(error = %e, "uv index unavailable");
                0
            }
        }
    }

    pub async fn current(&self, city: &str) -> AppResult<CurrentWeather> {
        let raw = self.fetch_current(city).await?;
        let uv = self.uv_index(raw.coord.lat, raw.coord.lon).await;
        debug!(city, "current weather fetched");
        Ok(CurrentWeather::from_upstream(city, raw, uv, OffsetDateTime::now_utc()))
    }

    pub async fn hourly(&self, city: &str) -> AppResult<Vec<HourlyForecast>> {
        let url = format!("{}/data/2.5/forecast", self.cfg.openweather_base_url);
        let req = self.http.get(url).query(&[
            ("q", city),
            ("appid", self.cfg.openweather_api_key.as_str()),
            ("units", "metric"),
        ]);
        let raw: OwForecast = self.get_json(req, "hourly forecast").await?;
        Ok(hourly_from_upstream(raw))
    }

    /// Seven-day min/max, located through the current-weather coordinates.
    pub async fn daily_temperatures(&self, city: &str) -> AppResult<Vec<DailyTemperature>> {
        let current = self.fetch_current(city).await?;
        let url = format!("{}/v1/forecast", self.cfg.open_meteo_base_url);
        let req = self.http.get(url).query(&[
            ("latitude", current.coord.lat.to_string()),
            ("longitude", current.coord.lon.to_string()),
            ("daily", "temperature_2m_max,temperature_2m_min".to_string()),
            ("timezone", "auto".to_string()),
        ]);
        let raw: OmForecast = self.get_json(req, "daily temperatures").await?;
        Ok(daily_from_upstream(raw))
    }

    pub async fn news(&self) -> AppResult<WeatherNews> {
        // The query's `+` separators are meant literally, so it goes into the
        // URL as-is instead of through `query()`.
        let url = format!(
            "{}/v2/everything?q={NEWS_QUERY}&language=en&sortBy=publishedAt&pageSize={NEWS_PAGE_SIZE}",
            self.cfg.news_base_url
        );
        let req = self
            .http
            .get(url)
            .query(&[("apiKey", self.cfg.news_api_key.as_str())]);
        let raw: NewsApiResponse = self.get_json(req, "weather news").await?;
        Ok(WeatherNews::from_upstream(raw, self.display_offset()))
    }
}
