use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
    weather::dto::{CurrentWeather, HourlyForecast, TemperatureResponse, WeatherNews},
};

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    #[serde(default)]
    pub city: String,
}

pub fn weather_routes() -> Router<AppState> {
    Router::new()
        .route("/api/weather/current", get(current_weather))
        .route("/api/weather/hourly", get(hourly_forecast))
        .route("/api/temperature/:city", get(temperature))
        .route("/api/weathernews", get(weather_news))
}

fn require_city(city: &str) -> AppResult<&str> {
    let city = city.trim();
    if city.is_empty() {
        return Err(AppError::invalid("City name is required."));
    }
    Ok(city)
}

#[instrument(skip(state))]
pub async fn current_weather(
    State(state): State<AppState>,
    Query(q): Query<CityQuery>,
) -> AppResult<Json<CurrentWeather>> {
    let city = require_city(&q.city)?;
    Ok(Json(state.weather.current(city).await?))
}

#[instrument(skip(state))]
pub async fn hourly_forecast(
    State(state): State<AppState>,
    Query(q): Query<CityQuery>,
) -> AppResult<Json<Vec<HourlyForecast>>> {
    let city = require_city(&q.city)?;
    Ok(Json(state.weather.hourly(city).await?))
}

#[instrument(skip(state))]
pub async fn temperature(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> AppResult<Json<TemperatureResponse>> {
    let city = require_city(&city)?;
    let daily = state.weather.daily_temperatures(city).await?;
    Ok(Json(TemperatureResponse { daily }))
}

#[instrument(skip(state))]
pub async fn weather_news(State(state): State<AppState>) -> AppResult<Json<WeatherNews>> {
    Ok(Json(state.weather.news().await?))
}
