//! Upstream payloads (OpenWeather, Open-Meteo, NewsAPI) and the simplified
//! shapes served to the dashboard.

use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date, OffsetDateTime, UtcOffset};

// ---- upstream: OpenWeather ----

#[derive(Debug, Deserialize)]
pub struct OwCurrent {
    pub coord: OwCoord,
    pub weather: Vec<OwCondition>,
    pub main: OwMain,
    #[serde(default)]
    pub visibility: Option<f64>,
    pub wind: OwWind,
    #[serde(default)]
    pub clouds: Option<OwClouds>,
    #[serde(default)]
    pub rain: Option<OwRain>,
    pub sys: OwSys,
    /// Shift from UTC in seconds.
    #[serde(default)]
    pub timezone: i32,
}

#[derive(Debug, Deserialize)]
pub struct OwCoord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct OwCondition {
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Deserialize)]
pub struct OwMain {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
    #[serde(default)]
    pub dew_point: f64,
}

#[derive(Debug, Deserialize)]
pub struct OwWind {
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
}

#[derive(Debug, Deserialize)]
pub struct OwClouds {
    #[serde(default)]
    pub all: f64,
}

#[derive(Debug, Deserialize)]
pub struct OwRain {
    #[serde(rename = "1h", default)]
    pub one_hour: f64,
}

#[derive(Debug, Deserialize)]
pub struct OwSys {
    #[serde(default)]
    pub country: String,
    pub sunrise: i64,
    pub sunset: i64,
}

#[derive(Debug, Deserialize)]
pub struct OwUvIndex {
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct OwForecast {
    pub list: Vec<OwForecastEntry>,
    #[serde(default)]
    pub city: Option<OwForecastCity>,
}

#[derive(Debug, Deserialize)]
pub struct OwForecastEntry {
    pub dt: i64,
    pub main: OwForecastMain,
}

#[derive(Debug, Deserialize)]
pub struct OwForecastMain {
    pub temp: f64,
}

#[derive(Debug, Deserialize)]
pub struct OwForecastCity {
    #[serde(default)]
    pub timezone: i32,
}

// ---- upstream: Open-Meteo ----

#[derive(Debug, Deserialize)]
pub struct OmForecast {
    pub daily: OmDaily,
}

#[derive(Debug, Deserialize)]
pub struct OmDaily {
    pub time: Vec<String>,
    pub temperature_2m_max: Vec<Option<f64>>,
    pub temperature_2m_min: Vec<Option<f64>>,
}

// ---- upstream: NewsAPI ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsApiResponse {
    pub status: String,
    #[serde(default)]
    pub total_results: i64,
    #[serde(default)]
    pub articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsApiArticle {
    pub source: NewsApiSource,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct NewsApiSource {
    pub name: Option<String>,
}

// ---- served to the client ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: i32,
    pub pressure: i32,
    pub wind_speed: f64,
    pub wind_direction: i32,
    pub cloud_cover: i32,
    pub visibility: i32,
    pub weather_description: Option<String>,
    pub weather_icon: Option<String>,
    pub dew_point: f64,
    pub uv_index: i32,
    pub precipitation: f64,
    pub week_day: String,
    pub time: String,
    pub city: String,
    /// ISO 3166 alpha-2 code as reported upstream.
    pub country: String,
    pub sunrise: String,
    pub sunset: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct HourlyForecast {
    pub time: String,
    pub temperature: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTemperature {
    pub day: String,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TemperatureResponse {
    pub daily: Vec<DailyTemperature>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherNews {
    pub status: String,
    pub total_results: i64,
    pub articles: Vec<WeatherArticle>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherArticle {
    pub name: Option<String>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: String,
}

// ---- mapping ----

fn offset_from_seconds(seconds: i32) -> UtcOffset {
    UtcOffset::from_whole_seconds(seconds).unwrap_or(UtcOffset::UTC)
}

fn clock(t: OffsetDateTime) -> String {
    t.format(format_description!("[hour repr:12]:[minute] [period]"))
        .unwrap_or_default()
}

fn clock_at(unix: i64, offset: UtcOffset) -> String {
    OffsetDateTime::from_unix_timestamp(unix)
        .map(|t| clock(t.to_offset(offset)))
        .unwrap_or_default()
}

impl CurrentWeather {
    pub fn from_upstream(city: &str, raw: OwCurrent, uv_index: i32, now: OffsetDateTime) -> Self {
        let offset = offset_from_seconds(raw.timezone);
        let local_now = now.to_offset(offset);
        let condition = raw.weather.into_iter().next();
        Self {
            temperature: raw.main.temp,
            feels_like: raw.main.feels_like,
            humidity: raw.main.humidity.round() as i32,
            pressure: raw.main.pressure.round() as i32,
            wind_speed: raw.wind.speed,
            wind_direction: raw.wind.deg.round() as i32,
            cloud_cover: raw.clouds.map(|c| c.all as i32).unwrap_or(0),
            visibility: raw.visibility.map(|v| v as i32).unwrap_or(0),
            weather_description: condition.as_ref().map(|c| c.description.clone()),
            weather_icon: condition.map(|c| c.icon),
            dew_point: raw.main.dew_point,
            uv_index,
            precipitation: raw.rain.map(|r| r.one_hour).unwrap_or(0.0),
            week_day: local_now.weekday().to_string(),
            time: clock(local_now),
            city: city.to_string(),
            country: raw.sys.country,
            sunrise: clock_at(raw.sys.sunrise, offset),
            sunset: clock_at(raw.sys.sunset, offset),
            latitude: raw.coord.lat,
            longitude: raw.coord.lon,
        }
    }
}

/// Roughly the next 24 hours: upstream entries are three hours apart.
pub const HOURLY_ENTRIES: usize = 8;

pub fn hourly_from_upstream(raw: OwForecast) -> Vec<HourlyForecast> {
    let offset = offset_from_seconds(raw.city.map(|c| c.timezone).unwrap_or(0));
    raw.list
        .into_iter()
        .take(HOURLY_ENTRIES)
        .map(|e| HourlyForecast {
            time: OffsetDateTime::from_unix_timestamp(e.dt)
                .map(|t| {
                    t.to_offset(offset)
                        .format(format_description!(
                            "[hour repr:12 padding:none]:[minute] [period]"
                        ))
                        .unwrap_or_default()
                })
                .unwrap_or_default(),
            temperature: e.main.temp,
        })
        .collect()
}

pub fn daily_from_upstream(raw: OmForecast) -> Vec<DailyTemperature> {
    let d = raw.daily;
    d.time
        .iter()
        .zip(d.temperature_2m_min)
        .zip(d.temperature_2m_max)
        .filter_map(|((day, min_temp), max_temp)| {
            let date = Date::parse(day, format_description!("[year]-[month]-[day]")).ok()?;
            Some(DailyTemperature {
                day: date.weekday().to_string(),
                min_temp,
                max_temp,
            })
        })
        .collect()
}

impl WeatherNews {
    pub fn from_upstream(raw: NewsApiResponse, display_offset: UtcOffset) -> Self {
        let articles = raw
            .articles
            .into_iter()
            .map(|a| WeatherArticle {
                name: a.source.name,
                author: a.author,
                title: a.title,
                description: a.description,
                url: a.url,
                url_to_image: a.url_to_image,
                published_at: a
                    .published_at
                    .to_offset(display_offset)
                    .format(format_description!(
                        "[year]-[month]-[day] [hour repr:12]:[minute] [period]"
                    ))
                    .unwrap_or_default(),
            })
            .collect();
        Self {
            status: raw.status,
            total_results: raw.total_results,
            articles,
        }
    }
}
