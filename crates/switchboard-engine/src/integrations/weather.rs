//! Current-weather integration backed by Nominatim geocoding and the
//! Open-Meteo forecast API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::integrations::{HandlerError, HandlerReply, Integration, IntegrationHandler};

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
const DEFAULT_LOCATION: &str = "Greenwich, London";
/// Placeholder for forecast fields the upstream response omitted.
const UNKNOWN_FIELD: &str = "<unknown>";

pub fn current_weather() -> Integration {
    Integration::new(
        "current_weather",
        "Get the weather for a given location",
        Arc::new(WeatherHandler::new()),
    )
    .with_argument(
        "location",
        "The location to get the weather for. By default, this is set to Greenwich, London.",
        false,
    )
    .with_argument(
        "units",
        "The units to use for the temperature (metric, imperial, or scientific). By default, this is set to metric.",
        false,
    )
}

struct WeatherHandler {
    http: reqwest::Client,
}

impl WeatherHandler {
    fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(30))
                .user_agent("switchboard/0.1")
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    async fn geocode(&self, location: &str) -> Result<Option<GeoHit>, HandlerError> {
        let hits: Vec<GeoHit> = self
            .http
            .get(NOMINATIM_URL)
            .query(&[
                ("addressdetails", "1"),
                ("q", location),
                ("format", "jsonv2"),
                ("limit", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(hits.into_iter().next())
    }

    async fn forecast(&self, hit: &GeoHit, units: Units) -> Result<Forecast, HandlerError> {
        let mut query = vec![
            ("latitude", hit.lat.clone()),
            ("longitude", hit.lon.clone()),
            ("current", "temperature_2m,is_day,weather_code".to_string()),
            (
                "daily",
                "weather_code,temperature_2m_max,temperature_2m_min".to_string(),
            ),
            ("timezone", "auto".to_string()),
            ("forecast_days", "1".to_string()),
        ];
        if units == Units::Imperial {
            query.push(("temperature_unit", "fahrenheit".to_string()));
        }
        let forecast = self
            .http
            .get(OPEN_METEO_URL)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(forecast)
    }
}

#[async_trait]
impl IntegrationHandler for WeatherHandler {
    async fn call(&self, args: &Value) -> Result<HandlerReply, HandlerError> {
        let location = args
            .get("location")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_LOCATION);
        let units = Units::parse(args.get("units").and_then(Value::as_str).unwrap_or_default());

        debug!(location, ?units, "looking up weather");
        let Some(hit) = self.geocode(location).await? else {
            return Ok(HandlerReply::failed(format!(
                "The weather in {location} is unknown"
            )));
        };
        let forecast = self.forecast(&hit, units).await?;
        Ok(HandlerReply::completed(build_report(
            &hit.display_name,
            &forecast,
            units,
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Units {
    Metric,
    Imperial,
    Scientific,
}

impl Units {
    fn parse(raw: &str) -> Self {
        let raw = raw.to_ascii_lowercase();
        if raw.contains("imperial") || raw.contains("fahrenheit") {
            Units::Imperial
        } else if raw.contains("scientific") || raw.contains("kelvin") {
            Units::Scientific
        } else {
            Units::Metric
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
            Units::Scientific => "K",
        }
    }

    /// Scientific readings are requested in celsius and shifted here.
    fn convert(self, value: f64) -> f64 {
        match self {
            Units::Scientific => value + 273.15,
            _ => value,
        }
    }
}

/// Nominatim search hit. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct GeoHit {
    lat: String,
    lon: String,
    display_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Forecast {
    current: Option<CurrentConditions>,
    daily: Option<DailyForecast>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CurrentConditions {
    temperature_2m: Option<f64>,
    is_day: Option<u8>,
    weather_code: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DailyForecast {
    weather_code: Vec<Option<u32>>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
}

fn build_report(display_name: &str, forecast: &Forecast, units: Units) -> String {
    let current = forecast.current.as_ref();
    let daily = forecast.daily.as_ref();
    let is_day = current.and_then(|c| c.is_day).unwrap_or(0) == 1;

    let current_temp = format_temperature(current.and_then(|c| c.temperature_2m), units);
    let current_sky = describe(current.and_then(|c| c.weather_code), is_day);
    let today_sky = describe(
        daily.and_then(|d| d.weather_code.first().copied().flatten()),
        is_day,
    );
    let high = format_temperature(
        daily.and_then(|d| d.temperature_2m_max.first().copied().flatten()),
        units,
    );
    let low = format_temperature(
        daily.and_then(|d| d.temperature_2m_min.first().copied().flatten()),
        units,
    );

    format!(
        "The weather in {display_name} is currently {current_temp} and {current_sky}.\n\n\
         Today, the weather is expected to be {today_sky}, with a high of {high} and a low of {low}."
    )
}

fn format_temperature(value: Option<f64>, units: Units) -> String {
    match value {
        Some(v) => format!("{}{}", units.convert(v), units.suffix()),
        None => format!("{}{}", UNKNOWN_FIELD, units.suffix()),
    }
}

/// WMO weather interpretation codes, as published by Open-Meteo. Day
/// and night only differ for clear skies.
fn describe(code: Option<u32>, is_day: bool) -> &'static str {
    let Some(code) = code else {
        return UNKNOWN_FIELD;
    };
    match code {
        0 => {
            if is_day {
                "sunny"
            } else {
                "clear"
            }
        }
        1 => {
            if is_day {
                "mainly sunny"
            } else {
                "mainly clear"
            }
        }
        2 => "partly cloudy",
        3 => "overcast",
        45 => "foggy",
        48 => "depositing rime fog",
        51 => "light drizzle",
        53 => "drizzle",
        55 => "heavy drizzle",
        56 => "light freezing drizzle",
        57 => "freezing drizzle",
        61 => "light rain",
        63 => "rain",
        65 => "heavy rain",
        66 => "light freezing rain",
        67 => "freezing rain",
        71 => "light snow",
        73 => "snow",
        75 => "heavy snow",
        77 => "snow grains",
        80 => "light showers",
        81 => "showers",
        82 => "heavy showers",
        85 => "light snow showers",
        86 => "snow showers",
        95 => "thunderstorm",
        96 => "thunderstorm with light hail",
        99 => "thunderstorm with heavy hail",
        _ => UNKNOWN_FIELD,
    }
}
