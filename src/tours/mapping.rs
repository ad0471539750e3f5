//! Mapping of raw provider items into [`Tour`] records.
//!
//! The pricing API family returns two item shapes: a segment-based one
//! (`nightsInDest`, `route`, `cityFrom`, `local_departure`, `deep_link`) and
//! the flat `prices_for_dates` one (`departure_at`, `return_at`, `transfers`,
//! `origin`, `link`). Both are accepted. Mapping is fallible per item; the
//! caller decides what to do with an [`ItemError`].

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate};
use serde_json::Value;

use super::Tour;

/// Values the mapping needs besides the item itself
#[derive(Debug, Clone)]
pub struct MappingContext<'a> {
    /// Currency from the response envelope
    pub currency: &'a str,
    /// Prefix for relative booking links
    pub link_base: &'a str,
    /// Fallback for the route start when the item has no city
    pub origin: &'a str,
    /// Fallback for the route end when the item has no city
    pub destination: &'a str,
}

/// Why a single provider item could not be mapped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    NotAnObject,
    MissingField(&'static str),
    InvalidField { field: &'static str, value: String },
}

impl ItemError {
    /// Short label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            ItemError::NotAnObject => "not_an_object",
            ItemError::MissingField(_) => "missing_field",
            ItemError::InvalidField { .. } => "invalid_field",
        }
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemError::NotAnObject => write!(f, "item is not a JSON object"),
            ItemError::MissingField(field) => write!(f, "missing field '{}'", field),
            ItemError::InvalidField { field, value } => {
                write!(f, "invalid value for '{}': {}", field, value)
            }
        }
    }
}

impl std::error::Error for ItemError {}

/// Map one provider item into a [`Tour`]
pub fn map_flight(item: &Value, ctx: &MappingContext<'_>) -> Result<Tour, ItemError> {
    let obj = item.as_object().ok_or(ItemError::NotAnObject)?;

    let price = match obj.get("price") {
        Some(v) => parse_unsigned(v).ok_or_else(|| invalid("price", v))?,
        None => return Err(ItemError::MissingField("price")),
    };

    // An offer without a departure date is still shown, with the date left blank
    let departure_raw = first_str(item, &["local_departure", "departure_at"]);
    let departure_date = departure_raw
        .map(|raw| date_part(raw).to_string())
        .unwrap_or_default();

    let nights = match obj.get("nightsInDest").filter(|v| !v.is_null()) {
        Some(v) => parse_unsigned(v)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| invalid("nightsInDest", v))?,
        None => nights_at_destination(departure_raw, item)?,
    };

    let route = obj.get("route").and_then(Value::as_array);
    let flight_is_direct = match route {
        Some(segments) => segments.len() == 1,
        None => match obj.get("transfers").and_then(Value::as_u64) {
            Some(transfers) => {
                let back = obj
                    .get("return_transfers")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                transfers == 0 && back == 0
            }
            None => false,
        },
    };

    let city_from = first_str(item, &["cityFrom", "flyFrom", "origin"]).unwrap_or(ctx.origin);
    let city_to = first_str(item, &["cityTo", "flyTo", "destination"]).unwrap_or(ctx.destination);

    let mut airlines: BTreeSet<&str> = route
        .map(|segments| {
            segments
                .iter()
                .filter_map(|seg| seg.get("airline").and_then(Value::as_str))
                .filter(|a| !a.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if airlines.is_empty() {
        if let Some(airline) = first_str(item, &["airline"]) {
            airlines.insert(airline);
        }
    }

    let title = if airlines.is_empty() {
        format!("{} → {}", city_from, city_to)
    } else {
        let joined: Vec<&str> = airlines.into_iter().collect();
        format!("{} → {} ({})", city_from, city_to, joined.join(", "))
    };

    let url = first_str(item, &["deep_link", "link"]).map(|link| absolute_link(link, ctx.link_base));

    Ok(Tour {
        title,
        nights,
        price,
        currency: ctx.currency.to_string(),
        departure_date,
        flight_is_direct,
        url,
    })
}

fn invalid(field: &'static str, value: &Value) -> ItemError {
    ItemError::InvalidField {
        field,
        value: value.to_string(),
    }
}

/// First non-empty string among `keys`
fn first_str<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| item.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Accepts non-negative integers, integral-or-fractional floats (truncated) and numeric strings
fn parse_unsigned(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.trunc() as u64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.trunc() as u64)
            })
        }
        _ => None,
    }
}

fn date_part(raw: &str) -> &str {
    raw.get(..10).unwrap_or(raw)
}

/// Nights spent at the destination for items without `nightsInDest`.
///
/// When the item has `duration_to` (outbound flight minutes) and both
/// timestamps carry an offset, nights run from the local arrival date to the
/// return departure date, so an overnight outbound flight adds no night.
/// Otherwise this is the calendar-day gap between the two departure dates,
/// which overcounts by one when the outbound flight lands the next day.
fn nights_at_destination(departure_raw: Option<&str>, item: &Value) -> Result<u32, ItemError> {
    let return_raw = first_str(item, &["local_arrival_back", "return_at"])
        .ok_or(ItemError::MissingField("nightsInDest"))?;
    let departure_raw = departure_raw.ok_or(ItemError::MissingField("departure_at"))?;

    let flight_minutes = item
        .get("duration_to")
        .and_then(Value::as_i64)
        .filter(|minutes| *minutes > 0);
    if let (Some(minutes), Ok(depart), Ok(back)) = (
        flight_minutes,
        DateTime::parse_from_rfc3339(departure_raw),
        DateTime::parse_from_rfc3339(return_raw),
    ) {
        let arrival = (depart + Duration::minutes(minutes)).with_timezone(back.offset());
        return day_count(arrival.date_naive(), back.date_naive(), return_raw);
    }

    let departure_date = date_part(departure_raw);
    let return_date = date_part(return_raw);
    let depart = NaiveDate::parse_from_str(departure_date, "%Y-%m-%d").map_err(|_| {
        ItemError::InvalidField {
            field: "departure_at",
            value: departure_date.to_string(),
        }
    })?;
    let back = NaiveDate::parse_from_str(return_date, "%Y-%m-%d").map_err(|_| {
        ItemError::InvalidField {
            field: "return_at",
            value: return_date.to_string(),
        }
    })?;

    day_count(depart, back, return_raw)
}

fn day_count(from: NaiveDate, to: NaiveDate, return_raw: &str) -> Result<u32, ItemError> {
    u32::try_from((to - from).num_days()).map_err(|_| ItemError::InvalidField {
        field: "return_at",
        value: return_raw.to_string(),
    })
}

fn absolute_link(link: &str, link_base: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else if link.starts_with('/') {
        format!("{}{}", link_base, link)
    } else {
        format!("{}/{}", link_base, link)
    }
}
