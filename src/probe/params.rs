//! Lenient deserializers for lookup keyword parameters.
//!
//! Automation engines frequently hand templated values over as strings, so
//! numeric and boolean parameters accept both their native JSON form and a
//! string rendering of it.

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum IntParam {
    Int(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FloatParam {
    Float(f64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagParam {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn to_int<E: de::Error>(raw: IntParam) -> Result<i64, E> {
    match raw {
        IntParam::Int(n) => Ok(n),
        IntParam::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("expected an integer, got {:?}", s))),
    }
}

fn to_u16<E: de::Error>(raw: IntParam, what: &str) -> Result<u16, E> {
    let n = to_int::<E>(raw)?;
    u16::try_from(n).map_err(|_| E::custom(format!("{} {} is out of range", what, n)))
}

/// Port number: integer or numeric string in `0..=65535`.
pub fn port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<IntParam>::deserialize(deserializer)?
        .map(|raw| to_u16(raw, "port"))
        .transpose()
}

/// List of HTTP status codes, each an integer or numeric string.
pub fn status_codes<'de, D>(deserializer: D) -> Result<Option<Vec<u16>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<IntParam>>::deserialize(deserializer)?
        .map(|codes| {
            codes
                .into_iter()
                .map(|raw| to_u16(raw, "status code"))
                .collect::<Result<Vec<u16>, D::Error>>()
        })
        .transpose()
}

/// Seconds as a number or numeric string.
pub fn seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<FloatParam>::deserialize(deserializer)? {
        None => Ok(None),
        Some(FloatParam::Float(secs)) => Ok(Some(secs)),
        Some(FloatParam::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected a number of seconds, got {:?}", s))),
    }
}

/// Boolean with the usual string spellings (`yes`/`no`, `true`/`false`, `on`/`off`, `1`/`0`).
pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<FlagParam>::deserialize(deserializer)? {
        None => Ok(None),
        Some(FlagParam::Bool(b)) => Ok(Some(b)),
        Some(FlagParam::Int(0)) => Ok(Some(false)),
        Some(FlagParam::Int(1)) => Ok(Some(true)),
        Some(FlagParam::Int(n)) => Err(de::Error::custom(format!("expected a boolean, got {}", n))),
        Some(FlagParam::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" | "t" | "on" | "1" => Ok(Some(true)),
            "no" | "n" | "false" | "f" | "off" | "0" => Ok(Some(false)),
            _ => Err(de::Error::custom(format!("expected a boolean, got {:?}", s))),
        },
    }
}
