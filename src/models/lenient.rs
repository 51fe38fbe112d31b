// Plans are edited through web forms, so numeric fields arrive as either
// JSON numbers or strings.

use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, got {}",
            other
        ))),
    }
}

pub fn optional_seconds<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .map(|secs| Some(secs.min(u64::from(u32::MAX)) as u32))
            .ok_or_else(|| D::Error::custom(format!("invalid seconds value {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid seconds value {:?}", s))),
        Some(other) => Err(D::Error::custom(format!(
            "expected seconds, got {}",
            other
        ))),
    }
}

/// Whole, non-negative count from a JSON number (`3` or `3.0`) or a numeric
/// string (`"3"`).
pub fn whole_count(value: &Value) -> Option<u32> {
    let integral = |f: f64| {
        (f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX)).then_some(f as u32)
    };

    match value {
        Value::Number(n) => match n.as_u64() {
            Some(count) => u32::try_from(count).ok(),
            None => n.as_f64().and_then(integral),
        },
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u32>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}
