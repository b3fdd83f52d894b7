//! Record normalizer: one `RawPost` in, one fully-populated `CanonicalPost` out.
//! Every rule is independent of the others and none of them can fail; bad input
//! degrades to the field's default.

use crate::date::{epoch_to_rfc3339, normalize_rfc3339};
use crate::record::{CanonicalPost, RawPost};
use serde_json::Value;

pub const DEFAULT_AUTHOR: &str = "Unknown";

pub fn normalize(raw: &RawPost) -> CanonicalPost {
    CanonicalPost {
        id: text_or(raw.id.as_ref(), ""),
        title: text_or(raw.title.as_ref(), "").trim().to_string(),
        score: int_or_zero(raw.score.as_ref()),
        num_comments: int_or_zero(raw.num_comments.as_ref()),
        author: text_or(raw.author.as_ref(), DEFAULT_AUTHOR),
        created_utc: timestamp(raw.created_utc.as_ref()),
        url: text_or(raw.url.as_ref(), ""),
        over_18: strict_bool(raw.over_18.as_ref()),
        // A numeric `edited` means "edited at T"; it still collapses to false.
        edited: strict_bool(raw.edited.as_ref()),
        spoiler: strict_bool(raw.spoiler.as_ref()),
        stickied: strict_bool(raw.stickied.as_ref()),
    }
}

/// Only a JSON `true` is true.
fn strict_bool(v: Option<&Value>) -> bool {
    matches!(v, Some(Value::Bool(true)))
}

fn int_or_zero(v: Option<&Value>) -> i64 {
    match v {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| u.min(i64::MAX as u64) as i64))
            .or_else(|| n.as_f64().and_then(truncate_f64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate_f64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn truncate_f64(f: f64) -> Option<i64> {
    if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

fn text_or(v: Option<&Value>, default: &str) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

fn timestamp(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::Number(n) => n.as_f64().and_then(epoch_to_rfc3339),
        Value::String(s) => normalize_rfc3339(s),
        _ => None,
    }
}
