use serde::Serialize;
use serde_json::Value;

use crate::error::NormalizeError;
use crate::source::RawObject;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    pub id: String,
    pub title: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
}

/// Map a raw `videos` resource onto the fixed record shape.
///
/// `id` and `snippet.title` are mandatory. The statistics counters default to 0 when
/// absent or null (hidden like counts, disabled comments). A counter that is present
/// but not a non-negative integer is rejected.
pub fn normalize(raw: &RawObject) -> Result<NormalizedRecord, NormalizeError> {
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .ok_or(NormalizeError::MissingField { field: "id" })?;
    let title = raw
        .get("snippet")
        .and_then(|snippet| snippet.get("title"))
        .and_then(Value::as_str)
        .ok_or(NormalizeError::MissingField {
            field: "snippet.title",
        })?;

    let statistics = match raw.get("statistics") {
        None | Some(Value::Null) => None,
        Some(statistics @ Value::Object(_)) => Some(statistics),
        Some(other) => {
            return Err(NormalizeError::MalformedStatistic {
                field: "statistics",
                value: other.to_string(),
            })
        }
    };
    Ok(NormalizedRecord {
        id: id.to_string(),
        title: title.to_string(),
        view_count: statistic(statistics, "viewCount")?,
        like_count: statistic(statistics, "likeCount")?,
        comment_count: statistic(statistics, "commentCount")?,
    })
}

fn statistic(statistics: Option<&Value>, field: &'static str) -> Result<u64, NormalizeError> {
    match statistics.and_then(|s| s.get(field)) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| NormalizeError::MalformedStatistic {
                field,
                value: s.clone(),
            }),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| NormalizeError::MalformedStatistic {
            field,
            value: n.to_string(),
        }),
        Some(other) => Err(NormalizeError::MalformedStatistic {
            field,
            value: other.to_string(),
        }),
    }
}
