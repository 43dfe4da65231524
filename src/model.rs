//! Payloads exchanged between the poll job and the work service.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An issue the work service found still in progress and moved back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeftBehindIssue {
    pub key: String,
    pub title: String,
}

/// Body of `GET /work`.
///
/// The service writes `forgot` as `1`/`0`; booleans are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResult {
    #[serde(
        serialize_with = "forgot_as_int",
        deserialize_with = "forgot_from_bool_or_int"
    )]
    pub forgot: bool,
    #[serde(
        rename = "leftBehind",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub left_behind: Vec<LeftBehindIssue>,
}

impl PollResult {
    /// Nothing was left behind.
    pub fn clean() -> Self {
        Self {
            forgot: false,
            left_behind: Vec::new(),
        }
    }

    /// Some issues were moved back.
    pub fn forgot(left_behind: Vec<LeftBehindIssue>) -> Self {
        Self {
            forgot: !left_behind.is_empty(),
            left_behind,
        }
    }
}

fn forgot_as_int<S: Serializer>(forgot: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*forgot))
}

fn forgot_from_bool_or_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Float(f64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
        Flag::Float(f) => f != 0.0,
    })
}

/// One failed attempt at consuming the `work` resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// 1-based attempt number.
    pub attempt: u32,
    pub message: String,
    /// Line of the response body where parsing failed; absent for transport errors.
    pub line: Option<usize>,
}
