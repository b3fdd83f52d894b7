use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CSV column order; also the header row of every output file.
pub const POST_FIELDS: [&str; 11] = [
    "id",
    "title",
    "score",
    "num_comments",
    "author",
    "created_utc",
    "url",
    "over_18",
    "edited",
    "spoiler",
    "stickied",
];

/// The fixed subset of a listing child that we read. Extra fields are ignored by serde.
/// Values stay untyped because the API is loose about them (`edited` is either a bool or
/// an epoch, numbers sometimes arrive as strings); `normalize` does the coercion.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawPost {
    pub id: Option<Value>,
    pub title: Option<Value>,
    pub score: Option<Value>,
    pub num_comments: Option<Value>,
    pub author: Option<Value>,
    pub created_utc: Option<Value>,
    pub url: Option<Value>,
    pub over_18: Option<Value>,
    pub edited: Option<Value>,
    pub spoiler: Option<Value>,
    pub stickied: Option<Value>,
}

/// A post after normalization. Field order matches `POST_FIELDS`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPost {
    pub id: String,
    pub title: String,
    pub score: i64,
    pub num_comments: i64,
    pub author: String,
    pub created_utc: Option<String>,
    pub url: String,
    pub over_18: bool,
    pub edited: bool,
    pub spoiler: bool,
    pub stickied: bool,
}

impl From<&CanonicalPost> for RawPost {
    fn from(p: &CanonicalPost) -> Self {
        RawPost {
            id: Some(Value::from(p.id.clone())),
            title: Some(Value::from(p.title.clone())),
            score: Some(Value::from(p.score)),
            num_comments: Some(Value::from(p.num_comments)),
            author: Some(Value::from(p.author.clone())),
            created_utc: p.created_utc.clone().map(Value::from),
            url: Some(Value::from(p.url.clone())),
            over_18: Some(Value::Bool(p.over_18)),
            edited: Some(Value::Bool(p.edited)),
            spoiler: Some(Value::Bool(p.spoiler)),
            stickied: Some(Value::Bool(p.stickied)),
        }
    }
}
