use crate::date::run_id_today;
use crate::error::{EtlError, EtlResult};
use regex::Regex;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

pub const DEFAULT_SUBREDDIT: &str = "dataengineering";
pub const DEFAULT_USER_AGENT: &str = "script:v1.0";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_LIMIT: u32 = 100;

/// Ranking window for "top" listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TimeFilter {
    #[default]
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeFilter::Day => "day",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
            TimeFilter::Year => "year",
            TimeFilter::All => "all",
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFilter {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(TimeFilter::Day),
            "week" => Ok(TimeFilter::Week),
            "month" => Ok(TimeFilter::Month),
            "year" => Ok(TimeFilter::Year),
            "all" => Ok(TimeFilter::All),
            other => Err(format!("unknown time filter '{}', expected day|week|month|year|all", other)),
        }
    }
}

/// Reddit application credentials (script / client-credentials app).
#[derive(Clone, Default)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Object-storage credentials plus the destination bucket.
#[derive(Clone)]
pub struct StorageCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores; switches to path-style addressing.
    pub endpoint: Option<String>,
}

impl Default for StorageCredentials {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            bucket: String::new(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
        }
    }
}

// Secrets stay out of Debug output so a logged run never leaks them.
impl fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &redact(&self.client_id))
            .field("client_secret", &redact(&self.client_secret))
            .finish()
    }
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("access_key", &redact(&self.access_key))
            .field("secret_key", &redact(&self.secret_key))
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

fn redact(s: &str) -> &'static str {
    if s.is_empty() { "<unset>" } else { "<redacted>" }
}

/// Everything one scheduled run needs. Built once per trigger and consumed by the pipeline.
#[derive(Clone, Debug)]
pub struct PipelineRun {
    pub run_id: String,
    pub subreddit: String,          // no "r/" prefix
    pub time_filter: TimeFilter,
    pub limit: Option<u32>,         // None = unbounded
    pub reddit: RedditCredentials,
    pub storage: StorageCredentials,
    pub user_agent: String,
    pub work_dir: PathBuf,
    pub progress: bool,
    /// Treat an early-terminated listing as a failed run instead of publishing what was read.
    pub fail_on_truncated_stream: bool,
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self {
            run_id: run_id_today(),
            subreddit: DEFAULT_SUBREDDIT.to_string(),
            time_filter: TimeFilter::Day,
            limit: Some(DEFAULT_LIMIT),
            reddit: RedditCredentials::default(),
            storage: StorageCredentials::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            work_dir: env::temp_dir(),
            progress: false,
            fail_on_truncated_stream: false,
        }
    }
}

impl PipelineRun {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self { run_id: run_id.into(), ..Default::default() }
    }

    pub fn with_subreddit(mut self, sub: impl AsRef<str>) -> Self {
        let s = sub.as_ref().trim();
        let s = s.strip_prefix("r/").or_else(|| s.strip_prefix("/r/")).unwrap_or(s);
        self.subreddit = s.to_string();
        self
    }
    pub fn with_time_filter(mut self, tf: TimeFilter) -> Self {
        self.time_filter = tf;
        self
    }
    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit.filter(|n| *n > 0);
        self
    }
    pub fn with_reddit_credentials(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.reddit = RedditCredentials { client_id: client_id.into(), client_secret: client_secret.into() };
        self
    }
    pub fn with_storage(mut self, storage: StorageCredentials) -> Self {
        self.storage = storage;
        self
    }
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }
    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_fail_on_truncated_stream(mut self, yes: bool) -> Self {
        self.fail_on_truncated_stream = yes;
        self
    }

    /// Deterministic local path: `<work_dir>/<run_id>.csv`.
    pub fn local_path(&self) -> PathBuf {
        self.work_dir.join(format!("{}.csv", self.run_id))
    }

    /// Check the shape of the run parameters. Credentials are checked at connect time.
    pub fn validate(&self) -> EtlResult<()> {
        if !run_id_re().is_match(&self.run_id) {
            return Err(EtlError::Config(format!(
                "run id '{}' must be 1-128 chars of [A-Za-z0-9_.-]",
                self.run_id
            )));
        }
        if !subreddit_re().is_match(&self.subreddit) {
            return Err(EtlError::Config(format!("invalid subreddit name '{}'", self.subreddit)));
        }
        if self.user_agent.trim().is_empty() {
            return Err(EtlError::Config("user agent must not be empty".into()));
        }
        Ok(())
    }

    /// Resolve a run from environment variables (a `.env` file is honoured by the binary).
    ///
    /// - `REDDIT_CLIENT_ID`, `REDDIT_CLIENT_SECRET`
    /// - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_BUCKET_NAME`, `AWS_REGION`, `S3_ENDPOINT`
    /// - `RETL_RUN_ID`, `RETL_SUBREDDIT`, `RETL_TIME_FILTER`, `RETL_LIMIT` (`none`/`all`/`0` = unbounded)
    /// - `RETL_USER_AGENT`, `RETL_WORK_DIR`, `RETL_PROGRESS`, `RETL_FAIL_ON_TRUNCATED`
    ///
    /// Missing credentials are left empty here so that they fail at the authentication step.
    pub fn from_env() -> EtlResult<Self> {
        let mut run = PipelineRun::default();
        if let Some(id) = var("RETL_RUN_ID") {
            run.run_id = id;
        }
        if let Some(sub) = var("RETL_SUBREDDIT") {
            run = run.with_subreddit(sub);
        }
        if let Some(tf) = var("RETL_TIME_FILTER") {
            run.time_filter = tf.parse().map_err(EtlError::Config)?;
        }
        if let Some(limit) = var("RETL_LIMIT") {
            run = run.with_limit(parse_limit(&limit)?);
        }
        if let Some(ua) = var("RETL_USER_AGENT") {
            run.user_agent = ua;
        }
        if let Some(dir) = var("RETL_WORK_DIR") {
            run.work_dir = PathBuf::from(dir);
        }
        run.progress = var("RETL_PROGRESS").map(|v| parse_flag(&v)).unwrap_or(false);
        run.fail_on_truncated_stream = var("RETL_FAIL_ON_TRUNCATED").map(|v| parse_flag(&v)).unwrap_or(false);

        run.reddit = RedditCredentials {
            client_id: var("REDDIT_CLIENT_ID").unwrap_or_default(),
            client_secret: var("REDDIT_CLIENT_SECRET").unwrap_or_default(),
        };
        run.storage = StorageCredentials {
            access_key: var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
            secret_key: var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
            bucket: var("AWS_BUCKET_NAME").unwrap_or_default(),
            region: var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint: var("S3_ENDPOINT"),
        };
        Ok(run)
    }
}

/// Parse an item limit: a positive integer, or `none`/`all`/`0` for unbounded.
pub fn parse_limit(s: &str) -> EtlResult<Option<u32>> {
    let t = s.trim().to_ascii_lowercase();
    match t.as_str() {
        "" | "none" | "all" | "unbounded" => Ok(None),
        _ => {
            let n: u32 = t
                .parse()
                .map_err(|_| EtlError::Config(format!("invalid limit '{}'", s)))?;
            Ok(if n == 0 { None } else { Some(n) })
        }
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn run_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]{1,128}$").expect("static regex"))
}

fn subreddit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_]{1,20}$").expect("static regex"))
}
