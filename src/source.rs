//! Reddit source: application-only OAuth, then a lazy, forward-only walk over
//! `/r/<sub>/top` pages. A page that fails to load ends the stream; it never
//! surfaces as an error to the consumer (see `PostStream::truncated`).

use crate::config::{RedditCredentials, TimeFilter};
use crate::error::{EtlError, EtlResult, Service};
use crate::record::RawPost;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
/// Reddit caps listing pages at 100 children.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Anything that can hand out a top-posts stream. `RedditClient` is the real one.
pub trait PostSource {
    fn top_posts(&self, subreddit: &str, window: TimeFilter, limit: Option<u32>) -> PostStream<'_>;
}

impl<T: PostSource + ?Sized> PostSource for &T {
    fn top_posts(&self, subreddit: &str, window: TimeFilter, limit: Option<u32>) -> PostStream<'_> {
        (**self).top_posts(subreddit, window, limit)
    }
}

/// Single-pass sequence of raw posts over a fallible producer.
/// The first producer error is logged, remembered, and ends the sequence.
pub struct PostStream<'a> {
    inner: Box<dyn Iterator<Item = Result<RawPost>> + 'a>,
    yielded: u64,
    truncated: Option<String>,
    done: bool,
}

impl<'a> PostStream<'a> {
    pub fn new(inner: impl Iterator<Item = Result<RawPost>> + 'a) -> Self {
        Self { inner: Box::new(inner), yielded: 0, truncated: None, done: false }
    }

    /// Why the stream stopped early, if it did.
    pub fn truncated(&self) -> Option<&str> {
        self.truncated.as_deref()
    }

    pub fn yielded(&self) -> u64 {
        self.yielded
    }
}

impl Iterator for PostStream<'_> {
    type Item = RawPost;

    fn next(&mut self) -> Option<RawPost> {
        if self.done {
            return None;
        }
        match self.inner.next() {
            Some(Ok(post)) => {
                self.yielded += 1;
                Some(post)
            }
            Some(Err(e)) => {
                tracing::error!(error = %format!("{:#}", e), after = self.yielded, "Error during extraction stream; ending early");
                self.truncated = Some(format!("{:#}", e));
                self.done = true;
                None
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

// ----------------------------- Listing payloads ------------------------------------

#[derive(Debug, Deserialize)]
struct ListingEnvelope {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    #[serde(default)]
    data: RawPost,
}

/// One decoded listing page: the posts in ranking order plus the pagination cursor.
#[derive(Debug, Default)]
pub struct Listing {
    pub posts: Vec<RawPost>,
    pub after: Option<String>,
}

impl Listing {
    pub fn from_json(body: &str) -> Result<Self> {
        let env: ListingEnvelope = serde_json::from_str(body).context("decode listing page")?;
        Ok(Self {
            posts: env.data.children.into_iter().map(|c| c.data).collect(),
            after: env.data.after.filter(|a| !a.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    /// A string grant error, or the numeric status Reddit echoes on bad credentials.
    error: Option<serde_json::Value>,
}

/// App-only bearer token from the client-credentials grant. `Debug` never shows the token.
pub struct AccessToken {
    bearer: String,
    expires_in: Option<Duration>,
}

impl AccessToken {
    /// Decode the token endpoint's reply. Anything without a usable token is an
    /// authentication error carrying the service's own reason.
    pub fn from_response(status: u16, body: &str) -> EtlResult<Self> {
        let token: TokenResponse = serde_json::from_str(body)
            .map_err(|e| EtlError::auth(Service::Reddit, format!("token response ({}): {}", status, e)))?;
        match (token.access_token, token.error) {
            (_, Some(err)) => {
                let reason = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
                Err(EtlError::auth(Service::Reddit, format!("{} ({})", reason, status)))
            }
            (Some(t), None) if (200..300).contains(&status) && !t.is_empty() => {
                Ok(Self { bearer: t, expires_in: token.expires_in.map(Duration::from_secs) })
            }
            _ => Err(EtlError::auth(Service::Reddit, format!("no access token returned ({})", status))),
        }
    }

    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_in
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("bearer", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

// ----------------------------- Client ------------------------------------

pub struct RedditClient {
    http: reqwest::blocking::Client,
    bearer: String,
    expires_at: Option<Instant>,
}

impl RedditClient {
    /// Authenticate now rather than on first read, so bad credentials fail before any local I/O.
    pub fn connect(creds: &RedditCredentials, user_agent: &str) -> EtlResult<Self> {
        if creds.client_id.trim().is_empty() || creds.client_secret.trim().is_empty() {
            return Err(EtlError::auth(Service::Reddit, "client id/secret not provided"));
        }
        let http = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EtlError::auth(Service::Reddit, format!("http client: {}", e)))?;

        let resp = http
            .post(TOKEN_URL)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .map_err(|e| EtlError::auth(Service::Reddit, format!("token request failed: {}", e)))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| EtlError::auth(Service::Reddit, format!("token response ({}): {}", status, e)))?;
        let token = AccessToken::from_response(status.as_u16(), &body)?;

        tracing::info!(
            expires_in_secs = ?token.expires_in().map(|d| d.as_secs()),
            "Successfully connected to Reddit API."
        );
        // The grant is not refreshed; a run that outlives it ends early with an explicit reason.
        let expires_at = token.expires_in().map(|d| Instant::now() + d);
        Ok(Self { http, bearer: token.bearer, expires_at })
    }

    fn fetch_page(&self, subreddit: &str, window: TimeFilter, page_size: u32, after: Option<&str>) -> Result<Listing> {
        if self.expires_at.is_some_and(|at| Instant::now() >= at) {
            return Err(anyhow!("access token expired before the listing was exhausted"));
        }
        let url = format!("{}/r/{}/top", API_BASE, subreddit);
        let page_size = page_size.to_string();
        let mut query: Vec<(&str, &str)> = vec![("t", window.as_str()), ("limit", page_size.as_str()), ("raw_json", "1")];
        if let Some(a) = after {
            query.push(("after", a));
        }
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.bearer)
            .query(&query)
            .send()
            .with_context(|| format!("GET {}", url))?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(anyhow!("GET {} returned {}; access token rejected or expired", url, status));
        }
        if !status.is_success() {
            return Err(anyhow!("GET {} returned {}", url, status));
        }
        let body = resp.text().with_context(|| format!("read body of {}", url))?;
        Listing::from_json(&body)
    }
}

impl PostSource for RedditClient {
    fn top_posts(&self, subreddit: &str, window: TimeFilter, limit: Option<u32>) -> PostStream<'_> {
        tracing::info!(subreddit, window = %window, limit = ?limit, "Starting extraction from r/{}...", subreddit);
        let subreddit = subreddit.to_string();
        paginate(limit, move |page_size, after| self.fetch_page(&subreddit, window, page_size, after))
    }
}

/// Walk a cursor-paginated listing. `fetch(page_size, after)` loads one page; page sizes
/// never exceed `MAX_PAGE_SIZE` or what is left of `limit`. The walk ends when the limit
/// is reached, a page comes back empty or without a cursor, or a fetch fails (the
/// failure truncates the stream).
pub fn paginate<'a, F>(limit: Option<u32>, fetch: F) -> PostStream<'a>
where
    F: FnMut(u32, Option<&str>) -> Result<Listing> + 'a,
{
    PostStream::new(TopPages { fetch, remaining: limit, after: None, buffered: VecDeque::new(), exhausted: false })
}

/// Pulls one page at a time and hands out its children in order.
struct TopPages<F> {
    fetch: F,
    remaining: Option<u32>,
    after: Option<String>,
    buffered: VecDeque<RawPost>,
    exhausted: bool,
}

impl<F> Iterator for TopPages<F>
where
    F: FnMut(u32, Option<&str>) -> Result<Listing>,
{
    type Item = Result<RawPost>;

    fn next(&mut self) -> Option<Result<RawPost>> {
        if self.remaining == Some(0) {
            return None;
        }
        if self.buffered.is_empty() {
            if self.exhausted {
                return None;
            }
            let page_size = self.remaining.map_or(MAX_PAGE_SIZE, |r| r.min(MAX_PAGE_SIZE));
            match (self.fetch)(page_size, self.after.as_deref()) {
                Ok(page) => {
                    tracing::debug!(children = page.posts.len(), after = ?page.after, "listing page");
                    self.exhausted = page.after.is_none() || page.posts.is_empty();
                    self.after = page.after;
                    self.buffered.extend(page.posts);
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
        let post = self.buffered.pop_front()?;
        if let Some(r) = self.remaining.as_mut() {
            *r -= 1;
        }
        Some(Ok(post))
    }
}
