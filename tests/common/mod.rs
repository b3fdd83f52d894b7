#![allow(dead_code)]

use anyhow::{anyhow, Result};
use retl_daily::{ObjectStore, PostSource, PostStream, RawPost, TimeFilter};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// In-memory object store. Records every call so tests can assert on the
/// exists → create → put sequence.
#[derive(Default)]
pub struct MemoryStore {
    pub containers: RefCell<BTreeSet<String>>,
    pub objects: RefCell<BTreeMap<(String, String), Vec<u8>>>,
    pub content_types: RefCell<BTreeMap<(String, String), String>>,
    pub exists_calls: Cell<usize>,
    pub create_calls: Cell<usize>,
    pub fail_put: bool,
    pub fail_exists: bool,
}

impl MemoryStore {
    pub fn with_container(name: &str) -> Self {
        let s = Self::default();
        s.containers.borrow_mut().insert(name.to_string());
        s
    }

    pub fn object(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.objects.borrow().get(&(container.to_string(), key.to_string())).cloned()
    }

    pub fn content_type(&self, container: &str, key: &str) -> Option<String> {
        self.content_types.borrow().get(&(container.to_string(), key.to_string())).cloned()
    }
}

impl ObjectStore for MemoryStore {
    fn container_exists(&self, container: &str) -> Result<bool> {
        self.exists_calls.set(self.exists_calls.get() + 1);
        if self.fail_exists {
            return Err(anyhow!("403 Forbidden"));
        }
        Ok(self.containers.borrow().contains(container))
    }

    fn create_container(&self, container: &str) -> Result<()> {
        self.create_calls.set(self.create_calls.get() + 1);
        if !self.containers.borrow_mut().insert(container.to_string()) {
            return Err(anyhow!("BucketAlreadyOwnedByYou"));
        }
        Ok(())
    }

    fn put_object(&self, container: &str, key: &str, body: &mut dyn Read, content_type: &str) -> Result<()> {
        if self.fail_put {
            return Err(anyhow!("connection reset by peer"));
        }
        if !self.containers.borrow().contains(container) {
            return Err(anyhow!("NoSuchBucket: {}", container));
        }
        let mut buf = Vec::new();
        body.read_to_end(&mut buf)?;
        let id = (container.to_string(), key.to_string());
        self.content_types.borrow_mut().insert(id.clone(), content_type.to_string());
        self.objects.borrow_mut().insert(id, buf);
        Ok(())
    }
}

/// Source that replays a fixed script of items; an `Err` item ends the listing.
pub struct ScriptedSource {
    pub items: Vec<std::result::Result<Value, String>>,
    pub calls: RefCell<Vec<(String, TimeFilter, Option<u32>)>>,
}

impl ScriptedSource {
    pub fn new(items: Vec<std::result::Result<Value, String>>) -> Self {
        Self { items, calls: RefCell::new(Vec::new()) }
    }

    pub fn ok(values: Vec<Value>) -> Self {
        Self::new(values.into_iter().map(Ok).collect())
    }
}

impl PostSource for ScriptedSource {
    fn top_posts(&self, subreddit: &str, window: TimeFilter, limit: Option<u32>) -> PostStream<'_> {
        self.calls.borrow_mut().push((subreddit.to_string(), window, limit));
        let take = limit.map_or(usize::MAX, |n| n as usize);
        PostStream::new(self.items.iter().take(take).map(|item| -> Result<RawPost> {
            match item {
                Ok(v) => Ok(serde_json::from_value::<RawPost>(v.clone())?),
                Err(msg) => Err(anyhow!("{}", msg)),
            }
        }))
    }
}

/// A well-formed listing child as the API returns it.
pub fn api_post(id: &str, title: &str, score: i64) -> Value {
    json!({
        "id": id,
        "title": title,
        "score": score,
        "num_comments": 3,
        "author": "tester",
        "created_utc": 1710000000.0,
        "url": format!("https://example.com/{}", id),
        "over_18": false,
        "edited": false,
        "spoiler": false,
        "stickied": false,
        "subreddit": "dataengineering",
        "ups": score
    })
}

pub fn raw(v: Value) -> RawPost {
    serde_json::from_value(v).unwrap()
}

/// Read a text file line-by-line into strings (skips empty lines).
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    let r = BufReader::new(f);
    r.lines().map(|l| l.unwrap()).filter(|s| !s.is_empty()).collect()
}
