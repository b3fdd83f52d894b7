#[path = "common/mod.rs"]
mod common;

use anyhow::anyhow;
use common::*;
use retl_daily::{
    normalize, paginate, AccessToken, EtlError, Listing, PostSource, PostStream, RawPost, Service, TimeFilter,
    MAX_PAGE_SIZE,
};
use std::cell::RefCell;
use std::time::Duration;
use serde_json::json;

/// A trimmed-down `/r/<sub>/top` page: two t3 children and a cursor.
/// Only the fixed field subset is picked out; extra fields are ignored.
#[test]
fn listing_page_decodes_children_and_cursor() {
    let body = json!({
        "kind": "Listing",
        "data": {
            "after": "t3_abc",
            "dist": 2,
            "children": [
                { "kind": "t3", "data": api_post("p1", "First", 99) },
                { "kind": "t3", "data": {
                    "id": "p2", "title": "Edited later", "score": 5, "num_comments": 0,
                    "author": "[deleted]", "created_utc": 1710003600.0, "url": "https://reddit.com/p2",
                    "over_18": true, "edited": 1710007200.0, "spoiler": false, "stickied": true,
                    "selftext": "ignored", "link_flair_text": null
                }}
            ]
        }
    })
    .to_string();

    let page = Listing::from_json(&body).unwrap();
    assert_eq!(page.after.as_deref(), Some("t3_abc"));
    assert_eq!(page.posts.len(), 2);

    let second = normalize(&page.posts[1]);
    assert_eq!(second.id, "p2");
    assert_eq!(second.author, "[deleted]");
    assert!(second.over_18);
    assert!(!second.edited);
    assert!(second.stickied);
    assert_eq!(second.created_utc.as_deref(), Some("2024-03-09T17:00:00Z"));
}

#[test]
fn last_page_has_no_cursor() {
    let page = Listing::from_json(r#"{"kind":"Listing","data":{"after":null,"children":[]}}"#).unwrap();
    assert!(page.after.is_none());
    assert!(page.posts.is_empty());

    let page = Listing::from_json(r#"{"kind":"Listing","data":{"after":"","children":[]}}"#).unwrap();
    assert!(page.after.is_none(), "empty cursor means no further pages");
}

#[test]
fn garbage_page_is_an_error() {
    assert!(Listing::from_json("<html>rate limited</html>").is_err());
}

/// The stream hands out records until the first producer error, then stops for good
/// and reports why.
#[test]
fn stream_stops_at_first_error() {
    let items = vec![
        Ok(RawPost::default()),
        Ok(RawPost::default()),
        Err(anyhow!("HTTP 500")),
        Ok(RawPost::default()),
    ];
    let mut stream = PostStream::new(items.into_iter());

    assert!(stream.next().is_some());
    assert!(stream.next().is_some());
    assert!(stream.next().is_none());
    assert!(stream.next().is_none(), "no restart after termination");
    assert_eq!(stream.yielded(), 2);
    assert!(stream.truncated().unwrap().contains("HTTP 500"));
}

#[test]
fn clean_stream_is_not_truncated() {
    let source = ScriptedSource::ok(vec![api_post("a", "x", 1), api_post("b", "y", 2), api_post("c", "z", 3)]);
    let mut stream = source.top_posts("dataengineering", TimeFilter::All, Some(2));
    let got: Vec<RawPost> = stream.by_ref().collect();
    assert_eq!(got.len(), 2);
    assert!(stream.truncated().is_none());
}

fn page(prefix: &str, n: usize, after: Option<&str>) -> Listing {
    Listing {
        posts: (0..n).map(|i| raw(api_post(&format!("{prefix}{i}"), "t", i as i64))).collect(),
        after: after.map(str::to_string),
    }
}

/// A limit of 150 spans two pages: 100 then 50, with the first page's cursor carried over.
#[test]
fn limit_spans_pages_and_carries_cursor() {
    let requests = RefCell::new(Vec::<(u32, Option<String>)>::new());
    let mut stream = paginate(Some(150), |size, after| {
        requests.borrow_mut().push((size, after.map(str::to_string)));
        match after {
            None => Ok(page("a", size as usize, Some("t3_a99"))),
            Some("t3_a99") => Ok(page("b", size as usize, Some("t3_b49"))),
            Some(other) => panic!("unexpected cursor {other}"),
        }
    });

    let ids: Vec<String> = stream.by_ref().map(|p| normalize(&p).id).collect();
    assert_eq!(ids.len(), 150);
    assert_eq!(ids[0], "a0");
    assert_eq!(ids[100], "b0");
    assert_eq!(ids[149], "b49");
    assert!(stream.truncated().is_none());
    drop(stream);

    assert_eq!(
        requests.into_inner(),
        vec![(MAX_PAGE_SIZE, None), (50, Some("t3_a99".to_string()))],
        "no third request once the limit is met"
    );
}

/// Without a limit the walk follows cursors until a page comes back without one.
#[test]
fn unbounded_walk_ends_when_cursor_runs_out() {
    let calls = RefCell::new(0);
    let stream = paginate(None, |size, after| {
        *calls.borrow_mut() += 1;
        assert_eq!(size, MAX_PAGE_SIZE);
        Ok(match after {
            None => page("a", 3, Some("t3_a2")),
            Some(_) => page("b", 2, None),
        })
    });
    assert_eq!(stream.count(), 5);
    assert_eq!(*calls.borrow(), 2);
}

#[test]
fn empty_page_ends_walk_even_with_cursor() {
    let calls = RefCell::new(0);
    let stream = paginate(None, |_, _| {
        *calls.borrow_mut() += 1;
        Ok(page("a", 0, Some("t3_dangling")))
    });
    assert_eq!(stream.count(), 0);
    assert_eq!(*calls.borrow(), 1);
}

/// Page 2 fails: the stream keeps page 1's rows and reports why it stopped.
#[test]
fn failure_on_second_page_truncates_after_first() {
    let mut stream = paginate(Some(150), |_, after| match after {
        None => Ok(page("a", 100, Some("t3_a99"))),
        Some(_) => Err(anyhow!("GET /r/dataengineering/top returned 503 Service Unavailable")),
    });
    assert_eq!(stream.by_ref().count(), 100);
    assert_eq!(stream.yielded(), 100);
    assert!(stream.truncated().unwrap().contains("503"));
}

#[test]
fn token_response_yields_bearer_and_lifetime() {
    let token = AccessToken::from_response(
        200,
        r#"{"access_token":"tok-abc123","token_type":"bearer","expires_in":86400,"scope":"*"}"#,
    )
    .unwrap();
    assert_eq!(token.expires_in(), Some(Duration::from_secs(86400)));
    assert!(!format!("{token:?}").contains("tok-abc123"), "bearer must not appear in Debug");
}

#[test]
fn token_error_is_reddit_auth_failure() {
    let err = AccessToken::from_response(401, r#"{"message":"Unauthorized","error":401}"#);
    assert!(matches!(err, Err(EtlError::Authentication { service: Service::Reddit, .. })));

    let err = AccessToken::from_response(200, r#"{"error":"invalid_grant"}"#).err().unwrap();
    assert!(err.to_string().contains("invalid_grant"));

    assert!(AccessToken::from_response(200, "<html>busy</html>").is_err());
}
