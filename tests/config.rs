use retl_daily::{
    parse_limit, run_id_for_date, EtlError, PipelineRun, RedditCredentials, StorageCredentials, TimeFilter,
};
use time::macros::date;

#[test]
fn time_filter_parses_all_windows() {
    for (s, tf) in [
        ("day", TimeFilter::Day),
        ("week", TimeFilter::Week),
        ("Month", TimeFilter::Month),
        (" year ", TimeFilter::Year),
        ("ALL", TimeFilter::All),
    ] {
        assert_eq!(s.parse::<TimeFilter>().unwrap(), tf);
        assert_eq!(tf.to_string(), s.trim().to_lowercase());
    }
    assert!("hour".parse::<TimeFilter>().is_err());
}

#[test]
fn limits_accept_unbounded_spellings() {
    assert_eq!(parse_limit("100").unwrap(), Some(100));
    assert_eq!(parse_limit("0").unwrap(), None);
    assert_eq!(parse_limit("none").unwrap(), None);
    assert_eq!(parse_limit("All").unwrap(), None);
    assert!(matches!(parse_limit("-5"), Err(EtlError::Config(_))));
}

#[test]
fn run_id_is_date_derived() {
    assert_eq!(run_id_for_date(date!(2025 - 03 - 14)), "reddit_20250314");
    assert_eq!(run_id_for_date(date!(2024 - 12 - 01)), "reddit_20241201");
}

#[test]
fn builder_defaults_and_normalization() {
    let run = PipelineRun::new("reddit_20250314").with_subreddit(" r/rust ").with_limit(Some(0));
    assert_eq!(run.subreddit, "rust");
    assert_eq!(run.limit, None);
    assert_eq!(run.user_agent, "script:v1.0");
    assert_eq!(run.time_filter, TimeFilter::Day);
    assert!(!run.fail_on_truncated_stream);
    assert!(run.validate().is_ok());

    assert!(PipelineRun::new("").validate().is_err());
    assert!(PipelineRun::new("ok").with_subreddit("no spaces allowed").validate().is_err());
}

/// Secrets never show up in Debug output (and therefore not in logs).
#[test]
fn debug_output_redacts_secrets() {
    let run = PipelineRun::new("reddit_20250314")
        .with_reddit_credentials("my-client-id", "super-secret-value")
        .with_storage(StorageCredentials {
            access_key: "AKIAEXAMPLEKEY".into(),
            secret_key: "aws-secret-value".into(),
            bucket: "my-bucket".into(),
            ..Default::default()
        });
    let dbg = format!("{:?}", run);
    for secret in ["my-client-id", "super-secret-value", "AKIAEXAMPLEKEY", "aws-secret-value"] {
        assert!(!dbg.contains(secret), "leaked {secret} in {dbg}");
    }
    assert!(dbg.contains("my-bucket"));
    assert!(format!("{:?}", RedditCredentials::default()).contains("<unset>"));
}
