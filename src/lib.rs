mod config;
mod date;
mod error;
mod record;
mod transform;
mod source;
mod sink;
mod publish;
mod pipeline;
mod progress;
mod util;

pub use crate::config::{
    parse_limit, PipelineRun, RedditCredentials, StorageCredentials, TimeFilter, DEFAULT_LIMIT, DEFAULT_REGION,
    DEFAULT_SUBREDDIT, DEFAULT_USER_AGENT,
};
pub use crate::date::{epoch_to_rfc3339, run_id_for_date, run_id_today};
pub use crate::error::{EtlError, EtlResult, Service};
pub use crate::record::{CanonicalPost, RawPost, POST_FIELDS};
pub use crate::transform::{normalize, DEFAULT_AUTHOR};

// Extraction: the source seam plus the live Reddit client.
pub use crate::source::{paginate, AccessToken, Listing, PostSource, PostStream, RedditClient, MAX_PAGE_SIZE};

pub use crate::sink::CsvSink;

// Publishing: the object-store seam, the S3 implementation and key layout helpers.
pub use crate::publish::{
    ensure_container, publish, remote_key, remote_location, ContainerStatus, ObjectStore, S3Store, CSV_CONTENT_TYPE,
};

pub use crate::pipeline::{RedditPipeline, RunReport, RunState};

// Binaries install the subscriber; the library only emits events.
pub use crate::util::init_tracing_once;
