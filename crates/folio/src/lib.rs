#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/folio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod chunk;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pager;
pub mod response;

// Re-export the upstream crate
pub use folio_data as data;

pub use cache::{CacheEntry, CacheKey, CacheLookup, Clock, FilingCache, ManualClock, SystemClock};
pub use chunk::{ChunkSet, Chunker, DEFAULT_CHUNK_CAPACITY};
pub use config::{DEFAULT_CACHE_TTL, FolioConfig};
pub use error::{ErrorKind, FolioError, Result};
pub use normalize::{DocumentNormalizer, NormalizedText};
pub use pager::FilingPager;
pub use response::{ErrorPayload, PageRequest, PaginationResponse, ToolOutput};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
