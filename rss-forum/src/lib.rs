pub mod cache;
pub mod config;
pub mod emitter;
pub mod feed_reader;
pub mod fetcher;
pub mod llm_adapter;
pub mod parser;
pub mod pipeline;
pub mod publisher;
pub mod sources;
pub mod store;
pub mod traits;
pub mod transformer;
pub mod types;
pub mod utils;

pub use cache::FeedCache;
pub use config::{FetchConfig, PipelineConfig, RewriteConfig, SiteConfig, StoreBackend};
pub use emitter::DocumentEmitter;
pub use feed_reader::FeedReader;
pub use fetcher::Fetcher;
pub use llm_adapter::{GroqAdapter, MockLlmAdapter};
pub use parser::FeedParser;
pub use pipeline::Pipeline;
pub use publisher::ThreadPublisher;
pub use sources::{FileFeedSource, RssFeedSource};
pub use store::{MemoryStore, PgStore, Stores};
pub use traits::{DedupStore, FeedSource, RewriteRequest, RewriteResponse, RewriteService, ThreadStore};
pub use transformer::ContentTransformer;
pub use types::*;
