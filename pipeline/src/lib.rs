pub mod adapter;
pub mod driver;
pub mod filter;
pub mod platforms;
pub mod select;
pub mod token;

pub use adapter::PlatformAdapter;
pub use driver::{run_pipeline, RUN_LEASE_TTL_SECS};
pub use platforms::{InstagramAdapter, RedditAdapter, TwitterAdapter, YouTubeAdapter};
