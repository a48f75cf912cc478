mod instagram;
mod reddit;
mod twitter;
mod youtube;

pub use instagram::InstagramAdapter;
pub use reddit::RedditAdapter;
pub use twitter::TwitterAdapter;
pub use youtube::YouTubeAdapter;
