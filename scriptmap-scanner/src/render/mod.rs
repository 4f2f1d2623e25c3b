//! Rendering engines for [`PageFetcher`](crate::fetcher::PageFetcher).

#[cfg(feature = "headless")]
pub mod chrome;
pub mod http;

#[cfg(feature = "headless")]
pub use chrome::ChromeRenderer;
pub use http::HttpRenderer;
