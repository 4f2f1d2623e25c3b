pub mod crawler;
pub mod error;
pub mod fetcher;
pub mod origin;
pub mod render;
pub mod result;
pub mod visited;

pub use crawler::{Crawler, ScriptSink, TraversalOrder};
pub use error::ScanError;
pub use fetcher::{PageFetcher, PageRenderer};
pub use origin::{OriginMatch, origin_of};
pub use result::{CrawlSummary, RenderedPage};
pub use visited::{UrlIdentity, VisitedSet};
