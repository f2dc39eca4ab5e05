pub mod crawler;
pub mod error;
pub mod page;
pub mod result;

pub use crawler::{Crawler, PagePolicy, ProgressCallback, ResultCallback};
pub use error::ScanError;
pub use page::{PageContent, parse_html};
pub use result::CrawlResult;
