pub mod collector;
pub mod image_fetcher;
pub mod page_fetcher;

pub use collector::Collector;
pub use image_fetcher::ImageDownloader;
pub use page_fetcher::PageFetcher;
