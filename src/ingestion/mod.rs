pub mod backoff;
pub mod fetcher;

pub use fetcher::Fetcher;
