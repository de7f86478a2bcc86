pub mod divar;
pub mod fetcher;
pub mod traits;
pub mod types;

pub use divar::DivarClient;
pub use fetcher::ListingFetcher;
pub use traits::ListingSource;
pub use types::SearchFilters;
