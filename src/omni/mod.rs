// omnisync/src/omni/mod.rs
pub(crate) mod client; // Authenticated HTTP access to the Omnidesk API
pub(crate) mod loader; // Walks every page of the case list
pub(crate) mod pages;  // Fetches and parses one page of cases.json

pub use client::OmniClient;
pub use loader::SyncLoader;
pub use pages::PageFetcher;
