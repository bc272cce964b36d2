//! Clients for the third-party services the api proxies

pub mod football_data;
pub mod imgbb;
pub mod probe;

pub use football_data::{FixturesError, FootballDataClient};
pub use imgbb::{ImgbbClient, UploadError};
pub use probe::{CdnProber, RevalidateVerdict};
