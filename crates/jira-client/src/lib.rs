pub mod client;
pub mod error;
pub mod pagination;

pub use client::JiraClient;
pub use error::JiraError;
pub use pagination::IssuePage;
