pub mod client;
pub mod error;

pub use client::OpenProjectClient;
pub use error::OpenProjectError;
