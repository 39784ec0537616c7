//! REST client for a PostgREST vaccine database.
//!
//! `RestClient` is the production [`DataSource`](crate::source::DataSource).
//! It authenticates with the project's anon key and maps HTTP failures onto
//! `SourceError`.

pub mod client;
pub mod error;

pub use client::RestClient;
pub use error::SourceError;
