//! Core library for the `weatherfeed` CLI.
//!
//! This crate defines:
//! - Fetching and decoding current weather over HTTP
//! - Lifecycle scopes that cancel outstanding work en masse
//! - The three operations: fetch once, poll, and fetch a joined pair
//! - Configuration and the persisted display board
//!
//! It is used by `weatherfeed-cli`, but can also be reused by other binaries or services.

pub mod board;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod ops;
pub mod scope;

pub use board::Board;
pub use config::Config;
pub use error::{ParseError, TransportError};
pub use fetcher::{WeatherFetcher, WeatherSource};
pub use model::{TemperatureUnit, WeatherQuery, WeatherReport, WeatherResult};
pub use ops::{fetch_every, fetch_once, fetch_pair};
pub use scope::{Emitter, Inbox, Scope, Surface, Update};
