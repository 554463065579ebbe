//! D402 sales analytics: load the sales CSV once, then filter and
//! aggregate it for the dashboard views.

pub mod cache;
pub mod engine;
pub mod error;
pub mod export;
pub mod loader;
pub mod model;
pub mod service;

pub use error::{DataFormatError, InvalidRangeError, SalesError};
