//! HTTP client module for the external risk service
//!
//! Talks to the prioritization service that ranks test batches remotely.

mod client;

pub use client::{RankedItem, RiskServiceClient, RiskServiceError};
