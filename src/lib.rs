//! dashfeeds: external-data integration cache for a small-business dashboard
//!
//! Mediates access to three external feeds (weather, local events, supplier
//! catalogs). Each feed has its own enablement, credentials, refresh cadence
//! and failure mode; [`hub::IntegrationHub`] always returns usable data,
//! fresh, stale or synthesized, and tracks how trustworthy that data is.

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod fetcher;
pub mod health;
pub mod hub;
pub mod notifications;
pub mod quality;
pub mod settings;
pub mod source;
pub mod stats;
pub mod store;
