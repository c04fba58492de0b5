//! Appointment booking for the healthcare portal.
//!
//! The client core (`reconciler`, `wizard`, `cache`, `client`, `portal`)
//! merges the resource API's appointments with the device cache and drives the
//! booking form. The resource API itself (`store`, `routes`) is served by the
//! `healthcare-portal` binary.

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod doctors;
pub mod error;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod portal;
pub mod profile;
pub mod reconciler;
pub mod routes;
pub mod store;
pub mod wizard;
