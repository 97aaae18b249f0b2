//! HTTP handler implementations, grouped by resource.

pub mod auth;
pub mod datasets;
pub mod jobs;
pub mod plots;
pub mod projects;
