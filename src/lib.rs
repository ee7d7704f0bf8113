//! User accounts and session management for the video-sharing backend.
//!
//! Login issues a short-lived access token and a long-lived refresh token;
//! the refresh token is stored on the user record as the account's single
//! live session and is rotated on every refresh.

pub mod auth;
pub mod configuration;
pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod validators;
