//! Campus Gate
//!
//! Permission resolution for the campus community platform: aggregates a
//! user's club and board privileges and decides which features they may use.

pub mod api;
pub mod auth;
pub mod config;
pub mod permissions;
