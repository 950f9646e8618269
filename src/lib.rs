//! Clip cutting and progress tracking for distributed video processing.
//!
//! The worker side cuts a source video into sequential clips stored in R2 and
//! registered in PostgreSQL; the API side reports aggregate progress of a
//! video task with short-lived download links for every artifact.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
