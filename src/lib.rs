//! HTTP API for the manual course-payment workflow of an online learning
//! platform: students submit payment claims, admins approve or reject them,
//! and approval activates the student's course enrollment.

pub mod app;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
