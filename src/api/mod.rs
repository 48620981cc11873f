//! HTTP facade - routes and handlers

pub mod handlers;
pub mod routes;
