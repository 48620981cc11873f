//! Middleware module - inbound API key authentication

pub mod auth;
