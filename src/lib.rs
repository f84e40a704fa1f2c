//! Library exports for the template manager
//!
//! Exposes the store, the client-side state types and the HTTP surface for
//! the binary and the integration tests.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod form_editor;
pub mod handler;
pub mod list_view;
pub mod middleware;
pub mod model;
pub mod pages;
pub mod preview;
pub mod route;
pub mod store;
pub mod theme;
