//! Infinity CMS: a small content-management system.
//!
//! Requests are dispatched through [`router::Router`] over the route table
//! in [`routes`]; handlers read SQLite through [`db::Database`] and render
//! theme or admin templates through [`view`].

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod http;
pub mod middleware;
pub mod migration;
pub mod password;
pub mod router;
pub mod routes;
pub mod session;
pub mod state;
pub mod view;
