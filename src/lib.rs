//! Employee registration and listing over a hosted document database.

pub mod config;
pub mod error;
pub mod filter;
pub mod form;
pub mod model;
pub mod notify;
pub mod pager;
pub mod routes;
pub mod store;
pub mod view;
