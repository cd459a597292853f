pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod models;
pub mod notices;
pub mod sanitize;
pub mod services;
pub mod state;
pub mod strapi;

#[cfg(test)]
pub mod test_utils;
