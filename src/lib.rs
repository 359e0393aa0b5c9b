pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod seed;
pub mod services;
pub mod state;
