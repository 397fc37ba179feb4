pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod hub;
pub mod models;
pub mod sync;
