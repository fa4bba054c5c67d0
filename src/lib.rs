pub mod api;
pub mod bot;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod registry;
pub mod scoreboard;
pub mod transport;
