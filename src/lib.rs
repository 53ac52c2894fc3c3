pub mod api;
pub mod cli;
pub mod config;
pub mod controller;
pub mod core;
pub mod exit;
pub mod logs;
pub mod ui;
