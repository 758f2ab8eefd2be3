pub mod app;
pub mod config;
pub mod export;
pub mod runner;
pub mod screens;
