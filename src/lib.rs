pub mod api;
pub mod app;
pub mod cli;
pub mod clock;
pub mod config;
pub mod db;
pub mod discovery;
pub mod global;
pub mod links;
pub mod meeting;
pub mod page;
pub mod relay;
pub mod settings;
pub mod transcript;
