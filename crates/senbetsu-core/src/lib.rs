pub mod clock;
pub mod config;
pub mod disk;
pub mod error;
pub mod feed;
pub mod health;
pub mod import;
pub mod models;
pub mod ranking;
pub mod storage;
