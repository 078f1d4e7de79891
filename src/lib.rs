//! A small pastebin: submit text, get a link, optionally let it expire.

use axum::extract::FromRef;

pub mod commands;
pub mod config;
pub mod controllers;
pub mod error;
pub mod expiry;
pub mod health;
pub mod models;
pub mod storage;
pub mod types;

pub use error::{AppError, AppResult};

use config::Config;
use controllers::paste::PasteService;
use storage::AnyStorage;

/// Everything a command needs, cloned into each request handler.
#[derive(Clone, FromRef)]
pub struct App {
    pub config: Config,
    pub pastes: PasteService<AnyStorage>,
}

impl App {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let storage = AnyStorage::open(&config.storage).await?;
        Ok(App {
            config,
            pastes: PasteService::new(storage),
        })
    }
}
