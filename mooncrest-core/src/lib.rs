pub mod config;

use std::sync::Arc;

use mooncrest_database::Database;
use mooncrest_llm::LlmService;
use mooncrest_roblox::RobloxClient;

pub use config::BotConfig;

pub type Error = anyhow::Error;

#[derive(Clone, Debug)]
pub struct Data {
    pub db: Database,
    pub llm: Option<LlmService>,
    pub roblox: RobloxClient,
    pub config: Arc<BotConfig>,
}

pub type Context<'a> = poise::Context<'a, Data, Error>;
