use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{error, info};
use serde::Deserialize;
use teloxide::prelude::*;
use teloxide::types::{Message, MessageId};

mod callback_handlers;
mod conversation;
mod ids;
mod intents;
mod keyboards;
mod message_handlers;
mod payload;
mod store;

use callback_handlers::handle_callback;
use conversation::Conversations;
use intents::Reply;
use message_handlers::handle_message;
use store::{OwnerId, Store};

const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Optional TOML config file. Every key may also come from the command line
/// or the environment.
#[derive(Debug, Deserialize, Clone, Default)]
struct FileConfig {
    token: Option<String>,
    database_url: Option<String>,
    #[serde(default)]
    admin_user_ids: Vec<OwnerId>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone)]
struct Config {
    token: String,
    database_url: String,
    /// Users allowed to run `/users`. Empty means everyone.
    admin_user_ids: Vec<OwnerId>,
    max_connections: u32,
}

impl Config {
    fn is_admin(&self, owner: OwnerId) -> bool {
        self.admin_user_ids.is_empty() || self.admin_user_ids.contains(&owner)
    }
}

#[derive(Parser, Debug, Default)]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

struct AppState {
    config: Config,
    store: Store,
    conversations: Conversations,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = resolve_config(&args)?;

    let store = Store::connect(&config.database_url, config.max_connections).await?;

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        conversations: Conversations::default(),
    });

    let bot = Bot::new(config.token.clone());

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    info!("bot started");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn load_config(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let config: FileConfig = toml::from_str(&contents).context("parse config")?;
    Ok(config)
}

/// Merges the config file with CLI/env values; the latter win. A missing
/// token or database URL is fatal.
fn resolve_config(args: &Args) -> Result<Config> {
    let file = match &args.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };

    let token = args
        .token
        .clone()
        .or(file.token)
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| anyhow!("missing bot token: set BOT_TOKEN or `token` in the config file"))?;
    let database_url = args
        .database_url
        .clone()
        .or(file.database_url)
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| {
            anyhow!("missing database url: set DATABASE_URL or `database_url` in the config file")
        })?;

    Ok(Config {
        token,
        database_url,
        admin_user_ids: file.admin_user_ids,
        max_connections: file.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
    })
}

/// Sends the replies produced for one event. `target` is the message a
/// button belonged to; edits without a target are dropped.
async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    target: Option<MessageId>,
    replies: Vec<Reply>,
) -> Result<()> {
    for reply in replies {
        match reply {
            Reply::Send { text, markup } => {
                let request = bot.send_message(chat_id, text);
                match markup {
                    Some(markup) => request.reply_markup(markup).await?,
                    None => request.await?,
                };
            }
            Reply::EditText(text) => {
                let Some(message_id) = target else {
                    continue;
                };
                match bot.edit_message_text(chat_id, message_id, text).await {
                    Ok(_) => {}
                    Err(err) if is_message_not_modified_error(&err) => {}
                    Err(err) => {
                        error!("message edit failed: {:#}", err);
                        return Err(err.into());
                    }
                }
            }
            Reply::EditMarkup(markup) => {
                let Some(message_id) = target else {
                    continue;
                };
                let request = bot.edit_message_reply_markup(chat_id, message_id);
                let result = match markup {
                    Some(markup) => request.reply_markup(markup).await,
                    None => request.await,
                };
                match result {
                    Ok(_) => {}
                    Err(err) if is_message_not_modified_error(&err) => {}
                    Err(err) => {
                        error!("button edit failed: {:#}", err);
                        return Err(err.into());
                    }
                }
            }
        }
    }
    Ok(())
}

fn is_message_not_modified_error(err: &teloxide::RequestError) -> bool {
    err.to_string()
        .to_ascii_lowercase()
        .contains("message is not modified")
}

fn parse_command(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    if !first.starts_with('/') {
        return None;
    }
    let cmd = first.trim_start_matches('/');
    Some(cmd.split('@').next().unwrap_or(cmd))
}

fn owner_id(user: &teloxide::types::User) -> OwnerId {
    user.id.0 as OwnerId
}
