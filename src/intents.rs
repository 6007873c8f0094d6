//! Turns inbound text and button presses into store calls, state transitions
//! and outbound [`Reply`] actions. Nothing here talks to Telegram directly.

use anyhow::Result;
use log::{debug, warn};
use teloxide::types::{InlineKeyboardMarkup, ReplyMarkup};

use crate::conversation::{Conversation, Pending};
use crate::ids::parse_ids;
use crate::keyboards::{self, MenuItem};
use crate::payload::CallbackData;
use crate::store::{OwnerId, Store, UserRecord};

pub(crate) const WELCOME: &str = "Добро пожаловать 🚀";
pub(crate) const FALLBACK: &str = "Я тебя понял, но пока это не команда 🙂";
pub(crate) const COMING_SOON: &str = "Скоро будет 🛠";
pub(crate) const FORMAT_HINT: &str = "Неверный формат. Пример: 1,2,5-7";
pub(crate) const NO_MATCHING_NUMBERS: &str = "Нет таких номеров";
pub(crate) const NOTHING_DELETED: &str = "Заметка не найдена, ничего не удалено";
pub(crate) const CANCELLED: &str = "Действие отменено";
pub(crate) const NOT_ALLOWED: &str = "Недостаточно прав";

/// Something to show the owner.
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    Send {
        text: String,
        markup: Option<ReplyMarkup>,
    },
    /// Replace the text of the message whose button was pressed.
    EditText(String),
    /// Replace (or with `None`, remove) the buttons of that message.
    EditMarkup(Option<InlineKeyboardMarkup>),
}

impl Reply {
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Reply::Send {
            text: text.into(),
            markup: None,
        }
    }

    fn with_markup(text: impl Into<String>, markup: impl Into<ReplyMarkup>) -> Self {
        Reply::Send {
            text: text.into(),
            markup: Some(markup.into()),
        }
    }
}

/// Identity fields Telegram hands us for the sender.
#[derive(Clone, Debug)]
pub(crate) struct Owner<'a> {
    pub(crate) id: OwnerId,
    pub(crate) handle: Option<&'a str>,
    pub(crate) display_name: &'a str,
}

pub(crate) async fn start(
    store: &Store,
    conversation: &mut Conversation,
    owner: &Owner<'_>,
) -> Result<Vec<Reply>> {
    if store
        .upsert_user(owner.id, owner.handle, owner.display_name)
        .await?
    {
        debug!("registered user {}", owner.id);
    }
    conversation.reset();
    Ok(vec![welcome()])
}

pub(crate) fn welcome() -> Reply {
    Reply::with_markup(WELCOME, keyboards::main_menu())
}

pub(crate) fn cancel(conversation: &mut Conversation) -> Vec<Reply> {
    conversation.reset();
    vec![Reply::text(CANCELLED)]
}

pub(crate) async fn list_users(store: &Store) -> Result<Vec<Reply>> {
    let users = store.list_users().await?;
    Ok(vec![Reply::text(format_users(&users))])
}

/// Handles a slash command. Commands never consume a pending state as free
/// text; only `/start` and `/cancel` touch it.
pub(crate) async fn handle_command(
    store: &Store,
    conversation: &mut Conversation,
    owner: &Owner<'_>,
    cmd: &str,
    is_admin: bool,
) -> Result<Vec<Reply>> {
    match cmd {
        "start" => start(store, conversation, owner).await,
        "help" => Ok(vec![welcome()]),
        "cancel" => Ok(cancel(conversation)),
        "users" if is_admin => list_users(store).await,
        "users" => {
            warn!("user {} is not allowed to list users", owner.id);
            Ok(vec![Reply::text(NOT_ALLOWED)])
        }
        _ => Ok(vec![Reply::text(FALLBACK)]),
    }
}

fn format_users(users: &[UserRecord]) -> String {
    if users.is_empty() {
        return "Пользователей нет".to_string();
    }
    let mut text = String::from("Список пользователей:\n\n");
    for user in users {
        text.push_str(&format!(
            "ID: {}, Username: {}, Name: {}\n",
            user.owner,
            user.handle.as_deref().unwrap_or("—"),
            user.display_name
        ));
    }
    text
}

/// Handles a plain text message. Menu labels always win over whatever the
/// owner was in the middle of.
pub(crate) async fn handle_text(
    store: &Store,
    conversation: &mut Conversation,
    owner: OwnerId,
    text: &str,
) -> Result<Vec<Reply>> {
    if let Some(item) = MenuItem::from_label(text) {
        conversation.reset();
        return menu_action(store, conversation, owner, item).await;
    }

    match conversation.pending {
        Pending::Idle => Ok(vec![Reply::text(FALLBACK)]),
        Pending::AwaitingCategoryName => {
            let name = text.trim();
            if name.is_empty() {
                return Ok(vec![Reply::text("Нужно название категории. Попробуй ещё раз ✍️")]);
            }
            store.create_category(owner, name).await?;
            conversation.reset();
            Ok(vec![Reply::text("Категория добавлена ✅")])
        }
        Pending::AwaitingNoteText { category } => {
            let body = text.trim();
            if body.is_empty() {
                return Ok(vec![Reply::text("Нужен текст заметки. Попробуй ещё раз ✍️")]);
            }
            store.create_note(owner, body, category).await?;
            conversation.reset();
            Ok(vec![Reply::text("Заметка сохранена ✅")])
        }
        Pending::AwaitingDeleteSelector => {
            let numbers = match parse_ids(text) {
                Ok(numbers) => numbers,
                Err(err) => {
                    debug!("bad delete selector from {owner}: {err}");
                    return Ok(vec![Reply::text(FORMAT_HINT)]);
                }
            };
            let ids = conversation.resolve(&numbers);
            if ids.is_empty() {
                return Ok(vec![Reply::text(NO_MATCHING_NUMBERS)]);
            }
            let deleted = store.delete_notes(owner, &ids).await?;
            conversation.reset();
            Ok(vec![Reply::text(format!("Удалено заметок: {deleted} ✅"))])
        }
    }
}

async fn menu_action(
    store: &Store,
    conversation: &mut Conversation,
    owner: OwnerId,
    item: MenuItem,
) -> Result<Vec<Reply>> {
    match item {
        MenuItem::NewNote => {
            let categories = store.list_categories(owner).await?;
            if categories.is_empty() {
                conversation.pending = Pending::AwaitingNoteText { category: None };
                Ok(vec![Reply::text("Категорий нет. Отправь текст заметки:")])
            } else {
                Ok(vec![Reply::with_markup(
                    "Выбери категорию:",
                    keyboards::category_picker(&categories),
                )])
            }
        }
        MenuItem::Categories => {
            let categories = store.list_categories(owner).await?;
            let text = if categories.is_empty() {
                "Категорий пока нет.\nНапиши название новой категории ✍️".to_string()
            } else {
                let mut text = String::from("Твои категории:\n\n");
                for (number, category) in categories.iter().enumerate() {
                    text.push_str(&format!("{}. {}\n", number + 1, category.name));
                }
                text.push_str("\nНапиши новую категорию для добавления ✍️");
                text
            };
            conversation.pending = Pending::AwaitingCategoryName;
            Ok(vec![Reply::text(text)])
        }
        MenuItem::MyNotes => {
            let notes = store.list_notes(owner).await?;
            conversation.remember_listing(notes.iter().map(|note| note.id));
            if notes.is_empty() {
                return Ok(vec![Reply::text("Заметок нет")]);
            }
            Ok(notes
                .iter()
                .enumerate()
                .map(|(index, note)| {
                    Reply::with_markup(
                        keyboards::note_line(index + 1, note),
                        keyboards::note_actions(note.id),
                    )
                })
                .collect())
        }
        MenuItem::DeleteNotes => {
            conversation.pending = Pending::AwaitingDeleteSelector;
            Ok(vec![Reply::text("Пришли номера заметок\nПример: 1,2,5-7")])
        }
        MenuItem::Search | MenuItem::Reminders => Ok(vec![Reply::text(COMING_SOON)]),
    }
}

/// Handles an inline button press. Unknown payloads are logged and ignored.
pub(crate) async fn handle_callback(
    store: &Store,
    conversation: &mut Conversation,
    owner: OwnerId,
    data: &str,
) -> Result<Vec<Reply>> {
    let data = match data.parse::<CallbackData>() {
        Ok(data) => data,
        Err(err) => {
            warn!("ignoring callback from {owner}: {err}");
            return Ok(Vec::new());
        }
    };

    match data {
        CallbackData::Confirm(note_id) => Ok(vec![Reply::EditMarkup(Some(
            keyboards::confirm_delete(note_id),
        ))]),
        CallbackData::Delete(note_id) => {
            let deleted = store.delete_notes(owner, &[note_id]).await?;
            let text = if deleted > 0 {
                "Заметка удалена ✅"
            } else {
                NOTHING_DELETED
            };
            Ok(vec![Reply::EditText(text.to_string())])
        }
        CallbackData::CancelDelete => Ok(vec![Reply::EditMarkup(None)]),
        CallbackData::Category(category) => {
            if let Some(id) = category {
                if store.find_category(owner, id).await?.is_none() {
                    warn!("owner {owner} picked foreign or missing category {id}");
                    return Ok(vec![Reply::EditText("Категория не найдена".to_string())]);
                }
            }
            conversation.pending = Pending::AwaitingNoteText { category };
            Ok(vec![Reply::EditText(
                "Категория выбрана ✅\nТеперь отправь текст заметки ✍️".to_string(),
            )])
        }
    }
}
