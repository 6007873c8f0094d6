use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use crate::payload::CallbackData;
use crate::store::{Category, NoteRow};

const PREVIEW_CHARS: usize = 60;
pub(crate) const NO_CATEGORY: &str = "Без категории";

/// Reply-keyboard entries. Labels are matched exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MenuItem {
    NewNote,
    MyNotes,
    Categories,
    DeleteNotes,
    Search,
    Reminders,
}

impl MenuItem {
    pub(crate) const ALL: [MenuItem; 6] = [
        MenuItem::NewNote,
        MenuItem::MyNotes,
        MenuItem::Categories,
        MenuItem::DeleteNotes,
        MenuItem::Search,
        MenuItem::Reminders,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            MenuItem::NewNote => "➕ Новая заметка",
            MenuItem::MyNotes => "📋 Мои заметки",
            MenuItem::Categories => "📂 Категории",
            MenuItem::DeleteNotes => "❌ Удалить заметки",
            MenuItem::Search => "🔍 Поиск",
            MenuItem::Reminders => "⏰ Напоминания",
        }
    }

    pub(crate) fn from_label(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|item| item.label() == text)
    }
}

pub(crate) fn main_menu() -> KeyboardMarkup {
    let rows = MenuItem::ALL
        .iter()
        .map(|item| vec![KeyboardButton::new(item.label())])
        .collect::<Vec<_>>();
    KeyboardMarkup::new(rows).resize_keyboard(true)
}

fn button(label: impl Into<String>, data: CallbackData) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, data.to_string())
}

/// One row per category plus a trailing "no category" row.
pub(crate) fn category_picker(categories: &[Category]) -> InlineKeyboardMarkup {
    let mut rows = categories
        .iter()
        .map(|category| vec![button(category.name.clone(), CallbackData::Category(Some(category.id)))])
        .collect::<Vec<_>>();
    rows.push(vec![button(NO_CATEGORY, CallbackData::Category(None))]);
    InlineKeyboardMarkup::new(rows)
}

pub(crate) fn note_actions(note_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("❌ Удалить", CallbackData::Confirm(note_id))]])
}

pub(crate) fn confirm_delete(note_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("✅ Да", CallbackData::Delete(note_id)),
        button("❌ Нет", CallbackData::CancelDelete),
    ]])
}

pub(crate) fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// `N. [category] preview` for the `number`-th listed note.
pub(crate) fn note_line(number: usize, note: &NoteRow) -> String {
    let category = note.category.as_deref().unwrap_or(NO_CATEGORY);
    format!("{}. [{}] {}", number, category, preview(&note.text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn payloads(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn labels_round_trip() {
        for item in MenuItem::ALL {
            assert_eq!(MenuItem::from_label(item.label()), Some(item));
        }
        assert_eq!(MenuItem::from_label("📋 мои заметки"), None);
        assert_eq!(MenuItem::from_label("Мои заметки"), None);
    }

    #[test]
    fn picker_ends_with_no_category() {
        let categories = vec![
            Category { id: 4, name: "Work".to_string() },
            Category { id: 9, name: "Home".to_string() },
        ];
        let markup = category_picker(&categories);
        assert_eq!(payloads(&markup), vec!["cat_4", "cat_9", "cat_none"]);
        assert_eq!(markup.inline_keyboard[2][0].text, NO_CATEGORY);
    }

    #[test]
    fn confirm_offers_yes_and_no() {
        assert_eq!(payloads(&note_actions(5)), vec!["confirm_5"]);
        assert_eq!(payloads(&confirm_delete(5)), vec!["delete_5", "cancel_delete"]);
    }

    #[test]
    fn preview_truncates_by_characters() {
        let short = "ж".repeat(60);
        assert_eq!(preview(&short), short);
        let long = "ж".repeat(61);
        assert_eq!(preview(&long), format!("{}…", "ж".repeat(60)));
    }

    #[test]
    fn note_line_labels_missing_category() {
        let note = NoteRow {
            id: 3,
            text: "Buy milk".to_string(),
            category: None,
        };
        assert_eq!(note_line(1, &note), "1. [Без категории] Buy milk");
    }
}
