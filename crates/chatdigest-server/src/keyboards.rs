//! Settings menu keyboards and callback data.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use chatdigest_store::{Category, ChatSettings, DigestMode};

/// One button per row.
fn column(buttons: Vec<(String, SettingsAction)>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        buttons
            .into_iter()
            .map(|(text, action)| vec![InlineKeyboardButton::callback(text, action.data())]),
    )
}

/// A settings-menu button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsAction {
    Home,
    ModeMenu,
    FieldsMenu,
    SetManual,
    /// Ask for a digest time (enables auto mode once entered).
    AskTime,
    Toggle(Category),
    Close,
}

impl SettingsAction {
    pub fn data(&self) -> String {
        match self {
            Self::Home => "settings_home".into(),
            Self::ModeMenu => "settings_mode_menu".into(),
            Self::FieldsMenu => "settings_summary_menu".into(),
            Self::SetManual => "set_mode_manual".into(),
            Self::AskTime => "set_mode_auto".into(),
            Self::Toggle(category) => format!("toggle_field_{}", category.toggle_code()),
            Self::Close => "delete_message".into(),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "settings_home" => Some(Self::Home),
            "settings_mode_menu" => Some(Self::ModeMenu),
            "settings_summary_menu" => Some(Self::FieldsMenu),
            "set_mode_manual" => Some(Self::SetManual),
            "set_mode_auto" => Some(Self::AskTime),
            "delete_message" => Some(Self::Close),
            _ => data
                .strip_prefix("toggle_field_")
                .and_then(Category::from_toggle_code)
                .map(Self::Toggle),
        }
    }
}

/// Category name shown in settings.
pub fn category_label(category: Category) -> &'static str {
    match category {
        Category::Task => "Задачи",
        Category::Link => "Ссылки",
        Category::Document => "Файлы",
        Category::Mention => "Упоминания",
        Category::Hashtag => "Хэштеги",
    }
}

pub fn main_menu() -> InlineKeyboardMarkup {
    column(vec![
        ("🕹 Режим сводки".into(), SettingsAction::ModeMenu),
        ("📝 Состав сводки".into(), SettingsAction::FieldsMenu),
        ("✖️ Закрыть".into(), SettingsAction::Close),
    ])
}

pub fn mode_menu(settings: &ChatSettings) -> InlineKeyboardMarkup {
    let mut buttons = match settings.digest_mode {
        DigestMode::Manual => vec![("🟢 Включить авто-режим".into(), SettingsAction::AskTime)],
        DigestMode::Auto => vec![
            ("✏️ Изменить время".into(), SettingsAction::AskTime),
            ("🖐 Переключить на ручной".into(), SettingsAction::SetManual),
        ],
    };
    buttons.push(("🔙 Назад".into(), SettingsAction::Home));
    column(buttons)
}

pub fn fields_menu(settings: &ChatSettings) -> InlineKeyboardMarkup {
    let mut buttons: Vec<(String, SettingsAction)> = Category::all()
        .iter()
        .map(|category| {
            let mark = if settings.includes(*category) { "✅" } else { "❌" };
            (
                format!("{} {}", mark, category_label(*category)),
                SettingsAction::Toggle(*category),
            )
        })
        .collect();
    buttons.push(("🔙 Назад".into(), SettingsAction::Home));
    column(buttons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn settings(mode: DigestMode) -> ChatSettings {
        ChatSettings {
            chat_id: 1,
            title: None,
            username: None,
            is_active: true,
            digest_mode: mode,
            digest_time: None,
            include_tasks: true,
            include_links: false,
            include_documents: true,
            include_mentions: true,
            include_hashtags: true,
            last_auto_digest_on: None,
            created_at: 0,
            updated_at: None,
        }
    }

    #[test]
    fn test_action_data_round_trip() {
        let actions = [
            SettingsAction::Home,
            SettingsAction::ModeMenu,
            SettingsAction::FieldsMenu,
            SettingsAction::SetManual,
            SettingsAction::AskTime,
            SettingsAction::Toggle(Category::Document),
            SettingsAction::Close,
        ];
        for action in actions {
            assert_eq!(SettingsAction::parse(&action.data()), Some(action));
        }
        assert_eq!(SettingsAction::Toggle(Category::Document).data(), "toggle_field_files");
        assert_eq!(SettingsAction::parse("toggle_field_bogus"), None);
        assert_eq!(SettingsAction::parse("something_else"), None);
    }

    fn callback_data(button: &InlineKeyboardButton) -> &str {
        match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => data.as_str(),
            other => panic!("unexpected button kind {:?}", other),
        }
    }

    #[test]
    fn test_fields_menu_marks_toggles() {
        let kb = fields_menu(&settings(DigestMode::Manual));
        assert_eq!(kb.inline_keyboard.len(), 6);
        assert_eq!(kb.inline_keyboard[1][0].text, "❌ Ссылки");
        assert_eq!(callback_data(&kb.inline_keyboard[1][0]), "toggle_field_links");
        assert_eq!(kb.inline_keyboard[0][0].text, "✅ Задачи");
    }

    #[test]
    fn test_mode_menu_depends_on_mode() {
        assert_eq!(mode_menu(&settings(DigestMode::Manual)).inline_keyboard.len(), 2);
        let auto = mode_menu(&settings(DigestMode::Auto));
        assert_eq!(auto.inline_keyboard.len(), 3);
        assert_eq!(callback_data(&auto.inline_keyboard[1][0]), "set_mode_manual");
    }

    #[test]
    fn test_main_menu_buttons() {
        let kb = main_menu();
        let data: Vec<&str> = kb.inline_keyboard.iter().map(|row| callback_data(&row[0])).collect();
        assert_eq!(data, ["settings_mode_menu", "settings_summary_menu", "delete_message"]);
    }
}
