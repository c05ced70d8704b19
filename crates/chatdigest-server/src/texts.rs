//! User-facing bot messages.

use chatdigest_runtime::{DigestOutcome, ListingOutcome};
use chatdigest_store::{Category, ChatSettings, DigestMode};
use teloxide::utils::html::escape;

use crate::keyboards::category_label;

pub const HELP: &str = "Привет! Я собираю задачи, ссылки, файлы, упоминания и хэштеги из чата \
и раз в сутки делаю сводку самого важного.\n\n\
/on — начать сбор в этом чате\n\
/off — остановить сбор\n\
/settings — режим и состав сводки\n\
/summary — сводка за последние сутки\n\
/tasks, /links, /docs, /mentions, /hashtags — важное по одной категории";

pub const ACTIVATED: &str = "✅ <b>Бот активирован!</b>\nЯ начал собирать ссылки, задачи и файлы.";
pub const DEACTIVATED: &str = "🛑 <b>Бот остановлен.</b>\nСбор данных прекращён.";
pub const ADMIN_ONLY: &str = "⛔️ Настраивать бота может только администратор чата.";
pub const ADMIN_ONLY_SHORT: &str = "Только для администраторов!";
pub const CHAT_NOT_FOUND: &str = "Чат не найден. Напишите /on";
pub const GENERIC_ERROR: &str = "⚠️ Что-то пошло не так. Попробуйте позже.";
pub const DIGEST_PENDING: &str = "⏳ Собираю сводку...";
pub const MANUAL_MODE_ON: &str = "Включён ручной режим";
pub const ASK_TIME: &str = "⌨️ Введите время сводки (МСК) в формате ЧЧ:ММ.\n\
Например: <b>09:00</b> или <b>18:30</b>";
pub const BAD_TIME: &str = "⚠️ Неверный формат времени!\n\
Попробуйте ещё раз (например: 18:00) или нажмите /settings для отмены.";
pub const CHOOSE_FIELDS: &str = "Выберите данные для сводки:";

pub fn listing_pending(category: Category) -> String {
    format!("🔎 Проверяю: {}...", category_label(category).to_lowercase())
}

pub fn time_set(time: &str) -> String {
    format!("✅ Время <b>{}</b> установлено! Авто-сводка включена.", escape(time))
}

pub fn mode_title(settings: &ChatSettings) -> String {
    let mode = match settings.digest_mode {
        DigestMode::Auto => "Авто",
        DigestMode::Manual => "Ручной",
    };
    format!("Текущий режим: {}", mode)
}

/// Settings overview shown with the main menu.
pub fn settings_status(chat_title: &str, settings: &ChatSettings) -> String {
    let status = if settings.is_active {
        "🟢 Включён"
    } else {
        "🔴 Выключен (напишите /on)"
    };

    let mode = match (settings.digest_mode, settings.digest_time) {
        (DigestMode::Auto, Some(time)) => format!("🤖 Автоматический (в {})", time.format("%H:%M")),
        (DigestMode::Auto, None) => "🤖 Автоматический".to_string(),
        (DigestMode::Manual, _) => "🖐 Ручной".to_string(),
    };

    let enabled: Vec<&str> = settings
        .enabled_categories()
        .into_iter()
        .map(category_label)
        .collect();
    let fields = if enabled.is_empty() {
        "Ничего (пустая сводка)".to_string()
    } else {
        enabled.join(", ")
    };

    format!(
        "⚙️ <b>Настройки:</b> {}\nСтатус бота: {}\n\n<b>Режим:</b> {}\n<b>Состав сводки:</b> {}",
        escape(chat_title),
        status,
        mode,
        fields
    )
}

/// Reply text for a digest outcome.
pub fn digest_reply(outcome: DigestOutcome, window_hours: i64) -> String {
    match outcome {
        DigestOutcome::NotActive => "❌ Бот не активирован в этом чате. Напишите /on".into(),
        DigestOutcome::NothingFound => {
            format!("📭 За последние {} ч. данных не найдено.", window_hours)
        }
        DigestOutcome::TemporaryFailure => {
            "⚠️ Сервис анализа временно недоступен. Попробуйте через минуту.".into()
        }
        DigestOutcome::NothingImportant => format!(
            "🤷 За последние {} ч. данные были, но ничего важного не нашлось.",
            window_hours
        ),
        DigestOutcome::Report(text) => text,
    }
}

/// Reply text for a category listing outcome.
pub fn listing_reply(outcome: ListingOutcome, category: Category, window_hours: i64) -> String {
    let label = category_label(category).to_lowercase();
    match outcome {
        ListingOutcome::Empty => format!(
            "📭 За последние {} ч. в категории «{}» ничего не было.",
            window_hours, label
        ),
        ListingOutcome::TemporaryFailure => {
            "⚠️ Сервис анализа временно недоступен. Попробуйте через минуту.".into()
        }
        ListingOutcome::NothingImportant => format!(
            "🤷 В категории «{}» за {} ч. ничего важного (мемы, спам или оффтоп).",
            label, window_hours
        ),
        ListingOutcome::Report(text) => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_settings_status() {
        let settings = ChatSettings {
            chat_id: 1,
            title: None,
            username: None,
            is_active: true,
            digest_mode: DigestMode::Auto,
            digest_time: NaiveTime::from_hms_opt(9, 5, 0),
            include_tasks: true,
            include_links: false,
            include_documents: false,
            include_mentions: false,
            include_hashtags: true,
            last_auto_digest_on: None,
            created_at: 0,
            updated_at: None,
        };
        let text = settings_status("R&D <team>", &settings);
        assert!(text.contains("R&amp;D &lt;team&gt;"));
        assert!(text.contains("(в 09:05)"));
        assert!(text.contains("Задачи, Хэштеги"));
    }

    #[test]
    fn test_outcome_replies() {
        assert!(digest_reply(DigestOutcome::NotActive, 24).contains("/on"));
        assert_eq!(digest_reply(DigestOutcome::Report("r".into()), 24), "r");
        assert!(listing_reply(ListingOutcome::Empty, Category::Link, 24).contains("ссылки"));
    }
}
