//! Report rendering (Telegram HTML).

use teloxide::utils::html::escape;

use chatdigest_store::{Category, Fact, FactPayload};

/// Maximum characters of message context shown as an item label.
pub const CONTEXT_PREVIEW_CHARS: usize = 80;

/// Telegram's limit on the text of one message.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Split a rendered report into messages of at most `max_chars` characters.
///
/// Cuts happen at line boundaries; a single line longer than the limit is
/// cut by characters. Always returns at least one chunk.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    fn flush(chunks: &mut Vec<String>, current: &mut String) {
        let chunk = current.trim_matches('\n');
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        current.clear();
    }

    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        if line_len > max_chars {
            flush(&mut chunks, &mut current);
            current_len = 0;
            let chars: Vec<char> = line.chars().collect();
            chunks.extend(chars.chunks(max_chars).map(|piece| piece.iter().collect::<String>()));
            continue;
        }
        if !current.is_empty() && current_len + 1 + line_len > max_chars {
            flush(&mut chunks, &mut current);
            current_len = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }
    flush(&mut chunks, &mut current);

    if chunks.is_empty() {
        chunks.push(text.to_string());
    }
    chunks
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `…`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}

/// Builds links to source messages of one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLinker {
    chat_id: i64,
    username: Option<String>,
}

impl MessageLinker {
    pub fn new(chat_id: i64, username: Option<&str>) -> Self {
        Self {
            chat_id,
            username: username
                .map(|u| u.trim_start_matches('@').to_string())
                .filter(|u| !u.is_empty()),
        }
    }

    /// `https://t.me/<username>/<msg>` for public chats, otherwise
    /// `https://t.me/c/<internal id>/<msg>`.
    pub fn link(&self, message_id: i64) -> String {
        match &self.username {
            Some(username) => format!("https://t.me/{}/{}", username, message_id),
            None => {
                let id = self.chat_id.to_string();
                let internal = id
                    .strip_prefix("-100")
                    .or_else(|| id.strip_prefix('-'))
                    .unwrap_or(&id);
                format!("https://t.me/c/{}/{}", internal, message_id)
            }
        }
    }
}

/// Digest section heading for a category.
pub fn section_heading(category: Category) -> &'static str {
    match category {
        Category::Task => "📝 <b>Задачи:</b>",
        Category::Link => "🔗 <b>Ссылки:</b>",
        Category::Document => "📂 <b>Файлы:</b>",
        Category::Mention => "🔔 <b>Упоминания:</b>",
        Category::Hashtag => "#️⃣ <b>Темы:</b>",
    }
}

/// Title of a single-category listing.
pub fn listing_title(category: Category, window_hours: i64) -> String {
    let what = match category {
        Category::Task => "📝 <b>Важные задачи",
        Category::Link => "🔗 <b>Важные ссылки",
        Category::Document => "📂 <b>Важные файлы",
        Category::Mention => "🔔 <b>Важные упоминания",
        Category::Hashtag => "#️⃣ <b>Важные темы",
    };
    format!("{} за {} ч.</b>", what, window_hours)
}

/// Title of the full digest.
pub fn digest_title(window_hours: i64) -> String {
    format!("<b>📊 СВОДКА ЗА {} Ч.</b>", window_hours)
}

fn bullet(category: Category) -> &'static str {
    match category {
        Category::Task => "▫️",
        Category::Link => "🔹",
        Category::Document => "📄",
        Category::Mention | Category::Hashtag => "•",
    }
}

/// Label for one item: classifier description, else the message context,
/// else the payload.
fn item_label(fact: &Fact) -> String {
    if let Some(about) = fact.classification.about() {
        return about.to_string();
    }
    if !fact.context.trim().is_empty() {
        return truncate_chars(&fact.context, CONTEXT_PREVIEW_CHARS);
    }
    fact.payload.text().to_string()
}

fn item_line(fact: &Fact, linker: &MessageLinker) -> String {
    let link = linker.link(fact.message_id);
    let label = escape(&item_label(fact));
    let mut line = format!(
        "{} <a href=\"{}\">{}</a>",
        bullet(fact.category()),
        escape(&link),
        label
    );
    match &fact.payload {
        FactPayload::Link { url } if label != escape(url) => {
            line.push_str(&format!(" — {}", escape(url)));
        }
        FactPayload::Document { file_name, .. } if fact.classification.about().is_some() => {
            line.push_str(&format!(" ({})", escape(file_name)));
        }
        _ => {}
    }
    line
}

/// Render the body of one category section. `None` when there is nothing
/// to show. Mentions and hashtags are grouped by value in first-seen order.
pub fn render_items(category: Category, facts: &[Fact], linker: &MessageLinker) -> Option<String> {
    let facts: Vec<&Fact> = facts.iter().filter(|f| f.is_important()).collect();
    if facts.is_empty() {
        return None;
    }

    let lines: Vec<String> = match category {
        Category::Mention | Category::Hashtag => {
            let mut groups: Vec<(&str, Vec<&Fact>)> = Vec::new();
            for fact in facts {
                let key = fact.payload.text();
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, members)) => members.push(fact),
                    None => groups.push((key, vec![fact])),
                }
            }
            groups
                .into_iter()
                .flat_map(|(key, members)| {
                    std::iter::once(format!("<b>{}</b>", escape(key)))
                        .chain(members.into_iter().map(|f| format!("  {}", item_line(f, linker))))
                })
                .collect()
        }
        _ => facts.into_iter().map(|f| item_line(f, linker)).collect(),
    };

    Some(lines.join("\n"))
}

/// Render a full digest from per-category important facts. `None` when no
/// section has anything to show.
pub fn render_digest(
    sections: &[(Category, Vec<Fact>)],
    linker: &MessageLinker,
    window_hours: i64,
) -> Option<String> {
    let mut ordered: Vec<&(Category, Vec<Fact>)> = sections.iter().collect();
    ordered.sort_by_key(|(category, _)| *category);

    let blocks: Vec<String> = ordered
        .into_iter()
        .filter_map(|(category, facts)| {
            render_items(*category, facts, linker)
                .map(|body| format!("{}\n{}", section_heading(*category), body))
        })
        .collect();

    if blocks.is_empty() {
        return None;
    }
    Some(format!("{}\n\n{}", digest_title(window_hours), blocks.join("\n\n")))
}

/// Render a single-category listing. `None` when nothing is important.
pub fn render_listing(
    category: Category,
    facts: &[Fact],
    linker: &MessageLinker,
    window_hours: i64,
) -> Option<String> {
    render_items(category, facts, linker)
        .map(|body| format!("{}\n\n{}", listing_title(category, window_hours), body))
}
