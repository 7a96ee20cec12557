// Display helpers shared by the command layer


use chrono::NaiveDateTime;

use crate::database::FileType;
use crate::embeddings::Chunk;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human readable byte count. Each step truncates to a whole number of the next unit.
#[inline]
pub fn format_file_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = size_bytes;
    let mut unit = 0;
    while size >= 1024 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024;
        unit += 1;
    }

    format!("{}.0 {}", size, SIZE_UNITS[unit])
}

#[inline]
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Replace characters that are unsafe in file names and tidy the result
#[inline]
pub fn sanitize_filename(filename: &str) -> String {
    let mut cleaned = String::with_capacity(filename.len());
    for c in filename.chars() {
        let c = if matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') {
            '_'
        } else {
            c
        };
        if c == '_' && cleaned.ends_with('_') {
            continue;
        }
        cleaned.push(c);
    }

    let trimmed = cleaned.trim_matches(|c| c == '_' || c == '.');
    if trimmed.is_empty() {
        "unnamed_file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Cut `text` to at most `max_length` characters, ending in `...` when shortened
#[inline]
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_length.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Whitespace-collapsed preview, broken at a word boundary near `length` when possible
#[inline]
pub fn extract_text_preview(text: &str, length: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= length {
        return collapsed;
    }

    let mut kept: Vec<char> = collapsed.chars().take(length).collect();
    let last_space = kept.iter().rposition(|&c| c == ' ');
    if let Some(last_space) = last_space.filter(|&i| i * 5 > length * 4) {
        kept.truncate(last_space);
    }

    let mut preview: String = kept.into_iter().collect();
    preview.push_str("...");
    preview
}

#[inline]
pub fn file_type_icon(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Pdf => "📄",
        FileType::Md => "📝",
        FileType::Html | FileType::Htm => "🌐",
    }
}

/// Rough model token count at three words per four tokens
#[inline]
pub fn estimate_tokens(text: &str) -> usize {
    text.split_whitespace().count() * 4 / 3
}

#[inline]
pub fn chunk_summary(chunk: &Chunk) -> String {
    format!(
        "Chunk {} ({} words): {}",
        chunk.chunk_id,
        chunk.word_count,
        truncate_text(&chunk.text, 50)
    )
}
