// ─── .lang Format ───
// Minecraft `.lang` files are `key=value` lines with `#` comments. Bedrock
// appends trailing comments after a tab (`key=value\t#comment`).

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::core::error::{SyncError, SyncResult};

const BOM: char = '\u{feff}';

/// Parse `.lang` text into an insertion-ordered key/value map.
///
/// Blank lines, `#` comment lines and lines without `=` are skipped. A key
/// that appears twice keeps its first position and its last value.
pub fn parse_lang(content: &str) -> Map<String, Value> {
    let mut entries = Map::new();

    for raw in content.trim_start_matches(BOM).lines() {
        let line = raw.trim_end_matches('\r');
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = match value.find("\t#") {
            Some(idx) => &value[..idx],
            None => value,
        };
        entries.insert(key.to_string(), Value::String(value.trim_end().to_string()));
    }

    entries
}

/// Render a language map the way every JSON file in the tree is written.
pub fn render_json(entries: &Map<String, Value>) -> SyncResult<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(entries)?)
}

/// Write `<name>.json` next to a `.lang` file holding the parsed content.
pub fn write_json_sibling(lang_path: &Path, raw: &[u8]) -> SyncResult<PathBuf> {
    let text = String::from_utf8_lossy(raw);
    let json = render_json(&parse_lang(&text))?;
    let json_path = lang_path.with_extension("json");
    std::fs::write(&json_path, json).map_err(|e| SyncError::io(&json_path, e))?;
    Ok(json_path)
}
