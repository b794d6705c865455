// ─── Locale Tags ───
// File names vary between editions and eras (`en_US.lang`, `en_us.json`,
// `en_US-pocket.lang`); the export filter works on a normalized tag (`en-US`).

use std::collections::BTreeSet;

/// Normalize a language file name (or bare stem) into a locale tag.
///
/// `en_us.json` → `en-US`, `zh_CN-pocket.lang` → `zh-CN`.
pub fn locale_tag(file_name: &str) -> String {
    let name = file_name.rsplit('/').next().unwrap_or(file_name);
    let stem = name
        .strip_suffix(".json")
        .or_else(|| name.strip_suffix(".lang"))
        .unwrap_or(name)
        .replace('_', "-");
    let stem = stem.strip_suffix("-pocket").unwrap_or(&stem);

    let mut parts = stem.split('-');
    let mut tag = parts.next().unwrap_or_default().to_string();
    for part in parts {
        tag.push('-');
        tag.push_str(&part.to_ascii_uppercase());
    }
    tag
}

/// Which locales to export. Empty means everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleFilter {
    allowed: BTreeSet<String>,
}

impl LocaleFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list such as the `EXPORT_LANGUAGES` value.
    pub fn parse(list: &str) -> Self {
        let allowed = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(locale_tag)
            .collect();
        Self { allowed }
    }

    pub fn is_all(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn allows(&self, file_name: &str) -> bool {
        self.is_all() || self.allowed.contains(&locale_tag(file_name))
    }
}
