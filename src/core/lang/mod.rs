pub mod format;
pub mod locale;

pub use format::{parse_lang, write_json_sibling};
pub use locale::{locale_tag, LocaleFilter};
