use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Site languages.
///
/// `Fr` is the primary language and is served without a path prefix;
/// `En` lives under `/en`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    En,
}

impl Language {
    pub const PRIMARY: Language = Language::Fr;

    pub const ALL: [Language; 2] = [Language::Fr, Language::En];

    pub fn code(self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::En => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "fr" => Some(Language::Fr),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    /// Path prefix for this language; empty for the primary language.
    pub fn prefix(self) -> &'static str {
        match self {
            Language::Fr => "",
            Language::En => "/en",
        }
    }

    /// Detect the language of a request path (`/en` or `/en/...` → `En`).
    pub fn from_path(path: &str) -> Self {
        let rest = match path.strip_prefix("/en") {
            Some(rest) => rest,
            None => return Language::PRIMARY,
        };
        if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') {
            Language::En
        } else {
            Language::PRIMARY
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::from_code(s).ok_or_else(|| format!("unknown language code: {s}"))
    }
}
