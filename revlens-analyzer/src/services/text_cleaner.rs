//! Default review text cleaner
//!
//! Applies the fixed cleaning substeps in order:
//! 1. html - drop tags (and script/style bodies), decode entities
//! 2. encoding - repair common UTF-8-read-as-Latin-1 mojibake
//! 3. emoji - remove emoji and pictographs
//! 4. control - replace control and invisible format characters with spaces
//! 5. whitespace - collapse runs of whitespace, trim
//!
//! Text that is not predominantly Latin script is tagged `und` and rejected
//! (`clean = None`). The hash is always taken over the original text.

use super::collaborators::TextCleaner;
use crate::models::CleanedText;
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("static regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("static regex"));

/// Mojibake sequences and their repaired form, longest first
const MOJIBAKE: &[(&str, &str)] = &[
    ("â€™", "'"),
    ("â€˜", "'"),
    ("â€œ", "\""),
    ("â€\u{9d}", "\""),
    ("â€“", "-"),
    ("â€”", "-"),
    ("â€¦", "..."),
    ("Ã©", "é"),
    ("Ã¨", "è"),
    ("Ã¡", "á"),
    ("Ã±", "ñ"),
    ("Ã¶", "ö"),
    ("Ã¼", "ü"),
    ("Â ", " "),
    ("Â", ""),
];

/// Language tag for accepted text
pub const LANG_ENGLISH: &str = "en";
/// Language tag for rejected text
pub const LANG_UNDETERMINED: &str = "und";

/// Minimum share of Latin letters among all letters for text to be accepted
const MIN_LATIN_SHARE: f64 = 0.6;

#[derive(Debug, Clone, Default)]
pub struct StandardCleaner;

impl StandardCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Clean one review text
    pub fn clean_one(&self, original: &str) -> CleanedText {
        let hash = hash_text(original);

        let text = strip_html(original);
        let text = fix_encoding(&text);
        let text = strip_emoji(&text);
        let text = strip_control(&text);
        let text = normalize_whitespace(&text);

        if text.is_empty() {
            return CleanedText {
                clean: None,
                lang: LANG_UNDETERMINED.to_string(),
                hash,
            };
        }

        let lang = detect_language(&text);
        let clean = (lang == LANG_ENGLISH).then_some(text);
        CleanedText {
            clean,
            lang: lang.to_string(),
            hash,
        }
    }
}

#[async_trait::async_trait]
impl TextCleaner for StandardCleaner {
    async fn clean_batch(&self, texts: Vec<String>) -> Result<Vec<CleanedText>> {
        Ok(texts.iter().map(|t| self.clean_one(t)).collect())
    }
}

/// SHA-256 hex digest
pub fn hash_text(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

fn strip_html(text: &str) -> String {
    let without_code = SCRIPT_STYLE_RE.replace_all(text, " ");
    let without_tags = TAG_RE.replace_all(&without_code, " ");
    ENTITY_RE
        .replace_all(&without_tags, |caps: &regex::Captures| {
            decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entity(entity: &str) -> Option<String> {
    let decoded = match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "hellip" => return Some("...".to_string()),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)?
        }
    };
    Some(decoded.to_string())
}

fn fix_encoding(text: &str) -> String {
    let mut fixed = text.to_string();
    for (broken, repaired) in MOJIBAKE {
        if fixed.contains(broken) {
            fixed = fixed.replace(broken, repaired);
        }
    }
    fixed
}

fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F000..=0x1FAFF   // pictographs, emoticons, transport, flags, symbols
            | 0x2600..=0x27BF // misc symbols, dingbats
            | 0x2B00..=0x2BFF // arrows and stars
            | 0xFE00..=0xFE0F // variation selectors
            | 0x200D          // zero-width joiner
            | 0x20E3          // keycap
            | 0xE0020..=0xE007F
    )
}

fn strip_emoji(text: &str) -> String {
    text.chars().filter(|&c| !is_emoji(c)).collect()
}

fn is_invisible_format(c: char) -> bool {
    matches!(c as u32, 0x00AD | 0x200B..=0x200F | 0x202A..=0x202E | 0x2060..=0x2064 | 0xFEFF)
}

fn strip_control(text: &str) -> String {
    text.chars()
        .map(|c| {
            if (c.is_control() && !c.is_whitespace()) || is_invisible_format(c) {
                ' '
            } else {
                c
            }
        })
        .collect()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn detect_language(text: &str) -> &'static str {
    let letters = text.chars().filter(|c| c.is_alphabetic());
    let (mut latin, mut total) = (0usize, 0usize);
    for c in letters {
        total += 1;
        if (c as u32) < 0x0250 {
            latin += 1;
        }
    }

    // Digits and punctuation only: nothing to judge, keep it
    if total == 0 || latin as f64 / total as f64 >= MIN_LATIN_SHARE {
        LANG_ENGLISH
    } else {
        LANG_UNDETERMINED
    }
}
