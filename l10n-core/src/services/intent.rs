use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::unit::Intent;

static RULES: Lazy<Vec<(Regex, Intent)>> = Lazy::new(|| {
    [
        (r"(button|btn|cta|action|submit|next|prev)$", Intent::Button),
        (r"(title|header|headline|modal_title)$", Intent::Title),
        (r"(error|validation|failed|required)", Intent::Error),
        (r"(label|placeholder|hint)$", Intent::Label),
        (r"(tooltip|helper|description)$", Intent::Tooltip),
    ]
    .into_iter()
    .map(|(re, intent)| (Regex::new(re).expect("intent regex"), intent))
    .collect()
});

/// Guesses a string's UI role from its key.
pub fn infer(key: &str) -> Intent {
    let k = key.to_lowercase();
    RULES
        .iter()
        .find(|(re, _)| re.is_match(&k))
        .map(|(_, intent)| *intent)
        .unwrap_or(Intent::Text)
}
