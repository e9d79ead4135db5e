/// Canonical form used for fingerprinting.
///
/// Trims the ends, unifies line endings and collapses runs of spaces and
/// tabs. Case, punctuation and placeholder tokens are left alone since they
/// change what a translation should look like.
pub fn normalize(text: &str) -> String {
    let text = text.trim().replace("\r\n", "\n");

    let mut out = String::with_capacity(text.len());
    let mut in_gap = false;

    for ch in text.chars() {
        if ch == ' ' || ch == '\t' {
            if !in_gap {
                out.push(' ');
            }
            in_gap = true;
        } else {
            out.push(ch);
            in_gap = false;
        }
    }

    out
}
