use regex::Regex;
use std::sync::OnceLock;

/// Marker that starts a bullet in product descriptions.
pub const CHECK_MARK: char = '✅';

fn excess_newlines() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("static pattern is valid"))
}

/// Normalises a product description:
/// line endings become `\n`, every check mark that is not at the start and
/// not already on its own line gets a line break before it, and runs of
/// three or more newlines collapse to a blank line.
///
/// Applying it twice gives the same result as applying it once.
pub fn normalize_description(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len() + 8);
    let mut prev: Option<char> = None;
    for ch in unified.chars() {
        if ch == CHECK_MARK && prev.is_some() && prev != Some('\n') {
            out.push('\n');
        }
        out.push(ch);
        prev = Some(ch);
    }

    excess_newlines().replace_all(&out, "\n\n").into_owned()
}
