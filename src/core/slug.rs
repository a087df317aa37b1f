/// Folds the Latin-1 accented letters that show up in catalog data to ASCII.
fn fold_accent(ch: char) -> Option<char> {
    let folded = match ch {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' | 'Á' | 'À' | 'Ä' | 'Â' | 'Ã' | 'Å' => 'a',
        'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' | 'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
        'ñ' | 'Ñ' => 'n',
        'ç' | 'Ç' => 'c',
        c if c.is_ascii() => c,
        _ => return None,
    };
    Some(folded)
}

/// URL slug: ASCII lowercase words joined by single hyphens.
///
/// Underscores survive, other punctuation is dropped, and runs of
/// whitespace or hyphens collapse into one hyphen.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.chars().filter_map(fold_accent) {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else if ch == '-' || ch.is_ascii_whitespace() {
            pending_dash = true;
        }
    }

    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// First free slug among `base`, `base-2`, `base-3`, ...
pub fn unique_slug<F>(base: &str, mut is_taken: F) -> crate::utils::error::Result<String>
where
    F: FnMut(&str) -> crate::utils::error::Result<bool>,
{
    let mut candidate = base.to_string();
    let mut counter = 2;
    while is_taken(&candidate)? {
        candidate = format!("{}-{}", base, counter);
        counter += 1;
    }
    Ok(candidate)
}
