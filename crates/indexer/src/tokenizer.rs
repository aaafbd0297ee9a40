use std::collections::BTreeSet;

/// Split a declared name into the lower-cased sub-tokens it is indexed under.
///
/// Separators are `_`, `-` and any other non-alphanumeric character; case
/// boundaries split too (`parseHTTPRequest` → `parse`, `http`, `request`). The
/// whole lower-cased name is always included.
pub fn split_name_tokens(name: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();

    let whole = name.to_lowercase();
    if !whole.is_empty() {
        tokens.insert(whole);
    }

    for part in name.split(|c: char| !c.is_alphanumeric()) {
        for word in split_case_boundaries(part) {
            tokens.insert(word.to_lowercase());
        }
    }

    tokens
}

/// `parseHTTPRequest` → [`parse`, `HTTP`, `Request`]
fn split_case_boundaries(part: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = part.char_indices().collect();
    let mut words = Vec::new();
    let mut start = 0;

    for i in 1..chars.len() {
        let (idx, current) = chars[i];
        let prev = chars[i - 1].1;
        let next = chars.get(i + 1).map(|(_, c)| *c);

        let lower_to_upper = prev.is_lowercase() && current.is_uppercase();
        let acronym_end =
            prev.is_uppercase() && current.is_uppercase() && next.is_some_and(char::is_lowercase);

        if lower_to_upper || acronym_end {
            words.push(&part[start..idx]);
            start = idx;
        }
    }

    if start < part.len() {
        words.push(&part[start..]);
    }
    words
}
