/// Drops every non-ASCII character.
pub fn to_ascii_lossy(s: &str) -> String {
    s.chars().filter(char::is_ascii).collect()
}

/// The `sub_i` file body: the title, then one comment chain per line group.
pub fn render_submission(title: &str, chains: &[String]) -> String {
    let mut parts = Vec::with_capacity(chains.len() + 1);
    parts.push(title);
    parts.extend(chains.iter().map(String::as_str));
    parts.join("\n")
}
