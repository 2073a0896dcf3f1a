pub mod collection;
pub mod entry;
pub mod genre;
pub mod metadata_id;
pub mod movie;
pub mod request;
pub mod season;
pub mod serie;
pub mod studio;
pub mod videos;

/// Normalize a title for comparisons: lowercase, parenthesised groups
/// removed, separator runs collapsed to a single space.
pub fn clean(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    let mut last_space = true;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            c if is_separator(c) || c.is_whitespace() => {
                if !last_space {
                    out.push(' ');
                    last_space = true;
                }
            }
            c => {
                out.extend(c.to_lowercase());
                last_space = false;
            }
        }
    }
    out.trim_end().to_string()
}

fn is_separator(c: char) -> bool {
    matches!(
        c,
        ':' | '-' | '_' | '/' | '\\' | '&' | '|' | ',' | ';' | '.' | '=' | '"' | '\'' | '+' | '~'
            | '～' | '@' | '`' | 'ー'
    )
}

/// Slug used when creating catalog resources.
pub fn to_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_titles() {
        assert_eq!(clean("One Piece (1999)"), "one piece");
        assert_eq!(clean("Demon Slayer - Kimetsu no Yaiba"), "demon slayer kimetsu no yaiba");
        assert_eq!(clean("Re:Zero"), "re zero");
        assert_eq!(clean("The.Show_S01"), "the show s01");
    }

    #[test]
    fn slugs() {
        assert_eq!(to_slug("One Piece"), "one-piece");
        assert_eq!(to_slug("Zom 100: Bucket List of the Dead"), "zom-100-bucket-list-of-the-dead");
        assert_eq!(to_slug("Mobile Suit Gundam 00"), "mobile-suit-gundam-00");
    }
}
