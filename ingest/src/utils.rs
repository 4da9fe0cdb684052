use regex::Regex;

/// Canonical form for category names so filtering never splits on
/// capitalization or stray punctuation: underscores become spaces,
/// everything outside letters, digits, dashes, and spaces is dropped,
/// whitespace is collapsed, and the result is lowercased.
pub fn sanitize_category(input: &str) -> String {
    let underscores = Regex::new(r"_+").unwrap();
    let disallowed = Regex::new(r"[^A-Za-z0-9- ]").unwrap();
    let spaces = Regex::new(r" +").unwrap();

    let s = underscores.replace_all(input, " ");
    let s = disallowed.replace_all(&s, "");
    let s = spaces.replace_all(s.trim(), " ");

    s.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::sanitize_category;

    #[test]
    fn test_basic() {
        assert_eq!(sanitize_category("Sejarah"), "sejarah");
        assert_eq!(sanitize_category("sastra_jawa"), "sastra jawa");
        assert_eq!(sanitize_category("Primbon-Kuno!"), "primbon-kuno");
    }

    #[test]
    fn test_leading_trailing_spaces() {
        assert_eq!(sanitize_category("   sejarah   "), "sejarah");
        assert_eq!(sanitize_category("  sastra   lama  "), "sastra lama");
    }

    #[test]
    fn test_special_characters() {
        assert_eq!(sanitize_category("!@#$%^&*()"), "");
        assert_eq!(sanitize_category("babad123!@#"), "babad123");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(sanitize_category(""), "");
        assert_eq!(sanitize_category("     "), "");
    }
}
