//! Escaping for text embedded in pdfmark strings and their XHTML bodies

/// Strip NUL bytes
pub fn sanitize(text: &str) -> String {
    text.replace('\0', "")
}

/// Escape text for a PostScript string that also carries XHTML rich content.
///
/// `\ ( ) [ ] { } %` get a backslash, `<` and `>` become entities, NULs vanish.
/// The backslash itself must be doubled or a trailing `\)` would close the
/// string early.
pub fn escape_ps(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '(' | ')' | '[' | ']' | '{' | '}' | '%' => {
                out.push('\\');
                out.push(ch);
            }
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\0' => {}
            _ => out.push(ch),
        }
    }
    out
}

/// Entity-escape angle brackets and strip NULs
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\0' => {}
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_ps_specials() {
        assert_eq!(escape_ps("(a) [b] {c} 5%"), r"\(a\) \[b\] \{c\} 5\%");
    }

    #[test]
    fn test_escape_ps_doubles_backslash() {
        assert_eq!(escape_ps(r"C:\) x"), r"C:\\\) x");
        assert_eq!(escape_ps(r"a\b"), r"a\\b");
    }

    #[test]
    fn test_escape_ps_entities_and_nul() {
        assert_eq!(escape_ps("<b>\0x</b>"), "&lt;b&gt;x&lt;/b&gt;");
    }

    #[test]
    fn test_escape_html_leaves_parens() {
        assert_eq!(escape_html("(<i>)"), "(&lt;i&gt;)");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("a\0b\0"), "ab");
    }
}
