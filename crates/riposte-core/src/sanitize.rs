//! Allow-list HTML sanitization for comment bodies.
//!
//! Keeps a fixed set of formatting tags, drops everything else while
//! preserving inner text (script-like tags lose their content too), and
//! re-escapes text so the output is safe to embed as-is. Attribute values
//! are entity-decoded before the href scheme check so encoded `javascript:`
//! tricks cannot slip through. Output is stable under repeated cleaning.

use regex::Regex;

/// Tags that survive sanitization.
const ALLOWED_TAGS: &[&str] = &[
    "a",
    "b",
    "strong",
    "i",
    "em",
    "u",
    "p",
    "br",
    "ul",
    "ol",
    "li",
    "blockquote",
    "code",
];

/// Attributes kept on `<a>` tags. Every other tag loses all attributes.
const LINK_ATTRS: &[&str] = &["href", "title", "rel", "target"];

/// Disallowed tags whose inner content is dropped instead of unwrapped.
const DROP_CONTENT_TAGS: &[&str] = &["script", "style", "textarea", "iframe"];

/// HTML sanitizer with pre-compiled attribute patterns.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    attr_pattern: Regex,
}

impl Sanitizer {
    pub fn new() -> Self {
        Self {
            attr_pattern: Regex::new(
                r#"(?i)([a-z][a-z0-9-]*)\s*(?:=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#,
            )
            .expect("Invalid attribute pattern"),
        }
    }

    /// Reduce arbitrary HTML to the allow-list.
    pub fn clean(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut open: Vec<&'static str> = Vec::new();
        let mut i = 0;

        while let Some(offset) = input[i..].find('<') {
            let lt = i + offset;
            escape_text_into(&mut out, &input[i..lt]);

            let after = &input[lt + 1..];
            let first = after.chars().next();
            let markup = matches!(first, Some(c) if c.is_ascii_alphabetic())
                || matches!(first, Some('/') | Some('!') | Some('?'));

            if !markup {
                // A bare '<' (like "1 < 2") is text.
                out.push_str("&lt;");
                i = lt + 1;
                continue;
            }

            if after.starts_with("!--") {
                match after.find("-->") {
                    Some(end) => {
                        i = lt + 1 + end + 3;
                        continue;
                    }
                    None => {
                        // Unterminated comment swallows the rest.
                        i = input.len();
                        break;
                    }
                }
            }

            match find_tag_end(after) {
                Some(gt) => {
                    let tag_text = &after[..gt];
                    i = lt + 1 + gt + 1;
                    self.emit_tag(tag_text, &mut out, &mut open, input, &mut i);
                }
                None => {
                    // '<' that never closes is text.
                    out.push_str("&lt;");
                    i = lt + 1;
                }
            }
        }

        escape_text_into(&mut out, &input[i..]);

        // Close anything the author left open, innermost first.
        while let Some(name) = open.pop() {
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }

        out
    }

    fn emit_tag(
        &self,
        tag_text: &str,
        out: &mut String,
        open: &mut Vec<&'static str>,
        input: &str,
        i: &mut usize,
    ) {
        if let Some(rest) = tag_text.strip_prefix('/') {
            let name = rest.trim().trim_end_matches('/').to_lowercase();
            if let Some(canon) = allowed_tag(&name) {
                if let Some(pos) = open.iter().rposition(|&t| t == canon) {
                    // Close intervening tags too so output stays balanced.
                    while open.len() > pos {
                        if let Some(tag) = open.pop() {
                            out.push_str("</");
                            out.push_str(tag);
                            out.push('>');
                        }
                    }
                }
                // Stray closer with no opener: dropped.
            }
            return;
        }

        if tag_text.starts_with('!') || tag_text.starts_with('?') {
            // Doctypes and processing instructions are dropped.
            return;
        }

        let name_end = tag_text
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(tag_text.len());
        let name = tag_text[..name_end].to_lowercase();
        let attrs_text = &tag_text[name_end..];

        match allowed_tag(&name) {
            Some("br") => out.push_str("<br />"),
            Some(canon) => {
                out.push('<');
                out.push_str(canon);
                if canon == "a" {
                    self.emit_link_attrs(attrs_text, out);
                }
                out.push('>');
                open.push(canon);
            }
            None => {
                if DROP_CONTENT_TAGS.contains(&name.as_str()) {
                    // Drop the content along with the tag.
                    match find_close_tag(&input[*i..], &name) {
                        Some(rel) => {
                            let close = *i + rel;
                            *i = match input[close..].find('>') {
                                Some(gt) => close + gt + 1,
                                None => input.len(),
                            };
                        }
                        None => *i = input.len(),
                    }
                }
                // Other disallowed tags are unwrapped: markup goes, text stays.
            }
        }
    }

    fn emit_link_attrs(&self, attrs_text: &str, out: &mut String) {
        let mut seen: Vec<String> = Vec::new();

        for caps in self.attr_pattern.captures_iter(attrs_text) {
            let name = caps[1].to_lowercase();
            if !LINK_ATTRS.contains(&name.as_str()) || seen.contains(&name) {
                continue;
            }

            let raw = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or("");
            let value = decode_entities(raw);

            if name == "href" && !href_allowed(&value) {
                continue;
            }

            seen.push(name.clone());
            out.push(' ');
            out.push_str(&name);
            out.push_str("=\"");
            escape_attr_into(out, &value);
            out.push('"');
        }
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

fn allowed_tag(name: &str) -> Option<&'static str> {
    ALLOWED_TAGS.iter().copied().find(|&t| t == name)
}

/// Whether a decoded href carries an acceptable scheme.
fn href_allowed(value: &str) -> bool {
    // Whitespace and control characters are stripped by browsers before
    // scheme resolution, so strip them before checking.
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    let lower = compact.to_lowercase();

    match lower.find(':') {
        None => true,
        Some(pos) => {
            // A ':' after '/', '?' or '#' sits in the path, not the scheme.
            if lower[..pos].contains(['/', '?', '#']) {
                return true;
            }
            matches!(&lower[..pos], "http" | "https" | "mailto")
        }
    }
}

/// Find the '>' ending a tag, honoring quoted attribute values.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '>' => return Some(idx),
                _ => {}
            },
        }
    }
    None
}

/// Find `</name` (ASCII case-insensitive, token-terminated) in `haystack`.
fn find_close_tag(haystack: &str, name: &str) -> Option<usize> {
    let mut start = 0;
    while let Some(rel) = haystack[start..].find("</") {
        let pos = start + rel;
        let after = &haystack[pos + 2..];
        let name_matches = after
            .get(..name.len())
            .map(|s| s.eq_ignore_ascii_case(name))
            .unwrap_or(false);
        let terminated = after
            .get(name.len()..)
            .and_then(|r| r.chars().next())
            .map(|c| c == '>' || c == '/' || c.is_whitespace())
            .unwrap_or(true);
        if name_matches && terminated {
            return Some(pos);
        }
        start = pos + 2;
    }
    None
}

/// Byte length of a well-formed entity starting at `s` (which begins with '&').
fn entity_len(s: &str) -> Option<usize> {
    let rest = s.strip_prefix('&')?;

    if let Some(num) = rest.strip_prefix('#') {
        let (digits, radix_len) = match num.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 3),
            None => (num, 2),
        };
        let count = digits
            .chars()
            .take_while(|c| c.is_ascii_hexdigit())
            .count();
        if count == 0 || count > 7 {
            return None;
        }
        return digits[count..]
            .starts_with(';')
            .then_some(radix_len + count + 1);
    }

    let count = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .count();
    if count == 0 || count > 32 || !rest.chars().next()?.is_ascii_alphabetic() {
        return None;
    }
    rest[count..].starts_with(';').then_some(count + 2)
}

/// Decode the entities this module understands; unknown ones pass through.
fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match entity_len(tail) {
            Some(len) => {
                match decode_entity(&tail[..len]) {
                    Some(decoded) => out.push(decoded),
                    None => out.push_str(&tail[..len]),
                }
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    let inner = &entity[1..entity.len() - 1];

    if let Some(num) = inner.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }

    match inner {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

/// Escape text content. Existing well-formed entities are left alone so
/// cleaning is stable under repetition.
fn escape_text_into(out: &mut String, text: &str) {
    for (idx, c) in text.char_indices() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => {
                if entity_len(&text[idx..]).is_some() {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            _ => out.push(c),
        }
    }
}

/// Escape an attribute value for double-quoted output.
fn escape_attr_into(out: &mut String, value: &str) {
    for (idx, c) in value.char_indices() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '&' => {
                if entity_len(&value[idx..]).is_some() {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(input: &str) -> String {
        Sanitizer::new().clean(input)
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(clean("hello world"), "hello world");
    }

    #[test]
    fn allowed_formatting_survives() {
        assert_eq!(
            clean("<p>some <strong>bold</strong> and <em>italic</em></p>"),
            "<p>some <strong>bold</strong> and <em>italic</em></p>"
        );
        assert_eq!(
            clean("<ul><li>one</li><li>two</li></ul>"),
            "<ul><li>one</li><li>two</li></ul>"
        );
    }

    #[test]
    fn script_is_dropped_with_its_content() {
        assert_eq!(clean("before<script>alert(1)</script>after"), "beforeafter");
        assert_eq!(clean("x<style>body{}</style>y"), "xy");
    }

    #[test]
    fn unterminated_script_drops_the_rest() {
        assert_eq!(clean("safe<script>evil()"), "safe");
    }

    #[test]
    fn disallowed_tags_are_unwrapped() {
        assert_eq!(clean("<div>content</div>"), "content");
        assert_eq!(clean("<img src=x onerror=alert(1)>"), "");
        assert_eq!(clean("<span onclick='x()'>text</span>"), "text");
    }

    #[test]
    fn link_keeps_only_safe_attributes() {
        let out = clean(r#"<a href="https://example.com" onclick="evil()" title="t">x</a>"#);
        assert_eq!(out, r#"<a href="https://example.com" title="t">x</a>"#);
    }

    #[test]
    fn javascript_href_is_dropped() {
        let out = clean(r#"<a href="javascript:alert(1)">x</a>"#);
        assert_eq!(out, "<a>x</a>");
    }

    #[test]
    fn entity_encoded_scheme_is_dropped() {
        // &#106; decodes to 'j'; the browser would see javascript:.
        let out = clean(r#"<a href="&#106;avascript:alert(1)">x</a>"#);
        assert_eq!(out, "<a>x</a>");

        let out = clean("<a href=\"java\tscript:alert(1)\">x</a>");
        assert_eq!(out, "<a>x</a>");
    }

    #[test]
    fn relative_and_mailto_hrefs_survive() {
        assert_eq!(
            clean(r#"<a href="/posts/1#comments">x</a>"#),
            r#"<a href="/posts/1#comments">x</a>"#
        );
        assert_eq!(
            clean(r#"<a href="mailto:a@b.c">x</a>"#),
            r#"<a href="mailto:a@b.c">x</a>"#
        );
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(clean("1 < 2 && 3 > 2"), "1 &lt; 2 &amp;&amp; 3 &gt; 2");
    }

    #[test]
    fn existing_entities_are_not_double_escaped() {
        assert_eq!(clean("a &amp; b"), "a &amp; b");
        assert_eq!(clean("&lt;not a tag&gt;"), "&lt;not a tag&gt;");
    }

    #[test]
    fn comments_and_doctypes_vanish() {
        assert_eq!(clean("a<!-- hidden -->b"), "ab");
        assert_eq!(clean("<!DOCTYPE html>x"), "x");
        assert_eq!(clean("a<!-- never closed"), "a");
    }

    #[test]
    fn unclosed_allowed_tags_get_closed() {
        assert_eq!(clean("<b>bold"), "<b>bold</b>");
        assert_eq!(clean("<p><em>x"), "<p><em>x</em></p>");
    }

    #[test]
    fn stray_closers_are_dropped() {
        assert_eq!(clean("a</b>b"), "ab");
    }

    #[test]
    fn br_normalizes_to_void_form() {
        assert_eq!(clean("a<br>b<BR/>c"), "a<br />b<br />c");
    }

    #[test]
    fn case_insensitive_tag_matching() {
        assert_eq!(clean("<B>x</B>"), "<b>x</b>");
        assert_eq!(clean("<SCRIPT>x</SCRIPT>"), "");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let cases = [
            "plain",
            "<p>some <strong>bold</strong></p>",
            r#"<a href="https://e.com" title="a &amp; b">x</a>"#,
            "1 < 2 && 3 > 2",
            "<div><script>x</script>text</div>",
            "<b>unclosed",
            "a &amp; b &hellip;",
        ];
        let s = Sanitizer::new();
        for case in cases {
            let once = s.clean(case);
            let twice = s.clean(&once);
            assert_eq!(once, twice, "not stable for {:?}", case);
        }
    }

    #[test]
    fn bare_angle_bracket_is_text() {
        assert_eq!(clean("x < y"), "x &lt; y");
        assert_eq!(clean("<3"), "&lt;3");
        assert_eq!(clean("a<"), "a&lt;");
    }

    #[test]
    fn nested_quotes_in_attributes_handled() {
        let out = clean(r#"<a href="/a>b" title='c"d'>x</a>"#);
        assert_eq!(out, r#"<a href="/a&gt;b" title="c&quot;d">x</a>"#);
    }

    #[test]
    fn multibyte_content_survives() {
        assert_eq!(clean("héllo <b>wörld</b> 日本語"), "héllo <b>wörld</b> 日本語");
    }
}
