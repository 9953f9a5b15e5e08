//! MIME text extraction: one plain-text string out of a multi-part message.

use mail_parser::{Message, PartType};

/// Extract a single plain-text string from a parsed message.
///
/// All `text/plain` leaf parts are concatenated in document order; when none
/// exist, `text/html` leaf parts are used with markup stripped and
/// whitespace collapsed. Charset decoding is handled lossily by the parser,
/// so this never fails; a message with no textual leaves yields an empty
/// string, which is a valid result.
pub fn message_text(message: &Message) -> String {
    let mut plain = Vec::new();
    let mut html = Vec::new();

    for part in &message.parts {
        match &part.body {
            PartType::Text(text) => plain.push(text.as_ref()),
            PartType::Html(markup) => html.push(markup.as_ref()),
            _ => {}
        }
    }

    if !plain.is_empty() {
        return plain.join("\n").trim().to_string();
    }

    html.iter()
        .map(|markup| strip_html(markup))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Strip HTML tags from content and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                // Tag boundaries separate words ("<p>a</p><p>b</p>").
                result.push(' ');
            }
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip quoted text from a reply body before it is handed to enrichment.
///
/// Removes `>`-prefixed quote lines, cuts at "On ... wrote:" attribution
/// lines and at "--- Original Message ---" separators.
pub fn strip_quoted_text(body: &str) -> String {
    let mut result = Vec::new();
    let mut skip_rest = false;

    for line in body.lines() {
        if skip_rest {
            break;
        }

        let trimmed = line.trim();

        if trimmed.starts_with('>') {
            continue;
        }

        if trimmed.starts_with("On ") && trimmed.ends_with("wrote:") {
            skip_rest = true;
            continue;
        }

        if trimmed.starts_with("---") && trimmed.contains("Original Message") {
            skip_rest = true;
            continue;
        }

        result.push(line);
    }

    while result.last().is_some_and(|l| l.trim().is_empty()) {
        result.pop();
    }

    result.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mail_parser::MessageParser;

    fn parse(raw: &str) -> Message<'_> {
        MessageParser::default().parse(raw.as_bytes()).unwrap()
    }

    // ── message_text tests ──────────────────────────────────────────

    #[test]
    fn plain_body_extracted() {
        let raw = "From: a@x.com\r\nSubject: Hi\r\n\
                   Content-Type: text/plain\r\n\r\nHello there\r\n";
        assert_eq!(message_text(&parse(raw)), "Hello there");
    }

    #[test]
    fn html_fallback_strips_tags_and_collapses_whitespace() {
        let raw = "From: a@x.com\r\nSubject: Hi\r\n\
                   Content-Type: text/html\r\n\r\n<b>Hello</b> world\r\n";
        assert_eq!(message_text(&parse(raw)), "Hello world");
    }

    #[test]
    fn multipart_prefers_plain_over_html() {
        let raw = concat!(
            "From: a@x.com\r\n",
            "Subject: Hi\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: multipart/alternative; boundary=\"b1\"\r\n\r\n",
            "--b1\r\n",
            "Content-Type: text/plain\r\n\r\n",
            "plain version\r\n",
            "--b1\r\n",
            "Content-Type: text/html\r\n\r\n",
            "<p>html version</p>\r\n",
            "--b1--\r\n",
        );
        assert_eq!(message_text(&parse(raw)), "plain version");
    }

    #[test]
    fn multiple_plain_parts_concatenated_in_order() {
        let raw = concat!(
            "From: a@x.com\r\n",
            "Subject: Hi\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: multipart/mixed; boundary=\"b1\"\r\n\r\n",
            "--b1\r\n",
            "Content-Type: text/plain\r\n\r\n",
            "first\r\n",
            "--b1\r\n",
            "Content-Type: text/plain\r\n\r\n",
            "second\r\n",
            "--b1--\r\n",
        );
        let text = message_text(&parse(raw));
        let first = text.find("first").unwrap();
        let second = text.find("second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn unknown_charset_yields_best_effort_text() {
        let raw = "From: a@x.com\r\nSubject: Hi\r\n\
                   Content-Type: text/plain; charset=\"x-no-such-charset\"\r\n\r\n\
                   Best effort body\r\n";
        let text = message_text(&parse(raw));
        assert!(!text.is_empty());
        assert!(text.contains("Best effort"));
    }

    // ── strip_html tests ────────────────────────────────────────────

    #[test]
    fn strip_html_basic() {
        assert_eq!(strip_html("<p>Hello</p>"), "Hello");
    }

    #[test]
    fn strip_html_nested_tags() {
        assert_eq!(
            strip_html("<div><b>Bold</b> and <i>italic</i></div>"),
            "Bold and italic"
        );
    }

    #[test]
    fn strip_html_with_attributes() {
        assert_eq!(strip_html(r#"<a href="https://x.com">Link</a>"#), "Link");
    }

    #[test]
    fn strip_html_plain_text_passthrough() {
        assert_eq!(strip_html("No HTML here"), "No HTML here");
    }

    // ── strip_quoted_text tests ─────────────────────────────────────

    #[test]
    fn strip_basic_quoted_lines() {
        let body = "Hello!\n\n> This is quoted\n> Another quoted line\nThanks";
        assert_eq!(strip_quoted_text(body), "Hello!\n\nThanks");
    }

    #[test]
    fn strip_on_wrote_attribution() {
        let body =
            "Sounds good!\n\nOn Mon, Jan 1, 2026 at 10:00 AM Alice <a@x.com> wrote:\n> Original";
        assert_eq!(strip_quoted_text(body), "Sounds good!");
    }

    #[test]
    fn strip_original_message_separator() {
        let body = "My reply\n\n--- Original Message ---\nOld stuff here";
        assert_eq!(strip_quoted_text(body), "My reply");
    }

    #[test]
    fn strip_no_quotes_passthrough() {
        let body = "Just a normal message\nWith multiple lines";
        assert_eq!(strip_quoted_text(body), body);
    }
}
