//! Markdown to HTML rendering for assistant replies.
//!
//! Supports the subset assistants actually produce:
//! - `#` to `######` headings
//! - fenced code blocks (```` ```lang ````)
//! - `-`, `*`, `+` bullet lists and `1.` numbered lists
//! - paragraphs, with single newlines rendered as `<br>`
//! - inline `**bold**`, `__bold__`, `*italic*`, `_italic_`, `` `code` ``,
//!   `~~strike~~` and `[text](url)` links
//!
//! All text is HTML-escaped. Links with other than http(s), mailto or
//! relative targets render as plain text.

/// Inline element kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
enum InlineKind {
    Bold,
    Italic,
    Code,
    Strike,
    Link(String),
}

impl InlineKind {
    fn open_tag(&self) -> String {
        match self {
            Self::Bold => "<strong>".to_string(),
            Self::Italic => "<em>".to_string(),
            Self::Code => "<code>".to_string(),
            Self::Strike => "<del>".to_string(),
            Self::Link(url) => format!("<a href=\"{}\">", escape_html(url)),
        }
    }

    fn close_tag(&self) -> &'static str {
        match self {
            Self::Bold => "</strong>",
            Self::Italic => "</em>",
            Self::Code => "</code>",
            Self::Strike => "</del>",
            Self::Link(_) => "</a>",
        }
    }
}

/// A detected inline span in the source text.
#[derive(Debug, Clone)]
struct InlineSpan {
    /// Start position in source text (including markers).
    start: usize,
    /// End position in source text (including markers).
    end: usize,
    content_start: usize,
    content_end: usize,
    kind: InlineKind,
}

/// Render markdown to an HTML fragment.
pub fn render_html(markdown: &str) -> String {
    let mut html = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut list: Option<(bool, Vec<&str>)> = None;
    let mut lines = markdown.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();

        if let Some(lang) = trimmed.strip_prefix("```") {
            flush_paragraph(&mut paragraph, &mut html);
            flush_list(&mut list, &mut html);
            let mut code = Vec::new();
            for code_line in lines.by_ref() {
                if code_line.trim_start().starts_with("```") {
                    break;
                }
                code.push(code_line);
            }
            html.push(code_block(lang.trim(), &code.join("\n")));
            continue;
        }

        if trimmed.is_empty() {
            flush_paragraph(&mut paragraph, &mut html);
            flush_list(&mut list, &mut html);
            continue;
        }

        if let Some((level, text)) = heading(trimmed) {
            flush_paragraph(&mut paragraph, &mut html);
            flush_list(&mut list, &mut html);
            html.push(format!("<h{level}>{}</h{level}>", render_inline(text)));
            continue;
        }

        if let Some((ordered, item)) = list_item(trimmed) {
            flush_paragraph(&mut paragraph, &mut html);
            match list.as_mut() {
                Some((current, items)) if *current == ordered => items.push(item),
                _ => {
                    flush_list(&mut list, &mut html);
                    list = Some((ordered, vec![item]));
                }
            }
            continue;
        }

        flush_list(&mut list, &mut html);
        paragraph.push(trimmed);
    }

    flush_paragraph(&mut paragraph, &mut html);
    flush_list(&mut list, &mut html);
    html.join("\n")
}

fn flush_paragraph(paragraph: &mut Vec<&str>, html: &mut Vec<String>) {
    if paragraph.is_empty() {
        return;
    }
    let body: Vec<String> = paragraph.iter().map(|line| render_inline(line)).collect();
    html.push(format!("<p>{}</p>", body.join("<br>\n")));
    paragraph.clear();
}

fn flush_list(list: &mut Option<(bool, Vec<&str>)>, html: &mut Vec<String>) {
    let Some((ordered, items)) = list.take() else {
        return;
    };
    let tag = if ordered { "ol" } else { "ul" };
    let mut out = format!("<{}>\n", tag);
    for item in items {
        out.push_str(&format!("<li>{}</li>\n", render_inline(item)));
    }
    out.push_str(&format!("</{}>", tag));
    html.push(out);
}

fn code_block(lang: &str, code: &str) -> String {
    if lang.is_empty() {
        format!("<pre><code>{}</code></pre>", escape_html(code))
    } else {
        format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            escape_html(lang),
            escape_html(code)
        )
    }
}

/// `## Title` -> `(2, "Title")`.
fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if rest.is_empty() {
        return Some((level, ""));
    }
    rest.strip_prefix(' ').map(|text| (level, text.trim()))
}

/// `- item` -> `(false, "item")`, `3. item` -> `(true, "item")`.
fn list_item(line: &str) -> Option<(bool, &str)> {
    for bullet in ["- ", "* ", "+ "] {
        if let Some(item) = line.strip_prefix(bullet) {
            return Some((false, item.trim()));
        }
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(item) = line[digits..].strip_prefix(". ") {
            return Some((true, item.trim()));
        }
    }
    None
}

/// Render inline markup within one line of text.
pub fn render_inline(input: &str) -> String {
    let mut spans: Vec<InlineSpan> = Vec::new();

    // Order matters: code protects its content, longer markers before shorter
    find_spans(input, "`", InlineKind::Code, false, &mut spans);
    find_links(input, &mut spans);
    find_spans(input, "**", InlineKind::Bold, false, &mut spans);
    find_spans(input, "__", InlineKind::Bold, true, &mut spans);
    find_spans(input, "~~", InlineKind::Strike, false, &mut spans);
    find_spans(input, "*", InlineKind::Italic, false, &mut spans);
    find_spans(input, "_", InlineKind::Italic, true, &mut spans);

    let spans = remove_overlapping(spans);

    let mut output = String::with_capacity(input.len() + spans.len() * 16);
    let mut pos = 0;
    for span in &spans {
        if span.start > pos {
            output.push_str(&escape_html(&input[pos..span.start]));
        }
        let content = &input[span.content_start..span.content_end];
        output.push_str(&span.kind.open_tag());
        if span.kind == InlineKind::Code {
            output.push_str(&escape_html(content));
        } else {
            output.push_str(&render_inline(content));
        }
        output.push_str(span.kind.close_tag());
        pos = span.end;
    }
    if pos < input.len() {
        output.push_str(&escape_html(&input[pos..]));
    }
    output
}

/// Find all spans delimited by `marker` on both sides.
///
/// With `word_boundary`, markers touching alphanumerics on the outside are
/// ignored so `snake_case_names` stay intact.
fn find_spans(
    input: &str,
    marker: &str,
    kind: InlineKind,
    word_boundary: bool,
    spans: &mut Vec<InlineSpan>,
) {
    let bytes = input.as_bytes();
    let marker_bytes = marker.as_bytes();
    let len = marker.len();

    let mut pos = 0;
    while pos < input.len() {
        let Some(rel_start) = find_pattern(&bytes[pos..], marker_bytes) else {
            break;
        };
        let start = pos + rel_start;
        let content_start = start + len;

        if word_boundary && start > 0 && bytes[start - 1].is_ascii_alphanumeric() {
            pos = start + 1;
            continue;
        }

        if content_start < input.len() {
            if let Some(rel_end) = find_pattern(&bytes[content_start..], marker_bytes) {
                let content_end = content_start + rel_end;
                let end = content_end + len;
                let boundary_ok = !word_boundary
                    || end >= input.len()
                    || !bytes[end].is_ascii_alphanumeric();
                let content = &input[content_start..content_end];

                if rel_end > 0 && boundary_ok && !content.trim().is_empty() {
                    let overlaps = spans.iter().any(|s| {
                        (start >= s.start && start < s.end) || (end > s.start && end <= s.end)
                    });

                    if !overlaps {
                        spans.push(InlineSpan {
                            start,
                            end,
                            content_start,
                            content_end,
                            kind: kind.clone(),
                        });
                        pos = end;
                        continue;
                    }
                }
            }
        }
        pos = start + 1;
    }
}

/// Find `[text](url)` links.
fn find_links(input: &str, spans: &mut Vec<InlineSpan>) {
    let mut pos = 0;
    while let Some(rel) = input[pos..].find('[') {
        let start = pos + rel;
        let content_start = start + 1;
        let parsed = input[content_start..].find("](").and_then(|rel_mid| {
            let content_end = content_start + rel_mid;
            let url_start = content_end + 2;
            input[url_start..].find(')').map(|rel_close| {
                let url_end = url_start + rel_close;
                (content_end, url_start, url_end)
            })
        });

        if let Some((content_end, url_start, url_end)) = parsed {
            let url = input[url_start..url_end].trim();
            let end = url_end + 1;
            let overlaps = spans
                .iter()
                .any(|s| (start >= s.start && start < s.end) || (end > s.start && end <= s.end));
            if content_end > content_start && is_safe_url(url) && !overlaps {
                spans.push(InlineSpan {
                    start,
                    end,
                    content_start,
                    content_end,
                    kind: InlineKind::Link(url.to_string()),
                });
                pos = end;
                continue;
            }
        }
        pos = start + 1;
    }
}

fn is_safe_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    !url.is_empty()
        && !url.contains(char::is_whitespace)
        && (lower.starts_with("http://")
            || lower.starts_with("https://")
            || lower.starts_with("mailto:")
            || url.starts_with('/')
            || url.starts_with('#'))
}

/// Find a byte pattern in a slice.
fn find_pattern(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Remove overlapping spans, keeping the earliest.
fn remove_overlapping(mut spans: Vec<InlineSpan>) -> Vec<InlineSpan> {
    spans.sort_by_key(|s| s.start);

    let mut result = Vec::with_capacity(spans.len());
    let mut last_end = 0;
    for span in spans {
        if span.start >= last_end {
            last_end = span.end;
            result.push(span);
        }
    }
    result
}

/// Escape text for inclusion in HTML content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_formats() {
        assert_eq!(render_inline("Hello **world**!"), "Hello <strong>world</strong>!");
        assert_eq!(render_inline("Hello *world*!"), "Hello <em>world</em>!");
        assert_eq!(render_inline("Use `code` here"), "Use <code>code</code> here");
        assert_eq!(render_inline("This is ~~wrong~~ right"), "This is <del>wrong</del> right");
        assert_eq!(render_inline("__bold__ and _italic_"), "<strong>bold</strong> and <em>italic</em>");
    }

    #[test]
    fn test_nested_inline() {
        assert_eq!(
            render_inline("**Read *Moon Cat* now**"),
            "<strong>Read <em>Moon Cat</em> now</strong>"
        );
    }

    #[test]
    fn test_code_protects_markers() {
        assert_eq!(render_inline("`a * b * c`"), "<code>a * b * c</code>");
    }

    #[test]
    fn test_snake_case_is_not_italic() {
        assert_eq!(render_inline("call get_book_content now"), "call get_book_content now");
    }

    #[test]
    fn test_unclosed_markers() {
        assert_eq!(render_inline("Hello **world"), "Hello **world");
    }

    #[test]
    fn test_escaping() {
        assert_eq!(
            render_inline("<script>alert('x')</script> & **<b>**"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; <strong>&lt;b&gt;</strong>"
        );
    }

    #[test]
    fn test_links() {
        assert_eq!(
            render_inline("See [the book](https://example.com/b?id=1&x=2)."),
            "See <a href=\"https://example.com/b?id=1&amp;x=2\">the book</a>."
        );
        assert_eq!(
            render_inline("[bad](javascript:alert(1))"),
            "[bad](javascript:alert(1))"
        );
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let html = render_html("# Title\n\nFirst line\nsecond line\n\n### Small");
        assert_eq!(
            html,
            "<h1>Title</h1>\n<p>First line<br>\nsecond line</p>\n<h3>Small</h3>"
        );
    }

    #[test]
    fn test_lists() {
        let html = render_html("Books:\n- **Moon Cat**\n- Star Dog\n\n1. one\n2. two");
        assert_eq!(
            html,
            "<p>Books:</p>\n<ul>\n<li><strong>Moon Cat</strong></li>\n<li>Star Dog</li>\n</ul>\n<ol>\n<li>one</li>\n<li>two</li>\n</ol>"
        );
    }

    #[test]
    fn test_fenced_code() {
        let html = render_html("```rust\nlet x = 1 < 2;\n```\nafter");
        assert_eq!(
            html,
            "<pre><code class=\"language-rust\">let x = 1 &lt; 2;</code></pre>\n<p>after</p>"
        );
    }

    #[test]
    fn test_unterminated_fence_takes_rest() {
        let html = render_html("```\ncode **not bold**");
        assert_eq!(html, "<pre><code>code **not bold**</code></pre>");
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(render_html("Plain text message"), "<p>Plain text message</p>");
        assert_eq!(render_html(""), "");
    }
}
