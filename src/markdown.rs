use pulldown_cmark::{html, CowStr, Event, Options, Parser};
use scraper::Html;

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options.insert(Options::ENABLE_MATH);
    options
}

pub fn render_markdown_to_html(markdown: &str) -> String {
    let normalized_markdown = normalize_latex_delimiters(markdown);
    let parser =
        Parser::new_ext(&normalized_markdown, markdown_options()).map(|event| match event {
            Event::InlineMath(math) => math_event(&math, false),
            Event::DisplayMath(math) => math_event(&math, true),
            other => other,
        });

    let mut html_out = String::new();
    html::push_html(&mut html_out, parser);
    html_out
}

fn math_event(math: &str, display_mode: bool) -> Event<'static> {
    Event::Html(CowStr::Boxed(render_math_html(math, display_mode).into_boxed_str()))
}

/// Visible text of an HTML fragment with whitespace collapsed.
///
/// KaTeX output carries a MathML copy next to the rendered spans, so math
/// shows up twice here; search and word counts tolerate that.
pub fn plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len() / 2);
    for chunk in fragment.root_element().text() {
        for word in chunk.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

/// Estimated reading time in whole minutes, never less than one.
pub fn reading_time(text: &str, words_per_minute: usize) -> usize {
    let words = text.split_whitespace().count();
    words.div_ceil(words_per_minute.max(1)).max(1)
}

/// First `max_chars` characters of `text`, cut back to a word boundary.
pub fn excerpt_from_text(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(i, _)| i);
    let head = &text[..cut];
    let at_boundary = text[cut..].starts_with(char::is_whitespace);
    let head = match head.rfind(char::is_whitespace) {
        Some(space) if space > 0 && !at_boundary => &head[..space],
        _ => head,
    };
    format!("{}…", head.trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == '.'))
}

fn normalize_latex_delimiters(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        if let Some((open, close, display_mode)) = delimiter_at(input, i) {
            let content_start = i + open.len();
            if let Some(close_at) = input[content_start..].find(close) {
                let content_end = content_start + close_at;
                let content = &input[content_start..content_end];
                if display_mode || content.contains('\n') {
                    out.push_str("$$");
                    out.push_str(content);
                    out.push_str("$$");
                } else {
                    out.push('$');
                    out.push_str(content);
                    out.push('$');
                }
                i = content_end + close.len();
                continue;
            }
        }

        if let Some(ch) = input[i..].chars().next() {
            out.push(ch);
            i += ch.len_utf8();
        } else {
            break;
        }
    }

    out
}

fn delimiter_at(input: &str, index: usize) -> Option<(&'static str, &'static str, bool)> {
    let tail = &input[index..];
    if tail.starts_with("\\(") {
        Some(("\\(", "\\)", false))
    } else if tail.starts_with("\\[") {
        Some(("\\[", "\\]", true))
    } else {
        None
    }
}

fn render_math_html(source: &str, display_mode: bool) -> String {
    let mut opts = katex::Opts::builder();
    opts.display_mode(display_mode);

    let rendered = match opts.build() {
        Ok(opts) => katex::render_with_opts(source, opts),
        Err(_) => return fallback_math_html(source, display_mode),
    };

    match rendered {
        Ok(html) => html,
        Err(_) => fallback_math_html(source, display_mode),
    }
}

fn fallback_math_html(source: &str, display_mode: bool) -> String {
    let class_name = if display_mode { "math math-display" } else { "math math-inline" };
    let escaped = htmlescape::encode_minimal(source);
    format!("<span class=\"{class_name}\">{escaped}</span>")
}
