// Text normalizer: turns an Anki field value (HTML) into one line of plain
// text for a launcher row.
//
// The tokenizer is lenient on purpose. Anki fields are hand edited and often
// not well formed, so anything that does not look like a tag, comment,
// declaration or processing instruction is kept as text and parsing never
// fails.

use std::collections::HashMap;

/// Appended when a value is cut at its first line break.
pub const TRUNCATION_MARKER: &str = " […]";

/// Element whose content is dropped entirely.
const SUPPRESSED_ELEMENT: &str = "style";

/// Strip markup from `input`, trim it and keep only its first line.
pub fn strip_markup(input: &str) -> String {
    let text = extract_text(input);
    let text = text.trim();
    match text.find(|c: char| c == '\n' || c == '\r') {
        Some(end) => format!("{}{}", &text[..end], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Normalized value of the first field in `priority` that `fields` has.
pub fn select_display_field<V: AsRef<str>>(
    fields: &HashMap<String, V>,
    priority: &[String],
) -> Option<String> {
    priority
        .iter()
        .find_map(|name| fields.get(name))
        .map(|value| strip_markup(value.as_ref()))
}

enum Token<'a> {
    Text(&'a str),
    Start { name: String, self_closing: bool },
    End { name: String },
    /// Comments, `<!DOCTYPE ...>`, `<?xml ...?>` and the like.
    Ignored,
}

/// Concatenate the text content of `input` in document order, skipping
/// everything inside `<style>` and decoding character references.
fn extract_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut suppressed = false;

    for token in Tokenizer::new(input) {
        match token {
            Token::Text(text) if !suppressed => {
                out.push_str(&html_escape::decode_html_entities(text));
            }
            Token::Text(_) | Token::Ignored => {}
            Token::Start { name, self_closing } => {
                if name == SUPPRESSED_ELEMENT && !self_closing {
                    suppressed = true;
                }
            }
            Token::End { name } => {
                if name == SUPPRESSED_ELEMENT {
                    suppressed = false;
                }
            }
        }
    }
    out
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    /// Set after `<style>`: its content is raw text up to `</style`, so
    /// `<!--`, `<?` or tags inside the CSS are not parsed.
    raw_text: bool,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Tokenizer {
            input,
            pos: 0,
            raw_text: false,
        }
    }

    /// Try to read markup starting at `start` (which holds a `<`). Returns
    /// the token and the offset just past it, or `None` if it is not markup.
    fn markup_at(&self, start: usize) -> Option<(Token<'a>, usize)> {
        let rest = &self.input[start..];
        let after = &rest[1..];

        if let Some(body) = after.strip_prefix("!--") {
            // An unterminated comment swallows the rest of the input.
            let end = body
                .find("-->")
                .map(|i| start + 4 + i + 3)
                .unwrap_or(self.input.len());
            return Some((Token::Ignored, end));
        }
        if after.starts_with('!') || after.starts_with('?') {
            let end = after.find('>')?;
            return Some((Token::Ignored, start + 1 + end + 1));
        }

        let (closing, name_start) = match after.strip_prefix('/') {
            Some(_) => (true, 2),
            None => (false, 1),
        };
        if !rest[name_start..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }

        let name_len = rest[name_start..]
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .unwrap_or(rest.len() - name_start);
        let name = rest[name_start..name_start + name_len].to_ascii_lowercase();

        let end = find_tag_end(&rest[name_start + name_len..])? + name_start + name_len;
        let self_closing = rest[..end].ends_with('/');
        let token = if closing {
            Token::End { name }
        } else {
            Token::Start { name, self_closing }
        };
        Some((token, start + end + 1))
    }
}

/// Offset of the next `</style` (any case) followed by whitespace, `/` or `>`.
fn find_raw_text_end(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let name = SUPPRESSED_ELEMENT.as_bytes();
    s.match_indices("</").map(|(i, _)| i).find(|&i| {
        let tail = &bytes[i + 2..];
        tail.len() > name.len()
            && tail[..name.len()].eq_ignore_ascii_case(name)
            && matches!(tail[name.len()], b'/' | b'>' | b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
    })
}

/// Offset of the `>` closing a tag, skipping over quoted attribute values.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(i),
            None => {}
        }
    }
    None
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.pos >= self.input.len() {
            return None;
        }

        if self.raw_text {
            self.raw_text = false;
            let end = find_raw_text_end(&self.input[self.pos..])
                .map(|i| self.pos + i)
                .unwrap_or(self.input.len());
            if end > self.pos {
                let text = &self.input[self.pos..end];
                self.pos = end;
                return Some(Token::Text(text));
            }
        }

        if self.input[self.pos..].starts_with('<') {
            if let Some((token, next)) = self.markup_at(self.pos) {
                if let Token::Start { name, self_closing: false } = &token {
                    self.raw_text = name == SUPPRESSED_ELEMENT;
                }
                self.pos = next;
                return Some(token);
            }
            // Not markup: emit the `<` with whatever text follows it.
            let text_end = self.input[self.pos + 1..]
                .find('<')
                .map(|i| self.pos + 1 + i)
                .unwrap_or(self.input.len());
            let text = &self.input[self.pos..text_end];
            self.pos = text_end;
            return Some(Token::Text(text));
        }

        let text_end = self.input[self.pos..]
            .find('<')
            .map(|i| self.pos + i)
            .unwrap_or(self.input.len());
        let text = &self.input[self.pos..text_end];
        self.pos = text_end;
        Some(Token::Text(text))
    }
}
