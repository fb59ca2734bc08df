//! XML codec for protocol message trees.
//!
//! Renders an [`Element`] tree as a compact XML document (declaration,
//! escaped text and attributes, no added whitespace) and parses it back.
//! Round trip holds for well-formed trees: element names valid, text not
//! purely whitespace. The pack of SyncML quirks handled on decode:
//! single-quoted attribute delimiters in the XML declaration are
//! normalized to double quotes, and whitespace-only text between child
//! elements is ignored.

use super::{codec_name, Codec, MAX_MESSAGE_SIZE, SYNCML_CTYPE_PREFIX};
use crate::error::{SyncError, SyncResult};
use syncml_types::Element;

/// The XML codec. The only charset supported is UTF-8; the configured
/// value is echoed in the encoded content-type string.
#[derive(Debug, Clone)]
pub struct XmlCodec {
    charset: String,
}

impl XmlCodec {
    /// Creates an XML codec with the standard UTF-8 charset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            charset: "UTF-8".to_string(),
        }
    }

    /// Overrides the charset label echoed in the content type. The bytes
    /// are always UTF-8 regardless of label.
    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }
}

impl Default for XmlCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for XmlCodec {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn encode(&self, tree: &Element) -> SyncResult<(String, Vec<u8>)> {
        let mut out = String::with_capacity(256);
        out.push_str(&format!(
            "<?xml version=\"1.0\" encoding=\"{}\"?>",
            self.charset
        ));
        write_element(&mut out, tree)?;
        if out.len() > MAX_MESSAGE_SIZE {
            return Err(SyncError::Protocol(format!(
                "encoded payload too large: {} bytes",
                out.len()
            )));
        }
        let content_type = format!("{SYNCML_CTYPE_PREFIX}xml; charset={}", self.charset);
        Ok((content_type, out.into_bytes()))
    }

    fn decode(&self, content_type: &str, data: &[u8]) -> SyncResult<Element> {
        if codec_name(content_type)? != "xml" {
            return Err(SyncError::Protocol(format!(
                "content type is not XML: {content_type}"
            )));
        }
        if let Some(charset) = charset_param(content_type) {
            if !charset.eq_ignore_ascii_case("utf-8") {
                return Err(SyncError::Protocol(format!(
                    "unsupported charset: {charset}"
                )));
            }
        }
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(SyncError::Protocol(format!(
                "payload too large: {} bytes",
                data.len()
            )));
        }

        let text = std::str::from_utf8(data)
            .map_err(|e| SyncError::Protocol(format!("payload is not valid UTF-8: {e}")))?;
        let text = text.trim_start_matches('\u{feff}');
        let normalized = normalize_declaration(text);

        let mut parser = Parser::new(&normalized);
        parser.skip_prolog()?;
        let root = parser.parse_element()?;
        parser.skip_whitespace_and_comments()?;
        if !parser.at_end() {
            return Err(parser.error("trailing content after document element"));
        }
        Ok(root)
    }
}

/// Extracts the `charset` parameter from a content-type header, if present.
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}

/// Normalizes single-quoted attribute delimiters inside the XML
/// declaration to double quotes, leaving the document content untouched.
fn normalize_declaration(text: &str) -> String {
    let trimmed_start = text.len() - text.trim_start().len();
    let body = &text[trimmed_start..];
    if let Some(rest) = body.strip_prefix("<?xml") {
        if let Some(end) = rest.find("?>") {
            let decl = &body[..5 + end + 2];
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..trimmed_start]);
            out.push_str(&decl.replace('\'', "\""));
            out.push_str(&body[decl.len()..]);
            return out;
        }
    }
    text.to_string()
}

// ── Writer ───────────────────────────────────────────────────────

fn write_element(out: &mut String, el: &Element) -> SyncResult<()> {
    validate_name(&el.name)?;
    out.push('<');
    out.push_str(&el.name);
    for (name, value) in &el.attrs {
        validate_name(name)?;
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_into(out, value, true);
        out.push('"');
    }
    if el.text.is_none() && el.children.is_empty() {
        out.push_str("/>");
        return Ok(());
    }
    out.push('>');
    if let Some(text) = &el.text {
        escape_into(out, text, false);
    }
    for child in &el.children {
        write_element(out, child)?;
    }
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
    Ok(())
}

fn validate_name(name: &str) -> SyncResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ':' | '-' | '.' | '_'));
    if valid {
        Ok(())
    } else {
        Err(SyncError::Protocol(format!("invalid XML name: {name:?}")))
    }
}

fn escape_into(out: &mut String, value: &str, in_attr: bool) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attr => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

// ── Parser ───────────────────────────────────────────────────────

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self, msg: impl Into<String>) -> SyncError {
        SyncError::Protocol(format!("{} at offset {}", msg.into(), self.pos))
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, pat: &str) -> bool {
        if self.rest().starts_with(pat) {
            self.pos += pat.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, pat: &str) -> SyncResult<()> {
        if self.eat(pat) {
            Ok(())
        } else {
            Err(self.error(format!("expected {pat:?}")))
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Skips the XML declaration, comments, and whitespace before the
    /// document element.
    fn skip_prolog(&mut self) -> SyncResult<()> {
        self.skip_ws();
        if self.rest().starts_with("<?xml") {
            let end = self
                .rest()
                .find("?>")
                .ok_or_else(|| self.error("unterminated XML declaration"))?;
            self.pos += end + 2;
        }
        self.skip_whitespace_and_comments()
    }

    fn skip_whitespace_and_comments(&mut self) -> SyncResult<()> {
        loop {
            self.skip_ws();
            if self.rest().starts_with("<!--") {
                self.skip_comment()?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_comment(&mut self) -> SyncResult<()> {
        self.expect("<!--")?;
        let end = self
            .rest()
            .find("-->")
            .ok_or_else(|| self.error("unterminated comment"))?;
        self.pos += end + 3;
        Ok(())
    }

    fn parse_name(&mut self) -> SyncResult<&'a str> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, ':' | '-' | '.' | '_'))
        {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        Ok(&self.input[start..self.pos])
    }

    fn parse_element(&mut self) -> SyncResult<Element> {
        self.expect("<")?;
        let name = self.parse_name()?;
        let mut element = Element::new(name);

        loop {
            self.skip_ws();
            match self.peek() {
                Some('/') => {
                    self.expect("/>")?;
                    return Ok(element);
                }
                Some('>') => {
                    self.bump();
                    break;
                }
                Some(_) => {
                    let attr_name = self.parse_name()?;
                    self.skip_ws();
                    self.expect("=")?;
                    self.skip_ws();
                    let quote = match self.bump() {
                        Some(q @ ('"' | '\'')) => q,
                        _ => return Err(self.error("expected a quoted attribute value")),
                    };
                    let start = self.pos;
                    let end = self.rest()
                        .find(quote)
                        .ok_or_else(|| self.error("unterminated attribute value"))?;
                    let raw = &self.input[start..start + end];
                    self.pos = start + end + 1;
                    element.attrs.push((attr_name.to_string(), self.unescape(raw)?));
                }
                None => return Err(self.error("unterminated start tag")),
            }
        }

        // Content: text runs, children, comments, then the close tag.
        let mut text = String::new();
        loop {
            if self.rest().starts_with("</") {
                self.pos += 2;
                let close = self.parse_name()?;
                if close != element.name {
                    return Err(self.error(format!(
                        "mismatched close tag: expected </{}>, found </{close}>",
                        element.name
                    )));
                }
                self.skip_ws();
                self.expect(">")?;
                break;
            } else if self.rest().starts_with("<!--") {
                self.skip_comment()?;
            } else if self.peek() == Some('<') {
                element.children.push(self.parse_element()?);
            } else if self.at_end() {
                return Err(self.error(format!("unterminated element <{}>", element.name)));
            } else {
                let start = self.pos;
                while !self.at_end() && self.peek() != Some('<') {
                    self.bump();
                }
                text.push_str(&self.unescape(&self.input[start..self.pos])?);
            }
        }

        if !text.trim().is_empty() {
            element.text = Some(text);
        }
        Ok(element)
    }

    fn unescape(&self, raw: &str) -> SyncResult<String> {
        if !raw.contains('&') {
            return Ok(raw.to_string());
        }
        let mut out = String::with_capacity(raw.len());
        let mut chars = raw.char_indices();
        while let Some((i, c)) = chars.next() {
            if c != '&' {
                out.push(c);
                continue;
            }
            let rest = &raw[i + 1..];
            let end = rest
                .find(';')
                .ok_or_else(|| self.error(format!("unterminated entity in {raw:?}")))?;
            let entity = &rest[..end];
            match entity {
                "amp" => out.push('&'),
                "lt" => out.push('<'),
                "gt" => out.push('>'),
                "quot" => out.push('"'),
                "apos" => out.push('\''),
                _ => {
                    let code = entity
                        .strip_prefix("#x")
                        .map(|h| u32::from_str_radix(h, 16))
                        .or_else(|| entity.strip_prefix('#').map(str::parse))
                        .transpose()
                        .ok()
                        .flatten()
                        .and_then(char::from_u32)
                        .ok_or_else(|| self.error(format!("unknown entity &{entity};")))?;
                    out.push(code);
                }
            }
            // Consume the entity body and trailing semicolon.
            for _ in 0..=end {
                chars.next();
            }
        }
        Ok(out)
    }
}
