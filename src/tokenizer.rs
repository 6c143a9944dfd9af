//! Permissive markup tokenizer.
//!
//! A single forward scan over the source, yielding tokens in source
//! order. Tokenization never fails: anything that does not match a
//! markup construct degrades to character data, including a bare `<`
//! that opens nothing (the "runaway `<`"), which is kept as a literal in
//! the surrounding text run.
//!
//! Supported tag-name characters (ASCII only): `[A-Za-z0-9:_-]`.
//! Attribute keys are any run excluding whitespace, `<`, `>` and `=`.
//!
//! The scanner is driven token by token so the tree builder can flip
//! [`Tokenizer::set_xml`] mid-stream; the XML flag controls raw-text
//! capture for `script`/`style`, which only exists in HTML parsing.

use crate::entities::decode_entities;
use crate::tags;
use memchr::memchr;
use std::collections::VecDeque;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// Character data, entity-decoded, never empty.
    Text(String),
    /// Processing-instruction body (between `<?` and `?>`), verbatim.
    Pi(String),
    /// Comment body (between `<!--` and `--`), verbatim.
    Comment(String),
    /// CDATA body (between `<![CDATA[` and `]]>`), verbatim.
    Cdata(String),
    /// Doctype payload (between `<!DOCTYPE` and `>`), verbatim.
    Doctype(String),
    StartTag {
        /// As written in the source; the tree builder case-folds per mode.
        name: String,
        /// Source order, duplicates included; the tree builder folds them
        /// into a map where the last occurrence wins.
        attrs: Vec<(String, Option<String>)>,
        self_closing: bool,
    },
    EndTag(String),
    /// Verbatim `script`/`style` body, never empty.
    Raw(String),
}

/// Outcome of probing the markup construct at a `<`.
enum Scan {
    Token(Token),
    /// Consumed without producing a token (dropped unterminated doctype).
    Swallow,
    /// No construct matched; the `<` is literal text.
    Runaway,
}

pub struct Tokenizer<'src> {
    source: &'src str,
    cursor: usize,
    xml: bool,
    /// Pending character data, undecoded; runaway `<`s accumulate here so
    /// a run like `a < b` stays a single text token.
    text: String,
    queue: VecDeque<Token>,
}

impl<'src> Tokenizer<'src> {
    pub fn new(source: &'src str, xml: bool) -> Self {
        Self {
            source,
            cursor: 0,
            xml,
            text: String::new(),
            queue: VecDeque::new(),
        }
    }

    /// Update the mode for tokens not yet produced. Called by the driver
    /// after the tree builder latches XML off a processing instruction.
    pub fn set_xml(&mut self, xml: bool) {
        self.xml = xml;
    }

    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Some(token);
            }
            if self.cursor >= self.source.len() {
                return self.flush_text();
            }
            self.step();
        }
    }

    /// Advance past the next construct, growing the text buffer or
    /// pushing one or more tokens onto the queue.
    fn step(&mut self) {
        let bytes = self.source.as_bytes();
        let lt = match memchr(b'<', &bytes[self.cursor..]) {
            Some(rel) => self.cursor + rel,
            None => {
                self.text.push_str(&self.source[self.cursor..]);
                self.cursor = bytes.len();
                return;
            }
        };
        self.text.push_str(&self.source[self.cursor..lt]);
        self.cursor = lt;
        match self.scan_markup() {
            Scan::Token(token) => self.emit(token),
            Scan::Swallow => {}
            Scan::Runaway => {
                self.text.push('<');
                self.cursor = lt + 1;
            }
        }
    }

    fn flush_text(&mut self) -> Option<Token> {
        if self.text.is_empty() {
            return None;
        }
        let decoded = decode_entities(&self.text).into_owned();
        self.text.clear();
        if decoded.is_empty() {
            None
        } else {
            Some(Token::Text(decoded))
        }
    }

    /// Queue `token`, preceded by any pending text and followed by the
    /// raw body and synthetic end tag when it opens a raw-text element.
    fn emit(&mut self, token: Token) {
        if let Some(text) = self.flush_text() {
            self.queue.push_back(text);
        }
        let capture = match &token {
            Token::StartTag {
                name, self_closing, ..
            } if !self.xml && !*self_closing && tags::is_raw_text(&name.to_ascii_lowercase()) => {
                Some(name.clone())
            }
            _ => None,
        };
        self.queue.push_back(token);
        if let Some(name) = capture {
            self.capture_raw_text(&name);
        }
    }

    /// Consume everything up to (not including) `</name>` as one raw
    /// token, then the end tag itself. Case-insensitive close match,
    /// whitespace allowed before `>`. Without a close tag the rest of the
    /// document is raw and the end tag is synthesized.
    fn capture_raw_text(&mut self, name: &str) {
        let rest = &self.source[self.cursor..];
        log::trace!(target: "laxdom.tokenizer", "raw-text capture for <{name}>");
        match find_raw_close(rest, name) {
            Some((body_end, resume)) => {
                if body_end > 0 {
                    self.queue.push_back(Token::Raw(rest[..body_end].to_string()));
                }
                self.cursor += resume;
            }
            None => {
                log::trace!(target: "laxdom.tokenizer", "unterminated <{name}>, raw to end of input");
                if !rest.is_empty() {
                    self.queue.push_back(Token::Raw(rest.to_string()));
                }
                self.cursor = self.source.len();
            }
        }
        self.queue.push_back(Token::EndTag(name.to_string()));
    }

    /// Probe the construct at `self.cursor` (which sits on a `<`),
    /// advancing the cursor past it on a match.
    fn scan_markup(&mut self) -> Scan {
        let rest = &self.source[self.cursor..];
        if rest.starts_with("<?") {
            return Scan::Token(self.take_delimited("<?", "?>", Token::Pi));
        }
        if rest.starts_with("<!--") {
            return Scan::Token(self.take_comment());
        }
        if rest.starts_with("<![CDATA[") {
            return Scan::Token(self.take_delimited("<![CDATA[", "]]>", Token::Cdata));
        }
        if starts_with_ignore_ascii_case(rest, b"<!DOCTYPE") {
            return self.take_doctype();
        }
        if rest.starts_with("</") {
            return self.take_end_tag();
        }
        self.take_start_tag()
    }

    /// PI and CDATA share a shape: fixed open marker, fixed close marker,
    /// verbatim body. An unterminated body runs to the end of input.
    fn take_delimited(
        &mut self,
        open: &str,
        close: &str,
        build: fn(String) -> Token,
    ) -> Token {
        let body_start = self.cursor + open.len();
        match self.source[body_start..].find(close) {
            Some(rel) => {
                let body = &self.source[body_start..body_start + rel];
                self.cursor = body_start + rel + close.len();
                build(body.to_string())
            }
            None => {
                let body = &self.source[body_start..];
                self.cursor = self.source.len();
                build(body.to_string())
            }
        }
    }

    /// Comment terminator is `--`, optionally followed by whitespace,
    /// then `>`. The body excludes the `--`.
    fn take_comment(&mut self) -> Token {
        let body_start = self.cursor + "<!--".len();
        let bytes = self.source.as_bytes();
        let mut i = body_start;
        while let Some(rel) = self.source[i..].find("--") {
            let dashes = i + rel;
            let mut k = dashes + 2;
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < bytes.len() && bytes[k] == b'>' {
                let body = &self.source[body_start..dashes];
                self.cursor = k + 1;
                return Token::Comment(body.to_string());
            }
            i = dashes + 1;
        }
        let body = &self.source[body_start..];
        self.cursor = self.source.len();
        Token::Comment(body.to_string())
    }

    /// The payload may contain quoted external identifiers and an
    /// internal subset in `[…]`; a `>` inside either does not end the
    /// token. An unterminated doctype is dropped.
    fn take_doctype(&mut self) -> Scan {
        let payload_start = self.cursor + "<!DOCTYPE".len();
        let bytes = self.source.as_bytes();
        let mut quote: Option<u8> = None;
        let mut depth = 0usize;
        let mut k = payload_start;
        while k < bytes.len() {
            let b = bytes[k];
            match quote {
                Some(q) => {
                    if b == q {
                        quote = None;
                    }
                }
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'[' => depth += 1,
                    b']' => depth = depth.saturating_sub(1),
                    b'>' if depth == 0 => {
                        let payload = &self.source[payload_start..k];
                        self.cursor = k + 1;
                        return Scan::Token(Token::Doctype(payload.to_string()));
                    }
                    _ => {}
                },
            }
            k += 1;
        }
        self.cursor = self.source.len();
        Scan::Swallow
    }

    fn take_end_tag(&mut self) -> Scan {
        let bytes = self.source.as_bytes();
        let name_start = self.cursor + 2;
        let mut j = name_start;
        while j < bytes.len() && is_name_byte(bytes[j]) {
            j += 1;
        }
        if j == name_start {
            return Scan::Runaway;
        }
        let name = &self.source[name_start..j];
        // Junk between the name and `>` is ignored, as in `</div foo>`.
        while j < bytes.len() && bytes[j] != b'>' {
            j += 1;
        }
        self.cursor = (j + 1).min(self.source.len());
        Scan::Token(Token::EndTag(name.to_string()))
    }

    fn take_start_tag(&mut self) -> Scan {
        let bytes = self.source.as_bytes();
        let name_start = self.cursor + 1;
        let mut j = name_start;
        while j < bytes.len() && is_name_byte(bytes[j]) {
            j += 1;
        }
        if j == name_start {
            return Scan::Runaway;
        }
        let name = &self.source[name_start..j];

        // Find the tag end; `>` inside a quoted value does not count.
        let mut quote: Option<u8> = None;
        let mut k = j;
        while k < bytes.len() {
            let b = bytes[k];
            match quote {
                Some(q) => {
                    if b == q {
                        quote = None;
                    }
                }
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'>' => break,
                    _ => {}
                },
            }
            k += 1;
        }
        if k >= bytes.len() {
            return Scan::Runaway;
        }

        let mut region = self.source[j..k].trim_end();
        let self_closing = region.ends_with('/');
        if self_closing {
            region = &region[..region.len() - 1];
        }
        let attrs = parse_attrs(region);
        self.cursor = k + 1;
        Scan::Token(Token::StartTag {
            name: name.to_string(),
            attrs,
            self_closing,
        })
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn starts_with_ignore_ascii_case(haystack: &str, needle: &[u8]) -> bool {
    let hay = haystack.as_bytes();
    hay.len() >= needle.len() && hay[..needle.len()].eq_ignore_ascii_case(needle)
}

/// Attribute grammar over the raw region between the tag name and `>`
/// (self-closing slash already stripped): a key is a run excluding
/// whitespace and `<>=`, optionally followed by `=` and a double-quoted,
/// single-quoted or unquoted value. Values are entity-decoded; a key of
/// `/` is a stray self-closing marker fragment and is dropped.
fn parse_attrs(region: &str) -> Vec<(String, Option<String>)> {
    let bytes = region.as_bytes();
    let mut attrs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let key_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'<' | b'>' | b'=')
        {
            i += 1;
        }
        if i == key_start {
            // Stray `=` or `<`; skip it rather than stall.
            i += 1;
            continue;
        }
        let key = &region[key_start..i];

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = None;
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let q = bytes[i];
                i += 1;
                let value_start = i;
                while i < bytes.len() && bytes[i] != q {
                    i += 1;
                }
                value = Some(decode_entities(&region[value_start..i]).into_owned());
                if i < bytes.len() {
                    i += 1;
                }
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                value = Some(decode_entities(&region[value_start..i]).into_owned());
            }
        }
        if key == "/" {
            continue;
        }
        attrs.push((key.to_string(), value));
    }
    attrs
}

/// Locate `</name>` (ASCII case-insensitive, whitespace allowed before
/// `>`) in `haystack`. Returns the body length and the offset just past
/// the close tag.
fn find_raw_close(haystack: &str, name: &str) -> Option<(usize, usize)> {
    let hay = haystack.as_bytes();
    let needle_len = name.len() + 2;
    let mut i = 0;
    while i + needle_len <= hay.len() {
        let rel = memchr(b'<', &hay[i..])?;
        i += rel;
        if i + needle_len > hay.len() {
            return None;
        }
        if hay[i + 1] == b'/' && hay[i + 2..i + needle_len].eq_ignore_ascii_case(name.as_bytes()) {
            let mut k = i + needle_len;
            while k < hay.len() && hay[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < hay.len() && hay[k] == b'>' {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &str) -> Vec<Token> {
        collect_mode(source, false)
    }

    fn collect_mode(source: &str, xml: bool) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(source, xml);
        let mut tokens = Vec::new();
        while let Some(token) = tokenizer.next_token() {
            tokens.push(token);
        }
        tokens
    }

    fn start(name: &str, attrs: &[(&str, Option<&str>)], self_closing: bool) -> Token {
        Token::StartTag {
            name: name.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
                .collect(),
            self_closing,
        }
    }

    #[test]
    fn plain_text_is_one_token() {
        assert_eq!(
            collect("hello world"),
            vec![Token::Text("hello world".to_string())]
        );
    }

    #[test]
    fn text_is_entity_decoded_once() {
        assert_eq!(
            collect("Tom &amp; Jerry &#215; 2"),
            vec![Token::Text("Tom & Jerry × 2".to_string())]
        );
    }

    #[test]
    fn runaway_lt_stays_in_the_text_run() {
        assert_eq!(collect("a < b"), vec![Token::Text("a < b".to_string())]);
        assert_eq!(
            collect("x</ >y"),
            vec![Token::Text("x</ >y".to_string())]
        );
    }

    #[test]
    fn simple_element_with_text() {
        assert_eq!(
            collect("<p>hi</p>"),
            vec![
                start("p", &[], false),
                Token::Text("hi".to_string()),
                Token::EndTag("p".to_string()),
            ]
        );
    }

    #[test]
    fn attribute_forms() {
        assert_eq!(
            collect(r#"<a href="x" title='y' data=z disabled>"#),
            vec![start(
                "a",
                &[
                    ("href", Some("x")),
                    ("title", Some("y")),
                    ("data", Some("z")),
                    ("disabled", None),
                ],
                false,
            )]
        );
    }

    #[test]
    fn attribute_values_are_entity_decoded() {
        assert_eq!(
            collect(r#"<p data=Tom&amp;Jerry title="&#x3C;ok&#x3E;">"#),
            vec![start(
                "p",
                &[("data", Some("Tom&Jerry")), ("title", Some("<ok>"))],
                false,
            )]
        );
    }

    #[test]
    fn quoted_values_may_contain_gt() {
        assert_eq!(
            collect(r#"<a title="a>b">x"#),
            vec![
                start("a", &[("title", Some("a>b"))], false),
                Token::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn self_closing_with_and_without_space() {
        assert_eq!(collect("<br/>"), vec![start("br", &[], true)]);
        assert_eq!(collect("<br />"), vec![start("br", &[], true)]);
        assert_eq!(collect("<br / >"), vec![start("br", &[], true)]);
    }

    #[test]
    fn trailing_slash_after_unquoted_value_marks_self_closing() {
        assert_eq!(
            collect("<img src=x/>"),
            vec![start("img", &[("src", Some("x"))], true)]
        );
    }

    #[test]
    fn stray_slash_key_is_dropped() {
        assert_eq!(
            collect("<a / href=x>"),
            vec![start("a", &[("href", Some("x"))], false)]
        );
    }

    #[test]
    fn end_tag_ignores_junk_before_gt() {
        assert_eq!(
            collect("</div foo>"),
            vec![Token::EndTag("div".to_string())]
        );
    }

    #[test]
    fn comment_allows_whitespace_before_gt() {
        assert_eq!(
            collect("<!--x-->"),
            vec![Token::Comment("x".to_string())]
        );
        assert_eq!(
            collect("<!-- a-b --\t>"),
            vec![Token::Comment(" a-b ".to_string())]
        );
    }

    #[test]
    fn unterminated_comment_runs_to_end_of_input() {
        assert_eq!(
            collect("<!--never closed"),
            vec![Token::Comment("never closed".to_string())]
        );
    }

    #[test]
    fn processing_instruction_is_non_greedy() {
        assert_eq!(
            collect("<?xml version=\"1.0\"?><?b?>"),
            vec![
                Token::Pi("xml version=\"1.0\"".to_string()),
                Token::Pi("b".to_string()),
            ]
        );
    }

    #[test]
    fn cdata_body_is_verbatim() {
        assert_eq!(
            collect("<![CDATA[a < b & c]]>"),
            vec![Token::Cdata("a < b & c".to_string())]
        );
    }

    #[test]
    fn doctype_payload_keeps_external_id_and_subset() {
        assert_eq!(
            collect("<!DOCTYPE html>"),
            vec![Token::Doctype(" html".to_string())]
        );
        assert_eq!(
            collect(r#"<!doctype greeting SYSTEM "hi>there.dtd">"#),
            vec![Token::Doctype(
                r#" greeting SYSTEM "hi>there.dtd""#.to_string()
            )]
        );
        assert_eq!(
            collect("<!DOCTYPE note [ <!ELEMENT note (#PCDATA)> ]>x"),
            vec![
                Token::Doctype(" note [ <!ELEMENT note (#PCDATA)> ]".to_string()),
                Token::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_doctype_is_dropped() {
        assert_eq!(collect("<!DOCTYPE html"), Vec::<Token>::new());
    }

    #[test]
    fn raw_text_captures_until_case_insensitive_close() {
        assert_eq!(
            collect("<script>if (1<2) a()</ScRiPt >"),
            vec![
                start("script", &[], false),
                Token::Raw("if (1<2) a()".to_string()),
                Token::EndTag("script".to_string()),
            ]
        );
    }

    #[test]
    fn raw_text_ignores_near_match_close_tags() {
        assert_eq!(
            collect("<script>ok</scriptx>no</script>"),
            vec![
                start("script", &[], false),
                Token::Raw("ok</scriptx>no".to_string()),
                Token::EndTag("script".to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_raw_text_consumes_the_rest() {
        assert_eq!(
            collect("<style>p { color:"),
            vec![
                start("style", &[], false),
                Token::Raw("p { color:".to_string()),
                Token::EndTag("style".to_string()),
            ]
        );
    }

    #[test]
    fn raw_text_is_not_entity_decoded() {
        assert_eq!(
            collect("<script>a &amp; b</script>"),
            vec![
                start("script", &[], false),
                Token::Raw("a &amp; b".to_string()),
                Token::EndTag("script".to_string()),
            ]
        );
    }

    #[test]
    fn xml_mode_does_not_capture_raw_text() {
        assert_eq!(
            collect_mode("<script>alert()</script>", true),
            vec![
                start("script", &[], false),
                Token::Text("alert()".to_string()),
                Token::EndTag("script".to_string()),
            ]
        );
    }

    #[test]
    fn self_closing_script_does_not_capture_raw_text() {
        assert_eq!(
            collect("<script/>after"),
            vec![start("script", &[], true), Token::Text("after".to_string())]
        );
    }

    #[test]
    fn unterminated_tag_degrades_to_text() {
        assert_eq!(
            collect("<div class=\"x"),
            vec![Token::Text("<div class=\"x".to_string())]
        );
    }

    #[test]
    fn custom_and_namespaced_names() {
        assert_eq!(
            collect("<my-component></my-component><svg:rect/>"),
            vec![
                start("my-component", &[], false),
                Token::EndTag("my-component".to_string()),
                start("svg:rect", &[], true),
            ]
        );
    }

    #[test]
    fn names_keep_source_case_for_the_builder() {
        assert_eq!(
            collect("<DiV ID=x></DIV>"),
            vec![
                start("DiV", &[("ID", Some("x"))], false),
                Token::EndTag("DIV".to_string()),
            ]
        );
    }
}
