//! Character cursor shared by the CSS, JavaScript and HTML scanners.
//!
//! Every minifier in this crate is a two-step affair: a scanner classifies the
//! source into token spans (comment, string, regex, code, whitespace) and a
//! serializer decides which of those spans survive. The cursor below is the
//! common low-level part of the scanners. It never panics, whatever the input,
//! and always lands on a char boundary.

/// Position in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset in source
    pub byte: usize,
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed, in characters)
    pub col: usize,
}

impl Position {
    pub fn new() -> Self {
        Self { byte: 0, line: 0, col: 0 }
    }
}

/// Span in source code (a range from start position to end position)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    /// Slice the source text covered by this span.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start.byte..self.end.byte]
    }
}

pub struct Cursor<'a> {
    source: &'a str,
    bytes: &'a [u8],
    position: Position,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            position: Position::new(),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Span from `start` up to the current position.
    pub fn span_from(&self, start: Position) -> Span {
        Span { start, end: self.position }
    }

    /// Source text from `start` up to the current position.
    pub fn slice_from(&self, start: Position) -> &'a str {
        &self.source[start.byte..self.position.byte]
    }

    /// Everything not consumed yet.
    pub fn rest(&self) -> &'a str {
        &self.source[self.position.byte..]
    }

    pub fn at_eof(&self) -> bool {
        self.position.byte >= self.bytes.len()
    }

    pub fn peek_char(&self) -> Option<char> {
        if self.at_eof() {
            return None;
        }
        // Simple ASCII fast path
        let b = self.bytes[self.position.byte];
        if b < 128 {
            Some(b as char)
        } else {
            self.rest().chars().next()
        }
    }

    pub fn peek_next_char(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next()?;
        chars.next()
    }

    pub fn starts_with(&self, pattern: &str) -> bool {
        self.rest().starts_with(pattern)
    }

    pub fn starts_with_ignore_ascii_case(&self, pattern: &str) -> bool {
        let rest = self.rest().as_bytes();
        rest.len() >= pattern.len() && rest[..pattern.len()].eq_ignore_ascii_case(pattern.as_bytes())
    }

    /// Consume one character and return it.
    pub fn advance(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position.byte += ch.len_utf8();

        if ch == '\n' {
            self.position.line += 1;
            self.position.col = 0;
        } else {
            self.position.col += 1;
        }
        Some(ch)
    }

    /// Consume `n` characters (fewer if the input ends first).
    pub fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            if self.advance().is_none() {
                break;
            }
        }
    }

    /// Consume characters until the byte offset `target` is reached.
    pub fn advance_to(&mut self, target: usize) {
        while self.position.byte < target {
            if self.advance().is_none() {
                break;
            }
        }
    }

    pub fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F) -> &'a str {
        let start = self.position;
        while let Some(ch) = self.peek_char() {
            if !pred(ch) {
                break;
            }
            self.advance();
        }
        self.slice_from(start)
    }

    /// Consume up to and including `terminator`. Returns false when the input
    /// ran out first; the cursor is then at end of input.
    pub fn consume_through(&mut self, terminator: &str) -> bool {
        match self.rest().find(terminator) {
            Some(offset) => {
                self.advance_to(self.position.byte + offset + terminator.len());
                true
            }
            None => {
                while self.advance().is_some() {}
                false
            }
        }
    }

    /// Consume a quoted string whose opening quote is the current character.
    /// Backslash escapes are honoured; an unterminated string runs to the end
    /// of input.
    pub fn consume_quoted(&mut self) {
        let Some(quote) = self.advance() else {
            return;
        };
        while let Some(ch) = self.advance() {
            if ch == '\\' {
                self.advance();
            } else if ch == quote {
                break;
            }
        }
    }
}
