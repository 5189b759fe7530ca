//! JavaScript minification.
//!
//! This is a lexical minifier: comments are stripped and whitespace is
//! dropped wherever the neighbouring tokens cannot fuse, while string,
//! template and regular-expression literals are copied verbatim.
//!
//! # Regex or division
//!
//! A `/` in code is either the division operator or the start of a regular
//! expression literal, and only the parser really knows which. The scanner
//! keeps a one-token lookback ([`Previous`]) and treats `/` as a regex when an
//! operand is expected next: at the start of input, after an operator or
//! punctuator, after a keyword such as `return` or `typeof`, after a `}` and
//! after the `)` that closes an `if`/`while`/`for`/`with` header. After an
//! identifier, a number, a literal, `]`, another `)` or a postfix `++`/`--`
//! it is a division.
//!
//! Known misclassifications: contextual keywords used as variable names
//! (`of / 2`, `yield / 2` outside generators) and an object literal followed
//! by a division (`({}) / 2` is fine, `x = {} / 2` is not). Since literals are
//! copied verbatim, a misread `/` changes how much gets minified but never
//! the characters that come out.
//!
//! # Line breaks
//!
//! Collapsing every newline would break code that relies on automatic
//! semicolon insertion. A whitespace run containing a line terminator is
//! therefore kept as a single `\n` when the token before it can end a
//! statement and the token after it can start one, and after `return`,
//! `break`, `continue`, `throw` and `yield`.

use crate::scanner::{Cursor, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordClass {
    Identifier,
    Number,
    Keyword,
    /// Keywords after which a line terminator ends the statement
    Restricted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsTokenKind {
    LineComment,
    BlockComment,
    Whitespace { newline: bool },
    Str,
    Template,
    Regex,
    Word(WordClass),
    /// `++` or `--`
    Increment,
    /// `;`; `empty_statement` marks the body of `if (x);` or `else;`
    Semicolon { empty_statement: bool },
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsToken {
    pub kind: JsTokenKind,
    pub span: Span,
}

/// Keywords that expect an expression (and so admit a regex) after them.
const KEYWORDS: &[&str] = &[
    "await", "case", "delete", "do", "else", "in", "instanceof", "new", "of", "typeof", "void",
];

const RESTRICTED: &[&str] = &["break", "continue", "return", "throw", "yield"];

/// Keywords followed by a parenthesized header and then a statement.
const CONTROL_HEADERS: &[&str] = &["for", "if", "while", "with"];

/// Class of the last significant token, used to resolve `/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Previous {
    Start,
    Operand,
    Keyword { is_else: bool },
    ControlHeader,
    CloseParen { control: bool },
    CloseBrace,
    Dot,
    PostfixIncrement,
    Operator,
}

impl Previous {
    fn regex_allowed(self) -> bool {
        match self {
            Previous::Start
            | Previous::Keyword { .. }
            | Previous::ControlHeader
            | Previous::CloseParen { control: true }
            | Previous::CloseBrace
            | Previous::Operator => true,
            Previous::Operand
            | Previous::CloseParen { control: false }
            | Previous::Dot
            | Previous::PostfixIncrement => false,
        }
    }
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_js_whitespace(ch: char) -> bool {
    ch.is_whitespace() || ch == '\u{FEFF}'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || ch == '_'
        || ch == '$'
        || ch == '\\'
        || (!ch.is_ascii() && !is_js_whitespace(ch))
}

struct Tokenizer<'a> {
    cursor: Cursor<'a>,
    previous: Previous,
    /// One entry per open `(`: whether it opened a control-flow header
    parens: Vec<bool>,
}

impl<'a> Tokenizer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            previous: Previous::Start,
            parens: Vec::new(),
        }
    }

    fn tokenize(mut self) -> Vec<JsToken> {
        let mut tokens = Vec::new();
        loop {
            let start = self.cursor.position();
            let Some(kind) = self.next_kind() else {
                break;
            };
            tokens.push(JsToken { kind, span: self.cursor.span_from(start) });
        }
        tokens
    }

    fn next_kind(&mut self) -> Option<JsTokenKind> {
        let ch = self.cursor.peek_char()?;

        let kind = if is_js_whitespace(ch) {
            let run = self.cursor.consume_while(is_js_whitespace);
            JsTokenKind::Whitespace { newline: run.chars().any(is_line_terminator) }
        } else if self.cursor.starts_with("//") {
            self.cursor.consume_while(|c| !is_line_terminator(c));
            JsTokenKind::LineComment
        } else if self.cursor.starts_with("/*") {
            self.cursor.advance_by(2);
            self.cursor.consume_through("*/");
            JsTokenKind::BlockComment
        } else if ch == '"' || ch == '\'' {
            self.cursor.consume_quoted();
            self.previous = Previous::Operand;
            JsTokenKind::Str
        } else if ch == '`' {
            consume_template(&mut self.cursor);
            self.previous = Previous::Operand;
            JsTokenKind::Template
        } else if ch == '/' && self.previous.regex_allowed() {
            consume_regex(&mut self.cursor);
            self.previous = Previous::Operand;
            JsTokenKind::Regex
        } else if is_ident_char(ch)
            || (ch == '.' && self.cursor.peek_next_char().is_some_and(|c| c.is_ascii_digit()))
        {
            self.word()
        } else {
            self.punct(ch)
        };

        Some(kind)
    }

    fn word(&mut self) -> JsTokenKind {
        let start = self.cursor.position();
        if self.cursor.peek_char() == Some('.') {
            self.cursor.advance();
        }
        while let Some(ch) = self.cursor.peek_char() {
            if ch == '\\' {
                self.cursor.advance_by(2);
            } else if is_ident_char(ch) {
                self.cursor.advance();
            } else {
                break;
            }
        }
        let word = self.cursor.slice_from(start);

        let first = word.chars().next().unwrap_or_default();
        let after_dot = self.previous == Previous::Dot;

        let (class, previous) = if first.is_ascii_digit() || first == '.' {
            (WordClass::Number, Previous::Operand)
        } else if after_dot {
            // Property access: `a.delete`, `x.return`
            (WordClass::Identifier, Previous::Operand)
        } else if CONTROL_HEADERS.contains(&word) {
            (WordClass::Keyword, Previous::ControlHeader)
        } else if RESTRICTED.contains(&word) {
            (WordClass::Restricted, Previous::Keyword { is_else: false })
        } else if KEYWORDS.contains(&word) {
            (WordClass::Keyword, Previous::Keyword { is_else: word == "else" })
        } else {
            (WordClass::Identifier, Previous::Operand)
        };

        self.previous = previous;
        JsTokenKind::Word(class)
    }

    fn punct(&mut self, ch: char) -> JsTokenKind {
        if (ch == '+' || ch == '-') && self.cursor.peek_next_char() == Some(ch) {
            self.cursor.advance_by(2);
            let postfix = matches!(
                self.previous,
                Previous::Operand | Previous::CloseParen { control: false }
            );
            self.previous = if postfix { Previous::PostfixIncrement } else { Previous::Operator };
            return JsTokenKind::Increment;
        }

        self.cursor.advance();
        let kind = match ch {
            ';' => JsTokenKind::Semicolon {
                empty_statement: matches!(
                    self.previous,
                    Previous::CloseParen { control: true } | Previous::Keyword { is_else: true }
                ),
            },
            _ => JsTokenKind::Punct,
        };

        self.previous = match ch {
            '(' => {
                self.parens.push(self.previous == Previous::ControlHeader);
                Previous::Operator
            }
            ')' => Previous::CloseParen { control: self.parens.pop().unwrap_or(false) },
            ']' => Previous::Operand,
            '}' => Previous::CloseBrace,
            '.' => Previous::Dot,
            _ => Previous::Operator,
        };
        kind
    }
}

/// Consume a template literal starting at the backtick, including every
/// `${...}` interpolation. Unterminated templates run to the end of input.
fn consume_template(cursor: &mut Cursor) {
    cursor.advance();
    while let Some(ch) = cursor.advance() {
        match ch {
            '\\' => {
                cursor.advance();
            }
            '`' => return,
            '$' if cursor.peek_char() == Some('{') => {
                cursor.advance();
                consume_interpolation(cursor);
            }
            _ => {}
        }
    }
}

/// Consume the body of `${...}` up to and including its closing brace.
/// Braces, strings, nested templates, comments and regex literals inside are
/// tracked so a `}` or quote belonging to any of them does not derail the
/// scan. A `/` starts a regex when the last significant character cannot end
/// an operand.
fn consume_interpolation(cursor: &mut Cursor) {
    let mut depth = 1usize;
    let mut operand = false;
    while let Some(ch) = cursor.peek_char() {
        match ch {
            '"' | '\'' => {
                cursor.consume_quoted();
                operand = true;
            }
            '`' => {
                consume_template(cursor);
                operand = true;
            }
            '/' if cursor.starts_with("//") => {
                cursor.consume_while(|c| !is_line_terminator(c));
            }
            '/' if cursor.starts_with("/*") => {
                cursor.advance_by(2);
                cursor.consume_through("*/");
            }
            '/' if !operand => {
                consume_regex(cursor);
                operand = true;
            }
            '{' => {
                depth += 1;
                cursor.advance();
                operand = false;
            }
            '}' => {
                cursor.advance();
                depth -= 1;
                if depth == 0 {
                    return;
                }
                operand = true;
            }
            _ => {
                cursor.advance();
                if !is_js_whitespace(ch) {
                    operand = is_ident_char(ch) || matches!(ch, ')' | ']');
                }
            }
        }
    }
}

/// Consume a regex literal and its flags. A `/` inside a character class does
/// not close it. An unterminated regex runs to the end of input.
fn consume_regex(cursor: &mut Cursor) {
    cursor.advance();
    let mut in_class = false;
    while let Some(ch) = cursor.advance() {
        match ch {
            '\\' => {
                cursor.advance();
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => break,
            _ => {}
        }
    }
    cursor.consume_while(is_ident_char);
}

/// Split JavaScript source into token spans.
pub fn tokenize(source: &str) -> Vec<JsToken> {
    Tokenizer::new(source).tokenize()
}

/// Minify a JavaScript source string.
pub fn minify(source: &str) -> String {
    let _span = tracing::trace_span!("js_minify", len = source.len()).entered();

    let tokens = tokenize(source);
    let mut emitter = Emitter::new(source);
    for token in &tokens {
        emitter.push(token);
    }
    emitter.out
}

#[derive(Debug, Clone, Copy)]
struct Last {
    kind: JsTokenKind,
    last_char: char,
    /// Digits only, so a following `.` would be read as a decimal point
    integer: bool,
}

struct Emitter<'a> {
    source: &'a str,
    out: String,
    /// Whitespace or comments seen since the last token; `true` if any of it
    /// contained a line terminator
    pending: Option<bool>,
    last: Option<Last>,
}

impl<'a> Emitter<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            out: String::with_capacity(source.len()),
            pending: None,
            last: None,
        }
    }

    fn push(&mut self, token: &JsToken) {
        let text = token.span.text(self.source);
        match token.kind {
            JsTokenKind::Whitespace { newline } => self.mark_gap(newline),
            JsTokenKind::LineComment => self.mark_gap(true),
            JsTokenKind::BlockComment => self.mark_gap(text.chars().any(is_line_terminator)),
            kind => self.emit(kind, text),
        }
    }

    fn mark_gap(&mut self, newline: bool) {
        self.pending = Some(self.pending.unwrap_or(false) || newline);
    }

    fn emit(&mut self, kind: JsTokenKind, text: &str) {
        let Some(first) = text.chars().next() else {
            return;
        };

        if let (Some(newline), Some(last)) = (self.pending.take(), self.last) {
            if let Some(separator) = separator(&last, kind, first, newline) {
                self.out.push(separator);
            }
        }

        if first == '}'
            && matches!(
                self.last,
                Some(Last { kind: JsTokenKind::Semicolon { empty_statement: false }, .. })
            )
            && self.out.ends_with(';')
        {
            self.out.pop();
        }

        self.out.push_str(text);
        self.last = Some(Last {
            kind,
            last_char: text.chars().last().unwrap_or(first),
            integer: kind == JsTokenKind::Word(WordClass::Number)
                && text.chars().all(|c| c.is_ascii_digit() || c == '_'),
        });
    }
}

/// What to put between two tokens that had whitespace or comments between
/// them in the source: nothing, a space, or a line break.
fn separator(last: &Last, next: JsTokenKind, first: char, newline: bool) -> Option<char> {
    if newline {
        let restricted = last.kind == JsTokenKind::Word(WordClass::Restricted)
            && !matches!(next, JsTokenKind::Semicolon { .. })
            && first != '}';
        if restricted || (ends_statement(last) && begins_statement(next, first)) {
            return Some('\n');
        }
    }

    let fuses = (is_ident_char(last.last_char) && is_ident_char(first))
        || matches!(
            (last.last_char, first),
            ('+', '+') | ('-', '-') | ('/', '/') | ('/', '*') | ('<', '!') | ('-', '>')
        )
        || (last.integer && first == '.');
    fuses.then_some(' ')
}

fn ends_statement(last: &Last) -> bool {
    match last.kind {
        JsTokenKind::Word(_)
        | JsTokenKind::Str
        | JsTokenKind::Template
        | JsTokenKind::Regex
        | JsTokenKind::Increment => true,
        JsTokenKind::Punct => matches!(last.last_char, ')' | ']' | '}'),
        _ => false,
    }
}

fn begins_statement(next: JsTokenKind, first: char) -> bool {
    match next {
        JsTokenKind::Word(_) | JsTokenKind::Str | JsTokenKind::Template | JsTokenKind::Increment => {
            true
        }
        JsTokenKind::Punct => matches!(first, '{' | '!' | '~' | '#' | '@'),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<JsTokenKind> {
        tokenize(source)
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !matches!(k, JsTokenKind::Whitespace { .. }))
            .collect()
    }

    #[test]
    fn test_division_chain() {
        assert_eq!(minify("var x = 1/2/3;"), "var x=1/2/3;");
        assert!(!kinds("var x = 1/2/3;").contains(&JsTokenKind::Regex));
    }

    #[test]
    fn test_regex_after_return() {
        let out = minify("return /abc/.test(s);");
        assert!(out.contains("/abc/"));
        assert_eq!(out, "return/abc/.test(s);");
        assert!(kinds("return /abc/.test(s);").contains(&JsTokenKind::Regex));
    }

    #[test]
    fn test_regex_after_identifier_is_division() {
        assert_eq!(minify("a = b / c / d"), "a=b/c/d");
        assert_eq!(minify("a = b\n/hi/g.exec(c)"), "a=b/hi/g.exec(c)");
    }

    #[test]
    fn test_regex_after_control_header() {
        assert_eq!(minify("if (ok) /re/.test(s) && go()"), "if(ok)/re/.test(s)&&go()");
        assert!(kinds("if (ok) /re/.test(s)").contains(&JsTokenKind::Regex));
        assert!(!kinds("f (ok) / 2").contains(&JsTokenKind::Regex));
    }

    #[test]
    fn test_keyword_as_property_is_identifier() {
        assert_eq!(minify("x = obj.delete / 2; y = 3 / 4"), "x=obj.delete/2;y=3/4");
    }

    #[test]
    fn test_regex_character_class() {
        assert_eq!(minify("var re = /[/]+/g, y = 2;"), "var re=/[/]+/g,y=2;");
        assert_eq!(minify("var re = /a\\/b/ ;"), "var re=/a\\/b/;");
    }

    #[test]
    fn test_comment_inside_string() {
        assert_eq!(minify("var s = '// not a comment';"), "var s='// not a comment';");
        assert_eq!(minify("var s = \"/* nor */ this\";"), "var s=\"/* nor */ this\";");
    }

    #[test]
    fn test_comments_stripped() {
        assert_eq!(
            minify("/* a */ var x = 1; // b\nvar y = 2;"),
            "var x=1;var y=2;"
        );
        assert_eq!(minify("/*! license */\nf();"), "f();");
    }

    #[test]
    fn test_function_body() {
        assert_eq!(
            minify("function foo ( x ) {\n  return x + 1 ;\n}"),
            "function foo(x){return x+1}"
        );
    }

    #[test]
    fn test_operators_do_not_fuse() {
        assert_eq!(minify("a + +b"), "a+ +b");
        assert_eq!(minify("a - -b"), "a- -b");
        assert_eq!(minify("a++ + b"), "a++ +b");
        assert_eq!(minify("a / /re/.source.length"), "a/ /re/.source.length");
    }

    #[test]
    fn test_integer_member_access() {
        assert_eq!(minify("1 .toString()"), "1 .toString()");
        assert_eq!(minify("x = .5 + 0x1F .valueOf()"), "x=.5+0x1F.valueOf()");
    }

    #[test]
    fn test_template_literal_verbatim() {
        assert_eq!(
            minify("const t = `a ${ {x: 1}.x } // b`;"),
            "const t=`a ${ {x: 1}.x } // b`;"
        );
        assert_eq!(
            minify("f(`outer ${ `inner ${ '}' }` }`) ;"),
            "f(`outer ${ `inner ${ '}' }` }`);"
        );
    }

    #[test]
    fn test_regex_inside_interpolation() {
        assert_eq!(
            minify("`a${ s.replace(/'/g, '') }b`; var q = ' a  b '"),
            "`a${ s.replace(/'/g, '') }b`;var q=' a  b '"
        );
        assert_eq!(minify("`${ a / b }` ; x = 1"), "`${ a / b }`;x=1");
    }

    #[test]
    fn test_asi_newlines_kept() {
        assert_eq!(minify("let a = 1\nlet b = 2\n"), "let a=1\nlet b=2");
        assert_eq!(minify("a\n++b"), "a\n++b");
        assert_eq!(minify("return\n(x)"), "return\n(x)");
        assert_eq!(minify("foo();\n\nbar();"), "foo();bar();");
    }

    #[test]
    fn test_trailing_semicolon_before_brace() {
        assert_eq!(minify("function f(){ g(); }"), "function f(){g()}");
        assert_eq!(minify("function f(){ if (x) ; }"), "function f(){if(x);}");
        assert_eq!(minify("if (a) {} else ; }"), "if(a){}else;}");
    }

    #[test]
    fn test_unterminated_input() {
        assert_eq!(minify("var s = 'abc"), "var s='abc");
        assert_eq!(minify("var a = 1; /* open"), "var a=1;");
        assert_eq!(minify("x = `open ${ y"), "x=`open ${ y");
        assert_eq!(minify("x = /abc\n  y  =  1 // c"), "x=/abc\n  y  =  1 // c");
        assert_eq!(minify(""), "");
        assert_eq!(minify("  \n\t "), "");
    }

    #[test]
    fn test_html_comment_markers_not_created() {
        assert_eq!(minify("a < !--b"), "a< !--b");
    }

    #[test]
    fn test_idempotent() {
        let js = "// header\nfunction add (a, b) {\n  var r = a / b; // divide\n  if (r) /x/g.test(r)\n  return r\n}\nvar s = `t ${ add(1, 2) }`\n";
        let once = minify(js);
        assert_eq!(minify(&once), once);
    }
}
