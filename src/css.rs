//! CSS minification.
//!
//! The source is first split into token spans by [`tokenize`], then
//! re-serialized: comments are dropped (bang comments optionally kept),
//! whitespace is removed wherever the neighbouring tokens cannot fuse, and the
//! redundant `;` before `}` goes away. Two optional passes run on the result:
//! declaration sorting for stable diffs and line wrapping after rules.
//!
//! Strings and `url(...)` arguments are copied byte-for-byte. Malformed input
//! never fails: an unterminated comment, string or `url(` simply runs to the
//! end of the input.

use serde::Deserialize;

use crate::scanner::{Cursor, Span};

/// Column used when wrapping is requested without an explicit width.
pub const DEFAULT_WRAP_COLUMN: usize = 80;

/// Configuration for CSS minification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CssOptions {
    /// Break the line after a top-level rule once it reaches this column
    pub wrap: Option<usize>,
    /// Keep `/*! ... */` comments (license headers)
    pub preserve_comments: bool,
    /// Sort declarations by property name inside each rule
    pub sort: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CssTokenKind {
    /// `/* ... */`; `bang` is set for `/*! ... */`
    Comment { bang: bool },
    Whitespace,
    /// Quoted string, quotes included
    Str,
    /// `url(...)` including the function name and parentheses
    Url,
    /// Structural punctuation that never needs surrounding whitespace
    Punct(char),
    /// Anything else: identifiers, numbers, selectors, operators
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CssToken {
    pub kind: CssTokenKind,
    pub span: Span,
}

const PUNCT: &[char] = &['{', '}', '(', ')', ';', ',', ':', '>', '~', '+', '!'];

/// CSS whitespace is ASCII only; U+00A0 and friends are identifier characters.
fn is_css_whitespace(ch: char) -> bool {
    ch.is_ascii_whitespace()
}

/// Split CSS source into token spans.
pub fn tokenize(source: &str) -> Vec<CssToken> {
    let mut cursor = Cursor::new(source);
    let mut tokens = Vec::new();

    while let Some(ch) = cursor.peek_char() {
        let start = cursor.position();

        let kind = if cursor.starts_with("/*") {
            cursor.advance_by(2);
            let bang = cursor.peek_char() == Some('!');
            cursor.consume_through("*/");
            CssTokenKind::Comment { bang }
        } else if is_css_whitespace(ch) {
            cursor.consume_while(is_css_whitespace);
            CssTokenKind::Whitespace
        } else if ch == '"' || ch == '\'' {
            cursor.consume_quoted();
            CssTokenKind::Str
        } else if PUNCT.contains(&ch) {
            cursor.advance();
            CssTokenKind::Punct(ch)
        } else if cursor.starts_with_ignore_ascii_case("url(") {
            consume_url(&mut cursor);
            CssTokenKind::Url
        } else {
            consume_word(&mut cursor);
            CssTokenKind::Word
        };

        tokens.push(CssToken { kind, span: cursor.span_from(start) });
    }

    tokens
}

fn consume_url(cursor: &mut Cursor) {
    cursor.advance_by(4);
    let mut depth = 1usize;
    while let Some(ch) = cursor.peek_char() {
        match ch {
            '"' | '\'' => cursor.consume_quoted(),
            '\\' => cursor.advance_by(2),
            '(' => {
                depth += 1;
                cursor.advance();
            }
            ')' => {
                cursor.advance();
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {
                cursor.advance();
            }
        }
    }
}

fn consume_word(cursor: &mut Cursor) {
    while let Some(ch) = cursor.peek_char() {
        if ch == '\\' {
            // An escape keeps the next character inside the word, whatever it is.
            cursor.advance_by(2);
            continue;
        }
        if is_css_whitespace(ch)
            || ch == '"'
            || ch == '\''
            || PUNCT.contains(&ch)
            || cursor.starts_with("/*")
        {
            break;
        }
        cursor.advance();
    }
}

/// Minify a CSS source string.
pub fn minify(source: &str, options: &CssOptions) -> String {
    let _span = tracing::trace_span!("css_minify", len = source.len()).entered();

    let tokens = tokenize(source);
    let mut css = Collapser::new(source, options.preserve_comments).run(&tokens);
    if options.sort {
        css = sort_declarations(&css);
    }
    if let Some(column) = options.wrap {
        css = wrap_rules(&css, column);
    }
    css
}

/// Role of a `:`. Whitespace before a selector colon is a descendant
/// combinator (`a :hover`) and has to stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colon {
    Declaration,
    Selector,
    /// Inside an at-rule prelude, e.g. `(max-width: 600px)`
    Prelude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emitted {
    Punct(char),
    Comment,
    Text,
}

/// Whitespace and comment removal over a token stream.
struct Collapser<'a> {
    source: &'a str,
    preserve_comments: bool,
    out: String,
    last: Option<Emitted>,
    pending_space: bool,
    brace_depth: usize,
    paren_depth: usize,
    /// Between a declaration `:` and the end of that declaration
    in_value: bool,
    /// Between an `@` keyword and the `{` or `;` ending its prelude
    in_at_rule: bool,
    /// Role of the `:` about to be emitted
    colon: Colon,
    /// `;` tokens emitted since the last other token
    trailing_semicolons: usize,
}

impl<'a> Collapser<'a> {
    fn new(source: &'a str, preserve_comments: bool) -> Self {
        Self {
            source,
            preserve_comments,
            out: String::with_capacity(source.len()),
            last: None,
            pending_space: false,
            brace_depth: 0,
            paren_depth: 0,
            in_value: false,
            in_at_rule: false,
            colon: Colon::Declaration,
            trailing_semicolons: 0,
        }
    }

    fn run(mut self, tokens: &[CssToken]) -> String {
        for (index, token) in tokens.iter().enumerate() {
            let text = token.span.text(self.source);
            match token.kind {
                CssTokenKind::Whitespace => self.pending_space = true,
                CssTokenKind::Comment { bang: true } if self.preserve_comments => {
                    self.out.push_str(text);
                    self.last = Some(Emitted::Comment);
                    self.pending_space = false;
                    self.trailing_semicolons = 0;
                }
                // A dropped comment still separates the tokens around it.
                CssTokenKind::Comment { .. } => self.pending_space = true,
                kind => {
                    if kind == CssTokenKind::Punct(':') {
                        self.colon = self.classify_colon(&tokens[index + 1..]);
                    }
                    if self.pending_space && self.needs_space(kind) {
                        self.out.push(' ');
                    }
                    self.pending_space = false;
                    self.emit(kind, text);
                }
            }
        }
        self.out
    }

    /// A `:` in a block is a declaration colon unless a `{` follows before the
    /// declaration ends, which makes it part of a nested rule's selector.
    fn classify_colon(&self, rest: &[CssToken]) -> Colon {
        if self.in_at_rule {
            return Colon::Prelude;
        }
        if self.brace_depth == 0 {
            return Colon::Selector;
        }
        for token in rest {
            match token.kind {
                CssTokenKind::Punct('{') => return Colon::Selector,
                CssTokenKind::Punct(';' | '}') => return Colon::Declaration,
                _ => {}
            }
        }
        Colon::Declaration
    }

    fn emit(&mut self, kind: CssTokenKind, text: &str) {
        match kind {
            CssTokenKind::Punct(ch) => {
                match ch {
                    '{' => {
                        self.brace_depth += 1;
                        self.in_value = false;
                        self.in_at_rule = false;
                    }
                    '}' => {
                        for _ in 0..self.trailing_semicolons {
                            self.out.pop();
                        }
                        self.brace_depth = self.brace_depth.saturating_sub(1);
                        self.in_value = false;
                        self.in_at_rule = false;
                    }
                    ';' => {
                        self.in_value = false;
                        self.in_at_rule = false;
                    }
                    ':' if self.colon == Colon::Declaration => self.in_value = true,
                    '(' => self.paren_depth += 1,
                    ')' => self.paren_depth = self.paren_depth.saturating_sub(1),
                    _ => {}
                }
                self.out.push(ch);
                self.last = Some(Emitted::Punct(ch));
                self.trailing_semicolons = if ch == ';' { self.trailing_semicolons + 1 } else { 0 };
            }
            _ => {
                if kind == CssTokenKind::Word && text.starts_with('@') {
                    self.in_at_rule = true;
                }
                self.out.push_str(text);
                self.last = Some(Emitted::Text);
                self.trailing_semicolons = 0;
            }
        }
    }

    /// `+` is a sibling combinator only in a selector; in values and
    /// `calc()` its surrounding spaces are significant.
    fn plus_is_combinator(&self) -> bool {
        !self.in_value && self.paren_depth == 0
    }

    fn separator_after(&self, ch: char) -> bool {
        matches!(ch, '{' | '}' | ';' | ',' | ':' | '(' | '!' | '>' | '~')
            || (ch == '+' && self.plus_is_combinator())
    }

    fn separator_before(&self, ch: char) -> bool {
        matches!(ch, '{' | '}' | ';' | ',' | ')' | '!' | '>' | '~')
            || (ch == ':' && self.colon != Colon::Selector)
            || (ch == '+' && self.plus_is_combinator())
    }

    fn needs_space(&self, next: CssTokenKind) -> bool {
        match self.last {
            None | Some(Emitted::Comment) => false,
            Some(Emitted::Punct(ch)) if self.separator_after(ch) => false,
            Some(_) => match next {
                CssTokenKind::Punct(ch) => !self.separator_before(ch),
                _ => true,
            },
        }
    }
}

/// Sort the declarations of every innermost `{...}` block by property name.
///
/// Expects minified input. The sort is stable and case-sensitive, so repeated
/// properties (vendor fallbacks) keep their relative order. `!important` is
/// part of the value. Blocks that contain nested blocks (`@media`) are left in
/// place; only their leaf rules are sorted.
pub fn sort_declarations(css: &str) -> String {
    let tokens = tokenize(css);

    // (body start, has nested block)
    let mut open: Vec<(usize, bool)> = Vec::new();
    let mut leaves: Vec<(usize, usize)> = Vec::new();

    for token in &tokens {
        match token.kind {
            CssTokenKind::Punct('{') => {
                if let Some(parent) = open.last_mut() {
                    parent.1 = true;
                }
                open.push((token.span.end.byte, false));
            }
            CssTokenKind::Punct('}') => {
                if let Some((start, false)) = open.pop() {
                    leaves.push((start, token.span.start.byte));
                }
            }
            _ => {}
        }
    }

    let mut out = String::with_capacity(css.len());
    let mut copied = 0;
    for (start, end) in leaves {
        out.push_str(&css[copied..start]);
        out.push_str(&sort_block(&css[start..end]));
        copied = end;
    }
    out.push_str(&css[copied..]);
    out
}

fn sort_block(body: &str) -> String {
    let mut declarations = Vec::new();
    let mut paren_depth = 0usize;
    let mut start = 0;

    for token in tokenize(body) {
        match token.kind {
            CssTokenKind::Punct('(') => paren_depth += 1,
            CssTokenKind::Punct(')') => paren_depth = paren_depth.saturating_sub(1),
            CssTokenKind::Punct(';') if paren_depth == 0 => {
                declarations.push(&body[start..token.span.start.byte]);
                start = token.span.end.byte;
            }
            _ => {}
        }
    }
    declarations.push(&body[start..]);
    declarations.retain(|decl| !decl.trim().is_empty());

    declarations.sort_by(|a, b| property_name(a).cmp(property_name(b)));
    declarations.join(";")
}

fn property_name(declaration: &str) -> &str {
    declaration
        .split_once(':')
        .map_or(declaration, |(name, _)| name)
}

/// Insert a line break after each top-level rule once the current line has
/// reached `column` characters. A rule is never split, so a single long rule
/// still produces a line longer than `column`.
pub fn wrap_rules(css: &str, column: usize) -> String {
    let tokens = tokenize(css);
    let mut out = String::with_capacity(css.len() + css.len() / column.max(1));
    let mut line_len = 0usize;
    let mut depth = 0usize;

    for (index, token) in tokens.iter().enumerate() {
        let text = token.span.text(css);
        out.push_str(text);
        match text.rfind('\n') {
            Some(newline) => line_len = text[newline + 1..].chars().count(),
            None => line_len += text.chars().count(),
        }

        match token.kind {
            CssTokenKind::Punct('{') => depth += 1,
            CssTokenKind::Punct('}') => {
                depth = depth.saturating_sub(1);
                let is_last = index + 1 == tokens.len();
                if depth == 0 && line_len >= column && !is_last {
                    out.push('\n');
                    line_len = 0;
                }
            }
            _ => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn min(css: &str) -> String {
        minify(css, &CssOptions::default())
    }

    #[test]
    fn test_basic_rule() {
        assert_eq!(min("a  {  color : red ;  }"), "a{color:red}");
    }

    #[test]
    fn test_sort() {
        let options = CssOptions { sort: true, ..CssOptions::default() };
        assert_eq!(
            minify("a{color:red;background:blue}", &options),
            "a{background:blue;color:red}"
        );
    }

    #[test]
    fn test_sort_keeps_important_with_value() {
        let options = CssOptions { sort: true, ..CssOptions::default() };
        assert_eq!(
            minify("@media print { b { z: 1; a: 2 !important; } }", &options),
            "@media print{b{a:2!important;z:1}}"
        );
    }

    #[test]
    fn test_sort_is_stable_for_fallbacks() {
        let options = CssOptions { sort: true, ..CssOptions::default() };
        assert_eq!(
            minify("a{display:flex;color:red;display:-webkit-box}", &options),
            "a{color:red;display:flex;display:-webkit-box}"
        );
    }

    #[test]
    fn test_sort_does_not_cross_rules() {
        assert_eq!(sort_declarations("b{y:1;x:2}a{d:1;c:2}"), "b{x:2;y:1}a{c:2;d:1}");
    }

    #[test]
    fn test_comments_dropped() {
        assert_eq!(min("/* header */\na { b: c } /* trailing */"), "a{b:c}");
    }

    #[test]
    fn test_bang_comment_preserved() {
        let options = CssOptions { preserve_comments: true, ..CssOptions::default() };
        assert_eq!(
            minify("/*! license */\n/* drop */\na { b: c }", &options),
            "/*! license */a{b:c}"
        );
        assert_eq!(min("/*! license */\na { b: c }"), "a{b:c}");
    }

    #[test]
    fn test_string_untouched() {
        assert_eq!(
            min("a::after { content: \"  /* x */  \" ; }"),
            "a::after{content:\"  /* x */  \"}"
        );
    }

    #[test]
    fn test_url_untouched() {
        assert_eq!(
            min("a { background : url( \"a b.png\" ) no-repeat ; }"),
            "a{background:url( \"a b.png\" ) no-repeat}"
        );
        assert_eq!(min("a{b:url(//cdn/x/*y*/.png)}"), "a{b:url(//cdn/x/*y*/.png)}");
    }

    #[test]
    fn test_media_query() {
        let css = "@media screen and (max-width : 600px) {\n  .a , .b > .c { margin : 0 auto ; }\n}";
        assert_eq!(min(css), "@media screen and (max-width:600px){.a,.b>.c{margin:0 auto}}");
    }

    #[test]
    fn test_calc_keeps_operator_spaces() {
        assert_eq!(
            min("a { width : calc( 100% - 2 * 10px ) ; }"),
            "a{width:calc(100% - 2 * 10px)}"
        );
        assert_eq!(min("a { margin: 0 +1px }"), "a{margin:0 +1px}");
    }

    #[test]
    fn test_space_before_pseudo_class_is_a_combinator() {
        assert_eq!(min("a :hover { b : c }"), "a :hover{b:c}");
        assert_eq!(min("ul li :first-child{b:c}"), "ul li :first-child{b:c}");
        assert_eq!(min("a:hover , a > :focus { b : c }"), "a:hover,a>:focus{b:c}");
        assert_eq!(
            min("@media print { a :hover { b : c } }"),
            "@media print{a :hover{b:c}}"
        );
        assert_eq!(min("@media (min-width : 1px) { a { b : c } }"), "@media (min-width:1px){a{b:c}}");
    }

    #[test]
    fn test_escaped_semicolon_before_brace() {
        assert_eq!(min("a{content:x\\;}"), "a{content:x\\;}");
        assert_eq!(min("a { b : c ; ; }"), "a{b:c}");
    }

    #[test]
    fn test_selector_combinators() {
        assert_eq!(min("a + b ~ c > d { e : f }"), "a+b~c>d{e:f}");
    }

    #[test]
    fn test_important() {
        assert_eq!(min("a { color : red  !important ; }"), "a{color:red!important}");
    }

    #[test]
    fn test_removed_comment_separates_words() {
        assert_eq!(min("a/**/b{c:d}"), "a b{c:d}");
    }

    #[test]
    fn test_escaped_punctuation_in_selector() {
        assert_eq!(min(".md\\:flex { display : flex }"), ".md\\:flex{display:flex}");
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(min("a{b:c}/* open"), "a{b:c}");
        assert_eq!(min("a{content:\"abc"), "a{content:\"abc");
        assert_eq!(min("a{b:url(x"), "a{b:url(x");
        assert_eq!(min(""), "");
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap_rules("a{b:c}d{e:f}g{h:i}", 10), "a{b:c}d{e:f}\ng{h:i}");
        let options = CssOptions { wrap: Some(10), ..CssOptions::default() };
        let once = minify("a { b: c }\nd { e: f }\ng { h: i }", &options);
        assert_eq!(once, "a{b:c}d{e:f}\ng{h:i}");
        assert_eq!(minify(&once, &options), once);
    }

    #[test]
    fn test_wrap_never_splits_nested_rules() {
        let wrapped = wrap_rules("@media print{a{b:c}d{e:f}}x{y:z}", 4);
        assert_eq!(wrapped, "@media print{a{b:c}d{e:f}}\nx{y:z}");
    }

    #[test]
    fn test_idempotent() {
        let css = "/*! keep */\n@import url(base.css) screen;\nbody , html { margin : 0 ; padding:0 }\n\
                   a:hover::before { content : 'a  b' ; color: #FFF !important }";
        let options = CssOptions { preserve_comments: true, sort: true, wrap: Some(20) };
        let once = minify(css, &options);
        assert_eq!(minify(&once, &options), once);
    }

    #[test]
    fn test_tokenize_spans() {
        let tokens = tokenize("a{b:'c'}");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CssTokenKind::Word,
                CssTokenKind::Punct('{'),
                CssTokenKind::Word,
                CssTokenKind::Punct(':'),
                CssTokenKind::Str,
                CssTokenKind::Punct('}'),
            ]
        );
        assert_eq!(tokens[4].span.text("a{b:'c'}"), "'c'");
    }
}
