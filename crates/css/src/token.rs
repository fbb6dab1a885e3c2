//! Owned token tree built on top of the [`cssparser`] tokenizer.
//!
//! The tokenizer borrows from the input and hands out nested blocks as
//! sub-parsers. Consumers of this crate only ever need a token's kind, its
//! value and (for functions) its arguments, so everything is copied into
//! plain owned values once and the borrowed tokenizer state is discarded.

use cssparser::{ParseError, Parser, Token as CssToken, UnicodeRange};
use std::fmt::{self, Display, Formatter, Write};

/// Coarse classification of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    AtKeyword,
    String,
    Url,
    Function,
    Number,
    Percentage,
    Dimension,
    UnicodeRange,
    Hash,
    Literal,
    Whitespace,
    Block,
    Bad,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    AtKeyword(String),
    /// Quoted string, stored without quotes or escapes.
    String(String),
    /// Either `url(foo)` or `url("foo")`.
    Url(String),
    Function { name: String, arguments: Vec<Token> },
    /// Numbers, percentages and dimensions keep their source text.
    Number(String),
    Percentage(String),
    Dimension(String),
    UnicodeRange(String),
    Hash(String),
    /// Punctuation: `:`, `;`, `,` and single-character delimiters.
    Literal(String),
    Whitespace,
    /// `(...)`, `[...]` or `{...}`; `open` is the opening character.
    Block { open: char, content: Vec<Token> },
    /// Unterminated string or malformed `url(`.
    Bad(String),
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Self::Ident(_) => TokenKind::Ident,
            Self::AtKeyword(_) => TokenKind::AtKeyword,
            Self::String(_) => TokenKind::String,
            Self::Url(_) => TokenKind::Url,
            Self::Function { .. } => TokenKind::Function,
            Self::Number(_) => TokenKind::Number,
            Self::Percentage(_) => TokenKind::Percentage,
            Self::Dimension(_) => TokenKind::Dimension,
            Self::UnicodeRange(_) => TokenKind::UnicodeRange,
            Self::Hash(_) => TokenKind::Hash,
            Self::Literal(_) => TokenKind::Literal,
            Self::Whitespace => TokenKind::Whitespace,
            Self::Block { .. } => TokenKind::Block,
            Self::Bad(_) => TokenKind::Bad,
        }
    }

    /// The token's value; the name for functions, `None` for whitespace and blocks.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Ident(v)
            | Self::AtKeyword(v)
            | Self::String(v)
            | Self::Url(v)
            | Self::Number(v)
            | Self::Percentage(v)
            | Self::Dimension(v)
            | Self::UnicodeRange(v)
            | Self::Hash(v)
            | Self::Literal(v)
            | Self::Bad(v) => Some(v),
            Self::Function { name, .. } => Some(name),
            Self::Whitespace | Self::Block { .. } => None,
        }
    }

    /// Arguments of a function token (or the content of a block).
    pub fn arguments(&self) -> &[Token] {
        match self {
            Self::Function { arguments, .. } => arguments,
            Self::Block { content, .. } => content,
            _ => &[],
        }
    }

    pub fn is_whitespace(&self) -> bool {
        matches!(self, Self::Whitespace)
    }

    /// Is this the literal `value` (e.g. `;` or `:`)?
    pub fn is_literal(&self, value: &str) -> bool {
        matches!(self, Self::Literal(v) if v == value)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(v) => cssparser::serialize_identifier(v, f),
            Self::AtKeyword(v) => {
                f.write_char('@')?;
                cssparser::serialize_identifier(v, f)
            },
            Self::String(v) => cssparser::serialize_string(v, f),
            Self::Url(v) => {
                f.write_str("url(")?;
                cssparser::serialize_string(v, f)?;
                f.write_char(')')
            },
            Self::Function { name, arguments } => {
                cssparser::serialize_identifier(name, f)?;
                f.write_char('(')?;
                arguments.iter().try_for_each(|a| a.fmt(f))?;
                f.write_char(')')
            },
            Self::Hash(v) => write!(f, "#{v}"),
            Self::Whitespace => f.write_char(' '),
            Self::Block { open, content } => {
                f.write_char(*open)?;
                content.iter().try_for_each(|t| t.fmt(f))?;
                f.write_char(match open {
                    '(' => ')',
                    '[' => ']',
                    _ => '}',
                })
            },
            Self::Number(v)
            | Self::Percentage(v)
            | Self::Dimension(v)
            | Self::UnicodeRange(v)
            | Self::Literal(v)
            | Self::Bad(v) => f.write_str(v),
        }
    }
}

/// Consume every remaining token of `input` (including whitespace, excluding
/// comments) into an owned tree.
pub(crate) fn tokenize<'i>(input: &mut Parser<'i, '_>) -> Vec<Token> {
    let mut tokens = Vec::new();
    loop {
        // `U+0-FF` tokenizes as an ident followed by numbers/idents, and can
        // only be recognised by re-reading the source.
        if let Ok(range) = input.try_parse(unicode_range) {
            if range.starts_with(char::is_whitespace) {
                tokens.push(Token::Whitespace);
            }
            tokens.push(Token::UnicodeRange(range.trim().to_string()));
            continue;
        }
        let start = input.position();
        let token = match input.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        let token = match token {
            CssToken::Ident(v) => Token::Ident(v.to_string()),
            CssToken::AtKeyword(v) => Token::AtKeyword(v.to_string()),
            CssToken::QuotedString(v) => Token::String(v.to_string()),
            CssToken::UnquotedUrl(v) => Token::Url(v.to_string()),
            CssToken::Hash(v) | CssToken::IDHash(v) => Token::Hash(v.to_string()),
            CssToken::Number { .. } => Token::Number(input.slice_from(start).to_string()),
            CssToken::Percentage { .. } => Token::Percentage(input.slice_from(start).to_string()),
            CssToken::Dimension { .. } => Token::Dimension(input.slice_from(start).to_string()),
            CssToken::WhiteSpace(_) => Token::Whitespace,
            CssToken::Colon => Token::Literal(":".to_string()),
            CssToken::Semicolon => Token::Literal(";".to_string()),
            CssToken::Comma => Token::Literal(",".to_string()),
            CssToken::Delim(c) => Token::Literal(c.to_string()),
            CssToken::Function(name) => {
                let arguments = nested(input);
                function(name.to_string(), arguments)
            },
            CssToken::ParenthesisBlock => Token::Block { open: '(', content: nested(input) },
            CssToken::SquareBracketBlock => Token::Block { open: '[', content: nested(input) },
            CssToken::CurlyBracketBlock => Token::Block { open: '{', content: nested(input) },
            CssToken::BadUrl(_) | CssToken::BadString(_) => {
                let source = input.slice_from(start).to_string();
                tracing::warn!(token = %source, "malformed token in stylesheet");
                Token::Bad(source)
            },
            CssToken::Comment(_) | CssToken::CDO | CssToken::CDC => continue,
            // Match operators and stray closing brackets.
            _ => Token::Literal(input.slice_from(start).to_string()),
        };
        tokens.push(token);
    }
    tokens
}

fn nested<'i>(input: &mut Parser<'i, '_>) -> Vec<Token> {
    input.parse_nested_block(|i| Ok::<_, ParseError<'i, ()>>(tokenize(i))).unwrap_or_default()
}

fn unicode_range<'i>(input: &mut Parser<'i, '_>) -> Result<&'i str, cssparser::BasicParseError<'i>> {
    let start = input.position();
    UnicodeRange::parse(input)?;
    Ok(input.slice_from(start))
}

/// `url("foo")` is a function as far as the tokenizer cares, but means the
/// same as the unquoted form.
fn function(name: String, arguments: Vec<Token>) -> Token {
    if name.eq_ignore_ascii_case("url") {
        let mut values = arguments.iter().filter(|t| !t.is_whitespace());
        if let (Some(Token::String(url)), None) = (values.next(), values.next()) {
            return Token::Url(url.clone());
        }
    }
    Token::Function { name, arguments }
}
