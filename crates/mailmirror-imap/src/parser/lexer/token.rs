//! Lexer tokens.

/// Token produced by the [`Lexer`](super::Lexer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Atom: unquoted run of atom characters. Flags such as `\Seen` lex as
    /// one atom.
    Atom(&'a str),
    /// Quoted string with escapes resolved.
    QuotedString(String),
    /// Literal payload following a `{n}` prefix.
    Literal(Vec<u8>),
    /// Number.
    Number(u32),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// Single space.
    Space,
    /// `*`
    Asterisk,
    /// `+`
    Plus,
    /// NIL, case-insensitive.
    Nil,
    /// CRLF line ending.
    Crlf,
    /// End of input.
    Eof,
}
