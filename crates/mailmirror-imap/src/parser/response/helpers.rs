//! Parsers shared by several response kinds.

use crate::parser::lexer::{Lexer, Token};
use crate::types::{
    Capability, Flag, Flags, ListResponse, MailboxAttribute, ResponseCode, Uid, UidValidity,
};
use crate::Result;

/// Parses `[CODE args]`.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;
    let atom = lexer.read_atom_string()?;

    let code = match atom.to_ascii_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "UIDNEXT" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::UidNext(Uid::new(n).ok_or_else(|| lexer.error("Invalid UIDNEXT 0"))?)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::UidValidity(
                UidValidity::new(n).ok_or_else(|| lexer.error("Invalid UIDVALIDITY 0"))?,
            )
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            ResponseCode::PermanentFlags(parse_flag_list(lexer)?.into_iter().collect())
        }
        _ => ResponseCode::Other(atom.to_string()),
    };

    // Arguments of codes we do not model (COPYUID, HIGHESTMODSEQ, ...).
    while lexer.peek().is_some_and(|b| b != b']') {
        lexer.advance();
    }
    lexer.expect(Token::RBracket)?;

    Ok(code)
}

/// Parses the space-separated capability atoms that follow `CAPABILITY`.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        match lexer.next_token()? {
            Token::Atom(s) => caps.push(Capability::parse(s)),
            Token::Number(n) => caps.push(Capability::parse(&n.to_string())),
            _ => break,
        }
    }
    Ok(caps)
}

/// Parses a parenthesized flag list.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::LParen)?;
    let mut flags = Flags::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(s) => flags.insert(Flag::parse(s)),
            token => return Err(lexer.error(&format!("Unexpected token in flag list: {token:?}"))),
        }
    }
    Ok(flags)
}

/// Parses the body of a `* LIST` line.
///
/// Extended data after the name (LIST-EXTENDED `CHILDINFO` and the like)
/// is ignored.
pub fn parse_list_response(lexer: &mut Lexer<'_>) -> Result<ListResponse> {
    lexer.expect(Token::LParen)?;
    let mut attributes = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(s) => attributes.push(MailboxAttribute::parse(s)),
            token => {
                return Err(lexer.error(&format!("Unexpected token in LIST attributes: {token:?}")));
            }
        }
    }
    lexer.expect_space()?;

    let delimiter = match lexer.next_token()? {
        Token::Nil => None,
        Token::QuotedString(s) => s.chars().next(),
        token => return Err(lexer.error(&format!("Expected delimiter, got {token:?}"))),
    };
    lexer.expect_space()?;

    let name = lexer.read_astring()?;
    read_text_until_crlf(lexer);

    Ok(ListResponse {
        attributes,
        delimiter,
        name,
    })
}

/// Parses the numbers after `SEARCH`.
pub fn parse_search_response(lexer: &mut Lexer<'_>) -> Result<Vec<u32>> {
    let mut nums = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        match lexer.next_token()? {
            Token::Number(n) if n > 0 => nums.push(n),
            Token::Number(_) => {}
            // `(MODSEQ n)` trailer from CONDSTORE servers
            _ => break,
        }
    }
    Ok(nums)
}

/// Consumes and returns the rest of the line, without its CRLF.
pub fn read_text_until_crlf(lexer: &mut Lexer<'_>) -> String {
    let remaining = lexer.remaining();
    let end = remaining
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(remaining.len());
    lexer.skip(end + 2);
    String::from_utf8_lossy(&remaining[..end]).into_owned()
}

/// Skips one value of an unmodelled FETCH item: an atom, a string, a
/// literal or a parenthesized list.
pub fn skip_value(lexer: &mut Lexer<'_>) -> Result<()> {
    let mut depth = 0usize;
    loop {
        match lexer.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen if depth > 1 => depth -= 1,
            Token::RParen if depth == 1 => return Ok(()),
            Token::RParen => return Err(lexer.error("Unbalanced parenthesis")),
            Token::Eof | Token::Crlf => return Err(lexer.error("Truncated FETCH item")),
            Token::Space | Token::LBracket | Token::RBracket => {}
            _ if depth == 0 => return Ok(()),
            _ => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Capability;

    #[test]
    fn response_codes() {
        let mut lexer = Lexer::new(b"[UIDVALIDITY 3857529045]");
        assert_eq!(
            parse_response_code(&mut lexer).unwrap(),
            ResponseCode::UidValidity(UidValidity::new(3_857_529_045).unwrap())
        );

        let mut lexer = Lexer::new(b"[COPYUID 38505 304,319:320 3956:3958]");
        assert_eq!(
            parse_response_code(&mut lexer).unwrap(),
            ResponseCode::Other("COPYUID".into())
        );

        let mut lexer = Lexer::new(b"[CAPABILITY IMAP4rev1 MOVE AUTH=XOAUTH2]");
        let ResponseCode::Capability(caps) = parse_response_code(&mut lexer).unwrap() else {
            panic!("expected capability code");
        };
        assert!(caps.contains(&Capability::Move));
    }

    #[test]
    fn permanent_flags_with_wildcard() {
        let mut lexer = Lexer::new(b"[PERMANENTFLAGS (\\Seen \\Deleted \\*)]");
        let ResponseCode::PermanentFlags(flags) = parse_response_code(&mut lexer).unwrap() else {
            panic!("expected PERMANENTFLAGS");
        };
        assert!(flags.contains(&Flag::MayCreate));
        assert!(flags.contains(&Flag::Seen));
    }

    #[test]
    fn list_with_quoted_name_and_extended_data() {
        let mut lexer = Lexer::new(
            b"(\\HasNoChildren \\Sent) \"/\" \"[Gmail]/Sent Mail\" (\"CHILDINFO\" (\"SUBSCRIBED\"))\r\n",
        );
        let list = parse_list_response(&mut lexer).unwrap();
        assert_eq!(list.name, "[Gmail]/Sent Mail");
        assert_eq!(list.delimiter, Some('/'));
        assert!(list.attributes.contains(&MailboxAttribute::Sent));
        assert!(lexer.is_eof());
    }

    #[test]
    fn list_with_nil_delimiter() {
        let mut lexer = Lexer::new(b"(\\Noselect) NIL Archive\r\n");
        let list = parse_list_response(&mut lexer).unwrap();
        assert_eq!(list.delimiter, None);
        assert!(!list.is_selectable());
    }

    #[test]
    fn search_numbers() {
        let mut lexer = Lexer::new(b" 12 13 17\r\n");
        assert_eq!(parse_search_response(&mut lexer).unwrap(), vec![12, 13, 17]);

        let mut lexer = Lexer::new(b"\r\n");
        assert!(parse_search_response(&mut lexer).unwrap().is_empty());
    }

    #[test]
    fn skip_nested_value() {
        let mut lexer = Lexer::new(b"(1 (2 3) \"x\") NEXT");
        skip_value(&mut lexer).unwrap();
        assert_eq!(lexer.remaining(), b" NEXT");
    }
}
