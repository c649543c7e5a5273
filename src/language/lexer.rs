use crate::language::{
    span::Span,
    token::{Token, TokenKind},
};
use nom::{
    bytes::complete::{tag, take_while, take_while1},
    character::complete::digit1,
    combinator::{map_res, opt, recognize},
    error::{Error, ErrorKind},
    sequence::pair,
    IResult, Parser as NomParser,
};

#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

pub fn lex(source: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut rest = source;
    let mut offset = 0usize;

    loop {
        let trimmed = skip_trivia(rest);
        offset += rest.len() - trimmed.len();
        rest = trimmed;
        if rest.is_empty() {
            break;
        }

        match lex_token(rest) {
            Ok((remaining, kind)) => {
                let consumed = rest.len() - remaining.len();
                tokens.push(Token {
                    kind,
                    span: Span::new(offset, offset + consumed),
                });
                rest = remaining;
                offset += consumed;
            }
            Err(_) => {
                if rest.starts_with('"') {
                    errors.push(LexError {
                        message: "Unterminated string literal".into(),
                        span: Span::new(offset, source.len()),
                    });
                    break;
                }
                let width = rest.chars().next().map(char::len_utf8).unwrap_or(1);
                errors.push(LexError {
                    message: format!("Unexpected character `{}`", &rest[..width]),
                    span: Span::new(offset, offset + width),
                });
                rest = &rest[width..];
                offset += width;
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(offset, offset),
    });

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

fn skip_trivia(mut input: &str) -> &str {
    loop {
        let trimmed = input.trim_start();
        match trimmed.strip_prefix("//") {
            Some(comment) => {
                input = match comment.find('\n') {
                    Some(newline) => &comment[newline..],
                    None => "",
                };
            }
            None => return trimmed,
        }
    }
}

fn lex_token(input: &str) -> IResult<&str, TokenKind> {
    lex_string(input)
        .or_else(|_| lex_identifier(input))
        .or_else(|_| lex_number(input))
        .or_else(|_| lex_symbol(input))
}

fn lex_identifier(input: &str) -> IResult<&str, TokenKind> {
    let (rest, ident) = recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)?;
    let kind = match ident {
        "print" => TokenKind::Print,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "func" => TokenKind::Func,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => TokenKind::Identifier(ident.to_string()),
    };
    Ok((rest, kind))
}

fn lex_number(input: &str) -> IResult<&str, TokenKind> {
    map_res(
        recognize(pair(digit1, opt(pair(tag("."), digit1)))),
        |text: &str| {
            if text.contains('.') {
                text.parse::<f64>().map(TokenKind::Float)
            } else {
                match text.parse::<i64>() {
                    Ok(value) => Ok(TokenKind::Integer(value)),
                    Err(_) => text.parse::<f64>().map(TokenKind::Float),
                }
            }
        },
    )
    .parse(input)
}

fn lex_string(input: &str) -> IResult<&str, TokenKind> {
    let (body, _) = tag::<_, _, Error<&str>>("\"")(input)?;
    let mut value = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '"' => return Ok((&body[idx + 1..], TokenKind::String(value))),
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    '\\' => '\\',
                    '"' => '"',
                    other => other,
                }),
                None => break,
            },
            _ => value.push(ch),
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)))
}

fn lex_symbol(input: &str) -> IResult<&str, TokenKind> {
    // Two-character operators must be probed before their one-character prefixes.
    let table = [
        ("&&", TokenKind::AmpersandAmpersand),
        ("||", TokenKind::PipePipe),
        ("==", TokenKind::EqEq),
        ("!=", TokenKind::BangEq),
        ("<=", TokenKind::LtEq),
        (">=", TokenKind::GtEq),
        ("!", TokenKind::Bang),
        ("=", TokenKind::Eq),
        ("<", TokenKind::Lt),
        (">", TokenKind::Gt),
        ("+", TokenKind::Plus),
        ("-", TokenKind::Minus),
        ("*", TokenKind::Star),
        ("/", TokenKind::Slash),
        ("%", TokenKind::Percent),
        ("^", TokenKind::Caret),
        (",", TokenKind::Comma),
        (";", TokenKind::Semi),
        ("(", TokenKind::LParen),
        (")", TokenKind::RParen),
        ("[", TokenKind::LBracket),
        ("]", TokenKind::RBracket),
        ("{", TokenKind::LBrace),
        ("}", TokenKind::RBrace),
    ];
    for (symbol, kind) in table {
        let parsed: IResult<&str, &str> = tag(symbol)(input);
        if let Ok((rest, _)) = parsed {
            return Ok((rest, kind));
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)))
}
