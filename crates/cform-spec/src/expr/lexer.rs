use thiserror::Error;

/// Lexical errors for condition expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("lone '{0}' is not an operator")]
    IncompleteOperator(char),
}

/// Tokens of the condition grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Str(String),
    Bool(bool),
    AndAnd,
    OrOr,
    Not,
    Eq,
    Ne,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

/// Tokenize a substituted condition expression.
///
/// Strict and loose JS comparison spellings are accepted and treated
/// identically; string escapes follow the substitution escaping (`\"`,
/// `\\`, a backslash before a raw newline, and the usual `n`/`r`/`t`).
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ' ' | '\t' | '\r' | '\n' => {}
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '[' => tokens.push(Token::LBracket),
            ']' => tokens.push(Token::RBracket),
            ',' => tokens.push(Token::Comma),
            '&' => match chars.next() {
                Some('&') => tokens.push(Token::AndAnd),
                _ => return Err(LexError::IncompleteOperator('&')),
            },
            '|' => match chars.next() {
                Some('|') => tokens.push(Token::OrOr),
                _ => return Err(LexError::IncompleteOperator('|')),
            },
            '!' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    // Accept both !== and !=
                    if chars.peek() == Some(&'=') {
                        chars.next();
                    }
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '=' => {
                match chars.next() {
                    Some('=') => {}
                    _ => return Err(LexError::IncompleteOperator('=')),
                }
                // Accept both === and ==
                if chars.peek() == Some(&'=') {
                    chars.next();
                }
                tokens.push(Token::Eq);
            }
            '"' | '\'' => {
                let quote = ch;
                let mut text = String::new();
                loop {
                    match chars.next() {
                        None => return Err(LexError::UnterminatedString),
                        Some(c) if c == quote => break,
                        Some('\\') => match chars.next() {
                            None => return Err(LexError::UnterminatedString),
                            Some('n') => text.push('\n'),
                            Some('r') => text.push('\r'),
                            Some('t') => text.push('\t'),
                            Some(escaped) => text.push(escaped),
                        },
                        Some(c) => text.push(c),
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "true" => tokens.push(Token::Bool(true)),
                    "false" => tokens.push(Token::Bool(false)),
                    _ => return Err(LexError::UnexpectedChar(c)),
                }
            }
            other => return Err(LexError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_and_loose_comparisons_lex_identically() {
        assert_eq!(tokenize("\"a\" === \"b\""), tokenize("\"a\" == \"b\""));
        assert_eq!(tokenize("\"a\" !== \"b\""), tokenize("\"a\" != \"b\""));
    }

    #[test]
    fn escaped_quotes_stay_inside_the_string() {
        let tokens = tokenize(r#""[\"a\",\"b\"]""#).expect("tokens");
        assert_eq!(tokens, vec![Token::Str(r#"["a","b"]"#.into())]);
    }

    #[test]
    fn keywords_and_operators() {
        let tokens = tokenize("(true && !false) || true").expect("tokens");
        assert_eq!(
            tokens,
            vec![
                Token::LParen,
                Token::Bool(true),
                Token::AndAnd,
                Token::Not,
                Token::Bool(false),
                Token::RParen,
                Token::OrOr,
                Token::Bool(true),
            ]
        );
    }

    #[test]
    fn stray_identifier_is_an_error() {
        assert!(tokenize("undefined").is_err());
        assert!(tokenize("{field}").is_err());
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert_eq!(tokenize("\"abc"), Err(LexError::UnterminatedString));
    }
}
