//! Cypher lexer using logos

use cygnet_core::{Error, Result};
use logos::Logos;
use std::ops::Range;

/// Cypher tokens
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // Keywords
    #[token("MATCH", ignore(ascii_case))]
    Match,

    #[token("OPTIONAL", ignore(ascii_case))]
    Optional,

    #[token("WHERE", ignore(ascii_case))]
    Where,

    #[token("RETURN", ignore(ascii_case))]
    Return,

    #[token("CREATE", ignore(ascii_case))]
    Create,

    #[token("DELETE", ignore(ascii_case))]
    Delete,

    #[token("DETACH", ignore(ascii_case))]
    Detach,

    #[token("SET", ignore(ascii_case))]
    Set,

    #[token("MERGE", ignore(ascii_case))]
    Merge,

    #[token("REMOVE", ignore(ascii_case))]
    Remove,

    #[token("WITH", ignore(ascii_case))]
    With,

    #[token("UNWIND", ignore(ascii_case))]
    Unwind,

    #[token("ORDER", ignore(ascii_case))]
    Order,

    #[token("BY", ignore(ascii_case))]
    By,

    #[token("SKIP", ignore(ascii_case))]
    Skip,

    #[token("LIMIT", ignore(ascii_case))]
    Limit,

    #[token("ASC", ignore(ascii_case))]
    #[token("ASCENDING", ignore(ascii_case))]
    Asc,

    #[token("DESC", ignore(ascii_case))]
    #[token("DESCENDING", ignore(ascii_case))]
    Desc,

    #[token("AS", ignore(ascii_case))]
    As,

    #[token("DISTINCT", ignore(ascii_case))]
    Distinct,

    #[token("UNION", ignore(ascii_case))]
    Union,

    #[token("ALL", ignore(ascii_case))]
    All,

    #[token("IN", ignore(ascii_case))]
    In,

    #[token("CASE", ignore(ascii_case))]
    Case,

    #[token("WHEN", ignore(ascii_case))]
    When,

    #[token("THEN", ignore(ascii_case))]
    Then,

    #[token("ELSE", ignore(ascii_case))]
    Else,

    #[token("END", ignore(ascii_case))]
    End,

    // Boolean keywords
    #[token("AND", ignore(ascii_case))]
    And,

    #[token("OR", ignore(ascii_case))]
    Or,

    #[token("XOR", ignore(ascii_case))]
    Xor,

    #[token("NOT", ignore(ascii_case))]
    Not,

    #[token("TRUE", ignore(ascii_case))]
    True,

    #[token("FALSE", ignore(ascii_case))]
    False,

    #[token("NULL", ignore(ascii_case))]
    Null,

    #[token("IS", ignore(ascii_case))]
    Is,

    #[token("CONTAINS", ignore(ascii_case))]
    Contains,

    #[token("STARTS", ignore(ascii_case))]
    Starts,

    #[token("ENDS", ignore(ascii_case))]
    Ends,

    // Symbols
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("|")]
    Pipe,

    #[token("..")]
    DoubleDot,

    #[token("=")]
    Equals,

    #[token("<>")]
    #[token("!=")]
    NotEquals,

    #[token("<")]
    LessThan,

    #[token("<=")]
    LessEquals,

    #[token(">")]
    GreaterThan,

    #[token(">=")]
    GreaterEquals,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("^")]
    Caret,

    // Relationship arrows
    #[token("-->")]
    ArrowRight,

    #[token("<--")]
    ArrowLeft,

    #[token("--")]
    DoubleDash,

    #[token("->")]
    DashArrowRight,

    #[token("<-")]
    ArrowLeftDash,

    // Literals
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Integer(i64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unescape(lex.slice()))]
    String(String),

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[regex(r"`[^`]+`", |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    EscapedIdentifier(String),

    // Parameters; numeric names lex so that the translator can reject them by name
    #[regex(r"\$[a-zA-Z0-9_]+", |lex| lex.slice()[1..].to_string())]
    #[regex(r"\$`[^`]+`", |lex| {
        let s = lex.slice();
        s[2..s.len()-1].to_string()
    })]
    Parameter(String),

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*/", logos::skip)]
    BlockComment,
}

/// Strip the quotes of a string literal and resolve its escape sequences
fn unescape(literal: &str) -> Option<String> {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            other => out.push(other),
        }
    }
    Some(out)
}

impl Token {
    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        self.keyword_text().is_some()
    }

    /// Canonical text of a keyword token
    ///
    /// Keywords may appear where a name is expected (property keys, map
    /// keys, labels), so the parser needs their spelling back.
    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            Token::Match => "MATCH",
            Token::Optional => "OPTIONAL",
            Token::Where => "WHERE",
            Token::Return => "RETURN",
            Token::Create => "CREATE",
            Token::Delete => "DELETE",
            Token::Detach => "DETACH",
            Token::Set => "SET",
            Token::Merge => "MERGE",
            Token::Remove => "REMOVE",
            Token::With => "WITH",
            Token::Unwind => "UNWIND",
            Token::Order => "ORDER",
            Token::By => "BY",
            Token::Skip => "SKIP",
            Token::Limit => "LIMIT",
            Token::Asc => "ASC",
            Token::Desc => "DESC",
            Token::As => "AS",
            Token::Distinct => "DISTINCT",
            Token::Union => "UNION",
            Token::All => "ALL",
            Token::In => "IN",
            Token::Case => "CASE",
            Token::When => "WHEN",
            Token::Then => "THEN",
            Token::Else => "ELSE",
            Token::End => "END",
            Token::And => "AND",
            Token::Or => "OR",
            Token::Xor => "XOR",
            Token::Not => "NOT",
            Token::True => "TRUE",
            Token::False => "FALSE",
            Token::Null => "NULL",
            Token::Is => "IS",
            Token::Contains => "CONTAINS",
            Token::Starts => "STARTS",
            Token::Ends => "ENDS",
            _ => return None,
        };
        Some(text)
    }

    /// Check if this token is a literal
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Token::Integer(_)
                | Token::Float(_)
                | Token::String(_)
                | Token::True
                | Token::False
                | Token::Null
        )
    }
}

/// A token together with its source text and byte span
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub text: String,
    pub span: Range<usize>,
}

/// Tokenize a Cypher query string
///
/// Fails with `QueryParse` at the first character that starts no token.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    let mut lexer = Token::lexer(input);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(Spanned {
                token,
                text: lexer.slice().to_string(),
                span,
            }),
            Err(()) => {
                return Err(Error::QueryParse(format!(
                    "unexpected `{}` at offset {}",
                    lexer.slice(),
                    span.start
                )));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_basic_query() {
        let tokens = tokens("MATCH (n:person) RETURN n");

        assert!(tokens.contains(&Token::Match));
        assert!(tokens.contains(&Token::Return));
        assert!(tokens.contains(&Token::LParen));
        assert!(tokens.contains(&Token::RParen));
        assert!(tokens.contains(&Token::Colon));
    }

    #[test]
    fn test_literals() {
        let tokens = tokens("WHERE n.age = 30 AND n.height = 1.75");

        assert!(tokens.iter().any(|t| matches!(t, Token::Integer(30))));
        assert!(tokens.iter().any(|t| matches!(t, Token::Float(f) if (*f - 1.75).abs() < 0.001)));
    }

    #[test]
    fn test_strings_are_unescaped() {
        let tokens = tokens(r#"RETURN "Alice", 'Bob\'s'"#);

        assert!(tokens.contains(&Token::String("Alice".to_string())));
        assert!(tokens.contains(&Token::String("Bob's".to_string())));
    }

    #[test]
    fn test_relationship_pattern() {
        let tokens = tokens("MATCH (a)-[r:knows]->(b)<--(c)");

        assert!(tokens.contains(&Token::Minus));
        assert!(tokens.contains(&Token::LBracket));
        assert!(tokens.contains(&Token::DashArrowRight));
        assert!(tokens.contains(&Token::ArrowLeft));
    }

    #[test]
    fn test_parameters() {
        let tokens = tokens("WHERE n.name = $name OR n.x = $`odd name` OR n.y = $0");

        assert!(tokens.contains(&Token::Parameter("name".to_string())));
        assert!(tokens.contains(&Token::Parameter("odd name".to_string())));
        assert!(tokens.contains(&Token::Parameter("0".to_string())));
    }

    #[test]
    fn test_case_insensitive_keywords() {
        let tokens = tokens("match RETURN Starts");

        assert_eq!(tokens, vec![Token::Match, Token::Return, Token::Starts]);
    }

    #[test]
    fn test_comments_skipped() {
        let tokens = tokens("RETURN 1 // trailing\n/* block */");
        assert_eq!(tokens, vec![Token::Return, Token::Integer(1)]);
    }

    #[test]
    fn test_invalid_character() {
        let err = tokenize("RETURN #").unwrap_err();
        assert!(err.to_string().contains("Invalid input"));
    }
}
