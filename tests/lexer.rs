use amaryllis::lexer::{Keyword, Lexer, Token, TokenKind};

fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    tokens
}

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source).into_iter().map(|token| token.kind).collect()
}

#[test]
fn integer_literal_keeps_its_text() {
    let tokens = tokenize("12345");
    assert_eq!(tokens[0].kind, TokenKind::Int);
    assert_eq!(tokens[0].literal, "12345");
    assert_eq!(tokens[1].kind, TokenKind::Eof);
}

#[test]
fn lexes_let_statement() {
    let tokens = tokenize("let five = 5;");
    let expected = [
        (TokenKind::Keyword(Keyword::Let), "let"),
        (TokenKind::Identifier, "five"),
        (TokenKind::Assign, "="),
        (TokenKind::Int, "5"),
        (TokenKind::Semicolon, ";"),
        (TokenKind::Eof, ""),
    ];
    assert_eq!(tokens.len(), expected.len());
    for (token, (kind, literal)) in tokens.iter().zip(expected) {
        assert_eq!(token.kind, kind);
        assert_eq!(token.literal, literal);
    }
}

#[test]
fn lexes_operators_and_delimiters() {
    assert_eq!(
        kinds("=+-*/<>!.,;:(){}[]"),
        vec![
            TokenKind::Assign,
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Asterisk,
            TokenKind::Slash,
            TokenKind::LessThan,
            TokenKind::GreaterThan,
            TokenKind::Not,
            TokenKind::Dot,
            TokenKind::Comma,
            TokenKind::Semicolon,
            TokenKind::Colon,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::LBracket,
            TokenKind::RBracket,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn lexes_two_character_operators() {
    let tokens = tokenize("a == b != c");
    assert_eq!(tokens[1].kind, TokenKind::Equals);
    assert_eq!(tokens[1].literal, "==");
    assert_eq!(tokens[3].kind, TokenKind::NotEquals);
    assert_eq!(tokens[3].literal, "!=");
}

#[test]
fn recognizes_every_keyword() {
    let keywords = [
        ("let", Keyword::Let),
        ("function", Keyword::Function),
        ("return", Keyword::Return),
        ("true", Keyword::True),
        ("false", Keyword::False),
        ("if", Keyword::If),
        ("else", Keyword::Else),
        ("import", Keyword::Import),
        ("export", Keyword::Export),
    ];
    for (text, keyword) in keywords {
        let tokens = tokenize(text);
        assert_eq!(tokens[0].kind, TokenKind::Keyword(keyword), "{text}");
    }
    let tokens = tokenize("letter");
    assert_eq!(tokens[0].kind, TokenKind::Identifier);
}

#[test]
fn string_literal_drops_the_quotes() {
    let tokens = tokenize("\"hello world\"");
    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].literal, "hello world");
}

#[test]
fn unterminated_string_is_an_illegal_token() {
    let tokens = tokenize("\"abc");
    assert_eq!(tokens[0].kind, TokenKind::Illegal);
    assert_eq!(tokens[0].literal, "abc");
    assert_eq!(tokens[1].kind, TokenKind::Eof);
}

#[test]
fn unrecognized_byte_is_an_illegal_token() {
    let tokens = tokenize("let @ = 1");
    assert_eq!(tokens[1].kind, TokenKind::Illegal);
    assert_eq!(tokens[1].literal, "@");
}

#[test]
fn tracks_line_and_column() {
    let tokens = tokenize("let x = 5;\nlet y = 10;");
    assert_eq!(tokens[0].line, 1);
    assert_eq!(tokens[0].column, 1);
    assert_eq!(tokens[1].line, 1);
    assert_eq!(tokens[1].column, 5);
    // Second statement starts on line 2.
    assert_eq!(tokens[5].line, 2);
    assert_eq!(tokens[5].column, 1);
    assert_eq!(tokens[6].literal, "y");
    assert_eq!(tokens[6].column, 5);
}

#[test]
fn pulls_lines_from_a_callback_and_skips_blanks() {
    let mut extra = vec!["".to_string(), "= 2".to_string()].into_iter();
    let mut lexer = Lexer::with_line_source("let a".to_string(), move || extra.next());
    let tokens = [
        (TokenKind::Keyword(Keyword::Let), 1),
        (TokenKind::Identifier, 1),
        (TokenKind::Assign, 3),
        (TokenKind::Int, 3),
        (TokenKind::Eof, 3),
    ];
    for (kind, line) in tokens {
        let token = lexer.next_token();
        assert_eq!(token.kind, kind);
        assert_eq!(token.line, line);
    }
}

#[test]
fn tokens_do_not_span_lines() {
    let mut extra = vec!["cd".to_string()].into_iter();
    let mut lexer = Lexer::with_line_source("ab".to_string(), move || extra.next());
    let first = lexer.next_token();
    let second = lexer.next_token();
    assert_eq!(first.literal, "ab");
    assert_eq!(second.literal, "cd");
    assert_eq!(second.line, 2);
}
