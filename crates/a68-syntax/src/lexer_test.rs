use super::*;
use a68_core::SourceId;

fn source() -> SourceId {
    SourceId::new(0)
}

#[test]
fn tokenizes_a_simple_declaration() {
    let tokens = Lexer::tokenize("INT x := 1 + 2;", source()).unwrap();
    assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::BoldWord(ref w) if w == "INT")));
}

#[test]
fn skips_hash_and_co_comments() {
    let tokens = Lexer::tokenize("# a comment # INT CO another CO x", source()).unwrap();
    assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::Identifier(ref w) if w == "x")));
}

proptest::proptest! {
    /// Whatever `Lexer::tokenize` is handed — valid Algol 68 or not — it must either
    /// return an `Ok`/`Err` outright, never panic. The lexer is the first thing any
    /// input text reaches, so it's the one component that must survive arbitrary bytes.
    #[test]
    fn tokenize_never_panics(text in "\\PC{0,64}") {
        let _ = Lexer::tokenize(&text, source());
    }
}
