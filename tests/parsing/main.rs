use adder::lex::LexError;
use adder::parse::ParseError;
use adder::{BinaryOp, Expression, LexMode, Lexer, Parser, TokenKind, tokenize};

#[test]
fn parsing_chain() {
    let source = include_str!("./chain.add");
    let tokens = Lexer::new(Some("chain.add"), source)
        .with_mode(LexMode::Strict)
        .tokenize()
        .expect("Failed to tokenize");

    let program = Parser::new(&tokens)
        .with_source(Some("chain.add"), source)
        .parse()
        .expect("Failed to parse");

    assert_eq!(program.statements.len(), 1);
    let statement = &program.statements[0];

    let Expression::Binary { op, left, right } = statement else {
        panic!("Expected a binary expression");
    };
    assert_eq!(*op, BinaryOp::Plus);
    assert!(matches!(left.as_ref(), Expression::Leaf(token) if token.text == "15"));
    assert_eq!(right.operators(), vec![BinaryOp::Plus, BinaryOp::Minus]);

    let leaves: Vec<_> = statement.leaves().iter().map(|token| token.text).collect();
    assert_eq!(leaves, vec!["15", "2", "5", "1"]);
}

#[test]
fn json_dump() {
    let tokens = tokenize("1 - 2");
    let program = adder::build_ast(&tokens).expect("Failed to parse");
    let json = serde_json::to_value(&program).expect("Failed to serialize");

    assert_eq!(
        json,
        serde_json::json!({
            "type": "ProgramStart",
            "data": [{
                "type": "Expression",
                "op": "MINUS",
                "data": [
                    {
                        "type": "Expression",
                        "op": null,
                        "data": [{ "type": "INT", "value": "1" }]
                    },
                    {
                        "type": "Expression",
                        "op": null,
                        "data": [{ "type": "INT", "value": "2" }]
                    }
                ]
            }]
        })
    );
}

#[test]
fn statements_are_lexed_but_not_parsed() {
    let source = include_str!("./statements.add");
    let tokens = tokenize(source);

    assert_eq!(tokens.first().map(|t| t.kind), Some(TokenKind::Let));
    assert_eq!(
        tokens.iter().filter(|t| t.kind == TokenKind::Function).count(),
        1
    );
    assert_eq!(
        tokens.iter().filter(|t| t.kind == TokenKind::RightParen).count(),
        2
    );

    let err = Parser::new(&tokens)
        .with_source(Some("statements.add"), source)
        .parse()
        .expect_err("Expecting parsing failure");
    let Some(ParseError::NonTerminatingInput(err)) = err.downcast_ref::<ParseError>() else {
        panic!("Expected a non-terminating input error, got {err:?}");
    };
    assert_eq!(err.line(), 1);
}

#[test]
fn strict_lexing_invalid() {
    Lexer::new(Some("invalid.add"), "1 + 2 * 3")
        .with_mode(LexMode::Strict)
        .tokenize()
        .expect_err("Expecting lexing failure")
        .downcast_ref::<LexError>()
        .expect("Expecting a lexical error");
}

#[test]
fn lenient_lexing_drops_then_parses() {
    let tokens = tokenize("1 + 2 * 3");
    let err = adder::build_ast(&tokens).expect_err("`2 3` is not an expression");
    assert!(matches!(
        err.downcast_ref::<ParseError>(),
        Some(ParseError::UnexpectedToken(_))
    ));
}
