mod common;

#[cfg(test)]
mod scanner_tests {
    use lox_walk as lox;

    use lox::scanner::*;
    use lox::token::*;
    use pretty_assertions::assert_eq;

    use super::common;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn var_declaration_tokens() {
        let (tokens, errors) = scan_tokens("var x = 10;");
        assert!(errors.is_empty());

        assert_token_sequence(
            "var x = 10;",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EQUAL, "="),
                (TokenType::NUMBER(0.0), "10"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );

        match tokens[3].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 10.0),
            ref other => panic!("expected a number, got {:?}", other),
        }
    }

    #[test]
    fn two_char_operators_and_comments() {
        assert_token_sequence(
            "!= == <= >= ! = < > / // ignored / * )\n-",
            &[
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::BANG, "!"),
                (TokenType::EQUAL, "="),
                (TokenType::LESS, "<"),
                (TokenType::GREATER, ">"),
                (TokenType::SLASH, "/"),
                (TokenType::MINUS, "-"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn keywords_override_identifiers() {
        assert_token_sequence(
            "and class orchid _under this9 while",
            &[
                (TokenType::AND, "and"),
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "orchid"),
                (TokenType::IDENTIFIER, "_under"),
                (TokenType::IDENTIFIER, "this9"),
                (TokenType::WHILE, "while"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn numbers_have_no_leading_or_trailing_dot() {
        assert_token_sequence(
            ".5 5. 1.25",
            &[
                (TokenType::DOT, "."),
                (TokenType::NUMBER(0.0), "5"),
                (TokenType::NUMBER(0.0), "5"),
                (TokenType::DOT, "."),
                (TokenType::NUMBER(0.0), "1.25"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn newlines_advance_the_line_counter() {
        let (tokens, _) = scan_tokens("a\n\"multi\nline\"\n// note\nb");
        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();

        assert_eq!(lines, vec![1, 3, 5, 5]);
        assert_eq!(tokens[1].literal(), lox::ast::LiteralValue::Str("multi\nline".into()));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let results: Vec<_> = Scanner::new(",.$(#").collect();

        // COMMA, DOT, error for '$', LEFT_PAREN, error for '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert!(matches!(&results[0], Ok(t) if t.token_type == TokenType::COMMA));
        assert!(matches!(&results[1], Ok(t) if t.token_type == TokenType::DOT));
        assert!(matches!(&results[3], Ok(t) if t.token_type == TokenType::LEFT_PAREN));
        assert!(matches!(&results[5], Ok(t) if t.is_eof()));

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();

        assert_eq!(
            errors,
            vec![
                "[line 1] Error: Unexpected character: $",
                "[line 1] Error: Unexpected character: #",
            ]
        );
    }

    #[test]
    fn unterminated_string_is_reported_and_scanning_finishes() {
        let (tokens, errors) = scan_tokens("print \"oops\n");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "[line 2] Error: Unterminated string.");
        assert_eq!(tokens.len(), 2);
        assert!(tokens[1].is_eof());
    }

    #[test]
    fn non_ascii_characters_are_single_errors() {
        let (tokens, errors) = scan_tokens("a é b");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message(), "Unexpected character: é");
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn tokenize_command_dumps_tokens_and_exits_65_on_errors() {
        let outcome = common::tokenize("var s = \"hi\";\n1.5 @");

        assert_eq!(
            outcome.stdout,
            "VAR var null\n\
             IDENTIFIER s null\n\
             EQUAL = null\n\
             STRING \"hi\" hi\n\
             SEMICOLON ; null\n\
             NUMBER 1.5 1.5\n\
             EOF  null\n"
        );
        assert_eq!(outcome.stderr, "[line 2] Error: Unexpected character: @\n");
        assert_eq!(outcome.exit_code, 65);
    }

    #[test]
    fn tokenize_prints_integral_numbers_with_a_fraction() {
        let outcome = common::tokenize("10");

        assert_eq!(outcome.stdout, "NUMBER 10 10.0\nEOF  null\n");
        assert_eq!(outcome.exit_code, 0);
    }
}
