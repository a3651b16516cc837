//! The four CLI pipelines (`tokenize`, `parse`, `evaluate`, `run`), written
//! against an output sink and a [`Diagnostics`] sink so the binary and the
//! tests drive them the same way.
//!
//! Each pipeline stops at the first stage that reports anything; the
//! diagnostics flags, not the return value, decide the exit code.

use std::io::Write;

use log::{debug, info};

use crate::ast_printer::AstPrinter;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::{scan_tokens, Scanner};

/// Print every token, one per line, reporting lexical errors as they occur.
pub fn tokenize(source: &str, out: &mut dyn Write, diagnostics: &mut Diagnostics) -> Result<()> {
    info!("Running tokenize");

    for item in Scanner::new(source) {
        match item {
            Ok(token) => writeln!(out, "{}", token)?,
            Err(e) => diagnostics.report(&e),
        }
    }

    out.flush()?;
    Ok(())
}

/// Parse one expression and print its prefix form.
pub fn parse(source: &str, out: &mut dyn Write, diagnostics: &mut Diagnostics) -> Result<()> {
    info!("Running parse");

    let (tokens, errors) = scan_tokens(source);
    if !errors.is_empty() {
        diagnostics.report_all(&errors);
        return Ok(());
    }

    match Parser::new(&tokens).parse_expression() {
        Ok(expr) => {
            let printed: String = AstPrinter::print(&expr);
            debug!("AST: {}", printed);
            writeln!(out, "{}", printed)?;
        }
        Err(e) => diagnostics.report(&e),
    }

    out.flush()?;
    Ok(())
}

/// Parse one expression, evaluate it against fresh globals, print the value.
pub fn evaluate(
    source: &str,
    out: Box<dyn Write>,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    info!("Running evaluate");

    let (tokens, errors) = scan_tokens(source);
    if !errors.is_empty() {
        diagnostics.report_all(&errors);
        return Ok(());
    }

    let expr = match Parser::new(&tokens).parse_expression() {
        Ok(expr) => expr,
        Err(e) => {
            diagnostics.report(&e);
            return Ok(());
        }
    };

    let mut interpreter = Interpreter::with_output(out);

    match interpreter.evaluate_expression(&expr) {
        Ok(value) => interpreter.print_value(&value)?,
        Err(e) => diagnostics.report(&e),
    }

    Ok(())
}

/// Scan, parse, resolve, and execute a whole program.
pub fn run(source: &str, out: Box<dyn Write>, diagnostics: &mut Diagnostics) -> Result<()> {
    info!("Running program");

    let (tokens, errors) = scan_tokens(source);
    if !errors.is_empty() {
        diagnostics.report_all(&errors);
        return Ok(());
    }

    let statements = match Parser::new(&tokens).parse() {
        Ok(statements) => statements,
        Err(errors) => {
            diagnostics.report_all(&errors);
            return Ok(());
        }
    };

    let mut interpreter = Interpreter::with_output(out);

    if let Err(errors) = Resolver::new(&mut interpreter).resolve(&statements) {
        diagnostics.report_all(&errors);
        return Ok(());
    }

    if let Err(e) = interpreter.interpret(&statements) {
        diagnostics.report(&e);
    }

    Ok(())
}
