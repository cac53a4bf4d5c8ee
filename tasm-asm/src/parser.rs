use matches::debug_assert_matches;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::error::ParseError;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct TasmParser;

/// One already-tokenized source line: an optional label definition and an
/// optional statement (a mnemonic with up to two operands).
pub struct ParsedLine<'i> {
    pub label: Option<&'i str>,
    pub mnemonic: Option<&'i str>,
    pub operand1: Option<Pair<'i, Rule>>,
    pub operand2: Option<&'i str>,
}

/// Parses one line, already stripped of its trailing comment.
///
/// `text` must not contain a newline; the grammar's `line` rule expects a
/// single logical line terminated by end-of-input.
pub fn parse_line(text: &str) -> Result<ParsedLine, ParseError> {
    let mut pairs = TasmParser::parse(Rule::line, text)?;
    let line_pair = pairs.next().unwrap();
    debug_assert_matches!(line_pair.as_rule(), Rule::line);

    let mut label = None;
    let mut mnemonic = None;
    let mut operand1 = None;
    let mut operand2 = None;

    for pair in line_pair.into_inner() {
        match pair.as_rule() {
            Rule::label_def => {
                label = Some(pair.into_inner().next().unwrap().as_str());
            }
            Rule::statement => {
                let mut inner = pair.into_inner();
                mnemonic = inner.next().map(|p| p.as_str());
                operand1 = inner.next();
                operand2 = inner.next().map(|p| p.as_str());
            }
            Rule::EOI => {}
            _ => unreachable!(),
        }
    }

    Ok(ParsedLine {
        label,
        mnemonic,
        operand1,
        operand2,
    })
}
