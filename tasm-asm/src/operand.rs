use matches::debug_assert_matches;
use pest::iterators::Pair;

use tasm_vm::Addr;

use crate::error::ParseError;
use crate::Rule;

/// The first operand, classified purely syntactically. A `Label` is only
/// resolved against the label table once the mnemonic using it is known.
#[derive(Clone, Debug, PartialEq)]
pub enum RawOperand1<'i> {
    Direct(Addr),
    Indirect(Addr),
    Label(&'i str),
}

/// The second operand, classified purely syntactically — exactly like the
/// original assembler, the grammar does not know (and does not need to know)
/// whether a mnemonic wants an address or a literal in this position; that
/// distinction is made by the expansion logic in [`crate::expand`].
#[derive(Clone, Debug, PartialEq)]
pub enum RawOperand2 {
    Value(u32),
    Indirect(Addr),
    Str(String),
}

pub fn parse_operand1(pair: Pair<Rule>) -> Result<RawOperand1, ParseError> {
    debug_assert_matches!(pair.as_rule(), Rule::operand1);
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::indirect => {
            let addr_pair = inner.into_inner().next().unwrap();
            Ok(RawOperand1::Indirect(parse_hex_addr(addr_pair.as_str())?))
        }
        Rule::hex_addr => Ok(RawOperand1::Direct(parse_hex_addr(inner.as_str())?)),
        Rule::identifier => Ok(RawOperand1::Label(inner.as_str())),
        _ => unreachable!(),
    }
}

pub fn parse_operand2(raw: &str) -> Result<RawOperand2, ParseError> {
    let raw = raw.trim();

    if let Some(inner) = raw.strip_prefix('"') {
        if !inner.ends_with('"') {
            return Err(ParseError::UnterminatedString(raw.to_owned()));
        }
        return Ok(RawOperand2::Str(inner[..inner.len() - 1].to_owned()));
    }

    if let Some(inner) = raw.strip_prefix('[') {
        if !inner.ends_with(']') {
            return Err(ParseError::BadNumeral(raw.to_owned()));
        }
        let addr = parse_numeral(&inner[..inner.len() - 1])?;
        return Ok(RawOperand2::Indirect(addr));
    }

    Ok(RawOperand2::Value(parse_numeral(raw)?))
}

fn parse_hex_addr(text: &str) -> Result<Addr, ParseError> {
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| ParseError::BadNumeral(text.to_owned()))?;
    u32::from_str_radix(digits, 16).map_err(|_| ParseError::BadNumeral(text.to_owned()))
}

/// Parses a numeral the way the original assembler's `strtoul(text, NULL, 0)`
/// does: `0x` for hex, a leading `0` for octal, otherwise decimal.
fn parse_numeral(text: &str) -> Result<u32, ParseError> {
    if let Some(digits) = text.strip_prefix("0x") {
        u32::from_str_radix(digits, 16).map_err(|_| ParseError::BadNumeral(text.to_owned()))
    } else if text.len() > 1 && text.starts_with('0') {
        u32::from_str_radix(&text[1..], 8).map_err(|_| ParseError::BadNumeral(text.to_owned()))
    } else {
        text.parse::<u32>()
            .map_err(|_| ParseError::BadNumeral(text.to_owned()))
    }
}
