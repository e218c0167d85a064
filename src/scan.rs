//! Parsers for the structured sub-language inside captured clause fragments:
//! code tokens, chapter numbers, "through" spans, and tolerant range-list
//! scanning.
//!
//! Range lists in legal text are noisy ("heading 29.01 through 29.02,
//! 4012.11 or Chapter 40"), so the scanners walk the fragment and pull out
//! every span they recognize, passing over everything else.

use winnow::combinator::{alt, opt, preceded};
use winnow::error::{ErrMode, ModalResult};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::types::{Code, CodeRange, Tier};

/// Parse one code token: 2–6 digits with optional dot punctuation
/// (`29.01`, `2903.10`, `8501`, `850110`).
///
/// A sub-item suffix beyond six digits (`8407.31.10`) is consumed along with
/// the token and the whole token discarded (`Ok(None)`): finer than leaf
/// granularity is rejected, never truncated into a different code.
fn code_token(input: &mut &str) -> ModalResult<Option<Code>> {
    let lead = take_while(2..=6, |c: char| c.is_ascii_digit()).parse_next(input)?;
    if input.starts_with(|c: char| c.is_ascii_digit()) {
        // seven or more contiguous digits is no code at all
        return Err(ErrMode::from_input(input));
    }

    let mut digits = lead.to_owned();
    match lead.len() {
        2 => {
            // a bare pair is a chapter, not a code: require the dotted tail
            let tail = ('.', take_while(2..=2, |c: char| c.is_ascii_digit()))
                .take()
                .parse_next(input)?;
            if input.starts_with(|c: char| c.is_ascii_digit()) {
                return Err(ErrMode::from_input(input));
            }
            digits.push_str(&tail[1..]);
        }
        4 => {
            let tail = opt(('.', take_while(2..=2, |c: char| c.is_ascii_digit())).take())
                .parse_next(input)?;
            if let Some(tail) = tail {
                if input.starts_with(|c: char| c.is_ascii_digit()) {
                    return Err(ErrMode::from_input(input));
                }
                digits.push_str(&tail[1..]);
            }
        }
        6 => {}
        _ => return Err(ErrMode::from_input(input)),
    }

    // a further ".xx" tail marks a tariff item
    let suffix = opt(('.', take_while(1.., |c: char| c.is_ascii_alphanumeric())).take())
        .parse_next(input)?;
    Ok(match suffix {
        Some(_) => None,
        None => Some(Code::new(&digits)),
    })
}

/// Parse a bare chapter number (1–2 digits), zero-filled to two. Rejected
/// when more digits or a dotted continuation follow: `29.01` is a code,
/// not chapter 29.
fn chapter_token(input: &mut &str) -> ModalResult<Code> {
    let digits = take_while(1..=2, |c: char| c.is_ascii_digit()).parse_next(input)?;
    if input.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ErrMode::from_input(input));
    }
    let mut rest = input.chars();
    if rest.next() == Some('.') && rest.next().is_some_and(|c| c.is_ascii_digit()) {
        return Err(ErrMode::from_input(input));
    }
    Ok(Code::new(format!("{digits:0>2}")))
}

/// A tier keyword, singular or plural.
fn tier_keyword(input: &mut &str) -> ModalResult<Tier> {
    let tier = alt((
        "chapter".value(Tier::Chapter),
        "Chapter".value(Tier::Chapter),
        "subheading".value(Tier::Subheading),
        "heading".value(Tier::Heading),
        "tariff item".value(Tier::TariffItem),
    ))
    .parse_next(input)?;
    let _ = opt('s').parse_next(input)?;
    Ok(tier)
}

/// A code span: one code, optionally `" through [tier ]"` and a second code.
/// A rejected low token yields `Ok(None)`; a rejected high endpoint degrades
/// the span to its low code alone.
fn code_span(input: &mut &str) -> ModalResult<Option<CodeRange>> {
    let Some(low) = code_token.parse_next(input)? else {
        return Ok(None);
    };
    let high = opt(|i: &mut &str| {
        " through".parse_next(i)?;
        let _ = opt((' ', tier_keyword)).parse_next(i)?;
        ' '.parse_next(i)?;
        code_token.parse_next(i)
    })
    .parse_next(input)?;
    Ok(Some(match high {
        Some(Some(high)) => CodeRange::span(low, high),
        _ => CodeRange::single(low),
    }))
}

/// A chapter span: one chapter number, optionally `" through "` and a second.
fn chapter_span(input: &mut &str) -> ModalResult<Option<CodeRange>> {
    let low = chapter_token.parse_next(input)?;
    let high = opt(preceded(" through ", chapter_token)).parse_next(input)?;
    Ok(Some(match high {
        Some(high) => CodeRange::span(low, high),
        None => CodeRange::single(low),
    }))
}

/// Pull every chapter/code span out of free-form text, in order, skipping
/// anything else. Spans only start on a token boundary (never inside a
/// longer number or a dotted code).
pub(crate) fn scan_spans(text: &str) -> Vec<CodeRange> {
    let mut spans = Vec::new();
    let mut rest = text;
    let mut at_boundary = true;
    while !rest.is_empty() {
        if at_boundary {
            if let Ok((remaining, span)) = alt((code_span, chapter_span)).parse_peek(rest) {
                if let Some(span) = span {
                    spans.push(span);
                }
                rest = remaining;
                at_boundary = false;
                continue;
            }
        }
        let Some(c) = rest.chars().next() else { break };
        rest = &rest[c.len_utf8()..];
        at_boundary = !(c.is_ascii_alphanumeric() || c == '.');
    }
    spans
}

/// Find the first tier-prefixed span (`"subheading 8519.81 through
/// 8519.89"`) in an exemption-target fragment. Chapters cannot head an
/// exemption scope, so bare chapter numbers are not considered.
pub(crate) fn target_span(text: &str) -> Option<CodeRange> {
    fn target(input: &mut &str) -> ModalResult<Option<CodeRange>> {
        let _ = alt(("subheading", "heading", "tariff item")).parse_next(input)?;
        let _ = opt('s').parse_next(input)?;
        ' '.parse_next(input)?;
        code_span.parse_next(input)
    }

    let mut rest = text;
    let mut at_boundary = true;
    while !rest.is_empty() {
        if at_boundary {
            if let Ok((remaining, span)) = target.parse_peek(rest) {
                if let Some(span) = span {
                    return Some(span);
                }
                rest = remaining;
                at_boundary = false;
                continue;
            }
        }
        let Some(c) = rest.chars().next() else { break };
        rest = &rest[c.len_utf8()..];
        at_boundary = !c.is_ascii_alphanumeric();
    }
    None
}
