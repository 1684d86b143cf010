use crate::parser::{RegexError, RegexErrorKind};
use crate::regex::Ast;
use nom::branch::alt;
use nom::character::complete;
use nom::character::complete::one_of;
use nom::combinator::{map, opt, value};
use nom::multi::{many1, separated_list1};
use nom::{IResult, Parser};

type Res<'a, T> = IResult<&'a str, T, RegexError<'a>>;

/// Commits to an error: a `Failure` aborts the whole parse instead of
/// letting `alt` try something else.
fn fail<T>(input: &str, kind: RegexErrorKind) -> Res<T> {
    Err(nom::Err::Failure(RegexError { input, kind }))
}

pub(crate) fn full_regex(input: &str) -> Res<Ast> {
    expression(input)
}

fn expression(input: &str) -> Res<Ast> {
    map(
        separated_list1(complete::char('|'), sequence),
        wrap_multiple(Ast::Alt),
    )(input)
}

fn sequence(input: &str) -> Res<Ast> {
    map(many1(closure), wrap_multiple(Ast::Cat))(input)
}

fn wrap_multiple(f: impl Fn(Vec<Ast>) -> Ast) -> impl Fn(Vec<Ast>) -> Ast {
    move |mut items| {
        if items.len() > 1 {
            f(items)
        } else {
            items.remove(0)
        }
    }
}

fn closure(input: &str) -> Res<Ast> {
    map(term.and(opt(one_of("*+?"))), |(inner, op)| match op {
        Some('*') => Ast::Star(Box::new(inner)),
        Some('+') => Ast::Plus(Box::new(inner)),
        Some('?') => Ast::Quest(Box::new(inner)),
        None => inner,
        _ => unreachable!("one_of returned an unexpected closure operator"),
    })(input)
}

fn term(input: &str) -> Res<Ast> {
    if matches!(input.chars().next(), Some('*' | '+' | '?')) {
        return fail(input, RegexErrorKind::BareClosure);
    }
    alt((group, class, metachar, literal))(input)
}

fn group(input: &str) -> Res<Ast> {
    let (rest, _) = complete::char('(')(input)?;
    let (rest, inner) = expression(rest)?;
    match complete::char::<_, RegexError>(')')(rest) {
        Ok((rest, _)) => Ok((rest, inner)),
        Err(_) => fail(input, RegexErrorKind::UnmatchedParen),
    }
}

fn metachar(input: &str) -> Res<Ast> {
    alt((
        value(Ast::Any, complete::char('.')),
        value(Ast::Start, complete::char('^')),
        value(Ast::End, complete::char('$')),
    ))(input)
}

fn literal(input: &str) -> Res<Ast> {
    let mut chars = input.chars();
    match chars.next() {
        Some('\\') => {
            let (rest, c) = escape(input)?;
            Ok((rest, Ast::Rune(c)))
        }
        Some(c) if !is_meta(c) => Ok((&input[c.len_utf8()..], Ast::Rune(c))),
        _ => Err(nom::Err::Error(RegexError {
            input,
            kind: RegexErrorKind::Syntax,
        })),
    }
}

/// Parses `\x`, the cursor on the backslash. Any ASCII punctuation escapes
/// to itself; the letter escapes map to control characters; everything else
/// is an error.
fn escape(input: &str) -> Res<char> {
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some('\\'), Some(e)) => match escape_char(e) {
            Some(c) => Ok((&input[1 + e.len_utf8()..], c)),
            None => fail(input, RegexErrorKind::BadEscape),
        },
        _ => fail(input, RegexErrorKind::BadEscape),
    }
}

fn escape_char(e: char) -> Option<char> {
    match e {
        'a' => Some('\x07'),
        'b' => Some('\x08'),
        'f' => Some('\x0C'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'v' => Some('\x0B'),
        c if c.is_ascii_punctuation() => Some(c),
        _ => None,
    }
}

fn is_meta(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | '[' | ']' | '|' | '*' | '+' | '?' | '.' | '^' | '$' | '\\'
    )
}

/// `[...]` character class. A leading `^` negates; `-` between two items
/// forms a closed range (reversed bounds are an error); `-` first or last is
/// the literal dash. The collected intervals are sorted and merged before
/// they label the class edge.
fn class(input: &str) -> Res<Ast> {
    let (mut rest, _) = complete::char('[')(input)?;
    let negated = match rest.strip_prefix('^') {
        Some(r) => {
            rest = r;
            true
        }
        None => false,
    };

    let mut items: Vec<(u32, u32)> = Vec::new();
    let mut left: Option<char> = None;
    let mut dash = false;
    loop {
        if let Some(r) = rest.strip_prefix(']') {
            if let Some(l) = left.take() {
                items.push((l as u32, l as u32));
            }
            if dash {
                items.push(('-' as u32, '-' as u32));
            }
            let intervals = merge_intervals(items);
            return Ok((r, Ast::Class { negated, intervals }));
        }
        if !dash && left.is_some() {
            if let Some(r) = rest.strip_prefix('-') {
                dash = true;
                rest = r;
                continue;
            }
        }
        let (r, c) = class_char(rest, input)?;
        rest = r;
        if dash {
            let l = left.take().expect("dash requires a pending left endpoint");
            if l > c {
                return fail(input, RegexErrorKind::BadRange);
            }
            items.push((l as u32, c as u32));
            dash = false;
        } else if let Some(l) = left.replace(c) {
            items.push((l as u32, l as u32));
        }
    }
}

fn class_char<'a>(rest: &'a str, class_start: &'a str) -> Res<'a, char> {
    let mut chars = rest.chars();
    match chars.next() {
        None => fail(class_start, RegexErrorKind::UnmatchedBracket),
        Some('\\') => {
            let (rest, c) = escape(rest)?;
            Ok((rest, c))
        }
        Some(c) => Ok((&rest[c.len_utf8()..], c)),
    }
}

fn merge_intervals(mut items: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    items.sort_unstable();
    let mut merged: Vec<(u32, u32)> = Vec::with_capacity(items.len());
    for (lo, hi) in items {
        match merged.last_mut() {
            Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }
    merged
}
