use crate::alphabet::Alphabet;
use crate::dfa::Dfa;
use crate::emit;
use crate::parser::{self, RegexErrorKind};
use crate::regex::Ast;
use crate::scanner::{self, Program, RuleTable, Scanner};
use crate::spec::{self, SpecError};
use ::regex::Regex as LibRegex;
use proptest::prelude::*;
use std::io::{self, Read};

/// Builds a program from top-level rule regexes with empty actions.
fn program(rules: &[&str]) -> Program {
    let source: String = rules.iter().map(|r| format!("/{r}/ {{ }}\n")).collect();
    let spec = spec::parse(&source).unwrap();
    scanner::compile(&spec.root).unwrap()
}

/// Scans a flat (non-nested) rule program to completion.
fn tokens(program: Program, input: &str) -> Vec<(i32, String)> {
    let mut scanner = Scanner::new(program, input.as_bytes());
    let mut out = Vec::new();
    loop {
        let i = scanner.next(0);
        if i < 0 {
            return out;
        }
        out.push((i, scanner.text().to_string()));
    }
}

/// Scans a nested rule program the way a generated driver does, recording
/// (frame depth, rule index, text) per emission.
fn events(program: Program, input: &str) -> Vec<(usize, i32, String)> {
    fn pump<R: Read>(
        scanner: &mut Scanner<R>,
        rules: &[RuleTable],
        level: usize,
        out: &mut Vec<(usize, i32, String)>,
    ) {
        loop {
            let i = scanner.next(level);
            if i < 0 {
                return;
            }
            out.push((level, i, scanner.text().to_string()));
            let nest = &rules[i as usize].nest;
            if !nest.is_empty() {
                pump(scanner, nest, level + 1, out);
            }
        }
    }
    let rules = program.rules.clone();
    let mut scanner = Scanner::new(program, input.as_bytes());
    let mut out = Vec::new();
    pump(&mut scanner, &rules, 0, &mut out);
    out
}

fn table_for(pattern: &str) -> RuleTable {
    Dfa::from_nfa(&parser::regex(pattern).unwrap().to_nfa()).to_table()
}

/// Whether the DFA accepts exactly `input`, anchors included: the `^` walk
/// runs before any input, the `$` walk after all of it.
fn table_accepts(table: &RuleTable, input: &str) -> bool {
    let chars: Vec<char> = input.chars().collect();
    let total = chars.len();
    let mut accepted = total == 0 && table.acc[0];

    let mut state: i32 = 0;
    let mut visited = vec![false; table.acc.len()];
    visited[0] = true;
    loop {
        let to = table.startf[state as usize];
        if to < 0 || visited[to as usize] {
            break;
        }
        visited[to as usize] = true;
        state = to;
        if total == 0 && table.acc[to as usize] {
            accepted = true;
        }
    }

    for (k, &c) in chars.iter().enumerate() {
        state = table.step(state as usize, c);
        if state < 0 {
            return false;
        }
        if table.acc[state as usize] && k + 1 == total {
            accepted = true;
        }
    }

    let mut visited = vec![false; table.acc.len()];
    let mut cur = state as usize;
    visited[cur] = true;
    loop {
        let to = table.endf[cur];
        if to < 0 || visited[to as usize] {
            break;
        }
        visited[to as usize] = true;
        if table.acc[to as usize] {
            accepted = true;
            break;
        }
        cur = to as usize;
    }
    accepted
}

// ---------------------------------------------------------------- spec reader

#[test]
fn spec_reader_rule_tree_and_hooks() {
    let source = include_str!("../tests/files/nested.weft");
    let spec = spec::parse(source).unwrap();

    assert_eq!(spec.root.start_code.as_deref(), Some(r#"{ print!("<"); }"#));
    assert_eq!(spec.root.end_code.as_deref(), Some(r#"{ println!(">"); }"#));
    assert_eq!(spec.root.kids.len(), 1);

    let outer = &spec.root.kids[0];
    assert_eq!(outer.regex, "a[bcd]*e");
    assert_eq!(outer.id, 2);
    assert_eq!(outer.start_code.as_deref(), Some(r#"{ print!("("); }"#));
    assert_eq!(outer.end_code.as_deref(), Some(r#"{ print!(")"); }"#));
    assert_eq!(outer.kids.len(), 3);

    let middle = &outer.kids[1];
    assert_eq!(middle.regex, "bcd");
    assert_eq!(middle.kids.len(), 1);
    assert_eq!(middle.kids[0].regex, "c");
    assert_eq!(middle.end_code.as_deref(), Some(r#"{ print!("]"); }"#));

    assert!(spec.user_code.contains("fn main()"));
}

#[test]
fn spec_reader_delimiters() {
    let spec = spec::parse("|a/b| { x }").unwrap();
    assert_eq!(spec.root.kids[0].regex, "a/b");

    // An escaped delimiter stays in the body for the regex parser.
    let spec = spec::parse(r"/a\/b/ { x }").unwrap();
    assert_eq!(spec.root.kids[0].regex, r"a\/b");

    let spec = spec::parse("").unwrap();
    assert!(spec.root.kids.is_empty());
    assert_eq!(spec.user_code, "");
}

#[test]
fn spec_reader_rule_ids_are_lines() {
    let spec = spec::parse("\n\n/a/ { }\n/b/ { }\n").unwrap();
    assert_eq!(spec.root.kids[0].id, 3);
    assert_eq!(spec.root.kids[1].id, 4);
}

#[test]
fn spec_reader_errors() {
    use SpecError::*;
    let cases: &[(&str, SpecError)] = &[
        ("/ab/ { unclosed", UnmatchedBrace(1)),
        ("/ab\n/ { }", NewlineInRegex(1)),
        ("< { }", UnmatchedOpen(1)),
        ("/a/ < /b/ { }", UnmatchedOpen(1)),
        ("> { }", UnmatchedClose(1)),
        ("/a/ /b/ { }", MissingAction(1)),
        ("/a/ { }\n< { }", MisplacedOpen(2)),
        ("/a/", UnexpectedEof(1)),
        ("/a/ < // > { }", EmptyNestedRegex(1)),
    ];
    for (source, want) in cases {
        assert_eq!(spec::parse(source).as_ref().unwrap_err(), want, "for {source:?}");
    }
}

// --------------------------------------------------------------- regex parser

#[test]
fn regex_parser_ast() {
    let ast = parser::regex("a(b|c)*d").unwrap();
    assert_eq!(
        ast,
        Ast::Cat(vec![
            Ast::Rune('a'),
            Ast::Star(Box::new(Ast::Alt(vec![Ast::Rune('b'), Ast::Rune('c')]))),
            Ast::Rune('d'),
        ])
    );

    assert_eq!(parser::regex(r"\n").unwrap(), Ast::Rune('\n'));
    assert_eq!(parser::regex(r"\.").unwrap(), Ast::Rune('.'));
    assert_eq!(parser::regex(r"\\").unwrap(), Ast::Rune('\\'));
}

#[test]
fn regex_parser_classes() {
    let class = |negated, intervals: &[(char, char)]| Ast::Class {
        negated,
        intervals: intervals.iter().map(|&(l, h)| (l as u32, h as u32)).collect(),
    };

    assert_eq!(parser::regex("[a-c]").unwrap(), class(false, &[('a', 'c')]));
    assert_eq!(parser::regex("[^a-c]").unwrap(), class(true, &[('a', 'c')]));
    // '-' first or last is the literal dash.
    assert_eq!(parser::regex("[-a]").unwrap(), class(false, &[('-', '-'), ('a', 'a')]));
    assert_eq!(parser::regex("[a-]").unwrap(), class(false, &[('-', '-'), ('a', 'a')]));
    // Escaped endpoints close ranges too.
    assert_eq!(parser::regex(r"[\t-\r]").unwrap(), class(false, &[('\t', '\r')]));
    // Overlapping items merge.
    assert_eq!(parser::regex("[a-fc-x]").unwrap(), class(false, &[('a', 'x')]));
    assert_eq!(parser::regex("[]").unwrap(), class(false, &[]));
}

#[test]
fn regex_parser_errors() {
    let cases: &[(&str, RegexErrorKind)] = &[
        ("(a", RegexErrorKind::UnmatchedParen),
        ("a)", RegexErrorKind::UnmatchedParen),
        ("[ab", RegexErrorKind::UnmatchedBracket),
        ("a]", RegexErrorKind::UnmatchedBracket),
        ("*a", RegexErrorKind::BareClosure),
        ("a|*", RegexErrorKind::BareClosure),
        ("a**", RegexErrorKind::BareClosure),
        ("a+?", RegexErrorKind::BareClosure),
        ("[b-a]", RegexErrorKind::BadRange),
        (r"\q", RegexErrorKind::BadEscape),
        ("a\\", RegexErrorKind::BadEscape),
    ];
    for (input, want) in cases {
        assert_eq!(parser::regex(input).unwrap_err().kind, *want, "for {input:?}");
    }
}

// ------------------------------------------------------------------- alphabet

#[test]
fn alphabet_insertion_splits() {
    let mut a = Alphabet::default();
    a.insert_range(10, 20);
    a.insert_range(30, 40);
    a.insert_range(1, 5);
    assert_eq!(a.ranges, vec![(1, 5), (10, 20), (30, 40)]);

    // Overlap from the left splits both sides of the boundary.
    let mut a = Alphabet::default();
    a.insert_range(10, 20);
    a.insert_range(5, 15);
    assert_eq!(a.ranges, vec![(5, 9), (10, 15), (16, 20)]);

    // Overlap from the right cuts the existing interval first.
    let mut a = Alphabet::default();
    a.insert_range(10, 20);
    a.insert_range(15, 25);
    assert_eq!(a.ranges, vec![(10, 14), (15, 20), (21, 25)]);

    // Duplicates and covered insertions are dropped.
    let mut a = Alphabet::default();
    a.insert_range(10, 20);
    a.insert_range(10, 20);
    a.insert_range(10, 14);
    assert_eq!(a.ranges, vec![(10, 14), (15, 20)]);
    assert!(a.is_normalized());
}

#[test]
fn alphabet_singles_are_punched_out_of_ranges() {
    let nfa = parser::regex("ab|[a-z]c").unwrap().to_nfa();
    let alphabet = Alphabet::of(&nfa);
    assert_eq!(
        alphabet.singles.iter().collect::<Vec<_>>(),
        vec![&'a', &'b', &'c']
    );
    assert_eq!(alphabet.ranges, vec![('d' as u32, 'z' as u32)]);
    assert!(alphabet.is_normalized());

    // A degenerate class range is a single from the start.
    let nfa = parser::regex("[a-a]x").unwrap().to_nfa();
    let alphabet = Alphabet::of(&nfa);
    assert_eq!(alphabet.singles.iter().collect::<Vec<_>>(), vec![&'a', &'x']);
    assert!(alphabet.ranges.is_empty());
}

// ------------------------------------------------------------------ NFA & DFA

#[test]
fn nfa_compact_drops_spliced_orphans() {
    let nfa = parser::regex("ab").unwrap().to_nfa();
    assert_eq!(nfa.nodes().len(), 4);
    let compact = nfa.compact();
    // The second atom's entry node is orphaned by the splice.
    assert_eq!(compact.nodes().len(), 3);
    assert_eq!(compact.start(), 0);
    assert_eq!(compact.accept(), 2);
}

#[test]
fn dfa_language_hand_cases() {
    let cases: &[(&str, &[&str], &[&str])] = &[
        ("a", &["a"], &["", "b", "aa"]),
        ("ab*c", &["ac", "abc", "abbbc"], &["a", "abb", "bc"]),
        ("(a|b)+", &["a", "b", "ab", "abba"], &["", "c", "abc"]),
        ("[a-c]x", &["ax", "bx", "cx"], &["dx", "x", "axx"]),
        ("[^a]", &["b", "z"], &["a", "", "bb"]),
        (".", &["a", "Z"], &["", "ab"]),
        ("a?b", &["b", "ab"], &["a", "aab"]),
        ("(ab)*", &["", "ab", "abab"], &["a", "aba"]),
        ("a+", &["a", "aaa"], &["", "b"]),
        ("x|yz", &["x", "yz"], &["y", "xz", ""]),
        ("ab|[a-z]c", &["ab", "xc", "ac"], &["xb", "a", "abc"]),
        ("[]", &[], &["", "a"]),
        ("[^]", &["a", "-"], &["", "ab"]),
        (r"\.", &["."], &["a"]),
        (r"\n", &["\n"], &["n"]),
        ("[٠-٩]+", &["٣", "٣٤"], &["", "12"]),
        ("[一二三]", &["二"], &["四", ""]),
    ];
    for (pattern, accepted, rejected) in cases {
        let table = table_for(pattern);
        for input in *accepted {
            assert!(table_accepts(&table, input), "{pattern:?} should accept {input:?}");
        }
        for input in *rejected {
            assert!(!table_accepts(&table, input), "{pattern:?} should reject {input:?}");
        }
    }
}

#[test]
fn dfa_anchor_transitions() {
    let dfa = Dfa::from_nfa(&parser::regex("^a").unwrap().to_nfa());
    assert!(dfa.states()[0].start.is_some());
    assert!(dfa.states()[0].end.is_none());

    let cases: &[(&str, &[&str], &[&str])] = &[
        ("^a", &["a"], &["", "b"]),
        ("a$", &["a"], &["", "aa"]),
        ("^$", &[""], &["a"]),
        ("^", &[""], &["a"]),
        ("$", &[""], &["a"]),
        ("^a$", &["a"], &["", "aa"]),
    ];
    for (pattern, accepted, rejected) in cases {
        let table = table_for(pattern);
        for input in *accepted {
            assert!(table_accepts(&table, input), "{pattern:?} should accept {input:?}");
        }
        for input in *rejected {
            assert!(!table_accepts(&table, input), "{pattern:?} should reject {input:?}");
        }
    }
}

#[test]
fn dfa_construction_reaches_fixpoint() {
    for pattern in ["a(b|c)*d", "(ab)+a?", "[a-f]x|y[^a-f]", "^a[bc]*$"] {
        let nfa = parser::regex(pattern).unwrap().to_nfa();
        assert_eq!(Dfa::from_nfa(&nfa), Dfa::from_nfa(&nfa));
    }
}

#[test]
fn dfa_dead_state_is_not_materialized() {
    let dfa = Dfa::from_nfa(&parser::regex("a").unwrap().to_nfa());
    assert_eq!(dfa.states().len(), 2);
    assert_eq!(dfa.states()[0].runes, vec![('a', Some(1))]);
    assert_eq!(dfa.states()[1].runes, vec![('a', None)]);
    assert_eq!(dfa.states()[1].wild, None);
}

fn random_pattern() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        4 => prop::sample::select(vec!["a", "b", "c"]).prop_map(String::from),
        1 => Just("[ab]".to_string()),
        1 => Just("[a-c]".to_string()),
        1 => Just(".".to_string()),
    ];
    leaf.prop_recursive(6, 64, 6, |inner| {
        prop_oneof![
            3 => prop::collection::vec(inner.clone(), 1..4).prop_map(|v| v.concat()),
            2 => prop::collection::vec(inner.clone(), 2..4).prop_map(|v| v.join("|")),
            1 => inner.clone().prop_map(|r| format!("({r})")),
            1 => inner.clone().prop_map(|r| format!("({r})*")),
            1 => inner.clone().prop_map(|r| format!("({r})+")),
            1 => inner.prop_map(|r| format!("({r})?")),
        ]
    })
}

proptest! {
    /// The constructed DFA accepts the same language as the regex crate,
    /// full-match, over the alphabet the patterns draw from.
    #[test]
    fn dfa_language_matches_regex_crate(
        pattern in random_pattern(),
        inputs in prop::collection::vec("[a-c]{0,8}", 16)
    ) {
        let table = table_for(&pattern);
        let oracle = LibRegex::new(&format!("^(?:{pattern})$")).unwrap();
        for input in &inputs {
            prop_assert_eq!(
                table_accepts(&table, input),
                oracle.is_match(input),
                "pattern {} input {:?}", pattern, input
            );
        }
    }

    /// Every code point of the input comes back out, either inside a match
    /// or as a dropped code point; with a catch-all rule there are no drops,
    /// so the concatenated texts reproduce the input.
    #[test]
    fn scanner_preserves_input(input in "[ab\\n]{0,40}") {
        let toks = tokens(program(&["ab", "a", "."]), &input);
        let rebuilt: String = toks.iter().map(|(_, text)| text.as_str()).collect();
        prop_assert_eq!(rebuilt, input);
    }
}

// -------------------------------------------------------------------- scanner

#[test]
fn scanner_longest_match_and_drop() {
    let rules = &["rob", "robot"];
    assert_eq!(tokens(program(rules), "robot"), vec![(1, "robot".into())]);
    assert_eq!(tokens(program(rules), "rob"), vec![(0, "rob".into())]);
    // "robo": "rob" is emitted, the trailing "o" is dropped unmatched.
    assert_eq!(tokens(program(rules), "robo"), vec![(0, "rob".into())]);
}

#[test]
fn scanner_tie_breaks_to_earlier_rule() {
    assert_eq!(tokens(program(&["ab", "ab"]), "ab"), vec![(0, "ab".into())]);
}

#[test]
fn scanner_drops_unmatched_one_code_point_at_a_time() {
    assert_eq!(
        tokens(program(&["ab", "a", "."]), "xaby"),
        vec![(2, "x".into()), (0, "ab".into()), (2, "y".into())]
    );
    // No catch-all: unmatched code points vanish silently.
    assert_eq!(
        tokens(program(&["ab"]), "xabab!ab"),
        vec![(0, "ab".into()), (0, "ab".into()), (0, "ab".into())]
    );
}

#[test]
fn scanner_anchor_rules_on_empty_input() {
    // The zero-width candidates tie at length zero, so the earliest rule in
    // the list fires, exactly once.
    assert_eq!(tokens(program(&["^$", "^", "$"]), ""), vec![(0, String::new())]);
    assert_eq!(tokens(program(&["^", "$"]), ""), vec![(0, String::new())]);
    assert_eq!(tokens(program(&["$", "^"]), ""), vec![(0, String::new())]);
}

#[test]
fn scanner_caret_fires_only_at_frame_start() {
    // A longer real match beats the zero-width one.
    assert_eq!(tokens(program(&["^", "x"]), "x"), vec![(1, "x".into())]);
    // Unmatched input after the zero-width match is dropped; ^ does not
    // fire again mid-scan.
    assert_eq!(tokens(program(&["^", "x"]), "y"), vec![(0, String::new())]);
    assert_eq!(
        tokens(program(&["^a", "a"]), "aa"),
        vec![(0, "a".into()), (1, "a".into())]
    );
}

#[test]
fn scanner_dollar_fires_once_at_eof() {
    let mut scanner = Scanner::new(program(&["$"]), "ab".as_bytes());
    assert_eq!(scanner.next(0), 0);
    assert_eq!(scanner.text(), "");
    // Both unmatched code points were dropped before the anchor fired.
    assert_eq!((scanner.line(), scanner.column()), (1, 3));
    assert_eq!(scanner.next(0), -1);
}

#[test]
fn scanner_dollar_alternation_at_eof() {
    assert_eq!(
        tokens(program(&["e$|f$", "(qux)*"]), "quxqux quxq quxe"),
        vec![
            (1, "quxqux".into()),
            (1, "qux".into()),
            (1, "qux".into()),
            (0, "e".into()),
        ]
    );
}

/// Builds the expected event stream for a one-level nested program whose
/// outer rule 0 matches each word: the outer emission, then the word's
/// inner emissions.
fn word_events(words: &[(&str, &[(i32, &str)])]) -> Vec<(usize, i32, String)> {
    let mut out = Vec::new();
    for (word, inner) in words {
        out.push((0, 0, word.to_string()));
        for &(rule, text) in *inner {
            out.push((1, rule, text.to_string()));
        }
    }
    out
}

#[test]
fn scanner_dollar_anchors_in_nested_frames() {
    // Every lowercase run becomes its own nested frame, so `$` fires at the
    // end of each word, not just at the end of the whole input. The `$`-only
    // rule catches words no other rule survives to the frame's end.
    let source = "\
/[a-z]*/ <
    /a(($*|$$)($($)$$$))$($$$)*/ { }
    /(e$|f$)/ { }
    /(qux)*/  { }
    /$/       { }
> { }
//
";
    let spec = spec::parse(source).unwrap();
    let program = scanner::compile(&spec.root).unwrap();
    let got = events(program, "a b c d e f g aaab aaaa eeeg fffe quxqux quxq quxe");
    let want = word_events(&[
        ("a", &[(0, "a")]),
        ("b", &[(3, "")]),
        ("c", &[(3, "")]),
        ("d", &[(3, "")]),
        ("e", &[(1, "e")]),
        ("f", &[(1, "f")]),
        ("g", &[(3, "")]),
        // Dropped code points record no match, so the frame ends on the
        // zero-width `$` rule alone.
        ("aaab", &[(3, "")]),
        // The first three a's are dropped; the last one reaches the frame
        // end, where rule 0's `$` chain completes.
        ("aaaa", &[(0, "a")]),
        ("eeeg", &[(3, "")]),
        ("fffe", &[(1, "e")]),
        ("quxqux", &[(2, "quxqux")]),
        // The trailing q is dropped after the match, and the frame's single
        // `$` walk is already spent: no zero-width emission follows.
        ("quxq", &[(2, "qux")]),
        ("quxe", &[(2, "qux"), (1, "e")]),
    ]);
    assert_eq!(got, want);
}

#[test]
fn scanner_caret_chains_and_precedence_in_nested_frames() {
    // The sibling case: `^` chains walked at the start of each nested
    // frame, longest match across differently-anchored rules, index
    // tie-break, and no `^` re-fire after a mid-frame restart.
    let source = "\
/[a-z]*/ <
    /((^*|^^)(^(^)^^^))^(^^^)*bar/ { }
    /(^foo)*/ { }
    /^fooo$/  { }
    /^f(oo)*/ { }
    /^foo*/   { }
    /^/       { }
> { }
//
";
    let spec = spec::parse(source).unwrap();
    let program = scanner::compile(&spec.root).unwrap();
    let got = events(program, "foo bar foooo fooo fooooo fooof baz foofoo");
    let want = word_events(&[
        ("foo", &[(1, "foo")]),
        ("bar", &[(0, "bar")]),
        ("foooo", &[(3, "foooo")]),
        // `^fooo$` needs both anchors; it wins the length-4 tie at the
        // frame end over `^foo*`.
        ("fooo", &[(2, "fooo")]),
        ("fooooo", &[(4, "fooooo")]),
        // The trailing f is dropped; the anchored rules are all dead after
        // the restart, so nothing else fires.
        ("fooof", &[(4, "fooo")]),
        ("baz", &[(5, "")]),
        // `(^foo)*` cannot loop past its first iteration mid-frame, so the
        // second "foo" is dropped unmatched.
        ("foofoo", &[(1, "foo")]),
    ]);
    assert_eq!(got, want);
}

#[test]
fn scanner_nested_rules() {
    let source = "\
/a[bcd]*e/ <
    /a/ { }
    /bcd/ <
        /c/ { }
    > { }
    /e/ { }
> { }
//
";
    let spec = spec::parse(source).unwrap();
    let program = scanner::compile(&spec.root).unwrap();
    let got = events(program, "abcdeabcabcdabcdddcccbbbcde");
    let want: Vec<(usize, i32, String)> = vec![
        (0, 0, "abcde".into()),
        (1, 0, "a".into()),
        (1, 1, "bcd".into()),
        (2, 0, "c".into()),
        (1, 2, "e".into()),
        (0, 0, "abcdddcccbbbcde".into()),
        (1, 0, "a".into()),
        (1, 1, "bcd".into()),
        (2, 0, "c".into()),
        (1, 1, "bcd".into()),
        (2, 0, "c".into()),
        (1, 2, "e".into()),
    ];
    assert_eq!(got, want);
}

#[test]
fn scanner_positions() {
    let mut scanner = Scanner::new(program(&["ab", "cd", "\\n"]), "ab\ncd".as_bytes());
    assert_eq!(scanner.next(0), 0);
    assert_eq!((scanner.line(), scanner.column()), (1, 1));
    assert_eq!(scanner.next(0), 2);
    assert_eq!((scanner.line(), scanner.column()), (1, 3));
    assert_eq!(scanner.next(0), 1);
    assert_eq!((scanner.line(), scanner.column()), (2, 1));
    assert_eq!(scanner.next(0), -1);
}

#[test]
fn scanner_cancel_is_one_shot() {
    let mut scanner = Scanner::new(program(&["a"]), "aaa".as_bytes());
    assert_eq!(scanner.next(0), 0);
    scanner.cancel();
    assert_eq!(scanner.next(0), -1);
    assert_eq!(scanner.next(0), -1);
}

/// Reads one byte, then fails.
struct FailingReader {
    sent: bool,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.sent {
            Err(io::Error::new(io::ErrorKind::Other, "wire fell out"))
        } else {
            self.sent = true;
            buf[0] = b'a';
            Ok(1)
        }
    }
}

#[test]
fn scanner_read_errors_are_fatal() {
    let mut scanner = Scanner::new(program(&["a"]), FailingReader { sent: false });
    assert_eq!(scanner.next(0), -1);
    assert!(scanner.take_error().is_some());
    assert_eq!(scanner.next(0), -1);
}

#[test]
fn scanner_unicode_digit_translation() {
    // Arabic-Indic digits map by code-point offset; Chinese numerals are
    // accumulated positionally; everything else copies through.
    let rules = &["[٠-٩]", "[一二三四五六七八九十百]", "."];
    let toks = tokens(program(rules), "١ + ٢ + ١٨ = 一百五十三");

    let value = |c: char| match c {
        '一' => 1,
        '二' => 2,
        '三' => 3,
        '四' => 4,
        '五' => 5,
        '六' => 6,
        '七' => 7,
        '八' => 8,
        '九' => 9,
        '十' => 10,
        '百' => 100,
        _ => 0,
    };
    let mut out = String::new();
    let (mut acc, mut cur) = (0u64, 0u64);
    let mut pending = false;
    for (rule, text) in &toks {
        match rule {
            0 => {
                let c = text.chars().next().unwrap();
                out.push(char::from_u32('0' as u32 + (c as u32 - '٠' as u32)).unwrap());
            }
            1 => {
                pending = true;
                let v = value(text.chars().next().unwrap());
                if v >= 10 {
                    acc += cur.max(1) * v;
                    cur = 0;
                } else {
                    cur = v;
                }
            }
            _ => {
                if pending {
                    out.push_str(&(acc + cur).to_string());
                    acc = 0;
                    cur = 0;
                    pending = false;
                }
                out.push_str(text);
            }
        }
    }
    if pending {
        out.push_str(&(acc + cur).to_string());
    }
    assert_eq!(out, "1 + 2 + 18 = 153");
}

// -------------------------------------------------------------------- emitter

fn sample_spec() -> spec::Spec {
    spec::parse(
        "\
/\\n/ { return 1; }
/./  { return 2; }
//
fn main() { run() }
",
    )
    .unwrap()
}

#[test]
fn emit_is_deterministic() {
    let spec = sample_spec();
    let tree = crate::dfa::compile_rule_tree(&spec.root).unwrap();
    let options = emit::Options::default();
    assert_eq!(
        emit::generate(&spec, &tree, &options),
        emit::generate(&spec, &tree, &options)
    );
}

#[test]
fn emit_contains_runtime_tables_and_user_code() {
    let spec = sample_spec();
    let tree = crate::dfa::compile_rule_tree(&spec.root).unwrap();
    let code = emit::generate(&spec, &tree, &emit::Options::default());

    assert!(code.contains("mod yyscan"));
    assert!(code.contains("pub struct Scanner"));
    assert!(code.contains("fn yyprogram() -> yyscan::Program"));
    assert!(code.contains("pub struct yyLexer"));
    assert!(code.contains("pub fn lex(&mut self) -> i32"));
    assert!(code.contains("{ return 1; }"));
    assert!(code.contains("pub fn error"));
    assert!(code.contains("fn main() { run() }"));
}

#[test]
fn emit_serializes_transitions_in_order() {
    let spec = spec::parse("/ab/ { }\n").unwrap();
    let tree = crate::dfa::compile_rule_tree(&spec.root).unwrap();
    let code = emit::generate(&spec, &tree, &emit::Options::default());
    assert!(code.contains("runes: vec![('a', 1), ('b', -1)]"));
    assert!(code.contains("acc: vec![false, false, true]"));
}

#[test]
fn emit_option_switches() {
    let spec = sample_spec();
    let tree = crate::dfa::compile_rule_tree(&spec.root).unwrap();

    let prefixed = emit::generate(
        &spec,
        &tree,
        &emit::Options {
            prefix: "foo".into(),
            ..emit::Options::default()
        },
    );
    assert!(prefixed.contains("fn fooprogram"));
    assert!(prefixed.contains("struct fooLexer"));
    assert!(!prefixed.contains("yyLexer"));

    let standalone = emit::generate(
        &spec,
        &tree,
        &emit::Options {
            standalone: true,
            ..emit::Options::default()
        },
    );
    assert!(standalone.contains("pub fn yymain"));
    assert!(!standalone.contains("pub fn lex(&mut self)"));

    let custom = emit::generate(
        &spec,
        &tree,
        &emit::Options {
            custom_error: true,
            ..emit::Options::default()
        },
    );
    assert!(!custom.contains("pub fn error"));
}

#[test]
fn emit_nested_driver_guards_hooks() {
    let source = include_str!("../tests/files/nested.weft");
    let spec = spec::parse(source).unwrap();
    let tree = crate::dfa::compile_rule_tree(&spec.root).unwrap();
    let code = emit::generate(&spec, &tree, &emit::Options::default());
    assert!(code.contains("is_stale"));
    assert!(code.contains("'scan1"));
    assert!(code.contains(r#"{ print!("["); }"#));
}

// ------------------------------------------------------------------ graphviz

#[test]
fn dot_output_names_graphs_and_marks_accept() {
    let nfa = parser::regex("ab").unwrap().to_nfa();
    let dot = nfa.to_dot("nfa_1");
    assert!(dot.starts_with("digraph nfa_1 {"));
    assert!(dot.contains("doublecircle"));
    assert!(dot.contains("label=\"a\""));

    let dfa = Dfa::from_nfa(&nfa);
    let dot = dfa.to_dot("dfa_1");
    assert!(dot.starts_with("digraph dfa_1 {"));
    assert!(dot.contains("label=\"b\""));
}
