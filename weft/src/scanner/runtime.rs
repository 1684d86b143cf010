// The scanner runtime. This file is compiled as part of the weft library
// and is also embedded verbatim into every generated lexer, so it must
// stand alone: std only, no references to the rest of the crate.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::rc::Rc;

/// The dead state: every transition out of it fails.
pub const DEAD: i32 = -1;

/// The compiled rule tree a scanner executes: one [RuleTable] per top-level
/// rule, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub rules: Vec<RuleTable>,
}

/// One rule's DFA in transition-table form, plus its nested rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    /// Whether each state accepts.
    pub acc: Vec<bool>,
    /// Symbol transitions per state.
    pub trans: Vec<StateRow>,
    /// Zero-width `^` transition per state, or -1.
    pub startf: Vec<i32>,
    /// Zero-width `$` transition per state, or -1.
    pub endf: Vec<i32>,
    /// Nested rules, scanned over this rule's matched text.
    pub nest: Vec<RuleTable>,
}

/// Symbol transitions out of one DFA state: exact code points first, then
/// ranges in order, then the wild fall-through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRow {
    pub runes: Vec<(char, i32)>,
    pub ranges: Vec<(u32, u32, i32)>,
    pub wild: i32,
}

impl RuleTable {
    /// The symbol transition out of `state` on `r`: exact runes first, then
    /// ranges in order, then the wild fall-through (which may be dead).
    pub fn step(&self, state: usize, r: char) -> i32 {
        let row = &self.trans[state];
        for &(c, to) in &row.runes {
            if c == r {
                return to;
            }
        }
        let p = r as u32;
        for &(lo, hi, to) in &row.ranges {
            if lo <= p && p <= hi {
                return to;
            }
        }
        row.wild
    }
}

/// Incremental UTF-8 decoding over any reader. EOF is `Ok(None)`; invalid
/// encoding is an `InvalidData` error, which the scanner treats as fatal.
struct CharReader<R> {
    inner: R,
}

impl<R: Read> CharReader<R> {
    fn next_char(&mut self) -> io::Result<Option<char>> {
        let mut buf = [0u8; 4];
        if self.read_bytes(&mut buf[..1])? == 0 {
            return Ok(None);
        }
        let width = match buf[0] {
            0x00..=0x7F => return Ok(Some(buf[0] as char)),
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return Err(invalid_utf8()),
        };
        if self.read_bytes(&mut buf[1..width])? < width - 1 {
            return Err(invalid_utf8());
        }
        match std::str::from_utf8(&buf[..width]) {
            Ok(s) => Ok(s.chars().next()),
            Err(_) => Err(invalid_utf8()),
        }
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut have = 0;
        while have < buf.len() {
            match self.inner.read(&mut buf[have..]) {
                Ok(0) => break,
                Ok(k) => have += k,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(have)
    }
}

fn invalid_utf8() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "input is not valid UTF-8")
}

/// One (possibly nested) scan in progress.
struct Frame {
    /// Rule indices from the program root to this frame's rule list.
    path: Vec<usize>,
    /// Nested frames read from the parent's matched text; the root frame
    /// reads from the scanner's reader.
    text: Option<(Vec<char>, usize)>,
    buf: VecDeque<char>,
    /// How many buffered code points the current round has consumed.
    n: usize,
    states: Vec<i32>,
    matchi: i32,
    matchn: i32,
    eof: bool,
    walked_start: bool,
    walked_end: bool,
    /// Position of the buffer head.
    line: usize,
    column: usize,
    /// Stored result for stale re-dispatch.
    current: i32,
    last_text: String,
    last_line: usize,
    last_column: usize,
    pending_nest: Option<NestSeed>,
    done: bool,
}

struct NestSeed {
    path: Vec<usize>,
    text: Vec<char>,
    line: usize,
    column: usize,
}

impl Frame {
    fn new(path: Vec<usize>, text: Option<Vec<char>>, line: usize, column: usize) -> Frame {
        Frame {
            path,
            text: text.map(|t| (t, 0)),
            buf: VecDeque::new(),
            n: 0,
            states: Vec::new(),
            matchi: DEAD,
            matchn: DEAD,
            eof: false,
            walked_start: false,
            walked_end: false,
            line,
            column,
            current: DEAD,
            last_text: String::new(),
            last_line: line,
            last_column: column,
            pending_nest: None,
            done: false,
        }
    }

    /// Longest match wins; ties fall to the earlier rule.
    fn note_match(&mut self, i: usize, n: i32) {
        if self.matchn < n || (self.matchn == n && (i as i32) < self.matchi) {
            self.matchi = i as i32;
            self.matchn = n;
        }
    }

    /// The `^` walk: follow zero-width start transitions until they go dead
    /// or revisit a state. Every state reached takes part in accept
    /// checking, so a pure-anchor rule can record a zero-length match.
    fn walk_start(&mut self, i: usize, rule: &RuleTable) {
        let st = self.states[i];
        if st < 0 {
            return;
        }
        let mut visited = vec![false; rule.startf.len()];
        visited[st as usize] = true;
        let mut cur = st;
        loop {
            let to = rule.startf[cur as usize];
            if to < 0 || visited[to as usize] {
                break;
            }
            visited[to as usize] = true;
            self.states[i] = to;
            if rule.acc[to as usize] {
                self.note_match(i, self.n as i32);
            }
            cur = to;
        }
    }

    /// The `$` walk at end of input. Accepts along the walk are eligible for
    /// the longest match; once one is found the walk can stop, since a
    /// zero-width walk cannot grow the match.
    fn walk_end(&mut self, i: usize, rule: &RuleTable) {
        let st = self.states[i];
        if st < 0 {
            return;
        }
        let mut visited = vec![false; rule.endf.len()];
        visited[st as usize] = true;
        let mut cur = st as usize;
        loop {
            let to = rule.endf[cur];
            if to < 0 || visited[to as usize] {
                break;
            }
            visited[to as usize] = true;
            if rule.acc[to as usize] {
                self.note_match(i, self.n as i32);
                break;
            }
            cur = to as usize;
        }
    }

    fn reset_round(&mut self, rules: usize) {
        self.n = 0;
        self.matchi = DEAD;
        self.matchn = DEAD;
        self.states = vec![0; rules];
    }

    fn advance_pos(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

enum Advance {
    Match(usize),
    Finished,
}

/// The parallel longest-match scanner.
///
/// The scanner is a stateful iterator over a stack of frames. A driver pulls
/// it with [next](Scanner::next), passing the depth it is currently
/// dispatching at: `next(0)` yields top-level rule indices, and when a rule
/// with nested rules matches, the driver descends and pulls `next(1)` until
/// it returns -1, which pops the nested frame. [text](Scanner::text),
/// [line](Scanner::line) and [column](Scanner::column) describe the most
/// recent match of the innermost active frame.
///
/// After an action has returned out of the driver, the next pull re-descends
/// to the live frame: calls for shallower depths replay the stored rule
/// index with [is_stale](Scanner::is_stale) set, so group hooks are not run
/// twice.
pub struct Scanner<R> {
    program: Rc<Program>,
    reader: CharReader<R>,
    frames: Vec<Frame>,
    stale: bool,
    cancelled: bool,
    error: Option<io::Error>,
}

impl<R: Read> Scanner<R> {
    pub fn new(program: Program, input: R) -> Scanner<R> {
        Scanner {
            program: Rc::new(program),
            reader: CharReader { inner: input },
            frames: vec![Frame::new(Vec::new(), None, 1, 1)],
            stale: false,
            cancelled: false,
            error: None,
        }
    }

    /// Resumes scanning at frame depth `level` and returns the index of the
    /// next matching rule within that frame's rule list, or -1 when the
    /// frame is finished (end of input for the root, end of the matched
    /// text for nested frames).
    pub fn next(&mut self, level: usize) -> i32 {
        if self.cancelled || self.error.is_some() {
            self.stale = true;
            return DEAD;
        }
        while level >= self.frames.len() {
            let top = self.frames.last_mut().expect("BUG: frame stack empty");
            match top.pending_nest.take() {
                Some(seed) => {
                    self.frames
                        .push(Frame::new(seed.path, Some(seed.text), seed.line, seed.column));
                }
                None => {
                    // Resumed into a group whose frame has already finished.
                    self.stale = true;
                    return DEAD;
                }
            }
        }
        if level + 1 < self.frames.len() {
            // Re-dispatch: hand back the stored index so the driver can
            // descend to the live frame.
            self.stale = true;
            return self.frames[level].current;
        }
        self.stale = false;
        match self.advance_top() {
            Advance::Match(index) => index as i32,
            Advance::Finished => {
                if self.frames.len() > 1 {
                    self.frames.pop();
                } else {
                    self.frames[0].done = true;
                }
                DEAD
            }
        }
    }

    /// Whether the last [next](Scanner::next) replayed a stored index
    /// instead of producing a fresh match.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Text of the most recent match in the innermost active frame.
    pub fn text(&self) -> &str {
        &self.top().last_text
    }

    /// Line the most recent match began on (1-based).
    pub fn line(&self) -> usize {
        self.top().last_line
    }

    /// Column the most recent match began on (1-based).
    pub fn column(&self) -> usize {
        self.top().last_column
    }

    /// One-shot stop signal: no further emissions, no further reads.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// A read error other than EOF ends the scan; the error is held here.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    fn top(&self) -> &Frame {
        self.frames.last().expect("BUG: frame stack empty")
    }

    /// Runs the top frame until its next emission or until it finishes.
    fn advance_top(&mut self) -> Advance {
        let program = Rc::clone(&self.program);
        let fi = self.frames.len() - 1;
        let path = self.frames[fi].path.clone();
        let rules = rules_at(&program, &path);

        loop {
            let frame = &mut self.frames[fi];
            if frame.done {
                return Advance::Finished;
            }

            // Frame start: all machines at state 0, then the ^ walk. The
            // walk happens once per frame; later rounds restart at state 0
            // without it.
            if !frame.walked_start {
                frame.walked_start = true;
                frame.states = vec![0; rules.len()];
                for (i, rule) in rules.iter().enumerate() {
                    frame.walk_start(i, rule);
                }
            }

            // Make sure the next code point is buffered, or learn that the
            // input is exhausted.
            if frame.n == frame.buf.len() && !frame.eof {
                let read = match &mut frame.text {
                    Some((text, pos)) => {
                        let c = text.get(*pos).copied();
                        *pos += 1;
                        c
                    }
                    None => match self.reader.next_char() {
                        Ok(c) => c,
                        Err(e) => {
                            self.error = Some(e);
                            return Advance::Finished;
                        }
                    },
                };
                match read {
                    Some(c) => frame.buf.push_back(c),
                    None => frame.eof = true,
                }
            }

            if frame.n < frame.buf.len() {
                let r = frame.buf[frame.n];
                let mut alive = false;
                for (i, rule) in rules.iter().enumerate() {
                    let st = frame.states[i];
                    if st < 0 {
                        continue;
                    }
                    let to = rule.step(st as usize, r);
                    frame.states[i] = to;
                    if to >= 0 {
                        alive = true;
                        if rule.acc[to as usize] {
                            frame.note_match(i, (frame.n + 1) as i32);
                        }
                    }
                }
                if alive {
                    frame.n += 1;
                    continue;
                }
            } else {
                // Input exhausted: walk $ transitions, once per frame, then
                // retire every machine still standing.
                if !frame.walked_end {
                    frame.walked_end = true;
                    for (i, rule) in rules.iter().enumerate() {
                        frame.walk_end(i, rule);
                    }
                }
                for st in frame.states.iter_mut() {
                    *st = DEAD;
                }
            }

            // Every machine is dead; resolve the round.
            if frame.matchn < 0 {
                if frame.buf.is_empty() {
                    frame.done = true;
                    return Advance::Finished;
                }
                // Unmatched input: lose one code point and start over.
                let lost = frame.buf.pop_front().expect("buffer checked non-empty");
                frame.advance_pos(lost);
                frame.reset_round(rules.len());
                if frame.buf.is_empty() && frame.eof {
                    frame.done = true;
                    return Advance::Finished;
                }
            } else {
                let taken = frame.matchn as usize;
                let index = frame.matchi as usize;
                let (line, column) = (frame.line, frame.column);
                let text: String = frame.buf.drain(..taken).collect();
                for c in text.chars() {
                    frame.advance_pos(c);
                }
                frame.reset_round(rules.len());
                frame.current = index as i32;
                frame.last_text = text;
                frame.last_line = line;
                frame.last_column = column;
                if !rules[index].nest.is_empty() {
                    let mut nest_path = path.clone();
                    nest_path.push(index);
                    frame.pending_nest = Some(NestSeed {
                        path: nest_path,
                        text: frame.last_text.chars().collect(),
                        line,
                        column,
                    });
                }
                return Advance::Match(index);
            }
        }
    }
}

fn rules_at<'a>(program: &'a Program, path: &[usize]) -> &'a [RuleTable] {
    let mut rules: &[RuleTable] = &program.rules;
    for &i in path {
        rules = &rules[i].nest;
    }
    rules
}
