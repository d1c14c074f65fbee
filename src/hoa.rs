//! Reading and writing automata in the HOA v1 format.
//!
//! Only the fragment produced by [`Automaton::to_hoa`] is understood on input:
//! a single start state, state-based acceptance with `Acceptance: 1 Inf(0)` (or
//! `0 t`, meaning every state accepts), and explicit transition labels made of
//! `t`, `f`, AP indices, `!`, `&`, `|` and parentheses. The automaton may be
//! nondeterministic. A number ends in `0^ω`, so a finite word is accepted when
//! all-zero letters after it reach a cycle through an accepting state, see
//! [`Automaton::from_buchi`].

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::rc::Rc;

use log::debug;

use crate::alphabet::Alphabet;
use crate::automaton::Automaton;
use crate::bdd::Bdd;
use crate::error::{Error, Result};
use crate::reference::Ref;
use crate::types::Prop;

fn base_name(name: &str) -> &str {
    match name.find('#') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

impl Automaton {
    /// HOA text with one AP per proposition of the automaton, in proposition order.
    pub fn to_hoa(&self) -> String {
        let aps: Vec<(Prop, String)> = self
            .props()
            .iter()
            .map(|&p| (p, base_name(&self.alphabet().name(p)).to_string()))
            .collect();
        self.to_hoa_with_aps(&aps)
    }

    /// HOA text with the given AP list. Conditions must only mention these propositions.
    pub fn to_hoa_with_aps(&self, aps: &[(Prop, String)]) -> String {
        let bdd = self.alphabet().bdd();
        let index: HashMap<u32, usize> = aps.iter().enumerate().map(|(i, (p, _))| (p.id(), i)).collect();

        let mut out = String::new();
        // Writing into a String cannot fail.
        self.write_hoa(&mut out, bdd, aps, &index).unwrap();
        out
    }

    fn write_hoa(
        &self,
        out: &mut String,
        bdd: &Bdd,
        aps: &[(Prop, String)],
        index: &HashMap<u32, usize>,
    ) -> std::fmt::Result {
        writeln!(out, "HOA: v1")?;
        writeln!(out, "States: {}", self.num_states())?;
        writeln!(out, "Start: {}", self.initial())?;
        write!(out, "AP: {}", aps.len())?;
        for (_, name) in aps {
            write!(out, " {}", quote(name))?;
        }
        writeln!(out)?;
        writeln!(out, "acc-name: Buchi")?;
        writeln!(out, "Acceptance: 1 Inf(0)")?;
        writeln!(out, "properties: trans-labels explicit-labels state-acc deterministic")?;
        writeln!(out, "--BODY--")?;
        for s in self.states() {
            if self.is_accepting(s) {
                writeln!(out, "State: {} {{0}}", s)?;
            } else {
                writeln!(out, "State: {}", s)?;
            }
            for &(t, cond) in self.edges(s) {
                let label = bdd.to_dnf_string(
                    cond,
                    |v, positive| {
                        let i = index.get(&v).map_or_else(|| format!("?{}", v), |i| i.to_string());
                        if positive {
                            i
                        } else {
                            format!("!{}", i)
                        }
                    },
                    "&",
                    " | ",
                );
                writeln!(out, "[{}] {}", label, t)?;
            }
        }
        writeln!(out, "--END--")
    }

    pub fn save_hoa(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_hoa())?;
        Ok(())
    }

    /// Parse HOA text. Each AP gets a fresh proposition, returned in AP order.
    pub fn from_hoa(alphabet: &Rc<Alphabet>, text: &str) -> Result<(Automaton, Vec<Prop>)> {
        let mut parser = HoaParser {
            alphabet,
            num_states: None,
            start: None,
            aps: None,
            all_accepting: false,
        };
        parser.parse(text)
    }

    pub fn load_hoa(alphabet: &Rc<Alphabet>, path: impl AsRef<Path>) -> Result<(Automaton, Vec<Prop>)> {
        let text = std::fs::read_to_string(path)?;
        Automaton::from_hoa(alphabet, &text)
    }
}

struct HoaParser<'a> {
    alphabet: &'a Rc<Alphabet>,
    num_states: Option<usize>,
    start: Option<usize>,
    aps: Option<Vec<Prop>>,
    all_accepting: bool,
}

impl HoaParser<'_> {
    fn parse(&mut self, text: &str) -> Result<(Automaton, Vec<Prop>)> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

        let mut seen_version = false;
        let mut body_line = 0;
        for (no, line) in lines.by_ref() {
            if line.is_empty() {
                continue;
            }
            if line == "--BODY--" {
                body_line = no;
                break;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| Error::format(no, "expected `name: value` header item"))?;
            let value = value.trim();
            match key.trim() {
                "HOA" => {
                    if value != "v1" {
                        return Err(Error::format(no, format!("unsupported version `{}`", value)));
                    }
                    seen_version = true;
                }
                "States" => self.num_states = Some(parse_number(no, value)?),
                "Start" => {
                    if self.start.is_some() || value.contains('&') {
                        return Err(Error::format(no, "only a single start state is supported"));
                    }
                    self.start = Some(parse_number(no, value)?);
                }
                "AP" => self.aps = Some(self.parse_aps(no, value)?),
                "Acceptance" => match value.split_whitespace().collect::<Vec<_>>().as_slice() {
                    ["1", "Inf(0)"] => self.all_accepting = false,
                    ["0", "t"] => self.all_accepting = true,
                    _ => return Err(Error::format(no, format!("unsupported acceptance `{}`", value))),
                },
                _ => debug!("hoa: ignoring header line {}: {}", no, line),
            }
        }
        if !seen_version {
            return Err(Error::format(1, "missing `HOA: v1` header"));
        }
        if body_line == 0 {
            return Err(Error::format(text.lines().count(), "missing `--BODY--`"));
        }

        let num_states = self
            .num_states
            .ok_or_else(|| Error::format(body_line, "missing `States` header"))?;
        let start = self.start.unwrap_or(0);
        if num_states == 0 || start >= num_states {
            return Err(Error::format(body_line, "start state out of range"));
        }
        let aps = self.aps.clone().unwrap_or_default();
        let bdd = self.alphabet.bdd();

        // Our initial state is always 0: swap it with the declared start state.
        let remap = |s: usize| {
            if s == start {
                0
            } else if s == 0 {
                start
            } else {
                s
            }
        };

        let mut aut = Automaton::new(Rc::clone(self.alphabet));
        for _ in 1..num_states {
            aut.add_state();
        }
        aut.add_props(aps.iter().copied());

        let mut current = None;
        let mut ended = false;
        for (no, line) in lines {
            if line.is_empty() {
                continue;
            }
            if line == "--END--" {
                ended = true;
                break;
            }
            if let Some(rest) = line.strip_prefix("State:") {
                let mut parts = rest.split_whitespace();
                let id = parts
                    .next()
                    .ok_or_else(|| Error::format(no, "missing state number"))?;
                let id = parse_number(no, id)?;
                if id >= num_states {
                    return Err(Error::format(no, format!("state {} out of range", id)));
                }
                let accepting = self.all_accepting || rest.contains('{');
                aut.set_accepting(remap(id), accepting);
                current = Some(remap(id));
                continue;
            }
            let from = current.ok_or_else(|| Error::format(no, "edge outside of a state"))?;
            let rest = line
                .strip_prefix('[')
                .ok_or_else(|| Error::format(no, "expected an explicit label `[...]`"))?;
            let (label, target) = rest
                .split_once(']')
                .ok_or_else(|| Error::format(no, "unterminated label"))?;
            let target = target.trim();
            if target.contains('{') {
                return Err(Error::format(no, "transition-based acceptance is not supported"));
            }
            let to = parse_number(no, target)?;
            if to >= num_states {
                return Err(Error::format(no, format!("state {} out of range", to)));
            }
            let cond = LabelParser::new(no, label, bdd, &aps).parse()?;
            aut.add_edge(from, remap(to), cond);
        }
        if !ended {
            return Err(Error::format(text.lines().count(), "missing `--END--`"));
        }

        debug!("hoa: loaded {} states over {} APs", num_states, aps.len());
        Ok((aut.from_buchi()?, aps))
    }

    fn parse_aps(&self, no: usize, value: &str) -> Result<Vec<Prop>> {
        let (count, mut rest) = value
            .split_once(char::is_whitespace)
            .unwrap_or((value, ""));
        let count = parse_number(no, count)?;

        let mut aps = Vec::with_capacity(count);
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            let mut chars = rest.char_indices();
            if !matches!(chars.next(), Some((_, '"'))) {
                return Err(Error::format(no, "AP names must be quoted"));
            }
            let mut name = String::new();
            let mut end = None;
            let mut escaped = false;
            for (i, c) in chars {
                match c {
                    _ if escaped => {
                        name.push(c);
                        escaped = false;
                    }
                    '\\' => escaped = true,
                    '"' => {
                        end = Some(i);
                        break;
                    }
                    _ => name.push(c),
                }
            }
            let end = end.ok_or_else(|| Error::format(no, "unterminated AP name"))?;
            aps.push(self.alphabet.fresh(&name));
            rest = &rest[end + 1..];
        }
        if aps.len() != count {
            return Err(Error::format(
                no,
                format!("AP count {} does not match {} names", count, aps.len()),
            ));
        }
        Ok(aps)
    }
}

fn parse_number(no: usize, s: &str) -> Result<usize> {
    s.trim()
        .parse()
        .map_err(|_| Error::format(no, format!("expected a number, got `{}`", s.trim())))
}

/// Recursive descent over `or := and ('|' and)*`, `and := not ('&' not)*`,
/// `not := '!' not | atom`, `atom := 't' | 'f' | index | '(' or ')'`.
struct LabelParser<'a> {
    line: usize,
    chars: Vec<char>,
    pos: usize,
    bdd: &'a Bdd,
    aps: &'a [Prop],
}

impl<'a> LabelParser<'a> {
    fn new(line: usize, label: &str, bdd: &'a Bdd, aps: &'a [Prop]) -> Self {
        Self {
            line,
            chars: label.chars().filter(|c| !c.is_whitespace()).collect(),
            pos: 0,
            bdd,
            aps,
        }
    }

    fn parse(mut self) -> Result<Ref> {
        let f = self.or()?;
        if self.pos != self.chars.len() {
            return Err(self.error("trailing characters in label"));
        }
        Ok(f)
    }

    fn error(&self, message: &str) -> Error {
        Error::format(self.line, format!("{} (at column {})", message, self.pos + 1))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn or(&mut self) -> Result<Ref> {
        let mut f = self.and()?;
        while self.peek() == Some('|') {
            self.pos += 1;
            let g = self.and()?;
            f = self.bdd.apply_or(f, g);
        }
        Ok(f)
    }

    fn and(&mut self) -> Result<Ref> {
        let mut f = self.not()?;
        while self.peek() == Some('&') {
            self.pos += 1;
            let g = self.not()?;
            f = self.bdd.apply_and(f, g);
        }
        Ok(f)
    }

    fn not(&mut self) -> Result<Ref> {
        if self.peek() == Some('!') {
            self.pos += 1;
            return Ok(-self.not()?);
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Ref> {
        match self.peek() {
            Some('t') => {
                self.pos += 1;
                Ok(self.bdd.one())
            }
            Some('f') => {
                self.pos += 1;
                Ok(self.bdd.zero())
            }
            Some('(') => {
                self.pos += 1;
                let f = self.or()?;
                if self.peek() != Some(')') {
                    return Err(self.error("expected `)`"));
                }
                self.pos += 1;
                Ok(f)
            }
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits: String = self.chars[start..self.pos].iter().collect();
                let i: usize = digits.parse().map_err(|_| self.error("bad AP index"))?;
                let p = self
                    .aps
                    .get(i)
                    .ok_or_else(|| self.error("AP index out of range"))?;
                Ok(self.bdd.mk_var(p.id()))
            }
            _ => Err(self.error("unexpected character")),
        }
    }
}
