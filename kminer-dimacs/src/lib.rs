//! DIMACS CNF feature models with variable name mappings.
//!
//! Feature models extracted from Kconfig are stored as DIMACS CNF files. The names of the
//! configuration symbols are given by comment lines of the form `c <number> <name>` before the
//! problem line and the clauses.

use std::io::{self, BufRead};
use std::{borrow::Borrow, mem::replace};

use varisat_formula::{CnfFormula, ExtendFormula, Lit, Var};

use anyhow::Error;
use thiserror::Error;

pub mod mapping;
pub mod model;

pub use mapping::{VariableMap, VariableNotFound};
pub use model::FeatureModel;

/// Possible errors while parsing a DIMACS CNF feature model.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("line {}: Unexpected character '{}'", line, unexpected)]
    UnexpectedInput { line: usize, unexpected: char },
    #[error(
        "line {}: Variable number {}{}... exceeds the supported range",
        line,
        index,
        final_digit
    )]
    LiteralTooLarge {
        line: usize,
        index: usize,
        final_digit: usize,
    },
    #[error("line {}: Malformed problem line '{}'", line, header)]
    InvalidHeader { line: usize, header: String },
    #[error("line {}: Variable number 0 cannot be named '{}'", line, name)]
    InvalidNameMapping { line: usize, name: String },
    #[error("line {}: Clause is missing its terminating 0", line)]
    UnterminatedClause { line: usize },
    #[error(
        "Clauses use {} variables but the problem line declares {}",
        var_count,
        header_var_count
    )]
    VarCount {
        var_count: usize,
        header_var_count: usize,
    },
    #[error(
        "Found {} clauses but the problem line declares {}",
        clause_count,
        header_clause_count
    )]
    ClauseCount {
        clause_count: usize,
        header_clause_count: usize,
    },
    #[error("Parser used again after an error")]
    PreviousError,
}

/// Counts declared by the `p cnf <variables> <clauses>` problem line.
#[derive(Copy, Clone, Debug)]
pub struct DimacsHeader {
    pub var_count: usize,
    pub clause_count: usize,
}

/// What the parser is currently reading.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum LineKind {
    /// Nothing but line breaks since the last line ended.
    Start,
    /// Literals of one or more clauses.
    Clauses,
    /// A comment; `names` is set while name comments are still accepted.
    Comment { names: bool },
    /// The problem line.
    Problem,
}

/// Parser for DIMACS CNF feature models.
///
/// Input can be fed in chunks of arbitrary size, and the parsed clauses can be taken out while
/// parsing continues.
///
/// Comment lines `c <number> <name>` name the variable `<number>` as long as neither the problem
/// line nor a clause has been read. The configured prefix is prepended to each name. All other
/// comments are ignored.
pub struct DimacsParser {
    formula: CnfFormula,
    variables: VariableMap,
    name_prefix: String,
    header: Option<DimacsHeader>,

    clause: Vec<Lit>,
    number: usize,
    negative: bool,
    in_number: bool,
    clauses_read: usize,

    kind: LineKind,
    names_open: bool,
    text: Vec<u8>,
    line: usize,
    failed: bool,
}

impl Default for DimacsParser {
    fn default() -> DimacsParser {
        DimacsParser::new()
    }
}

impl DimacsParser {
    /// A parser that takes variable names as they are.
    pub fn new() -> DimacsParser {
        DimacsParser::with_name_prefix("")
    }

    /// A parser prepending `prefix` to every variable name.
    pub fn with_name_prefix(prefix: impl Into<String>) -> DimacsParser {
        DimacsParser {
            formula: CnfFormula::new(),
            variables: VariableMap::new(),
            name_prefix: prefix.into(),
            header: None,

            clause: vec![],
            number: 0,
            negative: false,
            in_number: false,
            clauses_read: 0,

            kind: LineKind::Start,
            names_open: true,
            text: vec![],
            line: 1,
            failed: false,
        }
    }

    /// Parses the complete input into a single formula, checking the problem line if present.
    ///
    /// Variable names are dropped, use [`FeatureModel::parse`] to keep them.
    pub fn parse(input: impl io::Read) -> Result<CnfFormula, Error> {
        Ok(Self::parse_incremental(input, |_| Ok(()))?.take_formula())
    }

    /// Parses the complete input, checking the problem line if present.
    ///
    /// `callback` runs after every chunk and can consume the clauses parsed so far with
    /// [`take_formula`](DimacsParser::take_formula).
    pub fn parse_incremental(
        input: impl io::Read,
        callback: impl FnMut(&mut DimacsParser) -> Result<(), Error>,
    ) -> Result<DimacsParser, Error> {
        Self::new().parse_input(input, callback)
    }

    /// Like [`parse_incremental`](DimacsParser::parse_incremental), keeping the name prefix of
    /// this parser.
    pub fn parse_input(
        mut self,
        input: impl io::Read,
        mut callback: impl FnMut(&mut DimacsParser) -> Result<(), Error>,
    ) -> Result<DimacsParser, Error> {
        let mut reader = io::BufReader::new(input);

        loop {
            let chunk = reader.fill_buf()?;
            let len = chunk.len();
            if len == 0 {
                break;
            }
            self.parse_chunk(chunk)?;
            reader.consume(len);

            callback(&mut self)?;
        }

        self.eof()?;
        callback(&mut self)?;
        self.check_header()?;

        Ok(self)
    }

    /// Parses the next chunk of input.
    ///
    /// Call [`eof`](DimacsParser::eof) after the last chunk. Once an error was returned, all
    /// further calls fail with [`ParserError::PreviousError`].
    pub fn parse_chunk(&mut self, chunk: &[u8]) -> Result<(), ParserError> {
        if self.failed {
            return Err(ParserError::PreviousError);
        }

        for &byte in chunk {
            if byte == b'\n' {
                self.line += 1;
            }

            match self.kind {
                LineKind::Comment { .. } | LineKind::Problem => {
                    if byte == b'\n' || byte == b'\r' {
                        self.end_text_line()?;
                    } else if self.kind != (LineKind::Comment { names: false }) {
                        self.text.push(byte);
                    }
                }
                LineKind::Start | LineKind::Clauses => self.clause_byte(byte)?,
            }
        }

        Ok(())
    }

    fn clause_byte(&mut self, byte: u8) -> Result<(), ParserError> {
        let line_start = self.kind == LineKind::Start;

        match byte {
            b'0'..=b'9' => {
                self.in_number = true;
                self.names_open = false;
                self.kind = LineKind::Clauses;
                self.push_digit((byte - b'0') as usize)?;
            }
            b'-' if !self.negative && !self.in_number => {
                self.negative = true;
                self.names_open = false;
                self.kind = LineKind::Clauses;
            }
            b' ' | b'\n' | b'\r' if !self.negative || self.in_number => {
                self.finish_literal();
                self.kind = if byte == b' ' {
                    LineKind::Clauses
                } else {
                    LineKind::Start
                };
            }
            b'c' if line_start => {
                self.kind = LineKind::Comment {
                    names: self.names_open,
                };
            }
            b'p' if line_start && self.header.is_none() => {
                self.kind = LineKind::Problem;
                self.names_open = false;
                self.text.push(b'p');
            }
            _ => {
                return Err(self.fail(ParserError::UnexpectedInput {
                    line: self.line,
                    unexpected: byte as char,
                }))
            }
        }

        Ok(())
    }

    fn push_digit(&mut self, digit: usize) -> Result<(), ParserError> {
        let number = self
            .number
            .checked_mul(10)
            .and_then(|number| number.checked_add(digit))
            .filter(|&number| number <= Var::max_count());

        match number {
            Some(number) => {
                self.number = number;
                Ok(())
            }
            None => Err(self.fail(ParserError::LiteralTooLarge {
                line: self.line,
                index: self.number,
                final_digit: digit,
            })),
        }
    }

    fn fail(&mut self, err: ParserError) -> ParserError {
        self.failed = true;
        err
    }

    /// Finishes parsing after the last chunk.
    ///
    /// The problem line counts are not checked here, see
    /// [`check_header`](DimacsParser::check_header).
    pub fn eof(&mut self) -> Result<(), ParserError> {
        match self.kind {
            LineKind::Comment { .. } | LineKind::Problem => self.end_text_line()?,
            LineKind::Start | LineKind::Clauses => self.finish_literal(),
        }

        if !self.clause.is_empty() {
            return Err(ParserError::UnterminatedClause { line: self.line });
        }

        self.variables.reserve(self.formula.var_count());

        Ok(())
    }

    /// Checks the parsed formula against the counts of the problem line, if there was one.
    pub fn check_header(&self) -> Result<(), ParserError> {
        let header = match self.header {
            Some(header) => header,
            None => return Ok(()),
        };

        if self.formula.var_count() != header.var_count {
            return Err(ParserError::VarCount {
                var_count: self.formula.var_count(),
                header_var_count: header.var_count,
            });
        }

        if self.clauses_read != header.clause_count {
            return Err(ParserError::ClauseCount {
                clause_count: self.clauses_read,
                header_clause_count: header.clause_count,
            });
        }

        Ok(())
    }

    /// Takes the clauses parsed since the last call.
    ///
    /// The returned formula has the variable count seen so far, including the problem line.
    pub fn take_formula(&mut self) -> CnfFormula {
        let mut rest = CnfFormula::new();
        rest.set_var_count(self.formula.var_count());
        replace(&mut self.formula, rest)
    }

    /// Takes the variable names collected so far.
    pub fn take_variables(&mut self) -> VariableMap {
        replace(&mut self.variables, VariableMap::new())
    }

    pub fn variables(&self) -> &VariableMap {
        &self.variables
    }

    pub fn header(&self) -> Option<DimacsHeader> {
        self.header
    }

    /// Number of clauses read so far.
    pub fn clause_count(&self) -> usize {
        self.clauses_read
    }

    /// Number of variables used so far.
    pub fn var_count(&self) -> usize {
        self.formula.var_count()
    }

    fn finish_literal(&mut self) {
        if self.in_number {
            if self.number == 0 {
                self.formula.add_clause(&self.clause);
                self.clause.clear();
                self.clauses_read += 1;
            } else {
                let var = Var::from_dimacs(self.number as isize);
                self.clause.push(var.lit(!self.negative));
            }
        }
        self.number = 0;
        self.negative = false;
        self.in_number = false;
    }

    fn end_text_line(&mut self) -> Result<(), ParserError> {
        let result = match self.kind {
            LineKind::Problem => self.parse_problem_line(),
            LineKind::Comment { names: true } => self.parse_name_comment(),
            _ => Ok(()),
        };
        self.kind = LineKind::Start;
        self.text.clear();
        result
    }

    /// Parses the text following the `c` of a `c <number> <name>` line.
    ///
    /// Comments of any other form are ignored.
    fn parse_name_comment(&mut self) -> Result<(), ParserError> {
        let text = String::from_utf8_lossy(&self.text).into_owned();

        let mut parts = match text.strip_prefix(' ') {
            Some(rest) => rest.splitn(2, ' '),
            None => return Ok(()),
        };
        let (number, name) = match (parts.next(), parts.next().map(str::trim_end)) {
            (Some(number), Some(name)) if !name.is_empty() => (number, name),
            _ => return Ok(()),
        };
        if number.is_empty() || !number.bytes().all(|byte| byte.is_ascii_digit()) {
            return Ok(());
        }

        let name = format!("{}{}", self.name_prefix, name);

        let number = match number.parse::<usize>() {
            Ok(number) if number <= Var::max_count() => number,
            _ => {
                let (head, last) = number.split_at(number.len() - 1);
                return Err(self.fail(ParserError::LiteralTooLarge {
                    line: self.line,
                    index: head.parse().unwrap_or(usize::max_value()),
                    final_digit: last.parse().unwrap_or(0),
                }));
            }
        };

        if number == 0 {
            return Err(self.fail(ParserError::InvalidNameMapping {
                line: self.line,
                name,
            }));
        }

        self.variables.insert(name, Var::from_dimacs(number as isize));

        Ok(())
    }

    /// Parses a `p cnf <variables> <clauses>` line.
    fn parse_problem_line(&mut self) -> Result<(), ParserError> {
        let text = String::from_utf8_lossy(&self.text).into_owned();

        let counts = if text.starts_with("p ") {
            let mut fields = text[2..].split_whitespace();
            let format = fields.next();
            let var_count = fields.next().and_then(|field| field.parse::<usize>().ok());
            let clause_count = fields.next().and_then(|field| field.parse::<usize>().ok());
            match (format, var_count, clause_count, fields.next()) {
                (Some("cnf"), Some(var_count), Some(clause_count), None) => {
                    Some((var_count, clause_count))
                }
                _ => None,
            }
        } else {
            None
        };

        let (var_count, clause_count) = match counts {
            Some(counts) => counts,
            None => {
                return Err(self.fail(ParserError::InvalidHeader {
                    line: self.line,
                    header: text,
                }))
            }
        };

        if var_count > Var::max_count() {
            return Err(self.fail(ParserError::LiteralTooLarge {
                line: self.line,
                index: var_count / 10,
                final_digit: var_count % 10,
            }));
        }

        self.header = Some(DimacsHeader {
            var_count,
            clause_count,
        });
        self.formula.set_var_count(var_count);

        Ok(())
    }
}

/// Writes the `p cnf` problem line.
pub fn write_dimacs_header(target: &mut impl io::Write, header: DimacsHeader) -> io::Result<()> {
    target.write_all(b"p cnf ")?;
    itoa::write(&mut *target, header.var_count)?;
    target.write_all(b" ")?;
    itoa::write(&mut *target, header.clause_count)?;
    target.write_all(b"\n")
}

/// Writes clauses without a problem line, one clause per line.
pub fn write_dimacs_clauses(
    target: &mut impl io::Write,
    clauses: impl IntoIterator<Item = impl IntoIterator<Item = impl Borrow<Lit>>>,
) -> io::Result<()> {
    for clause in clauses {
        for lit in clause {
            itoa::write(&mut *target, lit.borrow().to_dimacs())?;
            target.write_all(b" ")?;
        }
        target.write_all(b"0\n")?;
    }
    Ok(())
}

/// Writes a formula as DIMACS CNF with a problem line.
pub fn write_dimacs(target: &mut impl io::Write, formula: &CnfFormula) -> io::Result<()> {
    let header = DimacsHeader {
        var_count: formula.var_count(),
        clause_count: formula.len(),
    };
    write_dimacs_header(&mut *target, header)?;
    write_dimacs_clauses(&mut *target, formula.iter())
}

/// Writes a `c <number> <name>` comment line for every named variable.
///
/// `strip_prefix` is removed from every name, so the output can be read back with the same
/// prefix. Names without the prefix, like Tseitin temporaries, would not survive that and are
/// left unnamed. Their variables stay reserved by the problem line.
pub fn write_dimacs_names(
    target: &mut impl io::Write,
    variables: &VariableMap,
    strip_prefix: &str,
) -> io::Result<()> {
    for (name, var) in variables.iter() {
        let name = match name.strip_prefix(strip_prefix) {
            Some(name) => name,
            None => continue,
        };
        target.write_all(b"c ")?;
        itoa::write(&mut *target, var.to_dimacs())?;
        writeln!(target, " {}", name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::Error;

    use varisat_formula::{cnf_formula, var};

    fn parse_err(input: &[u8]) -> ParserError {
        match DimacsParser::parse(input) {
            Ok(parsed) => panic!("expected an error, parsed {:?}", parsed),
            Err(err) => match err.downcast::<ParserError>() {
                Ok(err) => err,
                Err(err) => panic!("unexpected error type {:?}", err),
            },
        }
    }

    #[test]
    fn clauses_across_lines() -> Result<(), Error> {
        let parsed = DimacsParser::parse(&b"p cnf  3 3 \n 1 -2\n 0 3 0\r\nc trailing\n-1 0\n\n"[..])?;
        assert_eq!(parsed, cnf_formula![1, -2; 3; -1;]);
        Ok(())
    }

    #[test]
    fn chunk_boundaries() -> Result<(), Error> {
        let mut parser = DimacsParser::with_name_prefix("CONFIG_");
        let chunks: [&[u8]; 5] = [b"c 1 A", b"B\nc 2", b" C\np cnf 12 2\n1", b"2 -", b"2 0\n-1 0"];
        for chunk in chunks.iter() {
            parser.parse_chunk(chunk)?;
        }
        parser.eof()?;
        parser.check_header()?;

        assert_eq!(parser.variables().var("CONFIG_AB"), Some(var!(1)));
        assert_eq!(parser.variables().var("CONFIG_C"), Some(var!(2)));
        assert_eq!(parser.clause_count(), 2);
        assert_eq!(parser.take_formula(), cnf_formula![12, -2; -1;]);
        Ok(())
    }

    #[test]
    fn name_comments() -> Result<(), Error> {
        let input = b"c 1 A\nc some remark\nc 3 B_MODULE\nc\nc 2 C \np cnf 3 1\nc 4 LATE\n1 -3 0\n";
        let mut parser = DimacsParser::with_name_prefix("CONFIG_").parse_input(
            &input[..],
            |_| Ok(()),
        )?;

        let variables = parser.take_variables();
        assert_eq!(variables.len(), 3);
        assert_eq!(variables.var("CONFIG_A"), Some(var!(1)));
        assert_eq!(variables.var("CONFIG_C"), Some(var!(2)));
        assert_eq!(variables.var("CONFIG_B_MODULE"), Some(var!(3)));
        assert_eq!(variables.var("CONFIG_LATE"), None);
        assert_eq!(variables.max_var_count(), 3);

        assert_eq!(parser.take_formula(), cnf_formula![1, -3;]);

        Ok(())
    }

    #[test]
    fn names_stop_at_first_clause() -> Result<(), Error> {
        let parser =
            DimacsParser::new().parse_input(&b"c 1 A\n1 0\nc 2 B\n2 0\n"[..], |_| Ok(()))?;
        assert_eq!(parser.variables().len(), 1);
        assert_eq!(parser.variables().max_var_count(), 2);
        Ok(())
    }

    #[test]
    fn invalid_name_mapping() {
        match parse_err(b"c 0 ZERO\np cnf 0 0\n") {
            ParserError::InvalidNameMapping { name, .. } => assert_eq!(name, "ZERO"),
            err => panic!("unexpected error {:?}", err),
        }
        match parse_err(format!("c {} HUGE\n", Var::max_count() + 1).as_bytes()) {
            ParserError::LiteralTooLarge { .. } => (),
            err => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn malformed_problem_lines() {
        for line in &["p cnf 1", "p dnf 1 1", "p cnf one 1", "p cnf 1 1 1"] {
            match parse_err(line.as_bytes()) {
                ParserError::InvalidHeader { header, .. } => assert_eq!(&header, line),
                err => panic!("unexpected error {:?}", err),
            }
        }

        match parse_err(format!("p cnf {} 0", Var::max_count() + 1).as_bytes()) {
            ParserError::LiteralTooLarge { .. } => (),
            err => panic!("unexpected error {:?}", err),
        }
        match parse_err(b"p cnf 2 1\n1 2 0\n-3 0\n") {
            ParserError::VarCount {
                var_count: 3,
                header_var_count: 2,
            } => (),
            err => panic!("unexpected error {:?}", err),
        }
        match parse_err(b"p cnf 2 2\n1 2 0\n") {
            ParserError::ClauseCount {
                clause_count: 1,
                header_clause_count: 2,
            } => (),
            err => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn malformed_clauses() {
        match parse_err(b"1 x 0\n") {
            ParserError::UnexpectedInput { unexpected: 'x', .. } => (),
            err => panic!("unexpected error {:?}", err),
        }
        match parse_err(b"1 --2 0\n") {
            ParserError::UnexpectedInput { unexpected: '-', .. } => (),
            err => panic!("unexpected error {:?}", err),
        }
        match parse_err(b"1 0\n c late comment\n") {
            ParserError::UnexpectedInput { unexpected: 'c', line: 2 } => (),
            err => panic!("unexpected error {:?}", err),
        }
        match parse_err(b"1 2\n") {
            ParserError::UnterminatedClause { .. } => (),
            err => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn errors_are_sticky() {
        let mut parser = DimacsParser::new();
        assert!(parser.parse_chunk(b"1 ?").is_err());
        match parser.parse_chunk(b"0\n") {
            Err(ParserError::PreviousError) => (),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn writes_names_and_clauses() -> Result<(), Error> {
        let mut variables = VariableMap::new();
        variables.insert("CONFIG_B", var!(2));
        variables.insert("CONFIG_A", var!(1));
        variables.insert("temp_0", var!(3));

        let mut buf = vec![];
        write_dimacs_names(&mut buf, &variables, "CONFIG_")?;
        write_dimacs(&mut buf, &cnf_formula![1, -3; 2;])?;
        assert_eq!(
            String::from_utf8(buf)?,
            "c 1 A\nc 2 B\np cnf 3 2\n1 -3 0\n2 0\n"
        );

        Ok(())
    }

    #[test]
    fn unprefixed_names_are_not_renamed() -> Result<(), Error> {
        let mut variables = VariableMap::new();
        variables.insert("CONFIG_A", var!(1));
        variables.insert("temp_0", var!(2));
        variables.insert("PSEUDO_X", var!(3));

        let mut buf = vec![];
        write_dimacs_names(&mut buf, &variables, "CONFIG_")?;
        write_dimacs(&mut buf, &cnf_formula![1, -2; 3;])?;

        let mut parser =
            DimacsParser::with_name_prefix("CONFIG_").parse_input(&buf[..], |_| Ok(()))?;
        let names = parser.take_variables();
        assert_eq!(names.var("CONFIG_A"), Some(var!(1)));
        assert_eq!(names.var("CONFIG_temp_0"), None);
        assert_eq!(names.var("CONFIG_PSEUDO_X"), None);
        assert_eq!(names.len(), 1);
        assert_eq!(parser.take_formula().var_count(), 3);

        let mut buf = vec![];
        write_dimacs_names(&mut buf, &variables, "")?;
        assert_eq!(String::from_utf8(buf)?, "c 1 CONFIG_A\nc 2 temp_0\nc 3 PSEUDO_X\n");

        Ok(())
    }
}
