//! Lexing of ninja `build` statements.
//!
//! Only the parts of the ninja syntax that matter for the link/compile graph
//! are understood: line continuations, path escapes and the `build` statement
//! shape. Rules, variables, pools and includes are skipped.

/// A `build` statement split into its sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStatement {
    /// 1-based line number where the statement starts
    pub line: usize,
    pub outputs: Vec<String>,
    pub implicit_outputs: Vec<String>,
    pub rule: String,
    pub inputs: Vec<String>,
    pub implicit_inputs: Vec<String>,
    pub order_only: Vec<String>,
}

/// A logical line of the build file after joining `$`-continuations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// 1-based line number of the first physical line
    pub line: usize,
    pub text: String,
}

/// Join `$`-continued physical lines into logical lines.
///
/// Comment lines are dropped; indentation of the first physical line is kept
/// so callers can tell variable bindings from top-level declarations.
pub fn logical_lines(text: &str) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut current: Option<LogicalLine> = None;

    for (idx, raw) in text.lines().enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);

        let piece = match current {
            Some(_) => raw.trim_start(),
            None => {
                if raw.trim_start().starts_with('#') {
                    continue;
                }
                raw
            }
        };

        let (body, continues) = split_continuation(piece);
        let entry = current.get_or_insert_with(|| LogicalLine {
            line: idx + 1,
            text: String::new(),
        });
        entry.text.push_str(body);

        if !continues {
            if let Some(done) = current.take() {
                out.push(done);
            }
        }
    }

    if let Some(done) = current {
        out.push(done);
    }

    out
}

/// Strip a trailing unescaped `$`; an odd run of trailing `$` means continuation.
fn split_continuation(line: &str) -> (&str, bool) {
    let trailing = line.bytes().rev().take_while(|&b| b == b'$').count();
    if trailing % 2 == 1 {
        (&line[..line.len() - 1], true)
    } else {
        (line, false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Colon,
    Pipe,
    PipePipe,
    PipeAt,
}

fn tokenize(s: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut seen_colon = false;
    let mut chars = s.chars().peekable();

    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '$' => match chars.next() {
                Some(' ') => word.push(' '),
                Some(':') => word.push(':'),
                Some('$') => word.push('$'),
                // Variable references are kept verbatim.
                Some(other) => {
                    word.push('$');
                    word.push(other);
                }
                None => word.push('$'),
            },
            ' ' | '\t' => flush(&mut word, &mut tokens),
            ':' if !seen_colon => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Colon);
                seen_colon = true;
            }
            '|' => {
                flush(&mut word, &mut tokens);
                match chars.peek() {
                    Some('|') => {
                        chars.next();
                        tokens.push(Token::PipePipe);
                    }
                    Some('@') => {
                        chars.next();
                        tokens.push(Token::PipeAt);
                    }
                    _ => tokens.push(Token::Pipe),
                }
            }
            other => word.push(other),
        }
    }
    flush(&mut word, &mut tokens);

    tokens
}

/// Why a `build` line could not be read as a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementError {
    MissingColon,
    MissingOutputs,
    MissingRule,
}

impl std::fmt::Display for StatementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatementError::MissingColon => write!(f, "missing `:` after outputs"),
            StatementError::MissingOutputs => write!(f, "no outputs before `:`"),
            StatementError::MissingRule => write!(f, "no rule name after `:`"),
        }
    }
}

/// Parse the text following the `build` keyword.
pub fn parse_build_statement(line: usize, rest: &str) -> Result<BuildStatement, StatementError> {
    let tokens = tokenize(rest);
    let colon = tokens
        .iter()
        .position(|t| *t == Token::Colon)
        .ok_or(StatementError::MissingColon)?;

    let mut stmt = BuildStatement {
        line,
        ..Default::default()
    };

    let mut implicit = false;
    for token in &tokens[..colon] {
        match token {
            Token::Word(w) if implicit => stmt.implicit_outputs.push(w.clone()),
            Token::Word(w) => stmt.outputs.push(w.clone()),
            Token::Pipe => implicit = true,
            _ => {}
        }
    }
    if stmt.outputs.is_empty() {
        return Err(StatementError::MissingOutputs);
    }

    let mut rest = tokens[colon + 1..].iter();
    stmt.rule = match rest.next() {
        Some(Token::Word(rule)) => rule.clone(),
        _ => return Err(StatementError::MissingRule),
    };

    enum Section {
        Explicit,
        Implicit,
        OrderOnly,
        Validation,
    }
    let mut section = Section::Explicit;
    for token in rest {
        match token {
            Token::Word(w) => match section {
                Section::Explicit => stmt.inputs.push(w.clone()),
                Section::Implicit => stmt.implicit_inputs.push(w.clone()),
                Section::OrderOnly => stmt.order_only.push(w.clone()),
                Section::Validation => {}
            },
            Token::Pipe => section = Section::Implicit,
            Token::PipePipe => section = Section::OrderOnly,
            Token::PipeAt => section = Section::Validation,
            Token::Colon => {}
        }
    }

    Ok(stmt)
}
