use thiserror::Error;

use crate::progression::ProgressionManager;
use crate::state::{StateOutcome, StateUnion};
use crate::terms::{LogicManager, TermId, VariableId};
use crate::Result;

/// Errors that can occur while parsing logic text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LogicParseError {
    #[error("empty logic expression")]
    Empty,

    #[error("unexpected end of logic at position {position}")]
    UnexpectedEnd { position: usize },

    #[error("unexpected '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("invalid number '{token}' at position {position}")]
    InvalidNumber { token: String, position: usize },

    #[error("unterminated variable starting at position {position}")]
    UnterminatedVariable { position: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Name(String),
    Variable(String),
    Number(String),
    And,
    Or,
    Greater,
    Open,
    Close,
}

impl Token {
    fn text(&self) -> String {
        match self {
            Token::Name(s) | Token::Variable(s) | Token::Number(s) => s.clone(),
            Token::And => "+".to_string(),
            Token::Or => "|".to_string(),
            Token::Greater => ">".to_string(),
            Token::Open => "(".to_string(),
            Token::Close => ")".to_string(),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '\'' | '-' | '.')
}

fn tokenize(src: &str) -> std::result::Result<Vec<(Token, usize)>, LogicParseError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '+' => {
                tokens.push((Token::And, pos));
                i += 1;
            }
            '|' => {
                tokens.push((Token::Or, pos));
                i += 1;
            }
            '>' => {
                tokens.push((Token::Greater, pos));
                i += 1;
            }
            '(' => {
                tokens.push((Token::Open, pos));
                i += 1;
            }
            ')' => {
                tokens.push((Token::Close, pos));
                i += 1;
            }
            '$' => {
                // A variable runs to the end of its name, including a
                // bracketed parameter list which may contain spaces.
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                    i += 1;
                }
                if i < chars.len() && chars[i].1 == '[' {
                    while i < chars.len() && chars[i].1 != ']' {
                        i += 1;
                    }
                    if i == chars.len() {
                        return Err(LogicParseError::UnterminatedVariable { position: pos });
                    }
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|(_, c)| *c).collect();
                tokens.push((Token::Variable(text), pos));
            }
            c if is_name_char(c) => {
                let start = i;
                while i < chars.len() && is_name_char(chars[i].1) {
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|(_, c)| *c).collect();
                if text.chars().all(|c| c.is_ascii_digit()) {
                    tokens.push((Token::Number(text), pos));
                } else {
                    tokens.push((Token::Name(text), pos));
                }
            }
            other => {
                return Err(LogicParseError::UnexpectedToken {
                    token: other.to_string(),
                    position: pos,
                });
            }
        }
    }

    Ok(tokens)
}

/// Unresolved syntax tree of a logic expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Const(bool),
    Term { name: String, above: i32 },
    Variable(String),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> std::result::Result<(Token, usize), LogicParseError> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(LogicParseError::UnexpectedEnd { position: self.end })?;
        self.pos += 1;
        Ok(tok)
    }

    fn parse_or(&mut self) -> std::result::Result<Expr, LogicParseError> {
        let mut branches = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            branches.push(self.parse_and()?);
        }
        Ok(flatten(branches, false))
    }

    fn parse_and(&mut self) -> std::result::Result<Expr, LogicParseError> {
        let mut parts = vec![self.parse_atom()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            parts.push(self.parse_atom()?);
        }
        Ok(flatten(parts, true))
    }

    fn parse_atom(&mut self) -> std::result::Result<Expr, LogicParseError> {
        let (tok, position) = self.next()?;
        match tok {
            Token::Open => {
                let inner = self.parse_or()?;
                match self.next()? {
                    (Token::Close, _) => Ok(inner),
                    (other, position) => Err(LogicParseError::UnexpectedToken {
                        token: other.text(),
                        position,
                    }),
                }
            }
            Token::Variable(text) => Ok(Expr::Variable(text)),
            Token::Name(name) if name == "TRUE" => Ok(Expr::Const(true)),
            Token::Name(name) if name == "FALSE" => Ok(Expr::Const(false)),
            Token::Name(name) => {
                if self.peek() == Some(&Token::Greater) {
                    self.pos += 1;
                    let (num, num_pos) = self.next()?;
                    let text = num.text();
                    let above = match num {
                        Token::Number(_) => text.parse::<i32>().map_err(|_| {
                            LogicParseError::InvalidNumber {
                                token: text.clone(),
                                position: num_pos,
                            }
                        })?,
                        _ => {
                            return Err(LogicParseError::InvalidNumber {
                                token: text,
                                position: num_pos,
                            })
                        }
                    };
                    Ok(Expr::Term { name, above })
                } else {
                    Ok(Expr::Term { name, above: 0 })
                }
            }
            other => Err(LogicParseError::UnexpectedToken {
                token: other.text(),
                position,
            }),
        }
    }
}

fn flatten(mut parts: Vec<Expr>, conjunction: bool) -> Expr {
    if parts.len() == 1 {
        return parts.remove(0);
    }
    let mut out = Vec::with_capacity(parts.len());
    for part in parts {
        match (part, conjunction) {
            (Expr::And(inner), true) | (Expr::Or(inner), false) => out.extend(inner),
            (other, _) => out.push(other),
        }
    }
    if conjunction {
        Expr::And(out)
    } else {
        Expr::Or(out)
    }
}

/// Parses logic text.
///
/// Grammar (`+` binds tighter than `|`):
///
/// - `expr := and ('|' and)*`
/// - `and  := atom ('+' atom)*`
/// - `atom := '(' expr ')' | TRUE | FALSE | NAME | NAME '>' INT | $VAR[params]`
///
/// A bare `NAME` means the term's value is above zero.
pub fn parse(src: &str) -> std::result::Result<Expr, LogicParseError> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(LogicParseError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: src.len(),
    };
    let expr = parser.parse_or()?;
    if let Some((tok, position)) = parser.tokens.get(parser.pos) {
        return Err(LogicParseError::UnexpectedToken {
            token: tok.text(),
            position: *position,
        });
    }
    Ok(expr)
}

/// A logic expression with every term and variable bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requirement {
    Always,
    Never,
    Term { term: TermId, above: i32 },
    Variable(VariableId),
    All(Vec<Requirement>),
    Any(Vec<Requirement>),
}

pub fn resolve(expr: &Expr, lm: &mut LogicManager) -> Result<Requirement> {
    Ok(match expr {
        Expr::Const(true) => Requirement::Always,
        Expr::Const(false) => Requirement::Never,
        Expr::Term { name, above } => Requirement::Term {
            term: lm.term_strict(name)?,
            above: *above,
        },
        Expr::Variable(text) => Requirement::Variable(lm.resolve_variable(text)?),
        Expr::And(parts) => Requirement::All(
            parts
                .iter()
                .map(|p| resolve(p, lm))
                .collect::<Result<Vec<_>>>()?,
        ),
        Expr::Or(parts) => Requirement::Any(
            parts
                .iter()
                .map(|p| resolve(p, lm))
                .collect::<Result<Vec<_>>>()?,
        ),
    })
}

impl Requirement {
    /// Threads the live paths through the requirement, returning the paths
    /// that satisfy it (with any state changes applied), or `None` if no
    /// path does.
    pub fn evaluate(
        &self,
        lm: &LogicManager,
        pm: &ProgressionManager,
        input: &StateUnion,
    ) -> Option<StateUnion> {
        match self {
            Requirement::Always => Some(input.clone()),
            Requirement::Never => None,
            Requirement::Term { term, above } => (pm.get(*term) > *above).then(|| input.clone()),
            Requirement::Variable(id) => {
                let variable = lm.variable(*id);
                StateUnion::collect(input.iter().filter_map(|state| {
                    match variable.apply(pm, state) {
                        StateOutcome::Infeasible => None,
                        StateOutcome::Unchanged => Some(state.clone()),
                        StateOutcome::Changed(next) => Some(next),
                    }
                }))
            }
            Requirement::All(parts) => {
                let mut current = input.clone();
                for part in parts {
                    current = part.evaluate(lm, pm, &current)?;
                }
                Some(current)
            }
            Requirement::Any(branches) => {
                let mut out: Option<StateUnion> = None;
                for branch in branches {
                    if let Some(result) = branch.evaluate(lm, pm, input) {
                        match out.as_mut() {
                            Some(acc) => acc.merge(result),
                            None => out = Some(result),
                        }
                    }
                }
                out
            }
        }
    }

    pub fn is_satisfied(&self, lm: &LogicManager, pm: &ProgressionManager, input: &StateUnion) -> bool {
        self.evaluate(lm, pm, input).is_some()
    }

    /// Pure check that asks each variable for its value against `local`
    /// without threading state changes through the expression.
    pub fn check(&self, lm: &LogicManager, pm: &ProgressionManager, local: Option<&StateUnion>) -> bool {
        match self {
            Requirement::Always => true,
            Requirement::Never => false,
            Requirement::Term { term, above } => pm.get(*term) > *above,
            Requirement::Variable(id) => lm.variable(*id).get_value(pm, local),
            Requirement::All(parts) => parts.iter().all(|p| p.check(lm, pm, local)),
            Requirement::Any(parts) => parts.iter().any(|p| p.check(lm, pm, local)),
        }
    }

    /// Every term the requirement reads, including those read by variables.
    pub fn collect_terms(&self, lm: &LogicManager, out: &mut Vec<TermId>) {
        match self {
            Requirement::Always | Requirement::Never => {}
            Requirement::Term { term, .. } => out.push(*term),
            Requirement::Variable(id) => out.extend(lm.variable(*id).terms()),
            Requirement::All(parts) | Requirement::Any(parts) => {
                for part in parts {
                    part.collect_terms(lm, out);
                }
            }
        }
    }
}
