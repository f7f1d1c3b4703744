use std::collections::HashMap;

use crate::logic::{self, Requirement};
use crate::state::{StateBoolId, StateIntId, StateSchema, StateUnion};
use crate::variables::StateVariable;
use crate::{RandoError, Result};

pub const CAN_BENCH: &str = "Can_Bench";
pub const NOTCHES: &str = "NOTCHES";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TermId(usize);

impl TermId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct VariableId(usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Term {
    pub id: TermId,
    pub name: String,
}

/// Registry of terms, the state schema, and every state variable the logic
/// refers to. Variables are resolved once, when logic text is parsed.
#[derive(Debug)]
pub struct LogicManager {
    terms: Vec<Term>,
    term_lookup: HashMap<String, TermId>,
    state: StateSchema,
    variables: Vec<StateVariable>,
    variable_lookup: HashMap<String, VariableId>,
}

impl LogicManager {
    pub fn new<I, S>(term_names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lm = Self {
            terms: Vec::new(),
            term_lookup: HashMap::new(),
            state: StateSchema::standard(),
            variables: Vec::new(),
            variable_lookup: HashMap::new(),
        };
        for name in term_names {
            lm.add_term(name.as_ref())?;
        }
        Ok(lm)
    }

    fn add_term(&mut self, name: &str) -> Result<TermId> {
        if name.is_empty() || name.starts_with('$') {
            return Err(RandoError::Config(format!("invalid term name '{}'", name)));
        }
        if self.term_lookup.contains_key(name) {
            return Err(RandoError::Config(format!("duplicate term '{}'", name)));
        }
        let id = TermId(self.terms.len());
        self.terms.push(Term {
            id,
            name: name.to_string(),
        });
        self.term_lookup.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn term(&self, name: &str) -> Option<TermId> {
        self.term_lookup.get(name).copied()
    }

    pub fn term_strict(&self, name: &str) -> Result<TermId> {
        self.term(name)
            .ok_or_else(|| RandoError::Config(format!("unknown term '{}'", name)))
    }

    pub fn term_name(&self, id: TermId) -> &str {
        &self.terms[id.0].name
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn state_schema(&self) -> &StateSchema {
        &self.state
    }

    pub fn bool_strict(&self, name: &str) -> Result<StateBoolId> {
        self.state.get_bool_strict(name)
    }

    pub fn int_strict(&self, name: &str) -> Result<StateIntId> {
        self.state.get_int_strict(name)
    }

    /// Resolves `$PREFIX[params]` text to a variable, constructing it on
    /// first use. Unknown prefixes and unresolved terms fail here rather
    /// than during evaluation.
    pub fn resolve_variable(&mut self, text: &str) -> Result<VariableId> {
        if let Some(&id) = self.variable_lookup.get(text) {
            return Ok(id);
        }
        let variable = StateVariable::resolve(self, text)?;
        let id = VariableId(self.variables.len());
        self.variables.push(variable);
        self.variable_lookup.insert(text.to_string(), id);
        Ok(id)
    }

    pub fn variable(&self, id: VariableId) -> &StateVariable {
        &self.variables[id.0]
    }

    pub fn parse_logic(&mut self, text: &str) -> Result<Requirement> {
        let expr = logic::parse(text)?;
        logic::resolve(&expr, self)
    }

    pub fn start_union(&self) -> StateUnion {
        StateUnion::single(self.state.default_state())
    }
}
