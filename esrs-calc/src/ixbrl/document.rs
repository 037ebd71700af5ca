//! Fact collection and context/unit resolution
//!
//! Export runs in fixed phases:
//! 1. [`FactSet`] collects every fact to be emitted.
//! 2. [`FactSet::resolve`] derives the distinct contexts and units those facts
//!    need and assigns ids in first-use order.
//! 3. [`ResolvedDocument`] renders declarations first, then the facts.
//!
//! A [`ResolvedFact`] can only be produced by `resolve`, and only carries ids
//! taken from the declaration tables built in the same pass.

use std::collections::BTreeMap;

use super::model::{ContextKey, Fact, UnitKey};
use super::ExportError;

/// Section heading plus the facts shown under it
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub facts: Vec<Fact>,
}

/// Phase 1: facts grouped into display sections
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FactSet {
    sections: Vec<Section>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(&mut self, title: impl Into<String>, facts: Vec<Fact>) {
        if !facts.is_empty() {
            self.sections.push(Section {
                title: title.into(),
                facts,
            });
        }
    }

    /// Every fact in display order
    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.sections.iter().flat_map(|s| s.facts.iter())
    }

    pub fn fact_count(&self) -> usize {
        self.facts().count()
    }

    /// Phase 2: derive the minimal context and unit sets
    pub fn resolve(self) -> Result<ResolvedDocument, ExportError> {
        let mut context_ids: BTreeMap<ContextKey, String> = BTreeMap::new();
        let mut contexts: Vec<(String, ContextKey)> = Vec::new();
        let mut unit_ids: BTreeMap<UnitKey, String> = BTreeMap::new();
        let mut units: Vec<(String, UnitKey)> = Vec::new();
        let mut sections = Vec::with_capacity(self.sections.len());

        for section in self.sections {
            let mut facts = Vec::with_capacity(section.facts.len());
            for fact in section.facts {
                if fact.concept.trim().is_empty() {
                    return Err(ExportError::InvalidInput(format!(
                        "fact '{}' has no concept",
                        fact.label
                    )));
                }

                let context_id = match context_ids.get(&fact.context) {
                    Some(id) => id.clone(),
                    None => {
                        let id = format!("c-{}", contexts.len() + 1);
                        context_ids.insert(fact.context.clone(), id.clone());
                        contexts.push((id.clone(), fact.context.clone()));
                        id
                    }
                };

                let unit_id = match fact.unit() {
                    None => None,
                    Some(unit) => Some(match unit_ids.get(unit) {
                        Some(id) => id.clone(),
                        None => {
                            let id = unit.id();
                            if units.iter().any(|(existing, _)| *existing == id) {
                                return Err(ExportError::Structure(format!(
                                    "unit id collision: {}",
                                    id
                                )));
                            }
                            unit_ids.insert(unit.clone(), id.clone());
                            units.push((id.clone(), unit.clone()));
                            id
                        }
                    }),
                };

                facts.push(ResolvedFact {
                    fact,
                    context_id,
                    unit_id,
                });
            }
            sections.push(ResolvedSection {
                title: section.title,
                facts,
            });
        }

        Ok(ResolvedDocument {
            contexts,
            units,
            sections,
        })
    }
}

/// A fact bound to declared context and unit ids
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFact {
    pub fact: Fact,
    pub context_id: String,
    pub unit_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSection {
    pub title: String,
    pub facts: Vec<ResolvedFact>,
}

/// Phase 3 input: declarations plus bound facts
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDocument {
    pub contexts: Vec<(String, ContextKey)>,
    pub units: Vec<(String, UnitKey)>,
    pub sections: Vec<ResolvedSection>,
}
