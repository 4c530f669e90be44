//! # Subgroup Descriptions
//!
//! A group is a conjunction of predicates stored as a chain: each [`Group`]
//! holds its newest predicate and the id of the seed group it extends. Seeds
//! live in a [`GroupArena`], a flat append-only table, so sibling candidates
//! built from the same seed share the whole prefix without copying it and the
//! arena can be read from many threads at once.
//!
//! A freshly built group is not in the arena yet; it only needs to be inserted
//! if it survives a level and becomes a seed itself.

use crate::attribute::{Attribute, AttributeKind, Cell, DatasetError, Instance, parse_number};
use crate::metric::Metric;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Construction errors. Both variants describe an invalid search configuration
/// and are raised before any evaluation happens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GroupError {
    #[error(
        "Comparator '{metric}' is not allowed on attribute '{attribute}' of kind {kind}; only numeric attributes accept '>=' and '<='."
    )]
    IllegalComparator {
        attribute: String,
        metric: Metric,
        kind: AttributeKind,
    },
    #[error("Column {attribute} already carries a '{metric}' predicate in this chain.")]
    RepeatedPredicate { attribute: usize, metric: Metric },
}

/// One attribute test: `value(attribute) <metric> cutoff`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    attribute: usize,
    metric: Metric,
    value: String,
    number: Option<f64>,
}

impl Predicate {
    pub fn new(
        attribute: &Attribute,
        value: impl Into<String>,
        metric: Metric,
    ) -> Result<Self, GroupError> {
        if !attribute.kind.metrics().contains(&metric) {
            return Err(GroupError::IllegalComparator {
                attribute: attribute.name.clone(),
                metric,
                kind: attribute.kind,
            });
        }
        let value = value.into();
        let number = parse_number(&value);
        Ok(Self {
            attribute: attribute.id,
            metric,
            value,
            number,
        })
    }

    pub fn attribute(&self) -> usize {
        self.attribute
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    fn test(&self, instance: &Instance) -> Result<Coverage, DatasetError> {
        let cell = instance.cell(self.attribute)?;
        if cell.is_unknown() {
            return Ok(Coverage::Unknown);
        }
        let cutoff = Cell {
            raw: &self.value,
            number: self.number,
        };
        Ok(if self.metric.compare_cells(cell, cutoff) {
            Coverage::Covered
        } else {
            Coverage::NotCovered
        })
    }
}

/// How a row relates to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Covered,
    NotCovered,
    /// No known value rejects the row, but some predicate met a missing one.
    Unknown,
}

/// Index of a group stored in a [`GroupArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(usize);

impl GroupId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The newest predicate of a chain plus a link to the rest of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    predicate: Predicate,
    seed: Option<GroupId>,
    len: usize,
}

impl Group {
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn seed(&self) -> Option<GroupId> {
        self.seed
    }

    /// Number of predicates in the chain.
    pub fn len(&self) -> usize {
        self.len
    }

    /// A chain always holds at least one predicate.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of seed links below this predicate; 0 for a root-only group.
    pub fn depth(&self) -> usize {
        self.len - 1
    }
}

/// Whether values take part in duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Chains match only if their (attribute, metric, value) sets match.
    CompareValues,
    /// Chains match on their (attribute, metric) sets; the better score wins.
    IgnoreValues,
}

impl DuplicatePolicy {
    pub fn from_compare_values(compare_values: bool) -> Self {
        if compare_values {
            Self::CompareValues
        } else {
            Self::IgnoreValues
        }
    }

    pub fn compares_values(self) -> bool {
        self == Self::CompareValues
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct SignatureTerm {
    attribute: usize,
    metric: Metric,
    value: Option<String>,
}

/// Order-independent identity of a chain. Two chains with equal signatures
/// describe the same conjunction (under the policy that built them).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(Vec<SignatureTerm>);

impl Signature {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Walks a chain from its newest predicate back to the root.
pub struct Chain<'a> {
    arena: &'a GroupArena,
    next: Option<&'a Group>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Predicate;

    fn next(&mut self) -> Option<Self::Item> {
        let group = self.next?;
        self.next = group.seed.map(|id| self.arena.get(id));
        Some(&group.predicate)
    }
}

/// Append-only storage for seed groups.
#[derive(Debug, Default)]
pub struct GroupArena {
    groups: Vec<Group>,
}

impl GroupArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// A single-predicate group.
    pub fn root(&self, predicate: Predicate) -> Group {
        Group {
            predicate,
            seed: None,
            len: 1,
        }
    }

    /// A group adding `predicate` to the chain ending at `seed`. Fails if the
    /// chain already tests the same attribute with the same metric.
    pub fn extend(&self, seed: Option<GroupId>, predicate: Predicate) -> Result<Group, GroupError> {
        let Some(id) = seed else {
            return Ok(self.root(predicate));
        };
        let parent = self.get(id);
        if self.contains_predicate(parent, predicate.attribute, predicate.metric) {
            return Err(GroupError::RepeatedPredicate {
                attribute: predicate.attribute,
                metric: predicate.metric,
            });
        }
        Ok(Group {
            predicate,
            seed: Some(id),
            len: parent.len + 1,
        })
    }

    /// Stores a group so later levels can extend it.
    pub fn insert(&mut self, group: Group) -> GroupId {
        let id = GroupId(self.groups.len());
        self.groups.push(group);
        id
    }

    /// Panics if `id` did not come from this arena.
    pub fn get(&self, id: GroupId) -> &Group {
        &self.groups[id.0]
    }

    pub fn chain<'a>(&'a self, group: &'a Group) -> Chain<'a> {
        Chain {
            arena: self,
            next: Some(group),
        }
    }

    /// Classifies a row independently of predicate order: any known
    /// predicate that fails rejects the row, otherwise a missing value
    /// leaves it undecided.
    pub fn coverage(&self, group: &Group, instance: &Instance) -> Result<Coverage, DatasetError> {
        let mut undecided = false;
        for predicate in self.chain(group) {
            match predicate.test(instance)? {
                Coverage::Covered => {}
                Coverage::NotCovered => return Ok(Coverage::NotCovered),
                Coverage::Unknown => undecided = true,
            }
        }
        Ok(if undecided { Coverage::Unknown } else { Coverage::Covered })
    }

    /// Whether every predicate of the chain holds for `instance`. Stops at
    /// the first predicate that fails or meets a missing value.
    pub fn contains(&self, group: &Group, instance: &Instance) -> Result<bool, DatasetError> {
        for predicate in self.chain(group) {
            if predicate.test(instance)? != Coverage::Covered {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn contains_predicate(&self, group: &Group, attribute: usize, metric: Metric) -> bool {
        self.chain(group)
            .any(|p| p.attribute == attribute && p.metric == metric)
    }

    pub fn signature(&self, group: &Group, policy: DuplicatePolicy) -> Signature {
        let mut terms: Vec<SignatureTerm> = self
            .chain(group)
            .map(|p| SignatureTerm {
                attribute: p.attribute,
                metric: p.metric,
                value: policy.compares_values().then(|| p.value.clone()),
            })
            .collect();
        terms.sort_unstable();
        Signature(terms)
    }

    /// Two chains are duplicates when they hold the same predicates in any
    /// order. Chains of different length never are.
    pub fn is_duplicate_of(&self, group: &Group, other: &Group, policy: DuplicatePolicy) -> bool {
        group.len == other.len && self.signature(group, policy) == self.signature(other, policy)
    }
}
