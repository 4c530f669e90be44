//! # Bounded Best-k Retention
//!
//! [`BestGroups`] keeps at most `width` evaluated groups in descending score
//! order, and never two that are duplicates of each other under its
//! [`DuplicatePolicy`]. Equal scores keep their arrival order.

use crate::confusion::EvaluationResult;
use crate::group::{DuplicatePolicy, Group, GroupArena, Signature};

/// A group together with its evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedGroup {
    pub group: Group,
    pub result: EvaluationResult,
}

impl EvaluatedGroup {
    pub fn new(group: Group, result: EvaluationResult) -> Self {
        Self { group, result }
    }

    pub fn score(&self) -> f64 {
        self.result.score
    }

    /// Strictly better score than `other`.
    pub fn improves(&self, other: &EvaluatedGroup) -> bool {
        self.score() > other.score()
    }
}

/// What [`BestGroups::add`] did with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Stored in a free slot.
    Inserted,
    /// Stored after evicting the worst member.
    Evicted,
    /// Took the place of a weaker duplicate.
    Replaced,
    /// Not better than the worst member of a full structure.
    BelowCutoff,
    /// A duplicate of a member that it does not beat.
    Duplicate,
}

impl Admission {
    pub fn kept(self) -> bool {
        matches!(self, Self::Inserted | Self::Evicted | Self::Replaced)
    }
}

#[derive(Debug, Clone)]
struct Member {
    entry: EvaluatedGroup,
    signature: Signature,
}

#[derive(Debug, Clone)]
pub struct BestGroups {
    width: usize,
    policy: DuplicatePolicy,
    members: Vec<Member>,
}

impl BestGroups {
    pub fn new(width: usize, policy: DuplicatePolicy) -> Self {
        Self {
            width,
            policy,
            members: Vec::with_capacity(width),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.width
    }

    pub fn worst_score(&self) -> Option<f64> {
        self.members.last().map(|m| m.entry.score())
    }

    pub fn best_score(&self) -> Option<f64> {
        self.members.first().map(|m| m.entry.score())
    }

    /// Offers a candidate. `arena` must hold the candidate's seed chain.
    pub fn add(&mut self, arena: &GroupArena, candidate: EvaluatedGroup) -> Admission {
        if self.is_full() {
            match self.worst_score() {
                Some(worst) if candidate.score() > worst => {}
                _ => return Admission::BelowCutoff,
            }
        }

        let signature = arena.signature(&candidate.group, self.policy);
        let duplicate = self.members.iter().position(|m| {
            m.entry.group.len() == candidate.group.len() && m.signature == signature
        });

        if let Some(index) = duplicate {
            if self.policy.compares_values() || !candidate.improves(&self.members[index].entry) {
                return Admission::Duplicate;
            }
            self.members.remove(index);
            self.place(Member {
                entry: candidate,
                signature,
            });
            return Admission::Replaced;
        }

        let admission = if self.is_full() {
            self.members.pop();
            Admission::Evicted
        } else {
            Admission::Inserted
        };
        self.place(Member {
            entry: candidate,
            signature,
        });
        admission
    }

    /// Offers every member of `other`, best first.
    pub fn merge(&mut self, arena: &GroupArena, other: BestGroups) {
        for member in other.members {
            self.add(arena, member.entry);
        }
    }

    fn place(&mut self, member: Member) {
        let score = member.entry.score();
        let index = self.members.partition_point(|m| m.entry.score() >= score);
        self.members.insert(index, member);
    }

    pub fn iter(&self) -> impl Iterator<Item = &EvaluatedGroup> {
        self.members.iter().map(|m| &m.entry)
    }

    /// Members in descending score order.
    pub fn to_vec(&self) -> Vec<EvaluatedGroup> {
        self.iter().cloned().collect()
    }

    pub fn into_sorted_vec(self) -> Vec<EvaluatedGroup> {
        self.members.into_iter().map(|m| m.entry).collect()
    }
}
