//! Assignment engine: greedy placement of unassigned Agents onto ADMs.
//!
//! The result is deterministic and explainable, not globally optimal:
//!   - Agents are processed in ascending id order.
//!   - Each Agent goes to the least-utilized eligible ADM with spare
//!     capacity; ties go to the lower ADM id.
//!   - The per-run CapacitySnapshot is updated after every placement, so
//!     later Agents see the effect of earlier ones.
//!   - No placement ever takes an ADM past max_capacity.
//!
//! Geographic and language runs take two passes. Agents with no eligible
//! matching ADM are deferred and placed by the balanced rule in the second
//! pass; those placements carry the fallback reason.

use crate::{
    capacity::CapacitySnapshot,
    roster::{languages_overlap, region_matches, AdmRecord, AgentRecord},
    types::{AdmId, AgentId},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Balanced,
    Geographic,
    Language,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balanced   => "balanced",
            Self::Geographic => "geographic",
            Self::Language   => "language",
        }
    }

    /// Primary-pass eligibility of `adm` for `agent`.
    pub fn matches(&self, agent: &AgentRecord, adm: &AdmRecord) -> bool {
        match self {
            Self::Balanced   => true,
            Self::Geographic => region_matches(agent, adm),
            Self::Language   => languages_overlap(agent, adm),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "balanced"   => Ok(Self::Balanced),
            "geographic" => Ok(Self::Geographic),
            "language"   => Ok(Self::Language),
            other => Err(format!(
                "unknown strategy '{other}' (expected balanced, geographic or language)"
            )),
        }
    }
}

/// Why a geographic/language run placed an Agent by the balanced rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No ADM satisfied the strategy's match predicate.
    NoMatchingAdm,
    /// Matching ADMs exist but all were at capacity.
    MatchingAdmsFull,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Placement {
    pub agent_id: AgentId,
    pub adm_id:   AdmId,
    pub fallback: Option<FallbackReason>,
}

impl Placement {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnplaceableReason {
    /// Every ADM was at max_capacity when this Agent's turn came.
    NoSpareCapacity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Unplaceable {
    pub agent_id: AgentId,
    pub reason:   UnplaceableReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentPlan {
    pub strategy:    Strategy,
    pub placements:  Vec<Placement>,
    pub unplaceable: Vec<Unplaceable>,
    /// Capacity after every placement in this plan.
    pub snapshot:    CapacitySnapshot,
}

/// Place every unassigned Agent in `agents` onto `adms`.
///
/// Agents that already have an ADM are ignored. ADMs missing from
/// `snapshot` are never chosen.
pub fn assign(
    agents: &[AgentRecord],
    adms: &[AdmRecord],
    mut snapshot: CapacitySnapshot,
    strategy: Strategy,
) -> AssignmentPlan {
    let mut pool: Vec<&AgentRecord> = agents.iter().filter(|a| !a.is_assigned()).collect();
    pool.sort_by_key(|a| a.id);

    let mut placements = Vec::with_capacity(pool.len());
    let mut unplaceable = Vec::new();
    let mut deferred: Vec<(&AgentRecord, FallbackReason)> = Vec::new();

    // Pass 1: strategy-eligible ADMs only.
    for agent in pool {
        let mut eligible = adms.iter().filter(|adm| strategy.matches(agent, adm)).peekable();
        if eligible.peek().is_none() {
            deferred.push((agent, FallbackReason::NoMatchingAdm));
            continue;
        }
        match least_loaded(eligible, &snapshot) {
            Some(adm_id) => {
                snapshot.place(adm_id);
                placements.push(Placement { agent_id: agent.id, adm_id, fallback: None });
            }
            None if strategy == Strategy::Balanced => {
                unplaceable.push(Unplaceable {
                    agent_id: agent.id,
                    reason: UnplaceableReason::NoSpareCapacity,
                });
            }
            None => deferred.push((agent, FallbackReason::MatchingAdmsFull)),
        }
    }

    // Pass 2: balanced across every ADM with room.
    for (agent, reason) in deferred {
        match least_loaded(adms.iter(), &snapshot) {
            Some(adm_id) => {
                snapshot.place(adm_id);
                log::debug!(
                    "assign[{strategy}]: agent {} -> adm {adm_id} via fallback ({reason:?})",
                    agent.id
                );
                placements.push(Placement { agent_id: agent.id, adm_id, fallback: Some(reason) });
            }
            None => unplaceable.push(Unplaceable {
                agent_id: agent.id,
                reason: UnplaceableReason::NoSpareCapacity,
            }),
        }
    }

    AssignmentPlan {
        strategy,
        placements,
        unplaceable,
        snapshot,
    }
}

/// Lowest-utilization ADM with room; ties broken by ascending ADM id.
fn least_loaded<'a>(
    candidates: impl Iterator<Item = &'a AdmRecord>,
    snapshot: &CapacitySnapshot,
) -> Option<AdmId> {
    candidates
        .filter_map(|adm| {
            snapshot
                .slot(adm.id)
                .filter(|slot| slot.has_room())
                .map(|slot| (adm.id, *slot))
        })
        .min_by(|(a_id, a), (b_id, b)| a.cmp_load(b).then(a_id.cmp(b_id)))
        .map(|(adm_id, _)| adm_id)
}
