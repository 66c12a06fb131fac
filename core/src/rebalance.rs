//! Rebalancing engine: proposes moves from overloaded to underloaded ADMs.
//!
//! RULES:
//!   - The fleet average is computed once, before any move.
//!   - A donor gives Agents until it is at or below the average.
//!   - A receiver takes Agents while it is below the average and has room.
//!   - Moves that keep region or language affinity are tried first.
//!   - Every accepted move must lower the sum of squared deviations from
//!     the mean utilization and must not raise the maximum utilization.
//!   - An Agent moves at most once per run.
//!
//! The plan is advisory; the caller applies it as one batch.

use crate::{
    capacity::{CapacitySnapshot, Slot},
    config::RebalanceConfig,
    roster::{languages_overlap, region_matches, AdmRecord, AgentRecord},
    types::{AdmId, AgentId},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MoveAffinity {
    Region,
    Language,
    /// Last resort: no receiver matched the Agent.
    Unmatched,
}

impl MoveAffinity {
    fn between(agent: &AgentRecord, adm: &AdmRecord) -> Self {
        if region_matches(agent, adm) {
            Self::Region
        } else if languages_overlap(agent, adm) {
            Self::Language
        } else {
            Self::Unmatched
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Move {
    pub agent_id:    AgentId,
    pub from_adm_id: AdmId,
    pub to_adm_id:   AdmId,
    pub affinity:    MoveAffinity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RebalancePlan {
    pub moves:                   Vec<Move>,
    pub average_utilization_pct: f64,
    pub overloaded:              Vec<AdmId>,
    /// Capacity after every move in this plan.
    pub snapshot:                CapacitySnapshot,
}

/// Mean and population standard deviation of per-ADM utilization.
fn distribution(snapshot: &CapacitySnapshot) -> (f64, f64) {
    let utils: Vec<f64> = snapshot.iter().map(|(_, s)| s.utilization()).collect();
    if utils.is_empty() {
        return (0.0, 0.0);
    }
    let n = utils.len() as f64;
    let mean = utils.iter().sum::<f64>() / n;
    let var = utils.iter().map(|u| (u - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// (max utilization, sum of squared deviations), optionally with one Agent
/// shifted from `shift.0` to `shift.1`.
fn spread(snapshot: &CapacitySnapshot, shift: Option<(AdmId, AdmId)>) -> (f64, f64) {
    let utils: Vec<f64> = snapshot
        .iter()
        .map(|(id, slot)| {
            let mut assigned = slot.assigned;
            if let Some((from, to)) = shift {
                if id == from {
                    assigned = assigned.saturating_sub(1);
                }
                if id == to {
                    assigned += 1;
                }
            }
            Slot { assigned, max_capacity: slot.max_capacity }.utilization()
        })
        .collect();
    if utils.is_empty() {
        return (0.0, 0.0);
    }
    let mean = utils.iter().sum::<f64>() / utils.len() as f64;
    let max = utils.iter().copied().fold(f64::MIN, f64::max);
    let ssd = utils.iter().map(|u| (u - mean).powi(2)).sum();
    (max, ssd)
}

fn improves(snapshot: &CapacitySnapshot, from: AdmId, to: AdmId) -> bool {
    if !snapshot.has_room(to) {
        return false;
    }
    let (max_before, ssd_before) = spread(snapshot, None);
    let (max_after, ssd_after) = spread(snapshot, Some((from, to)));
    max_after <= max_before + EPSILON && ssd_after < ssd_before - EPSILON
}

/// ADMs that should give Agents away, most loaded first.
fn overloaded(snapshot: &CapacitySnapshot, mean: f64, std_dev: f64, config: &RebalanceConfig) -> Vec<AdmId> {
    let mut donors: Vec<(AdmId, Slot)> = snapshot
        .iter()
        .filter(|(_, slot)| {
            let u = slot.utilization();
            u > mean + EPSILON
                && (u >= config.overload_threshold_pct
                    || u > mean + config.std_dev_factor * std_dev + EPSILON
                    || slot.assigned > slot.max_capacity)
        })
        .map(|(id, slot)| (id, *slot))
        .collect();
    donors.sort_by(|(a_id, a), (b_id, b)| b.cmp_load(a).then(a_id.cmp(b_id)));
    donors.into_iter().map(|(id, _)| id).collect()
}

/// ADMs that may take Agents right now, least loaded first.
fn receivers(snapshot: &CapacitySnapshot, mean: f64, donor: AdmId) -> Vec<AdmId> {
    let mut open: Vec<(AdmId, Slot)> = snapshot
        .iter()
        .filter(|(id, slot)| *id != donor && slot.has_room() && slot.utilization() < mean - EPSILON)
        .map(|(id, slot)| (id, *slot))
        .collect();
    open.sort_by(|(a_id, a), (b_id, b)| a.cmp_load(b).then(a_id.cmp(b_id)));
    open.into_iter().map(|(id, _)| id).collect()
}

/// Propose moves that reduce utilization skew across `adms`.
///
/// `agents` is the full roster; only Agents assigned to a donor move.
pub fn rebalance(
    agents: &[AgentRecord],
    adms: &[AdmRecord],
    mut snapshot: CapacitySnapshot,
    config: &RebalanceConfig,
) -> RebalancePlan {
    let (mean, std_dev) = distribution(&snapshot);
    let donors = overloaded(&snapshot, mean, std_dev, config);
    let by_id: BTreeMap<AdmId, &AdmRecord> = adms.iter().map(|a| (a.id, a)).collect();

    let mut moved: BTreeSet<AgentId> = BTreeSet::new();
    let mut moves = Vec::new();

    for &donor in &donors {
        let mut roster: Vec<&AgentRecord> = agents
            .iter()
            .filter(|a| a.assigned_adm_id == Some(donor))
            .collect();
        roster.sort_by_key(|a| a.id);

        while snapshot
            .slot(donor)
            .is_some_and(|slot| slot.utilization() > mean + EPSILON)
        {
            let targets = receivers(&snapshot, mean, donor);
            let candidates: Vec<&AgentRecord> =
                roster.iter().copied().filter(|a| !moved.contains(&a.id)).collect();
            let Some(next) = choose_move(&snapshot, donor, &targets, &candidates, &by_id) else {
                break;
            };

            snapshot.release(donor);
            snapshot.place(next.to_adm_id);
            moved.insert(next.agent_id);
            log::debug!(
                "rebalance: agent {} adm {} -> {} ({:?})",
                next.agent_id, next.from_adm_id, next.to_adm_id, next.affinity
            );
            moves.push(next);
        }
    }

    RebalancePlan {
        moves,
        average_utilization_pct: (mean * 10.0).round() / 10.0,
        overloaded: donors,
        snapshot,
    }
}

fn choose_move(
    snapshot: &CapacitySnapshot,
    donor: AdmId,
    targets: &[AdmId],
    candidates: &[&AgentRecord],
    by_id: &BTreeMap<AdmId, &AdmRecord>,
) -> Option<Move> {
    let acceptable: Vec<AdmId> = targets
        .iter()
        .copied()
        .filter(|to| improves(snapshot, donor, *to))
        .collect();
    if acceptable.is_empty() {
        return None;
    }

    // Affinity-preserving moves first.
    for agent in candidates {
        for to in &acceptable {
            let Some(adm) = by_id.get(to) else { continue };
            let affinity = MoveAffinity::between(agent, adm);
            if affinity != MoveAffinity::Unmatched {
                return Some(Move {
                    agent_id: agent.id,
                    from_adm_id: donor,
                    to_adm_id: *to,
                    affinity,
                });
            }
        }
    }

    let agent = candidates.first()?;
    Some(Move {
        agent_id: agent.id,
        from_adm_id: donor,
        to_adm_id: acceptable[0],
        affinity: MoveAffinity::Unmatched,
    })
}
