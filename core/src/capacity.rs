//! Capacity tracker: derived ADM load, never stored.
//!
//! RULE: utilization is reported as-is. An ADM holding 60 agents against a
//! capacity of 50 reports 120%, not 100%. Over-capacity only ever arises from
//! a manual operator override and must stay visible.

use crate::{
    roster::{AdmRecord, AgentRecord},
    types::AdmId,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Assigned/capacity as a percentage, unclamped.
pub fn utilization(assigned: u32, max_capacity: u32) -> f64 {
    if max_capacity == 0 {
        return if assigned == 0 { 0.0 } else { f64::INFINITY };
    }
    f64::from(assigned) / f64::from(max_capacity) * 100.0
}

/// round(assigned / max_capacity * 100)
pub fn utilization_pct(assigned: u32, max_capacity: u32) -> u32 {
    utilization(assigned, max_capacity).round() as u32
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdmLoad {
    pub adm_id:          AdmId,
    pub name:            String,
    pub region:          String,
    pub language:        String,
    pub assigned_agents: u32,
    pub max_capacity:    u32,
    pub utilization_pct: u32,
    pub over_capacity:   bool,
}

/// Raised when an ADM holds more agents than its capacity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapacityWarning {
    pub adm_id:          AdmId,
    pub assigned_agents: u32,
    pub max_capacity:    u32,
    pub utilization_pct: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapacityReport {
    pub adms:                        Vec<AdmLoad>,
    pub total_agents:                usize,
    pub assigned_agents:             usize,
    pub unassigned_agents:           usize,
    pub avg_capacity_utilization_pct: f64,
}

impl CapacityReport {
    pub fn compute(agents: &[AgentRecord], adms: &[AdmRecord]) -> Self {
        let counts = assigned_counts(agents);
        let loads: Vec<AdmLoad> = adms
            .iter()
            .map(|adm| {
                let assigned = counts.get(&adm.id).copied().unwrap_or(0);
                AdmLoad {
                    adm_id:          adm.id,
                    name:            adm.name.clone(),
                    region:          adm.region.clone(),
                    language:        adm.language.clone(),
                    assigned_agents: assigned,
                    max_capacity:    adm.max_capacity,
                    utilization_pct: utilization_pct(assigned, adm.max_capacity),
                    over_capacity:   assigned > adm.max_capacity,
                }
            })
            .collect();

        let avg = if adms.is_empty() {
            0.0
        } else {
            let total: f64 = loads
                .iter()
                .map(|l| utilization(l.assigned_agents, l.max_capacity))
                .sum();
            (total / adms.len() as f64 * 10.0).round() / 10.0
        };

        let assigned_agents = agents.iter().filter(|a| a.is_assigned()).count();
        Self {
            adms: loads,
            total_agents: agents.len(),
            assigned_agents,
            unassigned_agents: agents.len() - assigned_agents,
            avg_capacity_utilization_pct: avg,
        }
    }

    pub fn load_for(&self, adm_id: AdmId) -> Option<&AdmLoad> {
        self.adms.iter().find(|l| l.adm_id == adm_id)
    }

    pub fn warnings(&self) -> Vec<CapacityWarning> {
        self.adms
            .iter()
            .filter(|l| l.over_capacity)
            .map(|l| CapacityWarning {
                adm_id:          l.adm_id,
                assigned_agents: l.assigned_agents,
                max_capacity:    l.max_capacity,
                utilization_pct: l.utilization_pct,
            })
            .collect()
    }
}

fn assigned_counts(agents: &[AgentRecord]) -> BTreeMap<AdmId, u32> {
    let mut counts = BTreeMap::new();
    for adm_id in agents.iter().filter_map(|a| a.assigned_adm_id) {
        *counts.entry(adm_id).or_insert(0) += 1;
    }
    counts
}

/// Load of one ADM inside a single allocation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    pub assigned:     u32,
    pub max_capacity: u32,
}

impl Slot {
    pub fn has_room(&self) -> bool {
        self.assigned < self.max_capacity
    }

    pub fn remaining(&self) -> u32 {
        self.max_capacity.saturating_sub(self.assigned)
    }

    pub fn utilization(&self) -> f64 {
        utilization(self.assigned, self.max_capacity)
    }

    /// Exact ordering by assigned/max_capacity, no float rounding.
    pub fn cmp_load(&self, other: &Slot) -> Ordering {
        let lhs = u64::from(self.assigned) * u64::from(other.max_capacity);
        let rhs = u64::from(other.assigned) * u64::from(self.max_capacity);
        lhs.cmp(&rhs)
    }
}

/// Per-run capacity state, threaded explicitly through the allocation
/// functions and handed back updated. Nothing outside the run mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapacitySnapshot {
    slots: BTreeMap<AdmId, Slot>,
}

impl CapacitySnapshot {
    pub fn from_roster(agents: &[AgentRecord], adms: &[AdmRecord]) -> Self {
        let counts = assigned_counts(agents);
        let slots = adms
            .iter()
            .map(|adm| {
                let slot = Slot {
                    assigned:     counts.get(&adm.id).copied().unwrap_or(0),
                    max_capacity: adm.max_capacity,
                };
                (adm.id, slot)
            })
            .collect();
        Self { slots }
    }

    pub fn slot(&self, adm_id: AdmId) -> Option<&Slot> {
        self.slots.get(&adm_id)
    }

    pub fn remaining(&self, adm_id: AdmId) -> u32 {
        self.slot(adm_id).map_or(0, Slot::remaining)
    }

    pub fn has_room(&self, adm_id: AdmId) -> bool {
        self.slot(adm_id).is_some_and(Slot::has_room)
    }

    pub fn total_remaining(&self) -> u64 {
        self.slots.values().map(|s| u64::from(s.remaining())).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AdmId, &Slot)> {
        self.slots.iter().map(|(id, slot)| (*id, slot))
    }

    pub(crate) fn place(&mut self, adm_id: AdmId) {
        if let Some(slot) = self.slots.get_mut(&adm_id) {
            slot.assigned += 1;
        }
    }

    pub(crate) fn release(&mut self, adm_id: AdmId) {
        if let Some(slot) = self.slots.get_mut(&adm_id) {
            slot.assigned = slot.assigned.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::fixtures::{adm, agent, assigned};

    #[test]
    fn over_capacity_is_reported_unclamped() {
        let adms = vec![adm(1, "West", "Hindi", 2)];
        let agents: Vec<_> = (1..=3).map(|id| assigned(id, 1, "Mumbai", "Hindi")).collect();

        let report = CapacityReport::compute(&agents, &adms);
        let load = report.load_for(1).unwrap();
        assert_eq!(load.utilization_pct, 150);
        assert!(load.over_capacity);
        assert_eq!(report.warnings().len(), 1);
    }

    #[test]
    fn totals_split_assigned_and_unassigned() {
        let adms = vec![adm(1, "West", "Hindi", 10), adm(2, "North", "Hindi", 10)];
        let agents = vec![
            assigned(1, 1, "Mumbai", "Hindi"),
            assigned(2, 1, "Mumbai", "Hindi"),
            assigned(3, 2, "Delhi", "Hindi"),
            agent(4, "Pune", "Marathi"),
        ];
        let report = CapacityReport::compute(&agents, &adms);
        assert_eq!(report.total_agents, 4);
        assert_eq!(report.assigned_agents, 3);
        assert_eq!(report.unassigned_agents, 1);
        assert_eq!(report.load_for(1).unwrap().utilization_pct, 20);
        assert!((report.avg_capacity_utilization_pct - 15.0).abs() < 1e-9);
        assert!(report.warnings().is_empty());
    }

    #[test]
    fn utilization_rounds_half_up() {
        assert_eq!(utilization_pct(1, 3), 33);
        assert_eq!(utilization_pct(2, 3), 67);
        assert_eq!(utilization_pct(1, 8), 13);
    }

    #[test]
    fn slot_ordering_is_exact() {
        let a = Slot { assigned: 1, max_capacity: 3 };
        let b = Slot { assigned: 2, max_capacity: 6 };
        let c = Slot { assigned: 1, max_capacity: 2 };
        assert_eq!(a.cmp_load(&b), Ordering::Equal);
        assert_eq!(a.cmp_load(&c), Ordering::Less);
    }

    #[test]
    fn snapshot_tracks_placements() {
        let adms = vec![adm(1, "West", "Hindi", 2)];
        let mut snap = CapacitySnapshot::from_roster(&[], &adms);
        assert_eq!(snap.remaining(1), 2);
        snap.place(1);
        snap.place(1);
        assert!(!snap.has_room(1));
        snap.release(1);
        assert_eq!(snap.remaining(1), 1);
        assert_eq!(snap.remaining(99), 0);
    }
}
