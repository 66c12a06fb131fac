//! Roster engine: the service facade over the store and the pure engines.
//!
//! Every operation follows the same shape:
//!   1. Read a full Agent/ADM snapshot from the store.
//!   2. Hand it to a pure engine (import, assignment, rebalance, capacity).
//!   3. Apply the result through guarded store writes.
//!
//! RULES:
//!   - Auto-assign and rebalance read and write inside one IMMEDIATE
//!     transaction, so capacity cannot be double-spent by a concurrent run.
//!   - A rebalance batch is applied all-or-none.
//!   - Import rows persist independently; one bad row never aborts its siblings.
//!   - Capacity is recomputed once after a batch, never per move.

use crate::{
    assignment::{self, Placement, Strategy, Unplaceable},
    capacity::{utilization_pct, AdmLoad, CapacityReport, CapacitySnapshot, CapacityWarning},
    config::EngineConfig,
    error::{AdmError, AdmResult},
    import::{self, ImportIssue, ImportReport, ImportRow, IssueKind, ParsedBatch},
    rebalance::{self, Move},
    roster::{language_list, AdmRecord, AgentRecord, NewAdm, NewAgent},
    store::{classify_conflict, RosterStore},
    types::{AdmId, AgentId},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// A placement the store refused because the Agent was no longer unassigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentIssue {
    pub agent_id: AgentId,
    pub adm_id:   AdmId,
    pub message:  String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentResult {
    pub strategy:       Strategy,
    pub assigned_count: usize,
    pub assignments:    Vec<Placement>,
    pub unplaceable:    Vec<Unplaceable>,
    pub errors:         Vec<AssignmentIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RebalanceResult {
    pub rebalanced_count:        usize,
    pub moves:                   Vec<Move>,
    pub average_utilization_pct: f64,
    /// Capacity after the whole batch was applied.
    pub capacity:                CapacityReport,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManualAssignment {
    pub agent:            AgentRecord,
    pub previous_adm_id:  Option<AdmId>,
    /// Set when the override left the target ADM over capacity.
    pub capacity_warning: Option<CapacityWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentStats {
    pub total_agents:                 usize,
    pub unassigned_agents:            usize,
    pub assigned_agents:              usize,
    pub avg_capacity_utilization_pct: f64,
    pub adm_breakdown:                Vec<AdmLoad>,
    pub unassigned_by_location:       BTreeMap<String, usize>,
    pub unassigned_by_language:       BTreeMap<String, usize>,
}

pub struct RosterEngine {
    pub store:  RosterStore,
    pub config: EngineConfig,
}

impl RosterEngine {
    pub fn new(store: RosterStore, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Fresh migrated in-memory engine. Used by tests and throwaway runs.
    pub fn in_memory(config: EngineConfig) -> AdmResult<Self> {
        let store = RosterStore::in_memory()?;
        store.migrate()?;
        Ok(Self::new(store, config))
    }

    // ── Read collaborators ─────────────────────────────────────────

    pub fn list_agents(&self) -> AdmResult<Vec<AgentRecord>> {
        self.store.all_agents()
    }

    pub fn list_unassigned_agents(&self) -> AdmResult<Vec<AgentRecord>> {
        self.store.unassigned_agents()
    }

    pub fn list_agents_for_adm(&self, adm_id: AdmId) -> AdmResult<Vec<AgentRecord>> {
        self.require_adm(adm_id)?;
        self.store.agents_for_adm(adm_id)
    }

    pub fn list_adms(&self) -> AdmResult<Vec<AdmRecord>> {
        self.store.all_adms()
    }

    pub fn get_agent(&self, agent_id: AgentId) -> AdmResult<AgentRecord> {
        self.store
            .get_agent(agent_id)?
            .ok_or(AdmError::AgentNotFound { agent_id })
    }

    pub fn get_adm(&self, adm_id: AdmId) -> AdmResult<AdmRecord> {
        self.require_adm(adm_id)
    }

    fn require_adm(&self, adm_id: AdmId) -> AdmResult<AdmRecord> {
        self.store
            .get_adm(adm_id)?
            .ok_or(AdmError::AdmNotFound { adm_id })
    }

    // ── Onboarding ─────────────────────────────────────────────────

    pub fn create_agent(&self, agent: &NewAgent) -> AdmResult<AgentRecord> {
        let id = self.store.insert_agent(agent)?;
        log::debug!("created agent {id} ({})", agent.phone);
        self.get_agent(id)
    }

    pub fn create_adm(&self, adm: &NewAdm) -> AdmResult<AdmRecord> {
        let id = self.store.insert_adm(adm)?;
        log::debug!("created adm {id} ({}, capacity {})", adm.region, adm.max_capacity);
        self.require_adm(id)
    }

    /// Operator-set capacity. Lowering it below the current load is allowed
    /// and shows up as over capacity.
    pub fn set_adm_capacity(&self, adm_id: AdmId, max_capacity: i64) -> AdmResult<AdmRecord> {
        let capacity = u32::try_from(max_capacity)
            .ok()
            .filter(|c| *c > 0)
            .ok_or(AdmError::InvalidCapacity { adm_id, value: max_capacity })?;
        if self.store.set_adm_capacity(adm_id, capacity)? == 0 {
            return Err(AdmError::AdmNotFound { adm_id });
        }
        let adm = self.require_adm(adm_id)?;
        let assigned = self.store.agents_for_adm(adm_id)?.len() as u32;
        if assigned > capacity {
            log::warn!("adm {adm_id}: capacity lowered to {capacity} below current load {assigned}");
        }
        Ok(adm)
    }

    // ── Batch allocation ───────────────────────────────────────────

    /// Place every unassigned Agent using `strategy`.
    pub fn run_auto_assign(&self, strategy: Strategy) -> AdmResult<AssignmentResult> {
        let result = self.store.write_batch(|store| {
            let agents = store.all_agents()?;
            let adms = store.all_adms()?;
            let snapshot = CapacitySnapshot::from_roster(&agents, &adms);
            let plan = assignment::assign(&agents, &adms, snapshot, strategy);
            log::debug!(
                "auto-assign[{strategy}]: {} seats left after planning",
                plan.snapshot.total_remaining()
            );

            let mut assignments = Vec::with_capacity(plan.placements.len());
            let mut errors = Vec::new();
            for placement in plan.placements {
                if store.assign_if_unassigned(placement.agent_id, placement.adm_id)? == 1 {
                    assignments.push(placement);
                } else {
                    errors.push(AssignmentIssue {
                        agent_id: placement.agent_id,
                        adm_id:   placement.adm_id,
                        message:  format!(
                            "agent {} was assigned elsewhere during the run",
                            placement.agent_id
                        ),
                    });
                }
            }

            Ok(AssignmentResult {
                strategy,
                assigned_count: assignments.len(),
                assignments,
                unplaceable: plan.unplaceable,
                errors,
            })
        })?;

        let fallbacks = result.assignments.iter().filter(|p| p.is_fallback()).count();
        log::info!(
            "auto-assign[{strategy}]: {} assigned ({fallbacks} via fallback), {} unplaceable",
            result.assigned_count,
            result.unplaceable.len()
        );
        if !result.unplaceable.is_empty() {
            log::warn!(
                "auto-assign[{strategy}]: {} agents left unassigned, no ADM has spare capacity",
                result.unplaceable.len()
            );
        }
        Ok(result)
    }

    /// Compute and apply one rebalance batch.
    pub fn run_rebalance(&self) -> AdmResult<RebalanceResult> {
        let config = &self.config.rebalance;
        let plan = self.store.write_batch(|store| {
            let agents = store.all_agents()?;
            let adms = store.all_adms()?;
            let snapshot = CapacitySnapshot::from_roster(&agents, &adms);
            let plan = rebalance::rebalance(&agents, &adms, snapshot, config);

            for mv in &plan.moves {
                if store.move_agent(mv.agent_id, mv.from_adm_id, mv.to_adm_id)? != 1 {
                    return Err(AdmError::StaleMove {
                        agent_id:        mv.agent_id,
                        expected_adm_id: mv.from_adm_id,
                    });
                }
            }
            Ok(plan)
        })?;

        let capacity = CapacityReport::compute(&self.store.all_agents()?, &self.store.all_adms()?);
        for w in capacity.warnings() {
            log::warn!(
                "rebalance: adm {} still over capacity ({}/{})",
                w.adm_id, w.assigned_agents, w.max_capacity
            );
        }
        log::info!(
            "rebalance: {} moves from {} overloaded ADMs (fleet average {:.1}%)",
            plan.moves.len(),
            plan.overloaded.len(),
            plan.average_utilization_pct
        );
        Ok(RebalanceResult {
            rebalanced_count: plan.moves.len(),
            moves: plan.moves,
            average_utilization_pct: plan.average_utilization_pct,
            capacity,
        })
    }

    // ── Manual assignment ──────────────────────────────────────────

    /// Assign one Agent to one ADM. Succeeds even when the ADM is full;
    /// the resulting over-capacity state is reported, not blocked.
    pub fn assign_agent(&self, agent_id: AgentId, adm_id: AdmId) -> AdmResult<ManualAssignment> {
        self.store.write_batch(|store| {
            let agent = store
                .get_agent(agent_id)?
                .ok_or(AdmError::AgentNotFound { agent_id })?;
            let adm = store.get_adm(adm_id)?.ok_or(AdmError::AdmNotFound { adm_id })?;

            store.set_agent_adm(agent_id, Some(adm_id))?;
            let assigned = store.agents_for_adm(adm_id)?.len() as u32;
            let capacity_warning = (assigned > adm.max_capacity).then(|| CapacityWarning {
                adm_id,
                assigned_agents: assigned,
                max_capacity: adm.max_capacity,
                utilization_pct: utilization_pct(assigned, adm.max_capacity),
            });
            if let Some(w) = &capacity_warning {
                log::warn!(
                    "manual override: adm {adm_id} now over capacity ({}/{} = {}%)",
                    w.assigned_agents, w.max_capacity, w.utilization_pct
                );
            }

            let updated = store
                .get_agent(agent_id)?
                .ok_or(AdmError::AgentNotFound { agent_id })?;
            log::debug!("agent {agent_id}: {:?} -> {adm_id}", agent.assigned_adm_id);
            Ok(ManualAssignment {
                agent: updated,
                previous_adm_id: agent.assigned_adm_id,
                capacity_warning,
            })
        })
    }

    /// Clear an Agent's ADM. A second call is a no-op.
    pub fn unassign_agent(&self, agent_id: AgentId) -> AdmResult<AgentRecord> {
        let agent = self.get_agent(agent_id)?;
        if !agent.is_assigned() {
            return Ok(agent);
        }
        self.store.set_agent_adm(agent_id, None)?;
        log::debug!("agent {agent_id}: {:?} -> unassigned", agent.assigned_adm_id);
        self.get_agent(agent_id)
    }

    // ── Bulk import ────────────────────────────────────────────────

    /// Rows carrying assigned_adm_id are placed as written, like a manual
    /// override. ADMs they push past capacity come back as warnings.
    pub fn bulk_import_agents(&self, raw: &str) -> AdmResult<ImportReport> {
        let batch = import::parse(raw, &self.config.agent_import)?;
        let (mut report, created) = self.persist_batch("agents", &batch, |store, row| {
            let payload = import::agent_payload(row);
            (payload.phone.clone(), store.insert_agent(&payload))
        })?;

        let touched: BTreeSet<AdmId> = created
            .iter()
            .filter_map(|row| import::agent_payload(row).assigned_adm_id)
            .collect();
        if !touched.is_empty() {
            let capacity = CapacityReport::compute(&self.store.all_agents()?, &self.store.all_adms()?);
            report.capacity_warnings = capacity
                .warnings()
                .into_iter()
                .filter(|w| touched.contains(&w.adm_id))
                .collect();
            for w in &report.capacity_warnings {
                log::warn!(
                    "import agents [{}]: adm {} now over capacity ({}/{} = {}%)",
                    report.batch_id, w.adm_id, w.assigned_agents, w.max_capacity, w.utilization_pct
                );
            }
        }
        Ok(report)
    }

    pub fn bulk_import_adms(&self, raw: &str) -> AdmResult<ImportReport> {
        let batch = import::parse(raw, &self.config.adm_import)?;
        let (report, _) = self.persist_batch("adms", &batch, |store, row| {
            let payload = import::adm_payload(row);
            (payload.phone.clone(), store.insert_adm(&payload))
        })?;
        Ok(report)
    }

    /// Insert each valid row on its own and fold failures into the report.
    /// Also returns the rows that were persisted.
    fn persist_batch<'b>(
        &self,
        label: &str,
        batch: &'b ParsedBatch,
        insert: impl Fn(&RosterStore, &ImportRow) -> (String, AdmResult<i64>),
    ) -> AdmResult<(ImportReport, Vec<&'b ImportRow>)> {
        let batch_id = Uuid::new_v4().to_string();
        let mut report = ImportReport::from_batch(batch_id.clone(), batch);
        let mut created = Vec::new();

        for row in &batch.valid {
            let (phone, outcome) = insert(&self.store, row);
            match outcome {
                Ok(_) => {
                    report.record_created();
                    created.push(row);
                }
                Err(AdmError::Database(err)) => {
                    let kind = classify_conflict(&err).unwrap_or(IssueKind::Persistence);
                    let message = match kind {
                        IssueKind::DuplicatePhone => {
                            format!("Row {}: phone {phone} already exists", row.row_index)
                        }
                        IssueKind::UnknownAdm => format!(
                            "Row {}: assigned_adm_id {} does not match any ADM",
                            row.row_index,
                            row.get("assigned_adm_id").unwrap_or_default()
                        ),
                        _ => format!("Row {}: {err}", row.row_index),
                    };
                    log::warn!("import {label} [{batch_id}]: {message}");
                    report.record_issue(ImportIssue {
                        row_index: row.row_index,
                        phone: Some(phone),
                        kind,
                        message,
                    });
                }
                Err(other) => return Err(other),
            }
        }

        let report = report.finish();
        log::info!(
            "import {label} [{batch_id}]: {} created of {} submitted, {} errors ({} delimiter)",
            report.created,
            report.total_submitted,
            report.errors_count,
            batch.delimiter.as_char().escape_default()
        );
        Ok((report, created))
    }

    // ── Stats ──────────────────────────────────────────────────────

    pub fn assignment_stats(&self) -> AdmResult<AssignmentStats> {
        let agents = self.store.all_agents()?;
        let adms = self.store.all_adms()?;
        let report = CapacityReport::compute(&agents, &adms);

        let mut unassigned_by_location = BTreeMap::new();
        let mut unassigned_by_language = BTreeMap::new();
        for agent in agents.iter().filter(|a| !a.is_assigned()) {
            *unassigned_by_location
                .entry(agent.location.trim().to_string())
                .or_insert(0) += 1;
            for language in language_list(&agent.language) {
                *unassigned_by_language.entry(language).or_insert(0) += 1;
            }
        }

        Ok(AssignmentStats {
            total_agents: report.total_agents,
            unassigned_agents: report.unassigned_agents,
            assigned_agents: report.assigned_agents,
            avg_capacity_utilization_pct: report.avg_capacity_utilization_pct,
            adm_breakdown: report.adms,
            unassigned_by_location,
            unassigned_by_language,
        })
    }
}
