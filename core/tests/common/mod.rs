//! Roster builders shared by the integration tests.
#![allow(dead_code)]

use adm_core::{
    config::EngineConfig,
    engine::RosterEngine,
    roster::{AdmRecord, AgentRecord, LifecycleState, NewAdm, NewAgent},
};

pub fn engine() -> RosterEngine {
    RosterEngine::in_memory(EngineConfig::default()).expect("in-memory engine")
}

pub fn add_adm(engine: &RosterEngine, region: &str, language: &str, max_capacity: u32) -> AdmRecord {
    let n = engine.list_adms().expect("list adms").len() + 1;
    engine
        .create_adm(&NewAdm {
            name: format!("ADM {n}"),
            phone: format!("98000{n:05}"),
            email: None,
            region: region.to_string(),
            language: language.to_string(),
            max_capacity,
        })
        .expect("create adm")
}

pub fn add_agent(engine: &RosterEngine, location: &str, language: &str) -> AgentRecord {
    let n = engine.list_agents().expect("list agents").len() + 1;
    engine
        .create_agent(&NewAgent {
            name: format!("Agent {n}"),
            phone: format!("90000{n:05}"),
            email: None,
            location: location.to_string(),
            state: None,
            language: language.to_string(),
            lifecycle_state: LifecycleState::Dormant,
            dormancy_reason: None,
            assigned_adm_id: None,
            license_number: None,
            specialization: None,
        })
        .expect("create agent")
}

/// (adm_id, assigned, max_capacity) for every ADM, ascending id.
pub fn loads(engine: &RosterEngine) -> Vec<(i64, u32, u32)> {
    engine
        .assignment_stats()
        .expect("stats")
        .adm_breakdown
        .into_iter()
        .map(|l| (l.adm_id, l.assigned_agents, l.max_capacity))
        .collect()
}
