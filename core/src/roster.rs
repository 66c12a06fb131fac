//! Agent and ADM records, plus the affinity predicates used by the
//! assignment and rebalancing engines.
//!
//! RULE: region and language matching is plain string comparison.
//! There is no geocoding and no distance computation anywhere in the core.

use crate::types::{AdmId, AgentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where an Agent sits in the activation funnel.
/// Owned by the external lifecycle workflow; the core only reads it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Dormant,
    AtRisk,
    Contacted,
    Engaged,
    Trained,
    Active,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dormant   => "dormant",
            Self::AtRisk    => "at_risk",
            Self::Contacted => "contacted",
            Self::Engaged   => "engaged",
            Self::Trained   => "trained",
            Self::Active    => "active",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "dormant"   => Ok(Self::Dormant),
            "at_risk"   => Ok(Self::AtRisk),
            "contacted" => Ok(Self::Contacted),
            "engaged"   => Ok(Self::Engaged),
            "trained"   => Ok(Self::Trained),
            "active"    => Ok(Self::Active),
            other => Err(format!("unknown lifecycle state '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRecord {
    pub id:              AgentId,
    pub name:            String,
    pub phone:           String,
    pub email:           Option<String>,
    pub location:        String,
    pub state:           Option<String>,
    pub language:        String,
    pub lifecycle_state: LifecycleState,
    pub dormancy_reason: Option<String>,
    pub assigned_adm_id: Option<AdmId>,
    pub license_number:  Option<String>,
    pub specialization:  Option<String>,
    pub created_at:      DateTime<Utc>,
    pub updated_at:      DateTime<Utc>,
}

impl AgentRecord {
    pub fn is_assigned(&self) -> bool {
        self.assigned_adm_id.is_some()
    }
}

/// Creation payload for an Agent. Produced by onboarding or bulk import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAgent {
    pub name:            String,
    pub phone:           String,
    pub email:           Option<String>,
    pub location:        String,
    pub state:           Option<String>,
    pub language:        String,
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
    #[serde(default)]
    pub dormancy_reason: Option<String>,
    pub assigned_adm_id: Option<AdmId>,
    pub license_number:  Option<String>,
    pub specialization:  Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdmRecord {
    pub id:           AdmId,
    pub name:         String,
    pub phone:        String,
    pub email:        Option<String>,
    pub region:       String,
    pub language:     String,
    pub max_capacity: u32,
    pub created_at:   DateTime<Utc>,
    pub updated_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAdm {
    pub name:         String,
    pub phone:        String,
    pub email:        Option<String>,
    pub region:       String,
    pub language:     String,
    pub max_capacity: u32,
}

/// Split a comma-separated language field into normalized entries.
/// "Hindi, English" and "hindi,english" yield the same list.
pub fn language_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect()
}

/// True when the Agent and ADM share at least one language.
pub fn languages_overlap(agent: &AgentRecord, adm: &AdmRecord) -> bool {
    let spoken = language_list(&adm.language);
    language_list(&agent.language)
        .iter()
        .any(|l| spoken.contains(l))
}

/// True when the ADM's region names the Agent's city or state.
///
/// Case-insensitive substring match in either direction, so an ADM region
/// of "West - Mumbai" matches an Agent located in "Mumbai", and an ADM region
/// of "Delhi" matches an Agent in "New Delhi".
pub fn region_matches(agent: &AgentRecord, adm: &AdmRecord) -> bool {
    let region = adm.region.trim().to_lowercase();
    if region.is_empty() {
        return false;
    }
    [Some(agent.location.as_str()), agent.state.as_deref()]
        .into_iter()
        .flatten()
        .map(|place| place.trim().to_lowercase())
        .filter(|place| !place.is_empty())
        .any(|place| region.contains(&place) || place.contains(&region))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn agent(id: AgentId, location: &str, language: &str) -> AgentRecord {
        AgentRecord {
            id,
            name: format!("Agent {id}"),
            phone: format!("90000{id:05}"),
            email: None,
            location: location.to_string(),
            state: None,
            language: language.to_string(),
            lifecycle_state: LifecycleState::Dormant,
            dormancy_reason: None,
            assigned_adm_id: None,
            license_number: None,
            specialization: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn assigned(id: AgentId, adm_id: AdmId, location: &str, language: &str) -> AgentRecord {
        AgentRecord {
            assigned_adm_id: Some(adm_id),
            ..agent(id, location, language)
        }
    }

    pub fn adm(id: AdmId, region: &str, language: &str, max_capacity: u32) -> AdmRecord {
        AdmRecord {
            id,
            name: format!("ADM {id}"),
            phone: format!("98000{id:05}"),
            email: None,
            region: region.to_string(),
            language: language.to_string(),
            max_capacity,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}
