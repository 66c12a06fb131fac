//! Demo roster seeding.
//!
//! Creates five ADMs spread over the West, North, South and East regions and
//! a pool of unassigned Agents drawn from Indian city and language tables.
//! Same seed, same roster. A store that already holds Agents is left alone.

use crate::{
    engine::RosterEngine,
    error::AdmResult,
    name_generator::NameGenerator,
    rng::RosterRng,
    roster::{LifecycleState, NewAdm, NewAgent},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedSummary {
    pub adms_created:   usize,
    pub agents_created: usize,
    /// True when the store already had Agents and nothing was written.
    pub skipped:        bool,
}

struct City {
    name:     &'static str,
    state:    &'static str,
    language: &'static str,
}

const CITIES: &[City] = &[
    City { name: "Mumbai",    state: "Maharashtra",   language: "Marathi" },
    City { name: "Delhi",     state: "Delhi",         language: "Hindi" },
    City { name: "Bangalore", state: "Karnataka",     language: "Kannada" },
    City { name: "Chennai",   state: "Tamil Nadu",    language: "Tamil" },
    City { name: "Kolkata",   state: "West Bengal",   language: "Bengali" },
    City { name: "Hyderabad", state: "Telangana",     language: "Telugu" },
    City { name: "Pune",      state: "Maharashtra",   language: "Marathi" },
    City { name: "Jaipur",    state: "Rajasthan",     language: "Hindi" },
    City { name: "Lucknow",   state: "Uttar Pradesh", language: "Hindi" },
    City { name: "Ahmedabad", state: "Gujarat",       language: "Hindi" },
    City { name: "Noida",     state: "Uttar Pradesh", language: "Hindi" },
    City { name: "Gurgaon",   state: "Haryana",       language: "Hindi" },
    City { name: "Thane",     state: "Maharashtra",   language: "Marathi" },
    City { name: "Nagpur",    state: "Maharashtra",   language: "Hindi" },
    City { name: "Kochi",     state: "Kerala",        language: "English" },
];

// (name, phone, email, region, language, max_capacity)
const ADM_PROFILES: &[(&str, &str, &str, &str, &str, u32)] = &[
    ("Rajiv Malhotra", "9800000101", "rajiv.malhotra@example.com",
     "West - Mumbai", "Hindi,English,Marathi", 50),
    ("Priyanka Kapoor", "9800000102", "priyanka.kapoor@example.com",
     "North - Delhi", "Hindi,English", 45),
    ("Suresh Venkataraman", "9800000103", "suresh.v@example.com",
     "South - Bangalore", "Kannada,English,Hindi,Tamil", 40),
    ("Meenakshi Sundaram", "9800000104", "meenakshi.s@example.com",
     "South - Chennai", "Tamil,English,Telugu", 35),
    ("Amitava Roy", "9800000105", "amitava.roy@example.com",
     "East - Kolkata", "Bengali,Hindi,English", 40),
];

const SPECIALIZATIONS: &[&str] = &[
    "term,savings", "ulip,pension", "term,child", "savings,pension",
    "term,ulip", "child,savings", "group,term", "health,term",
    "pension,savings", "ulip,child", "term", "savings", "ulip",
];

// (category, reasons)
const DORMANCY_REASONS: &[(&str, &[&str])] = &[
    ("system_issues", &["Portal Down", "Login Issues", "OTP Not Received"]),
    ("commission_concerns", &["Delayed Payment", "Low Rate", "Unclear Structure"]),
    ("market_conditions", &["Low Demand", "Customer Resistance", "Economic Slowdown"]),
    ("product_complexity", &["Too Many Products", "Hard to Explain", "No Training"]),
    ("personal_reasons", &["Health", "Family", "Other Job", "Relocation"]),
    ("competition", &["LIC", "Other Private", "Banks"]),
    ("support_issues", &["No ADM Support", "Late Responses", "No Materials"]),
];

/// Funnel mix out of 50: mostly dormant, a few further along.
const LIFECYCLE_WEIGHTS: &[(LifecycleState, u64)] = &[
    (LifecycleState::Dormant, 40),
    (LifecycleState::AtRisk, 5),
    (LifecycleState::Contacted, 3),
    (LifecycleState::Engaged, 1),
    (LifecycleState::Active, 1),
];

fn lifecycle(rng: &mut RosterRng) -> LifecycleState {
    let total: u64 = LIFECYCLE_WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut roll = rng.next_u64_below(total);
    for (state, weight) in LIFECYCLE_WEIGHTS {
        if roll < *weight {
            return *state;
        }
        roll -= weight;
    }
    LifecycleState::Dormant
}

/// Only dormant and at-risk Agents carry a reason.
fn dormancy_reason(rng: &mut RosterRng, state: LifecycleState) -> Option<String> {
    if !matches!(state, LifecycleState::Dormant | LifecycleState::AtRisk) {
        return None;
    }
    let &(category, reasons) = rng.pick(DORMANCY_REASONS);
    Some(format!("{category}: {}", rng.pick(reasons)))
}

fn unique_phone(rng: &mut RosterRng, used: &mut BTreeSet<String>) -> String {
    loop {
        let lead = rng.range_inclusive(7, 9);
        let rest = rng.next_u64_below(1_000_000_000);
        let phone = format!("{lead}{rest:09}");
        if used.insert(phone.clone()) {
            return phone;
        }
    }
}

pub fn seed_demo_roster(
    engine: &RosterEngine,
    seed: u64,
    agent_count: usize,
) -> AdmResult<SeedSummary> {
    let existing = engine.store.agent_count()?;
    if existing > 0 {
        log::info!("seed: store already has {existing} agents, skipping");
        return Ok(SeedSummary { adms_created: 0, agents_created: 0, skipped: true });
    }

    let mut rng = RosterRng::new(seed);
    let mut used: BTreeSet<String> = BTreeSet::new();

    let mut adms_created = 0;
    if engine.store.all_adms()?.is_empty() {
        for &(name, phone, email, region, language, max_capacity) in ADM_PROFILES {
            engine.create_adm(&NewAdm {
                name:     name.to_string(),
                phone:    phone.to_string(),
                email:    Some(email.to_string()),
                region:   region.to_string(),
                language: language.to_string(),
                max_capacity,
            })?;
            used.insert(phone.to_string());
            adms_created += 1;
        }
    }

    for _ in 0..agent_count {
        let city = rng.pick(CITIES);
        let name = NameGenerator::generate_full_name(&mut rng);
        let language = *rng.pick(&[city.language, "Hindi", "English"]);
        let lifecycle_state = lifecycle(&mut rng);
        let agent = NewAgent {
            phone:           unique_phone(&mut rng, &mut used),
            email:           Some(NameGenerator::email_for(&name)),
            location:        city.name.to_string(),
            state:           Some(city.state.to_string()),
            language:        language.to_string(),
            lifecycle_state,
            dormancy_reason: dormancy_reason(&mut rng, lifecycle_state),
            assigned_adm_id: None,
            license_number:  Some(format!(
                "IRDA/{}/{}",
                rng.range_inclusive(100_000, 999_999),
                rng.range_inclusive(2019, 2024)
            )),
            specialization:  Some(rng.pick(SPECIALIZATIONS).to_string()),
            name,
        };
        engine.create_agent(&agent)?;
    }

    log::info!("seed {seed}: {adms_created} ADMs, {agent_count} unassigned agents");
    Ok(SeedSummary { adms_created, agents_created: agent_count, skipped: false })
}
