//! roster-runner: headless driver for the ADM roster engine.
//!
//! Usage:
//!   roster-runner --db roster.db --seed-demo 50 --auto-assign geographic
//!   roster-runner --db roster.db --import-adms adms.csv --import-agents agents.tsv --rebalance
//!   roster-runner --db roster.db --ipc-mode
//!
//! One-shot mode runs the requested steps in a fixed order (seed, ADM import,
//! Agent import, auto-assign, rebalance) and prints a JSON summary ending with
//! the assignment stats. IPC mode reads one JSON request per stdin line and
//! writes one JSON response per stdout line.

use adm_core::{
    assignment::Strategy,
    config::EngineConfig,
    engine::RosterEngine,
    error::AdmResult,
    roster::{NewAdm, NewAgent},
    seed::seed_demo_roster,
    store::RosterStore,
    types::{AdmId, AgentId},
};
use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    ListAgents,
    ListUnassignedAgents,
    ListAgentsForAdm { adm_id: AdmId },
    ListAdms,
    GetAgent { agent_id: AgentId },
    GetAdm { adm_id: AdmId },
    CreateAgent { agent: NewAgent },
    CreateAdm { adm: NewAdm },
    SetAdmCapacity { adm_id: AdmId, max_capacity: i64 },
    RunAutoAssign {
        #[serde(default)]
        strategy: Strategy,
    },
    RunRebalance,
    AssignAgent { agent_id: AgentId, adm_id: AdmId },
    UnassignAgent { agent_id: AgentId },
    BulkImportAgents { raw: String },
    BulkImportAdms { raw: String },
    GetAssignmentStats,
    SeedDemo { seed: u64, agent_count: usize },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");

    let store = RosterStore::open(db).with_context(|| format!("opening {db}"))?;
    store.migrate()?;
    let engine = RosterEngine::new(store, load_config(data_dir)?);

    if ipc_mode {
        run_ipc_loop(&engine)
    } else {
        run_once(&engine, &args)
    }
}

fn load_config(data_dir: &str) -> Result<EngineConfig> {
    if Path::new(data_dir).join("engine.json").exists() {
        EngineConfig::load(data_dir)
    } else {
        log::warn!("no engine.json under {data_dir}, using built-in defaults");
        Ok(EngineConfig::default())
    }
}

fn run_once(engine: &RosterEngine, args: &[String]) -> Result<()> {
    let mut summary = Map::new();

    if let Some(count) = flag_value(args, "--seed-demo") {
        let count: usize = count.parse().context("--seed-demo expects an agent count")?;
        let seed = parse_arg(args, "--seed", 42u64);
        summary.insert("seed".into(), serde_json::to_value(seed_demo_roster(engine, seed, count)?)?);
    }
    if let Some(path) = flag_value(args, "--import-adms") {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        summary.insert("import_adms".into(), serde_json::to_value(engine.bulk_import_adms(&raw)?)?);
    }
    if let Some(path) = flag_value(args, "--import-agents") {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        summary.insert("import_agents".into(), serde_json::to_value(engine.bulk_import_agents(&raw)?)?);
    }
    if let Some(strategy) = flag_value(args, "--auto-assign") {
        let strategy: Strategy = strategy.parse().map_err(anyhow::Error::msg)?;
        summary.insert("auto_assign".into(), serde_json::to_value(engine.run_auto_assign(strategy)?)?);
    }
    if args.iter().any(|a| a == "--rebalance") {
        summary.insert("rebalance".into(), serde_json::to_value(engine.run_rebalance()?)?);
    }
    summary.insert("stats".into(), serde_json::to_value(engine.assignment_stats()?)?);

    println!("{}", serde_json::to_string_pretty(&Value::Object(summary))?);
    Ok(())
}

fn run_ipc_loop(engine: &RosterEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                writeln!(stdout, "{}", json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };
        if matches!(request, IpcRequest::Quit) {
            break;
        }

        let response = match handle_request(engine, request) {
            Ok(value) => json!({ "ok": value }),
            Err(e) => {
                log::warn!("request failed: {e}");
                json!({ "error": e.to_string() })
            }
        };
        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_request(engine: &RosterEngine, request: IpcRequest) -> AdmResult<Value> {
    let value = match request {
        IpcRequest::ListAgents => serde_json::to_value(engine.list_agents()?)?,
        IpcRequest::ListUnassignedAgents => serde_json::to_value(engine.list_unassigned_agents()?)?,
        IpcRequest::ListAgentsForAdm { adm_id } => {
            serde_json::to_value(engine.list_agents_for_adm(adm_id)?)?
        }
        IpcRequest::ListAdms => serde_json::to_value(engine.list_adms()?)?,
        IpcRequest::GetAgent { agent_id } => serde_json::to_value(engine.get_agent(agent_id)?)?,
        IpcRequest::GetAdm { adm_id } => serde_json::to_value(engine.get_adm(adm_id)?)?,
        IpcRequest::CreateAgent { agent } => serde_json::to_value(engine.create_agent(&agent)?)?,
        IpcRequest::CreateAdm { adm } => serde_json::to_value(engine.create_adm(&adm)?)?,
        IpcRequest::SetAdmCapacity { adm_id, max_capacity } => {
            serde_json::to_value(engine.set_adm_capacity(adm_id, max_capacity)?)?
        }
        IpcRequest::RunAutoAssign { strategy } => {
            serde_json::to_value(engine.run_auto_assign(strategy)?)?
        }
        IpcRequest::RunRebalance => serde_json::to_value(engine.run_rebalance()?)?,
        IpcRequest::AssignAgent { agent_id, adm_id } => {
            serde_json::to_value(engine.assign_agent(agent_id, adm_id)?)?
        }
        IpcRequest::UnassignAgent { agent_id } => {
            serde_json::to_value(engine.unassign_agent(agent_id)?)?
        }
        IpcRequest::BulkImportAgents { raw } => serde_json::to_value(engine.bulk_import_agents(&raw)?)?,
        IpcRequest::BulkImportAdms { raw } => serde_json::to_value(engine.bulk_import_adms(&raw)?)?,
        IpcRequest::GetAssignmentStats => serde_json::to_value(engine.assignment_stats()?)?,
        IpcRequest::SeedDemo { seed, agent_count } => {
            serde_json::to_value(seed_demo_roster(engine, seed, agent_count)?)?
        }
        IpcRequest::Quit => Value::Null,
    };
    Ok(value)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
