use super::{now_text, timestamp_col, RosterStore};
use crate::{
    error::AdmResult,
    roster::{AgentRecord, LifecycleState, NewAgent},
    types::{AdmId, AgentId},
};
use rusqlite::{params, types::Type, OptionalExtension, Params};

const AGENT_COLUMNS: &str = "id, name, phone, email, location, state, language, lifecycle_state,
     dormancy_reason, assigned_adm_id, license_number, specialization, created_at, updated_at";

// Helper function for mapping agent rows
fn agent_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgentRecord> {
    let lifecycle: String = row.get(7)?;
    Ok(AgentRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        location: row.get(4)?,
        state: row.get(5)?,
        language: row.get(6)?,
        lifecycle_state: lifecycle
            .parse::<LifecycleState>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, e.into()))?,
        dormancy_reason: row.get(8)?,
        assigned_adm_id: row.get(9)?,
        license_number: row.get(10)?,
        specialization: row.get(11)?,
        created_at: timestamp_col(row, 12)?,
        updated_at: timestamp_col(row, 13)?,
    })
}

impl RosterStore {
    // ── Agent ──────────────────────────────────────────────────────

    pub fn insert_agent(&self, a: &NewAgent) -> AdmResult<AgentId> {
        let now = now_text();
        self.conn.execute(
            "INSERT INTO agent (
                name, phone, email, location, state, language, lifecycle_state,
                dormancy_reason, assigned_adm_id, license_number, specialization,
                created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
            params![
                &a.name,
                &a.phone,
                a.email.as_deref(),
                &a.location,
                a.state.as_deref(),
                &a.language,
                a.lifecycle_state.as_str(),
                a.dormancy_reason.as_deref(),
                a.assigned_adm_id,
                a.license_number.as_deref(),
                a.specialization.as_deref(),
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_agent(&self, agent_id: AgentId) -> AdmResult<Option<AgentRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agent WHERE id = ?1"),
                params![agent_id],
                agent_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Every agent, ascending id.
    pub fn all_agents(&self) -> AdmResult<Vec<AgentRecord>> {
        self.query_agents("ORDER BY id ASC", [])
    }

    pub fn unassigned_agents(&self) -> AdmResult<Vec<AgentRecord>> {
        self.query_agents("WHERE assigned_adm_id IS NULL ORDER BY id ASC", [])
    }

    pub fn agents_for_adm(&self, adm_id: AdmId) -> AdmResult<Vec<AgentRecord>> {
        self.query_agents("WHERE assigned_adm_id = ?1 ORDER BY id ASC", params![adm_id])
    }

    fn query_agents<P: Params>(&self, tail: &str, params: P) -> AdmResult<Vec<AgentRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {AGENT_COLUMNS} FROM agent {tail}"))?;
        let rows = stmt.query_map(params, agent_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Unconditional set or clear. Returns rows changed (0 = no such agent).
    pub fn set_agent_adm(&self, agent_id: AgentId, adm_id: Option<AdmId>) -> AdmResult<usize> {
        let changed = self.conn.execute(
            "UPDATE agent SET assigned_adm_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![adm_id, now_text(), agent_id],
        )?;
        Ok(changed)
    }

    /// Assign only if the agent is still unassigned. Returns rows changed.
    pub fn assign_if_unassigned(&self, agent_id: AgentId, adm_id: AdmId) -> AdmResult<usize> {
        let changed = self.conn.execute(
            "UPDATE agent SET assigned_adm_id = ?1, updated_at = ?2
             WHERE id = ?3 AND assigned_adm_id IS NULL",
            params![adm_id, now_text(), agent_id],
        )?;
        Ok(changed)
    }

    /// Move only if the agent is still on `from`. Returns rows changed.
    pub fn move_agent(&self, agent_id: AgentId, from: AdmId, to: AdmId) -> AdmResult<usize> {
        let changed = self.conn.execute(
            "UPDATE agent SET assigned_adm_id = ?1, updated_at = ?2
             WHERE id = ?3 AND assigned_adm_id = ?4",
            params![to, now_text(), agent_id, from],
        )?;
        Ok(changed)
    }

    pub fn agent_count(&self) -> AdmResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM agent", [], |row| row.get(0))
            .map_err(Into::into)
    }
}
