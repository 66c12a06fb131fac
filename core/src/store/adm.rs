use super::{now_text, timestamp_col, RosterStore};
use crate::{
    error::AdmResult,
    roster::{AdmRecord, NewAdm},
    types::AdmId,
};
use rusqlite::{params, OptionalExtension};

fn adm_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<AdmRecord> {
    Ok(AdmRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        region: row.get(4)?,
        language: row.get(5)?,
        max_capacity: row.get(6)?,
        created_at: timestamp_col(row, 7)?,
        updated_at: timestamp_col(row, 8)?,
    })
}

impl RosterStore {
    // ── ADM ────────────────────────────────────────────────────────

    pub fn insert_adm(&self, a: &NewAdm) -> AdmResult<AdmId> {
        let now = now_text();
        self.conn.execute(
            "INSERT INTO adm (
                name, phone, email, region, language, max_capacity, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                &a.name,
                &a.phone,
                a.email.as_deref(),
                &a.region,
                &a.language,
                a.max_capacity,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_adm(&self, adm_id: AdmId) -> AdmResult<Option<AdmRecord>> {
        self.conn
            .query_row(
                "SELECT id, name, phone, email, region, language, max_capacity,
                        created_at, updated_at
                 FROM adm WHERE id = ?1",
                params![adm_id],
                adm_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Every ADM, ascending id.
    pub fn all_adms(&self) -> AdmResult<Vec<AdmRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, phone, email, region, language, max_capacity,
                    created_at, updated_at
             FROM adm ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], adm_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn set_adm_capacity(&self, adm_id: AdmId, max_capacity: u32) -> AdmResult<usize> {
        let changed = self.conn.execute(
            "UPDATE adm SET max_capacity = ?1, updated_at = ?2 WHERE id = ?3",
            params![max_capacity, now_text(), adm_id],
        )?;
        Ok(changed)
    }
}
