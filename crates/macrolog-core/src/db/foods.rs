//! Food record database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{FoodChangeAction, FoodHistoryEntry, FoodOrigin, FoodRecord, MacroNutrients};
use crate::store::FoodStore;
use crate::units::Unit;

const FOOD_COLUMNS: &str = r#"
    canonical_name, display_name, aliases, category, unit,
    calories, protein_g, carbs_g, fat_g, fiber_g, sugar_g, sodium_mg,
    cholesterol_mg, saturated_fat_g, trans_fat_g,
    preparation_style, default_portion, source, source_id, origin,
    verified, confidence, access_count, last_accessed, deleted
"#;

fn row_to_food(row: &Row) -> rusqlite::Result<FoodRecord> {
    let aliases: String = row.get(2)?;
    let unit: String = row.get(4)?;
    let origin: String = row.get(19)?;
    let access_count: i64 = row.get(22)?;
    let last_accessed: Option<String> = row.get(23)?;

    Ok(FoodRecord {
        canonical_name: row.get(0)?,
        display_name: row.get(1)?,
        aliases: serde_json::from_str(&aliases).unwrap_or_default(),
        category: row.get(3)?,
        unit: Unit::parse(&unit),
        macros: MacroNutrients {
            calories: row.get(5)?,
            protein_g: row.get(6)?,
            carbs_g: row.get(7)?,
            fat_g: row.get(8)?,
            fiber_g: row.get(9)?,
            sugar_g: row.get(10)?,
            sodium_mg: row.get(11)?,
            cholesterol_mg: row.get(12)?,
            saturated_fat_g: row.get(13)?,
            trans_fat_g: row.get(14)?,
        },
        preparation_style: row.get(15)?,
        default_portion: row.get(16)?,
        source: row.get(17)?,
        source_id: row.get(18)?,
        origin: origin.parse().unwrap_or(FoodOrigin::Seed),
        verified: row.get(20)?,
        confidence: row.get(21)?,
        access_count: access_count.max(0) as u64,
        last_accessed: last_accessed.map(|s| parse_datetime(&s)),
        deleted: row.get(24)?,
    })
}

/// Author recorded for rows written by `seed_foods`
const SEED_AUTHOR: &str = "seed";

/// Row id and current state of a food record
fn load_food(conn: &Connection, canonical_name: &str) -> rusqlite::Result<Option<(i64, FoodRecord)>> {
    let sql = format!(
        "SELECT {}, id FROM food_records WHERE canonical_name = ?",
        FOOD_COLUMNS
    );
    conn.query_row(&sql, params![canonical_name], |row| {
        Ok((row.get(25)?, row_to_food(row)?))
    })
    .optional()
}

fn not_found(canonical_name: &str) -> Error {
    Error::NotFound(format!("Food record {}", canonical_name))
}

/// Append one audit row
fn log_change(
    conn: &Connection,
    food_id: i64,
    action: FoodChangeAction,
    old_value: Option<&FoodRecord>,
    new_value: Option<&FoodRecord>,
    changed_by: &str,
    reason: Option<&str>,
) -> Result<()> {
    let old_value = old_value.map(serde_json::to_string).transpose()?;
    let new_value = new_value.map(serde_json::to_string).transpose()?;

    conn.execute(
        r#"
        INSERT INTO food_record_history (
            food_id, action, old_value, new_value, changed_by, reason, changed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            food_id,
            action.as_str(),
            old_value,
            new_value,
            changed_by,
            reason,
            format_datetime(&Utc::now()),
        ],
    )?;
    Ok(())
}

fn json_column(row: &Row, idx: usize) -> rusqlite::Result<Option<FoodRecord>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_history(row: &Row) -> rusqlite::Result<FoodHistoryEntry> {
    let action: String = row.get(2)?;
    let action = action.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into())
    })?;
    let changed_at: String = row.get(7)?;

    Ok(FoodHistoryEntry {
        id: row.get(0)?,
        canonical_name: row.get(1)?,
        action,
        old_value: json_column(row, 3)?,
        new_value: json_column(row, 4)?,
        changed_by: row.get(5)?,
        reason: row.get(6)?,
        changed_at: parse_datetime(&changed_at),
    })
}

impl Database {
    /// Insert a food record, or replace the stored one with the same canonical name
    ///
    /// Access bookkeeping is preserved on update. The change is recorded in
    /// the record's history under `changed_by`.
    pub fn upsert_food(&self, record: &FoodRecord, changed_by: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let aliases = serde_json::to_string(&record.aliases)?;
        let m = &record.macros;

        let old = load_food(&tx, &record.canonical_name)?;
        tx.execute(
            r#"
            INSERT INTO food_records (
                canonical_name, display_name, aliases, category, unit,
                calories, protein_g, carbs_g, fat_g, fiber_g, sugar_g, sodium_mg,
                cholesterol_mg, saturated_fat_g, trans_fat_g,
                preparation_style, default_portion, source, source_id, origin,
                verified, confidence, deleted
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(canonical_name) DO UPDATE SET
                display_name = excluded.display_name,
                aliases = excluded.aliases,
                category = excluded.category,
                unit = excluded.unit,
                calories = excluded.calories,
                protein_g = excluded.protein_g,
                carbs_g = excluded.carbs_g,
                fat_g = excluded.fat_g,
                fiber_g = excluded.fiber_g,
                sugar_g = excluded.sugar_g,
                sodium_mg = excluded.sodium_mg,
                cholesterol_mg = excluded.cholesterol_mg,
                saturated_fat_g = excluded.saturated_fat_g,
                trans_fat_g = excluded.trans_fat_g,
                preparation_style = excluded.preparation_style,
                default_portion = excluded.default_portion,
                source = excluded.source,
                source_id = excluded.source_id,
                origin = excluded.origin,
                verified = excluded.verified,
                confidence = excluded.confidence,
                deleted = excluded.deleted,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![
                record.canonical_name,
                record.display_name,
                aliases,
                record.category,
                record.unit.as_str(),
                m.calories,
                m.protein_g,
                m.carbs_g,
                m.fat_g,
                m.fiber_g,
                m.sugar_g,
                m.sodium_mg,
                m.cholesterol_mg,
                m.saturated_fat_g,
                m.trans_fat_g,
                record.preparation_style,
                record.default_portion,
                record.source,
                record.source_id,
                record.origin.as_str(),
                record.verified,
                record.confidence,
                record.deleted,
            ],
        )?;

        let (food_id, new) =
            load_food(&tx, &record.canonical_name)?.ok_or_else(|| not_found(&record.canonical_name))?;
        let action = if old.is_some() {
            FoodChangeAction::Updated
        } else {
            FoodChangeAction::Created
        };
        log_change(
            &tx,
            food_id,
            action,
            old.as_ref().map(|(_, previous)| previous),
            Some(&new),
            changed_by,
            None,
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Insert seed records, leaving existing rows untouched
    ///
    /// Returns the number of records actually inserted; each one gets a
    /// `created` history row.
    pub fn seed_foods(&self, records: &[FoodRecord]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO food_records (
                    canonical_name, display_name, aliases, category, unit,
                    calories, protein_g, carbs_g, fat_g, fiber_g, sugar_g, sodium_mg,
                    cholesterol_mg, saturated_fat_g, trans_fat_g,
                    preparation_style, default_portion, source, source_id, origin,
                    verified, confidence
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(canonical_name) DO NOTHING
                "#,
            )?;

            for record in records {
                let aliases = serde_json::to_string(&record.aliases)?;
                let m = &record.macros;
                let changed = stmt.execute(params![
                    record.canonical_name,
                    record.display_name,
                    aliases,
                    record.category,
                    record.unit.as_str(),
                    m.calories,
                    m.protein_g,
                    m.carbs_g,
                    m.fat_g,
                    m.fiber_g,
                    m.sugar_g,
                    m.sodium_mg,
                    m.cholesterol_mg,
                    m.saturated_fat_g,
                    m.trans_fat_g,
                    record.preparation_style,
                    record.default_portion,
                    record.source,
                    record.source_id,
                    record.origin.as_str(),
                    record.verified,
                    record.confidence,
                ])?;
                if changed > 0 {
                    log_change(
                        &tx,
                        tx.last_insert_rowid(),
                        FoodChangeAction::Created,
                        None,
                        Some(record),
                        SEED_AUTHOR,
                        None,
                    )?;
                    inserted += changed;
                }
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    pub fn get_food(&self, canonical_name: &str) -> Result<Option<FoodRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM food_records WHERE canonical_name = ?",
            FOOD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![canonical_name], row_to_food)?;
        let record = rows.next().transpose()?;
        Ok(record)
    }

    /// Every food record in insertion order, including soft-deleted ones
    pub fn all_foods(&self) -> Result<Vec<FoodRecord>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM food_records ORDER BY id", FOOD_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let foods = stmt
            .query_map([], row_to_food)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    /// Live food records, most accessed first
    pub fn list_foods(&self, limit: usize) -> Result<Vec<FoodRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM food_records
            WHERE deleted = 0
            ORDER BY access_count DESC, canonical_name
            LIMIT ?
            "#,
            FOOD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let foods = stmt
            .query_map(params![limit as i64], row_to_food)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    /// Unverified records an admin should look at
    ///
    /// AI-generated, low confidence, or heavily used; most accessed first.
    pub fn review_queue(&self, limit: usize) -> Result<Vec<FoodRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM food_records
            WHERE verified = 0 AND deleted = 0
              AND (origin = 'ai' OR confidence < 0.8 OR access_count > 100)
            ORDER BY access_count DESC, canonical_name
            LIMIT ?
            "#,
            FOOD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let foods = stmt
            .query_map(params![limit as i64], row_to_food)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    /// Mark a record verified with full confidence
    pub fn verify_food(&self, canonical_name: &str, changed_by: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let (food_id, old) = load_food(&tx, canonical_name)?.ok_or_else(|| not_found(canonical_name))?;

        tx.execute(
            r#"
            UPDATE food_records
            SET verified = 1, confidence = 1.0, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![food_id],
        )?;

        let new = FoodRecord {
            verified: true,
            confidence: 1.0,
            ..old.clone()
        };
        log_change(
            &tx,
            food_id,
            FoodChangeAction::Verified,
            Some(&old),
            Some(&new),
            changed_by,
            None,
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Mark a record deleted; rows are never removed
    pub fn soft_delete_food(
        &self,
        canonical_name: &str,
        changed_by: &str,
        reason: Option<&str>,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let (food_id, old) = load_food(&tx, canonical_name)?.ok_or_else(|| not_found(canonical_name))?;

        tx.execute(
            r#"
            UPDATE food_records
            SET deleted = 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![food_id],
        )?;
        log_change(
            &tx,
            food_id,
            FoodChangeAction::Deleted,
            Some(&old),
            None,
            changed_by,
            reason,
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Audit trail of a food record, newest first
    pub fn food_history(&self, canonical_name: &str, limit: usize) -> Result<Vec<FoodHistoryEntry>> {
        let conn = self.conn()?;
        let (food_id, _) = load_food(&conn, canonical_name)?.ok_or_else(|| not_found(canonical_name))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT h.id, f.canonical_name, h.action, h.old_value, h.new_value,
                   h.changed_by, h.reason, h.changed_at
            FROM food_record_history h
            JOIN food_records f ON f.id = h.food_id
            WHERE h.food_id = ?
            ORDER BY h.id DESC
            LIMIT ?
            "#,
        )?;
        let entries = stmt
            .query_map(params![food_id, limit as i64], row_to_history)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn record_food_access(&self, canonical_name: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE food_records
            SET access_count = access_count + 1, last_accessed = ?
            WHERE canonical_name = ?
            "#,
            params![format_datetime(&at), canonical_name],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Food record {}", canonical_name)));
        }
        Ok(())
    }
}

#[async_trait]
impl FoodStore for Database {
    async fn load_food_records(&self) -> Result<Vec<FoodRecord>> {
        self.all_foods()
    }

    async fn record_access(&self, canonical_name: &str, at: DateTime<Utc>) -> Result<()> {
        self.record_food_access(canonical_name, at)
    }
}
