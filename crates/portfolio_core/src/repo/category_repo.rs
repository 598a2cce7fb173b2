//! SQLite implementation of `CategoryRepository`.
//!
//! # Invariants
//! - Skills are always loaded in ascending id order.
//! - `category_id` is taken from the call argument, never from field data.

use super::store::SqliteRepository;
use super::{CategoryRepository, Entity, RepoError, RepoResult};
use crate::model::category::{Category, CategoryFields, Skill, SkillFields};
use crate::model::RecordId;
use rusqlite::{params, Connection, Row};

const CATEGORY_SELECT_SQL: &str = "SELECT id, name, description FROM skill_categories";

const SKILL_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    proficiency,
    category_id
FROM skills";

impl CategoryRepository for SqliteRepository<'_> {
    fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CATEGORY_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(self.conn, row)?);
        }
        Ok(categories)
    }

    fn get_category(&self, id: RecordId) -> RepoResult<Option<Category>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CATEGORY_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_category_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn insert_category(&self, fields: &CategoryFields) -> RepoResult<RecordId> {
        self.conn.execute(
            "INSERT INTO skill_categories (name, description) VALUES (?1, ?2);",
            params![fields.name, fields.description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_category(&self, id: RecordId, fields: &CategoryFields) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE skill_categories
             SET name = ?2,
                 description = ?3
             WHERE id = ?1;",
            params![id, fields.name, fields.description],
        )?;
        ensure_changed(changed, Entity::Category, id)
    }

    fn delete_category(&self, id: RecordId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM skill_categories WHERE id = ?1;", [id])?;
        ensure_changed(changed, Entity::Category, id)
    }

    fn insert_skill(&self, category_id: RecordId, fields: &SkillFields) -> RepoResult<RecordId> {
        self.conn.execute(
            "INSERT INTO skills (category_id, name, description, proficiency)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                category_id,
                fields.name,
                fields.description,
                fields.proficiency
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_skill(&self, id: RecordId, fields: &SkillFields) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE skills
             SET name = ?2,
                 description = ?3,
                 proficiency = ?4
             WHERE id = ?1;",
            params![id, fields.name, fields.description, fields.proficiency],
        )?;
        ensure_changed(changed, Entity::Skill, id)
    }

    fn delete_skill(&self, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM skills WHERE id = ?1;", [id])?;
        ensure_changed(changed, Entity::Skill, id)
    }

    fn delete_skills_of(&self, category_id: RecordId) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM skills WHERE category_id = ?1;", [category_id])?;
        Ok(removed)
    }
}

pub(super) fn ensure_changed(changed: usize, entity: Entity, id: RecordId) -> RepoResult<()> {
    if changed == 0 {
        return Err(RepoError::NotFound { entity, id });
    }
    Ok(())
}

fn parse_category_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Category> {
    let id: RecordId = row.get("id")?;
    Ok(Category {
        id,
        name: row.get("name")?,
        description: row.get("description")?,
        skills: load_skills(conn, id)?,
    })
}

fn load_skills(conn: &Connection, category_id: RecordId) -> RepoResult<Vec<Skill>> {
    let mut stmt = conn.prepare(&format!(
        "{SKILL_SELECT_SQL} WHERE category_id = ?1 ORDER BY id ASC;"
    ))?;
    let mut rows = stmt.query([category_id])?;
    let mut skills = Vec::new();
    while let Some(row) = rows.next()? {
        skills.push(parse_skill_row(row)?);
    }
    Ok(skills)
}

fn parse_skill_row(row: &Row<'_>) -> RepoResult<Skill> {
    Ok(Skill {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        proficiency: row.get("proficiency")?,
        category_id: row.get("category_id")?,
    })
}

