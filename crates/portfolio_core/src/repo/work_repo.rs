//! SQLite implementation of `WorkRepository`.

use super::category_repo::ensure_changed;
use super::store::SqliteRepository;
use super::{Entity, RepoResult, WorkRepository};
use crate::model::work::{ImageFields, Work, WorkFields, WorkImage};
use crate::model::RecordId;
use rusqlite::{params, Connection, Row};

const WORK_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    category,
    year
FROM works";

const IMAGE_SELECT_SQL: &str = "SELECT id, url, description, work_id FROM work_images";

impl WorkRepository for SqliteRepository<'_> {
    fn list_works(&self) -> RepoResult<Vec<Work>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{WORK_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut works = Vec::new();
        while let Some(row) = rows.next()? {
            works.push(parse_work_row(self.conn, row)?);
        }
        Ok(works)
    }

    fn get_work(&self, id: RecordId) -> RepoResult<Option<Work>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{WORK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_work_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn insert_work(&self, fields: &WorkFields) -> RepoResult<RecordId> {
        self.conn.execute(
            "INSERT INTO works (title, description, category, year)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                fields.title,
                fields.description,
                fields.category,
                fields.year
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_work(&self, id: RecordId, fields: &WorkFields) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE works
             SET title = ?2,
                 description = ?3,
                 category = ?4,
                 year = ?5
             WHERE id = ?1;",
            params![
                id,
                fields.title,
                fields.description,
                fields.category,
                fields.year
            ],
        )?;
        ensure_changed(changed, Entity::Work, id)
    }

    fn delete_work(&self, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM works WHERE id = ?1;", [id])?;
        ensure_changed(changed, Entity::Work, id)
    }

    fn insert_image(&self, work_id: RecordId, fields: &ImageFields) -> RepoResult<RecordId> {
        self.conn.execute(
            "INSERT INTO work_images (work_id, url, description) VALUES (?1, ?2, ?3);",
            params![work_id, fields.url, fields.description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_image(&self, id: RecordId, fields: &ImageFields) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE work_images
             SET url = ?2,
                 description = ?3
             WHERE id = ?1;",
            params![id, fields.url, fields.description],
        )?;
        ensure_changed(changed, Entity::WorkImage, id)
    }

    fn delete_image(&self, id: RecordId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM work_images WHERE id = ?1;", [id])?;
        ensure_changed(changed, Entity::WorkImage, id)
    }

    fn delete_images_of(&self, work_id: RecordId) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM work_images WHERE work_id = ?1;", [work_id])?;
        Ok(removed)
    }

    fn list_image_urls(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM work_images;")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }
}

fn parse_work_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Work> {
    let id: RecordId = row.get("id")?;
    Ok(Work {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        category: row.get("category")?,
        year: row.get("year")?,
        images: load_images(conn, id)?,
    })
}

fn load_images(conn: &Connection, work_id: RecordId) -> RepoResult<Vec<WorkImage>> {
    let mut stmt = conn.prepare(&format!(
        "{IMAGE_SELECT_SQL} WHERE work_id = ?1 ORDER BY id ASC;"
    ))?;
    let mut rows = stmt.query([work_id])?;
    let mut images = Vec::new();
    while let Some(row) = rows.next()? {
        images.push(WorkImage {
            id: row.get("id")?,
            url: row.get("url")?,
            description: row.get("description")?,
            work_id: row.get("work_id")?,
        });
    }
    Ok(images)
}
