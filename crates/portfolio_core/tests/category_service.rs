use portfolio_core::repo::Entity;
use portfolio_core::{
    open_db_in_memory, CategoryDraft, CategoryService, ErrorKind, MemoryStore, ServiceError,
    SkillDraft, SqliteStore, Store,
};
use serde_json::json;

fn sqlite_service() -> CategoryService<SqliteStore> {
    let conn = open_db_in_memory().unwrap();
    CategoryService::new(SqliteStore::try_new(conn).unwrap())
}

fn memory_service() -> CategoryService<MemoryStore> {
    CategoryService::new(MemoryStore::new())
}

fn langs_with_go<S: Store>(service: &mut CategoryService<S>) -> (i64, i64) {
    let created = service
        .create(&CategoryDraft::new("Langs", "").with_skill(SkillDraft::new("Go", 80)))
        .unwrap();
    (created.id, created.skills[0].id)
}

fn check_update_keeps_identity_and_appends_new_skill<S: Store>(service: &mut CategoryService<S>) {
    let (category_id, go_id) = langs_with_go(service);

    let updated = service
        .update(
            category_id,
            &CategoryDraft::new("Langs", "")
                .with_skill(SkillDraft::existing(go_id, "Go", 90))
                .with_skill(SkillDraft::new("Rust", 70)),
        )
        .unwrap();

    assert_eq!(updated.skills.len(), 2);
    assert_eq!(updated.skills[0].id, go_id);
    assert_eq!(updated.skills[0].proficiency, 90);
    assert_eq!(updated.skills[1].name, "Rust");
    assert!(updated.skills[1].id > go_id);
    assert!(updated
        .skills
        .iter()
        .all(|skill| skill.category_id == category_id));
    assert_eq!(service.get(category_id).unwrap(), updated);
}

#[test]
fn update_keeps_identity_and_appends_new_skill_on_sqlite() {
    check_update_keeps_identity_and_appends_new_skill(&mut sqlite_service());
}

#[test]
fn update_keeps_identity_and_appends_new_skill_in_memory() {
    check_update_keeps_identity_and_appends_new_skill(&mut memory_service());
}

#[test]
fn create_assigns_ids_and_ignores_client_parent_links() {
    let mut service = sqlite_service();
    let draft: CategoryDraft = serde_json::from_value(json!({
        "id": 0,
        "name": "Tools",
        "description": "daily drivers",
        "skills": [
            { "id": 0, "name": "git", "proficiency": 95, "category_id": 999 },
            { "name": "vim", "description": "modal", "proficiency": 60 }
        ]
    }))
    .unwrap();

    let created = service.create(&draft).unwrap();

    assert_eq!(created.name, "Tools");
    assert_eq!(created.description, "daily drivers");
    assert_eq!(created.skills.len(), 2);
    assert!(created.skills[0].id > 0);
    assert!(created.skills[0].id < created.skills[1].id);
    assert!(created
        .skills
        .iter()
        .all(|skill| skill.category_id == created.id));
    assert_eq!(created.skills[1].description, "modal");
}

#[test]
fn empty_submission_deletes_every_skill() {
    let mut service = sqlite_service();
    let (category_id, _) = langs_with_go(&mut service);

    let updated = service
        .update(category_id, &CategoryDraft::new("Langs", "renamed"))
        .unwrap();

    assert!(updated.skills.is_empty());
    assert_eq!(updated.description, "renamed");
}

#[test]
fn only_new_skills_replace_the_collection() {
    let mut service = sqlite_service();
    let (category_id, go_id) = langs_with_go(&mut service);

    let updated = service
        .update(
            category_id,
            &CategoryDraft::new("Langs", "").with_skill(SkillDraft::new("Zig", 10)),
        )
        .unwrap();

    assert_eq!(updated.skills.len(), 1);
    assert_eq!(updated.skills[0].name, "Zig");
    assert_ne!(updated.skills[0].id, go_id);
}

#[test]
fn duplicate_ids_apply_last_write_and_keep_one_row() {
    let mut service = sqlite_service();
    let (category_id, go_id) = langs_with_go(&mut service);

    let updated = service
        .update(
            category_id,
            &CategoryDraft::new("Langs", "")
                .with_skill(SkillDraft::existing(go_id, "Go", 85))
                .with_skill(SkillDraft::existing(go_id, "Golang", 95)),
        )
        .unwrap();

    assert_eq!(updated.skills.len(), 1);
    assert_eq!(updated.skills[0].id, go_id);
    assert_eq!(updated.skills[0].name, "Golang");
    assert_eq!(updated.skills[0].proficiency, 95);
}

#[test]
fn unknown_category_is_not_found() {
    let mut service = sqlite_service();

    let err = service
        .update(77, &CategoryDraft::new("Ghost", ""))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound {
            entity: Entity::Category,
            id: 77
        }
    ));
    assert_eq!(service.get(77).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(service.delete(77).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn skill_id_from_another_category_is_rejected_without_writes() {
    let mut service = sqlite_service();
    let (langs_id, _) = langs_with_go(&mut service);
    let tools = service
        .create(&CategoryDraft::new("Tools", "").with_skill(SkillDraft::new("git", 90)))
        .unwrap();
    let foreign_id = tools.skills[0].id;
    let before = service.list().unwrap();

    let err = service
        .update(
            langs_id,
            &CategoryDraft::new("Renamed", "")
                .with_skill(SkillDraft::new("Rust", 70))
                .with_skill(SkillDraft::existing(foreign_id, "stolen", 1)),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(matches!(
        err,
        ServiceError::UnknownChild { child_id, .. } if child_id == foreign_id
    ));
    assert_eq!(service.list().unwrap(), before);
}

#[test]
fn mismatched_payload_id_is_bad_request() {
    let mut service = sqlite_service();
    let (category_id, _) = langs_with_go(&mut service);
    let mut draft = CategoryDraft::new("Langs", "");
    draft.id = Some(category_id + 1);

    let err = service.update(category_id, &draft).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[test]
fn delete_removes_skills_then_category() {
    let mut service = sqlite_service();
    let created = service
        .create(
            &CategoryDraft::new("Langs", "")
                .with_skill(SkillDraft::new("Go", 80))
                .with_skill(SkillDraft::new("Rust", 70)),
        )
        .unwrap();

    let report = service.delete(created.id).unwrap();

    assert_eq!(report.children_removed, 2);
    assert_eq!(report.files.attempted(), 0);
    assert!(service.list().unwrap().is_empty());
    let remaining_skills: i64 = service
        .store()
        .connection()
        .query_row("SELECT COUNT(*) FROM skills;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining_skills, 0);
}

#[test]
fn list_returns_categories_in_id_order() {
    let mut service = memory_service();
    service.create(&CategoryDraft::new("B", "")).unwrap();
    service.create(&CategoryDraft::new("A", "")).unwrap();

    let names: Vec<String> = service
        .list()
        .unwrap()
        .into_iter()
        .map(|category| category.name)
        .collect();
    assert_eq!(names, vec!["B", "A"]);
}
