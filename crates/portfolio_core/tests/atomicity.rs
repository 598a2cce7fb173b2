use portfolio_core::{
    open_db_in_memory, CategoryDraft, CategoryService, ErrorKind, ImageDraft, MemoryStore,
    SkillDraft, SqliteStore, UploadStore, WorkDraft, WorkService,
};

fn store_with_triggers() -> SqliteStore {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_boom_skill
         BEFORE INSERT ON skills
         WHEN NEW.name = 'boom'
         BEGIN
             SELECT RAISE(ABORT, 'boom skill rejected');
         END;

         CREATE TRIGGER reject_locked_image_delete
         BEFORE DELETE ON work_images
         WHEN OLD.url = 'uploads/works/locked.png'
         BEGIN
             SELECT RAISE(ABORT, 'locked image');
         END;",
    )
    .unwrap();
    SqliteStore::try_new(conn).unwrap()
}

#[test]
fn failing_child_insert_rolls_back_parent_and_sibling_writes() {
    let mut service = CategoryService::new(store_with_triggers());
    let created = service
        .create(&CategoryDraft::new("Langs", "").with_skill(SkillDraft::new("Go", 80)))
        .unwrap();
    let go_id = created.skills[0].id;

    let err = service
        .update(
            created.id,
            &CategoryDraft::new("Renamed", "changed")
                .with_skill(SkillDraft::existing(go_id, "Go", 99))
                .with_skill(SkillDraft::new("Rust", 70))
                .with_skill(SkillDraft::new("boom", 1)),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(service.get(created.id).unwrap(), created);
}

#[test]
fn failing_create_leaves_no_parent_row() {
    let mut service = CategoryService::new(store_with_triggers());

    let err = service
        .create(
            &CategoryDraft::new("Doomed", "")
                .with_skill(SkillDraft::new("fine", 10))
                .with_skill(SkillDraft::new("boom", 1)),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert!(service.list().unwrap().is_empty());
}

#[test]
fn failing_child_delete_rolls_back_and_keeps_files() {
    let uploads = tempfile::tempdir().unwrap();
    let locked = uploads.path().join("works/locked.png");
    let other = uploads.path().join("works/other.png");
    std::fs::create_dir_all(locked.parent().unwrap()).unwrap();
    std::fs::write(&locked, b"a").unwrap();
    std::fs::write(&other, b"b").unwrap();

    let mut service = WorkService::new(
        store_with_triggers(),
        UploadStore::new(uploads.path(), "http://localhost:8080"),
    );
    let work = service
        .create(
            &WorkDraft::new("Site", "web", 2024)
                .with_image(ImageDraft::new("uploads/works/other.png"))
                .with_image(ImageDraft::new("uploads/works/locked.png")),
        )
        .unwrap();

    let err = service
        .update(work.id, &WorkDraft::new("Site", "web", 2024))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(service.get(work.id).unwrap(), work);
    assert!(other.exists());
    assert!(locked.exists());

    assert!(service.delete(work.id).is_err());
    assert_eq!(service.get(work.id).unwrap(), work);
    assert!(other.exists());
}

#[test]
fn memory_store_restores_every_table_after_a_mid_sequence_failure() {
    let mut service = CategoryService::new(MemoryStore::new());
    let created = service
        .create(
            &CategoryDraft::new("Langs", "")
                .with_skill(SkillDraft::new("Go", 80))
                .with_skill(SkillDraft::new("C", 50)),
        )
        .unwrap();
    let go_id = created.skills[0].id;

    for budget in 0..4 {
        service.store().fail_writes_after(budget);
        let result = service.update(
            created.id,
            &CategoryDraft::new("Renamed", "")
                .with_skill(SkillDraft::existing(go_id, "Go", 90))
                .with_skill(SkillDraft::new("Rust", 70)),
        );
        service.store().clear_write_budget();

        assert!(result.is_err(), "budget {budget} should fail");
        assert_eq!(service.get(created.id).unwrap(), created);
    }
}
