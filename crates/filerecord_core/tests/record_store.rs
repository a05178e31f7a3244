use filerecord_core::{
    AttributeError, FileRecordRepository, IdAllocator, RawValue, RecordId, RecordRepository,
    RecordType, RepoError, ScanAllocator, Schema, SchemaError, SchemaRegistry, StoreConfig,
    SCHEMA_FILE_NAME,
};
use std::cell::Cell;
use std::fs;
use std::io;
use std::path::Path;
use std::rc::Rc;
use tempfile::TempDir;

const USER_SCHEMA: &str = "id:integer\nname:string\nage:integer\nscore:float\nbio:string\n";

fn setup(type_name: &str, schema: &str) -> (TempDir, StoreConfig, RecordType) {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path());
    let record_type = RecordType::new(type_name);
    let type_dir = config.ensure_type_dir(&record_type).unwrap();
    fs::write(type_dir.join(SCHEMA_FILE_NAME), schema).unwrap();
    (dir, config, record_type)
}

fn stored_names(config: &StoreConfig, record_type: &RecordType) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(config.type_dir(record_type))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

struct CountingAllocator {
    calls: Rc<Cell<usize>>,
}

impl IdAllocator for CountingAllocator {
    fn next_id(&self, dir: &Path) -> io::Result<RecordId> {
        self.calls.set(self.calls.get() + 1);
        ScanAllocator.next_id(dir)
    }
}

#[test]
fn save_then_find_roundtrips_every_field() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config, &registry);

    let tricky = "He said \"hi\" \\ then: left\nsecond line\ttab\r\n";
    let mut record = repo
        .build(
            &users,
            [
                ("name", RawValue::from(tricky)),
                ("age", RawValue::from(42_i64)),
                ("score", RawValue::from(-3.75)),
                ("bio", RawValue::from("x:y:z")),
            ],
        )
        .unwrap();
    assert!(record.is_new());

    repo.save(&mut record).unwrap();
    let id = record.id().expect("save assigns an id");
    let loaded = repo.find(&users, id).unwrap();

    assert_eq!(loaded.id(), Some(id));
    assert_eq!(loaded.get_str("name").unwrap(), Some(tricky));
    assert_eq!(loaded.get_int("age").unwrap(), Some(42));
    assert_eq!(loaded.get_float("score").unwrap(), Some(-3.75));
    assert_eq!(loaded.get_str("bio").unwrap(), Some("x:y:z"));
    assert_eq!(loaded.attributes(), record.attributes());
}

#[test]
fn stored_file_lists_fields_in_schema_order() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config.clone(), &registry);

    let mut record = repo
        .build(
            &users,
            [
                ("score", RawValue::from(1.0)),
                ("name", RawValue::from("Ann \"A\"")),
            ],
        )
        .unwrap();
    repo.save(&mut record).unwrap();

    let text = fs::read_to_string(config.record_path(&users, 1)).unwrap();
    assert_eq!(text, "id:\"1\"\nname:\"Ann \\\"A\\\"\"\nscore:\"1.0\"\n");
}

#[test]
fn first_record_in_empty_directory_gets_id_one() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config.clone(), &registry);

    let mut record = repo.build(&users, [("name", "first")]).unwrap();
    repo.save(&mut record).unwrap();

    assert_eq!(record.id(), Some(1));
    assert_eq!(record.get_int("id").unwrap(), Some(1));
    assert_eq!(stored_names(&config, &users), vec![".schema", "00000001"]);
}

#[test]
fn new_record_gets_max_plus_one_without_filling_gaps() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    for id in [1, 3, 5] {
        fs::write(config.record_path(&users, id), "name:\"existing\"\n").unwrap();
    }
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config.clone(), &registry);

    let mut record = repo.build(&users, [("name", "next")]).unwrap();
    repo.save(&mut record).unwrap();

    assert_eq!(record.id(), Some(6));
    assert!(config.record_path(&users, 6).exists());
    assert!(!config.record_path(&users, 2).exists());
}

#[test]
fn saving_record_with_id_overwrites_same_file_without_allocating() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    let calls = Rc::new(Cell::new(0));
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config.clone(), &registry).with_allocator(
        CountingAllocator {
            calls: Rc::clone(&calls),
        },
    );

    let mut record = repo.build(&users, [("name", "draft")]).unwrap();
    repo.save(&mut record).unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(record.id(), Some(1));

    record.set("name", "final").unwrap();
    repo.save(&mut record).unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(record.id(), Some(1));

    let mut found = repo.find(&users, 1).unwrap();
    assert_eq!(found.get_str("name").unwrap(), Some("final"));
    found.set("age", 30_i64).unwrap();
    repo.save(&mut found).unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(stored_names(&config, &users), vec![".schema", "00000001"]);
    assert_eq!(repo.find(&users, 1).unwrap().get_int("age").unwrap(), Some(30));
}

#[test]
fn id_supplied_at_construction_is_used_as_is() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    let calls = Rc::new(Cell::new(0));
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config.clone(), &registry).with_allocator(
        CountingAllocator {
            calls: Rc::clone(&calls),
        },
    );

    let mut record = repo
        .build(&users, [("id", "7"), ("name", "seven")])
        .unwrap();
    assert_eq!(record.id(), Some(7));
    repo.save(&mut record).unwrap();

    assert_eq!(calls.get(), 0);
    assert!(config.record_path(&users, 7).exists());
}

#[test]
fn assigned_identifier_cannot_change() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config, &registry);

    let mut record = repo.build(&users, [("name", "fixed")]).unwrap();
    repo.save(&mut record).unwrap();

    let err = record.set("id", 5_i64).unwrap_err();
    assert_eq!(
        err,
        AttributeError::IdentifierReassigned {
            current: 1,
            requested: Some("5".to_string()),
        }
    );
    assert!(record.unset("id").is_err());
    record.set("id", 1_i64).unwrap();
    assert_eq!(record.get_int("id").unwrap(), Some(1));
}

#[test]
fn unknown_input_keys_are_discarded() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config.clone(), &registry);

    let mut record = repo
        .build(&users, [("name", "Ann"), ("nickname", "ghost"), ("Name", "caps")])
        .unwrap();
    assert_eq!(
        record.get("nickname").unwrap_err(),
        AttributeError::UnknownField("nickname".to_string())
    );
    assert_eq!(record.get_str("name").unwrap(), Some("Ann"));
    let names: Vec<&str> = record.attributes().iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["id", "name", "age", "score", "bio"]);

    repo.save(&mut record).unwrap();
    let text = fs::read_to_string(config.record_path(&users, 1)).unwrap();
    assert!(!text.contains("nickname"));
    assert!(!text.contains("ghost"));
    assert!(!text.contains("caps"));
}

#[test]
fn missing_and_blank_fields_stay_absent_through_save_and_find() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config.clone(), &registry);

    let mut record = repo.build(&users, [("name", "Ann")]).unwrap();
    assert_eq!(record.get("age").unwrap(), None);

    record.set("age", 0_i64).unwrap();
    record.set("score", 0.0).unwrap();
    record.set("bio", "").unwrap();
    assert_eq!(record.get_int("age").unwrap(), Some(0));
    repo.save(&mut record).unwrap();

    let text = fs::read_to_string(config.record_path(&users, 1)).unwrap();
    assert_eq!(text, "id:\"1\"\nname:\"Ann\"\n");

    let loaded = repo.find(&users, 1).unwrap();
    assert_eq!(loaded.get("age").unwrap(), None);
    assert_eq!(loaded.get("score").unwrap(), None);
    assert_eq!(loaded.get("bio").unwrap(), None);
}

#[test]
fn find_missing_record_returns_not_found() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config, &registry);

    let err = repo.find(&users, 99).unwrap_err();
    assert!(matches!(
        err,
        RepoError::RecordNotFound { ref type_name, id: 99 } if type_name == "User"
    ));
}

#[test]
fn non_numeric_input_coerces_to_zero() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config, &registry);

    let mut record = repo
        .build(&users, [("age", "forty"), ("score", "n/a"), ("name", "x")])
        .unwrap();
    assert_eq!(record.get_int("age").unwrap(), Some(0));
    assert_eq!(record.get_float("score").unwrap(), Some(0.0));

    record.set("age", "12 years").unwrap();
    record.set("score", "9.5 points").unwrap();
    record.set("name", 12_i64).unwrap();
    assert_eq!(record.get_int("age").unwrap(), Some(12));
    assert_eq!(record.get_float("score").unwrap(), Some(9.5));
    assert_eq!(record.get_str("name").unwrap(), Some("12"));
}

#[test]
fn identifier_comes_from_path_not_file_contents() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    fs::write(config.record_path(&users, 3), "id:\"9\"\nname:\"moved\"\n").unwrap();
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config, &registry);

    let record = repo.find(&users, 3).unwrap();
    assert_eq!(record.id(), Some(3));
    assert_eq!(record.get_int("id").unwrap(), Some(3));
}

#[test]
fn schema_without_id_field_still_tracks_identifier() {
    let (_dir, config, notes) = setup("Note", "title:string\n");
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config.clone(), &registry);

    let mut record = repo.build(&notes, [("title", "hello"), ("id", "5")]).unwrap();
    assert!(record.is_new());
    repo.save(&mut record).unwrap();

    assert_eq!(record.id(), Some(1));
    let text = fs::read_to_string(config.record_path(&notes, 1)).unwrap();
    assert_eq!(text, "title:\"hello\"\n");
    assert_eq!(repo.find(&notes, 1).unwrap().id(), Some(1));
}

#[test]
fn custom_subdir_is_used_for_schema_and_records() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path());
    let people = RecordType::new("Person").with_subdir("people");
    let type_dir = config.ensure_type_dir(&people).unwrap();
    fs::write(type_dir.join(SCHEMA_FILE_NAME), "name:string\n").unwrap();
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config, &registry);

    let mut record = repo.build(&people, [("name", "Bo")]).unwrap();
    repo.save(&mut record).unwrap();

    assert!(dir.path().join("people").join("00000001").exists());
    assert!(!dir.path().join("person").exists());
}

#[test]
fn legacy_dump_escapes_are_readable() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    fs::write(
        config.record_path(&users, 4),
        "name:\"caf\\u00E9 \\#{tag}\"\n\nbio:\"a\\sb\"\n",
    )
    .unwrap();
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config, &registry);

    let record = repo.find(&users, 4).unwrap();
    assert_eq!(record.get_str("name").unwrap(), Some("café #{tag}"));
    assert_eq!(record.get_str("bio").unwrap(), Some("a b"));
}

#[test]
fn malformed_record_file_returns_invalid_data() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    fs::write(config.record_path(&users, 2), "name:\"ok\"\ngarbage\n").unwrap();
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config, &registry);

    let err = repo.find(&users, 2).unwrap_err();
    match err {
        RepoError::InvalidData { path, source } => {
            assert!(path.ends_with("00000002"));
            assert_eq!(source, filerecord_core::CodecError::MissingSeparator { line: 2 });
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_schema_fails_every_operation() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(StoreConfig::new(dir.path()), &registry);
    let ghosts = RecordType::new("Ghost");

    let built = repo.build(&ghosts, [("name", "boo")]);
    assert!(matches!(
        built,
        Err(RepoError::Schema(SchemaError::NotFound { .. }))
    ));
    assert!(matches!(
        repo.find(&ghosts, 1),
        Err(RepoError::Schema(SchemaError::NotFound { .. }))
    ));
}

#[test]
fn saving_into_missing_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SchemaRegistry::new();
    let schema = Schema::new([("name", filerecord_core::FieldType::String)]).unwrap();
    let config = StoreConfig::new(dir.path());
    let orphans = RecordType::new("Orphan");
    registry.register(&config, &orphans, schema).unwrap();
    let repo = FileRecordRepository::with_registry(config, &registry);

    let mut record = repo.build(&orphans, [("name", "lost")]).unwrap();
    let err = repo.save(&mut record).unwrap_err();
    assert!(matches!(err, RepoError::Io { .. }));
}

#[test]
fn repositories_on_different_roots_do_not_share_schemas() {
    let (_first_dir, first_config, first_type) = setup("SharedName", "name:string\n");
    let (_second_dir, second_config, second_type) = setup("SharedName", "title:string\n");
    let first_repo = FileRecordRepository::new(first_config);
    let second_repo = FileRecordRepository::new(second_config.clone());

    let first = first_repo.build(&first_type, [("name", "a")]).unwrap();
    assert_eq!(first.get_str("name").unwrap(), Some("a"));

    let mut second = second_repo
        .build(&second_type, [("title", "b"), ("name", "ignored")])
        .unwrap();
    assert_eq!(second.get_str("title").unwrap(), Some("b"));
    assert!(second.get("name").is_err());

    second_repo.save(&mut second).unwrap();
    let text = fs::read_to_string(second_config.record_path(&second_type, 1)).unwrap();
    assert_eq!(text, "title:\"b\"\n");
}

#[test]
fn blank_schema_file_yields_record_without_fields() {
    let (_dir, config, empties) = setup("Empty", "\n\n");
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config.clone(), &registry);

    let mut record = repo.build(&empties, [("name", "dropped")]).unwrap();
    assert!(record.schema().is_empty());
    repo.save(&mut record).unwrap();

    assert_eq!(fs::read_to_string(config.record_path(&empties, 1)).unwrap(), "");
    assert_eq!(repo.find(&empties, 1).unwrap().id(), Some(1));
}

#[test]
fn infinite_floats_survive_save_and_find() {
    let (_dir, config, users) = setup("User", USER_SCHEMA);
    let registry = SchemaRegistry::new();
    let repo = FileRecordRepository::with_registry(config, &registry);

    let mut up = repo.build(&users, [("score", f64::INFINITY)]).unwrap();
    let mut down = repo.build(&users, [("score", f64::NEG_INFINITY)]).unwrap();
    repo.save(&mut up).unwrap();
    repo.save(&mut down).unwrap();

    assert_eq!(
        repo.find(&users, 1).unwrap().get_float("score").unwrap(),
        Some(f64::INFINITY)
    );
    assert_eq!(
        repo.find(&users, 2).unwrap().get_float("score").unwrap(),
        Some(f64::NEG_INFINITY)
    );
}
