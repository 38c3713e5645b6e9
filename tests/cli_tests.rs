use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SCHEMA: &str = r#"
types:
  - name: Owner
    fields: [name]
  - name: Pet
    fields: [name, age, owner_id]
    relationships:
      - foreign_key: owner_id
"#;

fn revtrail(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("revtrail").unwrap();
    cmd.env("REVTRAIL_DATA_DIR", data_dir.path())
        .env_remove("REVTRAIL_ACTOR")
        .env_remove("RUST_LOG");
    cmd
}

fn record(data_dir: &TempDir, args: &[&str]) {
    revtrail(data_dir)
        .args(["audit", "record"])
        .args(args)
        .assert()
        .success();
}

fn seeded() -> TempDir {
    let data_dir = TempDir::new().unwrap();
    std::fs::write(data_dir.path().join("schema.yaml"), SCHEMA).unwrap();

    record(
        &data_dir,
        &["Owner", "7", "-a", "create", "-c", r#"{"name":"Alice"}"#, "--actor", "alice"],
    );
    record(
        &data_dir,
        &[
            "Pet",
            "1",
            "-a",
            "create",
            "-c",
            r#"{"name":"Rex","age":3,"owner_id":7}"#,
            "--actor",
            "alice",
        ],
    );
    record(
        &data_dir,
        &["Pet", "1", "-c", r#"{"name":["Rex","Max"]}"#, "--actor", "bob"],
    );
    data_dir
}

#[test]
fn test_init_creates_files() {
    let data_dir = TempDir::new().unwrap();

    revtrail(&data_dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialization complete!"));

    assert!(data_dir.path().join("config.json").exists());
    assert!(data_dir.path().join("schema.yaml").exists());
}

#[test]
fn test_record_assigns_versions() {
    let data_dir = TempDir::new().unwrap();

    revtrail(&data_dir)
        .args(["audit", "record", "Pet", "1", "-a", "create", "-c", r#"{"name":"Rex"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded create of Pet#1 as version 1"));

    revtrail(&data_dir)
        .args(["audit", "record", "Pet", "1", "-c", r#"{"name":["Rex","Max"]}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("as version 2"));

    let log = std::fs::read_to_string(data_dir.path().join("audits.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 2);
}

#[test]
fn test_record_rejects_bad_input() {
    let data_dir = TempDir::new().unwrap();

    revtrail(&data_dir)
        .args(["audit", "record", "Pet", "1", "-a", "delete"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid action"));

    revtrail(&data_dir)
        .args(["audit", "record", "Pet", "1", "-c", "not json"])
        .assert()
        .failure();

    revtrail(&data_dir)
        .args(["audit", "record", "Pet", "1", "--associated", "nonsense"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected TYPE#ID"));
}

#[test]
fn test_history_lists_versions() {
    let data_dir = seeded();

    revtrail(&data_dir)
        .args(["audit", "history", "Pet", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("History of Pet#1"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("bob"));

    revtrail(&data_dir)
        .args(["audit", "history", "Pet", "1", "--action", "update"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice").not());
}

#[test]
fn test_show_renders_resolved_owner() {
    let data_dir = seeded();

    revtrail(&data_dir)
        .args(["audit", "show", "Pet", "1", "1", "--summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice Added Pet"))
        .stdout(predicate::str::contains("Alice"));

    revtrail(&data_dir)
        .args(["audit", "show", "Pet", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bob Updated Pet"))
        .stdout(predicate::str::contains("Max"));

    revtrail(&data_dir)
        .args(["audit", "show", "Pet", "1", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_revision_show_by_version() {
    let data_dir = seeded();

    revtrail(&data_dir)
        .args(["revision", "show", "Pet", "1", "--version", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rex"))
        .stdout(predicate::str::contains("Max").not());

    revtrail(&data_dir)
        .args(["revision", "show", "Pet", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Max"));
}

#[test]
fn test_revision_list_for_untracked_type() {
    let data_dir = TempDir::new().unwrap();
    record(&data_dir, &["Gadget", "g-1", "-a", "create", "-c", r#"{"color":"red"}"#]);
    record(&data_dir, &["Gadget", "g-1", "-c", r#"{"color":["red","blue"]}"#]);

    revtrail(&data_dir)
        .args(["revision", "list", "Gadget", "g-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Gadget#g-1 at version 1"))
        .stdout(predicate::str::contains("Gadget#g-1 at version 2"))
        .stdout(predicate::str::contains("blue"));
}

#[test]
fn test_deleted_associations() {
    let data_dir = seeded();
    record(
        &data_dir,
        &["Pet", "2", "-a", "create", "-c", r#"{"name":"Tom","owner_id":7}"#],
    );
    record(
        &data_dir,
        &["Pet", "2", "-a", "destroy", "-c", r#"{"name":"Tom","owner_id":7}"#],
    );

    revtrail(&data_dir)
        .args(["audit", "deleted", "Owner", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pet#2"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("Pet#1").not());

    revtrail(&data_dir)
        .args(["audit", "deleted", "Owner", "8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No destroyed entities"));
}

#[test]
fn test_types_lists_schema() {
    let data_dir = seeded();

    revtrail(&data_dir)
        .args(["audit", "types"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Owner"))
        .stdout(predicate::str::contains("Pet"));
}

#[test]
fn test_export_formats() {
    let data_dir = seeded();
    let json_path = data_dir.path().join("out.json");
    let csv_path = data_dir.path().join("pet.csv");

    revtrail(&data_dir)
        .args(["export", "all"])
        .arg(&json_path)
        .args(["--format", "json", "--pretty"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 3 audit records"));

    let json = std::fs::read_to_string(&json_path).unwrap();
    let export = revtrail::export::import_from_json(&json).unwrap();
    assert_eq!(export.metadata.record_count, 3);
    assert_eq!(export.metadata.entity_count, 2);

    revtrail(&data_dir)
        .args(["export", "entity", "Pet", "1"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 versions of Pet#1"));

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 3);
}

#[test]
fn test_actor_from_environment() {
    let data_dir = TempDir::new().unwrap();

    revtrail(&data_dir)
        .env("REVTRAIL_ACTOR", "nightly-import")
        .args(["audit", "record", "Pet", "5", "-a", "create", "-c", r#"{"name":"Ivy"}"#])
        .assert()
        .success();

    revtrail(&data_dir)
        .args(["audit", "history", "Pet", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nightly-import"));
}

#[test]
fn test_record_array_value() {
    let data_dir = TempDir::new().unwrap();
    record(
        &data_dir,
        &["Gadget", "g-2", "-a", "create", "-c", r#"{"tags":{"$set":["a","b"]}}"#],
    );

    let log = std::fs::read_to_string(data_dir.path().join("audits.jsonl")).unwrap();
    assert!(log.contains(r#""tags":{"$set":["a","b"]}"#));

    revtrail(&data_dir)
        .args(["revision", "show", "Gadget", "g-2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"a\""))
        .stdout(predicate::str::contains("\"b\""));
}

#[test]
fn test_invalid_timestamp_format_reported() {
    let data_dir = seeded();
    std::fs::write(
        data_dir.path().join("config.json"),
        r#"{"timestamp_format": "%Q"}"#,
    )
    .unwrap();

    revtrail(&data_dir)
        .args(["audit", "history", "Pet", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid timestamp_format"));
}
