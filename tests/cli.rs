use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Env {
    home: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            home: tempfile::tempdir().unwrap(),
        }
    }

    fn db(&self) -> String {
        self.home.path().join("taxon.db").to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("taxon").unwrap();
        cmd.env("HOME", self.home.path())
            .env_remove("RUST_LOG")
            .arg("--db")
            .arg(self.db());
        cmd
    }
}

#[test]
fn add_and_view_tree() {
    let env = Env::new();
    env.cmd().args(["add", "Electronics"]).assert().success();
    env.cmd()
        .args(["add", "Electronics", "Phones"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Phones"));
    env.cmd()
        .arg("tree")
        .assert()
        .success()
        .stdout("Category tree:\n- Electronics\n  - Phones\n");
}

#[test]
fn empty_tree_fails() {
    let env = Env::new();
    env.cmd()
        .arg("tree")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Category tree is empty"));
}

#[test]
fn duplicate_name_fails() {
    let env = Env::new();
    env.cmd().args(["add", "Books"]).assert().success();
    env.cmd()
        .args(["add", "Books"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn remove_cascades() {
    let env = Env::new();
    env.cmd().args(["add", "Root"]).assert().success();
    env.cmd().args(["add", "Root", "Child"]).assert().success();
    env.cmd().args(["add", "Other"]).assert().success();
    env.cmd()
        .args(["remove", "Root"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 categories"));
    env.cmd()
        .arg("tree")
        .assert()
        .success()
        .stdout("Category tree:\n- Other\n");
}

#[test]
fn export_and_reimport_csv() {
    let env = Env::new();
    let out = env.home.path().join("cats.csv");
    env.cmd().args(["add", "Parent"]).assert().success();
    env.cmd().args(["add", "Parent", "Child1"]).assert().success();
    env.cmd().args(["add", "Parent", "Child2"]).assert().success();
    env.cmd()
        .args(["export", "--format", "csv", "--output"])
        .arg(&out)
        .assert()
        .success();

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("id,name,parent_id\n"));

    env.cmd()
        .arg("import")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 created, 3 reused, 0 relinked"));
}

#[test]
fn import_invalid_row_reports_row_number() {
    let env = Env::new();
    let file = env.home.path().join("bad.csv");
    std::fs::write(&file, "id,name,parent_id\n1,Parent,\n5,X,invalid-token\n").unwrap();
    env.cmd()
        .arg("import")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid row 3"));
    env.cmd().arg("tree").assert().failure();
}

#[test]
fn run_command_boundary() {
    let env = Env::new();
    env.cmd()
        .args(["run", "/addElement", "Home Appliances"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<<Home Appliances>>"));
    env.cmd()
        .args(["run", "/viewTree"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Home Appliances"));
    env.cmd()
        .args(["run", "/bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown command"));
}

#[test]
fn run_download_writes_document() {
    let env = Env::new();
    let out = env.home.path().join("download.bin");
    env.cmd().args(["run", "/addElement", "Root"]).assert().success();
    env.cmd()
        .args(["run", "--output"])
        .arg(&out)
        .arg("/download")
        .assert()
        .success()
        .stdout(predicate::str::contains("saved to"));
    assert!(std::fs::metadata(&out).unwrap().len() > 0);
}

#[test]
fn run_without_tokens_is_usage_error() {
    let env = Env::new();
    env.cmd()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn init_runs_without_prompting() {
    let env = Env::new();
    let data = env.home.path().join("data");
    Command::cargo_bin("taxon")
        .unwrap()
        .env("HOME", env.home.path())
        .args(["init", "--data-dir"])
        .arg(&data)
        .assert()
        .success()
        .stdout(predicate::str::contains("(0 categories)"));
    assert!(data.join("taxon.db").exists());
    assert!(data.join("exports").is_dir());

    // Second run reuses the saved data dir.
    Command::cargo_bin("taxon")
        .unwrap()
        .env("HOME", env.home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains(data.to_string_lossy().to_string()));
}
