mod repos;

use repos::test_repo::TestRepo;

use assert_cmd::Command;
use predicates::prelude::*;

fn tool() -> Command {
    Command::cargo_bin("git-import-file").expect("binary builds")
}

#[test]
fn missing_source_exits_with_failure() {
    let target = TestRepo::new();

    tool()
        .current_dir(target.path())
        .arg("no-such-file.txt")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid input"));
}

#[test]
fn existing_target_exits_with_failure() {
    let source = TestRepo::new();
    source.write_file("bar.txt", "content\n");
    source.stage_all_and_commit("add bar");

    let target = TestRepo::new();
    target.write_file("bar.txt", "already here\n");
    target.stage_all_and_commit("add existing bar");

    tool()
        .current_dir(target.path())
        .arg(source.file_path("bar.txt"))
        .arg(target.file_path("bar.txt"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("target already exists"));

    assert_eq!(target.read_file("bar.txt"), "already here\n");
}

#[test]
fn successful_import_reports_commit_count() {
    let source = TestRepo::new();
    source.write_file("bar.txt", "one\n");
    source.commit_all_as("Alice", "alice@example.com", "add bar");
    source.write_file("bar.txt", "one\ntwo\n");
    source.commit_all_as("Bob", "bob@example.com", "extend bar");

    let target = TestRepo::new();
    target.write_file("README.md", "# target\n");
    target.stage_all_and_commit("add readme");

    tool()
        .current_dir(target.path())
        .arg(source.file_path("bar.txt"))
        .arg(target.file_path("bar.txt"))
        .assert()
        .success()
        .stdout(predicate::str::contains("imported 2 commits"));

    assert_eq!(target.read_file("bar.txt"), "one\ntwo\n");
    assert_eq!(target.commit_count(), 3);
}

#[test]
fn dirty_target_exits_with_failure_and_specific_message() {
    let source = TestRepo::new();
    source.write_file("bar.txt", "one\n");
    source.stage_all_and_commit("add bar");

    let target = TestRepo::new();
    target.write_file("README.md", "# target\n");
    target.stage_all_and_commit("add readme");
    target.write_file("README.md", "# modified\n");

    tool()
        .current_dir(target.path())
        .arg(source.file_path("bar.txt"))
        .arg(target.file_path("bar.txt"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("dirty repository"));
}
