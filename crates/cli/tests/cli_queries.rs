use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

const GAME_LIB: &str = r#"
class Bird:
    def __init__(self, x, y):
        self.x = x
        self.y = y


def rocket_add(a: int, b: int) -> int:
    return a + b
"#;

fn setup_project() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("game_lib.py"), GAME_LIB).unwrap();
    fs::write(temp.path().join("broken.py"), "def broken(:\n").unwrap();
    temp
}

#[allow(deprecated)]
fn assembly(root: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("assembly").expect("binary");
    cmd.current_dir(root)
        .env_remove("ASSEMBLY_BACKEND_COMMAND")
        .env_remove("ASSEMBLY_MAX_RETRIES")
        .env_remove("ASSEMBLY_BACKEND_TIMEOUT_MS");
    cmd
}

#[test]
fn query_prints_assembled_code() {
    let temp = setup_project();
    assembly(temp.path())
        .args(["query", "rocket_add", "100", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "from game_lib import rocket_add\n\nresult = rocket_add(100, 50)\n",
        ));
}

#[test]
fn query_json_reports_trace_and_artifact() {
    let temp = setup_project();
    let output = assembly(temp.path())
        .args(["query", "--json", "Bird", "50", "300"])
        .output()
        .expect("command run");
    assert!(output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["delivered"], true);
    assert_eq!(body["artifact"]["verified"], true);
    assert_eq!(body["artifact"]["origin"], "deterministic");
    assert_eq!(
        body["artifact"]["code_text"],
        "from game_lib import Bird\n\nresult = Bird(50, 300)\n"
    );
    assert_eq!(body["trace"][0]["state"], "received");
}

#[test]
fn unknown_function_fails_with_suggestions() {
    let temp = setup_project();
    assembly(temp.path())
        .args(["query", "rockt_add", "1", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No indexed function matches"))
        .stderr(predicate::str::contains("rocket_add"));
}

#[test]
fn wrong_arity_fails() {
    let temp = setup_project();
    assembly(temp.path())
        .args(["query", "rocket_add", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expects 2 positional arguments, got 1"));
}

#[test]
fn index_save_then_cached_query() {
    let temp = setup_project();
    let output = assembly(temp.path())
        .args(["index", "--save", "--json"])
        .output()
        .expect("command run");
    assert!(output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["stats"]["files_seen"], 2);
    assert_eq!(body["stats"]["files_indexed"], 1);
    assert_eq!(body["stats"]["failures"][0]["path"], "broken.py");
    assert!(temp.path().join(".assembly/index.json").is_file());

    // The cached index is used even after the source disappears.
    fs::remove_file(temp.path().join("game_lib.py")).unwrap();
    assembly(temp.path())
        .args(["query", "--cached", "rocket_add", "1", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("result = rocket_add(1, 2)"));
}

#[test]
fn index_lists_files_it_could_not_index() {
    let temp = setup_project();
    fs::write(temp.path().join("latin1.py"), [0x63, 0x61, 0x66, 0xe9]).unwrap();

    assembly(temp.path())
        .arg("index")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 file(s) not indexed:"))
        .stdout(predicate::str::contains("skipped broken.py"))
        .stdout(predicate::str::contains("skipped latin1.py: not valid UTF-8"));
}

#[test]
fn repl_answers_each_line() {
    let temp = setup_project();
    assembly(temp.path())
        .arg("repl")
        .write_stdin("rocket_add 1 2\n\nzzz_not_a_function\nquit\nrocket_add 3 4\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("result = rocket_add(1, 2)"))
        .stdout(predicate::str::contains("error: No indexed function matches 'zzz_not_a_function'"))
        .stdout(predicate::str::contains("rocket_add(3, 4)").not());
}

#[test]
fn generation_without_backend_command_falls_back() {
    let temp = setup_project();
    assembly(temp.path())
        .args(["query", "--generate", "rocket_add", "1", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("result = rocket_add(1, 2)"));
}
