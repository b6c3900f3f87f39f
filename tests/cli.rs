use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn loxwalk() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("loxwalk"))
}

fn source_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn run_prints_program_output() {
    let file = source_file("class C { init(v) { this.v = v; } get() { return this.v; } }\nprint C(5).get();");

    loxwalk()
        .arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout("5\n");
}

#[test]
fn run_exits_65_on_resolve_error() {
    let file = source_file("{ var unused = 1; }");

    loxwalk()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(65)
        .stdout("")
        .stderr(predicate::str::contains(
            "[line 1] Error: Local variable 'unused' is never used.",
        ));
}

#[test]
fn run_exits_70_on_runtime_error() {
    let file = source_file("print \"ok\";\nprint 3 / 0;");

    loxwalk()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(70)
        .stdout("ok\n")
        .stderr(predicate::str::contains("denominator can't be zero\n[line 2]"));
}

#[test]
fn tokenize_prints_tokens_and_flags_bad_characters() {
    let file = source_file("var x = 1; @");

    loxwalk()
        .arg("tokenize")
        .arg(file.path())
        .assert()
        .code(65)
        .stdout(predicate::str::contains("VAR var null\nIDENTIFIER x null"))
        .stdout(predicate::str::contains("NUMBER 1 1.0"))
        .stdout(predicate::str::ends_with("EOF  null\n"))
        .stderr(predicate::str::contains("Unexpected character: @"));
}

#[test]
fn parse_prints_prefix_and_postfix_forms() {
    let file = source_file("(1 + 2) * (4 - 3)");

    loxwalk()
        .arg("parse")
        .arg(file.path())
        .assert()
        .success()
        .stdout("(* (group (+ 1.0 2.0)) (group (- 4.0 3.0)))\n");

    loxwalk()
        .args(["parse", "--rpn"])
        .arg(file.path())
        .assert()
        .success()
        .stdout("1.0 2.0 + 4.0 3.0 - *\n");
}

#[test]
fn parse_json_dumps_the_program() {
    let file = source_file("print 1;");

    let output = loxwalk()
        .args(["parse", "--json"])
        .arg(file.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["Print"]["Literal"]["Number"], 1.0);
}

#[test]
fn evaluate_prints_the_value() {
    let file = source_file("\"1\" + 2");

    loxwalk()
        .arg("evaluate")
        .arg(file.path())
        .assert()
        .success()
        .stdout("12\n");
}

#[test]
fn evaluate_exits_65_on_syntax_error() {
    let file = source_file("(1 +");

    loxwalk()
        .arg("evaluate")
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Expected expression"));
}

#[test]
fn missing_file_is_reported() {
    loxwalk()
        .args(["run", "no_such_file.lox"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open file"));
}
