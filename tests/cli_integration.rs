//! CLI integration tests for depmap.
//!
//! These tests drive the binary end to end: parsing a ninja build with a
//! stand-in dependency tool, then querying the exported mapping.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the depmap binary command, isolated from the user's global config.
fn depmap(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("depmap").unwrap();
    cmd.env("HOME", home).env_remove("DEPMAP_NINJA");
    cmd
}

/// Create a temporary directory for test projects.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

const BUILD_NINJA: &str = r#"# generated
ninja_required_version = 1.5

rule CXX_COMPILER
  command = c++ -MD -MF $out.d -c $in -o $out
  deps = gcc

rule CXX_EXECUTABLE_LINKER
  command = c++ $in -o $out

build main.o: CXX_COMPILER ../src/main.cpp
build util.o: CXX_COMPILER ../src/util.cpp
build test_util.o: CXX_COMPILER ../tests/test_util.cpp
build stale.o: CXX_COMPILER ../src/stale.cpp
build bin/app: CXX_EXECUTABLE_LINKER main.o util.o
build bin/test_util: CXX_EXECUTABLE_LINKER test_util.o util.o
build bin/tool: CXX_EXECUTABLE_LINKER stale.o
build all: phony bin/app bin/test_util bin/tool
"#;

/// Lay out a small CMake-style project with its build directory.
fn project(tmp: &TempDir) -> PathBuf {
    let ws = tmp.path().join("ws");
    for (path, contents) in [
        ("src/main.cpp", "#include \"common.h\"\nint main() {}\n"),
        ("src/util.cpp", "#include \"util.h\"\n"),
        ("src/stale.cpp", "int stale;\n"),
        ("include/common.h", "#pragma once\n"),
        ("include/util.h", "#pragma once\n"),
        ("tests/test_util.cpp", "#include \"util.h\"\n"),
        ("build/build.ninja", BUILD_NINJA),
    ] {
        let full = ws.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, contents).unwrap();
    }
    ws
}

/// A stand-in for `ninja -t deps` answering from a fixed table.
#[cfg(unix)]
fn fake_ninja(tmp: &TempDir) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let tool = tmp.path().join("tools").join("ninja");
    fs::create_dir_all(tool.parent().unwrap()).unwrap();
    fs::write(
        &tool,
        r#"#!/bin/sh
obj="$3"
case "$obj" in
  main.o)
    echo "main.o: #deps 3, deps mtime 1 (VALID)"
    echo "    ../src/main.cpp"
    echo "    ../include/common.h"
    echo "    /usr/include/stdio.h"
    ;;
  util.o)
    echo "util.o: #deps 3, deps mtime 1 (VALID)"
    echo "    ../src/util.cpp"
    echo "    ../include/common.h"
    echo "    ../include/util.h"
    ;;
  test_util.o)
    echo "test_util.o: #deps 2, deps mtime 1 (VALID)"
    echo "    ../tests/test_util.cpp"
    echo "    ../include/util.h"
    ;;
  *)
    echo "$obj: deps not found"
    ;;
esac
"#,
    )
    .unwrap();
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
    tool
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn write_map(dir: &Path, workspace_root: &Path) -> PathBuf {
    let map = dir.join("dependency_mapping.json");
    let json = serde_json::json!({
        "workspace_root": workspace_root,
        "file_to_executables": {
            "include/util.h": ["bin/app", "bin/test_util"],
            "src/main.cpp": ["bin/app"],
            "src/util.cpp": ["bin/app", "bin/test_util"],
            "tests/test_util.cpp": ["bin/test_util"]
        }
    });
    fs::write(&map, serde_json::to_string_pretty(&json).unwrap()).unwrap();
    map
}

// ============================================================================
// depmap parse
// ============================================================================

#[cfg(unix)]
#[test]
fn test_parse_exports_mapping() {
    let tmp = temp_dir();
    let ws = project(&tmp);
    let ninja = fake_ninja(&tmp);
    let out = tmp.path().join("out");

    depmap(tmp.path())
        .arg("parse")
        .arg(ws.join("build/build.ninja"))
        .arg("--ninja")
        .arg(&ninja)
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dependency Mapping Summary"))
        .stdout(predicate::str::contains("include/util.h (2 executables)"))
        .stderr(predicate::str::contains(
            "dependency query failed for 1 object files",
        ));

    let json = read_json(&out.join("dependency_mapping.json"));
    let files = &json["file_to_executables"];
    assert_eq!(files["include/util.h"], serde_json::json!(["bin/app", "bin/test_util"]));
    assert_eq!(files["include/common.h"], serde_json::json!(["bin/app", "bin/test_util"]));
    assert_eq!(files["src/stale.cpp"], serde_json::json!(["bin/tool"]));
    assert!(files.get("/usr/include/stdio.h").is_none());
    assert_eq!(json["statistics"]["failed_objects"], 1);
    assert_eq!(json["statistics"]["total_executables"], 3);

    let csv = fs::read_to_string(out.join("file_target_mapping.csv")).unwrap();
    assert!(csv.starts_with("source_file,executables\n"));
    assert!(csv.contains("\"include/util.h\",\"bin/app;bin/test_util\""));
}

#[cfg(unix)]
#[test]
fn test_parse_no_filter_keeps_system_headers() {
    let tmp = temp_dir();
    let ws = project(&tmp);
    let ninja = fake_ninja(&tmp);
    let out = tmp.path().join("out");

    depmap(tmp.path())
        .arg("parse")
        .arg(ws.join("build/build.ninja"))
        .arg("--ninja")
        .arg(&ninja)
        .args(["--no-filter", "--jobs", "1"])
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success();

    let json = read_json(&out.join("dependency_mapping.json"));
    assert_eq!(
        json["file_to_executables"]["/usr/include/stdio.h"],
        serde_json::json!(["bin/app"])
    );
}

#[cfg(unix)]
#[test]
fn test_parse_with_cache_is_repeatable() {
    let tmp = temp_dir();
    let ws = project(&tmp);
    let ninja = fake_ninja(&tmp);
    fs::write(ws.join("build/main.o"), "obj").unwrap();

    for out in ["first", "second"] {
        depmap(tmp.path())
            .arg("parse")
            .arg(ws.join("build/build.ninja"))
            .arg("--ninja")
            .arg(&ninja)
            .arg("--cache")
            .arg("--output-dir")
            .arg(tmp.path().join(out))
            .assert()
            .success();
    }

    assert!(ws.join("build/.depmap/resolve-cache.json").exists());
    assert_eq!(
        fs::read_to_string(tmp.path().join("first/dependency_mapping.json")).unwrap(),
        fs::read_to_string(tmp.path().join("second/dependency_mapping.json")).unwrap()
    );
}

#[test]
fn test_parse_missing_build_file_fails() {
    let tmp = temp_dir();

    depmap(tmp.path())
        .args(["parse", "does/not/exist/build.ninja", "--ninja", "sh"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("build description unavailable"));
}

#[test]
fn test_parse_missing_tool_fails() {
    let tmp = temp_dir();
    let ws = project(&tmp);

    depmap(tmp.path())
        .arg("parse")
        .arg(ws.join("build/build.ninja"))
        .args(["--ninja", "definitely-not-ninja-xyz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "dependency tool `definitely-not-ninja-xyz` not found",
        ));
}

// ============================================================================
// depmap audit / optimize
// ============================================================================

#[test]
fn test_audit_lists_files() {
    let tmp = temp_dir();
    let map = write_map(tmp.path(), Path::new("/ws"));

    depmap(tmp.path())
        .arg("audit")
        .arg(&map)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "include/util.h: bin/app, bin/test_util",
        ))
        .stdout(predicate::str::contains("Total files: 4"));
}

#[test]
fn test_audit_missing_map_fails() {
    let tmp = temp_dir();

    depmap(tmp.path())
        .args(["audit", "missing.json"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("dependency map not found"));
}

#[test]
fn test_optimize_lists_affected() {
    let tmp = temp_dir();
    let map = write_map(tmp.path(), Path::new("/ws"));

    depmap(tmp.path())
        .arg("optimize")
        .arg(&map)
        .args(["tests/test_util.cpp", "README.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Affected executables:\nbin/test_util\n"))
        .stdout(predicate::str::contains("Total affected executables: 1"));
}

// ============================================================================
// depmap select
// ============================================================================

#[test]
fn test_select_explicit_files_with_test_prefix() {
    let tmp = temp_dir();
    let map = write_map(tmp.path(), Path::new("/ws"));
    let output = tmp.path().join("tests-to-run.json");

    depmap(tmp.path())
        .arg("select")
        .arg(&map)
        .args(["--files", "src/util.cpp", "--test-prefix"])
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 tests to run"));

    let json = read_json(&output);
    assert_eq!(json["mode"], "test-prefix(test_)");
    assert_eq!(json["tests_to_run"], serde_json::json!(["bin/test_util"]));
    assert_eq!(json["changed_files"], serde_json::json!(["src/util.cpp"]));
}

#[test]
fn test_select_all() {
    let tmp = temp_dir();
    let map = write_map(tmp.path(), Path::new("/ws"));

    depmap(tmp.path())
        .arg("select")
        .arg(&map)
        .args(["--files", "README.md", "--all"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let json = read_json(&tmp.path().join("tests-to-run.json"));
    assert_eq!(json["mode"], "all");
    assert_eq!(
        json["tests_to_run"],
        serde_json::json!(["bin/app", "bin/test_util"])
    );
}

#[test]
fn test_select_requires_refs_or_files() {
    let tmp = temp_dir();
    let map = write_map(tmp.path(), Path::new("/ws"));

    depmap(tmp.path())
        .arg("select")
        .arg(&map)
        .assert()
        .failure();
}

/// Commit the workspace, change `include/util.h`, commit again.
fn two_commit_repo(ws: &Path) -> (git2::Oid, git2::Oid) {
    use git2::{Repository, Signature};

    let repo = Repository::init(ws).unwrap();
    let sig = Signature::now("Test", "test@example.com").unwrap();
    let commit_all = |message: &str| {
        let mut index = repo.index().unwrap();
        index
            .add_all(["src", "include", "tests"], git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<_> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    };

    let base = commit_all("initial");
    fs::write(ws.join("include/util.h"), "#pragma once\nint util();\n").unwrap();
    let head = commit_all("change util.h");
    (base, head)
}

#[test]
fn test_select_between_git_refs() {
    let tmp = temp_dir();
    let ws = project(&tmp);
    let map = write_map(tmp.path(), &ws);
    let output = tmp.path().join("selected.json");
    let (base, head) = two_commit_repo(&ws);

    depmap(tmp.path())
        .arg("select")
        .arg(&map)
        .arg(base.to_string())
        .arg(head.to_string())
        .arg("--repo")
        .arg(&ws)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 tests to run"));

    let json = read_json(&output);
    assert_eq!(json["mode"], "exact");
    assert_eq!(
        json["tests_to_run"],
        serde_json::json!(["bin/app", "bin/test_util"])
    );
    assert_eq!(json["changed_files"], serde_json::json!(["include/util.h"]));
}

#[test]
fn test_select_test_prefix_before_refs() {
    let tmp = temp_dir();
    let ws = project(&tmp);
    let map = write_map(tmp.path(), &ws);
    let output = tmp.path().join("selected.json");
    let (base, head) = two_commit_repo(&ws);

    depmap(tmp.path())
        .arg("select")
        .arg(&map)
        .arg("--test-prefix")
        .arg(base.to_string())
        .arg(head.to_string())
        .arg("--repo")
        .arg(&ws)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 tests to run"));

    let json = read_json(&output);
    assert_eq!(json["mode"], "test-prefix(test_)");
    assert_eq!(json["tests_to_run"], serde_json::json!(["bin/test_util"]));
}

#[test]
fn test_select_custom_test_prefix() {
    let tmp = temp_dir();
    let map = write_map(tmp.path(), Path::new("/ws"));
    let output = tmp.path().join("selected.json");

    depmap(tmp.path())
        .arg("select")
        .arg(&map)
        .args(["--test-prefix=app", "--files", "src/util.cpp", "--output"])
        .arg(&output)
        .assert()
        .success();

    let json = read_json(&output);
    assert_eq!(json["mode"], "test-prefix(app)");
    assert_eq!(json["tests_to_run"], serde_json::json!(["bin/app"]));
}
