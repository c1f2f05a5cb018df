use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture(name: &str) -> PathBuf {
    return Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
}

/// Run codexref with `dir` as the working directory, so no stray config is picked up.
fn codexref(dir: &Path, args: &[&str]) -> Output {
    return Command::new(env!("CARGO_BIN_EXE_codexref"))
        .current_dir(dir)
        .env_remove("CODEXREF_LOG")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap();
}

fn stderr(output: &Output) -> String {
    return String::from_utf8_lossy(&output.stderr).to_string();
}

fn index_snapshot(dir: &Path, snapshot: &Path, extra: &[&str]) -> Output {
    let snapshot = snapshot.to_str().unwrap();
    let mut args = vec!["index", "--snapshot", snapshot, "--out", "out"];
    args.extend_from_slice(extra);
    return codexref(dir, &args);
}

fn read(path: PathBuf) -> String {
    return std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()));
}

#[test]
fn snapshot_index_writes_the_output_layout() {
    let dir = tempfile::tempdir().unwrap();
    let output = index_snapshot(dir.path(), &fixture("snapshot.json"), &[]);
    assert!(output.status.success(), "index failed: {}", stderr(&output));

    let out = dir.path().join("out");
    let widget_page = read(out.join("Lib/Widget.cs.html"));
    assert!(widget_page.contains("Widget"));
    let program_page = read(out.join("App/Program.cs.html"));
    assert!(program_page.contains("../Lib/Widget.cs.html#"), "no cross-assembly link in: {program_page}");

    assert!(read(out.join("Lib/D.txt")).lines().any(|line| line.starts_with("Widget;")));
    assert!(read(out.join("App/D.txt")).lines().any(|line| line.starts_with("Program;")));

    let assemblies = read(out.join("Assemblies.txt"));
    assert!(assemblies.contains("mscorlib;-1"), "{assemblies}");
    assert!(read(out.join("Projects.txt")).contains("Lib/Lib.csproj"));
    assert!(out.join("DeclaredSymbols.txt").exists());
    assert!(out.join("Huffman.txt").exists());

    let references: Vec<_> = std::fs::read_dir(out.join("Lib/R")).unwrap().map(|entry| entry.unwrap().path()).collect();
    assert_eq!(references.len(), 1);
    let content = read(references.into_iter().next().unwrap());
    assert!(content.starts_with("App;"), "{content}");
    assert!(content.contains("Widget w;"));

    let mut processed: Vec<String> = read(out.join("ProcessedAssemblies.txt")).lines().map(str::to_string).collect();
    processed.sort();
    assert_eq!(processed, vec!["App".to_string(), "Lib".to_string()]);
}

#[test]
fn lookup_follows_the_redirect() {
    let dir = tempfile::tempdir().unwrap();
    assert!(index_snapshot(dir.path(), &fixture("snapshot.json"), &[]).status.success());

    let output = codexref(dir.path(), &["lookup", "--out", "out", "widg"]);
    assert!(output.status.success(), "lookup failed: {}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Widget"), "{stdout}");
    assert!(stdout.contains("[Lib]"), "{stdout}");
    assert!(stdout.contains("Lib/Widget.cs.html#"), "{stdout}");
}

#[test]
fn inconsistent_document_degrades_and_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let mut snapshot: serde_json::Value = serde_json::from_str(&read(fixture("snapshot.json"))).unwrap();
    let spans = snapshot["projects"][1]["documents"][0]["spans"].as_array_mut().unwrap();
    spans.push(serde_json::json!({ "classification": "keyword", "span": { "start": 20, "end": 400 } }));
    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, serde_json::to_string(&snapshot).unwrap()).unwrap();

    let output = index_snapshot(dir.path(), &broken, &[]);
    assert_eq!(output.status.code(), Some(1), "{}", stderr(&output));
    let page = read(dir.path().join("out/App/Program.cs.html"));
    assert!(page.contains("Widget w;"));
    assert!(!page.contains("Widget.cs.html"));
    assert!(dir.path().join("out/Lib/Widget.cs.html").exists());
}

#[test]
fn resume_skips_processed_assemblies() {
    let dir = tempfile::tempdir().unwrap();
    assert!(index_snapshot(dir.path(), &fixture("snapshot.json"), &[]).status.success());

    let output = index_snapshot(dir.path(), &fixture("snapshot.json"), &["--resume"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("(2 skipped)"), "{}", stderr(&output));

    let lookup = codexref(dir.path(), &["lookup", "--out", "out", "program"]);
    assert!(String::from_utf8_lossy(&lookup.stdout).contains("[App]"));
}

#[test]
fn foreign_output_directory_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("out")).unwrap();
    std::fs::write(dir.path().join("out/notes.txt"), "keep").unwrap();

    let output = index_snapshot(dir.path(), &fixture("snapshot.json"), &[]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("Output Directory In Use"), "{}", stderr(&output));
    assert!(dir.path().join("out/notes.txt").exists());
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = index_snapshot(dir.path(), &fixture("snapshot.json"), &["--dry-run"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("Dry run"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn missing_snapshot_is_a_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = index_snapshot(dir.path(), &dir.path().join("absent.json"), &[]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn source_tree_index_covers_every_language_project() {
    let dir = tempfile::tempdir().unwrap();
    let root = fixture("workspace");
    let output = codexref(dir.path(), &["index", "--root", root.to_str().unwrap(), "--out", "out", "--jobs", "2"]);
    assert!(output.status.success(), "index failed: {}", stderr(&output));

    let out = dir.path().join("out");
    assert!(out.join("shapes/src/lib.rs.html").exists());
    assert!(out.join("app/src/main.rs.html").exists());
    assert!(out.join("tools/report.py.html").exists());

    let lookup = codexref(dir.path(), &["lookup", "--out", "out", "rectangle"]);
    let stdout = String::from_utf8_lossy(&lookup.stdout);
    assert!(stdout.contains("[shapes]"), "{stdout}");

    let main_page = read(out.join("app/src/main.rs.html"));
    assert!(main_page.contains("shapes/src/lib.rs.html#"), "no link into shapes: {main_page}");
}

#[test]
fn federation_servers_are_edited_in_config() {
    let dir = tempfile::tempdir().unwrap();
    assert!(codexref(dir.path(), &["federation", "add", "https://ref.example/"]).status.success());

    let list = codexref(dir.path(), &["federation", "list"]);
    assert!(String::from_utf8_lossy(&list.stdout).contains("https://ref.example"));

    let duplicate = codexref(dir.path(), &["federation", "add", "https://ref.example"]);
    assert_eq!(duplicate.status.code(), Some(3));

    assert!(codexref(dir.path(), &["federation", "remove", "https://ref.example"]).status.success());
    let list = codexref(dir.path(), &["federation", "list"]);
    assert!(String::from_utf8_lossy(&list.stdout).contains("No federation servers"));
}

#[test]
fn info_json_describes_state() {
    let dir = tempfile::tempdir().unwrap();
    let output = codexref(dir.path(), &["info", "--json"]);
    assert!(output.status.success());
    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(info["current_state"]["config_found"], false);
    assert_eq!(info["exit_codes"].as_array().unwrap().len(), 3);
}

#[test]
fn snapshot_and_root_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let output = codexref(dir.path(), &["index", "--snapshot", "a.json", "--root", ".", "--out", "out"]);
    assert!(!output.status.success());
}
