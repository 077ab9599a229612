use std::path::Path;

use predicates::prelude::*;
use serde_json::Value;

const OUTLINE: &str = r#"{
  "sections": [
    {"id": "intro", "title": "Intro", "type": "h2", "content": "Why async matters",
     "keyPoints": ["latency"], "recommendedWordCount": 200,
     "children": [{"id": "history", "title": "History", "type": "h3", "content": "Futures 0.1"}]},
    {"id": "setup", "title": "Setup", "type": "h2", "content": "Install tokio"},
    {"id": "faq", "title": "FAQ", "type": "h2", "content": "Questions"}
  ],
  "metadata": {"totalWordCount": 200, "keywordDensity": {}, "readabilityScore": 0.7, "seoScore": 60}
}"#;

fn write_outline(dir: &Path) -> anyhow::Result<std::path::PathBuf> {
    let path = dir.join("outline.json");
    std::fs::write(&path, OUTLINE)?;
    Ok(path)
}

fn read_outline(path: &Path) -> anyhow::Result<Value> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

fn parse_outline(path: &Path) -> anyhow::Result<blogflow::formats::Outline> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

fn top_level_ids(outline: &Value) -> Vec<String> {
    outline["sections"]
        .as_array()
        .map(|sections| {
            sections
                .iter()
                .filter_map(|s| s["id"].as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

fn blogflow(data_dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("blogflow");
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("SERPAPI_KEY")
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

#[test]
fn show_renders_markdown_in_tree_order() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let file = write_outline(temp.path())?;

    blogflow(temp.path())
        .args(["outline", "show", "--file"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "## Intro\n\nWhy async matters\n\n- latency\n\n### History\n\nFutures 0.1\n\n## Setup",
        ));
    Ok(())
}

#[test]
fn add_under_parent_prints_new_id_and_uses_child_level() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let file = write_outline(temp.path())?;

    let output = blogflow(temp.path())
        .args(["outline", "add", "--parent", "intro", "--title", "Executors", "--file"])
        .arg(&file)
        .output()?;
    assert!(output.status.success());
    let id = String::from_utf8(output.stdout)?.trim().to_owned();
    assert!(id.starts_with("sec_"), "unexpected id: {id}");

    let outline = read_outline(&file)?;
    let children = &outline["sections"][0]["children"];
    assert_eq!(children[1]["id"], Value::String(id));
    assert_eq!(children[1]["title"], "Executors");
    assert_eq!(children[1]["type"], "h3");
    assert_eq!(outline["metadata"]["seoScore"], 60.0);
    Ok(())
}

#[test]
fn remove_update_and_reorder_edit_the_file_in_place() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let file = write_outline(temp.path())?;

    blogflow(temp.path())
        .args(["outline", "remove", "--id", "setup", "--file"])
        .arg(&file)
        .assert()
        .success();
    assert_eq!(top_level_ids(&read_outline(&file)?), ["intro", "faq"]);

    blogflow(temp.path())
        .args([
            "outline", "update", "--id", "history", "--title", "Origins", "--words", "150", "--file",
        ])
        .arg(&file)
        .assert()
        .success();
    let outline = read_outline(&file)?;
    let history = &outline["sections"][0]["children"][0];
    assert_eq!(history["title"], "Origins");
    assert_eq!(history["recommendedWordCount"], 150);
    assert_eq!(history["content"], "Futures 0.1");

    blogflow(temp.path())
        .args(["outline", "reorder", "--id", "faq", "--index", "0", "--file"])
        .arg(&file)
        .assert()
        .success();
    assert_eq!(top_level_ids(&read_outline(&file)?), ["faq", "intro"]);
    Ok(())
}

#[test]
fn unknown_ids_are_ignored_unless_strict() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let file = write_outline(temp.path())?;
    let before = parse_outline(&file)?;

    blogflow(temp.path())
        .args(["outline", "reorder", "--id", "ghost", "--index", "0", "--file"])
        .arg(&file)
        .assert()
        .success();
    assert_eq!(parse_outline(&file)?, before);

    blogflow(temp.path())
        .args(["outline", "reorder", "--id", "ghost", "--index", "0", "--strict", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("section not found: ghost"));

    blogflow(temp.path())
        .args(["outline", "add", "--parent", "ghost", "--title", "X", "--strict", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("parent section not found: ghost"));

    blogflow(temp.path())
        .args(["outline", "remove", "--id", "ghost", "--strict", "--file"])
        .arg(&file)
        .assert()
        .failure();
    assert_eq!(parse_outline(&file)?, before);
    Ok(())
}

#[test]
fn update_without_fields_is_an_error() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let file = write_outline(temp.path())?;

    blogflow(temp.path())
        .args(["outline", "update", "--id", "intro", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to update"));
    Ok(())
}

#[test]
fn missing_outline_file_is_reported() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;

    blogflow(temp.path())
        .args(["outline", "show", "--file"])
        .arg(temp.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("outline file not found"));
    Ok(())
}

#[test]
fn cache_stats_on_empty_data_dir() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;

    let output = blogflow(temp.path()).args(["cache", "stats"]).output()?;
    assert!(output.status.success());
    let stats: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(stats["totalEntries"], 0);
    assert_eq!(stats["storageType"], "persistent");
    assert_eq!(stats["oldestEntry"], Value::Null);
    Ok(())
}

#[test]
fn blogflow_log_debug_emits_debug_line_to_stderr() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;

    blogflow(temp.path())
        .env("BLOGFLOW_LOG", "debug")
        .args(["cache", "stats"])
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
    Ok(())
}

#[test]
fn generation_commands_need_an_api_key() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;

    blogflow(temp.path())
        .args(["elaborate", "--prompt", "expand"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY is not set"));
    Ok(())
}
