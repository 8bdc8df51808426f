use std::fs;
use std::path::{Path, PathBuf};

use askdocs_cli::{parse_args, App, Command};
use askdocs_core::config::{AppConfig, Config};
use askdocs_core::traits::VectorStore;
use tempfile::TempDir;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

fn library() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("pump.txt"), "Prime the well pump with a bucket of water before starting it.").unwrap();
    fs::create_dir(dir.path().join("power")).unwrap();
    fs::write(dir.path().join("power/solar.md"), "Batteries should never discharge below half capacity.").unwrap();
    fs::write(dir.path().join("notes.pdf"), "ignored").unwrap();
    dir
}

fn settings(extra: &str) -> AppConfig {
    let toml = format!("[embedding]\nuse_fake = true\ndim = 64\n\n[chunking]\nchunk_size = 64\nchunk_overlap = 8\n\n{extra}");
    Config::from_toml_str(&toml).settings().unwrap()
}

#[test]
fn parses_commands() {
    assert_eq!(parse_args(args(&[])).unwrap(), Command::Help);
    assert_eq!(parse_args(args(&["ingest"])).unwrap(), Command::Ingest { dir: None });
    assert_eq!(
        parse_args(args(&["ingest", "docs/manuals"])).unwrap(),
        Command::Ingest { dir: Some(PathBuf::from("docs/manuals")) }
    );
    assert_eq!(
        parse_args(args(&["search", "well", "pump", "--limit", "3", "--window", "2"])).unwrap(),
        Command::Search { query: "well pump".into(), limit: Some(3), window: Some(2) }
    );
    assert_eq!(parse_args(args(&["ask"])).unwrap(), Command::Ask);
}

#[test]
fn rejects_bad_arguments() {
    assert!(parse_args(args(&["search"])).is_err());
    assert!(parse_args(args(&["search", "pump", "--limit"])).is_err());
    assert!(parse_args(args(&["search", "pump", "--limit", "many"])).is_err());
    assert!(parse_args(args(&["serve"])).is_err());
}

#[test]
fn ingest_then_search_in_memory() {
    let docs = library();
    let app = App::new(settings(""), Path::new(".")).unwrap();
    assert_eq!(app.ingest(Some(docs.path()), false).unwrap(), 2);
    assert_eq!(app.store().len().unwrap(), 2);

    let hits = app.engine(None).unwrap().search("batteries discharge", None, 1).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].payload.source, "power/solar.md");
}

#[test]
fn empty_memory_store_loads_input_dir() {
    let docs = library();
    let cfg = settings(&format!("[data]\ninput_dir = {:?}\n", docs.path().display().to_string()));
    let app = App::new(cfg, Path::new("/")).unwrap();
    assert_eq!(app.input_dir(), docs.path());
    app.ensure_loaded().unwrap();
    assert_eq!(app.store().len().unwrap(), 2);
    // a second call finds the store populated
    app.ensure_loaded().unwrap();
    assert_eq!(app.store().len().unwrap(), 2);
}

#[test]
fn lance_store_persists_between_runs() {
    let docs = library();
    let db = tempfile::tempdir().unwrap();
    let extra = format!("[store]\nkind = \"lance\"\npath = {:?}\n", db.path().display().to_string());

    let first = App::new(settings(&extra), Path::new(".")).unwrap();
    assert_eq!(first.ingest(Some(docs.path()), false).unwrap(), 2);
    drop(first);

    let second = App::new(settings(&extra), Path::new(".")).unwrap();
    assert_eq!(second.store().len().unwrap(), 2);
    // re-ingesting the same files upserts in place
    second.ingest(Some(docs.path()), false).unwrap();
    assert_eq!(second.store().len().unwrap(), 2);
    let hits = second.engine(Some(1)).unwrap().search_passages("well pump water", None, 1, 1).unwrap();
    assert!(hits[0].text.contains("well pump"));
}
