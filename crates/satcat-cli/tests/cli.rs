use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn satcat_cmd() -> Command {
    Command::cargo_bin("satcat").unwrap()
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

fn links_of<'a>(doc: &'a Value, rel: &str) -> Vec<&'a str> {
    doc["links"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|l| l["rel"] == rel)
        .map(|l| l["href"].as_str().unwrap())
        .collect()
}

#[test]
fn test_create_writes_root_catalog() {
    let temp = TempDir::new().unwrap();

    satcat_cmd()
        .current_dir(temp.path())
        .args(["create", "landsat", "Landsat scenes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("catalog.json"));

    let doc = read_json(&temp.path().join("catalog.json"));
    assert_eq!(doc["id"], "landsat");
    assert_eq!(doc["description"], "Landsat scenes");
}

#[test]
fn test_add_attaches_sub_catalog() {
    let temp = TempDir::new().unwrap();

    satcat_cmd()
        .current_dir(temp.path())
        .args(["create", "root", "Root catalog"])
        .assert()
        .success();

    satcat_cmd()
        .current_dir(temp.path())
        .args(["add", "catalog.json", "l8", "Landsat 8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("l8/catalog.json"));

    let child_path = temp.path().join("l8/catalog.json");
    assert!(child_path.exists());

    let root = read_json(&temp.path().join("catalog.json"));
    assert_eq!(links_of(&root, "child"), vec!["l8/catalog.json"]);

    let child = read_json(&child_path);
    assert_eq!(links_of(&child, "parent"), vec!["../catalog.json"]);
    assert_eq!(links_of(&child, "root"), vec!["../catalog.json"]);
}

#[test]
fn test_publish_rewrites_self_links() {
    let temp = TempDir::new().unwrap();

    satcat_cmd()
        .current_dir(temp.path())
        .args(["create", "root", "Root catalog"])
        .assert()
        .success();
    satcat_cmd()
        .current_dir(temp.path())
        .args(["add", "catalog.json", "l8", "Landsat 8"])
        .assert()
        .success();

    satcat_cmd()
        .current_dir(temp.path())
        .args(["publish", "catalog.json", "https://catalogs.example.com/v1"])
        .assert()
        .success();

    let root = read_json(&temp.path().join("catalog.json"));
    assert_eq!(
        links_of(&root, "self"),
        vec!["https://catalogs.example.com/v1/catalog.json"]
    );

    let child = read_json(&temp.path().join("l8/catalog.json"));
    assert_eq!(
        links_of(&child, "self"),
        vec!["https://catalogs.example.com/v1/l8/catalog.json"]
    );
}

#[test]
fn test_add_to_missing_catalog_fails() {
    let temp = TempDir::new().unwrap();

    satcat_cmd()
        .current_dir(temp.path())
        .args(["add", "nope.json", "l8", "Landsat 8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.json"));
}
