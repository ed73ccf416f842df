use std::fs;
use tempfile::TempDir;

use intentdb_core::model_source::{DirectoryModelSource, InMemoryModelSource};
use intentdb_core::traits::ModelSource;
use intentdb_core::types::PageModel;

#[test]
fn directory_source_reads_single_and_array_files() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(
        dir.join("a_login.json"),
        r#"{"name":"Login","url":"https://app.test/login","utterances":["sign in"],
            "elements":[{"name":"Username field","utterances":["enter username"]}]}"#,
    )
    .unwrap();
    fs::create_dir(dir.join("nested")).unwrap();
    fs::write(
        dir.join("nested/b_pages.json"),
        r#"[{"name":"Home","utterances":["go home"]},{"name":"Cart"}]"#,
    )
    .unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let pages = DirectoryModelSource::new(dir).load_pages().expect("load");
    let names: Vec<&str> = pages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Login", "Home", "Cart"], "files visited in path order");
    assert_eq!(pages[0].elements[0].utterances, vec!["enter username".to_string()]);
}

#[test]
fn directory_source_reports_bad_json_with_path() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("broken.json"), "{ not json").unwrap();

    let err = DirectoryModelSource::new(tmp.path()).load_pages().unwrap_err();
    assert!(format!("{err:#}").contains("broken.json"));
}

#[test]
fn directory_source_missing_root_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope");
    assert!(DirectoryModelSource::new(missing).load_pages().is_err());
}

#[test]
fn in_memory_source_returns_its_pages() {
    let page = PageModel { name: "Search".into(), ..Default::default() };
    let source = InMemoryModelSource::new(vec![page.clone()]);
    assert_eq!(source.load_pages().unwrap(), vec![page]);
}
