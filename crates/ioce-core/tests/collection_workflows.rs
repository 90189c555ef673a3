//! Directory load, create, clone and save workflows

use ioce_core::{
    CollectionError, EditorConfig, Filesystem, Ioc, IocList, LoadOutcome, MemoryFilesystem,
    SchemaVersion,
};
use ioce_test_utils::{
    file_names, fixture_dir, fixture_memory_fs, COMPLETE_V1_0, FAILING_FIXTURES, LATIN1_V1_0,
    LOADABLE_FIXTURES,
};
use pretty_assertions::assert_eq;
use std::path::Path;

#[test]
fn open_loads_good_files_and_reports_bad_ones() {
    let dir = fixture_dir();
    let mut list = IocList::new();
    let report = list.open(dir.path()).unwrap();

    assert_eq!(list.len(), LOADABLE_FIXTURES);
    assert_eq!(report.loaded_count(), LOADABLE_FIXTURES);
    assert_eq!(report.failed_count(), FAILING_FIXTURES);

    let mut failed: Vec<_> = report
        .failures()
        .map(|(p, _)| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    failed.sort();
    assert_eq!(failed, vec!["foreign.ioc", "plain.ioc", "truncated.ioc"]);

    let repaired: Vec<_> = report
        .files
        .iter()
        .filter(|f| matches!(f.outcome, LoadOutcome::Loaded { repaired: true, .. }))
        .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(repaired, vec!["partial-11.ioc"]);
}

#[test]
fn open_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut list = IocList::new();
    let err = list.open(dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, CollectionError::Filesystem { .. }));
    assert!(list.root_directory().is_none());
    assert!(matches!(
        list.create("me", SchemaVersion::V1_1),
        Err(CollectionError::NoDirectoryOpen)
    ));
}

#[test]
fn unchanged_documents_are_never_written() {
    let dir = fixture_dir();
    let partial = dir.path().join("partial-11.ioc");
    let before = std::fs::read(&partial).unwrap();

    let mut list = IocList::new();
    list.open(dir.path()).unwrap();
    assert!(list.dirty_paths().is_empty());
    assert!(list.save(None).unwrap().written.is_empty());

    assert_eq!(std::fs::read(&partial).unwrap(), before);
}

#[test]
fn edits_persist_across_reopen() {
    let dir = fixture_dir();
    let path = dir.path().join("complete-10.ioc");

    let mut list = IocList::new();
    list.open(dir.path()).unwrap();
    list.get_mut(&path).unwrap().set_name("Renamed");
    assert_eq!(list.save(Some(&path)).unwrap().written, vec![path.clone()]);

    let mut reopened = IocList::new();
    reopened.open(dir.path()).unwrap();
    let ioc = reopened.get(&path).unwrap();
    assert_eq!(ioc.name(), "Renamed");
    assert_ne!(ioc.modified_date(), "2013-02-01T10:00:00");
    assert!(!ioc.is_dirty());
}

#[test]
fn created_document_lands_in_directory() {
    let dir = fixture_dir();
    let config = EditorConfig::new().with_default_schema(SchemaVersion::V1_0);
    let mut list = IocList::new().with_config(config);
    list.open(dir.path()).unwrap();

    let schema = list.config().default_schema;
    let path = list.create("creator", schema).unwrap();
    let id = list.get(&path).unwrap().identifier().to_string();
    assert_eq!(path.file_name().unwrap().to_string_lossy(), format!("{id}.ioc"));

    list.save(None).unwrap();
    assert!(file_names(dir.path()).contains(&format!("{id}.ioc")));

    let reloaded = Ioc::parse_bytes(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(reloaded.schema_version(), SchemaVersion::V1_0);
    assert_eq!(reloaded.author(), "creator");
    assert!(!reloaded.was_repaired());
}

#[test]
fn clones_are_independent() {
    let dir = fixture_dir();
    let source = dir.path().join("complete-11.ioc");
    let mut list = IocList::new();
    list.open(dir.path()).unwrap();

    let copy = list.clone_document(&source).unwrap();
    assert_ne!(copy, source);
    {
        let original = list.get(&source).unwrap();
        let cloned = list.get(&copy).unwrap();
        assert_ne!(original.identifier(), cloned.identifier());
        assert_eq!(cloned.name(), original.name());
        assert_eq!(cloned.description(), original.description());
        assert_eq!(cloned.author(), original.author());
        assert_eq!(cloned.links(), original.links());
        assert_eq!(cloned.criteria(), original.criteria());
    }

    list.get_mut(&copy).unwrap().set_name("Copy");
    assert_eq!(list.get(&source).unwrap().name(), "Registry persistence");

    list.get_mut(&source).unwrap().set_name("Source renamed");
    let cloned = list.get(&copy).unwrap();
    assert_eq!(cloned.name(), "Copy");
    assert_eq!(cloned.description(), "Run key pointing at a temp directory");

    list.get_mut(&source).unwrap().set_name("Registry persistence");
    assert_eq!(list.save(None).unwrap().written, vec![copy]);
    assert!(!list.get(&source).unwrap().is_dirty());
}

#[test]
fn clone_of_unknown_document_fails() {
    let dir = fixture_dir();
    let mut list = IocList::new();
    list.open(dir.path()).unwrap();
    let err = list.clone_document(&dir.path().join("truncated.ioc")).unwrap_err();
    assert!(matches!(err, CollectionError::UnknownDocument(_)));
}

#[test]
fn forced_save_writes_repaired_documents() {
    let dir = fixture_dir();
    let partial = dir.path().join("partial-11.ioc");
    let mut list = IocList::new();
    list.open(dir.path()).unwrap();

    let repaired: Vec<_> = list
        .iter()
        .filter(|(_, ioc)| ioc.was_repaired())
        .map(|(p, _)| p.to_path_buf())
        .collect();
    for path in &repaired {
        list.get_mut(path).unwrap().force_save();
    }
    assert_eq!(list.save(None).unwrap().written, vec![partial.clone()]);

    let reloaded = Ioc::parse_bytes(&std::fs::read(&partial).unwrap()).unwrap();
    assert!(!reloaded.was_repaired());
    assert!(reloaded.parameters().is_some());
}

#[test]
fn memory_filesystem_sees_only_dirty_writes() {
    let fs = fixture_memory_fs("/cases");
    let mut list = IocList::with_filesystem(&fs);
    list.open("/cases").unwrap();

    let path = Path::new("/cases/complete-11.ioc");
    list.get_mut(path).unwrap().add_link("report", "https://intel.example/r/2");
    list.save(None).unwrap();

    assert_eq!(fs.writes(), vec![path.to_path_buf()]);
    let written = String::from_utf8(fs.contents(path).unwrap()).unwrap();
    assert!(written.contains("https://intel.example/r/2"));
}

#[test]
fn non_utf8_documents_load_and_save_as_utf8() {
    let fs = MemoryFilesystem::new();
    fs.insert("/cases/latin.ioc", LATIN1_V1_0);
    let mut list = IocList::with_filesystem(&fs);
    let report = list.open("/cases").unwrap();
    assert_eq!(report.loaded_count(), 1);

    let path = Path::new("/cases/latin.ioc");
    assert_eq!(list.get(path).unwrap().author(), "Ren\u{e9}e");

    list.get_mut(path).unwrap().force_save();
    list.save(None).unwrap();
    let written = String::from_utf8(fs.contents(path).unwrap()).unwrap();
    assert!(written.starts_with("<?xml version='1.0' encoding='utf-8'?>"));
    assert!(written.contains("<short_description>Caf\u{e9} dropper</short_description>"));
}

#[test]
fn failed_write_stops_the_batch() {
    let fs = MemoryFilesystem::new();
    fs.insert("/cases/a.ioc", COMPLETE_V1_0);
    fs.insert("/cases/b.ioc", COMPLETE_V1_0);
    let mut list = IocList::with_filesystem(&fs);
    list.open("/cases").unwrap();

    for path in [Path::new("/cases/a.ioc"), Path::new("/cases/b.ioc")] {
        list.get_mut(path).unwrap().set_keywords("edited");
    }
    fs.set_fail_writes(true);

    let err = list.save(None).unwrap_err();
    assert!(matches!(err, CollectionError::Filesystem { ref path, .. } if path == Path::new("/cases/a.ioc")));
    assert_eq!(fs.write_count(), 0);
    assert_eq!(list.dirty_paths().len(), 2);

    fs.set_fail_writes(false);
    assert_eq!(list.save(None).unwrap().written.len(), 2);
    assert!(list.dirty_paths().is_empty());

    let written = String::from_utf8(fs.read_file(Path::new("/cases/b.ioc")).unwrap()).unwrap();
    assert!(written.contains("<keywords>edited</keywords>"));
}
