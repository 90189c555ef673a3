//! Testing utilities for IOCE workspace
//!
//! Shared document fixtures and filesystem setup helpers.

#![allow(missing_docs)]

use ioce_core::MemoryFilesystem;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Complete 1.0 document in the exact form the serializer writes
pub const COMPLETE_V1_0: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<ioc xmlns="http://schemas.mandiant.com/2010/ioc" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema" id="2b8c4b8e-0f0e-4e0a-9d43-1f7a0c6e8a10" last-modified="2013-02-01T10:00:00">
  <short_description>Zeus dropper</short_description>
  <description>Files written by the dropper</description>
  <authored_by>analyst</authored_by>
  <authored_date>2013-01-15T09:30:00</authored_date>
  <links>
    <link rel="category">malware</link>
  </links>
  <definition>
    <Indicator operator="OR" id="top-1">
      <IndicatorItem id="item-1" condition="is">
        <Context document="FileItem" search="FileItem/Md5sum" type="mir"/>
        <Content type="md5">d41d8cd98f00b204e9800998ecf8427e</Content>
      </IndicatorItem>
      <Indicator operator="AND" id="sub-1">
        <IndicatorItem id="item-2" condition="contains">
          <Context document="FileItem" search="FileItem/FileName" type="mir"/>
          <Content type="string">sdra64.exe</Content>
        </IndicatorItem>
        <IndicatorItem id="item-3" condition="isnot">
          <Context document="FileItem" search="FileItem/FilePath" type="mir"/>
          <Content type="string">C:\Windows\System32</Content>
        </IndicatorItem>
      </Indicator>
    </Indicator>
  </definition>
</ioc>
"#;

/// Complete 1.1 document in the exact form the serializer writes
pub const COMPLETE_V1_1: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<OpenIOC xmlns="http://openioc.org/schemas/OpenIOC_1.1" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema" id="7d1e6a5c-3c2b-4b1a-8f9e-0a1b2c3d4e5f" last-modified="2014-06-01T12:00:00" published-date="0001-01-01T00:00:00">
  <metadata>
    <short_description>Registry persistence</short_description>
    <description>Run key pointing at a temp directory</description>
    <keywords>persistence registry</keywords>
    <authored_by>analyst</authored_by>
    <authored_date>2014-05-30T08:00:00</authored_date>
    <links>
      <link rel="report">https://intel.example/r/1</link>
    </links>
  </metadata>
  <criteria>
    <Indicator operator="OR" id="top-2">
      <IndicatorItem id="item-4" condition="contains" preserve-case="false" negate="false">
        <Context document="RegistryItem" search="RegistryItem/Path" type="mir"/>
        <Content type="string">CurrentVersion\Run</Content>
      </IndicatorItem>
      <IndicatorItem id="item-5" condition="contains" preserve-case="true" negate="true">
        <Context document="RegistryItem" search="RegistryItem/Value" type="mir"/>
        <Content type="string">Program Files</Content>
      </IndicatorItem>
    </Indicator>
  </criteria>
  <parameters/>
</OpenIOC>
"#;

/// 1.0 root with nothing inside
pub const BARE_V1_0: &str = r#"<ioc xmlns="http://schemas.mandiant.com/2010/ioc" id="bare-10" last-modified="2012-01-01T00:00:00"/>"#;

/// 1.1 root with nothing inside
pub const BARE_V1_1: &str = r#"<OpenIOC xmlns="http://openioc.org/schemas/OpenIOC_1.1" id="bare-11" last-modified="2012-01-01T00:00:00"/>"#;

/// 1.1 document missing `parameters` and the `authored_by` field
pub const PARTIAL_V1_1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OpenIOC xmlns="http://openioc.org/schemas/OpenIOC_1.1" id="partial-11" last-modified="2014-01-01T00:00:00">
  <metadata>
    <short_description>Partial</short_description>
    <description>No author, no parameters</description>
    <authored_date>2014-01-01T00:00:00</authored_date>
    <links/>
  </metadata>
  <criteria>
    <Indicator operator="AND" id="top-3"/>
  </criteria>
</OpenIOC>"#;

/// 1.0 document declared and encoded as ISO-8859-1 (`Caf\xe9` is "Café")
pub const LATIN1_V1_0: &[u8] = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>
<ioc xmlns=\"http://schemas.mandiant.com/2010/ioc\" id=\"latin-10\" last-modified=\"2013-03-01T00:00:00\">
  <short_description>Caf\xe9 dropper</short_description>
  <authored_by>Ren\xe9e</authored_by>
</ioc>
";

/// Document cut off mid-element
pub const TRUNCATED: &str = r#"<?xml version="1.0"?>
<ioc xmlns="http://schemas.mandiant.com/2010/ioc" id="t">
  <short_description>Cut</short_descr"#;

/// Well-formed XML in an unrelated namespace
pub const FOREIGN_NAMESPACE: &str = r#"<?xml version="1.0"?>
<rules xmlns="http://example.com/yara-ish"><rule name="x"/></rules>"#;

/// Well-formed XML without any namespace
pub const NO_NAMESPACE: &str = "<ioc id=\"plain\"><short_description>x</short_description></ioc>";

/// Every fixture keyed by the file name used in populated directories
///
/// Three files load, three are skipped, plus one non-document file.
pub const DIRECTORY_FIXTURES: [(&str, &str); 7] = [
    ("complete-10.ioc", COMPLETE_V1_0),
    ("complete-11.ioc", COMPLETE_V1_1),
    ("partial-11.ioc", PARTIAL_V1_1),
    ("truncated.ioc", TRUNCATED),
    ("foreign.ioc", FOREIGN_NAMESPACE),
    ("plain.ioc", NO_NAMESPACE),
    ("README.txt", "notes, not a document"),
];

/// Number of fixtures in [`DIRECTORY_FIXTURES`] that load
pub const LOADABLE_FIXTURES: usize = 3;

/// Number of document-extension fixtures that fail to load
pub const FAILING_FIXTURES: usize = 3;

/// Temporary directory populated with [`DIRECTORY_FIXTURES`]
///
/// Dropping the returned handle removes the directory.
pub fn fixture_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in DIRECTORY_FIXTURES {
        write_fixture(dir.path(), name, contents);
    }
    dir
}

/// Write one fixture file and return its path
pub fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// In-memory filesystem with [`DIRECTORY_FIXTURES`] under `dir`
pub fn fixture_memory_fs(dir: impl AsRef<Path>) -> MemoryFilesystem {
    let fs = MemoryFilesystem::new();
    for (name, contents) in DIRECTORY_FIXTURES {
        fs.insert(dir.as_ref().join(name), contents);
    }
    fs
}

/// Sorted file names in `dir`
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use ioce_core::{Ioc, SchemaVersion};

    #[test]
    fn complete_fixtures_load_clean() {
        let v10 = Ioc::parse(COMPLETE_V1_0).unwrap();
        assert_eq!(v10.schema_version(), SchemaVersion::V1_0);
        assert!(!v10.was_repaired());

        let v11 = Ioc::parse(COMPLETE_V1_1).unwrap();
        assert_eq!(v11.schema_version(), SchemaVersion::V1_1);
        assert!(!v11.was_repaired());
    }

    #[test]
    fn latin1_fixture_is_not_utf8() {
        assert!(std::str::from_utf8(LATIN1_V1_0).is_err());
        let ioc = Ioc::parse_bytes(LATIN1_V1_0).unwrap();
        assert_eq!(ioc.name(), "Caf\u{e9} dropper");
    }

    #[test]
    fn fixture_dir_has_every_file() {
        let dir = fixture_dir();
        assert_eq!(file_names(dir.path()).len(), DIRECTORY_FIXTURES.len());
    }
}
