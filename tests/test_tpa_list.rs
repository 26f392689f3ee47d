// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Validate TPA manifest priority, ordering and delimiter invariants.
// Author: Lukas Bower

use std::fs;
use std::path::Path;

use corehost::paths::resolve_absolute_path;
use corehost::tpa::{build_manifest, TpaList, MANIFEST_DELIMITER};
use tempfile::tempdir;

fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), b"MZ").unwrap();
}

#[test]
fn higher_priority_variant_wins_for_every_pair() {
    let pairs = [
        ("ni.dll", "dll"),
        ("ni.dll", "ni.exe"),
        ("ni.dll", "exe"),
        ("dll", "ni.exe"),
        ("dll", "exe"),
        ("ni.exe", "exe"),
    ];
    for (high, low) in pairs {
        let tmp = tempdir().unwrap();
        touch(tmp.path(), &format!("Foo.{low}"));
        touch(tmp.path(), &format!("Foo.{high}"));
        let dir = resolve_absolute_path(tmp.path()).unwrap();
        let mut list = TpaList::new();
        list.add_directory(&dir);
        assert_eq!(list.len(), 1, "{high} vs {low}");
        assert_eq!(
            list.entries()[0].path().to_string(),
            format!("{dir}/Foo.{high}")
        );
    }
}

#[test]
fn scenario_ni_dll_dll_exe() {
    let tmp = tempdir().unwrap();
    touch(tmp.path(), "A.ni.dll");
    touch(tmp.path(), "A.dll");
    touch(tmp.path(), "B.exe");
    let dir = resolve_absolute_path(tmp.path()).unwrap();
    assert_eq!(
        build_manifest(&dir).to_string_lossy(),
        format!("{dir}/A.ni.dll:{dir}/B.exe")
    );
}

#[test]
fn extension_passes_order_the_manifest() {
    let tmp = tempdir().unwrap();
    touch(tmp.path(), "Zed.exe");
    touch(tmp.path(), "Alpha.ni.exe");
    touch(tmp.path(), "Mid.dll");
    touch(tmp.path(), "Core.ni.dll");
    let dir = resolve_absolute_path(tmp.path()).unwrap();
    let mut list = TpaList::new();
    list.add_directory(&dir);
    let exts: Vec<&str> = list.entries().iter().map(|e| e.extension()).collect();
    assert_eq!(exts, vec![".ni.dll", ".dll", ".ni.exe", ".exe"]);
}

#[test]
fn manifest_is_idempotent() {
    let tmp = tempdir().unwrap();
    for name in ["a.dll", "b.dll", "c.ni.dll", "c.dll", "d.exe", "notes.txt"] {
        touch(tmp.path(), name);
    }
    let dir = resolve_absolute_path(tmp.path()).unwrap();
    assert_eq!(build_manifest(&dir), build_manifest(&dir));
}

#[test]
fn manifest_has_no_empty_segments() {
    let tmp = tempdir().unwrap();
    for name in ["a.dll", "b.exe", "c.ni.exe", "readme"] {
        touch(tmp.path(), name);
    }
    let dir = resolve_absolute_path(tmp.path()).unwrap();
    let manifest = build_manifest(&dir).to_string_lossy().into_owned();
    assert!(!manifest.starts_with(MANIFEST_DELIMITER));
    assert!(!manifest.ends_with(MANIFEST_DELIMITER));
    assert!(manifest.split(MANIFEST_DELIMITER).all(|s| !s.is_empty()));
    assert_eq!(manifest.split(MANIFEST_DELIMITER).count(), 3);
}

#[test]
fn empty_directory_yields_empty_manifest() {
    let tmp = tempdir().unwrap();
    let dir = resolve_absolute_path(tmp.path()).unwrap();
    assert!(build_manifest(&dir).is_empty());
}

#[cfg(unix)]
#[test]
fn symlinks_are_followed_and_broken_links_skipped() {
    use std::os::unix::fs::symlink;

    let tmp = tempdir().unwrap();
    let store = tmp.path().join("store");
    let root = tmp.path().join("root");
    fs::create_dir(&store).unwrap();
    fs::create_dir(&root).unwrap();
    touch(&store, "Real.dll");
    symlink(store.join("Real.dll"), root.join("Linked.dll")).unwrap();
    symlink(store.join("Gone.dll"), root.join("Broken.dll")).unwrap();
    symlink(&store, root.join("Dir.dll")).unwrap();

    let dir = resolve_absolute_path(&root).unwrap();
    let mut list = TpaList::new();
    list.add_directory(&dir);
    assert_eq!(list.len(), 1);
    assert_eq!(list.entries()[0].base_name(), "Linked");
    assert_eq!(list.entries()[0].path().to_string(), format!("{dir}/Linked.dll"));
}

#[test]
fn multiple_directories_keep_first_base_name() {
    let tmp = tempdir().unwrap();
    let first = tmp.path().join("first");
    let second = tmp.path().join("second");
    fs::create_dir(&first).unwrap();
    fs::create_dir(&second).unwrap();
    touch(&first, "Shared.dll");
    touch(&second, "Shared.ni.dll");
    touch(&second, "Extra.dll");

    let mut list = TpaList::new();
    list.add_directory(&resolve_absolute_path(&first).unwrap());
    assert_eq!(list.add_directory(&resolve_absolute_path(&second).unwrap()), 1);
    assert_eq!(list.len(), 2);
    assert_eq!(list.entries()[0].extension(), ".dll");
    assert!(list.contains("Extra"));
}

#[cfg(unix)]
#[test]
fn non_utf8_names_are_kept_byte_for_byte() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::{OsStrExt, OsStringExt};

    let tmp = tempdir().unwrap();
    let odd = OsStr::from_bytes(b"Caf\xe9.dll");
    fs::write(tmp.path().join(odd), b"MZ").unwrap();
    fs::write(tmp.path().join(OsStr::from_bytes(b"Caf\xe8.ni.dll")), b"MZ").unwrap();
    touch(tmp.path(), "B.dll");
    let dir = resolve_absolute_path(tmp.path()).unwrap();

    let mut list = TpaList::new();
    assert_eq!(list.add_directory(&dir), 3);
    assert!(list.contains(OsStr::from_bytes(b"Caf\xe9")));
    assert!(list.contains(OsStr::from_bytes(b"Caf\xe8")));

    let manifest = build_manifest(&dir).into_vec();
    let mut expected = dir.as_os_str().as_bytes().to_vec();
    expected.extend_from_slice(b"/Caf\xe9.dll");
    assert!(manifest
        .split(|b| *b == MANIFEST_DELIMITER as u8)
        .any(|segment| segment == expected.as_slice()));
}

#[cfg(unix)]
#[test]
fn non_utf8_base_names_do_not_collide() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tmp = tempdir().unwrap();
    let first = tmp.path().join(OsStr::from_bytes(b"Lib\xe9.dll"));
    let second = tmp.path().join(OsStr::from_bytes(b"Lib\xe8.dll"));
    fs::write(&first, b"MZ").unwrap();
    fs::write(&second, b"MZ").unwrap();

    let mut list = TpaList::new();
    assert!(list.add_file(resolve_absolute_path(&first).unwrap()));
    assert!(list.add_file(resolve_absolute_path(&second).unwrap()));
    assert_eq!(list.len(), 2);
}
