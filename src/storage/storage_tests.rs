use super::*;
use std::io::Read;

fn temp_store() -> (tempfile::TempDir, FileStore) {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStore::new(tmp.path().join("files")).unwrap();
    (tmp, store)
}

fn read_all(store: &FileStore, login: &str, name: &str) -> Vec<u8> {
    let (mut f, _) = store.open(login, name).unwrap();
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).unwrap();
    buf
}

#[test]
fn roundtrip_upload_download() {
    let (_tmp, store) = temp_store();
    store.write("alice", "a.txt", b"hello").unwrap();
    assert_eq!(read_all(&store, "alice", "a.txt"), b"hello");
}

#[test]
fn overwrite_replaces_content() {
    let (_tmp, store) = temp_store();
    store.write("alice", "a.txt", b"first version, longer").unwrap();
    store.write("alice", "a.txt", b"second").unwrap();
    assert_eq!(read_all(&store, "alice", "a.txt"), b"second");
    // still exactly one entry
    assert_eq!(store.list("alice").unwrap(), vec!["a.txt".to_string()]);
}

#[test]
fn list_is_sorted_and_skips_non_files() {
    let (_tmp, store) = temp_store();
    store.write("bob", "b.txt", b"b").unwrap();
    store.write("bob", "a.txt", b"a").unwrap();
    // plant a subdirectory and a hidden file next to them
    let dir = store.root_path().join("bob");
    std::fs::create_dir_all(dir.join("subdir")).unwrap();
    std::fs::write(dir.join(".hidden"), b"x").unwrap();
    assert_eq!(store.list("bob").unwrap(), vec!["a.txt".to_string(), "b.txt".to_string()]);
}

#[test]
fn list_of_unknown_login_is_empty() {
    let (_tmp, store) = temp_store();
    assert!(store.list("nobody").unwrap().is_empty());
}

#[test]
fn stat_reports_name_size_and_local_stamp() {
    let (_tmp, store) = temp_store();
    store.write("carol", "data.bin", b"12345").unwrap();
    let info = store.stat("carol", "data.bin").unwrap().unwrap();
    assert_eq!(info.name, "data.bin");
    assert_eq!(info.size, 5);
    // fixed day-month-year hour-minute-second layout
    assert!(chrono::NaiveDateTime::parse_from_str(&info.modified, "%d-%m-%Y %H-%M-%S").is_ok());
    assert!(store.stat("carol", "absent.bin").unwrap().is_none());
}

#[test]
fn delete_removes_and_reports_absent() {
    let (_tmp, store) = temp_store();
    store.write("dave", "gone.txt", b"bye").unwrap();
    store.delete("dave", "gone.txt").unwrap();
    assert!(matches!(store.delete("dave", "gone.txt"), Err(StorageError::NotFound)));
    assert!(matches!(store.open("dave", "gone.txt"), Err(StorageError::NotFound)));
}

#[test]
fn traversal_names_rejected_before_any_io() {
    let (_tmp, store) = temp_store();
    for name in ["../../etc/passwd", "..%2f..%2fsecret", ""] {
        assert!(matches!(store.stat("erin", name), Err(StorageError::InvalidName)), "stat accepted {:?}", name);
        assert!(matches!(store.write("erin", name, b"x"), Err(StorageError::InvalidName)), "write accepted {:?}", name);
        assert!(matches!(store.open("erin", name), Err(StorageError::InvalidName)), "open accepted {:?}", name);
        assert!(matches!(store.delete("erin", name), Err(StorageError::InvalidName)), "delete accepted {:?}", name);
    }
    // rejection happens before the user directory is even created
    assert!(!store.root_path().join("erin").exists());
}

#[test]
fn directory_components_are_discarded_on_write() {
    let (_tmp, store) = temp_store();
    store.write("frank", "nested/dir/file.txt", b"flat").unwrap();
    assert_eq!(store.list("frank").unwrap(), vec!["file.txt".to_string()]);
    assert_eq!(read_all(&store, "frank", "file.txt"), b"flat");
}

#[test]
fn cross_user_isolation() {
    let (_tmp, store) = temp_store();
    store.write("alice", "secret.txt", b"alice only").unwrap();
    // bob resolves the same filename inside his own directory
    assert!(store.stat("bob", "secret.txt").unwrap().is_none());
    assert!(matches!(store.open("bob", "secret.txt"), Err(StorageError::NotFound)));
    assert!(matches!(store.delete("bob", "secret.txt"), Err(StorageError::NotFound)));
    // alice's copy is untouched
    assert_eq!(read_all(&store, "alice", "secret.txt"), b"alice only");
}

#[test]
fn login_sanitation_confines_hostile_logins() {
    let (_tmp, store) = temp_store();
    // a hostile login collapses to a safe directory name under the root
    store.write("../outside", "f.txt", b"x").unwrap();
    assert!(store.root_path().join("outside").join("f.txt").exists());
    assert!(!store.root_path().parent().unwrap().join("outside").exists());
}
