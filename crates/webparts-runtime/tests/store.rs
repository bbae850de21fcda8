use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use webparts_runtime::store::{decode_envelope, encode_envelope};
use webparts_runtime::{
    FileStore, MemoryStore, PersonalizationConfig, PersonalizationStore, StoreConfig,
    WebPartsError,
};

fn temp_dir(name: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("webparts-store-{name}-{}-{stamp}", std::process::id()))
}

#[test]
fn memory_store_keeps_shared_and_user_blobs_apart() {
    let store = MemoryStore::new();
    let clone = store.clone();
    store.save_blob("/home", None, b"shared").unwrap();
    store.save_blob("/home", Some("alice"), b"alice").unwrap();

    assert_eq!(clone.load_blob("/home", None).unwrap().as_deref(), Some(&b"shared"[..]));
    assert_eq!(clone.load_blob("/home", Some("alice")).unwrap().as_deref(), Some(&b"alice"[..]));
    assert_eq!(clone.load_blob("/home", Some("bob")).unwrap(), None);
    assert_eq!(clone.load_blob("/other", None).unwrap(), None);

    clone.reset_blob("/home", Some("alice")).unwrap();
    assert_eq!(store.len(), 1);
    clone.reset_blob("/home", Some("alice")).unwrap();
}

#[test]
fn file_store_round_trips_through_envelopes() {
    let root = temp_dir("round-trip");
    let store = FileStore::new(&root);
    assert_eq!(store.load_blob("~/Default.aspx", Some("alice")).unwrap(), None);

    store.save_blob("~/Default.aspx", Some("alice"), b"state").unwrap();
    store.save_blob("~/Default.aspx", None, b"").unwrap();
    let file = store.blob_path("~/Default.aspx", Some("alice"));
    assert_eq!(
        file.strip_prefix(&root).ok(),
        Some(Path::new("user/alice/_7e_2fDefault_2easpx.wpps"))
    );
    assert_eq!(decode_envelope(&fs::read(&file).unwrap()).unwrap(), b"state");
    assert_eq!(
        store.load_blob("~/Default.aspx", Some("alice")).unwrap().as_deref(),
        Some(&b"state"[..])
    );
    assert_eq!(store.load_blob("~/Default.aspx", None).unwrap().as_deref(), Some(&b""[..]));

    store.reset_blob("~/Default.aspx", Some("alice")).unwrap();
    assert!(!file.exists());
    store.reset_blob("~/Default.aspx", Some("alice")).unwrap();
    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn file_store_keeps_look_alike_pages_and_users_apart() {
    let root = temp_dir("look-alike");
    let store = FileStore::new(&root);
    store.save_blob("page.user.x", None, b"shared-data").unwrap();
    store.save_blob("page", Some("x.shared"), b"user-data").unwrap();
    store.save_blob("page", Some(".."), b"dots").unwrap();

    assert_eq!(
        store.load_blob("page.user.x", None).unwrap().as_deref(),
        Some(&b"shared-data"[..])
    );
    assert_eq!(
        store.load_blob("page", Some("x.shared")).unwrap().as_deref(),
        Some(&b"user-data"[..])
    );
    assert_eq!(store.load_blob("page", Some("..")).unwrap().as_deref(), Some(&b"dots"[..]));
    assert_eq!(store.load_blob("page", None).unwrap(), None);
    assert!(store.blob_path("page", Some("..")).starts_with(root.join("user")));
    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn damaged_files_are_store_errors() {
    let root = temp_dir("damaged");
    let store = FileStore::new(&root);
    store.save_blob("/home", None, b"state").unwrap();
    let file = store.blob_path("/home", None);

    let mut bytes = fs::read(&file).unwrap();
    bytes.truncate(bytes.len() - 1);
    fs::write(&file, &bytes).unwrap();
    assert_eq!(
        store.load_blob("/home", None),
        Err(WebPartsError::Store("personalization file truncated".into()))
    );

    fs::write(&file, b"NOPE0000000000").unwrap();
    assert_eq!(
        store.load_blob("/home", None),
        Err(WebPartsError::Store("invalid personalization file magic".into()))
    );
    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn envelope_rejects_other_versions() {
    let mut bytes = encode_envelope(b"abc");
    bytes[4] = 2;
    assert_eq!(
        decode_envelope(&bytes),
        Err(WebPartsError::Store("unsupported personalization file version 2".into()))
    );
    assert!(decode_envelope(&bytes[..10]).is_err());
}

#[test]
fn configured_store_is_opened() {
    let root = temp_dir("configured");
    let config = PersonalizationConfig {
        store: StoreConfig::File { root: root.clone() },
        ..PersonalizationConfig::default()
    };
    let store = config.open_store();
    store.save_blob("/home", Some("alice"), b"x").unwrap();
    assert!(FileStore::new(&root).blob_path("/home", Some("alice")).exists());
    fs::remove_dir_all(&root).unwrap();

    let memory = PersonalizationConfig::default().open_store();
    assert_eq!(memory.load_blob("/home", None).unwrap(), None);
}
