//! Integration tests for uploading to and resolving from the content store

mod common;

use bytes::Bytes;
use futures::stream;

use ::common::content::{content_uid, ContentError, Uid, NAME_FILE};

#[tokio::test]
async fn test_write_and_resolve() {
    let (store, _temp) = common::setup_store().await;

    let record = store.write_bytes("a.txt", "helloworld").await.unwrap();
    assert_eq!(record.uid, content_uid(b"helloworld"));
    assert_eq!(record.uid.to_string().len(), 16);
    assert_eq!(record.original_name, "a.txt");
    assert_eq!(record.size_bytes, 10);

    let dir = store.content_dir(record.uid);
    assert_eq!(common::entries(&dir), vec![NAME_FILE.to_string(), "a.txt".to_string()]);
    assert_eq!(std::fs::read(dir.join(NAME_FILE)).unwrap(), b"a.txt");

    let path = store.resolve(record.uid).await.unwrap();
    assert_eq!(path, dir.join("a.txt"));
    assert_eq!(std::fs::read(&path).unwrap(), b"helloworld");
    assert!(common::staging_is_empty(&store));
}

#[tokio::test]
async fn test_chunked_stream_hashes_whole_content() {
    let (store, _temp) = common::setup_store().await;

    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(b"hello")),
        Ok(Bytes::new()),
        Ok(Bytes::from_static(b"world")),
    ];
    let record = store.write("b.bin", stream::iter(chunks)).await.unwrap();
    assert_eq!(record.uid, content_uid(b"helloworld"));
    assert_eq!(record.size_bytes, 10);
}

#[tokio::test]
async fn test_identical_content_is_stored_once() {
    let (store, _temp) = common::setup_store().await;

    let first = store.write_bytes("first.txt", "same bytes").await.unwrap();
    let second = store.write_bytes("second.txt", "same bytes").await.unwrap();
    assert_eq!(first.uid, second.uid);
    assert_eq!(second.original_name, "second.txt");

    assert_eq!(common::entries(store.root()), vec![first.uid.to_string()]);
    // the first upload's copy wins
    let dir = store.content_dir(first.uid);
    assert_eq!(common::entries(&dir), vec![NAME_FILE.to_string(), "first.txt".to_string()]);
    assert!(common::staging_is_empty(&store));
}

#[tokio::test]
async fn test_client_path_is_reduced_to_basename() {
    let (store, _temp) = common::setup_store().await;

    let record = store
        .write_bytes("some/client/dir/report.pdf", "pdf")
        .await
        .unwrap();
    assert_eq!(record.original_name, "some/client/dir/report.pdf");

    let path = store.resolve(record.uid).await.unwrap();
    assert_eq!(path, store.content_dir(record.uid).join("report.pdf"));
}

#[tokio::test]
async fn test_traversal_names_are_rejected_before_writing() {
    let (store, temp) = common::setup_store().await;

    for name in ["../escape.txt", "../../etc/passwd", "a/../../b", "..\\evil"] {
        let err = store.write_bytes(name, "payload").await.unwrap_err();
        assert!(matches!(err, ContentError::PathEscape(_)), "{name:?}: {err}");
    }

    assert!(common::entries(store.root()).is_empty());
    assert!(common::staging_is_empty(&store));
    assert_eq!(common::entries(temp.path()), vec!["uploads".to_string()]);
}

#[tokio::test]
async fn test_failed_stream_leaves_nothing_behind() {
    let (store, _temp) = common::setup_store().await;

    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(b"partial")),
        Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "client went away")),
    ];
    let err = store.write("c.txt", stream::iter(chunks)).await.unwrap_err();
    assert!(matches!(err, ContentError::Stream(_)));
    assert!(err.is_client_error());

    assert!(common::entries(store.root()).is_empty());
    assert!(common::staging_is_empty(&store));
}

#[tokio::test]
async fn test_resolve_unknown_uid() {
    let (store, _temp) = common::setup_store().await;
    let uid = Uid::from(0xdead_beef);
    assert!(matches!(store.resolve(uid).await, Err(ContentError::NotFound(u)) if u == uid));
}

#[tokio::test]
async fn test_resolve_without_sidecar_is_not_found() {
    let (store, _temp) = common::setup_store().await;

    // an interrupted upload: payload in place, sidecar never written
    let uid = content_uid(b"orphan");
    let dir = store.content_dir(uid);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("orphan.txt"), b"orphan").unwrap();

    assert!(matches!(store.resolve(uid).await, Err(ContentError::NotFound(_))));
}

#[tokio::test]
async fn test_resolve_rejects_tampered_sidecar() {
    let (store, _temp) = common::setup_store().await;

    let record = store.write_bytes("a.txt", "content").await.unwrap();
    let dir = store.content_dir(record.uid);
    std::fs::write(dir.join(NAME_FILE), b"../../outside.txt").unwrap();

    assert!(matches!(
        store.resolve(record.uid).await,
        Err(ContentError::PathEscape(_))
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_resolve_rejects_symlink_out_of_root() {
    let (store, temp) = common::setup_store().await;

    let outside = temp.path().join("secret.txt");
    std::fs::write(&outside, b"secret").unwrap();

    let uid = content_uid(b"planted");
    let dir = store.content_dir(uid);
    std::fs::create_dir_all(&dir).unwrap();
    std::os::unix::fs::symlink(&outside, dir.join("link.txt")).unwrap();
    std::fs::write(dir.join(NAME_FILE), b"link.txt").unwrap();

    assert!(matches!(store.resolve(uid).await, Err(ContentError::PathEscape(_))));
}
