mod common;

use std::sync::Arc;

use common::*;
use dotgit_core::DumpOutcome;
use dotgit_dump::dumper::LOCK_FILE;
use dotgit_dump::{DestinationLock, Dumper, ObjectKind};
use tokio_util::sync::CancellationToken;

const HEAD: &str = "ref: refs/heads/main\n";

fn listing_server() -> FakeTransport {
    FakeTransport::new()
        .file(".git/HEAD", HEAD)
        .listing(
            ".git/",
            &["HEAD", "config", "objects/", "logs", "../../../etc/passwd", "/etc/shadow"],
        )
        .file(".git/config", "[core]\n\tbare = false\n\tfsmonitor = /tmp/evil\n")
        .redirect(".git/logs", ".git/logs/")
        .listing(".git/logs/", &["HEAD"])
        .file(".git/logs/HEAD", "0000000000000000000000000000000000000000 x\n")
        .listing(".git/objects/", &["ab/"])
        .listing(".git/objects/ab/", &["cdef01"])
        .file(".git/objects/ab/cdef01", loose(ObjectKind::Blob, "hello\n"))
}

#[tokio::test]
async fn test_listing_dump() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("fake.test_app");
    let server = Arc::new(listing_server());

    let outcome = Dumper::with_transport(job(&dest, "true"), server.clone())
        .run()
        .await;

    assert_eq!(
        outcome,
        DumpOutcome::success(dest.display().to_string(), BASE_URL)
    );
    assert_eq!(std::fs::read_to_string(dest.join(".git/HEAD")).unwrap(), HEAD);
    assert!(dest.join(".git/logs/HEAD").is_file());
    assert!(dest.join(".git/objects/ab/cdef01").is_file());
    assert!(!dest.join(".gitignore").exists());
    assert!(!dest.join(LOCK_FILE).exists());

    let config = std::fs::read_to_string(dest.join(".git/config")).unwrap();
    assert!(config.contains("\tbare = false\n"));
    assert!(config.contains("\t# fsmonitor = /tmp/evil\n"));

    let requests = server.requests();
    assert!(requests.iter().all(|p| !p.contains("etc/")));
    assert_eq!(server.request_count(".git/logs/"), 1);
    assert_eq!(server.request_count(".git/objects/ab/cdef01"), 1);
}

#[tokio::test]
async fn test_listing_dump_checkout_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");

    let outcome = Dumper::with_transport(job(&dest, "false"), Arc::new(listing_server()))
        .run()
        .await;

    match outcome {
        DumpOutcome::Error { message } => assert!(message.starts_with("checkout failed")),
        other => panic!("expected error outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn test_blind_dump() {
    let tip = id(0xc1);
    let root_tree = id(0x71);
    let parent = id(0xc0);
    let parent_tree = id(0x70);
    let blob = id(0xb1);
    let pack_sha = "0123456789abcdef0123456789abcdef01234567";

    let (idx, pack) = pack_pair(&[
        (tip, ObjectKind::Commit, commit_payload(root_tree, &[parent])),
        (
            root_tree,
            ObjectKind::Tree,
            tree_payload(&[("100644", "README.md", blob)]),
        ),
    ]);

    let server = Arc::new(
        FakeTransport::new()
            .file(".git/HEAD", HEAD)
            .status(".git/", 403)
            .file(".git/packed-refs", format!("{tip} refs/heads/main\n"))
            .file(".git/objects/info/packs", format!("P pack-{pack_sha}.pack\n\n"))
            .file(&format!(".git/objects/pack/pack-{pack_sha}.idx"), idx)
            .file(&format!(".git/objects/pack/pack-{pack_sha}.pack"), pack)
            .file(
                &parent.loose_path(),
                loose(ObjectKind::Commit, commit_payload(parent_tree, &[])),
            )
            .file(&blob.loose_path(), loose(ObjectKind::Blob, "# readme\n")),
    );

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("blind");

    let outcome = Dumper::with_transport(job(&dest, "false"), server.clone())
        .run()
        .await;

    assert!(outcome.is_success(), "{outcome}");
    assert!(dest.join(".git/packed-refs").is_file());
    assert!(dest.join(parent.loose_path()).is_file());
    assert!(dest.join(blob.loose_path()).is_file());

    // Packed objects are never requested; the missing tree 404s.
    assert_eq!(server.request_count(&tip.loose_path()), 0);
    assert_eq!(server.request_count(&root_tree.loose_path()), 0);
    assert_eq!(server.request_count(&parent_tree.loose_path()), 1);
    assert!(!dest.join(parent_tree.loose_path()).exists());

    // packed-refs names refs/heads/main, which is followed to both files.
    assert!(server.request_count(".git/refs/heads/main") >= 1);
    assert!(server.request_count(".git/logs/refs/heads/main") >= 1);
}

#[tokio::test]
async fn test_blind_dump_survives_transport_errors() {
    let tip = id(0xc1);
    let tree = id(0x71);
    let parent = id(0xc0);
    let blob = id(0xb1);

    let server = Arc::new(
        FakeTransport::new()
            .file(".git/HEAD", HEAD)
            .status(".git/", 403)
            .file(".git/packed-refs", format!("{tip} refs/heads/main\n"))
            .fail(".git/refs/heads/main")
            .fail(".git/config")
            .file(
                &tip.loose_path(),
                loose(ObjectKind::Commit, commit_payload(tree, &[parent])),
            )
            .fail(&parent.loose_path())
            .file(
                &tree.loose_path(),
                loose(ObjectKind::Tree, tree_payload(&[("100644", "a.txt", blob)])),
            )
            .file(&blob.loose_path(), loose(ObjectKind::Blob, "a\n")),
    );

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("flaky");

    let outcome = Dumper::with_transport(job(&dest, "false"), server.clone())
        .run()
        .await;

    assert_eq!(
        outcome,
        DumpOutcome::success(dest.display().to_string(), BASE_URL)
    );
    assert_eq!(server.request_count(".git/refs/heads/main"), 1);
    assert_eq!(server.request_count(&parent.loose_path()), 1);
    assert!(!dest.join(".git/refs/heads/main").exists());
    assert!(!dest.join(parent.loose_path()).exists());

    // Passes carried on past the failures.
    assert!(server.request_count(".git/logs/refs/heads/main") >= 1);
    assert!(dest.join(tree.loose_path()).is_file());
    assert!(dest.join(blob.loose_path()).is_file());
}

#[tokio::test]
async fn test_head_transport_error_fails_dump() {
    let server = Arc::new(FakeTransport::new().fail(".git/HEAD"));
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("never");

    let outcome = Dumper::with_transport(job(&dest, "true"), server.clone())
        .run()
        .await;

    match outcome {
        DumpOutcome::Error { message } => {
            assert!(message.contains(".git/HEAD"), "{message}");
            assert!(message.contains("connection reset by peer"), "{message}");
        },
        other => panic!("expected error outcome, got {other:?}"),
    }
    assert_eq!(server.requests(), vec![".git/HEAD"]);
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_bad_head_probe() {
    let server = Arc::new(FakeTransport::new().file(".git/HEAD", "not-a-valid-head"));
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("never");

    let outcome = Dumper::with_transport(job(&dest, "true"), server.clone())
        .run()
        .await;

    assert_eq!(
        outcome,
        DumpOutcome::error(format!("error: {BASE_URL}/.git/HEAD is not a git HEAD file"))
    );
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        serde_json::json!({
            "status": "error",
            "path": format!("error: {BASE_URL}/.git/HEAD is not a git HEAD file"),
            "url": "",
        })
    );
    assert_eq!(server.requests(), vec![".git/HEAD"]);
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_missing_head_probe() {
    let server = Arc::new(FakeTransport::new());
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("never");

    let outcome = Dumper::with_transport(job(&dest, "true"), server).run().await;

    assert_eq!(
        outcome,
        DumpOutcome::error(format!(
            "error: {BASE_URL}/.git/HEAD responded with status code 404"
        ))
    );
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_cancelled_dump() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = Dumper::with_transport(job(dir.path(), "true"), Arc::new(listing_server()))
        .with_cancellation(cancel)
        .run()
        .await;

    assert_eq!(outcome, DumpOutcome::error("dump cancelled"));
}

#[tokio::test]
async fn test_locked_destination() {
    let dir = tempfile::tempdir().unwrap();
    let _held = DestinationLock::acquire(dir.path()).unwrap();

    let outcome = Dumper::with_transport(job(dir.path(), "true"), Arc::new(listing_server()))
        .run()
        .await;

    match outcome {
        DumpOutcome::Error { message } => assert!(message.contains("locked")),
        other => panic!("expected error outcome, got {other:?}"),
    }
}
