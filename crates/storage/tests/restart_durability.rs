use chrono::Utc;
use shared::domain::{Item, PageNumber, PageSnapshot};
use storage::{Storage, StoredSession};

#[tokio::test]
async fn snapshots_and_page_survive_reopening_the_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let database_url = format!(
        "sqlite://{}",
        dir.path()
            .join("console.db")
            .to_string_lossy()
            .replace('\\', "/")
    );
    let page_two = PageNumber::new(2).expect("page");
    let fetched = vec![Item::new(10, "a", ""), Item::new(11, "b", "")];
    let reordered = vec![fetched[1].clone(), fetched[0].clone()];

    {
        let storage = Storage::new(&database_url).await.expect("open");
        let snapshot = PageSnapshot::from_fetch(fetched.clone(), Utc::now())
            .with_working_order(reordered.clone());
        storage
            .save_page_snapshot(page_two, &snapshot)
            .await
            .expect("save snapshot");
        storage.save_current_page(page_two).await.expect("save page");
        storage
            .save_session(&StoredSession {
                token: "persisted".into(),
                role: None,
            })
            .await
            .expect("save session");
        storage.pool().close().await;
    }

    let reopened = Storage::new(&database_url).await.expect("reopen");
    let snapshot = reopened
        .load_page_snapshot(page_two)
        .await
        .expect("load")
        .expect("snapshot survives");
    assert_eq!(snapshot.fetched_order(), fetched.as_slice());
    assert_eq!(snapshot.working_order(), reordered.as_slice());
    assert_eq!(
        reopened.load_current_page().await.expect("page"),
        Some(page_two)
    );
    assert_eq!(
        reopened
            .load_session()
            .await
            .expect("session")
            .map(|s| s.token),
        Some("persisted".to_string())
    );
}
