use super::*;
use crate::test_support::*;
use shared::error::ReorderError;

async fn pagination_over(
    fetcher: Arc<ScriptedFetcher>,
    store: Arc<dyn PageStore>,
) -> PaginationController {
    let lists = controller(fetcher, Arc::clone(&store), signed_in("tok")).await;
    PaginationController::restore(lists, store).await
}

#[tokio::test]
async fn starts_at_page_one_without_persisted_page() {
    let pagination =
        pagination_over(ScriptedFetcher::new(), Arc::new(memory_storage().await)).await;
    assert_eq!(pagination.current_page().await, PageNumber::FIRST);
}

#[tokio::test]
async fn restores_persisted_page() {
    let storage = memory_storage().await;
    storage.save_current_page(page(3)).await.expect("seed");
    let pagination = pagination_over(ScriptedFetcher::new(), Arc::new(storage)).await;
    assert_eq!(pagination.current_page().await, page(3));
}

#[tokio::test]
async fn prev_at_first_page_is_a_noop() {
    let fetcher = ScriptedFetcher::new();
    let pagination = pagination_over(Arc::clone(&fetcher), Arc::new(memory_storage().await)).await;

    assert!(pagination.prev_page().await.is_none());
    assert_eq!(pagination.current_page().await, PageNumber::FIRST);
    assert!(fetcher.calls().await.is_empty());
}

#[tokio::test]
async fn next_has_no_upper_bound_and_persists() {
    let storage = memory_storage().await;
    let fetcher = ScriptedFetcher::new();
    fetcher.push(2, Reply::Items(items(&["C", "D"]))).await;
    let pagination = pagination_over(Arc::clone(&fetcher), Arc::new(storage.clone())).await;

    let second = pagination.next_page().await;
    assert_eq!(second.page, page(2));
    assert_eq!(titles(&second.items.expect("page 2")), ["C", "D"]);

    // Past the last page the fetcher answers with an empty list.
    let third = pagination.next_page().await;
    assert_eq!(third.page, page(3));
    assert!(third.items.expect("page 3").is_empty());

    assert_eq!(storage.load_current_page().await.expect("read"), Some(page(3)));
    let pages: Vec<u32> = fetcher.calls().await.iter().map(|c| c.page).collect();
    assert_eq!(pages, vec![2, 3]);
}

#[tokio::test]
async fn page_changes_even_when_load_fails() {
    let fetcher = ScriptedFetcher::new();
    fetcher.push(2, Reply::Fail("timeout")).await;
    let pagination = pagination_over(Arc::clone(&fetcher), Arc::new(memory_storage().await)).await;

    let load = pagination.next_page().await;
    assert_eq!(load.page, page(2));
    assert!(matches!(load.items, Err(ReorderError::FetchFailed { .. })));
    assert_eq!(pagination.current_page().await, page(2));
}

#[tokio::test]
async fn navigating_back_keeps_page_one_order() {
    let fetcher = ScriptedFetcher::new();
    fetcher.push(1, Reply::Items(items(&["A", "B"]))).await;
    fetcher.push(2, Reply::Items(items(&["C", "D"]))).await;
    fetcher.push(1, Reply::Fail("offline")).await;
    let pagination = pagination_over(Arc::clone(&fetcher), Arc::new(memory_storage().await)).await;

    pagination.reload().await.items.expect("page 1");
    pagination.lists.move_item(page(1), 0, 1).await.expect("move");
    pagination.next_page().await.items.expect("page 2");

    let back = pagination.prev_page().await.expect("moved back");
    assert_eq!(back.page, page(1));
    assert!(back.items.is_err());
    assert_eq!(titles(&pagination.lists.current_order(page(1)).await), ["B", "A"]);
}

#[tokio::test]
async fn reset_returns_to_first_page_without_fetching() {
    let fetcher = ScriptedFetcher::new();
    let pagination = pagination_over(Arc::clone(&fetcher), Arc::new(memory_storage().await)).await;
    pagination.next_page().await;
    pagination.next_page().await;

    pagination.reset().await;
    assert_eq!(pagination.current_page().await, PageNumber::FIRST);
    assert_eq!(fetcher.calls().await.len(), 2);
}

#[tokio::test]
async fn signed_out_navigation_leaves_page_untouched() {
    let storage = memory_storage().await;
    storage.save_current_page(page(2)).await.expect("seed");
    let fetcher = ScriptedFetcher::new();
    let store: Arc<dyn PageStore> = Arc::new(storage.clone());
    let session = Arc::new(crate::session::SessionStore::new());
    let lists = controller(Arc::clone(&fetcher), Arc::clone(&store), session).await;
    let pagination = PaginationController::restore(lists, store).await;

    let next = pagination.next_page().await;
    assert_eq!(next.page, page(2));
    assert_eq!(next.items, Err(ReorderError::Unauthenticated));

    let prev = pagination.prev_page().await.expect("refusal is reported");
    assert_eq!(prev.page, page(2));
    assert_eq!(prev.items, Err(ReorderError::Unauthenticated));

    assert_eq!(pagination.current_page().await, page(2));
    assert_eq!(storage.load_current_page().await.expect("read"), Some(page(2)));
    assert!(fetcher.calls().await.is_empty());
}
