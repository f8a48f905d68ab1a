mod common;

use quill::service::StubService;

use common::{count_posts, create_post, setup};

#[tokio::test]
async fn test_index_is_served_from_cache_until_cleared() {
    let app = setup().await;
    let author = app.create_user("leo").await;
    create_post(&app, &author, "Cached post", None).await;

    let first = StubService::body_string(app.get("/", None).await).await;
    create_post(&app, &author, "Post after caching", None).await;
    let second = StubService::body_string(app.get("/", None).await).await;

    assert_eq!(first, second);
    assert!(!second.contains("Post after caching"));

    app.state().page_cache().clear().await;
    let third = StubService::body_string(app.get("/", None).await).await;

    assert_ne!(first, third);
    assert!(third.contains("Post after caching"));
    assert_eq!(count_posts(&third), 2);
}

#[tokio::test]
async fn test_equivalent_page_values_share_one_cache_slot() {
    let app = setup().await;
    let author = app.create_user("leo").await;
    create_post(&app, &author, "Cached post", None).await;

    let first = StubService::body_string(app.get("/", None).await).await;
    create_post(&app, &author, "Post after caching", None).await;

    for uri in ["/?page=1", "/?page=abc", "/?page=99"] {
        let body = StubService::body_string(app.get(uri, None).await).await;
        assert_eq!(body, first, "{uri}");
    }
}

#[tokio::test]
async fn test_index_pages_are_cached_separately() {
    let app = setup().await;
    let author = app.create_user("leo").await;
    for i in 0..11 {
        create_post(&app, &author, &format!("Post number {i}"), None).await;
    }

    let first = StubService::body_string(app.get("/", None).await).await;
    let second = StubService::body_string(app.get("/?page=2", None).await).await;

    assert_eq!(count_posts(&first), 10);
    assert_eq!(count_posts(&second), 1);
}

#[tokio::test]
async fn test_other_pages_are_not_cached() {
    let app = setup().await;
    let author = app.create_user("leo").await;
    create_post(&app, &author, "Cached post", None).await;

    app.get("/profile/leo/", None).await;
    create_post(&app, &author, "Post after caching", None).await;
    let profile = StubService::body_string(app.get("/profile/leo/", None).await).await;

    assert!(profile.contains("Post after caching"));
}
