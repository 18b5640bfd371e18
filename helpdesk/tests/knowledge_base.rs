//! Article publication, visibility and view counting.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{context, Desk};
use helpdesk::articles::{CreateArticle, PublishedAtPolicy, UpdateArticle};
use helpdesk::error::HelpdeskError;
use helpdesk::query::{ArticleFilter, PageRequest};
use helpdesk::types::{ArticleStatus, KnowledgeArticle};
use helpdesk_auth::{Principal, Role};
use helpdesk_core::environment::Clock;

async fn draft(desk: &Desk, author: &Principal, title: &str) -> KnowledgeArticle {
    desk.state
        .articles
        .create(author, context(), CreateArticle {
            title: title.to_string(),
            content: "1. Open settings\n2. Reset".to_string(),
            category_id: None,
            tags: vec!["vpn".to_string(), "howto".to_string()],
        })
        .await
        .expect("article created")
}

#[tokio::test]
async fn drafts_are_hidden_from_requesters() {
    let desk = Desk::new();
    let author = desk.user("writer@example.com", Role::Operator).await;
    let reader = desk.user("sato@example.com", Role::Requester).await;
    let article = draft(&desk, &author, "Resetting the VPN client").await;

    assert_eq!(article.status, ArticleStatus::Draft);
    assert_eq!(article.published_at, None);

    let read = desk.state.articles.get(&reader, article.id).await;
    assert!(matches!(read, Err(HelpdeskError::NotFound { .. })));

    let listed = desk
        .state
        .articles
        .list(&reader, ArticleFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 0);

    let denied = desk
        .state
        .articles
        .create(&reader, context(), CreateArticle {
            title: "My tips".to_string(),
            content: "Turn it off and on".to_string(),
            category_id: None,
            tags: Vec::new(),
        })
        .await;
    assert!(matches!(denied, Err(HelpdeskError::PermissionDenied(_))));
}

#[tokio::test]
async fn publication_cycle() {
    let desk = Desk::new();
    let author = desk.user("writer@example.com", Role::Operator).await;
    let reader = desk.user("sato@example.com", Role::Requester).await;
    let article = draft(&desk, &author, "Resetting the VPN client").await;
    let articles = &desk.state.articles;

    desk.clock.advance_secs(10);
    let published = articles.publish(&author, context(), article.id).await.unwrap();
    assert_eq!(published.status, ArticleStatus::Published);
    assert_eq!(published.published_at, Some(desk.clock.now()));

    let again = articles.publish(&author, context(), article.id).await;
    assert!(matches!(again, Err(HelpdeskError::InvalidState(_))));

    let listed = articles.list(&reader, ArticleFilter::default(), PageRequest::default()).await.unwrap();
    assert_eq!(listed.total, 1);

    let unpublished = articles.unpublish(&author, context(), article.id).await.unwrap();
    assert_eq!(unpublished.status, ArticleStatus::Draft);

    let archived = articles.archive(&author, context(), article.id).await.unwrap();
    assert_eq!(archived.status, ArticleStatus::Archived);

    let edit = articles
        .update(&author, context(), article.id, UpdateArticle {
            title: Some("Resetting the VPN client (2025)".to_string()),
            ..UpdateArticle::default()
        })
        .await;
    assert!(matches!(edit, Err(HelpdeskError::InvalidState(_))));

    let republish = articles.publish(&author, context(), article.id).await;
    assert!(matches!(republish, Err(HelpdeskError::InvalidState(_))));
}

#[tokio::test]
async fn first_publication_date_survives_republishing() {
    let desk = Desk::new();
    let author = desk.user("writer@example.com", Role::Operator).await;
    let article = draft(&desk, &author, "Resetting the VPN client").await;
    let articles = &desk.state.articles;

    let first = articles.publish(&author, context(), article.id).await.unwrap().published_at;
    articles.unpublish(&author, context(), article.id).await.unwrap();
    desk.clock.advance_secs(3_600);
    let second = articles.publish(&author, context(), article.id).await.unwrap().published_at;

    assert_eq!(first, second);
}

#[tokio::test]
async fn every_publish_policy_restamps() {
    let desk = Desk::with_policy(PublishedAtPolicy::EveryPublish);
    let author = desk.user("writer@example.com", Role::Operator).await;
    let article = draft(&desk, &author, "Resetting the VPN client").await;
    let articles = &desk.state.articles;

    articles.publish(&author, context(), article.id).await.unwrap();
    articles.unpublish(&author, context(), article.id).await.unwrap();
    desk.clock.advance_secs(3_600);
    let republished = articles.publish(&author, context(), article.id).await.unwrap();

    assert_eq!(republished.published_at, Some(desk.clock.now()));
}

#[tokio::test]
async fn only_other_readers_of_published_articles_count_as_views() {
    let desk = Desk::new();
    let author = desk.user("writer@example.com", Role::Operator).await;
    let reader = desk.user("sato@example.com", Role::Requester).await;
    let article = draft(&desk, &author, "Resetting the VPN client").await;
    let articles = &desk.state.articles;

    // Staff preview of a draft is not a view.
    let preview = articles.get(&author, article.id).await.unwrap();
    assert_eq!(preview.view_count, 0);

    articles.publish(&author, context(), article.id).await.unwrap();
    assert_eq!(articles.get(&author, article.id).await.unwrap().view_count, 0);
    assert_eq!(articles.get(&reader, article.id).await.unwrap().view_count, 1);
    assert_eq!(articles.get(&reader, article.id).await.unwrap().view_count, 2);

    // Editing does not reset the counter.
    articles
        .update(&author, context(), article.id, UpdateArticle {
            content: Some("1. Open settings\n2. Reset\n3. Reconnect".to_string()),
            ..UpdateArticle::default()
        })
        .await
        .unwrap();
    assert_eq!(articles.get(&reader, article.id).await.unwrap().view_count, 3);
}

#[tokio::test]
async fn article_tags_keep_first_appearance_order() {
    let desk = Desk::new();
    let author = desk.user("writer@example.com", Role::Operator).await;
    let article = draft(&desk, &author, "Resetting the VPN client").await;

    let updated = desk
        .state
        .articles
        .update(&author, context(), article.id, UpdateArticle {
            tags: Some(vec!["howto".to_string(), "VPN".to_string(), "howto".to_string()]),
            ..UpdateArticle::default()
        })
        .await
        .unwrap();

    let names: Vec<&str> = updated.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["howto", "VPN"]);
    // The existing tag is reused, not duplicated.
    assert_eq!(updated.tags[0].id, article.tags[1].id);
}

#[tokio::test]
async fn search_is_case_insensitive_on_title() {
    let desk = Desk::new();
    let author = desk.user("writer@example.com", Role::Operator).await;
    draft(&desk, &author, "Resetting the VPN client").await;
    desk.clock.advance_secs(1);
    draft(&desk, &author, "Configuring mail filters").await;

    let filter = ArticleFilter {
        search: Some("vpn".to_string()),
        ..ArticleFilter::default()
    };
    let found = desk.state.articles.list(&author, filter, PageRequest::default()).await.unwrap();

    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].title, "Resetting the VPN client");
}
