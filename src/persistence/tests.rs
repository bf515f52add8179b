use super::Persistence;
use crate::models::{NewComment, NewPost};
use crate::utils::error::PersistenceError;
use tempfile::{TempDir, tempdir};
use uuid::Uuid;

fn create_test_persistence() -> (Persistence, TempDir) {
    let dir = tempdir().unwrap();
    let persistence = Persistence::open(dir.path().to_str().unwrap()).unwrap();
    (persistence, dir)
}

fn new_post(title: &str) -> NewPost {
    NewPost {
        title: title.to_string(),
        author: "author".to_string(),
        content: "content".to_string(),
        comments_allowed: true,
    }
}

fn new_comment(post_id: Uuid, content: &str, parent: Option<Uuid>) -> NewComment {
    NewComment {
        author: "a".to_string(),
        content: content.to_string(),
        post_id,
        parent_comment_id: parent,
    }
}

#[test]
fn test_create_and_get_post() {
    let (persistence, _dir) = create_test_persistence();

    let post = persistence.create_post(new_post("hello")).unwrap();
    let loaded = persistence.get_post(post.id).unwrap();

    assert_eq!(loaded, post);
    assert_eq!(loaded.title, "hello");
}

#[test]
fn test_get_missing_post() {
    let (persistence, _dir) = create_test_persistence();
    let id = Uuid::new_v4();

    let err = persistence.get_post(id).unwrap_err();
    assert!(matches!(err, PersistenceError::NotFound(missing) if missing == id));
}

#[test]
fn test_list_posts_newest_first_with_paging() {
    let (persistence, _dir) = create_test_persistence();
    for i in 0..5 {
        persistence.create_post(new_post(&format!("post{i}"))).unwrap();
    }

    let titles: Vec<_> = persistence
        .list_posts(0, 3)
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, vec!["post4", "post3", "post2"]);

    let rest = persistence.list_posts(3, 3).unwrap();
    assert_eq!(rest.len(), 2);
    assert_eq!(rest[1].title, "post0");
    assert!(persistence.list_posts(10, 3).unwrap().is_empty());
}

#[test]
fn test_comments_and_replies_are_indexed_separately() {
    let (persistence, _dir) = create_test_persistence();
    let post = persistence.create_post(new_post("p")).unwrap();

    let first = persistence
        .create_comment(new_comment(post.id, "first", None))
        .unwrap();
    persistence
        .create_comment(new_comment(post.id, "second", None))
        .unwrap();
    let reply = persistence
        .create_comment(new_comment(post.id, "reply", Some(first.id)))
        .unwrap();

    let top: Vec<_> = persistence
        .comments_for_post(post.id, 0, 20)
        .unwrap()
        .into_iter()
        .map(|c| c.content)
        .collect();
    assert_eq!(top, vec!["second", "first"]);

    let replies = persistence.replies(first.id).unwrap();
    assert_eq!(replies, vec![reply.clone()]);
    assert_eq!(persistence.get_comment(reply.id).unwrap(), reply);
}
