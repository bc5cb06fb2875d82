/// Object mapper tests against a file-backed SQLite database.
///
/// Run with: cargo test --test orm_roundtrip
use awesome_blog::blog::{self, Blog, Comment, User};
use awesome_blog::core::{DbError, Value};
use awesome_blog::db::{ConnectionPool, PoolConfig};
use awesome_blog::orm::{Database, FindAll, Limit};

async fn file_db(dir: &tempfile::TempDir) -> Database {
    let path = dir.path().join("blog.db");
    let config = PoolConfig::new(&format!("sqlite://{}", path.display())).max_connections(4);
    let pool = ConnectionPool::connect(config).await.unwrap();
    let db = blog::register_models(pool).unwrap();
    db.create_tables().await.unwrap();
    db
}

fn blog_named(name: &str) -> Blog {
    Blog {
        user_id: "u1".into(),
        user_name: "Admin".into(),
        name: name.into(),
        summary: format!("about {name}"),
        content: format!("{name} content"),
        ..Default::default()
    }
}

#[tokio::test]
async fn save_assigns_defaults_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_db(&dir).await;

    let mut user = User {
        email: "a@example.com".into(),
        password_hash: "hash".into(),
        name: "A".into(),
        ..Default::default()
    };
    db.save(&mut user).await.unwrap();

    let id = user.id.clone().unwrap();
    assert_eq!(id.len(), 50);
    assert!(user.created_at.is_some());

    let loaded: User = db.find(id.as_str()).await.unwrap().unwrap();
    assert_eq!(loaded, user);
    assert!(!loaded.admin);
}

#[tokio::test]
async fn data_survives_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let db = file_db(&dir).await;
        let mut blog = blog_named("kept");
        db.save(&mut blog).await.unwrap();
        db.pool().close().await;
        blog.id.unwrap()
    };

    let db = file_db(&dir).await;
    let blog: Blog = db.find(id.as_str()).await.unwrap().unwrap();
    assert_eq!(blog.name, "kept");
}

#[tokio::test]
async fn find_all_paging_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_db(&dir).await;

    for (i, name) in ["one", "two", "three", "four"].iter().enumerate() {
        let mut blog = blog_named(name);
        blog.created_at = Some(1_000.0 + i as f64);
        db.save(&mut blog).await.unwrap();
    }

    let page: Vec<Blog> = db
        .find_all(
            FindAll::new()
                .order_by("created_at desc")
                .limit(Limit::Range(1, 2)),
        )
        .await
        .unwrap();
    let names: Vec<&str> = page.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["three", "two"]);

    let first: Vec<Blog> = db
        .find_all(FindAll::new().order_by("created_at").limit_spec(&[1]).unwrap())
        .await
        .unwrap();
    assert_eq!(first[0].name, "one");

    let err = FindAll::new().limit_spec(&[1, 2, 3]).unwrap_err();
    assert!(matches!(err, DbError::InvalidArgument(_)));
}

#[tokio::test]
async fn count_with_filter() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_db(&dir).await;

    for (blog_id, content) in [("b1", "x"), ("b1", "y"), ("b2", "z")] {
        let mut comment = Comment {
            blog_id: blog_id.into(),
            content: content.into(),
            ..Default::default()
        };
        db.save(&mut comment).await.unwrap();
    }

    let all = db.count::<Comment>("count(id)", None, &[]).await.unwrap();
    assert_eq!(all, Some(Value::Integer(3)));

    let b1 = db
        .count::<Comment>("count(id)", Some("`blog_id`=?"), &[Value::from("b1")])
        .await
        .unwrap();
    assert_eq!(b1.and_then(|v| v.as_i64()), Some(2));
}

#[tokio::test]
async fn update_and_remove() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_db(&dir).await;

    let mut blog = blog_named("draft");
    db.save(&mut blog).await.unwrap();
    blog.name = "published".into();
    db.update(&blog).await.unwrap();

    let id = blog.id.clone().unwrap();
    let loaded: Blog = db.find(id.as_str()).await.unwrap().unwrap();
    assert_eq!(loaded.name, "published");

    db.remove(&loaded).await.unwrap();
    assert!(db.find::<Blog>(id.as_str()).await.unwrap().is_none());
}

#[tokio::test]
async fn explicit_transaction_rolls_back_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_db(&dir).await;

    let result = db
        .pool()
        .execute("insert into `missing_table` (`id`) values (?)", &[Value::from("x")], false)
        .await;
    assert!(result.is_err());

    let written = db
        .pool()
        .execute(
            "update `users` set `name` = ? where `id` = ?",
            &[Value::from("n"), Value::from("nobody")],
            false,
        )
        .await
        .unwrap();
    assert_eq!(written, 0);
}
