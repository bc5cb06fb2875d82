use crate::core::Value;
use crate::orm::{Field, Model};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Time-ordered unique id: 15-digit millisecond timestamp, 32 random hex
/// digits and a `000` suffix.
pub fn next_id() -> String {
    format!(
        "{:015}{}000",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

fn id_default() -> Value {
    Value::Text(next_id())
}

/// Current Unix time in seconds, with sub-second precision.
pub fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

fn now_default() -> Value {
    Value::Float(unix_now())
}

fn id_field() -> Field {
    Field::string("id")
        .primary_key()
        .ddl("varchar(50)")
        .default_with(id_default)
}

fn created_at_field() -> Field {
    Field::float("created_at").default_with(now_default)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<String>,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub admin: bool,
    pub name: String,
    pub image_url: String,
    pub created_at: Option<f64>,
}

impl User {
    pub const MASKED_PASSWORD: &'static str = "******";

    /// The user as it may leave the server.
    pub fn masked(mut self) -> Self {
        self.password_hash = Self::MASKED_PASSWORD.to_string();
        self
    }
}

impl Model for User {
    const TABLE: &'static str = "users";

    fn fields() -> Vec<Field> {
        vec![
            id_field(),
            Field::string("email").ddl("varchar(50)"),
            Field::string("password_hash").ddl("varchar(100)"),
            Field::boolean("admin"),
            Field::string("name").ddl("varchar(50)"),
            Field::string("image_url").ddl("varchar(500)"),
            created_at_field(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blog {
    pub id: Option<String>,
    pub user_id: String,
    pub user_name: String,
    pub user_image: String,
    pub name: String,
    pub summary: String,
    pub content: String,
    pub created_at: Option<f64>,
}

impl Model for Blog {
    const TABLE: &'static str = "blogs";

    fn fields() -> Vec<Field> {
        vec![
            id_field(),
            Field::string("user_id").ddl("varchar(50)"),
            Field::string("user_name").ddl("varchar(50)"),
            Field::string("user_image").ddl("varchar(500)"),
            Field::string("name").ddl("varchar(50)"),
            Field::string("summary").ddl("varchar(200)"),
            Field::text("content"),
            created_at_field(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Option<String>,
    pub blog_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_image: String,
    pub content: String,
    pub created_at: Option<f64>,
}

impl Model for Comment {
    const TABLE: &'static str = "comments";

    fn fields() -> Vec<Field> {
        vec![
            id_field(),
            Field::string("blog_id").ddl("varchar(50)"),
            Field::string("user_id").ddl("varchar(50)"),
            Field::string("user_name").ddl("varchar(50)"),
            Field::string("user_image").ddl("varchar(500)"),
            Field::text("content"),
            created_at_field(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::EntitySchema;

    #[test]
    fn test_next_id_shape() {
        let id = next_id();
        assert_eq!(id.len(), 50);
        assert!(id.ends_with("000"));
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(next_id(), id);
    }

    #[test]
    fn test_model_schemas_compile() {
        let users = EntitySchema::build(User::TABLE, User::fields()).unwrap();
        assert_eq!(
            users.select_sql(),
            "select `id`, `email`, `password_hash`, `admin`, `name`, `image_url`, `created_at` from `users`"
        );
        EntitySchema::build(Blog::TABLE, Blog::fields()).unwrap();
        EntitySchema::build(Comment::TABLE, Comment::fields()).unwrap();
    }

    #[test]
    fn test_masked_user() {
        let user = User {
            password_hash: "secret".into(),
            ..Default::default()
        }
        .masked();
        assert_eq!(user.password_hash, "******");
    }
}
