use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};

use crate::config::Config;
use crate::model::{profile::Profile, role::Role};
use crate::store::{AttendanceStore, memory::MemoryStore};

pub const TEST_SECRET: &str = "test-signing-secret";
pub const TEST_AUDIENCE: &str = "authenticated";

pub fn token_with_claims(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn token_for(sub: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + 600;
    token_with_claims(json!({
        "sub": sub,
        "aud": TEST_AUDIENCE,
        "exp": exp,
        "email": format!("{sub}@example.com"),
    }))
}

fn person(id: &str, name: &str, role: Role, manager_id: Option<&str>) -> Profile {
    Profile {
        id: id.into(),
        full_name: Some(name.into()),
        role,
        manager_id: manager_id.map(Into::into),
    }
}

/// Two managers with their reports plus one admin:
///
/// m1 -> e1, e2; m2 -> e3; a1 stands alone.
pub fn org() -> MemoryStore {
    MemoryStore::with_profiles([
        person("m1", "Marta Dias", Role::Manager, None),
        person("m2", "Nuno Prado", Role::Manager, None),
        person("e1", "Ana Lima", Role::Employee, Some("m1")),
        person("e2", "Bruno Reis", Role::Employee, Some("m1")),
        person("e3", "Carla Mota", Role::Employee, Some("m2")),
        person("a1", "Helena Costa", Role::Admin, None),
    ])
}

pub async fn profile_of(store: &MemoryStore, id: &str) -> Profile {
    store.find_profile(id).await.unwrap().unwrap()
}

pub fn test_config() -> Config {
    Config {
        database_url: "mysql://unused".into(),
        db_max_connections: 1,
        run_migrations: false,
        jwt_secret: TEST_SECRET.into(),
        jwt_audience: Some(TEST_AUDIENCE.into()),
        server_addr: "127.0.0.1:0".into(),
        api_prefix: "/api".into(),
        rate_protected_per_min: 6_000,
        my_punches_limit: 50,
        team_punches_limit: 20,
        max_punches_limit: 500,
        log_dir: "logs".into(),
        log_level: tracing::Level::DEBUG,
    }
}
