#![allow(dead_code)]

use chrono::NaiveDate;
use myorm_core::{
    DbConfig, Entity, EntityManager, EntitySet, FieldDescriptor, GenerationType, SqliteExecutor,
    TypeDescriptor,
};

pub const USERS_SCHEMA: &str = "CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    firstName TEXT,
    lastName TEXT,
    email TEXT,
    birthDate TEXT
);";

pub const USERS_SEED: &str = "INSERT INTO users (id, firstName, lastName, email, birthDate) VALUES
    (0, 'Linus', 'Torvald', 'linux.torvald@linux.org', '1969-12-28'),
    (1, 'Brian', 'Goetz', 'brian.goetz@oracle.com', '1970-11-22'),
    (2, 'Robert', 'Martin', 'uncle@bob.com', '1962-04-17');";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub connection_count: i32,
}

impl User {
    pub fn new(
        first_name: Option<&str>,
        last_name: Option<&str>,
        email: Option<&str>,
        birth_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id: 0,
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
            email: email.map(str::to_string),
            birth_date,
            connection_count: 0,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn last_name(&self) -> Option<String> {
        self.last_name.clone()
    }

    pub fn set_last_name(&mut self, last_name: Option<String>) {
        self.last_name = last_name;
    }
}

impl Entity for User {
    fn descriptor() -> TypeDescriptor<Self> {
        TypeDescriptor::with_default("User")
            .entity_table("users")
            .field(
                FieldDescriptor::direct("id", |u: &User| &u.id, |u: &mut User| &mut u.id)
                    .id(GenerationType::Identity),
            )
            .field(
                FieldDescriptor::direct(
                    "first_name",
                    |u: &User| &u.first_name,
                    |u: &mut User| &mut u.first_name,
                )
                .column("firstName"),
            )
            .field(
                FieldDescriptor::accessors("last_name", User::last_name, User::set_last_name)
                    .column("lastName"),
            )
            .field(FieldDescriptor::direct(
                "email",
                |u: &User| &u.email,
                |u: &mut User| &mut u.email,
            ))
            .field(
                FieldDescriptor::direct(
                    "birth_date",
                    |u: &User| &u.birth_date,
                    |u: &mut User| &mut u.birth_date,
                )
                .column("birthDate"),
            )
            .field(
                FieldDescriptor::direct(
                    "connection_count",
                    |u: &User| &u.connection_count,
                    |u: &mut User| &mut u.connection_count,
                )
                .transient(),
            )
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn seeded_users() -> Vec<User> {
    vec![
        User::new(
            Some("Linus"),
            Some("Torvald"),
            Some("linux.torvald@linux.org"),
            Some(date(1969, 12, 28)),
        )
        .with_id(0),
        User::new(
            Some("Brian"),
            Some("Goetz"),
            Some("brian.goetz@oracle.com"),
            Some(date(1970, 11, 22)),
        )
        .with_id(1),
        User::new(
            Some("Robert"),
            Some("Martin"),
            Some("uncle@bob.com"),
            Some(date(1962, 4, 17)),
        )
        .with_id(2),
    ]
}

pub fn seeded_executor() -> SqliteExecutor {
    let executor = SqliteExecutor::open_in_memory(&DbConfig::default()).unwrap();
    executor.execute_batch(USERS_SCHEMA).unwrap();
    executor.execute_batch(USERS_SEED).unwrap();
    executor
}

pub fn user_manager() -> EntityManager<SqliteExecutor> {
    EntityManager::new(seeded_executor(), EntitySet::new().with::<User>()).unwrap()
}
