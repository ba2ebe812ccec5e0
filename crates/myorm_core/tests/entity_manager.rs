mod common;

use common::{date, seeded_users, user_manager, User};
use myorm_core::{
    BoundStatement, DbConfig, DbError, EntityManager, EntitySet, FieldDescriptor, GeneratedKeys,
    GenerationType, OrmError, SqliteExecutor, TypeDescriptor, ValueKind,
};
use std::sync::Arc;

struct Unregistered;

#[test]
fn find_maps_existing_row() {
    let manager = user_manager();

    let found = manager.find::<User>(2_i64).unwrap().unwrap();
    assert_eq!(found, seeded_users()[2]);
}

#[test]
fn find_missing_id_returns_none() {
    let manager = user_manager();

    assert!(manager.find::<User>(42_i64).unwrap().is_none());
}

#[test]
fn find_all_returns_seeded_rows_in_id_order() {
    let manager = user_manager();

    let users = manager.find_all::<User>().unwrap();
    assert_eq!(users, seeded_users());
}

#[test]
fn find_all_is_repeatable_without_writes() {
    let manager = user_manager();

    let first = manager.find_all::<User>().unwrap();
    let second = manager.find_all::<User>().unwrap();
    assert_eq!(first, second);
}

#[test]
fn save_assigns_generated_id_and_roundtrips() {
    let manager = user_manager();

    let mut user = User::new(Some("Test"), None, Some("t@x.com"), Some(date(1990, 4, 23)));
    user.connection_count = 7;
    let saved = manager.save(user).unwrap();

    assert_ne!(saved.id, 0);
    assert_eq!(saved.id, 3);
    assert_eq!(saved.connection_count, 7);

    let loaded = manager.find::<User>(saved.id).unwrap().unwrap();
    assert_eq!(loaded.id, saved.id);
    assert_eq!(loaded.first_name.as_deref(), Some("Test"));
    assert_eq!(loaded.last_name, None);
    assert_eq!(loaded.email.as_deref(), Some("t@x.com"));
    assert_eq!(loaded.birth_date, Some(date(1990, 4, 23)));
    // Transient fields keep the constructor default on load.
    assert_eq!(loaded.connection_count, 0);
}

#[test]
fn save_preserves_null_columns() {
    let manager = user_manager();

    let saved = manager.save(User::new(None, None, None, None)).unwrap();
    let loaded = manager.find::<User>(saved.id).unwrap().unwrap();
    assert_eq!(loaded, saved);
}

#[test]
fn delete_twice_reports_second_miss() {
    let manager = user_manager();

    let saved = manager
        .save(User::new(
            Some("Francois"),
            Some("Teychene"),
            Some("francois.teychene@gmail.com"),
            None,
        ))
        .unwrap();

    assert!(manager.delete(&saved).unwrap());
    assert!(!manager.delete(&saved).unwrap());
    assert!(manager.find::<User>(saved.id).unwrap().is_none());
}

#[test]
fn delete_seeded_row_only_removes_that_row() {
    let manager = user_manager();
    let seeded = seeded_users();

    assert!(manager.delete(&seeded[1]).unwrap());

    let remaining = manager.find_all::<User>().unwrap();
    assert_eq!(remaining, vec![seeded[0].clone(), seeded[2].clone()]);
}

#[test]
fn operations_reject_unmanaged_types() {
    let manager = user_manager();

    assert!(manager.is_managed::<User>());
    assert!(!manager.is_managed::<Unregistered>());
    assert!(matches!(
        manager.find::<Unregistered>(1_i64),
        Err(OrmError::UnmanagedType(_))
    ));
    assert!(matches!(
        manager.find_all::<Unregistered>(),
        Err(OrmError::UnmanagedType(_))
    ));
    assert!(matches!(
        manager.save(Unregistered),
        Err(OrmError::UnmanagedType(_))
    ));
    assert!(matches!(
        manager.delete(&Unregistered),
        Err(OrmError::UnmanagedType(_))
    ));
}

#[test]
fn executor_failures_surface_as_persistence_errors() {
    let manager = user_manager();
    manager.executor().execute_batch("DROP TABLE users;").unwrap();

    let err = manager.find_all::<User>().unwrap_err();
    assert!(matches!(err, OrmError::Persistence(DbError::Sqlite(_))));

    let err = manager.save(User::default()).unwrap_err();
    assert!(matches!(err, OrmError::Persistence(_)));
}

#[test]
fn manager_can_be_shared_across_threads() {
    let manager = Arc::new(user_manager());

    std::thread::scope(|scope| {
        for index in 0..4 {
            let manager = Arc::clone(&manager);
            scope.spawn(move || {
                let email = format!("worker{index}@example.com");
                let saved = manager
                    .save(User::new(Some("Worker"), None, Some(email.as_str()), None))
                    .unwrap();
                let loaded = manager.find::<User>(saved.id).unwrap().unwrap();
                assert_eq!(loaded.email.as_deref(), Some(email.as_str()));
            });
        }
    });

    assert_eq!(manager.find_all::<User>().unwrap().len(), 7);
}

#[derive(Debug, Default, PartialEq)]
struct Ticket {
    id: i32,
    title: String,
}

fn ticket_descriptor() -> TypeDescriptor<Ticket> {
    TypeDescriptor::with_default("Ticket")
        .entity_table("tickets")
        .field(
            FieldDescriptor::direct("id", |t: &Ticket| &t.id, |t: &mut Ticket| &mut t.id)
                .id(GenerationType::Identity),
        )
        .field(FieldDescriptor::direct(
            "title",
            |t: &Ticket| &t.title,
            |t: &mut Ticket| &mut t.title,
        ))
}

#[test]
fn generated_key_past_i32_range_fails_after_insert() {
    let executor = SqliteExecutor::open_in_memory(&DbConfig::default()).unwrap();
    executor
        .execute_batch(
            "CREATE TABLE tickets (id INTEGER PRIMARY KEY, title TEXT NOT NULL);
             INSERT INTO tickets (id, title) VALUES (2147483647, 'last');",
        )
        .unwrap();
    let manager =
        EntityManager::new(executor, EntitySet::new().register(ticket_descriptor())).unwrap();

    let err = manager
        .save(Ticket {
            id: 0,
            title: "overflow".to_string(),
        })
        .unwrap_err();
    assert!(matches!(
        err,
        OrmError::Persistence(DbError::TypeMismatch {
            expected: ValueKind::Integer,
            ..
        })
    ));

    let mut count = BoundStatement::prepare(
        manager.executor(),
        "SELECT COUNT(*) AS total FROM tickets",
        GeneratedKeys::None,
    )
    .unwrap();
    let mut rows = count.execute_query().unwrap();
    assert!(rows.advance().unwrap());
    assert_eq!(rows.get_long("total").unwrap(), Some(2));
}
