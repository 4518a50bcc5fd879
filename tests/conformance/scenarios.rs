//! Backend-neutral checks of the storage contract.
//!
//! Each function runs against a fresh (or freshly dropped) table.

use serde_json::{json, Value};
use storekit::{Key, Storage, StorageError, TablesExt};

use crate::students::{Classmates, Student, Ticket};

async fn seed_student<S: Storage>(storage: &S, table: Option<&str>) {
    storage.create_table::<Student>(table).await.unwrap();
    storage
        .create(&Student::new("111", 0, true), table)
        .await
        .unwrap();
}

pub async fn create_then_first<S: Storage>(storage: &S, table: Option<&str>) {
    seed_student(storage, table).await;

    let mut out = Student::default();
    storage.first(&mut out, table, Key::new("111")).await.unwrap();
    assert_eq!(out.id, "111");
    assert_eq!(out.score, 0.1);
    assert!(out.star);
    assert_eq!(out.model.version, 1);
    assert!(out.model.created_at > 0);
    assert_eq!(out.model.created_at, out.model.updated_at);
}

pub async fn create_table_is_idempotent<S: Storage>(storage: &S, table: Option<&str>) {
    storage.create_table::<Student>(table).await.unwrap();
    storage.create_table::<Student>(table).await.unwrap();
}

pub async fn duplicate_create_fails<S: Storage>(storage: &S, table: Option<&str>) {
    seed_student(storage, table).await;

    let err = storage
        .create(&Student::new("111", 5, false), table)
        .await
        .unwrap_err();
    assert!(!matches!(err, StorageError::NotFound | StorageError::ExpiredValue));
}

pub async fn save_of_unread_value_is_expired<S: Storage>(storage: &S, table: Option<&str>) {
    seed_student(storage, table).await;

    let mut stale = Student::new("111", 0, true);
    stale.score += 1.0;
    let err = storage.save(&mut stale, table).await.unwrap_err();
    assert!(matches!(err, StorageError::ExpiredValue));
    assert_eq!(stale.model.version, 0);

    let mut out = Student::default();
    storage.first(&mut out, table, Key::new("111")).await.unwrap();
    assert_eq!(out.score, 0.1);
}

pub async fn save_after_first_bumps_version<S: Storage>(storage: &S, table: Option<&str>) {
    seed_student(storage, table).await;

    let mut current = Student::default();
    storage
        .first(&mut current, table, Key::new("111"))
        .await
        .unwrap();
    current.score += 1.0;
    storage.save(&mut current, table).await.unwrap();
    assert_eq!(current.model.version, 2);

    let mut out = Student::default();
    storage.first(&mut out, table, Key::new("111")).await.unwrap();
    assert!((out.score - 1.1).abs() < 1e-6);
    assert_eq!(out.model.version, 2);
    assert!(out.model.updated_at >= out.model.created_at);
}

pub async fn interleaved_saves_admit_one_writer<S: Storage>(storage: &S, table: Option<&str>) {
    seed_student(storage, table).await;

    let mut first = Student::default();
    let mut second = Student::default();
    storage.first(&mut first, table, Key::new("111")).await.unwrap();
    storage
        .first(&mut second, table, Key::new("111"))
        .await
        .unwrap();

    first.age = 30;
    second.age = 40;
    storage.save(&mut first, table).await.unwrap();
    let err = storage.save(&mut second, table).await.unwrap_err();
    assert!(matches!(err, StorageError::ExpiredValue));
    assert!(err.is_retryable());

    storage
        .first(&mut second, table, Key::new("111"))
        .await
        .unwrap();
    assert_eq!(second.age, 30);
    second.age = 40;
    storage.save(&mut second, table).await.unwrap();
    assert_eq!(second.model.version, 3);
}

pub async fn delete_then_first_is_not_found<S: Storage>(storage: &S, table: Option<&str>) {
    seed_student(storage, table).await;

    storage
        .delete::<Student>(table, Key::new("111"))
        .await
        .unwrap();
    storage
        .delete::<Student>(table, Key::new("111"))
        .await
        .unwrap();

    let mut out = Student::default();
    let err = storage
        .first(&mut out, table, Key::new("111"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

pub async fn composite_keys_require_range<S: Storage>(storage: &S, table: Option<&str>) {
    storage.create_table::<Classmates>(table).await.unwrap();
    storage
        .create(&Classmates::new("2", 10), table)
        .await
        .unwrap();

    let mut out = Classmates::default();
    let err = storage
        .first(&mut out, table, Key::new("2"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::MissingRangeValue));

    let err = storage
        .delete::<Classmates>(table, Key::new("2"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::MissingRangeValue));

    storage
        .first(&mut out, table, Key::new("2").range(10))
        .await
        .unwrap();
    assert_eq!(out.inner.id, "2");
    assert_eq!(out.user_id, 10);
    assert_eq!(out.inner.model.version, 1);
}

pub async fn embedded_version_path<S: Storage>(storage: &S, table: Option<&str>) {
    storage.create_table::<Classmates>(table).await.unwrap();
    storage
        .create(&Classmates::new("2", 10), table)
        .await
        .unwrap();
    storage
        .create(&Classmates::new("2", 11), table)
        .await
        .unwrap();

    let mut out = Classmates::default();
    storage
        .first(&mut out, table, Key::new("2").range(10))
        .await
        .unwrap();
    out.note = "moved seats".into();
    storage.save(&mut out, table).await.unwrap();

    let mut saved: Vec<Classmates> = Vec::new();
    storage
        .find(&mut saved, table, 0, "inner.model.version = ?", &[json!(2)])
        .await
        .unwrap();
    assert_eq!(saved, vec![out]);

    let mut by_range: Vec<Classmates> = Vec::new();
    storage
        .find(&mut by_range, table, 0, "uid > ?", &[json!(10)])
        .await
        .unwrap();
    assert_eq!(by_range.len(), 1);
    assert_eq!(by_range[0].user_id, 11);
}

pub async fn custom_version_attribute<S: Storage>(storage: &S, table: Option<&str>) {
    let tickets = storage.table::<Ticket>();
    let tickets = match table {
        Some(name) => tickets.named(name),
        None => tickets,
    };
    tickets.create_table().await.unwrap();
    tickets
        .create(&Ticket {
            code: "T-1".into(),
            title: "broken build".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut ticket = tickets.get(Key::new("T-1")).await.unwrap().unwrap();
    assert_eq!(ticket.revision, 1);
    ticket.title = "fixed build".into();
    tickets.save(&mut ticket).await.unwrap();
    assert_eq!(ticket.revision, 2);

    let stored = tickets.get(Key::new("T-1")).await.unwrap().unwrap();
    assert_eq!(stored, ticket);
    assert!(tickets.get(Key::new("T-2")).await.unwrap().is_none());
}

async fn seed_class<S: Storage>(storage: &S, table: Option<&str>) {
    storage.create_table::<Student>(table).await.unwrap();
    for (id, age, star) in [
        ("1", 20, true),
        ("2", 18, false),
        ("3", 19, false),
        ("finishy@qq.com", 21, true),
    ] {
        storage
            .create(&Student::new(id, age, star), table)
            .await
            .unwrap();
    }
}

fn sorted_ids(students: &[Student]) -> Vec<&str> {
    let mut ids: Vec<&str> = students.iter().map(|s| s.id.as_str()).collect();
    ids.sort_unstable();
    ids
}

pub async fn find_with_expressions<S: Storage>(storage: &S, table: Option<&str>) {
    seed_class(storage, table).await;
    let mut out = Vec::new();

    storage
        .find(
            &mut out,
            table,
            -1,
            "Age >= ? AND Star = ?",
            &[json!(18), json!(true)],
        )
        .await
        .unwrap();
    assert_eq!(sorted_ids(&out), ["1", "finishy@qq.com"]);

    storage
        .find(&mut out, table, 2, "Age > ?", &[json!(15)])
        .await
        .unwrap();
    assert_eq!(out.len(), 2);

    storage.find(&mut out, table, 10, "", &[]).await.unwrap();
    assert_eq!(out.len(), 4);

    storage
        .find(
            &mut out,
            table,
            10,
            "Id = ?",
            &[json!("\"finishy@qq.com\"")],
        )
        .await
        .unwrap();
    assert_eq!(sorted_ids(&out), ["finishy@qq.com"]);

    storage
        .find(
            &mut out,
            table,
            0,
            "Age < ? OR Star = ?",
            &[json!(19), json!(true)],
        )
        .await
        .unwrap();
    assert_eq!(sorted_ids(&out), ["1", "2", "finishy@qq.com"]);

    storage
        .find(&mut out, table, 0, "NOT Star = ?", &[json!(true)])
        .await
        .unwrap();
    assert_eq!(sorted_ids(&out), ["2", "3"]);

    storage
        .find(&mut out, table, 0, "(Age = 18 OR Age = 19) AND NOT Id = \"3\"", &[])
        .await
        .unwrap();
    assert_eq!(sorted_ids(&out), ["2"]);
}

pub async fn find_rejects_bad_expressions<S: Storage>(storage: &S, table: Option<&str>) {
    seed_class(storage, table).await;
    let mut out = Vec::<Student>::new();

    for (expr, args) in [
        ("Age != ?", vec![json!(1)]),
        ("18 < Age", vec![]),
        ("Age >= ?", vec![]),
        ("Age >=", vec![]),
        ("Age = ?", vec![Value::Null]),
    ] {
        let err = storage
            .find(&mut out, table, 0, expr, &args)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Filter(_)), "{expr}: {err}");
    }
}
