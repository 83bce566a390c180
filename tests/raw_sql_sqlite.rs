mod common;

use common::{open, seed_members, Member};
use keel::{query_by_sql, Entity, KeelError, Value};

#[test]
fn test_computed_column_lands_in_extras() {
    let db = open();
    seed_members(&db, 3);

    let rows = query_by_sql::<Member, _, _>(
        &db,
        "SELECT id, id + 1 AS idPlusOne FROM member WHERE id < ? ORDER BY id",
        [3],
    )
    .unwrap();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.extra("idPlusOne"), Some(&Value::BigInt(Some(row.id + 1))));
        assert!(row.name.is_empty());
    }
}

#[test]
fn test_builder_columns_keep_extras() {
    let db = open();
    seed_members(&db, 2);

    let rows = Member::select()
        .columns(["*", "id * 10 AS tenfold"])
        .order_by("id")
        .all(&db)
        .unwrap();
    assert_eq!(rows[1].name, "m2");
    assert_eq!(rows[1].extra("tenfold"), Some(&Value::BigInt(Some(20))));
}

#[test]
fn test_question_marks_in_comments_are_not_placeholders() {
    let db = open();
    seed_members(&db, 5);

    let rows = query_by_sql::<Member, _, _>(
        &db,
        "SELECT * FROM member WHERE id < ? /* why? */ ORDER BY id -- really?",
        [3],
    )
    .unwrap();
    let ids: Vec<i64> = rows.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_placeholder_mismatch_executes_nothing() {
    let db = open();
    let err = query_by_sql::<Member, _, _>(&db, "SELECT * FROM member WHERE id = ? AND name = ?", [1])
        .unwrap_err();
    assert!(matches!(err, KeelError::Build(_)));
}
