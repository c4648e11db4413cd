use chrono::NaiveDate;
use scoped_sqlite::prelude::*;
use serde_json::json;

fn store<T: FromColumn>(db: &Database, value: impl Into<Value>) -> Result<T> {
    db.prepare("INSERT INTO v (value) VALUES (?)")?
        .execute_with(&[value.into()])?;
    let id = db.last_insert_rowid()?;
    db.prepare("SELECT value FROM v WHERE rowid = ?")?
        .scalar_with(&params![id])
}

fn values_db() -> Result<Database> {
    let db = Database::open_memory()?;
    // No declared type, so no affinity rewrites the stored class.
    db.exec("CREATE TABLE v (value)")?;
    Ok(db)
}

#[test]
fn integers_round_trip_at_their_limits() -> Result<(), Box<dyn std::error::Error>> {
    let db = values_db()?;
    for v in [i16::MIN, -1, 0, i16::MAX] {
        assert_eq!(store::<i16>(&db, v)?, v);
    }
    for v in [i32::MIN, i32::MAX] {
        assert_eq!(store::<i32>(&db, v)?, v);
    }
    for v in [i64::MIN, i64::MAX] {
        assert_eq!(store::<i64>(&db, v)?, v);
    }
    assert_eq!(store::<i64>(&db, u32::MAX)?, i64::from(u32::MAX));
    assert!(store::<bool>(&db, true)?);

    let err = store::<i32>(&db, i64::MAX).expect_err("does not fit");
    assert!(matches!(err, Error::Conversion { index: 0, .. }));
    Ok(())
}

#[test]
#[allow(clippy::float_cmp)]
fn floats_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let db = values_db()?;
    for v in [0.0_f64, -2.5, f64::MIN_POSITIVE, f64::MAX, 1.0 / 3.0] {
        assert_eq!(store::<f64>(&db, v)?, v);
    }
    for v in [1.1_f32, f32::MIN, f32::MAX] {
        assert_eq!(store::<f32>(&db, v)?, v);
    }
    // Integer columns widen.
    assert_eq!(store::<f64>(&db, 7)?, 7.0);
    Ok(())
}

#[test]
fn text_round_trip_keeps_empty_and_nul() -> Result<(), Box<dyn std::error::Error>> {
    let db = values_db()?;
    assert_eq!(store::<String>(&db, "")?, "");
    assert_eq!(store::<String>(&db, "a\0b")?, "a\0b");
    assert_eq!(store::<String>(&db, "héllo wörld")?, "héllo wörld");
    assert_eq!(store::<Vec<u8>>(&db, "abc")?, b"abc");

    let empty: Option<String> = store(&db, "")?;
    assert_eq!(empty.as_deref(), Some(""));
    Ok(())
}

#[test]
fn blobs_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let db = values_db()?;
    let bytes = vec![0_u8, 1, 2, 255, 0];
    assert_eq!(store::<Vec<u8>>(&db, bytes.clone())?, bytes);
    assert_eq!(store::<Value>(&db, Vec::<u8>::new())?, Value::Blob(Vec::new()));
    assert_eq!(store::<Value>(&db, &bytes[..2])?, Value::Blob(vec![0, 1]));
    Ok(())
}

#[test]
fn null_is_distinct_from_empty() -> Result<(), Box<dyn std::error::Error>> {
    let db = values_db()?;
    db.prepare("INSERT INTO v (value) VALUES (?)")?
        .execute_with(&params![Null])?;

    let mut stmt = db.prepare("SELECT value, '' FROM v")?;
    let mut rows = stmt.cursor()?;
    let row = rows.next()?.expect("one row");
    assert!(row.is_null(0)?);
    assert_eq!(row.column_type(0)?, ColumnType::Null);
    assert!(matches!(row.int(0), Err(Error::NullColumn { index: 0 })));
    assert!(matches!(row.text(0), Err(Error::NullColumn { index: 0 })));
    assert_eq!(row.get::<Option<i64>>(0)?, None);
    assert_eq!(row.value(0)?, Value::Null);

    assert!(!row.is_null(1)?);
    assert_eq!(row.text(1)?, "");

    let none: Option<i64> = None;
    assert_eq!(store::<Value>(&db, none)?, Value::Null);
    Ok(())
}

#[test]
fn mismatched_storage_class_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let db = values_db()?;
    let mut stmt = db.prepare("SELECT 42, 'text', 1.5, x'00'")?;
    let mut rows = stmt.cursor()?;
    let row = rows.next()?.expect("one row");

    assert!(matches!(
        row.text(0),
        Err(Error::InvalidColumnType {
            index: 0,
            expected: ColumnType::Text,
            actual: ColumnType::Integer,
        })
    ));
    assert!(matches!(
        row.int64(1),
        Err(Error::InvalidColumnType {
            expected: ColumnType::Integer,
            actual: ColumnType::Text,
            ..
        })
    ));
    assert!(matches!(row.int64(2), Err(Error::InvalidColumnType { .. })));
    assert!(matches!(row.double(3), Err(Error::InvalidColumnType { .. })));
    assert!(matches!(
        row.int(4),
        Err(Error::Usage(UsageError::ColumnOutOfRange { index: 4, count: 4 }))
    ));

    assert_eq!(
        row.values()?,
        [
            Value::Integer(42),
            Value::Text("text".into()),
            Value::Real(1.5),
            Value::Blob(vec![0]),
        ]
    );
    Ok(())
}

#[test]
fn column_metadata_describes_result() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open_memory()?;
    db.exec("CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             INSERT INTO people (name) VALUES ('Ada');")?;

    let mut stmt = db.prepare("SELECT id, name AS who, 1 + 1 FROM people")?;
    assert_eq!(stmt.column_count()?, 3);
    assert_eq!(stmt.column_name(1)?, "who");
    assert!(matches!(
        stmt.column_name(3),
        Err(Error::Usage(UsageError::ColumnOutOfRange { index: 3, count: 3 }))
    ));

    let mut rows = stmt.cursor()?;
    let row = rows.next()?.expect("one row");
    assert_eq!(row.name(0)?, "id");
    assert_eq!(row.declared_type(0)?.as_deref(), Some("INTEGER"));
    assert_eq!(row.declared_type(1)?.as_deref(), Some("TEXT"));
    assert_eq!(row.declared_type(2)?, None);
    assert_eq!(row.get::<i64>(2)?, 2);
    Ok(())
}

#[cfg(feature = "column-metadata")]
#[test]
fn column_origin_names() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open_memory()?;
    db.exec("CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             INSERT INTO people (name) VALUES ('Ada');")?;

    let mut stmt = db.prepare("SELECT name AS who, 1 FROM people")?;
    let mut rows = stmt.cursor()?;
    let row = rows.next()?.expect("one row");
    assert_eq!(row.name(0)?, "who");
    assert_eq!(row.origin_name(0)?.as_deref(), Some("name"));
    assert_eq!(row.table_name(0)?.as_deref(), Some("people"));
    assert_eq!(row.database_name(0)?.as_deref(), Some("main"));

    // Expressions have no source column.
    assert_eq!(row.origin_name(1)?, None);
    assert_eq!(row.table_name(1)?, None);
    assert!(matches!(
        row.origin_name(2),
        Err(Error::Usage(UsageError::ColumnOutOfRange { index: 2, count: 2 }))
    ));
    Ok(())
}

#[test]
fn timestamps_and_json() -> Result<(), Box<dyn std::error::Error>> {
    let db = values_db()?;
    let at = NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_milli_opt(12, 30, 45, 250))
        .expect("valid timestamp");
    assert_eq!(store::<chrono::NaiveDateTime>(&db, at)?, at);
    assert_eq!(store::<String>(&db, at)?, "2024-03-01 12:30:45.250");

    let iso: chrono::NaiveDateTime = store(&db, "2024-03-01T12:30:45")?;
    assert_eq!(iso.to_string(), "2024-03-01 12:30:45");
    let epoch: chrono::NaiveDateTime = store(&db, 0)?;
    assert_eq!(epoch.to_string(), "1970-01-01 00:00:00");

    let doc = json!({ "name": "Ada", "tags": ["x", "y"], "n": 3 });
    assert_eq!(store::<serde_json::Value>(&db, doc.clone())?, doc);
    assert_eq!(store::<serde_json::Value>(&db, 5)?, json!(5));
    Ok(())
}
