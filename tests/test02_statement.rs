use rusqlite::ffi;
use scoped_sqlite::prelude::*;

fn seeded() -> Result<Database> {
    let db = Database::open_memory()?;
    db.exec(
        "CREATE TABLE test (id INTEGER, name TEXT);
         INSERT INTO test (id, name) VALUES (1, 'One');
         INSERT INTO test (id, name) VALUES (2, 'Two');
         INSERT INTO test (id, name) VALUES (3, 'Three');",
    )?;
    Ok(db)
}

#[test]
fn select_between_bound_ids() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open_memory()?;
    db.exec("CREATE TABLE test (id INTEGER, name TEXT)")?;

    let mut insert = db.prepare("INSERT INTO test (id, name) VALUES (?, ?)")?;
    assert_eq!(insert.parameter_count()?, 2);
    assert!(!insert.is_read_only());
    assert_eq!(insert.execute_with(&params![1, "One"])?, 1);
    assert_eq!(insert.execute_with(&params![2, "Two"])?, 1);

    let mut select = db.prepare("SELECT id, name FROM test WHERE id BETWEEN ? AND ?")?;
    assert!(select.is_read_only());
    assert_eq!(select.column_names()?, ["id", "name"]);

    let mut rows = select.cursor_with(&params![1, 2])?;
    let mut seen = Vec::new();
    while let Some(row) = rows.next()? {
        seen.push((row.int(0)?, row.text(1)?));
    }
    assert_eq!(seen, [(1, "One".to_string()), (2, "Two".to_string())]);
    Ok(())
}

#[test]
fn cursor_yields_n_rows_then_exhausts() -> Result<(), Box<dyn std::error::Error>> {
    let db = seeded()?;
    let mut stmt = db.prepare("SELECT id FROM test ORDER BY id")?;
    assert_eq!(stmt.state(), CursorState::Ready);

    for _pass in 0..2 {
        let mut rows = stmt.cursor()?;
        for expected in 1..=3 {
            let row = rows.next()?.expect("row available");
            assert_eq!(row.int64(0)?, expected);
            assert_eq!(rows.state(), CursorState::Row);
        }
        assert!(rows.next()?.is_none());
        assert!(rows.is_exhausted());
        // Exhaustion is sticky within one traversal.
        assert!(rows.next()?.is_none());
        assert_eq!(rows.state(), CursorState::Done);
    }
    assert_eq!(stmt.state(), CursorState::Ready);
    Ok(())
}

#[test]
fn new_cursor_discards_unread_rows() -> Result<(), Box<dyn std::error::Error>> {
    let db = seeded()?;
    let mut stmt = db.prepare("SELECT id FROM test ORDER BY id")?;

    {
        let mut rows = stmt.cursor()?;
        let first = rows.next()?.expect("first row").int64(0)?;
        assert_eq!(first, 1);
    }

    let ids = stmt
        .cursor()?
        .map(|row| row.int64(0))
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(ids, [1, 2, 3]);
    assert_eq!(stmt.cursor()?.count_remaining()?, 3);
    Ok(())
}

#[test]
fn bindings_survive_rewind() -> Result<(), Box<dyn std::error::Error>> {
    let db = seeded()?;
    let mut stmt = db.prepare("SELECT name FROM test WHERE id = ?")?;

    stmt.bind(1, 2)?;
    assert_eq!(stmt.scalar::<String>()?, "Two");
    // Same binding, fresh traversal.
    assert_eq!(stmt.scalar::<String>()?, "Two");

    stmt.bind(1, 3)?;
    assert_eq!(stmt.scalar::<String>()?, "Three");

    stmt.clear_bindings()?;
    assert!(matches!(stmt.scalar::<String>(), Err(Error::NoRows)));
    Ok(())
}

#[test]
fn binding_positions_are_checked() -> Result<(), Box<dyn std::error::Error>> {
    let db = seeded()?;
    let mut stmt = db.prepare("SELECT name FROM test WHERE id = ?")?;

    let err = stmt.bind(2, 1).expect_err("past the end");
    assert!(matches!(
        err,
        Error::Usage(UsageError::ParameterOutOfRange { index: 2, count: 1 })
    ));
    let err = stmt.bind(0, 1).expect_err("positions are 1-based");
    assert!(matches!(
        err,
        Error::Usage(UsageError::ParameterOutOfRange { index: 0, count: 1 })
    ));
    let err = stmt.bind_all(&params![1, 2]).expect_err("too many values");
    assert!(matches!(
        err,
        Error::Usage(UsageError::ParameterOutOfRange { index: 2, count: 1 })
    ));
    Ok(())
}

#[test]
fn failed_step_requires_reset() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open_memory()?;
    db.exec("CREATE TABLE u (id INTEGER PRIMARY KEY)")?;
    let mut insert = db.prepare("INSERT INTO u (id) VALUES (?)")?;
    insert.execute_with(&params![1])?;

    let err = insert.execute_with(&params![1]).expect_err("duplicate key");
    assert_eq!(err.engine_code(), Some(ffi::SQLITE_CONSTRAINT));
    assert!(err.to_string().contains("UNIQUE constraint failed"));
    assert_eq!(insert.state(), CursorState::Error);

    let err = insert.execute_with(&params![2]).expect_err("still failed");
    assert!(matches!(err, Error::Usage(UsageError::StatementFailed)));
    assert!(matches!(insert.cursor(), Err(Error::Usage(UsageError::StatementFailed))));
    assert!(matches!(insert.clear_bindings(), Err(Error::Usage(UsageError::StatementFailed))));

    insert.reset()?;
    assert_eq!(insert.state(), CursorState::Ready);
    assert_eq!(insert.execute_with(&params![2])?, 1);
    assert_eq!(db.prepare("SELECT count(*) FROM u")?.scalar::<i64>()?, 2);
    Ok(())
}

#[test]
fn read_only_statement_reports_no_changes() -> Result<(), Box<dyn std::error::Error>> {
    let db = seeded()?;
    db.prepare("UPDATE test SET name = 'x' WHERE id = 1")?.execute()?;
    assert_eq!(db.prepare("SELECT * FROM test")?.execute()?, 0);
    Ok(())
}

#[test]
fn scalar_without_rows() -> Result<(), Box<dyn std::error::Error>> {
    let db = seeded()?;
    let mut stmt = db.prepare("SELECT id FROM test WHERE id > ?")?;
    assert!(matches!(stmt.scalar_with::<i64>(&params![10]), Err(Error::NoRows)));
    assert_eq!(stmt.scalar_with::<i64>(&params![2])?, 3);
    assert_eq!(stmt.sql().as_deref(), Some("SELECT id FROM test WHERE id > ?"));
    Ok(())
}

#[test]
fn mapped_rows_stop_at_first_error() -> Result<(), Box<dyn std::error::Error>> {
    let db = seeded()?;
    db.exec("INSERT INTO test (id, name) VALUES (4, NULL)")?;
    let mut stmt = db.prepare("SELECT name FROM test ORDER BY id")?;

    let mut iter = stmt.cursor()?.map(|row| row.text(0));
    let mut names = Vec::new();
    let mut failure = None;
    for item in iter.by_ref() {
        match item {
            Ok(name) => names.push(name),
            Err(err) => failure = Some(err),
        }
    }
    assert_eq!(names, ["One", "Two", "Three"]);
    assert!(matches!(failure, Some(Error::NullColumn { index: 0 })));
    assert!(iter.next().is_none());
    drop(iter);

    let all = stmt.cursor()?.map(|row| row.get::<Option<String>>(0));
    assert_eq!(all.filter_map(Result::ok).flatten().count(), 3);

    let table = stmt.cursor()?.collect_values()?;
    assert_eq!(table.len(), 4);
    assert_eq!(table[0], [Value::Text("One".into())]);
    assert_eq!(table[3], [Value::Null]);
    Ok(())
}
