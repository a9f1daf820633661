//! Integration tests for the migration and seed runners
//!
//! These run the runners end to end against real SQLite files:
//! - Idempotent migrate and single-step rollback
//! - Schema-driven migrations
//! - Seeds running on every invocation and stopping at the first failure
//! - Driver release on every path

#[cfg(feature = "sqlite")]
mod sqlite_tests {
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use worksonmydb::core::context::boxed;
    use worksonmydb::core::migration::{self, MigrationStatus};
    use worksonmydb::core::schema::{bool, int, table, text, varchar, ColumnDefinition, Schema};
    use worksonmydb::core::seed;
    use worksonmydb::prelude::*;

    static NEXT_DB: AtomicUsize = AtomicUsize::new(0);

    /// A database file that is removed when dropped.
    ///
    /// Each runner call closes its driver, so state has to live on disk
    /// between invocations.
    struct TempDb {
        path: PathBuf,
    }

    impl TempDb {
        fn new() -> Self {
            let path = std::env::temp_dir().join(format!(
                "worksonmydb-it-{}-{}.db",
                std::process::id(),
                NEXT_DB.fetch_add(1, Ordering::SeqCst)
            ));
            let _ = std::fs::remove_file(&path);
            Self { path }
        }

        async fn open(&self) -> SqliteDriver {
            SqliteDriver::open(self.path.to_str().expect("temp path is utf-8"))
                .await
                .expect("Failed to open database")
        }

        async fn count(&self, sql: &str) -> i64 {
            let driver = self.open().await;
            let result = driver.query(sql, &[]).await.expect("Query failed");
            driver.close().await.expect("Close failed");
            result.rows[0]["n"].as_long().expect("count is an integer")
        }

        async fn table_exists(&self, name: &str) -> bool {
            let driver = self.open().await;
            let result = driver
                .query(
                    "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = ?",
                    &[DatabaseValue::from(name)],
                )
                .await
                .expect("Query failed");
            driver.close().await.expect("Close failed");
            result.rows[0]["n"].as_long() == Some(1)
        }
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn two_tables() -> MigrationSet {
        MigrationSet::new(vec![
            Box::new(SqlMigration::new(
                "002_b",
                "CREATE TABLE b (id INTEGER PRIMARY KEY)",
                "DROP TABLE b",
            )),
            Box::new(SqlMigration::new(
                "001_a",
                "CREATE TABLE a (id INTEGER PRIMARY KEY)",
                "DROP TABLE a",
            )),
        ])
        .expect("valid set")
    }

    fn blog_schema() -> Schema {
        Schema::new(vec![
            table(
                "users",
                vec![
                    ColumnDefinition::new("id", int()).primary_key().auto_increment(),
                    ColumnDefinition::new("email", varchar(255)).not_null().unique(),
                ],
            ),
            table(
                "posts",
                vec![
                    ColumnDefinition::new("id", int()).primary_key().auto_increment(),
                    ColumnDefinition::new("user_id", int()).not_null(),
                    ColumnDefinition::new("title", varchar(255)).not_null(),
                    ColumnDefinition::new("body", text()).not_null(),
                    ColumnDefinition::new("published", bool())
                        .not_null()
                        .default_value(false),
                ],
            ),
        ])
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = TempDb::new();

        let report = migration::migrate(&db.open().await, &SQLITE, &two_tables())
            .await
            .expect("First migrate failed");
        assert_eq!(report.applied, vec!["001_a", "002_b"]);

        let report = migration::migrate(&db.open().await, &SQLITE, &two_tables())
            .await
            .expect("Second migrate failed");
        assert!(report.applied.is_empty());

        assert_eq!(db.count("SELECT COUNT(*) AS n FROM _migrations").await, 2);
    }

    #[tokio::test]
    async fn test_rollback_reverts_exactly_one() {
        let db = TempDb::new();
        migration::migrate(&db.open().await, &SQLITE, &two_tables())
            .await
            .expect("Migrate failed");

        let outcome = migration::rollback(&db.open().await, &SQLITE, &two_tables())
            .await
            .expect("Rollback failed");
        assert_eq!(outcome, RollbackOutcome::RolledBack("002_b".to_string()));

        assert_eq!(db.count("SELECT COUNT(*) AS n FROM _migrations").await, 1);
        assert!(db.table_exists("a").await);
        assert!(!db.table_exists("b").await);

        // the next pending unit is the one just reverted
        let driver = db.open().await;
        let pending = Migrator::new(&driver, &SQLITE)
            .pending(&two_tables())
            .await
            .expect("Status failed");
        driver.close().await.expect("Close failed");
        assert_eq!(pending, vec!["002_b"]);
    }

    #[tokio::test]
    async fn test_rollback_follows_application_order_not_names() {
        let db = TempDb::new();
        let later_only = MigrationSet::new(vec![Box::new(SqlMigration::new(
            "002_b",
            "CREATE TABLE b (id INTEGER PRIMARY KEY)",
            "DROP TABLE b",
        ))])
        .expect("valid set");

        migration::migrate(&db.open().await, &SQLITE, &later_only)
            .await
            .expect("First migrate failed");
        let report = migration::migrate(&db.open().await, &SQLITE, &two_tables())
            .await
            .expect("Second migrate failed");
        assert_eq!(report.applied, vec!["001_a"]);

        // 001_a sorts first by name but was applied last
        let outcome = migration::rollback(&db.open().await, &SQLITE, &two_tables())
            .await
            .expect("Rollback failed");
        assert_eq!(outcome, RollbackOutcome::RolledBack("001_a".to_string()));
        assert!(!db.table_exists("a").await);
        assert!(db.table_exists("b").await);
    }

    #[tokio::test]
    async fn test_apply_on_fresh_database_records_history() {
        let db = TempDb::new();
        let unit = SqlMigration::new(
            "001_a",
            "CREATE TABLE a (id INTEGER PRIMARY KEY)",
            "DROP TABLE a",
        );

        let driver = db.open().await;
        let migrator = Migrator::new(&driver, &SQLITE);
        migrator.apply(&unit).await.expect("Apply failed");
        assert_eq!(
            migrator.applied_names().await.expect("History failed"),
            vec!["001_a"]
        );
        driver.close().await.expect("Close failed");
        assert!(db.table_exists("a").await);

        // reverting against another fresh file creates the table, then runs down
        let other = TempDb::new();
        let driver = other.open().await;
        driver
            .query("CREATE TABLE a (id INTEGER PRIMARY KEY)", &[])
            .await
            .expect("Create failed");
        Migrator::new(&driver, &SQLITE)
            .revert(&unit)
            .await
            .expect("Revert failed");
        driver.close().await.expect("Close failed");
        assert!(other.table_exists("_migrations").await);
        assert!(!other.table_exists("a").await);
    }

    #[tokio::test]
    async fn test_rollback_on_empty_history() {
        let db = TempDb::new();
        let outcome = migration::rollback(&db.open().await, &SQLITE, &two_tables())
            .await
            .expect("Rollback failed");
        assert_eq!(outcome, RollbackOutcome::NothingToRollBack);
    }

    #[tokio::test]
    async fn test_schema_migration_up_and_down() {
        let db = TempDb::new();
        let set = MigrationSet::new(vec![Box::new(FnMigration::new(
            "001_init",
            |ctx| {
                boxed(async move {
                    for sql in blog_schema().create_statements(ctx.dialect())? {
                        ctx.run(&sql, &[]).await?;
                    }
                    Ok(())
                })
            },
            |ctx| {
                boxed(async move {
                    for sql in blog_schema().drop_statements(ctx.dialect())? {
                        ctx.run(&sql, &[]).await?;
                    }
                    Ok(())
                })
            },
        ))])
        .expect("valid set");

        migration::migrate(&db.open().await, &SQLITE, &set)
            .await
            .expect("Migrate failed");
        assert!(db.table_exists("users").await);
        assert!(db.table_exists("posts").await);

        // the schema's ids generate themselves
        let driver = db.open().await;
        let result = driver
            .query(
                "INSERT INTO users (email) VALUES (?)",
                &[DatabaseValue::from("a@example.com")],
            )
            .await
            .expect("Insert failed");
        assert_eq!(result.insert_id, Some(1));
        driver.close().await.expect("Close failed");

        let outcome = migration::rollback(&db.open().await, &SQLITE, &set)
            .await
            .expect("Rollback failed");
        assert_eq!(outcome, RollbackOutcome::RolledBack("001_init".to_string()));
        assert!(!db.table_exists("users").await);
        assert!(!db.table_exists("posts").await);
        assert_eq!(db.count("SELECT COUNT(*) AS n FROM _migrations").await, 0);
    }

    #[tokio::test]
    async fn test_rollback_with_missing_unit() {
        let db = TempDb::new();
        migration::migrate(&db.open().await, &SQLITE, &two_tables())
            .await
            .expect("Migrate failed");

        let only_first = MigrationSet::new(vec![Box::new(SqlMigration::new(
            "001_a",
            "CREATE TABLE a (id INTEGER PRIMARY KEY)",
            "DROP TABLE a",
        ))])
        .expect("valid set");

        let outcome = migration::rollback(&db.open().await, &SQLITE, &only_first)
            .await
            .expect("Rollback failed");
        assert_eq!(outcome, RollbackOutcome::HistoryMismatch("002_b".to_string()));

        // nothing was touched
        assert_eq!(db.count("SELECT COUNT(*) AS n FROM _migrations").await, 2);
        assert!(db.table_exists("b").await);
    }

    #[tokio::test]
    async fn test_custom_history_table() {
        let db = TempDb::new();

        let driver = db.open().await;
        let migrator = Migrator::new(&driver, &SQLITE).with_table_name("schema_history");
        migration::migrate_with(migrator, &two_tables())
            .await
            .expect("Migrate failed");

        assert!(db.table_exists("schema_history").await);
        assert!(!db.table_exists("_migrations").await);

        let driver = db.open().await;
        let status = Migrator::new(&driver, &SQLITE)
            .with_table_name("schema_history")
            .status(&two_tables())
            .await
            .expect("Status failed");
        driver.close().await.expect("Close failed");

        assert!(status
            .iter()
            .all(|unit| unit.status == MigrationStatus::Applied && unit.applied_at.is_some()));
        assert!(status[0].applied_at < status[1].applied_at);
    }

    #[tokio::test]
    async fn test_failed_migration_keeps_earlier_units() {
        let db = TempDb::new();
        let set = MigrationSet::new(vec![
            Box::new(SqlMigration::new(
                "001_a",
                "CREATE TABLE a (id INTEGER PRIMARY KEY)",
                "DROP TABLE a",
            )),
            Box::new(SqlMigration::new("002_broken", "CREATE TABLE", "")),
            Box::new(SqlMigration::new(
                "003_c",
                "CREATE TABLE c (id INTEGER PRIMARY KEY)",
                "DROP TABLE c",
            )),
        ])
        .expect("valid set");

        let err = migration::migrate(&db.open().await, &SQLITE, &set)
            .await
            .unwrap_err();
        assert!(err.is_driver_error());

        assert_eq!(db.count("SELECT COUNT(*) AS n FROM _migrations").await, 1);
        assert!(db.table_exists("a").await);
        assert!(!db.table_exists("c").await);
    }

    fn counter_seeds() -> SeedSet {
        SeedSet::new(vec![
            Box::new(FnSeed::new("002_counter", |ctx| {
                boxed(async move {
                    ctx.execute(&QueryNode::insert("counter").value("label", "tick").build())
                        .await?;
                    Ok(())
                })
            })),
            Box::new(FnSeed::new("001_table", |ctx| {
                boxed(async move {
                    ctx.run(
                        "CREATE TABLE IF NOT EXISTS counter (id INTEGER PRIMARY KEY, label TEXT)",
                        &[],
                    )
                    .await?;
                    Ok(())
                })
            })),
        ])
        .expect("valid set")
    }

    #[tokio::test]
    async fn test_seeds_run_every_time() {
        let db = TempDb::new();

        let report = seed::seed(&db.open().await, &SQLITE, &counter_seeds())
            .await
            .expect("First seed failed");
        assert_eq!(report.ran, vec!["001_table", "002_counter"]);

        seed::seed(&db.open().await, &SQLITE, &counter_seeds())
            .await
            .expect("Second seed failed");

        assert_eq!(db.count("SELECT COUNT(*) AS n FROM counter").await, 2);
    }

    #[tokio::test]
    async fn test_seed_stops_at_first_failure() {
        let db = TempDb::new();
        let ran_last = std::sync::Arc::new(AtomicBool::new(false));
        let flag = std::sync::Arc::clone(&ran_last);

        let set = SeedSet::new(vec![
            Box::new(FnSeed::new("a", |ctx| {
                boxed(async move {
                    ctx.run("INSERT INTO missing_table (x) VALUES (1)", &[])
                        .await?;
                    Ok(())
                })
            })),
            Box::new(FnSeed::new("b", move |_ctx| {
                flag.store(true, Ordering::SeqCst);
                boxed(async { Ok(()) })
            })),
        ])
        .expect("valid set");

        assert!(seed::seed(&db.open().await, &SQLITE, &set).await.is_err());
        assert!(!ran_last.load(Ordering::SeqCst));
    }

    /// Fails every statement and remembers whether it was closed
    #[derive(Default)]
    struct BrokenDriver {
        closed: AtomicBool,
    }

    #[async_trait]
    impl Driver for BrokenDriver {
        async fn query(&self, _sql: &str, _params: &[DatabaseValue]) -> Result<QueryResult> {
            Err(ToolkitError::driver("connection reset"))
        }

        async fn close(&self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_driver_closed_after_failure() {
        tokio_test::block_on(async {
            let driver = BrokenDriver::default();
            let err = migration::migrate(&driver, &SQLITE, &two_tables())
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), ToolkitError::driver("connection reset").to_string());
            assert!(driver.closed.load(Ordering::SeqCst));

            let driver = BrokenDriver::default();
            assert!(migration::rollback(&driver, &SQLITE, &two_tables())
                .await
                .is_err());
            assert!(driver.closed.load(Ordering::SeqCst));

            let driver = BrokenDriver::default();
            assert!(seed::seed(&driver, &SQLITE, &counter_seeds()).await.is_err());
            assert!(driver.closed.load(Ordering::SeqCst));
        });
    }

    #[tokio::test]
    async fn test_database_facade_roundtrip() {
        let db = TempDb::new();
        let database = Database::new(Box::new(db.open().await), &SQLITE);

        database
            .raw("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT, pinned BOOLEAN)", &[])
            .await
            .expect("Create failed");

        let inserted = database
            .execute(
                &QueryNode::insert("notes")
                    .value("body", "first")
                    .value("pinned", true)
                    .returning(&["id"])
                    .build(),
            )
            .await
            .expect("Insert failed");
        assert_eq!(inserted.rows[0]["id"].as_long(), Some(1));

        let rows = database
            .execute(
                &QueryNode::select("notes")
                    .columns(&["body"])
                    .filter(Condition::in_list("id", vec![1, 2]))
                    .build(),
            )
            .await
            .expect("Select failed")
            .rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["body"].as_string(), "first");

        database.close().await.expect("Close failed");
    }
}
