//! `worksonmydb` with the bundled blog schema: a `001_init` migration that
//! creates `users` and `posts`, and a seed that inserts one of each.

use std::process::ExitCode;
use worksonmydb::cli::{self, Project};
use worksonmydb::core::context::{boxed, ExecutionContext, UnitFuture};
use worksonmydb::core::schema::{bool, datetime, int, json, table, text, varchar};
use worksonmydb::core::{
    ColumnDefinition, DatabaseValue, FnMigration, FnSeed, QueryNode, Result, Schema,
    ToolkitError,
};

fn schema() -> Schema {
    Schema::new(vec![
        table(
            "users",
            vec![
                ColumnDefinition::new("id", int()).primary_key().auto_increment(),
                ColumnDefinition::new("email", varchar(255)).not_null().unique(),
                ColumnDefinition::new("created_at", datetime()).not_null(),
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
                ColumnDefinition::new("metadata", json()),
            ],
        ),
    ])
}

fn init_up(ctx: ExecutionContext<'_>) -> UnitFuture<'_> {
    boxed(async move {
        for sql in schema().create_statements(ctx.dialect())? {
            ctx.run(&sql, &[]).await?;
        }
        Ok(())
    })
}

fn init_down(ctx: ExecutionContext<'_>) -> UnitFuture<'_> {
    boxed(async move {
        for sql in schema().drop_statements(ctx.dialect())? {
            ctx.run(&sql, &[]).await?;
        }
        Ok(())
    })
}

async fn insert_returning_id(ctx: ExecutionContext<'_>, node: QueryNode) -> Result<i64> {
    let result = ctx.execute(&node).await?;
    let id = result
        .rows
        .first()
        .and_then(|row| row.get("id"))
        .and_then(DatabaseValue::as_long)
        .or(result.insert_id);
    id.ok_or_else(|| ToolkitError::driver("insert reported neither a returned id nor an insert id"))
}

fn demo_seed(ctx: ExecutionContext<'_>) -> UnitFuture<'_> {
    boxed(async move {
        let mut user = QueryNode::insert("users")
            .value("email", "demo@worksonmydb.local")
            .value("created_at", chrono::Utc::now());
        if ctx.dialect().supports_returning() {
            user = user.returning(&["id"]);
        }
        let user_id = insert_returning_id(ctx, user.build()).await?;

        let post = QueryNode::insert("posts")
            .value("user_id", user_id)
            .value("title", "Hello WorksOnMyDB")
            .value("body", "First post seeded from the CLI.")
            .value("published", true)
            .value("metadata", r#"{"tags":["hello"]}"#)
            .build();
        ctx.execute(&post).await?;
        Ok(())
    })
}

fn main() -> ExitCode {
    let project = Project::new()
        .schema(schema())
        .migration(FnMigration::new("001_init", init_up, init_down))
        .seed(FnSeed::new("seed", demo_seed));

    cli::main_with(project)
}
