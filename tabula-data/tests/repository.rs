use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tabula_data::{
    params, AssignError, AssignmentPolicy, CommandExecutor, DataError, DbType, Entity, FieldDef,
    MapperConfig, Pageable, Parameter, Repository, RowSet, SchemaRegistry, Shape, StatementKind,
    Value,
};

// ── Test executor ───────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingExecutor {
    opened: usize,
    closed: usize,
    open: bool,
    fail_open: bool,
    fail_execute: bool,
    results: VecDeque<RowSet>,
    affected: u64,
    calls: Vec<(String, Vec<Parameter>)>,
}

impl RecordingExecutor {
    fn returning(rows: RowSet) -> Self {
        Self {
            results: VecDeque::from([rows]),
            ..Self::default()
        }
    }

    fn last_call(&self) -> &(String, Vec<Parameter>) {
        self.calls.last().expect("no statement executed")
    }

    fn record(&mut self, sql: &str, params: Vec<Parameter>) -> Result<(), DataError> {
        assert!(self.open, "statement executed outside a session");
        self.calls.push((sql.to_string(), params));
        if self.fail_execute {
            return Err(DataError::executor(std::io::Error::other("server went away")));
        }
        Ok(())
    }
}

impl CommandExecutor for RecordingExecutor {
    type Cursor = RowSet;

    async fn open(&mut self) -> Result<(), DataError> {
        self.opened += 1;
        if self.fail_open {
            return Err(DataError::executor(std::io::Error::other("connection refused")));
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.closed += 1;
        self.open = false;
    }

    async fn execute_query(&mut self, sql: &str) -> Result<RowSet, DataError> {
        self.record(sql, Vec::new())?;
        Ok(self.results.pop_front().unwrap_or_default())
    }

    async fn execute_with_parameters(
        &mut self,
        sql: &str,
        params: Vec<Parameter>,
    ) -> Result<RowSet, DataError> {
        self.record(sql, params)?;
        Ok(self.results.pop_front().unwrap_or_default())
    }

    async fn execute_non_query(
        &mut self,
        sql: &str,
        params: Vec<Parameter>,
    ) -> Result<u64, DataError> {
        self.record(sql, params)?;
        Ok(self.affected)
    }
}

// ── Entities ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "Users")]
struct User {
    #[entity(key, column = "Id")]
    id: i32,
    #[entity(column = "Name")]
    name: String,
    #[entity(column = "Age")]
    age: i32,
}

#[derive(Debug, Default, Entity)]
#[entity(table = "Notes")]
struct Note {
    title: String,
    body: String,
}

static AUDIT_SHAPE_CALLS: AtomicUsize = AtomicUsize::new(0);

/// Hand-written binding that counts how often its shape is requested.
#[derive(Debug, Default)]
struct Audit {
    id: i64,
}

impl Entity for Audit {
    fn shape() -> Shape {
        const FIELDS: &[FieldDef] = &[FieldDef::new("id")];
        AUDIT_SHAPE_CALLS.fetch_add(1, Ordering::SeqCst);
        Shape::new("Audit", FIELDS).table("AuditLog")
    }

    fn assign(&mut self, field: &str, value: &Value) -> Result<(), AssignError> {
        match field {
            "id" => self.id = tabula_data::FromValue::from_value(value)?,
            other => return Err(AssignError::UnknownField(other.to_string())),
        }
        Ok(())
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![("id", Value::Int64(self.id))]
    }
}

fn user_rows() -> RowSet {
    RowSet::new(vec!["Id".into(), "Name".into(), "Age".into()])
        .with_row(vec![Value::Int32(1), Value::Text("ann".into()), Value::Int32(30)])
        .with_row(vec![Value::Int32(2), Value::Text("bob".into()), Value::Text("n/a".into())])
        .with_row(vec![Value::Int32(3), Value::Null, Value::Int32(50)])
}

fn repository(executor: RecordingExecutor) -> Repository<RecordingExecutor> {
    Repository::new(executor).with_registry(Arc::new(SchemaRegistry::new()))
}

// ── Reads ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_select_binds_positional_parameters() {
    let mut repo = repository(RecordingExecutor::default());

    let users: Vec<User> = repo
        .select("Age > @0 AND Name = @1", "Name", params![18, "bob"])
        .await
        .unwrap();
    assert!(users.is_empty());

    let (sql, params) = repo.executor().last_call();
    assert_eq!(sql, "SELECT * FROM Users WHERE Age > @0 AND Name = @1 ORDER BY Name");
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].placeholder(), "@0");
    assert_eq!(params[0].db_type, DbType::Int32);
    assert_eq!(params[1].placeholder(), "@1");
    assert_eq!(params[1].value, Value::Text("bob".into()));
}

#[tokio::test]
async fn test_select_materializes_leniently() {
    let mut repo = repository(RecordingExecutor::returning(user_rows()));

    let users: Vec<User> = repo.fetch("", "", params![]).await.unwrap();
    assert_eq!(
        users,
        vec![
            User { id: 1, name: "ann".into(), age: 30 },
            User { id: 2, name: "bob".into(), age: 0 },
            User { id: 3, name: String::new(), age: 50 },
        ]
    );
    assert_eq!(repo.skipped_fields(), 1);
}

#[tokio::test]
async fn test_strict_policy_fails_the_read() {
    let mut repo =
        repository(RecordingExecutor::returning(user_rows())).with_policy(AssignmentPolicy::Strict);

    let err = repo.select::<User>("", "", params![]).await.unwrap_err();
    match err {
        DataError::FieldAssignment(e) => {
            assert_eq!(e.entity, "User");
            assert_eq!(e.field, "age");
            assert_eq!(e.column, "Age");
        }
        other => panic!("expected FieldAssignment, got {other:?}"),
    }
    assert_eq!(repo.executor().closed, 1);
}

#[tokio::test]
async fn test_paged_binds_window_parameters() {
    let mut repo = repository(RecordingExecutor::default());

    let _: Vec<User> = repo.paged(20, 10, "", "").await.unwrap();

    let (sql, params) = repo.executor().last_call();
    assert_eq!(
        sql,
        "SELECT [t1].Id, [t1].Name, [t1].Age\n\
         FROM (SELECT ROW_NUMBER() OVER (ORDER BY Id) AS [ROW_NUMBER], [t0].Id, [t0].Name, [t0].Age FROM [dbo].[Users] AS [t0]) AS [t1]\n\
         WHERE [t1].[ROW_NUMBER] BETWEEN @PageNum + 1 AND @PageNum + @PageSize\n\
         ORDER BY [t1].[ROW_NUMBER]"
    );
    assert_eq!(
        params,
        &vec![
            Parameter::new("PageNum", DbType::Int32, 20),
            Parameter::new("PageSize", DbType::Int32, 10),
        ]
    );
}

#[tokio::test]
async fn test_paged_with_binds_filter_values() {
    let mut repo = repository(RecordingExecutor::default());
    let _: Vec<User> = repo
        .paged_with(0, 10, "Age > @0", "", params![18])
        .await
        .unwrap();
    let (sql, params) = repo.executor().last_call();
    assert!(sql.contains("AS [t0] WHERE Age > @0)"));
    let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["PageNum", "PageSize", "0"]);
    assert_eq!(params[2].value, Value::Int32(18));
}

#[tokio::test]
async fn test_paged_text_fixed_by_first_call() {
    let mut repo = repository(RecordingExecutor::default());

    let _: Vec<User> = repo.paged(0, 10, "", "Name").await.unwrap();
    let first = repo.executor().last_call().0.clone();
    let _: Vec<User> = repo.paged(10, 10, "Age > 3", "Age DESC").await.unwrap();
    let second = repo.executor().last_call().0.clone();

    assert!(first.contains("ORDER BY Name"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_page_uses_pageable_window() {
    let mut repo = repository(RecordingExecutor::default());

    let _: Vec<User> = repo.page(&Pageable::new(2, 25).sorted_by("Name")).await.unwrap();

    let (sql, params) = repo.executor().last_call();
    assert!(sql.contains("OVER (ORDER BY Name)"));
    assert_eq!(params[0].value, Value::Int32(50));
    assert_eq!(params[1].value, Value::Int32(25));
}

#[tokio::test]
async fn test_config_drives_options_and_policy() {
    let config = MapperConfig::from_yaml_str("tabula:\n  schema: null\n  assignment: strict\n").unwrap();
    let mut repo = Repository::with_config(RecordingExecutor::default(), &config)
        .with_registry(Arc::new(SchemaRegistry::new()));

    let _: Vec<User> = repo.paged(0, 5, "", "").await.unwrap();
    assert!(repo.executor().last_call().0.contains("FROM [Users] AS [t0]"));

    repo.executor_mut().results.push_back(user_rows());
    assert!(repo.select::<User>("", "", params![]).await.is_err());
}

// ── Writes ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_insert_update_delete_bind_columns() {
    let mut repo = repository(RecordingExecutor {
        affected: 1,
        ..RecordingExecutor::default()
    });
    let user = User { id: 7, name: "eve".into(), age: 41 };

    assert_eq!(repo.insert(&user).await.unwrap(), 1);
    let (sql, params) = repo.executor().last_call();
    assert_eq!(sql, "INSERT INTO Users (Id, Name, Age) VALUES (@Id, @Name, @Age)");
    let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Id", "Name", "Age"]);
    assert_eq!(params[1].value, Value::Text("eve".into()));

    repo.update(&user).await.unwrap();
    assert_eq!(
        repo.executor().last_call().0,
        "UPDATE Users SET Id = @Id, Name = @Name, Age = @Age WHERE Id = @Id"
    );

    repo.delete(&user).await.unwrap();
    assert_eq!(repo.executor().last_call().0, "DELETE Users WHERE Id = @Id");
    assert_eq!(repo.executor().opened, 3);
    assert_eq!(repo.executor().closed, 3);
}

#[tokio::test]
async fn test_update_without_identity_is_rejected_before_executing() {
    let mut repo = repository(RecordingExecutor::default());
    let note = Note {
        title: "t".into(),
        body: "b".into(),
    };

    let err = repo.update(&note).await.unwrap_err();
    assert!(matches!(err, DataError::NoIdentity { ref table } if table == "Notes"));
    assert!(matches!(repo.delete(&note).await, Err(DataError::NoIdentity { .. })));
    assert_eq!(repo.executor().opened, 0);

    // Inserting needs no identity.
    repo.insert(&note).await.unwrap();
}

// ── Sessions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_session_closes_after_executor_error() {
    let mut repo = repository(RecordingExecutor {
        fail_execute: true,
        ..RecordingExecutor::default()
    });

    let err = repo.select::<User>("", "", params![]).await.unwrap_err();
    assert!(matches!(err, DataError::Executor(_)));
    assert_eq!(err.to_string(), "Executor error: server went away");
    assert_eq!(repo.executor().opened, 1);
    assert_eq!(repo.executor().closed, 1);
    assert!(!repo.executor().open);
}

#[tokio::test]
async fn test_session_closes_after_failed_open() {
    let mut repo = repository(RecordingExecutor {
        fail_open: true,
        ..RecordingExecutor::default()
    });

    let err = repo.insert(&User::default()).await.unwrap_err();
    assert!(matches!(err, DataError::Executor(_)));
    assert_eq!(repo.executor().closed, 1);
    assert!(repo.executor().calls.is_empty());
}

// ── Caching ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_generator_created_once_per_entity() {
    let mut repo = repository(RecordingExecutor::default());

    let _: Vec<User> = repo.select("Age > @0", "", params![1]).await.unwrap();
    let generator = repo.generator::<User>().unwrap();
    assert_eq!(generator.cached(StatementKind::Select), Some("SELECT * FROM Users"));
    assert_eq!(generator.cached(StatementKind::Insert), None);
}

#[tokio::test]
async fn test_shape_described_once_per_registry() {
    let registry = Arc::new(SchemaRegistry::new());
    let before = AUDIT_SHAPE_CALLS.load(Ordering::SeqCst);

    let mut first = Repository::new(RecordingExecutor::default()).with_registry(registry.clone());
    let mut second = Repository::new(RecordingExecutor::default()).with_registry(registry.clone());
    let _: Vec<Audit> = first.select("", "", params![]).await.unwrap();
    let _: Vec<Audit> = first.select("id > @0", "", params![5]).await.unwrap();
    let _: Vec<Audit> = second.paged(0, 10, "", "").await.unwrap();

    assert_eq!(AUDIT_SHAPE_CALLS.load(Ordering::SeqCst) - before, 1);
    assert_eq!(registry.len(), 1);
    assert_eq!(second.executor().last_call().0.lines().nth(1).map(|l| l.contains("[AuditLog]")), Some(true));
}

#[tokio::test]
async fn test_executor_used_directly() {
    let mut executor = RecordingExecutor::returning(user_rows());
    executor.open().await.unwrap();
    let mut rows = executor.execute_query("SELECT * FROM Users").await.unwrap();
    executor.close();

    let mut materializer = tabula_data::Materializer::default();
    let descriptor = tabula_data::SchemaDescriptor::of::<User>().unwrap();
    let first: Option<User> = materializer.materialize_first(&mut rows, &descriptor).unwrap();
    assert_eq!(first.map(|u| u.name), Some("ann".to_string()));
    assert_eq!(rows.remaining(), 2);
}
