use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::MapperConfig;
use crate::entity::Entity;
use crate::error::DataError;
use crate::executor::{CommandExecutor, DbType, Parameter, Session};
use crate::materialize::{AssignmentPolicy, Materializer};
use crate::page::Pageable;
use crate::schema::{SchemaDescriptor, SchemaRegistry};
use crate::statement::{StatementGenerator, StatementOptions};
use crate::value::Value;

/// Entity-level access on top of a [`CommandExecutor`].
///
/// Keeps one [`StatementGenerator`] per entity type, created on first use and
/// reused for the repository's lifetime. Every operation runs inside a
/// [`Session`], so the executor's connection is released when the call
/// returns, fails, or is cancelled.
///
/// # Example
///
/// ```ignore
/// let mut repo = Repository::new(SqliteExecutor::new(pool));
/// let adults: Vec<User> = repo.select("Age >= @0", "Name", params![18]).await?;
/// let second_page: Vec<User> = repo.paged(20, 20, "", "").await?;
/// ```
pub struct Repository<E: CommandExecutor> {
    executor: E,
    registry: Arc<SchemaRegistry>,
    options: StatementOptions,
    generators: HashMap<TypeId, StatementGenerator>,
    materializer: Materializer,
}

impl<E: CommandExecutor> Repository<E> {
    /// Repository with default options and the process-wide schema registry.
    pub fn new(executor: E) -> Self {
        Self::with_config(executor, &MapperConfig::default())
    }

    pub fn with_config(executor: E, config: &MapperConfig) -> Self {
        Self {
            executor,
            registry: SchemaRegistry::global(),
            options: config.statement_options(),
            generators: HashMap::new(),
            materializer: Materializer::new(config.assignment),
        }
    }

    /// Use a private registry instead of the process-wide one.
    pub fn with_registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Options handed to generators created from now on.
    pub fn with_options(mut self, options: StatementOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_policy(mut self, policy: AssignmentPolicy) -> Self {
        self.materializer = Materializer::new(policy);
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Fields left unset by lenient materialization so far.
    pub fn skipped_fields(&self) -> u64 {
        self.materializer.skipped_fields()
    }

    /// The statement generator for `T`, created on first use.
    pub fn generator<T: Entity>(&mut self) -> Result<&mut StatementGenerator, DataError> {
        use std::collections::hash_map::Entry;

        match self.generators.entry(TypeId::of::<T>()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let descriptor = self.registry.describe::<T>()?;
                Ok(entry.insert(StatementGenerator::with_options(
                    descriptor,
                    self.options.clone(),
                )))
            }
        }
    }

    /// Load every `T` matching `filter`, ordered by `order`.
    ///
    /// `filter` and `order` are raw SQL fragments (without `WHERE` / `ORDER BY`)
    /// and are not escaped; refer to `params` as `@0`, `@1`, ...
    pub async fn select<T: Entity>(
        &mut self,
        filter: &str,
        order: &str,
        params: Vec<Value>,
    ) -> Result<Vec<T>, DataError> {
        let generator = self.generator::<T>()?;
        let sql = generator.generate_select(filter, order);
        let descriptor = generator.descriptor().clone();
        self.query(&sql, Parameter::positional(params), &descriptor)
            .await
    }

    /// Same contract as [`select`](Self::select).
    pub async fn fetch<T: Entity>(
        &mut self,
        filter: &str,
        order: &str,
        params: Vec<Value>,
    ) -> Result<Vec<T>, DataError> {
        self.select(filter, order, params).await
    }

    /// Load rows `page_num + 1 ..= page_num + page_size` of the windowed select.
    ///
    /// `page_num` is a row offset. The statement text (including `filter` and
    /// `order`) is fixed by the first paged call for `T` on this repository.
    /// No values are bound besides `@PageNum` and `@PageSize`, so `filter`
    /// must be literal SQL here; use [`paged_with`](Self::paged_with) for a
    /// filter that refers to `@0`, `@1`, ...
    pub async fn paged<T: Entity>(
        &mut self,
        page_num: i32,
        page_size: i32,
        filter: &str,
        order: &str,
    ) -> Result<Vec<T>, DataError> {
        self.paged_with(page_num, page_size, filter, order, Vec::new())
            .await
    }

    /// [`paged`](Self::paged) with positional values for the filter, bound as
    /// `@0`, `@1`, ... next to `@PageNum` and `@PageSize`.
    pub async fn paged_with<T: Entity>(
        &mut self,
        page_num: i32,
        page_size: i32,
        filter: &str,
        order: &str,
        params: Vec<Value>,
    ) -> Result<Vec<T>, DataError> {
        let generator = self.generator::<T>()?;
        let sql = generator.generate_paged(filter, order);
        let descriptor = generator.descriptor().clone();
        let mut bound = vec![
            Parameter::new("PageNum", DbType::Int32, page_num),
            Parameter::new("PageSize", DbType::Int32, page_size),
        ];
        bound.extend(Parameter::positional(params));
        self.query(&sql, bound, &descriptor).await
    }

    /// [`paged`](Self::paged) driven by a [`Pageable`].
    pub async fn page<T: Entity>(&mut self, pageable: &Pageable) -> Result<Vec<T>, DataError> {
        let (page_num, page_size) = pageable.window()?;
        let order = pageable.sort.as_deref().unwrap_or("");
        self.paged(page_num, page_size, "", order).await
    }

    /// Insert `entity`, binding every column as `@<column>`.
    pub async fn insert<T: Entity>(&mut self, entity: &T) -> Result<u64, DataError> {
        let generator = self.generator::<T>()?;
        let sql = generator.generate_insert("");
        let params = column_parameters(generator.descriptor(), entity);
        self.non_query(&sql, params).await
    }

    /// Update the row identified by `entity`'s identity column.
    pub async fn update<T: Entity>(&mut self, entity: &T) -> Result<u64, DataError> {
        let generator = self.generator::<T>()?;
        let sql = generator.generate_update("")?;
        let params = column_parameters(generator.descriptor(), entity);
        self.non_query(&sql, params).await
    }

    /// Delete the row identified by `entity`'s identity column.
    pub async fn delete<T: Entity>(&mut self, entity: &T) -> Result<u64, DataError> {
        let generator = self.generator::<T>()?;
        let sql = generator.generate_delete("")?;
        let params = column_parameters(generator.descriptor(), entity);
        self.non_query(&sql, params).await
    }

    async fn query<T: Entity>(
        &mut self,
        sql: &str,
        params: Vec<Parameter>,
        descriptor: &SchemaDescriptor,
    ) -> Result<Vec<T>, DataError> {
        tracing::debug!(sql, params = params.len(), "executing query");
        let mut session = Session::open(&mut self.executor).await?;
        let mut cursor = session.execute_with_parameters(sql, params).await?;
        self.materializer.materialize_many(&mut cursor, descriptor)
    }

    async fn non_query(&mut self, sql: &str, params: Vec<Parameter>) -> Result<u64, DataError> {
        tracing::debug!(sql, params = params.len(), "executing statement");
        let mut session = Session::open(&mut self.executor).await?;
        session.execute_non_query(sql, params).await
    }
}

/// One inferred parameter per mapped column, named after the column.
fn column_parameters<T: Entity>(descriptor: &SchemaDescriptor, entity: &T) -> Vec<Parameter> {
    entity
        .values()
        .into_iter()
        .filter_map(|(field, value)| {
            descriptor
                .column_of(field)
                .map(|column| Parameter::inferred(column, value))
        })
        .collect()
}
