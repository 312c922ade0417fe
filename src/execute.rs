//! Query execution pipeline.
//!
//! Ties the subsystem together: the condition compiler normalizes the
//! query's filter, the MDX builder emits statement text, the protocol
//! client executes it, and the result parser streams the response into
//! a tabular result, consulting the member cache for omitted ancestor
//! levels. Discovery is the separate, simpler path feeding both name
//! resolution and the cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::cache::{CacheScope, LevelEntry, MemberCache};
use crate::config::DataSource;
use crate::mdx::{build_drillthrough, Dialect, MdxBuilder};
use crate::model::{Cube, DataType, Level, Value};
use crate::query::CubeQuery;
use crate::result::{Cell, Column, TabularResult};
use crate::xmla::discover::{parse_rowset, Discovery};
use crate::xmla::parser::ResultParser;
use crate::xmla::{CancelToken, CredentialSource, XmlaClient, XmlaError, XmlaResult};

/// The downstream entry point: execute queries, discover metadata,
/// cancel in-flight work.
///
/// Holds one protocol client and the injected member cache; cube
/// metadata is discovered once per instance and memoized for name
/// resolution.
pub struct QueryExecutor {
    client: XmlaClient,
    cache: Arc<MemberCache>,
    dialect: Dialect,
    datasource: DataSource,
    cubes: Mutex<Option<Vec<Cube>>>,
}

impl QueryExecutor {
    pub fn new(
        datasource: DataSource,
        cache: Arc<MemberCache>,
        credentials: Arc<dyn CredentialSource>,
    ) -> XmlaResult<Self> {
        let client = XmlaClient::new(&datasource, credentials)?;
        Ok(Self {
            client,
            cache,
            dialect: Dialect::default(),
            datasource,
            cubes: Mutex::new(None),
        })
    }

    /// Compile statements for a specific dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn client(&self) -> &XmlaClient {
        &self.client
    }

    /// Discover the data source's cubes, refreshing the memo.
    pub fn discover_cubes(&self) -> XmlaResult<Vec<Cube>> {
        let cubes = Discovery::new(&self.client, self.datasource.cube_type).cubes()?;
        *self.cubes.lock().expect("cube memo poisoned") = Some(cubes.clone());
        Ok(cubes)
    }

    /// Execute one query end to end.
    pub fn execute(&self, query: &CubeQuery, token: &CancelToken) -> XmlaResult<TabularResult> {
        if token.is_cancelled() {
            return Err(XmlaError::Cancelled);
        }
        let cube = self.find_cube(&query.cube)?;
        let statement = MdxBuilder::new(query, self.dialect).build()?;
        tracing::debug!(statement = %statement.text, "executing");

        let body = self.client.execute(&statement.text, token)?;

        let scope = self.scope(&cube.name);
        let parser = ResultParser::new(
            query,
            &statement,
            &cube,
            Some((self.cache.as_ref(), scope.clone())),
        );
        let parsed = parser.parse(&body, token)?;

        // Commit harvested member lists only for an uncancelled
        // request; a cancelled stream must not leave partial entries.
        if token.is_cancelled() {
            return Err(XmlaError::Cancelled);
        }
        for level in parsed.levels {
            self.merge_level(&scope, level)?;
        }

        Ok(parsed.table)
    }

    /// Execute the drillthrough statements behind a query's filter,
    /// one tabular rowset per concrete value combination.
    pub fn drillthrough(
        &self,
        query: &CubeQuery,
        token: &CancelToken,
    ) -> XmlaResult<Vec<TabularResult>> {
        let statements = build_drillthrough(query)?;
        let mut results = Vec::with_capacity(statements.len());
        for statement in &statements {
            let body = self.client.execute(statement, token)?;
            results.push(rowset_to_table(parse_rowset(&body)?));
        }
        Ok(results)
    }

    /// Mark a token cancelled and attempt the server-side cancel when a
    /// request is already on the wire.
    pub fn cancel(&self, token: &CancelToken) {
        self.client.cancel(token);
    }

    /// Fetch a level's member list into the cache if absent, returning
    /// the cached entry. Entries are created lazily on first request.
    pub fn ensure_level_cached(&self, cube: &Cube, level: &Level) -> XmlaResult<LevelEntry> {
        let scope = self.scope(&cube.name);
        let key = scope.key(&level.unique_name);
        if let Some(entry) = self.cache.get(&key)? {
            return Ok(entry);
        }
        let entry = Discovery::new(&self.client, self.datasource.cube_type)
            .members(&cube.name, level)?;
        self.cache.put(&key, entry.clone())?;
        Ok(entry)
    }

    /// Flush every cache entry of this data source; called when its
    /// schema changes.
    pub fn invalidate_cache(&self) -> XmlaResult<usize> {
        let scope = CacheScope::new(self.datasource.name.clone(), String::new());
        Ok(self.cache.invalidate_datasource(&scope)?)
    }

    fn scope(&self, cube_name: &str) -> CacheScope {
        let mut scope = CacheScope::new(self.datasource.name.clone(), cube_name.to_string());
        if let Some(principal) = self.client.principal() {
            scope = scope.for_principal(principal.to_string());
        }
        scope
    }

    /// Merge a harvested level entry into the cache, keeping members
    /// already recorded there.
    fn merge_level(&self, scope: &CacheScope, mut incoming: LevelEntry) -> XmlaResult<()> {
        let key = scope.key(&incoming.level_unique_name);
        if let Some(existing) = self.cache.get(&key)? {
            for member in existing.members {
                if incoming.member(&member.unique_name).is_none() {
                    incoming.members.push(member);
                }
            }
        }
        self.cache.put(&key, incoming)?;
        Ok(())
    }

    /// Resolve a cube by name, caption, or alias from the memoized
    /// discovery, discovering on first use.
    fn find_cube(&self, alias: &str) -> XmlaResult<Cube> {
        {
            let memo = self.cubes.lock().expect("cube memo poisoned");
            if let Some(cubes) = memo.as_ref() {
                if let Some(cube) = cubes.iter().find(|c| c.matches_alias(alias)) {
                    return Ok(cube.clone());
                }
                return Err(XmlaError::UnknownCube(alias.to_string()));
            }
        }
        let cubes = self.discover_cubes()?;
        cubes
            .into_iter()
            .find(|c| c.matches_alias(alias))
            .ok_or_else(|| XmlaError::UnknownCube(alias.to_string()))
    }
}

/// Convert a tabular discover rowset into a result table, columns
/// sorted by name.
fn rowset_to_table(rows: Vec<HashMap<String, String>>) -> TabularResult {
    let mut columns: Vec<Column> = Vec::new();
    for row in &rows {
        for name in row.keys() {
            if !columns.iter().any(|c| &c.name == name) {
                columns.push(Column::new(name.clone(), DataType::String));
            }
        }
    }
    columns.sort_by(|a, b| a.name.cmp(&b.name));

    let table_rows = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| match row.get(&c.name) {
                    Some(v) => Cell::Value(Value::String(v.clone())),
                    None => Cell::Value(Value::Null),
                })
                .collect()
        })
        .collect();

    TabularResult {
        columns,
        rows: table_rows,
    }
}
