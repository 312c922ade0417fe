//! Cache key construction.

/// Scope a level cache entry is keyed under: the requesting principal
/// (only when row-level security salts the cache), the data source, and
/// the cube.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheScope {
    pub principal: Option<String>,
    pub datasource: String,
    pub cube: String,
}

impl CacheScope {
    pub fn new(datasource: impl Into<String>, cube: impl Into<String>) -> Self {
        Self {
            principal: None,
            datasource: datasource.into(),
            cube: cube.into(),
        }
    }

    /// Scope salted by the requesting principal.
    pub fn for_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    /// The full key for one level's entry.
    ///
    /// A pure function of its inputs: the same scope and level always
    /// produce the same key string.
    pub fn key(&self, level_unique_name: &str) -> String {
        let mut raw = String::new();
        if let Some(p) = &self.principal {
            raw.push_str(p);
            raw.push_str("___");
        }
        raw.push_str(&self.datasource);
        raw.push_str("___");
        raw.push_str(&self.cube);
        raw.push_str("___");
        raw.push_str(level_unique_name);
        normalize(&raw)
    }

    /// Prefix shared by every key of this scope's data source; the unit
    /// of invalidation.
    pub fn datasource_prefix(&self) -> String {
        let mut raw = String::new();
        if let Some(p) = &self.principal {
            raw.push_str(p);
            raw.push_str("___");
        }
        raw.push_str(&self.datasource);
        raw.push_str("___");
        normalize(&raw)
    }
}

/// Fold a raw key into a stable, storage-safe form: lowercased, with
/// path-hostile characters replaced.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}
