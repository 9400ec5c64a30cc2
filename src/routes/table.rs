//! Registry of mounted routes, printed at startup.

use crate::error::ConfigError;
use axum::http::Method;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: Method,
    pub path: String,
}

#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        RouteTable::default()
    }

    /// Record a route. The same method and path twice is a configuration error.
    pub fn record(&mut self, method: Method, path: impl Into<String>) -> Result<(), ConfigError> {
        let path = path.into();
        if self.entries.iter().any(|e| e.method == method && e.path == path) {
            return Err(ConfigError::DuplicateRoute {
                method: method.to_string(),
                path,
            });
        }
        self.entries.push(RouteEntry { method, path });
        Ok(())
    }

    /// Merge `other`, prefixing each of its paths.
    pub fn extend_prefixed(&mut self, prefix: &str, other: RouteTable) -> Result<(), ConfigError> {
        for e in other.entries {
            let path = if e.path == "/" && !prefix.is_empty() {
                prefix.to_string()
            } else {
                format!("{}{}", prefix, e.path)
            };
            self.record(e.method, path)?;
        }
        Ok(())
    }

    pub fn contains(&self, method: &Method, path: &str) -> bool {
        self.entries.iter().any(|e| &e.method == method && e.path == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by path, then method.
    pub fn sorted(&self) -> Vec<&RouteEntry> {
        let mut v: Vec<&RouteEntry> = self.entries.iter().collect();
        v.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.method.as_str().cmp(b.method.as_str())));
        v
    }

    pub fn log(&self) {
        for line in self.to_string().lines() {
            tracing::info!("{}", line);
        }
    }
}

impl fmt::Display for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sorted = self.sorted();
        let width = sorted
            .iter()
            .map(|e| e.method.as_str().len())
            .chain(std::iter::once("METHOD".len()))
            .max()
            .unwrap_or(6);
        writeln!(f, "{:<width$}  PATH", "METHOD", width = width)?;
        for e in sorted {
            writeln!(f, "{:<width$}  {}", e.method.as_str(), e.path, width = width)?;
        }
        Ok(())
    }
}
