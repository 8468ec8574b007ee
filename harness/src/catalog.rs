//! Column catalogs.
//!
//! A `TypeCatalog` collects the ordered (name, type) declarations for one
//! device and freezes them into a `ColumnSchema`. Column order is the
//! positional contract used to zip fixture fields to columns; lookups are
//! by position.

use std::fmt;
use std::sync::Arc;

use crate::types::SemanticType;

/// One declared column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: SemanticType,
}

/// Errors returned while declaring columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The column name was empty.
    EmptyName,
    /// A column with this name was already declared.
    DuplicateColumn(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "column name must not be empty"),
            Self::DuplicateColumn(name) => write!(f, "column '{name}' declared twice"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Write-once registry of column declarations.
#[derive(Debug, Default)]
pub struct TypeCatalog {
    columns: Vec<ColumnDef>,
}

impl TypeCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column declaration.
    pub fn define(&mut self, name: &str, ty: SemanticType) -> Result<&mut Self, CatalogError> {
        if name.is_empty() {
            return Err(CatalogError::EmptyName);
        }
        if self.columns.iter().any(|c| c.name == name) {
            return Err(CatalogError::DuplicateColumn(name.to_string()));
        }
        self.columns.push(ColumnDef {
            name: name.to_string(),
            ty,
        });
        Ok(self)
    }

    /// The declarations so far, in insertion order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Freeze the catalog.
    #[must_use]
    pub fn build(self) -> ColumnSchema {
        ColumnSchema {
            columns: Arc::from(self.columns),
        }
    }
}

/// An immutable, ordered column schema.
///
/// Cloning is cheap; clones share the same declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Arc<[ColumnDef]>,
}

impl ColumnSchema {
    /// Build a schema from (name, type) pairs.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, SemanticType)>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = TypeCatalog::new();
        for (name, ty) in pairs {
            catalog.define(name, ty)?;
        }
        Ok(catalog.build())
    }

    /// A one-column schema.
    #[must_use]
    pub fn single(name: &str, ty: SemanticType) -> Self {
        Self {
            columns: Arc::from(vec![ColumnDef {
                name: name.to_string(),
                ty,
            }]),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, index: usize) -> Option<&ColumnDef> {
        self.columns.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn types(&self) -> impl Iterator<Item = SemanticType> + '_ {
        self.columns.iter().map(|c| c.ty)
    }
}
