use crate::attr::{AttrKind, AttrValue, AttributeType};
use crate::core::{DbError, Result};
use std::collections::HashMap;

/// Name of the primary-key attribute every store carries.
pub const ID_COLUMN: &str = "id";

/// One named, typed, change-tracked value owned by a model.
#[derive(Debug, Clone)]
struct AttrCell {
    value: AttrValue,
    modified: bool,
}

/// Declaration-ordered attribute map of a single model instance.
///
/// Every store starts with the primary-key attribute `id` (u64, 0) already
/// declared; the cell type is fixed at declaration time and all typed access
/// is checked against it. The store itself never touches the database.
#[derive(Debug, Clone)]
pub struct AttributeStore {
    cells: HashMap<String, AttrCell>,
    columns: Vec<String>,
}

impl AttributeStore {
    pub fn new() -> Self {
        // primary key is always present, see ID_COLUMN
        let mut cells = HashMap::new();
        cells.insert(
            ID_COLUMN.to_string(),
            AttrCell {
                value: 0u64.into_attr(),
                modified: false,
            },
        );
        Self {
            cells,
            columns: vec![ID_COLUMN.to_string()],
        }
    }

    /// Declares a new attribute with its default value, appended in
    /// declaration order.
    pub fn declare<T: AttributeType>(&mut self, name: &str, default: T) -> Result<()> {
        if self.cells.contains_key(name) {
            return Err(DbError::DuplicateAttribute(name.to_string()));
        }

        self.cells.insert(
            name.to_string(),
            AttrCell {
                value: default.into_attr(),
                modified: false,
            },
        );
        self.columns.push(name.to_string());
        Ok(())
    }

    /// Removes a declared attribute. The primary key cannot be removed.
    pub fn undeclare(&mut self, name: &str) -> Result<()> {
        if name == ID_COLUMN {
            return Err(DbError::Schema(format!(
                "the '{ID_COLUMN}' attribute cannot be removed"
            )));
        }
        if self.cells.remove(name).is_none() {
            return Err(DbError::UnknownAttribute(name.to_string()));
        }
        self.columns.retain(|column| column != name);
        Ok(())
    }

    /// Read-only typed access to an attribute value.
    pub fn get<T: AttributeType>(&self, name: &str) -> Result<&T> {
        let cell = self
            .cells
            .get(name)
            .ok_or_else(|| DbError::UnknownAttribute(name.to_string()))?;

        T::from_attr(&cell.value).ok_or_else(|| {
            DbError::TypeMismatch(format!(
                "attribute '{}' holds {}, requested {}",
                name,
                cell.value.kind(),
                T::KIND
            ))
        })
    }

    /// Overwrites an attribute value and marks the cell as modified.
    pub fn set<T: AttributeType>(&mut self, name: &str, value: T) -> Result<()> {
        let cell = self
            .cells
            .get_mut(name)
            .ok_or_else(|| DbError::UnknownAttribute(name.to_string()))?;

        if cell.value.kind() != T::KIND {
            return Err(DbError::TypeMismatch(format!(
                "attribute '{}' holds {}, assigned {}",
                name,
                cell.value.kind(),
                T::KIND
            )));
        }

        cell.value = value.into_attr();
        cell.modified = true;
        Ok(())
    }

    /// Raw view of an attribute payload.
    pub fn value(&self, name: &str) -> Option<&AttrValue> {
        self.cells.get(name).map(|cell| &cell.value)
    }

    /// Raw mutable access for row decoding; does not touch the modified flag.
    pub(crate) fn value_mut(&mut self, name: &str) -> Option<&mut AttrValue> {
        self.cells.get_mut(name).map(|cell| &mut cell.value)
    }

    pub fn kind_of(&self, name: &str) -> Option<AttrKind> {
        self.cells.get(name).map(|cell| cell.value.kind())
    }

    /// Attribute names in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Names of attributes modified since the last load or save, in
    /// declaration order. Restartable; call again for a fresh pass.
    pub fn changed_names(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|name| self.cells.get(name.as_str()).is_some_and(|cell| cell.modified))
            .map(String::as_str)
    }

    pub fn has_changes(&self) -> bool {
        self.cells.values().any(|cell| cell.modified)
    }

    /// Clears all modified flags, called after a successful load or save.
    pub fn reset_modified(&mut self) {
        for cell in self.cells.values_mut() {
            cell.modified = false;
        }
    }

    /// True when any attribute besides the primary key is declared.
    pub fn has_persistable_attributes(&self) -> bool {
        self.columns.iter().any(|name| name != ID_COLUMN)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Default for AttributeStore {
    fn default() -> Self {
        Self::new()
    }
}
