//! Table file IO: whole-file load and atomic rewrite.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use stockbook_core::OrderNumber;

use super::row::{HEADER, RecordRow};
use crate::fs::{AtomicWriteError, write_atomic};

/// Table store error.
///
/// These are persistence failures; the table file is unchanged whenever one
/// is returned from a write.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("table csv error at {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error(transparent)]
    Persist(#[from] AtomicWriteError),
}

/// One CSV table file.
#[derive(Debug, Clone)]
pub struct TableStore {
    path: PathBuf,
}

impl TableStore {
    /// Open `path`, creating it (header only) when absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self { path: path.into() };
        if !store.path.exists() {
            let dir = crate::fs::parent_dir(&store.path);
            std::fs::create_dir_all(dir).map_err(|source| store.io_err(source))?;
            store.rewrite(&[])?;
            debug!(path = %store.path.display(), "created table file");
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row. Ragged rows are accepted; missing cells read as empty.
    pub fn load(&self) -> Result<Vec<RecordRow>, StoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|source| self.csv_err(source))?;

        reader
            .deserialize::<RecordRow>()
            .map(|row| row.map_err(|source| self.csv_err(source)))
            .collect()
    }

    /// Replace the whole file with `rows`.
    pub fn rewrite(&self, rows: &[RecordRow]) -> Result<(), StoreError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        writer
            .write_record(HEADER)
            .map_err(|source| self.csv_err(source))?;
        for row in rows {
            writer.serialize(row).map_err(|source| self.csv_err(source))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| self.io_err(e.into_error()))?;

        write_atomic(&self.path, &bytes)?;
        Ok(())
    }

    /// Add one row at the end of the table.
    pub fn append(&self, row: RecordRow) -> Result<(), StoreError> {
        let mut rows = self.load()?;
        rows.push(row);
        self.rewrite(&rows)
    }

    /// Read all rows, let `f` edit the one carrying `order_number`, rewrite all.
    ///
    /// Returns `Ok(None)` without writing when no row matches. When `f` fails
    /// nothing is written.
    pub fn mutate<T, E, F>(&self, order_number: &OrderNumber, f: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&mut RecordRow) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut rows = self.load()?;
        let Some(row) = rows.iter_mut().find(|row| row.has_order_number(order_number)) else {
            return Ok(None);
        };
        let out = f(row)?;
        self.rewrite(&rows)?;
        Ok(Some(out))
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_err(&self, source: csv::Error) -> StoreError {
        StoreError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(order: &str, product: &str) -> RecordRow {
        RecordRow {
            order_number: order.to_string(),
            product: product.to_string(),
            total_quantity: "3".to_string(),
            ..RecordRow::default()
        }
    }

    fn order(text: &str) -> OrderNumber {
        text.parse().unwrap()
    }

    #[test]
    fn open_creates_header_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::open(dir.path().join("nested").join("default.csv")).unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text.trim_end(), HEADER.join(","));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn rows_survive_rewrite_including_separators_in_text() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::open(dir.path().join("default.csv")).unwrap();
        let mut tricky = row("1", "Widget, large");
        tricky.note = "said \"hi\"\nthen left".to_string();

        store.rewrite(&[tricky.clone(), row("2", "Gadget")]).unwrap();

        assert_eq!(store.load().unwrap(), vec![tricky, row("2", "Gadget")]);
    }

    #[test]
    fn legacy_file_with_fewer_columns_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.csv");
        std::fs::write(&path, "单号,商品名称,商品数量\n42,ProductA,7\n").unwrap();

        let rows = TableStore::open(&path).unwrap().load().unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product, "ProductA");
        assert_eq!(rows[0].remaining_quantity, "");
    }

    #[test]
    fn mutate_writes_only_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::open(dir.path().join("default.csv")).unwrap();
        store.append(row("1", "A")).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let failed: Result<Option<()>, StoreError> = store.mutate(&order("1"), |r| {
            r.product = "B".to_string();
            Err(StoreError::Io {
                path: PathBuf::new(),
                source: io::Error::other("refused"),
            })
        });
        assert!(failed.is_err());
        assert_eq!(std::fs::read(store.path()).unwrap(), before);

        let missing: Option<()> = store
            .mutate(&order("9"), |_| Ok::<_, StoreError>(()))
            .unwrap();
        assert!(missing.is_none());

        store
            .mutate(&order("1"), |r| {
                r.product = "B".to_string();
                Ok::<_, StoreError>(())
            })
            .unwrap();
        assert_eq!(store.load().unwrap()[0].product, "B");
    }
}
