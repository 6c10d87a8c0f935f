use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};

use crate::error::PipelineError;

/// A nullable cell. Empty TSV fields read as `None` and are written back empty.
pub type Cell = Option<String>;

/// Ordered table of named columns, each row holding one cell per column.
#[derive(Debug, Clone, Default)]
pub struct Table {
    label: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns && self.rows == other.rows
    }
}

impl Eq for Table {}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: "table".to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Name used in error messages.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), PipelineError> {
        if row.len() != self.columns.len() {
            return Err(PipelineError::MalformedTable(format!(
                "{}: row has {} cells, expected {}",
                self.label,
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, PipelineError> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::MissingColumn {
                table: self.label.clone(),
                column: name.to_string(),
            })
    }

    pub fn require_columns(&self, names: &[&str]) -> Result<(), PipelineError> {
        for name in names {
            self.require_column(name)?;
        }
        Ok(())
    }

    /// Cell at `row` in column `column`; `None` for nulls and unknown columns.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }

    /// Indices of rows whose `column` equals `value`.
    pub fn find_rows(&self, column: &str, value: &str) -> Result<Vec<usize>, PipelineError> {
        let index = self.require_column(column)?;
        Ok(self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row[index].as_deref() == Some(value))
            .map(|(position, _)| position)
            .collect())
    }

    /// Renames columns in place. Every source column must exist.
    pub fn rename_columns(&mut self, renames: &[(&str, &str)]) -> Result<(), PipelineError> {
        self.require_columns(&renames.iter().map(|(from, _)| *from).collect::<Vec<_>>())?;
        for (from, to) in renames {
            if let Some(index) = self.column_index(from) {
                self.columns[index] = (*to).to_string();
            }
        }
        Ok(())
    }

    /// Splits `source` on the first `separator`: the head stays in `source`,
    /// the tail goes to `target` (appended if absent). No separator yields a
    /// null tail.
    pub fn split_column(
        &mut self,
        source: &str,
        target: &str,
        separator: char,
    ) -> Result<(), PipelineError> {
        let source_index = self.require_column(source)?;
        let target_index = self.ensure_column(target);
        for row in &mut self.rows {
            let (head, tail) = match row[source_index].take() {
                Some(value) => match value.split_once(separator) {
                    Some((head, tail)) => (non_empty(head.trim()), non_empty(tail.trim())),
                    None => (non_empty(value.trim()), None),
                },
                None => (None, None),
            };
            row[source_index] = head;
            row[target_index] = tail;
        }
        Ok(())
    }

    /// Computes `target` from `source` row by row, replacing or appending it.
    pub fn derive_column<F>(&mut self, source: &str, target: &str, f: F) -> Result<(), PipelineError>
    where
        F: Fn(Option<&str>) -> Cell,
    {
        let source_index = self.require_column(source)?;
        let target_index = self.ensure_column(target);
        for row in &mut self.rows {
            row[target_index] = f(row[source_index].as_deref());
        }
        Ok(())
    }

    /// Inner join on `key`. Keeps left row order, emits every pairing for
    /// repeated keys, and suffixes clashing non-key columns with `_x`/`_y`.
    /// Null keys never match.
    pub fn inner_join(&self, right: &Table, key: &str) -> Result<Table, PipelineError> {
        let left_key = self.require_column(key)?;
        let right_key = right.require_column(key)?;

        let mut right_index: HashMap<&str, Vec<usize>> = HashMap::new();
        for (position, row) in right.rows.iter().enumerate() {
            if let Some(value) = row[right_key].as_deref() {
                right_index.entry(value).or_default().push(position);
            }
        }

        let right_columns: Vec<usize> = (0..right.columns.len())
            .filter(|index| *index != right_key)
            .collect();

        let mut columns = Vec::with_capacity(self.columns.len() + right_columns.len());
        for (index, name) in self.columns.iter().enumerate() {
            let clashes = index != left_key && right_columns.iter().any(|r| right.columns[*r] == *name);
            columns.push(if clashes {
                format!("{name}_x")
            } else {
                name.clone()
            });
        }
        for index in &right_columns {
            let name = &right.columns[*index];
            let clashes = self
                .columns
                .iter()
                .enumerate()
                .any(|(l, column)| l != left_key && column == name);
            columns.push(if clashes {
                format!("{name}_y")
            } else {
                name.clone()
            });
        }

        let mut joined = Table::new(columns).with_label(format!("{} joined with {}", self.label, right.label));
        for left_row in &self.rows {
            let Some(value) = left_row[left_key].as_deref() else {
                continue;
            };
            let Some(matches) = right_index.get(value) else {
                continue;
            };
            for position in matches {
                let right_row = &right.rows[*position];
                let mut row = left_row.clone();
                row.extend(right_columns.iter().map(|index| right_row[*index].clone()));
                joined.rows.push(row);
            }
        }
        Ok(joined)
    }

    pub fn from_tsv_reader<R: Read>(reader: R) -> Result<Self, PipelineError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(reader);
        let headers = reader
            .headers()
            .map_err(|err| PipelineError::MalformedTable(err.to_string()))?;
        if headers.is_empty() || headers.iter().all(str::is_empty) {
            return Err(PipelineError::MalformedTable("missing header row".to_string()));
        }
        let mut table = Table::new(headers.iter());
        for record in reader.records() {
            let record = record.map_err(|err| PipelineError::MalformedTable(err.to_string()))?;
            table.push_row(record.iter().map(non_empty).collect())?;
        }
        Ok(table)
    }

    pub fn from_tsv_str(content: &str) -> Result<Self, PipelineError> {
        Self::from_tsv_reader(content.as_bytes())
    }

    pub fn read_tsv(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path)
            .map_err(|err| PipelineError::Filesystem(format!("open {}: {err}", path.display())))?;
        Ok(Self::from_tsv_reader(file)?.with_label(path.display().to_string()))
    }

    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<(), PipelineError> {
        let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(writer);
        writer
            .write_record(&self.columns)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
                .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| PipelineError::Filesystem(err.to_string()))
    }

    pub fn to_tsv_bytes(&self) -> Result<Vec<u8>, PipelineError> {
        let mut buffer = Vec::new();
        self.write_tsv(&mut buffer)?;
        Ok(buffer)
    }

    fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column_index(name) {
            return index;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(None);
        }
        self.columns.len() - 1
    }
}

fn non_empty(value: &str) -> Cell {
    (!value.is_empty()).then(|| value.to_string())
}
