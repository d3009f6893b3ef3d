//! Table access for the masters and research tables
//!
//! `ResearchStore` is the seam between the KPI logic and wherever the two
//! tables live. Column lookup by header name and the cell coercions shared by
//! every backend are here as well.

use crate::config::ColumnMap;
use crate::error::{KpiError, Result};
use crate::records::{PublicationKey, PublicationRecord, StaffRecord, coerce_f64, coerce_year};

/// Read and write access to the two tables
pub trait ResearchStore: Send {
    fn load_staff(&self) -> Result<Vec<StaffRecord>>;

    fn load_publications(&self) -> Result<Vec<PublicationRecord>>;

    /// Append rows at the end of the research table, in order
    fn append_publications(&mut self, rows: &[PublicationRecord]) -> Result<()>;

    /// Remove every row matching `key` and return how many went
    fn delete_publications(&mut self, key: &PublicationKey) -> Result<usize>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

impl<S: ResearchStore + ?Sized> ResearchStore for Box<S> {
    fn load_staff(&self) -> Result<Vec<StaffRecord>> {
        (**self).load_staff()
    }

    fn load_publications(&self) -> Result<Vec<PublicationRecord>> {
        (**self).load_publications()
    }

    fn append_publications(&mut self, rows: &[PublicationRecord]) -> Result<()> {
        (**self).append_publications(rows)
    }

    fn delete_publications(&mut self, key: &PublicationKey) -> Result<usize> {
        (**self).delete_publications(key)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Remove the rows selected by `pred`, highest index first so earlier
/// positions stay valid while deleting.
pub fn remove_matching<T>(rows: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> usize {
    let mut indices: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| pred(row))
        .map(|(i, _)| i)
        .collect();
    indices.sort_unstable_by(|a, b| b.cmp(a));

    for &i in &indices {
        rows.remove(i);
    }
    indices.len()
}

/// Tables held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub staff: Vec<StaffRecord>,
    pub publications: Vec<PublicationRecord>,
}

impl MemoryStore {
    pub fn new(staff: Vec<StaffRecord>, publications: Vec<PublicationRecord>) -> Self {
        MemoryStore {
            staff,
            publications,
        }
    }
}

impl ResearchStore for MemoryStore {
    fn load_staff(&self) -> Result<Vec<StaffRecord>> {
        Ok(self.staff.clone())
    }

    fn load_publications(&self) -> Result<Vec<PublicationRecord>> {
        Ok(self.publications.clone())
    }

    fn append_publications(&mut self, rows: &[PublicationRecord]) -> Result<()> {
        self.publications.extend_from_slice(rows);
        Ok(())
    }

    fn delete_publications(&mut self, key: &PublicationKey) -> Result<usize> {
        Ok(remove_matching(&mut self.publications, |r| key.matches(r)))
    }

    fn describe(&self) -> String {
        format!(
            "memory ({} staff, {} research rows)",
            self.staff.len(),
            self.publications.len()
        )
    }
}

/// A single sheet cell, independent of the workbook library
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            CellValue::Number(n) => n.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }
}

/// Trimmed header texts of a table's first row
pub fn header_names(header: &[CellValue]) -> Vec<String> {
    header.iter().map(|c| c.as_text().trim().to_string()).collect()
}

fn find_column(table: &str, headers: &[String], column: &str) -> Result<usize> {
    let column = column.trim();
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| KpiError::SchemaMismatch {
            table: table.to_string(),
            column: column.to_string(),
        })
}

fn cell_text(row: &[CellValue], idx: usize) -> String {
    row.get(idx).map(CellValue::as_text).unwrap_or_default()
}

/// Positions of the masters columns within a header row
#[derive(Debug, Clone, Copy)]
pub struct StaffColumns {
    name: usize,
    program: usize,
    faculty: usize,
}

impl StaffColumns {
    pub fn resolve(table: &str, headers: &[String], map: &ColumnMap) -> Result<Self> {
        Ok(StaffColumns {
            name: find_column(table, headers, &map.staff_name)?,
            program: find_column(table, headers, &map.staff_program)?,
            faculty: find_column(table, headers, &map.staff_faculty)?,
        })
    }

    /// Rows with a blank name are skipped
    pub fn read(&self, row: &[CellValue]) -> Option<StaffRecord> {
        let name = cell_text(row, self.name);
        if name.trim().is_empty() {
            return None;
        }
        Some(StaffRecord::create(
            &name,
            &cell_text(row, self.program),
            &cell_text(row, self.faculty),
        ))
    }
}

/// Positions of the research columns within a header row
#[derive(Debug, Clone, Copy)]
pub struct ResearchColumns {
    title: usize,
    year: usize,
    journal_tier: usize,
    score: usize,
    author: usize,
    external_author: Option<usize>,
}

impl ResearchColumns {
    pub fn resolve(table: &str, headers: &[String], map: &ColumnMap) -> Result<Self> {
        Ok(ResearchColumns {
            title: find_column(table, headers, &map.title)?,
            year: find_column(table, headers, &map.year)?,
            journal_tier: find_column(table, headers, &map.journal_tier)?,
            score: find_column(table, headers, &map.score)?,
            author: find_column(table, headers, &map.author)?,
            external_author: find_column(table, headers, &map.external_author).ok(),
        })
    }

    /// Fully blank rows are skipped; unreadable numbers become zero
    pub fn read(&self, row: &[CellValue]) -> Option<PublicationRecord> {
        if row.iter().all(CellValue::is_blank) {
            return None;
        }
        let external = self
            .external_author
            .map(|i| cell_text(row, i).trim().to_string())
            .filter(|s| !s.is_empty());

        Some(PublicationRecord {
            title: cell_text(row, self.title).trim().to_string(),
            year: coerce_year(&cell_text(row, self.year)),
            journal_tier: cell_text(row, self.journal_tier).trim().to_string(),
            score: coerce_f64(&cell_text(row, self.score)),
            author_name: cell_text(row, self.author).trim().to_string(),
            external_author: external,
        })
    }

    /// Lay a record out in header order; `width` is the header length
    pub fn write(
        &self,
        table: &str,
        record: &PublicationRecord,
        width: usize,
        map: &ColumnMap,
    ) -> Result<Vec<CellValue>> {
        let mut row = vec![CellValue::Empty; width];
        row[self.title] = CellValue::Text(record.title.clone());
        row[self.year] = CellValue::Number(record.year as f64);
        row[self.journal_tier] = CellValue::Text(record.journal_tier.clone());
        row[self.score] = CellValue::Number(record.score);
        row[self.author] = CellValue::Text(record.author_name.clone());

        if let Some(external) = &record.external_author {
            let idx = self.external_author.ok_or_else(|| KpiError::SchemaMismatch {
                table: table.to_string(),
                column: map.external_author.clone(),
            })?;
            row[idx] = CellValue::Text(external.clone());
        }
        Ok(row)
    }
}
