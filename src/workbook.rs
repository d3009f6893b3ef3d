//! `.xlsx` storage for the masters and research tables

use crate::config::{ColumnMap, StoreSettings};
use crate::error::{KpiError, Result};
use crate::records::{PublicationKey, PublicationRecord, StaffRecord};
use crate::store::{
    CellValue, ResearchColumns, ResearchStore, StaffColumns, header_names, remove_matching,
};
use calamine::{Data, Reader, Xlsx, open_workbook};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::{Path, PathBuf};

type Grid = Vec<Vec<CellValue>>;

/// The two tables kept as worksheets of one `.xlsx` file
///
/// Reads go through calamine. The xlsx writer cannot edit in place, so a
/// write reads every worksheet, changes the research grid and saves the whole
/// workbook to a sibling file that then replaces the original. Cell values
/// of other worksheets survive; formatting does not.
#[derive(Debug, Clone)]
pub struct WorkbookStore {
    path: PathBuf,
    staff_sheet: String,
    research_sheet: String,
    columns: ColumnMap,
}

impl WorkbookStore {
    /// Points a store at the configured workbook without touching the file.
    pub fn new(settings: &StoreSettings) -> Self {
        WorkbookStore {
            path: settings.workbook.clone(),
            staff_sheet: settings.staff_sheet.clone(),
            research_sheet: settings.research_sheet.clone(),
            columns: settings.columns.clone(),
        }
    }

    /// Like `new`, but fails early when the file or a worksheet is missing
    ///
    /// # Arguments
    /// * `settings` - Workbook path, sheet names and column headers
    ///
    /// # Returns
    /// * `Result<WorkbookStore>` - The store, or `Connectivity` naming the missing
    ///   file or worksheet
    pub fn open(settings: &StoreSettings) -> Result<Self> {
        let store = Self::new(settings);
        let names = store.open_reader()?.sheet_names();
        for sheet in [&store.staff_sheet, &store.research_sheet] {
            if !names.iter().any(|n| n == sheet) {
                return Err(KpiError::Connectivity(format!(
                    "worksheet `{}` not found in {}",
                    sheet,
                    store.path.display()
                )));
            }
        }
        Ok(store)
    }

    /// Write a fresh workbook holding the roster and an empty research table
    ///
    /// # Arguments
    /// * `settings` - Where to write and which sheet and header names to use
    /// * `staff` - Roster rows for the masters sheet
    ///
    /// # Returns
    /// * `Result<WorkbookStore>` - The new store, or `Validation` when the file
    ///   already exists
    pub fn initialize(settings: &StoreSettings, staff: &[StaffRecord]) -> Result<Self> {
        let store = Self::new(settings);
        if store.path.exists() {
            return Err(KpiError::Validation(format!(
                "{} already exists",
                store.path.display()
            )));
        }

        let map = &store.columns;
        let mut staff_grid: Grid = vec![text_row(&[
            map.staff_name.as_str(),
            map.staff_program.as_str(),
            map.staff_faculty.as_str(),
        ])];
        for s in staff {
            staff_grid.push(text_row(&[
                s.name.as_str(),
                s.program.as_str(),
                s.faculty.as_str(),
            ]));
        }
        let research_grid: Grid = vec![text_row(&[
            map.title.as_str(),
            map.year.as_str(),
            map.journal_tier.as_str(),
            map.score.as_str(),
            map.author.as_str(),
            map.external_author.as_str(),
        ])];

        store.save(&[
            (store.staff_sheet.clone(), staff_grid),
            (store.research_sheet.clone(), research_grid),
        ])?;
        log::info!("Initialized workbook {}", store.path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_reader(&self) -> Result<Xlsx<std::io::BufReader<std::fs::File>>> {
        open_workbook(&self.path).map_err(|e| {
            KpiError::Connectivity(format!("cannot open {}: {}", self.path.display(), e))
        })
    }

    fn read_sheet(&self, name: &str) -> Result<Grid> {
        let mut workbook = self.open_reader()?;
        read_grid(&mut workbook, name)
    }

    fn read_all(&self) -> Result<Vec<(String, Grid)>> {
        let mut workbook = self.open_reader()?;
        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let grid = read_grid(&mut workbook, &name)?;
            sheets.push((name, grid));
        }
        Ok(sheets)
    }

    fn save(&self, sheets: &[(String, Grid)]) -> Result<()> {
        let mut workbook = Workbook::new();
        for (name, grid) in sheets {
            let mut worksheet = Worksheet::new();
            worksheet.set_name(name.as_str()).map_err(write_err)?;
            for (r, row) in grid.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    match cell {
                        CellValue::Empty => {}
                        CellValue::Text(s) => {
                            worksheet
                                .write_string(r as u32, c as u16, s.as_str())
                                .map_err(write_err)?;
                        }
                        CellValue::Number(n) => {
                            worksheet
                                .write_number(r as u32, c as u16, *n)
                                .map_err(write_err)?;
                        }
                    }
                }
            }
            workbook.push_worksheet(worksheet);
        }

        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("workbook.xlsx");
        let staging = self.path.with_file_name(format!(".{}.tmp", file_name));
        workbook.save(&staging).map_err(write_err)?;
        std::fs::rename(&staging, &self.path).map_err(|e| {
            KpiError::Connectivity(format!("cannot replace {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }

    /// Read-modify-write of the research worksheet
    fn update_research<T>(
        &self,
        change: impl FnOnce(&ResearchColumns, usize, &mut Grid) -> Result<T>,
    ) -> Result<T> {
        let mut sheets = self.read_all()?;
        let (_, grid) = sheets
            .iter_mut()
            .find(|(name, _)| name == &self.research_sheet)
            .ok_or_else(|| {
                KpiError::Connectivity(format!("worksheet `{}` not found", self.research_sheet))
            })?;

        let headers = header_names(grid.first().map(Vec::as_slice).unwrap_or(&[]));
        let columns = ResearchColumns::resolve(&self.research_sheet, &headers, &self.columns)?;
        let result = change(&columns, headers.len(), grid)?;

        self.save(&sheets)?;
        Ok(result)
    }
}

impl ResearchStore for WorkbookStore {
    fn load_staff(&self) -> Result<Vec<StaffRecord>> {
        let grid = self.read_sheet(&self.staff_sheet)?;
        let headers = header_names(grid.first().map(Vec::as_slice).unwrap_or(&[]));
        let columns = StaffColumns::resolve(&self.staff_sheet, &headers, &self.columns)?;

        let staff: Vec<StaffRecord> = grid
            .iter()
            .skip(1)
            .filter_map(|row| columns.read(row))
            .collect();
        log::debug!("Read {} staff rows from {}", staff.len(), self.path.display());
        Ok(staff)
    }

    fn load_publications(&self) -> Result<Vec<PublicationRecord>> {
        let grid = self.read_sheet(&self.research_sheet)?;
        let headers = header_names(grid.first().map(Vec::as_slice).unwrap_or(&[]));
        let columns = ResearchColumns::resolve(&self.research_sheet, &headers, &self.columns)?;

        let rows: Vec<PublicationRecord> =
            grid.iter().skip(1).filter_map(|row| columns.read(row)).collect();
        log::debug!("Read {} research rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    fn append_publications(&mut self, rows: &[PublicationRecord]) -> Result<()> {
        let table = self.research_sheet.clone();
        let map = self.columns.clone();
        self.update_research(|columns, width, grid| {
            let mut laid_out = Vec::with_capacity(rows.len());
            for record in rows {
                laid_out.push(columns.write(&table, record, width, &map)?);
            }
            // blank trailing rows would otherwise sit between old and new data
            while grid.len() > 1
                && grid
                    .last()
                    .is_some_and(|r| r.iter().all(CellValue::is_blank))
            {
                grid.pop();
            }
            grid.extend(laid_out);
            Ok(())
        })?;
        log::info!("Appended {} research rows to {}", rows.len(), self.path.display());
        Ok(())
    }

    fn delete_publications(&mut self, key: &PublicationKey) -> Result<usize> {
        let removed = self.update_research(|columns, _, grid| {
            let mut body = grid.split_off(1.min(grid.len()));
            let removed = remove_matching(&mut body, |row| {
                columns.read(row).is_some_and(|record| key.matches(&record))
            });
            grid.extend(body);
            Ok(removed)
        })?;
        log::info!(
            "Deleted {} research rows matching `{}` from {}",
            removed,
            key,
            self.path.display()
        );
        Ok(removed)
    }

    fn describe(&self) -> String {
        format!(
            "workbook {} ({} / {})",
            self.path.display(),
            self.staff_sheet,
            self.research_sheet
        )
    }
}

fn read_grid<R>(workbook: &mut Xlsx<R>, name: &str) -> Result<Grid>
where
    R: std::io::Read + std::io::Seek,
{
    let range = workbook
        .worksheet_range(name)
        .map_err(|e| KpiError::Connectivity(format!("cannot read worksheet `{}`: {}", name, e)))?;

    // calamine ranges begin at the first used cell; pad back to A1
    let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
    let mut grid: Grid = vec![Vec::new(); row_offset as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; col_offset as usize];
        cells.extend(row.iter().map(from_data));
        grid.push(cells);
    }
    Ok(grid)
}

fn from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        other => CellValue::Text(other.to_string()),
    }
}

fn text_row(values: &[&str]) -> Vec<CellValue> {
    values.iter().map(|v| CellValue::Text(v.to_string())).collect()
}

fn write_err(e: rust_xlsxwriter::XlsxError) -> KpiError {
    KpiError::Connectivity(format!("workbook write failed: {}", e))
}
