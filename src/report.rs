use crate::dashboard::Dashboard;
use crate::error::{KpiError, Result};
use crate::kpi::KpiRow;

const HEADERS: [&str; 8] = [
    "kind",
    "group",
    "faculty",
    "headcount",
    "target",
    "publications",
    "total_score",
    "kpi",
];

/// Convert KPI rows to CSV format
///
/// One header line followed by one line per row. Fields holding commas,
/// quotes or newlines are quoted, with inner quotes doubled.
pub fn to_csv(rows: &[KpiRow]) -> String {
    let mut csv_content = HEADERS.join(",");
    csv_content.push('\n');

    for row in rows {
        let fields = [
            row.kind.to_string(),
            row.group.clone(),
            row.faculty.clone().unwrap_or_default(),
            row.headcount.to_string(),
            row.target.to_string(),
            row.publications.to_string(),
            format!("{:.2}", row.total_score),
            format!("{:.2}", row.kpi),
        ];
        let escaped: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
        csv_content.push_str(&escaped.join(","));
        csv_content.push('\n');
    }

    csv_content
}

fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert a dashboard to XLSX format
///
/// Writes a "programs" and a "faculties" worksheet with the KPI tables, and
/// a "mismatches" worksheet listing research rows whose author is not on
/// the roster.
pub fn to_xlsx(dashboard: &Dashboard) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Format, Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for (name, rows) in [
        ("programs", &dashboard.programs),
        ("faculties", &dashboard.faculties),
    ] {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(name).map_err(export_err)?;
        for (c, header) in HEADERS.iter().enumerate() {
            worksheet
                .write_string_with_format(0, c as u16, *header, &bold)
                .map_err(export_err)?;
        }
        for (i, row) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            worksheet.write_string(r, 0, &row.kind.to_string()).map_err(export_err)?;
            worksheet.write_string(r, 1, row.group.as_str()).map_err(export_err)?;
            worksheet
                .write_string(r, 2, row.faculty.as_deref().unwrap_or(""))
                .map_err(export_err)?;
            worksheet.write_number(r, 3, row.headcount as f64).map_err(export_err)?;
            worksheet.write_number(r, 4, row.target as f64).map_err(export_err)?;
            worksheet
                .write_number(r, 5, row.publications as f64)
                .map_err(export_err)?;
            worksheet.write_number(r, 6, row.total_score).map_err(export_err)?;
            worksheet.write_number(r, 7, row.kpi).map_err(export_err)?;
        }
        workbook.push_worksheet(worksheet);
    }

    let mut worksheet = Worksheet::new();
    worksheet.set_name("mismatches").map_err(export_err)?;
    for (c, header) in ["author_name", "title", "year"].iter().enumerate() {
        worksheet
            .write_string_with_format(0, c as u16, *header, &bold)
            .map_err(export_err)?;
    }
    for (i, p) in dashboard.mismatches.iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_string(r, 0, p.author_name.as_str()).map_err(export_err)?;
        worksheet.write_string(r, 1, p.title.as_str()).map_err(export_err)?;
        worksheet.write_number(r, 2, p.year as f64).map_err(export_err)?;
    }
    workbook.push_worksheet(worksheet);

    let buffer = workbook.save_to_buffer().map_err(export_err)?;

    Ok(buffer)
}

fn export_err(e: rust_xlsxwriter::XlsxError) -> KpiError {
    KpiError::Export(e.to_string())
}
