/*!
# Research KPI Dashboard

A web dashboard that scores an institution's research output against
per-program and per-faculty publication targets, built in Rust.

## Overview

Publications are kept in a workbook next to a staff roster. Each research row
credits one staff author; the roster maps authors to a program and a faculty.
The dashboard joins the two, aggregates weighted scores per group, converts
them to a KPI on a 0-5 scale and reports how many more papers each group
needs to reach 5.00.

## Architecture

### Presentation Layer
- **Technologies**: axum, Handlebars templates, SVG charts from plotters
- **Key Components**:
  - Dashboard page with year filter, KPI tables, charts and gap text
  - Admin page for adding and deleting publications
  - JSON API mirroring every table on the page

### Domain Layer
- **join**: Exact-name join of research rows to the roster
- **kpi**: Group aggregation with deduplication and the KPI formula
- **gap**: Papers per journal tier needed to reach KPI 5.00
- **dashboard**: One consistent view computed from one snapshot
- **crud**: Validated submit and delete of publications

### Data Persistence Layer
- `.xlsx` workbook with a roster sheet and a research sheet
- Whole-workbook rewrite through a staging file on every write
- Time-limited read cache, dropped on every write

## Scoring

| Journal tier  | Score |
|---------------|-------|
| Scopus Q1-4   | 1.0   |
| TCI Group 1   | 0.8   |
| TCI Group 2   | 0.6   |

`KPI = min(5, (total_score * 100 / headcount) * 5 / target)`

The `min(5, ...)` cap applies while `kpi.clamp` is true, which is the default.
With `clamp = false` a group can score above 5.0, but never below 0.

## Modules

- **records**: Staff and publication records, journal tiers, year filter
- **config**: TOML settings
- **store**: The storage trait and the in-memory store
- **workbook**: Workbook-backed store
- **cache**: TTL cache in front of a store
- **auth**: Admin password and sessions
- **report**: CSV and XLSX export of KPI tables
- **chart**: SVG charts (web feature)
- **app**: Routing and handlers (web feature)
*/

pub mod auth;
pub mod cache;
pub mod config;
pub mod crud;
pub mod dashboard;
pub mod error;
pub mod gap;
pub mod join;
pub mod kpi;
pub mod records;
pub mod report;
pub mod store;
pub mod workbook;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod chart;

pub use cache::CachedStore;
pub use config::Settings;
pub use dashboard::Dashboard;
pub use error::{KpiError, Result};
pub use records::{JournalTier, PublicationKey, PublicationRecord, StaffRecord, YearFilter};
pub use store::{MemoryStore, ResearchStore};
pub use workbook::WorkbookStore;
