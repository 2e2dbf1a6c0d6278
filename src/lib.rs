// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Generic list engine for Kubernetes resource tables
//!
//! Turns an in-memory snapshot of rows plus a column schema into a filtered,
//! sorted and paginated view with faceted filter counts, optional grouping,
//! a selection model that survives view changes, a persisted column layout
//! and CSV/JSON/YAML export.
//!
//! Data flows leaf-first:
//! rows + [`schema::Schema`] → [`engine::compute`] → [`pagination::paginate`]
//! → [`grouping::group`]. [`selection::Selection`] and
//! [`layout::ColumnLayoutStore`] are addressed by stable keys and survive every
//! recomputation. [`state::ListState`] threads one page's state through all of it.

pub mod config;
pub mod engine;
pub mod export;
pub mod grouping;
pub mod layout;
pub mod pagination;
pub mod resources;
pub mod schema;
pub mod search;
pub mod selection;
pub mod state;
mod storage;

pub use engine::{ComputedView, FilterState, SortOrder, SortState, compute};
pub use export::{ExportArtifact, ExportConfig, ExportFormat, ManifestSource, ManifestStub};
pub use grouping::{Group, GroupBy, GroupCollapse, GroupedLine};
pub use layout::{ColumnLayoutStore, FileLayoutBackend, LayoutBackend, MemoryLayoutBackend};
pub use pagination::{PAGE_SIZE_OPTIONS, Page, Pagination, paginate};
pub use schema::{CellValue, Column, ColumnKind, Schema};
pub use search::SearchQuery;
pub use selection::{SelectAllState, Selection};
pub use state::{ListOutput, ListState};
