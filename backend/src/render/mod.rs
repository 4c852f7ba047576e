//! HTML rendering of report grids.

pub mod html;

pub use html::{escape_html, render_page, render_table, EMPTY_PLACEHOLDER, TABLE_CLASS, TOTAL_ROW_CLASS};
