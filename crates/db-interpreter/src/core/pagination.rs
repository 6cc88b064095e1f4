//! Page window arithmetic and windowed SELECT rendering.
//!
//! Page `n` of size `s` covers rows `[(n-1)*s+1, n*s]` (1-based, inclusive).
//! Dialects pick a [`PaginationStyle`]; the SQL for each style is rendered
//! here so every dialect shares the same window math.

use crate::error::{InterpretError, Result};

/// 1-based inclusive row window of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub start_row: u64,
    pub end_row: u64,
}

impl PageWindow {
    /// Compute the window for a page. Page numbers start at 1.
    pub fn new(page_number: u64, page_size: u64) -> Result<Self> {
        if page_number == 0 {
            return Err(InterpretError::Config(
                "page number must be at least 1".into(),
            ));
        }
        if page_size == 0 {
            return Err(InterpretError::Config("page size must be at least 1".into()));
        }

        let end_row = page_number
            .checked_mul(page_size)
            .ok_or_else(|| InterpretError::Config("page window overflows".into()))?;
        Ok(Self {
            start_row: end_row - page_size + 1,
            end_row,
        })
    }

    /// Rows skipped before the page.
    pub fn offset(&self) -> u64 {
        self.start_row - 1
    }

    /// Rows in a full page.
    pub fn size(&self) -> u64 {
        self.end_row - self.start_row + 1
    }
}

/// Window of page `page_number` (1-based) of `page_size` rows.
pub fn page_window(page_number: u64, page_size: u64) -> Result<PageWindow> {
    PageWindow::new(page_number, page_size)
}

/// Native windowing syntax of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    /// MySQL: `LIMIT offset, count`.
    LimitComma,
    /// PostgreSQL: `LIMIT count OFFSET offset`.
    LimitOffset,
    /// SQL Server 2012+: `OFFSET n ROWS FETCH NEXT m ROWS ONLY`.
    OffsetFetch,
    /// `ROW_NUMBER()` emulation for engines without either clause.
    RowNumber,
}

/// Already-quoted pieces of a paged SELECT.
#[derive(Debug, Clone)]
pub struct PageSelect<'a> {
    /// Qualified, quoted table reference.
    pub table: &'a str,
    /// Quoted column names, in select order.
    pub columns: &'a [String],
    /// Quoted ordering columns. Empty renders a constant ordering, which
    /// every style accepts but which leaves the row order to the engine.
    pub order_by: &'a [String],
    pub where_clause: Option<&'a str>,
}

/// Ordering used when no column can be ordered by.
pub const UNORDERED: &str = "(SELECT NULL)";

/// Render a SELECT returning exactly the rows of `window`.
///
/// `RowNumber` needs an explicit column list: `SELECT *` over the numbered
/// subquery would return the row number column as data.
pub fn render_page_query(style: PaginationStyle, select: &PageSelect<'_>, window: PageWindow) -> Result<String> {
    let columns = if select.columns.is_empty() {
        if style == PaginationStyle::RowNumber {
            return Err(InterpretError::Config(format!(
                "Cannot page {} by row number without an explicit column list",
                select.table
            )));
        }
        "*".to_string()
    } else {
        select.columns.join(", ")
    };
    let order_by = if select.order_by.is_empty() {
        UNORDERED.to_string()
    } else {
        select.order_by.join(", ")
    };
    let where_sql = match select.where_clause.map(str::trim) {
        Some(w) if !w.is_empty() => format!(" WHERE {}", w),
        _ => String::new(),
    };

    Ok(match style {
        PaginationStyle::LimitComma => format!(
            "SELECT {} FROM {}{} ORDER BY {} LIMIT {}, {}",
            columns,
            select.table,
            where_sql,
            order_by,
            window.offset(),
            window.size()
        ),
        PaginationStyle::LimitOffset => format!(
            "SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
            columns,
            select.table,
            where_sql,
            order_by,
            window.size(),
            window.offset()
        ),
        PaginationStyle::OffsetFetch => format!(
            "SELECT {} FROM {}{} ORDER BY {} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
            columns,
            select.table,
            where_sql,
            order_by,
            window.offset(),
            window.size()
        ),
        PaginationStyle::RowNumber => format!(
            "SELECT {} FROM (SELECT {}, ROW_NUMBER() OVER (ORDER BY {}) AS __rn FROM {}{}) AS __paged \
             WHERE __rn BETWEEN {} AND {} ORDER BY __rn",
            columns,
            columns,
            order_by,
            select.table,
            where_sql,
            window.start_row,
            window.end_row
        ),
    })
}
