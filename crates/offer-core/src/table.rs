use crate::util::escape_html;

use polars::prelude::*;
use std::fmt;

/// Name the transpose gives the column holding the former column names.
const FIELD_COL: &str = "field";

/// Transposed result ready for display: one row per field of the source
/// frame, one column per sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayTable {
    index: Vec<String>,
    columns: Vec<String>,
    /// Column-major: `cells[col][row]`.
    cells: Vec<Vec<String>>,
}

impl DisplayTable {
    /// Transposes an all-text `df`; `labels` name its rows (one per row) and
    /// become the columns of the table. Nulls render as empty cells.
    pub fn from_frame(mut df: DataFrame, labels: Vec<String>) -> PolarsResult<Self> {
        if labels.len() != df.height() {
            let msg = format!("{} labels for {} rows", labels.len(), df.height());
            return Err(PolarsError::ShapeMismatch(msg.into()));
        }
        let t = df.transpose(Some(FIELD_COL), None)?;

        let index = text_cells(t.column(FIELD_COL)?)?;
        let cells = t
            .get_columns()
            .iter()
            .filter(|c| c.name().as_str() != FIELD_COL)
            .map(text_cells)
            .collect::<PolarsResult<Vec<_>>>()?;

        Ok(Self {
            index,
            columns: labels,
            cells,
        })
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Cell at (`row` label, `column` label).
    pub fn get(&self, row: &str, column: &str) -> Option<&str> {
        let r = self.index.iter().position(|i| i == row)?;
        let c = self.columns.iter().position(|i| i == column)?;
        Some(self.cells[c][r].as_str())
    }

    fn row(&self, r: usize) -> impl Iterator<Item = &str> + '_ {
        self.cells.iter().map(move |col| col[r].as_str())
    }

    /// HTML `<table>` in the layout pandas' `DataFrame.to_html` produces,
    /// with `classes` appended after `dataframe`.
    pub fn html<'a>(&'a self, classes: &'a [&'a str]) -> HtmlTable<'a> {
        HtmlTable {
            table: self,
            classes,
        }
    }

    pub fn to_html(&self, classes: &[&str]) -> String {
        self.html(classes).to_string()
    }
}

fn text_cells(c: &Column) -> PolarsResult<Vec<String>> {
    Ok(c.str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

/// Fixed-width text rendering for terminals.
impl fmt::Display for DisplayTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_w = self.index.iter().map(String::len).max().unwrap_or(0);
        let col_w: Vec<usize> = self
            .columns
            .iter()
            .zip(&self.cells)
            .map(|(name, col)| col.iter().map(String::len).chain([name.len()]).max().unwrap_or(0))
            .collect();

        write!(f, "{:label_w$}", "")?;
        for (name, w) in self.columns.iter().zip(col_w.iter().copied()) {
            write!(f, "  {name:>w$}")?;
        }
        writeln!(f)?;
        for (r, label) in self.index.iter().enumerate() {
            write!(f, "{label:<label_w$}")?;
            for (v, w) in self.row(r).zip(col_w.iter().copied()) {
                write!(f, "  {v:>w$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub struct HtmlTable<'a> {
    table: &'a DisplayTable,
    classes: &'a [&'a str],
}

impl fmt::Display for HtmlTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.table;
        let mut class = String::from("dataframe");
        for c in self.classes {
            class.push(' ');
            class.push_str(c);
        }

        writeln!(f, "<table border=\"1\" class=\"{}\">", escape_html(&class))?;
        f.write_str("  <thead>\n    <tr style=\"text-align: right;\">\n      <th></th>\n")?;
        for c in &t.columns {
            writeln!(f, "      <th>{}</th>", escape_html(c))?;
        }
        f.write_str("    </tr>\n  </thead>\n  <tbody>\n")?;
        for (r, label) in t.index.iter().enumerate() {
            f.write_str("    <tr>\n")?;
            writeln!(f, "      <th>{}</th>", escape_html(label))?;
            for v in t.row(r) {
                writeln!(f, "      <td>{}</td>", escape_html(v))?;
            }
            f.write_str("    </tr>\n")?;
        }
        f.write_str("  </tbody>\n</table>")
    }
}
