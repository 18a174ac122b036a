//! Report exporters.
//!
//! Every writer renders from a shared `&ReportTable`, so the row-major and
//! column-major files are produced from the same values and exporting never
//! changes the table.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use comfy_table::{presets, Table};
use serde::Serialize;

use super::table::{Orientation, ReportTable, Row};
use crate::errors::{Error, IoContext, Result};
use crate::io::layout::{with_extension, OutputLayout, ARCHIVE_REPORT};

pub trait ReportWriter {
    fn write_table(&mut self, table: &ReportTable) -> Result<()>;
}

/// Whitespace-aligned plain text table.
pub struct TextWriter<W: Write> {
    writer: W,
    orientation: Orientation,
    note: Option<String>,
}

impl<W: Write> TextWriter<W> {
    pub fn new(writer: W, orientation: Orientation) -> Self {
        Self {
            writer,
            orientation,
            note: None,
        }
    }

    /// Line printed above the table.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl<W: Write> ReportWriter for TextWriter<W> {
    fn write_table(&mut self, table: &ReportTable) -> Result<()> {
        let grid = table.render(self.orientation);
        let mut text = Table::new();
        text.load_preset(presets::NOTHING);
        if let Some((header, lines)) = grid.split_first() {
            text.set_header(header.clone());
            for line in lines {
                text.add_row(line.clone());
            }
        }

        write_text(&mut self.writer, self.note.as_deref(), &text).map_err(Error::ReportWrite)
    }
}

fn write_text<W: Write>(out: &mut W, note: Option<&str>, text: &Table) -> std::io::Result<()> {
    if let Some(note) = note {
        writeln!(out, "{}", note)?;
        writeln!(out)?;
    }
    writeln!(out, "{}", text)?;
    out.flush()
}

/// Tab-separated values, one grid line per record.
pub struct TsvWriter<W: Write> {
    writer: csv::Writer<W>,
    orientation: Orientation,
}

impl<W: Write> TsvWriter<W> {
    pub fn new(writer: W, orientation: Orientation) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .flexible(false)
            .from_writer(writer);
        Self {
            writer,
            orientation,
        }
    }
}

impl<W: Write> ReportWriter for TsvWriter<W> {
    fn write_table(&mut self, table: &ReportTable) -> Result<()> {
        for line in table.render(self.orientation) {
            self.writer.write_record(&line)?;
        }
        self.writer.flush().map_err(Error::ReportWrite)
    }
}

/// Archival snapshot of the table.
#[derive(Debug, Serialize)]
pub struct ArchiveSnapshot<'a> {
    pub generated_at: String,
    pub min_contig: Option<u64>,
    pub header: &'a [String],
    pub assemblies: &'a [Row],
}

pub struct JsonWriter<W: Write> {
    writer: W,
    min_contig: Option<u64>,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W, min_contig: Option<u64>) -> Self {
        Self { writer, min_contig }
    }
}

impl<W: Write> ReportWriter for JsonWriter<W> {
    fn write_table(&mut self, table: &ReportTable) -> Result<()> {
        let snapshot = ArchiveSnapshot {
            generated_at: Local::now().to_rfc3339(),
            min_contig: self.min_contig,
            header: table.header(),
            assemblies: table.rows(),
        };
        serde_json::to_writer_pretty(&mut self.writer, &snapshot)?;
        writeln!(self.writer)
            .and_then(|_| self.writer.flush())
            .map_err(Error::ReportWrite)
    }
}

/// Paths written by [`export_reports`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedReports {
    pub row_major_txt: PathBuf,
    pub row_major_tsv: PathBuf,
    pub column_major_txt: PathBuf,
    pub column_major_tsv: PathBuf,
    pub archive: Option<PathBuf>,
}

fn write_file(path: &Path, writer: impl FnOnce(BufWriter<File>) -> Box<dyn ReportWriter>, table: &ReportTable) -> Result<()> {
    let file = File::create(path).with_path("Cannot create report", path)?;
    writer(BufWriter::new(file)).write_table(table)
}

/// Note placed above the text reports.
pub fn min_contig_note(min_contig: u64) -> String {
    format!("All statistics are based on contigs of size >= {} bp", min_contig)
}

/// Write the row-major and column-major reports (`.txt` and `.tsv`) and,
/// when the layout has an archive directory, `report.json`.
pub fn export_reports(
    table: &ReportTable,
    layout: &OutputLayout,
    min_contig: Option<u64>,
) -> Result<ExportedReports> {
    let note = min_contig.map(min_contig_note);
    let row_base = layout.row_major_report();
    let column_base = layout.column_major_report();

    let reports = ExportedReports {
        row_major_txt: with_extension(&row_base, "txt"),
        row_major_tsv: with_extension(&row_base, "tsv"),
        column_major_txt: with_extension(&column_base, "txt"),
        column_major_tsv: with_extension(&column_base, "tsv"),
        archive: layout.archive().map(|dir| dir.join(ARCHIVE_REPORT)),
    };

    for (path, orientation) in [
        (&reports.row_major_txt, Orientation::RowMajor),
        (&reports.column_major_txt, Orientation::ColumnMajor),
    ] {
        let note = note.clone();
        write_file(
            path,
            move |w| {
                let writer = TextWriter::new(w, orientation);
                Box::new(match note {
                    Some(note) => writer.with_note(note),
                    None => writer,
                })
            },
            table,
        )?;
    }
    for (path, orientation) in [
        (&reports.row_major_tsv, Orientation::RowMajor),
        (&reports.column_major_tsv, Orientation::ColumnMajor),
    ] {
        write_file(path, move |w| Box::new(TsvWriter::new(w, orientation)), table)?;
    }
    if let Some(path) = &reports.archive {
        write_file(path, move |w| Box::new(JsonWriter::new(w, min_contig)), table)?;
    }
    Ok(reports)
}
