//! Report table and its exporters.

pub mod table;
pub mod writers;

pub use table::{Orientation, ReportTable, Row, Value, ASSEMBLY_COLUMN, ID_COLUMN};
pub use writers::{
    export_reports, min_contig_note, ExportedReports, JsonWriter, ReportWriter, TextWriter,
    TsvWriter,
};
