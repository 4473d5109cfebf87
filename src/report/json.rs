//! JSON report output

use super::ReportView;
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, view: &ReportView) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, view)?;
    writeln!(writer)
}
