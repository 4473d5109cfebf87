//! CSV report output
//!
//! One section per table, separated by a blank line, each with its own
//! header row. Spreadsheet tools import the sections as separate blocks.

use super::ReportView;
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, view: &ReportView) -> io::Result<()> {
    writeln!(writer, "metric,value,unit")?;
    for card in &view.cards {
        let unit = match card.unit {
            super::Unit::Gwh => "GWh",
            super::Unit::Percent => "%",
            super::Unit::Degrees => "deg",
        };
        writeln!(writer, "{},{},{}", escape(card.title), card.value, unit)?;
    }

    writeln!(writer)?;
    writeln!(writer, "month,energy")?;
    for m in &view.monthly_production {
        writeln!(writer, "{},{}", escape(&m.month), m.energy)?;
    }

    writeln!(writer)?;
    writeln!(writer, "wind_speed,power")?;
    for p in &view.power_curve {
        writeln!(writer, "{},{}", p.wind_speed, p.power)?;
    }

    writeln!(writer)?;
    writeln!(writer, "rank,turbine_id,energy")?;
    for t in &view.ranking {
        writeln!(writer, "{},{},{}", t.rank, escape(&t.turbine_id), t.energy)?;
    }

    Ok(())
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
