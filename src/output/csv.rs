use csv::{QuoteStyle, WriterBuilder};

use crate::output::OutputError;

/// Encodes rows of cells (header first) as CSV.
///
/// Cells with commas, quotes or line breaks are quoted; everything else is
/// written as is.
pub fn render_table(rows: &[Vec<String>]) -> Result<Vec<u8>, OutputError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    for row in rows {
        writer.write_record(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| OutputError::Io(e.into_error()))
}
