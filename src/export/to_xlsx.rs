use rust_xlsxwriter::{Format, Workbook};

use super::record::{Cell, FlatLayout};
use super::{ExportConfig, ExportFormat, Exporter};
use crate::errors::ExportResult;
use crate::model::QAItem;

pub const SHEET_NAME: &str = "qa_items";

pub struct XlsxExporter;

impl Exporter for XlsxExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Excel
    }

    fn render(&self, items: &[&QAItem], config: &ExportConfig) -> ExportResult<Vec<u8>> {
        let layout = FlatLayout::new(items, config);
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        let header_format = Format::new().set_bold();
        for (col, header) in layout.headers().iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
        }

        for (index, item) in items.iter().enumerate() {
            let row = index as u32 + 1;
            for (col, cell) in layout.row(item).iter().enumerate() {
                match cell {
                    Cell::Text(text) => worksheet.write_string(row, col as u16, text)?,
                    Cell::Number(value) => worksheet.write_number(row, col as u16, *value)?,
                };
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}
