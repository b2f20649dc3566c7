use super::csv_common::export_to_csv;
use super::record::FlatLayout;
use super::{ExportConfig, ExportFormat, Exporter};
use crate::errors::ExportResult;
use crate::model::QAItem;

pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn render(&self, items: &[&QAItem], config: &ExportConfig) -> ExportResult<Vec<u8>> {
        let layout = FlatLayout::new(items, config);
        let headers = layout.headers();
        export_to_csv(items.iter(), &headers[..], |item| {
            layout.row(item).iter().map(|cell| cell.to_text()).collect()
        })
    }
}
