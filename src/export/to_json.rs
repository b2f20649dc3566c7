use super::record::structured_record;
use super::{ExportConfig, ExportFormat, Exporter};
use crate::errors::ExportResult;
use crate::model::QAItem;

pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn render(&self, items: &[&QAItem], config: &ExportConfig) -> ExportResult<Vec<u8>> {
        let records: Vec<_> = items
            .iter()
            .map(|item| structured_record(item, config))
            .collect();
        Ok(serde_json::to_vec_pretty(&records)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn renders_records_with_nested_metadata() {
        let item = QAItem::new("q", "a")
            .with_sources(["s1", "s2"])
            .with_metadata("pagina", 12i64);
        let config = ExportConfig::new(ExportFormat::Json).with_metadata(true);

        let bytes = JsonExporter.render(&[&item], &config).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        let record = &value[0];
        assert_eq!(record["question"], "q");
        assert_eq!(record["sources"], serde_json::json!(["s1", "s2"]));
        assert_eq!(record["metadata"]["pagina"], 12);
        assert_eq!(record["level"], "intermediate");
    }

    #[test]
    fn empty_view_is_empty_array() {
        let bytes = JsonExporter
            .render(&[], &ExportConfig::new(ExportFormat::Json))
            .unwrap();
        assert_eq!(bytes, b"[]");
    }
}
