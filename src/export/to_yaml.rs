use super::record::structured_record;
use super::{ExportConfig, ExportFormat, Exporter};
use crate::errors::ExportResult;
use crate::model::QAItem;

pub struct YamlExporter;

impl Exporter for YamlExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Yaml
    }

    fn render(&self, items: &[&QAItem], config: &ExportConfig) -> ExportResult<Vec<u8>> {
        let records: Vec<_> = items
            .iter()
            .map(|item| structured_record(item, config))
            .collect();
        Ok(serde_yaml::to_string(&records)?.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sequence_of_records() {
        let item = QAItem::new("¿Qué es IA?", "Inteligencia Artificial").with_sources(["wiki"]);
        let bytes = YamlExporter
            .render(&[&item], &ExportConfig::new(ExportFormat::Yaml))
            .unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_slice(&bytes).unwrap();
        assert_eq!(parsed[0]["question"].as_str(), Some("¿Qué es IA?"));
        assert_eq!(parsed[0]["sources"][0].as_str(), Some("wiki"));
        assert_eq!(parsed[0]["confidence"].as_f64(), Some(0.8));
    }

    #[test]
    fn empty_view_is_empty_sequence() {
        let bytes = YamlExporter
            .render(&[], &ExportConfig::new(ExportFormat::Yaml))
            .unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().trim(), "[]");
    }
}
