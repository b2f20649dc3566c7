/// Common utilities for CSV export operations
use csv::Writer;

use crate::errors::ExportResult;

/// Generic CSV exporter that handles the common pattern of:
/// 1. Creating a writer
/// 2. Writing headers
/// 3. Writing rows from items
/// 4. Returning the buffer
///
/// # Example
///
/// ```rust,ignore
/// let csv = export_to_csv(
///     items.iter(),
///     &["question", "answer"],
///     |item| vec![item.question.clone(), item.answer.clone()],
/// )?;
/// ```
pub fn export_to_csv<T, F, H>(
    items: impl IntoIterator<Item = T>,
    headers: &[H],
    row_fn: F,
) -> ExportResult<Vec<u8>>
where
    F: Fn(T) -> Vec<String>,
    H: AsRef<[u8]>,
{
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(headers)?;

    for item in items {
        let row = row_fn(item);
        wtr.write_record(&row)?;
    }

    Ok(wtr.into_inner()?)
}
