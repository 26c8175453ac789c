use serde::Serialize;

use crate::models::{Status, StudentEntry};

/// One exported row. The original export writes two fields per row under a
/// three-name header; the `Present` column is left implicit by the format.
#[derive(Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Last Name")]
    last_name: &'a str,
    #[serde(rename = "First Name")]
    first_name: &'a str,
}

/// Build the on-demand status report: header `Last Name,First Name,Present`
/// followed by one row per Online student, in roster order.
pub fn online_roster_csv(entries: &[StudentEntry]) -> anyhow::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(vec![]);

    writer.write_record(["Last Name", "First Name", "Present"])?;
    for entry in entries.iter().filter(|entry| entry.status == Status::Online) {
        writer.serialize(ExportRow {
            last_name: &entry.last_name,
            first_name: &entry.first_name,
        })?;
    }

    Ok(String::from_utf8(writer.into_inner()?)?)
}
