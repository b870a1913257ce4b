//! JSON output helpers.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;

/// Writes `value` as one line of JSON, or indented when `pretty`.
pub fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writeln!(writer, "{json}")?;
    writer.flush()?;
    Ok(())
}
