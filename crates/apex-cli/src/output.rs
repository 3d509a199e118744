use std::io::Write;

use serde_json::Value;

use crate::error::CliError;

pub fn render(document: &Value, pretty: bool) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write_document(&mut handle, document, pretty)
}

fn write_document<W: Write>(writer: &mut W, document: &Value, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, document)?;
    } else {
        serde_json::to_writer(&mut *writer, document)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn compact_output_is_one_line() {
        let mut buffer = Vec::new();
        write_document(&mut buffer, &json!({"meta": {"stale": false}}), false).expect("writes");
        assert_eq!(String::from_utf8(buffer).expect("utf8"), "{\"meta\":{\"stale\":false}}\n");
    }

    #[test]
    fn pretty_output_is_indented() {
        let mut buffer = Vec::new();
        write_document(&mut buffer, &json!({"a": 1}), true).expect("writes");
        assert_eq!(String::from_utf8(buffer).expect("utf8"), "{\n  \"a\": 1\n}\n");
    }
}
