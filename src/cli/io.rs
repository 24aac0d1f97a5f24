//! JSON I/O handling for the CLI
//!
//! - Input: one JSON object on stdin
//! - Output: one JSON object on stdout

use std::io::{self, Read, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

/// Reads one JSON request from `reader`
pub fn read_request_from<R: Read>(mut reader: R) -> CliResult<Value> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    if text.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }
    Ok(serde_json::from_str(&text)?)
}

/// Reads one JSON request from stdin
pub fn read_request() -> CliResult<Value> {
    read_request_from(io::stdin().lock())
}

fn write_line<W: Write>(writer: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// `{"status":"ok","data":...}`
pub fn write_response_to<W: Write>(writer: &mut W, data: Value) -> CliResult<()> {
    write_line(writer, &json!({"status": "ok", "data": data}))
}

/// `{"status":"error","code":...,"message":...}`
pub fn write_error_to<W: Write>(writer: &mut W, code: &str, message: &str) -> CliResult<()> {
    write_line(
        writer,
        &json!({"status": "error", "code": code, "message": message}),
    )
}

pub fn write_response(data: Value) -> CliResult<()> {
    write_response_to(&mut io::stdout().lock(), data)
}

pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_error_to(&mut io::stdout().lock(), code, message)
}
