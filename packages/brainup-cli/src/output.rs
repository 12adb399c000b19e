use std::io::Write;
use std::path::Path;

/// Write `text` to a file, or to stdout ending in a newline.
pub fn write_output(text: &str, output_path: Option<&str>) -> Result<(), String> {
    match output_path {
        Some(path) => std::fs::write(Path::new(path), text)
            .map_err(|e| format!("Failed to write output file '{}': {}", path, e)),
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            let newline: &[u8] = if text.ends_with('\n') { b"" } else { b"\n" };
            handle
                .write_all(text.as_bytes())
                .and_then(|_| handle.write_all(newline))
                .map_err(|e| format!("Failed to write to stdout: {}", e))
        }
    }
}

/// Print `value` as pretty JSON on stdout, returning an exit code.
pub fn print_json<T: serde::Serialize>(value: &T) -> i32 {
    let written = serde_json::to_string_pretty(value)
        .map_err(|e| format!("JSON serialization failed: {}", e))
        .and_then(|json| write_output(&json, None));

    match written {
        Ok(()) => crate::exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            crate::exit_codes::EXECUTION_ERROR
        }
    }
}
