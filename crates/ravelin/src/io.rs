//! Text I/O where `-` (or an empty path) means stdin/stdout.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use ravelin_doctree::DocError;

/// Whether a path argument designates the standard stream.
pub fn is_std(path: &str) -> bool {
    path.is_empty() || path == "-"
}

pub fn read_input_text(input: &str) -> Result<String, DocError> {
    if is_std(input) {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    fs::read_to_string(input).map_err(|source| DocError::FileAccess {
        path: input.into(),
        source,
    })
}

/// Write `text`, creating the output file's parent directories as needed.
pub fn write_output_text(output: &str, text: &str) -> Result<(), DocError> {
    if is_std(output) {
        std::io::stdout().write_all(text.as_bytes())?;
        return Ok(());
    }

    let path = Path::new(output);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| DocError::FileAccess {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    fs::write(path, text).map_err(|source| DocError::FileAccess {
        path: path.to_path_buf(),
        source,
    })
}
