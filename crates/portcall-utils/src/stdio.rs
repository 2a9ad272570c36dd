use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use eyre::WrapErr;
use serde::de::DeserializeOwned;

/// A table argument that wasn't given, or was given as `-`, means the stdio stream
fn named_path(table: &Option<PathBuf>) -> Option<&PathBuf> {
    match table {
        Some(path) if path.as_os_str() != "-" => Some(path),
        _ => None,
    }
}

/// Get a writer for a `--*-table` argument: the named file, or stdout
///
/// Rows are serialized a whole line at a time, so the writer is left unbuffered.
pub fn get_output_writer(output: &Option<PathBuf>) -> eyre::Result<Box<dyn Write>> {
    let Some(path) = named_path(output) else {
        return Ok(Box::new(std::io::stdout()));
    };
    let file = File::create(path).wrap_err_with(|| format!("Failed to create table: {path:?}"))?;
    Ok(Box::new(file))
}

/// Get a [BufReader] for a table or message-stream argument: the named file, or stdin
pub fn get_input_reader(input: &Option<PathBuf>) -> eyre::Result<BufReader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = match named_path(input) {
        None => Box::new(std::io::stdin()),
        Some(path) => {
            Box::new(File::open(path).wrap_err_with(|| format!("Failed to open table: {path:?}"))?)
        }
    };
    Ok(BufReader::new(reader))
}

/// Parse every line of the given reader as one JSON value of type `T`
///
/// Fails on the first malformed line; use this for trusted inputs (tables this pipeline wrote,
/// curated assets), not for raw message streams.
pub fn read_json_lines<T: DeserializeOwned, R: BufRead>(reader: R) -> eyre::Result<Vec<T>> {
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.wrap_err("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line)
            .wrap_err_with(|| format!("Failed to parse JSON on line {}", index + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read a newline-separated list of integer ids, skipping blank lines
pub fn read_id_list<R: BufRead>(reader: R) -> eyre::Result<HashSet<i64>> {
    let mut ids = HashSet::new();
    for line in reader.lines() {
        let line = line.wrap_err("Failed to read line")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let id = line
            .parse()
            .wrap_err_with(|| format!("Failed to parse id: {line:?}"))?;
        ids.insert(id);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_path() {
        assert_eq!(named_path(&None), None);
        assert_eq!(named_path(&Some(PathBuf::from("-"))), None);
        let table = Some(PathBuf::from("events/2016-01-01.json"));
        assert_eq!(named_path(&table), table.as_ref());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = Some(dir.path().join("table.json"));

        let mut writer = get_output_writer(&path).unwrap();
        writer.write_all(b"{\"a\": 1}\n").unwrap();
        drop(writer);

        let reader = get_input_reader(&path).unwrap();
        let rows: Vec<serde_json::Value> = read_json_lines(reader).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["a"], 1);
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let path = Some(PathBuf::from("/nonexistent/table.json"));
        assert!(get_input_reader(&path).is_err());
    }

    #[test]
    fn test_read_id_list() {
        let content = "123\n\n  456\n";
        let ids = read_id_list(content.as_bytes()).unwrap();
        assert_eq!(ids, HashSet::from([123, 456]));

        assert!(read_id_list("abc\n".as_bytes()).is_err());
    }

    #[test]
    fn test_read_json_lines() {
        let content = "{\"a\": 1}\n\n{\"a\": 2}\n";
        let rows: Vec<serde_json::Value> = read_json_lines(content.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["a"], 2);
    }

    #[test]
    fn test_read_json_lines_malformed() {
        let content = "{\"a\": 1}\nnot json\n";
        let result: eyre::Result<Vec<serde_json::Value>> = read_json_lines(content.as_bytes());
        assert!(result.is_err());
    }
}
