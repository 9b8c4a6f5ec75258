//! `flatjson flatten`: flatten a JSON document or a JSON Lines stream

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use flatjson_core::{
    encode_line, flatten_record, parse_document, split_json_lines, Flattener, InputFormat,
};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Input layout accepted on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Single JSON document if the whole input parses as one, JSON Lines otherwise
    #[default]
    Auto,
    /// One object, or an array of objects
    Json,
    /// One object per line
    Jsonl,
}

impl FormatArg {
    pub fn resolve(self, input: &[u8]) -> InputFormat {
        match self {
            FormatArg::Auto => InputFormat::detect(input),
            FormatArg::Json => InputFormat::Json,
            FormatArg::Jsonl => InputFormat::JsonLines,
        }
    }
}

#[derive(Debug, Args)]
pub struct FlattenCommand {
    /// Input file; reads stdin when omitted or `-`
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Input format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Auto)]
    pub format: FormatArg,

    /// Write flattened records to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Log and skip JSON Lines records that cannot be flattened
    #[arg(long)]
    pub skip_invalid: bool,
}

/// Counts reported after a run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlattenSummary {
    pub records: usize,
    pub skipped: usize,
}

impl FlattenCommand {
    pub fn run(&self, flattener: &Flattener) -> Result<FlattenSummary> {
        let input = read_input(self.input.as_deref())?;
        let format = self.format.resolve(&input);

        let mut out = open_output(self.output.as_deref())?;
        let summary = flatten_buffer(flattener, &input, format, self.skip_invalid, &mut out)?;
        out.flush().context("Failed to flush output")?;

        info!(
            records = summary.records,
            skipped = summary.skipped,
            format = ?format,
            "Flattened input"
        );
        Ok(summary)
    }
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match path {
        Some(path) if path != Path::new("-") => {
            buf = std::fs::read(path)
                .with_context(|| format!("Failed to read input file: {}", path.display()))?;
        }
        _ => {
            io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
        }
    }
    Ok(buf)
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

/// Flatten every record in `input` and write one JSON line per record
///
/// JSON documents are all-or-nothing. JSON Lines input stops at the first
/// bad line unless `skip_invalid` is set.
pub fn flatten_buffer<W: Write>(
    flattener: &Flattener,
    input: &[u8],
    format: InputFormat,
    skip_invalid: bool,
    out: &mut W,
) -> Result<FlattenSummary> {
    let mut summary = FlattenSummary::default();

    match format {
        InputFormat::Json => {
            let records = parse_document(input).context("Failed to parse JSON document")?;
            for (index, record) in records.iter().enumerate() {
                let line = encode_line(flattener, record)
                    .with_context(|| format!("Failed to flatten record {}", index))?;
                out.write_all(&line).context("Failed to write output")?;
                summary.records += 1;
            }
        }
        InputFormat::JsonLines => {
            for (line_no, line) in split_json_lines(input) {
                match flatten_record(flattener, line) {
                    Ok(flat) => {
                        out.write_all(&flat).context("Failed to write output")?;
                        summary.records += 1;
                    }
                    Err(err) if skip_invalid => {
                        warn!(
                            line = line_no,
                            error_type = err.error_type(),
                            error = %err,
                            "Skipping invalid record"
                        );
                        summary.skipped += 1;
                    }
                    Err(err) => {
                        return Err(anyhow::Error::new(err)
                            .context(format!("Invalid record at line {}", line_no)));
                    }
                }
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatjson_core::{CollisionPolicy, FlattenOptions};

    fn run(input: &[u8], format: InputFormat, skip_invalid: bool) -> Result<(String, FlattenSummary)> {
        let mut out = Vec::new();
        let summary = flatten_buffer(&Flattener::default(), input, format, skip_invalid, &mut out)?;
        Ok((String::from_utf8(out)?, summary))
    }

    #[test]
    fn test_json_lines_input() {
        let input = b"{\"a\": {\"b\": 1}}\n\n{\"c\": [true, null]}\n";
        let (out, summary) = run(input, InputFormat::JsonLines, false).unwrap();
        assert_eq!(out, "{\"a.b\":1}\n{\"c.0\":true,\"c.1\":null}\n");
        assert_eq!(summary, FlattenSummary { records: 2, skipped: 0 });
    }

    #[test]
    fn test_json_document_array() {
        let input = br#"[{"a": {"b": 1}}, {"a": {"b": 2}}]"#;
        let (out, summary) = run(input, InputFormat::Json, false).unwrap();
        assert_eq!(out, "{\"a.b\":1}\n{\"a.b\":2}\n");
        assert_eq!(summary.records, 2);
    }

    #[test]
    fn test_invalid_line_aborts_with_line_number() {
        let input = b"{\"a\": 1}\n[1, 2]\n{\"b\": 2}\n";
        let err = run(input, InputFormat::JsonLines, false).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_skip_invalid_keeps_going() {
        let input = b"{\"a\": 1}\nnot json\n{\"b\": 2}\n";
        let (out, summary) = run(input, InputFormat::JsonLines, true).unwrap();
        assert_eq!(out, "{\"a\":1}\n{\"b\":2}\n");
        assert_eq!(summary, FlattenSummary { records: 2, skipped: 1 });
    }

    #[test]
    fn test_collision_policy_is_applied() {
        let flattener = Flattener::new(FlattenOptions {
            on_collision: CollisionPolicy::Collect,
            ..Default::default()
        });
        let mut out = Vec::new();
        flatten_buffer(
            &flattener,
            br#"{"a.b": 1, "a": {"b": 2}}"#,
            InputFormat::Json,
            false,
            &mut out,
        )
        .unwrap();
        assert_eq!(out, b"{\"a.b\":[1,2]}\n");
    }

    #[test]
    fn test_format_arg_resolution() {
        let doc = br#"{"a": 1}"#;
        assert_eq!(FormatArg::Auto.resolve(doc), InputFormat::Json);
        assert_eq!(FormatArg::Jsonl.resolve(doc), InputFormat::JsonLines);
        assert_eq!(
            FormatArg::Auto.resolve(b"{\"a\": 1}\n{\"a\": 2}\n"),
            InputFormat::JsonLines
        );
    }
}
