//! Query reply grammar.
//!
//! Every query answer starts with a two-character kind marker:
//!
//! | Prefix | Meaning |
//! |--------|---------|
//! | `&1`   | select result, rows follow |
//! | `&2`   | insert/update count |
//! | `&3`   | DDL/meta result, may embed an error on its second line |
//! | `&4`   | auto-commit toggle |
//! | `&5`   | prepare result |
//! | `&6`   | continuation block (not supported) |
//!
//! `&1` and `&5` replies carry six newline-separated sections: the header
//! line, then four `%`-prefixed metadata lines (tables, column names,
//! column types, display lengths), then one row per line. Row lines start
//! with `[ `, end with `\t]`, and separate values with `,\t`; quoted string
//! values may absorb a separator, so splitting is quote-aware.

use bytes::Bytes;
use monet_types::decode::unescape_text;
use monet_types::{ColumnType, ParamType, Value, decode_value};

use crate::error::{ProtocolError, ServerError};

/// A parsed query reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A select result with materialised rows.
    Rows(RowsReply),
    /// An insert/update/delete count, with the last auto-generated id when
    /// the server reported one.
    Upsert {
        /// Number of affected rows.
        row_count: u64,
        /// Last generated id; `None` when the server reported `-1`.
        last_id: Option<i64>,
    },
    /// A DDL or similar result carrying only its meta line.
    Meta(String),
    /// The server toggled auto-commit.
    TxState {
        /// New auto-commit state.
        auto_commit: bool,
    },
    /// A prepare result.
    Prepare(PrepareReply),
}

/// A select result.
#[derive(Debug, Clone, PartialEq)]
pub struct RowsReply {
    /// The raw header line of the reply.
    pub meta: Bytes,
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Column types in result order.
    pub types: Vec<ColumnType>,
    /// Decoded rows.
    pub rows: Vec<Vec<Value>>,
    /// Row count as stated in the reply header.
    pub row_count: u64,
}

/// A prepare result: the server-side statement id plus the type
/// descriptors of its placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareReply {
    /// Server-assigned statement id, used verbatim in `exec`/`deallocate`.
    pub id: String,
    /// Placeholder types in parameter order. Result-column descriptors of
    /// the prepared statement are filtered out.
    pub parameters: Vec<ParamType>,
}

/// A placeholder descriptor row carries NULL schema, table, and column.
const PLACEHOLDER_SUFFIX: &str = "NULL,\tNULL,\tNULL\t]";

/// Parse a query reply payload.
///
/// The payload must not be a `!`-prefixed server error; those are peeled
/// off at the framing layer.
pub fn parse_reply(payload: &[u8]) -> Result<Reply, ProtocolError> {
    let text = std::str::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8)?;

    match text.get(..2) {
        Some("&1") => parse_rows(text, payload),
        Some("&2") => parse_upsert(text, payload),
        Some("&3") => parse_meta(text),
        Some("&4") => parse_tx_state(text, payload),
        Some("&5") => parse_prepare(text, payload),
        Some("&6") => Err(ProtocolError::UnsupportedReply("&6 QBLOCK".to_owned())),
        _ => Err(ProtocolError::malformed_reply(
            "unknown reply prefix",
            payload,
        )),
    }
}

/// The six sections of a tabular (`&1`/`&5`) reply.
struct Sections<'a> {
    header: &'a str,
    metadata: Vec<&'a str>,
    rows: Vec<&'a str>,
}

fn split_sections<'a>(text: &'a str, payload: &[u8]) -> Result<Sections<'a>, ProtocolError> {
    let mut lines = text.split('\n');
    let header = lines
        .next()
        .ok_or_else(|| ProtocolError::malformed_reply("missing header line", payload))?;

    let mut metadata = Vec::with_capacity(4);
    let mut rows = Vec::new();
    for line in lines {
        if line.starts_with('%') {
            metadata.push(line);
        } else if !line.is_empty() {
            rows.push(line);
        }
    }

    Ok(Sections {
        header,
        metadata,
        rows,
    })
}

/// Parse a `% a,\tb,\tc # label` metadata line into its items.
fn parse_metadata_line<'a>(line: &'a str, payload: &[u8]) -> Result<Vec<&'a str>, ProtocolError> {
    let content = line
        .strip_prefix("% ")
        .and_then(|rest| rest.rsplit_once(" # "))
        .map(|(content, _label)| content)
        .ok_or_else(|| ProtocolError::malformed_reply("malformed metadata line", payload))?;
    Ok(content.split(",\t").map(str::trim).collect())
}

/// Split a row body on `,\t` separators outside of quoted strings.
fn split_row_values(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut values = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_quotes = !in_quotes,
            b'\\' if in_quotes => i += 1,
            b',' if !in_quotes && bytes.get(i + 1) == Some(&b'\t') => {
                values.push(&body[start..i]);
                i += 1;
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    values.push(&body[start..]);
    values
}

/// Strip the `[ ` prefix and `\t]` suffix of a row line.
fn row_body<'a>(line: &'a str, payload: &[u8]) -> Result<&'a str, ProtocolError> {
    line.strip_prefix("[ ")
        .and_then(|rest| rest.strip_suffix("\t]"))
        .ok_or_else(|| ProtocolError::malformed_reply("malformed row line", payload))
}

fn parse_rows(text: &str, payload: &[u8]) -> Result<Reply, ProtocolError> {
    let sections = split_sections(text, payload)?;

    // Header: `&1 <query_id> <row_count> <col_count> <returned>`.
    let mut header_fields = sections.header[2..].split_whitespace();
    let _query_id = header_fields.next();
    let row_count: u64 = header_fields
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| ProtocolError::malformed_reply("missing row count in header", payload))?;

    // Metadata order: tables, names, types, lengths.
    let name_line = sections
        .metadata
        .get(1)
        .ok_or_else(|| ProtocolError::malformed_reply("missing column name line", payload))?;
    let type_line = sections
        .metadata
        .get(2)
        .ok_or_else(|| ProtocolError::malformed_reply("missing column type line", payload))?;

    let columns: Vec<String> = parse_metadata_line(name_line, payload)?
        .into_iter()
        .map(str::to_owned)
        .collect();
    let types = parse_metadata_line(type_line, payload)?
        .into_iter()
        .map(ColumnType::from_name)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ProtocolError::malformed_reply(e.to_string(), payload))?;

    let mut rows = Vec::with_capacity(sections.rows.len());
    for line in &sections.rows {
        let body = row_body(line, payload)?;
        let raw_values = split_row_values(body);
        if raw_values.len() != types.len() {
            return Err(ProtocolError::malformed_reply(
                format!(
                    "row has {} values but {} columns were declared",
                    raw_values.len(),
                    types.len()
                ),
                payload,
            ));
        }
        let mut row = Vec::with_capacity(types.len());
        for (raw, ty) in raw_values.iter().zip(&types) {
            let value = decode_value(*ty, raw)
                .map_err(|e| ProtocolError::malformed_reply(e.to_string(), payload))?;
            row.push(value);
        }
        rows.push(row);
    }

    Ok(Reply::Rows(RowsReply {
        meta: Bytes::copy_from_slice(sections.header.as_bytes()),
        columns,
        types,
        rows,
        row_count,
    }))
}

fn parse_upsert(text: &str, payload: &[u8]) -> Result<Reply, ProtocolError> {
    // `&2 <row_count> <last_id> …`
    let mut fields = text[2..].split_whitespace();
    let row_count: u64 = fields
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| ProtocolError::malformed_reply("missing upsert row count", payload))?;
    let last_id: i64 = fields
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| ProtocolError::malformed_reply("missing upsert last id", payload))?;

    Ok(Reply::Upsert {
        row_count,
        last_id: (last_id >= 0).then_some(last_id),
    })
}

fn parse_meta(text: &str) -> Result<Reply, ProtocolError> {
    let mut lines = text.split('\n');
    let meta = lines.next().unwrap_or_default();

    // A failed DDL embeds its error on the second line.
    if let Some(error_line) = lines.next() {
        if let Some(err) = ServerError::from_payload(error_line) {
            return Err(err.into());
        }
    }

    Ok(Reply::Meta(
        meta.strip_prefix("&3").unwrap_or(meta).trim().to_owned(),
    ))
}

fn parse_tx_state(text: &str, payload: &[u8]) -> Result<Reply, ProtocolError> {
    match text[2..].trim() {
        "t" => Ok(Reply::TxState {
            auto_commit: true,
        }),
        "f" => Ok(Reply::TxState {
            auto_commit: false,
        }),
        _ => Err(ProtocolError::malformed_reply(
            "malformed transaction state",
            payload,
        )),
    }
}

fn parse_prepare(text: &str, payload: &[u8]) -> Result<Reply, ProtocolError> {
    let sections = split_sections(text, payload)?;

    // Header: `&5 <statement_id> <row_count> <col_count> <returned>`.
    let id = sections.header[2..]
        .split_whitespace()
        .next()
        .ok_or_else(|| ProtocolError::malformed_reply("missing statement id", payload))?
        .to_owned();

    let mut parameters = Vec::new();
    for line in &sections.rows {
        // Rows describing result columns of the prepared select carry a
        // schema/table/column triple; placeholders carry NULLs there.
        if !line.ends_with(PLACEHOLDER_SUFFIX) {
            continue;
        }
        let body = row_body(line, payload)?;
        let fields = split_row_values(body);
        let (type_field, digits_field) = match (fields.first(), fields.get(1)) {
            (Some(ty), Some(digits)) => (*ty, *digits),
            _ => {
                return Err(ProtocolError::malformed_reply(
                    "malformed parameter descriptor",
                    payload,
                ));
            }
        };

        let type_name = if type_field.starts_with('"') {
            unescape_text(type_field)
                .map_err(|e| ProtocolError::malformed_reply(e.to_string(), payload))?
        } else {
            type_field.to_owned()
        };
        let ty = ColumnType::from_name(&type_name)
            .map_err(|e| ProtocolError::malformed_reply(e.to_string(), payload))?;

        if ty.is_temporal() {
            let digits: i64 = digits_field.trim().parse().map_err(|_| {
                ProtocolError::malformed_reply("malformed parameter precision", payload)
            })?;
            // The server reports temporal precision off by one relative to
            // the form needed at exec time.
            let precision = (digits - 1).clamp(0, 9) as u8;
            parameters.push(ParamType::with_precision(ty, precision));
        } else {
            parameters.push(ParamType::plain(ty));
        }
    }

    Ok(Reply::Prepare(PrepareReply {
        id,
        parameters,
    }))
}
