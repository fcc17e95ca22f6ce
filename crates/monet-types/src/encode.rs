//! Parameter literal encoding.
//!
//! Exec arguments travel to the server as SQL literals inside
//! `exec <id>(...)`. Each [`Value`] variant has exactly one literal form;
//! temporal literals additionally echo the sub-second precision the
//! prepare reply declared for their placeholder.

use std::fmt::Write as _;

use crate::column::ParamType;
use crate::error::TypeError;
use crate::value::Value;

/// Encode a full argument list as `arg1,arg2,…`.
///
/// A value list shorter than the parameter list is encoded as-is; the
/// server surfaces the arity error.
pub fn encode_args(values: &[Value], params: &[ParamType]) -> Result<String, TypeError> {
    let mut out = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        encode_param(&mut out, value, params.get(i))?;
    }
    Ok(out)
}

/// Encode one value as a SQL literal, appending to `out`.
pub fn encode_param(
    out: &mut String,
    value: &Value,
    param: Option<&ParamType>,
) -> Result<(), TypeError> {
    match value {
        Value::Null => out.push_str("NULL"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::TinyInt(v) => write_display(out, v),
        Value::SmallInt(v) => write_display(out, v),
        Value::Int(v) => write_display(out, v),
        Value::BigInt(v) => write_display(out, v),
        Value::HugeInt(v) => write_display(out, v),
        // f64 Display is shortest-roundtrip, so full precision survives.
        Value::Double(v) => write_display(out, v),
        Value::Decimal(v) => write_display(out, v),
        Value::Text(v) => push_quoted(out, v),
        Value::Json(v) => {
            serde_json::from_str::<serde_json::Value>(v)
                .map_err(|_| TypeError::MalformedValue {
                    type_name: "json",
                    raw: v.clone(),
                })?;
            out.push_str("json ");
            push_quoted(out, v);
        }
        Value::Blob(v) => {
            out.push_str("blob '");
            out.push_str(&hex::encode_upper(v));
            out.push('\'');
        }
        Value::Uuid(v) => {
            out.push_str("uuid '");
            write_display(out, v);
            out.push('\'');
        }
        Value::Date(v) => {
            out.push_str("date '");
            let _ = write!(out, "{}", v.format("%Y-%m-%d"));
            out.push('\'');
        }
        Value::Time(v) => {
            push_temporal_prefix(out, "time", param);
            let _ = match precision_of(param) {
                Some(3) => write!(out, "{}", v.format("%H:%M:%S%.3f")),
                Some(6) => write!(out, "{}", v.format("%H:%M:%S%.6f")),
                Some(_) => write!(out, "{}", v.format("%H:%M:%S")),
                None => write!(out, "{}", v.format("%H:%M:%S%.f")),
            };
            out.push('\'');
        }
        Value::Timestamp(v) => {
            push_temporal_prefix(out, "timestamp", param);
            let _ = match precision_of(param) {
                Some(3) => write!(out, "{}", v.format("%Y-%m-%d %H:%M:%S%.3f")),
                Some(6) => write!(out, "{}", v.format("%Y-%m-%d %H:%M:%S%.6f")),
                Some(_) => write!(out, "{}", v.format("%Y-%m-%d %H:%M:%S")),
                None => write!(out, "{}", v.format("%Y-%m-%d %H:%M:%S%.f")),
            };
            out.push('\'');
        }
        Value::TimestampTz(v) => {
            push_temporal_prefix(out, "timestamptz", param);
            let _ = match precision_of(param) {
                Some(3) => write!(out, "{}", v.format("%Y-%m-%d %H:%M:%S%.3f%:z")),
                Some(6) => write!(out, "{}", v.format("%Y-%m-%d %H:%M:%S%.6f%:z")),
                Some(_) => write!(out, "{}", v.format("%Y-%m-%d %H:%M:%S%:z")),
                None => write!(out, "{}", v.format("%Y-%m-%d %H:%M:%S%.f%:z")),
            };
            out.push('\'');
        }
    }
    Ok(())
}

fn write_display(out: &mut String, value: impl std::fmt::Display) {
    let _ = write!(out, "{value}");
}

/// Append `'...'` with `\` and `'` backslash-escaped.
fn push_quoted(out: &mut String, text: &str) {
    out.push('\'');
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out.push('\'');
}

/// Append `time `, `time(3) `, … including the opening quote.
fn push_temporal_prefix(out: &mut String, keyword: &str, param: Option<&ParamType>) {
    out.push_str(keyword);
    if let Some(p @ 1..) = precision_of(param) {
        let _ = write!(out, "({p})");
    }
    out.push_str(" '");
}

fn precision_of(param: Option<&ParamType>) -> Option<u8> {
    param.and_then(|p| p.precision)
}
