use bytes::{Buf, BufMut};
use common::{DbError, DbResult, Row, RowId};
use types::Value;

const TAG_UNKNOWN: u8 = 0;
const TAG_INTEGER: u8 = 1;
const TAG_REAL: u8 = 2;
const TAG_TEXT: u8 = 3;
const TAG_BOOLEAN: u8 = 4;

fn corrupt(reason: impl Into<String>) -> DbError {
    DbError::CorruptRecord(reason.into())
}

/// Append one value as `{type_tag, null_flag, payload}`.
pub fn encode_value(value: &Value, out: &mut Vec<u8>) -> DbResult<()> {
    match value {
        Value::Null => {
            out.put_u8(TAG_UNKNOWN);
            out.put_u8(1);
        }
        Value::Integer(v) => {
            out.put_u8(TAG_INTEGER);
            out.put_u8(0);
            out.put_i64_le(*v);
        }
        Value::Real(v) => {
            out.put_u8(TAG_REAL);
            out.put_u8(0);
            out.put_f64_le(*v);
        }
        Value::Text(v) => {
            if v.len() > u16::MAX as usize {
                return Err(corrupt(format!(
                    "text value of {} bytes exceeds u16 length prefix",
                    v.len()
                )));
            }
            out.put_u8(TAG_TEXT);
            out.put_u8(0);
            out.put_u16_le(v.len() as u16);
            out.put_slice(v.as_bytes());
        }
        Value::Boolean(v) => {
            out.put_u8(TAG_BOOLEAN);
            out.put_u8(0);
            out.put_u8(u8::from(*v));
        }
    }
    Ok(())
}

fn decode_value(buf: &mut &[u8]) -> DbResult<Value> {
    if buf.remaining() < 2 {
        return Err(corrupt("truncated value header"));
    }
    let tag = buf.get_u8();
    let null_flag = buf.get_u8();
    if null_flag == 1 {
        return Ok(Value::Null);
    }

    match tag {
        TAG_INTEGER => {
            if buf.remaining() < 8 {
                return Err(corrupt("truncated integer payload"));
            }
            Ok(Value::Integer(buf.get_i64_le()))
        }
        TAG_REAL => {
            if buf.remaining() < 8 {
                return Err(corrupt("truncated real payload"));
            }
            Ok(Value::Real(buf.get_f64_le()))
        }
        TAG_TEXT => {
            if buf.remaining() < 2 {
                return Err(corrupt("truncated text length"));
            }
            let len = buf.get_u16_le() as usize;
            if buf.remaining() < len {
                return Err(corrupt("truncated text payload"));
            }
            let text = String::from_utf8(buf[..len].to_vec())
                .map_err(|e| corrupt(format!("text payload is not UTF-8: {e}")))?;
            buf.advance(len);
            Ok(Value::Text(text))
        }
        TAG_BOOLEAN => {
            if buf.remaining() < 1 {
                return Err(corrupt("truncated boolean payload"));
            }
            Ok(Value::Boolean(buf.get_u8() != 0))
        }
        other => Err(corrupt(format!("unknown non-null value tag {other}"))),
    }
}

/// Serialize a row as `{row_id u64, n_values u16, values...}`.
pub fn encode_row(row: &Row) -> DbResult<Vec<u8>> {
    if row.values.len() > u16::MAX as usize {
        return Err(corrupt("row has too many values"));
    }
    let mut out = Vec::with_capacity(16 + row.values.len() * 10);
    out.put_u64_le(row.id);
    out.put_u16_le(row.values.len() as u16);
    for value in &row.values {
        encode_value(value, &mut out)?;
    }
    Ok(out)
}

/// Parse a row image back into its id and values. Inverse of
/// [`encode_row`]; trailing bytes are rejected.
pub fn decode_row(bytes: &[u8]) -> DbResult<Row> {
    let mut buf = bytes;
    if buf.remaining() < 10 {
        return Err(corrupt("truncated row header"));
    }
    let id = buf.get_u64_le();
    let n_values = buf.get_u16_le() as usize;

    let mut values = Vec::with_capacity(n_values);
    for _ in 0..n_values {
        values.push(decode_value(&mut buf)?);
    }
    if buf.has_remaining() {
        return Err(corrupt(format!("{} trailing bytes after row", buf.remaining())));
    }
    Ok(Row::new(id, values))
}

/// Key bytes for a single value: the same codec as the row body, so a
/// primary-key value and its stored form never disagree.
pub fn value_key(value: &Value) -> DbResult<Vec<u8>> {
    let mut out = Vec::with_capacity(10);
    encode_value(value, &mut out)?;
    Ok(out)
}

/// Key bytes for a table without a primary key: the row id itself.
pub fn row_id_key(row_id: RowId) -> Vec<u8> {
    row_id.to_le_bytes().to_vec()
}
