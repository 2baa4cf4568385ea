use std::fmt;
use std::ops::Index;

use serde::Serialize;
use serde_json::Value;

pub const ROW_WIDTH: usize = 7;
pub const LONG_TEXT_COLUMN: usize = 6;
pub const LONG_TEXT_PLACEHOLDER: &str = "...";

// column 0 is the record id, the rest are dserve field numbers
pub const COLUMN_TITLES: [&str; ROW_WIDTH] = ["id", "0", "1", "2", "3", "4", "5"];

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self(n.to_string())),
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// one item of a search result; with showid=yes dserve puts the record id in field 0
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<Value>,
}

impl Record {
    pub fn new(fields: Vec<Value>) -> Self {
        Self { fields }
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(fields) => Self { fields },
            Value::Object(map) => Self {
                fields: map.into_iter().map(|(_, v)| v).collect(),
            },
            other => Self {
                fields: vec![other],
            },
        }
    }

    pub fn field(&self, idx: usize) -> Option<&Value> {
        match self.fields.get(idx) {
            Some(Value::Null) | None => None,
            Some(v) => Some(v),
        }
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn id(&self) -> Option<RecordId> {
        self.fields.first().and_then(RecordId::from_value)
    }
}

/// Enumerates a response payload the way the page did: array elements in
/// order, or the values of a top-level object in document order.
pub fn records_from_payload(payload: Value) -> Vec<Record> {
    match payload {
        Value::Array(items) => items.into_iter().map(Record::from_value).collect(),
        Value::Object(map) => map.into_iter().map(|(_, v)| Record::from_value(v)).collect(),
        Value::Null => Vec::new(),
        other => vec![Record::from_value(other)],
    }
}

// whole doubles print without a fraction, as `2.000000` reads in the page
fn display_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{f:.0}")
        }
        _ => n.to_string(),
    }
}

pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => display_number(n),
        Some(Value::Bool(b)) => b.to_string(),
        Some(nested) => serde_json::to_string(nested).unwrap_or_default(),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NormalizedRow([String; ROW_WIDTH]);

impl NormalizedRow {
    pub fn from_record(record: &Record) -> Self {
        let mut cells: [String; ROW_WIDTH] = Default::default();
        for (j, cell) in cells.iter_mut().enumerate() {
            *cell = display_value(record.field(j));
        }
        // field 6 only ever shows whether a value is present
        cells[LONG_TEXT_COLUMN] = if record.field(LONG_TEXT_COLUMN).is_some() {
            LONG_TEXT_PLACEHOLDER.to_string()
        } else {
            String::new()
        };
        Self(cells)
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        ROW_WIDTH
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Index<usize> for NormalizedRow {
    type Output = String;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.0[idx]
    }
}

pub fn normalize(records: &[Record]) -> Vec<NormalizedRow> {
    records.iter().map(NormalizedRow::from_record).collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Row {
    pub id: Option<RecordId>,
    pub cells: NormalizedRow,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowSet {
    rows: Vec<Row>,
}

impl RowSet {
    pub fn from_records(records: &[Record]) -> Self {
        let rows = records
            .iter()
            .zip(normalize(records))
            .map(|(record, cells)| Row {
                id: record.id(),
                cells,
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get(&self, idx: usize) -> Option<&Row> {
        self.rows.get(idx)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Record {
        Record::from_value(value)
    }

    fn cells(row: &NormalizedRow) -> Vec<&str> {
        row.iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn null_field_becomes_empty_and_long_text_is_masked() {
        let rows = normalize(&[record(json!(["a", null, "c", "d", "e", "f", "g"]))]);
        assert_eq!(cells(&rows[0]), vec!["a", "", "c", "d", "e", "f", "..."]);
    }

    #[test]
    fn short_record_is_padded() {
        let rows = normalize(&[record(json!(["a", "b"]))]);
        assert_eq!(cells(&rows[0]), vec!["a", "b", "", "", "", "", ""]);
    }

    #[test]
    fn null_long_text_stays_empty() {
        let rows = normalize(&[record(json!([1, 2, 3, 4, 5, 6, null, 8]))]);
        assert_eq!(rows[0][6], "");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let rows = normalize(&[record(json!([0, 1, 2, 3, 4, 5, "long text", "x", "y"]))]);
        assert_eq!(rows[0].len(), ROW_WIDTH);
        assert_eq!(rows[0][6], "...");
        assert_eq!(rows[0][5], "5");
    }

    #[test]
    fn empty_input_gives_no_rows() {
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn one_row_per_record_with_fixed_width() {
        let records = vec![
            record(json!([])),
            record(json!(["only"])),
            record(json!([1, 2, 3, 4, 5, 6, 7, 8, 9, 10])),
        ];
        let rows = normalize(&records);
        assert_eq!(rows.len(), records.len());
        assert!(rows.iter().all(|r| r.cells().len() == ROW_WIDTH));
    }

    #[test]
    fn leading_fields_keep_display_value() {
        let r = record(json!([12, "name", 3.5, true, [1, 2], {"k": "v"}, "body"]));
        let rows = normalize(std::slice::from_ref(&r));
        for j in 0..LONG_TEXT_COLUMN {
            assert_eq!(rows[0][j], display_value(r.field(j)));
        }
        assert_eq!(rows[0][3], "true");
        assert_eq!(rows[0][4], "[1,2]");
        assert_eq!(rows[0][5], r#"{"k":"v"}"#);
    }

    #[test]
    fn whole_doubles_drop_the_fraction() {
        let payload: Value = serde_json::from_str("[[1, 3.000000, 2.500000, -4.0, 0.0]]").unwrap();
        let rows = normalize(&records_from_payload(payload));
        assert_eq!(cells(&rows[0]), vec!["1", "3", "2.5", "-4", "0", "", ""]);
    }

    #[test]
    fn payload_object_is_enumerated_by_value() {
        let records = records_from_payload(json!({"a": [1, "x"], "b": [2, "y"]}));
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id(), Some(RecordId::new("2")));
    }

    #[test]
    fn row_set_keeps_record_ids() {
        let records = records_from_payload(json!([[42, "a"], [null, "b"], ["  ", "c"]]));
        let set = RowSet::from_records(&records);
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(0).and_then(|r| r.id.clone()), Some(RecordId::new("42")));
        assert_eq!(set.get(1).and_then(|r| r.id.clone()), None);
        assert_eq!(set.get(2).and_then(|r| r.id.clone()), None);
    }
}
