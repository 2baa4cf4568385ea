use thiserror::Error;
use url::form_urlencoded;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid compare '{value}', expected equal, not_equal, lessthan, greater, ltequal or gtequal")]
    InvalidCompare { value: String },

    #[error("invalid type '{value}', expected null, int, record, double, str or char")]
    InvalidType { value: String },

    #[error("invalid {field} '{value}', expected a non-negative integer")]
    NotANumber { field: &'static str, value: String },

    #[error("value '{value}' is not a valid {value_type}")]
    InvalidValue {
        value_type: &'static str,
        value: String,
    },
}

/// Drops `key=` pairs whose value is empty from a serialized form string.
/// Segments without `=` are kept as they are.
pub fn strip_empty_params(raw: &str) -> String {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| match pair.split_once('=') {
            Some((_, value)) => !value.is_empty(),
            None => true,
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Query pairs for a search. A key parsed from a segment without `=` is
/// kept as a bare key and serialized without a value.
#[derive(Clone, Debug, Default)]
pub struct FilterParams {
    pairs: Vec<(String, Option<String>)>,
}

// empty-valued pairs never reach the wire, so they do not count
impl PartialEq for FilterParams {
    fn eq(&self, other: &Self) -> bool {
        self.pairs().eq(other.pairs())
    }
}

impl Eq for FilterParams {}

fn parse_segment(segment: &str) -> Option<(String, Option<String>)> {
    let bare = !segment.contains('=');
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(k, v)| (k.into_owned(), (!bare).then(|| v.into_owned())))
}

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Self {
        let raw = strip_empty_params(raw.trim().trim_start_matches('?'));
        let pairs = raw
            .split('&')
            .filter_map(parse_segment)
            .collect();
        Self { pairs }
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), Some(value.into())));
    }

    pub fn extend(&mut self, other: FilterParams) {
        self.pairs.extend(other.pairs);
    }

    /// Pairs that reach the wire: `None` marks a bare key.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.pairs
            .iter()
            .filter(|(k, v)| !k.is_empty() && v.as_ref().map_or(true, |v| !v.is_empty()))
            .map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs().next().is_none()
    }

    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        for (k, v) in self.pairs() {
            match v {
                Some(v) => out.append_pair(k, v),
                None => out.append_key_only(k),
            };
        }
        out.finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compare {
    Equal,
    NotEqual,
    LessThan,
    Greater,
    LtEqual,
    GtEqual,
}

impl Compare {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "equal" => Some(Self::Equal),
            "not_equal" => Some(Self::NotEqual),
            "lessthan" => Some(Self::LessThan),
            "greater" => Some(Self::Greater),
            "ltequal" => Some(Self::LtEqual),
            "gtequal" => Some(Self::GtEqual),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::LessThan => "lessthan",
            Self::Greater => "greater",
            Self::LtEqual => "ltequal",
            Self::GtEqual => "gtequal",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    Null,
    Int,
    Record,
    Double,
    Str,
    Char,
}

impl ValueType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "null" => Some(Self::Null),
            "int" => Some(Self::Int),
            "record" => Some(Self::Record),
            "double" => Some(Self::Double),
            "str" => Some(Self::Str),
            "char" => Some(Self::Char),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int => "int",
            Self::Record => "record",
            Self::Double => "double",
            Self::Str => "str",
            Self::Char => "char",
        }
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Int | Self::Record => is_digits(value),
            Self::Double => is_decimal(value),
            Self::Null | Self::Str | Self::Char => true,
        }
    }
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

fn is_decimal(value: &str) -> bool {
    let mut periods = 0;
    for c in value.chars() {
        if c == '.' {
            periods += 1;
        } else if !c.is_ascii_digit() {
            return false;
        }
    }
    !value.is_empty() && periods <= 1
}

/// The search form: every field is kept as typed so it can be edited in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchForm {
    pub fld: String,
    pub compare: String,
    pub value_type: String,
    pub value: String,
    pub from: String,
    pub count: String,
    pub recids: String,
}

impl SearchForm {
    pub const LABELS: [&'static str; 7] = [
        "Field", "Compare", "Type", "Value", "From", "Count", "Record ids",
    ];
    pub const KEYS: [&'static str; 7] =
        ["fld", "compare", "type", "value", "from", "count", "recids"];

    pub fn values(&self) -> [&str; 7] {
        [
            self.fld.as_str(),
            self.compare.as_str(),
            self.value_type.as_str(),
            self.value.as_str(),
            self.from.as_str(),
            self.count.as_str(),
            self.recids.as_str(),
        ]
    }

    pub fn field_mut(&mut self, idx: usize) -> Option<&mut String> {
        match idx {
            0 => Some(&mut self.fld),
            1 => Some(&mut self.compare),
            2 => Some(&mut self.value_type),
            3 => Some(&mut self.value),
            4 => Some(&mut self.from),
            5 => Some(&mut self.count),
            6 => Some(&mut self.recids),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        for (field, raw) in [("fld", &self.fld), ("from", &self.from), ("count", &self.count)] {
            let raw = raw.trim();
            if !raw.is_empty() && !is_digits(raw) {
                return Err(FilterError::NotANumber {
                    field,
                    value: raw.to_string(),
                });
            }
        }
        for id in self.recids.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
            if !is_digits(id) {
                return Err(FilterError::NotANumber {
                    field: "recids",
                    value: id.to_string(),
                });
            }
        }
        let compare = self.compare.trim();
        if !compare.is_empty() && Compare::parse(compare).is_none() {
            return Err(FilterError::InvalidCompare {
                value: compare.to_string(),
            });
        }
        let value_type = self.value_type.trim();
        if value_type.is_empty() {
            return Ok(());
        }
        let parsed = ValueType::parse(value_type).ok_or_else(|| FilterError::InvalidType {
            value: value_type.to_string(),
        })?;
        if !self.value.is_empty() && !parsed.accepts(&self.value) {
            return Err(FilterError::InvalidValue {
                value_type: parsed.as_str(),
                value: self.value.clone(),
            });
        }
        Ok(())
    }

    pub fn to_params(&self) -> FilterParams {
        let mut params = FilterParams::new();
        for (key, value) in Self::KEYS.iter().zip(self.values()) {
            let value = if *key == "value" { value } else { value.trim() };
            params.push(*key, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_empty_valued_pairs() {
        assert_eq!(strip_empty_params("foo=&bar=baz&empty="), "bar=baz");
    }

    #[test]
    fn strips_empty_pair_between_two_values() {
        assert_eq!(strip_empty_params("a=1&b=&c=2"), "a=1&c=2");
        assert_eq!(strip_empty_params("a=&b="), "");
        assert_eq!(strip_empty_params("flag&x=1"), "flag&x=1");
    }

    #[test]
    fn params_serialize_without_empty_values() {
        let params = FilterParams::parse("foo=&bar=baz&empty=");
        assert_eq!(params.to_query_string(), "bar=baz");
        assert!(!params.is_empty());
        assert!(FilterParams::parse("foo=&empty=").is_empty());
    }

    #[test]
    fn params_roundtrip_encoded_values() {
        let params = FilterParams::parse("value=hello+world&fld=2");
        let pairs: Vec<_> = params.pairs().collect();
        assert_eq!(
            pairs,
            vec![("value", Some("hello world")), ("fld", Some("2"))]
        );
        assert_eq!(params.to_query_string(), "value=hello+world&fld=2");
    }

    #[test]
    fn bare_keys_are_kept_without_a_value() {
        let params = FilterParams::parse("flag&x=1&y=");
        let pairs: Vec<_> = params.pairs().collect();
        assert_eq!(pairs, vec![("flag", None), ("x", Some("1"))]);
        assert_eq!(params.to_query_string(), "flag&x=1");
        assert_ne!(params, FilterParams::parse("flag=&x=1"));
    }

    #[test]
    fn search_form_serializes_filled_fields_only() {
        let form = SearchForm {
            fld: "1".to_string(),
            compare: "greater".to_string(),
            value: "10".to_string(),
            value_type: "int".to_string(),
            ..Default::default()
        };
        assert!(form.validate().is_ok());
        assert_eq!(
            form.to_params().to_query_string(),
            "fld=1&compare=greater&type=int&value=10"
        );
    }

    #[test]
    fn search_form_rejects_unknown_compare_and_type() {
        let form = SearchForm {
            compare: "like".to_string(),
            ..Default::default()
        };
        assert!(matches!(form.validate(), Err(FilterError::InvalidCompare { .. })));

        let form = SearchForm {
            value_type: "bool".to_string(),
            ..Default::default()
        };
        assert!(matches!(form.validate(), Err(FilterError::InvalidType { .. })));
    }

    #[test]
    fn search_form_checks_values_against_type() {
        let form = SearchForm {
            value_type: "int".to_string(),
            value: "1.5".to_string(),
            ..Default::default()
        };
        assert!(matches!(form.validate(), Err(FilterError::InvalidValue { .. })));

        let form = SearchForm {
            value_type: "double".to_string(),
            value: "1.5".to_string(),
            ..Default::default()
        };
        assert!(form.validate().is_ok());

        let form = SearchForm {
            value_type: "double".to_string(),
            value: "1.5.2".to_string(),
            ..Default::default()
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn search_form_rejects_non_numeric_paging() {
        let form = SearchForm {
            count: "ten".to_string(),
            ..Default::default()
        };
        assert_eq!(
            form.validate(),
            Err(FilterError::NotANumber {
                field: "count",
                value: "ten".to_string()
            })
        );
    }
}
