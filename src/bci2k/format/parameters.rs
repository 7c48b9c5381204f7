//! Parsing of `[ Parameter Definition ]` lines.
//!
//! # Line Layout
//! ```text
//! Section:Sub%20Section  DataType  Name= <values...>  [default low high]  // comment
//! ```
//!
//! - scalar types (`int`, `float`, `string`, ...) carry one value,
//! - `*list` types carry a count followed by that many values,
//! - `matrix` carries a row spec and a column spec (a count or `{ labels }`)
//!   followed by the row-major values.
//!
//! Tokens are `%XX`-escaped. Anything after the structured value (default,
//! range) is ignored.

use log::{trace, warn};

use crate::bci2k::types::error::{Bci2kError, Result};
use crate::bci2k::types::models::{ParamValue, Parameter};
use crate::bci2k::utils::percent_decode;

/// Parses one parameter line.
///
/// A line whose value layout cannot be structured (e.g. nested sub-matrices)
/// is kept with [`ParamValue::Raw`] tokens instead of failing the header.
pub fn parse_line(line: &str) -> Result<Parameter> {
    let (decl, comment) = match line.find(" //") {
        Some(pos) => (&line[..pos], Some(line[pos + 3..].trim().to_string())),
        None => (line, None),
    };
    let tokens: Vec<&str> = decl.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(Bci2kError::InvalidFormat(format!("Parameter line too short: '{}'", line)));
    }

    let section = percent_decode(tokens[0]);
    let data_type = tokens[1].to_string();
    let (name, first_value) = tokens[2].split_once('=').ok_or_else(|| {
        Bci2kError::InvalidFormat(format!("Parameter name must end with '=': '{}'", tokens[2]))
    })?;

    let mut values: Vec<&str> = Vec::with_capacity(tokens.len() - 2);
    if !first_value.is_empty() {
        values.push(first_value);
    }
    values.extend_from_slice(&tokens[3..]);

    let value = match parse_value(&data_type, &values) {
        Ok(value) => value,
        Err(e) => {
            warn!("Keeping parameter '{}' as raw tokens: {}", name, e);
            ParamValue::Raw(values.iter().map(|t| percent_decode(t)).collect())
        }
    };
    trace!("Parameter {} ({}) = {:?}", name, data_type, value);

    Ok(Parameter {
        section,
        data_type,
        name: name.to_string(),
        value,
        comment: comment.filter(|c| !c.is_empty()),
    })
}

fn parse_value(data_type: &str, values: &[&str]) -> Result<ParamValue> {
    let mut cursor = TokenCursor { tokens: values, pos: 0 };
    if data_type.ends_with("list") {
        let (count, _) = cursor.dimension()?;
        Ok(ParamValue::List(cursor.take_values(count)?))
    } else if data_type == "matrix" {
        let (rows, row_labels) = cursor.dimension()?;
        let (cols, col_labels) = cursor.dimension()?;
        let values = cursor.take_values(rows * cols)?;
        Ok(ParamValue::Matrix { rows, cols, row_labels, col_labels, values })
    } else {
        Ok(ParamValue::Scalar(values.first().map(|t| percent_decode(t)).unwrap_or_default()))
    }
}

struct TokenCursor<'a> {
    tokens: &'a [&'a str],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    fn next(&mut self) -> Result<&'a str> {
        let token = self
            .tokens
            .get(self.pos)
            .copied()
            .ok_or_else(|| Bci2kError::InvalidFormat("Parameter value ends early".to_string()))?;
        self.pos += 1;
        Ok(token)
    }

    /// A count, or a `{ label ... }` block whose length is the count.
    fn dimension(&mut self) -> Result<(usize, Vec<String>)> {
        let token = self.next()?;
        if token == "{" {
            let mut labels = Vec::new();
            loop {
                match self.next()? {
                    "}" => break,
                    label => labels.push(percent_decode(label)),
                }
            }
            return Ok((labels.len(), labels));
        }
        let count = token
            .parse::<usize>()
            .map_err(|_| {
                Bci2kError::InvalidFormat(format!("Expected a count, found '{}'", token))
            })?;
        Ok((count, Vec::new()))
    }

    fn take_values(&mut self, count: usize) -> Result<Vec<String>> {
        (0..count)
            .map(|_| match self.next()? {
                "{" => Err(Bci2kError::InvalidFormat(
                    "Nested matrices are not supported".to_string(),
                )),
                token => Ok(percent_decode(token)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_with_unit_and_comment() {
        let line = concat!(
            "Source:Signal%20Properties:DataIOFilter int SamplingRate= 256Hz 256Hz 0.0 % ",
            "// sample rate"
        );
        let p = parse_line(line).unwrap();
        assert_eq!(p.section, "Source:Signal Properties:DataIOFilter");
        assert_eq!(p.name, "SamplingRate");
        assert_eq!(p.value, ParamValue::Scalar("256Hz".to_string()));
        assert_eq!(p.as_f64(), Some(256.0));
        assert_eq!(p.comment.as_deref(), Some("sample rate"));
    }

    #[test]
    fn list_takes_declared_count() {
        let p = parse_line("Source floatlist SourceChGain= 3 0.003 0.003muV 1 0.0 % %").unwrap();
        assert_eq!(p.as_f64_list(), Some(vec![0.003, 0.003, 1.0]));
    }

    #[test]
    fn matrix_with_labels() {
        let p = parse_line("Application matrix Targets= { a b } 2 1 2 3 4 // targets").unwrap();
        match p.value {
            ParamValue::Matrix { rows, cols, row_labels, values, .. } => {
                assert_eq!((rows, cols), (2, 2));
                assert_eq!(row_labels, vec!["a", "b"]);
                assert_eq!(values, vec!["1", "2", "3", "4"]);
            }
            other => panic!("expected matrix, got {:?}", other),
        }
    }

    #[test]
    fn empty_value_and_attached_value() {
        let p = parse_line("Storage string SubjectName= % // name").unwrap();
        assert_eq!(p.value, ParamValue::Scalar(String::new()));
        let p = parse_line("Storage int SubjectRun=07").unwrap();
        assert_eq!(p.value, ParamValue::Scalar("07".to_string()));
        assert_eq!(p.comment, None);
    }

    #[test]
    fn unstructured_value_falls_back_to_raw() {
        let p = parse_line("Filter matrix Nested= 1 1 { matrix 1 1 5 }").unwrap();
        assert!(matches!(p.value, ParamValue::Raw(_)));
        let p = parse_line("Source intlist Short= 3 1 2").unwrap();
        assert_eq!(p.value, ParamValue::Raw(vec!["3".into(), "1".into(), "2".into()]));
    }

    #[test]
    fn malformed_lines_fail() {
        assert!(parse_line("Source int").is_err());
        assert!(parse_line("Source int NoEquals 5").is_err());
    }
}
