//! BCI2000 `.dat` header parsing.
//!
//! This module handles:
//! - Parsing the first header line (lengths, channel count, sample format)
//! - Parsing the state vector definitions
//! - Parsing the parameter definitions
//! - Validating that every state fits inside the state vector

use std::collections::HashMap;
use std::io::{BufRead, Read};

use log::{debug, info, trace, warn};

use super::parameters;
use crate::bci2k::types::error::{Bci2kError, Result};
use crate::bci2k::types::models::{DataFormat, DatHeader, Parameters, StateDefinition};
use crate::bci2k::utils;

/// Upper bound on the first header line, to fail fast on non-BCI2000 input.
const MAX_FIRST_LINE: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    States,
    Parameters,
    Unknown,
}

/// Parses the header from the beginning of a `.dat` file.
///
/// # Header Structure
/// ```text
/// [BCI2000V= 1.1] HeaderLen= <n> SourceCh= <c> StatevectorLen= <s> [DataFormat= int16]\r\n
/// [ State Vector Definition ]\r\n
/// <Name> <Length> <Value> <ByteLocation> <BitLocation>\r\n ...
/// [ Parameter Definition ]\r\n
/// <parameter lines> ...
/// ```
/// `HeaderLen` counts every byte up to the first sample frame, including the
/// first line.
///
/// On return the reader is positioned at the first sample frame.
pub fn parse<R: BufRead>(file: &mut R) -> Result<DatHeader> {
    info!("Parsing BCI2000 header");

    // Step 1: First line with the fixed fields
    let mut first = Vec::new();
    file.by_ref().take(MAX_FIRST_LINE).read_until(b'\n', &mut first)?;
    if !first.ends_with(b"\n") {
        return Err(Bci2kError::InvalidFormat(
            "Header first line is missing or too long".to_string(),
        ));
    }
    let fields = parse_first_line(&utils::decode_header_text(&first));

    let header_len: u64 = required_field(&fields, "HeaderLen")?;
    let source_channels: usize = required_field(&fields, "SourceCh")?;
    let state_vector_len: usize = required_field(&fields, "StatevectorLen")?;
    let data_format = match fields.get("DataFormat") {
        Some(value) => DataFormat::try_from(value.as_str())?,
        None => DataFormat::Int16,
    };
    let file_version = fields.get("BCI2000V").cloned();
    debug!(
        "HeaderLen={} SourceCh={} StatevectorLen={} DataFormat={} version={:?}",
        header_len, source_channels, state_vector_len, data_format, file_version
    );

    // Step 2: Remaining header text
    let first_len = first.len() as u64;
    if header_len < first_len {
        return Err(Bci2kError::InvalidFormat(format!(
            "HeaderLen {} is shorter than the first header line ({} bytes)",
            header_len, first_len
        )));
    }
    let rest_len = header_len - first_len;
    let mut rest = Vec::new();
    file.by_ref().take(rest_len).read_to_end(&mut rest)?;
    if rest.len() as u64 != rest_len {
        return Err(Bci2kError::InvalidFormat(format!(
            "HeaderLen {} exceeds the {} header bytes available",
            header_len,
            first_len + rest.len() as u64
        )));
    }
    let text = utils::decode_header_text(&rest);

    // Step 3: Sections
    let mut states = Vec::new();
    let mut params = Parameters::new();
    let mut section = Section::None;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(title) = section_title(line) {
            section = match title.to_ascii_lowercase().as_str() {
                "state vector definition" => Section::States,
                "parameter definition" => Section::Parameters,
                other => {
                    warn!("Skipping unknown header section '{}'", other);
                    Section::Unknown
                }
            };
            continue;
        }
        match section {
            Section::States => states.push(parse_state_line(line)?),
            Section::Parameters => {
                let param = parameters::parse_line(line)?;
                if let Some(previous) = params.insert(param) {
                    warn!(
                        "Parameter '{}' defined twice; keeping the last definition",
                        previous.name
                    );
                }
            }
            Section::None => warn!("Ignoring header line outside any section: '{}'", line),
            Section::Unknown => trace!("Skipping line: '{}'", line),
        }
    }

    // Step 4: Validate frame and state layout
    let too_large = || {
        Bci2kError::InvalidFormat(format!(
            "Frame of {} channels plus {} state bytes is too large",
            source_channels, state_vector_len
        ))
    };
    source_channels
        .checked_mul(data_format.value_width())
        .and_then(|n| n.checked_add(state_vector_len))
        .ok_or_else(too_large)?;
    let vector_bits = state_vector_len.checked_mul(8).ok_or_else(too_large)?;
    for state in &states {
        if state.byte_location >= state_vector_len {
            return Err(Bci2kError::InvalidFormat(format!(
                "State '{}' starts at byte {} but the state vector has {} bytes",
                state.name, state.byte_location, state_vector_len
            )));
        }
        let end_bit = state.bit_offset().saturating_add(state.length as usize);
        if end_bit > vector_bits {
            return Err(Bci2kError::InvalidFormat(format!(
                "State '{}' ends at bit {} but the state vector has {} bits",
                state.name, end_bit, vector_bits
            )));
        }
    }

    info!(
        "Header parsed: {} channels, {} states, {} parameters, format {}",
        source_channels,
        states.len(),
        params.len(),
        data_format
    );

    Ok(DatHeader {
        file_version,
        header_len,
        source_channels,
        state_vector_len,
        data_format,
        states,
        parameters: params,
    })
}

/// Splits `Key= value` pairs. Both `Key= value` and `Key=value` occur.
fn parse_first_line(line: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let mut tokens = line.split_whitespace();
    while let Some(token) = tokens.next() {
        match token.split_once('=') {
            Some((key, "")) => {
                let value = tokens.next().unwrap_or_default();
                fields.insert(key.to_string(), value.to_string());
            }
            Some((key, value)) => {
                fields.insert(key.to_string(), value.to_string());
            }
            None => warn!("Unexpected token in header line: '{}'", token),
        }
    }
    fields
}

fn required_field<T: std::str::FromStr>(fields: &HashMap<String, String>, key: &str) -> Result<T> {
    let value = fields
        .get(key)
        .ok_or_else(|| Bci2kError::InvalidFormat(format!("Header is missing '{}='", key)))?;
    value
        .parse()
        .map_err(|_| Bci2kError::InvalidFormat(format!("Could not parse '{}={}'", key, value)))
}

fn section_title(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']').map(str::trim)
}

/// `Name Length Value ByteLocation BitLocation`
fn parse_state_line(line: &str) -> Result<StateDefinition> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 5 {
        return Err(Bci2kError::InvalidFormat(format!("Malformed state definition: '{}'", line)));
    }
    let number = |i: usize| -> Result<u64> {
        tokens[i]
            .parse::<u64>()
            .map_err(|_| {
                Bci2kError::InvalidFormat(format!("Malformed state definition: '{}'", line))
            })
    };
    let length = number(1)?;
    if length == 0 || length > 64 {
        return Err(Bci2kError::InvalidFormat(format!(
            "State '{}' has unsupported length {}",
            tokens[0], length
        )));
    }
    let byte_location = usize::try_from(number(3)?).map_err(|_| {
        Bci2kError::InvalidFormat(format!("State '{}' has byte location out of range", tokens[0]))
    })?;
    let bit_location = number(4)?;
    if bit_location > 7 {
        return Err(Bci2kError::InvalidFormat(format!(
            "State '{}' has bit location {} outside a byte",
            tokens[0], bit_location
        )));
    }
    Ok(StateDefinition {
        name: tokens[0].to_string(),
        length: length as u32,
        default_value: number(2)?,
        byte_location,
        bit_location: bit_location as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn with_header_len(body: &str) -> Vec<u8> {
        // The first line is padded so its length does not depend on HeaderLen.
        let first = |n: usize| {
            format!(
                "BCI2000V= 1.1 HeaderLen= {:>8} SourceCh= 2 StatevectorLen= 1 DataFormat= int32\r\n",
                n
            )
        };
        let total = first(0).len() + body.len();
        let mut bytes = first(total).into_bytes();
        bytes.extend_from_slice(body.as_bytes());
        bytes
    }

    #[test]
    fn parses_sections() {
        let body = "[ State Vector Definition ]\r\n\
                    Running 1 0 0 0\r\n\
                    StimulusCode 5 0 0 1\r\n\
                    [ Parameter Definition ]\r\n\
                    Source int SamplingRate= 512Hz // rate\r\n\
                    \r\n";
        let mut bytes = with_header_len(body);
        bytes.extend_from_slice(&[0xAA; 9]);
        let mut cursor = Cursor::new(bytes);

        let header = parse(&mut cursor).unwrap();
        assert_eq!(header.file_version.as_deref(), Some("1.1"));
        assert_eq!(header.source_channels, 2);
        assert_eq!(header.data_format, DataFormat::Int32);
        assert_eq!(header.frame_len(), 9);
        assert_eq!(header.states.len(), 2);
        assert_eq!(header.state("StimulusCode").unwrap().bit_offset(), 1);
        assert_eq!(header.parameters.get("SamplingRate").unwrap().as_f64(), Some(512.0));
        assert_eq!(cursor.position(), header.header_len);
    }

    #[test]
    fn state_outside_vector_is_rejected() {
        let body = "[ State Vector Definition ]\r\nWide 8 0 0 4\r\n";
        let err = parse(&mut Cursor::new(with_header_len(body))).unwrap_err();
        assert!(matches!(err, Bci2kError::InvalidFormat(_)));
    }

    #[test]
    fn oversized_header_len_is_rejected() {
        let bytes =
            b"HeaderLen= 18446744073709551000 SourceCh= 1 StatevectorLen= 1\r\n[ State".to_vec();
        let err = parse(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Bci2kError::InvalidFormat(_)));
    }

    #[test]
    fn state_fields_are_checked_before_narrowing() {
        // 2^32 + 1 would become 1 if truncated to u32.
        let body = "[ State Vector Definition ]\r\nHuge 4294967297 0 0 0\r\n";
        let err = parse(&mut Cursor::new(with_header_len(body))).unwrap_err();
        assert!(matches!(err, Bci2kError::InvalidFormat(_)));

        let body = "[ State Vector Definition ]\r\nFar 1 0 18446744073709551615 0\r\n";
        let err = parse(&mut Cursor::new(with_header_len(body))).unwrap_err();
        assert!(matches!(err, Bci2kError::InvalidFormat(_)));
    }

    #[test]
    fn first_line_variants() {
        let fields = parse_first_line("HeaderLen=100 SourceCh= 4 StatevectorLen= 2");
        assert_eq!(fields["HeaderLen"], "100");
        assert_eq!(fields["SourceCh"], "4");
        assert!(fields.get("DataFormat").is_none());
    }

    #[test]
    fn missing_fields_and_bad_format() {
        let err =
            parse(&mut Cursor::new(b"SourceCh= 1 StatevectorLen= 1\r\n".to_vec())).unwrap_err();
        assert!(matches!(err, Bci2kError::InvalidFormat(_)));
        let err = parse(&mut Cursor::new(
            b"HeaderLen= 60 SourceCh= 1 StatevectorLen= 1 DataFormat= float64\r\n".to_vec(),
        ))
        .unwrap_err();
        assert!(matches!(err, Bci2kError::UnsupportedDataFormat(_)));
    }
}
