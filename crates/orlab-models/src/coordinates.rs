//! Reader for TSPLIB-style instance files.
//!
//! Header lines are `KEY: VALUE` pairs. Data follows either a
//! `NODE_COORD_SECTION` (records `<id> <x> <y>`, ids contiguous from 1) or an
//! `EDGE_WEIGHT_SECTION` (explicit weights, `LOWER_DIAG_ROW` or
//! `FULL_MATRIX`). A literal `EOF` line or an empty line ends the section.

use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::distance::DistanceMatrix;
use crate::error::ModelError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Line {line}: invalid number '{value}'")]
    InvalidNumber { line: usize, value: String },
    #[error("Line {line}: expected node id {expected}, found {found}")]
    NonContiguousId {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Line {line}: unexpected content '{content}'")]
    UnexpectedLine { line: usize, content: String },
    #[error("Invalid header {key}: '{value}'")]
    InvalidHeader { key: String, value: String },
    #[error("No NODE_COORD_SECTION or EDGE_WEIGHT_SECTION found")]
    MissingSection,
    #[error("EDGE_WEIGHT_SECTION requires a DIMENSION header")]
    MissingDimension,
    #[error("Unsupported edge weight format: {0}")]
    UnsupportedFormat(String),
    #[error("DIMENSION is {expected} but {found} nodes were listed")]
    NodeCount { expected: usize, found: usize },
    #[error("Expected {expected} edge weights, found {found}")]
    WeightCount { expected: usize, found: usize },
}

/// A node position; `index` is the zero-based form of the file's id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub index: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstanceData {
    Coordinates(Vec<Point>),
    ExplicitWeights(Vec<Vec<f64>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TspInstance {
    pub name: Option<String>,
    pub dimension: Option<usize>,
    /// All header pairs in file order
    pub headers: Vec<(String, String)>,
    pub data: InstanceData,
}

impl TspInstance {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        match &self.data {
            InstanceData::Coordinates(points) => points.len(),
            InstanceData::ExplicitWeights(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn distance_matrix(&self) -> DistanceMatrix {
        match &self.data {
            InstanceData::Coordinates(points) => DistanceMatrix::from_points(points),
            InstanceData::ExplicitWeights(rows) => DistanceMatrix::from_square(rows.clone()),
        }
    }
}

enum Section {
    Coordinates,
    Weights,
}

pub fn read_file(path: impl AsRef<Path>) -> Result<TspInstance, ModelError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .map_err(|e| ModelError::IoError(format!("{}: {}", path.display(), e)))?;
    Ok(parse(&source)?)
}

pub fn parse(source: &str) -> Result<TspInstance, ParseError> {
    let mut lines = source.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));
    let mut headers = Vec::new();

    let section = loop {
        let Some((line_no, line)) = lines.next() else {
            return Err(ParseError::MissingSection);
        };
        if line.is_empty() {
            continue;
        }
        if line.starts_with("NODE_COORD_SECTION") {
            break Section::Coordinates;
        }
        if line.starts_with("EDGE_WEIGHT_SECTION") {
            break Section::Weights;
        }
        if line == "EOF" {
            return Err(ParseError::MissingSection);
        }
        match line.split_once(':') {
            Some((key, value)) => headers.push((key.trim().to_string(), value.trim().to_string())),
            None => {
                return Err(ParseError::UnexpectedLine {
                    line: line_no,
                    content: line.to_string(),
                });
            }
        }
    };

    let find = |key: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.clone())
    };
    let name = find("NAME");
    let dimension = match find("DIMENSION") {
        Some(v) => Some(v.parse::<usize>().map_err(|_| ParseError::InvalidHeader {
            key: "DIMENSION".to_string(),
            value: v.clone(),
        })?),
        None => None,
    };

    let body = lines.take_while(|(_, l)| !l.is_empty() && *l != "EOF");
    let data = match section {
        Section::Coordinates => {
            let points = parse_coordinates(body)?;
            if let Some(n) = dimension.filter(|n| *n != points.len()) {
                return Err(ParseError::NodeCount {
                    expected: n,
                    found: points.len(),
                });
            }
            InstanceData::Coordinates(points)
        }
        Section::Weights => {
            let n = dimension.ok_or(ParseError::MissingDimension)?;
            let format = find("EDGE_WEIGHT_FORMAT").unwrap_or_else(|| "LOWER_DIAG_ROW".to_string());
            InstanceData::ExplicitWeights(parse_weights(body, n, &format)?)
        }
    };

    let instance = TspInstance {
        name,
        dimension,
        headers,
        data,
    };
    debug!("parsed instance with {} nodes", instance.len());
    Ok(instance)
}

fn parse_number(line: usize, field: &str) -> Result<f64, ParseError> {
    field.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
        line,
        value: field.to_string(),
    })
}

fn parse_coordinates<'a>(lines: impl Iterator<Item = (usize, &'a str)>) -> Result<Vec<Point>, ParseError> {
    let mut points = Vec::new();
    for (line_no, line) in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(ParseError::FieldCount {
                line: line_no,
                expected: 3,
                found: fields.len(),
            });
        }

        let id = fields[0].parse::<usize>().map_err(|_| ParseError::InvalidNumber {
            line: line_no,
            value: fields[0].to_string(),
        })?;
        let expected = points.len() + 1;
        if id != expected {
            return Err(ParseError::NonContiguousId {
                line: line_no,
                expected,
                found: id,
            });
        }

        points.push(Point {
            index: id - 1,
            x: parse_number(line_no, fields[1])?,
            y: parse_number(line_no, fields[2])?,
        });
    }
    Ok(points)
}

fn parse_weights<'a>(
    lines: impl Iterator<Item = (usize, &'a str)>,
    n: usize,
    format: &str,
) -> Result<Vec<Vec<f64>>, ParseError> {
    let mut values = Vec::new();
    for (line_no, line) in lines {
        for field in line.split_whitespace() {
            values.push(parse_number(line_no, field)?);
        }
    }

    let mut matrix = vec![vec![0.0; n]; n];
    match format {
        "LOWER_DIAG_ROW" => {
            let expected = n * (n + 1) / 2;
            if values.len() != expected {
                return Err(ParseError::WeightCount {
                    expected,
                    found: values.len(),
                });
            }
            let mut it = values.into_iter();
            for i in 0..n {
                for j in 0..=i {
                    let v = it.next().unwrap_or_default();
                    matrix[i][j] = v;
                    matrix[j][i] = v;
                }
            }
        }
        "FULL_MATRIX" => {
            if values.len() != n * n {
                return Err(ParseError::WeightCount {
                    expected: n * n,
                    found: values.len(),
                });
            }
            for (k, v) in values.into_iter().enumerate() {
                matrix[k / n][k % n] = v;
            }
        }
        other => return Err(ParseError::UnsupportedFormat(other.to_string())),
    }
    Ok(matrix)
}
