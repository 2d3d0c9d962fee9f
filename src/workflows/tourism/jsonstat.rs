//! JSON-stat cube decoding.
//!
//! Values in a JSON-stat export are a flat array in row-major order over the
//! dimensions listed in `id`, the last dimension varying fastest. Instead of
//! assuming a nesting order we resolve every flat index to its coordinates
//! through the declared `id`/`size` arrays and the per-dimension category index.

use super::domain::{TourismRecord, TourismSchema, YearMonth};
use super::TourismError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Dimension {
    pub(crate) id: String,
    pub(crate) codes: Vec<String>,
    pub(crate) labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Cube {
    pub(crate) dimensions: Vec<Dimension>,
    pub(crate) values: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct RawDataset {
    #[serde(default)]
    id: Option<Vec<String>>,
    #[serde(default)]
    size: Option<Vec<usize>>,
    dimension: Map<String, Value>,
    value: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct RawDimension {
    category: RawCategory,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    #[serde(default)]
    index: Option<CategoryIndex>,
    #[serde(default)]
    label: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CategoryIndex {
    Ordered(Vec<String>),
    Positions(HashMap<String, usize>),
}

impl Cube {
    pub(crate) fn from_json(raw: &str) -> Result<Self, TourismError> {
        let mut root: Value = serde_json::from_str(raw)?;
        // JSON-stat 1.x wraps the cube in a named bundle, 2.x puts it at the root.
        let dataset = if root.get("dataset").is_some() {
            root["dataset"].take()
        } else {
            root
        };
        let dataset: RawDataset = serde_json::from_value(dataset)?;
        Self::from_raw(dataset)
    }

    fn from_raw(raw: RawDataset) -> Result<Self, TourismError> {
        let ids = match raw.id {
            Some(ids) => ids,
            None => string_list(raw.dimension.get("id")).ok_or(TourismError::MissingLayout)?,
        };
        let sizes = match raw.size {
            Some(sizes) => sizes,
            None => size_list(raw.dimension.get("size")).ok_or(TourismError::MissingLayout)?,
        };
        if ids.len() != sizes.len() {
            return Err(TourismError::MissingLayout);
        }

        let mut dimensions = Vec::with_capacity(ids.len());
        for (id, &size) in ids.iter().zip(&sizes) {
            let value = raw
                .dimension
                .get(id)
                .cloned()
                .ok_or_else(|| TourismError::MissingDimension(id.clone()))?;
            let dimension: RawDimension = serde_json::from_value(value)?;
            let codes = ordered_codes(id, dimension.category.index, &dimension.category.label)?;
            if codes.len() != size {
                return Err(TourismError::DimensionSizeMismatch {
                    dimension: id.clone(),
                    expected: size,
                    actual: codes.len(),
                });
            }
            let labels = codes
                .iter()
                .map(|code| {
                    dimension
                        .category
                        .label
                        .get(code)
                        .cloned()
                        .unwrap_or_else(|| code.clone())
                })
                .collect();
            dimensions.push(Dimension {
                id: id.clone(),
                codes,
                labels,
            });
        }

        let expected: usize = sizes.iter().product();
        if expected != raw.value.len() {
            return Err(TourismError::ShapeMismatch {
                expected,
                actual: raw.value.len(),
            });
        }

        Ok(Self {
            dimensions,
            values: raw.value,
        })
    }

    fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.dimensions.len()];
        for idx in (0..self.dimensions.len().saturating_sub(1)).rev() {
            strides[idx] = strides[idx + 1] * self.dimensions[idx + 1].codes.len();
        }
        strides
    }

    /// Category position of every dimension for the value at `flat`.
    pub(crate) fn coordinates(&self, flat: usize, strides: &[usize]) -> Vec<usize> {
        self.dimensions
            .iter()
            .zip(strides)
            .map(|(dimension, stride)| (flat / stride) % dimension.codes.len())
            .collect()
    }

    fn position(&self, id: &str) -> Result<usize, TourismError> {
        self.dimensions
            .iter()
            .position(|dimension| dimension.id == id)
            .ok_or_else(|| TourismError::MissingDimension(id.to_string()))
    }

    /// Flattens the cube into one record per value, labelled through `schema`.
    pub(crate) fn into_records(
        self,
        schema: &TourismSchema,
    ) -> Result<Vec<TourismRecord>, TourismError> {
        let region = self.position(&schema.region)?;
        let accommodation = self.position(&schema.accommodation)?;
        let period = self.position(&schema.period)?;
        let nationality = self.position(&schema.nationality)?;

        let periods = self.dimensions[period]
            .codes
            .iter()
            .zip(&self.dimensions[period].labels)
            .map(|(code, label)| {
                YearMonth::parse_period(code)
                    .or_else(|| YearMonth::parse_period(label))
                    .ok_or_else(|| TourismError::InvalidPeriod(label.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let strides = self.strides();
        let mut records = Vec::with_capacity(self.values.len());
        for (flat, value) in self.values.iter().enumerate() {
            let coords = self.coordinates(flat, &strides);
            records.push(TourismRecord {
                region: self.dimensions[region].labels[coords[region]].clone(),
                accommodation: self.dimensions[accommodation].labels[coords[accommodation]]
                    .clone(),
                period: periods[coords[period]],
                nationality: self.dimensions[nationality].labels[coords[nationality]].clone(),
                visits: visit_count(flat, *value)?,
            });
        }

        debug_assert_eq!(records.len(), self.values.len());
        Ok(records)
    }
}

/// Suppressed cells (`null`) count as zero stays.
fn visit_count(index: usize, value: Option<f64>) -> Result<u64, TourismError> {
    match value {
        None => Ok(0),
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v.round() as u64),
        Some(v) => Err(TourismError::InvalidValue { index, value: v }),
    }
}

fn ordered_codes(
    id: &str,
    index: Option<CategoryIndex>,
    labels: &HashMap<String, String>,
) -> Result<Vec<String>, TourismError> {
    match index {
        Some(CategoryIndex::Ordered(codes)) => Ok(codes),
        Some(CategoryIndex::Positions(positions)) => {
            let mut ordered: Vec<(usize, String)> = positions
                .into_iter()
                .map(|(code, position)| (position, code))
                .collect();
            ordered.sort();
            let contiguous = ordered
                .iter()
                .enumerate()
                .all(|(expected, (position, _))| expected == *position);
            if !contiguous {
                return Err(TourismError::MissingCategoryIndex(id.to_string()));
            }
            Ok(ordered.into_iter().map(|(_, code)| code).collect())
        }
        // A single category needs no index.
        None if labels.len() == 1 => Ok(labels.keys().cloned().collect()),
        None => Err(TourismError::MissingCategoryIndex(id.to_string())),
    }
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value?
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn size_list(value: Option<&Value>) -> Option<Vec<usize>> {
    value?
        .as_array()?
        .iter()
        .map(|item| item.as_u64().map(|size| size as usize))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_three() -> &'static str {
        r#"{
            "dataset": {
                "dimension": {
                    "id": ["Region", "Tid"],
                    "size": [2, 3],
                    "Region": {"category": {"index": {"A": 0, "B": 1}, "label": {"A": "Alpha", "B": "Beta"}}},
                    "Tid": {"category": {"index": ["2023M01", "2023M02", "2023M03"]}}
                },
                "value": [1, 2, 3, 4, 5, 6]
            }
        }"#
    }

    #[test]
    fn last_dimension_varies_fastest() {
        let cube = Cube::from_json(two_by_three()).expect("cube parses");
        let strides = cube.strides();
        assert_eq!(strides, vec![3, 1]);
        assert_eq!(cube.coordinates(0, &strides), vec![0, 0]);
        assert_eq!(cube.coordinates(2, &strides), vec![0, 2]);
        assert_eq!(cube.coordinates(4, &strides), vec![1, 1]);
        assert_eq!(cube.dimensions[0].labels, vec!["Alpha", "Beta"]);
        assert_eq!(cube.dimensions[1].labels[1], "2023M02");
    }

    #[test]
    fn position_index_is_sorted_by_position() {
        let codes = ordered_codes(
            "X",
            Some(CategoryIndex::Positions(HashMap::from([
                ("late".to_string(), 1),
                ("early".to_string(), 0),
            ]))),
            &HashMap::new(),
        )
        .expect("contiguous positions");
        assert_eq!(codes, vec!["early", "late"]);
    }

    #[test]
    fn gaps_in_position_index_are_rejected() {
        let err = ordered_codes(
            "X",
            Some(CategoryIndex::Positions(HashMap::from([
                ("a".to_string(), 0),
                ("b".to_string(), 2),
            ]))),
            &HashMap::new(),
        )
        .expect_err("gap rejected");
        assert!(matches!(err, TourismError::MissingCategoryIndex(id) if id == "X"));
    }

    #[test]
    fn value_count_must_match_declared_shape() {
        let raw = two_by_three().replace("[1, 2, 3, 4, 5, 6]", "[1, 2, 3, 4, 5]");
        let err = Cube::from_json(&raw).expect_err("short value array rejected");
        assert!(matches!(
            err,
            TourismError::ShapeMismatch {
                expected: 6,
                actual: 5
            }
        ));
    }

    #[test]
    fn dataset_level_layout_is_accepted() {
        let raw = r#"{
            "class": "dataset",
            "id": ["Tid"],
            "size": [2],
            "dimension": {"Tid": {"category": {"index": ["2024M01", "2024M02"]}}},
            "value": [10, null]
        }"#;
        let cube = Cube::from_json(raw).expect("JSON-stat 2 layout parses");
        assert_eq!(cube.values, vec![Some(10.0), None]);
    }

    #[test]
    fn negative_values_are_rejected() {
        assert_eq!(visit_count(0, None).expect("null is zero"), 0);
        assert_eq!(visit_count(0, Some(41.6)).expect("rounded"), 42);
        assert!(matches!(
            visit_count(3, Some(-1.0)),
            Err(TourismError::InvalidValue { index: 3, .. })
        ));
    }
}
