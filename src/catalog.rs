//! The part catalog: a read-only, tabular registry of interchangeable parts.
//!
//! Header normalization (trim + lowercase) happens once, at load time. Every
//! lookup after that is case-insensitive and preserves catalog order.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::CatalogLoadError;
use crate::model::part::fold;
use crate::model::Part;

/// Columns every catalog must carry, after header normalization.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "part_type",
    "name",
    "material",
    "unit_cost_usd",
    "model_file",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    parts: Vec<Part>,
}

/// Predicates for the interactive part browser. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartFilter {
    pub part_types: Option<Vec<String>>,
    pub materials: Option<Vec<String>>,
    pub min_cost: Option<f64>,
    pub max_cost: Option<f64>,
}

impl PartFilter {
    pub fn matches(&self, part: &Part) -> bool {
        let in_set = |set: &Option<Vec<String>>, value: &str| {
            set.as_ref()
                .is_none_or(|wanted| wanted.iter().any(|w| fold(w) == fold(value)))
        };
        in_set(&self.part_types, &part.part_type)
            && in_set(&self.materials, &part.material)
            && self.min_cost.is_none_or(|min| part.unit_cost >= min)
            && self.max_cost.is_none_or(|max| part.unit_cost <= max)
    }
}

impl Catalog {
    /// Load a catalog file. `.tsv` files are tab-separated, anything else is CSV.
    pub fn load(path: &Path) -> Result<Self, CatalogLoadError> {
        let file = File::open(path).map_err(|source| CatalogLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        };
        let catalog = Self::from_reader(file, delimiter)?;
        tracing::info!(path = %path.display(), parts = catalog.len(), "loaded part catalog");
        Ok(catalog)
    }

    /// Parse delimited text with a header row.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, CatalogLoadError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(fold).collect();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| CatalogLoadError::MissingColumn {
                    column: name.to_string(),
                })
        };
        let mut required = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, name) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = column(name)?;
        }
        let [type_col, name_col, material_col, cost_col, file_col] = required;

        let mut parts = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map_or(0, csv::Position::line);
            let cell = |i: usize| record.get(i).unwrap_or_default().to_string();

            let raw_cost = cell(cost_col);
            let unit_cost = parse_cost(&raw_cost).ok_or_else(|| CatalogLoadError::InvalidRow {
                line,
                message: format!(
                    "unit_cost_usd must be a non-negative number, got \"{raw_cost}\""
                ),
            })?;

            let attributes: IndexMap<String, String> = headers
                .iter()
                .enumerate()
                .filter(|(i, _)| !required.contains(i))
                .map(|(i, header)| (header.clone(), cell(i)))
                .collect();

            parts.push(Part {
                part_type: cell(type_col),
                name: cell(name_col),
                material: cell(material_col),
                unit_cost,
                model_file: cell(file_col),
                attributes,
            });
        }

        Ok(Self { parts })
    }

    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn filter(&self, filter: &PartFilter) -> Vec<&Part> {
        self.parts.iter().filter(|p| filter.matches(p)).collect()
    }

    /// First part, in catalog order, whose type equals `part_type` and whose name
    /// contains `fragment` (both case-insensitive).
    pub fn find_by_type_and_name_fragment(&self, part_type: &str, fragment: &str) -> Option<&Part> {
        self.parts
            .iter()
            .find(|p| p.is_type(part_type) && p.name_contains(fragment))
    }

    /// Like [`Catalog::find_by_type_and_name_fragment`], but a missing or blank
    /// `part_type` matches on the name alone.
    pub fn find_by_name_fragment(&self, part_type: Option<&str>, fragment: &str) -> Option<&Part> {
        match part_type.map(str::trim).filter(|t| !t.is_empty()) {
            Some(part_type) => self.find_by_type_and_name_fragment(part_type, fragment),
            None => self.parts.iter().find(|p| p.name_contains(fragment)),
        }
    }

    pub fn find_by_model_file(&self, model_file: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.has_model_file(model_file))
    }

    /// Distinct part types, first-seen order.
    pub fn part_types(&self) -> Vec<&str> {
        distinct(self.parts.iter().map(|p| p.part_type.as_str()))
    }

    /// Distinct materials, first-seen order.
    pub fn materials(&self) -> Vec<&str> {
        distinct(self.parts.iter().map(|p| p.material.as_str()))
    }

    pub fn max_unit_cost(&self) -> Option<f64> {
        self.parts.iter().map(|p| p.unit_cost).reduce(f64::max)
    }
}

fn parse_cost(raw: &str) -> Option<f64> {
    let cost: f64 = raw.trim().trim_start_matches('$').trim().parse().ok()?;
    (cost.is_finite() && cost >= 0.0).then_some(cost)
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen: Vec<&str> = Vec::new();
    for value in values {
        if !seen.iter().any(|s| fold(s) == fold(value)) {
            seen.push(value);
        }
    }
    seen
}
