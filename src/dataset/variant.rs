//! Column layouts of the supported dataset files.

use std::fmt;
use std::str::FromStr;

use csv::StringRecord;
use serde::{Deserialize, Serialize};

use super::error::DatasetError;
use crate::engine::Metadata;

/// Fixed column layout of a `|`-delimited dataset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetVariant {
    /// `question|answer`
    Plain,
    /// `event|classification|question|answer`
    Extended,
    /// `question|main_category|subcategory1|subcategory2|subcategory3|identifier|answer`
    Categorized,
}

// (metadata key, column index), in metadata order.
const PLAIN: &[(&str, usize)] = &[("pregunta", 0), ("respuesta", 1)];

const EXTENDED: &[(&str, usize)] = &[
    ("pregunta", 2),
    ("respuesta", 3),
    ("tipificacion", 1),
    ("evento", 0),
];

const CATEGORIZED: &[(&str, usize)] = &[
    ("pregunta", 0),
    ("respuesta", 6),
    ("identificador", 5),
    ("categoria_principal", 1),
    ("subcategoria_1", 2),
    ("subcategoria_2", 3),
    ("subcategoria_3", 4),
];

impl DatasetVariant {
    pub const ALL: [DatasetVariant; 3] = [
        DatasetVariant::Plain,
        DatasetVariant::Extended,
        DatasetVariant::Categorized,
    ];

    fn layout(self) -> &'static [(&'static str, usize)] {
        match self {
            DatasetVariant::Plain => PLAIN,
            DatasetVariant::Extended => EXTENDED,
            DatasetVariant::Categorized => CATEGORIZED,
        }
    }

    /// Minimum number of columns a row must have.
    pub fn columns(self) -> usize {
        match self {
            DatasetVariant::Plain => 2,
            DatasetVariant::Extended => 4,
            DatasetVariant::Categorized => 7,
        }
    }

    /// Column holding the question text.
    pub fn question_column(self) -> usize {
        match self {
            DatasetVariant::Plain | DatasetVariant::Categorized => 0,
            DatasetVariant::Extended => 2,
        }
    }

    /// Metadata keys produced for every record, in order.
    pub fn metadata_keys(self) -> Vec<&'static str> {
        self.layout().iter().map(|(key, _)| *key).collect()
    }

    /// Metadata for one row. The caller has checked the row width.
    pub(crate) fn metadata(self, row: &StringRecord) -> Metadata {
        self.layout()
            .iter()
            .map(|(key, column)| (key.to_string(), row.get(*column).unwrap_or_default().to_string()))
            .collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetVariant::Plain => "plain",
            DatasetVariant::Extended => "extended",
            DatasetVariant::Categorized => "categorized",
        }
    }
}

impl fmt::Display for DatasetVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetVariant {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasetVariant::ALL
            .into_iter()
            .find(|variant| variant.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DatasetError::UnknownVariant(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_fits_column_count() {
        for variant in DatasetVariant::ALL {
            let max_column = variant.layout().iter().map(|(_, c)| *c).max().unwrap();
            assert_eq!(max_column + 1, variant.columns(), "{variant}");
            assert_eq!(variant.metadata_keys()[0], "pregunta");
        }
    }

    #[test]
    fn test_extended_metadata_order() {
        let row = StringRecord::from(vec!["E-1", "Consulta", "¿Cómo pago?", "Con VEP."]);
        let metadata = DatasetVariant::Extended.metadata(&row);
        let pairs: Vec<_> = metadata.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            pairs,
            [
                ("pregunta", "¿Cómo pago?"),
                ("respuesta", "Con VEP."),
                ("tipificacion", "Consulta"),
                ("evento", "E-1"),
            ]
        );
    }

    #[test]
    fn test_parse_variant() {
        assert_eq!("Plain".parse::<DatasetVariant>().unwrap(), DatasetVariant::Plain);
        assert_eq!(
            " categorized ".parse::<DatasetVariant>().unwrap(),
            DatasetVariant::Categorized
        );
        assert!(matches!(
            "tabular".parse::<DatasetVariant>(),
            Err(DatasetError::UnknownVariant(_))
        ));
    }
}
