//! Report Configuration Module
//! Every input path, column label and constant the report depends on.

use chrono::NaiveDate;
use std::path::PathBuf;

/// Region the report focuses on.
pub const TARGET_REGION: &str = "Provence-Alpes-Côte d'Azur";

/// Main configuration for the report.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Annual production by branch and region.
    pub production_path: PathBuf,
    /// Annual weather-corrected net consumption by region.
    pub consumption_path: PathBuf,
    /// Daily consolidated withdrawals by region and sector.
    pub withdrawals_path: PathBuf,
    /// Field delimiter shared by the three files.
    pub separator: u8,
    /// Index of the column holding the time axis.
    pub time_column: usize,
    /// Exact region label to report on.
    pub region: String,
    /// Consumption rows before this date are dropped.
    pub consumption_cutoff: NaiveDate,
    pub columns: ColumnNames,
    pub production_mapping: ColumnMapping,
    pub buckets: BucketSlice,
    /// (display label, sector value in the withdrawals file)
    pub sectors: Vec<(String, String)>,
    pub chart: ChartConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            production_path: PathBuf::from("prod-region-annuelle-filiere.csv"),
            consumption_path: PathBuf::from("conso-nette-regionale.csv"),
            withdrawals_path: PathBuf::from("soutirages-regionaux-quotidiens-consolides-rpt.csv"),
            separator: b';',
            time_column: 0,
            region: TARGET_REGION.to_string(),
            consumption_cutoff: NaiveDate::from_ymd_opt(2008, 1, 1).expect("valid cutoff date"),
            columns: ColumnNames::default(),
            production_mapping: ColumnMapping::default(),
            buckets: BucketSlice::default(),
            sectors: vec![
                ("Tertiary".to_string(), "Tertiaire".to_string()),
                ("Industrial".to_string(), "Grande Industrie".to_string()),
                ("Other".to_string(), "Autre".to_string()),
            ],
            chart: ChartConfig::default(),
        }
    }
}

/// Source-language column labels read from the input files.
#[derive(Debug, Clone)]
pub struct ColumnNames {
    pub region: String,
    pub consumption: String,
    pub sector: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            region: "Région".to_string(),
            consumption: "Consommation nette corrigée (GWh)".to_string(),
            sector: "Secteur activité".to_string(),
        }
    }
}

/// Ordered one-to-one mapping from source labels to canonical labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pairs: Vec<(String, String)>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::new([
            ("Production nucléaire (GWh)", "Nuclear Production (GWh)"),
            (
                "Production thermique (GWh)",
                "Thermal Electricity Production (GWh)",
            ),
            ("Production hydraulique (GWh)", "Hydropower (GWh)"),
            ("Production éolienne (GWh)", "Wind Power Generation (GWh)"),
            ("Production solaire (GWh)", "Solar Power Production (GWh)"),
            ("Production bioénergies (GWh)", "Bioenergy (GWh)"),
        ])
    }
}

impl ColumnMapping {
    pub fn new<S: Into<String>>(pairs: impl IntoIterator<Item = (S, S)>) -> Self {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(source, canonical)| (source.into(), canonical.into()))
                .collect(),
        }
    }

    /// Canonical label for `name`; unmapped names pass through unchanged.
    pub fn apply<'a>(&'a self, name: &'a str) -> &'a str {
        self.pairs
            .iter()
            .find(|(source, _)| source == name)
            .map(|(_, canonical)| canonical.as_str())
            .unwrap_or(name)
    }

    /// Canonical labels in mapping order.
    pub fn canonical(&self) -> Vec<&str> {
        self.pairs.iter().map(|(_, c)| c.as_str()).collect()
    }
}

/// Position of the sub-daily bucket block among the non-time columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSlice {
    /// Identifier columns skipped before the first bucket.
    pub leading: usize,
    /// Summary columns dropped after the last bucket.
    pub trailing: usize,
}

impl Default for BucketSlice {
    fn default() -> Self {
        Self {
            leading: 5,
            trailing: 3,
        }
    }
}

/// Output image settings.
#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("Provence_energie.png"),
            width: 1000,
            height: 1000,
            title: "Provence Alpes Cote d'Azur, France: Electricity Data Analysis".to_string(),
        }
    }
}
