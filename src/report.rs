//! Report Assembly Module
//! Runs loading, normalization and aggregation once over the three datasets.

use crate::config::ReportConfig;
use crate::data::{
    ConsumptionRecord, DataLoader, DataProcessor, LoaderError, ProcessorError, ProductionRecord,
    WithdrawalTable,
};
use crate::stats::{AggregateError, Aggregator, DatedValue, RegionalTotal, SectorProfile};
use log::info;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Cannot load {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoaderError,
    },
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Every table the renderer draws, plus what the summary prints.
pub struct ReportData {
    pub region: String,
    /// Canonical production source labels, in column order.
    pub source_labels: Vec<String>,
    /// Normalized production table for all regions.
    pub production_frame: DataFrame,
    /// Production of the target region, in time order.
    pub production: Vec<ProductionRecord>,
    /// Consumption of the target region on or after the cutoff.
    pub consumption: Vec<ConsumptionRecord>,
    pub national_production: Vec<DatedValue>,
    pub national_consumption: Vec<DatedValue>,
    pub regional_totals: Vec<RegionalTotal>,
    /// Sector categories found in the withdrawals file.
    pub sectors: Vec<String>,
    pub profiles: Vec<SectorProfile>,
}

impl ReportData {
    /// Load, normalize and aggregate the three input files.
    ///
    /// Production is not restricted to the consumption cutoff before the
    /// national means are taken.
    pub fn build(config: &ReportConfig) -> Result<Self, ReportError> {
        let loader = DataLoader::new(config.separator, config.time_column);
        let region_col = config.columns.region.as_str();

        // Production
        let raw = Self::load(&loader, &config.production_path)?;
        let production_frame = DataProcessor::normalize_production(
            raw,
            &config.production_mapping,
            config.time_column,
        )?;
        let time_name = DataProcessor::time_column_name(&production_frame, config.time_column)?;
        let source_labels = config.production_mapping.canonical();
        let all_production = ProductionRecord::from_frame(
            &production_frame,
            &time_name,
            region_col,
            &source_labels,
        )?;
        let national_production = Aggregator::national_mean_production(&all_production);
        let regional_totals = Aggregator::regional_totals(&all_production);
        let production = Aggregator::filter_region(&all_production, &config.region);
        info!(
            "Production: {} rows, {} for '{}'",
            all_production.len(),
            production.len(),
            config.region
        );

        // Consumption
        let raw = Self::load(&loader, &config.consumption_path)?;
        let time_name = DataProcessor::time_column_name(&raw, config.time_column)?;
        let consumption_frame = DataProcessor::sort_by_time(raw, &time_name)?;
        let all_consumption = ConsumptionRecord::from_frame(
            &consumption_frame,
            &time_name,
            region_col,
            &config.columns.consumption,
        )?;
        let all_consumption = Aggregator::since(&all_consumption, config.consumption_cutoff);
        let national_consumption = Aggregator::national_mean_consumption(&all_consumption);
        let consumption = Aggregator::filter_region(&all_consumption, &config.region);
        info!(
            "Consumption since {}: {} rows, {} for '{}'",
            config.consumption_cutoff,
            all_consumption.len(),
            consumption.len(),
            config.region
        );

        // Withdrawals
        let raw = Self::load(&loader, &config.withdrawals_path)?;
        let time_name = DataProcessor::time_column_name(&raw, config.time_column)?;
        let withdrawals_frame = DataProcessor::sort_by_time(raw, &time_name)?;
        let sectors = DataLoader::get_unique_values(&withdrawals_frame, &config.columns.sector);
        let buckets =
            DataProcessor::bucket_columns(&withdrawals_frame, config.time_column, config.buckets)?;
        let regional_frame = DataProcessor::filter_equals(
            &withdrawals_frame,
            &[(region_col, config.region.as_str())],
        )?;
        let table = WithdrawalTable::from_frame(
            &regional_frame,
            &time_name,
            region_col,
            &config.columns.sector,
            &buckets,
        )?;
        info!(
            "Withdrawals: {} buckets, {} rows for '{}'",
            buckets.len(),
            table.records.len(),
            config.region
        );

        let profiles = config
            .sectors
            .iter()
            .map(|(label, sector)| Aggregator::sector_profile(&table, &config.region, sector, label))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            region: config.region.clone(),
            source_labels: source_labels.iter().map(|s| s.to_string()).collect(),
            production_frame,
            production,
            consumption,
            national_production,
            national_consumption,
            regional_totals,
            sectors,
            profiles,
        })
    }

    fn load(loader: &DataLoader, path: &Path) -> Result<DataFrame, ReportError> {
        loader.load_table(path).map_err(|source| ReportError::Load {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Print the intermediate tables to stdout.
    pub fn print_summary(&self) -> Result<(), ReportError> {
        println!("National mean production per region (GWh)");
        for point in &self.national_production {
            println!("{}  {:>12.2}", point.date, point.value);
        }

        println!("\nRegional total production (GWh)");
        for total in &self.regional_totals {
            println!("{}  {:<35} {:>12.2}", total.date, total.region, total.total);
        }

        println!("\n{}", self.production_frame.head(Some(5)));

        println!("\nNational mean consumption per region (GWh)");
        for point in &self.national_consumption {
            println!("{}  {:>12.2}", point.date, point.value);
        }

        println!("\nList of categories within Sector column: {:?}", self.sectors);
        for profile in &self.profiles {
            match profile.year {
                Some(year) => println!("{} ({}): {}", profile.label, profile.sector, year),
                None => println!("{} ({}): no rows", profile.label, profile.sector),
            }
        }
        let profiles = Aggregator::profiles_frame(&self.profiles)?;
        println!("{}", profiles);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TARGET_REGION;
    use chrono::NaiveDate;
    use std::fs;

    const PRODUCTION_CSV: &str = "\
Année;Région;Production nucléaire (GWh);Production thermique (GWh);Production hydraulique (GWh);Production éolienne (GWh);Production solaire (GWh);Production bioénergies (GWh)
2009;Provence-Alpes-Côte d'Azur;0;4000;8000;;500;200
2008;Provence-Alpes-Côte d'Azur;0;3500;7500;30;;150
";

    const CONSUMPTION_CSV: &str = "\
Année;Région;Consommation nette corrigée (GWh)
2007;Provence-Alpes-Côte d'Azur;40000
2008;Provence-Alpes-Côte d'Azur;41000.5
2008;Corse;2000
2009;Provence-Alpes-Côte d'Azur;40500.25
";

    const WITHDRAWALS_CSV: &str = "\
Date;Région;Code INSEE région;Secteur activité;Nombre de sites;Type;00h00;00h30;Total;Max;Min
2019-01-02;Provence-Alpes-Côte d'Azur;93;Tertiaire;10;RPT;1;2;3;2;1
2019-01-01;Provence-Alpes-Côte d'Azur;93;Tertiaire;10;RPT;3;4;7;4;3
2019-01-01;Provence-Alpes-Côte d'Azur;93;Grande Industrie;4;RPT;5;5;10;5;5
2019-01-01;Corse;94;Autre;2;RPT;9;9;18;9;9
";

    fn fixture_config(dir: &tempfile::TempDir) -> ReportConfig {
        let write = |name: &str, content: &str| {
            let path = dir.path().join(name);
            fs::write(&path, content).unwrap();
            path
        };
        ReportConfig {
            production_path: write("prod.csv", PRODUCTION_CSV),
            consumption_path: write("conso.csv", CONSUMPTION_CSV),
            withdrawals_path: write("withdrawals.csv", WITHDRAWALS_CSV),
            ..ReportConfig::default()
        }
    }

    fn date(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    #[test]
    fn test_round_trip_production() {
        let dir = tempfile::tempdir().unwrap();
        let report = ReportData::build(&fixture_config(&dir)).unwrap();

        assert_eq!(report.production.len(), 2);
        assert_eq!(report.production[0].date, date(2008));
        assert_eq!(report.production[0].total_production(), 11180.0);
        assert_eq!(report.production[1].date, date(2009));
        assert_eq!(report.production[1].total_production(), 12700.0);
        assert_eq!(
            report.national_production,
            vec![
                DatedValue { date: date(2008), value: 11180.0 },
                DatedValue { date: date(2009), value: 12700.0 },
            ]
        );
        assert_eq!(report.regional_totals.len(), 2);
        assert_eq!(report.source_labels[2], "Hydropower (GWh)");
    }

    #[test]
    fn test_consumption_cutoff_and_means() {
        let dir = tempfile::tempdir().unwrap();
        let report = ReportData::build(&fixture_config(&dir)).unwrap();

        let regional: Vec<NaiveDate> = report.consumption.iter().map(|r| r.date).collect();
        assert_eq!(regional, vec![date(2008), date(2009)]);
        assert_eq!(
            report.national_consumption,
            vec![
                DatedValue { date: date(2008), value: 21500.25 },
                DatedValue { date: date(2009), value: 40500.25 },
            ]
        );
    }

    #[test]
    fn test_withdrawal_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let report = ReportData::build(&fixture_config(&dir)).unwrap();

        assert_eq!(report.sectors, vec!["Autre", "Grande Industrie", "Tertiaire"]);
        assert_eq!(report.profiles.len(), 3);

        let tertiary = &report.profiles[0];
        assert_eq!(tertiary.buckets, vec!["00h00", "00h30"]);
        assert_eq!(tertiary.year, Some(2019));
        assert_eq!(tertiary.values, vec![4.0, 6.0]);

        assert_eq!(report.profiles[1].values, vec![5.0, 5.0]);
        assert!(report.profiles[2].is_empty());
        report.print_summary().unwrap();
    }

    #[test]
    fn test_unknown_region_yields_empty_tables() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReportConfig {
            region: "Nowhere".to_string(),
            ..fixture_config(&dir)
        };
        let report = ReportData::build(&config).unwrap();

        assert!(report.production.is_empty());
        assert!(report.consumption.is_empty());
        assert!(report.profiles.iter().all(SectorProfile::is_empty));
        assert_eq!(report.national_production.len(), 2);
        assert_ne!(report.region, TARGET_REGION);
    }

    #[test]
    fn test_unparseable_production_cell_stops_the_build() {
        let dir = tempfile::tempdir().unwrap();
        let production = PRODUCTION_CSV.replace(";7500;", ";7500,5;");
        let path = dir.path().join("prod-comma.csv");
        fs::write(&path, production).unwrap();
        let config = ReportConfig {
            production_path: path,
            ..fixture_config(&dir)
        };

        let err = ReportData::build(&config).err().unwrap();
        match err {
            ReportError::Processor(ProcessorError::InvalidNumber { column, row, value }) => {
                assert_eq!(column, "Hydropower (GWh)");
                assert_eq!(row, 0);
                assert_eq!(value, "7500,5");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_cells_still_count_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let report = ReportData::build(&fixture_config(&dir)).unwrap();

        // 2008 has no solar value, 2009 no wind value.
        assert_eq!(report.production[0].sources[4], 0.0);
        assert_eq!(report.production[1].sources[3], 0.0);
    }

    #[test]
    fn test_missing_input_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReportConfig {
            consumption_path: dir.path().join("absent.csv"),
            ..fixture_config(&dir)
        };
        let err = ReportData::build(&config).err().unwrap();
        assert!(matches!(
            err,
            ReportError::Load {
                source: LoaderError::NotFound(_),
                ..
            }
        ));
        assert!(err.to_string().contains("absent.csv"));
    }
}
