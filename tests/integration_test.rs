use anyhow::Result;
use chrono::NaiveDate;
use epi_pipeline::config::Config;
use epi_pipeline::export;
use epi_pipeline::types::{FactColumn, Feed, JoinGap, Lookup, SnapshotColumn};
use epi_pipeline::{Pipeline, PipelineError, PipelineOutput};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const SERIES_HEADER: &str = "Province/State,Country/Region,Lat,Long,1/1/21,1/2/21,1/3/21";

// Alpha is corrected downward on day 3; Beta is reported as two sub-regions;
// Gamma has no continent and must be dropped from the fact table.
const CONFIRMED: &str = ",Alpha,1.0,1.0,10,20,15\n\
                         North,Beta,2.0,2.0,1,2,4\n\
                         South,Beta,2.0,2.0,0,1,3\n\
                         ,Gamma,3.0,3.0,5,6,7\n";
const DEATHS: &str = ",Alpha,1.0,1.0,0,1,1\n\
                      North,Beta,2.0,2.0,0,0,1\n\
                      South,Beta,2.0,2.0,0,0,0\n\
                      ,Gamma,3.0,3.0,0,0,0\n";
const RECOVERED: &str = ",Alpha,1.0,1.0,0,0,5\n\
                         North,Beta,2.0,2.0,0,0,0\n\
                         South,Beta,2.0,2.0,0,0,0\n\
                         ,Gamma,3.0,3.0,0,0,0\n";

// Reported a day ahead of the time series, so the as-of date falls back
const SNAPSHOT: &str = "Country_Region,Last_Update,Lat,Long_,Confirmed,Deaths,Recovered,Active,Incident_Rate,People_Tested,People_Hospitalized,Mortality_Rate,UID,ISO3\n\
                        Alpha,2021-01-04 05:21:03,10.0,20.0,15,1,5,9,1.2,,,6.67,1,ALP\n\
                        Beta,2021-01-04 05:21:03,,,7,1,0,6,,,,14.29,2,\n\
                        Delta,2021-01-04 05:21:03,1.0,1.0,100,0,0,100,,,,0.0,4,DEL\n";

const CONTINENTS: &str = "Continent,Country\nEurope,Alpha\nAsia,Beta\n";

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
}

struct Fixture {
    dir: TempDir,
    config: Config,
}

impl Fixture {
    fn new() -> Result<Self> {
        let dir = tempdir()?;
        let mut config = Config::default();
        config.fetch.max_attempts = 1;
        config.output.dir = dir.path().join("output");

        let feeds = [
            ("confirmed.csv", format!("{SERIES_HEADER}\n{CONFIRMED}")),
            ("deaths.csv", format!("{SERIES_HEADER}\n{DEATHS}")),
            ("recovered.csv", format!("{SERIES_HEADER}\n{RECOVERED}")),
            ("snapshot.csv", SNAPSHOT.to_string()),
            ("continents.csv", CONTINENTS.to_string()),
        ];
        for (name, content) in &feeds {
            fs::write(dir.path().join(name), content)?;
        }

        let path = |name: &str| dir.path().join(name).to_string_lossy().to_string();
        config.sources.confirmed = path("confirmed.csv");
        config.sources.deaths = path("deaths.csv");
        config.sources.recovered = path("recovered.csv");
        config.sources.snapshot = path("snapshot.csv");
        config.sources.continents = path("continents.csv");

        Ok(Self { dir, config })
    }

    fn overwrite(&self, name: &str, content: &str) -> Result<()> {
        fs::write(self.dir.path().join(name), content)?;
        Ok(())
    }

    fn build(&self) -> epi_pipeline::Result<PipelineOutput> {
        Pipeline::run(&self.config)
    }
}

#[test]
fn test_end_to_end_with_upstream_correction() -> Result<()> {
    let fixture = Fixture::new()?;
    let output = fixture.build()?;

    assert_eq!(output.locations(), ["Alpha".to_string(), "Beta".to_string()]);
    assert_eq!(output.facts().len(), 6);

    let alpha_new: Vec<i64> = output
        .rows_for_location("Alpha")
        .iter()
        .map(|r| r.new_confirmed)
        .collect();
    assert_eq!(alpha_new, vec![0, 10, 0]);

    // Beta's two sub-regions are summed before differencing
    let beta = output.rows_for_location("Beta");
    let beta_totals: Vec<i64> = beta.iter().map(|r| r.total_confirmed).collect();
    assert_eq!(beta_totals, vec![1, 3, 7]);
    assert_eq!(beta[2].new_confirmed, 4);
    assert_eq!(beta[2].continent, "Asia");

    // Day 3 global summary carries only Beta's positive delta
    let day3 = output.daily().iter().find(|d| d.date == day(3)).unwrap();
    assert_eq!(day3.new_confirmed, 4);
    assert_eq!(day3.new_deaths, 1);

    Ok(())
}

#[test]
fn test_fact_table_invariants() -> Result<()> {
    let output = Fixture::new()?.build()?;

    let mut keys = HashSet::new();
    for row in output.facts() {
        assert!(keys.insert((row.location.clone(), row.date)), "duplicate key");
        assert!(row.new_confirmed >= 0);
        assert!(row.new_deaths >= 0);
        assert!(row.new_recovered >= 0);
    }

    for location in output.locations() {
        let rows = output.rows_for_location(location);
        assert_eq!(rows[0].new_confirmed, 0);
        assert!(rows.windows(2).all(|w| w[0].date < w[1].date));
    }

    let daily_sum: i64 = output.daily().iter().map(|d| d.new_confirmed).sum();
    assert_eq!(daily_sum, output.global_sum(FactColumn::NewConfirmed));
    Ok(())
}

#[test]
fn test_joins_and_latest_view() -> Result<()> {
    let output = Fixture::new()?.build()?;

    // Snapshot reports 1/4, the time series stops at 1/3
    assert_eq!(output.reported_date(), day(4));
    assert_eq!(output.as_of(), day(3));
    assert_eq!(output.latest().len(), 2);
    assert!(output.latest().iter().all(|r| r.date == day(3)));

    let alpha = &output.rows_for_location("Alpha")[0];
    assert_eq!(alpha.iso3.as_deref(), Some("ALP"));
    assert_eq!(alpha.lat, Some(10.0));
    let beta = &output.rows_for_location("Beta")[0];
    assert!(!beta.has_coordinates());

    // Gamma has no continent: absent from the facts, reported as a gap
    assert!(output.rows_for_location("Gamma").is_empty());
    assert!(output.join_gaps().contains(&JoinGap {
        location: "Gamma".to_string(),
        lookup: Lookup::Continent,
    }));

    // The snapshot keeps Delta under the "Other" bucket
    assert_eq!(output.snapshot().len(), 3);
    let delta = output.snapshot().iter().find(|r| r.location == "Delta").unwrap();
    assert_eq!(delta.continent, "Other");
    assert_eq!(output.snapshot_sum(SnapshotColumn::Confirmed), 122);
    Ok(())
}

#[test]
fn test_snapshot_date_present_is_used_directly() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.overwrite("snapshot.csv", &SNAPSHOT.replace("2021-01-04", "2021-01-03"))?;
    let output = fixture.build()?;

    assert_eq!(output.as_of(), day(3));
    assert_eq!(output.reported_date(), day(3));
    Ok(())
}

#[test]
fn test_missing_column_aborts_with_schema_error() -> Result<()> {
    let fixture = Fixture::new()?;
    let header = SERIES_HEADER.replace("Country/Region", "Country");
    fixture.overwrite("deaths.csv", &format!("{header}\n{DEATHS}"))?;

    match fixture.build() {
        Err(PipelineError::Schema { feed, column }) => {
            assert_eq!(feed, Feed::Deaths);
            assert_eq!(column, "Country/Region");
        }
        other => panic!("expected schema error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_bad_value_aborts_with_parse_error() -> Result<()> {
    let fixture = Fixture::new()?;
    let broken = RECOVERED.replace(",Alpha,1.0,1.0,0,0,5", ",Alpha,1.0,1.0,0,x,5");
    fixture.overwrite("recovered.csv", &format!("{SERIES_HEADER}\n{broken}"))?;

    let err = fixture.build().unwrap_err();
    assert!(matches!(err, PipelineError::Parse { feed: Feed::Recovered, row: 1, .. }));
    assert!(err.to_string().contains("1/2/21"));
    Ok(())
}

#[test]
fn test_unreachable_source_aborts_with_fetch_error() -> Result<()> {
    let mut fixture = Fixture::new()?;
    fixture.config.sources.continents = "/no/such/continents.csv".to_string();

    let err = fixture.build().unwrap_err();
    assert!(matches!(err, PipelineError::Fetch { feed: Feed::Continents, .. }));
    Ok(())
}

#[test]
fn test_export_writes_tables_and_report() -> Result<()> {
    let fixture = Fixture::new()?;
    let output = fixture.build()?;
    let dir = fixture.config.output.dir.clone();

    let files = export::write_tables(&output, &dir)?;
    assert_eq!(files.len(), 6);
    assert!(files.iter().all(|f| Path::new(f).exists()));

    let facts = fs::read_to_string(dir.join("facts.csv"))?;
    let mut lines = facts.lines();
    assert!(lines.next().unwrap().starts_with("location,date,total_confirmed"));
    assert_eq!(lines.count(), 6);

    let report_path = files.iter().find(|f| f.extension().is_some_and(|e| e == "json")).unwrap();
    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(report_path)?)?;
    assert_eq!(report["as_of"], "2021-01-03");
    assert_eq!(report["headline"]["new_confirmed"], 4);
    assert_eq!(report["headline"]["total_confirmed"], 122);
    Ok(())
}
