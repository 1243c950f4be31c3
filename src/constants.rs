//! Default source locations and the fixed column schema of each feed.

// Default source URLs
pub const CONFIRMED_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_confirmed_global.csv";
pub const DEATHS_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_deaths_global.csv";
pub const RECOVERED_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_recovered_global.csv";
pub const SNAPSHOT_URL: &str =
    "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/web-data/data/cases_country.csv";
pub const CONTINENTS_URL: &str = "https://raw.githubusercontent.com/dbouquin/IS_608/master/NanosatDB_munging/Countries-Continents.csv";

// Time-series feed columns
pub const SERIES_SUBREGION: &str = "Province/State";
pub const SERIES_COUNTRY: &str = "Country/Region";
pub const SERIES_LAT: &str = "Lat";
pub const SERIES_LONG: &str = "Long";

// Snapshot feed columns
pub const SNAPSHOT_COUNTRY: &str = "Country_Region";
pub const SNAPSHOT_LAST_UPDATE: &str = "Last_Update";
pub const SNAPSHOT_LAT: &str = "Lat";
pub const SNAPSHOT_LONG: &str = "Long_";
pub const SNAPSHOT_CONFIRMED: &str = "Confirmed";
pub const SNAPSHOT_DEATHS: &str = "Deaths";
pub const SNAPSHOT_RECOVERED: &str = "Recovered";
pub const SNAPSHOT_ACTIVE: &str = "Active";
pub const SNAPSHOT_INCIDENT_RATE: &str = "Incident_Rate";
pub const SNAPSHOT_MORTALITY_RATE: &str = "Mortality_Rate";
pub const SNAPSHOT_ISO3: &str = "ISO3";

// Continent lookup columns
pub const CONTINENT_COUNTRY: &str = "Country";
pub const CONTINENT_NAME: &str = "Continent";

/// Date format of the time-series column headers, e.g. `1/22/20`
pub const SERIES_DATE_FORMAT: &str = "%m/%d/%y";

/// Timestamp format of the snapshot `Last_Update` column
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Continent assigned to snapshot rows missing from the continent lookup
pub const OTHER_CONTINENT: &str = "Other";

pub const DEFAULT_CONFIG_FILE: &str = "pipeline.toml";
pub const CONFIG_ENV_VAR: &str = "EPI_PIPELINE_CONFIG";
