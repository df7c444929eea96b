//! Static schedule bundle loading.
//!
//! Reads the agency CSV bundle (agency, routes, trips, stop times, calendar,
//! calendar dates) into [`StaticSchedule`]. Loading happens once at startup;
//! any malformed file is fatal, since matching against a half-loaded
//! schedule would misreport every trip.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail, ensure};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::{ScheduledStopTime, ScheduledTrip, ServiceException, ServiceWindow, StaticSchedule};
use crate::error::Error;
use crate::trip_id;

#[derive(Debug, Deserialize)]
struct AgencyRow {
    agency_timezone: String,
}

#[derive(Debug, Deserialize)]
struct RouteRow {
    route_id: String,
}

#[derive(Debug, Deserialize)]
struct TripRow {
    trip_id: String,
    route_id: String,
    service_id: String,
    direction_id: String,
    #[serde(default)]
    mta_trip_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StopTimeRow {
    trip_id: String,
    arrival_time: String,
    departure_time: String,
    stop_id: String,
    stop_sequence: u32,
}

#[derive(Debug, Deserialize)]
struct CalendarRow {
    service_id: String,
    monday: u8,
    tuesday: u8,
    wednesday: u8,
    thursday: u8,
    friday: u8,
    saturday: u8,
    sunday: u8,
    start_date: String,
    end_date: String,
}

#[derive(Debug, Deserialize)]
struct CalendarDateRow {
    service_id: String,
    date: String,
    exception_type: u8,
}

impl StaticSchedule {
    /// Loads a static schedule bundle from a directory of agency CSV files.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing or malformed file, a trip referencing
    /// an unknown route, or a schedule identifier outside the agency
    /// grammar.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let agencies: Vec<AgencyRow> = read_rows(&dir.join("agency.txt"))?;
        let timezone = agencies
            .first()
            .context("agency.txt has no rows")?
            .agency_timezone
            .parse::<Tz>()
            .map_err(|err| anyhow!("parsing agency timezone: {err}"))?;

        let routes: HashSet<String> =
            read_rows::<RouteRow>(&dir.join("routes.txt"))?.into_iter().map(|row| row.route_id).collect();

        let mut stop_times: BTreeMap<String, Vec<StopTimeRow>> = BTreeMap::new();
        for row in read_rows::<StopTimeRow>(&dir.join("stop_times.txt"))? {
            stop_times.entry(row.trip_id.clone()).or_default().push(row);
        }
        for rows in stop_times.values_mut() {
            rows.sort_by_key(|row| row.stop_sequence);
        }

        let mut trips = Vec::new();
        for row in read_rows::<TripRow>(&dir.join("trips.txt"))? {
            ensure!(
                routes.contains(&row.route_id),
                "trip {} references unknown route {}",
                row.trip_id,
                row.route_id
            );
            let Some(rows) = stop_times.remove(&row.trip_id) else {
                warn!(trip = %row.trip_id, "trip has no stop times; skipping");
                continue;
            };
            trips.push(build_trip(row, &rows)?);
        }

        let windows = read_optional_rows::<CalendarRow>(&dir.join("calendar.txt"))?
            .into_iter()
            .map(service_window)
            .collect::<Result<Vec<_>>>()?;
        let exceptions = read_optional_rows::<CalendarDateRow>(&dir.join("calendar_dates.txt"))?
            .into_iter()
            .map(service_exception)
            .collect::<Result<Vec<_>>>()?;
        ensure!(
            !(windows.is_empty() && exceptions.is_empty()),
            "schedule bundle declares no service dates"
        );

        info!(trips = trips.len(), services = windows.len(), "loaded static schedule");
        Ok(Self { timezone, trips, windows, exceptions })
    }
}

fn build_trip(row: TripRow, stop_rows: &[StopTimeRow]) -> Result<ScheduledTrip> {
    let direction = match row.direction_id.as_str() {
        "0" => trip_id::Direction::North,
        "1" => trip_id::Direction::South,
        other => bail!("trip {}: direction_id {other:?}", row.trip_id),
    };
    let mta_trip_id = row.mta_trip_id.filter(|id| !id.is_empty());
    let schedule_id = mta_trip_id.as_deref().unwrap_or(&row.trip_id);
    let path = trip_id::parse_static(schedule_id).with_context(|| format!("trip {}", row.trip_id))?;

    let stop_times = stop_rows
        .iter()
        .map(|stop| {
            Ok(ScheduledStopTime {
                stop_id: stop.stop_id.clone(),
                arrival_sec: service_seconds(&stop.arrival_time)?,
                departure_sec: service_seconds(&stop.departure_time)?,
            })
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("trip {} stop times", row.trip_id))?;

    let start_sec = stop_times.first().map(|stop| stop.departure_sec).context("empty stop list")?;
    let end_sec = stop_times.last().map(|stop| stop.arrival_sec).context("empty stop list")?;

    Ok(ScheduledTrip {
        trip_id: row.trip_id,
        mta_trip_id,
        route_id: row.route_id,
        direction,
        service_id: row.service_id,
        path_id: path.path_id(),
        network_id: path.network_id,
        start_sec,
        end_sec,
        stop_times,
    })
}

fn service_window(row: CalendarRow) -> Result<ServiceWindow> {
    let weekdays = [
        row.monday,
        row.tuesday,
        row.wednesday,
        row.thursday,
        row.friday,
        row.saturday,
        row.sunday,
    ]
    .map(|flag| flag == 1);
    Ok(ServiceWindow {
        weekdays,
        start: yyyymmdd(&row.start_date)?,
        end: yyyymmdd(&row.end_date)?,
        service_id: row.service_id,
    })
}

fn service_exception(row: CalendarDateRow) -> Result<ServiceException> {
    let added = match row.exception_type {
        1 => true,
        2 => false,
        other => bail!("service {}: exception_type {other}", row.service_id),
    };
    Ok(ServiceException { date: yyyymmdd(&row.date)?, service_id: row.service_id, added })
}

fn yyyymmdd(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y%m%d").with_context(|| format!("date {text:?}"))
}

/// Service-day time `H:MM:SS`; hours run past 24 on the extended day.
fn service_seconds(text: &str) -> Result<i64, Error> {
    parse_service_seconds(text).ok_or_else(|| Error::InvalidSchedule(format!("stop time {text:?}")))
}

fn parse_service_seconds(text: &str) -> Option<i64> {
    let mut parts = text.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: i64 = parts.next()?.parse().ok()?;
    (parts.next().is_none() && (0..60).contains(&minutes) && (0..60).contains(&seconds))
        .then(|| hours * 3_600 + minutes * 60 + seconds)
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row.with_context(|| format!("reading {}", path.display()))?);
    }
    Ok(rows)
}

fn read_optional_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if path.exists() { read_rows(path) } else { Ok(Vec::new()) }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::trip_id::Direction;

    fn write_bundle(name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nyct-gtfs-{}-{name}", std::process::id()));
        fs::create_dir_all(&dir).expect("create bundle dir");
        for (file, contents) in files {
            fs::write(dir.join(file), contents).expect("write bundle file");
        }
        dir
    }

    fn bundle(name: &str) -> PathBuf {
        write_bundle(
            name,
            &[
                ("agency.txt", "agency_id,agency_name,agency_timezone\nMTA NYCT,NYCT,America/New_York\n"),
                ("routes.txt", "route_id,route_short_name\n1,1\nGS,S\n"),
                (
                    "trips.txt",
                    "trip_id,route_id,service_id,direction_id,mta_trip_id\n\
                     A-1,1,WKD,0,AFA23GEN-1037-Weekday-00_036000_1..N03R\n\
                     A-2,GS,SAT,1,AFA23GEN-GS01-Saturday-00_000650_GS.S05R\n",
                ),
                (
                    "stop_times.txt",
                    "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
                     A-1,06:00:00,06:00:00,101N,1\n\
                     A-1,06:05:00,06:05:30,103N,2\n\
                     A-1,25:10:00,25:10:00,104N,3\n\
                     A-2,00:06:30,00:06:30,901S,1\n\
                     A-2,00:10:00,00:10:00,902S,2\n",
                ),
                (
                    "calendar.txt",
                    "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
                     WKD,1,1,1,1,1,0,0,20240101,20241231\n\
                     SAT,0,0,0,0,0,1,0,20240101,20241231\n",
                ),
                (
                    "calendar_dates.txt",
                    "service_id,date,exception_type\nSAT,20240704,1\nWKD,20240704,2\n",
                ),
            ],
        )
    }

    #[test]
    fn loads_a_bundle() {
        let dir = bundle("load");
        let schedule = StaticSchedule::from_dir(&dir).expect("should load");

        assert_eq!(schedule.timezone, chrono_tz::America::New_York);
        assert_eq!(schedule.trips.len(), 2);

        let first = &schedule.trips[0];
        assert_eq!(first.trip_id, "A-1");
        assert_eq!(first.direction, Direction::North);
        assert_eq!(first.network_id, Some("03R".to_string()));
        assert_eq!(first.path_id, "1..N");
        assert_eq!(first.start_sec, 21_600);
        // the last arrival runs past 24 hours
        assert_eq!(first.end_sec, 90_600);

        assert_eq!(schedule.windows.len(), 2);
        assert_eq!(schedule.exceptions.len(), 2);
    }

    #[test]
    fn schedule_ids_carry_the_static_grammar() {
        let dir = bundle("grammar");
        let schedule = StaticSchedule::from_dir(&dir).expect("should load");
        for trip in &schedule.trips {
            trip_id::parse_static(trip.schedule_id()).expect("schedule id parses");
        }
    }

    #[test]
    fn rejects_identifier_outside_the_grammar() {
        let dir = write_bundle(
            "badpath",
            &[
                ("agency.txt", "agency_id,agency_timezone\nMTA NYCT,America/New_York\n"),
                ("routes.txt", "route_id\n1\n"),
                ("trips.txt", "trip_id,route_id,service_id,direction_id\nnot-a-path,1,WKD,0\n"),
                (
                    "stop_times.txt",
                    "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
                     not-a-path,06:00:00,06:00:00,101N,1\n",
                ),
                (
                    "calendar.txt",
                    "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
                     WKD,1,1,1,1,1,0,0,20240101,20241231\n",
                ),
            ],
        );
        let err = StaticSchedule::from_dir(&dir).expect_err("should reject");
        assert!(format!("{err:#}").contains("bad path id"));
    }

    #[test]
    fn parses_extended_service_times() {
        assert_eq!(parse_service_seconds("06:00:00"), Some(21_600));
        assert_eq!(parse_service_seconds("25:10:00"), Some(90_600));
        assert_eq!(parse_service_seconds("6:70:00"), None);
        assert_eq!(parse_service_seconds("garbage"), None);
    }
}
