//! ==============================================================================
//! view_state.rs - filter selections and their query-string encoding
//! ==============================================================================
//!
//! purpose:
//!     `ViewFilter` is everything the user picked: farm, pond, date bounds,
//!     visible metrics and the auto-refresh flag. the shareable url encodes it
//!     as query parameters; `from_query` / `to_query` are the only places that
//!     read or write that encoding.
//!
//! encoding:
//!     farm   raw farm id
//!     pond   pond label or "All"
//!     from   YYYY-MM-DD, omitted when unset
//!     to     YYYY-MM-DD, omitted when unset
//!     auto   "1" or "0"
//!     show   json object of four booleans
//!
//! decoding is lenient. anything malformed is logged and replaced by its
//! default so a bad link still opens the dashboard. that includes farm ids
//! carrying csv delimiters, which fall back to the default farm.
//!
//! ==============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::form_urlencoded;

use crate::domain::{default_farm, ponds_for, Metric, ALL_PONDS};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum ViewStateError {
    #[error("malformed `show` parameter: {0}")]
    Show(#[from] serde_json::Error),

    #[error("malformed `{param}` date {value:?}, expected YYYY-MM-DD")]
    Date { param: &'static str, value: String },

    #[error("farm id {0:?} contains a delimiter or quote")]
    Farm(String),
}

// ==============================================================================
// pond selection
// ==============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum PondSelection {
    #[default]
    All,
    Pond(String),
}

impl PondSelection {
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() || raw == ALL_PONDS {
            Self::All
        } else {
            Self::Pond(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_PONDS,
            Self::Pond(label) => label,
        }
    }

    pub fn matches(&self, pond_label: &str) -> bool {
        match self {
            Self::All => true,
            Self::Pond(label) => label == pond_label,
        }
    }
}

// ==============================================================================
// metric visibility
// ==============================================================================

/// which metric charts are shown. missing keys count as visible
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Visibility {
    pub temp: bool,
    pub ph: bool,
    pub nh3: bool,
    pub dox: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self { temp: true, ph: true, nh3: true, dox: true }
    }
}

impl Visibility {
    pub fn is_visible(&self, metric: Metric) -> bool {
        match metric {
            Metric::Temperature => self.temp,
            Metric::Ph => self.ph,
            Metric::Ammonia => self.nh3,
            Metric::DissolvedOxygen => self.dox,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"temp":true,"ph":true,"nh3":true,"dox":true}"#.into())
    }
}

pub fn parse_show(raw: &str) -> Result<Visibility, ViewStateError> {
    Ok(serde_json::from_str(raw)?)
}

/// farm ids end up in csv rows and html attributes, so they may not carry
/// field or record separators
pub fn parse_farm(raw: &str) -> Result<&str, ViewStateError> {
    if raw.contains(|c: char| matches!(c, ',' | '\r' | '\n' | '"')) {
        return Err(ViewStateError::Farm(raw.to_string()));
    }
    Ok(raw)
}

pub fn parse_date(param: &'static str, raw: &str) -> Result<NaiveDate, ViewStateError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| ViewStateError::Date {
        param,
        value: raw.to_string(),
    })
}

// ==============================================================================
// view filter
// ==============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct ViewFilter {
    pub farm: String,
    pub pond: PondSelection,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub auto: bool,
    pub show: Visibility,
}

impl Default for ViewFilter {
    fn default() -> Self {
        Self {
            farm: default_farm().id.to_string(),
            pond: PondSelection::All,
            from: None,
            to: None,
            auto: false,
            show: Visibility::default(),
        }
    }
}

impl ViewFilter {
    /// decode a raw query string (without the leading `?`)
    pub fn from_query(query: &str) -> Self {
        let mut out = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "farm" if !value.is_empty() => out.farm = value.into_owned(),
                "pond" => out.pond = PondSelection::parse(&value),
                "from" | "to" if value.is_empty() => {}
                "from" => out.from = decode_or_warn(parse_date("from", &value)),
                "to" => out.to = decode_or_warn(parse_date("to", &value)),
                "auto" => out.auto = value == "1",
                "show" if !value.is_empty() => {
                    out.show = decode_or_warn(parse_show(&value)).unwrap_or_default();
                }
                _ => {}
            }
        }

        out.normalized()
    }

    /// canonical query string: farm, pond, from, to, auto, show
    pub fn to_query(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        ser.append_pair("farm", &self.farm);
        ser.append_pair("pond", self.pond.as_str());
        if let Some(from) = self.from {
            ser.append_pair("from", &from.format(DATE_FORMAT).to_string());
        }
        if let Some(to) = self.to {
            ser.append_pair("to", &to.format(DATE_FORMAT).to_string());
        }
        ser.append_pair("auto", if self.auto { "1" } else { "0" });
        ser.append_pair("show", &self.show.to_json());
        ser.finish()
    }

    /// replace an unusable farm id by the default farm and reset a pond
    /// that does not belong to the selected farm
    pub fn normalized(mut self) -> Self {
        if let Err(e) = parse_farm(&self.farm) {
            tracing::warn!(error = %e, "ignoring view parameter");
            self.farm = default_farm().id.to_string();
            self.pond = PondSelection::All;
        }
        if let PondSelection::Pond(label) = &self.pond {
            if !ponds_for(&self.farm).contains(&label.as_str()) {
                tracing::warn!(farm = %self.farm, pond = %label, "pond not in farm, showing all ponds");
                self.pond = PondSelection::All;
            }
        }
        self
    }
}

fn decode_or_warn<T>(res: Result<T, ViewStateError>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring view parameter");
            None
        }
    }
}

// ==============================================================================
// state store
// ==============================================================================

/// what an applied filter changed, so the owner can react
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterChange {
    pub farm_changed: bool,
    pub auto_changed: bool,
}

/// the current view filter of one dashboard view
#[derive(Clone, Debug, Default)]
pub struct ViewStore {
    current: ViewFilter,
}

impl ViewStore {
    pub fn current(&self) -> &ViewFilter {
        &self.current
    }

    /// make `next` the current filter. a farm switch always resets the pond
    /// selection to "All"
    pub fn apply(&mut self, next: ViewFilter) -> FilterChange {
        let mut next = next.normalized();
        let change = FilterChange {
            farm_changed: next.farm != self.current.farm,
            auto_changed: next.auto != self.current.auto,
        };
        if change.farm_changed && next.pond != PondSelection::All {
            tracing::debug!(farm = %next.farm, pond = %next.pond.as_str(), "farm switched, pond reset to all");
            next.pond = PondSelection::All;
        }
        self.current = next;
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_gives_defaults() {
        let f = ViewFilter::from_query("");
        assert_eq!(f, ViewFilter::default());
        assert_eq!(f.farm, "farm-a");
        assert!(Metric::ALL.iter().all(|m| f.show.is_visible(*m)));
    }

    #[test]
    fn round_trips_through_query() {
        let f = ViewFilter {
            farm: "farm-b".into(),
            pond: PondSelection::Pond("Pond B2".into()),
            from: NaiveDate::from_ymd_opt(2024, 5, 1),
            to: NaiveDate::from_ymd_opt(2024, 5, 3),
            auto: true,
            show: Visibility { temp: true, ph: false, nh3: true, dox: false },
        };
        let q = f.to_query();
        assert!(q.starts_with("farm=farm-b&pond=Pond+B2&from=2024-05-01&to=2024-05-03&auto=1&show="));
        assert_eq!(ViewFilter::from_query(&q), f);
    }

    #[test]
    fn unset_dates_are_omitted() {
        let q = ViewFilter::default().to_query();
        let keys: Vec<String> = form_urlencoded::parse(q.as_bytes()).map(|(k, _)| k.into_owned()).collect();
        assert_eq!(keys, ["farm", "pond", "auto", "show"]);
        assert!(q.contains("auto=0"));
    }

    #[test]
    fn malformed_show_falls_back_to_all_visible() {
        for raw in ["%7Bnot-json", "%5B1%2C2%5D", "%7B%22temp%22%3A%22yes%22%7D"] {
            let f = ViewFilter::from_query(&format!("farm=farm-a&show={raw}"));
            assert_eq!(f.show, Visibility::default(), "{raw}");
        }
    }

    #[test]
    fn partial_show_keeps_missing_metrics_visible() {
        let f = ViewFilter::from_query("show=%7B%22ph%22%3Afalse%7D");
        assert!(!f.show.ph);
        assert!(f.show.temp && f.show.nh3 && f.show.dox);
    }

    #[test]
    fn malformed_dates_are_dropped() {
        let f = ViewFilter::from_query("from=yesterday&to=2024-13-40");
        assert_eq!(f.from, None);
        assert_eq!(f.to, None);
        assert!(parse_date("from", "2024-02-30").is_err());
    }

    #[test]
    fn foreign_pond_resets_to_all() {
        let f = ViewFilter::from_query("farm=farm-a&pond=Pond+B1");
        assert_eq!(f.pond, PondSelection::All);
        let f = ViewFilter::from_query("farm=farm-a&pond=Pond+A2");
        assert_eq!(f.pond, PondSelection::Pond("Pond A2".into()));
    }

    #[test]
    fn store_resets_pond_on_farm_switch() {
        let mut store = ViewStore::default();
        store.apply(ViewFilter::from_query("farm=farm-a&pond=Pond+A1"));
        assert_eq!(store.current().pond, PondSelection::Pond("Pond A1".into()));

        // Pond C1 belongs to farm-c, but switching farm still resets the pond
        let change = store.apply(ViewFilter::from_query("farm=farm-c&pond=Pond+C1"));
        assert!(change.farm_changed);
        assert!(!change.auto_changed);
        assert_eq!(store.current().pond, PondSelection::All);
        assert!(store.current().to_query().starts_with("farm=farm-c&pond=All"));

        // same farm keeps the pond
        store.apply(ViewFilter::from_query("farm=farm-c&pond=Pond+C1"));
        assert_eq!(store.current().pond, PondSelection::Pond("Pond C1".into()));
    }

    #[test]
    fn farm_ids_with_delimiters_fall_back_to_default() {
        for raw in ["north%2Csouth", "a%0Ab", "a%0Db", "x%22y"] {
            let f = ViewFilter::from_query(&format!("farm={raw}&pond=Pond+A1"));
            assert_eq!(f.farm, "farm-a", "{raw}");
        }
        assert!(parse_farm("north,south").is_err());
        // unknown but harmless ids are kept
        assert_eq!(ViewFilter::from_query("farm=farm-z").farm, "farm-z");
    }

    #[test]
    fn store_reports_auto_toggle() {
        let mut store = ViewStore::default();
        let mut next = store.current().clone();
        next.auto = true;
        let change = store.apply(next);
        assert!(change.auto_changed && !change.farm_changed);
    }

    #[test]
    fn visibility_serializes_under_metric_keys() {
        let v = Visibility { nh3: false, ..Visibility::default() };
        assert!(!v.is_visible(Metric::Ammonia) && v.is_visible(Metric::Ph));
        assert_eq!(v.to_json(), r#"{"temp":true,"ph":true,"nh3":false,"dox":true}"#);
    }
}
