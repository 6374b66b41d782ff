//! ==============================================================================
//! page.rs - server-rendered dashboard page
//! ==============================================================================
//!
//! purpose:
//!     renders the whole "current farm" page from one snapshot: filter row,
//!     farm overview with kpi cards, sensor table, live panel with alerts,
//!     visibility toggles and one chart card per visible metric.
//!
//! interaction model:
//!     the page carries no client state of its own. every control rewrites
//!     the query string and replaces the current history entry, so the url is
//!     always the shareable view. charts re-render at the container width via
//!     /charts/{metric}; hover asks /api/hover/{metric} for the tooltip and
//!     reloads the svg when the hover reports a newer series than the one shown.
//!
//! relationships:
//!     - used by: web.rs (GET /)
//!     - uses: analytics.rs (derived values), chart.rs (initial svgs), html.rs
//!
//! ==============================================================================

use std::fmt::Write;

use crate::analytics::{Derived, MetricStats};
use crate::chart::{format_timestamp, render_svg, ChartGeometry, ChartLayout};
use crate::dashboard::Snapshot;
use crate::domain::{find_farm, ponds_for, Metric, FARMS};
use crate::html::html_escape;
use crate::view_state::{PondSelection, DATE_FORMAT};

/// page options that do not come from the view filter
#[derive(Clone, Copy, Debug)]
pub struct PageOptions {
    pub chart_width: f64,
    /// reload cadence while auto-refresh is on
    pub refresh_ms: u64,
}

pub fn render_page(snapshot: &Snapshot, options: PageOptions) -> String {
    let derived = snapshot.derived();
    let query = snapshot.filter.to_query();

    let mut body = String::with_capacity(32 * 1024);
    body.push_str(&filter_row(snapshot));
    body.push_str(r#"<div class="dash-grid">"#);
    body.push_str(&overview_card(snapshot, &derived));
    body.push_str(&live_card(snapshot, &derived, options));
    body.push_str("</div>");

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Current Farm</title>
<style>{STYLE}</style>
</head>
<body data-query="{query}" data-auto="{auto}" data-refresh="{refresh}">
<div class="overlay overlay-wide">
<h1>Current Farm</h1>
{body}
</div>
<script>{SCRIPT}</script>
</body>
</html>"#,
        query = html_escape(&query),
        auto = if snapshot.filter.auto { "1" } else { "0" },
        refresh = options.refresh_ms,
    )
}

// ==============================================================================
// filter row
// ==============================================================================

fn filter_row(snapshot: &Snapshot) -> String {
    let f = &snapshot.filter;
    let mut out = String::from(r#"<div class="filter-row wrap">"#);

    out.push_str(r#"<label>Farm <select id="farm">"#);
    for farm in FARMS.iter() {
        let selected = if farm.id == f.farm { " selected" } else { "" };
        let _ = write!(out, r#"<option value="{}"{selected}>{}</option>"#, farm.id, html_escape(farm.display_name));
    }
    if find_farm(&f.farm).is_none() {
        let _ = write!(out, r#"<option value="{0}" selected>{0}</option>"#, html_escape(&f.farm));
    }
    out.push_str("</select></label>");

    out.push_str(r#"<label>Pond <select id="pond">"#);
    let all_selected = if f.pond == PondSelection::All { " selected" } else { "" };
    let _ = write!(out, r#"<option value="All"{all_selected}>All</option>"#);
    for pond in ponds_for(&f.farm) {
        let selected = if f.pond.as_str() == *pond { " selected" } else { "" };
        let _ = write!(out, r#"<option value="{0}"{selected}>{0}</option>"#, html_escape(pond));
    }
    out.push_str("</select></label>");

    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default();
    let _ = write!(out, r#"<label>From <input type="date" id="from" value="{}"></label>"#, date(f.from));
    let _ = write!(out, r#"<label>To <input type="date" id="to" value="{}"></label>"#, date(f.to));

    let checked = if f.auto { " checked" } else { "" };
    let _ = write!(
        out,
        r#"<label class="toggle on"><input type="checkbox" id="auto"{checked}><span>Auto refresh</span></label>"#
    );
    out.push_str(r#"<a class="btn-primary" id="export" href="/export.csv" download>Export CSV</a>"#);
    out.push_str("</div>");
    out
}

// ==============================================================================
// left column: overview, kpis, table
// ==============================================================================

fn kpi(title: &str, stats: &MetricStats) -> String {
    format!(
        r#"<div class="kpi"><div class="kpi-title">{}</div><div class="kpi-value">{:.2}</div><div class="kpi-sub">min {:.2} • max {:.2}</div></div>"#,
        html_escape(title),
        stats.average,
        stats.min,
        stats.max
    )
}

fn kpi_title(metric: Metric) -> &'static str {
    match metric {
        Metric::Temperature => "Avg Temp (°C)",
        Metric::Ph => "Avg pH",
        Metric::Ammonia => "Avg NH₃ (mg/L)",
        Metric::DissolvedOxygen => "Avg DO (mg/L)",
    }
}

fn overview_card(snapshot: &Snapshot, derived: &Derived) -> String {
    let farm_name = find_farm(&snapshot.farm_id).map(|f| f.display_name).unwrap_or(snapshot.farm_id.as_str());
    let mut out = String::from(r#"<section class="card"><div class="section-title">Farm Overview</div><div class="overview">"#);

    let _ = write!(out, "<div><b>Farm:</b> {}</div>", html_escape(farm_name));
    let _ = write!(out, "<div><b>Ponds:</b> {}</div>", html_escape(&ponds_for(&snapshot.farm_id).join(", ")));
    let _ = write!(out, "<div><b>Records:</b> {}</div>", derived.stats.count);
    if let Some(latest) = &derived.stats.latest {
        let _ = write!(out, "<div><b>Last sample:</b> {}</div>", format_timestamp(latest.timestamp));
    }
    out.push_str("</div>");

    out.push_str(r#"<div class="kpi-grid">"#);
    for metric in Metric::ALL {
        out.push_str(&kpi(kpi_title(metric), derived.stats.metrics.get(metric)));
    }
    out.push_str("</div>");

    out.push_str(
        r#"<h2>Sensor Data</h2><div class="table-scroll"><table class="data-table"><thead><tr><th>Timestamp</th><th>Water Temp (°C)</th><th>pH</th><th>Ammonia (mg/L)</th><th>DO (mg/L)</th><th>Pond</th></tr></thead><tbody>"#,
    );
    for r in &derived.filtered {
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            format_timestamp(r.timestamp),
            r.temperature,
            r.ph,
            r.ammonia,
            r.dissolved_oxygen,
            html_escape(&r.pond_label)
        );
    }
    out.push_str("</tbody></table></div></section>");
    out
}

// ==============================================================================
// right column: live panel, alerts, toggles, charts
// ==============================================================================

fn badge_class(metric: Metric, value: f64) -> (&'static str, &'static str) {
    let badge = metric.threshold().badge(value);
    let class = match badge {
        crate::domain::Badge::Low => "warning",
        crate::domain::Badge::Ok => "ok",
        crate::domain::Badge::High => "danger",
    };
    (class, badge.as_str())
}

fn live_card(snapshot: &Snapshot, derived: &Derived, options: PageOptions) -> String {
    let mut out = String::from(r#"<section class="card"><div class="section-title">Live Data Panel</div>"#);

    match &derived.stats.latest {
        Some(latest) => {
            out.push_str(r#"<div class="live-grid">"#);
            for metric in Metric::ALL {
                let v = latest.value(metric);
                let (class, text) = badge_class(metric, v);
                let _ = write!(
                    out,
                    r#"<div class="live-item"><div class="live-name">{}</div><div class="live-value">{v}</div><span class="badge {class}">{text}</span></div>"#,
                    html_escape(metric.threshold().label)
                );
            }
            out.push_str("</div>");
        }
        None => out.push_str("<div>No data.</div>"),
    }

    out.push_str(r#"<div class="section-title spaced">AI Alerts</div>"#);
    if derived.alerts.is_empty() {
        out.push_str(r#"<div class="muted">All sensors within safe ranges.</div>"#);
    } else {
        out.push_str(r#"<ul class="alerts">"#);
        for alert in &derived.alerts {
            let _ = write!(
                out,
                r#"<li class="badge {}">{}</li>"#,
                alert.severity.as_str(),
                html_escape(&alert.message)
            );
        }
        out.push_str("</ul>");
    }

    let show = snapshot.filter.show;
    out.push_str(r#"<div class="toggle-bar">"#);
    for metric in Metric::ALL {
        let on = show.is_visible(metric);
        let _ = write!(
            out,
            r#"<label class="toggle{}"><input type="checkbox" data-toggle="{}"{}><span>{} <em class="muted">• {}% safe</em></span></label>"#,
            if on { " on" } else { "" },
            metric.key(),
            if on { " checked" } else { "" },
            html_escape(metric.threshold().label),
            derived.safety.get(metric)
        );
    }
    out.push_str("</div>");

    out.push_str(r#"<div class="charts">"#);
    let layout = ChartLayout::with_width(options.chart_width);
    for metric in Metric::ALL.into_iter().filter(|m| show.is_visible(*m)) {
        let cfg = metric.chart();
        let geometry = ChartGeometry::for_metric(&derived.filtered, metric, layout);
        let _ = write!(
            out,
            r#"<div class="chart-card" style="color:{color}"><div class="chart-title">{title}</div><div class="chart-wrap" data-metric="{key}"><div class="chart-svg">{svg}</div><div class="chart-tooltip" hidden></div></div></div>"#,
            color = cfg.color,
            title = html_escape(cfg.title),
            key = metric.key(),
            svg = render_svg(&geometry, metric, None),
        );
    }
    out.push_str("</div></section>");
    out
}

// ==============================================================================
// static assets
// ==============================================================================

const STYLE: &str = r#"
body{font-family:system-ui,sans-serif;margin:0;background:#f1f5f9;color:#0f172a}
.overlay{max-width:1280px;margin:0 auto;padding:1.5rem}
.filter-row{display:flex;flex-wrap:wrap;gap:.8rem;align-items:end;margin-bottom:1rem}
.filter-row label{display:flex;flex-direction:column;font-size:.85rem;gap:.25rem}
.btn-primary{background:#0ea5e9;color:#fff;padding:.5rem .9rem;border-radius:8px;text-decoration:none}
.dash-grid{display:grid;grid-template-columns:1fr 1fr;gap:1rem}
@media (max-width:960px){.dash-grid{grid-template-columns:1fr}}
.card{background:#fff;border-radius:12px;padding:1rem;box-shadow:0 1px 3px #0f172a1a}
.section-title{font-weight:600;margin-bottom:.5rem}
.section-title.spaced{margin-top:.8rem}
.kpi-grid{display:grid;grid-template-columns:repeat(2,1fr);gap:.6rem;margin:.8rem 0}
.kpi{border:1px solid #e2e8f0;border-radius:10px;padding:.6rem}
.kpi-title{font-size:.8rem;color:#64748b}.kpi-value{font-size:1.4rem;font-weight:600}.kpi-sub{font-size:.75rem;color:#64748b}
.table-scroll{max-height:320px;overflow:auto}
.data-table{width:100%;border-collapse:collapse;font-size:.8rem}
.data-table th,.data-table td{padding:.3rem .4rem;border-bottom:1px solid #e2e8f0;text-align:left}
.live-grid{display:grid;grid-template-columns:repeat(2,1fr);gap:.6rem}
.live-item{border:1px solid #e2e8f0;border-radius:10px;padding:.5rem}
.live-name{font-size:.8rem;color:#64748b}.live-value{font-size:1.2rem;font-weight:600}
.badge{display:inline-block;padding:.1rem .5rem;border-radius:999px;font-size:.75rem}
.badge.ok{background:#dcfce7;color:#166534}.badge.warning{background:#fef9c3;color:#854d0e}.badge.danger{background:#fee2e2;color:#991b1b}
.alerts{list-style:none;padding:0;display:flex;flex-direction:column;gap:.3rem}
.muted{color:#64748b}
.toggle-bar{display:flex;flex-wrap:wrap;gap:.5rem;margin:.8rem 0}
.toggle{display:flex;align-items:center;gap:.3rem;font-size:.85rem;opacity:.6}.toggle.on{opacity:1}
.charts{display:flex;flex-direction:column;gap:.8rem}
.chart-card{border:1px solid #e2e8f0;border-radius:10px;padding:.5rem}
.chart-title{font-weight:600;font-size:.9rem}
.chart-wrap{position:relative}
.chart-tooltip{position:absolute;pointer-events:none;background:#fff;border:1px solid #cbd5e1;border-radius:6px;padding:.3rem .5rem;font-size:.75rem;color:#0f172a;white-space:nowrap}
"#;

const SCRIPT: &str = r#"
(function () {
  var body = document.body;
  function navigate(mutate) {
    var q = new URLSearchParams(body.dataset.query);
    mutate(q);
    location.replace('/?' + q.toString());
  }
  function on(id, fn) {
    var el = document.getElementById(id);
    if (el) el.addEventListener('change', function () { fn(el); });
  }
  on('farm', function (el) { navigate(function (q) { q.set('farm', el.value); q.set('pond', 'All'); }); });
  on('pond', function (el) { navigate(function (q) { q.set('pond', el.value); }); });
  ['from', 'to'].forEach(function (key) {
    on(key, function (el) { navigate(function (q) { if (el.value) q.set(key, el.value); else q.delete(key); }); });
  });
  on('auto', function (el) { navigate(function (q) { q.set('auto', el.checked ? '1' : '0'); }); });
  document.querySelectorAll('[data-toggle]').forEach(function (el) {
    el.addEventListener('change', function () {
      navigate(function (q) {
        var show = {};
        try { show = JSON.parse(q.get('show') || '{}'); } catch (e) { show = {}; }
        ['temp', 'ph', 'nh3', 'dox'].forEach(function (k) { if (show[k] === undefined) show[k] = true; });
        show[el.dataset.toggle] = el.checked;
        q.set('show', JSON.stringify(show));
      });
    });
  });

  if (body.dataset.auto === '1') {
    setTimeout(function () { location.replace(location.pathname + location.search); }, Number(body.dataset.refresh) || 10000);
  }

  var NS = 'http://www.w3.org/2000/svg';
  document.querySelectorAll('.chart-wrap').forEach(function (wrap) {
    var metric = wrap.dataset.metric;
    var holder = wrap.querySelector('.chart-svg');
    var tip = wrap.querySelector('.chart-tooltip');
    var width = 0;
    var pending = null;

    function clearHover() {
      tip.hidden = true;
      var old = holder.querySelector('.hover');
      if (old) old.remove();
    }

    function loadChart(w) {
      return fetch('/charts/' + metric + '?width=' + w)
        .then(function (r) { return r.ok ? r.text() : null; })
        .then(function (svg) { if (svg) holder.innerHTML = svg; });
    }

    new ResizeObserver(function (entries) {
      var w = Math.round(entries[0].target.clientWidth);
      if (!w || w === width) return;
      width = w;
      loadChart(w);
    }).observe(wrap);

    holder.addEventListener('pointermove', function (e) {
      var x = e.clientX - holder.getBoundingClientRect().left;
      if (pending) return;
      var w = width || holder.clientWidth;
      var shown = holder.querySelector('svg');
      var series = shown ? shown.getAttribute('data-series') || '' : '';
      pending = fetch('/api/hover/' + metric + '?x=' + x + '&width=' + w + '&series=' + encodeURIComponent(series))
        .then(function (r) { return r.ok ? r.json() : null; })
        .then(function (t) {
          // live readings arrived since this svg was drawn
          if (t && t.stale) return loadChart(w).then(function () { return t; });
          return t;
        })
        .then(function (t) {
          pending = null;
          clearHover();
          if (!t) return;
          var svg = holder.querySelector('svg');
          if (svg) {
            var g = document.createElementNS(NS, 'g');
            g.setAttribute('class', 'hover');
            var guide = document.createElementNS(NS, 'line');
            guide.setAttribute('x1', t.x); guide.setAttribute('x2', t.x);
            guide.setAttribute('y1', t.plot_top); guide.setAttribute('y2', t.plot_bottom);
            guide.setAttribute('stroke', '#94a3b8'); guide.setAttribute('stroke-dasharray', '3 3');
            var dot = document.createElementNS(NS, 'circle');
            dot.setAttribute('cx', t.x); dot.setAttribute('cy', t.y); dot.setAttribute('r', '3.5');
            dot.setAttribute('fill', 'currentColor');
            g.appendChild(guide); g.appendChild(dot); svg.appendChild(g);
          }
          tip.innerHTML = '';
          t.lines.forEach(function (line) {
            var div = document.createElement('div');
            div.textContent = line;
            tip.appendChild(div);
          });
          tip.style.left = t.left + 'px';
          tip.style.top = t.top + 'px';
          tip.hidden = false;
        })
        .catch(function () { pending = null; });
    });
    holder.addEventListener('pointerleave', clearHover);
  });
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Reading;
    use crate::view_state::ViewFilter;
    use chrono::{Duration, TimeZone, Utc};

    fn reading(i: i64, temp: f64, pond: &str) -> Reading {
        Reading {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::hours(6 * i),
            temperature: temp,
            ph: 7.0,
            ammonia: 0.2,
            dissolved_oxygen: 7.0,
            farm_id: "farm-b".into(),
            pond_label: pond.into(),
        }
    }

    fn snapshot(query: &str, readings: Vec<Reading>) -> Snapshot {
        let filter = ViewFilter::from_query(query);
        Snapshot { farm_id: filter.farm.clone(), filter, readings, live: false }
    }

    fn options() -> PageOptions {
        PageOptions { chart_width: 600.0, refresh_ms: 10_000 }
    }

    #[test]
    fn renders_overview_and_kpis() {
        let page = render_page(&snapshot("farm=farm-b", vec![reading(0, 25.0, "Pond B1"), reading(1, 27.0, "Pond B2")]), options());
        assert!(page.contains("<b>Farm:</b> Coral Prawn Estate"));
        assert!(page.contains("<b>Ponds:</b> Pond B1, Pond B2, Pond B3"));
        assert!(page.contains("<b>Records:</b> 2"));
        assert!(page.contains(r#"<div class="kpi-value">26.00</div><div class="kpi-sub">min 25.00 • max 27.00</div>"#));
        assert!(page.contains("All sensors within safe ranges."));
        assert_eq!(page.matches(r#"class="chart-card""#).count(), 4);
    }

    #[test]
    fn hidden_metrics_have_no_chart_card() {
        let q = "farm=farm-b&show=%7B%22temp%22%3Afalse%2C%22nh3%22%3Afalse%7D";
        let page = render_page(&snapshot(q, vec![reading(0, 25.0, "Pond B1")]), options());
        assert_eq!(page.matches(r#"class="chart-card""#).count(), 2);
        assert!(!page.contains(r#"class="chart-wrap" data-metric="temp""#));
        assert!(page.contains(r#"class="chart-wrap" data-metric="ph""#));
    }

    #[test]
    fn hot_latest_reading_raises_alert_and_badge() {
        let page = render_page(&snapshot("farm=farm-b", vec![reading(0, 25.0, "Pond B1"), reading(1, 31.0, "Pond B1")]), options());
        assert!(page.contains(r#"<li class="badge danger">Water Temp (°C) 31 &gt; max 30</li>"#));
        assert!(page.contains(r#"<span class="badge danger">high</span>"#));
        assert!(page.contains("• 50% safe"));
    }

    #[test]
    fn empty_window_shows_no_data() {
        let page = render_page(&snapshot("farm=farm-b&from=2030-01-01", vec![reading(0, 25.0, "Pond B1")]), options());
        assert!(page.contains("<div>No data.</div>"));
        assert!(page.contains("<b>Records:</b> 0"));
        assert!(!page.contains("Last sample"));
    }

    #[test]
    fn selected_controls_reflect_filter() {
        let page = render_page(&snapshot("farm=farm-b&pond=Pond+B2&from=2024-05-01&auto=1", vec![]), options());
        assert!(page.contains(r#"<option value="farm-b" selected>"#));
        assert!(page.contains(r#"<option value="Pond B2" selected>"#));
        assert!(page.contains(r#"id="from" value="2024-05-01""#));
        assert!(page.contains(r#"id="auto" checked"#));
        assert!(page.contains(r#"data-auto="1""#));
    }

    #[test]
    fn unknown_farm_id_is_escaped() {
        let page = render_page(&snapshot("farm=%3Cscript%3E", vec![]), options());
        assert!(!page.contains("<script>alert"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(page.contains("<b>Ponds:</b> Pond"));
    }
}
