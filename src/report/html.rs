//! HTML report generation with D3.js charts

use super::{MetricKey, ReportView};
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, view: &ReportView) -> io::Result<()> {
    // Chart data for D3.js; `</` would close the script tag early
    let monthly_json = serde_json::to_string(&view.monthly_production)?.replace("</", "<\\/");
    let curve_json = serde_json::to_string(&view.power_curve)?;

    let cards = render_cards(view);
    let ranking = render_ranking(view);

    write!(writer, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Wind Plant Analysis Report</title>
    <script src="https://d3js.org/d3.v7.min.js"></script>
    <style>
        :root {{
            --bg: #f8fafc;
            --card: #ffffff;
            --border: #e2e8f0;
            --text: #0f172a;
            --dim: #64748b;
            --amber: #f59e0b;
            --emerald: #10b981;
            --blue: #3b82f6;
            --rose: #f43f5e;
            --violet: #8b5cf6;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--text);
            line-height: 1.5;
        }}
        .container {{ max-width: 1200px; margin: 0 auto; padding: 2rem; }}

        /* Header */
        .header {{
            display: flex;
            align-items: baseline;
            gap: 1rem;
            margin-bottom: 2rem;
            padding-bottom: 1rem;
            border-bottom: 1px solid var(--border);
        }}
        .logo {{ font-size: 2rem; font-weight: 800; color: var(--blue); }}
        .subtitle {{ color: var(--dim); }}

        /* Metric cards */
        .cards {{
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(220px, 1fr));
            gap: 1.5rem;
            margin-bottom: 2rem;
        }}
        .card {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.5rem;
            border-top: 4px solid var(--blue);
        }}
        .card.gross_aep {{ border-top-color: var(--amber); }}
        .card.net_aep {{ border-top-color: var(--emerald); }}
        .card.wake_loss, .card.electrical_loss {{ border-top-color: var(--rose); }}
        .card.eya_gap, .card.yaw_misalignment {{ border-top-color: var(--violet); }}
        .card-title {{ color: var(--dim); font-size: 0.875rem; font-weight: 500; }}
        .card-value {{ font-size: 1.75rem; font-weight: 700; margin-top: 0.25rem; }}
        .card-unit {{ font-size: 0.875rem; font-weight: 400; color: var(--dim); }}

        /* Charts */
        .charts {{
            display: grid;
            grid-template-columns: 1fr 1fr;
            gap: 2rem;
            margin-bottom: 2rem;
        }}
        .chart-card {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 16px;
            padding: 1.5rem;
        }}
        .chart-title {{ font-size: 1.125rem; font-weight: 700; margin-bottom: 1rem; }}
        .chart {{ width: 100%; height: 320px; }}
        .empty {{ color: var(--dim); font-style: italic; padding: 2rem 0; text-align: center; }}
        .axis text {{ fill: var(--dim); font-size: 12px; }}
        .axis path, .axis line {{ stroke: var(--border); }}
        .grid line {{ stroke: var(--border); stroke-dasharray: 3 3; }}
        .grid path {{ display: none; }}

        /* Ranking */
        table {{ width: 100%; border-collapse: collapse; }}
        th {{
            text-align: left;
            color: var(--dim);
            font-size: 0.75rem;
            text-transform: uppercase;
            letter-spacing: 0.05em;
            padding: 0.5rem 0.75rem;
            border-bottom: 1px solid var(--border);
        }}
        td {{ padding: 0.5rem 0.75rem; border-bottom: 1px solid var(--border); }}
        td.rank {{ font-weight: 700; color: var(--blue); width: 4rem; }}
        td.energy {{ text-align: right; font-variant-numeric: tabular-nums; }}

        @media (max-width: 900px) {{
            .charts {{ grid-template-columns: 1fr; }}
        }}
    </style>
</head>
<body>
<div class="container">
    <div class="header">
        <div class="logo">Analysis Complete</div>
        <div class="subtitle">Wind plant operational assessment</div>
    </div>

    <div class="cards">
{cards}
    </div>

    <div class="charts">
        <div class="chart-card">
            <div class="chart-title">Monthly Production</div>
            <div id="monthly-chart" class="chart"></div>
        </div>
        <div class="chart-card">
            <div class="chart-title">Power Curve</div>
            <div id="curve-chart" class="chart"></div>
        </div>
    </div>

    <div class="chart-card">
        <div class="chart-title">Turbine Ranking</div>
{ranking}
    </div>
</div>

<script>
const monthly = {monthly_json};
const curve = {curve_json};
const margin = {{ top: 10, right: 10, bottom: 30, left: 50 }};

function frame(id, data) {{
    const el = document.getElementById(id);
    if (data.length === 0) {{
        el.innerHTML = '<div class="empty">No data</div>';
        return null;
    }}
    const width = el.clientWidth - margin.left - margin.right;
    const height = el.clientHeight - margin.top - margin.bottom;
    const svg = d3.select(el).append('svg')
        .attr('width', width + margin.left + margin.right)
        .attr('height', height + margin.top + margin.bottom)
        .append('g')
        .attr('transform', `translate(${{margin.left}},${{margin.top}})`);
    return {{ svg, width, height }};
}}

function drawMonthly() {{
    const f = frame('monthly-chart', monthly);
    if (!f) return;
    const x = d3.scaleBand().domain(monthly.map(d => d.month)).range([0, f.width]).padding(0.2);
    const y = d3.scaleLinear().domain([0, d3.max(monthly, d => d.energy)]).nice().range([f.height, 0]);
    f.svg.append('g').attr('class', 'grid').call(d3.axisLeft(y).tickSize(-f.width).tickFormat(''));
    f.svg.append('g').attr('class', 'axis').attr('transform', `translate(0,${{f.height}})`).call(d3.axisBottom(x));
    f.svg.append('g').attr('class', 'axis').call(d3.axisLeft(y));
    f.svg.selectAll('rect').data(monthly).join('rect')
        .attr('x', d => x(d.month))
        .attr('y', d => y(d.energy))
        .attr('width', x.bandwidth())
        .attr('height', d => f.height - y(d.energy))
        .attr('rx', 4)
        .attr('fill', '#3B82F6')
        .append('title').text(d => `${{d.month}}: ${{d.energy}}`);
}}

function drawCurve() {{
    const f = frame('curve-chart', curve);
    if (!f) return;
    const x = d3.scaleLinear().domain(d3.extent(curve, d => d.wind_speed)).range([0, f.width]);
    const y = d3.scaleLinear().domain([0, d3.max(curve, d => d.power)]).nice().range([f.height, 0]);
    f.svg.append('g').attr('class', 'grid').call(d3.axisLeft(y).tickSize(-f.width).tickFormat(''));
    f.svg.append('g').attr('class', 'axis').attr('transform', `translate(0,${{f.height}})`).call(d3.axisBottom(x));
    f.svg.append('g').attr('class', 'axis').call(d3.axisLeft(y));
    f.svg.append('path').datum(curve)
        .attr('fill', 'rgba(16, 185, 129, 0.15)')
        .attr('d', d3.area().curve(d3.curveMonotoneX).x(d => x(d.wind_speed)).y0(f.height).y1(d => y(d.power)));
    f.svg.append('path').datum(curve)
        .attr('fill', 'none')
        .attr('stroke', '#10B981')
        .attr('stroke-width', 3)
        .attr('d', d3.line().curve(d3.curveMonotoneX).x(d => x(d.wind_speed)).y(d => y(d.power)));
}}

drawMonthly();
drawCurve();
</script>
</body>
</html>
"#,
        cards = cards,
        ranking = ranking,
        monthly_json = monthly_json,
        curve_json = curve_json,
    )
}

fn render_cards(view: &ReportView) -> String {
    if view.cards.is_empty() {
        return r#"        <div class="empty">No summary metrics</div>"#.to_string();
    }
    view.cards
        .iter()
        .map(|card| {
            let unit = match card.unit {
                super::Unit::Gwh => "GWh",
                super::Unit::Percent => "%",
                super::Unit::Degrees => "°",
            };
            format!(
                r#"        <div class="card {}"><div class="card-title">{}</div><div class="card-value">{} <span class="card-unit">{}</span></div></div>"#,
                css_class(card.key),
                card.title,
                html_escape(&card.value),
                unit
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_ranking(view: &ReportView) -> String {
    if view.ranking.is_empty() {
        return r#"        <div class="empty">No turbine data</div>"#.to_string();
    }
    let rows: Vec<String> = view
        .ranking
        .iter()
        .map(|t| {
            format!(
                r#"            <tr><td class="rank">#{}</td><td>{}</td><td class="energy">{}</td></tr>"#,
                t.rank,
                html_escape(&t.turbine_id),
                t.energy
            )
        })
        .collect();
    format!(
        "        <table>\n            <tr><th>Rank</th><th>Turbine</th><th>Energy</th></tr>\n{}\n        </table>",
        rows.join("\n")
    )
}

fn css_class(key: MetricKey) -> &'static str {
    match key {
        MetricKey::GrossAep => "gross_aep",
        MetricKey::NetAep => "net_aep",
        MetricKey::Availability => "availability",
        MetricKey::WakeLoss => "wake_loss",
        MetricKey::CapacityFactor => "capacity_factor",
        MetricKey::ElectricalLoss => "electrical_loss",
        MetricKey::EyaGap => "eya_gap",
        MetricKey::YawMisalignment => "yaw_misalignment",
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
