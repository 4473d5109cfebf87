//! Report projection and output formats
//!
//! [`project`] turns a decoded [`AnalysisResult`] into a [`ReportView`]: the
//! metric cards, the two chart series and the turbine ranking. It is a pure
//! function; the writers below only render what it produced.
//!
//! - **HTML**: Cards, D3.js charts for monthly production and the power curve, ranking table
//! - **JSON**: The serialized view, for programmatic consumption
//! - **CSV**: One section per table, for spreadsheets
//!
//! # Usage
//!
//! ```ignore
//! use windscope::report;
//!
//! let view = report::project(&result);
//! report::generate("report.html", &view)?;  // HTML
//! report::generate("report.json", &view)?;  // JSON
//! report::generate("report.csv", &view)?;   // CSV
//! ```
//!
//! # Display policy for optional metrics
//!
//! Cards exist only for summary fields that are present. EYA gap and yaw
//! misalignment are also hidden when exactly zero, which the service uses
//! for "not computed". A genuine zero is indistinguishable from an absent
//! value for those two cards. Display only: the decoded result keeps the zero.

pub mod csv;
pub mod html;
pub mod json;

use crate::response::{AnalysisResult, MonthlyEnergy, PowerCurvePoint, Summary};
use serde::Serialize;
use std::io;
use std::path::Path;

/// Rows kept in the turbine ranking.
pub const RANKING_LIMIT: usize = 10;

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, view: &ReportView) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "html" | "htm" => html::write(&mut file, view),
        "json" => json::write(&mut file, view),
        _ => csv::write(&mut file, view),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    GrossAep,
    NetAep,
    Availability,
    WakeLoss,
    CapacityFactor,
    ElectricalLoss,
    EyaGap,
    YawMisalignment,
}

impl MetricKey {
    pub fn title(self) -> &'static str {
        match self {
            MetricKey::GrossAep => "Gross AEP",
            MetricKey::NetAep => "Net AEP",
            MetricKey::Availability => "Availability",
            MetricKey::WakeLoss => "Wake Loss",
            MetricKey::CapacityFactor => "Capacity Factor",
            MetricKey::ElectricalLoss => "Electrical Loss",
            MetricKey::EyaGap => "EYA Gap",
            MetricKey::YawMisalignment => "Yaw Misalignment",
        }
    }

    fn unit(self) -> Unit {
        match self {
            MetricKey::GrossAep | MetricKey::NetAep => Unit::Gwh,
            MetricKey::YawMisalignment => Unit::Degrees,
            _ => Unit::Percent,
        }
    }

    /// Zero is read as "not computed" for these.
    fn zero_means_absent(self) -> bool {
        matches!(self, MetricKey::EyaGap | MetricKey::YawMisalignment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Gwh,
    Percent,
    Degrees,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCard {
    pub key: MetricKey,
    pub title: &'static str,
    /// Formatted number, without unit.
    pub value: String,
    pub unit: Unit,
}

impl MetricCard {
    fn new(key: MetricKey, raw: f64) -> Self {
        let unit = key.unit();
        let value = match unit {
            Unit::Gwh => format!("{}", raw),
            Unit::Percent => format!("{:.1}", raw * 100.0),
            Unit::Degrees => format!("{:.1}", raw),
        };
        Self {
            key,
            title: key.title(),
            value,
            unit,
        }
    }

    /// Value with its unit, as shown on the card.
    pub fn display(&self) -> String {
        match self.unit {
            Unit::Gwh => format!("{} GWh", self.value),
            Unit::Percent => format!("{}%", self.value),
            Unit::Degrees => format!("{}°", self.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurbineRank {
    pub rank: usize,
    pub turbine_id: String,
    pub energy: f64,
}

/// Everything the report renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportView {
    pub cards: Vec<MetricCard>,
    pub monthly_production: Vec<MonthlyEnergy>,
    pub power_curve: Vec<PowerCurvePoint>,
    pub ranking: Vec<TurbineRank>,
}

impl ReportView {
    pub fn card(&self, key: MetricKey) -> Option<&MetricCard> {
        self.cards.iter().find(|c| c.key == key)
    }

    /// All cards on one line, for terminal output.
    pub fn summary_line(&self) -> String {
        if self.cards.is_empty() {
            return "no summary metrics".to_string();
        }
        self.cards
            .iter()
            .map(|c| format!("{}: {}", c.title, c.display()))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Derive the view model. Pure: no I/O, same input gives the same output.
pub fn project(result: &AnalysisResult) -> ReportView {
    let mut power_curve = result.power_curve.clone();
    power_curve.sort_by(|a, b| a.wind_speed.total_cmp(&b.wind_speed));

    ReportView {
        cards: cards(&result.summary),
        monthly_production: result.monthly_production.clone(),
        power_curve,
        ranking: rank_turbines(result),
    }
}

fn cards(summary: &Summary) -> Vec<MetricCard> {
    let fields = [
        (MetricKey::GrossAep, summary.gross_aep),
        (MetricKey::NetAep, summary.net_aep),
        (MetricKey::Availability, summary.availability),
        (MetricKey::WakeLoss, summary.wake_loss),
        (MetricKey::CapacityFactor, summary.capacity_factor),
        (MetricKey::ElectricalLoss, summary.electrical_loss),
        (MetricKey::EyaGap, summary.eya_gap),
        (MetricKey::YawMisalignment, summary.yaw_misalignment),
    ];

    fields
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .filter(|(key, v)| !(key.zero_means_absent() && *v == 0.0))
        .map(|(key, v)| MetricCard::new(key, v))
        .collect()
}

/// Highest energy first; ties keep input order (`sort_by` is stable).
fn rank_turbines(result: &AnalysisResult) -> Vec<TurbineRank> {
    let mut sorted: Vec<_> = result.turbine_performance.iter().collect();
    sorted.sort_by(|a, b| b.energy.total_cmp(&a.energy));

    sorted
        .into_iter()
        .take(RANKING_LIMIT)
        .enumerate()
        .map(|(i, t)| TurbineRank {
            rank: i + 1,
            turbine_id: t.turbine_id.clone(),
            energy: t.energy,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::TurbineEnergy;
    use proptest::prelude::*;

    fn turbines(entries: &[(&str, f64)]) -> AnalysisResult {
        AnalysisResult {
            turbine_performance: entries
                .iter()
                .map(|(id, energy)| TurbineEnergy {
                    turbine_id: id.to_string(),
                    energy: *energy,
                })
                .collect(),
            ..Default::default()
        }
    }

    // ==========================================================================
    // METRIC CARDS
    // ==========================================================================

    #[test]
    fn test_four_core_metrics() {
        let result = AnalysisResult {
            summary: Summary {
                gross_aep: Some(120.5),
                net_aep: Some(110.2),
                availability: Some(0.962),
                wake_loss: Some(0.031),
                ..Default::default()
            },
            ..Default::default()
        };
        let view = project(&result);

        assert_eq!(view.cards.len(), 4);
        assert!(view.card(MetricKey::EyaGap).is_none());
        assert!(view.card(MetricKey::YawMisalignment).is_none());
        assert_eq!(view.card(MetricKey::Availability).unwrap().display(), "96.2%");
        assert_eq!(view.card(MetricKey::WakeLoss).unwrap().display(), "3.1%");
        assert_eq!(view.card(MetricKey::GrossAep).unwrap().display(), "120.5 GWh");
        assert_eq!(view.card(MetricKey::NetAep).unwrap().value, "110.2");
    }

    #[test]
    fn test_card_order_is_fixed() {
        let result = AnalysisResult {
            summary: Summary {
                gross_aep: Some(1.0),
                net_aep: Some(1.0),
                availability: Some(1.0),
                wake_loss: Some(0.0),
                capacity_factor: Some(0.354),
                electrical_loss: Some(0.0125),
                eya_gap: Some(-0.042),
                yaw_misalignment: Some(3.26),
            },
            ..Default::default()
        };
        let view = project(&result);
        let keys: Vec<_> = view.cards.iter().map(|c| c.key).collect();
        assert_eq!(
            keys,
            vec![
                MetricKey::GrossAep,
                MetricKey::NetAep,
                MetricKey::Availability,
                MetricKey::WakeLoss,
                MetricKey::CapacityFactor,
                MetricKey::ElectricalLoss,
                MetricKey::EyaGap,
                MetricKey::YawMisalignment,
            ]
        );
        assert_eq!(view.card(MetricKey::CapacityFactor).unwrap().display(), "35.4%");
        assert_eq!(view.card(MetricKey::EyaGap).unwrap().display(), "-4.2%");
        // Degrees are not scaled.
        assert_eq!(view.card(MetricKey::YawMisalignment).unwrap().display(), "3.3°");
    }

    #[test]
    fn test_zero_suppression_only_for_optional_pair() {
        let result = AnalysisResult {
            summary: Summary {
                wake_loss: Some(0.0),
                eya_gap: Some(0.0),
                yaw_misalignment: Some(0.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let view = project(&result);
        assert_eq!(view.cards.len(), 1);
        assert_eq!(view.card(MetricKey::WakeLoss).unwrap().display(), "0.0%");
    }

    #[test]
    fn test_empty_summary_has_no_cards() {
        let view = project(&AnalysisResult::default());
        assert!(view.cards.is_empty());
        assert_eq!(view.summary_line(), "no summary metrics");
    }

    // ==========================================================================
    // SERIES
    // ==========================================================================

    #[test]
    fn test_empty_series_project_to_empty() {
        let view = project(&AnalysisResult::default());
        assert!(view.monthly_production.is_empty());
        assert!(view.power_curve.is_empty());
        assert!(view.ranking.is_empty());
    }

    #[test]
    fn test_monthly_order_is_preserved() {
        let months = ["Mar", "Jan", "Feb"];
        let result = AnalysisResult {
            monthly_production: months
                .iter()
                .map(|m| MonthlyEnergy {
                    month: m.to_string(),
                    energy: 1.0,
                })
                .collect(),
            ..Default::default()
        };
        let view = project(&result);
        let labels: Vec<_> = view.monthly_production.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, months);
    }

    #[test]
    fn test_power_curve_is_ascending() {
        let result = AnalysisResult {
            power_curve: [(5.0, 400.0), (3.0, 50.0), (4.0, 150.0)]
                .iter()
                .map(|(ws, p)| PowerCurvePoint {
                    wind_speed: *ws,
                    power: *p,
                })
                .collect(),
            ..Default::default()
        };
        let speeds: Vec<_> = project(&result)
            .power_curve
            .iter()
            .map(|p| p.wind_speed)
            .collect();
        assert_eq!(speeds, vec![3.0, 4.0, 5.0]);
    }

    // ==========================================================================
    // TURBINE RANKING
    // ==========================================================================

    #[test]
    fn test_fifteen_turbines_keep_top_ten() {
        let entries: Vec<(String, f64)> = (1..=15)
            .map(|i| (format!("T{:02}", i), i as f64 * 10.0))
            .collect();
        let refs: Vec<(&str, f64)> = entries.iter().map(|(id, e)| (id.as_str(), *e)).collect();
        let view = project(&turbines(&refs));

        assert_eq!(view.ranking.len(), 10);
        let ranks: Vec<_> = view.ranking.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, (1..=10).collect::<Vec<_>>());
        assert_eq!(view.ranking[0].turbine_id, "T15");
        assert_eq!(view.ranking[0].energy, 150.0);
        assert_eq!(view.ranking[9].turbine_id, "T06");
        assert!(view.ranking.windows(2).all(|w| w[0].energy >= w[1].energy));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let view = project(&turbines(&[("B", 5.0), ("A", 7.0), ("C", 5.0), ("D", 5.0)]));
        let ids: Vec<_> = view.ranking.iter().map(|r| r.turbine_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_fewer_than_ten_turbines() {
        let view = project(&turbines(&[("T1", 1.0), ("T2", 2.0)]));
        assert_eq!(view.ranking.len(), 2);
        assert_eq!(view.ranking[0].rank, 1);
        assert_eq!(view.ranking[0].turbine_id, "T2");
    }

    // ==========================================================================
    // OUTPUT FILES
    // ==========================================================================

    #[test]
    fn test_generate_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let view = project(&turbines(&[("T1", 1.0)]));

        let html = dir.path().join("report.HTML");
        let json = dir.path().join("report.json");
        let csv = dir.path().join("report.txt");
        generate(&html, &view).unwrap();
        generate(&json, &view).unwrap();
        generate(&csv, &view).unwrap();

        assert!(std::fs::read_to_string(&html).unwrap().starts_with("<!DOCTYPE html>"));
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(parsed["ranking"][0]["turbine_id"], "T1");
        assert!(std::fs::read_to_string(&csv).unwrap().starts_with("metric,value,unit\n"));
    }

    proptest! {
        #[test]
        fn prop_ranking_is_deterministic(energies in prop::collection::vec(0u32..50, 0..30)) {
            let entries: Vec<(String, f64)> = energies
                .iter()
                .enumerate()
                .map(|(i, e)| (format!("T{}", i), *e as f64))
                .collect();
            let refs: Vec<(&str, f64)> = entries.iter().map(|(id, e)| (id.as_str(), *e)).collect();
            let result = turbines(&refs);

            let first = project(&result);
            let second = project(&result);
            prop_assert_eq!(&first.ranking, &second.ranking);
            prop_assert_eq!(first.ranking.len(), energies.len().min(RANKING_LIMIT));

            // Among equal energies, input position decides.
            for pair in first.ranking.windows(2) {
                prop_assert!(pair[0].energy >= pair[1].energy);
                if pair[0].energy == pair[1].energy {
                    let a: usize = pair[0].turbine_id[1..].parse().unwrap();
                    let b: usize = pair[1].turbine_id[1..].parse().unwrap();
                    prop_assert!(a < b);
                }
            }
        }
    }
}
