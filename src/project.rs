//! Forward-looking monthly projections over the aggregated history.
//!
//! Three selectable methods (moving average, linear trend, seasonal) produce
//! `N` future months with a confidence score that decays with distance. A
//! small uniform jitter keeps charts from looking synthetic; the rng is
//! injected so tests disable it.

use rand::Rng;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregate::MonthlyBucket;
use crate::error::{LedgerError, Result};

/// Minimum months of history before any projection is computed. Callers
/// should want at least three before presenting the output as reliable.
pub const MIN_HISTORY_MONTHS: usize = 2;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default,
)]
pub enum ProjectionMethod {
    #[default]
    Average,
    Trend,
    Seasonal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectionConfig {
    /// How many future months to produce.
    pub periods: usize,
    /// Symmetric relative jitter applied to revenue and expenses; `0.0`
    /// disables it and makes the projection fully deterministic.
    pub jitter: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            periods: 6,
            jitter: 0.025,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedMonth {
    pub month: String,
    pub revenue: Decimal,
    pub expenses: Decimal,
    pub result: Decimal,
    /// In `[0, 1]`, strictly decreasing with distance until the method floor.
    pub confidence: f64,
}

struct ConfidenceCurve {
    start: f64,
    decay: f64,
    floor: f64,
}

impl ConfidenceCurve {
    fn at(&self, step: usize) -> f64 {
        (self.start - self.decay * step as f64).max(self.floor)
    }
}

fn curve(method: ProjectionMethod) -> ConfidenceCurve {
    match method {
        ProjectionMethod::Average => ConfidenceCurve {
            start: 0.85,
            decay: 0.08,
            floor: 0.5,
        },
        ProjectionMethod::Trend => ConfidenceCurve {
            start: 0.9,
            decay: 0.1,
            floor: 0.3,
        },
        ProjectionMethod::Seasonal => ConfidenceCurve {
            start: 0.8,
            decay: 0.05,
            floor: 0.4,
        },
    }
}

fn parse_month_key(key: &str) -> Result<(i32, u32)> {
    let (year, month) = key
        .split_once('-')
        .ok_or_else(|| LedgerError::DateError(format!("bad month key '{}'", key)))?;
    let year: i32 = year
        .parse()
        .map_err(|_| LedgerError::DateError(format!("bad month key '{}'", key)))?;
    let month: u32 = month
        .parse()
        .map_err(|_| LedgerError::DateError(format!("bad month key '{}'", key)))?;
    if !(1..=12).contains(&month) {
        return Err(LedgerError::DateError(format!("bad month key '{}'", key)));
    }
    Ok((year, month))
}

fn step_month(year: i32, month: u32, steps: usize) -> (i32, u32) {
    let total = year as i64 * 12 + (month as i64 - 1) + steps as i64;
    ((total / 12) as i32, (total % 12) as u32 + 1)
}

fn mean(values: &[(Decimal, Decimal)]) -> (Decimal, Decimal) {
    if values.is_empty() {
        return (Decimal::ZERO, Decimal::ZERO);
    }
    let n = Decimal::from(values.len());
    let revenue: Decimal = values.iter().map(|v| v.0).sum();
    let expenses: Decimal = values.iter().map(|v| v.1).sum();
    (revenue / n, expenses / n)
}

fn trailing_mean(
    history: &[(&String, &MonthlyBucket)],
    window: usize,
) -> (Decimal, Decimal) {
    let take = window.min(history.len());
    let tail: Vec<(Decimal, Decimal)> = history[history.len() - take..]
        .iter()
        .map(|(_, b)| (b.revenue, b.expenses))
        .collect();
    mean(&tail)
}

/// Projects `config.periods` months past the end of `history` using the
/// selected method. Needs at least [`MIN_HISTORY_MONTHS`] months. The
/// accumulated balance across the output is a running sum; it is not reset
/// per month.
pub fn project(
    history: &BTreeMap<String, MonthlyBucket>,
    method: ProjectionMethod,
    config: &ProjectionConfig,
    rng: &mut impl Rng,
) -> Result<Vec<ProjectedMonth>> {
    let months: Vec<(&String, &MonthlyBucket)> = history.iter().collect();
    if months.len() < MIN_HISTORY_MONTHS {
        return Err(LedgerError::InsufficientHistory {
            required: MIN_HISTORY_MONTHS,
            actual: months.len(),
        });
    }

    let (last_year, last_month) = parse_month_key(months[months.len() - 1].0)?;
    let confidence = curve(method);

    // The trend line is fixed for the whole horizon: delta between the mean
    // of the most recent three months and the earliest three, spread over
    // three steps.
    let trend = {
        let take = 3.min(months.len());
        let recent: Vec<(Decimal, Decimal)> = months[months.len() - take..]
            .iter()
            .map(|(_, b)| (b.revenue, b.expenses))
            .collect();
        let earliest: Vec<(Decimal, Decimal)> = months[..take]
            .iter()
            .map(|(_, b)| (b.revenue, b.expenses))
            .collect();
        let recent_mean = mean(&recent);
        let earliest_mean = mean(&earliest);
        let three = Decimal::from(3);
        (
            recent_mean,
            (
                (recent_mean.0 - earliest_mean.0) / three,
                (recent_mean.1 - earliest_mean.1) / three,
            ),
        )
    };

    let mut projections = Vec::with_capacity(config.periods);
    for step in 1..=config.periods {
        let (year, month) = step_month(last_year, last_month, step);

        let (mut revenue, mut expenses) = match method {
            ProjectionMethod::Average => trailing_mean(&months, 6),
            ProjectionMethod::Trend => {
                let ((base_rev, base_exp), (slope_rev, slope_exp)) = trend;
                let steps = Decimal::from(step as u32);
                (base_rev + slope_rev * steps, base_exp + slope_exp * steps)
            }
            ProjectionMethod::Seasonal => {
                let same_month: Vec<(Decimal, Decimal)> = months
                    .iter()
                    .filter(|(key, _)| {
                        parse_month_key(key).map(|(_, m)| m == month).unwrap_or(false)
                    })
                    .map(|(_, b)| (b.revenue, b.expenses))
                    .collect();
                if same_month.is_empty() {
                    trailing_mean(&months, 6)
                } else {
                    mean(&same_month)
                }
            }
        };

        if config.jitter > 0.0 {
            let revenue_shift: f64 = rng.gen_range(-config.jitter..=config.jitter);
            let expense_shift: f64 = rng.gen_range(-config.jitter..=config.jitter);
            revenue *= Decimal::from_f64_retain(1.0 + revenue_shift).unwrap_or(Decimal::ONE);
            expenses *= Decimal::from_f64_retain(1.0 + expense_shift).unwrap_or(Decimal::ONE);
        }

        revenue = revenue.max(Decimal::ZERO);
        expenses = expenses.max(Decimal::ZERO);

        projections.push(ProjectedMonth {
            month: format!("{:04}-{:02}", year, month),
            revenue,
            expenses,
            result: revenue - expenses,
            confidence: confidence.at(step),
        });
    }

    Ok(projections)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RiskAlert {
    /// Accumulated balance goes negative within the first three projected
    /// months.
    NegativeBalance { month: String, balance: Decimal },
    /// Half or more of the projected months close negative.
    MostlyNegative { negative_months: usize, total: usize },
    /// At least one month fell below 0.5 confidence.
    LowConfidence { months: usize },
}

/// Derives risk alerts from a projection sequence.
pub fn risk_alerts(projections: &[ProjectedMonth]) -> Vec<RiskAlert> {
    let mut alerts = Vec::new();

    let mut accumulated = Decimal::ZERO;
    for (idx, projection) in projections.iter().enumerate() {
        accumulated += projection.result;
        if accumulated < Decimal::ZERO && idx < 3 {
            alerts.push(RiskAlert::NegativeBalance {
                month: projection.month.clone(),
                balance: accumulated,
            });
        }
    }

    let negative_months = projections
        .iter()
        .filter(|p| p.result < Decimal::ZERO)
        .count();
    if !projections.is_empty() && negative_months * 2 >= projections.len() {
        alerts.push(RiskAlert::MostlyNegative {
            negative_months,
            total: projections.len(),
        });
    }

    let low_confidence = projections.iter().filter(|p| p.confidence < 0.5).count();
    if low_confidence > 0 {
        alerts.push(RiskAlert::LowConfidence {
            months: low_confidence,
        });
    }

    alerts
}
