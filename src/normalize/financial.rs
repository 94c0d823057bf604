//! Financial metrics
//!
//! The metrics sheet has no real header row: column 1 holds a metric name and
//! column 2 its value, so columns are read by position. The CSV header line is
//! therefore the first metric pair.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::sheets::Row;

/// Fields of [`FinancialMetrics`] a sheet label can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalRevenue,
    TotalProfit,
    TotalExpenses,
    ProfitMargin,
    OutstandingReceivables,
    AverageClaimValue,
}

/// Maps a lower-case substring of the metric-name cell to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricLabel {
    pub contains: String,
    pub metric: Metric,
}

impl MetricLabel {
    pub fn new(contains: &str, metric: Metric) -> Self {
        MetricLabel {
            contains: contains.to_lowercase(),
            metric,
        }
    }
}

/// Label table used when a tenant does not configure its own.
///
/// Order matters: the first label found in a name cell wins, so
/// "profit margin" is listed ahead of "total profit".
pub fn default_metric_labels() -> Vec<MetricLabel> {
    vec![
        MetricLabel::new("profit margin", Metric::ProfitMargin),
        MetricLabel::new("total revenue", Metric::TotalRevenue),
        MetricLabel::new("total profit", Metric::TotalProfit),
        MetricLabel::new("net profit", Metric::TotalProfit),
        MetricLabel::new("total expenses", Metric::TotalExpenses),
        MetricLabel::new("outstanding", Metric::OutstandingReceivables),
        MetricLabel::new("average claim", Metric::AverageClaimValue),
        MetricLabel::new("average job", Metric::AverageClaimValue),
    ]
}

/// Headline numbers for one tenant.
///
/// Values stay as the sheet's text (trimmed); use [`FinancialMetrics::formatted`]
/// or [`format_currency`] for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialMetrics {
    pub total_revenue: String,
    pub total_profit: String,
    pub total_expenses: String,
    pub profit_margin: String,
    pub outstanding_receivables: String,
    pub average_claim_value: String,

    /// Wall-clock time of normalization
    pub refreshed_at: DateTime<Utc>,
}

impl FinancialMetrics {
    pub fn field_mut(&mut self, metric: Metric) -> &mut String {
        match metric {
            Metric::TotalRevenue => &mut self.total_revenue,
            Metric::TotalProfit => &mut self.total_profit,
            Metric::TotalExpenses => &mut self.total_expenses,
            Metric::ProfitMargin => &mut self.profit_margin,
            Metric::OutstandingReceivables => &mut self.outstanding_receivables,
            Metric::AverageClaimValue => &mut self.average_claim_value,
        }
    }

    /// Copy with every currency field run through [`format_currency`].
    /// The profit margin is a percentage and passes through unchanged.
    pub fn formatted(&self) -> FinancialMetrics {
        FinancialMetrics {
            total_revenue: format_currency(&self.total_revenue),
            total_profit: format_currency(&self.total_profit),
            total_expenses: format_currency(&self.total_expenses),
            profit_margin: self.profit_margin.clone(),
            outstanding_receivables: format_currency(&self.outstanding_receivables),
            average_claim_value: format_currency(&self.average_claim_value),
            refreshed_at: self.refreshed_at,
        }
    }
}

/// Map metric rows onto [`FinancialMetrics`].
///
/// # Arguments
/// * `rows` - Rows of the metrics sheet; the first row's headers count as a pair
/// * `labels` - Label table, checked in order per name cell
///
/// # Returns
/// * `FinancialMetrics` - Matched values; unmatched fields are `""`. When
///   several rows match one field the last one wins.
pub fn normalize_financials(rows: &[Row], labels: &[MetricLabel]) -> FinancialMetrics {
    let mut metrics = FinancialMetrics {
        refreshed_at: Utc::now(),
        ..FinancialMetrics::default()
    };

    let Some(first) = rows.first() else {
        debug!("No financial rows to normalize");
        return metrics;
    };

    let header_pair = (first.header_at(0), first.header_at(1));
    let pairs = std::iter::once(header_pair).chain(rows.iter().map(|r| (r.value_at(0), r.value_at(1))));

    for (name, value) in pairs {
        let Some(name) = name else { continue };
        let lowered = name.trim().to_lowercase();
        if lowered.is_empty() {
            continue;
        }
        match labels.iter().find(|l| lowered.contains(&l.contains)) {
            Some(label) => {
                *metrics.field_mut(label.metric) = value.unwrap_or("").trim().to_string();
            }
            None => debug!("Unrecognized financial metric row: {:?}", name),
        }
    }

    metrics
}

/// Display a money value.
///
/// # Arguments
/// * `raw` - Cell text
///
/// # Returns
/// * `String` - `raw` unchanged if it already has a `$`; otherwise the parsed
///   number as `$1,234.50`; otherwise `$0.00`
///
/// # Examples
/// ```
/// use claims_portal::normalize::financial::format_currency;
///
/// assert_eq!(format_currency("1234.5"), "$1,234.50");
/// assert_eq!(format_currency("$99"), "$99");
/// assert_eq!(format_currency("n/a"), "$0.00");
/// ```
pub fn format_currency(raw: &str) -> String {
    if raw.contains('$') {
        return raw.to_string();
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && (value.abs() * 100.0) < MAX_CENTS => group_dollars(value),
        Ok(value) => {
            debug!("Currency value out of range: {}", value);
            "$0.00".to_string()
        }
        Err(_) => "$0.00".to_string(),
    }
}

// Largest cent count that fits a u64
const MAX_CENTS: f64 = u64::MAX as f64;

fn group_dollars(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();

    let mut whole = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            whole.push(',');
        }
        whole.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, whole, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(name: &str, value: &str) -> Row {
        Row::from_pairs([("Metric", name), ("Value", value)])
    }

    #[test]
    fn matching_ignores_case_and_trailing_text() {
        let labels = default_metric_labels();
        let a = normalize_financials(&[pair("Total Revenue:", "$10")], &labels);
        let b = normalize_financials(&[pair("TOTAL REVENUE", "$10")], &labels);
        assert_eq!(a.total_revenue, "$10");
        assert_eq!(b.total_revenue, "$10");
    }

    #[test]
    fn header_pair_counts_as_metric() {
        let rows = vec![Row::from_pairs([
            ("Total Revenue:", "Total Profit:"),
            ("$109779.77", "$50000.00"),
        ])];
        let metrics = normalize_financials(&rows, &default_metric_labels());
        assert_eq!(metrics.total_revenue, "$109779.77");
        assert_eq!(metrics.total_profit, "$50000.00");
    }

    #[test]
    fn last_match_wins_and_unknown_rows_ignored() {
        let rows = vec![
            pair("Total Expenses", " 100 "),
            pair("Coffee budget", "5"),
            pair("total expenses (adjusted)", "120"),
        ];
        let metrics = normalize_financials(&rows, &default_metric_labels());
        assert_eq!(metrics.total_expenses, "120");
        assert_eq!(metrics.total_revenue, "");
    }

    #[test]
    fn margin_label_wins_over_profit() {
        let rows = vec![pair("Total Profit Margin", "45%"), pair("Total Profit", "9000")];
        let metrics = normalize_financials(&rows, &default_metric_labels());
        assert_eq!(metrics.profit_margin, "45%");
        assert_eq!(metrics.total_profit, "9000");
        assert_eq!(metrics.formatted().total_profit, "$9,000.00");
        assert_eq!(metrics.formatted().profit_margin, "45%");
    }

    #[test]
    fn empty_input_gives_empty_fields() {
        let metrics = normalize_financials(&[], &default_metric_labels());
        assert_eq!(metrics.total_revenue, "");
        assert_eq!(metrics.average_claim_value, "");
    }

    #[test]
    fn currency_formatting() {
        assert_eq!(format_currency("$1,234.50"), "$1,234.50");
        assert_eq!(format_currency("1234.5"), "$1,234.50");
        assert_eq!(format_currency("1,000,000"), "$1,000,000.00");
        assert_eq!(format_currency("-42.129"), "-$42.13");
        assert_eq!(format_currency("12"), "$12.00");
        assert_eq!(format_currency(""), "$0.00");
        assert_eq!(format_currency("pending"), "$0.00");
    }

    #[test]
    fn huge_values_do_not_wrap() {
        assert_eq!(format_currency("1e20"), "$0.00");
        assert_eq!(format_currency("-1e300"), "$0.00");
        assert_eq!(format_currency("inf"), "$0.00");
        assert_eq!(format_currency("100000000000000"), "$100,000,000,000,000.00");
    }
}
