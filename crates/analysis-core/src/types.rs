use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// One daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PricePoint {
    /// Checks `low <= open, close <= high` and that every price is finite.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(AnalysisError::InvalidData(format!(
                "non-finite price on {}",
                self.date
            )));
        }
        if self.low > self.open.min(self.close) || self.open.max(self.close) > self.high {
            return Err(AnalysisError::InvalidData(format!(
                "OHLC out of bounds on {}: o={} h={} l={} c={}",
                self.date, self.open, self.high, self.low, self.close
            )));
        }
        Ok(())
    }
}

/// Daily bars ordered by strictly increasing date.
///
/// The only way to build one is through [`PriceSeries::new`], so every
/// series the indicator code sees already satisfies the ordering and
/// OHLC invariants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PricePoint>", into = "Vec<PricePoint>")]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self, AnalysisError> {
        for point in &points {
            point.validate()?;
        }
        if let Some(pair) = points.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(AnalysisError::InvalidData(format!(
                "dates not strictly increasing: {} then {}",
                pair[0].date, pair[1].date
            )));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

impl TryFrom<Vec<PricePoint>> for PriceSeries {
    type Error = AnalysisError;

    fn try_from(points: Vec<PricePoint>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<PriceSeries> for Vec<PricePoint> {
    fn from(series: PriceSeries) -> Self {
        series.points
    }
}

/// A derived value for one date; `None` until the window has filled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorSeries {
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Pairs `values` with `dates` index by index.
    pub fn from_parts(dates: &[NaiveDate], values: Vec<Option<f64>>) -> Self {
        let points = dates
            .iter()
            .zip(values)
            .map(|(&date, value)| IndicatorPoint { date, value })
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Number of leading points that carry no value.
    pub fn leading_undefined(&self) -> usize {
        self.points.iter().take_while(|p| p.value.is_none()).count()
    }

    pub fn last_defined(&self) -> Option<f64> {
        self.points.iter().rev().find_map(|p| p.value)
    }
}

/// News headline as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

impl NewsArticle {
    /// Articles without a title or link cannot be rendered.
    pub fn is_displayable(&self) -> bool {
        !self.title.trim().is_empty() && !self.url.trim().is_empty()
    }
}
