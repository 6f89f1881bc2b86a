use crate::error::CoreError;
use crate::structs::Kline;
use chrono::{DateTime, Utc};

/// An immutable slice of market history used as one independent evaluation
/// scenario.
///
/// A window is validated on construction: it is non-empty and its bars are
/// chronologically ordered. Consumers may rely on both properties.
#[derive(Debug, Clone)]
pub struct Window {
    symbol: String,
    interval: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    klines: Vec<Kline>,
}

impl Window {
    pub fn new(
        symbol: String,
        interval: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        klines: Vec<Kline>,
    ) -> Result<Self, CoreError> {
        let label = format!("{symbol}/{interval} {}..{}", start.date_naive(), end.date_naive());
        if klines.is_empty() {
            return Err(CoreError::EmptyWindow(label));
        }
        for (i, pair) in klines.windows(2).enumerate() {
            if pair[1].open_time < pair[0].open_time {
                return Err(CoreError::UnorderedWindow(label, i + 1));
            }
        }
        Ok(Self { symbol, interval, start, end, klines })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn klines(&self) -> &[Kline] {
        &self.klines
    }

    pub fn len(&self) -> usize {
        self.klines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.klines.is_empty()
    }

    /// A short human-readable identifier for logs and reports.
    pub fn label(&self) -> String {
        format!("{}..{}", self.start.date_naive(), self.end.date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn bar(hour: u32) -> Kline {
        let open_time = Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap();
        Kline {
            open_time,
            open: dec!(100),
            high: dec!(101),
            low: dec!(99),
            close: dec!(100),
            volume: dec!(1),
            close_time: open_time + chrono::Duration::hours(1),
            interval: "1h".to_string(),
        }
    }

    fn bounds() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn rejects_empty_series() {
        let (start, end) = bounds();
        let result = Window::new("BTCUSDT".into(), "1h".into(), start, end, vec![]);
        assert!(matches!(result, Err(CoreError::EmptyWindow(_))));
    }

    #[test]
    fn rejects_unordered_series() {
        let (start, end) = bounds();
        let result =
            Window::new("BTCUSDT".into(), "1h".into(), start, end, vec![bar(2), bar(1)]);
        assert!(matches!(result, Err(CoreError::UnorderedWindow(_, 1))));
    }

    #[test]
    fn accepts_ordered_series() {
        let (start, end) = bounds();
        let window =
            Window::new("BTCUSDT".into(), "1h".into(), start, end, vec![bar(1), bar(2)])
                .unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window.symbol(), "BTCUSDT");
    }
}
