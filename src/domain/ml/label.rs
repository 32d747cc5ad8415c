use serde::Serialize;
use std::fmt;

/// Human-readable class labels the model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLabel {
    StockValueDecrease,
    StockValueIncrease,
    /// Any class code outside the trained label set
    #[serde(rename = "Unknown")]
    Unknown,
}

impl StockLabel {
    /// Fixed code mapping. Unmapped codes resolve to `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => StockLabel::StockValueDecrease,
            1 => StockLabel::StockValueIncrease,
            _ => StockLabel::Unknown,
        }
    }

    /// Reverse mapping used when encoding training targets
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "stock_value_decrease" => Some(StockLabel::StockValueDecrease),
            "stock_value_increase" => Some(StockLabel::StockValueIncrease),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            StockLabel::StockValueDecrease => Some(0),
            StockLabel::StockValueIncrease => Some(1),
            StockLabel::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockLabel::StockValueDecrease => "stock_value_decrease",
            StockLabel::StockValueIncrease => "stock_value_increase",
            StockLabel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for StockLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw model output together with its resolved label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionOutcome {
    pub code: i64,
    pub label: StockLabel,
}

impl PredictionOutcome {
    pub fn from_code(code: i64) -> Self {
        Self {
            code,
            label: StockLabel::from_code(code),
        }
    }

    pub fn is_unmapped(&self) -> bool {
        self.label == StockLabel::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(StockLabel::from_code(0).as_str(), "stock_value_decrease");
        assert_eq!(StockLabel::from_code(1).as_str(), "stock_value_increase");
    }

    #[test]
    fn test_unmapped_codes_resolve_to_unknown() {
        for code in [2, -1, 99] {
            let outcome = PredictionOutcome::from_code(code);
            assert_eq!(outcome.label, StockLabel::Unknown);
            assert!(outcome.is_unmapped());
        }
    }

    #[test]
    fn test_label_serializes_to_wire_names() {
        assert_eq!(
            serde_json::to_string(&StockLabel::StockValueIncrease).unwrap(),
            "\"stock_value_increase\""
        );
        assert_eq!(
            serde_json::to_string(&StockLabel::Unknown).unwrap(),
            "\"Unknown\""
        );
    }

    #[test]
    fn test_name_round_trip() {
        for label in [StockLabel::StockValueDecrease, StockLabel::StockValueIncrease] {
            let code = label.code().unwrap();
            assert_eq!(StockLabel::from_name(label.as_str()), Some(label));
            assert_eq!(StockLabel::from_code(code), label);
        }
        assert_eq!(StockLabel::from_name("flat"), None);
    }
}
