use crate::domain::market::Impact;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    High,
    Medium,
    Low,
    Neutral,
}

/// Boundaries are inclusive: 80 is high, 60 is medium, 40 is low.
pub fn score_tier(score: Option<f64>) -> ScoreTier {
    match score.filter(|s| s.is_finite()) {
        Some(s) if s >= 80.0 => ScoreTier::High,
        Some(s) if s >= 60.0 => ScoreTier::Medium,
        Some(s) if s >= 40.0 => ScoreTier::Low,
        _ => ScoreTier::Neutral,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTone {
    Positive,
    Negative,
    Flat,
}

pub fn change_tone(change: Option<f64>) -> ChangeTone {
    match change.filter(|c| c.is_finite()) {
        Some(c) if c > 0.0 => ChangeTone::Positive,
        Some(c) if c < 0.0 => ChangeTone::Negative,
        _ => ChangeTone::Flat,
    }
}

/// Options rows carry a free-form label such as "Bullish" or "Slightly Bearish".
pub fn sentiment_tone(label: Option<&str>) -> ChangeTone {
    let label = label.unwrap_or_default().to_ascii_lowercase();
    if label.contains("bull") {
        ChangeTone::Positive
    } else if label.contains("bear") {
        ChangeTone::Negative
    } else {
        ChangeTone::Flat
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSentiment {
    Bullish,
    Neutral,
    Bearish,
}

pub fn market_sentiment(score: Option<f64>) -> MarketSentiment {
    match score.filter(|s| s.is_finite()) {
        Some(s) if s >= 60.0 => MarketSentiment::Bullish,
        Some(s) if s <= 40.0 => MarketSentiment::Bearish,
        _ => MarketSentiment::Neutral,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskGrade {
    Good,
    Moderate,
    Poor,
}

/// Portfolio volatility in percent.
pub fn volatility_grade(pct: f64) -> RiskGrade {
    if pct < 15.0 {
        RiskGrade::Good
    } else if pct < 25.0 {
        RiskGrade::Moderate
    } else {
        RiskGrade::Poor
    }
}

pub fn beta_grade(beta: f64) -> RiskGrade {
    if beta < 0.8 {
        RiskGrade::Good
    } else if beta > 1.2 {
        RiskGrade::Poor
    } else {
        RiskGrade::Moderate
    }
}

pub fn diversification_grade(ratio: f64) -> RiskGrade {
    if ratio > 2.0 {
        RiskGrade::Good
    } else if ratio > 1.5 {
        RiskGrade::Moderate
    } else {
        RiskGrade::Poor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Severe,
    Warn,
    Neutral,
}

pub fn impact_severity(impact: Impact) -> Severity {
    match impact {
        Impact::High => Severity::Severe,
        Impact::Medium => Severity::Warn,
        Impact::Low => Severity::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_tier_boundaries_are_inclusive() {
        assert_eq!(score_tier(Some(100.0)), ScoreTier::High);
        assert_eq!(score_tier(Some(80.0)), ScoreTier::High);
        assert_eq!(score_tier(Some(79.99)), ScoreTier::Medium);
        assert_eq!(score_tier(Some(60.0)), ScoreTier::Medium);
        assert_eq!(score_tier(Some(59.99)), ScoreTier::Low);
        assert_eq!(score_tier(Some(40.0)), ScoreTier::Low);
        assert_eq!(score_tier(Some(39.99)), ScoreTier::Neutral);
        assert_eq!(score_tier(Some(-5.0)), ScoreTier::Neutral);
        assert_eq!(score_tier(None), ScoreTier::Neutral);
        assert_eq!(score_tier(Some(f64::NAN)), ScoreTier::Neutral);
    }

    #[test]
    fn risk_bands() {
        assert_eq!(volatility_grade(14.99), RiskGrade::Good);
        assert_eq!(volatility_grade(15.0), RiskGrade::Moderate);
        assert_eq!(volatility_grade(24.99), RiskGrade::Moderate);
        assert_eq!(volatility_grade(25.0), RiskGrade::Poor);

        assert_eq!(beta_grade(0.79), RiskGrade::Good);
        assert_eq!(beta_grade(0.8), RiskGrade::Moderate);
        assert_eq!(beta_grade(1.2), RiskGrade::Moderate);
        assert_eq!(beta_grade(1.21), RiskGrade::Poor);

        assert_eq!(diversification_grade(2.01), RiskGrade::Good);
        assert_eq!(diversification_grade(2.0), RiskGrade::Moderate);
        assert_eq!(diversification_grade(1.51), RiskGrade::Moderate);
        assert_eq!(diversification_grade(1.5), RiskGrade::Poor);
    }

    #[test]
    fn tones_follow_sign_and_labels() {
        assert_eq!(change_tone(Some(0.01)), ChangeTone::Positive);
        assert_eq!(change_tone(Some(-0.01)), ChangeTone::Negative);
        assert_eq!(change_tone(Some(0.0)), ChangeTone::Flat);
        assert_eq!(change_tone(None), ChangeTone::Flat);
        assert_eq!(sentiment_tone(Some("Slightly Bearish")), ChangeTone::Negative);
        assert_eq!(sentiment_tone(Some("BULLISH")), ChangeTone::Positive);
        assert_eq!(sentiment_tone(None), ChangeTone::Flat);
        assert_eq!(impact_severity(Impact::Medium), Severity::Warn);
        assert_eq!(market_sentiment(Some(72.0)), MarketSentiment::Bullish);
        assert_eq!(market_sentiment(Some(40.0)), MarketSentiment::Bearish);
        assert_eq!(market_sentiment(None), MarketSentiment::Neutral);
    }
}
