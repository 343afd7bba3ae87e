use crate::chart::surface::{LineRole, OverlayLine};
use crate::domain::chart::{IndicatorKind, IndicatorSnapshot};

/// Lines to draw for `kind`, spanning `range`. Kinds without chart geometry yield nothing.
pub fn lines_for(
    kind: IndicatorKind,
    snapshot: &IndicatorSnapshot,
    range: &(String, String),
) -> Vec<OverlayLine> {
    match kind {
        IndicatorKind::Bollinger => bollinger(snapshot, range),
        IndicatorKind::SupportResistance => support_resistance(snapshot, range),
        IndicatorKind::Rsi | IndicatorKind::Macd => Vec::new(),
    }
}

fn bollinger(snapshot: &IndicatorSnapshot, range: &(String, String)) -> Vec<OverlayLine> {
    let Some(bands) = snapshot.bollinger_bands.as_ref() else {
        return Vec::new();
    };

    [
        ("BB Upper", bands.upper, LineRole::BandUpper),
        ("BB Middle", bands.middle, LineRole::BandMiddle),
        ("BB Lower", bands.lower, LineRole::BandLower),
    ]
    .into_iter()
    .filter_map(|(label, price, role)| {
        price
            .filter(|p| p.is_finite())
            .map(|price| line(label.to_string(), price, role, range))
    })
    .collect()
}

fn support_resistance(snapshot: &IndicatorSnapshot, range: &(String, String)) -> Vec<OverlayLine> {
    let Some(sr) = snapshot.support_resistance.as_ref() else {
        return Vec::new();
    };

    let supports = sr
        .support_levels
        .iter()
        .enumerate()
        .map(|(i, p)| line(format!("S{}", i + 1), *p, LineRole::Support, range));
    let resistances = sr
        .resistance_levels
        .iter()
        .enumerate()
        .map(|(i, p)| line(format!("R{}", i + 1), *p, LineRole::Resistance, range));

    supports.chain(resistances).collect()
}

fn line(label: String, price: f64, role: LineRole, range: &(String, String)) -> OverlayLine {
    OverlayLine {
        label,
        price,
        from: range.0.clone(),
        to: range.1.clone(),
        role,
    }
}
