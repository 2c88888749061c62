use rust_decimal::Decimal;

use crate::common::traits::LegReplacementRequest;
use crate::monitor::LegSnapshot;
use crate::replacement::traits::Quote;

/// Pick the quote to sell in place of an exited leg
///
/// Eligible quotes have the requested option type, trade strictly above the
/// exited leg's last price and are not already held. The closest to the
/// target premium wins (first seen on ties); a quote within `tolerance` of the
/// target ends the search immediately.
pub fn select_replacement<'a>(
    quotes: &'a [Quote],
    request: &LegReplacementRequest,
    held: &LegSnapshot,
    tolerance: Decimal,
) -> Option<&'a Quote> {
    let mut best: Option<(&Quote, Decimal)> = None;

    for quote in quotes {
        if quote.option_type != request.new_leg_type
            || quote.last_price <= request.exited_leg_last_price
            || held.by_instrument(quote.instrument_id).is_some()
            || held.by_symbol(&quote.symbol).is_some()
        {
            continue;
        }
        let distance = (quote.last_price - request.target_premium).abs();
        if distance <= tolerance {
            return Some(quote);
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((quote, distance));
        }
    }
    best.map(|(quote, _)| quote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::OptionType;
    use crate::monitor::{LegRegistry, LegSpec};
    use rust_decimal_macros::dec;

    fn quote(id: u64, symbol: &str, option_type: OptionType, price: Decimal) -> Quote {
        Quote {
            instrument_id: id,
            symbol: symbol.to_string(),
            option_type,
            last_price: price,
        }
    }

    fn request() -> LegReplacementRequest {
        LegReplacementRequest {
            execution_id: "e1".to_string(),
            exited_symbol: "NIFTY24MAY22500CE".to_string(),
            new_leg_type: OptionType::Ce,
            target_premium: dec!(130),
            reference_symbol: "NIFTY24MAY22500PE".to_string(),
            exited_leg_last_price: dec!(60),
            quantity: 50,
        }
    }

    fn held() -> LegRegistry {
        LegRegistry::new(vec![LegSpec::new(
            "o2",
            "NIFTY24MAY22500PE",
            102,
            dec!(80),
            50,
            OptionType::Pe,
        )])
        .unwrap()
    }

    #[test]
    fn test_closest_eligible_quote_wins() {
        let quotes = vec![
            quote(201, "NIFTY24MAY22400CE", OptionType::Ce, dec!(145)),
            quote(202, "NIFTY24MAY22300PE", OptionType::Pe, dec!(130)),
            quote(203, "NIFTY24MAY22450CE", OptionType::Ce, dec!(124)),
            quote(204, "NIFTY24MAY22800CE", OptionType::Ce, dec!(55)),
        ];
        let held = held();
        let chosen = select_replacement(&quotes, &request(), &held.load(), dec!(0.05)).unwrap();
        assert_eq!(chosen.instrument_id, 203);
    }

    #[test]
    fn test_near_match_short_circuits() {
        let quotes = vec![
            quote(201, "A", OptionType::Ce, dec!(130.04)),
            quote(202, "B", OptionType::Ce, dec!(130)),
        ];
        let held = held();
        let chosen = select_replacement(&quotes, &request(), &held.load(), dec!(0.05)).unwrap();
        assert_eq!(chosen.instrument_id, 201);
    }

    #[test]
    fn test_nothing_eligible() {
        let quotes = vec![
            quote(102, "NIFTY24MAY22500PE", OptionType::Ce, dec!(130)),
            quote(205, "C", OptionType::Ce, dec!(60)),
        ];
        let held = held();
        assert!(select_replacement(&quotes, &request(), &held.load(), dec!(0.05)).is_none());
        assert!(select_replacement(&[], &request(), &held.load(), dec!(0.05)).is_none());
    }
}
