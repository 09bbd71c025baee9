use crate::domain::equity::NewEquity;

/// Symbols re-scored immediately after a catalog import.
pub const FEATURED_SYMBOLS: [&str; 4] = ["RELIANCE", "TCS", "HDFCBANK", "INFY"];

/// Static reference catalog standing in for a real market-data feed. Prices
/// and caps are plausible NSE large-cap values, not live data.
pub fn fixed_catalog() -> Vec<NewEquity> {
    fn entry(
        symbol: &str,
        name: &str,
        sector: &str,
        price: f64,
        change: f64,
        volume: i64,
        market_cap: i64,
    ) -> NewEquity {
        NewEquity {
            symbol: symbol.to_string(),
            name: name.to_string(),
            sector: sector.to_string(),
            current_price: price,
            price_change_24h: change,
            volume,
            market_cap,
        }
    }

    vec![
        entry("RELIANCE", "Reliance Industries", "Energy", 2456.75, 1.25, 8_500_000, 16_600_000_000_000),
        entry("TCS", "Tata Consultancy Services", "Technology", 3567.80, -0.85, 2_100_000, 13_000_000_000_000),
        entry("HDFCBANK", "HDFC Bank", "Banking", 1543.20, 2.15, 12_000_000, 11_700_000_000_000),
        entry("INFY", "Infosys", "Technology", 1432.55, 0.95, 5_600_000, 5_900_000_000_000),
        entry("ICICIBANK", "ICICI Bank", "Banking", 987.45, -1.20, 15_000_000, 6_900_000_000_000),
        entry("HINDUNILVR", "Hindustan Unilever", "Consumer Goods", 2678.90, 0.45, 1_800_000, 6_300_000_000_000),
        entry("ITC", "ITC Limited", "Consumer Goods", 456.30, 1.80, 25_000_000, 5_700_000_000_000),
        entry("SBIN", "State Bank of India", "Banking", 598.75, -2.30, 45_000_000, 5_300_000_000_000),
        entry("BHARTIARTL", "Bharti Airtel", "Telecom", 876.20, 3.45, 9_800_000, 5_200_000_000_000),
        entry("KOTAKBANK", "Kotak Mahindra Bank", "Banking", 1789.65, 0.75, 3_200_000, 3_600_000_000_000),
        entry("LT", "Larsen & Toubro", "Infrastructure", 2345.80, 1.55, 4_100_000, 3_300_000_000_000),
        entry("ASIANPAINT", "Asian Paints", "Consumer Goods", 3234.50, -0.65, 1_500_000, 3_100_000_000_000),
        entry("MARUTI", "Maruti Suzuki", "Automotive", 9876.25, 2.85, 800_000, 3_000_000_000_000),
        entry("AXISBANK", "Axis Bank", "Banking", 1045.30, -1.85, 18_000_000, 3_200_000_000_000),
        entry("WIPRO", "Wipro", "Technology", 432.85, 0.25, 7_200_000, 2_400_000_000_000),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn catalog_has_fifteen_unique_fully_populated_instruments() {
        let catalog = fixed_catalog();
        assert_eq!(catalog.len(), 15);

        let symbols: BTreeSet<&str> = catalog.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols.len(), 15);

        for e in &catalog {
            assert!(!e.name.is_empty());
            assert_ne!(e.sector, "Unknown");
            assert!(e.current_price > 0.0);
            assert!(e.volume > 0);
            assert!(e.market_cap > 0);
        }
    }

    #[test]
    fn featured_symbols_are_all_in_the_catalog() {
        let catalog = fixed_catalog();
        for symbol in FEATURED_SYMBOLS {
            assert!(catalog.iter().any(|e| e.symbol == symbol), "{symbol} missing");
        }
    }
}
