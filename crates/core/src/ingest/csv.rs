use crate::domain::equity::NewEquity;

/// Parses delimited text into equity candidates. Rows missing a symbol or a
/// name are dropped, not treated as errors; a fully invalid file simply
/// yields an empty vector and the caller decides what to report.
pub fn parse_equities(text: &str) -> Vec<NewEquity> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = normalized.lines().filter(|l| !l.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return Vec::new();
    };

    let columns: Vec<Option<Column>> = split_fields(header_line)
        .into_iter()
        .map(|h| resolve_column(&h.to_lowercase()))
        .collect();

    let mut out = Vec::new();
    for line in lines {
        let fields = split_fields(line);
        if let Some(equity) = build_row(&columns, &fields) {
            out.push(equity);
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Symbol,
    Name,
    Sector,
    CurrentPrice,
    PriceChange24h,
    Volume,
    MarketCap,
}

/// Column identity is fuzzy: spaces, underscores and hyphens are stripped
/// before matching, so "Price Change 24h", "price_change_24h" and
/// "price-change-24h" all resolve the same way. "change"/"pct" is checked
/// before "price" so that change columns never capture the price slot.
fn resolve_column(header: &str) -> Option<Column> {
    let key: String = header
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect();

    match key.as_str() {
        "symbol" | "ticker" => return Some(Column::Symbol),
        "name" | "company" => return Some(Column::Name),
        "sector" | "industry" => return Some(Column::Sector),
        "currentprice" | "close" => return Some(Column::CurrentPrice),
        "marketcap" => return Some(Column::MarketCap),
        _ => {}
    }

    if key.contains("change") || key.contains("pct") {
        Some(Column::PriceChange24h)
    } else if key.contains("price") {
        Some(Column::CurrentPrice)
    } else if key.contains("volume") {
        Some(Column::Volume)
    } else if key.contains("market") && key.contains("cap") {
        Some(Column::MarketCap)
    } else {
        None
    }
}

/// Quote-aware comma split: a double quote toggles an in-field mode in which
/// commas are literal text. Quote characters themselves are not emitted.
/// There is no escaped-quote support.
fn split_fields(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                out.push(cur.trim().to_string());
                cur.clear();
            }
            _ => cur.push(ch),
        }
    }
    out.push(cur.trim().to_string());
    out
}

fn build_row(columns: &[Option<Column>], fields: &[String]) -> Option<NewEquity> {
    let mut symbol = String::new();
    let mut name = String::new();
    let mut sector: Option<String> = None;
    let mut current_price: Option<f64> = None;
    let mut price_change_24h: Option<f64> = None;
    let mut volume: Option<i64> = None;
    let mut market_cap: Option<i64> = None;

    for (idx, column) in columns.iter().enumerate() {
        let Some(column) = column else { continue };
        let Some(raw) = fields.get(idx) else { continue };

        match column {
            Column::Symbol => symbol = raw.trim().to_uppercase(),
            Column::Name => name = raw.trim().to_string(),
            Column::Sector => {
                let s = raw.trim();
                if !s.is_empty() {
                    sector = Some(s.to_string());
                }
            }
            Column::CurrentPrice => current_price = parse_number(raw),
            Column::PriceChange24h => price_change_24h = parse_number(raw),
            Column::Volume => volume = parse_number(raw).map(|n| n.max(0.0) as i64),
            Column::MarketCap => market_cap = parse_number(raw).map(|n| n.max(0.0) as i64),
        }
    }

    if symbol.is_empty() || name.is_empty() {
        return None;
    }

    let mut equity = NewEquity::new(symbol, name);
    if let Some(sector) = sector {
        equity.sector = sector;
    }
    equity.current_price = current_price.unwrap_or(0.0).max(0.0);
    equity.price_change_24h = price_change_24h.unwrap_or(0.0);
    equity.volume = volume.unwrap_or(0);
    equity.market_cap = market_cap.unwrap_or(0);
    Some(equity)
}

/// Numeric fields tolerate thousands separators, currency signs and percent
/// signs. Anything that still fails to parse is treated as absent.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%'))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_standard_row() {
        let text = "symbol,name,sector,current_price,price_change_24h,volume,market_cap\n\
                    AAPL,Apple Inc.,Technology,175.50,-2.34,50000000,0\n";
        let rows = parse_equities(text);
        assert_eq!(rows.len(), 1);
        let e = &rows[0];
        assert_eq!(e.symbol, "AAPL");
        assert_eq!(e.name, "Apple Inc.");
        assert_eq!(e.sector, "Technology");
        assert_eq!(e.current_price, 175.50);
        assert_eq!(e.price_change_24h, -2.34);
        assert_eq!(e.volume, 50_000_000);
        assert_eq!(e.market_cap, 0);
    }

    #[test]
    fn header_only_yields_no_rows() {
        let text = "symbol,name,sector\n";
        assert!(parse_equities(text).is_empty());
    }

    #[test]
    fn rows_missing_symbol_or_name_are_dropped() {
        let text = "symbol,name\n,Apple\nAAPL,\n  ,  \nMSFT,Microsoft\n";
        let rows = parse_equities(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "MSFT");
    }

    #[test]
    fn fuzzy_header_match_and_case_normalization() {
        let text = "Ticker,Company\ntcs,Tata Consultancy Services\n";
        let rows = parse_equities(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "TCS");
        assert_eq!(rows[0].name, "Tata Consultancy Services");
    }

    #[test]
    fn quoted_field_keeps_embedded_delimiter() {
        let text = "name,symbol,price\n\"Reliance, Industries\",RELIANCE,2450.00\n";
        let rows = parse_equities(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Reliance, Industries");
        assert_eq!(rows[0].symbol, "RELIANCE");
        assert_eq!(rows[0].current_price, 2450.00);
    }

    #[test]
    fn numeric_fields_strip_currency_percent_and_commas() {
        let text = "symbol,name,Price,Change %,Volume\nINFY,Infosys,\"$1,520.75\",1.8%,\"2,000,000\"\n";
        let rows = parse_equities(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].current_price, 1520.75);
        assert_eq!(rows[0].price_change_24h, 1.8);
        assert_eq!(rows[0].volume, 2_000_000);
    }

    #[test]
    fn unparseable_numbers_fall_back_to_defaults() {
        let text = "symbol,name,price,change\nAAPL,Apple,n/a,--\n";
        let rows = parse_equities(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].current_price, 0.0);
        assert_eq!(rows[0].price_change_24h, 0.0);
    }

    #[test]
    fn change_headers_never_capture_the_price_column() {
        // "price change 24h" contains "price" but must resolve as the change
        // column; "close" is an exact price alias.
        let text = "symbol,name,close,price change 24h\nHDFC,HDFC Bank,1650.0,3.1\n";
        let rows = parse_equities(text);
        assert_eq!(rows[0].current_price, 1650.0);
        assert_eq!(rows[0].price_change_24h, 3.1);
    }

    #[test]
    fn market_cap_header_variants_resolve() {
        for header in ["market_cap", "Market Cap", "marketcap", "mkt market cap"] {
            let text = format!("symbol,name,{header}\nITC,ITC Ltd,100000\n");
            let rows = parse_equities(&text);
            assert_eq!(rows[0].market_cap, 100_000, "header: {header}");
        }
    }

    #[test]
    fn normalizes_line_endings_and_skips_blank_lines() {
        let text = "symbol,name\r\nAAPL,Apple\r\r\n\nMSFT,Microsoft\r\n";
        let rows = parse_equities(text);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].symbol, "MSFT");
    }

    #[test]
    fn unknown_headers_are_ignored() {
        let text = "symbol,name,esg_score\nAAPL,Apple,42\n";
        let rows = parse_equities(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sector, "Unknown");
    }

    #[test]
    fn empty_input_yields_no_rows() {
        assert!(parse_equities("").is_empty());
        assert!(parse_equities("\n\n\r\n").is_empty());
    }
}
