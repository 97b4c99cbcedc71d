use rust_decimal::Decimal;

/// Half a cent. Assignment sums within this distance of the statement value
/// count as covering it.
pub const TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// Number of minor-unit digits for an ISO 4217 currency code.
pub fn minor_units(currency: &str) -> u32 {
    match currency.trim().to_ascii_uppercase().as_str() {
        "BIF" | "CLP" | "DJF" | "GNF" | "ISK" | "JPY" | "KMF" | "KRW" | "PYG" | "RWF" | "UGX"
        | "VND" | "VUV" | "XAF" | "XOF" | "XPF" => 0,
        "BHD" | "IQD" | "JOD" | "KWD" | "LYD" | "OMR" | "TND" => 3,
        _ => 2,
    }
}

pub fn round_to_currency(amount: Decimal, currency: &str) -> Decimal {
    amount.round_dp(minor_units(currency))
}

/// True when `a` and `b` differ by no more than [`TOLERANCE`].
pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= TOLERANCE
}
