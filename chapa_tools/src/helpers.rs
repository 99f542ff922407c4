use hpg_common::Money;

/// Format a minor-unit amount as the decimal string Chapa expects, e.g. 50000 -> "500.00".
pub fn format_chapa_amount(amount: Money) -> String {
    amount.to_string()
}
