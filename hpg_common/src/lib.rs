mod currency;
mod helpers;
mod money;

pub mod op;
mod secret;

pub use currency::{Currency, CurrencyError, ETB_CURRENCY_CODE, USD_CURRENCY_CODE};
pub use helpers::parse_boolean_flag;
pub use money::{Money, MoneyConversionError};
pub use secret::Secret;
