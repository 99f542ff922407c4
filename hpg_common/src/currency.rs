use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

pub const ETB_CURRENCY_CODE: &str = "ETB";
pub const USD_CURRENCY_CODE: &str = "USD";

/// The set of currencies the gateway settles in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Etb,
    Usd,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Etb => ETB_CURRENCY_CODE,
            Currency::Usd => USD_CURRENCY_CODE,
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unsupported currency: {0}")]
pub struct CurrencyError(String);

impl FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            ETB_CURRENCY_CODE => Ok(Currency::Etb),
            USD_CURRENCY_CODE => Ok(Currency::Usd),
            other => Err(CurrencyError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_codes() {
        assert_eq!("etb".parse::<Currency>().unwrap(), Currency::Etb);
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Usd);
        assert!("XTR".parse::<Currency>().is_err());
    }
}
