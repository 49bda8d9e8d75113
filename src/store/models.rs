use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Basket name -> benchmark ticker
pub type BenchmarkMap = BTreeMap<String, String>;

/// Descriptive company fields carried alongside a price record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub company: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<Decimal>,
    pub issuer_type: Option<String>,
}

/// One observation of a ticker inside a basket.
///
/// A missing `price` is a reporting gap: the engine carries the previous
/// price forward over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub ticker: String,
    pub price: Option<Decimal>,
    pub weight: Decimal,
    #[serde(default)]
    pub info: CompanyInfo,
}

impl PriceRecord {
    pub fn new(date: NaiveDate, ticker: &str, price: Decimal, weight: Decimal) -> Self {
        Self {
            date,
            ticker: ticker.to_string(),
            price: Some(price),
            weight,
            info: CompanyInfo::default(),
        }
    }

    pub fn with_info(mut self, info: CompanyInfo) -> Self {
        self.info = info;
        self
    }
}

/// Named, ordered collection of price records.
///
/// Order matters: when a `(date, ticker)` pair repeats, the later record wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Basket {
    pub name: String,
    pub records: Vec<PriceRecord>,
    /// Timezone the record dates were captured in, if known
    #[serde(default, with = "offset_seconds")]
    pub tz: Option<FixedOffset>,
}

impl Basket {
    pub fn new(name: &str, records: Vec<PriceRecord>) -> Self {
        Self {
            name: name.to_string(),
            records,
            tz: None,
        }
    }

    pub fn with_tz(mut self, tz: FixedOffset) -> Self {
        self.tz = Some(tz);
        self
    }

    /// Latest date present in the basket
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date).max()
    }
}

/// `Option<FixedOffset>` as seconds east of UTC (chrono has no serde impl for offsets)
pub(crate) mod offset_seconds {
    use chrono::FixedOffset;
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        tz: &Option<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        tz.map(|offset| offset.local_minus_utc()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<FixedOffset>, D::Error> {
        Option::<i32>::deserialize(deserializer)?
            .map(|secs| {
                FixedOffset::east_opt(secs)
                    .ok_or_else(|| D::Error::custom(format!("utc offset out of range: {}s", secs)))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_basket_last_date() {
        let basket = Basket::new(
            "Tech",
            vec![
                PriceRecord::new(d(2024, 1, 3), "MSFT", dec!(370), dec!(0.5)),
                PriceRecord::new(d(2024, 1, 2), "AAPL", dec!(185), dec!(0.5)),
                PriceRecord::new(d(2024, 1, 3), "AAPL", dec!(184), dec!(0.5)),
            ],
        );
        assert_eq!(basket.last_date(), Some(d(2024, 1, 3)));
    }

    #[test]
    fn test_empty_basket_has_no_last_date() {
        let basket = Basket::new("Empty", Vec::new());
        assert_eq!(basket.last_date(), None);
    }

    #[test]
    fn test_zoned_basket_serde_round_trip() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let basket = Basket::new(
            "Tech",
            vec![PriceRecord::new(d(2024, 1, 2), "AAPL", dec!(185), dec!(1))],
        )
        .with_tz(tz);

        let json = serde_json::to_value(&basket).unwrap();
        assert_eq!(json["tz"], serde_json::json!(-18000));

        let back: Basket = serde_json::from_value(json).unwrap();
        assert_eq!(back.tz, Some(tz));
        assert_eq!(back.records, basket.records);
    }

    #[test]
    fn test_basket_without_tz_deserializes() {
        let back: Basket = serde_json::from_str(r#"{"name":"Empty","records":[]}"#).unwrap();
        assert_eq!(back.tz, None);

        let err = serde_json::from_str::<Basket>(r#"{"name":"Bad","records":[],"tz":999999}"#);
        assert!(err.is_err());
    }
}
