//! Schema normalization
//!
//! Lending ledgers arrive in many shapes: a bare list of records, a list
//! wrapped under a key such as `"transactions"`, records with the wallet
//! under `user` or `address`, amounts nested inside `actionData`. This module
//! resolves all of them into [`Event`]s through an explicit, ordered list of
//! extractors per semantic field.
//!
//! Only an unrecognizable top-level shape is an error. Individual records
//! missing a wallet or action are dropped and counted.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::FieldConfig;
use crate::error::{CreditError, CreditResult};
use crate::events::EventTable;
use crate::models::{ActionKind, Event};

/// The semantic fields resolved from every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    Wallet,
    Action,
    Amount,
    Asset,
    Timestamp,
}

impl SemanticField {
    pub const ALL: [SemanticField; 5] = [
        SemanticField::Wallet,
        SemanticField::Action,
        SemanticField::Amount,
        SemanticField::Asset,
        SemanticField::Timestamp,
    ];
}

impl fmt::Display for SemanticField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticField::Wallet => write!(f, "wallet"),
            SemanticField::Action => write!(f, "action"),
            SemanticField::Amount => write!(f, "amount"),
            SemanticField::Asset => write!(f, "asset"),
            SemanticField::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// Bookkeeping of one normalization run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub records_seen: u64,
    pub records_dropped: u64,
    pub not_an_object: u64,
    pub missing_wallet: u64,
    pub missing_action: u64,

    /// How often each source key supplied each semantic field
    pub matched: BTreeMap<SemanticField, BTreeMap<String, u64>>,
}

impl NormalizationStats {
    fn record_match(&mut self, field: SemanticField, label: &str) {
        let counts = self.matched.entry(field).or_default();
        match counts.get_mut(label) {
            Some(count) => *count += 1,
            None => {
                counts.insert(label.to_string(), 1);
            }
        }
    }

    /// The source key that supplied `field` most often. Ties go to the key
    /// that sorts first.
    pub fn dominant_key(&self, field: SemanticField) -> Option<&str> {
        self.matched
            .get(&field)?
            .iter()
            .fold(None, |best: Option<(&String, u64)>, (key, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((key, count)),
            })
            .map(|(key, _)| key.as_str())
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// Looks up one candidate key, either on the record itself or inside one of
/// its nested containers.
#[derive(Debug, Clone)]
struct FieldExtractor<'c> {
    key: &'c str,
    container: Option<&'c str>,
    label: String,
}

impl<'c> FieldExtractor<'c> {
    fn top_level(key: &'c str) -> Self {
        Self {
            key,
            container: None,
            label: key.to_string(),
        }
    }

    fn nested(container: &'c str, key: &'c str) -> Self {
        Self {
            key,
            container: Some(container),
            label: format!("{}.{}", container, key),
        }
    }

    fn extract<'v>(&self, record: &'v Map<String, Value>) -> Option<&'v Value> {
        let scope = match self.container {
            None => record,
            Some(container) => record.get(container)?.as_object()?,
        };
        scope.get(self.key).filter(|value| !value.is_null())
    }
}

/// Ordered extractors for one semantic field: every top-level candidate
/// first, then the same candidates inside each nested container.
#[derive(Debug, Clone)]
struct FieldResolver<'c> {
    field: SemanticField,
    extractors: Vec<FieldExtractor<'c>>,
}

impl<'c> FieldResolver<'c> {
    fn new(field: SemanticField, candidates: &'c [String], nested: &'c [String]) -> Self {
        let mut extractors: Vec<FieldExtractor<'c>> = candidates
            .iter()
            .map(|key| FieldExtractor::top_level(key))
            .collect();

        for container in nested {
            extractors.extend(
                candidates
                    .iter()
                    .map(move |key| FieldExtractor::nested(container, key)),
            );
        }

        Self { field, extractors }
    }

    /// First candidate whose value `accept` takes, along with the source key
    /// that supplied it.
    fn resolve<'v, T>(
        &self,
        record: &'v Map<String, Value>,
        accept: impl Fn(&'v Value) -> Option<T>,
    ) -> Option<(T, &str)> {
        self.extractors.iter().find_map(|extractor| {
            extractor
                .extract(record)
                .and_then(&accept)
                .map(|value| (value, extractor.label.as_str()))
        })
    }
}

struct RecordResolver<'c> {
    wallet: FieldResolver<'c>,
    action: FieldResolver<'c>,
    amount: FieldResolver<'c>,
    asset: FieldResolver<'c>,
    timestamp: FieldResolver<'c>,
    unknown_asset: &'c str,
}

impl<'c> RecordResolver<'c> {
    fn new(fields: &'c FieldConfig) -> Self {
        let nested = fields.nested.as_slice();
        Self {
            wallet: FieldResolver::new(SemanticField::Wallet, &fields.wallet, nested),
            action: FieldResolver::new(SemanticField::Action, &fields.action, nested),
            amount: FieldResolver::new(SemanticField::Amount, &fields.amount, nested),
            asset: FieldResolver::new(SemanticField::Asset, &fields.asset, nested),
            timestamp: FieldResolver::new(SemanticField::Timestamp, &fields.timestamp, nested),
            unknown_asset: &fields.unknown_asset,
        }
    }

    fn resolve(&self, index: usize, record: &Value, stats: &mut NormalizationStats) -> Option<Event> {
        let Some(record) = record.as_object() else {
            tracing::trace!(index, "Record is not an object, dropping");
            stats.not_an_object += 1;
            return None;
        };

        let Some((wallet, wallet_key)) = self.wallet.resolve(record, identifier) else {
            tracing::trace!(index, "No wallet field found, dropping record");
            stats.missing_wallet += 1;
            return None;
        };

        let Some((action, action_key)) = self.action.resolve(record, non_empty_str) else {
            tracing::trace!(index, wallet = %wallet, "No action field found, dropping record");
            stats.missing_action += 1;
            return None;
        };

        stats.record_match(self.wallet.field, wallet_key);
        stats.record_match(self.action.field, action_key);

        let amount = match self.amount.resolve(record, Some) {
            Some((value, key)) => {
                stats.record_match(self.amount.field, key);
                parse_amount(value)
            }
            None => Decimal::ZERO,
        };

        let asset = match self.asset.resolve(record, identifier) {
            Some((asset, key)) => {
                stats.record_match(self.asset.field, key);
                asset
            }
            None => self.unknown_asset.to_string(),
        };

        let timestamp = self.timestamp.resolve(record, Some).and_then(|(value, key)| {
            let seconds = parse_timestamp(value)?;
            stats.record_match(self.timestamp.field, key);
            Some(seconds)
        });

        Some(Event {
            wallet: wallet.to_lowercase(),
            action: ActionKind::classify(action),
            amount,
            asset,
            timestamp,
        })
    }
}

// =============================================================================
// Entry Points
// =============================================================================

/// Locate the list of raw records inside a decoded document.
///
/// A top-level list is used as is. An object is unwrapped when exactly one of
/// its keys holds a list; with several lists the first configured container
/// key wins.
pub fn unwrap_records<'v>(raw: &'v Value, fields: &FieldConfig) -> CreditResult<&'v [Value]> {
    let map = match raw {
        Value::Array(items) => return Ok(items.as_slice()),
        Value::Object(map) => map,
        other => {
            return Err(CreditError::Schema(format!(
                "expected a list of records or an object wrapping one, got {}",
                json_kind(other)
            )))
        }
    };

    let lists: Vec<(&String, &Vec<Value>)> = map
        .iter()
        .filter_map(|(key, value)| value.as_array().map(|items| (key, items)))
        .collect();

    match lists.as_slice() {
        [] => Err(CreditError::Schema(
            "top-level object holds no list of records".to_string(),
        )),
        [(key, items)] => {
            tracing::debug!(container = %key, records = items.len(), "Unwrapped record container");
            Ok(items.as_slice())
        }
        _ => fields
            .containers
            .iter()
            .find_map(|key| {
                map.get(key)
                    .and_then(Value::as_array)
                    .map(|items| (key, items))
            })
            .map(|(key, items)| {
                tracing::debug!(container = %key, records = items.len(), "Unwrapped preferred record container");
                items.as_slice()
            })
            .ok_or_else(|| {
                let names: Vec<&str> = lists.iter().map(|(key, _)| key.as_str()).collect();
                CreditError::Schema(format!(
                    "ambiguous input: several lists ({}) and none under a known container key",
                    names.join(", ")
                ))
            }),
    }
}

/// Resolve a decoded ledger document into an [`EventTable`].
pub fn normalize(raw: &Value, fields: &FieldConfig) -> CreditResult<EventTable> {
    fields.validate()?;

    let records = unwrap_records(raw, fields)?;
    let resolver = RecordResolver::new(fields);

    let mut stats = NormalizationStats::default();
    let mut events = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        stats.records_seen += 1;
        match resolver.resolve(index, record, &mut stats) {
            Some(event) => events.push(event),
            None => stats.records_dropped += 1,
        }
    }

    for field in SemanticField::ALL {
        tracing::debug!(
            field = %field,
            source = stats.dominant_key(field).unwrap_or("<none>"),
            "Resolved field mapping"
        );
    }

    tracing::info!(
        records = stats.records_seen,
        events = events.len(),
        dropped = stats.records_dropped,
        "Normalized ledger records"
    );

    Ok(EventTable::from_events(events, stats))
}

// =============================================================================
// Value Parsing
// =============================================================================

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Non-empty string or number. Blank strings count as absent so that the
/// next candidate key is tried.
fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Magnitude of a JSON number or base-10 numeric string. Anything else,
/// including values outside the decimal range, is zero.
pub fn parse_amount(value: &Value) -> Decimal {
    let parsed = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                n.as_f64().and_then(|f| Decimal::try_from(f).ok())
            }
        }
        Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
        }
        _ => None,
    };

    parsed.unwrap_or(Decimal::ZERO).abs()
}

/// Epoch seconds from an integer, a numeric string or an RFC 3339 string.
/// Values chrono cannot represent are treated as absent.
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    let seconds = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp()))
        }
        _ => None,
    }?;

    DateTime::from_timestamp(seconds, 0).map(|_| seconds)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn fields() -> FieldConfig {
        FieldConfig::default()
    }

    #[test]
    fn test_unwrap_bare_list() {
        let raw = json!([{ "user": "0xa", "action": "deposit" }]);
        assert_eq!(unwrap_records(&raw, &fields()).unwrap().len(), 1);
    }

    #[test]
    fn test_unwrap_single_container() {
        let raw = json!({
            "meta": { "source": "aave-v2" },
            "rows": [{ "user": "0xa", "action": "deposit" }, { "user": "0xb", "action": "borrow" }]
        });
        assert_eq!(unwrap_records(&raw, &fields()).unwrap().len(), 2);
    }

    #[test]
    fn test_unwrap_prefers_known_container() {
        let raw = json!({
            "errors": [],
            "transactions": [{ "user": "0xa", "action": "deposit" }]
        });
        assert_eq!(unwrap_records(&raw, &fields()).unwrap().len(), 1);
    }

    #[test]
    fn test_unwrap_rejects_unknown_shapes() {
        for raw in [
            json!("not records"),
            json!(42),
            json!({ "count": 3 }),
            json!({ "a": [], "b": [] }),
        ] {
            assert!(matches!(
                unwrap_records(&raw, &fields()),
                Err(CreditError::Schema(_))
            ));
        }
    }

    #[test]
    fn test_wallet_candidates_in_priority_order() {
        let raw = json!([
            { "wallet": "0xWALLET", "address": "0xaddress", "action": "deposit" },
            { "account": "0xAccount", "type": "borrow" },
        ]);
        let table = normalize(&raw, &fields()).unwrap();

        assert!(table.events_for("0xwallet").is_some());
        assert!(table.events_for("0xaddress").is_none());
        assert!(table.events_for("0xaccount").is_some());
    }

    #[test]
    fn test_records_without_wallet_or_action_are_dropped() {
        let raw = json!([
            { "action": "deposit", "amount": "10" },
            { "user": "0xa" },
            { "user": "", "action": "deposit" },
            "garbage",
            { "user": "0xa", "action": "repay" },
        ]);
        let table = normalize(&raw, &fields()).unwrap();
        let stats = table.stats();

        assert_eq!(table.event_count(), 1);
        assert_eq!(stats.records_seen, 5);
        assert_eq!(stats.records_dropped, 4);
        assert_eq!(stats.missing_wallet, 2);
        assert_eq!(stats.missing_action, 1);
        assert_eq!(stats.not_an_object, 1);
    }

    #[test]
    fn test_nested_action_data_fields() {
        let raw = json!({
            "transactions": [{
                "userWallet": "0xNested",
                "action": "deposit",
                "timestamp": 1629178166,
                "actionData": {
                    "amount": "2000000000",
                    "assetSymbol": "USDC"
                }
            }]
        });
        let table = normalize(&raw, &fields()).unwrap();
        let events = table.events_for("0xnested").unwrap();

        assert_eq!(events[0].amount, dec!(2000000000));
        assert_eq!(events[0].asset, "USDC");
        assert_eq!(table.stats().dominant_key(SemanticField::Amount), Some("actionData.amount"));
    }

    #[test]
    fn test_optional_fields_default() {
        let raw = json!([{ "user": "0xa", "action": "deposit", "amount": "lots" }]);
        let table = normalize(&raw, &fields()).unwrap();
        let event = &table.events_for("0xa").unwrap()[0];

        assert_eq!(event.amount, Decimal::ZERO);
        assert_eq!(event.asset, "unknown");
        assert_eq!(event.timestamp, None);
    }

    #[test]
    fn test_parse_amount_variants() {
        assert_eq!(parse_amount(&json!(12)), dec!(12));
        assert_eq!(parse_amount(&json!(-3.5)), dec!(3.5));
        assert_eq!(parse_amount(&json!("0.25")), dec!(0.25));
        assert_eq!(parse_amount(&json!("1e3")), dec!(1000));
        assert_eq!(parse_amount(&json!("n/a")), Decimal::ZERO);
        assert_eq!(parse_amount(&json!(true)), Decimal::ZERO);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert_eq!(parse_timestamp(&json!(1629178166)), Some(1629178166));
        assert_eq!(parse_timestamp(&json!("1629178166")), Some(1629178166));
        assert_eq!(parse_timestamp(&json!(1629178166.9)), Some(1629178166));
        assert_eq!(parse_timestamp(&json!("2021-08-17T05:29:26Z")), Some(1629178166));
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
        assert_eq!(parse_timestamp(&json!(i64::MAX)), None);
    }

    #[test]
    fn test_wallets_are_grouped_case_insensitively() {
        let raw = json!([
            { "user": "0xABC", "action": "deposit" },
            { "user": "0xabc", "action": "borrow" },
        ]);
        let table = normalize(&raw, &fields()).unwrap();
        assert_eq!(table.wallet_count(), 1);
        assert_eq!(table.events_for("0xabc").unwrap().len(), 2);
    }

    #[test]
    fn test_numeric_wallet_is_accepted() {
        let raw = json!([
            { "user": 12345, "action": "deposit" },
            { "user": "  ", "wallet": "0xFallback", "action": "deposit" },
        ]);
        let table = normalize(&raw, &fields()).unwrap();

        assert_eq!(table.wallet_count(), 2);
        assert!(table.events_for("12345").is_some());
        assert!(table.events_for("0xfallback").is_some());
        assert_eq!(table.stats().records_dropped, 0);
    }

    #[test]
    fn test_unparseable_timestamps_do_not_count_as_mapping() {
        let raw = json!([
            { "user": "0xa", "action": "deposit", "timestamp": "yesterday" },
            { "user": "0xa", "action": "deposit", "timestamp": "last week" },
            { "user": "0xa", "action": "deposit", "blockTimestamp": 1629178166 },
        ]);
        let table = normalize(&raw, &fields()).unwrap();

        assert_eq!(
            table.stats().dominant_key(SemanticField::Timestamp),
            Some("blockTimestamp")
        );
        assert_eq!(table.stats().matched[&SemanticField::Timestamp].len(), 1);
    }

    #[test]
    fn test_custom_candidates() {
        let mut config = fields();
        config.wallet = vec!["owner".to_string()];
        let raw = json!([
            { "owner": "0xa", "action": "deposit" },
            { "user": "0xb", "action": "deposit" },
        ]);
        let table = normalize(&raw, &config).unwrap();
        assert_eq!(table.wallet_count(), 1);
        assert_eq!(table.stats().dominant_key(SemanticField::Wallet), Some("owner"));
    }
}
