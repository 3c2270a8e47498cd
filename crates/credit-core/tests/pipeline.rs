use credit_core::report::ScoringReport;
use credit_core::{normalize, score, score_detailed, CreditError, CreditScorer, FieldConfig, ScoreWeights};
use serde_json::{json, Value};

const DAY: i64 = 86_400;
const T0: i64 = 1_609_459_200; // 2021-01-01T00:00:00Z

/// 50 deposits, 50 borrows and 50 repays over 10 consecutive days and 3 assets.
fn disciplined_wallet(wallet: &str) -> Vec<Value> {
    let assets = ["USDC", "DAI", "WETH"];
    let mut records = Vec::new();
    for i in 0..150i64 {
        let action = match i % 3 {
            0 => "deposit",
            1 => "borrow",
            _ => "repay",
        };
        records.push(json!({
            "userWallet": wallet,
            "action": action,
            "timestamp": T0 + (i % 10) * DAY + i,
            "actionData": {
                "amount": format!("{}", 1000 + i),
                "assetSymbol": assets[(i % 3) as usize],
            }
        }));
    }
    records
}

#[test]
fn test_disciplined_wallet_scores_maximum() {
    let raw = json!({ "transactions": disciplined_wallet("0xDisciplined") });
    let table = normalize(&raw, &FieldConfig::default()).unwrap();
    let detailed = score_detailed(&table, &ScoreWeights::default());

    let scored = &detailed["0xdisciplined"];
    assert_eq!(scored.features.total_transactions, 150);
    assert_eq!(scored.features.deposit_count, 50);
    assert_eq!(scored.features.borrow_count, 50);
    assert_eq!(scored.features.repay_count, 50);
    assert_eq!(scored.features.distinct_assets, 3);
    assert_eq!(scored.features.active_days, 10);
    assert_eq!(scored.features.span_days, 10);
    assert_eq!(scored.features.velocity, 15.0);

    let breakdown = &scored.breakdown;
    assert_eq!(breakdown.volume, 250.0);
    assert_eq!(breakdown.repayment, 300.0);
    assert_eq!(breakdown.risk, 200.0);
    assert_eq!(breakdown.consistency, 150.0);
    assert_eq!(breakdown.diversity, 60.0);
    assert_eq!(breakdown.bonus, 50.0);
    assert_eq!(breakdown.raw, 1010.0);
    assert!(!breakdown.bot_penalty);
    assert_eq!(breakdown.score, 1000);
}

#[test]
fn test_bot_wallet_is_halved() {
    let records: Vec<Value> = (0..101)
        .map(|i| {
            json!({
                "user": "0xbot",
                "action": "deposit",
                "reserve": "USDC",
                "timestamp": T0 + i,
            })
        })
        .collect();

    let scores = score(
        &normalize(&Value::Array(records), &FieldConfig::default()).unwrap(),
        &ScoreWeights::default(),
    );

    // 250 + 300 + 200 + 150 + 20 + 50 = 970, halved
    assert_eq!(scores["0xbot"], 485);
}

#[test]
fn test_liquidated_borrower() {
    let raw = json!([
        { "user": "0xrisky", "action": "deposit", "reserve": "WETH", "timestamp": T0 },
        { "user": "0xrisky", "action": "borrow", "reserve": "USDC", "timestamp": T0 + DAY },
        { "user": "0xrisky", "action": "liquidationcall", "reserve": "WETH", "timestamp": T0 + 2 * DAY },
    ]);
    let scores = score(&normalize(&raw, &FieldConfig::default()).unwrap(), &ScoreWeights::default());

    // volume 15, repayment 0, risk 0, consistency 150, diversity 40, no bonus
    assert_eq!(scores["0xrisky"], 205);
}

#[test]
fn test_dropped_records_do_not_reach_output() {
    let raw = json!([
        { "action": "deposit", "reserve": "USDC", "amount": "500" },
        { "user": "0xkept", "action": "deposit", "reserve": "USDC" },
        { "user": "0xno-action", "reserve": "DAI" },
    ]);
    let table = normalize(&raw, &FieldConfig::default()).unwrap();
    let scores = score(&table, &ScoreWeights::default());

    assert_eq!(scores.len(), 1);
    assert!(scores.contains_key("0xkept"));
    assert!(!scores.contains_key("0xno-action"));
    assert_eq!(table.event_count(), 1);
    assert_eq!(table.stats().records_dropped, 2);
}

#[test]
fn test_empty_input_scores_nothing() {
    for raw in [json!([]), json!({ "transactions": [] }), json!([{ "foo": 1 }])] {
        let table = normalize(&raw, &FieldConfig::default()).unwrap();
        assert!(table.is_empty());
        assert!(score(&table, &ScoreWeights::default()).is_empty());
    }
}

#[test]
fn test_unrecognized_shape_is_schema_error() {
    let err = normalize(&json!({ "status": "ok" }), &FieldConfig::default()).unwrap_err();
    assert!(matches!(err, CreditError::Schema(_)));
}

#[test]
fn test_scoring_is_idempotent() {
    let mut records = disciplined_wallet("0xa");
    records.extend(disciplined_wallet("0xb").into_iter().take(17));
    records.push(json!({ "user": "0xc", "type": "Borrow", "value": 12 }));

    let table = normalize(&Value::Array(records), &FieldConfig::default()).unwrap();
    let first = score(&table, &ScoreWeights::default());
    let second = score(&table, &ScoreWeights::default());

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_scores_do_not_depend_on_other_wallets() {
    let alone = json!(disciplined_wallet("0xa"));
    let mut crowded = disciplined_wallet("0xa");
    crowded.extend(disciplined_wallet("0xb"));
    crowded.push(json!({ "user": "0xc", "action": "liquidationcall" }));

    let weights = ScoreWeights::default();
    let alone_scores = score(&normalize(&alone, &FieldConfig::default()).unwrap(), &weights);
    let crowded_scores = score(
        &normalize(&Value::Array(crowded), &FieldConfig::default()).unwrap(),
        &weights,
    );

    assert_eq!(alone_scores["0xa"], crowded_scores["0xa"]);
}

#[test]
fn test_scorer_run_and_report() {
    let scorer = CreditScorer::default();
    let raw = json!({ "data": [
        { "user": "0xa", "action": "deposit", "reserve": "USDC", "timestamp": T0 },
        { "user": "0xa", "action": "redeemunderlying", "reserve": "USDC", "timestamp": T0 + 10 },
        { "account": "0xb", "event": "borrow", "token": "DAI", "blockTimestamp": T0 },
    ]});

    let batch = scorer.run(&raw).unwrap();
    let report = ScoringReport::assemble(batch.scores(), batch.table.stats(), chrono::Utc::now());

    assert_eq!(report.total_wallets_scored, 2);
    assert_eq!(report.records_seen, 3);
    assert_eq!(report.records_dropped, 0);
    assert_eq!(batch.features()["0xa"].other_count, 1);

    // 0xa: volume 10, repayment 300, risk 200, consistency 150, diversity 20, bonus 50
    assert_eq!(report.wallet_scores["0xa"], 730);
    // 0xb: volume 5, repayment 0, risk 200, consistency 150, diversity 20
    assert_eq!(report.wallet_scores["0xb"], 375);
}

#[test]
fn test_huge_amounts_do_not_abort_the_batch() {
    let raw = json!([
        { "user": "0xwhale", "action": "deposit", "amount": "50000000000000000000000000000" },
        { "user": "0xwhale", "action": "deposit", "amount": "50000000000000000000000000000" },
        { "user": "0xminnow", "action": "deposit", "amount": "1" },
    ]);
    let table = normalize(&raw, &FieldConfig::default()).unwrap();
    let detailed = score_detailed(&table, &ScoreWeights::default());

    assert_eq!(detailed.len(), 2);
    assert_eq!(detailed["0xwhale"].features.total_volume, rust_decimal::Decimal::MAX);
}
