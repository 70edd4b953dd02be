//! Resource supply scenarios over the full pipeline.

use vellum_core::{NewEntity, TokenAmount};
use vellum_ledger::LedgerError;

use crate::generators::*;
use crate::harness::TestLedger;

fn ledger_with_resources(addresses: &[&str]) -> TestLedger {
    let mut ledger = TestLedger::new();
    let entities = addresses
        .iter()
        .map(|address| NewEntity::fungible_resource(*address))
        .collect();
    ledger.extend(&[creation_tx(1, entities)]).unwrap();
    ledger
}

#[test]
fn mint_then_burn_leaves_intermediate_and_final_snapshots() {
    let mut ledger = ledger_with_resources(&["resource_gold"]);

    let mut minting = tx(2);
    minting.events.push(mint("resource_gold", 5));
    let mut burning = tx(3);
    burning.events.push(burn("resource_gold", 2));
    ledger.extend(&[minting, burning]).unwrap();

    let resource = ledger.entity_id("resource_gold");
    let rows = ledger.supply_history(resource);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].total_supply, TokenAmount::from_i64(5));
    assert_eq!(rows[1].total_minted, TokenAmount::from_i64(5));
    assert_eq!(rows[1].total_burned, TokenAmount::from_i64(2));
    assert_eq!(rows[1].total_supply, TokenAmount::from_i64(3));
}

#[test]
fn interleaved_resources_keep_independent_totals() {
    let mut ledger = ledger_with_resources(&["resource_gold", "resource_silver"]);

    let mut batch = tx(2);
    batch.events.push(mint("resource_gold", 10));
    batch.events.push(mint("resource_silver", 100));
    batch.events.push(burn("resource_gold", 4));
    ledger.extend(&[batch]).unwrap();

    let gold = ledger.entity_id("resource_gold");
    let silver = ledger.entity_id("resource_silver");

    // One version touched, one snapshot per resource.
    let gold_rows = ledger.supply_history(gold);
    assert_eq!(gold_rows.len(), 1);
    assert_eq!(gold_rows[0].total_supply, TokenAmount::from_i64(6));

    let silver_rows = ledger.supply_history(silver);
    assert_eq!(silver_rows.len(), 1);
    assert_eq!(silver_rows[0].total_supply, TokenAmount::from_i64(100));
}

#[test]
fn totals_carry_forward_across_batches_and_restarts() {
    let mut ledger = ledger_with_resources(&["resource_gold"]);

    let mut minting = tx(2);
    minting.events.push(mint("resource_gold", 10));
    ledger.extend(&[minting]).unwrap();

    ledger.restart(Default::default());

    let mut burning = tx(3);
    burning.events.push(burn("resource_gold", 7));
    ledger.extend(&[burning]).unwrap();

    let resource = ledger.entity_id("resource_gold");
    let last = ledger.supply_history(resource).pop().unwrap();
    assert_eq!(last.total_minted, TokenAmount::from_i64(10));
    assert_eq!(last.total_burned, TokenAmount::from_i64(7));
    assert_eq!(last.total_supply, TokenAmount::from_i64(3));
}

#[test]
fn mint_from_a_component_fails_the_batch() {
    let mut ledger = TestLedger::new();
    ledger
        .extend(&[creation_tx(1, vec![NewEntity::component("component_a")])])
        .unwrap();

    let mut batch = tx(2);
    batch.events.push(mint("component_a", 5));

    let result = ledger.extend(&[batch]);
    assert!(matches!(result, Err(LedgerError::EntityTypeMismatch { .. })));
    assert!(ledger
        .supply_history(ledger.entity_id("component_a"))
        .is_empty());
}
