//! End-to-end batch pipeline tests: entity resolution, processor fan-out,
//! atomic commit, and restart behavior.

use vellum_core::{EntityType, NewEntity, SubstateData, TokenAmount, UpsertedSubstate};
use vellum_ledger::{ExtenderConfig, LedgerError};

use crate::generators::*;
use crate::harness::TestLedger;

#[test]
fn genesis_batch_materializes_every_concern() {
    let mut ledger = TestLedger::new();

    let mut genesis = creation_tx(
        1,
        vec![
            NewEntity::component("component_alpha"),
            NewEntity::fungible_resource("resource_gold"),
            NewEntity::fungible_vault("vault_alpha_gold", "component_alpha", "resource_gold"),
        ],
    );
    genesis
        .substates
        .push(metadata_upsert("component_alpha", "name", Some(b"Alpha")));
    genesis.substates.push(balance_upsert("vault_alpha_gold", 500));
    genesis.events.push(mint("resource_gold", 500));
    genesis.fee_paid = random_amount(1_000_000);

    let report = ledger.extend(&[genesis]).unwrap();
    assert_eq!(report.transaction_count, 1);
    assert_eq!(report.entities_created, 3);
    assert_eq!(report.rows_deleted, 0);

    // Entities resolved with wired links.
    let component = ledger.entity("component_alpha").unwrap();
    let resource = ledger.entity("resource_gold").unwrap();
    let vault = ledger.entity("vault_alpha_gold").unwrap();
    assert_eq!(vault.entity_type, EntityType::FungibleVault);
    assert_eq!(vault.parent_id, Some(component.id));
    assert_eq!(vault.fungible_resource_id, Some(resource.id));

    // One row in every materialized table the batch touched.
    assert_eq!(ledger.transaction_rows().len(), 1);
    assert_eq!(ledger.metadata_entries(component.id, "name").len(), 1);
    assert_eq!(ledger.metadata_aggregates(component.id).len(), 1);
    assert_eq!(ledger.supply_history(resource.id).len(), 1);
    assert_eq!(ledger.vault_history(vault.id).len(), 1);
    assert_eq!(
        ledger.holder(component.id, resource.id).unwrap().balance,
        TokenAmount::from_i64(500)
    );
}

#[test]
fn failed_transaction_contributes_only_its_ledger_row() {
    let mut ledger = TestLedger::new();
    ledger
        .extend(&[creation_tx(1, vec![NewEntity::component("component_a")])])
        .unwrap();

    // A failed transaction never resolves or materializes its changes, even
    // if the feed left them attached.
    let mut failed = failed_tx(2, 100);
    failed
        .substates
        .push(metadata_upsert("component_ghost", "name", Some(b"x")));

    let report = ledger.extend(&[failed]).unwrap();
    assert_eq!(report.rows_appended, 1);

    let rows = ledger.transaction_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].fee_paid, TokenAmount::from_i64(100));
    assert!(ledger.entity("component_ghost").is_none());
}

#[test]
fn contract_violation_rolls_back_the_whole_batch() {
    let mut ledger = TestLedger::new();

    let mut good = creation_tx(1, vec![NewEntity::component("component_a")]);
    good.substates
        .push(metadata_upsert("component_a", "name", Some(b"a")));
    // Same batch references an address nothing resolves.
    let mut bad = tx(2);
    bad.substates
        .push(metadata_upsert("component_unknown", "name", Some(b"x")));

    let result = ledger.extend(&[good, bad]);
    assert!(matches!(result, Err(LedgerError::MissingEntity(_))));

    // Nothing from the batch landed, not even the valid first transaction.
    assert!(ledger.entity("component_a").is_none());
    assert!(ledger.transaction_rows().is_empty());
    assert_eq!(ledger.extender().top_of_ledger(), None);
}

#[test]
fn unrecognized_substates_flow_through_without_effect() {
    let mut ledger = TestLedger::new();

    let mut batch = creation_tx(1, vec![NewEntity::component("component_a")]);
    batch.substates.push(UpsertedSubstate::new(
        "component_a",
        SubstateData::RoleAssignmentEntry {
            role_key: "owner".to_owned(),
            rule: vec![0xde, 0xad],
        },
    ));

    let report = ledger.extend(&[batch]).unwrap();
    // Transaction row plus the entity row; the unknown substate is ignored.
    assert_eq!(report.rows_appended, 2);
    assert!(ledger
        .metadata_aggregates(ledger.entity_id("component_a"))
        .is_empty());
}

#[test]
fn restart_resumes_ids_and_top_of_ledger() {
    let mut ledger = TestLedger::new();
    ledger
        .extend(&[creation_tx(1, vec![NewEntity::component("component_a")])])
        .unwrap();
    let first_id = ledger.entity_id("component_a");

    ledger.restart(ExtenderConfig::default());
    assert_eq!(
        ledger.extender().top_of_ledger().map(|v| v.number()),
        Some(1)
    );

    ledger
        .extend(&[creation_tx(2, vec![NewEntity::component("component_b")])])
        .unwrap();
    // The entity sequence resumed past the persisted counter.
    assert!(ledger.entity_id("component_b") > first_id);
}

#[test]
fn substate_on_forward_created_entity_resolves_within_the_batch() {
    let mut ledger = TestLedger::new();

    // The substate's transaction precedes the one creating the entity at a
    // later version of the same batch; resolution runs batch-wide first, so
    // this is legal only if the entity is created somewhere in the batch.
    let mut uses = creation_tx(1, vec![NewEntity::component("component_a")]);
    uses.substates
        .push(metadata_upsert("component_a", "name", Some(b"a")));
    let mut more = tx(2);
    more.substates
        .push(metadata_upsert("component_a", "name", Some(b"b")));

    ledger.extend(&[uses, more]).unwrap();
    let entity = ledger.entity_id("component_a");
    assert_eq!(ledger.metadata_entries(entity, "name").len(), 2);
    // Two versions touched, two aggregate snapshots.
    assert_eq!(ledger.metadata_aggregates(entity).len(), 2);
}
