//! End-to-end ownership flow through two inventories.
//!
//! Ownership after a transfer is proven by the provenance chain (original
//! proof plus signed transfers). The issuer re-mint path is covered too.

use std::sync::Arc;

use relic_core::{
    generate_keypair, import_private_key, mint_addon, reissue_addon, AddonCategory, AddonDraft,
    AddonInventory, AddonMetadata, AddonRarity, InMemoryNonceLedger, MintOptions, NonceLedger,
    NonceScope, PrivateKeyHandle, RelicConfig, RelicError, Verifier,
};
use relic_core::codec::decode_base64;
use serde_json::Value as JsonValue;

struct Party {
    key: PrivateKeyHandle,
    public: String,
}

impl Party {
    fn new() -> Self {
        let key = import_private_key(&generate_keypair().unwrap().private_key).unwrap();
        let public = key.public_key().unwrap().to_base64();
        Self { key, public }
    }
}

fn blade_draft() -> AddonDraft {
    AddonDraft {
        id: "blade-9".into(),
        name: "Storm Blade".into(),
        description: "Crackles faintly".into(),
        category: AddonCategory::Weapon,
        rarity: AddonRarity::Epic,
        attachment: JsonValue::Null,
        visual: serde_json::json!({"glow": "#44f"}),
        modifiers: serde_json::json!({"attack": 12, "speed": -1}),
        metadata: AddonMetadata {
            creator: "forge".into(),
            created_at: 0,
            edition: Some(3),
            max_editions: Some(50),
        },
    }
}

#[tokio::test]
async fn test_chain_transfer_between_inventories() {
    let (issuer, alice, bob) = (Party::new(), Party::new(), Party::new());
    let addon = mint_addon(blade_draft(), &alice.key, &issuer.key, &MintOptions::default()).unwrap();

    let mut alice_inv = AddonInventory::new(alice.public.clone());
    alice_inv.admit(addon).await.unwrap();
    assert_eq!(alice_inv.verified("blade-9").unwrap().modifiers()["attack"], 12);

    let offer = alice_inv
        .transfer_out("blade-9", &alice.key, bob.public.clone())
        .unwrap();
    assert!(alice_inv.is_empty());

    let mut bob_inv = AddonInventory::new(bob.public.clone());
    bob_inv.accept(&offer).await.unwrap();

    let chain = bob_inv.get("blade-9").unwrap();
    assert_eq!(chain.current_owner(), bob.public);
    assert_eq!(chain.transfers.len(), 1);
    // The embedded proof still names Alice; the chain is what makes Bob the owner
    assert_eq!(chain.addon.owner_public_key(), alice.public);
    assert!(bob_inv.verified("blade-9").is_ok());
}

#[tokio::test]
async fn test_outgoing_transfer_nonce_uses_configured_length() {
    let (issuer, alice, bob) = (Party::new(), Party::new(), Party::new());
    let addon = mint_addon(blade_draft(), &alice.key, &issuer.key, &MintOptions::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let config = RelicConfig::default()
        .with_inventory_path(dir.path().join("alice.json"))
        .with_nonce_bytes(24);
    let mut alice_inv = AddonInventory::open(&config, alice.public.clone())
        .await
        .unwrap();
    alice_inv.admit(addon).await.unwrap();

    let offer = alice_inv
        .transfer_out("blade-9", &alice.key, bob.public.clone())
        .unwrap();
    let nonce = decode_base64("nonce", &offer.transfer.nonce).unwrap();
    assert_eq!(nonce.len(), 24);
}

#[tokio::test]
async fn test_replayed_transfer_rejected_after_reload() {
    let (issuer, alice, bob, carol) = (Party::new(), Party::new(), Party::new(), Party::new());
    let addon = mint_addon(blade_draft(), &alice.key, &issuer.key, &MintOptions::default()).unwrap();

    let mut alice_inv = AddonInventory::new(alice.public.clone());
    alice_inv.admit(addon).await.unwrap();
    let offer = alice_inv
        .transfer_out("blade-9", &alice.key, bob.public.clone())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bob.json");

    let mut bob_inv = AddonInventory::new(bob.public.clone());
    bob_inv.accept(&offer).await.unwrap();

    // Bob passes it on, so the chain is no longer held locally
    let onward = bob_inv
        .transfer_out("blade-9", &bob.key, carol.public.clone())
        .unwrap();
    bob_inv.save(&path).await.unwrap();
    assert_eq!(onward.chain.transfers.len(), 1);

    let mut reloaded = AddonInventory::load(&path).await.unwrap();
    assert!(reloaded.is_empty());
    assert_eq!(reloaded.consumed_nonces().count(), 1);

    let err = reloaded.accept(&offer).await.unwrap_err();
    assert!(matches!(err, RelicError::Replay { .. }), "got {err:?}");
    assert_eq!(err.exit_code(), 4);
}

#[tokio::test]
async fn test_shared_ledger_blocks_cross_inventory_replay() {
    let (issuer, alice, bob) = (Party::new(), Party::new(), Party::new());
    let addon = mint_addon(blade_draft(), &alice.key, &issuer.key, &MintOptions::default()).unwrap();

    let ledger: Arc<dyn NonceLedger> = Arc::new(InMemoryNonceLedger::new());
    let mut alice_inv =
        AddonInventory::new(alice.public.clone()).with_ledger(Arc::clone(&ledger));
    alice_inv.admit(addon.clone()).await.unwrap();
    assert!(ledger
        .contains(NonceScope::Issuance, &addon.ownership.nonce)
        .await
        .unwrap());

    // A second inventory for the same owner sharing the ledger refuses the copy
    let mut twin = AddonInventory::new(alice.public.clone()).with_ledger(Arc::clone(&ledger));
    let err = twin.admit(addon).await.unwrap_err();
    assert!(matches!(err, RelicError::Replay { .. }));

    let offer = alice_inv
        .transfer_out("blade-9", &alice.key, bob.public.clone())
        .unwrap();
    let mut bob_inv = AddonInventory::new(bob.public.clone()).with_ledger(Arc::clone(&ledger));
    bob_inv.accept(&offer).await.unwrap();
}

#[tokio::test]
async fn test_admit_rejects_foreign_and_invalid_addons() {
    let (issuer, alice, bob) = (Party::new(), Party::new(), Party::new());
    let addon = mint_addon(blade_draft(), &alice.key, &issuer.key, &MintOptions::default()).unwrap();

    let mut bob_inv = AddonInventory::new(bob.public.clone());
    let err = bob_inv.admit(addon.clone()).await.unwrap_err();
    assert!(matches!(err, RelicError::AddonRejected { .. }));

    let mut tampered = addon;
    tampered.rarity = AddonRarity::Mythic;
    let mut alice_inv = AddonInventory::new(alice.public.clone());
    let err = alice_inv.admit(tampered).await.unwrap_err();
    assert!(matches!(err, RelicError::AddonRejected { .. }));
    assert!(alice_inv.is_empty());
}

#[tokio::test]
async fn test_untrusted_issuer_rejected() {
    let (issuer, rogue, alice) = (Party::new(), Party::new(), Party::new());
    let addon = mint_addon(blade_draft(), &alice.key, &rogue.key, &MintOptions::default()).unwrap();

    let verifier = Verifier::new().trust_issuer(issuer.key.public_key().unwrap());
    let mut inv = AddonInventory::new(alice.public.clone()).with_verifier(verifier);
    let err = inv.admit(addon).await.unwrap_err();
    assert!(err.to_string().contains("not trusted"), "{err}");
}

#[tokio::test]
async fn test_issuer_reissue_replaces_chain() {
    let (issuer, alice, bob) = (Party::new(), Party::new(), Party::new());
    let addon = mint_addon(blade_draft(), &alice.key, &issuer.key, &MintOptions::default()).unwrap();

    let mut alice_inv = AddonInventory::new(alice.public.clone());
    alice_inv.admit(addon).await.unwrap();
    let offer = alice_inv
        .transfer_out("blade-9", &alice.key, bob.public.clone())
        .unwrap();

    let mut bob_inv = AddonInventory::new(bob.public.clone());
    bob_inv.accept(&offer).await.unwrap();

    // Issuer collapses the chain into a fresh proof naming Bob
    let reissued =
        reissue_addon(&offer.chain.addon, &bob.key, &issuer.key, &MintOptions::default()).unwrap();
    bob_inv.admit(reissued).await.unwrap();

    let chain = bob_inv.get("blade-9").unwrap();
    assert!(chain.transfers.is_empty());
    assert_eq!(chain.addon.owner_public_key(), bob.public);
    assert_eq!(bob_inv.len(), 1);
}

#[tokio::test]
async fn test_saved_inventory_round_trips_chains() {
    let (issuer, alice, bob) = (Party::new(), Party::new(), Party::new());
    let addon = mint_addon(blade_draft(), &alice.key, &issuer.key, &MintOptions::default()).unwrap();

    let mut alice_inv = AddonInventory::new(alice.public.clone());
    alice_inv.admit(addon).await.unwrap();
    let offer = alice_inv
        .transfer_out("blade-9", &alice.key, bob.public.clone())
        .unwrap();
    let mut bob_inv = AddonInventory::new(bob.public.clone());
    bob_inv.accept(&offer).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inventory.json");
    bob_inv.save(&path).await.unwrap();

    let loaded = AddonInventory::load(&path).await.unwrap();
    assert_eq!(loaded.owner(), bob.public);
    assert_eq!(loaded.addon_ids(), vec!["blade-9"]);
    assert_eq!(loaded.get("blade-9"), bob_inv.get("blade-9"));
    assert!(loaded.verified("blade-9").is_ok());
}
