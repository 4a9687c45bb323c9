//! Startup orchestration; `open_node` and the wallet bootstrap.

//---------------------------------------------------------------------------------------------------- Import
use std::sync::Arc;

use ferrate_database::{config::Config, Env};

use crate::{
    crypto::{hash160, pub_key_to_address},
    error::StoreResult,
    external::KeyGenerator,
    state::NodeState,
    store::{set_address_book_name, AddressStore, TxIndexStore, WalletStore},
    types::KeyPair,
};

//---------------------------------------------------------------------------------------------------- load_wallet
/// Load the wallet and guarantee a usable default key.
///
/// After the file loads, the recorded default public key is resolved
/// against the owned-key table. If it resolves, that pair becomes the
/// active user key. Otherwise — fresh wallet, or a default record
/// pointing at a key we do not own — a new pair is generated,
/// persisted (key record, `"Your Address"` book entry, default-key
/// record) and installed.
///
/// # Errors
/// Anything the wallet load or the persistence of a fresh key surfaces.
pub fn load_wallet(
    env: &Arc<Env>,
    state: &NodeState,
    key_gen: &impl KeyGenerator,
) -> StoreResult<()> {
    let mut wallet_db = WalletStore::open(env, "cr", false)?;
    let default_key = wallet_db.load_wallet(state)?;

    let resolved = {
        let keys = state.lock(&state.keys);
        keys.keys.get(&default_key).cloned()
    };

    if let Some(priv_key) = resolved {
        state.lock(&state.keys).user_key = Some(KeyPair {
            pub_key: default_key,
            priv_key,
        });
        return Ok(());
    }

    // No usable default key; mint one and make it ours.
    key_gen.add_entropy(true);
    let pair = key_gen.make_new_key();

    {
        let mut keys = state.lock(&state.keys);
        keys.keys.insert(pair.pub_key.clone(), pair.priv_key.clone());
        keys.pub_keys
            .insert(hash160(&pair.pub_key), pair.pub_key.clone());
    }

    wallet_db.write_key(&pair.pub_key, &pair.priv_key)?;
    set_address_book_name(
        &mut wallet_db,
        state,
        &pub_key_to_address(&pair.pub_key),
        "Your Address",
    )?;
    wallet_db.write_default_key(&pair.pub_key)?;

    tracing::info!("generated a fresh default wallet key");
    state.lock(&state.keys).user_key = Some(pair);
    Ok(())
}

//---------------------------------------------------------------------------------------------------- open_node
/// Bring the whole storage layer up.
///
/// Creates the (lazily opened) environment, opens every store in
/// read/create mode, runs the loaders, and leaves the wallet with a
/// usable default key. A failed block-index or wallet load is fatal;
/// the caller should not continue without them.
///
/// The periodic flush cadence is the caller's business: invoke
/// [`Env::flush`] on a timer and once more with `shutdown` set when
/// the process winds down.
///
/// # Errors
/// Anything the opens or loaders surface.
pub fn open_node(
    config: Config,
    client_only: bool,
    key_gen: &impl KeyGenerator,
) -> StoreResult<(Arc<Env>, NodeState)> {
    let env = Arc::new(Env::new(config));
    let state = NodeState::new(client_only);

    if !client_only {
        let txdb = TxIndexStore::open(&env, &state, "cr", false)?;
        txdb.load_block_index(&state)?;
    }

    AddressStore::open(&env, "cr+", false)?.load_addresses(&state)?;

    load_wallet(&env, &state, key_gen)?;

    tracing::info!(
        best_height = state.lock(&state.block_index).best_height,
        "storage layer loaded",
    );
    Ok((env, state))
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use ferrate_database::config::ConfigBuilder;

    use crate::{
        crypto::pub_key_to_address,
        tests::{test_config, StubKeyGen},
        store::WalletStore,
    };

    use super::*;

    #[test]
    fn fresh_node_generates_and_persists_a_default_key() {
        let tempdir = tempfile::tempdir().unwrap();
        let key_gen = StubKeyGen::default();

        let (env, state) = open_node(test_config(tempdir.path()), false, &key_gen).unwrap();

        // A key was generated, installed and named.
        let expected = key_gen.last_key().unwrap();
        {
            let keys = state.lock(&state.keys);
            let user_key = keys.user_key.as_ref().unwrap();
            assert_eq!(user_key.pub_key, expected.pub_key);
            assert_eq!(keys.keys.get(&expected.pub_key), Some(&expected.priv_key));
        }
        assert_eq!(
            state
                .lock(&state.wallet)
                .address_book
                .get(&pub_key_to_address(&expected.pub_key))
                .map(String::as_str),
            Some("Your Address"),
        );

        // The default key record round-trips through a bare handle.
        let wallet_db = WalletStore::open(&env, "r", false).unwrap();
        assert_eq!(
            wallet_db.read_default_key().unwrap(),
            Some(expected.pub_key.clone()),
        );

        // All loaders closed their handles again.
        env.flush(true).unwrap();
        assert!(!env.is_open());
    }

    #[test]
    fn second_load_resolves_the_same_key_instead_of_minting() {
        let tempdir = tempfile::tempdir().unwrap();
        let key_gen = StubKeyGen::default();

        let (env, _state) = open_node(test_config(tempdir.path()), false, &key_gen).unwrap();
        let first_key = key_gen.last_key().unwrap();
        env.flush(true).unwrap();
        drop(env);

        // Same directory, fresh process: the key resolves, no new mint.
        let (_env, state) = open_node(test_config(tempdir.path()), false, &key_gen).unwrap();
        assert_eq!(key_gen.minted(), 1);
        assert_eq!(
            state.lock(&state.keys).user_key.as_ref().unwrap().pub_key,
            first_key.pub_key,
        );
    }

    #[test]
    fn client_mode_skips_the_transaction_index() {
        let tempdir = tempfile::tempdir().unwrap();
        let key_gen = StubKeyGen::default();

        let (env, state) = open_node(test_config(tempdir.path()), true, &key_gen).unwrap();
        assert!(state.lock(&state.block_index).is_empty());
        assert_eq!(env.use_count(crate::TX_INDEX_FILE), None);
    }

    #[test]
    fn config_builder_is_what_callers_hand_in() {
        // Not much to test beyond the wiring: the builder's output
        // must be accepted as-is by `open_node`.
        let tempdir = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::new(tempdir.path().to_owned()).build();
        let key_gen = StubKeyGen::default();
        assert!(open_node(config, true, &key_gen).is_ok());
    }
}
