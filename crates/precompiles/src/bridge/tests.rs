//! Unit tests for the Bridge contract

use super::*;
use crate::{
    checkpoint::{BRIDGE_NAMESPACE, GOVERNANCE_NAMESPACE},
    merkle::MerkleTree,
    storage::hashmap::HashMapStorageProvider,
    test_util::{TOKEN_CAP, TestEnv, TestValidators, USER_FUNDS, VAULT_FUNDS},
};
use alloy::{primitives::uint, sol_types::SolEvent};

const VERSION: U256 = uint!(1_U256);

fn rotation(
    current: &TestValidators,
    new: &TestValidators,
    current_nonce: u64,
) -> eyre::Result<IBridge::updateValidatorSetCall> {
    let new_nonce = U256::from(current_nonce + 1);
    let new_hash = new.checkpoint(VERSION, BRIDGE_NAMESPACE, new_nonce);
    Ok(IBridge::updateValidatorSetCall {
        currentValidatorSetArgs: current.args(U256::from(current_nonce)),
        newValidatorSetArgs: new.args(new_nonce),
        signatures: current.sign(new_hash)?,
    })
}

fn erc_transfers(env: &TestEnv, count: usize) -> Vec<IBridge::Erc20Transfer> {
    (0..count)
        .map(|i| IBridge::Erc20Transfer {
            from: env.tokens[i % 2],
            to: Address::random(),
            amount: U256::from(100 * (i + 1)),
            feeFrom: env.tokens[0],
            fee: if i == 0 { U256::from(5) } else { U256::ZERO },
        })
        .collect()
}

/// Signed batch disclosing the transfers at `disclosed`.
fn merkle_batch(
    env: &TestEnv,
    transfers: &[IBridge::Erc20Transfer],
    disclosed: &[usize],
    batch_nonce: U256,
) -> eyre::Result<IBridge::transferToERCCall> {
    let leaves: Vec<B256> = transfers
        .iter()
        .map(|transfer| transfer_leaf(1, transfer, batch_nonce))
        .collect();
    let tree = MerkleTree::new(&leaves)?;
    let proof = tree.multi_proof(disclosed)?;

    Ok(IBridge::transferToERCCall {
        validatorSetArgs: env.bridge_validators.args(U256::ZERO),
        signatures: env.bridge_validators.sign(tree.root())?,
        transfers: proof
            .leaf_indices
            .iter()
            .map(|i| transfers[*i].clone())
            .collect(),
        poolRoot: tree.root(),
        proof: proof.proof,
        proofFlags: proof.proof_flags,
        batchNonce: batch_nonce,
    })
}

fn approve_bridge(env: &mut TestEnv, token: Address) -> eyre::Result<()> {
    let (user, bridge) = (env.user, env.bridge);
    env.token(token).approve(
        user,
        IToken::approveCall {
            spender: bridge,
            amount: U256::MAX,
        },
    )?;
    Ok(())
}

#[test]
fn test_initialize_validates_the_set() -> eyre::Result<()> {
    let mut storage = HashMapStorageProvider::new(1);
    let validators = TestValidators::equal(3);
    let init = BridgeInit {
        version: VERSION,
        validators: validators.addresses(),
        powers: validators.powers.clone(),
        hub: Address::random(),
        ..Default::default()
    };
    let mut bridge = Bridge::new(Address::random(), &mut storage);

    let mut ragged = init.clone();
    ragged.powers.pop();
    assert_eq!(
        bridge.initialize(ragged),
        Err(BridgeError::mismatch_array_length().into())
    );

    let mut whitelist = init.clone();
    whitelist.tokens = vec![Address::random()];
    assert_eq!(
        bridge.initialize(whitelist),
        Err(BridgeError::invalid_token_whitelist().into())
    );

    let mut wide = init.clone();
    wide.version = U256::from(256);
    assert_eq!(
        bridge.initialize(wide),
        Err(BridgeError::invalid_version().into())
    );

    let mut weak = init.clone();
    weak.powers[0] -= U256::from(11);
    assert_eq!(
        bridge.initialize(weak),
        Err(BridgeError::invalid_voting_power_threshold().into())
    );

    // within the tolerance
    let mut rounded = init.clone();
    rounded.powers[0] -= U256::from(10);
    bridge.initialize(rounded)?;
    assert_eq!(
        bridge.initialize(init),
        Err(BridgeError::already_initialized().into())
    );
    Ok(())
}

#[test]
fn test_initial_checkpoints() -> eyre::Result<()> {
    let mut storage = HashMapStorageProvider::new(1);
    let current = TestValidators::equal(4);
    let next = TestValidators::equal(5);
    let token = Address::random();

    let mut bridge = Bridge::new(Address::random(), &mut storage);
    bridge.initialize(BridgeInit {
        version: VERSION,
        validators: current.addresses(),
        powers: current.powers.clone(),
        next_validator_set: Some((next.addresses(), next.powers.clone())),
        tokens: vec![token],
        token_caps: vec![U256::from(42)],
        hub: Address::random(),
    })?;

    assert_eq!(
        bridge.current_validator_set_hash()?,
        current.checkpoint(VERSION, BRIDGE_NAMESPACE, U256::ZERO)
    );
    assert_eq!(
        bridge.next_validator_set_hash()?,
        next.checkpoint(VERSION, BRIDGE_NAMESPACE, U256::from(1))
    );
    assert_eq!(bridge.validator_set_nonce()?, U256::ZERO);
    assert_eq!(bridge.token_whitelist_amount(token)?, U256::from(42));
    assert_eq!(bridge.token_whitelist_amount(Address::random())?, U256::ZERO);
    Ok(())
}

#[test]
fn test_authorize() -> eyre::Result<()> {
    let mut env = TestEnv::new()?;
    let message = B256::random();
    let args = env.bridge_validators.args(U256::ZERO);
    let mut signatures = env.bridge_validators.sign(message)?;

    let call = |args: ValidatorSetArgs, signatures: Vec<Signature>| IBridge::authorizeCall {
        validatorSetArgs: args,
        signatures,
        messageHash: message,
    };

    assert!(env.bridge_contract().authorize(call(args.clone(), signatures.clone()))?);

    // one corrupted signature fails the whole set, even with 90% of the power left
    signatures[0].v = 29;
    assert!(!env.bridge_contract().authorize(call(args.clone(), signatures.clone()))?);

    // leaving that position unsigned instead is fine
    signatures[0] = Signature::default();
    assert!(env.bridge_contract().authorize(call(args.clone(), signatures.clone()))?);

    // a signature over another message carries no power
    let other = env.bridge_validators.sign(B256::random())?;
    signatures[1..4].clone_from_slice(&other[1..4]);
    assert!(!env.bridge_contract().authorize(call(args.clone(), signatures.clone()))?);

    assert_eq!(
        env.bridge_contract()
            .authorize(call(args.clone(), signatures[..9].to_vec())),
        Err(BridgeError::mismatch_array_length().into())
    );

    let mut stale = args;
    stale.nonce = U256::from(1);
    assert_eq!(
        env.bridge_contract().authorize(call(stale, signatures)),
        Err(BridgeError::invalid_validator_set_hash().into())
    );
    Ok(())
}

#[test]
fn test_rotate_ten_validators_to_twelve() -> eyre::Result<()> {
    let mut env = TestEnv::new()?;
    let next = TestValidators::equal(12);
    let call = rotation(&env.bridge_validators, &next, 0)?;

    env.bridge_contract().update_validator_set(call.clone())?;

    let mut bridge = env.bridge_contract();
    assert_eq!(bridge.validator_set_nonce()?, U256::from(1));
    assert_eq!(
        bridge.current_validator_set_hash()?,
        next.checkpoint(VERSION, BRIDGE_NAMESPACE, U256::from(1))
    );

    let log = env.storage.events(env.bridge).last().cloned().expect("rotation event");
    let event = IBridge::ValidatorSetUpdate::decode_log_data(&log)?;
    assert_eq!(event.validatorSetNonce, U256::from(1));

    // the outgoing set no longer matches the checkpoint
    assert_eq!(
        env.bridge_contract().update_validator_set(call),
        Err(BridgeError::invalid_validator_set_hash().into())
    );

    // the new set signs the next rotation
    let again = TestValidators::equal(7);
    env.bridge_contract()
        .update_validator_set(rotation(&next, &again, 1)?)?;
    assert_eq!(env.bridge_contract().validator_set_nonce()?, U256::from(2));
    Ok(())
}

#[test]
fn test_rotation_rejections() -> eyre::Result<()> {
    let mut env = TestEnv::new()?;
    let next = TestValidators::equal(12);
    let valid = rotation(&env.bridge_validators, &next, 0)?;

    let mut skipped_nonce = valid.clone();
    skipped_nonce.newValidatorSetArgs.nonce = U256::from(2);
    assert_eq!(
        env.bridge_contract().update_validator_set(skipped_nonce),
        Err(BridgeError::invalid_validator_set_nonce().into())
    );

    let mut ragged = valid.clone();
    ragged.newValidatorSetArgs.powers.pop();
    assert_eq!(
        env.bridge_contract().update_validator_set(ragged),
        Err(BridgeError::mismatch_array_length().into())
    );

    let mut weak = valid.clone();
    weak.newValidatorSetArgs.powers[0] = U256::from(1);
    assert_eq!(
        env.bridge_contract().update_validator_set(weak),
        Err(BridgeError::not_enough_voting_power().into())
    );

    let new_hash = next.checkpoint(VERSION, BRIDGE_NAMESPACE, U256::from(1));
    let mut minority = valid.clone();
    minority.signatures = env.bridge_validators.sign_subset(new_hash, 6)?;
    assert_eq!(
        env.bridge_contract().update_validator_set(minority),
        Err(BridgeError::not_enough_voting_power().into())
    );

    let mut copied = valid.clone();
    copied.signatures[5] = copied.signatures[0].clone();
    assert_eq!(
        env.bridge_contract().update_validator_set(copied),
        Err(BridgeError::invalid_validator_set_signature().into())
    );

    // a checkpoint signed in the governance namespace does not rotate the bridge
    let mut wrong_namespace = valid;
    wrong_namespace.signatures = env.bridge_validators.sign(next.checkpoint(
        VERSION,
        GOVERNANCE_NAMESPACE,
        U256::from(1),
    ))?;
    assert_eq!(
        env.bridge_contract().update_validator_set(wrong_namespace),
        Err(BridgeError::invalid_validator_set_signature().into())
    );

    assert_eq!(env.bridge_contract().validator_set_nonce()?, U256::ZERO);
    Ok(())
}

#[test]
fn test_rotation_follows_staged_set() -> eyre::Result<()> {
    let mut env = TestEnv::new()?;
    let staged = TestValidators::equal(12);
    let governance = env.governance;

    env.bridge_contract().update_next_validator_set_hash(
        governance,
        IBridge::updateNextValidatorSetHashCall {
            nextValidatorSetHash: staged.checkpoint(VERSION, BRIDGE_NAMESPACE, U256::from(1)),
        },
    )?;

    let other = rotation(&env.bridge_validators, &TestValidators::equal(12), 0)?;
    assert_eq!(
        env.bridge_contract().update_validator_set(other),
        Err(BridgeError::invalid_next_validator_set_hash().into())
    );

    let call = rotation(&env.bridge_validators, &staged, 0)?;
    env.bridge_contract().update_validator_set(call)?;
    assert_eq!(env.bridge_contract().next_validator_set_hash()?, B256::ZERO);
    Ok(())
}

#[test]
fn test_transfer_to_erc_pays_disclosed_transfers() -> eyre::Result<()> {
    let mut env = TestEnv::new()?;
    let relayer = Address::random();
    let transfers = erc_transfers(&env, 4);
    let call = merkle_batch(&env, &transfers, &[0, 2], U256::from(1))?;

    env.bridge_contract().transfer_to_erc(relayer, call.clone())?;

    let token = env.tokens[0];
    assert_eq!(env.balance_of(token, transfers[0].to)?, U256::from(100));
    assert_eq!(env.balance_of(token, transfers[2].to)?, U256::from(300));
    assert_eq!(env.balance_of(env.tokens[1], transfers[1].to)?, U256::ZERO);
    assert_eq!(env.balance_of(token, relayer)?, U256::from(5));
    let vault = env.vault;
    assert_eq!(
        env.balance_of(token, vault)?,
        U256::from(VAULT_FUNDS - 100 - 300 - 5)
    );
    assert_eq!(env.bridge_contract().batch_nonce()?, U256::from(1));

    let log = env.storage.events(env.bridge).last().cloned().expect("settlement event");
    let event = IBridge::TransferToERC::decode_log_data(&log)?;
    assert_eq!(event.nonce, U256::from(1));
    assert_eq!(event.transfers, call.transfers);

    // replaying the batch reuses its nonce
    assert_eq!(
        env.bridge_contract().transfer_to_erc(relayer, call),
        Err(BridgeError::invalid_batch_nonce().into())
    );
    Ok(())
}

#[test]
fn test_transfer_to_erc_rejections() -> eyre::Result<()> {
    let mut env = TestEnv::new()?;
    let relayer = Address::random();
    let transfers = erc_transfers(&env, 3);
    let valid = merkle_batch(&env, &transfers, &[1], U256::from(1))?;

    let mut altered = valid.clone();
    altered.transfers[0].amount += U256::from(1);
    assert_eq!(
        env.bridge_contract().transfer_to_erc(relayer, altered),
        Err(BridgeError::invalid_transfers_proof().into())
    );

    let mut minority = valid.clone();
    minority.signatures = env.bridge_validators.sign_subset(valid.poolRoot, 6)?;
    assert_eq!(
        env.bridge_contract().transfer_to_erc(relayer, minority),
        Err(BridgeError::not_enough_voting_power().into())
    );

    let mut corrupted = valid.clone();
    corrupted.signatures[3].s = B256::repeat_byte(0x11);
    assert_eq!(
        env.bridge_contract().transfer_to_erc(relayer, corrupted),
        Err(BridgeError::invalid_validator_set_signature().into())
    );

    let mut empty = valid.clone();
    empty.transfers.clear();
    assert_eq!(
        env.bridge_contract().transfer_to_erc(relayer, empty),
        Err(BridgeError::invalid_batch().into())
    );

    let mut future = valid.clone();
    future.batchNonce = U256::from(2);
    assert_eq!(
        env.bridge_contract().transfer_to_erc(relayer, future),
        Err(BridgeError::invalid_batch_nonce().into())
    );

    assert_eq!(env.bridge_contract().batch_nonce()?, U256::ZERO);
    env.bridge_contract().transfer_to_erc(relayer, valid)?;
    Ok(())
}

#[test]
fn test_batch_transfer_to_erc() -> eyre::Result<()> {
    let mut env = TestEnv::new()?;
    let froms = vec![env.tokens[0], env.tokens[1]];
    let tos = vec![Address::random(), Address::random()];
    let amounts = vec![U256::from(10), U256::from(20)];
    let current_hash = env.deployment.bridge_validator_set_hash;
    let message = batch_transfer_message(1, &froms, &tos, &amounts, U256::from(1), current_hash);

    let call = IBridge::batchTransferToERCCall {
        validatorSetArgs: env.bridge_validators.args(U256::ZERO),
        signatures: env.bridge_validators.sign(message)?,
        froms: froms.clone(),
        tos: tos.clone(),
        amounts: amounts.clone(),
        batchNonce: U256::from(1),
    };

    let mut ragged = call.clone();
    ragged.amounts.pop();
    assert_eq!(
        env.bridge_contract().batch_transfer_to_erc(ragged),
        Err(BridgeError::invalid_batch().into())
    );

    let mut redirected = call.clone();
    redirected.tos[1] = Address::random();
    assert_eq!(
        env.bridge_contract().batch_transfer_to_erc(redirected),
        Err(BridgeError::invalid_validator_set_signature().into())
    );

    let mut copied = call.clone();
    copied.signatures[9] = copied.signatures[8].clone();
    assert_eq!(
        env.bridge_contract().batch_transfer_to_erc(copied),
        Err(BridgeError::invalid_validator_set_signature().into())
    );

    let mut minority = call.clone();
    minority.signatures = env.bridge_validators.sign_subset(message, 6)?;
    assert_eq!(
        env.bridge_contract().batch_transfer_to_erc(minority),
        Err(BridgeError::not_enough_voting_power().into())
    );

    env.bridge_contract().batch_transfer_to_erc(call.clone())?;
    assert_eq!(env.balance_of(froms[0], tos[0])?, amounts[0]);
    assert_eq!(env.balance_of(froms[1], tos[1])?, amounts[1]);

    assert_eq!(
        env.bridge_contract().batch_transfer_to_erc(call),
        Err(BridgeError::invalid_batch_nonce().into())
    );
    Ok(())
}

#[test]
fn test_transfer_to_namada_skips_tokens_off_the_whitelist() -> eyre::Result<()> {
    let mut env = TestEnv::new()?;
    let whitelisted = env.tokens[0];
    let unlisted = Address::random();
    let user = env.user;
    env.token(unlisted)
        .initialize(&[user], &[U256::from(USER_FUNDS)])?;
    approve_bridge(&mut env, whitelisted)?;
    approve_bridge(&mut env, unlisted)?;

    let transfers = vec![
        IBridge::NamadaTransfer {
            from: whitelisted,
            to: "tnam1qxfj3sf6a0meahdu9t6znp05g8zx4dkjtgyn9gfu".to_string(),
            amount: U256::from(250),
        },
        IBridge::NamadaTransfer {
            from: unlisted,
            to: "tnam1qxfj3sf6a0meahdu9t6znp05g8zx4dkjtgyn9gfu".to_string(),
            amount: U256::from(250),
        },
    ];
    env.bridge_contract().transfer_to_namada(
        user,
        IBridge::transferToNamadaCall {
            transfers: transfers.clone(),
            confirmations: U256::from(100),
        },
    )?;

    let vault = env.vault;
    assert_eq!(env.balance_of(whitelisted, vault)?, U256::from(VAULT_FUNDS + 250));
    assert_eq!(env.balance_of(whitelisted, user)?, U256::from(USER_FUNDS - 250));
    assert_eq!(env.balance_of(unlisted, user)?, U256::from(USER_FUNDS));
    assert_eq!(
        env.bridge_contract().token_whitelist_amount(whitelisted)?,
        U256::from(TOKEN_CAP - 250)
    );

    let log = env.storage.events(env.bridge).last().cloned().expect("transfer event");
    let event = IBridge::TransferToNamada::decode_log_data(&log)?;
    assert_eq!(event.nonce, U256::from(1));
    assert_eq!(event.transfers, transfers[..1].to_vec());
    assert_eq!(event.confirmations, U256::from(100));
    Ok(())
}

#[test]
fn test_transfer_to_namada_skip_reasons() -> eyre::Result<()> {
    let mut env = TestEnv::new()?;
    let (approved, unapproved) = (env.tokens[0], env.tokens[1]);
    let user = env.user;
    approve_bridge(&mut env, approved)?;

    let transfer = |from, amount: u64| IBridge::NamadaTransfer {
        from,
        to: "tnam1q9gr66cvu4hrzm0sd5kmlnjje82gs3xlfg3v6nu7".to_string(),
        amount: U256::from(amount),
    };
    let call = IBridge::transferToNamadaCall {
        transfers: vec![
            // over the cap
            transfer(approved, TOKEN_CAP + 1),
            // over the balance
            transfer(approved, USER_FUNDS + 1),
            // no allowance
            transfer(unapproved, 10),
            transfer(approved, 0),
        ],
        confirmations: U256::from(1),
    };
    let events_before = env.storage.events(env.bridge).len();
    env.bridge_contract().transfer_to_namada(user, call)?;

    // nothing was accepted, so no cap was consumed and no event was emitted
    assert_eq!(env.storage.events(env.bridge).len(), events_before);
    let mut bridge = env.bridge_contract();
    assert_eq!(bridge.transfer_to_namada_nonce()?, U256::ZERO);
    assert_eq!(bridge.token_whitelist_amount(approved)?, U256::from(TOKEN_CAP));
    assert_eq!(bridge.token_whitelist_amount(unapproved)?, U256::from(TOKEN_CAP));

    assert_eq!(
        env.bridge_contract().transfer_to_namada(
            user,
            IBridge::transferToNamadaCall {
                transfers: vec![],
                confirmations: U256::from(1),
            }
        ),
        Err(BridgeError::invalid_batch().into())
    );
    Ok(())
}

#[test]
fn test_governance_hooks() -> eyre::Result<()> {
    let mut env = TestEnv::new()?;
    let (governance, stranger) = (env.governance, Address::random());
    let token = env.tokens[0];
    let new_token = Address::random();

    let whitelist = IBridge::updateTokenWhitelistCall {
        tokens: vec![token, new_token],
        tokensCap: vec![U256::ZERO, U256::from(7)],
    };
    assert_eq!(
        env.bridge_contract()
            .update_token_whitelist(stranger, whitelist.clone()),
        Err(BridgeError::invalid_caller().into())
    );
    let mut ragged = whitelist.clone();
    ragged.tokensCap.pop();
    assert_eq!(
        env.bridge_contract().update_token_whitelist(governance, ragged),
        Err(BridgeError::invalid_token_whitelist().into())
    );
    env.bridge_contract()
        .update_token_whitelist(governance, whitelist)?;
    assert_eq!(env.bridge_contract().token_whitelist_amount(token)?, U256::ZERO);
    assert_eq!(
        env.bridge_contract().token_whitelist_amount(new_token)?,
        U256::from(7)
    );

    // balances sent to the bridge itself are swept by governance
    let (user, bridge) = (env.user, env.bridge);
    env.token(token).transfer(
        user,
        IToken::transferCall {
            to: bridge,
            amount: U256::from(50),
        },
    )?;
    let recipient = Address::random();
    let withdraw = IBridge::withdrawCall {
        tokens: vec![token],
        to: recipient,
    };
    assert_eq!(
        env.bridge_contract().withdraw(stranger, withdraw.clone()),
        Err(BridgeError::invalid_caller().into())
    );
    env.bridge_contract().withdraw(governance, withdraw)?;
    assert_eq!(env.balance_of(token, recipient)?, U256::from(50));
    assert_eq!(env.balance_of(token, bridge)?, U256::ZERO);
    Ok(())
}
