// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::rpc::PayByContractRequest;
use super::{Error, RevisionError};
use crypto::{Hash256, Keypair};
use types::{
    ContractOutput, CoveredFields, Currency, FileContractRevision, Transaction,
    TransactionSignature,
};

/// Creates a copy of the recent revision decorated with the revision
/// number and output values the renter proposed. Unlock hashes are
/// preserved element-wise; file size and Merkle root stay the caller's
/// to overwrite when a program commit accompanies the payment.
pub fn revision_from_request(
    current: &FileContractRevision,
    request: &PayByContractRequest,
) -> FileContractRevision {
    let mut revision = current.clone();
    revision.revision_number = request.new_revision_number;

    revision.valid_proof_outputs = request
        .new_valid_values
        .iter()
        .zip(&current.valid_proof_outputs)
        .map(|(value, output)| ContractOutput {
            value: value.clone(),
            unlock_hash: output.unlock_hash,
        })
        .collect();

    revision.missed_proof_outputs = request
        .new_missed_values
        .iter()
        .zip(&current.missed_proof_outputs)
        .map(|(value, output)| ContractOutput {
            value: value.clone(),
            unlock_hash: output.unlock_hash,
        })
        .collect();

    // A value-count mismatch leaves the vectors short; verification
    // rejects the revision rather than guessing recipients.
    if request.new_valid_values.len() != current.valid_proof_outputs.len()
        || request.new_missed_values.len() != current.missed_proof_outputs.len()
    {
        revision.valid_proof_outputs.truncate(0);
        revision.missed_proof_outputs.truncate(0);
    }

    revision
}

/// The renter's signature over the proposed revision, shaped for the
/// obligation's transaction set. Renter key index 0.
pub fn signature_from_request(
    current: &FileContractRevision,
    request: &PayByContractRequest,
) -> TransactionSignature {
    TransactionSignature {
        parent_id: current.parent_id.0,
        public_key_index: 0,
        covered_fields: CoveredFields::first_revision(),
        signature: request.signature,
    }
}

/// Verifies a proposed payment revision against the current one and
/// returns `(amount, collateral)`: the value moved to the host's valid
/// payout and the collateral moved from the host's missed payout to the
/// void. `post_state` is the committed `(filesize, merkle root)` the
/// revision must carry when it accompanies a program commit; `None`
/// requires the data fields to be untouched.
pub fn verify_payment_revision(
    current: &FileContractRevision,
    payment: &FileContractRevision,
    block_height: u64,
    expected_exchange: &Currency,
    post_state: Option<(u64, Hash256)>,
) -> Result<(Currency, Currency), RevisionError> {
    if block_height > current.window_end {
        return Err(RevisionError::ContractExpired);
    }
    if payment.revision_number <= current.revision_number {
        return Err(RevisionError::BadRevisionNumber {
            current: current.revision_number,
            new: payment.revision_number,
        });
    }

    let (want_size, want_root) = match post_state {
        Some((size, root)) => (size, root),
        None => (current.filesize, current.file_merkle_root),
    };
    if payment.filesize != want_size || payment.file_merkle_root != want_root {
        return Err(RevisionError::DataFieldsChanged);
    }

    if payment.valid_proof_outputs.len() != current.valid_proof_outputs.len()
        || payment.missed_proof_outputs.len() != current.missed_proof_outputs.len()
    {
        return Err(RevisionError::OutputCountMismatch);
    }
    let unchanged_recipients = payment
        .valid_proof_outputs
        .iter()
        .zip(&current.valid_proof_outputs)
        .chain(payment.missed_proof_outputs.iter().zip(&current.missed_proof_outputs))
        .all(|(new, old)| new.unlock_hash == old.unlock_hash);
    if !unchanged_recipients {
        return Err(RevisionError::RecipientChanged);
    }

    // The renter's valid payout funds the payment.
    let amount = current
        .valid_renter_payout()?
        .checked_sub(&payment.valid_renter_payout()?)
        .ok_or(RevisionError::RenterNotDebited)?;
    let host_credit = payment
        .valid_host_payout()?
        .checked_sub(&current.valid_host_payout()?)
        .ok_or(RevisionError::PayoutUnderflow)?;
    if host_credit != amount {
        return Err(RevisionError::HostNotCredited);
    }
    if amount < *expected_exchange {
        return Err(RevisionError::InsufficientPayment {
            expected: expected_exchange.to_string(),
            actual: amount.to_string(),
        });
    }

    // Collateral leaves the host's missed payout and lands in the void,
    // exactly and only there.
    let collateral = current
        .missed_host_output()?
        .value
        .checked_sub(&payment.missed_host_output()?.value)
        .ok_or(RevisionError::CollateralMismatch)?;
    let void_gain = payment
        .missed_void_output()?
        .value
        .checked_sub(&current.missed_void_output()?.value)
        .ok_or(RevisionError::PayoutUnderflow)?;
    if void_gain != collateral {
        return Err(RevisionError::CollateralMismatch);
    }
    if payment.missed_renter_output()?.value != current.missed_renter_output()?.value {
        return Err(RevisionError::MissedRenterChanged);
    }

    Ok((amount, collateral))
}

/// Verifies the renter's signature over the revision, co-signs with the
/// host key, and returns the two-signature transaction for the
/// obligation's transaction set.
pub fn create_revision_signature(
    revision: FileContractRevision,
    renter_signature: TransactionSignature,
    host_key: &Keypair,
) -> Result<Transaction, Error> {
    let mut txn = Transaction {
        file_contract_revisions: vec![revision],
        signatures: vec![
            renter_signature,
            TransactionSignature {
                parent_id: Hash256::ZERO,
                public_key_index: 1,
                covered_fields: CoveredFields::first_revision(),
                signature: crypto::Signature::default(),
            },
        ],
    };
    txn.signatures[1].parent_id = txn.file_contract_revisions[0].parent_id.0;

    let revision = &txn.file_contract_revisions[0];
    let renter_key = revision
        .unlock_conditions
        .renter_key()
        .copied()
        .ok_or_else(|| Error::Types(types::Error::MissingOutput("renter key")))?;
    let renter_hash = txn.sig_hash(0)?;
    renter_key
        .verify(&renter_hash, &txn.signatures[0].signature)
        .map_err(Error::BadRenterSignature)?;

    let host_hash = txn.sig_hash(1)?;
    txn.signatures[1].signature = host_key.sign(&host_hash);
    Ok(txn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{ContractId, UnlockHash};

    fn output(value: u64, tag: &[u8]) -> ContractOutput {
        ContractOutput {
            value: Currency::from(value),
            unlock_hash: UnlockHash(crypto::blake2b_256(tag)),
        }
    }

    fn current() -> FileContractRevision {
        FileContractRevision {
            parent_id: ContractId(crypto::blake2b_256(b"fc")),
            revision_number: 7,
            window_start: 1_000,
            window_end: 2_000,
            valid_proof_outputs: vec![output(2_000, b"renter"), output(1_000, b"host")],
            missed_proof_outputs: vec![
                output(2_000, b"renter"),
                output(500, b"host"),
                output(100, b"void"),
            ],
            ..Default::default()
        }
    }

    fn payment_request(
        rev: u64,
        valid: [u64; 2],
        missed: [u64; 3],
    ) -> PayByContractRequest {
        PayByContractRequest {
            contract_id: ContractId(crypto::blake2b_256(b"fc")),
            new_revision_number: rev,
            new_valid_values: valid.iter().map(|&v| Currency::from(v)).collect(),
            new_missed_values: missed.iter().map(|&v| Currency::from(v)).collect(),
            signature: Default::default(),
        }
    }

    #[test]
    fn accepts_payment_with_collateral() {
        // 500 moves renter to host; 200 of collateral moves host to void.
        let cur = current();
        let req = payment_request(8, [1_500, 1_500], [2_000, 300, 300]);
        let payment = revision_from_request(&cur, &req);
        let (amount, collateral) =
            verify_payment_revision(&cur, &payment, 1_500, &Currency::zero(), None).unwrap();
        assert_eq!(amount, Currency::from(500u64));
        assert_eq!(collateral, Currency::from(200u64));
    }

    #[test]
    fn rejects_stale_revision_number() {
        let cur = current();
        let req = payment_request(7, [1_500, 1_500], [2_000, 300, 300]);
        let payment = revision_from_request(&cur, &req);
        assert_eq!(
            verify_payment_revision(&cur, &payment, 1_500, &Currency::zero(), None),
            Err(RevisionError::BadRevisionNumber { current: 7, new: 7 })
        );
    }

    #[test]
    fn rejects_expired_contract() {
        let cur = current();
        let req = payment_request(8, [1_500, 1_500], [2_000, 300, 300]);
        let payment = revision_from_request(&cur, &req);
        assert_eq!(
            verify_payment_revision(&cur, &payment, 2_001, &Currency::zero(), None),
            Err(RevisionError::ContractExpired)
        );
    }

    #[test]
    fn rejects_output_count_mismatch() {
        let cur = current();
        let req = payment_request(8, [1_500, 1_500], [2_000, 300, 300]);
        let mut payment = revision_from_request(&cur, &req);
        payment.missed_proof_outputs.pop();
        assert_eq!(
            verify_payment_revision(&cur, &payment, 1_500, &Currency::zero(), None),
            Err(RevisionError::OutputCountMismatch)
        );
    }

    #[test]
    fn rejects_recipient_change() {
        let cur = current();
        let req = payment_request(8, [1_500, 1_500], [2_000, 300, 300]);
        let mut payment = revision_from_request(&cur, &req);
        payment.valid_proof_outputs[1].unlock_hash = UnlockHash(crypto::blake2b_256(b"thief"));
        assert_eq!(
            verify_payment_revision(&cur, &payment, 1_500, &Currency::zero(), None),
            Err(RevisionError::RecipientChanged)
        );
    }

    #[test]
    fn rejects_unbalanced_transfer() {
        let cur = current();
        // Renter gives up 500 but host only gains 400.
        let req = payment_request(8, [1_500, 1_400], [2_000, 300, 300]);
        let payment = revision_from_request(&cur, &req);
        assert_eq!(
            verify_payment_revision(&cur, &payment, 1_500, &Currency::zero(), None),
            Err(RevisionError::HostNotCredited)
        );
    }

    #[test]
    fn rejects_collateral_skimming() {
        let cur = current();
        // Host missed drops by 200 but the void only gains 100.
        let req = payment_request(8, [1_500, 1_500], [2_000, 300, 200]);
        let payment = revision_from_request(&cur, &req);
        assert_eq!(
            verify_payment_revision(&cur, &payment, 1_500, &Currency::zero(), None),
            Err(RevisionError::CollateralMismatch)
        );
    }

    #[test]
    fn rejects_missed_renter_change() {
        let cur = current();
        let req = payment_request(8, [1_500, 1_500], [1_999, 300, 300]);
        let payment = revision_from_request(&cur, &req);
        assert_eq!(
            verify_payment_revision(&cur, &payment, 1_500, &Currency::zero(), None),
            Err(RevisionError::MissedRenterChanged)
        );
    }

    #[test]
    fn rejects_renter_payout_increase() {
        let cur = current();
        let req = payment_request(8, [2_100, 1_000], [2_000, 500, 100]);
        let payment = revision_from_request(&cur, &req);
        assert_eq!(
            verify_payment_revision(&cur, &payment, 1_500, &Currency::zero(), None),
            Err(RevisionError::RenterNotDebited)
        );
    }

    #[test]
    fn rejects_underpayment() {
        let cur = current();
        let req = payment_request(8, [1_900, 1_100], [2_000, 500, 100]);
        let payment = revision_from_request(&cur, &req);
        assert!(matches!(
            verify_payment_revision(&cur, &payment, 1_500, &Currency::from(200u64), None),
            Err(RevisionError::InsufficientPayment { .. })
        ));
    }

    #[test]
    fn rejects_data_field_change_on_pure_payment() {
        let cur = current();
        let req = payment_request(8, [1_500, 1_500], [2_000, 300, 300]);
        let mut payment = revision_from_request(&cur, &req);
        payment.file_merkle_root = crypto::blake2b_256(b"sneaky");
        assert_eq!(
            verify_payment_revision(&cur, &payment, 1_500, &Currency::zero(), None),
            Err(RevisionError::DataFieldsChanged)
        );
        // The same change is fine when it is the committed post-state.
        payment.filesize = 0;
        let ok = verify_payment_revision(
            &cur,
            &payment,
            1_500,
            &Currency::zero(),
            Some((0, crypto::blake2b_256(b"sneaky"))),
        );
        assert!(ok.is_ok());
    }
}
