// Guestbook runtime: transaction lifecycle for on-chain guestbooks
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2025 by the Guestbook contributors.
//
// Copyright (C) 2025 Guestbook contributors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

//! User-initiated mutations of guestbook state and their domain validation.

use crate::batch::validate_batch;
use crate::ledger::{CallArg, ContractCall};
use crate::{Address, Amount, ValidationError};

/// Maximal length of a signature message, in characters.
pub const MAX_MESSAGE_LEN: usize = 280;
/// Maximal number of guestbooks signed by a single batch transaction.
pub const MAX_BATCH_SIZE: usize = 10;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub enum OperationKind {
    #[display("sign")]
    Sign,

    #[display("react")]
    React,

    #[display("unreact")]
    Unreact,

    #[display("edit-signature")]
    EditSignature,

    #[display("pin-signature")]
    PinSignature,

    #[display("unpin-signature")]
    UnpinSignature,

    #[display("batch-sign")]
    BatchSign,

    #[display("tip")]
    Tip,

    #[display("sign-with-referral")]
    SignWithReferral,
}

impl OperationKind {
    pub const ALL: [OperationKind; 9] = [
        OperationKind::Sign,
        OperationKind::React,
        OperationKind::Unreact,
        OperationKind::EditSignature,
        OperationKind::PinSignature,
        OperationKind::UnpinSignature,
        OperationKind::BatchSign,
        OperationKind::Tip,
        OperationKind::SignWithReferral,
    ];

    /// Name of the guestbook contract method performing the operation.
    pub fn contract_method(self) -> &'static str {
        match self {
            OperationKind::Sign => "signGuestbook",
            OperationKind::React => "addReaction",
            OperationKind::Unreact => "removeReaction",
            OperationKind::EditSignature => "editSignature",
            OperationKind::PinSignature => "pinSignature",
            OperationKind::UnpinSignature => "unpinSignature",
            OperationKind::BatchSign => "batchSign",
            OperationKind::Tip => "tip",
            OperationKind::SignWithReferral => "signWithReferral",
        }
    }
}

/// Kind-specific fields of an operation.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase", tag = "kind")
)]
pub enum Payload {
    Sign {
        target: Address,
        message: String,
    },
    React {
        owner: Address,
        index: u64,
    },
    Unreact {
        owner: Address,
        index: u64,
    },
    EditSignature {
        owner: Address,
        index: u64,
        message: String,
    },
    PinSignature {
        index: u64,
    },
    UnpinSignature,
    BatchSign {
        targets: Vec<Address>,
        messages: Vec<String>,
    },
    Tip {
        recipient: Address,
        amount: Amount,
    },
    SignWithReferral {
        target: Address,
        message: String,
        referrer: Address,
    },
}

impl Payload {
    pub fn kind(&self) -> OperationKind {
        match self {
            Payload::Sign { .. } => OperationKind::Sign,
            Payload::React { .. } => OperationKind::React,
            Payload::Unreact { .. } => OperationKind::Unreact,
            Payload::EditSignature { .. } => OperationKind::EditSignature,
            Payload::PinSignature { .. } => OperationKind::PinSignature,
            Payload::UnpinSignature => OperationKind::UnpinSignature,
            Payload::BatchSign { .. } => OperationKind::BatchSign,
            Payload::Tip { .. } => OperationKind::Tip,
            Payload::SignWithReferral { .. } => OperationKind::SignWithReferral,
        }
    }

    fn call_args(&self) -> Vec<CallArg> {
        match self {
            Payload::Sign { target, message } => {
                vec![CallArg::Address(*target), CallArg::Text(message.clone())]
            }
            Payload::React { owner, index } | Payload::Unreact { owner, index } => {
                vec![CallArg::Address(*owner), CallArg::Uint(*index as u128)]
            }
            Payload::EditSignature { owner, index, message } => vec![
                CallArg::Address(*owner),
                CallArg::Uint(*index as u128),
                CallArg::Text(message.clone()),
            ],
            Payload::PinSignature { index } => vec![CallArg::Uint(*index as u128)],
            Payload::UnpinSignature => vec![],
            Payload::BatchSign { targets, messages } => vec![
                CallArg::AddressList(targets.clone()),
                CallArg::TextList(messages.clone()),
            ],
            Payload::Tip { recipient, .. } => vec![CallArg::Address(*recipient)],
            Payload::SignWithReferral { target, message, referrer } => vec![
                CallArg::Address(*target),
                CallArg::Text(message.clone()),
                CallArg::Address(*referrer),
            ],
        }
    }
}

/// Limits and fees applied when turning a payload into a submittable operation.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct OperationPolicy {
    pub max_message_len: usize,
    pub max_batch_size: usize,
    pub signature_fee: Amount,
    pub min_tip: Amount,
}

impl Default for OperationPolicy {
    fn default() -> Self {
        OperationPolicy {
            max_message_len: MAX_MESSAGE_LEN,
            max_batch_size: MAX_BATCH_SIZE,
            signature_fee: Amount::ZERO,
            min_tip: Amount::from_units(1),
        }
    }
}

impl OperationPolicy {
    /// Checks a signature message.
    ///
    /// A message consisting of whitespace only counts as empty. The length is measured in
    /// unicode scalar values of the message as it will be submitted, without trimming.
    pub fn validate_message(&self, message: &str) -> Result<(), ValidationError> {
        if message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        let len = message.chars().count();
        if len > self.max_message_len {
            return Err(ValidationError::MessageTooLong(len, self.max_message_len));
        }
        Ok(())
    }

    pub fn validate_tip(&self, amount: Amount) -> Result<(), ValidationError> {
        if amount.is_zero() {
            return Err(ValidationError::NonPositiveTip);
        }
        if amount < self.min_tip {
            return Err(ValidationError::TipTooSmall(amount, self.min_tip));
        }
        Ok(())
    }

    /// Value attached to a batch of `count` signatures.
    pub fn batch_value(&self, count: usize) -> Result<Amount, ValidationError> {
        self.signature_fee
            .checked_mul(count as u128)
            .ok_or(ValidationError::ValueOverflow)
    }
}

/// A validated user operation, ready to be submitted by the account which has validated it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Operation {
    signer: Address,
    payload: Payload,
    required_value: Amount,
}

impl Operation {
    /// Validates `payload` on behalf of `signer`, computing the value the transaction must carry.
    pub fn validate(
        signer: Address,
        payload: Payload,
        policy: &OperationPolicy,
    ) -> Result<Self, ValidationError> {
        let required_value = match &payload {
            Payload::Sign { target, message } => {
                policy.validate_message(message)?;
                if *target == signer {
                    return Err(ValidationError::SelfTarget(signer));
                }
                policy.signature_fee
            }
            Payload::SignWithReferral { target, message, referrer } => {
                policy.validate_message(message)?;
                if *target == signer {
                    return Err(ValidationError::SelfTarget(signer));
                }
                if *referrer == signer || referrer == target {
                    return Err(ValidationError::InvalidReferrer(*referrer));
                }
                policy.signature_fee
            }
            Payload::EditSignature { message, .. } => {
                policy.validate_message(message)?;
                Amount::ZERO
            }
            Payload::BatchSign { targets, messages } => {
                validate_batch(signer, targets, messages, policy)?;
                policy.batch_value(targets.len())?
            }
            Payload::Tip { recipient, amount } => {
                policy.validate_tip(*amount)?;
                if *recipient == signer {
                    return Err(ValidationError::SelfTarget(signer));
                }
                *amount
            }
            Payload::React { .. }
            | Payload::Unreact { .. }
            | Payload::PinSignature { .. }
            | Payload::UnpinSignature => Amount::ZERO,
        };
        Ok(Operation { signer, payload, required_value })
    }

    #[inline]
    pub fn kind(&self) -> OperationKind { self.payload.kind() }
    #[inline]
    pub fn signer(&self) -> Address { self.signer }
    #[inline]
    pub fn payload(&self) -> &Payload { &self.payload }
    #[inline]
    pub fn required_value(&self) -> Amount { self.required_value }

    /// Encodes the operation as a call to the guestbook `contract`.
    pub fn to_call(&self, contract: Address) -> ContractCall {
        ContractCall {
            contract,
            from: Some(self.signer),
            method: self.kind().contract_method().to_owned(),
            args: self.payload.call_args(),
            value: self.required_value,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn signer() -> Address { Address::from([1u8; 20]) }
    fn target() -> Address { Address::from([2u8; 20]) }

    #[test]
    fn kinds_follow_discriminants() {
        for (no, kind) in OperationKind::ALL.into_iter().enumerate() {
            assert_eq!(kind as usize, no);
        }
    }

    #[test]
    fn message_limits() {
        let policy = OperationPolicy::default();
        assert_eq!(policy.validate_message(""), Err(ValidationError::EmptyMessage));
        assert_eq!(policy.validate_message(" \n\t"), Err(ValidationError::EmptyMessage));
        assert_eq!(policy.validate_message(&"a".repeat(280)), Ok(()));
        assert_eq!(
            policy.validate_message(&"a".repeat(281)),
            Err(ValidationError::MessageTooLong(281, 280))
        );
        // multibyte characters count once
        assert_eq!(policy.validate_message(&"ж".repeat(280)), Ok(()));
    }

    #[test]
    fn required_value() {
        let policy = OperationPolicy { signature_fee: Amount::from_units(50), ..Default::default() };
        let op = Operation::validate(
            signer(),
            Payload::Sign { target: target(), message: s!("gm") },
            &policy,
        )
        .unwrap();
        assert_eq!(op.required_value(), Amount::from_units(50));

        let op = Operation::validate(
            signer(),
            Payload::BatchSign {
                targets: vec![target(), Address::from([3u8; 20])],
                messages: vec![s!("one"), s!("two")],
            },
            &policy,
        )
        .unwrap();
        assert_eq!(op.required_value(), Amount::from_units(100));

        let op =
            Operation::validate(signer(), Payload::React { owner: target(), index: 3 }, &policy)
                .unwrap();
        assert_eq!(op.required_value(), Amount::ZERO);
    }

    #[test]
    fn tips() {
        let policy = OperationPolicy::default();
        let tip = |units| {
            Operation::validate(
                signer(),
                Payload::Tip { recipient: target(), amount: Amount::from_units(units) },
                &policy,
            )
        };
        assert_eq!(tip(0).unwrap_err(), ValidationError::NonPositiveTip);
        assert_eq!(tip(1).unwrap().required_value(), Amount::from_units(1));
    }

    #[test]
    fn self_targeting() {
        let policy = OperationPolicy::default();
        assert_eq!(
            Operation::validate(
                signer(),
                Payload::Sign { target: signer(), message: s!("me") },
                &policy
            ),
            Err(ValidationError::SelfTarget(signer()))
        );
        assert_eq!(
            Operation::validate(
                signer(),
                Payload::SignWithReferral {
                    target: target(),
                    message: s!("hi"),
                    referrer: target()
                },
                &policy
            ),
            Err(ValidationError::InvalidReferrer(target()))
        );
    }

    #[test]
    fn call_encoding() {
        let op = Operation::validate(
            signer(),
            Payload::EditSignature { owner: target(), index: 4, message: s!("edited") },
            &OperationPolicy::default(),
        )
        .unwrap();
        let contract = Address::from([9u8; 20]);
        let call = op.to_call(contract);
        assert_eq!(call.contract, contract);
        assert_eq!(call.from, Some(signer()));
        assert_eq!(call.method, "editSignature");
        assert_eq!(call.args, vec![
            CallArg::Address(target()),
            CallArg::Uint(4),
            CallArg::Text(s!("edited"))
        ]);
        assert_eq!(call.value, Amount::ZERO);
    }
}
