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

mod utils;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use guestbook::{
    CancelToken, ContractCall, LedgerClient, LedgerError, LifecycleConfig, Mining, OperationError,
    OperationKind, SandboxLedger, SubmitOptions, TransactionRecord, TxController, TxStatus,
};

use crate::utils::runtime::{wait_status, TestGuestbook};
use crate::utils::{alice, bob, Recorder};

fn call() -> ContractCall {
    ContractCall {
        contract: utils::account(0x99),
        from: Some(alice()),
        method: s("signGuestbook"),
        args: vec![],
        value: 0u128.into(),
    }
}

fn s(val: &str) -> String { val.to_owned() }

fn controller(ledger: &SandboxLedger, config: LifecycleConfig) -> TxController {
    TxController::new(Arc::new(ledger.clone()), config)
}

fn spawn_submit(
    controller: &TxController,
    ledger: &SandboxLedger,
    opts: SubmitOptions,
) -> tokio::task::JoinHandle<Result<guestbook::Receipt, OperationError>> {
    let controller = controller.clone();
    let ledger = ledger.clone();
    tokio::spawn(async move {
        controller
            .submit_with(opts, move || async move { ledger.submit(&call()).await })
            .await
    })
}

#[tokio::test]
async fn transitions_in_order() {
    let gb = TestGuestbook::new(Mining::Auto);
    let recorder = gb.record_transitions(OperationKind::Sign);
    assert!(gb.record(OperationKind::Sign).is_idle());

    let receipt = gb.sign(bob(), "hello there").await.unwrap();

    assert_eq!(recorder.statuses(), vec![
        TxStatus::Preparing,
        TxStatus::Pending,
        TxStatus::Confirming,
        TxStatus::Confirmed
    ]);
    let record = gb.record(OperationKind::Sign);
    assert_eq!(record.status(), TxStatus::Confirmed);
    assert_eq!(record.id(), Some(receipt.tx_id));
    assert_eq!(record.confirmations_seen(), 1);
    assert_eq!(record.error(), None);
    assert_eq!(gb.ledger.submitted()[0].value, utils::fee());
}

#[tokio::test]
async fn rejected_submission_fails() {
    let gb = TestGuestbook::new(Mining::Auto);
    let recorder = gb.record_transitions(OperationKind::Sign);
    gb.ledger
        .reject_next(LedgerError::Rejected(s("user denied transaction signature")));

    let err = gb.sign(bob(), "hello").await.unwrap_err();

    let expected =
        OperationError::SubmissionFailed(LedgerError::Rejected(s("user denied transaction signature")));
    assert_eq!(err, expected);
    assert_eq!(recorder.statuses(), vec![TxStatus::Preparing, TxStatus::Failed]);
    let record = gb.record(OperationKind::Sign);
    assert_eq!(record.status(), TxStatus::Failed);
    assert_eq!(record.error(), Some(&expected));
    assert_eq!(record.id(), None);
}

#[tokio::test]
async fn reverted_transaction_fails() {
    let gb = TestGuestbook::new(Mining::Auto);
    let recorder = gb.record_transitions(OperationKind::React);
    gb.ledger.revert_next("already reacted");

    let err = gb.react(bob(), 2).await.unwrap_err();

    let record = gb.record(OperationKind::React);
    let tx_id = record.id().expect("transaction was submitted");
    assert_eq!(err, OperationError::Reverted(tx_id, s("already reacted")));
    assert_eq!(record.status(), TxStatus::Failed);
    assert_eq!(recorder.statuses(), vec![
        TxStatus::Preparing,
        TxStatus::Pending,
        TxStatus::Failed
    ]);
}

#[tokio::test]
async fn reset_from_terminal_states() {
    let gb = TestGuestbook::new(Mining::Auto);
    gb.pin_signature(1).await.unwrap();
    assert!(gb.reset(OperationKind::PinSignature));
    assert_eq!(gb.record(OperationKind::PinSignature), TransactionRecord::default());

    gb.ledger.reject_next(LedgerError::Connectivity);
    gb.pin_signature(1).await.unwrap_err();
    assert!(gb.reset(OperationKind::PinSignature));
    let record = gb.record(OperationKind::PinSignature);
    assert_eq!(record.status(), TxStatus::Idle);
    assert_eq!(record.id(), None);
    assert_eq!(record.error(), None);
}

#[tokio::test]
async fn new_submission_replaces_settled_record() {
    let gb = TestGuestbook::new(Mining::Auto);
    gb.ledger.reject_next(LedgerError::Connectivity);
    gb.unpin_signature().await.unwrap_err();
    gb.unpin_signature().await.unwrap();
    let record = gb.record(OperationKind::UnpinSignature);
    assert_eq!(record.status(), TxStatus::Confirmed);
    assert_eq!(record.error(), None);
}

#[tokio::test]
async fn in_flight_guards() {
    let ledger = SandboxLedger::new(Mining::Manual);
    let ctl = controller(&ledger, LifecycleConfig::default());
    let task = spawn_submit(&ctl, &ledger, SubmitOptions::default());
    wait_status(&ctl, TxStatus::Pending).await;
    let pending = ctl.record();

    let res = ctl
        .submit(|| async { ledger.submit(&call()).await })
        .await;
    assert_eq!(res.unwrap_err(), OperationError::Busy);
    assert!(!ctl.reset());
    assert_eq!(ctl.record(), pending);
    assert_eq!(ledger.calls().submit, 1);

    ledger.mine(1);
    let receipt = task.await.unwrap().unwrap();
    assert_eq!(ctl.status(), TxStatus::Confirmed);
    assert_eq!(Some(receipt.tx_id), pending.id());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reset_races_with_new_submissions() {
    let ledger = SandboxLedger::new(Mining::Auto);
    let ctl = controller(&ledger, LifecycleConfig::default());
    let running = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));

    for _ in 0..50 {
        let resetter = {
            let ctl = ctl.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    ctl.reset();
                    tokio::task::yield_now().await;
                }
            })
        };
        let submitters = (0..2)
            .map(|_| {
                let ctl = ctl.clone();
                let ledger = ledger.clone();
                let running = running.clone();
                let overlaps = overlaps.clone();
                tokio::spawn(async move {
                    ctl.submit(move || async move {
                        if running.fetch_add(1, Ordering::SeqCst) > 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        tokio::time::sleep(Duration::from_millis(1)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        ledger.submit(&call()).await
                    })
                    .await
                })
            })
            .collect::<Vec<_>>();
        for task in submitters {
            match task.await.unwrap() {
                Ok(_) | Err(OperationError::Busy) => {}
                Err(err) => panic!("unexpected failure: {err}"),
            }
        }
        resetter.await.unwrap();
        assert!(!ctl.status().is_in_flight());
    }
    // a reset never clears a live record, so the busy guard always holds
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn confirmations_are_monotonic() {
    let ledger = SandboxLedger::new(Mining::Manual);
    let ctl = controller(&ledger, LifecycleConfig { confirmations: 3, timeout: None });
    let recorder = Recorder::default();
    ctl.subscribe(recorder.listener());
    let task = spawn_submit(&ctl, &ledger, SubmitOptions::default());

    wait_status(&ctl, TxStatus::Pending).await;
    ledger.mine(1);
    wait_status(&ctl, TxStatus::Confirming).await;
    assert_eq!(ctl.record().confirmations_seen(), 1);
    ledger.mine(1);
    ledger.mine(1);
    let receipt = task.await.unwrap().unwrap();

    assert_eq!(receipt.confirmations, 3);
    assert_eq!(ctl.record().confirmations_seen(), 3);
    let seen = recorder.confirmations();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(recorder.statuses(), vec![
        TxStatus::Preparing,
        TxStatus::Pending,
        TxStatus::Confirming,
        TxStatus::Confirmed
    ]);
}

#[tokio::test]
async fn per_submission_confirmations() {
    let ledger = SandboxLedger::new(Mining::Auto);
    let ctl = controller(&ledger, LifecycleConfig::default());
    let call = call();
    let receipt = ctl
        .submit_with(SubmitOptions::default().with_confirmations(4), || ledger.submit(&call))
        .await
        .unwrap();
    assert_eq!(receipt.confirmations, 4);
    assert_eq!(ledger.height(), 4);
}

#[tokio::test(start_paused = true)]
async fn confirmation_timeout() {
    let ledger = SandboxLedger::new(Mining::Manual);
    let ctl = controller(&ledger, LifecycleConfig {
        confirmations: 1,
        timeout: Some(Duration::from_secs(30)),
    });
    let call = call();

    let err = ctl.submit(|| ledger.submit(&call)).await.unwrap_err();

    let record = ctl.record();
    let tx_id = record.id().expect("transaction was submitted");
    assert_eq!(err, OperationError::Timeout(tx_id, 30_000));
    assert_eq!(record.status(), TxStatus::Failed);
    assert_eq!(record.error(), Some(&err));
}

#[tokio::test]
async fn cancellation_while_confirming() {
    let ledger = SandboxLedger::new(Mining::Manual);
    let ctl = controller(&ledger, LifecycleConfig { confirmations: 2, timeout: None });
    let token = CancelToken::new();
    let task = spawn_submit(&ctl, &ledger, SubmitOptions::default().with_cancel(token.clone()));
    wait_status(&ctl, TxStatus::Pending).await;
    ledger.mine(1);
    wait_status(&ctl, TxStatus::Confirming).await;

    token.cancel();

    assert_eq!(task.await.unwrap().unwrap_err(), OperationError::Cancelled);
    assert_eq!(ctl.status(), TxStatus::Failed);
    assert_eq!(ctl.record().confirmations_seen(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_before_submission() {
    let ledger = SandboxLedger::new(Mining::Auto);
    ledger.set_submit_delay(Some(Duration::from_secs(60)));
    let ctl = controller(&ledger, LifecycleConfig::default());
    let token = CancelToken::new();
    let task = spawn_submit(&ctl, &ledger, SubmitOptions::default().with_cancel(token.clone()));
    wait_status(&ctl, TxStatus::Preparing).await;

    token.cancel();

    assert_eq!(task.await.unwrap().unwrap_err(), OperationError::Cancelled);
    assert_eq!(ctl.record().id(), None);
    assert!(ledger.submitted().is_empty());
}

#[tokio::test]
async fn dropped_submission_fails_record() {
    let ledger = SandboxLedger::new(Mining::Manual);
    let ctl = controller(&ledger, LifecycleConfig::default());
    let task = spawn_submit(&ctl, &ledger, SubmitOptions::default());
    wait_status(&ctl, TxStatus::Pending).await;

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    let record = ctl.record();
    assert_eq!(record.status(), TxStatus::Failed);
    assert_eq!(record.error(), Some(&OperationError::Cancelled));
    assert!(ctl.reset());
}

#[tokio::test]
async fn listeners_unsubscribe() {
    let gb = TestGuestbook::new(Mining::Auto);
    let recorder = Recorder::default();
    let id = gb.subscribe(OperationKind::Unreact, recorder.listener());
    gb.unreact(bob(), 0).await.unwrap();
    let count = recorder.records().len();
    assert!(count >= 4);

    assert!(gb.controller(OperationKind::Unreact).unsubscribe(id));
    gb.unreact(bob(), 0).await.unwrap();
    assert_eq!(recorder.records().len(), count);
}

#[tokio::test]
async fn independent_kinds_run_concurrently() {
    let gb = TestGuestbook::new(Mining::Manual);
    let (sign, react) = tokio::join!(gb.sign(bob(), "hi"), async {
        wait_status(gb.controller(OperationKind::Sign), TxStatus::Pending).await;
        let react = gb.react(bob(), 0);
        let miner = async {
            wait_status(gb.controller(OperationKind::React), TxStatus::Pending).await;
            gb.ledger.mine(1);
        };
        let (react, _) = tokio::join!(react, miner);
        react
    });
    let (sign, react) = (sign.unwrap(), react.unwrap());
    assert_ne!(sign.tx_id, react.tx_id);
    assert_eq!(sign.block.number, react.block.number);
}
