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

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{Amount, ContractCall, LedgerClient, LedgerError, OperationError};

/// Pre-flight cost of a call, valid only at the moment it was computed.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub struct CostEstimate {
    pub units_required: u64,
    pub unit_price: Amount,
}

impl Display for CostEstimate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} units x {} = {}", self.units_required, self.unit_price, self.total_cost())
    }
}

impl CostEstimate {
    pub fn new(units_required: u64, unit_price: impl Into<Amount>) -> Self {
        CostEstimate { units_required, unit_price: unit_price.into() }
    }

    /// Fee part of the cost, saturating at the maximal amount.
    pub fn total_cost(&self) -> Amount {
        self.unit_price
            .checked_mul(self.units_required as u128)
            .unwrap_or(Amount::from_units(u128::MAX))
    }

    /// Fee together with the value attached to the call.
    pub fn total_with_value(&self, value: Amount) -> Amount { self.total_cost().saturating_add(value) }
}

/// Last successful estimate with the time it was taken.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct EstimateSnapshot {
    pub estimate: CostEstimate,
    pub taken_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
struct EstimatorState {
    last: Option<EstimateSnapshot>,
    last_error: Option<LedgerError>,
}

/// Advisory cost estimator.
///
/// Estimation never affects submission. A failing estimate is reported to the caller and kept as
/// the last error, while the previously obtained estimate stays available.
pub struct CostEstimator {
    ledger: Arc<dyn LedgerClient>,
    state: Mutex<EstimatorState>,
}

impl CostEstimator {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        CostEstimator { ledger, state: Mutex::new(EstimatorState::default()) }
    }

    pub async fn estimate(&self, call: &ContractCall) -> Result<CostEstimate, OperationError> {
        trace!("Estimating cost of `{}` on {}", call.method, call.contract);
        match self.ledger.estimate_cost(call).await {
            Ok(estimate) => {
                debug!("Cost of `{}` is estimated as {estimate}", call.method);
                let mut state = self.state.lock();
                state.last = Some(EstimateSnapshot { estimate, taken_at: Utc::now() });
                state.last_error = None;
                Ok(estimate)
            }
            Err(err) => {
                debug!("Cost estimation of `{}` has failed: {err}", call.method);
                self.state.lock().last_error = Some(err.clone());
                Err(OperationError::EstimationFailed(err))
            }
        }
    }

    pub fn last(&self) -> Option<EstimateSnapshot> { self.state.lock().last }

    pub fn last_error(&self) -> Option<LedgerError> { self.state.lock().last_error.clone() }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn totals() {
        let est = CostEstimate::new(21_000, 3u128);
        assert_eq!(est.total_cost(), Amount::from_units(63_000));
        assert_eq!(est.total_with_value(Amount::from_units(7)), Amount::from_units(63_007));
        let huge = CostEstimate::new(u64::MAX, u128::MAX);
        assert_eq!(huge.total_cost(), Amount::from_units(u128::MAX));
        assert_eq!(huge.total_with_value(Amount::from_units(1)), Amount::from_units(u128::MAX));
    }
}
