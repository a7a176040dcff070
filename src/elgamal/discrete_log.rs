// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{ElementModP, Error, GroupParameters, Result};

pub const DEFAULT_DISCRETE_LOG_BOUND: u64 = 1000;

#[derive(Debug)]
struct Table {
    exponents: HashMap<ElementModP, u64>,
    // The largest exponent in the table and $g$ raised to it.
    frontier: u64,
    frontier_element: ElementModP,
}

/// Inverts $x \mapsto g^x$ for $0 \le x \le$ `bound` by a table that is extended lazily.
///
/// The table only ever grows, and is shared by all callers through a single lock.
#[derive(Debug)]
pub struct DiscreteLog {
    group: GroupParameters,
    bound: u64,
    table: Mutex<Table>,
}

impl DiscreteLog {
    pub fn new(group: &GroupParameters) -> Self {
        Self::with_bound(group, DEFAULT_DISCRETE_LOG_BOUND)
    }

    pub fn with_bound(group: &GroupParameters, bound: u64) -> Self {
        let exponents = HashMap::from([(ElementModP::ONE, 0)]);

        Self {
            group: group.clone(),
            bound,
            table: Mutex::new(Table {
                exponents,
                frontier: 0,
                frontier_element: ElementModP::ONE,
            }),
        }
    }

    pub fn bound(&self) -> u64 {
        self.bound
    }

    /// Returns `x` such that $g^x = $ `element`, or [`Error::DiscreteLogBoundExceeded`] if no
    /// such `x` is within the bound.
    pub fn discrete_log(&self, element: &ElementModP) -> Result<u64> {
        let mut table = self.table.lock().map_err(|_| Error::InternalError)?;

        if let Some(exponent) = table.exponents.get(element) {
            return Ok(*exponent);
        }

        let generator = self.group.generator();
        while table.frontier < self.bound {
            let next = self.group.mult_p(&table.frontier_element, &generator);
            table.frontier += 1;
            table.frontier_element = next;

            let frontier = table.frontier;
            table.exponents.insert(next, frontier);

            if next == *element {
                return Ok(frontier);
            }
        }

        log::debug!(
            "discrete log search exhausted its bound of {} without a match",
            self.bound
        );

        Err(Error::DiscreteLogBoundExceeded { bound: self.bound })
    }
}
