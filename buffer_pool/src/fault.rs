//! Deterministic allocation fault injection
//!
//! Lets tests force exhaustion at an exact point without sizing a pool to
//! the byte.
//!
//! ## Example
//!
//! ```
//! use buffer_pool::{AllocFault, BufferPool, BufferPoolConfig, FaultPlan};
//!
//! let pool = BufferPool::new(BufferPoolConfig::default());
//! pool.set_fault_plan(FaultPlan::new().with_alloc_fault(AllocFault::FailNth { nth: 2 }));
//!
//! assert!(pool.try_to_take(8).is_some());
//! assert!(pool.try_to_take(8).is_none());
//! assert!(pool.try_to_take(8).is_some());
//! ```

/// An allocation fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocFault {
    /// Refuse the next `count` takes
    FailNext { count: usize },

    /// Refuse only the `nth` take (1-based) after the plan is installed
    FailNth { nth: usize },

    /// Let `count` takes through, then refuse every later one
    FailAfter { count: usize },

    /// Refuse every take
    FailAll,
}

/// A set of allocation faults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    alloc_faults: Vec<AllocFault>,
}

impl FaultPlan {
    /// Creates an empty plan
    pub fn new() -> Self {
        Self {
            alloc_faults: Vec::new(),
        }
    }

    /// Adds an allocation fault
    pub fn with_alloc_fault(mut self, fault: AllocFault) -> Self {
        self.alloc_faults.push(fault);
        self
    }

    /// Returns the configured faults
    pub fn alloc_faults(&self) -> &[AllocFault] {
        &self.alloc_faults
    }

    /// Checks whether the plan injects anything
    pub fn is_empty(&self) -> bool {
        self.alloc_faults.is_empty()
    }
}

/// Stateful evaluator for a [`FaultPlan`]
#[derive(Debug, Default)]
pub(crate) struct FaultInjector {
    plan: FaultPlan,
    attempts: usize,
    refused: usize,
}

impl FaultInjector {
    pub(crate) fn new(plan: FaultPlan) -> Self {
        Self {
            plan,
            attempts: 0,
            refused: 0,
        }
    }

    /// Counts one take attempt and decides whether to refuse it
    pub(crate) fn should_fail(&mut self) -> bool {
        self.attempts += 1;
        let attempt = self.attempts;
        let fail = self.plan.alloc_faults().iter().any(|fault| match *fault {
            AllocFault::FailNext { count } => attempt <= count,
            AllocFault::FailNth { nth } => attempt == nth,
            AllocFault::FailAfter { count } => attempt > count,
            AllocFault::FailAll => true,
        });
        if fail {
            self.refused += 1;
        }
        fail
    }

    pub(crate) fn refused(&self) -> usize {
        self.refused
    }
}
