//! The admission contract the protected resource consumes.
//!
//! A protected resource calls [`AccessGate::is_operator`] as the first step
//! of its gated entry point and aborts the whole call when it returns
//! `false`. It never writes into the gate.

use crate::identity::Address;

/// Read-only operator resolution.
pub trait AccessGate {
    /// Returns the identity authorized at `height`, or [`Address::OPEN`]
    /// when any caller may act.
    fn operator(&self, height: u64) -> Address;

    /// Returns `true` if `candidate` may act at `height`.
    ///
    /// Holds exactly when `candidate` is the resolved operator or the gate
    /// resolves to the open sentinel.
    fn is_operator(&self, candidate: &Address, height: u64) -> bool {
        let op = self.operator(height);
        op.is_open() || op == *candidate
    }

    /// Returns `true` if `candidate` has confirmed liveness for the unit of
    /// rotation containing `height`.
    ///
    /// Gates without liveness tracking always return `true`.
    fn is_live(&self, _candidate: &Address, _height: u64) -> bool {
        true
    }
}

impl<G: AccessGate + ?Sized> AccessGate for &G {
    fn operator(&self, height: u64) -> Address {
        (**self).operator(height)
    }

    fn is_operator(&self, candidate: &Address, height: u64) -> bool {
        (**self).is_operator(candidate, height)
    }

    fn is_live(&self, candidate: &Address, height: u64) -> bool {
        (**self).is_live(candidate, height)
    }
}
