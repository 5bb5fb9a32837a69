mod enforcer;
mod trie;
mod view;
mod vocabulary;

pub use enforcer::{EffectedSubjects, Enforcer, Explanation, ExplanationStep};

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("conflicting policy entry '{label}': {reason}")]
    PolicyEntryConflict { label: String, reason: &'static str },
}

/// Resolved outcome for one permission at one path.
///
/// `Undefined` means no visited node declared anything; callers must treat it
/// as not granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Granted,
    Revoked,
    Undefined,
}

impl Verdict {
    pub fn is_granted(self) -> bool {
        self == Verdict::Granted
    }

    /// A more specific node overrides the running result unless it is silent.
    pub fn overridden_by(self, node: Verdict) -> Verdict {
        match node {
            Verdict::Undefined => self,
            decided => decided,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Granted => f.write_str("GRANTED"),
            Verdict::Revoked => f.write_str("REVOKED"),
            Verdict::Undefined => f.write_str("UNDEFINED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_node_keeps_running_verdict() {
        assert_eq!(
            Verdict::Granted.overridden_by(Verdict::Undefined),
            Verdict::Granted
        );
        assert_eq!(
            Verdict::Revoked.overridden_by(Verdict::Undefined),
            Verdict::Revoked
        );
    }

    #[test]
    fn decided_node_overrides_in_both_directions() {
        assert_eq!(
            Verdict::Granted.overridden_by(Verdict::Revoked),
            Verdict::Revoked
        );
        assert_eq!(
            Verdict::Revoked.overridden_by(Verdict::Granted),
            Verdict::Granted
        );
        assert_eq!(
            Verdict::Undefined.overridden_by(Verdict::Granted),
            Verdict::Granted
        );
    }

    #[test]
    fn only_granted_is_granted() {
        assert!(Verdict::Granted.is_granted());
        assert!(!Verdict::Revoked.is_granted());
        assert!(!Verdict::Undefined.is_granted());
    }

    #[test]
    fn verdict_display() {
        assert_eq!(Verdict::Granted.to_string(), "GRANTED");
        assert_eq!(Verdict::Undefined.to_string(), "UNDEFINED");
    }
}
