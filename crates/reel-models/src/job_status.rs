//! Job lifecycle status and its transition rules.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle status of a reel job.
///
/// Jobs move strictly forward through
/// `pending → synthesizing → assembling → publishing → completed`.
/// Any non-terminal status may move directly to `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Submitted, waiting for the pipeline
    #[default]
    Pending,
    /// Narration audio is being produced
    Synthesizing,
    /// Images and audio are being encoded into the reel
    Assembling,
    /// The reel is being pushed to object storage
    Publishing,
    /// Reel is available through the job's artifact reference
    Completed,
    /// Job stopped with a recorded failure
    Failed,
}

impl JobStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Pending,
        JobStatus::Synthesizing,
        JobStatus::Assembling,
        JobStatus::Publishing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Synthesizing => "synthesizing",
            JobStatus::Assembling => "assembling",
            JobStatus::Publishing => "publishing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether the pipeline is actively working on the job.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            JobStatus::Synthesizing | JobStatus::Assembling | JobStatus::Publishing
        )
    }

    /// The single forward successor of this status, if any.
    pub fn next(&self) -> Option<JobStatus> {
        match self {
            JobStatus::Pending => Some(JobStatus::Synthesizing),
            JobStatus::Synthesizing => Some(JobStatus::Assembling),
            JobStatus::Assembling => Some(JobStatus::Publishing),
            JobStatus::Publishing => Some(JobStatus::Completed),
            JobStatus::Completed | JobStatus::Failed => None,
        }
    }

    /// Check whether moving from `self` to `to` is a legal edge.
    pub fn can_transition_to(&self, to: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == JobStatus::Failed || self.next() == Some(to)
    }

    /// Validate a transition, returning a typed error for illegal edges.
    pub fn transition(self, to: JobStatus) -> Result<JobStatus, TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal { from: self, to });
        }
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(TransitionError::Illegal { from: self, to })
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown job status: {}", s))
    }
}

/// Rejected status transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("job is already {from}, cannot move to {to}")]
    Terminal { from: JobStatus, to: JobStatus },

    #[error("illegal status transition {from} -> {to}")]
    Illegal { from: JobStatus, to: JobStatus },

    #[error("artifact reference is required to complete a job")]
    MissingArtifactRef,

    #[error("artifact reference is only allowed on completion, not {0}")]
    UnexpectedArtifactRef(JobStatus),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_chain() {
        let mut status = JobStatus::Pending;
        let mut seen = vec![status];
        while let Some(next) = status.next() {
            status = status.transition(next).unwrap();
            seen.push(status);
        }
        assert_eq!(
            seen,
            vec![
                JobStatus::Pending,
                JobStatus::Synthesizing,
                JobStatus::Assembling,
                JobStatus::Publishing,
                JobStatus::Completed,
            ]
        );
    }

    #[test]
    fn test_cannot_skip_stages() {
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Assembling));
        assert!(!JobStatus::Synthesizing.can_transition_to(JobStatus::Publishing));
        assert!(!JobStatus::Assembling.can_transition_to(JobStatus::Completed));
        assert_eq!(
            JobStatus::Synthesizing.transition(JobStatus::Publishing),
            Err(TransitionError::Illegal {
                from: JobStatus::Synthesizing,
                to: JobStatus::Publishing
            })
        );
    }

    #[test]
    fn test_any_non_terminal_can_fail() {
        for status in JobStatus::ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(status.can_transition_to(JobStatus::Failed), "{status}");
        }
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        for terminal in [JobStatus::Completed, JobStatus::Failed] {
            for to in JobStatus::ALL {
                assert!(!terminal.can_transition_to(to));
                assert!(matches!(
                    terminal.transition(to),
                    Err(TransitionError::Terminal { .. })
                ));
            }
        }
    }

    #[test]
    fn test_no_regression() {
        assert!(!JobStatus::Publishing.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Assembling.can_transition_to(JobStatus::Synthesizing));
        assert!(!JobStatus::Assembling.can_transition_to(JobStatus::Assembling));
    }

    #[test]
    fn test_serde_and_parse() {
        let json = serde_json::to_string(&JobStatus::Synthesizing).unwrap();
        assert_eq!(json, "\"synthesizing\"");
        assert_eq!("publishing".parse::<JobStatus>(), Ok(JobStatus::Publishing));
        assert!("processing".parse::<JobStatus>().is_err());
    }
}
