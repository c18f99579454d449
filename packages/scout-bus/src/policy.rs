//! Acknowledgment policy, kept as pure data-in data-out so the redelivery
//! rules are testable without a broker.
//!
//! The policy is bounded republish: retryable failures are republished to the
//! command queue with an incremented attempt header and the original delivery
//! is acked, so a poison message can never loop forever. Once the attempt
//! budget is spent, or on a terminal processing failure, the payload goes to
//! the dead-letter queue instead. Input errors are dropped outright because
//! redelivery cannot repair a malformed payload.

/// What the handler made of one delivery.
#[derive(Debug)]
pub enum ProcessingOutcome {
	Completed,
	/// Input error: malformed payload, missing field, bad timestamp.
	Rejected { reason: String },
	/// Retryable dependency failure: store or embedding provider outage.
	Failed { reason: String },
	/// Terminal processing failure, e.g. a vector dimension mismatch. Loud
	/// and immediate; retrying cannot help and silence would hide a bug.
	Poisoned { reason: String },
}

#[derive(Debug, PartialEq, Eq)]
pub enum AckAction {
	/// Positive acknowledgment, nothing republished.
	Ack,
	/// Republish to the command queue carrying `next_attempts`, then ack.
	Republish { next_attempts: u32 },
	/// Publish to the dead-letter queue with the failure reason, then ack.
	DeadLetter { reason: String },
}

/// `attempts` is the count of failed deliveries before this one, read from the
/// `x-attempts` header (absent means zero).
pub fn decide(outcome: &ProcessingOutcome, attempts: u32, max_attempts: u32) -> AckAction {
	match outcome {
		ProcessingOutcome::Completed => AckAction::Ack,
		ProcessingOutcome::Rejected { .. } => AckAction::Ack,
		ProcessingOutcome::Poisoned { reason } =>
			AckAction::DeadLetter { reason: reason.clone() },
		ProcessingOutcome::Failed { reason } => {
			let next_attempts = attempts.saturating_add(1);

			if next_attempts >= max_attempts {
				AckAction::DeadLetter { reason: reason.clone() }
			} else {
				AckAction::Republish { next_attempts }
			}
		},
	}
}
